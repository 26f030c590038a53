// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::CurrentUser,
    services::user_service,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

// Chave da sessão onde guardamos o id do utilizador autenticado
pub const USER_ID_KEY: &str = "user_id";

/// Middleware que verifica se o utilizador está logado.
/// O utilizador é relido da DB a cada pedido, para que mudanças de papel e
/// contas apagadas tenham efeito imediato.
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = match session.get::<i64>(USER_ID_KEY).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            // O IntoResponse de AppError::Unauthorized redireciona para /login
            tracing::debug!("Autenticação MW: sem user_id na sessão.");
            return Err(AppError::Unauthorized);
        }
        Err(e) => {
            tracing::error!("Autenticação MW: Erro ao ler sessão: {:?}", e);
            return Err(AppError::SessionError(format!("Erro ao verificar sessão: {}", e)));
        }
    };

    match user_service::find_user_by_id(&state.db_pool, user_id).await? {
        Some(user) => {
            tracing::debug!("Autenticação MW: '{}' autenticado. Prosseguindo...", user.username);
            request.extensions_mut().insert(CurrentUser::from(user));
            Ok(next.run(request).await)
        }
        None => {
            // Conta apagada enquanto a sessão estava ativa
            tracing::warn!("Autenticação MW: user {} já não existe, terminando sessão.", user_id);
            session
                .flush()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao limpar sessão: {}", e)))?;
            Ok(Redirect::to("/login").into_response())
        }
    }
}
