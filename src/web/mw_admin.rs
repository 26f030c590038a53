// src/web/mw_admin.rs
use crate::{error::AppError, models::user::CurrentUser};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

/// Middleware que verifica se o utilizador logado tem o papel "admin".
/// Deve ser executado *depois* do middleware `require_auth`.
pub async fn require_admin(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.is_admin() {
        tracing::debug!("Admin MW: Acesso admin concedido para {}", user.username);
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Admin MW: Acesso negado para {} (sem papel admin).", user.username);
        Err(AppError::Forbidden)
    }
}
