// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{LoginForm, Role},
    services::{auth_service, user_service},
    state::AppState,
    templates::LoginPage,
    web::{mw_auth::USER_ID_KEY, redirect_com, render, FeedbackParams},
};
use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;

#[derive(Deserialize, Debug)]
pub struct SignupForm {
    username: String,
    password: String,
    confirm_password: String,
}

// GET /login (se já houver sessão, vai direto ao painel)
pub async fn show_login_form(
    session: Session,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    if session.get::<i64>(USER_ID_KEY).await.ok().flatten().is_some() {
        tracing::debug!("GET /login: Utilizador já logado, redirecionando para /dashboard");
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let template = LoginPage {
        error_message: params.error,
        success_message: params.success,
    };
    Ok(render(&template, "LoginPage")?.into_response())
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("Tentativa de login para: {}", form.username);

    let Some(user) = auth_service::authenticate(&state.db_pool, &form.username, &form.password).await? else {
        let template = LoginPage {
            error_message: Some(AppError::InvalidCredentials.user_message()),
            success_message: None,
        };
        return Ok(render(&template, "LoginPage")?.into_response());
    };

    // Novo ID de sessão a cada login
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
    session
        .insert(USER_ID_KEY, user.id)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;

    tracing::info!("✅ Login bem-sucedido para: {}", user.username);
    Ok(Redirect::to("/dashboard").into_response())
}

// POST /signup (cria sempre uma conta com papel `user`)
pub async fn handle_signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> AppResult<Redirect> {
    let username = form.username.trim();
    tracing::info!("POST /signup: Tentando criar conta '{}'", username);

    if form.password != form.confirm_password {
        return Ok(redirect_com("/login", "error", "As senhas não coincidem!"));
    }

    match user_service::create_user(&state.db_pool, username, &form.password, Role::User).await {
        Ok(user) => Ok(redirect_com(
            "/login",
            "success",
            &format!("Conta '{}' criada! Faça login.", user.username),
        )),
        Err(e @ (AppError::UserAlreadyExists(_) | AppError::Validation(_))) => {
            tracing::warn!("Criação de conta recusada: {}", e);
            Ok(redirect_com("/login", "error", &e.user_message()))
        }
        Err(e) => Err(e),
    }
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let user_id: Option<i64> = session.get(USER_ID_KEY).await.ok().flatten();

    // Apaga todos os dados da sessão atual
    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;

    match user_id {
        Some(id) => tracing::info!("🚪 Utilizador {} desligado.", id),
        None => tracing::info!("🚪 Sessão anónima desligada."),
    }
    Ok(Redirect::to("/login"))
}
