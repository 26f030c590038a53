// src/web/user_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::CurrentUser,
    services::user_service,
    state::AppState,
    templates::ContaPage,
    web::{redirect_com, render, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ChangeOwnPasswordForm {
    current_password: String,
    new_password: String,
    confirm_password: String,
}

// GET /conta (protegido pelo middleware)
pub async fn conta_page_handler(
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /conta: Acesso para {}", user.username);
    let template = ContaPage {
        is_admin: user.is_admin(),
        role: user.role.to_string(),
        username: user.username,
        success_message: params.success,
        error_message: params.error,
    };
    render(&template, "ContaPage")
}

// POST /conta (troca da própria senha)
pub async fn handle_change_own_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<ChangeOwnPasswordForm>,
) -> AppResult<Redirect> {
    tracing::info!("POST /conta: {} a alterar a própria senha", user.username);

    match user_service::change_own_password(
        &state.db_pool,
        user.id,
        &form.current_password,
        &form.new_password,
        &form.confirm_password,
    )
    .await
    {
        Ok(()) => Ok(redirect_com("/conta", "success", "Senha alterada com sucesso!")),
        Err(AppError::InvalidCredentials) => {
            Ok(redirect_com("/conta", "error", "Senha atual incorreta!"))
        }
        Err(e @ AppError::Validation(_)) => Ok(redirect_com("/conta", "error", &e.user_message())),
        Err(e) => Err(e),
    }
}
