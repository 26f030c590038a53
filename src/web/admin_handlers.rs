// src/web/admin_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{CurrentUser, Role},
    services::user_service,
    state::AppState,
    templates::{AdminUsersPage, UserRow},
    web::{redirect_com, render, FeedbackParams},
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;

const ADMIN_USERS: &str = "/admin/users";

// --- Structs para os Formulários ---
#[derive(Deserialize, Debug)]
pub struct CreateUserForm {
    username: String,
    password: String,
    role: String,
}

#[derive(Deserialize, Debug)]
pub struct ChangeRoleForm {
    role: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetPasswordForm {
    new_password: String,
}

// Erros esperados viram feedback na lista; os restantes seguem para a página de erro
fn feedback_erro(e: AppError) -> AppResult<Redirect> {
    match e {
        AppError::UserAlreadyExists(_) | AppError::Validation(_) | AppError::NotFound(_) => {
            tracing::warn!("Operação de admin recusada: {}", e);
            Ok(redirect_com(ADMIN_USERS, "error", &e.user_message()))
        }
        e => Err(e),
    }
}

/// Handler para GET /admin/users - Mostra a página de gestão
pub async fn show_admin_users_page(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /admin/users: Carregando página de gestão...");

    let users = user_service::find_all_users(&state.db_pool)
        .await?
        .into_iter()
        .map(|user| UserRow::from_user(user, admin.id))
        .collect();

    let template = AdminUsersPage {
        username: admin.username,
        is_admin: true,
        users,
        success_message: params.success,
        error_message: params.error,
    };
    render(&template, "AdminUsersPage")
}

/// Handler para POST /admin/users/create - Cria um novo utilizador
pub async fn handle_create_user(
    State(state): State<AppState>,
    Form(form): Form<CreateUserForm>,
) -> AppResult<Redirect> {
    tracing::info!("POST /admin/users/create: Tentando criar user {}", form.username);

    let role: Role = match form.role.parse() {
        Ok(role) => role,
        Err(msg) => return Ok(redirect_com(ADMIN_USERS, "error", &msg)),
    };

    match user_service::create_user(&state.db_pool, form.username.trim(), &form.password, role).await {
        Ok(user) => Ok(redirect_com(
            ADMIN_USERS,
            "success",
            &format!("Usuário '{}' criado com sucesso.", user.username),
        )),
        Err(e) => feedback_erro(e),
    }
}

/// Handler para POST /admin/users/{id}/role - Altera o papel
pub async fn handle_change_role(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    Form(form): Form<ChangeRoleForm>,
) -> AppResult<Redirect> {
    let role: Role = match form.role.parse() {
        Ok(role) => role,
        Err(msg) => return Ok(redirect_com(ADMIN_USERS, "error", &msg)),
    };
    // O admin não pode tirar o próprio acesso
    if user_id == admin.id && role != Role::Admin {
        return Ok(redirect_com(ADMIN_USERS, "error", "Não pode remover o seu próprio papel de admin."));
    }

    match user_service::update_user_role(&state.db_pool, user_id, role).await {
        Ok(()) => Ok(redirect_com(
            ADMIN_USERS,
            "success",
            &format!("Papel do usuário {} alterado para '{}'.", user_id, role),
        )),
        Err(e) => feedback_erro(e),
    }
}

/// Handler para POST /admin/users/{id}/password - Redefine a senha
pub async fn handle_reset_password(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Form(form): Form<ResetPasswordForm>,
) -> AppResult<Redirect> {
    tracing::info!("POST /admin/users/{}/password: Redefinindo senha", user_id);

    match user_service::update_user_password(&state.db_pool, user_id, &form.new_password).await {
        Ok(()) => Ok(redirect_com(
            ADMIN_USERS,
            "success",
            &format!("Senha do usuário {} redefinida.", user_id),
        )),
        Err(e) => feedback_erro(e),
    }
}

/// Handler para POST /admin/users/{id}/delete - Apaga o utilizador e as suas pesagens
pub async fn handle_delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> AppResult<Redirect> {
    if user_id == admin.id {
        return Ok(redirect_com(ADMIN_USERS, "error", "Não pode apagar a sua própria conta."));
    }

    match user_service::delete_user(&state.db_pool, user_id).await {
        Ok(()) => Ok(redirect_com(
            ADMIN_USERS,
            "success",
            &format!("Usuário {} apagado.", user_id),
        )),
        Err(e) => feedback_erro(e),
    }
}
