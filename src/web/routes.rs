// src/web/routes.rs
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    web::{
        admin_handlers, auth_handlers, dashboard_handlers, mw_admin, mw_auth, pesagem_handlers,
        relatorio_handlers, user_handlers,
    },
};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/signup", post(auth_handlers::handle_signup))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/", get(|| async { Redirect::to("/login") }));

    // --- Rotas de Admin ---
    // Exigem login E papel admin
    let admin_routes = Router::new()
        .route("/users", get(admin_handlers::show_admin_users_page))
        .route("/users/create", post(admin_handlers::handle_create_user))
        .route("/users/{id}/role", post(admin_handlers::handle_change_role))
        .route("/users/{id}/password", post(admin_handlers::handle_reset_password))
        .route("/users/{id}/delete", post(admin_handlers::handle_delete_user))
        // Aplica APENAS mw_admin aqui (mw_auth será aplicado no router pai)
        .route_layer(middleware::from_fn(mw_admin::require_admin));

    let pesagem_routes = Router::new()
        .route(
            "/",
            get(pesagem_handlers::list_pesagens_handler).post(pesagem_handlers::handle_add_pesagem),
        )
        .route("/nova", get(pesagem_handlers::nova_pesagem_form))
        .route("/{id}/excluir", post(pesagem_handlers::handle_delete_pesagem))
        .route("/ultima/excluir", post(pesagem_handlers::handle_delete_ultima))
        .route("/limpar", post(pesagem_handlers::handle_limpar_pesagens));

    let relatorio_routes = Router::new()
        .route("/", get(relatorio_handlers::relatorios_page))
        .route("/excel", get(relatorio_handlers::download_excel))
        .route("/pdf", get(relatorio_handlers::download_pdf));

    // --- Rotas Autenticadas ---
    let authenticated_routes = Router::new()
        .route("/dashboard", get(dashboard_handlers::dashboard_handler))
        .route(
            "/conta",
            get(user_handlers::conta_page_handler).post(user_handlers::handle_change_own_password),
        )
        .route("/api/estatisticas", get(relatorio_handlers::api_estatisticas))
        .nest("/pesagens", pesagem_routes)
        .nest("/relatorios", relatorio_routes)
        .nest("/admin", admin_routes)
        // require_auth vale para TODAS as rotas acima (incluindo as aninhadas)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}

/// Store de sessões na mesma base SQLite (tabela `sessions`).
pub async fn create_session_store(db_pool: &SqlitePool) -> AppResult<SqliteStore> {
    let session_store = SqliteStore::new(db_pool.clone())
        .with_table_name("sessions")
        .map_err(|e| AppError::Config(format!("Falha ao criar session store: {}", e)))?;
    session_store.migrate().await?;
    Ok(session_store)
}

/// Router completo com as camadas de trace e sessão.
pub fn create_app(app_state: AppState, session_store: SqliteStore) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.secure_cookies)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            app_state.config.session_inactivity_hours,
        )));

    create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(session_layer),
    )
}
