// src/web/dashboard_handlers.rs
use crate::{
    error::AppResult,
    models::user::CurrentUser,
    services::{pesagem_service, relatorio_service},
    state::AppState,
    templates::DashboardPage,
    web::{render, secoes_grupos, FeedbackParams},
};
use axum::{
    extract::{Extension, Query, State},
    response::IntoResponse,
};

// GET /dashboard (estatísticas de todas as pesagens do utilizador)
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /dashboard: Acesso para {}", user.username);

    let pesagens = pesagem_service::listar_pesagens(&state.db_pool, user.id, None).await?;
    let ultima = pesagem_service::buscar_ultima_pesagem(&state.db_pool, user.id).await?;
    // Resumo geral agregado pela própria DB
    let stats = pesagem_service::calcular_estatisticas(&state.db_pool, user.id).await?;
    let relatorio = relatorio_service::montar_relatorio("Relatorio_Geral", None, &pesagens);

    let secoes = secoes_grupos([
        ("Por Sexo", relatorio.por_sexo),
        ("Por Raça", relatorio.por_raca),
        ("Por Sexo e Raça", relatorio.por_combinacao),
        ("Por Lote", relatorio.por_lote),
    ]);

    let template = DashboardPage {
        is_admin: user.is_admin(),
        username: user.username,
        stats,
        secoes,
        ultima,
        success_message: params.success,
        error_message: params.error,
    };
    render(&template, "DashboardPage")
}
