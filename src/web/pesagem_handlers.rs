// src/web/pesagem_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        pesagem::{EstatisticasPeso, PesagemForm, RACAS_SUGERIDAS},
        relatorio::Eixo,
        user::CurrentUser,
    },
    services::{pesagem_service, relatorio_service},
    state::AppState,
    templates::{NovaPesagemPage, OpcaoLote, PesagensPage},
    web::{lote_filtro, redirect_com, render, secoes_grupos},
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{IntoResponse, Redirect},
};
use chrono::Local;
use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
pub struct LoteParams {
    lote: Option<String>,
    success: Option<String>,
    error: Option<String>,
}

fn destino_nova(lote: &str) -> String {
    if lote.is_empty() {
        "/pesagens/nova".to_string()
    } else {
        format!("/pesagens/nova?lote={}", urlencoding::encode(lote))
    }
}

// GET /pesagens?lote=
pub async fn list_pesagens_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<LoteParams>,
) -> AppResult<impl IntoResponse> {
    let lote = lote_filtro(params.lote);
    tracing::debug!("GET /pesagens: user {} (lote: {:?})", user.username, lote);

    let pesagens = pesagem_service::listar_pesagens(&state.db_pool, user.id, lote.as_deref()).await?;
    let lotes = pesagem_service::listar_lotes(&state.db_pool, user.id).await?;

    let template = PesagensPage {
        is_admin: user.is_admin(),
        username: user.username,
        stats: relatorio_service::estatisticas(&pesagens),
        lotes: OpcaoLote::lista(lotes, lote.as_deref()),
        filtro_ativo: lote.is_some(),
        pesagens,
        success_message: params.success,
        error_message: params.error,
    };
    render(&template, "PesagensPage")
}

// GET /pesagens/nova?lote= (formulário e resumo do lote em curso)
pub async fn nova_pesagem_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<LoteParams>,
) -> AppResult<impl IntoResponse> {
    let lote = lote_filtro(params.lote).unwrap_or_default();
    let lotes = pesagem_service::listar_lotes(&state.db_pool, user.id).await?;

    let pesagens_lote = if lote.is_empty() {
        Vec::new()
    } else {
        pesagem_service::listar_pesagens(&state.db_pool, user.id, Some(&lote)).await?
    };
    let resumo_lote: Option<EstatisticasPeso> =
        (!pesagens_lote.is_empty()).then(|| relatorio_service::estatisticas(&pesagens_lote));
    let secoes_lote = secoes_grupos([
        ("Por Sexo", relatorio_service::agrupar(&pesagens_lote, Eixo::Sexo)),
        ("Por Raça", relatorio_service::agrupar(&pesagens_lote, Eixo::Raca)),
        ("Por Sexo e Raça", relatorio_service::agrupar(&pesagens_lote, Eixo::SexoRaca)),
    ]);

    let agora = Local::now().naive_local();
    let template = NovaPesagemPage {
        is_admin: user.is_admin(),
        username: user.username,
        lote,
        hoje: agora.format("%Y-%m-%d").to_string(),
        agora: agora.format("%H:%M").to_string(),
        racas: RACAS_SUGERIDAS,
        lotes,
        resumo_lote,
        secoes_lote,
        pesagens_lote,
        success_message: params.success,
        error_message: params.error,
    };
    render(&template, "NovaPesagemPage")
}

// POST /pesagens
pub async fn handle_add_pesagem(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<PesagemForm>,
) -> AppResult<Redirect> {
    let destino = destino_nova(form.lote.trim());

    let nova = match pesagem_service::validar_formulario(&form) {
        Ok(nova) => nova,
        Err(e @ AppError::Validation(_)) => {
            tracing::warn!("Pesagem recusada para {}: {}", user.username, e);
            return Ok(redirect_com(&destino, "error", &e.user_message()));
        }
        Err(e) => return Err(e),
    };

    let pesagem = pesagem_service::adicionar_pesagem(&state.db_pool, user.id, &nova).await?;
    Ok(redirect_com(
        &destino,
        "success",
        &format!(
            "Pesagem salva! Bezerro {} - {} kg",
            pesagem.numero_bezerro,
            pesagem.peso_fmt()
        ),
    ))
}

// POST /pesagens/{id}/excluir
pub async fn handle_delete_pesagem(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(pesagem_id): Path<i64>,
) -> AppResult<Redirect> {
    match pesagem_service::deletar_pesagem(&state.db_pool, user.id, pesagem_id).await {
        Ok(()) => Ok(redirect_com("/pesagens", "success", "Pesagem excluída.")),
        Err(e @ AppError::NotFound(_)) => Ok(redirect_com("/pesagens", "error", &e.user_message())),
        Err(e) => Err(e),
    }
}

// POST /pesagens/ultima/excluir
pub async fn handle_delete_ultima(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Redirect> {
    let Some(ultima) = pesagem_service::buscar_ultima_pesagem(&state.db_pool, user.id).await? else {
        return Ok(redirect_com("/dashboard", "error", "Nenhuma pesagem para excluir."));
    };

    pesagem_service::deletar_pesagem(&state.db_pool, user.id, ultima.id).await?;
    Ok(redirect_com(
        "/dashboard",
        "success",
        &format!("Última pesagem ({}) excluída.", ultima.numero_bezerro),
    ))
}

// POST /pesagens/limpar
pub async fn handle_limpar_pesagens(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Redirect> {
    let removidas = pesagem_service::limpar_pesagens(&state.db_pool, user.id).await?;
    Ok(redirect_com(
        "/dashboard",
        "success",
        &format!("{} pesagens removidas.", removidas),
    ))
}
