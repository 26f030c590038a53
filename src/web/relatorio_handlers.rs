// src/web/relatorio_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{pesagem::Pesagem, relatorio::Relatorio, user::CurrentUser},
    services::{
        export_service::{self, EscopoExport},
        pesagem_service, relatorio_service,
    },
    state::AppState,
    templates::{OpcaoLote, RelatoriosPage},
    web::{lote_filtro, render, secoes_grupos},
};
use axum::{
    extract::{Extension, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Deserialize, Debug, Default)]
pub struct RelatorioParams {
    lote: Option<String>,
    escopo: Option<String>,
    // "0"/"false" desliga os gráficos no PDF
    graficos: Option<String>,
    success: Option<String>,
    error: Option<String>,
}

impl RelatorioParams {
    fn escopo(&self) -> EscopoExport {
        EscopoExport::from_query(self.escopo.as_deref(), self.lote.as_deref())
    }

    fn incluir_graficos(&self) -> bool {
        !matches!(self.graficos.as_deref().map(str::trim), Some("0" | "false" | "off" | "nao"))
    }
}

// Pesagens do conjunto pedido e o relatório montado sobre elas
async fn carregar(
    state: &AppState,
    user: &CurrentUser,
    escopo: &EscopoExport,
) -> AppResult<(Vec<Pesagem>, Relatorio)> {
    let pesagens = pesagem_service::listar_pesagens(&state.db_pool, user.id, escopo.lote()).await?;
    let relatorio = relatorio_service::montar_relatorio(&escopo.titulo(), escopo.lote(), &pesagens);
    Ok((pesagens, relatorio))
}

fn anexo(bytes: Vec<u8>, mime: &'static str, nome_arquivo: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", nome_arquivo),
            ),
        ],
        bytes,
    )
        .into_response()
}

// GET /relatorios?lote=
pub async fn relatorios_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<RelatorioParams>,
) -> AppResult<impl IntoResponse> {
    let lote = lote_filtro(params.lote.clone());
    let escopo = params.escopo();
    let (pesagens, relatorio) = carregar(&state, &user, &escopo).await?;
    let lotes = pesagem_service::listar_lotes(&state.db_pool, user.id).await?;

    let query_lote = match &lote {
        Some(lote) => format!("lote={}", urlencoding::encode(lote)),
        None => String::new(),
    };

    let template = RelatoriosPage {
        is_admin: user.is_admin(),
        username: user.username,
        titulo: relatorio.titulo.replace('_', " "),
        lotes: OpcaoLote::lista(lotes, lote.as_deref()),
        query_lote,
        graficos: relatorio.graficos(),
        dados_lote: if escopo.lote().is_some() { pesagens } else { Vec::new() },
        stats: relatorio.geral,
        secoes: secoes_grupos([
            ("Por Sexo", relatorio.por_sexo),
            ("Por Raça", relatorio.por_raca),
            ("Por Sexo e Raça", relatorio.por_combinacao),
            ("Por Lote", relatorio.por_lote),
        ]),
        success_message: params.success,
        error_message: params.error,
    };
    render(&template, "RelatoriosPage")
}

// GET /relatorios/excel?lote=&escopo=
pub async fn download_excel(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<RelatorioParams>,
) -> AppResult<Response> {
    let escopo = params.escopo();
    let (pesagens, _) = carregar(&state, &user, &escopo).await?;
    tracing::info!("📥 Excel '{}' pedido por {}", escopo.titulo(), user.username);

    // Geração síncrona fora do runtime async
    let bytes = tokio::task::spawn_blocking(move || export_service::gerar_excel(&pesagens))
        .await
        .map_err(|e| {
            tracing::error!("Erro na task spawn_blocking (gerar_excel): {:?}", e);
            AppError::InternalServerError
        })??;

    Ok(anexo(bytes, MIME_XLSX, &escopo.nome_arquivo("xlsx")))
}

// GET /relatorios/pdf?lote=&escopo=&graficos=
pub async fn download_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<RelatorioParams>,
) -> AppResult<Response> {
    let escopo = params.escopo();
    let incluir_graficos = params.incluir_graficos();
    let (pesagens, relatorio) = carregar(&state, &user, &escopo).await?;
    tracing::info!("📥 PDF '{}' pedido por {}", escopo.titulo(), user.username);

    let bytes = tokio::task::spawn_blocking(move || {
        export_service::gerar_pdf(&relatorio, &pesagens, incluir_graficos)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (gerar_pdf): {:?}", e);
        AppError::InternalServerError
    })??;

    Ok(anexo(bytes, "application/pdf", &escopo.nome_arquivo("pdf")))
}

// GET /api/estatisticas?lote= (o mesmo relatório em JSON)
pub async fn api_estatisticas(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<RelatorioParams>,
) -> AppResult<Json<Relatorio>> {
    let (_, relatorio) = carregar(&state, &user, &params.escopo()).await?;
    Ok(Json(relatorio))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(graficos: Option<&str>) -> RelatorioParams {
        RelatorioParams {
            graficos: graficos.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn charts_are_on_unless_disabled() {
        assert!(params(None).incluir_graficos());
        assert!(params(Some("1")).incluir_graficos());
        assert!(!params(Some("0")).incluir_graficos());
        assert!(!params(Some("false")).incluir_graficos());
    }
}
