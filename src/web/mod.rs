// src/web/mod.rs
pub mod admin_handlers;
pub mod auth_handlers;
pub mod dashboard_handlers;
pub mod mw_admin;
pub mod mw_auth;
pub mod pesagem_handlers;
pub mod relatorio_handlers;
pub mod routes;
pub mod user_handlers;

use crate::{
    error::{AppError, AppResult},
    models::relatorio::GrupoEstatistica,
    services::relatorio_service,
    templates::SecaoGrupos,
};
use askama::Template;
use axum::response::{Html, Redirect};
use serde::Deserialize;

/// Mensagens de feedback vindas do padrão Post/Redirect/Get (`?success=` / `?error=`).
#[derive(Deserialize, Debug, Default)]
pub struct FeedbackParams {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Renderiza um template Askama, registando a falha com o nome da página.
pub fn render<T: Template>(template: &T, pagina: &str) -> AppResult<Html<String>> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Falha ao renderizar template {}: {}", pagina, e);
        AppError::InternalServerError
    })
}

/// Redireciona para `destino` com uma mensagem codificada na query string.
pub fn redirect_com(destino: &str, chave: &str, mensagem: &str) -> Redirect {
    let separador = if destino.contains('?') { '&' } else { '?' };
    let url = format!("{}{}{}={}", destino, separador, chave, urlencoding::encode(mensagem));
    Redirect::to(&url)
}

/// Lote vindo da query string: vazio conta como "todos".
pub fn lote_filtro(lote: Option<String>) -> Option<String> {
    lote.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

/// Secções de tabela por eixo, cada uma com as barras das médias.
pub fn secoes_grupos(
    eixos: impl IntoIterator<Item = (&'static str, Vec<GrupoEstatistica>)>,
) -> Vec<SecaoGrupos> {
    eixos
        .into_iter()
        .map(|(titulo, grupos)| SecaoGrupos {
            titulo: titulo.to_string(),
            barras: relatorio_service::barras_media(&grupos),
            grupos,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, response::IntoResponse};

    #[test]
    fn redirect_encodes_message() {
        let response = redirect_com("/pesagens/nova?lote=L1", "error", "Peso inválido & vazio").into_response();
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert_eq!(location, "/pesagens/nova?lote=L1&error=Peso%20inv%C3%A1lido%20%26%20vazio");
    }

    #[test]
    fn blank_lot_means_all() {
        assert_eq!(lote_filtro(Some("  ".into())), None);
        assert_eq!(lote_filtro(Some(" L1 ".into())), Some("L1".to_string()));
        assert_eq!(lote_filtro(None), None);
    }
}
