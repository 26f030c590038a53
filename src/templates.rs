// src/templates.rs
use crate::models::{
    pesagem::{EstatisticasPeso, Pesagem},
    relatorio::{BarraGrafico, Grafico, GrupoEstatistica},
    user::User,
};
use askama::Template;

// Struct para o template `login.html` (login e criação de conta na mesma página)
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

/// Opção do seletor de lotes, com a marcação de selecionado já resolvida.
#[derive(Debug, Clone)]
pub struct OpcaoLote {
    pub nome: String,
    pub selecionado: bool,
}

impl OpcaoLote {
    pub fn lista(lotes: Vec<String>, selecionado: Option<&str>) -> Vec<Self> {
        lotes
            .into_iter()
            .map(|nome| OpcaoLote {
                selecionado: Some(nome.as_str()) == selecionado,
                nome,
            })
            .collect()
    }
}

/// Secção do painel: tabela de grupos e as barras das médias.
pub struct SecaoGrupos {
    pub titulo: String,
    pub grupos: Vec<GrupoEstatistica>,
    pub barras: Vec<BarraGrafico>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub username: String,
    pub is_admin: bool,
    pub stats: EstatisticasPeso,
    pub secoes: Vec<SecaoGrupos>,
    pub ultima: Option<Pesagem>,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "pesagens.html")]
pub struct PesagensPage {
    pub username: String,
    pub is_admin: bool,
    pub pesagens: Vec<Pesagem>,
    pub lotes: Vec<OpcaoLote>,
    pub filtro_ativo: bool,
    pub stats: EstatisticasPeso,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "pesagem_nova.html")]
pub struct NovaPesagemPage {
    pub username: String,
    pub is_admin: bool,
    pub lote: String,
    pub hoje: String,
    pub agora: String,
    pub racas: &'static [&'static str],
    pub lotes: Vec<String>,
    // Resumo do lote escolhido (quando há pesagens nele)
    pub resumo_lote: Option<EstatisticasPeso>,
    pub secoes_lote: Vec<SecaoGrupos>,
    pub pesagens_lote: Vec<Pesagem>,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "relatorios.html")]
pub struct RelatoriosPage {
    pub username: String,
    pub is_admin: bool,
    pub titulo: String,
    pub lotes: Vec<OpcaoLote>,
    // Query string (já codificada) para os links de exportação
    pub query_lote: String,
    pub stats: EstatisticasPeso,
    pub secoes: Vec<SecaoGrupos>,
    pub graficos: Vec<Grafico>,
    // Registos do lote escolhido (vazio no relatório geral)
    pub dados_lote: Vec<Pesagem>,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "conta.html")]
pub struct ContaPage {
    pub username: String,
    pub is_admin: bool,
    pub role: String,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

// Linha da tabela de utilizadores na página de admin
#[derive(Clone, Debug)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub is_admin: bool,
    pub created_at: String,
    pub is_self: bool,
}

impl UserRow {
    pub fn from_user(user: User, current_user_id: i64) -> Self {
        Self {
            id: user.id,
            is_admin: user.is_admin(),
            role: user.role.to_string(),
            created_at: user
                .created_at
                .map(|c| c.format("%d/%m/%Y %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            is_self: user.id == current_user_id,
            username: user.username,
        }
    }
}

#[derive(Template)]
#[template(path = "admin_users.html")]
pub struct AdminUsersPage {
    pub username: String,
    pub is_admin: bool,
    pub users: Vec<UserRow>,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}
