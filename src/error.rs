// src/error.rs
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Falhas de ligação (pool esgotado/fechado, I/O) ficam separadas dos restantes erros de DB
    #[error("Falha de ligação à base de dados: {0}")]
    Connectivity(sqlx::Error),

    #[error("Erro na base de dados: {0}")]
    SqlxError(sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Usuário '{0}' já existe")]
    UserAlreadyExists(String),

    #[error("Dados inválidos: {0}")]
    Validation(String),

    #[error("Erro ao processar password")]
    PasswordHashingError,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    #[error("Erro ao gerar exportação: {0}")]
    Export(String),

    #[error("Erro interno inesperado")]
    InternalServerError,

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Acesso negado")]
    Forbidden,
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => AppError::Connectivity(err),
            other => AppError::SqlxError(other),
        }
    }
}

impl AppError {
    /// Mensagem segura para mostrar ao utilizador (sem detalhes internos).
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(what) => format!("{} não encontrado.", what),
            AppError::UserAlreadyExists(username) => format!("Usuário '{}' já existe.", username),
            AppError::Validation(msg) => msg.clone(),
            AppError::InvalidCredentials => "Usuário ou senha inválidos.".to_string(),
            AppError::Connectivity(_) => {
                "Base de dados indisponível. Tente novamente em instantes.".to_string()
            }
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => {
                "Erro ao aceder aos dados.".to_string()
            }
            AppError::Config(_) => "Erro de configuração.".to_string(),
            AppError::PasswordHashingError => "Erro ao processar credenciais.".to_string(),
            AppError::SessionError(_) => "Erro na gestão da sua sessão.".to_string(),
            AppError::Export(_) => "Não foi possível gerar o arquivo.".to_string(),
            AppError::Forbidden => "Acesso negado. Apenas administradores.".to_string(),
            AppError::Unauthorized => "Faça login para continuar.".to_string(),
            AppError::InternalServerError => "Ocorreu um erro inesperado.".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UserAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // Sem sessão válida: volta para o login em vez de mostrar página de erro
        if matches!(self, AppError::Unauthorized) {
            tracing::debug!("Pedido não autenticado, redirecionando para /login");
            return Redirect::to("/login").into_response();
        }

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Erro processado: {:?}", self);
        } else {
            tracing::warn!("Erro processado: {:?}", self);
        }

        let message = self.user_message();
        (status, Html(format!(r#"
            <!DOCTYPE html><html><head><title>Erro</title><style>body{{font-family:sans-serif;}}</style></head>
            <body><h1>Erro {status_code}</h1><p>{message}</p><a href="javascript:history.back()">Voltar</a></body></html>
         "#, status_code=status.as_u16(), message=html_escape(&message)))).into_response()
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_connectivity() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Connectivity(_)));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn row_not_found_is_plain_db_error() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::SqlxError(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn distinct_status_per_category() {
        assert_eq!(AppError::NotFound("Pesagem".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::UserAlreadyExists("ana".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Validation("peso".into()).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
