// src/config.rs
use crate::error::{AppError, AppResult};
use std::{env, net::SocketAddr};

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Configuração lida uma única vez no arranque e partilhada via `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub session_inactivity_hours: i64,
    pub secure_cookies: bool,
    // Conta admin criada no primeiro arranque
    pub admin_username: String,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok(); // Carrega .env se existir
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Constrói a configuração a partir de uma função de consulta (facilita testes).
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let server_port = get_or("SERVER_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("SERVER_PORT inválida: {}", e)))?;

        let session_inactivity_hours = get_or("SESSION_INACTIVITY_HOURS", "24")
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| AppError::Config("SESSION_INACTIVITY_HOURS deve ser um inteiro positivo".into()))?;

        let secure_cookies = get_or("SECURE_COOKIES", "false")
            .parse::<bool>()
            .map_err(|e| AppError::Config(format!("SECURE_COOKIES inválido: {}", e)))?;

        let admin_username = get_or("ADMIN_USERNAME", "admin").trim().to_string();
        if admin_username.is_empty() {
            return Err(AppError::Config("ADMIN_USERNAME não pode ser vazio".into()));
        }

        let config = Self {
            database_url: get_or("DATABASE_URL", "sqlite://criacontrol.db"),
            server_host: get_or("SERVER_HOST", "0.0.0.0"),
            server_port,
            session_inactivity_hours,
            secure_cookies,
            admin_username,
            admin_password: get_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        };

        if config.admin_password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!("⚠️ ADMIN_PASSWORD não definida, a usar a senha padrão. Altere-a após o primeiro login!");
        }
        tracing::info!("Configuração carregada.");
        Ok(config)
    }

    pub fn server_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .map_err(|e| AppError::Config(format!("Endereço do servidor inválido: {}", e)))
    }
}
