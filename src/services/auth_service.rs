// src/services/auth_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::User,
    services::user_service,
};
use sqlx::SqlitePool;

// Custo baixo nos testes para não gastar segundos por hash
const BCRYPT_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

/// Verifica se a senha fornecida corresponde ao hash guardado.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verificando hash bcrypt...");
        bcrypt::verify(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao verificar senha: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Gera um hash bcrypt (com salt embutido) para uma senha.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Gerando hash bcrypt...");
        bcrypt::hash(&password, BCRYPT_COST)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao gerar hash: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Autentica pelo nome de utilizador. `Ok(None)` quando o user não existe ou a senha não confere.
pub async fn authenticate(
    db_pool: &SqlitePool,
    username: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let username = username.trim();
    let Some(user) = user_service::find_user_by_username(db_pool, username).await? else {
        tracing::warn!("Login falhou: utilizador '{}' não encontrado.", username);
        return Ok(None);
    };

    // Hash que não é bcrypt (ex: legado em texto simples) nunca autentica
    match verify_password(password, &user.password_hash).await {
        Ok(true) => {
            tracing::info!("✅ Utilizador '{}' autenticado.", user.username);
            Ok(Some(user))
        }
        Ok(false) => {
            tracing::warn!("Login falhou: senha incorreta para '{}'.", user.username);
            Ok(None)
        }
        Err(AppError::PasswordHashingError) => {
            tracing::warn!("Hash inválido guardado para '{}', login recusado.", user.username);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, models::user::Role};

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("segredo").await.unwrap();
        assert_ne!(hash, "segredo");
        assert!(verify_password("segredo", &hash).await.unwrap());
        assert!(!verify_password("outra", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let pool = test_pool().await;
        user_service::create_user(&pool, "joao", "senha123", Role::User).await.unwrap();

        let user = authenticate(&pool, "joao", "senha123").await.unwrap().unwrap();
        assert_eq!(user.username, "joao");
        assert_eq!(user.role, Role::User);

        assert!(authenticate(&pool, "joao", "errada").await.unwrap().is_none());
        assert!(authenticate(&pool, "ninguem", "senha123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn plaintext_stored_password_never_authenticates() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO users (username, password_hash, role) VALUES ('velho', 'admin123', 'admin')")
            .execute(&pool)
            .await
            .unwrap();

        assert!(authenticate(&pool, "velho", "admin123").await.unwrap().is_none());
    }
}
