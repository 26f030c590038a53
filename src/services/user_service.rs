// src/services/user_service.rs
use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::user::{Role, User},
    services::auth_service,
};
use sqlx::SqlitePool;

pub const MIN_PASSWORD_LEN: usize = 4;

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";

fn validar_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(3..=40).contains(&len) {
        return Err(AppError::Validation(
            "O nome de usuário deve ter entre 3 e 40 caracteres.".into(),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "O nome de usuário não pode conter espaços.".into(),
        ));
    }
    Ok(())
}

fn validar_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "A senha deve ter pelo menos {} caracteres.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Busca um utilizador na base de dados pelo seu ID.
pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por ID: {}", user_id);
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

/// Busca um utilizador pelo nome (a coluna é COLLATE NOCASE).
pub async fn find_user_by_username(db_pool: &SqlitePool, username: &str) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por nome: {}", username);
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS))
        .bind(username)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

pub async fn find_all_users(db_pool: &SqlitePool) -> AppResult<Vec<User>> {
    tracing::debug!("Buscando todos os utilizadores...");
    let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY id ASC", USER_COLUMNS))
        .fetch_all(db_pool)
        .await?;
    tracing::debug!("Encontrados {} utilizadores.", users.len());
    Ok(users)
}

/// Cria um utilizador. Nome repetido devolve `UserAlreadyExists` sem tocar na tabela.
pub async fn create_user(
    db_pool: &SqlitePool,
    username: &str,
    raw_password: &str,
    role: Role,
) -> AppResult<User> {
    let username = username.trim();
    tracing::info!("Tentando criar utilizador: {} ({})", username, role);
    validar_username(username)?;
    validar_password(raw_password)?;

    let password_hash = auth_service::hash_password(raw_password).await?;

    // A constraint UNIQUE garante a unicidade mesmo com pedidos concorrentes
    let result = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(username)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(user) => {
            tracing::info!("✅ Utilizador '{}' criado com sucesso (id {}).", user.username, user.id);
            Ok(user)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::warn!("Falha ao criar user: '{}' já existe.", username);
            Err(AppError::UserAlreadyExists(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn update_user_password(
    db_pool: &SqlitePool,
    user_id: i64,
    new_raw_password: &str,
) -> AppResult<()> {
    tracing::info!("Tentando alterar senha para user: {}", user_id);
    validar_password(new_raw_password)?;
    let new_password_hash = auth_service::hash_password(new_raw_password).await?;

    let rows_affected = sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(&new_password_hash)
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao alterar senha: Utilizador '{}' não encontrado.", user_id);
        Err(AppError::NotFound("Usuário".into()))
    } else {
        tracing::info!("✅ Senha alterada com sucesso para user: {}", user_id);
        Ok(())
    }
}

pub async fn update_user_role(db_pool: &SqlitePool, user_id: i64, role: Role) -> AppResult<()> {
    tracing::info!("Atualizando papel do user {} para {}", user_id, role);
    let rows_affected = sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
        .bind(role)
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao atualizar papel: Utilizador '{}' não encontrado.", user_id);
        return Err(AppError::NotFound("Usuário".into()));
    }
    tracing::info!("✅ Papel atualizado para user {}", user_id);
    Ok(())
}

/// Apaga um utilizador; as pesagens dele vão junto (ON DELETE CASCADE).
pub async fn delete_user(db_pool: &SqlitePool, user_id: i64) -> AppResult<()> {
    tracing::info!("Apagando utilizador {}", user_id);
    let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao apagar: Utilizador '{}' não encontrado.", user_id);
        return Err(AppError::NotFound("Usuário".into()));
    }
    tracing::info!("🗑️ Utilizador {} apagado.", user_id);
    Ok(())
}

/// Troca da própria senha: confere a senha atual e a confirmação.
pub async fn change_own_password(
    db_pool: &SqlitePool,
    user_id: i64,
    current_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> AppResult<()> {
    if new_password.is_empty() {
        return Err(AppError::Validation("Digite uma nova senha!".into()));
    }
    if new_password != confirm_password {
        return Err(AppError::Validation("Nova senha e confirmação não coincidem!".into()));
    }

    let user = find_user_by_id(db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário".into()))?;

    // Hash ilegível conta como senha atual incorreta, tal como no login
    let confere = match auth_service::verify_password(current_password, &user.password_hash).await {
        Ok(confere) => confere,
        Err(AppError::PasswordHashingError) => false,
        Err(e) => return Err(e),
    };
    if !confere {
        tracing::warn!("Troca de senha recusada para '{}': senha atual incorreta.", user.username);
        return Err(AppError::InvalidCredentials);
    }

    update_user_password(db_pool, user_id, new_password).await
}

/// Garante que existe pelo menos um admin (cria o da configuração no primeiro arranque).
pub async fn ensure_default_admin(db_pool: &SqlitePool, config: &AppConfig) -> AppResult<()> {
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(db_pool)
        .await?;
    if admins > 0 {
        tracing::debug!("{} admin(s) já existem, nada a criar.", admins);
        return Ok(());
    }

    match create_user(db_pool, &config.admin_username, &config.admin_password, Role::Admin).await {
        Ok(_) => {
            tracing::info!("👤 Admin padrão '{}' criado.", config.admin_username);
            Ok(())
        }
        // O nome já existe como utilizador comum (talvez criado pelo cadastro público):
        // promove-o e repõe a senha da configuração
        Err(AppError::UserAlreadyExists(_)) => {
            let user = find_user_by_username(db_pool, &config.admin_username)
                .await?
                .ok_or(AppError::InternalServerError)?;
            tracing::warn!(
                "Utilizador '{}' promovido a admin, senha reposta para a de ADMIN_PASSWORD.",
                user.username
            );
            update_user_password(db_pool, user.id, &config.admin_password).await?;
            update_user_role(db_pool, user.id, Role::Admin).await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn count_users(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|name| match name {
            "ADMIN_PASSWORD" => Some("chave-forte".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let pool = test_pool().await;
        let user = create_user(&pool, "  maria ", "1234", Role::User).await.unwrap();
        assert_eq!(user.username, "maria");
        assert_eq!(user.role, Role::User);
        assert!(user.created_at.is_some());

        let found = find_user_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(found.username, "maria");
        let by_name = find_user_by_username(&pool, "MARIA").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_fails_without_mutation() {
        let pool = test_pool().await;
        create_user(&pool, "pedro", "1234", Role::User).await.unwrap();
        let before = count_users(&pool).await;

        let err = create_user(&pool, "pedro", "outra-senha", Role::Admin).await.unwrap_err();
        assert!(matches!(err, AppError::UserAlreadyExists(ref u) if u == "pedro"));
        assert_eq!(count_users(&pool).await, before);

        // O registo original não muda (papel continua user)
        let user = find_user_by_username(&pool, "pedro").await.unwrap().unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn create_user_validates_input() {
        let pool = test_pool().await;
        assert!(matches!(
            create_user(&pool, "ab", "1234", Role::User).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_user(&pool, "ana", "123", Role::User).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(count_users(&pool).await, 0);
    }

    #[tokio::test]
    async fn role_password_and_delete_report_not_found() {
        let pool = test_pool().await;
        assert!(matches!(update_user_role(&pool, 99, Role::Admin).await, Err(AppError::NotFound(_))));
        assert!(matches!(update_user_password(&pool, 99, "1234").await, Err(AppError::NotFound(_))));
        assert!(matches!(delete_user(&pool, 99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn admin_updates_role_and_password() {
        let pool = test_pool().await;
        let user = create_user(&pool, "carla", "1234", Role::User).await.unwrap();

        update_user_role(&pool, user.id, Role::Admin).await.unwrap();
        update_user_password(&pool, user.id, "nova-senha").await.unwrap();

        let user = find_user_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(user.is_admin());
        assert!(auth_service::authenticate(&pool, "carla", "nova-senha").await.unwrap().is_some());
        assert!(auth_service::authenticate(&pool, "carla", "1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn change_own_password_checks_current_and_confirmation() {
        let pool = test_pool().await;
        let user = create_user(&pool, "rui", "antiga", Role::User).await.unwrap();

        assert!(matches!(
            change_own_password(&pool, user.id, "antiga", "nova1", "nova2").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            change_own_password(&pool, user.id, "errada", "nova1", "nova1").await,
            Err(AppError::InvalidCredentials)
        ));
        change_own_password(&pool, user.id, "antiga", "nova1", "nova1").await.unwrap();
        assert!(auth_service::authenticate(&pool, "rui", "nova1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn default_admin_created_once() {
        let pool = test_pool().await;
        let config = test_config();

        ensure_default_admin(&pool, &config).await.unwrap();
        ensure_default_admin(&pool, &config).await.unwrap();

        let users = find_all_users(&pool).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "admin");
        assert!(users[0].is_admin());
        assert!(auth_service::authenticate(&pool, "admin", "chave-forte").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn default_admin_promotes_existing_user() {
        let pool = test_pool().await;
        create_user(&pool, "admin", "qualquer", Role::User).await.unwrap();

        ensure_default_admin(&pool, &test_config()).await.unwrap();

        let admin = find_user_by_username(&pool, "admin").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(find_all_users(&pool).await.unwrap().len(), 1);
        // A senha escolhida no cadastro deixa de valer
        assert!(auth_service::authenticate(&pool, "admin", "qualquer").await.unwrap().is_none());
        assert!(auth_service::authenticate(&pool, "admin", "chave-forte").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn change_own_password_with_unreadable_hash_is_refused() {
        let pool = test_pool().await;
        let user = create_user(&pool, "zeca", "1234", Role::User).await.unwrap();
        sqlx::query("UPDATE users SET password_hash = 'texto-simples' WHERE id = ?1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            change_own_password(&pool, user.id, "texto-simples", "nova", "nova").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
