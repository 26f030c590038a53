// src/services/pesagem_service.rs
use crate::{
    error::{AppError, AppResult},
    models::pesagem::{normalizar_raca, EstatisticasPeso, NovaPesagem, Pesagem, PesagemForm, Sexo},
};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use sqlx::SqlitePool;
use uuid::Uuid;

const PESAGEM_COLUMNS: &str = "id, user_id, numero_bezerro, lote, data_pesagem, horario_pesagem, \
                               sexo, raca, peso_kg, observacoes, created_at";

/// Gera um ID no formato BZ-YYYYMMDD-XXXX.
pub fn gerar_id_automatico(data: NaiveDate) -> String {
    let uid = Uuid::new_v4().simple().to_string();
    format!("BZ-{}-{}", data.format("%Y%m%d"), uid[..4].to_uppercase())
}

/// Converte o peso digitado ("50", "50.5" ou "50,5") num número positivo.
pub fn parse_peso(valor: &str) -> AppResult<f64> {
    let normalizado = valor.trim().replace(',', ".");
    let peso: f64 = normalizado
        .parse()
        .map_err(|_| AppError::Validation(format!("Peso inválido: '{}'. Use um número, ex: 52.5", valor.trim())))?;
    if !peso.is_finite() || peso <= 0.0 {
        return Err(AppError::Validation("O peso deve ser maior que zero.".into()));
    }
    Ok(peso)
}

fn texto_opcional(valor: Option<&str>) -> Option<&str> {
    valor.map(str::trim).filter(|v| !v.is_empty())
}

impl NovaPesagem {
    /// Valida o formulário. Data e horário vazios assumem `agora`.
    pub fn from_form(form: &PesagemForm, agora: NaiveDateTime) -> AppResult<Self> {
        let data_pesagem = match texto_opcional(form.data_pesagem.as_deref()) {
            Some(data) => NaiveDate::parse_from_str(data, "%Y-%m-%d")
                .map_err(|_| AppError::Validation(format!("Data inválida: '{}'", data)))?,
            None => agora.date(),
        };

        let horario_pesagem = match texto_opcional(form.horario_pesagem.as_deref()) {
            Some(hora) => NaiveTime::parse_from_str(hora, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(hora, "%H:%M"))
                .map_err(|_| AppError::Validation(format!("Horário inválido: '{}'", hora)))?,
            None => {
                let hora = agora.time();
                hora.with_nanosecond(0).unwrap_or(hora)
            }
        };

        let numero_bezerro = if form.auto_id.is_some() {
            gerar_id_automatico(agora.date())
        } else {
            form.numero_bezerro.trim().to_string()
        };
        let lote = form.lote.trim().to_string();
        if numero_bezerro.is_empty() || lote.is_empty() {
            return Err(AppError::Validation("Preencha número e lote!".into()));
        }

        let sexo = Sexo::parse(&form.sexo)
            .ok_or_else(|| AppError::Validation(format!("Sexo inválido: '{}'", form.sexo.trim())))?;

        let raca = normalizar_raca(&form.raca);
        if raca.is_empty() {
            return Err(AppError::Validation("Informe a raça.".into()));
        }

        Ok(Self {
            numero_bezerro,
            lote,
            data_pesagem,
            horario_pesagem,
            sexo,
            raca,
            peso_kg: parse_peso(&form.peso_kg)?,
            observacoes: texto_opcional(form.observacoes.as_deref()).map(str::to_string),
        })
    }
}

/// Valida o formulário com a hora local atual.
pub fn validar_formulario(form: &PesagemForm) -> AppResult<NovaPesagem> {
    NovaPesagem::from_form(form, Local::now().naive_local())
}

/// Insere uma pesagem do utilizador e devolve a linha criada.
pub async fn adicionar_pesagem(
    db_pool: &SqlitePool,
    user_id: i64,
    nova: &NovaPesagem,
) -> AppResult<Pesagem> {
    tracing::debug!("Adicionando pesagem {} (lote {}) para user {}", nova.numero_bezerro, nova.lote, user_id);
    let pesagem = sqlx::query_as::<_, Pesagem>(&format!(
        r#"
        INSERT INTO pesagens
            (user_id, numero_bezerro, lote, data_pesagem, horario_pesagem, sexo, raca, peso_kg, observacoes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING {}
        "#,
        PESAGEM_COLUMNS
    ))
    .bind(user_id)
    .bind(&nova.numero_bezerro)
    .bind(&nova.lote)
    .bind(nova.data_pesagem)
    .bind(nova.horario_pesagem)
    .bind(nova.sexo)
    .bind(&nova.raca)
    .bind(nova.peso_kg)
    .bind(&nova.observacoes)
    .fetch_one(db_pool)
    .await?;

    tracing::info!("✅ Pesagem {} salva ({} kg).", pesagem.numero_bezerro, pesagem.peso_fmt());
    Ok(pesagem)
}

/// Pesagens do utilizador, mais recentes primeiro (data, depois id). `lote` filtra opcionalmente.
pub async fn listar_pesagens(
    db_pool: &SqlitePool,
    user_id: i64,
    lote: Option<&str>,
) -> AppResult<Vec<Pesagem>> {
    tracing::debug!("Listando pesagens do user {} (lote: {:?})", user_id, lote);
    let pesagens = sqlx::query_as::<_, Pesagem>(&format!(
        r#"
        SELECT {}
        FROM pesagens
        WHERE user_id = ?1 AND (?2 IS NULL OR lote = ?2)
        ORDER BY data_pesagem DESC, id DESC
        "#,
        PESAGEM_COLUMNS
    ))
    .bind(user_id)
    .bind(lote)
    .fetch_all(db_pool)
    .await?;
    Ok(pesagens)
}

pub async fn buscar_ultima_pesagem(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<Pesagem>> {
    let pesagem = sqlx::query_as::<_, Pesagem>(&format!(
        "SELECT {} FROM pesagens WHERE user_id = ?1 ORDER BY data_pesagem DESC, id DESC LIMIT 1",
        PESAGEM_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?;
    Ok(pesagem)
}

/// Apaga uma pesagem do próprio utilizador; id inexistente (ou de outro user) é `NotFound`.
pub async fn deletar_pesagem(db_pool: &SqlitePool, user_id: i64, pesagem_id: i64) -> AppResult<()> {
    let rows_affected = sqlx::query("DELETE FROM pesagens WHERE id = ?1 AND user_id = ?2")
        .bind(pesagem_id)
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Pesagem {} não encontrada para user {}.", pesagem_id, user_id);
        return Err(AppError::NotFound("Pesagem".into()));
    }
    tracing::info!("🗑️ Pesagem {} apagada (user {}).", pesagem_id, user_id);
    Ok(())
}

/// Apaga todas as pesagens do utilizador e devolve quantas foram removidas.
pub async fn limpar_pesagens(db_pool: &SqlitePool, user_id: i64) -> AppResult<u64> {
    let removidas = sqlx::query("DELETE FROM pesagens WHERE user_id = ?1")
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();
    tracing::info!("🧹 {} pesagens apagadas para user {}.", removidas, user_id);
    Ok(removidas)
}

pub async fn listar_lotes(db_pool: &SqlitePool, user_id: i64) -> AppResult<Vec<String>> {
    let lotes = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT lote FROM pesagens WHERE user_id = ?1 ORDER BY lote ASC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(lotes)
}

/// Estatísticas calculadas pela própria DB (sem cache, recalculadas a cada chamada).
pub async fn calcular_estatisticas(db_pool: &SqlitePool, user_id: i64) -> AppResult<EstatisticasPeso> {
    let (total, soma, media, minimo, maximo): (i64, f64, Option<f64>, Option<f64>, Option<f64>) =
        sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(peso_kg), 0.0), AVG(peso_kg), MIN(peso_kg), MAX(peso_kg)
            FROM pesagens
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(db_pool)
        .await?;

    Ok(EstatisticasPeso {
        total,
        soma,
        media,
        minimo,
        maximo,
    })
}
