// src/models/pesagem.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Sexo do animal. Guardado na DB sempre como "M" ou "F".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Sexo {
    #[sqlx(rename = "M")]
    #[serde(rename = "M")]
    Macho,
    #[sqlx(rename = "F")]
    #[serde(rename = "F")]
    Femea,
}

impl Sexo {
    /// Aceita tanto o código curto ("M"/"F") como a forma longa ("Macho"/"Fêmea").
    pub fn parse(valor: &str) -> Option<Self> {
        match valor.trim().to_lowercase().as_str() {
            "m" | "macho" => Some(Sexo::Macho),
            "f" | "femea" | "fêmea" => Some(Sexo::Femea),
            _ => None,
        }
    }

    pub fn codigo(&self) -> &'static str {
        match self {
            Sexo::Macho => "M",
            Sexo::Femea => "F",
        }
    }

    pub fn nome(&self) -> &'static str {
        match self {
            Sexo::Macho => "Macho",
            Sexo::Femea => "Fêmea",
        }
    }
}

impl fmt::Display for Sexo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nome())
    }
}

pub const RACAS_SUGERIDAS: &[&str] = &["Zebuinos", "Cruzado"];

/// Normaliza a raça digitada (apara espaços, "Zebu" vira "Zebuinos").
pub fn normalizar_raca(raca: &str) -> String {
    let raca = raca.trim();
    if raca.eq_ignore_ascii_case("zebu") || raca.eq_ignore_ascii_case("zebuinos") || raca == "Zebuínos" {
        return "Zebuinos".to_string();
    }
    if raca.eq_ignore_ascii_case("cruzado") {
        return "Cruzado".to_string();
    }
    raca.to_string()
}

// Uma linha da tabela `pesagens`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Pesagem {
    pub id: i64,
    pub user_id: i64,
    pub numero_bezerro: String,
    pub lote: String,
    pub data_pesagem: NaiveDate,
    pub horario_pesagem: NaiveTime,
    pub sexo: Sexo,
    pub raca: String,
    pub peso_kg: f64,
    pub observacoes: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl Pesagem {
    pub fn peso_fmt(&self) -> String {
        format!("{:.1}", self.peso_kg)
    }

    pub fn data_fmt(&self) -> String {
        self.data_pesagem.format("%d/%m/%Y").to_string()
    }

    pub fn horario_fmt(&self) -> String {
        self.horario_pesagem.format("%H:%M").to_string()
    }

    pub fn observacoes_txt(&self) -> &str {
        self.observacoes.as_deref().unwrap_or("")
    }
}

/// Campos brutos do formulário "Nova Pesagem" (tudo texto para validar à mão).
#[derive(Debug, Default, Deserialize)]
pub struct PesagemForm {
    #[serde(default)]
    pub numero_bezerro: String,
    // Checkbox: presente ("on") quando o ID deve ser gerado automaticamente
    pub auto_id: Option<String>,
    #[serde(default)]
    pub lote: String,
    pub data_pesagem: Option<String>,
    pub horario_pesagem: Option<String>,
    #[serde(default)]
    pub sexo: String,
    #[serde(default)]
    pub raca: String,
    #[serde(default)]
    pub peso_kg: String,
    pub observacoes: Option<String>,
}

/// Pesagem já validada, pronta a inserir.
#[derive(Debug, Clone, PartialEq)]
pub struct NovaPesagem {
    pub numero_bezerro: String,
    pub lote: String,
    pub data_pesagem: NaiveDate,
    pub horario_pesagem: NaiveTime,
    pub sexo: Sexo,
    pub raca: String,
    pub peso_kg: f64,
    pub observacoes: Option<String>,
}

/// Estatísticas de peso de um conjunto de pesagens.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstatisticasPeso {
    pub total: i64,
    pub soma: f64,
    pub media: Option<f64>,
    pub minimo: Option<f64>,
    pub maximo: Option<f64>,
}

fn fmt_opcional(valor: Option<f64>) -> String {
    valor.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

impl EstatisticasPeso {
    pub fn from_pesos<I>(pesos: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut stats = Self::default();
        for peso in pesos {
            stats.total += 1;
            stats.soma += peso;
            stats.minimo = Some(stats.minimo.map_or(peso, |m| m.min(peso)));
            stats.maximo = Some(stats.maximo.map_or(peso, |m| m.max(peso)));
        }
        if stats.total > 0 {
            stats.media = Some(stats.soma / stats.total as f64);
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn soma_fmt(&self) -> String {
        format!("{:.1}", self.soma)
    }

    pub fn media_fmt(&self) -> String {
        fmt_opcional(self.media)
    }

    pub fn minimo_fmt(&self) -> String {
        fmt_opcional(self.minimo)
    }

    pub fn maximo_fmt(&self) -> String {
        fmt_opcional(self.maximo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sexo_accepts_short_and_long_forms() {
        assert_eq!(Sexo::parse("M"), Some(Sexo::Macho));
        assert_eq!(Sexo::parse("macho"), Some(Sexo::Macho));
        assert_eq!(Sexo::parse("Fêmea"), Some(Sexo::Femea));
        assert_eq!(Sexo::parse(" Femea "), Some(Sexo::Femea));
        assert_eq!(Sexo::parse("x"), None);
    }

    #[test]
    fn raca_normalization() {
        assert_eq!(normalizar_raca(" Zebu "), "Zebuinos");
        assert_eq!(normalizar_raca("cruzado"), "Cruzado");
        assert_eq!(normalizar_raca("Nelore"), "Nelore");
    }

    #[test]
    fn stats_from_weights() {
        let stats = EstatisticasPeso::from_pesos([40.0, 50.0, 60.0]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.soma, 150.0);
        assert_eq!(stats.media, Some(50.0));
        assert_eq!(stats.minimo, Some(40.0));
        assert_eq!(stats.maximo, Some(60.0));
        assert_eq!(stats.media_fmt(), "50.0");
    }

    #[test]
    fn empty_stats_show_dash() {
        let stats = EstatisticasPeso::from_pesos(Vec::new());
        assert!(stats.is_empty());
        assert_eq!(stats.media, None);
        assert_eq!(stats.media_fmt(), "-");
        assert_eq!(stats.soma_fmt(), "0.0");
    }
}
