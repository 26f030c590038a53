// src/models/relatorio.rs
use crate::models::pesagem::EstatisticasPeso;
use serde::Serialize;

/// Eixos de agrupamento usados nos relatórios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eixo {
    Sexo,
    Raca,
    SexoRaca,
    Lote,
}

/// Estatísticas de um grupo (ex: "Macho", "Fêmea Cruzado", "LOTE 1").
#[derive(Debug, Clone, Serialize)]
pub struct GrupoEstatistica {
    pub rotulo: String,
    pub stats: EstatisticasPeso,
}

/// Uma barra de gráfico, com percentual já relativo à maior barra (0..=100).
#[derive(Debug, Clone, Serialize)]
pub struct BarraGrafico {
    pub rotulo: String,
    pub valor: f64,
    pub percentual: u32,
}

impl BarraGrafico {
    pub fn valor_fmt(&self) -> String {
        format!("{:.1}", self.valor)
    }
}

/// Classe do histograma de pesos: intervalo [inicio, fim) (a última inclui o fim).
#[derive(Debug, Clone, Serialize)]
pub struct ClasseHistograma {
    pub inicio: f64,
    pub fim: f64,
    pub quantidade: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Grafico {
    pub titulo: String,
    pub barras: Vec<BarraGrafico>,
}

/// Relatório completo de um conjunto de pesagens (todas ou de um lote).
#[derive(Debug, Clone, Serialize)]
pub struct Relatorio {
    pub titulo: String,
    pub lote: Option<String>,
    pub geral: EstatisticasPeso,
    pub por_sexo: Vec<GrupoEstatistica>,
    pub por_raca: Vec<GrupoEstatistica>,
    pub por_combinacao: Vec<GrupoEstatistica>,
    pub por_lote: Vec<GrupoEstatistica>,
    pub histograma: Vec<ClasseHistograma>,
}
