// src/services/relatorio_service.rs
//
// Agregações dos relatórios. Tudo em memória sobre a lista já filtrada,
// para que painel, página de relatórios e exportações mostrem os mesmos números.
use crate::models::{
    pesagem::{EstatisticasPeso, Pesagem},
    relatorio::{BarraGrafico, ClasseHistograma, Eixo, Grafico, GrupoEstatistica, Relatorio},
};
use std::collections::BTreeMap;

pub const CLASSES_HISTOGRAMA: usize = 10;

pub fn estatisticas(pesagens: &[Pesagem]) -> EstatisticasPeso {
    EstatisticasPeso::from_pesos(pesagens.iter().map(|p| p.peso_kg))
}

fn rotulo(pesagem: &Pesagem, eixo: Eixo) -> String {
    match eixo {
        Eixo::Sexo => pesagem.sexo.nome().to_string(),
        Eixo::Raca => pesagem.raca.clone(),
        Eixo::SexoRaca => format!("{} {}", pesagem.sexo.nome(), pesagem.raca),
        Eixo::Lote => pesagem.lote.clone(),
    }
}

/// Agrupa as pesagens pelo eixo pedido, grupos ordenados pelo rótulo.
pub fn agrupar(pesagens: &[Pesagem], eixo: Eixo) -> Vec<GrupoEstatistica> {
    let mut grupos: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for pesagem in pesagens {
        grupos.entry(rotulo(pesagem, eixo)).or_default().push(pesagem.peso_kg);
    }
    grupos
        .into_iter()
        .map(|(rotulo, pesos)| GrupoEstatistica {
            rotulo,
            stats: EstatisticasPeso::from_pesos(pesos),
        })
        .collect()
}

/// Histograma de pesos com `classes` intervalos iguais entre o mínimo e o máximo.
pub fn histograma(pesagens: &[Pesagem], classes: usize) -> Vec<ClasseHistograma> {
    let stats = estatisticas(pesagens);
    let (Some(minimo), Some(maximo)) = (stats.minimo, stats.maximo) else {
        return Vec::new();
    };
    if classes == 0 {
        return Vec::new();
    }

    // Todos os pesos iguais: uma única classe
    if maximo <= minimo {
        return vec![ClasseHistograma {
            inicio: minimo,
            fim: maximo,
            quantidade: pesagens.len(),
        }];
    }

    let largura = (maximo - minimo) / classes as f64;
    let mut contagens = vec![0usize; classes];
    for pesagem in pesagens {
        let indice = ((pesagem.peso_kg - minimo) / largura) as usize;
        contagens[indice.min(classes - 1)] += 1;
    }

    contagens
        .into_iter()
        .enumerate()
        .map(|(i, quantidade)| ClasseHistograma {
            inicio: minimo + largura * i as f64,
            fim: minimo + largura * (i + 1) as f64,
            quantidade,
        })
        .collect()
}

/// Converte pares (rótulo, valor) em barras com percentual relativo à maior.
pub fn barras(valores: impl IntoIterator<Item = (String, f64)>) -> Vec<BarraGrafico> {
    let valores: Vec<(String, f64)> = valores.into_iter().collect();
    let maior = valores.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    valores
        .into_iter()
        .map(|(rotulo, valor)| {
            let percentual = if maior > 0.0 {
                ((valor / maior) * 100.0).round().clamp(0.0, 100.0) as u32
            } else {
                0
            };
            BarraGrafico {
                rotulo,
                valor,
                percentual,
            }
        })
        .collect()
}

/// Barras com a média de peso de cada grupo.
pub fn barras_media(grupos: &[GrupoEstatistica]) -> Vec<BarraGrafico> {
    barras(
        grupos
            .iter()
            .map(|g| (g.rotulo.clone(), g.stats.media.unwrap_or(0.0))),
    )
}

pub fn montar_relatorio(titulo: &str, lote: Option<&str>, pesagens: &[Pesagem]) -> Relatorio {
    tracing::debug!("Montando relatório '{}' com {} pesagens", titulo, pesagens.len());
    Relatorio {
        titulo: titulo.to_string(),
        lote: lote.map(str::to_string),
        geral: estatisticas(pesagens),
        por_sexo: agrupar(pesagens, Eixo::Sexo),
        por_raca: agrupar(pesagens, Eixo::Raca),
        por_combinacao: agrupar(pesagens, Eixo::SexoRaca),
        por_lote: agrupar(pesagens, Eixo::Lote),
        histograma: histograma(pesagens, CLASSES_HISTOGRAMA),
    }
}

impl Relatorio {
    /// Os quatro gráficos do relatório: médias por sexo, raça, combinação e a distribuição de pesos.
    pub fn graficos(&self) -> Vec<Grafico> {
        let distribuicao = barras(
            self.histograma
                .iter()
                .map(|c| (format!("{:.0}-{:.0}", c.inicio, c.fim), c.quantidade as f64)),
        );
        vec![
            Grafico {
                titulo: "Média por Sexo".to_string(),
                barras: barras_media(&self.por_sexo),
            },
            Grafico {
                titulo: "Média por Raça".to_string(),
                barras: barras_media(&self.por_raca),
            },
            Grafico {
                titulo: "Média por Combinação".to_string(),
                barras: barras_media(&self.por_combinacao),
            },
            Grafico {
                titulo: "Distribuição de Peso".to_string(),
                barras: distribuicao,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pesagem::Sexo;
    use chrono::{NaiveDate, NaiveTime};

    fn pesagem(id: i64, lote: &str, sexo: Sexo, raca: &str, peso: f64) -> Pesagem {
        Pesagem {
            id,
            user_id: 1,
            numero_bezerro: format!("BZ-{}", id),
            lote: lote.to_string(),
            data_pesagem: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            horario_pesagem: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            sexo,
            raca: raca.to_string(),
            peso_kg: peso,
            observacoes: None,
            created_at: None,
        }
    }

    fn cenario() -> Vec<Pesagem> {
        vec![
            pesagem(1, "L1", Sexo::Macho, "Zebuinos", 40.0),
            pesagem(2, "L1", Sexo::Femea, "Cruzado", 50.0),
            pesagem(3, "L1", Sexo::Macho, "Cruzado", 60.0),
        ]
    }

    fn grupo<'a>(grupos: &'a [GrupoEstatistica], rotulo: &str) -> &'a GrupoEstatistica {
        grupos.iter().find(|g| g.rotulo == rotulo).unwrap()
    }

    #[test]
    fn scenario_means_by_sex() {
        let relatorio = montar_relatorio("Relatorio_L1", Some("L1"), &cenario());
        assert_eq!(relatorio.geral.total, 3);
        assert_eq!(relatorio.geral.media, Some(50.0));
        assert_eq!(grupo(&relatorio.por_sexo, "Macho").stats.media, Some(50.0));
        assert_eq!(grupo(&relatorio.por_sexo, "Macho").stats.total, 2);
        assert_eq!(grupo(&relatorio.por_sexo, "Fêmea").stats.media, Some(50.0));
        assert_eq!(grupo(&relatorio.por_sexo, "Fêmea").stats.total, 1);
    }

    #[test]
    fn breed_and_cross_product_groups() {
        let pesagens = cenario();
        let por_raca = agrupar(&pesagens, Eixo::Raca);
        assert_eq!(por_raca.len(), 2);
        assert_eq!(grupo(&por_raca, "Cruzado").stats.media, Some(55.0));
        assert_eq!(grupo(&por_raca, "Zebuinos").stats.total, 1);

        let combinacao = agrupar(&pesagens, Eixo::SexoRaca);
        let rotulos: Vec<&str> = combinacao.iter().map(|g| g.rotulo.as_str()).collect();
        assert_eq!(rotulos, vec!["Fêmea Cruzado", "Macho Cruzado", "Macho Zebuinos"]);
    }

    #[test]
    fn mean_equals_sum_over_count_to_one_decimal() {
        let pesagens = vec![
            pesagem(1, "A", Sexo::Macho, "Cruzado", 33.3),
            pesagem(2, "A", Sexo::Femea, "Cruzado", 41.7),
            pesagem(3, "B", Sexo::Femea, "Zebuinos", 52.25),
        ];
        let stats = estatisticas(&pesagens);
        let soma: f64 = pesagens.iter().map(|p| p.peso_kg).sum();
        assert_eq!(format!("{:.1}", soma / pesagens.len() as f64), stats.media_fmt());
    }

    #[test]
    fn histogram_counts_every_weight() {
        let pesagens = cenario();
        let classes = histograma(&pesagens, CLASSES_HISTOGRAMA);
        assert_eq!(classes.len(), CLASSES_HISTOGRAMA);
        assert_eq!(classes.iter().map(|c| c.quantidade).sum::<usize>(), 3);
        assert_eq!(classes[0].quantidade, 1);
        assert_eq!(classes[CLASSES_HISTOGRAMA - 1].quantidade, 1);
        assert_eq!(classes[0].inicio, 40.0);
    }

    #[test]
    fn histogram_of_equal_weights_has_one_class() {
        let pesagens = vec![pesagem(1, "A", Sexo::Macho, "Cruzado", 50.0), pesagem(2, "A", Sexo::Macho, "Cruzado", 50.0)];
        let classes = histograma(&pesagens, CLASSES_HISTOGRAMA);
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].quantidade, 2);
        assert!(histograma(&[], CLASSES_HISTOGRAMA).is_empty());
    }

    #[test]
    fn bars_are_scaled_to_largest() {
        let barras = barras(vec![("a".to_string(), 25.0), ("b".to_string(), 100.0), ("c".to_string(), 0.0)]);
        let percentuais: Vec<u32> = barras.iter().map(|b| b.percentual).collect();
        assert_eq!(percentuais, vec![25, 100, 0]);
    }

    #[test]
    fn report_has_four_charts() {
        let relatorio = montar_relatorio("Relatorio_Geral", None, &cenario());
        let graficos = relatorio.graficos();
        assert_eq!(graficos.len(), 4);
        assert_eq!(graficos[0].barras.len(), 2);
        assert_eq!(graficos[3].barras.len(), CLASSES_HISTOGRAMA);
    }

    #[test]
    fn empty_report() {
        let relatorio = montar_relatorio("Relatorio_Geral", None, &[]);
        assert!(relatorio.geral.is_empty());
        assert!(relatorio.por_sexo.is_empty());
        assert!(relatorio.histograma.is_empty());
    }
}
