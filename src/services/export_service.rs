// src/services/export_service.rs
//
// Exportações do conjunto de pesagens: planilha .xlsx e relatório .pdf.
use crate::{
    error::{AppError, AppResult},
    models::{
        pesagem::Pesagem,
        relatorio::{Grafico, Relatorio},
    },
};
use chrono::Local;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};
use rust_xlsxwriter::{Format, Workbook};

pub const MAX_LINHAS_COM_GRAFICOS: usize = 30;
pub const MAX_LINHAS_SEM_GRAFICOS: usize = 50;

const COLUNAS_EXCEL: [&str; 10] = [
    "id",
    "numero_bezerro",
    "lote",
    "data_pesagem",
    "horario_pesagem",
    "sexo",
    "raca",
    "peso_kg",
    "observacoes",
    "created_at",
];

/// Conjunto exportado: o que decide título e nome do ficheiro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscopoExport {
    Geral,
    TodosLotes,
    Lote(String),
}

impl EscopoExport {
    /// `escopo=geral` vem do painel; sem lote é o relatório de todos os lotes.
    pub fn from_query(escopo: Option<&str>, lote: Option<&str>) -> Self {
        match lote.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lote) => EscopoExport::Lote(lote.to_string()),
            None if escopo == Some("geral") => EscopoExport::Geral,
            None => EscopoExport::TodosLotes,
        }
    }

    pub fn lote(&self) -> Option<&str> {
        match self {
            EscopoExport::Lote(lote) => Some(lote),
            _ => None,
        }
    }

    pub fn titulo(&self) -> String {
        match self {
            EscopoExport::Geral => "Relatorio_Geral".to_string(),
            EscopoExport::TodosLotes => "Relatorio_Todos_Lotes".to_string(),
            EscopoExport::Lote(lote) => format!("Relatorio_{}", lote),
        }
    }

    pub fn nome_arquivo(&self, extensao: &str) -> String {
        let base = match self {
            EscopoExport::Geral => "relatorio_geral".to_string(),
            EscopoExport::TodosLotes => "relatorio_todos_lotes".to_string(),
            EscopoExport::Lote(lote) => format!("relatorio_{}", sanitizar_nome(lote)),
        };
        format!("{}.{}", base, extensao)
    }
}

// Só letras, dígitos, '-' e '_' no nome do ficheiro (vai no Content-Disposition)
fn sanitizar_nome(valor: &str) -> String {
    let limpo: String = dobrar_acentos(valor)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if limpo.is_empty() { "lote".to_string() } else { limpo }
}

/// Troca letras acentuadas pela base ASCII; o resto fora de ASCII vira '?'.
/// As fontes embutidas do PDF só cobrem Latin-1 básico.
pub fn dobrar_acentos(texto: &str) -> String {
    texto
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

fn cortar(texto: &str, max: usize) -> String {
    texto.chars().take(max).collect()
}

// --- Excel ---

/// Planilha com uma aba "Dados": cabeçalho em negrito e uma linha por pesagem.
pub fn gerar_excel(pesagens: &[Pesagem]) -> AppResult<Vec<u8>> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| {
        tracing::error!("Erro ao gerar Excel: {:?}", e);
        AppError::Export(format!("Falha ao gerar Excel: {}", e))
    };

    let mut workbook = Workbook::new();
    let negrito = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Dados").map_err(xlsx_err)?;

    for (col, nome) in COLUNAS_EXCEL.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *nome, &negrito)
            .map_err(xlsx_err)?;
    }

    for (i, p) in pesagens.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, p.id as f64).map_err(xlsx_err)?;
        worksheet.write_string(row, 1, &p.numero_bezerro).map_err(xlsx_err)?;
        worksheet.write_string(row, 2, &p.lote).map_err(xlsx_err)?;
        worksheet
            .write_string(row, 3, p.data_pesagem.format("%Y-%m-%d").to_string())
            .map_err(xlsx_err)?;
        worksheet
            .write_string(row, 4, p.horario_pesagem.format("%H:%M:%S").to_string())
            .map_err(xlsx_err)?;
        worksheet.write_string(row, 5, p.sexo.codigo()).map_err(xlsx_err)?;
        worksheet.write_string(row, 6, &p.raca).map_err(xlsx_err)?;
        worksheet.write_number(row, 7, p.peso_kg).map_err(xlsx_err)?;
        worksheet.write_string(row, 8, p.observacoes_txt()).map_err(xlsx_err)?;
        let criado = p
            .created_at
            .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        worksheet.write_string(row, 9, criado).map_err(xlsx_err)?;
    }
    worksheet.autofit();

    let bytes = workbook.save_to_buffer().map_err(xlsx_err)?;
    tracing::info!("📊 Excel gerado com {} linhas.", pesagens.len());
    Ok(bytes)
}

// --- PDF ---

/// Linhas da tabela do PDF (já cortadas) e a linha final quando há truncagem.
pub fn linhas_tabela_pdf(pesagens: &[Pesagem], incluir_graficos: bool) -> (Vec<[String; 6]>, Option<String>) {
    let limite = if incluir_graficos { MAX_LINHAS_COM_GRAFICOS } else { MAX_LINHAS_SEM_GRAFICOS };
    let linhas = pesagens
        .iter()
        .take(limite)
        .map(|p| {
            [
                dobrar_acentos(&cortar(&p.numero_bezerro, 15)),
                dobrar_acentos(&cortar(&p.lote, 12)),
                p.data_fmt(),
                p.sexo.codigo().to_string(),
                dobrar_acentos(&cortar(&p.raca, 10)),
                p.peso_fmt(),
            ]
        })
        .collect();
    let resto = pesagens.len().saturating_sub(limite);
    let aviso = (resto > 0).then(|| {
        format!("... e mais {} registros (veja o Excel para dados completos)", resto)
    });
    (linhas, aviso)
}

const LARGURA_PAGINA: f32 = 210.0;
const ALTURA_PAGINA: f32 = 297.0;
const MARGEM: f32 = 15.0;
const COLUNAS_PDF: [(&str, f32); 6] = [
    ("Numero", 40.0),
    ("Lote", 32.0),
    ("Data", 28.0),
    ("Sexo", 18.0),
    ("Raca", 30.0),
    ("Peso(kg)", 25.0),
];

/// Escreve de cima para baixo e abre página nova quando falta espaço.
struct EscritorPdf {
    doc: PdfDocumentReference,
    camada: PdfLayerReference,
    fonte: IndirectFontRef,
    fonte_negrito: IndirectFontRef,
    y: f32,
    paginas: usize,
}

impl EscritorPdf {
    fn novo(titulo: &str) -> AppResult<Self> {
        let (doc, pagina, camada) =
            PdfDocument::new(titulo, Mm(LARGURA_PAGINA), Mm(ALTURA_PAGINA), "Camada 1");
        let fonte = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let fonte_negrito = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let camada = doc.get_page(pagina).get_layer(camada);
        Ok(Self {
            doc,
            camada,
            fonte,
            fonte_negrito,
            y: ALTURA_PAGINA - MARGEM,
            paginas: 1,
        })
    }

    fn garantir_espaco(&mut self, altura: f32) {
        if self.y - altura >= MARGEM {
            return;
        }
        self.paginas += 1;
        let (pagina, camada) = self.doc.add_page(
            Mm(LARGURA_PAGINA),
            Mm(ALTURA_PAGINA),
            format!("Camada {}", self.paginas),
        );
        self.camada = self.doc.get_page(pagina).get_layer(camada);
        self.y = ALTURA_PAGINA - MARGEM;
    }

    fn texto_em(&self, texto: &str, tamanho: f32, x: f32, y: f32, negrito: bool) {
        let fonte = if negrito { &self.fonte_negrito } else { &self.fonte };
        self.camada.use_text(dobrar_acentos(texto), tamanho, Mm(x), Mm(y), fonte);
    }

    fn linha_texto(&mut self, texto: &str, tamanho: f32, negrito: bool) {
        let altura = tamanho * 0.5;
        self.garantir_espaco(altura);
        self.y -= altura;
        self.texto_em(texto, tamanho, MARGEM, self.y, negrito);
    }

    fn espaco(&mut self, altura: f32) {
        self.y -= altura;
    }

    fn cor(&self, r: f32, g: f32, b: f32) {
        self.camada.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
        self.camada.set_outline_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn retangulo(&self, x: f32, y: f32, largura: f32, altura: f32) {
        self.camada
            .add_rect(Rect::new(Mm(x), Mm(y), Mm(x + largura), Mm(y + altura)));
    }

    fn segmento(&self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.camada.add_line(Line {
            points: vec![(Point::new(Mm(x1), Mm(y1)), false), (Point::new(Mm(x2), Mm(y2)), false)],
            is_closed: false,
        });
    }

    /// Gráfico de barras verticais na caixa (x, y_base) com a largura e altura dadas.
    fn grafico(&self, grafico: &Grafico, x: f32, y_base: f32, largura: f32, altura: f32) {
        self.cor(0.0, 0.0, 0.0);
        self.texto_em(&grafico.titulo, 10.0, x, y_base + altura + 2.0, true);
        self.segmento(x, y_base, x + largura, y_base);
        self.segmento(x, y_base, x, y_base + altura);

        if grafico.barras.is_empty() {
            self.texto_em("Sem dados", 8.0, x + 2.0, y_base + altura / 2.0, false);
            return;
        }

        let n = grafico.barras.len() as f32;
        let passo = largura / n;
        let largura_barra = passo * 0.7;
        // Rótulos só cabem em gráficos com poucas barras
        let com_rotulos = grafico.barras.len() <= 6;
        for (i, barra) in grafico.barras.iter().enumerate() {
            let bx = x + passo * i as f32 + (passo - largura_barra) / 2.0;
            let bh = (altura - 6.0) * barra.percentual as f32 / 100.0;
            self.cor(0.2, 0.45, 0.7);
            if bh > 0.0 {
                self.retangulo(bx, y_base, largura_barra, bh);
            }
            self.cor(0.0, 0.0, 0.0);
            self.texto_em(&barra.valor_fmt(), 6.0, bx, y_base + bh + 1.0, false);
            if com_rotulos {
                self.texto_em(&cortar(&barra.rotulo, 14), 6.0, bx, y_base - 4.0, false);
            }
        }
    }

    fn tabela(&mut self, linhas: &[[String; 6]]) {
        let altura_linha = 7.0;
        self.cabecalho_tabela(altura_linha);
        for linha in linhas {
            if self.y - altura_linha < MARGEM {
                self.garantir_espaco(altura_linha * 2.0);
                self.cabecalho_tabela(altura_linha);
            }
            self.y -= altura_linha;
            let mut x = MARGEM;
            for (celula, (_, largura)) in linha.iter().zip(COLUNAS_PDF.iter()) {
                self.texto_em(celula, 8.0, x + 1.0, self.y + 2.0, false);
                x += largura;
            }
            self.segmento(MARGEM, self.y, x, self.y);
        }
    }

    fn cabecalho_tabela(&mut self, altura_linha: f32) {
        self.garantir_espaco(altura_linha);
        self.y -= altura_linha;
        let mut x = MARGEM;
        for (titulo, largura) in COLUNAS_PDF.iter() {
            self.texto_em(titulo, 9.0, x + 1.0, self.y + 2.0, true);
            x += largura;
        }
        self.segmento(MARGEM, self.y, x, self.y);
    }

    fn finalizar(self) -> AppResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}

fn pdf_err(e: printpdf::Error) -> AppError {
    tracing::error!("Erro ao gerar PDF: {:?}", e);
    AppError::Export(format!("Falha ao gerar PDF: {}", e))
}

/// PDF com título, resumo, gráficos opcionais e a tabela de pesagens (limitada).
pub fn gerar_pdf(relatorio: &Relatorio, pesagens: &[Pesagem], incluir_graficos: bool) -> AppResult<Vec<u8>> {
    let titulo = relatorio.titulo.replace('_', " ");
    let mut pdf = EscritorPdf::novo(&titulo)?;

    pdf.linha_texto(&titulo, 16.0, true);
    pdf.espaco(2.0);
    pdf.linha_texto(
        &format!("Gerado em: {}", Local::now().format("%d/%m/%Y %H:%M")),
        10.0,
        false,
    );
    pdf.espaco(4.0);

    let stats = &relatorio.geral;
    pdf.linha_texto("Resumo", 12.0, true);
    pdf.espaco(1.0);
    pdf.linha_texto(&format!("Total de Animais: {}", stats.total), 10.0, false);
    pdf.linha_texto(&format!("Peso Total: {} kg", stats.soma_fmt()), 10.0, false);
    pdf.linha_texto(&format!("Media de Peso: {} kg", stats.media_fmt()), 10.0, false);
    pdf.linha_texto(&format!("Peso Minimo: {} kg", stats.minimo_fmt()), 10.0, false);
    pdf.linha_texto(&format!("Peso Maximo: {} kg", stats.maximo_fmt()), 10.0, false);
    pdf.espaco(6.0);

    if incluir_graficos {
        // Grelha 2x2 de gráficos
        let largura = (LARGURA_PAGINA - 2.0 * MARGEM - 15.0) / 2.0;
        let altura = 50.0;
        let bloco = altura + 18.0;
        pdf.garantir_espaco(bloco * 2.0);
        for (i, grafico) in relatorio.graficos().iter().enumerate() {
            let coluna = (i % 2) as f32;
            let linha = (i / 2) as f32;
            let x = MARGEM + coluna * (largura + 15.0);
            let y_base = pdf.y - bloco * (linha + 1.0) + 8.0;
            pdf.grafico(grafico, x, y_base, largura, altura);
        }
        pdf.espaco(bloco * 2.0 + 4.0);
    }

    let (linhas, aviso) = linhas_tabela_pdf(pesagens, incluir_graficos);
    pdf.tabela(&linhas);
    if let Some(aviso) = aviso {
        pdf.espaco(4.0);
        pdf.linha_texto(&aviso, 9.0, false);
    }

    let bytes = pdf.finalizar()?;
    tracing::info!(
        "📄 PDF '{}' gerado ({} pesagens, gráficos: {}).",
        relatorio.titulo,
        pesagens.len(),
        incluir_graficos
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        models::{
            pesagem::{PesagemForm, Sexo},
            user::Role,
        },
        services::{pesagem_service, relatorio_service, user_service},
    };
    use calamine::{Data, Reader, Xlsx};
    use chrono::{NaiveDate, NaiveTime};
    use std::io::Cursor;

    fn pesagem(id: i64, numero: &str, sexo: Sexo, raca: &str, peso: f64) -> Pesagem {
        Pesagem {
            id,
            user_id: 1,
            numero_bezerro: numero.to_string(),
            lote: "L1".to_string(),
            data_pesagem: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            horario_pesagem: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            sexo,
            raca: raca.to_string(),
            peso_kg: peso,
            observacoes: Some("ok".to_string()),
            created_at: None,
        }
    }

    fn muitas(n: usize) -> Vec<Pesagem> {
        (0..n)
            .map(|i| pesagem(i as i64 + 1, &format!("BZ-{}", i), Sexo::Macho, "Cruzado", 40.0 + i as f64))
            .collect()
    }

    #[test]
    fn excel_has_header_and_one_row_per_weighing() {
        let pesagens = vec![
            pesagem(1, "BZ-1", Sexo::Macho, "Zebuinos", 40.0),
            pesagem(2, "BZ-2", Sexo::Femea, "Cruzado", 52.5),
        ];
        let bytes = gerar_excel(&pesagens).unwrap();

        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = xlsx.worksheet_range("Dados").unwrap();
        assert_eq!(range.height(), 3);
        assert_eq!(range.get((0, 0)), Some(&Data::String("id".to_string())));
        assert_eq!(range.get((0, 7)), Some(&Data::String("peso_kg".to_string())));
        assert_eq!(range.get((1, 1)), Some(&Data::String("BZ-1".to_string())));
        assert_eq!(range.get((2, 5)), Some(&Data::String("F".to_string())));
        assert_eq!(range.get((2, 7)), Some(&Data::Float(52.5)));
        assert_eq!(range.get((1, 3)), Some(&Data::String("2025-03-14".to_string())));
    }

    #[tokio::test]
    async fn excel_reproduces_rows_and_weights_of_the_query() {
        let pool = test_pool().await;
        let user = user_service::create_user(&pool, "joao", "1234", Role::User).await.unwrap();
        for (numero, sexo, peso) in [("A", "M", "40"), ("B", "F", "50,5"), ("C", "M", "60")] {
            let form = PesagemForm {
                numero_bezerro: numero.to_string(),
                lote: "L1".to_string(),
                sexo: sexo.to_string(),
                raca: "Cruzado".to_string(),
                peso_kg: peso.to_string(),
                ..Default::default()
            };
            let nova = pesagem_service::validar_formulario(&form).unwrap();
            pesagem_service::adicionar_pesagem(&pool, user.id, &nova).await.unwrap();
        }
        let pesagens = pesagem_service::listar_pesagens(&pool, user.id, Some("L1")).await.unwrap();

        let bytes = gerar_excel(&pesagens).unwrap();
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = xlsx.worksheet_range("Dados").unwrap();
        assert_eq!(range.height(), pesagens.len() + 1);

        let pesos_planilha: Vec<f64> = range
            .rows()
            .skip(1)
            .map(|linha| match &linha[7] {
                Data::Float(peso) => *peso,
                outro => panic!("peso inesperado: {:?}", outro),
            })
            .collect();
        let pesos_query: Vec<f64> = pesagens.iter().map(|p| p.peso_kg).collect();
        assert_eq!(pesos_planilha, pesos_query);
    }

    #[test]
    fn excel_of_empty_set_has_only_header() {
        let bytes = gerar_excel(&[]).unwrap();
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = xlsx.worksheet_range("Dados").unwrap();
        assert_eq!(range.height(), 1);
        assert_eq!(range.width(), COLUNAS_EXCEL.len());
    }

    #[test]
    fn pdf_is_a_pdf_document() {
        let pesagens = vec![
            pesagem(1, "BZ-1", Sexo::Macho, "Zebuínos", 40.0),
            pesagem(2, "BZ-2", Sexo::Femea, "Cruzado", 50.0),
        ];
        let relatorio = relatorio_service::montar_relatorio("Relatorio_L1", Some("L1"), &pesagens);
        for graficos in [true, false] {
            let bytes = gerar_pdf(&relatorio, &pesagens, graficos).unwrap();
            assert!(bytes.starts_with(b"%PDF"));
        }
    }

    #[test]
    fn pdf_of_many_rows_spans_pages() {
        let pesagens = muitas(120);
        let relatorio = relatorio_service::montar_relatorio("Relatorio_Geral", None, &pesagens);
        let bytes = gerar_pdf(&relatorio, &pesagens, false).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pdf_table_truncates_with_notice() {
        let pesagens = muitas(45);
        let (linhas, aviso) = linhas_tabela_pdf(&pesagens, true);
        assert_eq!(linhas.len(), MAX_LINHAS_COM_GRAFICOS);
        assert_eq!(
            aviso.as_deref(),
            Some("... e mais 15 registros (veja o Excel para dados completos)")
        );

        let (linhas, aviso) = linhas_tabela_pdf(&pesagens, false);
        assert_eq!(linhas.len(), 45);
        assert!(aviso.is_none());
    }

    #[test]
    fn pdf_rows_are_latin_only() {
        let pesagens = vec![pesagem(1, "BZ-ção", Sexo::Femea, "Zebuínos", 40.0)];
        let (linhas, _) = linhas_tabela_pdf(&pesagens, false);
        assert_eq!(linhas[0][0], "BZ-cao");
        assert_eq!(linhas[0][4], "Zebuinos");
        assert_eq!(linhas[0][5], "40.0");
    }

    #[test]
    fn export_scope_names() {
        assert_eq!(EscopoExport::from_query(Some("geral"), None).nome_arquivo("xlsx"), "relatorio_geral.xlsx");
        assert_eq!(EscopoExport::from_query(None, Some("")).nome_arquivo("pdf"), "relatorio_todos_lotes.pdf");
        let lote = EscopoExport::from_query(None, Some("LOTE 1/ç"));
        assert_eq!(lote.lote(), Some("LOTE 1/ç"));
        assert_eq!(lote.titulo(), "Relatorio_LOTE 1/ç");
        assert_eq!(lote.nome_arquivo("xlsx"), "relatorio_LOTE_1_c.xlsx");
    }
}
