//! Spreadsheet extraction (xlsx, xls) using calamine.

use std::fmt::Display;
use std::io::Cursor;

use async_trait::async_trait;
use calamine::{DataType, Range, Reader, Xls, Xlsx};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentFormat, ExtractedContent, ExtractionContext, ExtractionMethod};
use crate::Extractor;

/// Extracts the first worksheet as tab-separated rows.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    pub fn new() -> Self {
        Self
    }
}

struct SheetText {
    name: String,
    text: String,
    rows: usize,
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Float(v) => format!("{v}"),
        DataType::Int(v) => format!("{v}"),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(v) => format!("{v}"),
        DataType::DateTimeIso(s) => s.clone(),
        DataType::Duration(v) => format!("{v}"),
        DataType::DurationIso(s) => s.clone(),
        DataType::Error(e) => format!("#{e:?}"),
        DataType::Empty => String::new(),
    }
}

/// Render a sheet: a `Sheet: <name>` header, then one line per non-empty row.
pub(crate) fn render_sheet(name: &str, range: &Range<DataType>) -> (String, usize) {
    let mut out = format!("Sheet: {name}\n");
    let mut rows = 0;

    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        out.push_str(cells.join("\t").trim_end());
        out.push('\n');
        rows += 1;
    }

    (out.trim_end().to_string(), rows)
}

fn first_sheet<'a, R>(bytes: &'a [u8], label: &'static str) -> ExtractResult<Option<SheetText>>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: Display,
{
    let mut workbook = R::new(Cursor::new(bytes)).map_err(|e| ExtractError::failed(label, e))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(name) = names.into_iter().next() else {
        return Ok(None);
    };

    let range = match workbook.worksheet_range(&name) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(ExtractError::failed(label, e)),
        None => return Ok(None),
    };

    let (text, rows) = render_sheet(&name, &range);
    Ok(Some(SheetText { name, text, rows }))
}

fn read_workbook(bytes: &[u8], format: DocumentFormat) -> ExtractResult<Option<SheetText>> {
    match format {
        DocumentFormat::Xlsx => first_sheet::<Xlsx<_>>(bytes, "xlsx"),
        _ => first_sheet::<Xls<_>>(bytes, "xls"),
    }
}

#[async_trait]
impl Extractor for SpreadsheetExtractor {
    async fn extract(
        &self,
        content: &[u8],
        _ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let format = if content.starts_with(b"PK") {
            DocumentFormat::Xlsx
        } else {
            DocumentFormat::Xls
        };

        let bytes = content.to_vec();
        let sheet = match tokio::task::spawn_blocking(move || read_workbook(&bytes, format)).await? {
            Ok(Some(sheet)) => sheet,
            Ok(None) => {
                warn!(format = format.label(), "Workbook has no worksheets");
                return Ok(ExtractedContent::empty(format, "workbook has no worksheets"));
            }
            Err(e) if e.is_soft() => {
                warn!(error = %e, "Spreadsheet could not be parsed");
                return Ok(ExtractedContent::empty(format, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        if sheet.rows == 0 {
            debug!(sheet = %sheet.name, "First worksheet is empty");
            return Ok(ExtractedContent::empty(
                format,
                format!("worksheet '{}' has no data", sheet.name),
            ));
        }

        info!(sheet = %sheet.name, rows = sheet.rows, "Spreadsheet extracted");
        Ok(
            ExtractedContent::new(sheet.text, format, ExtractionMethod::Structured)
                .with_metadata("sheet", sheet.name)
                .with_metadata("rows", sheet.rows),
        )
    }

    fn supported_types(&self) -> &[&str] {
        &[DocumentFormat::MIME_XLSX, DocumentFormat::MIME_XLS]
    }

    fn name(&self) -> &str {
        "spreadsheet"
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    /// Minimal xlsx whose first sheet holds `rows` as inline strings.
    pub fn build_xlsx(sheet_name: &str, rows: &[&[&str]]) -> Vec<u8> {
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{sheet_name}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#
        );

        let mut data = String::new();
        for (r, row) in rows.iter().enumerate() {
            data.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                let col = (b'A' + c as u8) as char;
                data.push_str(&format!(
                    r#"<c r="{col}{}" t="inlineStr"><is><t>{value}</t></is></c>"#,
                    r + 1
                ));
            }
            data.push_str("</row>");
        }
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
        );

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/worksheets/sheet1.xml", sheet),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build_xlsx;
    use super::*;

    fn ctx() -> ExtractionContext {
        ExtractionContext::new("unused")
    }

    #[test]
    fn test_render_sheet_skips_empty_rows() {
        let mut range = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), DataType::String("Item".into()));
        range.set_value((0, 1), DataType::String("Qty".into()));
        range.set_value((2, 0), DataType::String("Apple".into()));
        range.set_value((2, 1), DataType::Float(3.0));

        let (text, rows) = render_sheet("Stock", &range);
        assert_eq!(rows, 2);
        assert_eq!(text, "Sheet: Stock\nItem\tQty\nApple\t3");
    }

    #[test]
    fn test_cell_text_variants() {
        assert_eq!(cell_text(&DataType::Int(7)), "7");
        assert_eq!(cell_text(&DataType::Bool(true)), "true");
        assert_eq!(cell_text(&DataType::String("  padded ".into())), "padded");
        assert_eq!(cell_text(&DataType::Empty), "");
    }

    #[tokio::test]
    async fn test_extract_first_sheet() {
        let xlsx = build_xlsx("Invoice", &[&["Item", "Price"], &["Pen", "120"]]);
        let content = SpreadsheetExtractor::new()
            .extract(&xlsx, &ctx())
            .await
            .unwrap();

        assert_eq!(content.format, DocumentFormat::Xlsx);
        assert_eq!(content.method, ExtractionMethod::Structured);
        assert!(content.text.starts_with("Sheet: Invoice"));
        assert!(content.text.contains("Item\tPrice"));
        assert!(content.text.contains("Pen\t120"));
    }

    #[tokio::test]
    async fn test_garbage_is_soft_failure() {
        let content = SpreadsheetExtractor::new()
            .extract(b"PK\x03\x04 definitely not a workbook", &ctx())
            .await
            .unwrap();

        assert!(content.is_empty());
        assert_eq!(content.warnings.len(), 1);
    }

    #[test]
    fn test_supports() {
        let extractor = SpreadsheetExtractor::new();
        assert!(extractor.supports(DocumentFormat::MIME_XLSX));
        assert!(extractor.supports("application/vnd.ms-excel"));
        assert!(!extractor.supports("application/pdf"));
    }
}
