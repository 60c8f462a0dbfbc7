//! Word document extraction.
//!
//! Reads the OOXML package directly (zip + quick-xml) so that body text,
//! tables, headers, footers and embedded images can be emitted in a fixed
//! order:
//!
//! 1. body paragraphs outside tables
//! 2. table rows, cells joined by ` | `
//! 3. header paragraphs, prefixed `[Header] `
//! 4. footer paragraphs, prefixed `[Footer] `
//! 5. transcribed images, prefixed `[Image] `

use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, info, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::image::decode_flattened;
use crate::transcriber::VisionTranscriber;
use crate::types::{DocumentFormat, ExtractedContent, ExtractionContext, ExtractionMethod};
use crate::Extractor;

const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Paragraphs and table rows of one XML part.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PartText {
    pub paragraphs: Vec<String>,
    pub table_rows: Vec<String>,
}

impl PartText {
    fn lines(self) -> impl Iterator<Item = String> {
        self.paragraphs.into_iter().chain(self.table_rows)
    }
}

/// Everything pulled out of the package before any transcription.
#[derive(Debug, Default)]
struct Package {
    body: PartText,
    headers: Vec<String>,
    footers: Vec<String>,
    media: Vec<(String, Vec<u8>)>,
    /// Media entries that could not be read from the archive.
    unreadable: Vec<String>,
}

/// Word (.docx) extractor.
pub struct DocxExtractor {
    transcriber: Arc<VisionTranscriber>,
}

impl DocxExtractor {
    pub fn new(transcriber: Arc<VisionTranscriber>) -> Self {
        Self { transcriber }
    }

    /// Transcribe embedded images in archive order, skipping failures.
    async fn transcribe_media(
        &self,
        media: Vec<(String, Vec<u8>)>,
        ctx: &ExtractionContext,
        warnings: &mut Vec<String>,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        for (name, bytes) in media {
            if image::guess_format(&bytes).is_err() {
                debug!(image = %name, "Skipping embedded media in unsupported format");
                continue;
            }

            let image = match decode_flattened(bytes).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(image = %name, error = %e, "Embedded image could not be decoded");
                    warnings.push(format!("{name}: {e}"));
                    continue;
                }
            };

            match self
                .transcriber
                .transcribe(&image, &ctx.instruction_prompt)
                .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(image = %name, chars = text.len(), "Embedded image transcribed");
                    lines.push(format!("[Image] {}", text.trim()));
                }
                Ok(_) => debug!(image = %name, "Embedded image has no text"),
                Err(e) => {
                    warn!(image = %name, error = %e, "Embedded image transcription failed, skipping");
                    warnings.push(format!("{name}: {e}"));
                }
            }
        }

        lines
    }
}

/// Parse a WordprocessingML part (document, header or footer).
pub(crate) fn parse_part(xml: &str) -> ExtractResult<PartText> {
    let mut reader = Reader::from_str(xml);
    let mut out = PartText::default();

    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:p" => paragraph.clear(),
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => row.clear(),
                b"w:tc" if table_depth == 1 => cell.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::failed("docx", e))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = paragraph.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if table_depth == 0 {
                        out.paragraphs.push(text.to_string());
                    } else {
                        if !cell.is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(text);
                    }
                }
                b"w:tc" if table_depth == 1 => row.push(std::mem::take(&mut cell)),
                b"w:tr" if table_depth == 1 => {
                    if row.iter().any(|c| !c.trim().is_empty()) {
                        out.table_rows.push(row.join(" | "));
                    }
                    row.clear();
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::failed("docx", e)),
        }
    }

    Ok(out)
}

/// `word/header2.xml` sorts before `word/header10.xml`.
fn part_order(name: &str) -> (usize, String) {
    (name.len(), name.to_string())
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> ExtractResult<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ExtractError::failed("docx", format!("{name}: {e}")))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ExtractError::failed("docx", format!("{name}: {e}")))?;
    Ok(xml)
}

fn read_package(bytes: &[u8]) -> ExtractResult<Package> {
    if bytes.starts_with(OLE2_MAGIC) {
        return Err(ExtractError::failed(
            "doc",
            "legacy binary Word documents are not supported",
        ));
    }

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::failed("docx", e))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let mut package = Package {
        body: parse_part(&read_entry(&mut archive, "word/document.xml")?)?,
        ..Default::default()
    };

    let is_part = |name: &str, prefix: &str| name.starts_with(prefix) && name.ends_with(".xml");
    let mut headers: Vec<&String> = names.iter().filter(|n| is_part(n, "word/header")).collect();
    let mut footers: Vec<&String> = names.iter().filter(|n| is_part(n, "word/footer")).collect();
    headers.sort_by_key(|n| part_order(n));
    footers.sort_by_key(|n| part_order(n));

    for name in headers {
        let part = parse_part(&read_entry(&mut archive, name)?)?;
        package
            .headers
            .extend(part.lines().map(|line| format!("[Header] {line}")));
    }
    for name in footers {
        let part = parse_part(&read_entry(&mut archive, name)?)?;
        package
            .footers
            .extend(part.lines().map(|line| format!("[Footer] {line}")));
    }

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| ExtractError::failed("docx", e))?;
        if !file.is_file() || !file.name().starts_with("word/media/") {
            continue;
        }
        let name = file.name().to_string();
        let mut data = Vec::new();
        match file.read_to_end(&mut data) {
            Ok(_) => package.media.push((name, data)),
            Err(e) => {
                warn!(image = %name, error = %e, "Embedded media could not be read, skipping");
                package.unreadable.push(format!("{name}: {e}"));
            }
        }
    }

    Ok(package)
}

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(
        &self,
        content: &[u8],
        ctx: &ExtractionContext,
    ) -> ExtractResult<ExtractedContent> {
        let format = if content.starts_with(OLE2_MAGIC) {
            DocumentFormat::Doc
        } else {
            DocumentFormat::Docx
        };

        let bytes = content.to_vec();
        let package = match tokio::task::spawn_blocking(move || read_package(&bytes)).await? {
            Ok(package) => package,
            Err(e) if e.is_soft() => {
                warn!(error = %e, "Word document could not be read");
                return Ok(ExtractedContent::empty(format, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let paragraphs = package.body.paragraphs.len();
        let table_rows = package.body.table_rows.len();
        let image_count = package.media.len();

        let mut warnings = package.unreadable;
        let mut lines: Vec<String> = package.body.lines().collect();
        lines.extend(package.headers);
        lines.extend(package.footers);
        lines.extend(self.transcribe_media(package.media, ctx, &mut warnings).await);

        let text = lines.join("\n");
        if text.trim().is_empty() {
            warn!("Word document contains no extractable text");
            let mut empty = ExtractedContent::empty(format, "no text found in document");
            empty.warnings.extend(warnings);
            return Ok(empty);
        }

        info!(
            paragraphs,
            table_rows,
            images = image_count,
            chars = text.len(),
            "Word document extracted"
        );

        let mut result = ExtractedContent::new(text, format, ExtractionMethod::Structured)
            .with_metadata("paragraphs", paragraphs)
            .with_metadata("table_rows", table_rows)
            .with_metadata("images", image_count);
        result.warnings = warnings;
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &[DocumentFormat::MIME_DOCX, DocumentFormat::MIME_DOC]
    }

    fn name(&self) -> &str {
        "docx"
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    pub fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    pub fn table(rows: &[&[&str]]) -> String {
        let mut xml = String::from("<w:tbl>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in row.iter() {
                xml.push_str(&format!("<w:tc>{}</w:tc>", para(cell)));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        xml
    }

    pub fn document(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {NS}><w:body>{body}</w:body></w:document>"#)
    }

    /// Assemble a .docx package from raw parts.
    pub fn build_docx(
        body: &str,
        headers: &[&str],
        footers: &[&str],
        media: &[(&str, Vec<u8>)],
    ) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document(body).as_bytes()).unwrap();

        for (i, text) in headers.iter().enumerate() {
            writer
                .start_file(format!("word/header{}.xml", i + 1), options)
                .unwrap();
            let xml = format!("<w:hdr {NS}>{}</w:hdr>", para(text));
            writer.write_all(xml.as_bytes()).unwrap();
        }
        for (i, text) in footers.iter().enumerate() {
            writer
                .start_file(format!("word/footer{}.xml", i + 1), options)
                .unwrap();
            let xml = format!("<w:ftr {NS}>{}</w:ftr>", para(text));
            writer.write_all(xml.as_bytes()).unwrap();
        }
        for (name, bytes) in media {
            writer
                .start_file(format!("word/media/{name}"), options)
                .unwrap();
            writer.write_all(bytes).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 0]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }
}
