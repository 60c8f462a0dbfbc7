//! Content-based format detection.
//!
//! Classification looks only at the bytes, never at the file name or the
//! MIME type a client declared.

use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentFormat, ImageKind};

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_SCAN_WINDOW: usize = 1024;
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const OLE2_HEADER_LEN: usize = 512;
const OLE2_ENTRY_LEN: usize = 128;
const OLE2_NAME_BYTES: usize = 64;
const OLE2_STREAM: u8 = 2;

const MIME_ZIP: &str = "application/zip";
const MIME_OLE2: &str = "application/x-ole-storage";
const MIME_UNKNOWN: &str = "application/octet-stream";

/// Classify raw bytes into a supported document format.
///
/// Anchored signatures win over the PDF marker, which may sit anywhere in
/// the first kilobyte and so can also appear inside an archive member or
/// image metadata.
pub fn detect_format(bytes: &[u8]) -> ExtractResult<DocumentFormat> {
    if bytes.starts_with(ZIP_MAGIC) {
        return detect_ooxml(bytes);
    }

    if bytes.starts_with(OLE2_MAGIC) {
        return detect_ole2(bytes);
    }

    if let Ok(format) = image::guess_format(bytes) {
        return image_kind(format)
            .map(DocumentFormat::Image)
            .ok_or_else(|| unsupported(format.to_mime_type()));
    }

    let window = &bytes[..bytes.len().min(PDF_SCAN_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Ok(DocumentFormat::Pdf);
    }

    Err(unsupported(MIME_UNKNOWN))
}

/// Read a file and classify its content.
pub async fn detect_file(path: &Path) -> ExtractResult<DocumentFormat> {
    let bytes = tokio::fs::read(path).await?;
    detect_format(&bytes)
}

/// Map an `image` crate format onto the raster types we transcribe.
pub fn image_kind(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Gif => Some(ImageKind::Gif),
        ImageFormat::WebP => Some(ImageKind::Webp),
        ImageFormat::Bmp => Some(ImageKind::Bmp),
        ImageFormat::Tiff => Some(ImageKind::Tiff),
        _ => None,
    }
}

fn detect_ooxml(bytes: &[u8]) -> ExtractResult<DocumentFormat> {
    let archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            debug!(error = %e, "ZIP signature but unreadable archive");
            return Err(unsupported(MIME_ZIP));
        }
    };

    let mut is_docx = false;
    let mut is_xlsx = false;
    for name in archive.file_names() {
        match name {
            "word/document.xml" => is_docx = true,
            "xl/workbook.xml" => is_xlsx = true,
            _ => {}
        }
    }

    if is_docx {
        Ok(DocumentFormat::Docx)
    } else if is_xlsx {
        Ok(DocumentFormat::Xlsx)
    } else {
        Err(unsupported(MIME_ZIP))
    }
}

fn detect_ole2(bytes: &[u8]) -> ExtractResult<DocumentFormat> {
    let streams = ole2_stream_names(bytes);
    let has = |name: &str| streams.iter().any(|s| s == name);

    if has("WordDocument") {
        Ok(DocumentFormat::Doc)
    } else if has("Workbook") || has("Book") {
        Ok(DocumentFormat::Xls)
    } else {
        Err(unsupported(MIME_OLE2))
    }
}

/// Names of stream objects in 128-byte directory entries after the header.
///
/// Entries are read at their aligned offsets, so text inside a stream body
/// never counts as a name.
fn ole2_stream_names(bytes: &[u8]) -> Vec<String> {
    let Some(body) = bytes.get(OLE2_HEADER_LEN..) else {
        return Vec::new();
    };

    body.chunks_exact(OLE2_ENTRY_LEN)
        .filter(|entry| entry[66] == OLE2_STREAM)
        .filter_map(|entry| {
            // Byte length includes the UTF-16 terminator.
            let len = u16::from_le_bytes([entry[64], entry[65]]) as usize;
            if len < 2 || len > OLE2_NAME_BYTES || len % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = entry[..len - 2]
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).ok()
        })
        .collect()
}

fn unsupported(mime: &str) -> ExtractError {
    ExtractError::UnsupportedFormat {
        mime: mime.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for name in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(b"<x/>").unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn ole2_entry(name: &str, object_type: u8) -> [u8; OLE2_ENTRY_LEN] {
        let mut entry = [0u8; OLE2_ENTRY_LEN];
        let encoded: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
        entry[..encoded.len()].copy_from_slice(&encoded);
        let len = (encoded.len() + 2) as u16;
        entry[64..66].copy_from_slice(&len.to_le_bytes());
        entry[66] = object_type;
        entry
    }

    fn ole2_with(streams: &[&str], body: &[u8]) -> Vec<u8> {
        let mut bytes = OLE2_MAGIC.to_vec();
        bytes.resize(OLE2_HEADER_LEN, 0);
        bytes.extend_from_slice(&ole2_entry("Root Entry", 5));
        for name in streams {
            bytes.extend_from_slice(&ole2_entry(name, OLE2_STREAM));
        }
        bytes.extend_from_slice(body);
        bytes
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_detect_pdf() {
        assert_eq!(
            detect_format(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n").unwrap(),
            DocumentFormat::Pdf
        );
    }

    #[test]
    fn test_detect_pdf_after_leading_junk() {
        let mut bytes = vec![b' '; 100];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        assert_eq!(detect_format(&bytes).unwrap(), DocumentFormat::Pdf);
    }

    #[test]
    fn test_detect_docx_and_xlsx() {
        let docx = zip_with(&["[Content_Types].xml", "word/document.xml"]);
        assert_eq!(detect_format(&docx).unwrap(), DocumentFormat::Docx);

        let xlsx = zip_with(&["[Content_Types].xml", "xl/workbook.xml"]);
        assert_eq!(detect_format(&xlsx).unwrap(), DocumentFormat::Xlsx);
    }

    #[test]
    fn test_plain_zip_is_unsupported() {
        let archive = zip_with(&["notes.txt"]);
        match detect_format(&archive) {
            Err(ExtractError::UnsupportedFormat { mime }) => assert_eq!(mime, "application/zip"),
            other => panic!("expected unsupported zip, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_legacy_office() {
        assert_eq!(
            detect_format(&ole2_with(&["WordDocument"], &[])).unwrap(),
            DocumentFormat::Doc
        );
        assert_eq!(
            detect_format(&ole2_with(&["Workbook"], &[])).unwrap(),
            DocumentFormat::Xls
        );
        assert_eq!(
            detect_format(&ole2_with(&["Book"], &[])).unwrap(),
            DocumentFormat::Xls
        );
        assert!(detect_format(&ole2_with(&["PowerPoint Document"], &[])).is_err());
    }

    #[test]
    fn test_ole2_stream_text_is_not_an_entry_name() {
        // A presentation whose slide text mentions the legacy workbook name.
        let body = utf16("Order Book summary");
        let deck = ole2_with(&["PowerPoint Document", "Current User"], &body);
        match detect_format(&deck) {
            Err(ExtractError::UnsupportedFormat { mime }) => {
                assert_eq!(mime, "application/x-ole-storage")
            }
            other => panic!("expected unsupported OLE2, got {other:?}"),
        }
    }

    #[test]
    fn test_ole2_storage_named_like_stream_is_ignored() {
        let bytes = {
            let mut bytes = OLE2_MAGIC.to_vec();
            bytes.resize(OLE2_HEADER_LEN, 0);
            bytes.extend_from_slice(&ole2_entry("WordDocument", 1));
            bytes
        };
        assert!(detect_format(&bytes).is_err());
    }

    #[test]
    fn test_png_with_pdf_marker_in_metadata() {
        let img = image::RgbImage::new(2, 2);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        let png = buf.into_inner();

        // Signature (8) + IHDR chunk (25), then a tEXt chunk.
        let text = b"Comment\0exported from %PDF-1.4 source";
        let mut bytes = png[..33].to_vec();
        bytes.extend_from_slice(&(text.len() as u32).to_be_bytes());
        bytes.extend_from_slice(b"tEXt");
        bytes.extend_from_slice(text);
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&png[33..]);

        assert_eq!(
            detect_format(&bytes).unwrap(),
            DocumentFormat::Image(ImageKind::Png)
        );
    }

    #[test]
    fn test_zip_with_stored_pdf_member_is_unsupported() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("scan.pdf", options).unwrap();
        writer.write_all(b"%PDF-1.7\n1 0 obj\n").unwrap();
        let archive = writer.finish().unwrap().into_inner();

        match detect_format(&archive) {
            Err(ExtractError::UnsupportedFormat { mime }) => assert_eq!(mime, "application/zip"),
            other => panic!("expected unsupported zip, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_png() {
        let img = image::RgbImage::new(2, 2);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        let format = detect_format(buf.get_ref()).unwrap();
        assert_eq!(format, DocumentFormat::Image(ImageKind::Png));
        assert_eq!(format.mime(), "image/png");
    }

    #[test]
    fn test_unknown_bytes() {
        match detect_format(b"just some plain text") {
            Err(ExtractError::UnsupportedFormat { mime }) => {
                assert_eq!(mime, "application/octet-stream")
            }
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            detect_format(&[]),
            Err(ExtractError::UnsupportedFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_detect_file_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.png");
        std::fs::write(&path, b"%PDF-1.5\n").unwrap();
        assert_eq!(detect_file(&path).await.unwrap(), DocumentFormat::Pdf);
    }
}
