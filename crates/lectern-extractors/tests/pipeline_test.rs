//! Integration tests for the extraction pipeline.
//!
//! Vision calls and page rendering are replaced with in-process fakes so the
//! tests run without network access or libpdfium.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use lectern_extractors::{
    ExtractError, ExtractResult, ExtractionContext, ExtractionMethod, ExtractionPipeline,
    PageRasterizer, PdfExtractor, TranscriptionRequest, TranscriptionResult, UploadedFile,
    VisionModel, VisionTranscriber,
};

/// Replies with scripted answers in call order and keeps every request.
struct ScriptedModel {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<TranscriptionRequest>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn complete(&self, request: TranscriptionRequest) -> TranscriptionResult<String> {
        self.requests.lock().unwrap().push(request);
        Ok(self.replies.lock().unwrap().pop().unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct BlankPages(usize);

impl PageRasterizer for BlankPages {
    fn render_pages(&self, _pdf: &[u8], _dpi: u32) -> ExtractResult<Vec<DynamicImage>> {
        Ok((0..self.0).map(|_| DynamicImage::new_rgb8(16, 16)).collect())
    }

    fn name(&self) -> &str {
        "blank"
    }
}

/// A PDF whose pages carry no text operators.
fn scanned_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content = Content {
            operations: vec![Operation::new("q", vec![]), Operation::new("Q", vec![])],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn pipeline_with(model: Arc<ScriptedModel>, pages: usize) -> ExtractionPipeline {
    let transcriber = Arc::new(VisionTranscriber::new(model));
    let pdf = PdfExtractor::new(transcriber.clone(), Some(Arc::new(BlankPages(pages))));
    // Registered first so it wins over the default PDF extractor.
    let base = ExtractionPipeline::new().add_extractor(Arc::new(pdf));
    lectern_extractors::ExtractorFactory::all(transcriber, &Default::default())
        .into_iter()
        .fold(base, |p, e| p.add_extractor(e))
}

fn ctx() -> ExtractionContext {
    ExtractionContext::new("Split the image content into items and data")
}

#[tokio::test]
async fn test_scanned_two_page_pdf() {
    let model = ScriptedModel::new(&["Invoice No. 123", "Total 4,500"]);
    let pipeline = pipeline_with(model.clone(), 2);

    let upload = UploadedFile::new(scanned_pdf(2), "scan.pdf");
    let content = pipeline.extract_upload(upload, &ctx()).await.unwrap();

    assert_eq!(content.text, "Invoice No. 123\nTotal 4,500");
    assert_eq!(content.filename, "scan.pdf");
    assert_eq!(content.method, ExtractionMethod::VisionFallback);
    assert_eq!(content.page_count(), Some(2));
    assert_eq!(model.calls(), 2);

    let requests = model.requests.lock().unwrap();
    assert!(requests
        .iter()
        .all(|r| r.instruction == "Split the image content into items and data"));
}

#[tokio::test]
async fn test_zip_upload_rejected_before_extraction() {
    let model = ScriptedModel::new(&[]);
    let pipeline = pipeline_with(model.clone(), 1);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("readme.txt", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"hello").unwrap();
    let archive = writer.finish().unwrap().into_inner();

    let err = pipeline
        .extract_upload(UploadedFile::new(archive, "bundle.zip"), &ctx())
        .await
        .unwrap_err();

    match err {
        ExtractError::UnsupportedFormat { mime } => assert_eq!(mime, "application/zip"),
        other => panic!("expected unsupported format, got {other:?}"),
    }
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_transparent_image_flattened_before_upload() {
    let model = ScriptedModel::new(&["Item: Pen"]);
    let pipeline = pipeline_with(model.clone(), 0);

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 12, Rgba([255, 0, 0, 0])))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();

    let content = pipeline
        .extract(png.get_ref(), "receipt.png", &ctx())
        .await
        .unwrap();
    assert_eq!(content.text, "Item: Pen");
    assert_eq!(content.method, ExtractionMethod::Vision);

    let requests = model.requests.lock().unwrap();
    let sent = STANDARD.decode(&requests[0].image_base64).unwrap();
    assert_eq!(image::guess_format(&sent).unwrap(), ImageFormat::Jpeg);

    let decoded = image::load_from_memory(&sent).unwrap();
    assert!(!decoded.color().has_alpha());
    let [r, g, b] = decoded.to_rgb8().get_pixel(6, 6).0;
    assert!(r > 240 && g > 240 && b > 240, "expected white, got {r},{g},{b}");
}
