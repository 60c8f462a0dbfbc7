//! End-to-end ingestion: upload bytes in, indexed documents out.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};

use lectern_core::{
    DocumentIngester, ErrorCode, IngestOutcome, IngestionSink, LecternResult, Prompts,
};
use lectern_core::types::Document;
use lectern_extractors::{
    ExtractResult, ExtractionPipeline, ExtractorFactory, PageRasterizer, PdfExtractor,
    TranscriptionRequest, TranscriptionResult, UploadedFile, VisionModel, VisionTranscriber,
};

#[derive(Default)]
struct RecordingSink {
    documents: Mutex<Vec<Document>>,
}

#[async_trait]
impl IngestionSink for RecordingSink {
    async fn insert_document(&self, document: Document) -> LecternResult<usize> {
        self.documents.lock().unwrap().push(document);
        Ok(1)
    }
}

/// Answers page transcriptions in call order.
struct PageReader {
    pages: Mutex<Vec<&'static str>>,
    instructions: Mutex<Vec<String>>,
}

#[async_trait]
impl VisionModel for PageReader {
    async fn complete(&self, request: TranscriptionRequest) -> TranscriptionResult<String> {
        self.instructions.lock().unwrap().push(request.instruction);
        Ok(self.pages.lock().unwrap().remove(0).to_string())
    }

    fn model_name(&self) -> &str {
        "page-reader"
    }
}

struct BlankPages(usize);

impl PageRasterizer for BlankPages {
    fn render_pages(&self, _pdf: &[u8], _dpi: u32) -> ExtractResult<Vec<DynamicImage>> {
        Ok((0..self.0).map(|_| DynamicImage::new_rgb8(8, 8)).collect())
    }

    fn name(&self) -> &str {
        "blank"
    }
}

fn scanned_pdf(pages: usize) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
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

fn setup(pages: &[&'static str]) -> (DocumentIngester, Arc<RecordingSink>, Arc<PageReader>) {
    let model = Arc::new(PageReader {
        pages: Mutex::new(pages.to_vec()),
        instructions: Mutex::new(Vec::new()),
    });
    let transcriber = Arc::new(VisionTranscriber::new(model.clone()));
    let scanned = PdfExtractor::new(transcriber.clone(), Some(Arc::new(BlankPages(pages.len()))))
        .with_max_concurrency(1);
    let pipeline = ExtractorFactory::all(transcriber, &Default::default())
        .into_iter()
        .fold(
            ExtractionPipeline::new().add_extractor(Arc::new(scanned)),
            |p, e| p.add_extractor(e),
        );

    let sink = Arc::new(RecordingSink::default());
    (
        DocumentIngester::new(Arc::new(pipeline), sink.clone()),
        sink,
        model,
    )
}

#[tokio::test]
async fn test_scanned_pdf_reaches_sink_once() {
    let (ingester, sink, model) = setup(&["Invoice No. 123", "Total 4,500"]);
    let prompts = Prompts {
        instruction_prompt: "Split the image content into items and data".into(),
        ..Prompts::default()
    };

    let outcome = ingester
        .ingest_upload(UploadedFile::new(scanned_pdf(2), "scan.pdf"), &prompts)
        .await
        .unwrap();

    match &outcome {
        IngestOutcome::Indexed { method, format, .. } => {
            assert_eq!(method, "vision_fallback");
            assert_eq!(format, "pdf");
        }
        other => panic!("expected indexed outcome, got {other:?}"),
    }

    let documents = sink.documents.lock().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].text, "Invoice No. 123\nTotal 4,500");
    assert_eq!(documents[0].metadata["filename"], "scan.pdf");
    assert_eq!(documents[0].metadata["page_count"], 2);

    let instructions = model.instructions.lock().unwrap();
    assert_eq!(instructions.len(), 2);
    assert!(instructions
        .iter()
        .all(|i| i == "Split the image content into items and data"));
}

#[tokio::test]
async fn test_zip_upload_never_reaches_sink() {
    let (ingester, sink, model) = setup(&[]);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("notes.txt", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"not a document").unwrap();
    let archive = writer.finish().unwrap().into_inner();

    let err = ingester
        .ingest_upload(UploadedFile::new(archive, "bundle.zip"), &Prompts::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ExtUnsupportedFormat);
    assert!(sink.documents.lock().unwrap().is_empty());
    assert!(model.instructions.lock().unwrap().is_empty());
}
