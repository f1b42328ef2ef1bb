//! End-to-end splitting of synthesized PDFs.

mod common;

use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use common::{build_pdf, scripted_backend, single_page_text, write_pdf, ScriptedEngine};
use ordersplit::split::NoProgress;
use ordersplit::{
    split_bytes, CancellationToken, DirectorySink, Error, ExtractionSource, MemorySink,
    OutputSink, PageSplitter, PatternKind, PdfDocument, SplitOptions,
};

fn text_only() -> PageSplitter {
    PageSplitter::new(SplitOptions::new().text_only())
}

fn names(sink: &MemorySink) -> Vec<String> {
    sink.names().into_iter().map(str::to_string).collect()
}

#[test]
fn test_one_file_per_page_in_order() {
    let pdf = build_pdf(&[
        "Invoice 2024600123 shipped",
        "Customer copy ORDER: 87654321",
        "Thank you for your business",
    ]);
    let mut sink = MemorySink::new();
    let report = split_bytes(&pdf, &mut sink).unwrap();

    assert_eq!(report.files.len(), 3);
    let indices: Vec<_> = report.files.iter().map(|f| f.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    assert_eq!(
        names(&sink),
        vec!["2024600123.pdf", "87654321.pdf", "page_3.pdf"]
    );
    assert_eq!(report.files[0].pattern, Some(PatternKind::YearPrefixed));
    assert_eq!(report.files[2].extraction_source, ExtractionSource::None);
    assert!(report.files[2].matched_number.is_none());
    assert!(report.is_complete());
}

#[test]
fn test_outputs_are_single_page_documents() {
    let pdf = build_pdf(&["Invoice 1234567890 first", "Invoice 1234567891 second"]);
    let mut sink = MemorySink::new();
    text_only().split_bytes(&pdf, &mut sink).unwrap();

    let first = single_page_text(sink.get("1234567890.pdf").unwrap());
    assert!(first.contains("first"));
    let second = single_page_text(sink.get("1234567891.pdf").unwrap());
    assert!(second.contains("second"));
}

#[test]
fn test_duplicate_numbers_get_suffixes() {
    let pdf = build_pdf(&[
        "Order 5555555555 page one",
        "Order 5555555555 page two",
        "Order 5555555555 page three",
    ]);
    let mut sink = MemorySink::new();
    let report = text_only().split_bytes(&pdf, &mut sink).unwrap();

    assert_eq!(
        names(&sink),
        vec!["5555555555.pdf", "5555555555_1.pdf", "5555555555_2.pdf"]
    );
    assert!(report
        .files
        .iter()
        .all(|f| f.matched_number.as_deref() == Some("5555555555")));
}

#[test]
fn test_blank_pages_use_positional_names() {
    let pdf = build_pdf(&["", "", "Order 1234567890 here"]);
    let mut sink = MemorySink::new();
    let report = text_only().split_bytes(&pdf, &mut sink).unwrap();

    assert_eq!(
        names(&sink),
        vec!["page_1.pdf", "page_2.pdf", "1234567890.pdf"]
    );
    assert_eq!(report.stats.unmatched, 2);
    assert_eq!(report.stats.native_text, 1);
}

#[test]
fn test_non_pdf_input_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.pdf");
    std::fs::write(&input, "just some text, no header").unwrap();
    let out = dir.path().join("out");

    let mut sink = DirectorySink::new(&out).unwrap();
    let err = text_only().split_file(&input, &mut sink).unwrap_err();
    assert!(err.is_input_format());
    assert!(matches!(err, Error::UnknownFormat));
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_ocr_not_called_when_native_text_matches() {
    let pdf = build_pdf(&["Invoice 1234567890", "Invoice 1234567891"]);
    let (backend, rasterizer, engine) = scripted_backend(ScriptedEngine::new());
    let splitter = PageSplitter::new(SplitOptions::default()).with_ocr_backend(backend);

    let mut sink = MemorySink::new();
    let report = splitter.split_bytes(&pdf, &mut sink).unwrap();

    assert_eq!(report.stats.native_text, 2);
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_ocr_fallback_names_scanned_pages() {
    let pdf = build_pdf(&["scan-2", "Invoice 1234567890", "scan-3"]);
    let engine = ScriptedEngine::new().answer(2, "ORDER: 20251234567 received");
    let (backend, rasterizer, engine) = scripted_backend(engine);
    let splitter = PageSplitter::new(SplitOptions::default()).with_ocr_backend(backend);

    let mut sink = MemorySink::new();
    let report = splitter.split_bytes(&pdf, &mut sink).unwrap();

    assert_eq!(
        names(&sink),
        vec!["20251234567.pdf", "1234567890.pdf", "page_3.pdf"]
    );
    assert_eq!(report.files[0].extraction_source, ExtractionSource::Ocr);
    assert!(report.files[0].needs_review);
    assert!(!report.files[1].needs_review);
    assert!(!report.files[2].needs_review);
    assert_eq!(report.stats.ocr, 1);
    assert_eq!(report.stats.unmatched, 1);
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_ocr_failure_on_one_page_completes_run() {
    let pdf = build_pdf(&["scan-2", "scan-3", "scan-4"]);
    let engine = ScriptedEngine::new()
        .answer(2, "№ 111122223")
        .fail(3, "engine crashed")
        .answer(4, "Ref 4444555566");
    let (backend, _, _) = scripted_backend(engine);
    let splitter = PageSplitter::new(SplitOptions::default()).with_ocr_backend(backend);

    let mut sink = MemorySink::new();
    let report = splitter.split_bytes(&pdf, &mut sink).unwrap();

    assert!(report.is_complete());
    assert_eq!(
        names(&sink),
        vec!["111122223.pdf", "page_2.pdf", "4444555566.pdf"]
    );
    assert_eq!(report.files[1].extraction_source, ExtractionSource::None);
    assert_eq!(report.stats.ocr_failures, 1);
    assert_eq!(report.stats.ocr, 2);
}

#[test]
fn test_ocr_disabled_by_options() {
    let pdf = build_pdf(&["scan-2"]);
    let engine = ScriptedEngine::new().answer(2, "Invoice 1234567890");
    let (backend, rasterizer, _) = scripted_backend(engine);
    let splitter = PageSplitter::new(SplitOptions::new().text_only()).with_ocr_backend(backend);

    let mut sink = MemorySink::new();
    splitter.split_bytes(&pdf, &mut sink).unwrap();
    assert_eq!(names(&sink), vec!["page_1.pdf"]);
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_after_first_page() {
    let pdf = build_pdf(&[
        "Invoice 1234567890",
        "Invoice 1234567891",
        "Invoice 1234567892",
    ]);
    let doc = PdfDocument::from_bytes(&pdf).unwrap();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let mut progress = move |done: u32, _total: u32, _source: ExtractionSource| {
        if done == 1 {
            token.cancel();
        }
    };

    let mut sink = MemorySink::new();
    let report = text_only()
        .split_with(&doc, &mut sink, &mut progress, &cancel)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(names(&sink), vec!["1234567890.pdf"]);
    assert_eq!(report.stats.processed, 1);
    assert_eq!(report.stats.skipped, 2);
    assert!(!report.is_complete());
}

/// Hands each written name to another thread and waits for its reply.
struct HandshakeSink {
    inner: MemorySink,
    written: mpsc::Sender<String>,
    resume: mpsc::Receiver<()>,
}

impl OutputSink for HandshakeSink {
    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> ordersplit::Result<()> {
        self.inner.write(name, data)?;
        if self.written.send(name.to_string()).is_ok() {
            let _ = self.resume.recv();
        }
        Ok(())
    }
}

#[test]
fn test_cancel_from_another_thread_keeps_written_pages_intact() {
    let pdf = build_pdf(&[
        "Invoice 1234567890",
        "Invoice 1234567891",
        "Invoice 1234567892",
    ]);
    let doc = PdfDocument::from_bytes(&pdf).unwrap();
    let cancel = CancellationToken::new();

    let (written_tx, written_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel();
    let token = cancel.clone();
    let canceller = thread::spawn(move || {
        let first = written_rx.recv().unwrap();
        token.cancel();
        resume_tx.send(()).unwrap();
        first
    });

    let mut sink = HandshakeSink {
        inner: MemorySink::new(),
        written: written_tx,
        resume: resume_rx,
    };
    let report = text_only()
        .split_with(&doc, &mut sink, &mut NoProgress, &cancel)
        .unwrap();

    assert_eq!(canceller.join().unwrap(), "1234567890.pdf");
    assert!(report.cancelled);
    assert_eq!(report.stats.processed, 1);
    assert_eq!(report.stats.skipped, 2);
    assert_eq!(names(&sink.inner), vec!["1234567890.pdf"]);
    let written = sink.inner.get("1234567890.pdf").unwrap();
    assert!(single_page_text(written).contains("1234567890"));
}

#[test]
fn test_large_document_splits_in_reasonable_time() {
    let texts: Vec<String> = (0..400)
        .map(|i| format!("Invoice {} x", 1_000_000_000 + i))
        .collect();
    let pages: Vec<&str> = texts.iter().map(String::as_str).collect();
    let pdf = build_pdf(&pages);

    let started = Instant::now();
    let mut sink = MemorySink::new();
    let report = text_only().split_bytes(&pdf, &mut sink).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.stats.processed, 400);
    assert_eq!(report.stats.matched(), 400);
    assert!(
        elapsed < Duration::from_secs(60),
        "400 pages took {:?}",
        elapsed
    );
    // Each output carries one page, not the whole input
    let largest = sink.names().iter().filter_map(|n| sink.get(n)).map(<[u8]>::len).max();
    assert!(largest.unwrap() * 20 < pdf.len());
}

#[test]
fn test_parallel_matches_sequential() {
    let pages = [
        "Invoice 5555555555",
        "",
        "scan-2",
        "Invoice 5555555555",
        "ORDER 98765432",
        "scan-3",
        "Invoice 5555555555",
    ];
    let pdf = build_pdf(&pages);

    let run = |parallel: bool| {
        let engine = ScriptedEngine::new()
            .answer(2, "Invoice 5555555555")
            .fail(3, "unreadable");
        let (backend, _, _) = scripted_backend(engine);
        let splitter = PageSplitter::new(SplitOptions::new().with_parallel(parallel))
            .with_ocr_backend(backend);
        let mut sink = MemorySink::new();
        let report = splitter.split_bytes(&pdf, &mut sink).unwrap();
        (report, sink)
    };

    let (sequential, sequential_sink) = run(false);
    let (parallel, parallel_sink) = run(true);

    assert_eq!(sequential.files, parallel.files);
    assert_eq!(sequential_sink.into_files(), parallel_sink.into_files());
    assert_eq!(
        sequential
            .files
            .iter()
            .map(|f| f.assigned_name.as_str())
            .collect::<Vec<_>>(),
        vec![
            "5555555555.pdf",
            "page_2.pdf",
            "5555555555_1.pdf",
            "5555555555_2.pdf",
            "98765432.pdf",
            "page_6.pdf",
            "5555555555_3.pdf",
        ]
    );
}

#[test]
fn test_parallel_cancelled_up_front() {
    let pdf = build_pdf(&["Invoice 1234567890", "Invoice 1234567891"]);
    let doc = PdfDocument::from_bytes(&pdf).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let splitter = PageSplitter::new(SplitOptions::new().text_only().parallel());
    let mut sink = MemorySink::new();
    let report = splitter
        .split_with(&doc, &mut sink, &mut NoProgress, &cancel)
        .unwrap();
    assert!(report.cancelled);
    assert!(sink.is_empty());
    assert_eq!(report.stats.skipped, 2);
}

#[test]
fn test_directory_sink_keeps_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(
        dir.path(),
        "orders.pdf",
        &["Invoice 1234567890", "nothing"],
    );
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();
    std::fs::write(out.join("1234567890.pdf"), b"earlier run").unwrap();
    std::fs::write(out.join("page_2.pdf"), b"earlier run").unwrap();

    let mut sink = DirectorySink::new(&out).unwrap();
    let report = text_only().split_file(&input, &mut sink).unwrap();

    let names: Vec<_> = report.files.iter().map(|f| f.assigned_name.as_str()).collect();
    assert_eq!(names, vec!["1234567890_1.pdf", "page_2_1.pdf"]);
    assert_eq!(std::fs::read(out.join("1234567890.pdf")).unwrap(), b"earlier run");
    assert!(sink.exists("page_2_1.pdf"));

    let written = std::fs::read(out.join("1234567890_1.pdf")).unwrap();
    assert!(single_page_text(&written).contains("1234567890"));
}

#[cfg(feature = "archive")]
#[test]
fn test_zip_output() {
    use std::io::{Cursor, Read};

    let pdf = build_pdf(&["Invoice 1234567890", "Invoice 1234567890"]);
    let mut sink = ordersplit::ZipSink::new(Cursor::new(Vec::new()));
    let report = text_only().split_bytes(&pdf, &mut sink).unwrap();
    assert_eq!(report.files.len(), 2);

    let bytes = sink.finish().unwrap().into_inner();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);

    let mut data = Vec::new();
    archive
        .by_name("1234567890_1.pdf")
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    assert!(single_page_text(&data).contains("1234567890"));
}

#[test]
fn test_report_json() {
    let pdf = build_pdf(&["Invoice 1234567890", ""]);
    let mut sink = MemorySink::new();
    let report = text_only().split_bytes(&pdf, &mut sink).unwrap();

    let json = report.to_json(ordersplit::JsonFormat::Pretty).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["files"][0]["assigned_name"], "1234567890.pdf");
    assert_eq!(value["files"][1]["extraction_source"], "none");
    assert_eq!(value["stats"]["processed"], 2);
    assert_eq!(value["cancelled"], false);
}
