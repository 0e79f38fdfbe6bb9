//! Integration tests for document ingestion: supported formats, skipped
//! documents, directory discovery and the persisted index/metadata pair.

use std::fs;
use std::path::{Path, PathBuf};

use ius_civile::config::Config;
use ius_civile::embedding::OfflineEmbedder;
use ius_civile::ingest::ingest_documents;
use ius_civile::store::{load_index, IngestLock};
use tempfile::TempDir;

/// Minimal single-page PDF showing `phrase` in Helvetica.
/// Builds body then xref with correct byte offsets.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    pdf_with_pages(&[Some(phrase)])
}

/// One page per entry. A `None` page points `/Contents` at a missing object.
fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    let n = pages.len();
    let font_id = 3 + 2 * n;
    let mut offsets = Vec::new();
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + i)).collect();
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            n
        )
        .as_bytes(),
    );
    for (i, page) in pages.iter().enumerate() {
        let contents = if page.is_some() { 3 + n + i } else { 999 };
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >> endobj\n",
                3 + i,
                contents,
                font_id
            )
            .as_bytes(),
        );
    }
    for (i, page) in pages.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", page.unwrap_or(""));
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                3 + n + i,
                content.len(),
                content
            )
            .as_bytes(),
        );
    }
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "{} 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
            font_id
        )
        .as_bytes(),
    );

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n",
            offsets.len() + 1
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup(tmp: &TempDir) -> (Config, PathBuf) {
    let mut config = Config::minimal();
    config.data.dir = tmp.path().join("data");
    config.embedding.dims = 16;
    let files = tmp.path().join("files");
    fs::create_dir_all(&files).unwrap();
    (config, files)
}

fn embedder() -> OfflineEmbedder {
    OfflineEmbedder::new(42, 16)
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_text_documents_are_chunked_and_persisted() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);

    let long = "Art. 1173 c.c. Fonti delle obbligazioni. ".repeat(120);
    let long_len = long.chars().count();
    let a = write(&files, "codice.txt", &long);
    let b = write(&files, "note.md", "# Contratto\n\nAccordo di due o più parti.");

    let report = ingest_documents(&config, &embedder(), &[a, b]).await.unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.chunks, long_len.div_ceil(2100) + 1);
    assert_eq!(report.dims, 16);

    let index = load_index(&config).unwrap().unwrap();
    assert_eq!(index.len(), report.chunks);

    let sidecar: Vec<serde_json::Value> =
        serde_json::from_slice(&fs::read(config.meta_path()).unwrap()).unwrap();
    assert_eq!(sidecar.len(), index.len());
    assert_eq!(sidecar[0]["source"], "codice.txt");
    assert_eq!(sidecar[0]["citation"], "codice.txt — chunk 1");
    assert_eq!(sidecar[1]["citation"], "codice.txt — chunk 2");
    assert_eq!(
        sidecar.last().unwrap()["citation"],
        "note.md — chunk 1"
    );
}

#[tokio::test]
async fn test_unsupported_and_broken_documents_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);

    let good = write(&files, "buono.txt", "La donazione richiede l'atto pubblico.");
    let docx = write(&files, "memoria.docx", "not really a docx");
    let broken = write(&files, "rotto.pdf", "definitely not a pdf");

    let report = ingest_documents(&config, &embedder(), &[good, docx, broken])
        .await
        .unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.chunks, 1);
}

#[tokio::test]
async fn test_pdf_is_extracted_not_skipped() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);

    let pdf = files.join("sentenza.pdf");
    fs::write(&pdf, minimal_pdf_with_phrase("massima di prova")).unwrap();

    let report = ingest_documents(&config, &embedder(), &[pdf]).await.unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.skipped, 0);

    let sidecar = fs::read_to_string(config.meta_path()).unwrap();
    assert!(sidecar.contains("massima di prova"), "sidecar: {sidecar}");
}

#[tokio::test]
async fn test_pdf_with_unreadable_page_keeps_readable_text() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);

    let pdf = files.join("ordinanza.pdf");
    fs::write(&pdf, pdf_with_pages(&[Some("principio di diritto"), None])).unwrap();

    let report = ingest_documents(&config, &embedder(), &[pdf]).await.unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.skipped, 0);

    let sidecar = fs::read_to_string(config.meta_path()).unwrap();
    assert!(sidecar.contains("principio di diritto"), "sidecar: {sidecar}");
}

#[tokio::test]
async fn test_directory_ingest_walks_supported_files() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);

    fs::create_dir_all(files.join("libro_iv")).unwrap();
    write(&files, "a.txt", "Primo documento.");
    write(&files.join("libro_iv"), "b.md", "Secondo documento.");
    write(&files, "ignorato.csv", "x,y");

    let report = ingest_documents(&config, &embedder(), &[files.clone()])
        .await
        .unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.skipped, 0);

    let index = load_index(&config).unwrap().unwrap();
    let sources: Vec<&str> = index.entries().iter().map(|e| e.meta.source.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "b.md"]);
}

#[tokio::test]
async fn test_reingest_replaces_previous_index() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);

    let first = write(&files, "uno.txt", "Primo.");
    let second = write(&files, "due.txt", "Secondo.");
    let third = write(&files, "tre.txt", "Terzo.");

    ingest_documents(&config, &embedder(), &[first, second])
        .await
        .unwrap();
    assert_eq!(load_index(&config).unwrap().unwrap().len(), 2);

    ingest_documents(&config, &embedder(), &[third]).await.unwrap();
    let index = load_index(&config).unwrap().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.entries()[0].meta.source, "tre.txt");
}

#[tokio::test]
async fn test_empty_documents_produce_empty_index() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);
    let empty = write(&files, "vuoto.txt", "");

    let report = ingest_documents(&config, &embedder(), &[empty]).await.unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 0);

    let index = load_index(&config).unwrap().unwrap();
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_bad_chunk_window_fails_before_writing() {
    let tmp = TempDir::new().unwrap();
    let (mut config, files) = setup(&tmp);
    config.chunking.size = 100;
    config.chunking.overlap = 100;
    let doc = write(&files, "doc.txt", "Testo qualsiasi.");

    assert!(ingest_documents(&config, &embedder(), &[doc]).await.is_err());
    assert!(load_index(&config).unwrap().is_none());
    assert!(!config.lock_path().exists());
}

#[tokio::test]
async fn test_concurrent_ingest_is_refused() {
    let tmp = TempDir::new().unwrap();
    let (config, files) = setup(&tmp);
    let doc = write(&files, "doc.txt", "Testo.");

    let _held = IngestLock::acquire(&config).unwrap();
    let err = ingest_documents(&config, &embedder(), &[doc])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("another ingestion is running"));
}
