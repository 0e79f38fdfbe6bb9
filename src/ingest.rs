//! Ingestion pipeline orchestration.
//!
//! Coordinates the full build: discovery → extraction → chunking → one
//! embedding batch → fresh index → atomic save. Every run replaces the
//! previous index and sidecar wholesale.

use anyhow::{Context, Result};
use std::path::PathBuf;

use ius_civile_core::chunk::chunk_document;
use ius_civile_core::index::VectorIndex;
use ius_civile_core::models::{Chunk, ChunkMeta};

use crate::config::{Capabilities, Config};
use crate::embedding::create_embedder;
use crate::extract::extract_file;
use crate::sources::{collect_documents, source_id};
use crate::store::{save_index, IngestLock};
use crate::traits::EmbeddingProvider;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub skipped: usize,
    pub chunks: usize,
    pub dims: usize,
}

/// CLI entry point: ingest `paths` and print a summary.
pub async fn run_ingest(
    config: &Config,
    caps: &Capabilities,
    paths: &[PathBuf],
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        let (counts, chunks) = collect_chunks(config, paths).await?;
        println!("ingest (dry-run)");
        println!("  documents found: {}", counts.read);
        if counts.failed > 0 {
            println!("  unreadable: {}", counts.failed);
        }
        println!("  estimated chunks: {}", chunks.len());
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding, caps)?;
    let report = ingest_documents(config, embedder.as_ref(), paths).await?;

    println!("ingest");
    println!("  documents: {}", report.documents);
    if report.skipped > 0 {
        println!("  skipped: {}", report.skipped);
    }
    println!("  chunks indexed: {}", report.chunks);
    println!("  embedding model: {}", embedder.model_name());
    println!("  index: {}", config.index_path().display());
    println!("ok");
    Ok(())
}

/// Build a fresh index from `paths` and persist it.
///
/// A chunk-window misconfiguration or an embedding failure aborts the run
/// before anything is written. A document that cannot be extracted at all is
/// skipped with a warning.
pub async fn ingest_documents(
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    paths: &[PathBuf],
) -> Result<IngestReport> {
    let _lock = IngestLock::acquire(config)?;

    let (counts, chunks) = collect_chunks(config, paths).await?;

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let metas: Vec<ChunkMeta> = chunks.iter().map(Chunk::to_meta).collect();

    tracing::info!(chunks = texts.len(), model = embedder.model_name(), "embedding chunks");
    let vectors = if texts.is_empty() {
        Vec::new()
    } else {
        embedder
            .embed(&texts)
            .await
            .context("Failed to embed chunks")?
    };

    let dims = vectors
        .first()
        .map(|v| v.len())
        .unwrap_or(config.embedding.dims);
    let mut index = VectorIndex::new(dims);
    index.add(vectors, metas)?;
    save_index(config, &index)?;

    tracing::info!(
        chunks = index.len(),
        dims,
        path = %config.index_path().display(),
        "index written"
    );

    Ok(IngestReport {
        documents: counts.read,
        skipped: counts.failed,
        chunks: index.len(),
        dims,
    })
}

#[derive(Debug, Clone, Copy)]
struct DocumentCounts {
    read: usize,
    failed: usize,
}

async fn collect_chunks(
    config: &Config,
    paths: &[PathBuf],
) -> Result<(DocumentCounts, Vec<Chunk>)> {
    let roots = paths.to_vec();
    let files = tokio::task::spawn_blocking(move || collect_documents(&roots))
        .await
        .context("document discovery task failed")??;
    let mut counts = DocumentCounts { read: 0, failed: 0 };
    let mut chunks = Vec::new();

    for path in &files {
        let owned = path.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_file(&owned)).await;
        let text = match extracted {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping document");
                counts.failed += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "extraction task failed, skipping document");
                counts.failed += 1;
                continue;
            }
        };

        let doc_chunks = chunk_document(
            &source_id(path),
            &text,
            config.chunking.size,
            config.chunking.overlap,
        )?;
        tracing::debug!(path = %path.display(), chunks = doc_chunks.len(), "document chunked");
        chunks.extend(doc_chunks);
        counts.read += 1;
    }

    Ok((counts, chunks))
}
