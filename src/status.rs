//! Index and backend overview for `ius status`.
//!
//! Answers "what is indexed and what will a query use": index location and
//! age, chunk counts per source document, and which backends are configured.

use anyhow::Result;
use std::collections::BTreeMap;
use std::time::SystemTime;

use ius_civile_core::index::VectorIndex;

use crate::config::{Capabilities, Config};
use crate::store::load_index;

/// Run the status command: load the index and print a summary.
pub fn run_status(config: &Config, caps: &Capabilities) -> Result<()> {
    let index_path = config.index_path();

    println!("Ius Civile — Status");
    println!("===================");
    println!();
    println!("  Data dir:    {}", config.data.dir.display());

    match load_index(config) {
        Ok(Some(index)) => {
            let meta = std::fs::metadata(&index_path)?;
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| format_ts_relative(d.as_secs() as i64))
                .unwrap_or_else(|| "unknown".to_string());

            println!("  Index:       {}", index_path.display());
            println!("  Size:        {}", format_bytes(meta.len()));
            println!("  Built:       {}", modified);
            println!("  Chunks:      {}", index.len());
            println!("  Dimensions:  {}", index.dims());
            print_sources(&index);
        }
        Ok(None) => {
            println!("  Index:       not built (run `ius ingest <files>`)");
        }
        Err(e) => {
            println!("  Index:       UNUSABLE ({:#})", e);
        }
    }

    println!();
    println!("  Backends:");
    println!(
        "  {:<14} {}",
        "generative",
        match &caps.generative {
            Some(creds) => format!("{} via {}", config.generation.model, creds.base_url),
            None => "offline".to_string(),
        }
    );
    println!(
        "  {:<14} {}",
        "embedding",
        if caps.is_offline() {
            format!("offline (seed {})", config.embedding.offline_seed)
        } else {
            config.embedding.model.clone()
        }
    );
    println!(
        "  {:<14} {}",
        "web search",
        if caps.web_search.is_some() {
            "google custom search"
        } else {
            "not configured"
        }
    );
    println!();

    Ok(())
}

/// Chunk count per source document, sorted by name.
fn source_counts(index: &VectorIndex) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for entry in index.entries() {
        *counts.entry(entry.meta.source.as_str()).or_insert(0) += 1;
    }
    counts
}

fn print_sources(index: &VectorIndex) {
    let counts = source_counts(index);
    if counts.is_empty() {
        return;
    }
    println!();
    println!("  By source:");
    println!("  {:<48} {:>8}", "SOURCE", "CHUNKS");
    println!("  {}", "-".repeat(57));
    for (source, chunks) in counts {
        println!("  {:<48} {:>8}", source, chunks);
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ius_civile_core::models::ChunkMeta;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_relative_time() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 2 * 3600), "2 hours ago");
        assert_eq!(format_ts_relative(now - 86400), "1 day ago");
    }

    #[test]
    fn test_source_counts() {
        let meta = |source: &str, n: usize| ChunkMeta {
            source: source.to_string(),
            chunk: String::new(),
            citation: format!("{} — chunk {}", source, n),
        };
        let mut index = VectorIndex::new(1);
        index
            .add(
                vec![vec![1.0], vec![1.0], vec![1.0]],
                vec![meta("b.pdf", 1), meta("a.txt", 1), meta("b.pdf", 2)],
            )
            .unwrap();
        let counts: Vec<(&str, usize)> = source_counts(&index).into_iter().collect();
        assert_eq!(counts, vec![("a.txt", 1), ("b.pdf", 2)]);
    }
}
