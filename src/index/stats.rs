use crate::index::reader::InvertedIndex;
use crate::index::wand_data::WandData;
use anyhow::Result;
use std::path::Path;

/// Display index statistics
pub fn show_stats(dir: &Path) -> Result<()> {
    let index = InvertedIndex::open(dir)?;
    let wand = WandData::open(&dir.join("wand.bin"))?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Location:          {}", dir.display());
    println!("Format version:    {}", index.meta.version);
    println!("Documents:         {}", index.num_docs());
    println!("Terms:             {}", index.num_terms());
    println!("Postings:          {}", index.meta.total_postings);
    println!("Avg doc length:    {:.2}", index.avg_doc_len());
    println!("Clusters:          {}", wand.clusters().len());

    if let Ok(size) = std::fs::metadata(dir.join("postings.bin")).map(|m| m.len()) {
        println!("Postings file:     {}", format_size(size));
    }
    if let Ok(size) = std::fs::metadata(dir.join("wand.bin")).map(|m| m.len()) {
        println!("Wand data file:    {}", format_size(size));
    }

    println!();
    println!("Cluster extents:");
    for (id, (start, end)) in wand.clusters().iter().enumerate().take(20) {
        println!("  {:6}  [{}, {})  {} docs", id, start, end, end - start);
    }
    if wand.clusters().len() > 20 {
        println!("  ... and {} more", wand.clusters().len() - 20);
    }

    Ok(())
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
