//! Source citations for answers.

use std::collections::HashSet;

use crate::types::{Chunk, ChunkMetadata};

/// `📄 {source}, Page {page}` with ` — {section}` when a section is known.
pub fn format_citation(metadata: &ChunkMetadata) -> String {
    let page = metadata
        .page_number
        .map(|p| p.to_string())
        .unwrap_or_else(|| "?".to_string());
    let mut citation = format!("📄 {}, Page {}", metadata.source_file, page);
    if let Some(section) = metadata.section_heading.as_deref().filter(|s| !s.is_empty()) {
        citation.push_str(" — ");
        citation.push_str(section);
    }
    citation
}

/// One citation per distinct (source, page), in first-seen order.
pub fn citations(chunks: &[Chunk]) -> Vec<String> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter(|c| seen.insert((c.metadata.source_file.as_str(), c.metadata.page_number)))
        .map(|c| format_citation(&c.metadata))
        .collect()
}

/// Markdown "Sources Used" block, or an empty string when there is nothing to cite.
pub fn format_citations_block(chunks: &[Chunk]) -> String {
    let lines = citations(chunks);
    if lines.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n\n---\n📚 **Sources Used:**\n");
    for line in lines {
        block.push_str("- ");
        block.push_str(&line);
        block.push('\n');
    }
    block
}
