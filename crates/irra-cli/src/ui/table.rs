//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `irra sources` | `render_sources_table()` |
//! | `irra retrieve` | `render_chunks_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use irra_core::{Chunk, SourceSummary};

use super::color::terminal_width;
use super::format::{preview, truncate_str};

/// Render the per-source listing for `irra sources`.
///
/// # Example Output
///
/// ```text
/// SOURCE                 CHUNKS   TOPIC      TYPE      NOTEBOOK
/// week3_osmosis.pdf          14   Biology    lecture   bio101
/// lab2.pdf                    6   -          lab       bio101
/// ```
pub fn render_sources_table(sources: &[SourceSummary]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("SOURCE"),
        Cell::new("CHUNKS").set_alignment(CellAlignment::Right),
        Cell::new("TOPIC"),
        Cell::new("TYPE"),
        Cell::new("NOTEBOOK"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // SOURCE
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // CHUNKS
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // TOPIC
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // TYPE
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // NOTEBOOK
    ]);

    for source in sources {
        table.add_row(vec![
            Cell::new(truncate_str(&source.source_file, 40)),
            Cell::new(source.chunk_count).set_alignment(CellAlignment::Right),
            Cell::new(or_dash(source.topic.as_deref())),
            Cell::new(or_dash(source.doc_type.as_deref())),
            Cell::new(or_dash(source.notebook_id.as_deref())),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render retrieved chunks in rank order with a text preview sized to the terminal.
///
/// # Example Output
///
/// ```text
/// #   SOURCE              PAGE   WEEK   PREVIEW
/// 1   week3_osmosis.pdf      4      3   Osmosis is the diffusion of water...
/// ```
pub fn render_chunks_table(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let preview_width = terminal_width().saturating_sub(48).clamp(20, 100);

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SOURCE"),
        Cell::new("PAGE").set_alignment(CellAlignment::Right),
        Cell::new("WEEK").set_alignment(CellAlignment::Right),
        Cell::new("PREVIEW"),
    ]);

    for (rank, chunk) in chunks.iter().enumerate() {
        let meta = &chunk.metadata;
        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&meta.source_file, 28)),
            Cell::new(or_dash(meta.page_number.map(|p| p.to_string()).as_deref()))
                .set_alignment(CellAlignment::Right),
            Cell::new(or_dash(meta.week.map(|w| w.to_string()).as_deref()))
                .set_alignment(CellAlignment::Right),
            Cell::new(preview(&chunk.content, preview_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irra_core::ChunkMetadata;

    #[test]
    fn test_empty_tables() {
        assert_eq!(render_sources_table(&[]), "");
        assert_eq!(render_chunks_table(&[]), "");
    }

    #[test]
    fn test_sources_table_contents() {
        let rows = vec![SourceSummary {
            source_file: "week3.pdf".to_string(),
            topic: Some("Biology".to_string()),
            doc_type: None,
            notebook_id: None,
            chunk_count: 14,
        }];
        let output = render_sources_table(&rows);
        assert!(output.contains("SOURCE"));
        assert!(output.contains("week3.pdf"));
        assert!(output.contains("14"));
        assert!(output.contains("Biology"));
        assert!(output.contains('-'));
    }

    #[test]
    fn test_chunks_table_contents() {
        let chunks = vec![Chunk::new(
            "Osmosis moves\nwater",
            ChunkMetadata::for_source("week3.pdf").with_page(4),
        )];
        let output = render_chunks_table(&chunks);
        assert!(output.contains("week3.pdf"));
        assert!(output.contains("Osmosis moves water"));
        assert!(output.contains('4'));
    }
}
