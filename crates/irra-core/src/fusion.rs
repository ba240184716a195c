//! Reciprocal Rank Fusion.
//!
//! Merges ranked lists from retrievers whose scores are not comparable
//! (BM25 vs. cosine similarity) using rank positions only.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Chunk, ChunkKey};

/// One fused chunk with its accumulated RRF score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedEntry {
    pub chunk: Chunk,
    pub score: f64,
}

/// Fusion output, best first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FusedResult {
    pub entries: Vec<FusedEntry>,
}

impl FusedResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.entries.into_iter().map(|e| e.chunk).collect()
    }
}

/// Fuse ranked lists with RRF.
///
/// Every appearance of a chunk at zero-based `rank` adds
/// `1 / (k_constant + rank + 1)`. Duplicates are detected with
/// [`ChunkKey`]; the first-seen instance is kept. Output is sorted by score
/// descending with ties in first-seen order.
pub fn fuse(lists: &[Vec<Chunk>], k_constant: usize) -> FusedResult {
    let mut positions: HashMap<ChunkKey, usize> = HashMap::new();
    let mut entries: Vec<FusedEntry> = Vec::new();

    for list in lists {
        for (rank, chunk) in list.iter().enumerate() {
            let contribution = 1.0 / (k_constant as f64 + rank as f64 + 1.0);
            let key = chunk.key();
            match positions.get(&key) {
                Some(&pos) => entries[pos].score += contribution,
                None => {
                    positions.insert(key, entries.len());
                    entries.push(FusedEntry {
                        chunk: chunk.clone(),
                        score: contribution,
                    });
                }
            }
        }
    }

    // Vec::sort_by is stable, which keeps first-seen order on ties
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    FusedResult { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_RRF_K;
    use crate::types::ChunkMetadata;
    use std::collections::HashSet;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text, ChunkMetadata::for_source("notes.pdf"))
    }

    fn contents(result: &FusedResult) -> Vec<&str> {
        result.chunks().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_empty_inputs() {
        assert!(fuse(&[], DEFAULT_RRF_K).is_empty());
        assert!(fuse(&[vec![]], DEFAULT_RRF_K).is_empty());
        assert!(fuse(&[vec![], vec![]], DEFAULT_RRF_K).is_empty());
    }

    #[test]
    fn test_union_with_each_chunk_once() {
        let lists = vec![
            vec![chunk("a"), chunk("b"), chunk("c")],
            vec![chunk("c"), chunk("d"), chunk("a")],
        ];
        let fused = fuse(&lists, DEFAULT_RRF_K);

        assert_eq!(fused.len(), 4);
        let distinct: HashSet<&str> = contents(&fused).into_iter().collect();
        assert_eq!(distinct, ["a", "b", "c", "d"].into_iter().collect());
    }

    #[test]
    fn test_multi_list_chunk_beats_single_list_top() {
        let lists = vec![
            vec![chunk("shared"), chunk("x")],
            vec![chunk("only"), chunk("y")],
            vec![chunk("shared")],
        ];
        // "only" is rank 0 in one list; "shared" is rank 0 in two
        let fused = fuse(&lists, DEFAULT_RRF_K);
        assert_eq!(fused.entries[0].chunk.content, "shared");
        assert!(fused.entries[0].score > fused.entries[1].score);
    }

    #[test]
    fn test_scores_follow_formula() {
        let fused = fuse(&[vec![chunk("a"), chunk("b")], vec![chunk("b")]], 60);
        let a = fused.entries.iter().find(|e| e.chunk.content == "a").unwrap();
        let b = fused.entries.iter().find(|e| e.chunk.content == "b").unwrap();

        assert!((a.score - 1.0 / 61.0).abs() < 1e-12);
        assert!((b.score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert_eq!(contents(&fused), vec!["b", "a"]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let fused = fuse(&[vec![chunk("first")], vec![chunk("second")]], 60);
        assert_eq!(contents(&fused), vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_keeps_first_seen_instance() {
        let prefix = "p".repeat(crate::types::CHUNK_KEY_CHARS);
        let dense = Chunk::new(
            format!("{prefix} dense tail"),
            ChunkMetadata::for_source("dense.pdf"),
        );
        let keyword = Chunk::new(
            format!("{prefix} keyword tail"),
            ChunkMetadata::for_source("keyword.pdf"),
        );

        let fused = fuse(&[vec![dense.clone()], vec![keyword]], 60);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused.entries[0].chunk, dense);
    }
}
