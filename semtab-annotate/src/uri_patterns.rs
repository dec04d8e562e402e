//! URI pattern boost
//!
//! Resource names often embed context from neighbouring cells
//! (`Paris,_Texas` next to a `Texas` cell). A candidate whose URI contains
//! another cell of the same row gains a little confidence.

use semtab_core::{local_name, EntityCandidate, UriAnalysisConfig};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Lowercase alphanumerics only.
pub fn normalize_fragment(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
pub struct UriPatternAnalyzer {
    config: UriAnalysisConfig,
}

impl UriPatternAnalyzer {
    pub fn new(config: UriAnalysisConfig) -> Self {
        Self { config }
    }

    /// Boost candidates in place. Returns the number of boosts applied.
    pub fn analyze(&self, columns: &mut [Vec<EntityCandidate>]) -> usize {
        // Normalised cell values per column, by row.
        let values: Vec<HashMap<usize, BTreeSet<String>>> = columns
            .iter()
            .map(|candidates| {
                let mut by_row: HashMap<usize, BTreeSet<String>> = HashMap::new();
                for candidate in candidates {
                    let value = normalize_fragment(&candidate.cell.value);
                    if value.chars().count() >= self.config.min_match_length {
                        by_row.entry(candidate.cell.row_index).or_default().insert(value);
                    }
                }
                by_row
            })
            .collect();

        let mut applied: HashSet<(String, usize, String)> = HashSet::new();
        let mut boosts = 0;

        for (i, candidates) in columns.iter_mut().enumerate() {
            for candidate in candidates.iter_mut() {
                let segment = normalize_fragment(local_name(&candidate.entity.uri));
                if segment.is_empty() {
                    continue;
                }
                let row = candidate.cell.row_index;

                for (k, other) in values.iter().enumerate() {
                    if k == i {
                        continue;
                    }
                    let Some(row_values) = other.get(&row) else {
                        continue;
                    };
                    for value in row_values {
                        if !segment.contains(value.as_str()) {
                            continue;
                        }
                        let key = (candidate.entity.uri.clone(), row, value.clone());
                        if applied.insert(key) {
                            candidate.boost(self.config.confidence_boost);
                            boosts += 1;
                        }
                    }
                }
            }
        }

        debug!(boosts, "uri pattern analysis");
        boosts
    }
}
