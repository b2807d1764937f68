use crate::boundaries::BoundaryCollection;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-, accent- and padding-insensitive form of a name.
///
/// `normalize("  Côte-des-Neiges ") == "cote-des-neiges"`.
pub fn normalize(s: &str) -> String {
    // Lowercasing can itself introduce combining marks (e.g. `İ`), so strip twice.
    let lowered = strip_marks(s).to_lowercase();
    strip_marks(&lowered).trim().to_string()
}

fn strip_marks(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    by_name: HashMap<String, usize>,
    // (normalized name, index) in collection order, for substring matching.
    ordered: Vec<(String, usize)>,
    display: Vec<String>,
}

impl BoundaryIndex {
    pub fn build(collection: Option<&BoundaryCollection>) -> Self {
        let Some(collection) = collection else {
            return Self::default();
        };

        let mut index = Self::default();
        for (i, feature) in collection.iter().enumerate() {
            let key = normalize(&feature.name);
            // First feature wins on duplicate names.
            index.by_name.entry(key.clone()).or_insert(i);
            index.ordered.push((key, i));
            index.display.push(feature.name.clone());
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn exact(&self, normalized_query: &str) -> Option<usize> {
        self.by_name.get(normalized_query).copied()
    }

    // First hit in collection order wins.
    pub fn fuzzy(&self, normalized_query: &str) -> Option<usize> {
        if normalized_query.is_empty() {
            return None;
        }
        self.ordered
            .iter()
            .find(|(name, _)| name.contains(normalized_query))
            .map(|(_, i)| *i)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.display.get(index).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = (usize, &str)> {
        self.display.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }
}
