use serde::Serialize;
use std::collections::BTreeSet;

/// Selected boundary indices. Empty means no spatial restriction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Selection(BTreeSet<usize>);

impl Selection {
    pub fn single(index: usize) -> Self {
        Self(BTreeSet::from([index]))
    }

    /// Next selection after the user picks `candidate`.
    ///
    /// Picking the sole selected boundary clears; anything else replaces.
    pub fn select(&self, candidate: usize) -> Self {
        if self.0.len() == 1 && self.0.contains(&candidate) {
            Self::default()
        } else {
            Self::single(candidate)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_replaces_then_toggles_off() {
        let empty = Selection::default();
        let one = empty.select(3);
        assert_eq!(one, Selection::single(3));

        let other = one.select(5);
        assert_eq!(other.iter().collect::<Vec<_>>(), vec![5]);

        assert!(other.select(5).is_empty());
    }

    #[test]
    fn toggling_twice_returns_to_show_all() {
        for i in [0, 1, 42] {
            let s = Selection::default().select(i).select(i);
            assert_eq!(s, Selection::default());
        }
    }

    #[test]
    fn serializes_as_index_list() {
        let json = serde_json::to_string(&Selection::single(2)).unwrap();
        assert_eq!(json, "[2]");
    }
}
