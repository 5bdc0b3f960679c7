use std::collections::HashMap;
use std::hash::Hash;

/// Occurrence counter that remembers first-encounter order, so ties stay
/// stable when the entries are later ranked.
pub(crate) struct Tally<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, i64)>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self { index: HashMap::new(), entries: Vec::new() }
    }

    pub fn add(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    /// Entries in first-encounter order.
    pub fn into_entries(self) -> Vec<(K, i64)> {
        self.entries
    }

    /// Highest counts first, ties in first-encounter order.
    pub fn top(self, n: usize) -> Vec<(K, i64)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
    }
}

impl<K: Eq + Hash + Clone> FromIterator<K> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Self::new();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}

/// Arithmetic mean, `None` for an empty input.
pub(crate) fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, n) = values.into_iter().fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
