use std::collections::HashSet;
use crate::core::{Fingerprint, State};

/// Set of fingerprints that a solver will refuse to expand. A solve call
/// borrows it mutably and adds every state it expands; anything placed in it
/// beforehand is treated exactly as if it had been explored already, which
/// is how callers steer a search away from a known solution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitedRegistry {
    seen: HashSet<Fingerprint>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self { seen: HashSet::new() }
    }

    /// Registry pre-seeded with the fingerprints of the given states.
    pub fn excluding<'a, S: State + 'a, I: IntoIterator<Item = &'a S>>(states: I) -> Self {
        states.into_iter().map(|s| s.fingerprint()).collect()
    }

    /// Returns false if the fingerprint was already present.
    pub fn insert(&mut self, fp: Fingerprint) -> bool {
        self.seen.insert(fp)
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.seen.contains(fp)
    }

    pub fn contains_state<S: State>(&self, state: &S) -> bool {
        self.seen.contains(&state.fingerprint())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.seen.iter()
    }
}

impl FromIterator<Fingerprint> for VisitedRegistry {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        Self { seen: iter.into_iter().collect() }
    }
}

impl Extend<Fingerprint> for VisitedRegistry {
    fn extend<I: IntoIterator<Item = Fingerprint>>(&mut self, iter: I) {
        self.seen.extend(iter);
    }
}
