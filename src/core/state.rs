//! # Ephemeral Navigation State
//!
//! State that lives for one router cycle and then disappears. Something set
//! while cycle N is running is still readable through cycle N+1 and is gone
//! once cycle N+2 starts.
//!
//! ```text
//! set_state("x")      check_state()      check_state()
//!   gen 0 ───────────────► gen 1 ───────────► gen 2
//!   created=0            age 1: kept        age 2: deleted
//! ```
//!
//! `check_state()` is the checkpoint. The router calls it exactly once per
//! cycle, when content is swapped. Calling it twice in a cycle expires
//! everything a cycle early; never calling it keeps entries forever.

use std::collections::BTreeMap;

/// Entries this many generations old are swept.
const EXPIRY_AGE: u64 = 2;

#[derive(Debug, Clone)]
struct StateEntry<V> {
    name: String,
    value: V,
    created: u64,
}

/// Ordered by insertion id, so lookups by name find the earliest entry first.
#[derive(Debug)]
pub struct EphemeralStateStore<V> {
    entries: BTreeMap<u64, StateEntry<V>>,
    next_id: u64,
    generation: u64,
}

impl<V> Default for EphemeralStateStore<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
            generation: 0,
        }
    }
}

impl<V> EphemeralStateStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Names are not deduplicated.
    pub fn set_state(&mut self, name: impl Into<String>, value: V) {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            StateEntry {
                name: name.into(),
                value,
                created: self.generation,
            },
        );
    }

    pub fn get_state(&self, name: &str) -> Option<&V> {
        self.entries
            .values()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    /// Advances one generation and sweeps expired entries.
    pub fn check_state(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        self.entries
            .retain(|_, entry| generation - entry.created < EXPIRY_AGE);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
