// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Token index over the long-term tier.
//!
//! Maps lower-cased word tokens (length > 2) to the set of keys whose
//! serialized value contains them. Lookups are an unranked OR over the
//! query's tokens: a recall-oriented candidate filter, not a relevance
//! engine. The index holds at most `capacity` keys; inserting into a full
//! index evicts the key with the oldest insertion first.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const MIN_TOKEN_CHARS: usize = 3;

#[derive(Debug, Clone)]
pub struct InvertedIndex {
    capacity: usize,
    postings: HashMap<String, HashSet<String>>,
    inserted: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl InvertedIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            postings: HashMap::new(),
            inserted: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Split on non-word characters, lower-case, drop short tokens.
    pub fn tokenize(text: &str) -> BTreeSet<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .map(str::to_lowercase)
            .collect()
    }

    /// Index `text` under `key`, replacing any previous postings for it.
    /// Returns the key evicted to make room, if any.
    pub fn add(&mut self, key: &str, text: &str) -> Option<String> {
        let mut evicted = None;

        if self.inserted.contains_key(key) {
            self.remove(key);
        } else if self.inserted.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.inserted.remove(&oldest);
                self.purge_postings(&oldest);
                evicted = Some(oldest);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.inserted.insert(key.to_string(), seq);
        self.order.insert(seq, key.to_string());

        for token in Self::tokenize(text) {
            self.postings
                .entry(token)
                .or_default()
                .insert(key.to_string());
        }

        evicted
    }

    /// Drop `key` from every posting set. Returns whether it was indexed.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(seq) = self.inserted.remove(key) else {
            return false;
        };
        self.order.remove(&seq);
        self.purge_postings(key);
        true
    }

    fn purge_postings(&mut self, key: &str) {
        self.postings.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
    }

    /// Keys sharing at least one token with `query`, in key order.
    pub fn search_keys(&self, query: &str) -> Vec<String> {
        let mut hits = BTreeSet::new();
        for token in Self::tokenize(query) {
            if let Some(keys) = self.postings.get(&token) {
                hits.extend(keys.iter().cloned());
            }
        }
        hits.into_iter().collect()
    }

    /// Resolve matching keys through `resolve`, skipping keys it cannot
    /// resolve.
    pub fn search<T, F>(&self, query: &str, resolve: F) -> Vec<T>
    where
        F: Fn(&str) -> Option<T>,
    {
        self.search_keys(query)
            .iter()
            .filter_map(|key| resolve(key))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inserted.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inserted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.inserted.clear();
        self.order.clear();
    }
}
