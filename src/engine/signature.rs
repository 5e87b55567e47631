//! Component Signatures
//!
//! A [`Signature`] is a bitset over dense component ids, used for three
//! related jobs:
//!
//! - identifying an archetype (the exact component set of its entities),
//! - declaring a system's predicate (`must_have` / `must_not_have` masks),
//! - resolving a composition string at spawn time.
//!
//! ## Width Model
//!
//! Unlike a fixed-capacity bitset, a signature is sized to the registered
//! type count at the moment it is created: systems use the count at their
//! registration, archetypes the count at their first creation. Because the
//! type count grows over the world's lifetime, two signatures describing the
//! same id set may carry different word counts. All binary operations treat
//! missing high words as zero, and equality and hashing ignore trailing zero
//! words, so a signature built today finds an archetype created yesterday.
//!
//! ## Performance
//!
//! Words are packed `u64`s; membership is a shift and mask, iteration walks
//! set bits via `trailing_zeros`. Signatures are value-like: archetypes and
//! systems own their masks and the world clones them into its lookup index.

use std::hash::{Hash, Hasher};

use crate::engine::types::{ComponentId, WORD_BITS};


/// Bitset over component ids with width-independent equality.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    words: Vec<u64>,
}

impl Signature {
    /// Creates an empty signature wide enough for ids `0..bits`.
    pub fn with_capacity(bits: usize) -> Self {
        Self { words: vec![0; bits.div_ceil(WORD_BITS)] }
    }

    /// Creates a signature from a list of component ids.
    pub fn from_ids(ids: &[ComponentId]) -> Self {
        let mut signature = Signature::default();
        for &id in ids {
            signature.set(id);
        }
        signature
    }

    /// Words up to and including the last nonzero word.
    ///
    /// This is the canonical form compared and hashed, so signatures of
    /// different widths describing the same set are interchangeable.
    #[inline]
    fn significant_words(&self) -> &[u64] {
        let len = self
            .words
            .iter()
            .rposition(|&w| w != 0)
            .map_or(0, |i| i + 1);
        &self.words[..len]
    }

    /// Sets the bit corresponding to `component_id`, growing the word
    /// vector if the id lies beyond the current width.
    #[inline]
    pub fn set(&mut self, component_id: ComponentId) {
        let index = component_id as usize / WORD_BITS;
        let bit = component_id as usize % WORD_BITS;
        if index >= self.words.len() {
            self.words.resize(index + 1, 0);
        }
        self.words[index] |= 1u64 << bit;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentId) {
        let index = component_id as usize / WORD_BITS;
        let bit = component_id as usize % WORD_BITS;
        if index < self.words.len() {
            self.words[index] &= !(1u64 << bit);
        }
    }

    /// Returns `true` if `component_id` is present.
    #[inline]
    pub fn has(&self, component_id: ComponentId) -> bool {
        let index = component_id as usize / WORD_BITS;
        let bit = component_id as usize % WORD_BITS;
        match self.words.get(index) {
            Some(word) => (word >> bit) & 1 == 1,
            None => false,
        }
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no bits are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Lowest set id, if any.
    #[inline]
    pub fn first(&self) -> Option<ComponentId> {
        self.next_set(0)
    }

    /// Lowest set id that is `>= from`, if any.
    pub fn next_set(&self, from: ComponentId) -> Option<ComponentId> {
        let mut index = from as usize / WORD_BITS;
        let bit = from as usize % WORD_BITS;

        let mut word = *self.words.get(index)? & (!0u64 << bit);
        loop {
            if word != 0 {
                let id = index * WORD_BITS + word.trailing_zeros() as usize;
                return Some(id as ComponentId);
            }
            index += 1;
            word = *self.words.get(index)?;
        }
    }

    /// Returns `true` if every id in `self` is also in `other`.
    #[inline]
    pub fn is_subset_of(&self, other: &Signature) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, &word)| word & !other.words.get(i).copied().unwrap_or(0) == 0)
    }

    /// Returns `true` if `self` and `other` share at least one id.
    #[inline]
    pub fn intersects(&self, other: &Signature) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Returns a new signature containing the ids present in both operands.
    pub fn intersection(&self, other: &Signature) -> Signature {
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a & b)
            .collect();
        Signature { words }
    }

    /// Iterates over all set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * WORD_BITS;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((base + tz) as ComponentId)
            })
        })
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.significant_words() == other.significant_words()
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_words().hash(state);
    }
}
