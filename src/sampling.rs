//! Random draws used by the pool, the distractors and mode selection.
//!
//! Everything goes through [`shuffle`], a Fisher–Yates pass over a caller
//! supplied generator, so a seeded `StdRng` reproduces a whole session.

use rand::seq::SliceRandom;
use rand::Rng;

pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// Up to `n` items without replacement, in random order.
pub fn pick_n<T: Clone, R: Rng + ?Sized>(items: &[T], n: usize, rng: &mut R) -> Vec<T> {
    let mut out = shuffle(items, rng);
    out.truncate(n.min(items.len()));
    out
}

pub fn pick_one<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Option<T> {
    pick_n(items, 1, rng).into_iter().next()
}

/// Keeps the first occurrence of each key.
pub fn unique_by<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + std::hash::Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|x| seen.insert(key(x))).collect()
}
