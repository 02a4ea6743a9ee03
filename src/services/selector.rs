//! Randomised content selection: shuffling, filtered picks and picks that do
//! not repeat an item until the whole pool has been served.

use std::collections::HashSet;

use rand::Rng;

/// Identifiers of items already served in the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedSet {
    keys: HashSet<String>,
}

impl UsedSet {
    /// Build an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` was already served.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record `key` as served.
    pub fn insert(&mut self, key: String) {
        self.keys.insert(key);
    }

    /// Forget every served key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Number of served keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing was served yet.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Return an unbiased permutation of `items` (Fisher–Yates).
pub fn shuffle<T, R>(mut items: Vec<T>, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    shuffle_in_place(&mut items, rng);
    items
}

/// Permute `items` in place, walking from the last index down to 1 and swapping
/// each slot with a uniformly chosen slot in `[0, i]`.
pub fn shuffle_in_place<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Shuffled copy of `pool` truncated to at most `count` items.
pub fn sample<T, R>(pool: &[T], count: usize, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut items = shuffle(pool.to_vec(), rng);
    items.truncate(count);
    items
}

/// Pick a uniformly random item that is not yet in `used` and record it.
///
/// When every item of `pool` has been served, `used` is cleared first so the
/// cycle restarts. Returns `None` only for an empty pool.
pub fn pick_next<'a, T, K, R>(
    pool: &'a [T],
    used: &mut UsedSet,
    key: K,
    rng: &mut R,
) -> Option<&'a T>
where
    K: Fn(&T) -> String,
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return None;
    }

    let mut available: Vec<&T> = pool.iter().filter(|item| !used.contains(&key(item))).collect();
    if available.is_empty() {
        used.clear();
        available = pool.iter().collect();
    }

    let picked = available[rng.random_range(0..available.len())];
    used.insert(key(picked));
    Some(picked)
}

/// Keep the items matching `predicate`, or the whole pool when none match.
pub fn pick_filtered<'a, T, P>(pool: &'a [T], predicate: P) -> Vec<&'a T>
where
    P: Fn(&T) -> bool,
{
    let filtered: Vec<&T> = pool.iter().filter(|item| predicate(item)).collect();
    if filtered.is_empty() {
        pool.iter().collect()
    } else {
        filtered
    }
}

/// Shuffle `options` so that the distinguished option (the correct answer, or
/// the lie) lands at a uniformly random position.
///
/// The other options are shuffled among themselves and the distinguished one
/// is inserted at a random index. Only the first distinguished option is
/// treated specially; any further match is shuffled like the rest.
pub fn shuffle_options_keeping_answer<T, P, R>(
    options: Vec<T>,
    is_distinguished: P,
    rng: &mut R,
) -> Vec<T>
where
    P: Fn(&T) -> bool,
    R: Rng + ?Sized,
{
    let mut distinguished = None;
    let mut rest = Vec::with_capacity(options.len());
    for option in options {
        if distinguished.is_none() && is_distinguished(&option) {
            distinguished = Some(option);
        } else {
            rest.push(option);
        }
    }

    shuffle_in_place(&mut rest, rng);
    if let Some(option) = distinguished {
        let at = rng.random_range(0..=rest.len());
        rest.insert(at, option);
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn shuffle_covers_all_permutations_uniformly() {
        let mut rng = rng();
        let runs = 60_000;
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
        for _ in 0..runs {
            *counts.entry(shuffle(vec![1, 2, 3], &mut rng)).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        let expected = runs as f64 / 6.0;
        for (perm, count) in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "{perm:?} appeared {count} times");
        }
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = rng();
        let mut shuffled = shuffle((0..50).collect::<Vec<_>>(), &mut rng);
        shuffled.sort();
        assert_eq!(shuffled, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn pick_next_serves_every_item_before_repeating() {
        let mut rng = rng();
        let pool = vec!["a", "b", "c", "d", "e"];
        let mut used = UsedSet::new();

        for _ in 0..3 {
            let mut seen = HashSet::new();
            for _ in 0..pool.len() {
                let item = pick_next(&pool, &mut used, |s| s.to_string(), &mut rng).unwrap();
                assert!(seen.insert(*item), "{item} repeated within a cycle");
                assert!(used.len() <= pool.len());
            }
            assert_eq!(seen.len(), pool.len());
        }
    }

    #[test]
    fn pick_next_restarts_cycle_when_exhausted() {
        let mut rng = rng();
        let pool = vec![1, 2];
        let mut used = UsedSet::new();
        pick_next(&pool, &mut used, |n| n.to_string(), &mut rng);
        pick_next(&pool, &mut used, |n| n.to_string(), &mut rng);
        assert_eq!(used.len(), 2);

        pick_next(&pool, &mut used, |n| n.to_string(), &mut rng);
        assert_eq!(used.len(), 1);
    }

    #[test]
    fn pick_next_on_empty_pool_is_none() {
        let mut rng = rng();
        let pool: Vec<u8> = Vec::new();
        let mut used = UsedSet::new();
        assert!(pick_next(&pool, &mut used, |n| n.to_string(), &mut rng).is_none());
    }

    #[test]
    fn pick_filtered_falls_back_to_whole_pool() {
        let pool = vec![1, 2, 3, 4];
        assert_eq!(pick_filtered(&pool, |n| n % 2 == 0), vec![&2, &4]);
        assert_eq!(pick_filtered(&pool, |n| *n > 10).len(), 4);
    }

    #[test]
    fn sample_truncates_without_duplicates() {
        let mut rng = rng();
        let pool: Vec<u32> = (0..20).collect();
        let picked = sample(&pool, 5, &mut rng);
        assert_eq!(picked.len(), 5);
        assert_eq!(picked.iter().collect::<HashSet<_>>().len(), 5);
        assert_eq!(sample(&pool, 50, &mut rng).len(), 20);
    }

    #[test]
    fn distinguished_option_is_kept_once_at_varying_positions() {
        let mut rng = rng();
        let mut positions = HashSet::new();

        for _ in 0..200 {
            let options = vec![("a", false), ("b", true), ("c", false), ("d", false)];
            let shuffled = shuffle_options_keeping_answer(options, |(_, ok)| *ok, &mut rng);
            assert_eq!(shuffled.len(), 4);
            let correct: Vec<_> = shuffled.iter().enumerate().filter(|(_, o)| o.1).collect();
            assert_eq!(correct.len(), 1);
            assert_eq!(correct[0].1.0, "b");
            positions.insert(correct[0].0);
        }

        assert_eq!(positions.len(), 4);
    }

    #[test]
    fn options_without_distinguished_entry_are_only_shuffled() {
        let mut rng = rng();
        let shuffled = shuffle_options_keeping_answer(vec![1, 2, 3], |n| *n > 5, &mut rng);
        let mut sorted = shuffled.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3]);
    }
}
