//! Activation resolver: which entries of a pool take part in an assembly.
//!
//! 1. Forced entries are active.
//! 2. A forced entry that cascades activates every other entry with a key
//!    occurring (case-insensitively) in its rendered text. One level only:
//!    entries activated this way never cascade further.
//! 3. Positioned entries (`insertion_position != 0`) without an explicit
//!    reservation are reserved their full encoded length, so an entry pinned
//!    near the end is not starved by allocation order.
//!
//! Resolution does not touch the entries: the result is an [`Activation`]
//! describing processing order and effective reservations.

use akyuu_core::error::TokenizerError;
use akyuu_core::tokenizer::Tokenizer;
use std::cmp::Reverse;

use crate::entry::ContextEntry;

/// The outcome of resolving a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    order: Vec<usize>,
    inactive: Vec<usize>,
    reserved: Vec<usize>,
}

impl Activation {
    /// Indices of active entries, highest `insertion_order` first, ties in
    /// pool order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Indices of entries left out, in pool order.
    pub fn inactive(&self) -> &[usize] {
        &self.inactive
    }

    /// Effective reservation of the entry at `index`.
    pub fn reserved(&self, index: usize) -> usize {
        self.reserved.get(index).copied().unwrap_or(0)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.order.contains(&index)
    }
}

/// Resolve which entries of `entries` are active.
pub fn resolve(
    tokenizer: &dyn Tokenizer,
    entries: &[ContextEntry],
) -> Result<Activation, TokenizerError> {
    let mut active = vec![false; entries.len()];

    for (i, entry) in entries.iter().enumerate() {
        if !entry.forced_activation() {
            continue;
        }
        active[i] = true;

        if entry.cascading_activation() {
            let haystack = entry.text().to_lowercase();
            for (j, other) in entries.iter().enumerate() {
                if j != i && other.is_triggered_by(&haystack) {
                    active[j] = true;
                }
            }
        }
    }

    let reserved = entries
        .iter()
        .map(|entry| {
            if entry.insertion_position() != 0 && entry.reserved_tokens() == 0 {
                tokenizer.count(entry.text())
            } else {
                Ok(entry.reserved_tokens())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (mut order, inactive): (Vec<usize>, Vec<usize>) =
        (0..entries.len()).partition(|&i| active[i]);
    order.sort_by_key(|&i| Reverse(entries[i].insertion_order()));

    Ok(Activation {
        order,
        inactive,
        reserved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ByteTokenizer;

    fn forced(body: &str, order: i32) -> ContextEntry {
        ContextEntry::builder(body)
            .insertion_order(order)
            .forced(true)
            .build()
            .unwrap()
    }

    fn lore(body: &str, keys: &[&str]) -> ContextEntry {
        ContextEntry::builder(body)
            .keys(keys.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn forced_entries_are_active() {
        let pool = vec![forced("a", 0), lore("b", &["b"])];
        let act = resolve(&ByteTokenizer, &pool).unwrap();
        assert_eq!(act.order(), [0]);
        assert_eq!(act.inactive(), [1]);
    }

    #[test]
    fn cascade_activates_keyed_entries() {
        let memory = ContextEntry::builder("Alice lives in a TOWER.")
            .forced(true)
            .cascading(true)
            .build()
            .unwrap();
        let pool = vec![memory, lore("The tower is old.", &["tower"]), lore("x", &["moat"])];
        let act = resolve(&ByteTokenizer, &pool).unwrap();
        assert!(act.is_active(1));
        assert!(!act.is_active(2));
    }

    #[test]
    fn non_cascading_forced_entry_activates_nothing() {
        let pool = vec![forced("Alice lives in a tower.", 0), lore("x", &["tower"])];
        let act = resolve(&ByteTokenizer, &pool).unwrap();
        assert!(!act.is_active(1));
    }

    #[test]
    fn cascade_is_one_level() {
        let root = ContextEntry::builder("The tower stands.")
            .forced(true)
            .cascading(true)
            .build()
            .unwrap();
        let middle = ContextEntry::builder("The tower hides a dragon.")
            .keys(["tower"])
            .cascading(true)
            .build()
            .unwrap();
        let leaf = lore("Dragons hoard gold.", &["dragon"]);
        let act = resolve(&ByteTokenizer, &[root, middle, leaf]).unwrap();
        assert!(act.is_active(1));
        assert!(!act.is_active(2));
    }

    #[test]
    fn entry_reachable_twice_appears_once() {
        let a = ContextEntry::builder("tower")
            .forced(true)
            .cascading(true)
            .build()
            .unwrap();
        let b = ContextEntry::builder("tower again")
            .forced(true)
            .cascading(true)
            .build()
            .unwrap();
        let pool = vec![a, b, lore("lore", &["tower"])];
        let act = resolve(&ByteTokenizer, &pool).unwrap();
        assert_eq!(act.order().iter().filter(|&&i| i == 2).count(), 1);
        assert_eq!(act.order().len(), 3);
    }

    #[test]
    fn order_is_descending_and_stable() {
        let pool = vec![forced("a", 0), forced("b", 800), forced("c", 0), forced("d", -400)];
        let act = resolve(&ByteTokenizer, &pool).unwrap();
        assert_eq!(act.order(), [1, 0, 2, 3]);
    }

    #[test]
    fn positioned_entries_reserve_their_length() {
        let front = ContextEntry::builder("front").insertion_position(0).build().unwrap();
        let note = ContextEntry::builder("[ A/N: dark ]")
            .insertion_position(-4)
            .build()
            .unwrap();
        let explicit = ContextEntry::builder("story")
            .insertion_position(-1)
            .reserved_tokens(3)
            .build()
            .unwrap();
        let act = resolve(&ByteTokenizer, &[front, note, explicit]).unwrap();
        assert_eq!(act.reserved(0), 0);
        assert_eq!(act.reserved(1), "[ A/N: dark ]\n".len());
        assert_eq!(act.reserved(2), 3);
    }
}
