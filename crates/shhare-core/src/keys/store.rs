//! The ordered key fragment store.

use std::collections::HashSet;

use super::{validate_fragment, KeyFragment};
use crate::error::{Result, ShhareError, ValidationError};

/// Ordered collection of key fragments held for a session.
///
/// Insertion order is preserved and no two fragments are equal. Every failed
/// operation leaves the store untouched; every successful mutation bumps
/// [`revision`](Self::revision), which callers use as a change notification
/// (the session recomputes the derived key whenever it moves).
#[derive(Debug, Default, Clone)]
pub struct KeyStore {
    fragments: Vec<KeyFragment>,
    revision: u64,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ShhareError::Validation`] with the first rule the candidate
    /// broke; the store is unchanged.
    pub fn add(&mut self, candidate: &str) -> Result<&KeyFragment> {
        let fragment = validate_fragment(candidate, &self.fragments)?;
        self.fragments.push(fragment);
        self.bump();
        let index = self.fragments.len() - 1;
        Ok(&self.fragments[index])
    }

    /// Remove the fragment at `index`, shifting later fragments down.
    ///
    /// # Errors
    ///
    /// Returns [`ShhareError::Index`] if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Result<KeyFragment> {
        if index >= self.fragments.len() {
            return Err(ShhareError::Index {
                index,
                len: self.fragments.len(),
            });
        }
        let removed = self.fragments.remove(index);
        self.bump();
        Ok(removed)
    }

    /// Replace every fragment at once.
    ///
    /// Used for generated and imported share sets, so individual fragments are
    /// only trimmed, not length-checked. A set containing the same fragment
    /// twice is rejected as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Duplicate`] if the new set repeats a
    /// fragment; the store is unchanged.
    pub fn replace_all<I, S>(&mut self, fragments: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut replacement = Vec::new();
        for fragment in fragments {
            let trimmed = fragment.as_ref().trim().to_string();
            if !seen.insert(trimmed.clone()) {
                return Err(ValidationError::Duplicate.into());
            }
            replacement.push(KeyFragment::new(trimmed));
        }

        self.fragments = replacement;
        self.bump();
        Ok(())
    }

    /// Remove every fragment, returning how many were held.
    pub fn clear(&mut self) -> usize {
        let removed = self.fragments.len();
        if removed > 0 {
            self.fragments.clear();
            self.bump();
        }
        removed
    }

    /// The fragments in insertion order.
    pub fn fragments(&self) -> &[KeyFragment] {
        &self.fragments
    }

    /// Owned copies of the fragment strings, as handed to the backend.
    pub fn to_strings(&self) -> Vec<String> {
        self.fragments
            .iter()
            .map(|fragment| fragment.as_str().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: &str = "aaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbb";
    const C: &str = "cccccccccccc";

    fn strings(store: &KeyStore) -> Vec<&str> {
        store.fragments().iter().map(KeyFragment::as_str).collect()
    }

    #[test]
    fn test_add_preserves_order() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        store.add(B).unwrap();
        assert_eq!(strings(&store), vec![A, B]);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_add_stores_trimmed_value() {
        let mut store = KeyStore::new();
        let added = store.add(&format!("  {}\n", A)).unwrap();
        assert_eq!(added.as_str(), A);
    }

    #[test]
    fn test_add_short_fragment_leaves_store_unchanged() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        let err = store.add("short").unwrap_err();
        assert!(matches!(
            err,
            ShhareError::Validation(ValidationError::TooShort)
        ));
        assert_eq!(strings(&store), vec![A]);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        let err = store.add(&format!(" {} ", A)).unwrap_err();
        assert!(matches!(
            err,
            ShhareError::Validation(ValidationError::Duplicate)
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_shifts_later_fragments() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        store.add(B).unwrap();
        let removed = store.remove(0).unwrap();
        assert_eq!(removed.as_str(), A);
        assert_eq!(strings(&store), vec![B]);
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        let err = store.remove(1).unwrap_err();
        assert!(matches!(err, ShhareError::Index { index: 1, len: 1 }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_replace_all_skips_length_rule() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        store.replace_all(["0102", "0203", "0304"]).unwrap();
        assert_eq!(strings(&store), vec!["0102", "0203", "0304"]);
    }

    #[test]
    fn test_replace_all_rejects_duplicates_atomically() {
        let mut store = KeyStore::new();
        store.add(A).unwrap();
        let before = store.revision();
        let err = store.replace_all([B, C, B]).unwrap_err();
        assert!(matches!(
            err,
            ShhareError::Validation(ValidationError::Duplicate)
        ));
        assert_eq!(strings(&store), vec![A]);
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn test_clear() {
        let mut store = KeyStore::new();
        assert_eq!(store.clear(), 0);
        assert_eq!(store.revision(), 0);

        store.add(A).unwrap();
        store.add(B).unwrap();
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_mixed_operations_never_duplicate() {
        let mut store = KeyStore::new();
        let candidates = [A, B, A, C, B, "  cccccccccccc"];
        for candidate in candidates {
            let _ = store.add(candidate);
        }
        let _ = store.remove(0);
        let _ = store.add(A);
        let _ = store.add(A);

        let unique: HashSet<&str> = store.fragments().iter().map(KeyFragment::as_str).collect();
        assert_eq!(unique.len(), store.len());
        assert_eq!(strings(&store), vec![B, C, A]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String),
        Remove(usize),
        ReplaceAll(Vec<String>),
        Clear,
    }

    fn candidate() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(vec![A, B, C, "  aaaaaaaaaaaa  ", "short", "", "   "])
                .prop_map(|s| s.to_string()),
            "[ab ]{0,14}",
        ]
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => candidate().prop_map(Op::Add),
            2 => (0usize..6).prop_map(Op::Remove),
            1 => prop::collection::vec(candidate(), 0..5).prop_map(Op::ReplaceAll),
            1 => Just(Op::Clear),
        ]
    }

    #[test]
    fn prop_any_op_sequence_keeps_fragments_unique() {
        proptest!(|(ops in prop::collection::vec(op(), 0..40))| {
            let mut store = KeyStore::new();

            for op in ops {
                let before = store.to_strings();
                let revision = store.revision();

                let failed = match op {
                    Op::Add(candidate) => store.add(&candidate).is_err(),
                    Op::Remove(index) => store.remove(index).is_err(),
                    Op::ReplaceAll(set) => store.replace_all(&set).is_err(),
                    Op::Clear => {
                        store.clear();
                        false
                    }
                };

                // PROPERTY: failed operations leave the store untouched
                if failed {
                    prop_assert_eq!(&store.to_strings(), &before);
                    prop_assert_eq!(store.revision(), revision);
                }
                prop_assert!(store.revision() >= revision);

                // PROPERTY: no two fragments are ever equal
                let unique: HashSet<&str> =
                    store.fragments().iter().map(KeyFragment::as_str).collect();
                prop_assert_eq!(unique.len(), store.len());
            }
        });
    }
}
