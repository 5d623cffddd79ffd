//! Phone-property predicates consumed from an external phone table (§4.4).
//!
//! The phone/grapheme property tables themselves are out of scope (§1):
//! the core only consumes this predicate interface. Implementors back it
//! with whatever table format their lexicon/phone knowledge base uses.

/// Phone-property predicates and special-id accessors, keyed by phone id.
pub trait PhoneTable {
    fn has_vowel_like(&self, id: i16) -> bool;
    fn has_diphth(&self, id: i16) -> bool;
    fn has_glott(&self, id: i16) -> bool;
    fn has_nonsyll_vowel(&self, id: i16) -> bool;
    fn has_syllcons(&self, id: i16) -> bool;
    fn is_primstress(&self, id: i16) -> bool;
    fn is_secstress(&self, id: i16) -> bool;
    fn is_syllbound(&self, id: i16) -> bool;
    fn is_pause(&self, id: i16) -> bool;

    /// Whether `id` can carry a syllable (vowel-like, or a syllabic
    /// consonant) — the predicate [`crate::engine::trivial_syllabify`]
    /// scans for.
    fn is_syll_carrier(&self, id: i16) -> bool;

    fn primary_stress_id(&self) -> i16;
    fn secondary_stress_id(&self) -> i16;
    fn syll_boundary_id(&self) -> i16;
    fn word_boundary_id(&self) -> i16;
    fn pause_id(&self) -> i16;
}

#[cfg(any(test, feature = "std"))]
pub mod tests_support {
    //! A small fixed phone table for unit/integration tests and the CLI's
    //! `run` smoke-test command. Not a production phone table — id
    //! assignments are arbitrary and chosen only to exercise the
    //! predicates exactly once each.
    use super::PhoneTable;

    #[derive(Clone, Copy, Debug)]
    pub struct StaticPhoneTable;

    impl Default for StaticPhoneTable {
        fn default() -> Self {
            StaticPhoneTable
        }
    }

    // id layout for tests: 1 = vowel "a", 10 = consonant "k", 11 = consonant
    // "t", 20 = primary stress, 21 = secondary stress, 30 = syllable
    // boundary, 31 = word boundary, 40 = pause.
    impl PhoneTable for StaticPhoneTable {
        fn has_vowel_like(&self, id: i16) -> bool {
            id == 1
        }
        fn has_diphth(&self, _id: i16) -> bool {
            false
        }
        fn has_glott(&self, _id: i16) -> bool {
            false
        }
        fn has_nonsyll_vowel(&self, _id: i16) -> bool {
            false
        }
        fn has_syllcons(&self, _id: i16) -> bool {
            false
        }
        fn is_primstress(&self, id: i16) -> bool {
            id == self.primary_stress_id()
        }
        fn is_secstress(&self, id: i16) -> bool {
            id == self.secondary_stress_id()
        }
        fn is_syllbound(&self, id: i16) -> bool {
            id == self.syll_boundary_id()
        }
        fn is_pause(&self, id: i16) -> bool {
            id == self.pause_id()
        }
        fn is_syll_carrier(&self, id: i16) -> bool {
            self.has_vowel_like(id)
        }
        fn primary_stress_id(&self) -> i16 {
            20
        }
        fn secondary_stress_id(&self) -> i16 {
            21
        }
        fn syll_boundary_id(&self) -> i16 {
            30
        }
        fn word_boundary_id(&self) -> i16 {
            31
        }
        fn pause_id(&self) -> i16 {
            40
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::StaticPhoneTable;
    use super::PhoneTable;

    #[test]
    fn static_table_predicates_agree_with_ids() {
        let t = StaticPhoneTable::default();
        assert!(t.is_syll_carrier(1));
        assert!(!t.is_syll_carrier(10));
        assert!(t.is_primstress(t.primary_stress_id()));
        assert!(t.is_syllbound(t.syll_boundary_id()));
    }
}
