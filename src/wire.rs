//! Named `info1`/`info2` constants for [`crate::item::Item`], grouped by
//! [`crate::item::ItemKind`]. Mirrors the `PICODATA_ITEMINFO1_*` /
//! `PICODATA_ITEMINFO2_*` constants of the original picodata headers so
//! `sa`/`spho` read like the grounding source without importing a whole
//! duplicate enum per item kind.

/// `info1` values for `Bound` items — boundary strength (§4.7, §GLOSSARY).
pub mod bound_strength {
    pub const PHR0: u8 = 0; // word boundary
    pub const PHR1: u8 = 1; // sentence end
    pub const PHR2: u8 = 2; // major phrase
    pub const PHR3: u8 = 3; // minor phrase
    /// Sentinel meaning "no original/fst strength given yet".
    pub const NA: u8 = 255;
}

/// `info2` values for `Bound` items — historical boundary sub-kind used by
/// `SaStage::Collect` to recognize phrase starts/ends, and phrase-type
/// annotations used by `SphoStage`.
pub mod bound_info2 {
    pub const SBEG: u8 = 0;
    pub const SEND: u8 = 1;
    pub const TERM: u8 = 2;
    /// Retroactively-invented phrase type (§4.7 "phrase-type bookkeeping").
    pub const TYPE_P: u8 = 253;
    pub const NA: u8 = 255;
}

/// `info1` values for `Cmd` items (§4.6, §4.7).
pub mod cmd_kind {
    pub const FLUSH: u8 = 0;
    pub const PHONEME: u8 = 1;
    pub const SIL: u8 = 2;
    pub const PLAY: u8 = 3;
    pub const SAVE: u8 = 4;
    pub const UNSAVE: u8 = 5;
    pub const IGNSIG: u8 = 6;
}

/// `info2` sub-values for `Cmd` items.
pub mod cmd_info2 {
    pub const START: u8 = 0;
    pub const TERM: u8 = 1;
    pub const NA: u8 = 255;
}

/// `info2` values for `Punc` items.
pub mod punc_info2 {
    pub const NATURAL: u8 = 0;
    pub const FORCED: u8 = 1;
    pub const FLUSH: u8 = 2;
}

/// POS id reserved for phonemic (non-lexical) content, e.g. an opening
/// `<phoneme>` command rewritten to `WORDPHON` (§4.6, S6).
pub const POS_XX: u8 = 0;
