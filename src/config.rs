//! Fixed-capacity configuration for stage buffers (§5: "every internal
//! buffer has a fixed capacity known at construction").
//!
//! Defaults reproduce the constants picosa.c/picospho.c use (e.g.
//! `SPHO_MAXNR_HEADX`, `SPHO_MAXSIZE_CBUF`) so out-of-the-box behavior
//! matches the grounding source; mirrors the teacher crate's
//! `Config`/`impl Default` pattern in `src/lib.rs`.
#[derive(Clone, Copy, Debug)]
pub struct CoreConfig {
    /// Bounded item-head slots in `SaStage::Collect` (§4.6). Default 60.
    pub sa_collect_slots: usize,
    /// Content arena size backing `SaStage`'s per-phrase buffers.
    pub sa_content_arena: usize,
    /// Bounded extended-head slots in `SphoStage` (§4.7). Default 60
    /// (picospho.c `SPHO_MAXNR_HEADX`).
    pub spho_headx_slots: usize,
    /// Content arena size backing `SphoStage`'s sentence buffer. Default
    /// `30 * 255` (picospho.c `SPHO_MAXSIZE_CBUF`).
    pub spho_content_arena: usize,
    /// Alt-descriptor stack depth bound for the transduction engine.
    pub max_alt_desc_depth: usize,
    /// Output pos/sym sequence capacity for a single transduction call.
    pub max_out_seq_len: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            sa_collect_slots: 60,
            sa_content_arena: 30 * 255,
            spho_headx_slots: 60,
            spho_content_arena: 30 * 255,
            max_alt_desc_depth: 256,
            max_out_seq_len: 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_grounding_constants() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.sa_collect_slots, 60);
        assert_eq!(cfg.spho_headx_slots, 60);
        assert_eq!(cfg.spho_content_arena, 30 * 255);
    }
}
