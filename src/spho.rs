//! Sentence-phoneme stage: sentence-level FST cascade, boundary
//! reconciliation, break-command integration, syllable extraction (§4.7).
//!
//! Grounded in `examples/original_source/pico/lib/picospho.c`: the extended
//! head array (`SPHO_MAXNR_HEADX`), the `fstModifiedBoundStrength`/
//! `breakModifiedBoundStrength` fallthrough tables, the
//! `breakStateInterrupting` command table, and the sliding
//! `activeStartPos`/`penultima`/`activeEndPos` window are all ported
//! directly; the byte-offset content buffer (`SPHO_MAXSIZE_CBUF`) becomes a
//! `Vec<PosSym>` bounded by `CoreConfig::spho_content_arena`.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::config::CoreConfig;
use crate::engine;
use crate::error::WarningSink;
use crate::fst::FstImage;
use crate::item::{BoundStrength, Item, ItemKind, PhraseType};
use crate::phone::PhoneTable;
use crate::stage::{ResetMode, Status};
use crate::symbol::{Plane, Position, PosSym, Symbol};
use crate::wire::{bound_info2, cmd_info2, cmd_kind, punc_info2};

/// Per-item decoration threaded alongside the sentence window (§3).
#[derive(Clone, Copy, Debug)]
pub struct ExtendedHead {
    /// Offset of this item's first symbol in the sentence content buffer.
    pub cind: usize,
    /// Number of symbols this item contributed to the content buffer.
    pub clen: usize,
    pub bound_strength: Option<BoundStrength>,
    pub orig_strength: Option<BoundStrength>,
    pub phrase_type: PhraseType,
    /// Silence duration in milliseconds, when known (break commands and
    /// `Bound` items carrying a duration).
    pub sildur: Option<u16>,
    pub break_before: bool,
    pub break_after: bool,
}

impl ExtendedHead {
    fn blank() -> Self {
        ExtendedHead {
            cind: 0,
            clen: 0,
            bound_strength: None,
            orig_strength: None,
            phrase_type: PhraseType::None,
            sildur: None,
            break_before: false,
            break_after: false,
        }
    }
}

/// `fstModifiedBoundStrength` (picospho.c): a sentence-level FST may
/// demote a boundary but never to a plain word boundary — `Phr1`/`Phr2`
/// demoted to `Phr0` become `Phr3` instead. `Phr0`/`Phr3` take the
/// FST-suggested target directly. Any other original strength is left
/// unchanged (an FST cannot invent phrase structure out of a non-boundary).
pub fn fst_modified_bound_strength(orig: BoundStrength, target: BoundStrength) -> BoundStrength {
    match orig {
        BoundStrength::Phr1 | BoundStrength::Phr2 => match target {
            BoundStrength::Phr0 => BoundStrength::Phr3,
            other => other,
        },
        BoundStrength::Phr0 | BoundStrength::Phr3 => target,
    }
}

/// `breakModifiedBoundStrength` (picospho.c): derives a candidate strength
/// from a break's duration, then folds it against the original strength
/// with the same case-fallthrough the original uses. Resolves the
/// primary-`Phr0`-at-zero-duration question: a primary `Phr0` is still the
/// `Phr0` case, so it stays `Phr0` regardless of `was_primary` —
/// `was_primary` only gates the `Phr3` arm.
pub fn break_modified_bound_strength(orig: BoundStrength, time_ms: u32, was_primary: bool) -> BoundStrength {
    let modified = if time_ms == 0 {
        BoundStrength::Phr3
    } else if time_ms > 50 {
        BoundStrength::Phr1
    } else {
        BoundStrength::Phr2
    };

    match orig {
        BoundStrength::Phr0 => {
            if time_ms == 0 {
                BoundStrength::Phr0
            } else {
                modified
            }
        }
        BoundStrength::Phr3 => {
            if time_ms == 0 && !was_primary {
                BoundStrength::Phr0
            } else {
                modified
            }
        }
        BoundStrength::Phr1 | BoundStrength::Phr2 => modified,
    }
}

/// `breakStateInterrupting` (picospho.c): whether a break-interrupting
/// command forces at least one millisecond of silence before/after it.
/// `IgnSig`'s split is keyed on its `START`/other sub-command.
pub fn break_interrupting(info1: u8, info2: u8) -> (bool, bool) {
    match info1 {
        cmd_kind::PLAY | cmd_kind::SAVE | cmd_kind::UNSAVE => (true, true),
        cmd_kind::IGNSIG => {
            if info2 == cmd_info2::START {
                (true, false)
            } else {
                (false, true)
            }
        }
        _ => (false, false),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SphoState {
    Init,
    Collect,
    ParsePhones,
    Transduce,
    Bounds,
    Recomb,
    Syl,
    Feed,
    Shift,
    Error,
}

const PHON_START: i16 = 1;

fn phones_to_bytes(phones: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(phones.len() * 2);
    for &p in phones {
        out.extend_from_slice(&p.to_be_bytes());
    }
    out
}

/// Sentence-phoneme stage (§4.7).
pub struct SphoStage<'fst, P, S> {
    config: CoreConfig,
    phones: P,
    sentence_fsts: Vec<FstImage<'fst>>,
    sink: S,
    state: SphoState,
    in_queue: VecDeque<Item>,
    out_queue: VecDeque<Item>,
    /// The sentence window: one entry per collected item, with its decoded
    /// boundary strength, phrase type, and silence-duration bookkeeping.
    heads: Vec<(Item, ExtendedHead)>,
    cbuf: Vec<PosSym>,
    ready: VecDeque<Item>,
    active_start: usize,
    penultima: usize,
    last_phrase_bound_pos: Option<usize>,
    last_phrase_type: PhraseType,
}

impl<'fst, P, S> SphoStage<'fst, P, S>
where
    P: PhoneTable,
    S: WarningSink,
{
    pub fn new(config: CoreConfig, phones: P, sentence_fsts: Vec<FstImage<'fst>>, sink: S) -> Self {
        SphoStage {
            config,
            phones,
            sentence_fsts,
            sink,
            state: SphoState::Init,
            in_queue: VecDeque::new(),
            out_queue: VecDeque::new(),
            heads: Vec::new(),
            cbuf: Vec::new(),
            ready: VecDeque::new(),
            active_start: 0,
            penultima: 0,
            last_phrase_bound_pos: None,
            last_phrase_type: PhraseType::None,
        }
    }

    pub fn push_input(&mut self, item: Item) {
        self.in_queue.push_back(item);
    }

    pub fn pop_output(&mut self) -> Option<Item> {
        self.out_queue.pop_front()
    }

    pub fn reset(&mut self, mode: ResetMode) {
        self.in_queue.clear();
        self.out_queue.clear();
        self.heads.clear();
        self.cbuf.clear();
        self.ready.clear();
        self.active_start = 0;
        self.penultima = 0;
        self.last_phrase_bound_pos = None;
        self.last_phrase_type = PhraseType::None;
        self.state = SphoState::Init;
        if mode == ResetMode::Full {
            self.sentence_fsts.clear();
        }
    }

    pub fn step(&mut self) -> Status {
        match self.state {
            SphoState::Init => {
                self.cbuf.push(PosSym::new(Position::Invalid, Symbol::new(Plane::Internal, PHON_START).to_raw()));
                self.state = SphoState::Collect;
                Status::Busy
            }
            SphoState::Collect => self.step_collect(),
            SphoState::ParsePhones => self.step_parse_phones(),
            SphoState::Transduce => self.step_transduce(),
            SphoState::Bounds => self.step_bounds(),
            SphoState::Recomb => self.step_recomb(),
            SphoState::Syl => self.step_syl(),
            SphoState::Feed => self.step_feed(),
            SphoState::Shift => self.step_shift(),
            SphoState::Error => Status::Error,
        }
    }

    fn step_collect(&mut self) -> Status {
        let Some(item) = self.in_queue.pop_front() else {
            return Status::Idle;
        };

        let is_sentence_end = (item.kind == ItemKind::Bound
            && (item.info2 == bound_info2::SEND || item.info2 == bound_info2::TERM))
            || (item.kind == ItemKind::Punc && item.info2 == punc_info2::FLUSH);
        self.heads.push((item, ExtendedHead::blank()));

        if self.heads.len() - self.active_start >= self.config.spho_headx_slots {
            self.sink.warn(crate::error::Warning::ForcedBoundary { context: "SphoStage::Collect" });
            self.state = SphoState::ParsePhones;
            return Status::Busy;
        }
        if is_sentence_end {
            self.state = SphoState::ParsePhones;
        }
        Status::Busy
    }

    /// Emits a phrase-strength symbol for each `Bound` head, a `Phr0`
    /// word-boundary symbol plus per-syllable phoneme symbols for each
    /// unsuppressed `WordPhon`/`SyllPhon` head (syllables in reverse
    /// order, per the per-word reversal picospho.c applies before its
    /// sentence-level cascade), and records `cind`/`clen` per head. A
    /// `CMD SIL` head contributes no cbuf symbols but stashes its pending
    /// break duration onto `ext.sildur` for `Bounds` to fold in.
    fn step_parse_phones(&mut self) -> Status {
        for idx in self.active_start..self.heads.len() {
            let cind = self.cbuf.len();
            let (item, ext) = &mut self.heads[idx];
            match item.kind {
                ItemKind::Bound => {
                    let strength = BoundStrength::from_u8(item.info1).unwrap_or(BoundStrength::Phr0);
                    ext.orig_strength = Some(strength);
                    self.cbuf.push(PosSym::new(
                        Position::Invalid,
                        Symbol::new(Plane::PhraseBoundStrengths, strength as i16).to_raw(),
                    ));
                    ext.sildur = item.bound_duration().map(|(a, _)| a);
                }
                ItemKind::WordPhon | ItemKind::SyllPhon => {
                    self.cbuf.push(PosSym::new(
                        Position::Invalid,
                        Symbol::new(Plane::PhraseBoundStrengths, BoundStrength::Phr0 as i16).to_raw(),
                    ));
                    let phones: Vec<i16> =
                        item.content.chunks_exact(2).map(|c| i16::from_be_bytes([c[0], c[1]])).collect();
                    for (off, &phone) in phones.iter().rev().enumerate() {
                        self.cbuf.push(PosSym::new(Position::Real(off as u32), phone));
                    }
                }
                ItemKind::Cmd if item.info1 == cmd_kind::SIL => {
                    // A pending `<break time="…">`: no cbuf symbols of its
                    // own, just the duration `Bounds` will fold in.
                    let time_ms = item
                        .content
                        .chunks_exact(2)
                        .next()
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .unwrap_or(0);
                    ext.sildur = Some(time_ms);
                }
                _ => {}
            }
            let clen = self.cbuf.len() - cind;
            ext.cind = cind;
            ext.clen = clen;

            if self.cbuf.len() >= self.config.spho_content_arena {
                self.sink.warn(crate::error::Warning::ForcedBoundary { context: "SphoStage::ParsePhones content arena" });
                break;
            }
        }
        self.state = SphoState::Transduce;
        Status::Busy
    }

    fn step_transduce(&mut self) -> Status {
        if !self.sentence_fsts.is_empty() {
            let mut current = self.cbuf.clone();
            for fst in &self.sentence_fsts {
                let mut stage_out = Vec::new();
                engine::transduce(
                    fst,
                    true,
                    &current,
                    &mut stage_out,
                    self.config.spho_content_arena,
                    self.config.max_alt_desc_depth,
                    None,
                    &mut self.sink,
                );
                let mut cleaned = Vec::new();
                engine::eliminate_epsilons(&stage_out, &mut cleaned, self.config.spho_content_arena, &mut self.sink);
                current = cleaned;
            }
            self.cbuf = current;
        }
        self.state = SphoState::Bounds;
        Status::Busy
    }

    /// First walks break-interrupting commands (`PLAY`/`SAVE`/`UNSAVE`/
    /// `IGNSIG`), forcing at least 1 ms of silence onto the adjacent head
    /// per `break_interrupting`'s table. Then walks the head window applying
    /// `fstModifiedBoundStrength` for `Bound` heads (using the post-cascade
    /// symbol at the head's recorded `cind` as the FST's suggested target),
    /// `breakModifiedBoundStrength` for both `Bound` heads and pending
    /// `CMD SIL` heads (the latter always originate at `Phr0`, having no FST
    /// target of their own), then phrase-type promotion/demotion bookkeeping
    /// (§4.7, including the `Phr0`-promoted "P" retroactive rewrite of
    /// `last_phrase_bound_pos` when `active_start <= last_phrase_bound_pos`).
    /// Simplification: a break-interrupting command's neighbor is its
    /// literal adjacent head in the window, not a re-derived nearest
    /// boundary position.
    fn step_bounds(&mut self) -> Status {
        // First pass: break-interrupting commands (PLAY/SAVE/UNSAVE/IGNSIG)
        // force at least 1 ms of silence on the adjacent head before the
        // second pass folds every head's sildur into a boundary strength.
        for idx in self.active_start..self.heads.len() {
            let (kind, info1, info2) = {
                let (item, _) = &self.heads[idx];
                (item.kind, item.info1, item.info2)
            };
            if kind != ItemKind::Cmd {
                continue;
            }
            let (before, after) = break_interrupting(info1, info2);
            {
                let (_, ext) = &mut self.heads[idx];
                ext.break_before = before;
                ext.break_after = after;
            }
            if before && idx > self.active_start {
                let (_, prev_ext) = &mut self.heads[idx - 1];
                prev_ext.sildur = Some(prev_ext.sildur.unwrap_or(0).max(1));
            }
            if after && idx + 1 < self.heads.len() {
                let (_, next_ext) = &mut self.heads[idx + 1];
                next_ext.sildur = Some(next_ext.sildur.unwrap_or(0).max(1));
            }
        }

        for idx in self.active_start..self.heads.len() {
            let (kind, info1, orig_strength, sildur, cind) = {
                let (item, ext) = &self.heads[idx];
                (item.kind, item.info1, ext.orig_strength, ext.sildur, ext.cind)
            };

            let is_sil_cmd = kind == ItemKind::Cmd && info1 == cmd_kind::SIL;
            let mut strength_opt = None;
            let mut invented_here = false;

            if kind == ItemKind::Bound || is_sil_cmd {
                let orig = orig_strength.unwrap_or(BoundStrength::Phr0);
                let mut strength = if kind == ItemKind::Bound {
                    let target = self
                        .cbuf
                        .get(cind)
                        .map(|ps| BoundStrength::from_u8((ps.sym & 0xFF) as u8).unwrap_or(orig))
                        .unwrap_or(orig);
                    fst_modified_bound_strength(orig, target)
                } else {
                    orig
                };
                if let Some(dur) = sildur {
                    let was_primary = orig == BoundStrength::Phr1;
                    strength = break_modified_bound_strength(strength, u32::from(dur), was_primary);
                }
                strength_opt = Some(strength);

                if strength >= BoundStrength::Phr2 {
                    if let Some(prev) = self.last_phrase_bound_pos {
                        if self.active_start <= prev && matches!(self.last_phrase_type, PhraseType::None) {
                            if let Some((_, prev_ext)) = self.heads.get_mut(prev) {
                                prev_ext.phrase_type = PhraseType::Invented;
                            }
                        }
                    } else {
                        invented_here = true;
                    }
                    self.last_phrase_bound_pos = Some(idx);
                    self.last_phrase_type = if invented_here { PhraseType::Invented } else { PhraseType::None };
                }
            }

            let (_, ext) = &mut self.heads[idx];
            if let Some(s) = strength_opt {
                ext.bound_strength = Some(s);
            }
            if invented_here {
                ext.phrase_type = PhraseType::Invented;
            }
        }
        self.state = SphoState::Recomb;
        Status::Busy
    }

    /// Emits side-bound items: a `Bound` item per `Bound` head carrying its
    /// reconciled strength, and the two-u16 duration content only for
    /// `Phr1`/`Phr2` with a known, non-negative duration (§4.7, §6). A
    /// `Punc` head carries no boundary strength of its own — `FLUSH` and
    /// `FORCED` markers are synthesized into a stream-terminal or
    /// minor-phrase `Bound` here instead. A `CMD SIL` head likewise carries
    /// no item of its own downstream; its `Bounds`-reconciled strength
    /// surfaces as a synthesized `Bound` the same way.
    fn step_recomb(&mut self) -> Status {
        for idx in self.active_start..self.heads.len() {
            let (item, ext) = &self.heads[idx];
            if item.kind == ItemKind::Punc && item.info2 == punc_info2::FLUSH {
                // A `CMD FLUSH` with no upstream `Bound` carrier still owes
                // downstream a stream-terminal marker.
                self.ready.push_back(
                    Item::new(ItemKind::Bound, BoundStrength::Phr1 as u8, bound_info2::TERM, Vec::new())
                        .unwrap_or_else(|_| item.clone()),
                );
                continue;
            }
            if item.kind == ItemKind::Punc && item.info2 == punc_info2::FORCED {
                // A forced phrase end (collect buffer filled with no natural
                // `Punc`) surfaces downstream as a minor-phrase boundary.
                self.ready.push_back(
                    Item::new(ItemKind::Bound, BoundStrength::Phr3 as u8, bound_info2::NA, Vec::new())
                        .unwrap_or_else(|_| item.clone()),
                );
                continue;
            }
            if item.kind == ItemKind::Cmd && item.info1 == cmd_kind::SIL {
                // A pending `<break time="…">` folded into a boundary
                // strength in `Bounds` surfaces as its own side-bound here,
                // the same as an explicit upstream `Bound` item would.
                let strength = ext.bound_strength.unwrap_or(BoundStrength::Phr0);
                let info2 = if matches!(ext.phrase_type, PhraseType::Invented) { bound_info2::TYPE_P } else { bound_info2::NA };
                let out_item = match (strength, ext.sildur) {
                    (BoundStrength::Phr1 | BoundStrength::Phr2, Some(dur)) => {
                        Item::with_bound_duration((ItemKind::Bound, strength as u8, info2), dur)
                    }
                    _ => Item::new(ItemKind::Bound, strength as u8, info2, Vec::new()).unwrap_or_else(|_| item.clone()),
                };
                self.ready.push_back(out_item);
                continue;
            }
            if item.kind != ItemKind::Bound {
                continue;
            }
            let strength = ext.bound_strength.unwrap_or(BoundStrength::Phr0);
            let info2 = if matches!(ext.phrase_type, PhraseType::Invented) {
                bound_info2::TYPE_P
            } else {
                item.info2
            };
            let out_item = match (strength, ext.sildur) {
                (BoundStrength::Phr1 | BoundStrength::Phr2, Some(dur)) => {
                    Item::with_bound_duration((ItemKind::Bound, strength as u8, info2), dur)
                }
                _ => Item::new(ItemKind::Bound, strength as u8, info2, Vec::new())
                    .unwrap_or_else(|_| item.clone()),
            };
            self.ready.push_back(out_item);
        }
        self.state = SphoState::Syl;
        Status::Busy
    }

    /// Assembles a `SyllPhon` item per syllable boundary (`syll_boundary_id`)
    /// found in the cascaded phoneme stream for each word head (§4.7).
    fn step_syl(&mut self) -> Status {
        for idx in self.active_start..self.heads.len() {
            let (item, ext) = &self.heads[idx];
            if item.kind != ItemKind::WordPhon && item.kind != ItemKind::SyllPhon {
                continue;
            }
            let slice = self.cbuf.get(ext.cind..ext.cind + ext.clen).unwrap_or(&[]);
            let mut syll: Vec<i16> = Vec::new();
            for ps in slice.iter().skip(1) {
                // skip the leading Phr0 word-boundary symbol
                if ps.sym == self.phones.syll_boundary_id() {
                    self.ready.push_back(
                        Item::new(ItemKind::SyllPhon, 0, 0, phones_to_bytes(&syll)).unwrap_or_else(|_| item.clone()),
                    );
                    syll.clear();
                } else {
                    syll.push(ps.sym);
                }
            }
            if !syll.is_empty() {
                self.ready.push_back(
                    Item::new(ItemKind::SyllPhon, 0, 0, phones_to_bytes(&syll)).unwrap_or_else(|_| item.clone()),
                );
            }
        }
        self.state = SphoState::Feed;
        Status::Busy
    }

    fn step_feed(&mut self) -> Status {
        let Some(item) = self.ready.pop_front() else {
            self.state = SphoState::Shift;
            return Status::Busy;
        };
        if self.out_queue.len() >= 64 {
            self.ready.push_front(item);
            return Status::OutFull;
        }
        self.out_queue.push_back(item);
        Status::Busy
    }

    /// Relocates the window so the last collected head (`penultima`)
    /// becomes the new start, preserving any not-yet-finalized tail
    /// (picospho.c's window-shift step).
    fn step_shift(&mut self) -> Status {
        self.penultima = self.heads.len();
        self.active_start = self.heads.len();
        self.last_phrase_bound_pos = None;
        self.last_phrase_type = PhraseType::None;
        self.state = SphoState::Collect;
        if self.in_queue.is_empty() && self.ready.is_empty() {
            Status::Idle
        } else {
            Status::Busy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fst_demotion_of_major_boundary_becomes_minor_not_word() {
        assert_eq!(
            fst_modified_bound_strength(BoundStrength::Phr2, BoundStrength::Phr0),
            BoundStrength::Phr3
        );
    }

    #[test]
    fn fst_modification_of_word_boundary_passes_through() {
        assert_eq!(fst_modified_bound_strength(BoundStrength::Phr0, BoundStrength::Phr1), BoundStrength::Phr1);
    }

    #[test]
    fn break_at_zero_duration_keeps_primary_word_boundary() {
        assert_eq!(break_modified_bound_strength(BoundStrength::Phr0, 0, true), BoundStrength::Phr0);
        assert_eq!(break_modified_bound_strength(BoundStrength::Phr0, 0, false), BoundStrength::Phr0);
    }

    #[test]
    fn break_at_zero_duration_demotes_nonprimary_minor_phrase() {
        assert_eq!(break_modified_bound_strength(BoundStrength::Phr3, 0, false), BoundStrength::Phr0);
        assert_eq!(break_modified_bound_strength(BoundStrength::Phr3, 0, true), BoundStrength::Phr3);
    }

    #[test]
    fn break_duration_above_fifty_ms_is_a_sentence_break() {
        assert_eq!(break_modified_bound_strength(BoundStrength::Phr1, 80, false), BoundStrength::Phr1);
        assert_eq!(break_modified_bound_strength(BoundStrength::Phr2, 80, false), BoundStrength::Phr1);
    }

    #[test]
    fn play_and_ignsig_start_force_distinct_break_sides() {
        assert_eq!(break_interrupting(cmd_kind::PLAY, cmd_info2::NA), (true, true));
        assert_eq!(break_interrupting(cmd_kind::IGNSIG, cmd_info2::START), (true, false));
        assert_eq!(break_interrupting(cmd_kind::IGNSIG, cmd_info2::TERM), (false, true));
    }
}
