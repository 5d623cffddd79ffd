//! Sentence-analysis stage: POS disambiguation, grapheme-to-phoneme
//! conversion, and word-level syllabification (§4.6).
//!
//! Grounded in `examples/original_source/pico/lib/picosa.c`'s collect /
//! POS-disambiguation / word-phonemization pipeline, re-expressed as a
//! `step`/`Status` state machine over owned `Item` buffers instead of a
//! byte-offset content arena (picosa.c's `SA_MAXSIZE_CBUF` arena becomes the
//! `Vec<Item>` phrase buffer's length bound, tracked the same way via
//! `CoreConfig::sa_collect_slots`).

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::config::CoreConfig;
use crate::engine;
use crate::error::{CoreError, Warning, WarningSink};
use crate::fst::FstImage;
use crate::item::{Item, ItemKind};
use crate::phone::PhoneTable;
use crate::stage::{ResetMode, Status};
use crate::symbol::{Plane, Position, PosSym, Symbol};
use crate::wire::{cmd_kind, punc_info2, POS_XX};

/// Output of a decision-tree classifier call, per §6's collaborator
/// interface: a class decomposes to either a single scalar (a POS tag, a
/// single phone) or a short vector (a multi-phone grapheme expansion).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecomposedClass {
    Scalar(i32),
    Vector(Vec<i32>),
}

/// The decision-tree classifier collaborator (§6): construct an input
/// vector from features, classify it, and decompose or remap the result.
/// Implementors back this with whatever decision-tree format their
/// knowledge base uses; out of scope here (§1).
pub trait Classifier {
    fn construct_in_vec(&mut self, features: &[i32]) -> bool;
    fn classify(&mut self) -> i32;
    fn decompose_out_class(&self, class: i32) -> DecomposedClass;
    /// Remaps `class` to a fixed alphabet, falling back to `fallback` when
    /// `class` has no mapping given the previous output `prev`.
    fn reverse_map_out_fixed(&self, class: i32, prev: i32, fallback: i32) -> i32;
}

/// The lexicon collaborator (§6): a direct grapheme-string to
/// `(pos, phones)` lookup, checked before falling back to the classifier.
pub trait Lexicon {
    fn lookup(&self, key: &[u8]) -> Option<(i16, Vec<i16>)>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SaState {
    Collect,
    ProcessPosD,
    ProcessWPho,
    ProcessTrnsParse,
    ProcessTrnsFst,
    Feed,
    Error,
}

/// Sentence-analysis stage (§4.6): POS disambiguation, then
/// grapheme/lexicon/passthrough word phonemization, then a word-level FST
/// cascade (or [`engine::trivial_syllabify`] when none is configured).
pub struct SaStage<'fst, C, L, P, S> {
    config: CoreConfig,
    classifier: C,
    lexicon: L,
    phones: P,
    word_fsts: Vec<FstImage<'fst>>,
    sink: S,
    state: SaState,
    in_queue: VecDeque<Item>,
    phrase: Vec<Item>,
    out_queue: VecDeque<Item>,
    /// Parsed `(phones, original content offsets)` awaiting the FST
    /// cascade/syllabifier, one entry per word item in `phrase`, indexed by
    /// position in `phrase`.
    pending_trns: Vec<(usize, Vec<PosSym>)>,
    out_capacity: usize,
}

impl<'fst, C, L, P, S> SaStage<'fst, C, L, P, S>
where
    C: Classifier,
    L: Lexicon,
    P: PhoneTable,
    S: WarningSink,
{
    pub fn new(config: CoreConfig, classifier: C, lexicon: L, phones: P, word_fsts: Vec<FstImage<'fst>>, sink: S) -> Self {
        SaStage {
            config,
            classifier,
            lexicon,
            phones,
            word_fsts,
            sink,
            state: SaState::Collect,
            in_queue: VecDeque::new(),
            phrase: Vec::new(),
            out_queue: VecDeque::new(),
            pending_trns: Vec::new(),
            out_capacity: 64,
        }
    }

    /// Enqueues one upstream item for processing.
    pub fn push_input(&mut self, item: Item) {
        self.in_queue.push_back(item);
    }

    /// Removes and returns the next downstream item, if any is ready.
    pub fn pop_output(&mut self) -> Option<Item> {
        self.out_queue.pop_front()
    }

    pub fn reset(&mut self, mode: ResetMode) {
        self.in_queue.clear();
        self.phrase.clear();
        self.out_queue.clear();
        self.pending_trns.clear();
        self.state = SaState::Collect;
        if mode == ResetMode::Full {
            self.word_fsts.clear();
        }
    }

    /// Drives the state machine one step (§5).
    pub fn step(&mut self) -> Status {
        match self.state {
            SaState::Collect => self.step_collect(),
            SaState::ProcessPosD => self.step_process_posd(),
            SaState::ProcessWPho => self.step_process_wpho(),
            SaState::ProcessTrnsParse => self.step_process_trns_parse(),
            SaState::ProcessTrnsFst => self.step_process_trns_fst(),
            SaState::Feed => self.step_feed(),
            SaState::Error => Status::Error,
        }
    }

    fn step_collect(&mut self) -> Status {
        let Some(item) = self.in_queue.pop_front() else {
            return Status::Idle;
        };

        let phrase_ends = match item.kind {
            ItemKind::Cmd if item.info1 == cmd_kind::FLUSH => {
                self.phrase.push(Item::new(ItemKind::Punc, 0, punc_info2::FLUSH, Vec::new()).unwrap_or(item));
                true
            }
            ItemKind::Cmd if item.info1 == cmd_kind::PHONEME => {
                let phones: Vec<i16> = item.content.chunks_exact(2).map(|c| i16::from_be_bytes([c[0], c[1]])).collect();
                let sep = self.phones.word_boundary_id();
                let truncated = match phones.iter().position(|&p| p == sep) {
                    Some(cut) => &phones[..cut],
                    None => &phones[..],
                };
                self.phrase.push(
                    Item::new(ItemKind::WordPhon, POS_XX, 0, phones_to_bytes(truncated)).unwrap_or(item),
                );
                false
            }
            ItemKind::Punc => {
                // Every `Punc` item closes the current phrase (§4.6); its
                // `info2` only distinguishes natural/forced/flush endings.
                self.phrase.push(item);
                true
            }
            _ => {
                self.phrase.push(item);
                false
            }
        };

        if self.phrase.len() >= self.config.sa_collect_slots {
            self.sink.warn(Warning::ForcedBoundary { context: "SaStage::Collect" });
            self.phrase.push(Item { kind: ItemKind::Punc, info1: 0, info2: punc_info2::FORCED, content: Vec::new() });
            self.state = SaState::ProcessPosD;
            return Status::Busy;
        }

        if phrase_ends {
            self.state = SaState::ProcessPosD;
        }
        Status::Busy
    }

    /// POS disambiguation over a fixed-width sliding window centered on the
    /// current word-like item (`WORDGRAPH`|`WORDINDEX`|`WORDPHON`, §4.6).
    /// `WORDINDEX` candidate `(pos, index)` pairs are packed two bytes per
    /// pair in the item's content; `WORDGRAPH`/`WORDPHON` carry a single POS
    /// in `info1` and are always unique. `prev` threads the reverse output
    /// mapping's history across the whole phrase (picosa.c:528,580,603-611),
    /// updated on both the unique and the disambiguated path.
    fn step_process_posd(&mut self) -> Status {
        const K: usize = 2;
        let len = self.phrase.len();
        let mut prev: i32 = 0;
        for i in 0..len {
            if !self.phrase[i].kind.is_word_like() {
                continue;
            }
            let pairs: Vec<(u8, u8)> = if self.phrase[i].kind == ItemKind::WordIndex {
                self.phrase[i].content.chunks_exact(2).map(|c| (c[0], c[1])).collect()
            } else {
                Vec::new()
            };
            let cur_pos = i32::from(self.phrase[i].info1);

            if pairs.len() <= 1 {
                prev = self.classifier.reverse_map_out_fixed(cur_pos, prev, cur_pos);
                continue;
            }

            let mut features = Vec::with_capacity(2 * K + 1);
            for j in i.saturating_sub(K)..i {
                features.push(pos_feature(&self.phrase[j]));
            }
            while features.len() < K {
                features.insert(0, -1);
            }
            features.push(cur_pos);
            for j in (i + 1)..(i + 1 + K).min(len) {
                features.push(pos_feature(&self.phrase[j]));
            }
            while features.len() < 2 * K + 1 {
                features.push(-1);
            }

            let chosen = if self.classifier.construct_in_vec(&features) {
                let class = self.classifier.classify();
                match self.classifier.decompose_out_class(class) {
                    DecomposedClass::Scalar(pos) => pairs.iter().find(|(p, _)| i32::from(*p) == pos).copied(),
                    DecomposedClass::Vector(v) => v.first().and_then(|&pos| pairs.iter().find(|(p, _)| i32::from(*p) == pos).copied()),
                }
            } else {
                self.sink.warn(Warning::ClassifierFailed { context: "SaStage::ProcessPosD" });
                None
            };

            let (pos, index) = chosen.unwrap_or(pairs[0]);
            self.phrase[i].info1 = pos;
            self.phrase[i].content = alloc::vec![pos, index];
            prev = self.classifier.reverse_map_out_fixed(i32::from(pos), prev, i32::from(pos));
        }
        self.state = SaState::ProcessWPho;
        Status::Busy
    }

    /// Three-way word phonemization dispatch (§4.6): already-phonemic
    /// items pass through; lexicon hits use the looked-up phone sequence;
    /// everything else goes through the classifier right-to-left,
    /// appending to a reversed buffer and reversing once at the end
    /// (mirrors picosa.c's grapheme-conversion loop direction).
    fn step_process_wpho(&mut self) -> Status {
        for item in self.phrase.iter_mut() {
            if !item.kind.is_word_like() || item.kind == ItemKind::WordPhon {
                continue;
            }
            if let Some((_pos, phones)) = self.lexicon.lookup(&item.content) {
                item.content = phones_to_bytes(&phones);
                item.kind = ItemKind::WordPhon;
                continue;
            }

            let graphemes = item.content.clone();
            let mut reversed_phones: Vec<i16> = Vec::new();
            for idx in (0..graphemes.len()).rev() {
                let lo = idx.saturating_sub(2);
                let features: Vec<i32> = graphemes[lo..=idx].iter().map(|&b| i32::from(b)).collect();
                if self.classifier.construct_in_vec(&features) {
                    let class = self.classifier.classify();
                    match self.classifier.decompose_out_class(class) {
                        DecomposedClass::Scalar(p) => reversed_phones.push(p as i16),
                        DecomposedClass::Vector(v) => {
                            for p in v.into_iter().rev() {
                                reversed_phones.push(p as i16);
                            }
                        }
                    }
                } else {
                    self.sink.warn(Warning::ClassifierFailed { context: "SaStage::ProcessWPho" });
                    reversed_phones.push(i16::from(graphemes[idx]));
                }
            }
            reversed_phones.reverse();
            item.content = phones_to_bytes(&reversed_phones);
            item.kind = ItemKind::WordPhon;
        }
        self.state = SaState::ProcessTrnsParse;
        Status::Busy
    }

    /// Frames each `WordPhon` item's phones with `phonStart`/`phonTerm`
    /// sentinels on the internal plane, stamping each phone's position
    /// with its content byte offset (§4.6).
    fn step_process_trns_parse(&mut self) -> Status {
        self.pending_trns.clear();
        for (i, item) in self.phrase.iter().enumerate() {
            if item.kind != ItemKind::WordPhon {
                continue;
            }
            let mut seq = Vec::with_capacity(item.content.len() / 2 + 2);
            seq.push(PosSym::new(Position::Invalid, Symbol::new(Plane::Internal, PHON_START).to_raw()));
            for (off, chunk) in item.content.chunks_exact(2).enumerate() {
                let phone = i16::from_be_bytes([chunk[0], chunk[1]]);
                seq.push(PosSym::new(Position::Real(off as u32), phone));
            }
            seq.push(PosSym::new(Position::Invalid, Symbol::new(Plane::Internal, PHON_TERM).to_raw()));
            self.pending_trns.push((i, seq));
        }
        self.state = SaState::ProcessTrnsFst;
        Status::Busy
    }

    /// Runs the configured word-level FST cascade (epsilon-eliminating
    /// between stages) or, absent one, [`engine::trivial_syllabify`] (§4.6).
    fn step_process_trns_fst(&mut self) -> Status {
        let entries = core::mem::take(&mut self.pending_trns);
        for (item_idx, seq) in entries {
            let framed = &seq[1..seq.len() - 1];
            let mut buf = Vec::new();
            let result: Result<(), CoreError> = if self.word_fsts.is_empty() {
                engine::trivial_syllabify(&self.phones, framed, &mut buf, self.config.max_out_seq_len, &mut self.sink)
            } else {
                let mut current = framed.to_vec();
                for fst in &self.word_fsts {
                    let mut stage_out = Vec::new();
                    engine::transduce(
                        fst,
                        true,
                        &current,
                        &mut stage_out,
                        self.config.max_out_seq_len,
                        self.config.max_alt_desc_depth,
                        None,
                        &mut self.sink,
                    );
                    let mut cleaned = Vec::new();
                    engine::eliminate_epsilons(&stage_out, &mut cleaned, self.config.max_out_seq_len, &mut self.sink);
                    current = cleaned;
                }
                buf = current;
                Ok(())
            };

            match result {
                Ok(()) => {
                    self.phrase[item_idx].content = phones_to_bytes(&buf.iter().map(|p| p.sym).collect::<Vec<_>>());
                }
                Err(_) => {
                    self.sink.warn(Warning::ForcedBoundary { context: "SaStage::ProcessTrnsFst syllabification overflow" });
                }
            }
        }
        self.state = SaState::Feed;
        Status::Busy
    }

    fn step_feed(&mut self) -> Status {
        if self.phrase.is_empty() {
            self.state = SaState::Collect;
            return if self.in_queue.is_empty() { Status::Idle } else { Status::Busy };
        }
        if self.out_queue.len() >= self.out_capacity {
            return Status::OutFull;
        }
        self.out_queue.push_back(self.phrase.remove(0));
        if self.phrase.is_empty() {
            self.state = SaState::Collect;
        }
        Status::Busy
    }
}

const PHON_START: i16 = 1;
const PHON_TERM: i16 = 2;

fn pos_feature(item: &Item) -> i32 {
    if item.kind == ItemKind::WordIndex || item.kind == ItemKind::WordPhon {
        item.content.first().map(|&b| i32::from(b)).unwrap_or(i32::from(POS_XX))
    } else {
        -1
    }
}

fn phones_to_bytes(phones: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(phones.len() * 2);
    for &p in phones {
        out.extend_from_slice(&p.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullSink;
    use crate::phone::tests_support::StaticPhoneTable;
    use crate::wire::cmd_info2;

    struct NoopClassifier;
    impl Classifier for NoopClassifier {
        fn construct_in_vec(&mut self, _features: &[i32]) -> bool {
            false
        }
        fn classify(&mut self) -> i32 {
            0
        }
        fn decompose_out_class(&self, class: i32) -> DecomposedClass {
            DecomposedClass::Scalar(class)
        }
        fn reverse_map_out_fixed(&self, class: i32, _prev: i32, _fallback: i32) -> i32 {
            class
        }
    }

    struct EmptyLexicon;
    impl Lexicon for EmptyLexicon {
        fn lookup(&self, _key: &[u8]) -> Option<(i16, Vec<i16>)> {
            None
        }
    }

    fn stage() -> SaStage<'static, NoopClassifier, EmptyLexicon, StaticPhoneTable, NullSink> {
        SaStage::new(CoreConfig::default(), NoopClassifier, EmptyLexicon, StaticPhoneTable, Vec::new(), NullSink)
    }

    #[test]
    fn single_word_phrase_feeds_a_syllabified_word_and_its_punc() {
        let mut sa = stage();
        let word = Item::new(ItemKind::WordPhon, 0, 0, phones_to_bytes(&[10, 1, 11])).unwrap();
        let punc = Item::new(ItemKind::Punc, 0, punc_info2::NATURAL, Vec::new()).unwrap();
        sa.push_input(word);
        sa.push_input(punc);

        let mut fed = Vec::new();
        for _ in 0..32 {
            match sa.step() {
                Status::Idle => break,
                Status::Error => panic!("stage entered error state"),
                _ => {
                    if let Some(item) = sa.pop_output() {
                        fed.push(item);
                    }
                }
            }
        }
        while let Some(item) = sa.pop_output() {
            fed.push(item);
        }

        assert_eq!(fed.len(), 2);
        assert_eq!(fed[0].kind, ItemKind::WordPhon);
        assert_eq!(fed[1].kind, ItemKind::Punc);
    }

    #[test]
    fn cmd_flush_is_rewritten_to_punc_flush() {
        let mut sa = stage();
        sa.push_input(Item::new(ItemKind::Cmd, cmd_kind::FLUSH, cmd_info2::NA, Vec::new()).unwrap());
        assert_eq!(sa.step(), Status::Busy);
        assert_eq!(sa.phrase.last().unwrap().kind, ItemKind::Punc);
        assert_eq!(sa.phrase.last().unwrap().info2, punc_info2::FLUSH);
    }
}
