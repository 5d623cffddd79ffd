//! FST image parsing and access (§4.2, §6).
//!
//! Grounded directly in `examples/original_source/pico/lib/picokfst.c`: the
//! header layout, alphabet hash-chain walk, transition-matrix indexing and
//! accepting-state lookup are all straight ports of that file's behavior,
//! re-expressed as safe slice indexing instead of raw pointer arithmetic.

use crate::bytestream::ByteStreamReader;
use crate::error::CoreError;

const FILE_HDR_SIZE: usize = 4;

/// Transduction-mode bitset flags (§3, picokfst.h `picofst_transduction_mode`).
pub mod mode {
    /// FST introduces brand-new symbols not present on its input side
    /// (e.g. `{#WB}`, `{#PB-S}`, `{#ACC0}`, ...).
    pub const NEW_SYMS: u8 = 1;
    /// FST alphabet includes part-of-speech symbols.
    pub const POS_USED: u8 = 2;
}

/// A parsed, logically-immutable FST image (§3, §4.2).
///
/// Borrows its backing bytes; the host is expected to keep the knowledge
/// base buffer alive for as long as any `FstImage` built from it, exactly
/// as the original's `kfst->fstStream` is a raw alias into an
/// already-loaded knowledge base.
#[derive(Clone, Copy, Debug)]
pub struct FstImage<'a> {
    stream: &'a [u8],
    transduction_mode: u8,
    classes: i32,
    states: i32,
    #[allow(dead_code)] // kept for parity with the original header; not consumed downstream
    term_class: i32,
    alpha_hash_tab_size: i32,
    alpha_hash_tab_pos: usize,
    trans_tab_entry_size: u8,
    trans_tab_pos: usize,
    in_eps_state_tab_pos: usize,
    acc_state_tab_pos: usize,
}

/// Cursor into the alphabet pair list for one input symbol, returned by
/// [`FstImage::start_pair_search`]. Implements [`Iterator`] yielding
/// `(outSym, class)` pairs, per §9's "iterator vs callback" note.
pub struct PairSearch<'a> {
    stream: &'a [u8],
    pos: Option<usize>,
}

impl<'a> Iterator for PairSearch<'a> {
    type Item = (i16, i16);

    fn next(&mut self) -> Option<(i16, i16)> {
        let pos = self.pos?;
        let mut reader = ByteStreamReader::at(self.stream, pos);
        let out_sym = reader.read_varint_zigzag().ok()?;
        if out_sym as i16 == crate::symbol::ILLEG {
            self.pos = None;
            return None;
        }
        let class = reader.read_varint_zigzag().ok()?;
        self.pos = Some(reader.position());
        Some((out_sym as i16, class as i16))
    }
}

/// Cursor into the input-epsilon transition list for one state, returned
/// by [`FstImage::start_ineps_search`]. Yields `(outSym, endState)` pairs.
pub struct InEpsSearch<'a> {
    stream: &'a [u8],
    pos: Option<usize>,
}

impl<'a> Iterator for InEpsSearch<'a> {
    type Item = (i16, i16);

    fn next(&mut self) -> Option<(i16, i16)> {
        let pos = self.pos?;
        let mut reader = ByteStreamReader::at(self.stream, pos);
        let out_sym = reader.read_varint_zigzag().ok()?;
        if out_sym as i16 == crate::symbol::ILLEG {
            self.pos = None;
            return None;
        }
        let end_state = reader.read_varint_zigzag().ok()?;
        self.pos = Some(reader.position());
        Some((out_sym as i16, end_state as i16))
    }
}

impl<'a> FstImage<'a> {
    /// Parses the 4-byte header marker and ten varint header scalars,
    /// resolving offsets relative to the end of the header marker (§6).
    pub fn load(image: &'a [u8]) -> Result<Self, CoreError> {
        if image.len() < FILE_HDR_SIZE {
            return Err(CoreError::Decode);
        }
        let mut reader = ByteStreamReader::at(image, FILE_HDR_SIZE);

        let transduction_mode = reader.read_varint_zigzag()?;
        let classes = reader.read_varint_zigzag()?;
        let states = reader.read_varint_zigzag()?;
        let term_class = reader.read_varint_zigzag()?;
        let alpha_hash_tab_size = reader.read_varint_zigzag()?;
        let alpha_offs = reader.read_varint_zigzag()?;
        let trans_tab_entry_size = reader.read_varint_zigzag()?;
        let trans_offs = reader.read_varint_zigzag()?;
        let in_eps_offs = reader.read_varint_zigzag()?;
        let acc_offs = reader.read_varint_zigzag()?;

        if classes < 0
            || states < 0
            || alpha_hash_tab_size <= 0
            || !(1..=4).contains(&trans_tab_entry_size)
            || alpha_offs < 0
            || trans_offs < 0
            || in_eps_offs < 0
            || acc_offs < 0
        {
            return Err(CoreError::Decode);
        }

        let resolve = |offs: i32| -> Result<usize, CoreError> {
            FILE_HDR_SIZE.checked_add(offs as usize).ok_or(CoreError::Decode)
        };

        Ok(FstImage {
            stream: image,
            transduction_mode: transduction_mode as u8,
            classes,
            states,
            term_class,
            alpha_hash_tab_size,
            alpha_hash_tab_pos: resolve(alpha_offs)?,
            trans_tab_entry_size: trans_tab_entry_size as u8,
            trans_tab_pos: resolve(trans_offs)?,
            in_eps_state_tab_pos: resolve(in_eps_offs)?,
            acc_state_tab_pos: resolve(acc_offs)?,
        })
    }

    /// Number of states and classes. Legal states are `1..=states`, legal
    /// classes are `1..=classes`.
    pub fn sizes(&self) -> (i32, i32) {
        (self.states, self.classes)
    }

    /// Transduction-mode bitset (see [`mode`]).
    pub fn mode(&self) -> u8 {
        self.transduction_mode
    }

    /// Starts a search for all `(outSym, class)` pairs recorded for
    /// `in_sym`, per picokfst.c's `picokfst_kfstStartPairSearch`: hash
    /// `in_sym % alphaHashTabSize`, then walk the hash-chain comparing the
    /// stored input symbol until a match or the chain ends.
    pub fn start_pair_search(&self, in_sym: i16) -> Option<PairSearch<'a>> {
        if self.alpha_hash_tab_size <= 0 {
            return None;
        }
        let h = (in_sym as i64).rem_euclid(self.alpha_hash_tab_size as i64) as usize;
        let slot_pos = self.alpha_hash_tab_pos.checked_add(h.checked_mul(4)?)?;
        let mut reader = ByteStreamReader::at(self.stream, slot_pos);
        let offs = reader.read_fixed_signed_zigzag(4).ok()?;
        if offs <= 0 {
            return None;
        }
        let mut cell_pos = self.alpha_hash_tab_pos.checked_add(offs as usize)?;
        loop {
            let mut cell_reader = ByteStreamReader::at(self.stream, cell_pos);
            let in_sym_x = cell_reader.read_varint_zigzag().ok()?;
            let next_same_hash_offs = cell_reader.read_varint_zigzag().ok()?;
            if in_sym_x as i16 == in_sym {
                return Some(PairSearch {
                    stream: self.stream,
                    pos: Some(cell_reader.position()),
                });
            }
            if next_same_hash_offs <= 0 {
                return None;
            }
            cell_pos = cell_pos.checked_add(next_same_hash_offs as usize)?;
        }
    }

    /// Attempts transition from `start_state` on `class`; returns `None`
    /// ("no transition") for an out-of-range state/class or a zero table
    /// entry, per picokfst.c's `picokfst_kfstGetTrans`.
    pub fn trans(&self, start_state: i16, class: i16) -> Option<i16> {
        if start_state < 1 || i32::from(start_state) > self.states || class < 1 || i32::from(class) > self.classes
        {
            return None;
        }
        let index = (i64::from(start_state) - 1) * i64::from(self.classes) + i64::from(class) - 1;
        let pos = self
            .trans_tab_pos
            .checked_add((index as usize).checked_mul(self.trans_tab_entry_size as usize)?)?;
        let mut reader = ByteStreamReader::at(self.stream, pos);
        let end_state = reader.read_fixed_unsigned(self.trans_tab_entry_size).ok()?;
        if end_state == 0 {
            None
        } else {
            Some(end_state as i16)
        }
    }

    /// Starts a search for input-epsilon transitions leaving `start_state`.
    pub fn start_ineps_search(&self, start_state: i16) -> Option<InEpsSearch<'a>> {
        if start_state <= 0 || i32::from(start_state) > self.states {
            return None;
        }
        let pos = self
            .in_eps_state_tab_pos
            .checked_add((start_state as usize - 1).checked_mul(4)?)?;
        let mut reader = ByteStreamReader::at(self.stream, pos);
        let offs = reader.read_fixed_signed_zigzag(4).ok()?;
        if offs <= 0 {
            return None;
        }
        Some(InEpsSearch {
            stream: self.stream,
            pos: Some(self.in_eps_state_tab_pos.checked_add(offs as usize)?),
        })
    }

    /// Whether `state` is accepting (§3 invariant: state 1 is always
    /// accepting; this accessor still defers to the table like the
    /// original, which independently marks state 1 accepting there too).
    pub fn is_accepting(&self, state: i16) -> bool {
        if state <= 0 || i32::from(state) > self.states {
            return false;
        }
        let pos = match self.acc_state_tab_pos.checked_add(state as usize - 1) {
            Some(p) => p,
            None => return false,
        };
        let mut reader = ByteStreamReader::at(self.stream, pos);
        reader.read_fixed_unsigned(1).map(|v| v == 1).unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A tiny hand-built FST image used by engine/fst tests: single FST
    //! mapping phoneme `a` (id 2) -> `A` (id 3) in state 1, all other
    //! symbols pass through as identity via a second class, with state 1
    //! accepting.
    use super::*;
    use crate::bytestream::{encode_varint_zigzag, zigzag_encode};

    /// Builds a minimal 2-state, 2-class FST: class 1 maps symbol `a`(2)
    /// -> `A`(3) staying in state 1; class 2 maps any other symbol `s` to
    /// itself staying in state 1. State 1 is accepting.
    pub fn build_rewrite_fst(from: i16, to: i16) -> alloc::vec::Vec<u8> {
        let mut body = alloc::vec::Vec::new(); // everything after the 4-byte marker

        // We lay out: alphabet hash table (size 1), then alphabet cells,
        // then transition table (1 state x 1 class, width 1), then
        // in-eps table (empty), then accepting-state table.
        //
        // Layout plan (offsets relative to end of body start = 0):
        //   alpha_hash_tab at offset 0: 1 slot (4 bytes)
        //   alpha cells immediately after
        //   trans table after that
        //   in-eps table after that
        //   accept table after that
        let alpha_hash_tab_size = 1i32;

        // We'll build the alphabet cell bytes in a temp buffer, then lay
        // out the hash table pointing at offset (relative to
        // alphaHashTabPos) 4 (just past the one hash slot).
        let mut cells = alloc::vec::Vec::new();
        // single chain: one cell for `from`
        encode_varint_zigzag(from as i32, &mut cells); // inSym
        encode_varint_zigzag(0, &mut cells); // nextChainOffs = 0 (no more)
        encode_varint_zigzag(to as i32, &mut cells); // outSym
        encode_varint_zigzag(1, &mut cells); // pairClass = 1
        encode_varint_zigzag(crate::symbol::ILLEG as i32, &mut cells); // terminator

        let alpha_hash_tab_pos_rel = 0usize;
        let alpha_cells_rel = 4usize; // right after the 4-byte hash slot
        let mut alpha_region = alloc::vec::Vec::new();
        // hash slot 0 -> offset to the cell, relative to alphaHashTabPos.
        // Fixed-width slot values are read back via
        // `read_fixed_signed_zigzag`, so the stored bytes must be the
        // zig-zag encoding of the offset, not its plain big-endian form.
        alpha_region.extend_from_slice(&zigzag_encode(alpha_cells_rel as i32).to_be_bytes());
        alpha_region.extend_from_slice(&cells);

        let trans_rel = alpha_hash_tab_pos_rel + alpha_region.len();
        // 1 state x 1 class, width 1 byte: end state = 1
        let trans_region = alloc::vec![1u8];

        let in_eps_rel = trans_rel + trans_region.len();
        // 1 state, no in-eps transitions: offset 0 means none
        let in_eps_region = alloc::vec![0u8, 0u8, 0u8, 0u8];

        let acc_rel = in_eps_rel + in_eps_region.len();
        let acc_region = alloc::vec![1u8]; // state 1 accepting

        body.extend_from_slice(&alpha_region);
        body.extend_from_slice(&trans_region);
        body.extend_from_slice(&in_eps_region);
        body.extend_from_slice(&acc_region);

        let mut header_fields = alloc::vec::Vec::new();
        encode_varint_zigzag(0, &mut header_fields); // mode
        encode_varint_zigzag(1, &mut header_fields); // classes
        encode_varint_zigzag(1, &mut header_fields); // states
        encode_varint_zigzag(1, &mut header_fields); // term class
        encode_varint_zigzag(alpha_hash_tab_size, &mut header_fields);
        encode_varint_zigzag(alpha_hash_tab_pos_rel as i32, &mut header_fields);
        encode_varint_zigzag(1, &mut header_fields); // trans entry width
        encode_varint_zigzag(trans_rel as i32, &mut header_fields);
        encode_varint_zigzag(in_eps_rel as i32, &mut header_fields);
        encode_varint_zigzag(acc_rel as i32, &mut header_fields);

        let mut image = alloc::vec![0u8; FILE_HDR_SIZE];
        image.extend_from_slice(&header_fields);
        image.extend_from_slice(&body);
        image
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build_rewrite_fst;
    use super::*;

    #[test]
    fn loads_header_fields() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        assert_eq!(fst.sizes(), (1, 1));
    }

    #[test]
    fn alphabet_search_completeness() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        let pairs: alloc::vec::Vec<_> = fst.start_pair_search(2).unwrap().collect();
        assert_eq!(pairs, alloc::vec![(3, 1)]);
    }

    #[test]
    fn missing_symbol_search_is_none() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        assert!(fst.start_pair_search(99).is_none());
    }

    #[test]
    fn transition_and_accepting() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        assert_eq!(fst.trans(1, 1), Some(1));
        assert_eq!(fst.trans(1, 2), None);
        assert_eq!(fst.trans(99, 1), None);
        assert!(fst.is_accepting(1));
        assert!(!fst.is_accepting(2));
    }

    #[test]
    fn no_ineps_transitions() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        assert!(fst.start_ineps_search(1).is_none());
    }

    #[test]
    fn truncated_image_is_decode_error() {
        assert_eq!(FstImage::load(&[1, 2, 3]).unwrap_err(), CoreError::Decode);
    }

    /// Round-trips an image through a real file and `memmap2`, the same
    /// loading path the CLI uses for `fst info`/`fst trace`/`run`.
    #[cfg(feature = "cli")]
    #[test]
    fn loads_from_memory_mapped_file() {
        use std::io::Write;

        let image = build_rewrite_fst(2, 3);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&image).unwrap();
        file.flush().unwrap();

        let mmap = unsafe { memmap2::Mmap::map(file.as_file()).unwrap() };
        let fst = FstImage::load(&mmap).unwrap();
        assert_eq!(fst.sizes(), (1, 1));
        assert_eq!(fst.start_pair_search(2).unwrap().collect::<alloc::vec::Vec<_>>(), alloc::vec![(3, 1)]);
    }
}
