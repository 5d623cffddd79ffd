//! Backtracking transduction search, epsilon elimination, and trivial
//! syllabification (§4.3, §4.5).
//!
//! The search is grounded directly in picotrns.c's `GetNextAlternative` /
//! `TransductionStep` / `picotrns_transduce`, re-architected per §9 as an
//! explicit `Vec<AltDesc>` stack instead of recursion-by-index into a
//! pre-allocated array — the state machine per depth (`altState` 0..4) and
//! the overall control flow (try next alternative, note a solution when the
//! resulting state accepts and input is exhausted, push or backtrack) are
//! unchanged in meaning.

use alloc::vec::Vec;

use crate::fst::FstImage;
use crate::phone::PhoneTable;
use crate::symbol::{Position, PosSym, EPS, ILLEG};
use crate::error::{Warning, WarningSink};

/// One alt-descriptor: the backtracking state for a single recursion depth
/// (§3 "Transduction state").
#[derive(Clone, Copy, Debug)]
struct AltDesc {
    start_fst_state: i16,
    in_pos: i32,
    /// 0 = before pair search, 1 = pair search, 2 = before in-eps search,
    /// 3 = in-eps search, 4 = exhausted.
    alt_state: u8,
    alt_out_sym: i16,
    alt_out_ref_pos: Position,
}

/// Iterator-backed alternative search for a single alt-descriptor. Wraps
/// the FST's `PairSearch`/`InEpsSearch` iterators so `GetNextAlternative`'s
/// four-state machine becomes a single `next_alternative` call per step,
/// matching the FST's own iterator style (§9).
enum AltSearch<'a> {
    NotStarted,
    Pairs(crate::fst::PairSearch<'a>),
    InEps(crate::fst::InEpsSearch<'a>),
    Done,
}

struct Alternative {
    out_sym: i16,
    out_ref_pos: Position,
    end_state: i16,
    next_in_pos: i32,
}

fn next_alternative<'a>(
    fst: &FstImage<'a>,
    desc: &mut AltDesc,
    search: &mut AltSearch<'a>,
    in_seq: &[PosSym],
) -> Option<Alternative> {
    loop {
        match desc.alt_state {
            0 => {
                if (desc.in_pos as usize) < in_seq.len() {
                    let cur = in_seq[desc.in_pos as usize];
                    if cur.sym == EPS {
                        desc.alt_state = 2;
                        return Some(Alternative {
                            out_sym: EPS,
                            out_ref_pos: cur.pos,
                            end_state: desc.start_fst_state,
                            next_in_pos: desc.in_pos + 1,
                        });
                    }
                    match fst.start_pair_search(cur.sym) {
                        Some(iter) => {
                            *search = AltSearch::Pairs(iter);
                            desc.alt_state = 1;
                        }
                        None => desc.alt_state = 2,
                    }
                } else {
                    desc.alt_state = 2;
                }
            }
            1 => {
                let iter = match search {
                    AltSearch::Pairs(it) => it,
                    _ => unreachable!("altState 1 requires a PairSearch iterator"),
                };
                match iter.next() {
                    Some((out_sym, class)) => {
                        if let Some(end_state) = fst.trans(desc.start_fst_state, class) {
                            let cur = in_seq[desc.in_pos as usize];
                            return Some(Alternative {
                                out_sym,
                                out_ref_pos: cur.pos,
                                end_state,
                                next_in_pos: desc.in_pos + 1,
                            });
                        }
                        // no transition for this class; keep scanning pairs
                    }
                    None => desc.alt_state = 2,
                }
            }
            2 => {
                match fst.start_ineps_search(desc.start_fst_state) {
                    Some(iter) => {
                        *search = AltSearch::InEps(iter);
                        desc.alt_state = 3;
                    }
                    None => desc.alt_state = 4,
                }
            }
            3 => {
                let iter = match search {
                    AltSearch::InEps(it) => it,
                    _ => unreachable!("altState 3 requires an InEpsSearch iterator"),
                };
                match iter.next() {
                    Some((out_sym, end_state)) => {
                        return Some(Alternative {
                            out_sym,
                            out_ref_pos: Position::Insert,
                            end_state,
                            next_in_pos: desc.in_pos,
                        });
                    }
                    None => desc.alt_state = 4,
                }
            }
            _ => return None,
        }
    }
}

/// Outcome of a [`transduce`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransductionOutcome {
    /// Whether at least one accepting path was found. When `false`, `out`
    /// holds the identity-fallback copy of the input.
    pub solution_found: bool,
    /// Number of solutions recorded (only ever relevant when
    /// `first_sol_only == false`; callers after the first solution with
    /// `first_sol_only == true` will see `1`).
    pub solutions: u32,
    /// Internal step count, exposed for tracing/benchmarking (picotrns.c's
    /// `nrSteps` out-parameter).
    pub steps: u32,
}

/// Runs the backtracking transduction search described in §4.3.
///
/// `first_sol_only` selects "first complete solution" (normal runtime
/// policy) vs "last complete solution" (testing policy, mirroring
/// `picotrns_transduce`'s `firstSolOnly` parameter — note the *last*
/// solution is returned when scanning for all of them, matching the
/// original's `NoteSolution` being called on every accepting path and
/// overwriting the previous one). `max_depth` bounds the alt-descriptor
/// stack (recursion depth); `max_out_len` bounds the output sequence.
pub fn transduce<S: WarningSink>(
    fst: &FstImage<'_>,
    first_sol_only: bool,
    input: &[PosSym],
    out: &mut Vec<PosSym>,
    max_out_len: usize,
    max_depth: usize,
    mut on_solution: Option<&mut dyn FnMut(&[PosSym])>,
    sink: &mut S,
) -> TransductionOutcome {
    out.clear();
    let mut steps: u32 = 0;
    let mut solutions: u32 = 0;

    let mut best: Option<Vec<PosSym>> = None;

    if input.is_empty() {
        solutions += 1;
        if let Some(cb) = on_solution.as_deref_mut() {
            cb(&[]);
        }
        best = Some(Vec::new());
        if first_sol_only {
            return TransductionOutcome { solution_found: true, solutions, steps: 1 };
        }
    }

    let mut stack: Vec<AltDesc> = Vec::with_capacity(max_depth.min(input.len() + 2));
    let mut searches: Vec<AltSearch<'_>> = Vec::with_capacity(max_depth.min(input.len() + 2));
    stack.push(AltDesc {
        start_fst_state: 1,
        in_pos: 0,
        alt_state: 0,
        alt_out_sym: 0,
        alt_out_ref_pos: Position::Invalid,
    });
    searches.push(AltSearch::NotStarted);

    while !stack.is_empty() {
        steps += 1;
        let depth = stack.len() - 1;
        let (desc, end_state, next_in_pos, found) = {
            let desc = &mut stack[depth];
            let search = &mut searches[depth];
            match next_alternative(fst, desc, search, input) {
                Some(alt) => {
                    desc.alt_out_sym = alt.out_sym;
                    desc.alt_out_ref_pos = alt.out_ref_pos;
                    (*desc, alt.end_state, alt.next_in_pos, true)
                }
                None => (*desc, 0, 0, false),
            }
        };

        if found {
            if next_in_pos as usize == input.len() && fst.is_accepting(end_state) {
                solutions += 1;
                let path: Vec<PosSym> = stack
                    .iter()
                    .map(|d| PosSym::new(d.alt_out_ref_pos, d.alt_out_sym))
                    .collect();
                if let Some(cb) = on_solution.as_deref_mut() {
                    cb(&path);
                }
                best = Some(path);
                if first_sol_only {
                    break;
                }
            }

            if stack.len() < max_depth {
                stack.push(AltDesc {
                    start_fst_state: end_state,
                    in_pos: next_in_pos,
                    alt_state: 0,
                    alt_out_sym: 0,
                    alt_out_ref_pos: Position::Invalid,
                });
                searches.push(AltSearch::NotStarted);
            } else {
                sink.warn(Warning::SearchDepthExceeded { depth: stack.len() });
            }
            let _ = desc;
        } else {
            stack.pop();
            searches.pop();
        }
    }

    match best {
        Some(path) => {
            let solution_found = true;
            if path.len() > max_out_len {
                sink.warn(Warning::SolutionTruncated { path_len: path.len(), capacity: max_out_len });
                out.extend_from_slice(&path[..max_out_len]);
            } else {
                out.extend_from_slice(&path);
            }
            TransductionOutcome { solution_found, solutions, steps }
        }
        None => {
            sink.warn(Warning::NoSolution { input_len: input.len() });
            let n = input.len().min(max_out_len);
            out.extend_from_slice(&input[..n]);
            TransductionOutcome { solution_found: false, solutions, steps }
        }
    }
}

/// Copies `in_seq` to `out`, dropping every element whose symbol is
/// [`EPS`] (picotrns.c's `picotrns_eliminate_epsilons`). Idempotent: a
/// sequence with no epsilons is unchanged by a second application (§8
/// item 5).
pub fn eliminate_epsilons<S: WarningSink>(in_seq: &[PosSym], out: &mut Vec<PosSym>, max_out_len: usize, sink: &mut S) {
    out.clear();
    for &item in in_seq {
        if item.sym != EPS {
            if out.len() < max_out_len {
                out.push(item);
            } else {
                sink.warn(Warning::SolutionTruncated { path_len: in_seq.len(), capacity: max_out_len });
                break;
            }
        }
    }
}

/// Inserts syllable separators between syllable-carrier clusters separated
/// by a consonant cluster, the way picotrns.c's `picotrns_trivial_syllabify`
/// does: a stress marker encountered while skipping the consonant cluster
/// is captured and re-emitted immediately after the inserted separator;
/// the consonant immediately before the following vowel is never skipped.
///
/// Preserves the multiset of non-separator phones and inserts exactly one
/// separator between each pair of adjacent syllable-carrier clusters (§8
/// item 6).
pub fn trivial_syllabify<P: PhoneTable, S: WarningSink>(
    phones: &P,
    in_seq: &[PosSym],
    out: &mut Vec<PosSym>,
    max_out_len: usize,
    sink: &mut S,
) -> Result<(), crate::error::CoreError> {
    out.clear();
    let len = in_seq.len();
    let mut i = 0usize;
    let mut j = 0usize;
    let mut vowel_found = false;

    let push = |out: &mut Vec<PosSym>, item: PosSym| -> Result<(), crate::error::CoreError> {
        if out.len() >= max_out_len {
            return Err(crate::error::CoreError::Capacity);
        }
        out.push(item);
        Ok(())
    };
    let insert = |out: &mut Vec<PosSym>, sym: i16| -> Result<(), crate::error::CoreError> {
        if out.len() >= max_out_len {
            return Err(crate::error::CoreError::Capacity);
        }
        out.push(PosSym::new(Position::Insert, sym));
        Ok(())
    };

    while i < len {
        let mut accent: Option<(usize, i16)> = None;
        while j < len && !phones.is_syll_carrier(in_seq[j].sym) {
            if in_seq[j].sym == phones.primary_stress_id() || in_seq[j].sym == phones.secondary_stress_id() {
                accent = Some((j, in_seq[j].sym));
            }
            j += 1;
        }

        if j < len {
            // j sits at the start of a new vowel cluster; copy the
            // consonant cluster (minus its final member, copied below)
            // ahead of `i`, skipping the stress marker if present.
            while i < j.saturating_sub(1) {
                if accent.map(|(p, _)| p) == Some(i) {
                    i += 1;
                } else {
                    push(out, in_seq[i])?;
                    i += 1;
                }
            }
            if vowel_found {
                insert(out, phones.syll_boundary_id())?;
                if let Some((_, sym)) = accent {
                    insert(out, sym)?;
                }
            }
            if i < j {
                if accent.map(|(p, _)| p) == Some(i) {
                    i += 1;
                } else {
                    push(out, in_seq[i])?;
                    i += 1;
                }
            }
            vowel_found = true;
            while i < len && phones.is_syll_carrier(in_seq[i].sym) {
                push(out, in_seq[i])?;
                i += 1;
            }
            j = i;
        } else {
            // end of word/input: copy remaining consonants/stress as-is.
            while i < j {
                push(out, in_seq[i])?;
                i += 1;
            }
        }
    }

    if out.is_empty() && !in_seq.is_empty() {
        sink.warn(Warning::ForcedBoundary { context: "trivial_syllabify produced no output" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullSink;
    use crate::fst::test_support::build_rewrite_fst;
    use crate::phone::tests_support::StaticPhoneTable;

    fn pos(n: u32) -> Position {
        Position::Real(n)
    }

    #[test]
    fn empty_input_is_always_accepted() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        let mut out = Vec::new();
        let mut sink = NullSink;
        let outcome = transduce(&fst, true, &[], &mut out, 10, 10, None, &mut sink);
        assert!(outcome.solution_found);
        assert!(out.is_empty());
    }

    #[test]
    fn rewrites_single_symbol() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        let input = [PosSym::new(pos(0), 2)];
        let mut out = Vec::new();
        let mut sink = NullSink;
        let outcome = transduce(&fst, true, &input, &mut out, 10, 10, None, &mut sink);
        assert!(outcome.solution_found);
        assert_eq!(out, alloc::vec![PosSym::new(pos(0), 3)]);
    }

    #[test]
    fn identity_fallback_when_no_solution() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        // symbol 7 has no alphabet entry and no in-eps transitions, so no
        // accepting path exists; expect identity fallback.
        let input = [PosSym::new(pos(0), 7)];
        let mut out = Vec::new();
        let mut sink = crate::error::VecSink::default();
        let outcome = transduce(&fst, true, &input, &mut out, 10, 10, None, &mut sink);
        assert!(!outcome.solution_found);
        assert_eq!(out, alloc::vec![PosSym::new(pos(0), 7)]);
        assert!(sink.0.iter().any(|w| matches!(w, Warning::NoSolution { .. })));
    }

    #[test]
    fn position_monotonicity_holds_for_rewrite() {
        let image = build_rewrite_fst(2, 3);
        let fst = FstImage::load(&image).unwrap();
        let input = [PosSym::new(pos(0), 2), PosSym::new(pos(1), 2)];
        let mut out = Vec::new();
        let mut sink = NullSink;
        transduce(&fst, true, &input, &mut out, 10, 10, None, &mut sink);
        assert!(crate::symbol::positions_non_decreasing(&out));
    }

    #[test]
    fn eliminate_epsilons_is_idempotent() {
        let seq = alloc::vec![
            PosSym::new(pos(0), EPS),
            PosSym::new(pos(1), 5),
            PosSym::new(pos(2), EPS),
            PosSym::new(pos(3), 6),
        ];
        let mut once = Vec::new();
        let mut sink = NullSink;
        eliminate_epsilons(&seq, &mut once, 10, &mut sink);
        let mut twice = Vec::new();
        eliminate_epsilons(&once, &mut twice, 10, &mut sink);
        assert_eq!(once, twice);
    }

    #[test]
    fn trivial_syllabify_single_syllable_no_separator() {
        let phones = StaticPhoneTable::default();
        // k(10) a(1, vowel) t(11): one syllable, no separator needed.
        let seq = alloc::vec![
            PosSym::new(pos(0), 10),
            PosSym::new(pos(1), 1),
            PosSym::new(pos(2), 11),
        ];
        let mut out = Vec::new();
        let mut sink = NullSink;
        trivial_syllabify(&phones, &seq, &mut out, 32, &mut sink).unwrap();
        assert_eq!(out, seq);
    }

    #[test]
    fn trivial_syllabify_inserts_between_vowels() {
        let phones = StaticPhoneTable::default();
        // a(1) t(11) a(1): consonant cluster of length 1 between two
        // vowels gets a separator inserted before the consonant.
        let seq = alloc::vec![PosSym::new(pos(0), 1), PosSym::new(pos(1), 11), PosSym::new(pos(2), 1)];
        let mut out = Vec::new();
        let mut sink = NullSink;
        trivial_syllabify(&phones, &seq, &mut out, 32, &mut sink).unwrap();
        let syms: alloc::vec::Vec<i16> = out.iter().map(|p| p.sym).collect();
        assert_eq!(syms, alloc::vec![1, phones.syll_boundary_id(), 11, 1]);
        // multiset of non-separator phones preserved
        let non_sep: alloc::vec::Vec<i16> =
            out.iter().map(|p| p.sym).filter(|&s| s != phones.syll_boundary_id()).collect();
        assert_eq!(non_sep, alloc::vec![1, 11, 1]);
    }

    proptest::proptest! {
        /// Running `eliminate_epsilons` on its own output is a no-op,
        /// whatever mix of epsilon and real symbols it started from.
        #[test]
        fn eliminate_epsilons_is_idempotent_over_arbitrary_input(
            raw in proptest::collection::vec(0i16..6, 0..16)
        ) {
            let seq: alloc::vec::Vec<PosSym> = raw
                .iter()
                .enumerate()
                .map(|(i, &s)| PosSym::new(pos(i as u32), if s == 0 { EPS } else { s }))
                .collect();
            let mut once = Vec::new();
            let mut sink = NullSink;
            eliminate_epsilons(&seq, &mut once, 64, &mut sink);
            let mut twice = Vec::new();
            eliminate_epsilons(&once, &mut twice, 64, &mut sink);
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
