//! Error kinds and the warning-sink used to report recoverable problems (§7).
//!
//! Fatal errors ([`CoreError`]) are returned from `step`/`load` style calls
//! and move the owning stage into an error state. Recoverable problems
//! ([`Warning`]) never bubble up as `Err` — a stage reports them to a
//! [`WarningSink`] and continues, per the propagation policy in §7.

use core::fmt;

#[cfg(any(test, feature = "std"))]
extern crate std as alloc_std;

/// Fatal error kinds (§7). A stage that returns one of these moves to an
/// error state; the host may reset it via [`crate::stage::ResetMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed FST image or item stream; the cursor would read past the
    /// end of the image, or a header field is out of range.
    Decode,
    /// An internal buffer (output sequence, alt-descriptor stack, content
    /// arena, extended-head array) would overflow its fixed capacity.
    Capacity,
    /// Unexpected alignment between an item's declared content and the
    /// transduced phone stream (e.g. a `Bounds` pass expecting a
    /// phrase-bound-strength symbol and finding something else).
    Invariant,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Decode => write!(f, "malformed byte stream"),
            CoreError::Capacity => write!(f, "internal buffer capacity exceeded"),
            CoreError::Invariant => write!(f, "item/phoneme stream alignment violated"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/// Recoverable events reported to a [`WarningSink`] instead of propagated
/// as errors (§7: `Capacity`, `Classifier`, `NoSolution` are all
/// warning-and-continue).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// A transduction solution was found but truncated because `outSeq`/
    /// `maxOutSeqLen` was too small to hold the full path.
    SolutionTruncated { path_len: usize, capacity: usize },
    /// The alt-descriptor stack reached its configured depth; the search
    /// was pruned rather than aborted and may have missed solutions.
    SearchDepthExceeded { depth: usize },
    /// No accepting path existed; the input was copied to the output
    /// unchanged (identity fallback).
    NoSolution { input_len: usize },
    /// A decision-tree classifier call failed (in-vec construction,
    /// classification, or decomposition); processing continued using the
    /// fallback value passed to the call.
    ClassifierFailed { context: &'static str },
    /// A bounded buffer (collect slots, sentence buffer, content arena)
    /// filled before a natural boundary was reached; processing forced a
    /// boundary early.
    ForcedBoundary { context: &'static str },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SolutionTruncated { path_len, capacity } => write!(
                f,
                "transduction solution of length {path_len} truncated to capacity {capacity}"
            ),
            Warning::SearchDepthExceeded { depth } => {
                write!(f, "transduction search pruned at depth {depth}")
            }
            Warning::NoSolution { input_len } => write!(
                f,
                "no transduction solution for input of length {input_len}; using identity fallback"
            ),
            Warning::ClassifierFailed { context } => {
                write!(f, "classifier call failed in {context}; continuing with fallback")
            }
            Warning::ForcedBoundary { context } => {
                write!(f, "buffer filled before a natural boundary in {context}; forcing one")
            }
        }
    }
}

/// Sink for warnings a stage cannot and must not propagate as errors.
///
/// A host loop typically implements this on its event bus; tests use
/// [`VecSink`] or [`NullSink`].
pub trait WarningSink {
    fn warn(&mut self, warning: Warning);
}

/// Discards every warning. Useful when the host genuinely does not care.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl WarningSink for NullSink {
    #[inline]
    fn warn(&mut self, _warning: Warning) {}
}

/// Records warnings in arrival order, for tests and the CLI's `run` command.
#[cfg(feature = "std")]
#[derive(Clone, Debug, Default)]
pub struct VecSink(pub std::vec::Vec<Warning>);

#[cfg(feature = "std")]
impl WarningSink for VecSink {
    fn warn(&mut self, warning: Warning) {
        self.0.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_drops_everything() {
        let mut sink = NullSink;
        sink.warn(Warning::NoSolution { input_len: 3 });
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut sink = VecSink::default();
        sink.warn(Warning::NoSolution { input_len: 1 });
        sink.warn(Warning::SearchDepthExceeded { depth: 4 });
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0], Warning::NoSolution { input_len: 1 });
    }

    #[test]
    fn display_is_non_empty() {
        assert!(!CoreError::Decode.to_string().is_empty());
    }
}
