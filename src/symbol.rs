//! Symbols, planes, and position-tagged symbols (§3).
//!
//! A wire symbol is a 16-bit value split into an 8-bit plane (high byte)
//! and an 8-bit id (low byte): `symbol = (plane << 8) | id`. Internally we
//! keep `(Plane, id)` apart and pack only at FST/item boundaries, per the
//! "plane packing" design note in §9.

use core::fmt;

/// The fixed plane enumeration (§3). Two ids are reserved independent of
/// plane: `EPS = 0`, `ILLEG = -1` — these live on [`Symbol`], not here,
/// since a reserved id can appear stamped with any plane on the wire (the
/// FST format only ever uses plane-less `i16` ids for `EPS`/`ILLEG`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    Phonemes = 0,
    Ascii = 1,
    XSampa = 2,
    Accents = 4,
    Pos = 5,
    PhraseBoundStrengths = 6,
    Internal = 7,
}

impl Plane {
    pub const fn from_u8(value: u8) -> Option<Plane> {
        match value {
            0 => Some(Plane::Phonemes),
            1 => Some(Plane::Ascii),
            2 => Some(Plane::XSampa),
            4 => Some(Plane::Accents),
            5 => Some(Plane::Pos),
            6 => Some(Plane::PhraseBoundStrengths),
            7 => Some(Plane::Internal),
            _ => None,
        }
    }
}

/// Reserved, plane-independent symbol ids (§3).
pub const EPS: i16 = 0;
pub const ILLEG: i16 = -1;

/// A plane-tagged symbol id. Packs to/from the raw wire `i16` exactly at
/// FST alphabet lookups and item content boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub plane: Plane,
    pub id: i16,
}

impl Symbol {
    pub const fn new(plane: Plane, id: i16) -> Self {
        Self { plane, id }
    }

    /// Packs to the wire representation `(plane << 8) | (id & 0xFF)`.
    ///
    /// Mirrors picotrns.c's plane-shift convention used when building
    /// transducer input (`(plane << 8) + (*inStr)`); negative ids (`EPS`,
    /// `ILLEG`) are not plane-tagged on the wire (picotrns_unplane treats
    /// any negative raw value as plane 0 with the id equal to the raw
    /// value).
    pub fn to_raw(self) -> i16 {
        if self.id < 0 {
            self.id
        } else {
            ((self.plane as i16) << 8) | (self.id & 0xFF)
        }
    }

    /// Unpacks a raw wire `i16` into a plane and an unplaned 8-bit id,
    /// exactly per picotrns.c's `picotrns_unplane`: negative raw values
    /// unplane to plane 0 with the id equal to the raw value (so `ILLEG`
    /// round-trips as `Symbol::new(Plane::Phonemes, ILLEG)`).
    pub fn from_raw(raw: i16) -> Symbol {
        if raw < 0 {
            Symbol::new(Plane::Phonemes, raw)
        } else {
            let plane = Plane::from_u8((raw >> 8) as u8).unwrap_or(Plane::Phonemes);
            Symbol::new(plane, raw & 0xFF)
        }
    }
}

/// Sentinel values for [`PosSym::pos`] (§3). `Real` carries a non-negative
/// byte offset into the originating item stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// A concrete source position.
    Real(u32),
    /// Symbol produced by the transducer without a source position.
    Insert,
    /// Uninitialized / not yet set.
    Invalid,
    /// Sentinel symbol; skip when reassembling output.
    Ignore,
}

impl Position {
    /// Converts to the raw signed wire value used by the C original
    /// (`PICOTRNS_POS_INSERT = -1`, `PICOTRNS_POS_INVALID = -2`,
    /// `PICOTRNS_POS_IGNORE = -3`), needed only where bit-exact wire
    /// compatibility matters (the item codec's raw position fields).
    pub fn to_raw(self) -> i32 {
        match self {
            Position::Real(p) => p as i32,
            Position::Insert => -1,
            Position::Invalid => -2,
            Position::Ignore => -3,
        }
    }

    pub fn from_raw(raw: i32) -> Position {
        match raw {
            -1 => Position::Insert,
            -2 => Position::Invalid,
            -3 => Position::Ignore,
            p if p >= 0 => Position::Real(p as u32),
            _ => Position::Invalid,
        }
    }

    #[inline]
    pub fn is_real(self) -> bool {
        matches!(self, Position::Real(_))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Real(p) => write!(f, "{p}"),
            Position::Insert => write!(f, "INSERT"),
            Position::Invalid => write!(f, "INVALID"),
            Position::Ignore => write!(f, "IGNORE"),
        }
    }
}

/// `(position, symbol)` pair threading transducer edits back to the
/// originating item stream (§3).
///
/// *Invariant*: the non-sentinel positions in any sequence are
/// non-decreasing (spec.md §3, verified in §8 item 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PosSym {
    pub pos: Position,
    /// Raw wire symbol (plane-packed where applicable, per FST alphabet
    /// convention); use [`Symbol::from_raw`]/[`Symbol::to_raw`] to
    /// interpret or build it.
    pub sym: i16,
}

impl PosSym {
    pub const fn new(pos: Position, sym: i16) -> Self {
        Self { pos, sym }
    }

    pub fn symbol(self) -> Symbol {
        Symbol::from_raw(self.sym)
    }
}

/// Checks that the non-sentinel positions of `seq` are non-decreasing
/// (§8 item 4, the position-monotonicity property).
pub fn positions_non_decreasing(seq: &[PosSym]) -> bool {
    let mut last: Option<u32> = None;
    for item in seq {
        if let Position::Real(p) = item.pos {
            if let Some(prev) = last {
                if p < prev {
                    return false;
                }
            }
            last = Some(p);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_packing_roundtrip() {
        for plane in [
            Plane::Phonemes,
            Plane::Ascii,
            Plane::XSampa,
            Plane::Accents,
            Plane::Pos,
            Plane::PhraseBoundStrengths,
            Plane::Internal,
        ] {
            let sym = Symbol::new(plane, 42);
            let raw = sym.to_raw();
            assert_eq!(Symbol::from_raw(raw), sym);
        }
    }

    #[test]
    fn negative_ids_unplane_to_phonemes() {
        let sym = Symbol::from_raw(ILLEG);
        assert_eq!(sym, Symbol::new(Plane::Phonemes, ILLEG));
        assert_eq!(sym.to_raw(), ILLEG);
    }

    #[test]
    fn position_raw_roundtrip() {
        for p in [Position::Insert, Position::Invalid, Position::Ignore, Position::Real(7)] {
            assert_eq!(Position::from_raw(p.to_raw()), p);
        }
    }

    #[test]
    fn monotonicity_ignores_sentinels() {
        let seq = [
            PosSym::new(Position::Real(0), 1),
            PosSym::new(Position::Insert, 2),
            PosSym::new(Position::Real(0), 3),
            PosSym::new(Position::Real(2), 4),
        ];
        assert!(positions_non_decreasing(&seq));
    }

    #[test]
    fn monotonicity_detects_decrease() {
        let seq = [PosSym::new(Position::Real(5), 1), PosSym::new(Position::Real(2), 2)];
        assert!(!positions_non_decreasing(&seq));
    }
}
