//! The inter-stage item stream: header, content, and wire codec (§3, §6).

use alloc::vec::Vec;

use crate::error::CoreError;

/// Item type tag (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ItemKind {
    WordGraph = 0,
    WordIndex = 1,
    WordPhon = 2,
    SyllPhon = 3,
    Bound = 4,
    Punc = 5,
    Cmd = 6,
}

impl ItemKind {
    pub fn from_u8(value: u8) -> Result<ItemKind, CoreError> {
        match value {
            0 => Ok(ItemKind::WordGraph),
            1 => Ok(ItemKind::WordIndex),
            2 => Ok(ItemKind::WordPhon),
            3 => Ok(ItemKind::SyllPhon),
            4 => Ok(ItemKind::Bound),
            5 => Ok(ItemKind::Punc),
            6 => Ok(ItemKind::Cmd),
            _ => Err(CoreError::Decode),
        }
    }

    pub fn is_word_like(self) -> bool {
        matches!(self, ItemKind::WordGraph | ItemKind::WordIndex | ItemKind::WordPhon)
    }
}

/// Boundary strength values carried in a `Bound` item's `info1` (§4.7,
/// §GLOSSARY). Named `Phr0`..`Phr3` per the glossary's word/sentence/major
/// phrase/minor phrase ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BoundStrength {
    /// Word boundary.
    Phr0 = 0,
    /// Sentence end.
    Phr1 = 1,
    /// Major phrase.
    Phr2 = 2,
    /// Minor phrase.
    Phr3 = 3,
}

impl BoundStrength {
    pub fn from_u8(value: u8) -> Result<BoundStrength, CoreError> {
        match value {
            0 => Ok(BoundStrength::Phr0),
            1 => Ok(BoundStrength::Phr1),
            2 => Ok(BoundStrength::Phr2),
            3 => Ok(BoundStrength::Phr3),
            _ => Err(CoreError::Decode),
        }
    }
}

/// Phrase type annotation carried in a `Bound` item's `info2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhraseType {
    /// No phrase-type annotation.
    None,
    /// Assigned by the upstream prosody classifier, value opaque to the
    /// core.
    Classified(u8),
    /// Invented by `SphoStage` when a word boundary is promoted to a
    /// phrase boundary and the previous phrase boundary needs a
    /// retroactive type (§4.7 "phrase-type bookkeeping").
    Invented,
}

/// A stream item: header plus content bytes (§3, §6).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub info1: u8,
    pub info2: u8,
    pub content: Vec<u8>,
}

impl Item {
    pub fn new(kind: ItemKind, info1: u8, info2: u8, content: Vec<u8>) -> Result<Item, CoreError> {
        if content.len() > u8::MAX as usize {
            return Err(CoreError::Capacity);
        }
        Ok(Item { kind, info1, info2, content })
    }

    pub fn len(&self) -> u8 {
        self.content.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Decodes a `Bound` item's two-u16 big-endian silence-duration
    /// content, if present (§6).
    pub fn bound_duration(&self) -> Option<(u16, u16)> {
        if self.kind != ItemKind::Bound || self.content.len() != 4 {
            return None;
        }
        let lo = u16::from_be_bytes([self.content[0], self.content[1]]);
        let hi = u16::from_be_bytes([self.content[2], self.content[3]]);
        Some((lo, hi))
    }

    pub fn with_bound_duration(kind_info: (ItemKind, u8, u8), sildur: u16) -> Item {
        let mut content = Vec::with_capacity(4);
        content.extend_from_slice(&sildur.to_be_bytes());
        content.extend_from_slice(&sildur.to_be_bytes());
        Item { kind: kind_info.0, info1: kind_info.1, info2: kind_info.2, content }
    }
}

/// Encodes one item to the wire format: 4-byte header followed by
/// `len` content bytes (§6).
pub fn encode_item(item: &Item, out: &mut Vec<u8>) -> Result<(), CoreError> {
    if item.content.len() > u8::MAX as usize {
        return Err(CoreError::Capacity);
    }
    out.push(item.kind as u8);
    out.push(item.info1);
    out.push(item.info2);
    out.push(item.content.len() as u8);
    out.extend_from_slice(&item.content);
    Ok(())
}

/// Decodes one item from `bytes` starting at `pos`, returning the item and
/// the position just past it.
pub fn decode_item(bytes: &[u8], pos: usize) -> Result<(Item, usize), CoreError> {
    if bytes.len() < pos + 4 {
        return Err(CoreError::Decode);
    }
    let kind = ItemKind::from_u8(bytes[pos])?;
    let info1 = bytes[pos + 1];
    let info2 = bytes[pos + 2];
    let len = bytes[pos + 3] as usize;
    let content_start = pos + 4;
    let content_end = content_start.checked_add(len).ok_or(CoreError::Decode)?;
    if bytes.len() < content_end {
        return Err(CoreError::Decode);
    }
    let content = bytes[content_start..content_end].to_vec();
    Ok((Item { kind, info1, info2, content }, content_end))
}

/// Decodes every item in `bytes` in order. Used by the CLI and by test
/// fixtures that build a literal item script.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Item>, CoreError> {
    let mut items = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (item, next) = decode_item(bytes, pos)?;
        items.push(item);
        pos = next;
    }
    Ok(items)
}
