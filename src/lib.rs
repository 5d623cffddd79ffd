//! # picocore
//!
//! A phonetic finite-state transduction core for text-to-speech front ends:
//! a compact FST runtime, a backtracking transduction engine, and two
//! cooperative-scheduling stages (sentence analysis and sentence phonemes)
//! that turn a stream of word/boundary/command items into a stream of
//! syllable-phoneme items.
//!
//! ## Module organization
//!
//! - [`bytestream`] - fixed-width and varint decode primitives
//! - [`symbol`] - planes, plane-packed symbols, position-tagged symbols
//! - [`fst`] - the FST binary image and its access methods
//! - [`engine`] - backtracking transduction search, epsilon elimination, trivial syllabification
//! - [`phone`] - the phone-property predicate interface
//! - [`item`] - the inter-stage item stream and its wire codec
//! - [`wire`] - named item `info1`/`info2` constants
//! - [`sa`] - the sentence-analysis stage
//! - [`spho`] - the sentence-phoneme stage
//! - [`stage`] - the `step`/`Status`/`ResetMode` contract shared by both stages
//! - [`config`] - fixed buffer-capacity configuration
//! - [`error`] - error kinds and the warning-sink trait
//!
//! ## Quick start
//!
//! ```
//! use picocore::fst::FstImage;
//! use picocore::error::NullSink;
//!
//! # let image: &[u8] = &[];
//! # if !image.is_empty() {
//! let fst = FstImage::load(image).expect("valid FST image");
//! let (states, classes) = fst.sizes();
//! # let _ = (states, classes, NullSink);
//! # }
//! ```
//!
//! ## Features
//!
//! - `std` (default) - enables `VecSink`, `std::error::Error` for
//!   [`error::CoreError`], and anything needing real I/O.
//! - `cli` - the `picocore` binary (FST inspection, pipeline smoke-runner).

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(not(any(test, feature = "std")))]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std as alloc;

pub mod bytestream;
pub mod config;
pub mod engine;
pub mod error;
pub mod fst;
pub mod item;
pub mod phone;
pub mod sa;
pub mod spho;
pub mod stage;
pub mod symbol;
pub mod wire;

pub use config::CoreConfig;
pub use error::CoreError;
pub use fst::FstImage;
pub use item::{Item, ItemKind};
pub use sa::SaStage;
pub use spho::SphoStage;
pub use stage::{ResetMode, Status};
pub use symbol::{Plane, Position, PosSym, Symbol};
