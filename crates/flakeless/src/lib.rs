//! # flakeless
//!
//! Compact, approximately time-sortable 63-bit identifiers in the Snowflake
//! family. Each ID packs three fields, most significant first:
//!
//! ```text
//! | 41 bits: ms since epoch_start | 10 bits: worker id | 12 bits: sequence |
//! ```
//!
//! IDs are rendered in one of three [`OutputFormat`]s: plain decimal, 16-char
//! hexadecimal, or an 11-char base-64 whose alphabet is ordered so that
//! equal-width strings compared by symbol rank ([`compare_encoded`]) sort
//! exactly like the integers they encode. Byte-wise `str` order does not hold
//! for base-64, since `'A'` and `'-'` sit below `'z'` and `'Z'` in ASCII.
//!
//! ```
//! use flakeless::{Flakeless, GeneratorConfig, OutputFormat, Poll, TimeSource};
//!
//! struct FixedTime;
//! impl TimeSource for FixedTime {
//!     fn current_millis(&self) -> u64 {
//!         1_000
//!     }
//! }
//!
//! let config = GeneratorConfig::new()
//!     .with_worker_id(1)
//!     .with_output_format(OutputFormat::Hex);
//! let mut generator = Flakeless::with_time(config, FixedTime).unwrap();
//!
//! match generator.next() {
//!     Poll::Ready { id } => assert_eq!(id.len(), 16),
//!     Poll::Exhausted => unreachable!("fresh generator"),
//! }
//! ```
//!
//! A generator is driven through `&mut self`: one instance serves one logical
//! caller at a time. Scale out by running more instances with distinct worker
//! ids.

mod encoding;
mod error;
mod generator;
mod id;
mod status;
mod time;

pub use crate::encoding::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::status::*;
pub use crate::time::*;
