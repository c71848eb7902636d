//! Locate and parse JSON embedded in console reply text.
//!
//! Console replies mix prose with at most one JSON object or array. The
//! default [`ExtractMode::Heuristic`] picks the span from the first opening
//! delimiter to the last matching closing delimiter in the whole text; it
//! is not a parser and can over-capture when the surrounding prose contains
//! stray braces or brackets. [`ExtractMode::Balanced`] tracks nesting depth
//! and string literals instead.

pub mod config;
pub mod error;
pub mod extract;
pub mod parse;

pub use config::ExtractMode;
pub use error::{JsonError, Result};
pub use extract::{extract, extract_with, locate, JsonKind, JsonRegion};
pub use parse::{parse, parse_reply};
