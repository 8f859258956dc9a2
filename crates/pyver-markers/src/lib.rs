//! Environment markers such as `python_version >= "3.8" and sys_platform != "win32"`, as a
//! boolean algebra.
//!
//! A [`Marker`] is parsed with [`parse_marker`]. Each term is bound to a set algebra by the name
//! it compares: `python_version` and `python_full_version` to version ranges from
//! [`pyver_pep440`], every other name to string constraints from [`pyver_constraints`]. Markers
//! can be evaluated against a [`MarkerEnvironment`] and combined, with the result kept in a
//! simplified normal form:
//!
//! ```rust
//! use pyver_markers::parse_marker;
//!
//! let darwin = parse_marker(r#"sys_platform == "darwin""#).unwrap();
//! let cpython = parse_marker(r#"implementation_name == "cpython""#).unwrap();
//! assert_eq!(
//!     darwin.intersect(&cpython).to_string(),
//!     r#"sys_platform == "darwin" and implementation_name == "cpython""#
//! );
//!
//! let old = parse_marker(r#"python_version < "4.0""#).unwrap();
//! assert_eq!(old.invert().to_string(), r#"python_version >= "4.0""#);
//! ```

use std::fmt::{Display, Formatter};

use thiserror::Error;
use unicode_width::UnicodeWidthChar;

pub use environment::MarkerEnvironment;
pub use parser::parse_marker;
pub use single::{MarkerConstraint, MarkerOperator, SingleMarker};
pub use tree::{Marker, MarkerUnion, MultiMarker};

mod cursor;
mod environment;
mod parser;
mod single;
mod tree;

/// A marker that couldn't be parsed, with the span of the offending input.
#[derive(Debug)]
pub struct MarkerError {
    /// What went wrong.
    pub message: MarkerErrorSource,
    /// Span start index
    pub start: usize,
    /// Span length
    pub len: usize,
    /// The input string so we can print it underlined
    pub input: String,
}

/// The cause of a [`MarkerError`]: our parser, or the version or extra in a marker term.
#[derive(Debug, Error)]
pub enum MarkerErrorSource {
    #[error("{0}")]
    String(String),
    #[error(transparent)]
    Version(#[from] pyver_pep440::ParseConstraintError),
    #[error(transparent)]
    Extra(#[from] pyver_normalize::InvalidNameError),
}

impl Display for MarkerError {
    /// Pretty formatting with underline.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let start = self.start.min(self.input.len());
        let end = (start + self.len).min(self.input.len());
        let start_offset = self.input[..start]
            .chars()
            .filter_map(UnicodeWidthChar::width)
            .sum::<usize>();
        // Errors at the end of the input point one past it
        let underline_len = self.input[start..end]
            .chars()
            .filter_map(UnicodeWidthChar::width)
            .sum::<usize>()
            .max(1);
        write!(
            f,
            "{}\n{}\n{}{}",
            self.message,
            self.input,
            " ".repeat(start_offset),
            "^".repeat(underline_len)
        )
    }
}

impl std::error::Error for MarkerError {}
