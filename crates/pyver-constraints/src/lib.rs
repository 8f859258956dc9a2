//! A set algebra over string-valued constraints, as used by environment markers like
//! `sys_platform` or `platform_machine`.
//!
//! A [`GenericConstraint`] is built from terms comparing a value with `==`, `!=`, `in` (substring)
//! or `not in`, combined into and-groups ([`MultiConstraint`]) and or-groups
//! ([`UnionConstraint`]):
//!
//! ```rust
//! use pyver_constraints::parse_generic_constraint;
//!
//! let not_windows = parse_generic_constraint("!=win32,!=cygwin").unwrap();
//! let linux = parse_generic_constraint("linux").unwrap();
//! assert!(not_windows.allows_all(&linux));
//! assert_eq!(not_windows.invert().to_string(), "win32 || cygwin");
//! ```
//!
//! Extras get their own term type, [`ExtraConstraint`], since several extras can be requested at
//! the same time.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

pub use generic::GenericConstraint;
pub use multi::{ExtraMultiConstraint, MultiConstraint};
pub use parser::{ParseGenericConstraintError, parse_generic_constraint};
pub use term::{Combined, Constraint, ExtraConstraint, Operator, Term};
pub use union::UnionConstraint;

mod generic;
mod multi;
mod parser;
mod term;
mod union;

/// Hash `items` independent of their order, matching the set-like equality of and-groups and
/// or-groups.
fn hash_unordered<T: Hash, H: Hasher>(items: &[T], state: &mut H) {
    let combined = items.iter().fold(0u64, |combined, item| {
        let mut hasher = FxHasher::default();
        item.hash(&mut hasher);
        combined ^ hasher.finish()
    });
    state.write_usize(items.len());
    state.write_u64(combined);
}
