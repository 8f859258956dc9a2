//! [PEP 440](https://peps.python.org/pep-0440) versions and a set algebra over them.
//!
//! A [`VersionConstraint`] is a set of versions, represented in normal form as nothing, a single
//! [`Version`], a contiguous [`VersionRange`] or a [`VersionUnion`] of disjoint ranges:
//!
//! ```rust
//! use pyver_pep440::{Version, parse_constraint};
//!
//! let constraint = parse_constraint(">=1.0,<2.0 || 3.*").unwrap();
//! assert!(constraint.allows(&"3.4".parse::<Version>().unwrap()));
//! assert_eq!(constraint.invert().to_string(), "<1.0 || >=2.0,<3.dev0 || >=4.dev0");
//! ```
//!
//! Some rules of PEP 440 surface in the algebra:
//!
//! * `<V` doesn't allow pre-releases of `V` unless `V` is a pre-release itself, so a stable `<2.0`
//!   ends at `2.0.dev0`.
//! * `>V` doesn't allow post-releases of `V` unless `V` is a post-release itself.
//! * A bound without a local segment ignores the local segment of a candidate: `<=1.0` allows
//!   `1.0+local`.
//! * Wildcards expand to dev-release bounds, `==1.2.*` is `>=1.2.dev0,<1.3.dev0`.
//! * `1.2`, `1.2.0` and `1.2.0.0` are the same version.

pub use constraint::VersionConstraint;
pub use parser::{ParseConstraintError, parse_constraint, parse_marker_version_constraint};
pub use range::VersionRange;
pub use regions::constraint_regions;
pub use union::VersionUnion;
pub use version::{
    LocalSegment, ReleasePhase, ReleaseTag, Version, VersionOverflowError, VersionParseError,
};

mod constraint;
mod parser;
mod range;
mod regions;
mod union;
mod version;
