use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    Version, VersionConstraint, VersionOverflowError, VersionParseError, VersionRange,
    VersionUnion,
};

/// `*`, `x`, `X.*`, `v*.*`
static ANY_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?[x*](\.[x*])*$").expect("the any-constraint regex is valid")
});

static OR_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").expect("the or-separator regex is valid"));

static TILDE_PEP440_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^~=\s*(?P<version>.+)$").expect("the compatible release regex is valid")
});

/// Checked after [`TILDE_PEP440_CONSTRAINT`], so `~=` never gets here.
static TILDE_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^~\s*(?P<version>.+)$").expect("the tilde regex is valid"));

static CARET_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^\s*(?P<version>.+)$").expect("the caret regex is valid"));

/// `==1.2.*`, `!=1.*`, `1.2.x`
static WILDCARD_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op>!=|==)?\s*(?P<version>v?[0-9][^\s*xX]*?)(?:\.[xX*])+$")
        .expect("the wildcard regex is valid")
});

static BASIC_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op><>|!=|>=?|<=?|===?|==?)?\s*(?P<version>.+)$")
        .expect("the basic constraint regex is valid")
});

/// An error that occurs when a version constraint can't be parsed.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(transparent)]
pub struct ParseConstraintError {
    // Boxed to keep `Result<VersionConstraint, ParseConstraintError>` small
    kind: Box<ParseConstraintErrorKind>,
}

impl ParseConstraintError {
    /// The part of the input that failed to parse.
    pub fn constraint(&self) -> &str {
        match &*self.kind {
            ParseConstraintErrorKind::InvalidConstraint(constraint)
            | ParseConstraintErrorKind::CompatibleRelease(constraint)
            | ParseConstraintErrorKind::InvalidVersion { constraint, .. }
            | ParseConstraintErrorKind::Overflow { constraint, .. } => constraint,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
enum ParseConstraintErrorKind {
    #[error("Could not parse version constraint: {0}")]
    InvalidConstraint(String),
    #[error("Could not parse version constraint: {constraint}")]
    InvalidVersion {
        constraint: String,
        #[source]
        source: VersionParseError,
    },
    #[error("The ~= operator requires at least two segments in the release version: {0}")]
    CompatibleRelease(String),
    #[error("Could not compute the upper bound of version constraint: {constraint}")]
    Overflow {
        constraint: String,
        #[source]
        source: VersionOverflowError,
    },
}

impl From<ParseConstraintErrorKind> for ParseConstraintError {
    fn from(kind: ParseConstraintErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }
}

/// Parse a version constraint such as `^1.2`, `>=1.2,<2.0 || 3.*` or `~=3.8`.
///
/// Or-groups are separated by `||` (or a single `|`), the members of an and-group by commas or
/// whitespace. Wildcards are expanded to dev-release bounds: `==1.2.*` is
/// `>=1.2.dev0,<1.3.dev0`.
pub fn parse_constraint(constraints: &str) -> Result<VersionConstraint, ParseConstraintError> {
    parse_constraint_impl(constraints, false)
}

/// Parse the value of a `python_version` or `python_full_version` marker.
///
/// This differs from [`parse_constraint`] only in wildcards, which have release bounds:
/// `==3.6.*` is `>=3.6,<3.7`.
pub fn parse_marker_version_constraint(
    constraints: &str,
) -> Result<VersionConstraint, ParseConstraintError> {
    parse_constraint_impl(constraints, true)
}

fn parse_constraint_impl(
    constraints: &str,
    is_marker_constraint: bool,
) -> Result<VersionConstraint, ParseConstraintError> {
    let constraints = constraints.trim();
    match constraints {
        "*" => return Ok(VersionConstraint::any()),
        "<empty>" => return Ok(VersionConstraint::Empty),
        _ => {}
    }

    let mut or_groups = Vec::new();
    for group in OR_SEPARATOR.split(constraints) {
        // Allow trailing commas, they occur in the wild
        let group = group.trim_end_matches(',').trim_end();
        let mut constraint = VersionConstraint::any();
        for single in split_and_group(group) {
            constraint =
                constraint.intersect(&parse_single_constraint(single, is_marker_constraint)?);
        }
        or_groups.push(constraint);
    }
    Ok(VersionUnion::of(or_groups))
}

/// Split `>= 1.2, <2.0 !=1.5` into `>= 1.2`, `<2.0` and `!=1.5`.
///
/// Commas and whitespace separate constraints, except for whitespace after an operator.
fn split_and_group(group: &str) -> SmallVec<[&str; 4]> {
    let mut spans: SmallVec<[(usize, usize); 4]> = SmallVec::new();
    let mut start = None;
    for (index, char) in group.char_indices() {
        if char == ',' || char.is_whitespace() {
            if let Some(start) = start.take() {
                spans.push((start, index));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(start) = start {
        spans.push((start, group.len()));
    }

    let mut parts = SmallVec::new();
    let mut spans = spans.into_iter().peekable();
    while let Some((start, mut end)) = spans.next() {
        let is_operator = group[start..end]
            .chars()
            .all(|char| matches!(char, '<' | '>' | '=' | '!' | '~' | '^'));
        if is_operator {
            if let Some((_, next_end)) = spans.next() {
                end = next_end;
            }
        }
        parts.push(&group[start..end]);
    }
    if parts.is_empty() {
        // An empty group is an error of `parse_single_constraint`
        parts.push(group);
    }
    parts
}

fn parse_version(version: &str, constraint: &str) -> Result<Version, ParseConstraintError> {
    Version::from_str(version).map_err(|source| {
        ParseConstraintErrorKind::InvalidVersion {
            constraint: constraint.to_string(),
            source,
        }
        .into()
    })
}

/// The upper bound derived from the version of `constraint`.
fn upper_bound(
    next: Result<Version, VersionOverflowError>,
    constraint: &str,
) -> Result<Version, ParseConstraintError> {
    next.map_err(|source| {
        ParseConstraintErrorKind::Overflow {
            constraint: constraint.to_string(),
            source,
        }
        .into()
    })
}

fn parse_single_constraint(
    constraint: &str,
    is_marker_constraint: bool,
) -> Result<VersionConstraint, ParseConstraintError> {
    if ANY_CONSTRAINT.is_match(constraint) {
        return Ok(VersionConstraint::any());
    }

    // PEP 440 compatible release, `~=1.2` is `>=1.2,<2.0`
    if let Some(captures) = TILDE_PEP440_CONSTRAINT.captures(constraint) {
        let version = parse_version(&captures["version"], constraint)?;
        let Some(index) = version.precision().checked_sub(2) else {
            return Err(ParseConstraintErrorKind::CompatibleRelease(constraint.to_string()).into());
        };
        // Bump the second to last release component
        let high = upper_bound(version.stable().bump(index), constraint)?;
        return Ok(VersionRange::new(Some(version), Some(high), true, false).into());
    }

    // Tilde range, `~1.2.3` is `>=1.2.3,<1.3.0`
    if let Some(captures) = TILDE_CONSTRAINT.captures(constraint) {
        let version = parse_version(&captures["version"], constraint)?;
        let high = if version.precision() == 1 {
            version.stable().next_major()
        } else {
            version.stable().next_minor()
        };
        let high = upper_bound(high, constraint)?;
        return Ok(VersionRange::new(Some(version), Some(high), true, false).into());
    }

    // Caret range, `^1.2.3` is `>=1.2.3,<2.0.0`
    if let Some(captures) = CARET_CONSTRAINT.captures(constraint) {
        let version = parse_version(&captures["version"], constraint)?;
        let high = upper_bound(version.next_breaking(), constraint)?;
        return Ok(VersionRange::new(Some(version), Some(high), true, false).into());
    }

    if let Some(captures) = WILDCARD_CONSTRAINT.captures(constraint) {
        let version = parse_version(&captures["version"], constraint)?;
        let next = if version.is_devrelease() {
            version.next_devrelease()
        } else if version.is_postrelease() {
            version.next_postrelease()
        } else if version.is_prerelease() {
            version.next_prerelease()
        } else {
            version.next_stable()
        };
        let next = upper_bound(next, constraint)?;
        let range = if is_marker_constraint {
            VersionRange::new(Some(version), Some(next), true, false)
        } else {
            let first_devrelease = |version: Version| {
                if version.is_devrelease() {
                    version
                } else {
                    version.first_devrelease()
                }
            };
            VersionRange::new(
                Some(first_devrelease(version)),
                Some(first_devrelease(next)),
                true,
                false,
            )
        };
        debug!("Expanded wildcard `{constraint}` to `{range}`");
        let range = VersionConstraint::from(range);
        return if captures.name("op").is_some_and(|op| op.as_str() == "!=") {
            Ok(VersionConstraint::any().difference(&range))
        } else {
            Ok(range)
        };
    }

    if let Some(captures) = BASIC_CONSTRAINT.captures(constraint) {
        let version = match &captures["version"] {
            "dev" => "0.0-dev",
            version => version,
        };
        let version = parse_version(version, constraint)?;
        let operator = captures.name("op").map(|op| op.as_str());
        return Ok(match operator {
            Some("<") => VersionRange::at_most(version, false).into(),
            Some("<=") => VersionRange::at_most(version, true).into(),
            Some(">") => VersionRange::at_least(version, false).into(),
            Some(">=") => VersionRange::at_least(version, true).into(),
            Some("!=" | "<>") => VersionUnion::of([
                VersionRange::at_most(version.clone(), false).into(),
                VersionRange::at_least(version, false).into(),
            ]),
            _ => VersionConstraint::Version(version),
        });
    }

    Err(ParseConstraintErrorKind::InvalidConstraint(constraint.to_string()).into())
}
