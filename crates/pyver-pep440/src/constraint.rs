use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::{Version, VersionRange, VersionUnion};

/// A set of versions: nothing, a single version, a contiguous range or a union of ranges.
///
/// Every operation returns a value in normal form: a range that allows a single version is a
/// [`VersionConstraint::Version`], a union is only used for two or more disjoint ranges and an
/// empty union is [`VersionConstraint::Empty`]. Equality and hashing compare the allowed
/// intervals, so `==1.0` equals `>=1.0,<=1.0`.
#[derive(Debug, Clone)]
pub enum VersionConstraint {
    /// No version at all.
    Empty,
    /// Exactly one version, `==1.2.3`.
    Version(Version),
    /// A contiguous range, `>=1.2,<2`. Unbounded on both sides means any version.
    Range(VersionRange),
    /// Two or more disjoint ranges, `<1 || >=2`.
    Union(VersionUnion),
}

impl VersionConstraint {
    /// `*`
    pub fn any() -> Self {
        Self::Range(VersionRange::any())
    }

    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Range(range) if range.is_any())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The ranges making up this constraint, lowest first.
    pub fn ranges(&self) -> Vec<VersionRange> {
        match self {
            Self::Empty => Vec::new(),
            Self::Version(version) => vec![VersionRange::from(version.clone())],
            Self::Range(range) => vec![range.clone()],
            Self::Union(union) => union.ranges().to_vec(),
        }
    }

    pub(crate) fn into_ranges(self) -> Vec<VersionRange> {
        match self {
            Self::Union(union) => union.ranges().to_vec(),
            Self::Empty => Vec::new(),
            Self::Version(version) => vec![VersionRange::from(version)],
            Self::Range(range) => vec![range],
        }
    }

    pub fn allows(&self, version: &Version) -> bool {
        match self {
            Self::Empty => false,
            Self::Version(this) => VersionRange::from(this.clone()).allows(version),
            Self::Range(range) => range.allows(version),
            Self::Union(union) => union.allows(version),
        }
    }

    /// Whether every version allowed by `other` is allowed by this constraint.
    pub fn allows_all(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Empty) => true,
            (Self::Empty, _) => false,
            (_, Self::Version(version)) => self.allows(version),
            _ => {
                let ours = self.ranges();
                let theirs = other.ranges();
                let mut ours = ours.iter().peekable();
                let mut theirs = theirs.iter().peekable();
                while let (Some(our), Some(their)) = (ours.peek(), theirs.peek()) {
                    if our.allows_all(their) {
                        theirs.next();
                    } else {
                        ours.next();
                    }
                }
                theirs.peek().is_none()
            }
        }
    }

    /// Whether at least one version is allowed by both constraints.
    pub fn allows_any(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => false,
            (_, Self::Version(version)) => self.allows(version),
            (Self::Version(version), _) => other.allows(version),
            _ => {
                let ours = self.ranges();
                let theirs = other.ranges();
                let mut ours = ours.iter().peekable();
                let mut theirs = theirs.iter().peekable();
                while let (Some(our), Some(their)) = (ours.peek(), theirs.peek()) {
                    if our.allows_any(their) {
                        return true;
                    }
                    if their.allows_higher(our) {
                        ours.next();
                    } else {
                        theirs.next();
                    }
                }
                false
            }
        }
    }

    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => Self::Empty,
            (Self::Version(this), Self::Version(that)) => {
                if this.allows_version(that) {
                    Self::Version(that.clone())
                } else if that.allows_version(this) {
                    Self::Version(this.clone())
                } else {
                    Self::Empty
                }
            }
            (_, Self::Version(version)) => {
                if self.allows(version) {
                    other.clone()
                } else {
                    Self::Empty
                }
            }
            (Self::Version(version), _) => {
                if other.allows(version) {
                    self.clone()
                } else {
                    Self::Empty
                }
            }
            _ => {
                let ours = self.ranges();
                let theirs = other.ranges();
                let mut ours = ours.iter().peekable();
                let mut theirs = theirs.iter().peekable();
                let mut ranges = Vec::new();
                while let (Some(our), Some(their)) = (ours.peek(), theirs.peek()) {
                    ranges.extend(our.intersect(their));
                    if their.allows_higher(our) {
                        ours.next();
                    } else {
                        theirs.next();
                    }
                }
                VersionUnion::from_ranges(ranges)
            }
        }
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        VersionUnion::of([self.clone(), other.clone()])
    }

    /// The versions allowed by this constraint but not by `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Empty, _) => Self::Empty,
            (_, Self::Empty) => self.clone(),
            (Self::Version(version), _) => {
                if other.allows(version) {
                    Self::Empty
                } else {
                    self.clone()
                }
            }
            (_, Self::Version(version)) if !self.allows(version) => self.clone(),
            _ => {
                let theirs = other.ranges();
                VersionUnion::from_ranges(
                    self.ranges()
                        .iter()
                        .flat_map(|range| range.difference_all(&theirs))
                        .collect(),
                )
            }
        }
    }

    /// Every version not allowed by this constraint.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self::any().difference(self)
    }
}

impl Version {
    /// Whether the constraint `==self` allows `version`.
    fn allows_version(&self, version: &Self) -> bool {
        if !self.is_local() && version.is_local() {
            *self == version.without_local()
        } else {
            self == version
        }
    }
}

impl From<VersionRange> for VersionConstraint {
    fn from(range: VersionRange) -> Self {
        match range.as_version() {
            Some(version) => Self::Version(version.clone()),
            None => Self::Range(range),
        }
    }
}

impl From<Version> for VersionConstraint {
    fn from(version: Version) -> Self {
        Self::Version(version)
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.ranges() == other.ranges()
    }
}

impl Eq for VersionConstraint {}

impl Hash for VersionConstraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ranges().hash(state);
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Version(version) => write!(f, "{version}"),
            Self::Range(range) => write!(f, "{range}"),
            Self::Union(union) => write!(f, "{union}"),
        }
    }
}

impl std::str::FromStr for VersionConstraint {
    type Err = crate::ParseConstraintError;

    fn from_str(constraint: &str) -> Result<Self, Self::Err> {
        crate::parse_constraint(constraint)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for VersionConstraint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        crate::parse_constraint(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for VersionConstraint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
