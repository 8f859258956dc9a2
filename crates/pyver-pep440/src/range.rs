use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::Version;

/// A contiguous interval of versions.
///
/// A missing bound is unbounded on that side. `include_min`/`include_max` are normalized to
/// `false` for a missing bound so that derived equality is interval equality.
///
/// A range with `min == max` and both ends inclusive stands for a single version. The
/// constraint algebra turns such a range back into [`crate::VersionConstraint::Version`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: Option<Version>,
    max: Option<Version>,
    include_min: bool,
    include_max: bool,
}

impl VersionRange {
    pub fn new(
        min: Option<Version>,
        max: Option<Version>,
        include_min: bool,
        include_max: bool,
    ) -> Self {
        let include_min = include_min && min.is_some();
        let include_max = include_max && max.is_some();
        Self {
            min,
            max,
            include_min,
            include_max,
        }
    }

    /// The range without bounds, `*`.
    pub fn any() -> Self {
        Self::new(None, None, false, false)
    }

    /// `>=min` or `>min`.
    pub fn at_least(min: Version, include_min: bool) -> Self {
        Self::new(Some(min), None, include_min, false)
    }

    /// `<=max` or `<max`.
    pub fn at_most(max: Version, include_max: bool) -> Self {
        Self::new(None, Some(max), false, include_max)
    }

    pub fn min(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    pub fn include_min(&self) -> bool {
        self.include_min
    }

    pub fn include_max(&self) -> bool {
        self.include_max
    }

    pub fn is_any(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The single version this range allows, if both bounds are the same inclusive version.
    pub fn as_version(&self) -> Option<&Version> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if self.include_min && self.include_max && min == max => {
                Some(min)
            }
            _ => None,
        }
    }

    /// The effective upper bound, taking the pre-release rule of exclusive bounds into account.
    ///
    /// "The exclusive ordered comparison <V MUST NOT allow a pre-release of the specified
    /// version unless the specified version is itself a pre-release." A stable `<V` therefore
    /// behaves like `<V.dev0`.
    pub fn allowed_max(&self) -> Option<Version> {
        let max = self.max.as_ref()?;
        if self.include_max || max.is_unstable() {
            return Some(max.clone());
        }
        if self.min.as_ref() == Some(max) && (self.include_min || self.include_max) {
            return Some(max.clone());
        }
        Some(max.first_devrelease())
    }

    /// Whether `version` lies within this range.
    pub fn allows(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            // ">V MUST NOT allow a post-release of the given version unless V itself is a post
            // release" and a lower bound without local segment ignores the candidate's one
            let mut version = version.clone();
            if !min.is_postrelease() && version.is_postrelease() {
                version = version.without_postrelease();
            }
            if !min.is_local() && version.is_local() {
                version = version.without_local();
            }
            if version < *min {
                return false;
            }
            if !self.include_min && version == *min {
                return false;
            }
        }
        if let (Some(max), Some(allowed_max)) = (&self.max, self.allowed_max()) {
            let version = if !allowed_max.is_local() && version.is_local() {
                version.without_local()
            } else {
                version.clone()
            };
            if version > allowed_max {
                return false;
            }
            if !self.include_max && (version == *max || version == allowed_max) {
                return false;
            }
        }
        true
    }

    /// Whether this range extends below `other`.
    pub fn allows_lower(&self, other: &Self) -> bool {
        match (&self.min, &other.min) {
            (None, other_min) => other_min.is_some(),
            (Some(_), None) => false,
            (Some(this), Some(that)) => match this.cmp(that) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => self.include_min && !other.include_min,
            },
        }
    }

    /// Whether this range extends above `other`.
    pub fn allows_higher(&self, other: &Self) -> bool {
        match (self.allowed_max(), other.allowed_max()) {
            (None, other_max) => other_max.is_some(),
            (Some(_), None) => false,
            (Some(this), Some(that)) => match this.cmp(&that) {
                Ordering::Less => false,
                Ordering::Greater => true,
                Ordering::Equal => self.include_max && !other.include_max,
            },
        }
    }

    /// Whether every version of this range is below every version of `other`.
    pub fn is_strictly_lower(&self, other: &Self) -> bool {
        let (Some(this), Some(that)) = (self.allowed_max(), other.min.as_ref()) else {
            return false;
        };
        match this.cmp(that) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => !(self.include_max && other.include_min),
        }
    }

    pub fn is_strictly_higher(&self, other: &Self) -> bool {
        other.is_strictly_lower(self)
    }

    /// Whether this range ends exactly where `other` starts, with the shared version included
    /// by exactly one of the two.
    pub fn is_adjacent_to(&self, other: &Self) -> bool {
        match (&self.max, &other.min) {
            (Some(max), Some(min)) if max == min => self.include_max != other.include_min,
            _ => false,
        }
    }

    pub fn allows_all(&self, other: &Self) -> bool {
        !other.allows_lower(self) && !other.allows_higher(self)
    }

    pub fn allows_any(&self, other: &Self) -> bool {
        !other.is_strictly_lower(self) && !other.is_strictly_higher(self)
    }

    /// The overlap of two ranges, or `None` if they are disjoint.
    pub(crate) fn intersect(&self, other: &Self) -> Option<Self> {
        let (min, include_min) = if self.allows_lower(other) {
            if self.is_strictly_lower(other) {
                return None;
            }
            (other.min.clone(), other.include_min)
        } else {
            if other.is_strictly_lower(self) {
                return None;
            }
            (self.min.clone(), self.include_min)
        };
        let (max, include_max) = if self.allows_higher(other) {
            (other.max.clone(), other.include_max)
        } else {
            (self.max.clone(), self.include_max)
        };
        if min.is_some() && min == max && !(include_min && include_max) {
            return None;
        }
        Some(Self::new(min, max, include_min, include_max))
    }

    /// The hull of two ranges that overlap or touch, or `None` if there is a gap between them.
    pub(crate) fn union(&self, other: &Self) -> Option<Self> {
        let touches = |max: Option<&Version>, min: Option<&Version>, inclusive: bool| {
            inclusive && max.is_some() && max == min
        };
        let edges_touch = touches(
            self.max.as_ref(),
            other.min.as_ref(),
            self.include_max || other.include_min,
        ) || touches(
            other.max.as_ref(),
            self.min.as_ref(),
            self.include_min || other.include_max,
        );
        if !edges_touch && !self.allows_any(other) {
            return None;
        }
        let (min, include_min) = if self.allows_lower(other) {
            (self.min.clone(), self.include_min)
        } else {
            (other.min.clone(), other.include_min)
        };
        let (max, include_max) = if self.allows_higher(other) {
            (self.max.clone(), self.include_max)
        } else {
            (other.max.clone(), other.include_max)
        };
        Some(Self::new(min, max, include_min, include_max))
    }

    /// The parts of this range not covered by `other`, lowest first. At most two ranges.
    pub(crate) fn difference(&self, other: &Self) -> Vec<Self> {
        if !self.allows_any(other) {
            return vec![self.clone()];
        }

        let before = if !self.allows_lower(other) {
            None
        } else if self.min == other.min {
            // Only the inclusive lower bound itself remains
            self.min.clone().map(Self::from)
        } else {
            Some(Self::new(
                self.min.clone(),
                other.min.clone(),
                self.include_min,
                !other.include_min,
            ))
        };

        let after = if !self.allows_higher(other) {
            None
        } else if self.max == other.max {
            self.max.clone().map(Self::from)
        } else {
            Some(Self::new(
                other.max.clone(),
                self.max.clone(),
                !other.include_max,
                self.include_max,
            ))
        };

        before.into_iter().chain(after).collect()
    }

    /// Remove all of `others` from this range. `others` must be sorted and disjoint.
    pub(crate) fn difference_all(&self, others: &[Self]) -> Vec<Self> {
        let mut ranges = Vec::new();
        let mut current = self.clone();
        for range in others {
            // Ranges below the current one have nothing left to remove
            if range.is_strictly_lower(&current) {
                continue;
            }
            // No more ranges can overlap
            if range.is_strictly_higher(&current) {
                break;
            }
            let mut difference = current.difference(range);
            match difference.len() {
                0 => return ranges,
                1 => current = difference.remove(0),
                _ => {
                    current = difference.remove(difference.len() - 1);
                    ranges.append(&mut difference);
                }
            }
        }
        ranges.push(current);
        ranges
    }

    /// Order by lower bound, then by upper bound, unbounded ends outermost.
    pub(crate) fn compare(&self, other: &Self) -> Ordering {
        let min = match (&self.min, &other.min) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(this), Some(that)) => this
                .cmp(that)
                // An inclusive lower bound starts earlier
                .then_with(|| other.include_min.cmp(&self.include_min)),
        };
        min.then_with(|| match (&self.max, &other.max) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(this), Some(that)) => this
                .cmp(that)
                .then_with(|| self.include_max.cmp(&other.include_max)),
        })
    }

    /// The `X.Y` of a range spelled `==X.Y.*`, i.e. `>=X.Y.dev0,<X.(Y+1).dev0`.
    pub fn single_wildcard_prefix(&self) -> Option<Version> {
        let (min, max) = (self.min.as_ref()?, self.max.as_ref()?);
        if min.dev() != Some(0) || !matches!(max.dev(), None | Some(0)) {
            return None;
        }
        self.wildcard_prefix()
    }

    /// Like [`VersionRange::single_wildcard_prefix`], for the `>=X.Y,<X.(Y+1)` shape that
    /// wildcards take in `python_version` markers.
    pub fn single_marker_wildcard_prefix(&self) -> Option<Version> {
        let (min, max) = (self.min.as_ref()?, self.max.as_ref()?);
        if min.is_devrelease() || max.is_devrelease() {
            return None;
        }
        self.wildcard_prefix()
    }

    /// Whether this range is exactly a `==X.Y.*` wildcard.
    pub fn is_single_wildcard_range(&self) -> bool {
        self.single_wildcard_prefix().is_some()
    }

    fn wildcard_prefix(&self) -> Option<Version> {
        let (min, max) = (self.min.as_ref()?, self.max.as_ref()?);
        if !self.include_min
            || self.include_max
            || min.is_local()
            || max.is_local()
            || min.is_prerelease()
            || max.is_prerelease()
            || min.is_postrelease() != max.is_postrelease()
            || min.epoch() != max.epoch()
        {
            return None;
        }

        if let (Some(low), Some(high)) = (min.post(), max.post()) {
            // `==1.0.post1.*`
            return (min.release() == max.release() && high == low + 1).then(|| {
                Version::new(min.release().iter().copied())
                    .with_epoch(min.epoch())
                    .with_post(Some(low))
            });
        }

        let len = min.release().len().max(max.release().len());
        let padded = |release: &[u64]| -> Vec<u64> {
            release
                .iter()
                .copied()
                .chain(std::iter::repeat(0))
                .take(len)
                .collect()
        };
        let (low, high) = (padded(min.release()), padded(max.release()));
        (1..=len)
            .find(|&precision| {
                if low[precision..].iter().any(|part| *part != 0) {
                    return false;
                }
                let mut next = low[..precision].to_vec();
                next[precision - 1] += 1;
                next.resize(len, 0);
                next == high
            })
            .map(|precision| {
                Version::new(low[..precision].iter().copied()).with_epoch(min.epoch())
            })
    }
}

impl From<Version> for VersionRange {
    /// The range allowing just `version`.
    fn from(version: Version) -> Self {
        Self::new(Some(version.clone()), Some(version), true, true)
    }
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(version) = self.as_version() {
            return write!(f, "{version}");
        }
        if let Some(prefix) = self.single_wildcard_prefix() {
            return write!(f, "=={prefix}.*");
        }
        match (&self.min, &self.max) {
            (None, None) => write!(f, "*"),
            (min, max) => {
                if let Some(min) = min {
                    let operator = if self.include_min { ">=" } else { ">" };
                    write!(f, "{operator}{min}")?;
                }
                if let Some(max) = max {
                    if min.is_some() {
                        write!(f, ",")?;
                    }
                    let operator = if self.include_max { "<=" } else { "<" };
                    write!(f, "{operator}{max}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::VersionRange;
    use crate::Version;

    fn v(version: &str) -> Version {
        Version::from_str(version).unwrap()
    }

    fn range(
        min: Option<&str>,
        max: Option<&str>,
        include_min: bool,
        include_max: bool,
    ) -> VersionRange {
        VersionRange::new(min.map(v), max.map(v), include_min, include_max)
    }

    #[test_case("1.0.dev0", false; "dev of bound")]
    #[test_case("1.0a1", false; "pre of bound")]
    #[test_case("1.0rc9", false; "rc of bound")]
    #[test_case("0.9.9", true; "lower release")]
    #[test_case("0.9.post1", true; "lower post")]
    #[test_case("1.0", false; "bound")]
    fn exclusive_max_rejects_pre_releases(version: &str, allowed: bool) {
        let range = range(None, Some("1.0"), false, false);
        assert_eq!(range.allows(&v(version)), allowed, "{version}");
    }

    #[test]
    fn unstable_max_allows_pre_releases() {
        let range = range(None, Some("1.0b1"), false, false);
        assert!(range.allows(&v("1.0a1")));
        assert!(!range.allows(&v("1.0b1")));
        assert_eq!(range.allowed_max(), Some(v("1.0b1")));
    }

    #[test_case("1.0.post1", false; "post of bound")]
    #[test_case("1.0+local", false; "local of bound")]
    #[test_case("1.0.1", true; "next patch")]
    #[test_case("1.0", false; "bound")]
    fn exclusive_min_rejects_post_releases(version: &str, allowed: bool) {
        let range = range(Some("1.0"), None, false, false);
        assert_eq!(range.allows(&v(version)), allowed, "{version}");
    }

    const LOCAL_1: &str = "3.0.0+local.1";
    const POST_1: &str = "3.0.0-1";
    const POST_1_LOCAL_1: &str = "3.0.0-1+local.1";
    const LOCAL_2: &str = "3.0.0+local.2";

    #[test_case(LOCAL_1, POST_1, false)]
    #[test_case(LOCAL_1, POST_1_LOCAL_1, true)]
    #[test_case(LOCAL_1, LOCAL_2, true)]
    #[test_case(POST_1, LOCAL_1, false)]
    #[test_case(POST_1, POST_1_LOCAL_1, true)]
    #[test_case(POST_1, LOCAL_2, false)]
    #[test_case(POST_1_LOCAL_1, LOCAL_1, false)]
    #[test_case(POST_1_LOCAL_1, POST_1, false)]
    #[test_case(POST_1_LOCAL_1, LOCAL_2, false)]
    #[test_case(LOCAL_2, LOCAL_1, false)]
    #[test_case(LOCAL_2, POST_1, false)]
    #[test_case(LOCAL_2, POST_1_LOCAL_1, false)]
    #[test_case("3.0.0", POST_1, true)]
    #[test_case("3.0.0", LOCAL_1, true)]
    #[test_case("3.0.0", "3.0.0.post1.dev1+local.1", true)]
    #[test_case(POST_1, "3.0.0-2", true)]
    #[test_case("3.0.0-2", POST_1, false)]
    fn post_and_local_min(min: &str, version: &str, allowed: bool) {
        let range = range(Some(min), None, true, false);
        assert_eq!(range.allows(&v(version)), allowed, ">={min} allows {version}");
    }

    #[test_case(LOCAL_1, POST_1, false)]
    #[test_case(LOCAL_1, POST_1_LOCAL_1, false)]
    #[test_case(LOCAL_1, LOCAL_2, false)]
    #[test_case(POST_1, LOCAL_1, true)]
    #[test_case(POST_1, POST_1_LOCAL_1, true)]
    #[test_case(POST_1, LOCAL_2, true)]
    #[test_case(POST_1_LOCAL_1, LOCAL_1, true)]
    #[test_case(POST_1_LOCAL_1, POST_1, true)]
    #[test_case(POST_1_LOCAL_1, LOCAL_2, true)]
    #[test_case(LOCAL_2, LOCAL_1, true)]
    #[test_case(LOCAL_2, POST_1, false)]
    #[test_case(LOCAL_2, POST_1_LOCAL_1, false)]
    #[test_case("3.0.0", LOCAL_1, true)]
    #[test_case(POST_1, "3.0.0", true)]
    #[test_case(POST_1, "3.0.0-2", false)]
    fn post_and_local_max(max: &str, version: &str, allowed: bool) {
        let range = range(None, Some(max), false, true);
        assert_eq!(range.allows(&v(version)), allowed, "<={max} allows {version}");
    }

    #[test]
    fn inclusive_bounds() {
        let range = range(Some("1.0"), Some("2.0"), true, true);
        assert!(range.allows(&v("1.0")));
        assert!(range.allows(&v("1.0+local")));
        assert!(range.allows(&v("1.0.post1")));
        assert!(range.allows(&v("2.0")));
        assert!(range.allows(&v("2.0+local")));
        assert!(!range.allows(&v("2.0.post1")));
        assert!(!range.allows(&v("1.0a1")));
    }

    #[test]
    fn unbounded_flags_are_normalized() {
        assert_eq!(range(None, Some("1"), true, false), range(None, Some("1"), false, false));
        assert_eq!(range(Some("1"), None, true, true), range(Some("1"), None, true, false));
        assert!(VersionRange::any().is_any());
    }

    #[test]
    fn intersect() {
        // 1.1 < x <= 1.2 and 1.15 < x
        let a = range(Some("1.1"), Some("1.2"), false, true);
        let b = range(Some("1.15"), None, false, false);
        assert_eq!(a.intersect(&b), Some(range(Some("1.15"), Some("1.2"), false, true)));

        let a = range(None, Some("1.0"), false, false);
        let b = range(Some("1.0"), None, true, false);
        assert_eq!(a.intersect(&b), None);

        let a = range(None, Some("1.0"), false, true);
        let b = range(Some("1.0"), None, true, false);
        assert_eq!(a.intersect(&b).unwrap().as_version(), Some(&v("1.0")));
    }

    #[test]
    fn union() {
        let a = range(Some("1.0"), Some("2.0"), true, false);
        let b = range(Some("2.0"), Some("3.0"), true, false);
        assert_eq!(a.union(&b), Some(range(Some("1.0"), Some("3.0"), true, false)));
        assert!(a.is_adjacent_to(&b));

        let b = range(Some("2.0"), Some("3.0"), false, false);
        assert_eq!(a.union(&b), None);
        assert!(!a.is_adjacent_to(&b));

        assert_eq!(
            a.union(&VersionRange::from(v("2.0"))),
            Some(range(Some("1.0"), Some("2.0"), true, true))
        );
    }

    #[test]
    fn difference() {
        let a = range(Some("1.0"), Some("3.0"), true, false);
        let b = range(Some("1.5"), Some("2.0"), true, false);
        assert_eq!(
            a.difference(&b),
            vec![
                range(Some("1.0"), Some("1.5"), true, false),
                range(Some("2.0"), Some("3.0"), true, false),
            ]
        );
        let b = range(Some("1.0"), Some("3.0"), false, false);
        assert_eq!(a.difference(&b), vec![VersionRange::from(v("1.0"))]);
        assert!(a.difference(&a).is_empty());
    }

    #[test_case(">=1.0.dev0", "<2.0.dev0", Some("1"))]
    #[test_case(">=1.0.dev0", "<1.1.dev0", Some("1.0"))]
    #[test_case(">=1.2.dev0", "<1.3", Some("1.2"))]
    #[test_case(">=1.0.post1.dev0", "<1.0.post2.dev0", Some("1.0.post1"))]
    #[test_case(">=1.2.dev0", "<1.4.dev0", None)]
    #[test_case(">=1.2", "<1.3", None)]
    #[test_case(">=1.2a1.dev0", "<1.2a2.dev0", None)]
    fn single_wildcard(min: &str, max: &str, prefix: Option<&str>) {
        let range = range(
            Some(min.trim_start_matches(">=")),
            Some(max.trim_start_matches('<')),
            true,
            false,
        );
        assert_eq!(range.single_wildcard_prefix(), prefix.map(v));
        if let Some(prefix) = prefix {
            assert_eq!(range.to_string(), format!("=={prefix}.*"));
        }
    }

    #[test]
    fn single_marker_wildcard() {
        let minor = range(Some("3.6"), Some("3.7"), true, false);
        assert_eq!(minor.single_marker_wildcard_prefix(), Some(v("3.6")));
        assert_eq!(minor.single_wildcard_prefix(), None);
        let zero = range(Some("3.0"), Some("3.1"), true, false);
        assert_eq!(zero.single_marker_wildcard_prefix().unwrap().to_string(), "3.0");
        let major = range(Some("3"), Some("4"), true, false);
        assert_eq!(major.single_marker_wildcard_prefix().unwrap().to_string(), "3");
        let dev = range(Some("3.6.dev0"), Some("3.7.dev0"), true, false);
        assert_eq!(dev.single_marker_wildcard_prefix(), None);
    }

    #[test]
    fn display() {
        assert_eq!(VersionRange::any().to_string(), "*");
        assert_eq!(range(Some("1.0"), None, true, false).to_string(), ">=1.0");
        assert_eq!(range(Some("1.0"), None, false, false).to_string(), ">1.0");
        assert_eq!(range(None, Some("2"), false, true).to_string(), "<=2");
        assert_eq!(range(Some("1"), Some("2"), true, false).to_string(), ">=1,<2");
        assert_eq!(VersionRange::from(v("1.2.3")).to_string(), "1.2.3");
    }
}
