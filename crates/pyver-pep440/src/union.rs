use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::{Version, VersionConstraint, VersionRange};

/// A sorted set of at least two disjoint, non-adjacent [`VersionRange`]s.
///
/// Build it with [`VersionUnion::of`], which merges overlapping members and collapses the
/// result into a simpler [`VersionConstraint`] where possible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionUnion {
    ranges: Vec<VersionRange>,
}

impl VersionUnion {
    /// The union of `constraints`, in normal form.
    pub fn of(constraints: impl IntoIterator<Item = VersionConstraint>) -> VersionConstraint {
        Self::from_ranges(
            constraints
                .into_iter()
                .flat_map(|constraint| constraint.into_ranges())
                .collect(),
        )
    }

    /// Sort and merge `ranges` into a constraint.
    pub(crate) fn from_ranges(mut ranges: Vec<VersionRange>) -> VersionConstraint {
        if ranges.iter().any(VersionRange::is_any) {
            return VersionConstraint::any();
        }
        ranges.sort_by(VersionRange::compare);

        let mut merged: Vec<VersionRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            // Merge with the previous range, but only if they touch
            if let Some(last) = merged.last_mut() {
                if last.allows_any(&range) || last.is_adjacent_to(&range) {
                    if let Some(union) = last.union(&range) {
                        *last = union;
                        continue;
                    }
                }
            }
            merged.push(range);
        }

        match merged.len() {
            0 => VersionConstraint::Empty,
            1 => VersionConstraint::from(merged.remove(0)),
            _ => VersionConstraint::Union(Self { ranges: merged }),
        }
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    pub fn allows(&self, version: &Version) -> bool {
        if let Some(excluded) = self.excluded_single_version() {
            // `!=2.0+deadbeef` must still allow `2.0`
            if excluded.is_local() {
                return excluded != *version;
            }
        }
        self.ranges.iter().any(|range| range.allows(version))
    }

    /// The version `V` if this union is `!=V`, that is `<V || >V`.
    pub fn excluded_single_version(&self) -> Option<Version> {
        let [below, above] = self.ranges.as_slice() else {
            return None;
        };
        if below.min().is_some()
            || below.include_max()
            || above.max().is_some()
            || above.include_min()
        {
            return None;
        }
        let (upper, lower) = (below.max()?, above.min()?);
        (upper == lower).then(|| upper.clone())
    }

    pub fn excludes_single_version(&self) -> bool {
        self.excluded_single_version().is_some()
    }

    /// The prefix `X.Y` if this union is `!=X.Y.*`.
    pub fn excluded_single_wildcard_prefix(&self) -> Option<Version> {
        let gap = self.wildcard_gap(true)?;
        gap.single_wildcard_prefix()
    }

    /// Like [`VersionUnion::excluded_single_wildcard_prefix`], for the wildcard shape of
    /// `python_version` markers.
    pub fn excluded_single_marker_wildcard_prefix(&self) -> Option<Version> {
        let gap = self.wildcard_gap(false)?;
        gap.single_marker_wildcard_prefix()
    }

    pub fn excludes_single_wildcard_range(&self) -> bool {
        self.excluded_single_wildcard_prefix().is_some()
    }

    /// The hole between `<a` and `>=b`.
    fn wildcard_gap(&self, dev_bound: bool) -> Option<VersionRange> {
        let [first, second] = self.ranges.as_slice() else {
            return None;
        };
        if first.min().is_some()
            || first.include_max()
            || second.max().is_some()
            || !second.include_min()
        {
            return None;
        }
        let (upper, lower) = (first.max()?, second.min()?);
        // `<X` and `<X.dev0` exclude the same versions, `>=Y` and `>=Y.dev0` don't
        if upper.is_local() || (dev_bound && lower.dev() != Some(0)) {
            return None;
        }
        let start = if dev_bound && !upper.is_devrelease() {
            upper.first_devrelease()
        } else {
            upper.clone()
        };
        Some(VersionRange::new(
            Some(start),
            Some(lower.clone()),
            true,
            false,
        ))
    }
}

impl Display for VersionUnion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(excluded) = self.excluded_single_version() {
            return write!(f, "!={excluded}");
        }
        if let Some(prefix) = self.excluded_single_wildcard_prefix() {
            return write!(f, "!={prefix}.*");
        }
        write!(f, "{}", self.ranges.iter().join(" || "))
    }
}
