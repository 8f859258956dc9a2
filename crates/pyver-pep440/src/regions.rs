use crate::{Version, VersionConstraint, VersionRange};

/// Split the version line at every bound of `constraints`.
///
/// The returned ranges are sorted, disjoint and cover every version. Within each region, every
/// input constraint either allows all versions or none of them. Without any bounded input the
/// result is the single region `*`.
pub fn constraint_regions(constraints: &[VersionConstraint]) -> Vec<VersionRange> {
    // An edge is a bound and whether the region starting after it includes it
    let mut edges: Vec<(Version, bool)> = Vec::new();
    for constraint in constraints {
        for range in constraint.ranges() {
            if let Some(min) = range.min() {
                edges.push((min.clone(), !range.include_min()));
            }
            if let Some(max) = range.max() {
                edges.push((max.clone(), range.include_max()));
            }
        }
    }
    if edges.is_empty() {
        return vec![VersionRange::any()];
    }
    edges.sort();
    edges.dedup();

    let mut regions = Vec::with_capacity(edges.len() + 1);
    let mut start: Option<Version> = None;
    let mut include_start = false;
    for (version, include_end) in edges {
        if start.as_ref() != Some(&version) || (include_start && include_end) {
            regions.push(VersionRange::new(
                start,
                Some(version.clone()),
                include_start,
                include_end,
            ));
        }
        start = Some(version);
        include_start = !include_end;
    }
    regions.push(VersionRange::new(start, None, include_start, false));
    regions
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use itertools::Itertools;

    use super::constraint_regions;
    use crate::{VersionConstraint, parse_constraint};

    fn regions(constraints: &[&str]) -> String {
        let constraints: Vec<VersionConstraint> = constraints
            .iter()
            .map(|constraint| parse_constraint(constraint).unwrap())
            .collect();
        constraint_regions(&constraints).iter().join(" | ")
    }

    #[test]
    fn no_bounds() {
        assert_snapshot!(regions(&[]), @"*");
        assert_snapshot!(regions(&["*"]), @"*");
        assert_snapshot!(regions(&["<empty>"]), @"*");
    }

    #[test]
    fn union_and_range() {
        assert_snapshot!(
            regions(&[">=2.7,<3 || >3.7,<=4.0.0", ">=3.6.0,<3.8.0"]),
            @"<2.7 | >=2.7,<3 | >=3,<3.6.0 | >=3.6.0,<=3.7 | >3.7,<3.8.0 | >=3.8.0,<=4.0.0 | >4.0.0"
        );
    }

    #[test]
    fn single_range() {
        assert_snapshot!(regions(&[">=1.0,<2.0"]), @"<1.0 | >=1.0,<2.0 | >=2.0");
    }

    #[test]
    fn single_version() {
        assert_snapshot!(regions(&["==1.0"]), @"<1.0 | 1.0 | >1.0");
    }

    #[test]
    fn overlapping() {
        assert_snapshot!(
            regions(&[">=1.0,<2.0", ">1.5"]),
            @"<1.0 | >=1.0,<=1.5 | >1.5,<2.0 | >=2.0"
        );
    }

    #[test]
    fn shared_bounds() {
        assert_snapshot!(
            regions(&[">=1.0", "<=1.0", "<2"]),
            @"<1.0 | 1.0 | >1.0,<2 | >=2"
        );
    }
}
