use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use pyver_constraints::{
    Constraint, ExtraConstraint, GenericConstraint, Operator, UnionConstraint,
};
use pyver_normalize::ExtraName;
use pyver_pep440::{
    Version, VersionConstraint, VersionRange, parse_marker_version_constraint,
};
use smallvec::SmallVec;
use tracing::warn;

use crate::environment::{canonical_name, is_version_like_name, is_version_name};
use crate::{Marker, MarkerEnvironment, MarkerErrorSource, MarkerUnion, MultiMarker};

/// How a marker term compares its name and value, such as by `>=` or `not in`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerOperator {
    /// `==`
    Equal,
    /// `===`, the same as `==`.
    ArbitraryEqual,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessEqual,
    /// `~=`
    TildeEqual,
    /// `name in "a, b"`: the value is one of a list.
    In,
    /// `name not in "a, b"`
    NotIn,
    /// `"a" in name`: the value contains a string.
    Contains,
    /// `"a" not in name`
    NotContains,
}

impl MarkerOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::ArbitraryEqual => "===",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::TildeEqual => "~=",
            Self::In | Self::Contains => "in",
            Self::NotIn | Self::NotContains => "not in",
        }
    }

    /// The operator of the negated comparison. `~=` has none, its negation is two terms.
    pub fn inverted(self) -> Option<Self> {
        Some(match self {
            Self::Equal | Self::ArbitraryEqual => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::GreaterThan => Self::LessEqual,
            Self::GreaterEqual => Self::LessThan,
            Self::LessThan => Self::GreaterEqual,
            Self::LessEqual => Self::GreaterThan,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::Contains => Self::NotContains,
            Self::NotContains => Self::Contains,
            Self::TildeEqual => return None,
        })
    }

    /// `<`, `<=`, `>`, `>=` and `~=`, which only make sense between versions.
    pub(crate) fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::GreaterThan
                | Self::GreaterEqual
                | Self::LessThan
                | Self::LessEqual
                | Self::TildeEqual
        )
    }

    /// The operator for `value op name` rewritten as `name op' value`.
    pub(crate) fn reversed(self) -> Option<Self> {
        Some(match self {
            Self::Equal | Self::ArbitraryEqual | Self::NotEqual => self,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterEqual => Self::LessEqual,
            Self::LessThan => Self::GreaterThan,
            Self::LessEqual => Self::GreaterEqual,
            Self::In => Self::Contains,
            Self::NotIn => Self::NotContains,
            Self::TildeEqual | Self::Contains | Self::NotContains => return None,
        })
    }
}

impl FromStr for MarkerOperator {
    type Err = String;

    /// Arbitrary whitespace is allowed between `not` and `in`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let operator = match s {
            "==" => Self::Equal,
            "===" => Self::ArbitraryEqual,
            "!=" => Self::NotEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessEqual,
            "~=" => Self::TildeEqual,
            "in" => Self::In,
            not_space_in
                if not_space_in
                    .strip_prefix("not")
                    .and_then(|space_in| space_in.strip_suffix("in"))
                    .is_some_and(|space| !space.is_empty() && space.trim().is_empty()) =>
            {
                Self::NotIn
            }
            other => return Err(format!("Invalid comparator: {other}")),
        };
        Ok(operator)
    }
}

impl Display for MarkerOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of values a marker term allows, in the algebra its name is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerConstraint {
    /// `python_version` and `python_full_version`, and ordering comparisons on
    /// `platform_release`.
    Version(VersionConstraint),
    /// Every other name, including `extra`.
    Generic(GenericConstraint),
}

impl MarkerConstraint {
    pub fn is_any(&self) -> bool {
        match self {
            Self::Version(constraint) => constraint.is_any(),
            Self::Generic(constraint) => constraint.is_any(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Version(constraint) => constraint.is_empty(),
            Self::Generic(constraint) => constraint.is_empty(),
        }
    }

    /// Whether every value allowed by `other` is allowed by `self`. Constraints of different
    /// algebras are never compared.
    pub fn allows_all(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Version(ours), Self::Version(theirs)) => ours.allows_all(theirs),
            (Self::Generic(ours), Self::Generic(theirs)) => ours.covers(theirs),
            _ => false,
        }
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Version(ours), Self::Version(theirs)) => {
                Some(Self::Version(ours.intersect(theirs)))
            }
            (Self::Generic(ours), Self::Generic(theirs)) => {
                Some(Self::Generic(ours.intersect(theirs)))
            }
            _ => None,
        }
    }

    pub fn union(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Version(ours), Self::Version(theirs)) => Some(Self::Version(ours.union(theirs))),
            (Self::Generic(ours), Self::Generic(theirs)) => Some(Self::Generic(ours.union(theirs))),
            _ => None,
        }
    }

    #[must_use]
    pub fn invert(&self) -> Self {
        match self {
            Self::Version(constraint) => Self::Version(constraint.invert()),
            Self::Generic(constraint) => Self::Generic(constraint.invert()),
        }
    }
}

impl Display for MarkerConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Version(constraint) => Display::fmt(constraint, f),
            Self::Generic(constraint) => Display::fmt(constraint, f),
        }
    }
}

/// A single comparison, such as `python_version >= "3.8"` or `"tegra" in platform_release`.
///
/// The operator and value are kept as written for display. Two markers are equal when they
/// compare the same name and allow the same values.
#[derive(Debug, Clone)]
pub struct SingleMarker {
    name: String,
    operator: MarkerOperator,
    value: String,
    constraint: MarkerConstraint,
}

impl SingleMarker {
    /// The term `name operator "value"`. Legacy names such as `os.name` are accepted.
    pub fn new(
        name: &str,
        operator: MarkerOperator,
        value: &str,
    ) -> Result<Self, MarkerErrorSource> {
        let name = canonical_name(name);
        let (value, constraint) = if name == "extra" {
            let extra = ExtraName::from_str(value)?;
            let constraint = match operator {
                MarkerOperator::Equal | MarkerOperator::ArbitraryEqual => {
                    ExtraConstraint::equal(extra.as_str())
                }
                MarkerOperator::NotEqual => ExtraConstraint::not_equal(extra.as_str()),
                other => {
                    return Err(MarkerErrorSource::String(format!(
                        "Operator `{other}` is not supported for `extra`, use `==` or `!=`"
                    )));
                }
            };
            (
                extra.to_string(),
                MarkerConstraint::Generic(GenericConstraint::Extra(constraint)),
            )
        } else if is_version_name(name)
            || (is_version_like_name(name) && operator.is_ordering())
        {
            (
                value.to_string(),
                MarkerConstraint::Version(version_constraint(operator, value)?),
            )
        } else {
            (
                value.to_string(),
                MarkerConstraint::Generic(generic_constraint(name, operator, value)?),
            )
        };
        Ok(Self {
            name: name.to_string(),
            operator,
            value,
            constraint,
        })
    }

    /// The marker spelled with a single operator that allows exactly `constraint`, if there is
    /// one. `>=3.6` is `python_version >= "3.6"`, but `>=3.6,<4.0` needs two terms.
    pub(crate) fn from_constraint(name: &str, constraint: &MarkerConstraint) -> Option<Self> {
        let (operator, value) = match constraint {
            MarkerConstraint::Version(version) => single_version_term(version)?,
            MarkerConstraint::Generic(GenericConstraint::Constraint(term)) => {
                let operator = match term.operator() {
                    Operator::Equal => MarkerOperator::Equal,
                    Operator::NotEqual => MarkerOperator::NotEqual,
                    Operator::In => MarkerOperator::Contains,
                    Operator::NotIn => MarkerOperator::NotContains,
                };
                (operator, term.value().to_string())
            }
            MarkerConstraint::Generic(GenericConstraint::Extra(extra)) => {
                let operator = if extra.operator() == Operator::NotEqual {
                    MarkerOperator::NotEqual
                } else {
                    MarkerOperator::Equal
                };
                (operator, extra.value().to_string())
            }
            MarkerConstraint::Generic(_) => return None,
        };
        Some(Self {
            name: name.to_string(),
            operator,
            value,
            constraint: constraint.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> MarkerOperator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn constraint(&self) -> &MarkerConstraint {
        &self.constraint
    }

    /// Whether the term holds in `environment`. A missing value never matches.
    pub(crate) fn evaluate(&self, environment: &MarkerEnvironment) -> bool {
        match &self.constraint {
            MarkerConstraint::Generic(constraint) if self.name == "extra" => environment
                .extras()
                .is_some_and(|extras| {
                    constraint.allows_extras(&|extra| {
                        extras.iter().any(|requested| requested.as_str() == extra)
                    })
                }),
            MarkerConstraint::Generic(constraint) => environment
                .get(&self.name)
                .is_some_and(|value| constraint.allows(value)),
            MarkerConstraint::Version(constraint) => {
                let Some(value) = environment.get(&self.name) else {
                    return false;
                };
                match Version::from_str(value) {
                    Ok(version) => constraint.allows(&version),
                    Err(err) => {
                        warn!(
                            "Expected a PEP 440 version for `{}`, found `{value}`, evaluating `{self}` to false: {err}",
                            self.name
                        );
                        false
                    }
                }
            }
        }
    }

    /// The negated term. `~=` negates to two terms, every other operator has an inverse.
    pub fn invert(&self) -> Marker {
        if let Some(operator) = self.operator.inverted() {
            return Marker::from(Self {
                name: self.name.clone(),
                operator,
                value: self.value.clone(),
                constraint: self.constraint.invert(),
            });
        }
        marker_from_constraint(&self.name, &self.constraint.invert())
    }
}

/// The marker on `name` that allows exactly `constraint`.
pub(crate) fn marker_from_constraint(name: &str, constraint: &MarkerConstraint) -> Marker {
    if constraint.is_any() {
        return Marker::Any;
    }
    if constraint.is_empty() {
        return Marker::Empty;
    }
    if let Some(single) = SingleMarker::from_constraint(name, constraint) {
        return Marker::Single(single);
    }
    match constraint {
        MarkerConstraint::Version(version) => {
            MarkerUnion::of(version.ranges().into_iter().map(|range| {
                let lower = range.min().map(|min| {
                    VersionConstraint::from(VersionRange::at_least(
                        min.clone(),
                        range.include_min(),
                    ))
                });
                let upper = range.max().map(|max| {
                    VersionConstraint::from(VersionRange::at_most(
                        max.clone(),
                        range.include_max(),
                    ))
                });
                MultiMarker::of(lower.into_iter().chain(upper).map(|bound| {
                    marker_from_constraint(name, &MarkerConstraint::Version(bound))
                }))
            }))
        }
        MarkerConstraint::Generic(generic) => {
            let terms = |members: Vec<GenericConstraint>| {
                members
                    .into_iter()
                    .map(|member| marker_from_constraint(name, &MarkerConstraint::Generic(member)))
                    .collect::<Vec<_>>()
            };
            match generic {
                GenericConstraint::Multi(multi) => MultiMarker::of(terms(
                    multi
                        .constraints()
                        .iter()
                        .cloned()
                        .map(GenericConstraint::from)
                        .collect(),
                )),
                GenericConstraint::ExtraMulti(multi) => MultiMarker::of(terms(
                    multi
                        .constraints()
                        .iter()
                        .cloned()
                        .map(GenericConstraint::from)
                        .collect(),
                )),
                GenericConstraint::Union(union) => {
                    MarkerUnion::of(terms(union.constraints().to_vec()))
                }
                // Single terms, any and empty are handled above
                _ => Marker::Empty,
            }
        }
    }
}

/// `==V`, `>=V`, `<V`, `!=V` and the like.
fn single_version_term(constraint: &VersionConstraint) -> Option<(MarkerOperator, String)> {
    match constraint {
        VersionConstraint::Version(version) => Some((MarkerOperator::Equal, version.to_string())),
        VersionConstraint::Range(range) => match (range.min(), range.max()) {
            (Some(min), None) => {
                let operator = if range.include_min() {
                    MarkerOperator::GreaterEqual
                } else {
                    MarkerOperator::GreaterThan
                };
                Some((operator, min.to_string()))
            }
            (None, Some(max)) => {
                let operator = if range.include_max() {
                    MarkerOperator::LessEqual
                } else {
                    MarkerOperator::LessThan
                };
                Some((operator, max.to_string()))
            }
            _ => None,
        },
        VersionConstraint::Union(union) => union
            .excluded_single_version()
            .map(|version| (MarkerOperator::NotEqual, version.to_string())),
        VersionConstraint::Empty => None,
    }
}

/// Split the list of `name in "a, b c|d"`.
fn list_items(value: &str) -> impl Iterator<Item = &str> {
    value
        .split([' ', ',', '|'])
        .filter(|item| !item.is_empty())
}

/// `python_version in "2.7, 3.0"` allows `2.7.*` and `3.0.*`; items with more than two release
/// components are exact versions.
fn version_constraint(
    operator: MarkerOperator,
    value: &str,
) -> Result<VersionConstraint, MarkerErrorSource> {
    let constraint = match operator {
        MarkerOperator::In
        | MarkerOperator::NotIn
        | MarkerOperator::Contains
        | MarkerOperator::NotContains => {
            let negated = matches!(operator, MarkerOperator::NotIn | MarkerOperator::NotContains);
            let prefix = if negated { "!=" } else { "==" };
            let terms: SmallVec<[String; 4]> = list_items(value)
                .map(|item| {
                    if item.split('.').count() <= 2 {
                        format!("{prefix}{item}.*")
                    } else {
                        format!("{prefix}{item}")
                    }
                })
                .collect();
            if terms.is_empty() {
                return Err(MarkerErrorSource::String(format!(
                    "Expected at least one version after `{operator}`"
                )));
            }
            parse_marker_version_constraint(&terms.join(if negated { ", " } else { " || " }))?
        }
        MarkerOperator::ArbitraryEqual => parse_marker_version_constraint(&format!("=={value}"))?,
        _ => parse_marker_version_constraint(&format!("{operator}{value}"))?,
    };
    Ok(constraint)
}

fn generic_constraint(
    name: &str,
    operator: MarkerOperator,
    value: &str,
) -> Result<GenericConstraint, MarkerErrorSource> {
    let constraint = match operator {
        MarkerOperator::Equal | MarkerOperator::ArbitraryEqual => Constraint::equal(value).into(),
        MarkerOperator::NotEqual => Constraint::not_equal(value).into(),
        MarkerOperator::Contains => Constraint::new(value, Operator::In).into(),
        MarkerOperator::NotContains => Constraint::new(value, Operator::NotIn).into(),
        MarkerOperator::In => UnionConstraint::from_members(
            list_items(value)
                .map(|item| Constraint::equal(item).into())
                .collect(),
        ),
        MarkerOperator::NotIn => list_items(value).fold(GenericConstraint::Any, |acc, item| {
            acc.intersect(&Constraint::not_equal(item).into())
        }),
        MarkerOperator::GreaterThan
        | MarkerOperator::GreaterEqual
        | MarkerOperator::LessThan
        | MarkerOperator::LessEqual
        | MarkerOperator::TildeEqual => {
            return Err(MarkerErrorSource::String(format!(
                "Operator `{operator}` is only supported for `python_version`, `python_full_version` and `platform_release`, not `{name}`"
            )));
        }
    };
    Ok(constraint)
}

impl PartialEq for SingleMarker {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.constraint == other.constraint
    }
}

impl Eq for SingleMarker {}

impl Hash for SingleMarker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.constraint.hash(state);
    }
}

impl Display for SingleMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let quote = if self.value.contains('"') { '\'' } else { '"' };
        match self.operator {
            MarkerOperator::Contains | MarkerOperator::NotContains => write!(
                f,
                "{quote}{}{quote} {} {}",
                self.value, self.operator, self.name
            ),
            _ => write!(
                f,
                "{} {} {quote}{}{quote}",
                self.name, self.operator, self.value
            ),
        }
    }
}
