use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::term::{Combined, Term};
use crate::{
    Constraint, ExtraConstraint, ExtraMultiConstraint, MultiConstraint, Operator,
    ParseGenericConstraintError, UnionConstraint, parse_generic_constraint,
};

/// A set of string values, in one of the shapes the algebra produces.
///
/// Plain constraints (`sys_platform`, `platform_machine`, ...) and extra constraints never
/// combine: their intersection is empty and their union stays a two-member union.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenericConstraint {
    /// Every value, `*`.
    Any,
    /// No value, `<empty>`.
    Empty,
    Constraint(Constraint),
    Extra(ExtraConstraint),
    Multi(MultiConstraint),
    ExtraMulti(ExtraMultiConstraint),
    Union(UnionConstraint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Plain,
    Extra,
}

fn intersect_terms<T: Term>(left: &T, right: &T) -> GenericConstraint {
    match left.intersect_term(right) {
        Combined::Empty => GenericConstraint::Empty,
        Combined::Any => GenericConstraint::Any,
        Combined::One(term) => term.into_constraint(),
        Combined::Both => T::into_multi(MultiConstraint::new([left.clone(), right.clone()])),
    }
}

fn union_terms<T: Term>(left: &T, right: &T) -> GenericConstraint {
    match left.union_term(right) {
        Combined::Empty => GenericConstraint::Empty,
        Combined::Any => GenericConstraint::Any,
        Combined::One(term) => term.into_constraint(),
        Combined::Both => UnionConstraint::from_members(vec![
            left.clone().into_constraint(),
            right.clone().into_constraint(),
        ]),
    }
}

impl GenericConstraint {
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The members of a union, or the constraint itself.
    pub(crate) fn members(&self) -> &[Self] {
        match self {
            Self::Union(union) => union.constraints(),
            other => std::slice::from_ref(other),
        }
    }

    fn domain(&self) -> Option<Domain> {
        match self {
            Self::Any | Self::Empty => None,
            Self::Constraint(_) | Self::Multi(_) => Some(Domain::Plain),
            Self::Extra(_) | Self::ExtraMulti(_) => Some(Domain::Extra),
            Self::Union(union) => union.constraints().first().and_then(Self::domain),
        }
    }

    /// Whether `value` satisfies the constraint.
    pub fn allows(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Empty => false,
            Self::Constraint(constraint) => constraint.allows(value),
            Self::Extra(extra) => extra.allows(value),
            Self::Multi(multi) => multi.allows(value),
            Self::ExtraMulti(multi) => multi.allows(value),
            Self::Union(union) => union.allows(value),
        }
    }

    /// Whether the constraint holds for a set of requested extras.
    ///
    /// Only extra terms look at the requested extras, plain terms never hold.
    pub fn allows_extras(&self, is_requested: &impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Any => true,
            Self::Empty | Self::Constraint(_) | Self::Multi(_) => false,
            Self::Extra(extra) => extra.allows_extras(is_requested),
            Self::ExtraMulti(multi) => multi.allows_extras(is_requested),
            Self::Union(union) => union.allows_extras(is_requested),
        }
    }

    /// Whether `other` is allowed as a whole.
    ///
    /// This is [`GenericConstraint::covers`], except that a group of `!=` terms also allows
    /// all of a `!=value` term whose value it allows: `!=win32, !=linux` allows all of
    /// `!=darwin`.
    pub fn allows_all(&self, other: &Self) -> bool {
        if let (Self::Multi(ours), Self::Constraint(theirs)) = (self, other)
            && theirs.operator() == Operator::NotEqual
            && ours
                .constraints()
                .iter()
                .all(|term| term.operator() == Operator::NotEqual)
        {
            return ours.allows(theirs.value());
        }
        self.covers(other)
    }

    /// Whether every value allowed by `other` is allowed by `self`.
    pub fn covers(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Empty) | (Self::Any, _) => true,
            (Self::Empty, _) | (_, Self::Any) => false,
            (_, Self::Union(union)) => union
                .constraints()
                .iter()
                .all(|member| self.covers(member)),
            (Self::Union(union), _) => union.covers(other),
            (Self::Constraint(ours), Self::Constraint(theirs)) => ours.allows_all_term(theirs),
            (Self::Constraint(ours), Self::Multi(theirs)) => theirs.is_allowed_by_term(ours),
            (Self::Multi(ours), Self::Constraint(theirs)) => ours.allows_all_term(theirs),
            (Self::Multi(ours), Self::Multi(theirs)) => ours.allows_all_multi(theirs),
            (Self::Extra(ours), Self::Extra(theirs)) => ours.allows_all_term(theirs),
            (Self::Extra(ours), Self::ExtraMulti(theirs)) => theirs.is_allowed_by_term(ours),
            (Self::ExtraMulti(ours), Self::Extra(theirs)) => ours.allows_all_term(theirs),
            (Self::ExtraMulti(ours), Self::ExtraMulti(theirs)) => ours.allows_all_multi(theirs),
            _ => false,
        }
    }

    /// Whether some value is allowed by both constraints.
    pub fn allows_any(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => false,
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::Union(union), _) => union.allows_any(other),
            (_, Self::Union(union)) => union
                .constraints()
                .iter()
                .any(|member| self.allows_any(member)),
            (Self::Constraint(ours), Self::Constraint(theirs)) => ours.allows_any_term(theirs),
            (Self::Constraint(term), Self::Multi(multi))
            | (Self::Multi(multi), Self::Constraint(term)) => multi.allows_any_term(term),
            (Self::Multi(ours), Self::Multi(theirs)) => ours.allows_any_multi(theirs),
            (Self::Extra(ours), Self::Extra(theirs)) => ours.allows_any_term(theirs),
            (Self::Extra(term), Self::ExtraMulti(multi))
            | (Self::ExtraMulti(multi), Self::Extra(term)) => multi.allows_any_term(term),
            (Self::ExtraMulti(ours), Self::ExtraMulti(theirs)) => ours.allows_any_multi(theirs),
            _ => false,
        }
    }

    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => Self::Empty,
            (Self::Any, constraint) | (constraint, Self::Any) => constraint.clone(),
            (Self::Union(union), _) => {
                UnionConstraint::intersect_members(union.constraints(), other.members())
            }
            (_, Self::Union(union)) => {
                UnionConstraint::intersect_members(self.members(), union.constraints())
            }
            (Self::Constraint(ours), Self::Constraint(theirs)) => intersect_terms(ours, theirs),
            (Self::Constraint(term), Self::Multi(multi))
            | (Self::Multi(multi), Self::Constraint(term)) => multi.intersect_term(term),
            (Self::Multi(ours), Self::Multi(theirs)) => ours.intersect_multi(theirs),
            (Self::Extra(ours), Self::Extra(theirs)) => intersect_terms(ours, theirs),
            (Self::Extra(term), Self::ExtraMulti(multi))
            | (Self::ExtraMulti(multi), Self::Extra(term)) => multi.intersect_term(term),
            (Self::ExtraMulti(ours), Self::ExtraMulti(theirs)) => ours.intersect_multi(theirs),
            _ => {
                debug_assert_ne!(self.domain(), other.domain());
                Self::Empty
            }
        }
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Empty, constraint) | (constraint, Self::Empty) => constraint.clone(),
            (Self::Union(union), _) => union.union(other),
            (Self::Multi(_) | Self::ExtraMulti(_), Self::Union(union)) => union.union(self),
            // Keep our term first
            (_, Self::Union(_)) => UnionConstraint::single(self.clone()).union(other),
            (Self::Constraint(ours), Self::Constraint(theirs)) => union_terms(ours, theirs),
            (Self::Constraint(term), Self::Multi(multi))
            | (Self::Multi(multi), Self::Constraint(term)) => multi.union_term(term),
            (Self::Multi(ours), Self::Multi(theirs)) => ours.union_multi(theirs),
            (Self::Extra(ours), Self::Extra(theirs)) => union_terms(ours, theirs),
            (Self::Extra(term), Self::ExtraMulti(multi))
            | (Self::ExtraMulti(multi), Self::Extra(term)) => multi.union_term(term),
            (Self::ExtraMulti(ours), Self::ExtraMulti(theirs)) => ours.union_multi(theirs),
            _ => UnionConstraint::from_members(vec![self.clone(), other.clone()]),
        }
    }

    /// The values allowed by `self` but not by `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.intersect(&other.invert())
    }

    #[must_use]
    pub fn invert(&self) -> Self {
        match self {
            Self::Any => Self::Empty,
            Self::Empty => Self::Any,
            Self::Constraint(constraint) => Self::Constraint(constraint.inverted()),
            Self::Extra(extra) => Self::Extra(extra.inverted()),
            Self::Multi(multi) => multi.invert(),
            Self::ExtraMulti(multi) => multi.invert(),
            Self::Union(union) => union.invert(),
        }
    }
}

impl From<Constraint> for GenericConstraint {
    fn from(constraint: Constraint) -> Self {
        Self::Constraint(constraint)
    }
}

impl From<ExtraConstraint> for GenericConstraint {
    fn from(extra: ExtraConstraint) -> Self {
        Self::Extra(extra)
    }
}

impl FromStr for GenericConstraint {
    type Err = ParseGenericConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_generic_constraint(s)
    }
}

impl Display for GenericConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Empty => f.write_str("<empty>"),
            Self::Constraint(constraint) => Display::fmt(constraint, f),
            Self::Extra(extra) => Display::fmt(extra, f),
            Self::Multi(multi) => Display::fmt(multi, f),
            Self::ExtraMulti(multi) => Display::fmt(multi, f),
            Self::Union(union) => Display::fmt(union, f),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for GenericConstraint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        parse_generic_constraint(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for GenericConstraint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
