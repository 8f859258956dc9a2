use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

use crate::{GenericConstraint, MultiConstraint};

/// The comparison of a [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// `==`, also spelled `=` or `===`.
    Equal,
    /// `!=`
    NotEqual,
    /// `in`: the constraint value is a substring of the compared value.
    In,
    /// `not in`
    NotIn,
}

impl Operator {
    /// The operator that holds exactly when this one doesn't.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How two terms combine under intersection or union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combined<T> {
    /// The intersection is empty.
    Empty,
    /// The union allows everything.
    Any,
    /// The combination is a single term.
    One(T),
    /// Neither term can be dropped.
    Both,
}

/// The smallest unit of the generic algebra: a single comparison against a string value.
///
/// [`Constraint`] and [`ExtraConstraint`] implement the pairwise rules; [`MultiConstraint`] and
/// [`crate::UnionConstraint`] build on top of them.
pub trait Term: Debug + Clone + Eq + Hash + Display {
    /// Whether the concrete `value` satisfies this term.
    fn allows(&self, value: &str) -> bool;

    /// Whether every value allowed by `other` is allowed by `self`.
    fn allows_all_term(&self, other: &Self) -> bool;

    /// Whether some value is allowed by both terms.
    fn allows_any_term(&self, other: &Self) -> bool;

    fn intersect_term(&self, other: &Self) -> Combined<Self>;

    fn union_term(&self, other: &Self) -> Combined<Self>;

    #[must_use]
    fn inverted(&self) -> Self;

    /// Wrap the term into the matching [`GenericConstraint`] variant.
    fn into_constraint(self) -> GenericConstraint;

    /// Wrap an and-group of terms into the matching [`GenericConstraint`] variant.
    fn into_multi(multi: MultiConstraint<Self>) -> GenericConstraint;
}

/// A comparison of an environment value against `value`: `==win32`, `!=linux`, `in tegra` or
/// `not in tegra`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constraint {
    value: String,
    operator: Operator,
}

impl Constraint {
    pub fn new(value: impl Into<String>, operator: Operator) -> Self {
        Self {
            value: value.into(),
            operator,
        }
    }

    /// `==value`
    pub fn equal(value: impl Into<String>) -> Self {
        Self::new(value, Operator::Equal)
    }

    /// `!=value`
    pub fn not_equal(value: impl Into<String>) -> Self {
        Self::new(value, Operator::NotEqual)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// `self.value` contains `other.value`.
    fn contains(&self, other: &Self) -> bool {
        self.value.contains(other.value.as_str())
    }
}

impl Term for Constraint {
    fn allows(&self, value: &str) -> bool {
        match self.operator {
            Operator::Equal => self.value == value,
            Operator::NotEqual => self.value != value,
            Operator::In => value.contains(self.value.as_str()),
            Operator::NotIn => !value.contains(self.value.as_str()),
        }
    }

    fn allows_all_term(&self, other: &Self) -> bool {
        if self == other {
            return true;
        }
        match (self.operator, other.operator) {
            (_, Operator::Equal) => self.allows(&other.value),
            (Operator::NotEqual, Operator::NotEqual) => self.value == other.value,
            // Every value containing `other.value` differs from `self.value`
            (Operator::NotEqual, Operator::In) => !self.contains(other),
            (Operator::NotEqual, Operator::NotIn) => self.contains(other),
            (Operator::In, Operator::In) => other.contains(self),
            (Operator::NotIn, Operator::NotIn) => self.contains(other),
            (Operator::Equal | Operator::In | Operator::NotIn, _) => false,
        }
    }

    fn allows_any_term(&self, other: &Self) -> bool {
        match (self.operator, other.operator) {
            (Operator::Equal, _) => other.allows(&self.value),
            (_, Operator::Equal) => self.allows(&other.value),
            (Operator::In, Operator::NotIn) => !self.contains(other),
            (Operator::NotIn, Operator::In) => !other.contains(self),
            _ => true,
        }
    }

    fn intersect_term(&self, other: &Self) -> Combined<Self> {
        if self == other {
            return Combined::One(self.clone());
        }
        let keep = |keep_self: bool| {
            Combined::One(if keep_self {
                self.clone()
            } else {
                other.clone()
            })
        };
        match (self.operator, other.operator) {
            (Operator::Equal, _) => {
                if other.allows(&self.value) {
                    keep(true)
                } else {
                    Combined::Empty
                }
            }
            (_, Operator::Equal) => {
                if self.allows(&other.value) {
                    keep(false)
                } else {
                    Combined::Empty
                }
            }
            (Operator::NotEqual, Operator::NotEqual) => Combined::Both,
            (Operator::In, Operator::In) => {
                if self.contains(other) {
                    keep(true)
                } else if other.contains(self) {
                    keep(false)
                } else {
                    Combined::Both
                }
            }
            (Operator::NotIn, Operator::NotIn) => {
                if self.contains(other) {
                    keep(false)
                } else if other.contains(self) {
                    keep(true)
                } else {
                    Combined::Both
                }
            }
            (Operator::In, Operator::NotIn) => {
                if self.contains(other) {
                    Combined::Empty
                } else {
                    Combined::Both
                }
            }
            (Operator::NotIn, Operator::In) => {
                if other.contains(self) {
                    Combined::Empty
                } else {
                    Combined::Both
                }
            }
            (Operator::In, Operator::NotEqual) => {
                if other.contains(self) {
                    Combined::Both
                } else {
                    keep(true)
                }
            }
            (Operator::NotEqual, Operator::In) => {
                if self.contains(other) {
                    Combined::Both
                } else {
                    keep(false)
                }
            }
            (Operator::NotIn, Operator::NotEqual) => {
                if other.contains(self) {
                    keep(true)
                } else {
                    Combined::Both
                }
            }
            (Operator::NotEqual, Operator::NotIn) => {
                if self.contains(other) {
                    keep(false)
                } else {
                    Combined::Both
                }
            }
        }
    }

    fn union_term(&self, other: &Self) -> Combined<Self> {
        if self == other {
            return Combined::One(self.clone());
        }
        let keep = |keep_self: bool| {
            Combined::One(if keep_self {
                self.clone()
            } else {
                other.clone()
            })
        };
        match (self.operator, other.operator) {
            (Operator::Equal, _) => {
                if other.allows(&self.value) {
                    keep(false)
                } else if other.operator == Operator::NotEqual {
                    Combined::Any
                } else {
                    Combined::Both
                }
            }
            (_, Operator::Equal) => {
                if self.allows(&other.value) {
                    keep(true)
                } else if self.operator == Operator::NotEqual {
                    Combined::Any
                } else {
                    Combined::Both
                }
            }
            (Operator::NotEqual, Operator::NotEqual) => Combined::Any,
            (Operator::In, Operator::In) => {
                if self.contains(other) {
                    keep(false)
                } else if other.contains(self) {
                    keep(true)
                } else {
                    Combined::Both
                }
            }
            // Unrelated `not in` terms are treated as covering everything
            (Operator::NotIn, Operator::NotIn) => {
                if self.contains(other) {
                    keep(true)
                } else if other.contains(self) {
                    keep(false)
                } else {
                    Combined::Any
                }
            }
            (Operator::In, Operator::NotIn) => {
                if other.contains(self) {
                    Combined::Any
                } else {
                    Combined::Both
                }
            }
            (Operator::NotIn, Operator::In) => {
                if self.contains(other) {
                    Combined::Any
                } else {
                    Combined::Both
                }
            }
            (Operator::In, Operator::NotEqual) => {
                if other.contains(self) {
                    Combined::Any
                } else {
                    keep(false)
                }
            }
            (Operator::NotEqual, Operator::In) => {
                if self.contains(other) {
                    Combined::Any
                } else {
                    keep(true)
                }
            }
            (Operator::NotIn, Operator::NotEqual) => {
                if other.contains(self) {
                    keep(false)
                } else {
                    Combined::Any
                }
            }
            (Operator::NotEqual, Operator::NotIn) => {
                if self.contains(other) {
                    keep(true)
                } else {
                    Combined::Any
                }
            }
        }
    }

    fn inverted(&self) -> Self {
        Self::new(self.value.clone(), self.operator.negate())
    }

    fn into_constraint(self) -> GenericConstraint {
        GenericConstraint::Constraint(self)
    }

    fn into_multi(multi: MultiConstraint<Self>) -> GenericConstraint {
        GenericConstraint::Multi(multi)
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.operator {
            Operator::Equal => write!(f, "{}", self.value),
            Operator::NotEqual => write!(f, "!={}", self.value),
            Operator::In | Operator::NotIn => write!(f, "{} {}", self.operator, self.value),
        }
    }
}

/// A requested extra, `==security`, or an extra that must not be requested, `!=security`.
///
/// Several extras can be requested at once, so unlike [`Constraint`], `==a` and `==b` don't
/// exclude each other. Extra constraints never combine with plain constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtraConstraint {
    value: String,
    negated: bool,
}

impl ExtraConstraint {
    /// `==value`
    pub fn equal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            negated: false,
        }
    }

    /// `!=value`
    pub fn not_equal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            negated: true,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn operator(&self) -> Operator {
        if self.negated {
            Operator::NotEqual
        } else {
            Operator::Equal
        }
    }

    /// Whether the term holds for the requested extras.
    pub fn allows_extras(&self, is_requested: &impl Fn(&str) -> bool) -> bool {
        is_requested(&self.value) != self.negated
    }

    fn is_complement_of(&self, other: &Self) -> bool {
        self.value == other.value && self.negated != other.negated
    }
}

impl Term for ExtraConstraint {
    fn allows(&self, value: &str) -> bool {
        (self.value == value) != self.negated
    }

    fn allows_all_term(&self, other: &Self) -> bool {
        self == other
    }

    fn allows_any_term(&self, other: &Self) -> bool {
        !self.is_complement_of(other)
    }

    fn intersect_term(&self, other: &Self) -> Combined<Self> {
        if self == other {
            Combined::One(self.clone())
        } else if self.is_complement_of(other) {
            Combined::Empty
        } else {
            Combined::Both
        }
    }

    fn union_term(&self, other: &Self) -> Combined<Self> {
        if self == other {
            Combined::One(self.clone())
        } else if self.is_complement_of(other) {
            Combined::Any
        } else {
            Combined::Both
        }
    }

    fn inverted(&self) -> Self {
        Self {
            value: self.value.clone(),
            negated: !self.negated,
        }
    }

    fn into_constraint(self) -> GenericConstraint {
        GenericConstraint::Extra(self)
    }

    fn into_multi(multi: MultiConstraint<Self>) -> GenericConstraint {
        GenericConstraint::ExtraMulti(multi)
    }
}

impl Display for ExtraConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negated {
            write!(f, "!={}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}
