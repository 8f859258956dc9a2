use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::Itertools;

use crate::{GenericConstraint, hash_unordered};

/// An or-group of constraints, `win32 || linux`.
#[derive(Debug, Clone)]
pub struct UnionConstraint {
    constraints: Vec<GenericConstraint>,
}

impl UnionConstraint {
    /// The constraint allowing what any of `members` allows.
    ///
    /// Nested unions are flattened and duplicates dropped, but members aren't merged with each
    /// other.
    pub fn from_members(members: Vec<GenericConstraint>) -> GenericConstraint {
        let mut constraints: Vec<GenericConstraint> = Vec::with_capacity(members.len());
        for member in members {
            match member {
                GenericConstraint::Any => return GenericConstraint::Any,
                GenericConstraint::Empty => {}
                GenericConstraint::Union(union) => {
                    for nested in union.constraints {
                        push_unique(&mut constraints, nested);
                    }
                }
                member => push_unique(&mut constraints, member),
            }
        }
        Self::collapse(constraints)
    }

    pub(crate) fn single(member: GenericConstraint) -> Self {
        Self {
            constraints: vec![member],
        }
    }

    fn collapse(mut constraints: Vec<GenericConstraint>) -> GenericConstraint {
        match constraints.len() {
            0 => GenericConstraint::Empty,
            1 => constraints.pop().unwrap_or(GenericConstraint::Empty),
            _ => GenericConstraint::Union(Self { constraints }),
        }
    }

    pub fn constraints(&self) -> &[GenericConstraint] {
        &self.constraints
    }

    pub fn allows(&self, value: &str) -> bool {
        self.constraints.iter().any(|member| member.allows(value))
    }

    pub fn allows_extras(&self, is_requested: &impl Fn(&str) -> bool) -> bool {
        self.constraints
            .iter()
            .any(|member| member.allows_extras(is_requested))
    }

    /// Every member of `other` is covered by one of ours.
    pub(crate) fn covers(&self, other: &GenericConstraint) -> bool {
        other.members().iter().all(|theirs| {
            self.constraints
                .iter()
                .any(|ours| ours.covers(theirs))
        })
    }

    pub(crate) fn allows_any(&self, other: &GenericConstraint) -> bool {
        self.constraints.iter().any(|ours| ours.allows_any(other))
    }

    /// `(a or b) and (c or d)` is `(a and c) or (a and d) or (b and c) or (b and d)`.
    pub(crate) fn intersect_members(
        ours: &[GenericConstraint],
        theirs: &[GenericConstraint],
    ) -> GenericConstraint {
        let mut constraints = Vec::new();
        for our in ours {
            for their in theirs {
                let intersection = our.intersect(their);
                if !intersection.is_empty() {
                    push_unique(&mut constraints, intersection);
                }
            }
        }
        Self::from_members(constraints)
    }

    pub(crate) fn union(&self, other: &GenericConstraint) -> GenericConstraint {
        if matches!(
            other,
            GenericConstraint::Multi(_) | GenericConstraint::ExtraMulti(_)
        ) {
            let mut constraints = self.constraints.clone();
            push_unique(&mut constraints, other.clone());
            return Self::collapse(constraints);
        }

        // Pairs that merge into a single term replace both of their sides
        let mut constraints = Vec::new();
        for ours in &self.constraints {
            for theirs in other.members() {
                let union = ours.union(theirs);
                match union {
                    GenericConstraint::Any => return GenericConstraint::Any,
                    GenericConstraint::Constraint(_) | GenericConstraint::Extra(_) => {
                        push_unique(&mut constraints, union);
                    }
                    _ => {
                        push_unique(&mut constraints, ours.clone());
                        push_unique(&mut constraints, theirs.clone());
                    }
                }
            }
        }
        Self::collapse(constraints)
    }

    /// `not (a or b)` is `not-a and not-b`.
    pub(crate) fn invert(&self) -> GenericConstraint {
        self.constraints
            .iter()
            .fold(GenericConstraint::Any, |acc, member| {
                acc.intersect(&member.invert())
            })
    }
}

fn push_unique(constraints: &mut Vec<GenericConstraint>, constraint: GenericConstraint) {
    if !constraints.contains(&constraint) {
        constraints.push(constraint);
    }
}

impl PartialEq for UnionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.constraints.len() == other.constraints.len()
            && self
                .constraints
                .iter()
                .all(|member| other.constraints.contains(member))
    }
}

impl Eq for UnionConstraint {}

impl Hash for UnionConstraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_unordered(&self.constraints, state);
    }
}

impl Display for UnionConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.constraints.iter().join(" || "))
    }
}
