use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::Itertools;

use crate::term::{Combined, Term};
use crate::{Constraint, ExtraConstraint, GenericConstraint, UnionConstraint, hash_unordered};

/// An and-group of terms, `!=win32, !=linux`.
///
/// Equality ignores the order of the terms, display keeps it.
#[derive(Debug, Clone)]
pub struct MultiConstraint<T = Constraint> {
    terms: Vec<T>,
}

/// An and-group of extra terms, `==security, !=tests`.
pub type ExtraMultiConstraint = MultiConstraint<ExtraConstraint>;

impl<T: Term> MultiConstraint<T> {
    /// Group `terms` without simplifying them. Duplicates are dropped.
    pub fn new(terms: impl IntoIterator<Item = T>) -> Self {
        let mut unique: Vec<T> = Vec::new();
        for term in terms {
            if !unique.contains(&term) {
                unique.push(term);
            }
        }
        Self { terms: unique }
    }

    pub fn constraints(&self) -> &[T] {
        &self.terms
    }

    /// The constraint allowing what all of `terms` allow, collapsed to a plain term if only
    /// one is left.
    pub(crate) fn from_terms(terms: Vec<T>) -> GenericConstraint {
        match terms.len() {
            0 => GenericConstraint::Any,
            1 => terms
                .into_iter()
                .next()
                .map_or(GenericConstraint::Any, Term::into_constraint),
            _ => T::into_multi(Self::new(terms)),
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        self.terms.iter().all(|term| term.allows(value))
    }

    pub(crate) fn allows_all_term(&self, term: &T) -> bool {
        self.terms.iter().all(|ours| ours.allows_all_term(term))
    }

    /// Every term of ours is implied by a term of theirs.
    pub(crate) fn allows_all_multi(&self, other: &Self) -> bool {
        self.terms
            .iter()
            .all(|ours| other.terms.iter().any(|theirs| ours.allows_all_term(theirs)))
    }

    /// Whether `term` is implied by all of our terms.
    pub(crate) fn is_allowed_by_term(&self, term: &T) -> bool {
        self.terms.iter().any(|ours| term.allows_all_term(ours))
    }

    pub(crate) fn allows_any_term(&self, term: &T) -> bool {
        self.terms.iter().all(|ours| ours.allows_any_term(term))
    }

    pub(crate) fn allows_any_multi(&self, other: &Self) -> bool {
        other.terms.iter().all(|theirs| self.allows_any_term(theirs))
    }

    /// Add `term` to the group, dropping terms it implies or that imply it.
    pub(crate) fn intersect_term(&self, term: &T) -> GenericConstraint {
        let mut terms = Vec::with_capacity(self.terms.len() + 1);
        let mut absorbed = false;
        for ours in &self.terms {
            match ours.intersect_term(term) {
                Combined::Empty => return GenericConstraint::Empty,
                Combined::One(combined) if combined == *ours => {
                    terms.push(combined);
                    absorbed = true;
                }
                // `term` is at least as strict as `ours`
                Combined::One(_) => {}
                Combined::Both | Combined::Any => terms.push(ours.clone()),
            }
        }
        if !absorbed {
            terms.push(term.clone());
        }
        Self::from_terms(terms)
    }

    pub(crate) fn intersect_multi(&self, other: &Self) -> GenericConstraint {
        let mut result = T::into_multi(self.clone());
        for term in &other.terms {
            result = result.intersect(&term.clone().into_constraint());
            if result.is_empty() {
                break;
            }
        }
        result
    }

    pub(crate) fn union_term(&self, term: &T) -> GenericConstraint {
        if self.is_allowed_by_term(term) {
            return term.clone().into_constraint();
        }
        if self.allows_all_term(term) {
            return T::into_multi(self.clone());
        }

        // `(a and b) or not-b` is `a or not-b`
        let inverted = term.inverted();
        let rest: Vec<T> = self
            .terms
            .iter()
            .filter(|ours| !ours.allows_all_term(&inverted))
            .cloned()
            .collect();
        if rest.len() < self.terms.len() {
            return Self::from_terms(rest).union(&term.clone().into_constraint());
        }

        UnionConstraint::from_members(vec![
            T::into_multi(self.clone()),
            term.clone().into_constraint(),
        ])
    }

    pub(crate) fn union_multi(&self, other: &Self) -> GenericConstraint {
        if self.allows_all_multi(other) {
            return T::into_multi(self.clone());
        }
        if other.allows_all_multi(self) {
            return T::into_multi(other.clone());
        }

        // `ours or (a and b)` is `(ours or a) and (ours or b)`, as long as each side stays
        // simple
        let mut result = GenericConstraint::Any;
        for term in &other.terms {
            let union = self.union_term(term);
            if matches!(union, GenericConstraint::Union(_)) {
                return UnionConstraint::from_members(vec![
                    T::into_multi(self.clone()),
                    T::into_multi(other.clone()),
                ]);
            }
            result = result.intersect(&union);
        }
        result
    }

    /// `not (a and b)` is `not-a or not-b`.
    pub(crate) fn invert(&self) -> GenericConstraint {
        UnionConstraint::from_members(
            self.terms
                .iter()
                .map(|term| term.inverted().into_constraint())
                .collect(),
        )
    }
}

impl MultiConstraint<ExtraConstraint> {
    pub fn allows_extras(&self, is_requested: &impl Fn(&str) -> bool) -> bool {
        self.terms
            .iter()
            .all(|term| term.allows_extras(is_requested))
    }
}

impl<T: Term> PartialEq for MultiConstraint<T> {
    fn eq(&self, other: &Self) -> bool {
        self.terms.len() == other.terms.len()
            && self.terms.iter().all(|term| other.terms.contains(term))
    }
}

impl<T: Term> Eq for MultiConstraint<T> {}

impl<T: Term> Hash for MultiConstraint<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_unordered(&self.terms, state);
    }
}

impl<T: Term> Display for MultiConstraint<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.terms.iter().join(", "))
    }
}
