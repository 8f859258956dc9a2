use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use itertools::Itertools;
use rustc_hash::FxHasher;
use tracing::trace;

use crate::{MarkerEnvironment, MarkerError, SingleMarker, parse_marker};

/// A marker expression in simplified form.
///
/// Markers are built by [`parse_marker`] or by combining other markers, and every constructor
/// keeps them normalized: and-groups never directly contain and-groups, unions never directly
/// contain unions, and neither contains [`Marker::Any`] or [`Marker::Empty`].
///
/// Equality is structural but ignores the order of members in and-groups and unions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Holds in every environment, written as the empty string.
    Any,
    /// Holds in no environment, `<empty>`.
    Empty,
    Single(SingleMarker),
    /// `a and b`
    Multi(MultiMarker),
    /// `a or b`
    Union(MarkerUnion),
}

impl Marker {
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The marker that holds where both `self` and `other` hold.
    ///
    /// Unions are distributed, `(a or b) and c` becomes `a and c or b and c`.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Union(union), _) => {
                MarkerUnion::of(union.markers.iter().map(|marker| marker.intersect(other)))
            }
            (_, Self::Union(union)) => {
                MarkerUnion::of(union.markers.iter().map(|marker| self.intersect(marker)))
            }
            _ => MultiMarker::of([self.clone(), other.clone()]),
        }
    }

    /// The marker that holds where `self` or `other` holds.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        MarkerUnion::of([self.clone(), other.clone()])
    }

    #[must_use]
    pub fn invert(&self) -> Self {
        match self {
            Self::Any => Self::Empty,
            Self::Empty => Self::Any,
            Self::Single(single) => single.invert(),
            Self::Multi(multi) => MarkerUnion::of(multi.markers.iter().map(Self::invert)),
            Self::Union(union) => MultiMarker::of(union.markers.iter().map(Self::invert)),
        }
    }

    /// Whether every environment matching `self` also matches `other`.
    ///
    /// This is a structural check: `true` is always right, but some subsets aren't recognized.
    pub fn is_subset(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Any) | (Self::Empty, _) => true,
            (Self::Any, _) | (_, Self::Empty) => false,
            (Self::Union(union), _) => union.markers.iter().all(|marker| marker.is_subset(other)),
            (_, Self::Multi(multi)) => multi.markers.iter().all(|marker| self.is_subset(marker)),
            (Self::Single(ours), Self::Single(theirs)) => {
                ours.name() == theirs.name() && theirs.constraint().allows_all(ours.constraint())
            }
            (Self::Multi(multi), Self::Single(_)) => {
                multi.markers.iter().any(|marker| marker.is_subset(other))
            }
            (Self::Single(_), Self::Union(union)) => {
                union.markers.iter().any(|marker| self.is_subset(marker))
            }
            (Self::Multi(multi), Self::Union(union)) => {
                union.markers.iter().any(|marker| self.is_subset(marker))
                    || multi.markers.iter().any(|marker| marker.is_subset(other))
            }
        }
    }

    /// Evaluate the marker, in the environment of the running process if none is given.
    pub fn validate(&self, environment: Option<&MarkerEnvironment>) -> bool {
        match environment {
            Some(environment) => self.evaluate(environment),
            None => self.evaluate(&MarkerEnvironment::current()),
        }
    }

    fn evaluate(&self, environment: &MarkerEnvironment) -> bool {
        match self {
            Self::Any => true,
            Self::Empty => false,
            Self::Single(single) => single.evaluate(environment),
            Self::Multi(multi) => multi
                .markers
                .iter()
                .all(|marker| marker.evaluate(environment)),
            Self::Union(union) => union
                .markers
                .iter()
                .any(|marker| marker.evaluate(environment)),
        }
    }

    /// The marker with all terms on `name` removed, as if they always held.
    #[must_use]
    pub fn exclude(&self, name: &str) -> Self {
        match self {
            Self::Single(single) if single.name() == name => Self::Any,
            Self::Multi(multi) => MultiMarker::of(
                multi
                    .markers
                    .iter()
                    .filter(|marker| !marker.references_only(name))
                    .map(|marker| marker.exclude(name)),
            ),
            Self::Union(union) => {
                let markers = union
                    .markers
                    .iter()
                    .filter(|marker| !marker.references_only(name))
                    .map(|marker| marker.exclude(name))
                    .collect::<Vec<_>>();
                if markers.is_empty() {
                    Self::Any
                } else {
                    MarkerUnion::of(markers)
                }
            }
            _ => self.clone(),
        }
    }

    /// The marker with only the terms on `names` kept, all other terms hold.
    #[must_use]
    pub fn only(&self, names: &[&str]) -> Self {
        match self {
            Self::Single(single) if !names.contains(&single.name()) => Self::Any,
            Self::Multi(multi) => {
                MultiMarker::of(multi.markers.iter().map(|marker| marker.only(names)))
            }
            Self::Union(union) => {
                MarkerUnion::of(union.markers.iter().map(|marker| marker.only(names)))
            }
            _ => self.clone(),
        }
    }

    /// The marker with all `extra` terms removed.
    #[must_use]
    pub fn without_extras(&self) -> Self {
        self.exclude("extra")
    }

    fn references_only(&self, name: &str) -> bool {
        match self {
            Self::Any | Self::Empty => false,
            Self::Single(single) => single.name() == name,
            Self::Multi(multi) => multi
                .markers
                .iter()
                .all(|marker| marker.references_only(name)),
            Self::Union(union) => union
                .markers
                .iter()
                .all(|marker| marker.references_only(name)),
        }
    }

    /// The members of an and-group, or the marker itself.
    fn conjuncts(&self) -> &[Self] {
        match self {
            Self::Multi(multi) => &multi.markers,
            _ => std::slice::from_ref(self),
        }
    }
}

impl From<SingleMarker> for Marker {
    /// A term that allows every or no value is [`Marker::Any`] or [`Marker::Empty`].
    fn from(single: SingleMarker) -> Self {
        if single.constraint().is_any() {
            Self::Any
        } else if single.constraint().is_empty() {
            Self::Empty
        } else {
            Self::Single(single)
        }
    }
}

impl FromStr for Marker {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_marker(s)
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => Ok(()),
            Self::Empty => f.write_str("<empty>"),
            Self::Single(single) => Display::fmt(single, f),
            Self::Multi(multi) => Display::fmt(multi, f),
            Self::Union(union) => Display::fmt(union, f),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Marker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        parse_marker(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Marker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Two or more markers that must all hold, `python_version >= "3.8" and sys_platform == "linux"`.
#[derive(Debug, Clone)]
pub struct MultiMarker {
    markers: Vec<Marker>,
}

impl MultiMarker {
    /// The simplified and-group of `markers`.
    ///
    /// Terms on the same name are merged where the result is a single term, contradictions
    /// collapse to [`Marker::Empty`] and members implied by another member are dropped.
    pub fn of(markers: impl IntoIterator<Item = Marker>) -> Marker {
        let mut flattened = Vec::new();
        for marker in markers {
            match marker {
                Marker::Any => {}
                Marker::Empty => return Marker::Empty,
                Marker::Multi(multi) => flattened.extend(multi.markers),
                marker => flattened.push(marker),
            }
        }

        let mut markers = flattened;
        'simplify: loop {
            for (i, j) in (0..markers.len()).tuple_combinations() {
                match intersect_pair(&markers[i], &markers[j]) {
                    Pair::Keep => {}
                    Pair::Absorbing => {
                        trace!(
                            "`{}` and `{}` contradict each other",
                            markers[i], markers[j]
                        );
                        return Marker::Empty;
                    }
                    Pair::One(merged) => {
                        trace!(
                            "Simplified `{}` and `{}` to `{merged}`",
                            markers[i], markers[j]
                        );
                        markers.remove(j);
                        match merged {
                            Marker::Any => {
                                markers.remove(i);
                            }
                            Marker::Empty => return Marker::Empty,
                            Marker::Multi(multi) => {
                                markers.remove(i);
                                markers.extend(multi.markers);
                            }
                            merged => markers[i] = merged,
                        }
                        continue 'simplify;
                    }
                    // And-groups don't replace members pairwise
                    Pair::Both(..) => {}
                }
            }
            break;
        }

        match markers.len() {
            0 => Marker::Any,
            1 => markers.pop().unwrap_or(Marker::Any),
            _ => Marker::Multi(Self { markers }),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

impl PartialEq for MultiMarker {
    fn eq(&self, other: &Self) -> bool {
        same_members(&self.markers, &other.markers)
    }
}

impl Eq for MultiMarker {}

impl Hash for MultiMarker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_unordered(&self.markers, state);
    }
}

impl Display for MultiMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let members = self
            .markers
            .iter()
            .format_with(" and ", |marker, write| match marker {
                Marker::Union(union) => write(&format_args!("({union})")),
                marker => write(marker),
            });
        write!(f, "{members}")
    }
}

/// Two or more markers of which at least one must hold, `sys_platform == "win32" or extra == "x"`.
#[derive(Debug, Clone)]
pub struct MarkerUnion {
    markers: Vec<Marker>,
}

impl MarkerUnion {
    /// The simplified union of `markers`.
    pub fn of(markers: impl IntoIterator<Item = Marker>) -> Marker {
        let mut flattened = Vec::new();
        for marker in markers {
            match marker {
                Marker::Empty => {}
                Marker::Any => return Marker::Any,
                Marker::Union(union) => flattened.extend(union.markers),
                marker => flattened.push(marker),
            }
        }

        let mut markers = flattened;
        'simplify: loop {
            for (i, j) in (0..markers.len()).tuple_combinations() {
                let replacements = match union_pair(&markers[i], &markers[j]) {
                    Pair::Keep => continue,
                    Pair::Absorbing => {
                        trace!("`{}` or `{}` always holds", markers[i], markers[j]);
                        return Marker::Any;
                    }
                    Pair::One(merged) => {
                        trace!(
                            "Simplified `{}` or `{}` to `{merged}`",
                            markers[i], markers[j]
                        );
                        markers.remove(j);
                        vec![(i, merged)]
                    }
                    Pair::Both(first, second) => {
                        trace!(
                            "Simplified `{}` or `{}` to `{first}` or `{second}`",
                            markers[i], markers[j]
                        );
                        vec![(i, first), (j, second)]
                    }
                };
                for (index, marker) in replacements {
                    markers[index] = marker;
                }
                if markers.iter().any(Marker::is_any) {
                    return Marker::Any;
                }
                markers.retain(|marker| !marker.is_empty());
                continue 'simplify;
            }
            break;
        }

        match markers.len() {
            0 => Marker::Empty,
            1 => markers.pop().unwrap_or(Marker::Empty),
            _ => Marker::Union(Self { markers }),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

impl PartialEq for MarkerUnion {
    fn eq(&self, other: &Self) -> bool {
        same_members(&self.markers, &other.markers)
    }
}

impl Eq for MarkerUnion {}

impl Hash for MarkerUnion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_unordered(&self.markers, state);
    }
}

impl Display for MarkerUnion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.markers.iter().join(" or "))
    }
}

/// How two members of an and-group or a union combine.
enum Pair {
    /// Nothing to simplify.
    Keep,
    /// The pair is empty (in an and-group) or any (in a union).
    Absorbing,
    /// The pair is equivalent to a single marker.
    One(Marker),
    /// The pair is equivalent to two simpler markers.
    Both(Marker, Marker),
}

fn intersect_pair(a: &Marker, b: &Marker) -> Pair {
    if a == b {
        return Pair::One(a.clone());
    }

    match (a, b) {
        (Marker::Single(ours), Marker::Single(theirs)) if ours.name() == theirs.name() => {
            let Some(constraint) = ours.constraint().intersect(theirs.constraint()) else {
                return Pair::Keep;
            };
            if constraint.is_empty() {
                return Pair::Absorbing;
            }
            if constraint == *ours.constraint() {
                return Pair::One(a.clone());
            }
            if constraint == *theirs.constraint() {
                return Pair::One(b.clone());
            }
            return match SingleMarker::from_constraint(ours.name(), &constraint) {
                Some(single) => Pair::One(Marker::from(single)),
                None => Pair::Keep,
            };
        }
        // A union narrowed by a term to a single term replaces both
        (Marker::Union(_), Marker::Single(_)) | (Marker::Single(_), Marker::Union(_)) => {
            match a.intersect(b) {
                Marker::Empty => return Pair::Absorbing,
                narrowed @ Marker::Single(_) => return Pair::One(narrowed),
                _ => {}
            }
        }
        _ => {}
    }

    if a.is_subset(b) {
        Pair::One(a.clone())
    } else if b.is_subset(a) {
        Pair::One(b.clone())
    } else {
        Pair::Keep
    }
}

fn union_pair(a: &Marker, b: &Marker) -> Pair {
    if a == b {
        return Pair::One(a.clone());
    }

    if let (Marker::Single(ours), Marker::Single(theirs)) = (a, b) {
        if ours.name() == theirs.name() {
            let Some(constraint) = ours.constraint().union(theirs.constraint()) else {
                return Pair::Keep;
            };
            if constraint.is_any() {
                return Pair::Absorbing;
            }
            if constraint == *ours.constraint() {
                return Pair::One(a.clone());
            }
            if constraint == *theirs.constraint() {
                return Pair::One(b.clone());
            }
            return match SingleMarker::from_constraint(ours.name(), &constraint) {
                Some(single) => Pair::One(Marker::from(single)),
                None => Pair::Keep,
            };
        }
    }

    if let Marker::Multi(theirs) = b {
        if let Some(reduced) = drop_complement(a, theirs) {
            return Pair::Both(a.clone(), reduced);
        }
    }
    if let Marker::Multi(ours) = a {
        if let Some(reduced) = drop_complement(b, ours) {
            return Pair::Both(reduced, b.clone());
        }
    }

    if let (Marker::Multi(ours), Marker::Multi(theirs)) = (a, b) {
        if let Some(merged) = factor_out(ours, theirs) {
            return Pair::One(merged);
        }
    }

    if a.is_subset(b) {
        Pair::One(b.clone())
    } else if b.is_subset(a) {
        Pair::One(a.clone())
    } else {
        Pair::Keep
    }
}

/// `(c and x) or (c and t and d)` is `(c and x) or (c and d)` when `x or t` always holds.
///
/// Returns the reduced `multi`.
fn drop_complement(marker: &Marker, multi: &MultiMarker) -> Option<Marker> {
    let mut unshared = marker
        .conjuncts()
        .iter()
        .filter(|member| !multi.markers.contains(member));
    let (Some(Marker::Single(term)), None) = (unshared.next(), unshared.next()) else {
        return None;
    };
    let complement = multi.markers.iter().position(|member| {
        let Marker::Single(member) = member else {
            return false;
        };
        member.name() == term.name()
            && term
                .constraint()
                .union(member.constraint())
                .is_some_and(|union| union.is_any())
    })?;
    Some(MultiMarker::of(
        multi
            .markers
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != complement)
            .map(|(_, member)| member.clone()),
    ))
}

/// `(c and x) or (c and y)` is `c and (x or y)` if `x or y` is not a union.
fn factor_out(ours: &MultiMarker, theirs: &MultiMarker) -> Option<Marker> {
    if ours.markers.len() != theirs.markers.len() {
        return None;
    }
    let (x, y) = (
        ours.markers
            .iter()
            .filter(|member| !theirs.markers.contains(member))
            .exactly_one()
            .ok()?,
        theirs
            .markers
            .iter()
            .filter(|member| !ours.markers.contains(member))
            .exactly_one()
            .ok()?,
    );
    let merged = x.union(y);
    if matches!(merged, Marker::Union(_)) {
        return None;
    }
    Some(MultiMarker::of(ours.markers.iter().map(|member| {
        if member == x {
            merged.clone()
        } else {
            member.clone()
        }
    })))
}

fn same_members(ours: &[Marker], theirs: &[Marker]) -> bool {
    ours.len() == theirs.len() && ours.iter().all(|marker| theirs.contains(marker))
}

/// Hash a set of members independently of their order.
fn hash_unordered<H: Hasher>(markers: &[Marker], state: &mut H) {
    let combined = markers.iter().fold(0u64, |combined, marker| {
        let mut hasher = FxHasher::default();
        marker.hash(&mut hasher);
        combined ^ hasher.finish()
    });
    state.write_usize(markers.len());
    state.write_u64(combined);
}
