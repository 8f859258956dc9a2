use std::cmp::{Ordering, max};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::{Captures, Regex};
use thiserror::Error;

/// A regex copied from <https://peps.python.org/pep-0440/#appendix-b-parsing-version-strings-with-regular-expressions>
pub(crate) const VERSION_RE_INNER: &str = r"
(?:
    (?:v?)                                            # <https://peps.python.org/pep-0440/#preceding-v-character>
    (?:(?P<epoch>[0-9]+)!)?                           # epoch
    (?P<release>[0-9]+(?:\.[0-9]+)*)                  # release segment
    (?P<pre_field>                                    # pre-release
        [-_\.]?
        (?P<pre_name>(a|b|c|rc|alpha|beta|pre|preview))
        [-_\.]?
        (?P<pre>[0-9]+)?
    )?
    (?P<post_field>                                   # post release
        (?:-(?P<post_old>[0-9]+))
        |
        (?:
            [-_\.]?
            (?P<post_l>post|rev|r)
            [-_\.]?
            (?P<post_new>[0-9]+)?
        )
    )?
    (?P<dev_field>                                    # dev release
        [-_\.]?
        (?P<dev_l>dev)
        [-_\.]?
        (?P<dev>[0-9]+)?
    )?
)
(?:\+(?P<local>[a-z0-9]+(?:[-_\.][a-z0-9]+)*))?       # local version
";

/// Matches a python version, such as `1.19.a1`. Based on the PEP 440 regex
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?xi)^(?:\s*){VERSION_RE_INNER}(?:\s*)$"))
        .expect("the PEP 440 version regex is valid")
});

/// The phase of a [`ReleaseTag`].
///
/// The synonym spellings allowed by PEP 440 are folded into the canonical phases at parse
/// time: `c`, `pre` and `preview` become [`ReleasePhase::Rc`], `r` and `rev` become
/// [`ReleasePhase::Post`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ReleasePhase {
    /// `a`, `alpha`
    Alpha,
    /// `b`, `beta`
    Beta,
    /// `rc`, `c`, `pre`, `preview`
    Rc,
    /// `post`, `rev`, `r`
    Post,
    /// `dev`
    Dev,
}

impl ReleasePhase {
    /// The phase after this one in the `alpha -> beta -> rc` sequence.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Alpha => Some(Self::Beta),
            Self::Beta => Some(Self::Rc),
            Self::Rc | Self::Post | Self::Dev => None,
        }
    }
}

impl FromStr for ReleasePhase {
    type Err = String;

    fn from_str(phase: &str) -> Result<Self, Self::Err> {
        match phase.to_lowercase().as_str() {
            "a" | "alpha" => Ok(Self::Alpha),
            "b" | "beta" => Ok(Self::Beta),
            "c" | "rc" | "pre" | "preview" => Ok(Self::Rc),
            "r" | "rev" | "post" => Ok(Self::Post),
            "dev" => Ok(Self::Dev),
            _ => Err(format!("'{phase}' isn't recognized as a release phase")),
        }
    }
}

impl Display for ReleasePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alpha => write!(f, "a"),
            Self::Beta => write!(f, "b"),
            Self::Rc => write!(f, "rc"),
            Self::Post => write!(f, "post"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// A release phase together with its number, such as the `rc2` in `1.0rc2`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ReleaseTag {
    phase: ReleasePhase,
    number: u64,
}

impl ReleaseTag {
    pub fn new(phase: ReleasePhase, number: u64) -> Self {
        Self { phase, number }
    }

    pub fn phase(&self) -> ReleasePhase {
        self.phase
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// The same phase with the number incremented, `a1` -> `a2`. `None` if the number is
    /// already `u64::MAX`.
    pub fn next(&self) -> Option<Self> {
        Some(Self::new(self.phase, self.number.checked_add(1)?))
    }

    /// The first tag of the following phase, `a3` -> `b0`, or `None` after `rc`.
    pub fn next_phase(&self) -> Option<Self> {
        self.phase.next().map(|phase| Self::new(phase, 0))
    }
}

impl Display for ReleaseTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.phase, self.number)
    }
}

/// A part of the [local version identifier](<https://peps.python.org/pep-0440/#local-version-identifiers>)
///
/// Local versions are a mess:
///
/// > Comparison and ordering of local versions considers each segment of the local version
/// > (divided by a .) separately. If a segment consists entirely of ASCII digits then that section
/// > should be considered an integer for comparison purposes and if a segment contains any ASCII
/// > letters then that segment is compared lexicographically with case insensitivity. When
/// > comparing a numeric and lexicographic segment, the numeric section always compares as greater
/// > than the lexicographic segment. Additionally a local version with a great number of segments
/// > will always compare as greater than a local version with fewer segments, as long as the
/// > shorter local version’s segments match the beginning of the longer local version’s segments
/// > exactly.
///
/// Luckily the default `Ord` implementation for `Vec<LocalSegment>` matches the PEP 440 rules.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum LocalSegment {
    /// Not-parseable as integer segment of local version
    String(String),
    /// Inferred integer segment of local version
    Number(u64),
}

impl LocalSegment {
    fn parse(segment: &str) -> Self {
        if let Ok(number) = segment.parse::<u64>() {
            Self::Number(number)
        } else {
            // "and if a segment contains any ASCII letters then that segment is compared lexicographically with case insensitivity"
            Self::String(segment.to_lowercase())
        }
    }
}

impl Display for LocalSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(string) => write!(f, "{string}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl PartialOrd for LocalSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        // <https://peps.python.org/pep-0440/#local-version-identifiers>
        match (self, other) {
            (Self::Number(n1), Self::Number(n2)) => n1.cmp(n2),
            (Self::String(s1), Self::String(s2)) => s1.cmp(s2),
            (Self::Number(_), Self::String(_)) => Ordering::Greater,
            (Self::String(_), Self::Number(_)) => Ordering::Less,
        }
    }
}

/// An error that occurs when parsing a [`Version`] string fails.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum VersionParseError {
    #[error("Version `{0}` doesn't match PEP 440 rules")]
    NoMatch(String),
    #[error("Couldn't parse '{value}' as number from {field}: {err}")]
    Number {
        value: String,
        field: &'static str,
        #[source]
        err: ParseIntError,
    },
}

/// A version derived from another one, such as the next major version, would need a
/// component beyond `u64::MAX`.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("Can't compute the next version of `{0}`, a component is already at its maximum")]
pub struct VersionOverflowError(String);

/// A version number such as `1.2.3` or `4!5.6.7-a8.post9.dev0`.
///
/// Equality and ordering follow PEP 440: release segments are zero padded (`1.2 == 1.2.0`),
/// `1.0.dev0 < 1.0a1 < 1.0 < 1.0.post1`, and a local version sorts after its public version.
/// The number of explicit release components is kept as [`Version::precision`] and is
/// reproduced by [`Display`], but does not take part in comparisons.
///
/// Parse with [`Version::from_str`].
#[derive(Debug, Clone)]
pub struct Version {
    /// The [versioning epoch](https://peps.python.org/pep-0440/#version-epochs). Normally just 0,
    /// but you can increment it if you switched the versioning scheme.
    epoch: u64,
    /// The normal number part of the version
    /// (["final release"](https://peps.python.org/pep-0440/#final-releases)),
    /// such a `1.2.3` in `4!1.2.3-a8.post9.dev1`. Never empty.
    release: Vec<u64>,
    /// The [prerelease](https://peps.python.org/pep-0440/#pre-releases), i.e. alpha, beta or rc
    /// plus a number
    pre: Option<ReleaseTag>,
    /// The [Post release version](https://peps.python.org/pep-0440/#post-releases),
    /// higher post version are preferred over lower post or none-post versions
    post: Option<u64>,
    /// The [developmental release](https://peps.python.org/pep-0440/#developmental-releases),
    /// if any
    dev: Option<u64>,
    /// A [local version identifier](https://peps.python.org/pep-0440/#local-version-identifiers)
    /// such as `+deadbeef` in `1.2.3+deadbeef`
    local: Option<Vec<LocalSegment>>,
}

impl Version {
    /// Constructor for a version that is just a release such as `3.8`.
    ///
    /// An empty release is treated as `0`.
    pub fn new<I>(release: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut release: Vec<u64> = release.into_iter().collect();
        if release.is_empty() {
            release.push(0);
        }
        Self {
            epoch: 0,
            release,
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    #[must_use]
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Set the pre-release tag. Tags outside of alpha, beta and rc are ignored.
    #[must_use]
    pub fn with_pre(mut self, pre: Option<ReleaseTag>) -> Self {
        self.pre = pre.filter(|tag| {
            matches!(
                tag.phase(),
                ReleasePhase::Alpha | ReleasePhase::Beta | ReleasePhase::Rc
            )
        });
        self
    }

    #[must_use]
    pub fn with_post(mut self, post: Option<u64>) -> Self {
        self.post = post;
        self
    }

    #[must_use]
    pub fn with_dev(mut self, dev: Option<u64>) -> Self {
        self.dev = dev;
        self
    }

    #[must_use]
    pub fn with_local(mut self, local: Option<Vec<LocalSegment>>) -> Self {
        self.local = local;
        self
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<ReleaseTag> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> Option<&[LocalSegment]> {
        self.local.as_deref()
    }

    /// The first release component.
    pub fn major(&self) -> u64 {
        self.release[0]
    }

    /// The second release component, if it was given explicitly.
    pub fn minor(&self) -> Option<u64> {
        self.release.get(1).copied()
    }

    /// The third release component, if it was given explicitly.
    pub fn patch(&self) -> Option<u64> {
        self.release.get(2).copied()
    }

    /// The number of explicit release components, e.g. 2 for `1.0` and 3 for `1.0.0`.
    pub fn precision(&self) -> usize {
        self.release.len()
    }

    /// Whether this is an alpha/beta/rc version
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// Whether this is a post version
    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// Whether this is a dev version
    pub fn is_devrelease(&self) -> bool {
        self.dev.is_some()
    }

    /// Whether this is a local version (e.g. `1.2.3+localsuffixesareweird`)
    pub fn is_local(&self) -> bool {
        self.local.is_some()
    }

    /// Neither a pre-release nor a dev release. Post and local versions are stable.
    pub fn is_stable(&self) -> bool {
        self.pre.is_none() && self.dev.is_none()
    }

    pub fn is_unstable(&self) -> bool {
        !self.is_stable()
    }

    /// No pre, post or dev tag at all.
    pub fn is_no_suffix_release(&self) -> bool {
        self.pre.is_none() && self.post.is_none() && self.dev.is_none()
    }

    fn from_parts(epoch: u64, release: Vec<u64>) -> Self {
        Self::new(release).with_epoch(epoch)
    }

    /// Increment the release component at `index`, zero every component after it and drop all
    /// tags. The result has at least `index + 1` components.
    ///
    /// `1.2.3.bump(0) == 2.0.0`, `1.2.3.bump(3) == 1.2.3.1`.
    pub fn bump(&self, index: usize) -> Result<Self, VersionOverflowError> {
        let len = max(self.release.len(), index + 1);
        let release = (0..len)
            .map(|i| {
                let component = self.release.get(i).copied().unwrap_or_default();
                match i.cmp(&index) {
                    Ordering::Less => Some(component),
                    Ordering::Equal => component.checked_add(1),
                    Ordering::Greater => Some(0),
                }
            })
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(|| self.overflow())?;
        Ok(Self::from_parts(self.epoch, release))
    }

    fn overflow(&self) -> VersionOverflowError {
        VersionOverflowError(self.to_string())
    }

    /// Bump at `index`, unless this is a pre or dev release of a version whose components
    /// after `index` are all zero, in which case that release is already the next one.
    fn next_at(&self, index: usize) -> Result<Self, VersionOverflowError> {
        let lower_is_zero = self.release.iter().skip(index + 1).all(|x| *x == 0);
        if self.is_unstable() && lower_is_zero {
            Ok(Self::from_parts(self.epoch, self.release.clone()))
        } else {
            self.bump(index)
        }
    }

    /// `1.2.3` -> `2.0.0`, `1.2a1` -> `2.0`, `1.a1` -> `1`.
    pub fn next_major(&self) -> Result<Self, VersionOverflowError> {
        self.next_at(0)
    }

    /// `1.2.3` -> `1.3.0`, `1` -> `1.1`, `1.2a1` -> `1.2`.
    pub fn next_minor(&self) -> Result<Self, VersionOverflowError> {
        self.next_at(1)
    }

    /// `1.2.3` -> `1.2.4`, `1` -> `1.0.1`, `1.2.3a1` -> `1.2.3`.
    pub fn next_patch(&self) -> Result<Self, VersionOverflowError> {
        self.next_at(2)
    }

    /// The release this version leads up to, keeping the post tag of a final release.
    ///
    /// `1.2.3a1.post2` -> `1.2.3`, `1.post1.dev0` -> `1.post1`.
    #[must_use]
    pub fn stable(&self) -> Self {
        if self.is_stable() {
            return self.clone();
        }
        let post = if self.pre.is_none() { self.post } else { None };
        Self::from_parts(self.epoch, self.release.clone()).with_post(post)
    }

    /// The first version that is not compatible under semver-style caret rules.
    ///
    /// For `0.x` versions the first non-zero component is the breaking one, and the precision
    /// of the release is preserved: `1.2.3` -> `2.0.0`, `0.2.3` -> `0.3.0`, `0.0.3` -> `0.0.4`,
    /// `0.0` -> `0.1`, `0` -> `1`.
    pub fn next_breaking(&self) -> Result<Self, VersionOverflowError> {
        let stable = self.stable();
        if self.major() > 0 || self.minor().is_none() {
            return stable.next_major();
        }
        if self.minor().is_some_and(|minor| minor > 0) || self.patch().is_none() {
            return stable.next_minor();
        }
        stable.next_patch()
    }

    /// Bump the last release component of a stable version, keeping the local segment.
    ///
    /// An unstable version is lead up to its stable release instead: `1.dev4` -> `1`.
    pub fn next_stable(&self) -> Result<Self, VersionOverflowError> {
        let mut release = self.release.clone();
        if self.is_stable()
            && let Some(last) = release.last_mut()
        {
            *last = last.checked_add(1).ok_or_else(|| self.overflow())?;
        }
        Ok(Self::from_parts(self.epoch, release).with_local(self.local.clone()))
    }

    /// `1.2a1` -> `1.2a2`, `1.2a1.dev0` -> `1.2a1`, `1.2.dev0` -> `1.2a0`.
    pub fn next_prerelease(&self) -> Result<Self, VersionOverflowError> {
        let pre = match self.pre {
            Some(pre) if !self.is_devrelease() || self.is_postrelease() => {
                pre.next().ok_or_else(|| self.overflow())?
            }
            Some(pre) => pre,
            None => ReleaseTag::new(ReleasePhase::Alpha, 0),
        };
        Ok(Self::from_parts(self.epoch, self.release.clone()).with_pre(Some(pre)))
    }

    /// `1` -> `1.post0`, `1.post1` -> `1.post2`, `1.post1.dev0` -> `1.post1`.
    pub fn next_postrelease(&self) -> Result<Self, VersionOverflowError> {
        let post = match self.post {
            Some(post) if !self.is_devrelease() => {
                post.checked_add(1).ok_or_else(|| self.overflow())?
            }
            Some(post) => post,
            None => 0,
        };
        Ok(Self::from_parts(self.epoch, self.release.clone())
            .with_pre(self.pre)
            .with_post(Some(post)))
    }

    /// `1.dev0` -> `1.dev1`, `1a1` -> `1a1.dev0`.
    pub fn next_devrelease(&self) -> Result<Self, VersionOverflowError> {
        let dev = match self.dev {
            Some(dev) => dev.checked_add(1).ok_or_else(|| self.overflow())?,
            None => 0,
        };
        Ok(Self::from_parts(self.epoch, self.release.clone())
            .with_pre(self.pre)
            .with_post(self.post)
            .with_dev(Some(dev)))
    }

    /// The smallest pre-release of this release, `1.2.3` -> `1.2.3a0`.
    #[must_use]
    pub fn first_prerelease(&self) -> Self {
        Self::from_parts(self.epoch, self.release.clone())
            .with_pre(Some(ReleaseTag::new(ReleasePhase::Alpha, 0)))
    }

    /// The smallest dev release of this version, `1.2.3` -> `1.2.3.dev0`, `1a1` -> `1a1.dev0`.
    #[must_use]
    pub fn first_devrelease(&self) -> Self {
        Self::from_parts(self.epoch, self.release.clone())
            .with_pre(self.pre)
            .with_post(self.post)
            .with_dev(Some(0))
    }

    #[must_use]
    pub fn without_local(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }

    /// Drop the post tag together with the dev tag that hangs off it. The local segment is
    /// kept.
    #[must_use]
    pub fn without_postrelease(&self) -> Self {
        if self.is_postrelease() {
            Self {
                post: None,
                dev: None,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }

    #[must_use]
    pub fn without_devrelease(&self) -> Self {
        Self {
            dev: None,
            ..self.clone()
        }
    }
}

/// Shows normalized version
impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        write!(f, "{}", self.release.iter().join("."))?;
        if let Some(pre) = self.pre {
            write!(f, "{pre}")?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{dev}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{}", local.iter().join("."))?;
        }
        Ok(())
    }
}

/// Compare the release parts of two versions, e.g. `4.3.1` > `4.2`, `1.1.0` == `1.1` and
/// `1.16` < `1.19`
pub(crate) fn compare_release(this: &[u64], other: &[u64]) -> Ordering {
    // "When comparing release segments with different numbers of components, the shorter segment
    // is padded out with additional zeros as necessary"
    let len = max(this.len(), other.len());
    this.iter()
        .chain(iter::repeat(&0))
        .zip(other.iter().chain(iter::repeat(&0)))
        .take(len)
        .map(|(this, other)| this.cmp(other))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Compare the parts attached after the release, given equal release
///
/// According to <https://peps.python.org/pep-0440/#summary-of-permitted-suffixes-and-relative-ordering>
/// the order of pre/post-releases is:
/// .devN, aN, bN, rcN, <no suffix (final)>, .postN
/// but also, you can have dev/post releases on beta releases, so we make a three stage ordering:
/// ({dev: 0, a: 1, b: 2, rc: 3, (): 4, post: 5}, <preN>, <postN or None as smallest>, <devN or none as largest>, <local>)
///
/// For post, any number is better than none (so None defaults to None<0), but for dev, no number
/// is better (see [`DevKey`]). For local the Option<Vec<T>> luckily already has the correct default
/// Ord implementation
fn sortable_tuple(version: &Version) -> (u64, u64, Option<u64>, DevKey, Option<&[LocalSegment]>) {
    let local = version.local.as_deref();
    let dev = version.dev.map_or(DevKey::Final, DevKey::Dev);
    match (version.pre, version.post, version.dev) {
        // dev release
        (None, None, Some(_)) => (0, 0, None, dev, local),
        (Some(pre), post, _) => {
            let rank = match pre.phase() {
                ReleasePhase::Alpha => 1,
                ReleasePhase::Beta => 2,
                // `with_pre` keeps post and dev phases out of `pre`
                ReleasePhase::Rc | ReleasePhase::Post | ReleasePhase::Dev => 3,
            };
            (rank, pre.number(), post, dev, local)
        }
        // final release
        (None, None, None) => (4, 0, None, dev, local),
        // post release
        (None, Some(post), _) => (5, 0, Some(post), dev, local),
    }
}

/// The dev part of the sort key: every dev release sorts before the same version without one.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum DevKey {
    Dev(u64),
    Final,
}

impl PartialEq<Self> for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    /// Custom implementation to ignoring trailing zero because `PartialEq` zero pads
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        // Skip trailing zeros
        for i in self.release.iter().rev().skip_while(|x| **x == 0) {
            i.hash(state);
        }
        self.pre.hash(state);
        self.dev.hash(state);
        self.post.hash(state);
        self.local.hash(state);
    }
}

impl PartialOrd<Self> for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    /// 1.0.dev456 < 1.0a1 < 1.0a2.dev456 < 1.0a12.dev456 < 1.0a12 < 1.0b1.dev456 < 1.0b2
    /// < 1.0b2.post345.dev456 < 1.0b2.post345 < 1.0b2-346 < 1.0c1.dev456 < 1.0c1 < 1.0rc2 < 1.0c3
    /// < 1.0 < 1.0.post456.dev34 < 1.0.post456
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| sortable_tuple(self).cmp(&sortable_tuple(other)))
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses a version such as `1.19`, `1.0a1`,`1.0+abc.5` or `1!2012.2`
    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_RE
            .captures(version)
            .ok_or_else(|| VersionParseError::NoMatch(version.to_string()))?;
        Self::parse_impl(&captures)
    }
}

impl Version {
    fn parse_impl(captures: &Captures) -> Result<Self, VersionParseError> {
        let number_field = |field: &'static str| {
            captures
                .name(field)
                .map(|value| {
                    value
                        .as_str()
                        .parse::<u64>()
                        .map_err(|err| VersionParseError::Number {
                            value: value.as_str().to_string(),
                            field,
                            err,
                        })
                })
                .transpose()
        };
        // "If no explicit epoch is given, the implicit epoch is 0"
        let epoch = number_field("epoch")?.unwrap_or_default();
        let pre = captures
            .name("pre_name")
            .and_then(|pre| ReleasePhase::from_str(pre.as_str()).ok())
            .map(|phase| -> Result<ReleaseTag, VersionParseError> {
                // <https://peps.python.org/pep-0440/#implicit-pre-release-number>
                Ok(ReleaseTag::new(phase, number_field("pre")?.unwrap_or_default()))
            })
            .transpose()?;
        let post = if captures.name("post_field").is_some() {
            // A bare `-N` is the implicit post release spelling
            Some(
                number_field("post_new")?
                    .or(number_field("post_old")?)
                    .unwrap_or_default(),
            )
        } else {
            None
        };
        let dev = if captures.name("dev_field").is_some() {
            // <https://peps.python.org/pep-0440/#implicit-development-release-number>
            Some(number_field("dev")?.unwrap_or_default())
        } else {
            None
        };
        let local = captures.name("local").map(|local| {
            local
                .as_str()
                .split(['-', '_', '.'])
                .map(LocalSegment::parse)
                .collect()
        });
        let release = captures
            .name("release")
            .map(|release| release.as_str())
            .unwrap_or_default()
            .split('.')
            .map(|segment| {
                segment
                    .parse::<u64>()
                    .map_err(|err| VersionParseError::Number {
                        value: segment.to_string(),
                        field: "release",
                        err,
                    })
            })
            .collect::<Result<Vec<u64>, _>>()?;

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

/// <https://github.com/serde-rs/serde/issues/1316#issue-332908452>
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests;
