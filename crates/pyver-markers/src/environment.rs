use std::collections::{BTreeMap, BTreeSet};

use pyver_normalize::ExtraName;

/// Legacy dotted spellings and their canonical marker names.
const ALIASES: &[(&str, &str)] = &[
    ("os.name", "os_name"),
    ("sys.platform", "sys_platform"),
    ("platform.version", "platform_version"),
    ("platform.machine", "platform_machine"),
    ("platform.python_implementation", "platform_python_implementation"),
    ("python_implementation", "platform_python_implementation"),
];

/// Every name a marker may compare against, after resolving aliases.
pub(crate) const MARKER_NAMES: &[&str] = &[
    "extra",
    "implementation_name",
    "implementation_version",
    "os_name",
    "platform_machine",
    "platform_python_implementation",
    "platform_release",
    "platform_system",
    "platform_version",
    "python_full_version",
    "python_version",
    "sys_platform",
];

/// The canonical spelling of a marker name, `os.name` is `os_name`.
pub(crate) fn canonical_name(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| *canonical)
}

/// Whether values of `name` are PEP 440 versions rather than plain strings.
pub(crate) fn is_version_name(name: &str) -> bool {
    matches!(name, "python_version" | "python_full_version")
}

/// Whether ordering comparisons on `name` compare versions, such as
/// `platform_release >= "9.0"`. Equality on these names stays a plain string comparison.
pub(crate) fn is_version_like_name(name: &str) -> bool {
    is_version_name(name) || name == "platform_release"
}

/// The values markers are evaluated against, such as `sys_platform = "linux"`, and the requested
/// extras.
///
/// Unlike a full interpreter description, any key may be missing: a marker term on a missing key
/// doesn't hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MarkerEnvironment {
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    extras: Option<BTreeSet<ExtraName>>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    values: BTreeMap<String, String>,
}

impl MarkerEnvironment {
    /// An environment without any values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`. Legacy names such as `os.name` are accepted.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(canonical_name(name).to_string(), value.into());
        self
    }

    /// Set the requested extras. An empty set means that no extra was requested, which is
    /// different from not knowing the extras at all.
    #[must_use]
    pub fn with_extras(mut self, extras: impl IntoIterator<Item = ExtraName>) -> Self {
        self.extras = Some(extras.into_iter().collect());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(canonical_name(name)).map(String::as_str)
    }

    pub fn extras(&self) -> Option<&BTreeSet<ExtraName>> {
        self.extras.as_ref()
    }

    /// The platform values of the running process.
    ///
    /// Only values known at compile time are set; there is no interpreter to ask for
    /// `python_version` or `implementation_name`.
    pub fn current() -> Self {
        let (os_name, sys_platform, platform_system) = match std::env::consts::OS {
            "windows" => ("nt", "win32", "Windows"),
            "macos" => ("posix", "darwin", "Darwin"),
            "linux" => ("posix", "linux", "Linux"),
            "freebsd" => ("posix", "freebsd", "FreeBSD"),
            other => ("posix", other, other),
        };
        let platform_machine = match (std::env::consts::OS, std::env::consts::ARCH) {
            ("windows", "x86_64") => "AMD64",
            ("windows" | "macos", "aarch64") => "arm64",
            (_, arch) => arch,
        };
        Self::new()
            .with("os_name", os_name)
            .with("sys_platform", sys_platform)
            .with("platform_system", platform_system)
            .with("platform_machine", platform_machine)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MarkerEnvironment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |env, (name, value)| env.with(name.as_ref(), value))
    }
}
