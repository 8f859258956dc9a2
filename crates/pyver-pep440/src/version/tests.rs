use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use test_case::test_case;

use crate::{LocalSegment, ReleasePhase, ReleaseTag, Version, VersionParseError};

fn version(s: &str) -> Version {
    Version::from_str(s).unwrap()
}

/// <https://github.com/pypa/packaging/blob/237ff3aa348486cf835a980592af3a59fccd6101/tests/test_version.py#L24-L81>
const PACKAGING_VERSIONS: &[&str] = &[
    // Implicit epoch of 0
    "1.0.dev456",
    "1.0a1",
    "1.0a2.dev456",
    "1.0a12.dev456",
    "1.0a12",
    "1.0b1.dev456",
    "1.0b2",
    "1.0b2.post345.dev456",
    "1.0b2.post345",
    "1.0b2-346",
    "1.0c1.dev456",
    "1.0c1",
    "1.0rc2",
    "1.0c3",
    "1.0",
    "1.0.post456.dev34",
    "1.0.post456",
    "1.1.dev1",
    "1.2+123abc",
    "1.2+123abc456",
    "1.2+abc",
    "1.2+abc123",
    "1.2+abc123def",
    "1.2+1234.abc",
    "1.2+123456",
    "1.2.r32+123456",
    "1.2.rev33+123456",
    // Explicit epoch of 1
    "1!1.0.dev456",
    "1!1.0a1",
    "1!1.0a2.dev456",
    "1!1.0a12.dev456",
    "1!1.0a12",
    "1!1.0b1.dev456",
    "1!1.0b2",
    "1!1.0b2.post345.dev456",
    "1!1.0b2.post345",
    "1!1.0b2-346",
    "1!1.0c1.dev456",
    "1!1.0c1",
    "1!1.0rc2",
    "1!1.0c3",
    "1!1.0",
    "1!1.0.post456.dev34",
    "1!1.0.post456",
    "1!1.1.dev1",
    "1!1.2+123abc",
    "1!1.2+123abc456",
    "1!1.2+abc",
    "1!1.2+abc123",
    "1!1.2+abc123def",
    "1!1.2+1234.abc",
    "1!1.2+123456",
    "1!1.2.r32+123456",
    "1!1.2.rev33+123456",
];

#[test]
fn test_packaging_versions() {
    for version in PACKAGING_VERSIONS {
        Version::from_str(version).unwrap();
    }
}

/// The list above is sorted, so every pair must compare the same way as its indices.
#[test]
fn test_packaging_ordering() {
    let versions: Vec<Version> = PACKAGING_VERSIONS.iter().map(|v| version(v)).collect();
    for (i, a) in versions.iter().enumerate() {
        for (j, b) in versions.iter().enumerate() {
            assert_eq!(a.cmp(b), i.cmp(&j), "{a} {b}");
        }
    }
}

/// <https://github.com/pypa/packaging/blob/237ff3aa348486cf835a980592af3a59fccd6101/tests/test_version.py#L91-L100>
#[test]
fn test_packaging_failures() {
    let versions = [
        // Nonsensical versions should be invalid
        "french toast",
        // Versions with invalid local versions
        "1.0+a+",
        "1.0++",
        "1.0+_foobar",
        "1.0+foo&asd",
        "1.0+1+1",
        // Wildcards are a constraint concern
        "0.9.1.*",
        "",
    ];
    for version in versions {
        assert_eq!(
            Version::from_str(version).unwrap_err().to_string(),
            format!("Version `{version}` doesn't match PEP 440 rules")
        );
    }
}

#[test]
fn test_number_overflow() {
    let err = Version::from_str("1.99999999999999999999").unwrap_err();
    assert!(matches!(
        err,
        VersionParseError::Number {
            field: "release",
            ..
        }
    ));
}

#[test]
fn test_equality_and_normalization() {
    let versions = [
        // Various development release incarnations
        ("1.0dev", "1.0.dev0"),
        ("1.0.dev", "1.0.dev0"),
        ("1.0dev1", "1.0.dev1"),
        ("1.0-dev", "1.0.dev0"),
        ("1.0-dev1", "1.0.dev1"),
        ("1.0DEV", "1.0.dev0"),
        ("1.0.DEV", "1.0.dev0"),
        ("1.0DEV1", "1.0.dev1"),
        ("1.0.DEV1", "1.0.dev1"),
        ("1.0-DEV", "1.0.dev0"),
        ("1.0-DEV1", "1.0.dev1"),
        // Various alpha incarnations
        ("1.0a", "1.0a0"),
        ("1.0.a", "1.0a0"),
        ("1.0.a1", "1.0a1"),
        ("1.0-a", "1.0a0"),
        ("1.0-a1", "1.0a1"),
        ("1.0alpha", "1.0a0"),
        ("1.0.alpha", "1.0a0"),
        ("1.0.alpha1", "1.0a1"),
        ("1.0-alpha", "1.0a0"),
        ("1.0-alpha1", "1.0a1"),
        ("1.0A", "1.0a0"),
        ("1.0.A1", "1.0a1"),
        ("1.0ALPHA", "1.0a0"),
        ("1.0-ALPHA1", "1.0a1"),
        // Various beta incarnations
        ("1.0b", "1.0b0"),
        ("1.0.b", "1.0b0"),
        ("1.0.b1", "1.0b1"),
        ("1.0-b", "1.0b0"),
        ("1.0-b1", "1.0b1"),
        ("1.0beta", "1.0b0"),
        ("1.0.beta", "1.0b0"),
        ("1.0.beta1", "1.0b1"),
        ("1.0-beta", "1.0b0"),
        ("1.0-beta1", "1.0b1"),
        ("1.0B", "1.0b0"),
        ("1.0.B1", "1.0b1"),
        ("1.0BETA", "1.0b0"),
        ("1.0-BETA1", "1.0b1"),
        // Various release candidate incarnations
        ("1.0c", "1.0rc0"),
        ("1.0.c", "1.0rc0"),
        ("1.0.c1", "1.0rc1"),
        ("1.0-c", "1.0rc0"),
        ("1.0-c1", "1.0rc1"),
        ("1.0rc", "1.0rc0"),
        ("1.0.rc", "1.0rc0"),
        ("1.0.rc1", "1.0rc1"),
        ("1.0-rc", "1.0rc0"),
        ("1.0-rc1", "1.0rc1"),
        ("1.0C", "1.0rc0"),
        ("1.0RC1", "1.0rc1"),
        ("1.0pre1", "1.0rc1"),
        ("1.0preview2", "1.0rc2"),
        // Various post release incarnations
        ("1.0post", "1.0.post0"),
        ("1.0.post", "1.0.post0"),
        ("1.0post1", "1.0.post1"),
        ("1.0-post", "1.0.post0"),
        ("1.0-post1", "1.0.post1"),
        ("1.0POST", "1.0.post0"),
        ("1.0.POST", "1.0.post0"),
        ("1.0POST1", "1.0.post1"),
        ("1.0r", "1.0.post0"),
        ("1.0rev", "1.0.post0"),
        ("1.0.POST1", "1.0.post1"),
        ("1.0.r1", "1.0.post1"),
        ("1.0.rev1", "1.0.post1"),
        ("1.0-POST", "1.0.post0"),
        ("1.0-POST1", "1.0.post1"),
        ("1.0-5", "1.0.post5"),
        ("1.0-r5", "1.0.post5"),
        ("1.0-rev5", "1.0.post5"),
        // Local version case insensitivity
        ("1.0+AbC", "1.0+abc"),
        // Integer Normalization
        ("1.01", "1.1"),
        ("1.0a05", "1.0a5"),
        ("1.0b07", "1.0b7"),
        ("1.0c056", "1.0rc56"),
        ("1.0rc09", "1.0rc9"),
        ("1.0.post000", "1.0.post0"),
        ("1.1.dev09000", "1.1.dev9000"),
        ("00!1.2", "1.2"),
        ("0100!0.0", "100!0.0"),
        // Various other normalizations
        ("v1.0", "1.0"),
        ("   v1.0\t\n", "1.0"),
    ];
    for (version_str, normalized_str) in versions {
        let version = version(version_str);
        let normalized = self::version(normalized_str);
        // Just test version parsing again
        assert_eq!(version, normalized, "{version_str} {normalized_str}");
        // Test version normalization
        assert_eq!(
            version.to_string(),
            normalized_str,
            "{version_str} {normalized_str}"
        );
    }
}

/// <https://github.com/pypa/packaging/blob/237ff3aa348486cf835a980592af3a59fccd6101/tests/test_version.py#L229-L277>
#[test]
fn test_equality_and_normalization2() {
    let versions = [
        ("1.0.dev456", "1.0.dev456"),
        ("1.0a2.dev456", "1.0a2.dev456"),
        ("1.0b2.post345.dev456", "1.0b2.post345.dev456"),
        ("1.0rc1", "1.0rc1"),
        ("1.0.post456.dev34", "1.0.post456.dev34"),
        ("0!1.0.2", "1.0.2"),
        ("1.0.3+7", "1.0.3+7"),
        ("0!1.0.4+8.0", "1.0.4+8.0"),
        ("1.0.5+9.5", "1.0.5+9.5"),
        ("1.2+1234.abc", "1.2+1234.abc"),
        ("1.2+123abc456", "1.2+123abc456"),
        ("1.2+abc-def_ghi", "1.2+abc.def.ghi"),
        ("7!1.0.dev456", "7!1.0.dev456"),
        ("7!1.0b2.post345.dev456", "7!1.0b2.post345.dev456"),
        ("7!1.0.5+9.5", "7!1.0.5+9.5"),
    ];
    for (version_str, normalized_str) in versions {
        let version = version(version_str);
        let normalized = self::version(normalized_str);
        assert_eq!(version, normalized, "{version_str} {normalized_str}");
        assert_eq!(
            version.to_string(),
            normalized_str,
            "{version_str} {normalized_str}"
        );
    }
}

#[test]
fn trailing_zeros_are_equal() {
    assert_eq!(version("1.2"), version("1.2.0.0"));
    assert_eq!(version("1.2").precision(), 2);
    assert_eq!(version("1.2.0.0").precision(), 4);
    assert_eq!(version("1.2.0.0").to_string(), "1.2.0.0");

    let set: HashSet<Version> = ["1.2", "1.2.0", "1.2.0.0+local", "1.2.0.0"]
        .into_iter()
        .map(version)
        .collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn local_ordering() {
    assert_eq!(version("1.0+1").cmp(&version("1.0+abc")), Ordering::Greater);
    assert_eq!(version("1.0+abc.1").cmp(&version("1.0+abc")), Ordering::Greater);
    assert_eq!(version("1.0+ABC").cmp(&version("1.0+abc")), Ordering::Equal);
    assert!(version("1.0+abc") > version("1.0"));
    assert!(version("1.0+abc") < version("1.0.post0"));
}

#[test]
fn components() {
    let version = version("4!1.19.2a8.post9.dev1+Ubuntu.5");
    assert_eq!(version.epoch(), 4);
    assert_eq!(version.release(), &[1, 19, 2]);
    assert_eq!(version.major(), 1);
    assert_eq!(version.minor(), Some(19));
    assert_eq!(version.patch(), Some(2));
    assert_eq!(version.pre(), Some(ReleaseTag::new(ReleasePhase::Alpha, 8)));
    assert_eq!(version.post(), Some(9));
    assert_eq!(version.dev(), Some(1));
    assert_eq!(
        version.local(),
        Some(
            [
                LocalSegment::String("ubuntu".to_string()),
                LocalSegment::Number(5)
            ]
            .as_slice()
        )
    );
    assert!(version.is_prerelease());
    assert!(version.is_postrelease());
    assert!(version.is_devrelease());
    assert!(version.is_local());
    assert!(version.is_unstable());
    assert!(!version.is_no_suffix_release());
    assert_eq!(version.to_string(), "4!1.19.2a8.post9.dev1+ubuntu.5");
}

#[test]
fn builders() {
    let version = Version::new([1, 2])
        .with_epoch(1)
        .with_pre(Some(ReleaseTag::new(ReleasePhase::Rc, 1)))
        .with_post(Some(2))
        .with_dev(Some(3))
        .with_local(Some(vec![LocalSegment::Number(4)]));
    assert_eq!(version.to_string(), "1!1.2rc1.post2.dev3+4");
    // Only alpha, beta and rc are pre-release phases
    let version = Version::new([1]).with_pre(Some(ReleaseTag::new(ReleasePhase::Post, 1)));
    assert_eq!(version.pre(), None);
    assert_eq!(Version::new([]).to_string(), "0");
}

#[test_case("1.0", true; "final")]
#[test_case("1.0.post1", true; "post")]
#[test_case("1.0+local", true; "local")]
#[test_case("1.0a1", false; "alpha")]
#[test_case("1.0.dev0", false; "dev")]
#[test_case("1.0.post1.dev0", false; "post dev")]
fn stability(version: &str, stable: bool) {
    assert_eq!(self::version(version).is_stable(), stable);
}

#[test]
fn release_tags() {
    let alpha = ReleaseTag::new(ReleasePhase::Alpha, 3);
    assert_eq!(alpha.next().unwrap().to_string(), "a4");
    assert_eq!(ReleaseTag::new(ReleasePhase::Rc, u64::MAX).next(), None);
    assert_eq!(alpha.next_phase(), Some(ReleaseTag::new(ReleasePhase::Beta, 0)));
    assert_eq!(
        ReleaseTag::new(ReleasePhase::Beta, 1).next_phase(),
        Some(ReleaseTag::new(ReleasePhase::Rc, 0))
    );
    assert_eq!(ReleaseTag::new(ReleasePhase::Rc, 1).next_phase(), None);
    assert_eq!(ReleasePhase::from_str("PREVIEW"), Ok(ReleasePhase::Rc));
    assert_eq!(ReleasePhase::from_str("rev"), Ok(ReleasePhase::Post));
    assert!(ReleasePhase::from_str("gamma").is_err());
}

#[test_case("1", "2")]
#[test_case("1.2", "2.0")]
#[test_case("1.2.3", "2.0.0")]
#[test_case("1.2.3.4", "2.0.0.0")]
#[test_case("1.dev0", "1")]
#[test_case("1.0a1", "1.0")]
#[test_case("1.2a1", "2.0")]
#[test_case("1.2.post1", "2.0")]
#[test_case("2!1.2", "2!2.0")]
fn next_major(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_major().unwrap().to_string(), expected);
}

#[test_case("1", "1.1")]
#[test_case("1.2", "1.3")]
#[test_case("1.2.3", "1.3.0")]
#[test_case("1.2dev0", "1.2")]
#[test_case("1.2.0rc1", "1.2.0")]
#[test_case("1.2.3a1", "1.3.0")]
fn next_minor(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_minor().unwrap().to_string(), expected);
}

#[test_case("1", "1.0.1")]
#[test_case("1.2.3", "1.2.4")]
#[test_case("1.2.3a1", "1.2.3")]
#[test_case("1.2.3.0b1", "1.2.3.0")]
#[test_case("1.2.3.4a1", "1.2.4.0")]
fn next_patch(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_patch().unwrap().to_string(), expected);
}

#[test_case("1.2.3", "2.0.0")]
#[test_case("1.2.3a1", "2.0.0")]
#[test_case("0.2.3", "0.3.0")]
#[test_case("0.0.3", "0.0.4")]
#[test_case("0.0.3.4", "0.0.4.0")]
#[test_case("0.0", "0.1")]
#[test_case("0", "1")]
fn next_breaking(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_breaking().unwrap().to_string(), expected);
}

#[test_case("1", "2")]
#[test_case("1.2", "1.3")]
#[test_case("1.2.dev4", "1.2")]
#[test_case("1.2a1", "1.2")]
#[test_case("1.2.post3", "1.3")]
#[test_case("1+local", "2+local")]
#[test_case("3!1.9", "3!1.10")]
fn next_stable(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_stable().unwrap().to_string(), expected);
}

#[test_case("1.2a1", "1.2a2")]
#[test_case("1.2a1.dev0", "1.2a1")]
#[test_case("1.2rc1.post2.dev0", "1.2rc2")]
#[test_case("1.2.dev0", "1.2a0")]
#[test_case("1.2", "1.2a0")]
fn next_prerelease(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_prerelease().unwrap().to_string(), expected);
}

#[test_case("1", "1.post0")]
#[test_case("1.post1", "1.post2")]
#[test_case("1.post1.dev0", "1.post1")]
#[test_case("1a1", "1a1.post0")]
fn next_postrelease(version: &str, expected: &str) {
    assert_eq!(
        self::version(version).next_postrelease().unwrap().to_string(),
        expected
    );
}

#[test_case("1.dev0", "1.dev1")]
#[test_case("1a1", "1a1.dev0")]
#[test_case("1.post2", "1.post2.dev0")]
fn next_devrelease(version: &str, expected: &str) {
    assert_eq!(self::version(version).next_devrelease().unwrap().to_string(), expected);
}

#[test_case("18446744073709551615"; "major")]
#[test_case("1.18446744073709551615"; "last release component")]
fn next_stable_overflow(version: &str) {
    let err = self::version(version).next_stable().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Can't compute the next version of `{version}`, a component is already at its maximum")
    );
}

#[test]
fn derived_version_overflow() {
    let max = version("18446744073709551615.2");
    assert!(max.next_major().is_err());
    assert_eq!(max.next_minor().unwrap().to_string(), "18446744073709551615.3");
    assert!(max.next_breaking().is_err());
    assert!(version("1.0.18446744073709551615").bump(2).is_err());
    assert!(version("1a18446744073709551615").next_prerelease().is_err());
    assert!(version("1.post18446744073709551615").next_postrelease().is_err());
    assert!(version("1.dev18446744073709551615").next_devrelease().is_err());
    // Tags that are not incremented don't overflow
    assert_eq!(
        version("1a18446744073709551615.dev0").next_prerelease().unwrap().to_string(),
        "1a18446744073709551615"
    );
}

#[test]
fn largest_dev_release_sorts_before_its_release() {
    assert!(version("1.0a1.dev18446744073709551615") < version("1.0a1"));
    assert_ne!(version("1.0a1.dev18446744073709551615"), version("1.0a1"));
    assert!(version("1.0.post1.dev18446744073709551615") < version("1.0.post1"));
    assert!(version("1.0.dev18446744073709551615") < version("1.0a0"));
}

#[test]
fn derived_versions() {
    assert_eq!(version("1.2.3").first_prerelease().to_string(), "1.2.3a0");
    assert_eq!(version("1.2.3.post1").first_prerelease().to_string(), "1.2.3a0");
    assert_eq!(version("1a1").first_devrelease().to_string(), "1a1.dev0");
    assert_eq!(version("1+local").first_devrelease().to_string(), "1.dev0");
    assert_eq!(version("1.2.3a1.post2").stable().to_string(), "1.2.3");
    assert_eq!(version("1.post1.dev0").stable().to_string(), "1.post1");
    assert_eq!(version("1+local").stable().to_string(), "1+local");
    assert_eq!(version("1.2.post3.dev4").without_postrelease().to_string(), "1.2");
    assert_eq!(version("1.2.post3+abc").without_postrelease().to_string(), "1.2+abc");
    assert_eq!(version("1a1.post1").without_postrelease().to_string(), "1a1");
    assert_eq!(version("1.2.dev4").without_postrelease().to_string(), "1.2.dev4");
    assert_eq!(version("1.2.dev4+abc").without_devrelease().to_string(), "1.2+abc");
    assert_eq!(version("1.2+abc").without_local().to_string(), "1.2");
}

#[cfg(feature = "serde")]
#[test]
fn serde() {
    let version: Version = serde_json::from_str("\"1.0-ALPHA1\"").unwrap();
    assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.0a1\"");
    assert!(serde_json::from_str::<Version>("\"french toast\"").is_err());
}
