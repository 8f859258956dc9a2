use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

use crate::{Constraint, GenericConstraint, Operator, UnionConstraint};

static OR_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").expect("the or-separator regex is valid"));

/// `win32`, `==win32`, `!= win32`, `in tegra`, `not in tegra`
static BASIC_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:(?P<op>={1,3}|!=)\s*|(?P<word>not\s+in|in)\s+)?(?P<value>[^\s<>=!~,|'"][^\s,|'"]*)$"#,
    )
    .expect("the generic constraint regex is valid")
});

/// An error that occurs when a generic constraint can't be parsed.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseGenericConstraintError {
    #[error("Could not parse constraint: {0}")]
    InvalidConstraint(String),
    #[error("Expected a value after `{operator}` in constraint: {constraint}")]
    MissingValue { operator: String, constraint: String },
}

/// Parse a constraint over string values, such as `!=win32,!=linux` or `win32 || linux`.
///
/// Or-groups are separated by `||` (or a single `|`), the members of an and-group by commas or
/// whitespace. A bare value means `==`.
pub fn parse_generic_constraint(
    constraints: &str,
) -> Result<GenericConstraint, ParseGenericConstraintError> {
    let constraints = constraints.trim();
    match constraints {
        "*" => return Ok(GenericConstraint::Any),
        "<empty>" => return Ok(GenericConstraint::Empty),
        _ => {}
    }

    let mut or_groups = Vec::new();
    for group in OR_SEPARATOR.split(constraints) {
        let mut constraint = GenericConstraint::Any;
        for single in split_and_group(group)? {
            constraint = constraint.intersect(&parse_single_constraint(&single)?);
        }
        if constraint.is_any() {
            trace!("`{group}` allows every value");
            return Ok(GenericConstraint::Any);
        }
        or_groups.push(constraint);
    }
    // The groups stay as written, `win32 || !=linux2` isn't simplified to `!=linux2`
    Ok(UnionConstraint::from_members(or_groups))
}

fn is_operator(token: &str) -> bool {
    matches!(token, "=" | "==" | "===" | "!=" | "in" | "not")
}

/// Split `!= win32, not in tegra !=linux` into `!= win32`, `not in tegra` and `!=linux`.
fn split_and_group(group: &str) -> Result<SmallVec<[String; 4]>, ParseGenericConstraintError> {
    let mut parts = SmallVec::new();
    for part in group.split(',') {
        let mut pending: SmallVec<[&str; 2]> = SmallVec::new();
        for token in part.split_whitespace() {
            pending.push(token);
            if !is_operator(token) {
                parts.push(pending.join(" "));
                pending.clear();
            }
        }
        if let Some(operator) = pending.last() {
            return Err(ParseGenericConstraintError::MissingValue {
                operator: (*operator).to_string(),
                constraint: group.to_string(),
            });
        }
    }
    if parts.is_empty() {
        return Err(ParseGenericConstraintError::InvalidConstraint(
            group.to_string(),
        ));
    }
    Ok(parts)
}

fn parse_single_constraint(
    constraint: &str,
) -> Result<GenericConstraint, ParseGenericConstraintError> {
    if constraint == "*" {
        return Ok(GenericConstraint::Any);
    }
    let Some(captures) = BASIC_CONSTRAINT.captures(constraint) else {
        return Err(ParseGenericConstraintError::InvalidConstraint(
            constraint.to_string(),
        ));
    };
    let operator = if let Some(word) = captures.name("word") {
        if word.as_str() == "in" {
            Operator::In
        } else {
            Operator::NotIn
        }
    } else if captures.name("op").is_some_and(|op| op.as_str() == "!=") {
        Operator::NotEqual
    } else {
        Operator::Equal
    };
    Ok(Constraint::new(&captures["value"], operator).into())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use test_case::test_case;
    use tracing_test::traced_test;

    use super::parse_generic_constraint;
    use crate::{Constraint, GenericConstraint, MultiConstraint, Operator, UnionConstraint};

    fn term(value: &str, operator: Operator) -> GenericConstraint {
        Constraint::new(value, operator).into()
    }

    #[test_case("*", &GenericConstraint::Any; "any")]
    #[test_case("<empty>", &GenericConstraint::Empty; "empty")]
    #[test_case("win32", &term("win32", Operator::Equal); "bare")]
    #[test_case("=win32", &term("win32", Operator::Equal); "single equals")]
    #[test_case("==win32", &term("win32", Operator::Equal); "double equals")]
    #[test_case("===win32", &term("win32", Operator::Equal); "triple equals")]
    #[test_case("!=win32", &term("win32", Operator::NotEqual); "not equal")]
    #[test_case("!= win32", &term("win32", Operator::NotEqual); "not equal with space")]
    #[test_case("in tegra", &term("tegra", Operator::In); "in")]
    #[test_case("not in tegra", &term("tegra", Operator::NotIn); "not in")]
    #[test_case("  intel ", &term("intel", Operator::Equal); "value starting with in")]
    fn single(input: &str, expected: &GenericConstraint) {
        assert_eq!(&parse_generic_constraint(input).unwrap(), expected);
    }

    #[test]
    fn multi() {
        let expected = GenericConstraint::Multi(MultiConstraint::new([
            Constraint::not_equal("win32"),
            Constraint::not_equal("linux"),
        ]));
        assert_eq!(parse_generic_constraint("!=win32,!=linux").unwrap(), expected);
        assert_eq!(parse_generic_constraint("!=win32 !=linux").unwrap(), expected);
        assert_eq!(parse_generic_constraint("!= linux, != win32").unwrap(), expected);

        let three = parse_generic_constraint("!=win32,!=linux,!=linux2").unwrap();
        assert_eq!(three.to_string(), "!=win32, !=linux, !=linux2");
    }

    #[test]
    fn union() {
        let expected = UnionConstraint::from_members(vec![
            Constraint::equal("win32").into(),
            Constraint::equal("linux").into(),
        ]);
        assert_eq!(parse_generic_constraint("win32 || linux").unwrap(), expected);
        assert_eq!(parse_generic_constraint("win32|linux").unwrap(), expected);

        let mixed = parse_generic_constraint("win32 || !=linux2").unwrap();
        assert!(matches!(mixed, GenericConstraint::Union(_)));
        assert_eq!(mixed.to_string(), "win32 || !=linux2");
    }

    #[test]
    fn simplified_groups() {
        assert_eq!(
            parse_generic_constraint("win32, !=linux").unwrap().to_string(),
            "win32"
        );
        assert!(
            parse_generic_constraint("win32, linux")
                .unwrap()
                .is_empty()
        );
        assert!(parse_generic_constraint("linux || *").unwrap().is_any());
    }

    #[test_case(""; "empty input")]
    #[test_case("!="; "dangling operator")]
    #[test_case("not in"; "dangling not in")]
    #[test_case("win32 ||"; "empty or group")]
    #[test_case(">=win32"; "version operator")]
    #[test_case("'win32'"; "quoted")]
    fn invalid(input: &str) {
        assert!(parse_generic_constraint(input).is_err(), "{input}");
    }

    #[test]
    #[traced_test]
    fn any_group_is_logged() {
        assert!(parse_generic_constraint("linux || *").unwrap().is_any());
        assert!(logs_contain("`*` allows every value"));
    }

    #[test]
    fn error_message() {
        let err = parse_generic_constraint("!=").unwrap_err();
        assert_snapshot!(err, @"Expected a value after `!=` in constraint: !=");
        let err = parse_generic_constraint("win32, >=linux").unwrap_err();
        assert_snapshot!(err, @"Could not parse constraint: >=linux");
    }
}
