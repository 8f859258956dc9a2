use std::str::FromStr;

use crate::cursor::Cursor;
use crate::environment::{MARKER_NAMES, canonical_name};
use crate::{
    Marker, MarkerError, MarkerErrorSource, MarkerOperator, MarkerUnion, MultiMarker,
    SingleMarker,
};

/// One side of a comparison.
enum MarkerValue<'a> {
    /// A marker name such as `python_version`, after resolving aliases.
    Name(&'a str),
    /// A quoted string.
    String(&'a str),
}

/// Parses markers such as `python_version < '3.8'` or
/// `python_version == "3.10" and (sys_platform == "win32" or (os_name == "linux" and implementation_name == 'cpython'))`.
///
/// The empty string and `*` are [`Marker::Any`], `<empty>` is [`Marker::Empty`].
pub fn parse_marker(markers: &str) -> Result<Marker, MarkerError> {
    match markers.trim() {
        "" | "*" => return Ok(Marker::Any),
        "<empty>" => return Ok(Marker::Empty),
        _ => {}
    }

    let mut cursor = Cursor::new(markers);
    let marker = parse_marker_or(&mut cursor)?;
    cursor.eat_whitespace();
    if let Some((pos, unexpected)) = cursor.next() {
        // Both `parse_marker_or` and `parse_marker_and` returned because the next word was
        // neither "and" nor "or"
        return Err(MarkerError {
            message: MarkerErrorSource::String(format!(
                "Unexpected character '{unexpected}', expected 'and', 'or' or end of input"
            )),
            start: pos,
            len: unexpected.len_utf8() + cursor.remaining(),
            input: cursor.to_string(),
        });
    }
    Ok(marker)
}

/// ```text
/// version_cmp   = wsp* <'<=' | '<' | '!=' | '==' | '>=' | '>' | '~=' | '==='>
/// marker_op     = version_cmp | (wsp* 'in') | (wsp* 'not' wsp+ 'in')
/// ```
fn parse_marker_operator(cursor: &mut Cursor) -> Result<MarkerOperator, MarkerError> {
    let is_symbol = |char: char| matches!(char, '<' | '>' | '=' | '!' | '~');
    let (start, len) = if cursor.peek_char().is_some_and(is_symbol) {
        cursor.take_while(is_symbol)
    } else {
        cursor.take_while(char::is_alphabetic)
    };
    let operator = cursor.slice(start, len);
    if operator == "not" {
        // 'not' wsp+ 'in'
        match cursor.next() {
            None => {
                return Err(MarkerError {
                    message: MarkerErrorSource::String(
                        "Expected whitespace after 'not', found end of marker".to_string(),
                    ),
                    start: cursor.pos(),
                    len: 1,
                    input: cursor.to_string(),
                });
            }
            Some((_, whitespace)) if whitespace.is_whitespace() => {}
            Some((pos, other)) => {
                return Err(MarkerError {
                    message: MarkerErrorSource::String(format!(
                        "Expected whitespace after 'not', found '{other}'"
                    )),
                    start: pos,
                    len: other.len_utf8(),
                    input: cursor.to_string(),
                });
            }
        }
        cursor.eat_whitespace();
        cursor.next_expect_char('i', cursor.pos())?;
        cursor.next_expect_char('n', cursor.pos())?;
        return Ok(MarkerOperator::NotIn);
    }
    MarkerOperator::from_str(operator).map_err(|_| MarkerError {
        message: MarkerErrorSource::String(format!(
            "Expected a valid marker operator (such as '>=' or 'not in'), found '{operator}'"
        )),
        start,
        len,
        input: cursor.to_string(),
    })
}

/// Either a single or double quoted string or a marker name such as `python_version`.
///
/// Backslash escapes are not supported.
fn parse_marker_value<'a>(cursor: &mut Cursor<'a>) -> Result<MarkerValue<'a>, MarkerError> {
    match cursor.peek() {
        None => Err(MarkerError {
            message: MarkerErrorSource::String(
                "Expected marker value, found end of marker".to_string(),
            ),
            start: cursor.pos(),
            len: 1,
            input: cursor.to_string(),
        }),
        Some((start_pos, quotation_mark @ ('"' | '\''))) => {
            cursor.next();
            let (start, len) = cursor.take_while(|c| c != quotation_mark);
            let value = cursor.slice(start, len);
            cursor.next_expect_char(quotation_mark, start_pos)?;
            Ok(MarkerValue::String(value))
        }
        Some(_) => {
            let (start, len) = cursor.take_while(|char| {
                !char.is_whitespace()
                    && !['>', '=', '<', '!', '~', ')', '"', '\''].contains(&char)
            });
            let key = canonical_name(cursor.slice(start, len));
            if MARKER_NAMES.contains(&key) {
                Ok(MarkerValue::Name(key))
            } else {
                Err(MarkerError {
                    message: MarkerErrorSource::String(format!(
                        "Expected a valid marker name, found '{key}'"
                    )),
                    start,
                    len,
                    input: cursor.to_string(),
                })
            }
        }
    }
}

/// ```text
/// marker_var:l marker_op:o marker_var:r
/// ```
///
/// One side must be a name and the other a quoted string. With the string on the left, the
/// operator is flipped: `"3.6" < python_version` is `python_version > "3.6"` and
/// `"tegra" in platform_release` tests whether the release contains `tegra`.
fn parse_marker_key_op_value(cursor: &mut Cursor) -> Result<Marker, MarkerError> {
    cursor.eat_whitespace();
    let start = cursor.pos();
    let l_value = parse_marker_value(cursor)?;
    cursor.eat_whitespace();
    let operator = parse_marker_operator(cursor)?;
    cursor.eat_whitespace();
    let r_value = parse_marker_value(cursor)?;

    let single = match (l_value, r_value) {
        (MarkerValue::Name(name), MarkerValue::String(value)) => {
            SingleMarker::new(name, operator, value)
        }
        (MarkerValue::String(value), MarkerValue::Name(name)) => match operator.reversed() {
            Some(operator) => SingleMarker::new(name, operator, value),
            None => Err(MarkerErrorSource::String(format!(
                "Operator `{operator}` requires the marker name on the left, as in `{name} {operator} \"{value}\"`"
            ))),
        },
        (MarkerValue::Name(l_name), MarkerValue::Name(r_name)) => {
            Err(MarkerErrorSource::String(format!(
                "Comparing two marker names (`{l_name}` and `{r_name}`) is not supported, expected a quoted string on one side"
            )))
        }
        (MarkerValue::String(l_string), MarkerValue::String(r_string)) => {
            Err(MarkerErrorSource::String(format!(
                "Comparing two quoted strings ('{l_string}' and '{r_string}') is not supported, expected a marker name on one side"
            )))
        }
    };
    single.map(Marker::from).map_err(|message| MarkerError {
        message,
        start,
        len: cursor.pos() - start,
        input: cursor.to_string(),
    })
}

/// ```text
/// marker_expr   = marker_var:l marker_op:o marker_var:r -> (o, l, r)
///               | wsp* '(' marker:m wsp* ')' -> m
/// ```
fn parse_marker_expr(cursor: &mut Cursor) -> Result<Marker, MarkerError> {
    cursor.eat_whitespace();
    if let Some(start_pos) = cursor.eat_char('(') {
        let marker = parse_marker_or(cursor)?;
        cursor.eat_whitespace();
        cursor.next_expect_char(')', start_pos)?;
        Ok(marker)
    } else {
        parse_marker_key_op_value(cursor)
    }
}

/// ```text
/// marker_and    = marker_expr:l wsp* 'and' marker_expr:r -> ('and', l, r)
///               | marker_expr:m -> m
/// ```
fn parse_marker_and(cursor: &mut Cursor) -> Result<Marker, MarkerError> {
    parse_marker_op(cursor, "and", |markers| MultiMarker::of(markers), parse_marker_expr)
}

/// ```text
/// marker_or     = marker_and:l wsp* 'or' marker_and:r -> ('or', l, r)
///               | marker_and:m -> m
/// ```
fn parse_marker_or(cursor: &mut Cursor) -> Result<Marker, MarkerError> {
    parse_marker_op(cursor, "or", |markers| MarkerUnion::of(markers), parse_marker_and)
}

/// Parses both `marker_and` and `marker_or`
fn parse_marker_op(
    cursor: &mut Cursor,
    op: &str,
    combine: fn(Vec<Marker>) -> Marker,
    parse_inner: fn(&mut Cursor) -> Result<Marker, MarkerError>,
) -> Result<Marker, MarkerError> {
    let first_element = parse_inner(cursor)?;
    cursor.eat_whitespace();
    if matches!(cursor.peek_char(), None | Some(')')) {
        return Ok(first_element);
    }

    let mut markers = vec![first_element];
    loop {
        cursor.eat_whitespace();
        let (start, len) = cursor.peek_while(char::is_alphabetic);
        if cursor.slice(start, len) != op {
            return Ok(if markers.len() == 1 {
                markers.remove(0)
            } else {
                combine(markers)
            });
        }
        cursor.take_while(char::is_alphabetic);
        markers.push(parse_inner(cursor)?);
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use test_case::test_case;

    use crate::{Marker, MarkerOperator, parse_marker};

    fn m(marker: &str) -> Marker {
        parse_marker(marker).unwrap()
    }

    #[test_case(""; "empty string")]
    #[test_case("*"; "star")]
    #[test_case("  "; "whitespace")]
    fn any(input: &str) {
        assert!(m(input).is_any());
    }

    #[test]
    fn empty() {
        assert!(m("<empty>").is_empty());
        assert_eq!(m("<empty>").to_string(), "<empty>");
    }

    #[test_case(r#"python_version >= "3.6""#; "version")]
    #[test_case(r#"sys_platform != "win32""#; "generic")]
    #[test_case(r#"extra == "security""#; "extra")]
    #[test_case(r#""tegra" in platform_release"#; "contains")]
    #[test_case(r#"platform_machine not in "aarch64|loongarch64""#; "not in")]
    #[test_case(r#"python_version >= "3.6" and sys_platform == "win32""#; "and")]
    #[test_case(r#"python_version < "3.6" or sys_platform == "win32""#; "or")]
    #[test_case(
        r#"python_version >= "3.6" and (sys_platform == "win32" or sys_platform == "linux")"#;
        "nested"
    )]
    fn canonical_round_trip(input: &str) {
        let marker = m(input);
        assert_eq!(marker.to_string(), input);
        assert_eq!(m(&marker.to_string()), marker);
    }

    #[test]
    fn normalized_display() {
        insta::assert_snapshot!(
            m("os.name=='nt' and  platform.machine  ==  'x86_64'"),
            @r#"os_name == "nt" and platform_machine == "x86_64""#
        );
        insta::assert_snapshot!(
            m(r#"(python_version>="3.6")and(sys_platform=="linux")"#),
            @r#"python_version >= "3.6" and sys_platform == "linux""#
        );
        insta::assert_snapshot!(
            m(r#"extra == "Security_1""#),
            @r#"extra == "security-1""#
        );
    }

    #[test]
    fn precedence() {
        let marker = m(r#"os_name == "nt" or sys_platform == "linux" and python_version >= "3.8""#);
        let Marker::Union(union) = &marker else {
            panic!("Expected a union, found {marker:?}");
        };
        assert!(matches!(union.markers(), [Marker::Single(_), Marker::Multi(_)]));
    }

    #[test]
    fn reversed() {
        assert_eq!(
            m(r#""3.6" < python_version"#),
            m(r#"python_version > "3.6""#)
        );
        assert_eq!(
            m(r#""3.6" >= python_version"#),
            m(r#"python_version <= "3.6""#)
        );
        assert_eq!(
            m(r#"'2.7' in python_version"#),
            m(r#"python_version in '2.7'"#)
        );
        let Marker::Single(single) = m(r#""tegra" not in platform_release"#) else {
            panic!("Expected a single marker");
        };
        assert_eq!(single.operator(), MarkerOperator::NotContains);
        assert_eq!(single.name(), "platform_release");
    }

    #[test]
    fn not_in_whitespace() {
        assert_eq!(
            m("sys_platform not \t in 'linux'"),
            m("sys_platform not in 'linux'")
        );
    }

    #[test]
    fn error_invalid_name() {
        assert_eq!(
            parse_marker("python_version >= 3.8").unwrap_err().to_string(),
            indoc! {"
                Expected a valid marker name, found '3.8'
                python_version >= 3.8
                                  ^^^"
            }
        );
    }

    #[test]
    fn error_invalid_operator() {
        assert_eq!(
            parse_marker("python_version => '3.8'").unwrap_err().to_string(),
            indoc! {"
                Expected a valid marker operator (such as '>=' or 'not in'), found '=>'
                python_version => '3.8'
                               ^^"
            }
        );
    }

    #[test]
    fn error_unclosed_string() {
        assert_eq!(
            parse_marker(r#"os_name == "nt"#).unwrap_err().to_string(),
            indoc! {r#"
                Expected '"', found end of marker
                os_name == "nt
                           ^^^"#
            }
        );
    }

    #[test]
    fn error_unclosed_parenthesis() {
        assert_eq!(
            parse_marker("(os_name == 'nt'").unwrap_err().to_string(),
            indoc! {"
                Expected ')', found end of marker
                (os_name == 'nt'
                ^^^^^^^^^^^^^^^^"
            }
        );
    }

    #[test]
    fn error_end_of_input() {
        assert_eq!(
            parse_marker("os_name == 'nt' and").unwrap_err().to_string(),
            indoc! {"
                Expected marker value, found end of marker
                os_name == 'nt' and
                                   ^"
            }
        );
    }

    #[test]
    fn error_unexpected_word() {
        assert_eq!(
            parse_marker("os_name == 'nt' xor os_name == 'posix'")
                .unwrap_err()
                .to_string(),
            indoc! {"
                Unexpected character 'x', expected 'and', 'or' or end of input
                os_name == 'nt' xor os_name == 'posix'
                                ^^^^^^^^^^^^^^^^^^^^^^"
            }
        );
    }

    #[test]
    fn error_semantic() {
        assert_eq!(
            parse_marker("'linux' ~= sys_platform").unwrap_err().to_string(),
            indoc! {r#"
                Operator `~=` requires the marker name on the left, as in `sys_platform ~= "linux"`
                'linux' ~= sys_platform
                ^^^^^^^^^^^^^^^^^^^^^^^"#
            }
        );
        assert_eq!(
            parse_marker("sys_platform >= 'linux'").unwrap_err().to_string(),
            indoc! {"
                Operator `>=` is only supported for `python_version`, `python_full_version` and `platform_release`, not `sys_platform`
                sys_platform >= 'linux'
                ^^^^^^^^^^^^^^^^^^^^^^^"
            }
        );
        assert!(parse_marker("python_version == sys_platform").is_err());
        assert!(parse_marker("'a' == 'b'").is_err());
        assert!(parse_marker("python_version == 'three'").is_err());
        assert!(parse_marker("extra == '-invalid'").is_err());
    }

    #[test]
    fn error_unicode_width() {
        assert_eq!(
            parse_marker("os_name == 'ñ' ünd os_name == 'nt'")
                .unwrap_err()
                .to_string(),
            indoc! {"
                Unexpected character 'ü', expected 'and', 'or' or end of input
                os_name == 'ñ' ünd os_name == 'nt'
                               ^^^^^^^^^^^^^^^^^^^"
            }
        );
    }
}
