use matches::assert_matches;
use multiscan::{Error, Expr, ParseError, Regex};

#[test]
fn incomplete_escape_sequences_err() {
    let test_cases = ["\\u", "\\x"];
    for pattern in test_cases {
        assert_parse_error(pattern, "Parsing error at position 2: Invalid hex escape");
    }
    assert_parse_error(
        "\\U",
        "Parsing error at position 0: Invalid escape: \\U",
    );
}

#[test]
fn unbalanced_parens_err() {
    assert_parse_error(
        "(a",
        "Parsing error at position 2: Opening parenthesis without closing parenthesis",
    );
    assert_parse_error(
        "a)b",
        "Parsing error at position 1: Closing parenthesis without opening parenthesis",
    );
}

#[test]
fn dangling_quantifier_err() {
    for (pattern, position) in [("*a", 0), ("a|+", 2), ("(*)", 1), ("a**", 2)] {
        assert_parse_error(
            pattern,
            &format!(
                "Parsing error at position {}: Target of repeat operator is invalid",
                position
            ),
        );
    }
}

#[test]
fn class_errors() {
    assert_parse_error(
        "[z-a]",
        "Parsing error at position 1: Invalid character class range",
    );
    assert_parse_error("[a-c", "Parsing error at position 4: Invalid character class");
}

#[test]
fn backref_to_missing_group_err() {
    assert_parse_error("\\1", "Parsing error at position 0: Invalid back reference");
    assert_parse_error("(a)\\2", "Parsing error at position 3: Invalid back reference");
    // the group must be opened before it is referenced
    assert_parse_error("\\1(a)", "Parsing error at position 0: Invalid back reference");
}

#[test]
fn unknown_group_flag_err() {
    assert_parse_error("(?i)a", "Parsing error at position 0: Unknown group flag: (?i");
}

#[test]
fn deep_nesting_err() {
    let pattern = format!("{}a{}", "(".repeat(100), ")".repeat(100));
    let result = Regex::new(&pattern);
    assert_matches!(
        result,
        Err(Error::ParseError(_, ParseError::RecursionExceeded))
    );
}

#[test]
fn errors_are_not_incomplete() {
    let error = Regex::new("(").unwrap_err();
    assert!(!error.is_incomplete());
}

#[test]
fn parse_tree_counts_groups() {
    let tree = Expr::parse_tree(r"((a)(?:b)(?=(c)))\3").unwrap();
    assert_eq!(tree.group_count, 3);
    assert!(tree.backrefs.contains(3));
}

#[test]
fn to_str_reparses_to_same_tree() {
    for pattern in [
        r"a|b(c)*",
        r"(?<=x|yz)[^a-c]+?",
        r"\bfoo\B{2,5}",
        r"(a)(?!\1)$",
        r"[\]\-]",
    ] {
        let tree = Expr::parse_tree(pattern).unwrap();
        let mut buf = String::new();
        tree.expr.to_str(&mut buf, 0);
        let reparsed = Expr::parse_tree(&buf).unwrap();
        assert_eq!(tree.expr, reparsed.expr, "{} printed as {}", pattern, buf);
    }
}

#[cfg_attr(feature = "track_caller", track_caller)]
fn assert_parse_error(pattern: &str, expected_message: &str) {
    let result = Regex::new(pattern);
    assert!(
        result.is_err(),
        "Expected pattern '{}' to fail parsing",
        pattern
    );
    let error_message = result.unwrap_err().to_string();
    assert_eq!(
        error_message, expected_message,
        "Expected error message to contain '{}', but got: '{}'",
        expected_message, error_message
    );
}
