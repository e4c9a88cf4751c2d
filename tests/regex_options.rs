use multiscan::{Error, MultiMatcherBuilder, PatternEntry, Regex, RegexBuilder, RuntimeError};

pub fn build_regex(builder: &RegexBuilder) -> Regex {
    let result = builder.build();
    assert!(
        result.is_ok(),
        "Expected regex to build successfully, got {:?}",
        result.err()
    );
    result.unwrap()
}

#[test]
fn check_backtrack_limit_option() {
    let regex = build_regex(RegexBuilder::new(r"(a*)*b\1").backtrack_limit(10));

    let result = regex.is_match("aaaaaaaaaaaaaaaaaaaa");
    assert!(matches!(
        result,
        Err(Error::RuntimeError(RuntimeError::BacktrackLimitExceeded))
    ));
    assert!(result.unwrap_err().is_incomplete());
}

#[test]
fn check_default_backtrack_limit_is_enough_for_simple_patterns() {
    let regex = build_regex(&RegexBuilder::new(r"(\w+)\s+\1"));

    assert!(regex.is_match("the the").unwrap_or_default());
    assert!(!regex.is_match("the cat").unwrap_or_default());
}

#[test]
fn check_nfa_size_limit_option() {
    let regex = build_regex(&RegexBuilder::new(r"[a-z]{50}"));
    assert!(!regex.is_backtracking());

    let regex = build_regex(RegexBuilder::new(r"[a-z]{50}").nfa_size_limit(10));
    assert!(regex.is_backtracking());
    assert!(regex.is_match(&"x".repeat(50)).unwrap_or_default());
    assert!(!regex.is_match(&"x".repeat(49)).unwrap_or_default());
}

#[test]
fn check_lookbehind_window_option() {
    let text = format!("{}x", "a".repeat(10));

    let regex = build_regex(RegexBuilder::new(r"(?<=^a+)x").lookbehind_window(20));
    assert!(regex.is_match(&text).unwrap_or_default());

    let regex = build_regex(RegexBuilder::new(r"(?<=^a+)x").lookbehind_window(5));
    assert!(!regex.is_match(&text).unwrap_or_default());
}

#[test]
fn check_multi_matcher_options() {
    let patterns = [
        PatternEntry::regex(0, r"(a*)*b\1"),
        PatternEntry::literal(1, "aaa"),
    ];
    let matcher = MultiMatcherBuilder::new()
        .backtrack_limit(10)
        .build(&patterns)
        .unwrap();

    let result = matcher.scan("aaaaaaaaaaaaaaaaaaaa");
    assert!(matches!(
        result,
        Err(Error::RuntimeError(RuntimeError::BacktrackLimitExceeded))
    ));
}
