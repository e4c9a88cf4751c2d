use multiscan::{MatchResult, Result, Span};

mod common;

#[test]
fn captures_after_lookbehind() {
    let text = " @another(foo bar)   ";
    let result = match_result(r"\s*(?<=[() ])(@\w+)(\([^)]*\))?\s*", text);
    assert_group(&result, text, 1, "@another", 1, 9);
    assert_group(&result, text, 2, "(foo bar)", 9, 18);
}

#[test]
fn captures_from_pos() {
    let text = "11 21 33";

    let regex = common::regex(r"(\d)\d");
    let result = assert_match_result(regex.match_at(text, 3));
    assert_eq!(result.captures_len(), 1);
    assert_group(&result, text, 0, "21", 3, 5);
    assert_group(&result, text, 1, "2", 3, 4);

    let regex = common::regex(r"(\d+)\1");
    let result = assert_match_result(regex.match_at(text, 3));
    assert_eq!(result.captures_len(), 1);
    assert_group(&result, text, 0, "33", 6, 8);
    assert_group(&result, text, 1, "3", 6, 7);
}

#[test]
fn whole_match_is_group_zero() {
    let text = "xx abc";
    let result = match_result(r"a(b)c", text);
    assert_eq!(result.position, 3);
    assert_eq!(result.length, 3);
    assert_eq!(result.end(), 6);
    assert_eq!(
        result.group(0),
        Some(Span {
            position: 3,
            length: 3
        })
    );
    assert_eq!(result.groups.len(), 2);
}

#[test]
fn unmatched_group_has_no_span() {
    let text = "b";
    let result = match_result(r"(a)?(b)", text);
    assert_eq!(result.captures_len(), 2);
    assert_eq!(result.group(1), None);
    assert_eq!(result.group_str(text, 1), None);
    assert_group(&result, text, 2, "b", 0, 1);
    assert_eq!(result.group(3), None);
}

#[test]
fn repeated_group_keeps_last_iteration() {
    let text = "abcd";
    let result = match_result(r"(\w)+", text);
    assert_group(&result, text, 0, "abcd", 0, 4);
    assert_group(&result, text, 1, "d", 3, 4);

    // same, but through the backtracking VM
    let text = "abcd!abcd";
    let result = match_result(r"(\w)+!\1?", text);
    assert_group(&result, text, 1, "d", 3, 4);
}

#[test]
fn nested_groups_are_numbered_by_opening_paren() {
    let text = "ab";
    let result = match_result(r"((a)(b))", text);
    assert_group(&result, text, 1, "ab", 0, 2);
    assert_group(&result, text, 2, "a", 0, 1);
    assert_group(&result, text, 3, "b", 1, 2);
}

#[test]
fn captures_with_multibyte() {
    let text = "ἀβγ δ";
    let result = match_result(r"(\w+) (\w)", text);
    assert_group(&result, text, 1, "ἀβγ", 0, 7);
    assert_group(&result, text, 2, "δ", 8, 10);
}

#[test]
fn anchored_match_does_not_search() {
    let text = "xab";
    let regex = common::regex(r"(a)b");
    assert_eq!(regex.match_anchored(text, 0).unwrap(), None);
    let result = assert_match_result(regex.match_anchored(text, 1));
    assert_group(&result, text, 1, "a", 1, 2);

    let regex = common::regex(r"(a)\1?b");
    assert_eq!(regex.match_anchored(text, 0).unwrap(), None);
    let result = assert_match_result(regex.match_anchored(text, 1));
    assert_group(&result, text, 0, "ab", 1, 3);
}

fn match_result(re: &str, text: &str) -> MatchResult {
    let regex = common::regex(re);
    assert_match_result(regex.match_at(text, 0))
}

#[cfg_attr(feature = "track_caller", track_caller)]
fn assert_match_result(result: Result<Option<MatchResult>>) -> MatchResult {
    assert!(
        result.is_ok(),
        "Expected match to succeed, but was {:?}",
        result
    );
    let result = result.unwrap();
    assert!(result.is_some(), "Expected a match, but was {:?}", result);
    result.unwrap()
}

#[cfg_attr(feature = "track_caller", track_caller)]
fn assert_group(
    result: &MatchResult,
    text: &str,
    i: usize,
    expected_text: &str,
    start: usize,
    end: usize,
) {
    let span = result.group(i);
    assert!(span.is_some(), "Expected group {}, but was {:?}", i, result);
    let span = span.unwrap();
    assert_eq!(result.group_str(text, i), Some(expected_text));
    assert_eq!(span.position, start);
    assert_eq!(span.end(), end);
}
