#![allow(dead_code)]

use multiscan::{build_multi_matcher, MatchResult, MultiMatcher, PatternEntry, Regex};

#[cfg_attr(feature = "track_caller", track_caller)]
pub fn regex(re: &str) -> Regex {
    let parse_result = Regex::new(re);
    assert!(
        parse_result.is_ok(),
        "Expected regex '{}' to be compiled successfully, got {:?}",
        re,
        parse_result.err()
    );
    parse_result.unwrap()
}

/// The span of the leftmost match as `(start, end)`.
#[cfg_attr(feature = "track_caller", track_caller)]
pub fn find(re: &str, text: &str) -> Option<(usize, usize)> {
    let result = regex(re).find(text);
    assert!(
        result.is_ok(),
        "Expected find to succeed, but was {:?}",
        result
    );
    result.unwrap().map(|m| (m.start(), m.end()))
}

#[cfg_attr(feature = "track_caller", track_caller)]
pub fn match_at(re: &str, text: &str, start: usize) -> Option<MatchResult> {
    let result = regex(re).match_at(text, start);
    assert!(
        result.is_ok(),
        "Expected match to succeed, but was {:?}",
        result
    );
    result.unwrap()
}

/// `(position, length)` of the match that starts exactly at `start`.
#[cfg_attr(feature = "track_caller", track_caller)]
pub fn match_anchored(re: &Regex, text: &str, start: usize) -> Option<(usize, usize)> {
    let result = re.match_anchored(text, start);
    assert!(
        result.is_ok(),
        "Expected match to succeed, but was {:?}",
        result
    );
    result.unwrap().map(|m| (m.position, m.length))
}

#[cfg_attr(feature = "track_caller", track_caller)]
pub fn matcher(patterns: &[PatternEntry]) -> MultiMatcher {
    let result = build_multi_matcher(patterns);
    assert!(
        result.is_ok(),
        "Expected pattern set to build successfully, got {:?}",
        result.err()
    );
    result.unwrap()
}

/// `(pattern_id, position, length)` of every match of the set, in scan order.
#[cfg_attr(feature = "track_caller", track_caller)]
pub fn scan(patterns: &[PatternEntry], text: &str) -> Vec<(usize, usize, usize)> {
    let result = matcher(patterns).scan(text);
    assert!(result.is_ok(), "Expected scan to succeed, but was {:?}", result);
    result
        .unwrap()
        .iter()
        .map(|m| (m.pattern_id, m.position, m.length))
        .collect()
}

/// What scanning for `patterns` must find: every pattern on its own, at
/// every char boundary of `text`.
pub fn scan_one_by_one(patterns: &[PatternEntry], text: &str) -> Vec<(usize, usize, usize)> {
    let mut expected = Vec::new();
    for entry in patterns {
        let source = match entry.kind {
            multiscan::PatternKind::Literal => regex_syntax::escape(&entry.source),
            multiscan::PatternKind::Regex => entry.source.clone(),
        };
        let re = regex(&source);
        for start in (0..=text.len()).filter(|&ix| text.is_char_boundary(ix)) {
            if let Some((position, length)) = match_anchored(&re, text, start) {
                expected.push((position, entry.id, length));
            }
        }
    }
    expected.sort();
    expected
        .into_iter()
        .map(|(position, id, length)| (id, position, length))
        .collect()
}
