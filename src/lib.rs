// Copyright 2016 The Fancy Regex Authors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

/*!
A regex engine supporting backreferences and look-around, and a multi-pattern
matcher that scans a text once for a whole set of literal and regex patterns.

# Syntax

| Syntax | Meaning |
|--------|---------|
| `.` | any character except newline |
| `[a-z]`, `[^abc]` | character class, negated class |
| `\d \w \s \D \W \S` | digit, word and space classes (Unicode) |
| `*`, `+`, `?`, `{m,n}` | repetition, greedy; add `?` for lazy |
| `a\|b` | alternation, the first alternative is preferred |
| `( ... )`, `(?: ... )` | capturing group, non-capturing group |
| `\1` | backreference to the text captured by group 1 |
| `(?=`, `(?!` | positive, negative look-ahead |
| `(?<=`, `(?<!` | positive, negative look-behind |
| `^`, `$` | start, end of text |
| `\b`, `\B` | word boundary, not a word boundary |

All positions are byte offsets into the text and always fall on character
boundaries.

# Execution

Patterns without backreferences, and whose look-behinds have a bounded width,
are compiled into a Thompson NFA and simulated in time linear to the text
(look-around is evaluated by nested NFA searches). All other patterns are
compiled into a program for a backtracking VM, which is bounded by a
configurable backtrack limit:

```rust
use multiscan::Regex;

let re = Regex::new(r"(\w+) \1").unwrap();
let m = re.match_at("say hello hello", 0).unwrap().unwrap();
assert_eq!((m.position, m.length), (4, 11));
assert_eq!(m.group_str("say hello hello", 1), Some("hello"));
```

# Multiple patterns

```rust
use multiscan::{build_multi_matcher, PatternEntry};

let matcher = build_multi_matcher(&[
    PatternEntry::literal(1, "GET"),
    PatternEntry::regex(2, r"/[a-z]+\.html"),
])
.unwrap();
let hits = matcher.scan("GET /index.html").unwrap();
assert_eq!(hits.len(), 2);
assert_eq!((hits[0].pattern_id, hits[0].position), (1, 0));
assert_eq!((hits[1].pattern_id, hits[1].position), (2, 4));
```
*/

#![doc(html_root_url = "https://docs.rs/multiscan/0.1.0")]

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use log::debug;

mod analyze;
mod ahocorasick;
mod compile;
mod error;
mod multi;
mod nfa;
mod optimize;
mod parse;
mod vm;

use crate::analyze::analyze;
use crate::compile::{compile, compile_nfa};
use crate::nfa::Nfa;
use crate::optimize::optimize;
use crate::parse::Parser;
use crate::vm::Prog;

pub use crate::ahocorasick::{AhoCorasick, FindOverlappingIter, LiteralMatch};
pub use crate::error::{CompileError, Error, ParseError, Result, RuntimeError};
pub use crate::parse::ExprTree;
pub use crate::multi::{
    build_multi_matcher, scan, MultiMatcher, MultiMatcherBuilder, PatternEntry, PatternKind,
    SetMatch,
};

/// The version of the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const MAX_RECURSION: usize = 64;

const DEFAULT_BACKTRACK_LIMIT: usize = 1_000_000;

const DEFAULT_NFA_SIZE_LIMIT: usize = 10_000;

const DEFAULT_LOOKBEHIND_WINDOW: usize = 255;

/// A builder for a `Regex` to allow configuring options.
#[derive(Debug)]
pub struct RegexBuilder(RegexOptions);

/// A compiled regular expression.
///
/// Compiled regexes are immutable, so a single instance can be shared by
/// many threads, and cloning one is cheap.
#[derive(Clone)]
pub struct Regex {
    inner: RegexImpl,
    options: RegexOptions,
}

// Exactly one executable form is kept per regex.
#[derive(Clone)]
enum RegexImpl {
    Nfa {
        nfa: Arc<Nfa>,
        n_groups: usize,
        anchored_start: bool,
    },
    Backtrack {
        tree: Arc<ExprTree>,
        prog: Arc<Prog>,
        n_groups: usize,
    },
}

#[derive(Clone, Debug)]
struct RegexOptions {
    pattern: String,
    backtrack_limit: usize,
    nfa_size_limit: usize,
    lookbehind_window: usize,
}

impl Default for RegexOptions {
    fn default() -> Self {
        RegexOptions {
            pattern: String::new(),
            backtrack_limit: DEFAULT_BACKTRACK_LIMIT,
            nfa_size_limit: DEFAULT_NFA_SIZE_LIMIT,
            lookbehind_window: DEFAULT_LOOKBEHIND_WINDOW,
        }
    }
}

impl RegexBuilder {
    /// Create a new regex builder with a regex pattern.
    ///
    /// If the pattern is invalid, the call to `build` will fail later.
    pub fn new(pattern: &str) -> Self {
        let mut builder = RegexBuilder(RegexOptions::default());
        builder.0.pattern = pattern.to_string();
        builder
    }

    /// Build the `Regex`.
    ///
    /// Returns an [`Error`](enum.Error.html) if the pattern could not be parsed.
    pub fn build(&self) -> Result<Regex> {
        Regex::new_options(self.0.clone())
    }

    /// Limit for how many times backtracking should be attempted for fancy regexes (where
    /// backtracking is used). If this limit is exceeded, execution returns an error with
    /// [`RuntimeError::BacktrackLimitExceeded`](enum.RuntimeError.html#variant.BacktrackLimitExceeded).
    /// This is for preventing a regex with catastrophic backtracking to run for too long.
    ///
    /// Default is `1_000_000` (1 million).
    pub fn backtrack_limit(&mut self, limit: usize) -> &mut Self {
        self.0.backtrack_limit = limit;
        self
    }

    /// Maximum number of NFA states a pattern may compile to. Patterns that
    /// would need more states are run by the backtracking VM instead, which
    /// finds the same matches.
    ///
    /// Default is `10_000`.
    pub fn nfa_size_limit(&mut self, limit: usize) -> &mut Self {
        self.0.nfa_size_limit = limit;
        self
    }

    /// Number of characters a look-behind without a static width bound (such
    /// as `(?<=a+)`) scans back from the current position.
    ///
    /// Default is `255`.
    pub fn lookbehind_window(&mut self, window: usize) -> &mut Self {
        self.0.lookbehind_window = window;
        self
    }
}

/// Compile a pattern with default options. Same as [`Regex::new`].
pub fn compile_pattern(re: &str) -> Result<Regex> {
    Regex::new(re)
}

/// A span of the text, as a byte offset and a byte length.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// Byte offset where the span starts.
    pub position: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Span {
    /// The byte offset just past the end of the span.
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// The span as a range of byte offsets.
    pub fn range(&self) -> Range<usize> {
        self.position..self.end()
    }
}

/// The result of a successful match: the matched span and the spans of all
/// capture groups.
///
/// `groups[0]` is always the span of the whole match. `groups[i]` for `i >= 1`
/// is `None` when group `i` did not participate in the match (for example
/// because it is in an alternative that was not taken), and `Some` span
/// otherwise, which may be empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    /// Byte offset where the match starts.
    pub position: usize,
    /// Length of the match in bytes.
    pub length: usize,
    /// Spans of the capture groups, indexed by group number.
    pub groups: Vec<Option<Span>>,
}

impl MatchResult {
    fn from_slots(slots: &[Option<usize>], n_groups: usize) -> Option<MatchResult> {
        let position = slots.first().copied().flatten()?;
        let end = slots.get(1).copied().flatten()?;
        let groups = (0..=n_groups)
            .map(|i| match (slots.get(i * 2), slots.get(i * 2 + 1)) {
                (Some(&Some(lo)), Some(&Some(hi))) => Some(Span {
                    position: lo,
                    length: hi - lo,
                }),
                _ => None,
            })
            .collect();
        Some(MatchResult {
            position,
            length: end - position,
            groups,
        })
    }

    /// The byte offset just past the end of the match.
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// The span of group `i`, where group 0 is the whole match.
    pub fn group(&self, i: usize) -> Option<Span> {
        self.groups.get(i).copied().flatten()
    }

    /// The text of group `i` in `text`, which must be the text that was matched.
    pub fn group_str<'t>(&self, text: &'t str, i: usize) -> Option<&'t str> {
        self.group(i).map(|span| &text[span.range()])
    }

    /// The number of capture groups, not counting the whole match.
    pub fn captures_len(&self) -> usize {
        self.groups.len() - 1
    }
}

/// A single match of a regex in a text.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Match<'t> {
    text: &'t str,
    start: usize,
    end: usize,
}

impl<'t> Match<'t> {
    /// Returns the starting byte offset of the match in the text.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the ending byte offset of the match in the text.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns the range over the starting and ending byte offsets of the match in text.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns the matched text.
    #[inline]
    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.end]
    }
}

impl<'t> From<Match<'t>> for Range<usize> {
    fn from(m: Match<'t>) -> Range<usize> {
        m.range()
    }
}

/// An iterator over all non-overlapping matches for a particular string.
///
/// The iterator yields a `Result<Match>`. The iterator stops when no more
/// matches can be found.
///
/// `'r` is the lifetime of the compiled regular expression and `'t` is the
/// lifetime of the matched string.
#[derive(Debug)]
pub struct Matches<'r, 't> {
    re: &'r Regex,
    text: &'t str,
    last_end: usize,
    last_match: Option<usize>,
}

impl<'r, 't> Iterator for Matches<'r, 't> {
    type Item = Result<Match<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.last_end > self.text.len() {
            return None;
        }

        let mat = match self.re.find_from_pos(self.text, self.last_end) {
            Err(error) => {
                // an aborted search ends the iteration
                self.last_end = self.text.len() + 1;
                return Some(Err(error));
            }
            Ok(None) => return None,
            Ok(Some(mat)) => mat,
        };

        if mat.start == mat.end {
            // This is an empty match. To ensure we make progress, start
            // the next search at the smallest possible starting position
            // of the next match following this one.
            self.last_end = next_codepoint_ix(self.text, mat.end);
            // Don't accept empty matches immediately following a match.
            // Just move on to the next match.
            if Some(mat.end) == self.last_match {
                return self.next();
            }
        } else {
            self.last_end = mat.end;
        }

        self.last_match = Some(mat.end);

        Some(Ok(mat))
    }
}

impl fmt::Debug for Regex {
    /// Shows the original regular expression.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Regex {
    /// Shows the original regular expression
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Regex {
    /// Parse and compile a regex with default options, see `RegexBuilder`.
    ///
    /// Returns an [`Error`](enum.Error.html) if the pattern could not be parsed.
    pub fn new(re: &str) -> Result<Regex> {
        let options = RegexOptions {
            pattern: re.to_string(),
            ..RegexOptions::default()
        };
        Self::new_options(options)
    }

    fn new_options(options: RegexOptions) -> Result<Regex> {
        let tree = Expr::parse_tree(&options.pattern)?;
        Ok(Self::from_tree(tree, options))
    }

    // Compilation itself cannot fail, everything that can go wrong is
    // reported by the parser.
    fn from_tree(tree: ExprTree, options: RegexOptions) -> Regex {
        let tree = Arc::new(ExprTree {
            expr: optimize(tree.expr),
            ..tree
        });
        let info = analyze(&tree.expr);
        let n_groups = tree.group_count;

        if !info.hard {
            if let Some(nfa) = compile_nfa(&info, n_groups, options.nfa_size_limit) {
                debug!(
                    "compiled {:?} to an NFA with {} states",
                    options.pattern,
                    nfa.len()
                );
                let inner = RegexImpl::Nfa {
                    nfa: Arc::new(nfa),
                    n_groups,
                    anchored_start: info.anchored_start,
                };
                return Regex { inner, options };
            }
            debug!(
                "{:?} exceeds the NFA size limit of {}, using backtracking",
                options.pattern, options.nfa_size_limit
            );
        } else {
            debug!(
                "{:?} needs backtracking (backreference or unbounded look-behind)",
                options.pattern
            );
        }

        let prog = compile(&info, n_groups, options.lookbehind_window);
        let inner = RegexImpl::Backtrack {
            tree,
            prog: Arc::new(prog),
            n_groups,
        };
        Regex { inner, options }
    }

    /// Returns the original string of this regex.
    pub fn as_str(&self) -> &str {
        &self.options.pattern
    }

    /// Returns the number of capture groups in the regex, not counting the
    /// implicit group 0 for the whole match.
    pub fn captures_len(&self) -> usize {
        match &self.inner {
            RegexImpl::Nfa { n_groups, .. } | RegexImpl::Backtrack { n_groups, .. } => *n_groups,
        }
    }

    /// Returns true if the regex is executed by the backtracking VM rather
    /// than by NFA simulation.
    pub fn is_backtracking(&self) -> bool {
        matches!(self.inner, RegexImpl::Backtrack { .. })
    }

    /// Returns the parsed expression of a regex that is executed by
    /// backtracking.
    pub fn expr(&self) -> Option<&Expr> {
        match &self.inner {
            RegexImpl::Backtrack { tree, .. } => Some(&tree.expr),
            RegexImpl::Nfa { .. } => None,
        }
    }

    /// Check if the regex matches the input text.
    ///
    /// # Example
    ///
    /// Test if some text contains the same word twice:
    ///
    /// ```rust
    /// # use multiscan::Regex;
    ///
    /// let re = Regex::new(r"(\w+) \1").unwrap();
    /// assert!(re.is_match("mirror mirror on the wall").unwrap());
    /// ```
    pub fn is_match(&self, text: &str) -> Result<bool> {
        Ok(self.search(text, 0, false)?.is_some())
    }

    /// Find the first match in the input text.
    ///
    /// If you have capturing groups in your regex that you want to extract, use
    /// [`match_at`](#method.match_at) instead.
    ///
    /// # Example
    ///
    /// Find a word that is followed by an exclamation point:
    ///
    /// ```rust
    /// # use multiscan::Regex;
    ///
    /// let re = Regex::new(r"\w+(?=!)").unwrap();
    /// assert_eq!(re.find("so fancy!").unwrap().unwrap().as_str(), "fancy");
    /// ```
    pub fn find<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>> {
        self.find_from_pos(text, 0)
    }

    /// Returns the first match in `text`, starting from the specified byte position `pos`.
    ///
    /// Note that look-behind and `^` still see the text before `pos`, which
    /// is not the same as searching `&text[pos..]`.
    pub fn find_from_pos<'t>(&self, text: &'t str, pos: usize) -> Result<Option<Match<'t>>> {
        let result = self.search(text, pos, false)?;
        Ok(result.and_then(|slots| match (slots[0], slots[1]) {
            (Some(start), Some(end)) => Some(Match { text, start, end }),
            _ => None,
        }))
    }

    /// Returns an iterator for each successive non-overlapping match in `text`.
    ///
    /// If you have capturing groups in your regex that you want to extract,
    /// call [`match_at`](#method.match_at) at each match position instead.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        Matches {
            re: self,
            text,
            last_end: 0,
            last_match: None,
        }
    }

    /// Finds the leftmost match at or after `start`, with the spans of all
    /// capture groups.
    ///
    /// Returns `Ok(None)` if there is no match, and an error if the search
    /// was aborted by the backtrack limit, so an aborted search is never
    /// mistaken for a text that does not match.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use multiscan::{Regex, Span};
    /// let re = Regex::new(r"((a)(b))").unwrap();
    /// let m = re.match_at("ab", 0).unwrap().unwrap();
    /// assert_eq!(m.group(2), Some(Span { position: 0, length: 1 }));
    /// assert_eq!(m.group(3), Some(Span { position: 1, length: 1 }));
    /// ```
    pub fn match_at(&self, text: &str, start: usize) -> Result<Option<MatchResult>> {
        let slots = self.search(text, start, false)?;
        Ok(slots.and_then(|slots| MatchResult::from_slots(&slots, self.captures_len())))
    }

    /// Like [`match_at`](#method.match_at), but the match must begin exactly
    /// at `start`.
    pub fn match_anchored(&self, text: &str, start: usize) -> Result<Option<MatchResult>> {
        let slots = self.search(text, start, true)?;
        Ok(slots.and_then(|slots| MatchResult::from_slots(&slots, self.captures_len())))
    }

    fn search(&self, text: &str, start: usize, anchored: bool) -> Result<Option<Vec<Option<usize>>>> {
        if start > text.len() || (anchored && !text.is_char_boundary(start)) {
            return Ok(None);
        }
        let mut start = start;
        while !text.is_char_boundary(start) {
            start += 1;
        }
        match &self.inner {
            RegexImpl::Nfa {
                nfa,
                anchored_start,
                ..
            } => {
                if *anchored_start && start > 0 {
                    return Ok(None);
                }
                Ok(nfa::search(nfa, text, start, anchored, None))
            }
            RegexImpl::Backtrack { prog, .. } => {
                let result = vm::run(prog, text, start, anchored, self.options.backtrack_limit)?;
                Ok(result.map(|saves| {
                    saves
                        .into_iter()
                        .map(|slot| if slot == usize::MAX { None } else { Some(slot) })
                        .collect()
                }))
            }
        }
    }
}

/// Regular expression AST. This is public for now but may change.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Expr {
    /// An empty expression, e.g. the last branch in `(a|b|)`
    Empty,
    /// Any character except newline, regex `.`
    Any,
    /// An assertion
    Assertion(Assertion),
    /// A literal string; the parser produces one node per character and
    /// the optimizer merges adjacent ones
    Literal(String),
    /// A character class, e.g. `[a-z]` or `\d`
    Class(CharClass),
    /// Concatenation of multiple expressions, must match in order, e.g. `a.` is a concatenation of
    /// the literal `a` and `.` for any character
    Concat(Vec<Expr>),
    /// Alternative of multiple expressions, one of them must match, e.g. `a|b` is an alternative
    /// where either the literal `a` or `b` must match
    Alt(Vec<Expr>),
    /// Capturing group of expression, e.g. `(a.)` matches `a` and any character and "captures"
    /// (remembers) the match
    Group {
        /// The group number, assigned in the order of the opening parentheses
        index: usize,
        /// The grouped expression
        child: Box<Expr>,
    },
    /// Look-around (e.g. positive/negative look-ahead or look-behind) with an expression, e.g.
    /// `(?=b)` means the next character must be `b` (but the match shouldn't include `b`)
    LookAround(Box<Expr>, LookAround),
    /// Repeat of an expression, e.g. `a*` or `a+` or `a{1,3}`
    Repeat {
        /// The expression that is being repeated
        child: Box<Expr>,
        /// The minimum number of repetitions
        lo: usize,
        /// The maximum number of repetitions (or `usize::MAX`)
        hi: usize,
        /// Greedy means as much as possible is matched, e.g. `.*b` would match all of `abab`.
        /// Non-greedy means as little as possible, e.g. `.*?b` would match only `ab` in `abab`.
        greedy: bool,
    },
    /// Back reference to a capture group, e.g. `\1` in `(abc|def)\1` references the captured group
    /// and the whole regex matches either `abcabc` or `defdef`.
    Backref(usize),
}

/// Type of look-around assertion as used for a look-around expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LookAround {
    /// Look-ahead assertion, e.g. `(?=a)`
    LookAhead,
    /// Negative look-ahead assertion, e.g. `(?!a)`
    LookAheadNeg,
    /// Look-behind assertion, e.g. `(?<=a)`
    LookBehind,
    /// Negative look-behind assertion, e.g. `(?<!a)`
    LookBehindNeg,
}

/// Type of zero-width assertion.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Assertion {
    /// Start of input text
    StartText,
    /// End of input text
    EndText,
    /// Word boundary, `\b`
    WordBoundary,
    /// Not a word boundary, `\B`
    NotWordBoundary,
}

impl Assertion {
    /// Whether the assertion holds at byte position `ix` of `s`. Positions
    /// before the start and at the end of the text count as non-word.
    pub(crate) fn holds(self, s: &str, ix: usize) -> bool {
        match self {
            Assertion::StartText => ix == 0,
            Assertion::EndText => ix == s.len(),
            Assertion::WordBoundary => is_word_boundary(s, ix),
            Assertion::NotWordBoundary => !is_word_boundary(s, ix),
        }
    }
}

/// A set of characters, stored as sorted, non-overlapping inclusive ranges.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CharClass {
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharClass {
    /// Create a class from inclusive ranges; the ranges may overlap and come
    /// in any order. A negated class matches every character not in the ranges.
    pub fn new(ranges: Vec<(char, char)>, negated: bool) -> CharClass {
        let mut ranges = ranges;
        ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            if let Some(last) = merged.last_mut() {
                if (lo as u32) <= (last.1 as u32).saturating_add(1) {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                    continue;
                }
            }
            merged.push((lo, hi));
        }
        CharClass {
            ranges: merged,
            negated,
        }
    }

    /// The ranges of the class, sorted and non-overlapping.
    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    /// Whether the class is negated, e.g. `[^a-z]`.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Test whether the class contains `c`.
    pub fn matches(&self, c: char) -> bool {
        let found = self
            .ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < c {
                    std::cmp::Ordering::Less
                } else if lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        found != self.negated
    }

    /// The ranges of the characters this class matches, with negation
    /// resolved.
    pub(crate) fn positive_ranges(&self) -> Vec<(char, char)> {
        if !self.negated {
            return self.ranges.clone();
        }
        complement(&self.ranges)
    }
}

// Complement of sorted, non-overlapping ranges over all scalar values.
fn complement(ranges: &[(char, char)]) -> Vec<(char, char)> {
    let mut result = Vec::new();
    let mut next = Some('\0');
    for &(lo, hi) in ranges {
        if let Some(start) = next {
            if start < lo {
                if let Some(end) = prev_char(lo) {
                    result.push((start, end));
                }
            }
        }
        next = next_char(hi);
    }
    if let Some(start) = next {
        result.push((start, char::MAX));
    }
    result
}

fn next_char(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        char::MAX => None,
        c => char::from_u32(c as u32 + 1),
    }
}

fn prev_char(c: char) -> Option<char> {
    match c {
        '\0' => None,
        '\u{E000}' => Some('\u{D7FF}'),
        c => char::from_u32(c as u32 - 1),
    }
}

// silly to write my own, but this is super-fast for the common 1-digit
// case.
fn push_usize(s: &mut String, x: usize) {
    if x >= 10 {
        push_usize(s, x / 10);
        s.push((b'0' + (x % 10) as u8) as char);
    } else {
        s.push((b'0' + (x as u8)) as char);
    }
}

fn push_class_char(buf: &mut String, c: char) {
    match c {
        '\n' => buf.push_str("\\n"),
        '\t' => buf.push_str("\\t"),
        '\r' => buf.push_str("\\r"),
        c if c.is_control() => {
            buf.push_str("\\x{");
            buf.push_str(&format!("{:x}", c as u32));
            buf.push('}');
        }
        c => {
            let mut tmp = [0; 4];
            regex_syntax::escape_into(c.encode_utf8(&mut tmp), buf);
        }
    }
}

impl Expr {
    /// Parse the regex and return an expression (AST), along with the number
    /// of capture groups and the groups referenced by backrefs.
    pub fn parse_tree(re: &str) -> Result<ExprTree> {
        Parser::parse(re)
    }

    /// Convert expression to a regex string in the syntax accepted by this
    /// crate's parser. The precedence is the tightest binding the
    /// surroundings require: 0 for anything, 1 inside a concatenation, 2 as
    /// the target of a repetition.
    pub fn to_str(&self, buf: &mut String, precedence: u8) {
        match *self {
            Expr::Empty => (),
            Expr::Any => buf.push('.'),
            Expr::Literal(ref val) => {
                if precedence > 1 && val.chars().count() > 1 {
                    buf.push_str("(?:");
                }
                for c in val.chars() {
                    push_class_char(buf, c);
                }
                if precedence > 1 && val.chars().count() > 1 {
                    buf.push(')');
                }
            }
            Expr::Class(ref class) => {
                buf.push('[');
                if class.negated {
                    buf.push('^');
                }
                for &(lo, hi) in &class.ranges {
                    push_class_char(buf, lo);
                    if hi != lo {
                        buf.push('-');
                        push_class_char(buf, hi);
                    }
                }
                buf.push(']');
            }
            Expr::Assertion(assertion) => buf.push_str(match assertion {
                Assertion::StartText => "^",
                Assertion::EndText => "$",
                Assertion::WordBoundary => "\\b",
                Assertion::NotWordBoundary => "\\B",
            }),
            Expr::Concat(ref children) => {
                if precedence > 1 {
                    buf.push_str("(?:");
                }
                for child in children {
                    child.to_str(buf, 2);
                }
                if precedence > 1 {
                    buf.push(')')
                }
            }
            Expr::Alt(ref children) => {
                if precedence > 0 {
                    buf.push_str("(?:");
                }
                for (i, child) in children.iter().enumerate() {
                    if i != 0 {
                        buf.push('|');
                    }
                    child.to_str(buf, 1);
                }
                if precedence > 0 {
                    buf.push(')');
                }
            }
            Expr::Group { ref child, .. } => {
                buf.push('(');
                child.to_str(buf, 0);
                buf.push(')');
            }
            Expr::LookAround(ref child, la) => {
                buf.push_str(match la {
                    LookAround::LookAhead => "(?=",
                    LookAround::LookAheadNeg => "(?!",
                    LookAround::LookBehind => "(?<=",
                    LookAround::LookBehindNeg => "(?<!",
                });
                child.to_str(buf, 0);
                buf.push(')');
            }
            Expr::Repeat {
                ref child,
                lo,
                hi,
                greedy,
            } => {
                if precedence > 2 {
                    buf.push_str("(?:");
                }
                child.to_str(buf, 3);
                buf.push('{');
                push_usize(buf, lo);
                buf.push(',');
                if hi != usize::MAX {
                    push_usize(buf, hi);
                }
                buf.push('}');
                if !greedy {
                    buf.push('?');
                }
                if precedence > 2 {
                    buf.push(')');
                }
            }
            Expr::Backref(group) => {
                buf.push_str("(?:\\");
                push_usize(buf, group);
                buf.push(')');
            }
        }
    }
}

// precondition: ix > 0
fn prev_codepoint_ix(s: &str, mut ix: usize) -> usize {
    let bytes = s.as_bytes();
    loop {
        ix -= 1;
        // fancy bit magic for ranges 0..0x80 + 0xc0..
        if (bytes[ix] as i8) >= -0x40 {
            break;
        }
    }
    ix
}

fn next_codepoint_ix(s: &str, ix: usize) -> usize {
    if ix >= s.len() {
        return ix + 1;
    }
    ix + codepoint_len(s.as_bytes()[ix])
}

fn codepoint_len(b: u8) -> usize {
    match b {
        b if b < 0x80 => 1,
        b if b < 0xe0 => 2,
        b if b < 0xf0 => 3,
        _ => 4,
    }
}

fn char_at(s: &str, ix: usize) -> Option<char> {
    s[ix..].chars().next()
}

fn is_word_char_before(s: &str, ix: usize) -> bool {
    s[..ix]
        .chars()
        .next_back()
        .map_or(false, regex_syntax::is_word_character)
}

fn is_word_boundary(s: &str, ix: usize) -> bool {
    let after = char_at(s, ix).map_or(false, regex_syntax::is_word_character);
    is_word_char_before(s, ix) != after
}

/// These are only used for benchmarks and tests and may change at any time.
#[doc(hidden)]
pub mod internal {
    pub use crate::analyze::{analyze, Info};
    pub use crate::compile::{compile, compile_nfa, compile_nfa_many};
    pub use crate::nfa::{search, Nfa};
    pub use crate::optimize::optimize;
    pub use crate::vm::{run, Insn, Prog};
}
