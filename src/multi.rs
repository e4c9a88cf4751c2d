// Copyright 2025 The Fancy Regex Authors.
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

//! Matching a whole set of literal and regex patterns in one pass over the
//! text.
//!
//! A [`MultiMatcher`] reports, for every pattern:
//!
//! - literal patterns: every occurrence, overlapping ones included;
//! - regex patterns: at every char boundary, the match of the pattern that
//!   starts exactly there, if any.
//!
//! This is the same set of matches that running each pattern on its own at
//! every position gives, so combining patterns changes how fast a scan is,
//! never what it finds.
//!
//! # Performance
//!
//! Patterns are split in three groups when the matcher is built:
//!
//! - **Literals**, and regexes that only ever match one fixed string, go into
//!   a single Aho-Corasick automaton.
//! - **Easy regexes** (no backreferences, bounded look-behind) are merged
//!   into one Thompson NFA with a shared start state. While scanning, a new
//!   "lane" of threads is started at every position and all live lanes advance
//!   together over the same cursor.
//! - **Hard regexes** are matched individually with the backtracking VM at
//!   each position.
//!
//! # Example
//!
//! ```rust
//! use multiscan::{MultiMatcherBuilder, PatternEntry};
//!
//! # fn main() -> Result<(), multiscan::Error> {
//! let matcher = MultiMatcherBuilder::new().build(&[
//!     PatternEntry::literal(10, "cat"),
//!     PatternEntry::regex(20, r"c(a|o)t"),
//!     PatternEntry::regex(30, r"(\w)\1"),
//! ])?;
//!
//! let hits = matcher.scan("cot cat moo")?;
//! let found: Vec<_> = hits
//!     .iter()
//!     .map(|m| (m.pattern_id, m.position, m.length))
//!     .collect();
//! assert_eq!(found, vec![(20, 0, 3), (10, 4, 3), (20, 4, 3), (30, 9, 2)]);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bit_set::BitSet;
use log::debug;
use rayon::prelude::*;

use crate::ahocorasick::AhoCorasick;
use crate::analyze::analyze;
use crate::compile::compile_nfa_many;
use crate::nfa::{self, Cache, Nfa, Threads};
use crate::optimize::optimize;
use crate::{next_codepoint_ix, CompileError, Error, Expr, ExprTree, MatchResult};
use crate::{Regex, RegexOptions, Result, RuntimeError, Span};

/// How the source of a `PatternEntry` is interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// The source is matched verbatim
    Literal,
    /// The source is regex syntax
    Regex,
}

/// A pattern of a pattern set, with the id its matches are reported under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternEntry {
    /// Caller supplied id; ids need not be unique or dense
    pub id: usize,
    /// How `source` is interpreted
    pub kind: PatternKind,
    /// The literal or the regex
    pub source: String,
}

impl PatternEntry {
    /// A pattern that matches `source` verbatim.
    pub fn literal(id: usize, source: &str) -> PatternEntry {
        PatternEntry {
            id,
            kind: PatternKind::Literal,
            source: source.to_string(),
        }
    }

    /// A pattern in regex syntax.
    pub fn regex(id: usize, source: &str) -> PatternEntry {
        PatternEntry {
            id,
            kind: PatternKind::Regex,
            source: source.to_string(),
        }
    }
}

/// A match found by a `MultiMatcher`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetMatch {
    /// Id of the pattern that matched
    pub pattern_id: usize,
    /// Byte offset where the match starts
    pub position: usize,
    /// Length of the match in bytes
    pub length: usize,
    /// `groups[0]` is the whole match; regex patterns also have the spans of
    /// their capture groups, `None` for groups that did not participate
    pub groups: Vec<Option<Span>>,
}

impl SetMatch {
    fn from_result(pattern_id: usize, m: MatchResult) -> SetMatch {
        SetMatch {
            pattern_id,
            position: m.position,
            length: m.length,
            groups: m.groups,
        }
    }

    fn literal(pattern_id: usize, position: usize, length: usize) -> SetMatch {
        SetMatch {
            pattern_id,
            position,
            length,
            groups: vec![Some(Span { position, length })],
        }
    }

    /// The byte offset just past the end of the match.
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// The matched text, `text` being the scanned text.
    pub fn as_str<'t>(&self, text: &'t str) -> &'t str {
        &text[self.position..self.end()]
    }
}

/// A builder for a `MultiMatcher`, taking the same options as `RegexBuilder`.
/// They apply to every regex of the set.
#[derive(Debug, Default)]
pub struct MultiMatcherBuilder(RegexOptions);

impl MultiMatcherBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        MultiMatcherBuilder(RegexOptions::default())
    }

    /// See [`RegexBuilder::backtrack_limit`](../struct.RegexBuilder.html#method.backtrack_limit).
    pub fn backtrack_limit(&mut self, limit: usize) -> &mut Self {
        self.0.backtrack_limit = limit;
        self
    }

    /// See [`RegexBuilder::nfa_size_limit`](../struct.RegexBuilder.html#method.nfa_size_limit).
    /// The combined automaton may have up to this many states per regex it
    /// holds.
    pub fn nfa_size_limit(&mut self, limit: usize) -> &mut Self {
        self.0.nfa_size_limit = limit;
        self
    }

    /// See [`RegexBuilder::lookbehind_window`](../struct.RegexBuilder.html#method.lookbehind_window).
    pub fn lookbehind_window(&mut self, window: usize) -> &mut Self {
        self.0.lookbehind_window = window;
        self
    }

    /// Build the matcher for the pattern set.
    ///
    /// Every pattern is parsed before anything is matched, and the first
    /// pattern that fails is reported as a
    /// [`CompileError::InvalidPattern`](enum.CompileError.html) with its id.
    pub fn build(&self, patterns: &[PatternEntry]) -> Result<MultiMatcher> {
        MultiMatcher::new_options(patterns, &self.0)
    }
}

/// Build a matcher for the pattern set with default options, see
/// `MultiMatcherBuilder`.
pub fn build_multi_matcher(patterns: &[PatternEntry]) -> Result<MultiMatcher> {
    MultiMatcherBuilder::new().build(patterns)
}

/// Scan `text` with `matcher`, same as [`MultiMatcher::scan`].
pub fn scan(matcher: &MultiMatcher, text: &str) -> Result<Vec<SetMatch>> {
    matcher.scan(text)
}

/// A compiled set of literal and regex patterns.
///
/// The matcher is immutable; it is cheaply cloneable (via `Arc`) and can scan
/// many texts from many threads at once.
#[derive(Clone, Debug)]
pub struct MultiMatcher {
    inner: Arc<MultiMatcherImpl>,
}

#[derive(Debug)]
struct MultiMatcherImpl {
    literals: Option<AhoCorasick>,
    easy_patterns: Option<EasyPatternSet>,
    /// Regexes matched one by one at every position.
    hard_patterns: Vec<Pattern>,
    pattern_count: usize,
}

#[derive(Debug)]
struct EasyPatternSet {
    nfa: Nfa,
    /// Caller id and group count of each pattern of the automaton.
    patterns: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
struct Pattern {
    pattern_id: usize,
    regex: Regex,
}

// What a single entry compiles to.
enum Compiled {
    Literal(usize, String),
    Easy(usize, ExprTree),
    Hard(Pattern),
}

fn compile_entry(entry: &PatternEntry, options: &RegexOptions) -> Result<Compiled> {
    if entry.kind == PatternKind::Literal {
        return Ok(Compiled::Literal(entry.id, entry.source.clone()));
    }
    let tree = Expr::parse_tree(&entry.source).map_err(|error| {
        Error::CompileError(CompileError::InvalidPattern {
            id: entry.id,
            error: Box::new(error),
        })
    })?;
    let tree = ExprTree {
        expr: optimize(tree.expr),
        ..tree
    };
    if tree.group_count == 0 {
        if let Some(literal) = analyze(&tree.expr).literal() {
            return Ok(Compiled::Literal(entry.id, literal));
        }
    }
    let options = RegexOptions {
        pattern: entry.source.clone(),
        ..options.clone()
    };
    let regex = Regex::from_tree(tree.clone(), options);
    if regex.is_backtracking() {
        Ok(Compiled::Hard(Pattern {
            pattern_id: entry.id,
            regex,
        }))
    } else {
        Ok(Compiled::Easy(entry.id, tree))
    }
}

impl MultiMatcher {
    fn new_options(patterns: &[PatternEntry], options: &RegexOptions) -> Result<MultiMatcher> {
        let compiled = patterns
            .par_iter()
            .map(|entry| compile_entry(entry, options))
            .collect::<Result<Vec<_>>>()?;

        let mut literals = Vec::new();
        let mut easy = Vec::new();
        let mut hard_patterns = Vec::new();
        for c in compiled {
            match c {
                Compiled::Literal(id, literal) => literals.push((id, literal)),
                Compiled::Easy(id, tree) => easy.push((id, tree)),
                Compiled::Hard(pattern) => hard_patterns.push(pattern),
            }
        }

        let mut easy_patterns = None;
        if !easy.is_empty() {
            let infos = easy
                .iter()
                .map(|(_, tree)| (analyze(&tree.expr), tree.group_count))
                .collect::<Vec<_>>();
            let refs = infos.iter().map(|(info, n)| (info, *n)).collect::<Vec<_>>();
            let size_limit = options
                .nfa_size_limit
                .saturating_mul(easy.len())
                .saturating_add(1);
            match compile_nfa_many(&refs, size_limit) {
                Some(nfa) => {
                    debug!(
                        "combined {} regexes into an NFA with {} states",
                        easy.len(),
                        nfa.len()
                    );
                    easy_patterns = Some(EasyPatternSet {
                        nfa,
                        patterns: easy.iter().map(|(id, tree)| (*id, tree.group_count)).collect(),
                    });
                }
                None => {
                    debug!(
                        "{} regexes exceed the combined NFA size limit, matching them one by one",
                        easy.len()
                    );
                    for (id, tree) in easy {
                        let options = RegexOptions {
                            pattern: String::new(),
                            ..options.clone()
                        };
                        hard_patterns.push(Pattern {
                            pattern_id: id,
                            regex: Regex::from_tree(tree, options),
                        });
                    }
                }
            }
        }

        debug!(
            "pattern set: {} literals, {} combined regexes, {} individual regexes",
            literals.len(),
            easy_patterns.as_ref().map_or(0, |set| set.patterns.len()),
            hard_patterns.len()
        );

        let literals = if literals.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(literals))
        };

        Ok(MultiMatcher {
            inner: Arc::new(MultiMatcherImpl {
                literals,
                easy_patterns,
                hard_patterns,
                pattern_count: patterns.len(),
            }),
        })
    }

    /// Returns the number of patterns in this set.
    pub fn len(&self) -> usize {
        self.inner.pattern_count
    }

    /// Returns true if this set contains no patterns.
    pub fn is_empty(&self) -> bool {
        self.inner.pattern_count == 0
    }

    /// Find all matches of all patterns in `text`, ordered by position, then
    /// pattern id, then length.
    ///
    /// Fails only when a backtracking pattern exceeds its backtrack limit, in
    /// which case no partial result is returned.
    pub fn scan(&self, text: &str) -> Result<Vec<SetMatch>> {
        self.scan_impl(text, None)
    }

    /// Like [`scan`](#method.scan), but checks `cancel` at every position of
    /// the text and fails with
    /// [`RuntimeError::Cancelled`](enum.RuntimeError.html#variant.Cancelled)
    /// once it is set.
    pub fn scan_cancellable(&self, text: &str, cancel: &AtomicBool) -> Result<Vec<SetMatch>> {
        self.scan_impl(text, Some(cancel))
    }

    /// Scan independent texts in parallel. The results are in the order of
    /// `texts`; the first error fails the whole call.
    pub fn scan_many<S>(&self, texts: &[S]) -> Result<Vec<Vec<SetMatch>>>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.scan(text.as_ref()))
            .collect()
    }

    fn scan_impl(&self, text: &str, cancel: Option<&AtomicBool>) -> Result<Vec<SetMatch>> {
        let inner = &*self.inner;
        let mut out = Vec::new();
        let mut literal_matches = inner
            .literals
            .as_ref()
            .map(|ac| ac.find_overlapping_iter(text).peekable());
        let mut lanes = inner.easy_patterns.as_ref().map(Lanes::new);

        let mut at = 0;
        loop {
            if cancel.map_or(false, |cancel| cancel.load(Ordering::Relaxed)) {
                return Err(Error::RuntimeError(RuntimeError::Cancelled));
            }
            if let Some(ref mut lanes) = lanes {
                lanes.advance(text, at, &mut out);
            }
            if let Some(ref mut iter) = literal_matches {
                while let Some(m) = iter.next_if(|m| m.end <= at) {
                    out.push(SetMatch::literal(m.pattern_id, m.start, m.end - m.start));
                }
            }
            for pattern in &inner.hard_patterns {
                if let Some(m) = pattern.regex.match_anchored(text, at)? {
                    out.push(SetMatch::from_result(pattern.pattern_id, m));
                }
            }
            if at >= text.len() {
                break;
            }
            at = next_codepoint_ix(text, at);
        }

        out.sort_by_key(|m| (m.position, m.pattern_id, m.length));
        Ok(out)
    }
}

// The threads of the combined automaton for one start position, with the
// best match so far of each pattern.
struct Lane {
    clist: Threads,
    nlist: Threads,
    candidates: Vec<Option<Vec<Option<usize>>>>,
}

// All live lanes, oldest (leftmost start) first. Finished lanes are kept for
// reuse.
struct Lanes<'a> {
    set: &'a EasyPatternSet,
    live: Vec<Lane>,
    free: Vec<Lane>,
    cache: Cache,
    cut: BitSet,
}

impl<'a> Lanes<'a> {
    fn new(set: &'a EasyPatternSet) -> Lanes<'a> {
        Lanes {
            set,
            live: Vec::new(),
            free: Vec::new(),
            cache: Cache::new(&set.nfa),
            cut: BitSet::new(),
        }
    }

    // Start a lane at `at` and move every live lane over the char at `at`.
    // Lanes that have no threads left report their matches.
    fn advance(&mut self, text: &str, at: usize, out: &mut Vec<SetMatch>) {
        let set = self.set;
        let Lanes {
            live,
            free,
            cache,
            cut,
            ..
        } = self;
        let nfa = &set.nfa;

        let mut lane = free.pop().unwrap_or_else(|| Lane {
            clist: Threads::new(nfa),
            nlist: Threads::new(nfa),
            candidates: vec![None; set.patterns.len()],
        });
        lane.clist.clear();
        nfa::add_start(nfa, text, at, &mut lane.clist, cache);
        live.push(lane);

        let at_end = at >= text.len();
        let mut i = 0;
        while i < live.len() {
            let lane = &mut live[i];
            lane.nlist.clear();
            let candidates = &mut lane.candidates;
            nfa::step(
                nfa,
                text,
                at,
                None,
                &lane.clist,
                &mut lane.nlist,
                cache,
                cut,
                |pattern, slots| candidates[pattern] = Some(slots.to_vec()),
            );
            std::mem::swap(&mut lane.clist, &mut lane.nlist);
            if lane.clist.is_empty() || at_end {
                let mut lane = live.remove(i);
                report(set, &mut lane, out);
                free.push(lane);
            } else {
                i += 1;
            }
        }
    }
}

fn report(set: &EasyPatternSet, lane: &mut Lane, out: &mut Vec<SetMatch>) {
    for (pattern, candidate) in lane.candidates.iter_mut().enumerate() {
        if let Some(slots) = candidate.take() {
            let (pattern_id, n_groups) = set.patterns[pattern];
            if let Some(m) = MatchResult::from_slots(&slots, n_groups) {
                out.push(SetMatch::from_result(pattern_id, m));
            }
        }
    }
}
