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

//! Thompson NFA and its simulation (Pike VM).
//!
//! Threads are kept in priority order, so the simulation reports the same
//! match a backtracking search would find first: the first alternative of
//! an alternation and the "repeat" edge of a greedy repetition are explored
//! before the others. Capture slots travel with each thread.

use bit_set::BitSet;

use crate::{prev_codepoint_ix, Assertion, CharClass, LookAround};

/// Index of a state in an `Nfa`.
pub type StateId = usize;

#[derive(Clone, Debug)]
pub(crate) enum CharMatcher {
    Lit(char),
    Any,
    Class(CharClass),
}

impl CharMatcher {
    fn matches(&self, c: char) -> bool {
        match *self {
            CharMatcher::Lit(lit) => lit == c,
            CharMatcher::Any => c != '\n',
            CharMatcher::Class(ref class) => class.matches(c),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum State {
    /// Consume one char accepted by the matcher.
    Char { matcher: CharMatcher, next: StateId },
    /// Epsilon edges, the first one is preferred.
    Split(StateId, StateId),
    /// Epsilon edges in priority order.
    Union(Box<[StateId]>),
    /// Record the current position in a capture slot.
    Save { slot: usize, next: StateId },
    Assert {
        assertion: Assertion,
        next: StateId,
    },
    /// Zero-width look-around, evaluated by a nested search. `min` and `max`
    /// bound the width of a look-behind in chars.
    Look {
        kind: LookAround,
        sub: Box<Nfa>,
        min: usize,
        max: usize,
        next: StateId,
    },
    /// Accept for the pattern with this index.
    Match(usize),
}

/// A Thompson NFA for one pattern, or for a set of patterns sharing one
/// start state.
#[derive(Clone, Debug)]
pub struct Nfa {
    pub(crate) states: Vec<State>,
    pub(crate) start: StateId,
    /// Number of capture slots per thread.
    pub(crate) slots: usize,
    /// The pattern each state belongs to.
    pub(crate) pattern_of: Vec<usize>,
}

impl Nfa {
    /// Number of states, not counting those of look-around sub-automata.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the automaton has no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

enum Frame {
    Explore(StateId),
    RestoreCapture { slot: usize, old: Option<usize> },
}

/// An ordered set of threads, each one a state with its capture slots.
#[derive(Debug, Default)]
pub(crate) struct Threads {
    set: BitSet,
    dense: Vec<StateId>,
    caps: Vec<Option<usize>>,
    stride: usize,
}

impl Threads {
    pub(crate) fn new(nfa: &Nfa) -> Threads {
        Threads {
            set: BitSet::with_capacity(nfa.states.len()),
            dense: Vec::new(),
            caps: vec![None; nfa.states.len() * nfa.slots],
            stride: nfa.slots,
        }
    }

    // Slots are written when a thread is inserted, so stale values are fine.
    fn reset(&mut self, nfa: &Nfa) {
        self.clear();
        self.caps.resize(nfa.states.len() * nfa.slots, None);
        self.stride = nfa.slots;
    }

    pub(crate) fn clear(&mut self) {
        self.set.clear();
        self.dense.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn slots(&self, sid: StateId) -> &[Option<usize>] {
        &self.caps[sid * self.stride..(sid + 1) * self.stride]
    }
}

/// Scratch space reused across steps.
#[derive(Default)]
pub(crate) struct Cache {
    stack: Vec<Frame>,
    scratch: Vec<Option<usize>>,
    /// Buffers for the nested searches of look-arounds.
    looks: Vec<SearchCache>,
}

impl Cache {
    pub(crate) fn new(nfa: &Nfa) -> Cache {
        Cache {
            stack: Vec::new(),
            scratch: vec![None; nfa.slots],
            looks: Vec::new(),
        }
    }

    fn reset(&mut self, nfa: &Nfa) {
        self.stack.clear();
        self.scratch.clear();
        self.scratch.resize(nfa.slots, None);
    }
}

/// Everything one search needs, so a look-around evaluated at every position
/// does not allocate each time.
#[derive(Default)]
struct SearchCache {
    clist: Threads,
    nlist: Threads,
    cache: Cache,
    cut: BitSet,
}

impl SearchCache {
    fn reset(&mut self, nfa: &Nfa) {
        self.clist.reset(nfa);
        self.nlist.reset(nfa);
        self.cache.reset(nfa);
    }
}

/// Add `start` and everything reachable from it through epsilon edges at
/// position `at`, lowest priority first in `threads`. New threads start with
/// empty capture slots.
pub(crate) fn add_start(nfa: &Nfa, text: &str, at: usize, threads: &mut Threads, cache: &mut Cache) {
    cache.scratch.iter_mut().for_each(|slot| *slot = None);
    add_closure(nfa, text, at, threads, nfa.start, cache);
}

fn add_closure(
    nfa: &Nfa,
    text: &str,
    at: usize,
    threads: &mut Threads,
    sid: StateId,
    cache: &mut Cache,
) {
    let Cache {
        stack,
        scratch,
        looks,
    } = cache;
    stack.push(Frame::Explore(sid));
    while let Some(frame) = stack.pop() {
        let sid = match frame {
            Frame::Explore(sid) => sid,
            Frame::RestoreCapture { slot, old } => {
                scratch[slot] = old;
                continue;
            }
        };
        if !threads.set.insert(sid) {
            continue;
        }
        match nfa.states[sid] {
            State::Char { .. } | State::Match(_) => {
                threads.dense.push(sid);
                let stride = threads.stride;
                threads.caps[sid * stride..(sid + 1) * stride].copy_from_slice(scratch);
            }
            State::Split(x, y) => {
                stack.push(Frame::Explore(y));
                stack.push(Frame::Explore(x));
            }
            State::Union(ref alternatives) => {
                stack.extend(alternatives.iter().rev().map(|&alt| Frame::Explore(alt)));
            }
            State::Save { slot, next } => {
                stack.push(Frame::RestoreCapture {
                    slot,
                    old: scratch[slot],
                });
                scratch[slot] = Some(at);
                stack.push(Frame::Explore(next));
            }
            State::Assert { assertion, next } => {
                if assertion.holds(text, at) {
                    stack.push(Frame::Explore(next));
                }
            }
            State::Look {
                kind,
                ref sub,
                min,
                max,
                next,
            } => {
                if let Some(found) = look(kind, sub, text, at, min, max, looks) {
                    // groups inside the look-around keep what they captured
                    for (slot, &val) in found.iter().enumerate().skip(2) {
                        if val.is_some() && slot < scratch.len() {
                            stack.push(Frame::RestoreCapture {
                                slot,
                                old: scratch[slot],
                            });
                            scratch[slot] = val;
                        }
                    }
                    stack.push(Frame::Explore(next));
                }
            }
        }
    }
}

// Returns the captures of the look-around if it holds; negative ones never
// capture.
fn look(
    kind: LookAround,
    sub: &Nfa,
    text: &str,
    at: usize,
    min: usize,
    max: usize,
    looks: &mut Vec<SearchCache>,
) -> Option<Vec<Option<usize>>> {
    let mut sc = looks.pop().unwrap_or_default();
    sc.reset(sub);
    let found = match kind {
        LookAround::LookAhead => search_with(sub, text, at, true, None, &mut sc),
        LookAround::LookAheadNeg => match search_with(sub, text, at, true, None, &mut sc) {
            Some(_) => None,
            None => Some(Vec::new()),
        },
        LookAround::LookBehind => look_behind(sub, text, at, min, max, &mut sc),
        LookAround::LookBehindNeg => match look_behind(sub, text, at, min, max, &mut sc) {
            Some(_) => None,
            None => Some(Vec::new()),
        },
    };
    looks.push(sc);
    found
}

// Tries windows of min..=max chars ending at `at`, narrowest first.
fn look_behind(
    sub: &Nfa,
    text: &str,
    at: usize,
    min: usize,
    max: usize,
    sc: &mut SearchCache,
) -> Option<Vec<Option<usize>>> {
    let mut pos = at;
    for _ in 0..min {
        if pos == 0 {
            return None;
        }
        pos = prev_codepoint_ix(text, pos);
    }
    let mut width = min;
    loop {
        if let Some(caps) = search_with(sub, text, pos, true, Some(at), sc) {
            return Some(caps);
        }
        if width >= max || pos == 0 {
            return None;
        }
        pos = prev_codepoint_ix(text, pos);
        width += 1;
    }
}

/// Move every thread of `clist` over `c`, the char at `at` (`None` at the
/// end of the text), into `nlist`.
///
/// Match states are reported to `on_match` in priority order. Once a pattern
/// has matched, its lower priority threads are dropped, which makes the
/// reported match of each pattern the leftmost-first one. With `end`, only
/// matches ending exactly there are accepted and no thread moves past it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn step<F>(
    nfa: &Nfa,
    text: &str,
    at: usize,
    end: Option<usize>,
    clist: &Threads,
    nlist: &mut Threads,
    cache: &mut Cache,
    cut: &mut BitSet,
    mut on_match: F,
) where
    F: FnMut(usize, &[Option<usize>]),
{
    let c = text[at..].chars().next();
    let next_at = at + c.map_or(0, char::len_utf8);
    cut.clear();
    for &sid in &clist.dense {
        if cut.contains(nfa.pattern_of[sid]) {
            continue;
        }
        match nfa.states[sid] {
            State::Char { ref matcher, next } => {
                let within = end.map_or(true, |end| next_at <= end);
                if c.map_or(false, |c| matcher.matches(c)) && within {
                    cache.scratch.copy_from_slice(clist.slots(sid));
                    add_closure(nfa, text, next_at, nlist, next, cache);
                }
            }
            State::Match(pattern) => {
                if end.map_or(true, |end| end == at) {
                    on_match(pattern, clist.slots(sid));
                    cut.insert(pattern);
                }
            }
            _ => (),
        }
    }
}

/// Find the leftmost-first match of the automaton in `text` at or after
/// `start`, and return its capture slots. With `anchored`, the match must
/// start at `start`; with `end`, it must end at `end`.
pub fn search(
    nfa: &Nfa,
    text: &str,
    start: usize,
    anchored: bool,
    end: Option<usize>,
) -> Option<Vec<Option<usize>>> {
    let mut sc = SearchCache::default();
    sc.reset(nfa);
    search_with(nfa, text, start, anchored, end, &mut sc)
}

fn search_with(
    nfa: &Nfa,
    text: &str,
    start: usize,
    anchored: bool,
    end: Option<usize>,
    sc: &mut SearchCache,
) -> Option<Vec<Option<usize>>> {
    let SearchCache {
        clist,
        nlist,
        cache,
        cut,
    } = sc;
    clist.clear();
    nlist.clear();
    let mut matched: Option<Vec<Option<usize>>> = None;
    let mut at = start;
    loop {
        if matched.is_none() && (!anchored || at == start) {
            // new threads have the lowest priority
            add_start(nfa, text, at, clist, cache);
        }
        if clist.is_empty() && (matched.is_some() || anchored) {
            break;
        }
        step(
            nfa,
            text,
            at,
            end,
            clist,
            nlist,
            cache,
            cut,
            |_, slots| matched = Some(slots.to_vec()),
        );
        if at >= text.len() || end.map_or(false, |end| at >= end) {
            break;
        }
        at += text[at..].chars().next().map_or(1, char::len_utf8);
        std::mem::swap(clist, nlist);
        nlist.clear();
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::{search, Nfa};
    use crate::analyze::analyze;
    use crate::compile::compile_nfa;
    use crate::optimize::optimize;
    use crate::Expr;

    fn nfa(re: &str) -> Nfa {
        let tree = Expr::parse_tree(re).unwrap();
        let expr = optimize(tree.expr);
        let info = analyze(&expr);
        compile_nfa(&info, tree.group_count, 10_000).unwrap()
    }

    fn find(re: &str, text: &str) -> Option<(usize, usize)> {
        let slots = search(&nfa(re), text, 0, false, None)?;
        Some((slots[0]?, slots[1]?))
    }

    #[test]
    fn leftmost_first() {
        assert_eq!(find("a|ab", "ab"), Some((0, 1)));
        assert_eq!(find("ab|a", "ab"), Some((0, 2)));
        assert_eq!(find("b|a", "ab"), Some((0, 1)));
        assert_eq!(find("x", "abc"), None);
    }

    #[test]
    fn greedy_and_lazy() {
        assert_eq!(find("a+", "baaab"), Some((1, 4)));
        assert_eq!(find("a+?", "baaab"), Some((1, 2)));
        assert_eq!(find("a*", "baaab"), Some((0, 0)));
        assert_eq!(find("a{2,3}", "aaaa"), Some((0, 3)));
        assert_eq!(find("a{2,3}?", "aaaa"), Some((0, 2)));
        assert_eq!(find("<.*>", "<a><b>"), Some((0, 6)));
        assert_eq!(find("<.*?>", "<a><b>"), Some((0, 3)));
    }

    #[test]
    fn captures_follow_priority() {
        let slots = search(&nfa("(a|ab)(c|bcd)"), "abcd", 0, false, None).unwrap();
        assert_eq!(
            slots,
            vec![Some(0), Some(4), Some(0), Some(1), Some(1), Some(4)]
        );
        let slots = search(&nfa("(a)|b"), "b", 0, false, None).unwrap();
        assert_eq!(slots, vec![Some(0), Some(1), None, None]);
    }

    #[test]
    fn anchored_search() {
        let automaton = nfa("b+");
        assert_eq!(search(&automaton, "abb", 0, true, None), None);
        let slots = search(&automaton, "abb", 1, true, None).unwrap();
        assert_eq!((slots[0], slots[1]), (Some(1), Some(3)));
    }

    #[test]
    fn required_end() {
        let automaton = nfa("a+");
        let slots = search(&automaton, "aaa", 0, true, Some(2)).unwrap();
        assert_eq!((slots[0], slots[1]), (Some(0), Some(2)));
        assert_eq!(search(&automaton, "aab", 0, true, Some(3)), None);
    }

    #[test]
    fn look_around() {
        assert_eq!(find("a(?=b)", "acab"), Some((2, 3)));
        assert_eq!(find("a(?!b)", "abac"), Some((2, 3)));
        assert_eq!(find("(?<=a)b", "cbab"), Some((3, 4)));
        assert_eq!(find("(?<!a)b", "abcb"), Some((3, 4)));
        assert_eq!(find("(?<=ab|c)d", "abd"), Some((2, 3)));
        assert_eq!(find("(?<=^a{1,3})b", "aaab"), Some((3, 4)));
        assert_eq!(find("(?<=^a{1,2})b", "aaab"), None);
    }

    #[test]
    fn nested_look_arounds() {
        assert_eq!(find("(?<=a(?=b))b", "ab"), Some((1, 2)));
        assert_eq!(find(r"(?=\w+(?<=x))\w", "abx c"), Some((0, 1)));
        assert_eq!(find(r"(?=\w+(?<=x))\w", "ab c"), None);
        // the same buffers serve the look-behind at every position
        assert_eq!(find("(?<=a)b", "bbbbab"), Some((5, 6)));
    }

    #[test]
    fn captures_inside_lookahead() {
        let slots = search(&nfa("(?=(ab))a"), "ab", 0, false, None).unwrap();
        assert_eq!(slots, vec![Some(0), Some(1), Some(0), Some(2)]);
    }

    #[test]
    fn multibyte() {
        assert_eq!(find("\u{e9}+", "caf\u{e9}\u{e9}"), Some((3, 7)));
        assert_eq!(find(".", "\u{1F4A9}"), Some((0, 4)));
        assert_eq!(find(r"(?<=\u{e9})x", "\u{e9}x"), Some((2, 3)));
    }

    #[test]
    fn assertions() {
        assert_eq!(find(r"\bb", "ab b"), Some((3, 4)));
        assert_eq!(find(r"\Bb", "b ab"), Some((3, 4)));
        assert_eq!(find("^a", "ba"), None);
        assert_eq!(find("a$", "aba"), Some((2, 3)));
        assert_eq!(find("(?:^|,)x", "a,x"), Some((1, 3)));
    }

    #[test]
    fn empty_loops_terminate() {
        assert_eq!(find("(?:a*)*b", "aab"), Some((0, 3)));
        assert_eq!(find("(?:)*", "x"), Some((0, 0)));
        assert_eq!(find(r"(?:\b)+x", " x"), Some((1, 2)));
    }
}
