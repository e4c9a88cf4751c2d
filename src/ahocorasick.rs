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

//! Aho-Corasick automaton for finding all occurrences of many literals in
//! one pass.
//!
//! Nodes live in an arena and refer to each other by index. The failure link
//! of a node points at the node for the longest proper suffix of its path
//! that is also in the trie; only the root has none.

use std::collections::VecDeque;
use std::fmt;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Clone, Debug, Default)]
struct Node {
    /// Outgoing edges, sorted by byte.
    trans: Vec<(u8, NodeId)>,
    fail: Option<NodeId>,
    /// (pattern id, length in bytes) of every literal that ends here,
    /// including those inherited through the failure link.
    outputs: Vec<(usize, usize)>,
}

impl Node {
    fn goto(&self, byte: u8) -> Option<NodeId> {
        self.trans
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|i| self.trans[i].1)
    }
}

/// An automaton that finds every, possibly overlapping, occurrence of a set of
/// literals.
///
/// # Example
///
/// ```rust
/// use multiscan::AhoCorasick;
///
/// let ac = AhoCorasick::new(vec![(0, "he"), (1, "she"), (2, "hers")]);
/// let found: Vec<_> = ac
///     .find_overlapping_iter("ushers")
///     .map(|m| (m.pattern_id, m.start, m.end))
///     .collect();
/// assert_eq!(found, vec![(1, 1, 4), (0, 2, 4), (2, 2, 6)]);
/// ```
#[derive(Clone)]
pub struct AhoCorasick {
    nodes: Vec<Node>,
    /// Ids of the empty literals, which match at every char boundary.
    empty: Vec<usize>,
    pattern_count: usize,
}

/// An occurrence of a literal, as byte offsets into the haystack.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LiteralMatch {
    /// The id the literal was added with
    pub pattern_id: usize,
    /// Byte offset of the first byte of the occurrence
    pub start: usize,
    /// Byte offset just past the occurrence
    pub end: usize,
}

impl AhoCorasick {
    /// Build the automaton from pairs of pattern id and literal.
    ///
    /// Identical literals share one trie node that reports all of their ids.
    pub fn new<I, P>(patterns: I) -> AhoCorasick
    where
        I: IntoIterator<Item = (usize, P)>,
        P: AsRef<str>,
    {
        let mut ac = AhoCorasick {
            nodes: vec![Node::default()],
            empty: Vec::new(),
            pattern_count: 0,
        };
        for (id, literal) in patterns {
            ac.insert(id, literal.as_ref().as_bytes());
            ac.pattern_count += 1;
        }
        ac.build_failure_links();
        ac
    }

    fn insert(&mut self, id: usize, literal: &[u8]) {
        if literal.is_empty() {
            if !self.empty.contains(&id) {
                self.empty.push(id);
            }
            return;
        }
        let mut node = ROOT;
        for &byte in literal {
            node = match self.nodes[node].trans.binary_search_by_key(&byte, |&(b, _)| b) {
                Ok(i) => self.nodes[node].trans[i].1,
                Err(i) => {
                    let next = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].trans.insert(i, (byte, next));
                    next
                }
            };
        }
        let output = (id, literal.len());
        if !self.nodes[node].outputs.contains(&output) {
            self.nodes[node].outputs.push(output);
        }
    }

    // Breadth first, so the failure target of a node, being shallower, is
    // complete before the node inherits its outputs.
    fn build_failure_links(&mut self) {
        let mut queue = VecDeque::new();
        queue.push_back(ROOT);
        while let Some(node) = queue.pop_front() {
            let trans = self.nodes[node].trans.clone();
            for (byte, child) in trans {
                let mut fail = self.nodes[node].fail;
                let target = loop {
                    match fail {
                        Some(f) => match self.nodes[f].goto(byte) {
                            Some(next) => break next,
                            None => fail = self.nodes[f].fail,
                        },
                        None => break ROOT,
                    }
                };
                self.nodes[child].fail = Some(target);
                let inherited = self.nodes[target].outputs.clone();
                for output in inherited {
                    if !self.nodes[child].outputs.contains(&output) {
                        self.nodes[child].outputs.push(output);
                    }
                }
                queue.push_back(child);
            }
        }
    }

    /// The state after feeding `byte` in `state`.
    fn next_state(&self, mut state: NodeId, byte: u8) -> NodeId {
        loop {
            if let Some(next) = self.nodes[state].goto(byte) {
                return next;
            }
            match self.nodes[state].fail {
                Some(fail) => state = fail,
                None => return ROOT,
            }
        }
    }

    /// Number of literals the automaton was built from.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Number of trie nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns an iterator over all occurrences of all literals in
    /// `haystack`, ordered by end offset. Empty literals are reported at
    /// every char boundary.
    pub fn find_overlapping_iter<'a, 'h>(&'a self, haystack: &'h str) -> FindOverlappingIter<'a, 'h> {
        FindOverlappingIter {
            ac: self,
            haystack,
            pos: 0,
            state: ROOT,
            out_ix: 0,
            empty_ix: 0,
        }
    }
}

impl fmt::Debug for AhoCorasick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AhoCorasick")
            .field("patterns", &self.pattern_count)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// Iterator over the occurrences found by an `AhoCorasick` automaton.
///
/// `'a` is the lifetime of the automaton and `'h` the lifetime of the
/// haystack.
#[derive(Debug)]
pub struct FindOverlappingIter<'a, 'h> {
    ac: &'a AhoCorasick,
    haystack: &'h str,
    /// Bytes fed so far.
    pos: usize,
    state: NodeId,
    /// Outputs of `state` already reported.
    out_ix: usize,
    /// Empty literals already reported at `pos`.
    empty_ix: usize,
}

impl<'a, 'h> Iterator for FindOverlappingIter<'a, 'h> {
    type Item = LiteralMatch;

    fn next(&mut self) -> Option<LiteralMatch> {
        loop {
            let outputs = &self.ac.nodes[self.state].outputs;
            if let Some(&(pattern_id, len)) = outputs.get(self.out_ix) {
                self.out_ix += 1;
                return Some(LiteralMatch {
                    pattern_id,
                    start: self.pos - len,
                    end: self.pos,
                });
            }
            if self.haystack.is_char_boundary(self.pos) {
                if let Some(&pattern_id) = self.ac.empty.get(self.empty_ix) {
                    self.empty_ix += 1;
                    return Some(LiteralMatch {
                        pattern_id,
                        start: self.pos,
                        end: self.pos,
                    });
                }
            }
            let byte = *self.haystack.as_bytes().get(self.pos)?;
            self.state = self.ac.next_state(self.state, byte);
            self.pos += 1;
            self.out_ix = 0;
            self.empty_ix = 0;
        }
    }
}
