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

//! Compilation of regexes to a VM program or to a Thompson NFA.

use std::cmp::{max, min};

use crate::analyze::Info;
use crate::nfa::{CharMatcher, Nfa, State, StateId};
use crate::vm::{Insn, Prog};
use crate::Expr;
use crate::LookAround::{self, *};

// I'm thinking it probably doesn't make a lot of sense having this split
// out from Compiler.
struct VMBuilder {
    prog: Vec<Insn>,
    n_saves: usize,
}

impl VMBuilder {
    fn new(max_group: usize) -> VMBuilder {
        VMBuilder {
            prog: Vec::new(),
            n_saves: max_group * 2,
        }
    }

    fn build(self, n_groups: usize, anchored: bool) -> Prog {
        Prog::new(self.prog, self.n_saves, (n_groups + 1) * 2, anchored)
    }

    fn newsave(&mut self) -> usize {
        let result = self.n_saves;
        self.n_saves += 1;
        result
    }

    fn pc(&self) -> usize {
        self.prog.len()
    }

    // would "emit" be a better name?
    fn add(&mut self, insn: Insn) {
        self.prog.push(insn);
    }

    fn set_jmp_target(&mut self, jmp_pc: usize, target: usize) {
        match self.prog[jmp_pc] {
            Insn::Jmp(ref mut next) => *next = target,
            _ => panic!("mutating instruction other than Jmp"),
        }
    }

    fn set_split_target(&mut self, jmp_pc: usize, target: usize, second: bool) {
        match self.prog[jmp_pc] {
            Insn::Split(_, ref mut y) if second => *y = target,
            Insn::Split(ref mut x, _) => *x = target,
            _ => panic!("mutating instruction other than Split"),
        }
    }

    fn set_repeat_target(&mut self, jmp_pc: usize, target: usize) {
        match self.prog[jmp_pc] {
            Insn::RepeatGr { ref mut next, .. }
            | Insn::RepeatNg { ref mut next, .. }
            | Insn::RepeatEpsilonGr { ref mut next, .. }
            | Insn::RepeatEpsilonNg { ref mut next, .. } => *next = target,
            _ => panic!("mutating instruction other than Repeat"),
        }
    }
}

struct Compiler {
    b: VMBuilder,
    lookbehind_window: usize,
}

impl Compiler {
    fn visit(&mut self, info: &Info<'_>) {
        match *info.expr {
            Expr::Empty => (),
            Expr::Literal(ref val) => self.b.add(Insn::Lit(val.clone())),
            Expr::Any => self.b.add(Insn::Any),
            Expr::Class(ref class) => self.b.add(Insn::Class(class.clone())),
            Expr::Assertion(assertion) => self.b.add(Insn::Assertion(assertion)),
            Expr::Concat(_) => self.compile_concat(info),
            Expr::Alt(_) => {
                let count = info.children.len();
                self.compile_alt(count, |compiler, i| compiler.visit(&info.children[i]));
            }
            Expr::Group { index, .. } => {
                self.b.add(Insn::Save(index * 2));
                self.visit(&info.children[0]);
                self.b.add(Insn::Save(index * 2 + 1));
            }
            Expr::Repeat { lo, hi, greedy, .. } => {
                self.compile_repeat(info, lo, hi, greedy);
            }
            Expr::LookAround(_, la) => self.compile_lookaround(info, la),
            Expr::Backref(group) => self.b.add(Insn::Backref(group * 2)),
        }
    }

    fn compile_alt<F>(&mut self, count: usize, mut handle_alternative: F)
    where
        F: FnMut(&mut Compiler, usize),
    {
        let mut jmps = Vec::new();
        let mut last_pc = usize::MAX;
        for i in 0..count {
            let has_next = i != count - 1;
            let pc = self.b.pc();
            if has_next {
                self.b.add(Insn::Split(pc + 1, usize::MAX));
            }
            if last_pc != usize::MAX {
                self.b.set_split_target(last_pc, pc, true);
            }
            last_pc = pc;

            handle_alternative(self, i);

            if has_next {
                // All except the last branch need to jump over instructions of
                // other branches. The last branch can just continue to the next
                // instruction.
                let pc = self.b.pc();
                jmps.push(pc);
                self.b.add(Insn::Jmp(0));
            }
        }
        let next_pc = self.b.pc();
        for jmp_pc in jmps {
            self.b.set_jmp_target(jmp_pc, next_pc);
        }
    }

    fn compile_concat(&mut self, info: &Info<'_>) {
        // runs of literal children become a single Lit
        let mut lit = String::new();
        for child in &info.children {
            if child.is_literal() {
                child.push_literal(&mut lit);
                continue;
            }
            if !lit.is_empty() {
                self.b.add(Insn::Lit(std::mem::take(&mut lit)));
            }
            self.visit(child);
        }
        if !lit.is_empty() {
            self.b.add(Insn::Lit(lit));
        }
    }

    fn compile_repeat(&mut self, info: &Info<'_>, lo: usize, hi: usize, greedy: bool) {
        let child = &info.children[0];
        // a zero-width child gets at most one iteration
        let (lo, hi) = if child.max_size == Some(0) {
            (min(lo, 1), min(hi, 1))
        } else {
            (lo, hi)
        };
        if hi == 0 {
            return;
        }
        if lo == 1 && hi == 1 {
            self.visit(child);
            return;
        }
        if lo == 0 && hi == 1 {
            // e?
            let pc = self.b.pc();
            self.b.add(Insn::Split(pc + 1, pc + 1));
            self.visit(child);
            let next_pc = self.b.pc();
            self.b.set_split_target(pc, next_pc, greedy);
            return;
        }
        if hi == usize::MAX && child.min_size == 0 {
            // Use RepeatEpsilon instructions to prevent empty repeat
            let repeat = self.b.newsave();
            let check = self.b.newsave();
            self.b.add(Insn::Save0(repeat));
            let pc = self.b.pc();
            if greedy {
                self.b.add(Insn::RepeatEpsilonGr {
                    lo,
                    next: usize::MAX,
                    repeat,
                    check,
                });
            } else {
                self.b.add(Insn::RepeatEpsilonNg {
                    lo,
                    next: usize::MAX,
                    repeat,
                    check,
                });
            }
            self.visit(child);
            self.b.add(Insn::Jmp(pc));
            let next_pc = self.b.pc();
            self.b.set_repeat_target(pc, next_pc);
        } else if lo == 0 && hi == usize::MAX {
            // e*
            let pc = self.b.pc();
            self.b.add(Insn::Split(pc + 1, pc + 1));
            self.visit(child);
            self.b.add(Insn::Jmp(pc));
            let next_pc = self.b.pc();
            self.b.set_split_target(pc, next_pc, greedy);
        } else if lo == 1 && hi == usize::MAX {
            // e+
            let pc = self.b.pc();
            self.visit(child);
            let next = self.b.pc() + 1;
            let (x, y) = if greedy { (pc, next) } else { (next, pc) };
            self.b.add(Insn::Split(x, y));
        } else {
            let repeat = self.b.newsave();
            self.b.add(Insn::Save0(repeat));
            let pc = self.b.pc();
            if greedy {
                self.b.add(Insn::RepeatGr {
                    lo,
                    hi,
                    next: usize::MAX,
                    repeat,
                });
            } else {
                self.b.add(Insn::RepeatNg {
                    lo,
                    hi,
                    next: usize::MAX,
                    repeat,
                });
            }
            self.visit(child);
            self.b.add(Insn::Jmp(pc));
            let next_pc = self.b.pc();
            self.b.set_repeat_target(pc, next_pc);
        }
    }

    fn compile_lookaround(&mut self, info: &Info<'_>, la: LookAround) {
        let inner = &info.children[0];
        match la {
            LookAhead | LookBehind => self.compile_positive_lookaround(inner, la),
            LookAheadNeg | LookBehindNeg => self.compile_negative_lookaround(inner, la),
        }
    }

    fn compile_positive_lookaround(&mut self, inner: &Info<'_>, la: LookAround) {
        let save = self.b.newsave();
        self.b.add(Insn::Save(save));
        self.compile_lookaround_inner(inner, la, save);
        self.b.add(Insn::Restore(save));
    }

    fn compile_negative_lookaround(&mut self, inner: &Info<'_>, la: LookAround) {
        let pc = self.b.pc();
        self.b.add(Insn::Split(pc + 1, usize::MAX));
        let save = self.b.newsave();
        if la == LookBehindNeg {
            self.b.add(Insn::Save(save));
        }
        self.compile_lookaround_inner(inner, la, save);
        self.b.add(Insn::FailNegativeLookAround);
        let next_pc = self.b.pc();
        self.b.set_split_target(pc, next_pc, true);
    }

    // `save` holds the position the look-around is evaluated at
    fn compile_lookaround_inner(&mut self, inner: &Info<'_>, la: LookAround, save: usize) {
        if la == LookBehind || la == LookBehindNeg {
            let min = inner.min_size;
            let max = inner
                .max_size
                .unwrap_or_else(|| max(min, self.lookbehind_window));
            self.b.add(Insn::GoBack { min, max });
            self.visit(inner);
            if min != max {
                // the window has to end exactly where the look-behind started
                self.b.add(Insn::CheckPosition(save));
            }
        } else {
            self.visit(inner);
        }
    }
}

/// Compile the analyzed expression to a program for the backtracking VM.
/// Look-behinds without a bound on their width scan back at most
/// `lookbehind_window` chars.
pub fn compile(info: &Info<'_>, n_groups: usize, lookbehind_window: usize) -> Prog {
    let mut c = Compiler {
        b: VMBuilder::new(n_groups + 1),
        lookbehind_window,
    };
    c.b.add(Insn::Save(0));
    c.visit(info);
    c.b.add(Insn::Save(1));
    c.b.add(Insn::End);
    c.b.build(n_groups, info.anchored_start)
}

// Builds states back to front: every fragment is compiled with the state
// that follows it already known.
struct NfaBuilder {
    states: Vec<State>,
    pattern_of: Vec<usize>,
    pattern: usize,
    // states that may still be added
    budget: usize,
    slots: usize,
}

impl NfaBuilder {
    fn new(budget: usize, slots: usize) -> NfaBuilder {
        NfaBuilder {
            states: Vec::new(),
            pattern_of: Vec::new(),
            pattern: 0,
            budget,
            slots,
        }
    }

    fn add(&mut self, state: State) -> Option<StateId> {
        if self.budget == 0 {
            return None;
        }
        self.budget -= 1;
        self.states.push(state);
        self.pattern_of.push(self.pattern);
        Some(self.states.len() - 1)
    }

    fn set_split_targets(&mut self, sid: StateId, body: StateId, exit: StateId, greedy: bool) {
        if let State::Split(ref mut x, ref mut y) = self.states[sid] {
            if greedy {
                *x = body;
                *y = exit;
            } else {
                *x = exit;
                *y = body;
            }
        }
    }

    fn finish(self, start: StateId) -> Nfa {
        Nfa {
            states: self.states,
            start,
            slots: self.slots,
            pattern_of: self.pattern_of,
        }
    }

    // None when the budget runs out or the expression needs backtracking
    fn build(&mut self, info: &Info<'_>, next: StateId) -> Option<StateId> {
        match *info.expr {
            Expr::Empty => Some(next),
            Expr::Any => self.add(State::Char {
                matcher: CharMatcher::Any,
                next,
            }),
            Expr::Class(ref class) => self.add(State::Char {
                matcher: CharMatcher::Class(class.clone()),
                next,
            }),
            Expr::Literal(ref val) => {
                let mut next = next;
                for c in val.chars().rev() {
                    next = self.add(State::Char {
                        matcher: CharMatcher::Lit(c),
                        next,
                    })?;
                }
                Some(next)
            }
            Expr::Assertion(assertion) => self.add(State::Assert { assertion, next }),
            Expr::Concat(_) => {
                let mut next = next;
                for child in info.children.iter().rev() {
                    next = self.build(child, next)?;
                }
                Some(next)
            }
            Expr::Alt(_) => {
                let alternatives = info
                    .children
                    .iter()
                    .map(|child| self.build(child, next))
                    .collect::<Option<Vec<_>>>()?;
                match alternatives[..] {
                    [x, y] => self.add(State::Split(x, y)),
                    _ => self.add(State::Union(alternatives.into_boxed_slice())),
                }
            }
            Expr::Group { index, .. } => {
                let close = self.add(State::Save {
                    slot: index * 2 + 1,
                    next,
                })?;
                let body = self.build(&info.children[0], close)?;
                self.add(State::Save {
                    slot: index * 2,
                    next: body,
                })
            }
            Expr::Repeat { lo, hi, greedy, .. } => {
                self.build_repeat(&info.children[0], lo, hi, greedy, next)
            }
            Expr::LookAround(_, kind) => {
                let inner = &info.children[0];
                let mut sub = NfaBuilder::new(self.budget, self.slots);
                let accept = sub.add(State::Match(0))?;
                let start = sub.build(inner, accept)?;
                self.budget = sub.budget;
                // only a look-behind needs a bound on its width
                let max = match kind {
                    LookAround::LookBehind | LookAround::LookBehindNeg => inner.max_size?,
                    LookAround::LookAhead | LookAround::LookAheadNeg => {
                        inner.max_size.unwrap_or(usize::MAX)
                    }
                };
                let min = inner.min_size;
                self.add(State::Look {
                    kind,
                    sub: Box::new(sub.finish(start)),
                    min,
                    max,
                    next,
                })
            }
            Expr::Backref(_) => None,
        }
    }

    fn build_repeat(
        &mut self,
        child: &Info<'_>,
        lo: usize,
        hi: usize,
        greedy: bool,
        next: StateId,
    ) -> Option<StateId> {
        // a zero-width child gets at most one iteration
        let (lo, hi) = if child.max_size == Some(0) {
            (min(lo, 1), min(hi, 1))
        } else {
            (lo, hi)
        };
        if lo > self.budget {
            return None;
        }
        let mut entry = next;
        if hi == usize::MAX {
            let split = self.add(State::Split(next, next))?;
            let body = self.build(child, split)?;
            self.set_split_targets(split, body, next, greedy);
            // with lo > 0 the loop body is the last mandatory copy
            entry = if lo > 0 { body } else { split };
            for _ in 1..lo {
                entry = self.build(child, entry)?;
            }
        } else {
            for _ in lo..hi {
                let body = self.build(child, entry)?;
                entry = self.add(if greedy {
                    State::Split(body, next)
                } else {
                    State::Split(next, body)
                })?;
            }
            for _ in 0..lo {
                entry = self.build(child, entry)?;
            }
        }
        Some(entry)
    }
}

/// Compile the analyzed expression to a Thompson NFA. Returns `None` if the
/// expression needs backtracking, or if the automaton would need more than
/// `size_limit` states.
pub fn compile_nfa(info: &Info<'_>, n_groups: usize, size_limit: usize) -> Option<Nfa> {
    compile_nfa_many(&[(info, n_groups)], size_limit)
}

/// Compile several analyzed expressions, each with its number of capture
/// groups, into one automaton with a shared start state. Matches of the
/// `i`th expression are reported as pattern `i`.
pub fn compile_nfa_many(patterns: &[(&Info<'_>, usize)], size_limit: usize) -> Option<Nfa> {
    let slots = patterns
        .iter()
        .map(|&(_, n_groups)| (n_groups + 1) * 2)
        .max()
        .unwrap_or(2);
    let mut b = NfaBuilder::new(size_limit, slots);
    let mut starts = Vec::with_capacity(patterns.len());
    for (pattern, &(info, _)) in patterns.iter().enumerate() {
        b.pattern = pattern;
        let accept = b.add(State::Match(pattern))?;
        let close = b.add(State::Save {
            slot: 1,
            next: accept,
        })?;
        let body = b.build(info, close)?;
        starts.push(b.add(State::Save {
            slot: 0,
            next: body,
        })?);
    }
    let start = match starts[..] {
        [start] => start,
        _ => b.add(State::Union(starts.into_boxed_slice()))?,
    };
    Some(b.finish(start))
}
