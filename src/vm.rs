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

//! Backtracking VM for patterns with backreferences or unbounded look-behind.
//!
//! A program is a list of instructions; `Split` pushes the second branch onto
//! the backtrack stack and continues with the first, so alternatives are
//! explored in priority order and the first match found is the leftmost-first
//! one.

use log::{log_enabled, trace, Level};

use crate::error::RuntimeError;
use crate::{char_at, codepoint_len, next_codepoint_ix, prev_codepoint_ix, Assertion, CharClass};
use crate::{Error, Result};

const MAX_STACK: usize = 1_000_000;

/// Instruction of the VM.
#[derive(Debug, Clone)]
pub enum Insn {
    /// Successful end of program
    End,
    /// Match any character except newline
    Any,
    /// Match the literal string
    Lit(String),
    /// Match one character of the class
    Class(CharClass),
    /// Zero-width assertion
    Assertion(Assertion),
    /// Split execution into two threads, trying the first one first
    Split(usize, usize),
    /// Jump to instruction index
    Jmp(usize),
    /// Save the current string index into the specified slot
    Save(usize),
    /// Save `0` into the specified slot
    Save0(usize),
    /// Set the string index to the value that was saved into the specified slot
    Restore(usize),
    /// Repeat greedily (match as much as possible)
    RepeatGr {
        /// Minimum number of matches
        lo: usize,
        /// Maximum number of matches
        hi: usize,
        /// The instruction after the repeat
        next: usize,
        /// The slot for keeping track of the number of repetitions
        repeat: usize,
    },
    /// Repeat non-greedily (prefer matching as little as possible)
    RepeatNg {
        /// Minimum number of matches
        lo: usize,
        /// Maximum number of matches
        hi: usize,
        /// The instruction after the repeat
        next: usize,
        /// The slot for keeping track of the number of repetitions
        repeat: usize,
    },
    /// Repeat greedily and prevent infinite loops from empty matches
    RepeatEpsilonGr {
        /// Minimum number of matches
        lo: usize,
        /// The instruction after the repeat
        next: usize,
        /// The slot for keeping track of the number of repetitions
        repeat: usize,
        /// The slot for saving the previous string index
        check: usize,
    },
    /// Repeat non-greedily and prevent infinite loops from empty matches
    RepeatEpsilonNg {
        /// Minimum number of matches
        lo: usize,
        /// The instruction after the repeat
        next: usize,
        /// The slot for keeping track of the number of repetitions
        repeat: usize,
        /// The slot for saving the previous string index
        check: usize,
    },
    /// Negative look-around failed
    FailNegativeLookAround,
    /// Move the string index back by `min` to `max` characters, trying the
    /// smallest distance first
    GoBack {
        /// Fewest characters to go back
        min: usize,
        /// Most characters to go back
        max: usize,
    },
    /// Fail unless the string index equals the value saved in the slot
    CheckPosition(usize),
    /// Match the text captured by the group whose start is in the slot; fails
    /// if the group did not participate
    Backref(usize),
}

/// Sequence of instructions for the VM to execute.
#[derive(Debug, Clone)]
pub struct Prog {
    /// Instructions of the program
    pub body: Vec<Insn>,
    n_saves: usize,
    n_slots: usize,
    anchored: bool,
}

impl Prog {
    pub(crate) fn new(body: Vec<Insn>, n_saves: usize, n_slots: usize, anchored: bool) -> Prog {
        Prog {
            body,
            n_saves,
            n_slots,
            anchored,
        }
    }

    pub(crate) fn debug_print(&self) {
        for (i, insn) in self.body.iter().enumerate() {
            trace!("{:3}: {:?}", i, insn);
        }
    }
}

#[derive(Debug)]
struct Branch {
    pc: usize,
    ix: usize,
    nsave: usize,
}

#[derive(Debug)]
struct Save {
    slot: usize,
    value: usize,
}

struct State {
    /// Saved values indexed by slot. Mostly indices to s, but can be repeat values etc.
    /// Always contains the saves of the current state.
    saves: Vec<usize>,
    /// Stack of backtrack branches.
    stack: Vec<Branch>,
    /// Old saves (slot, value)
    oldsave: Vec<Save>,
    /// Number of saves at the end of `oldsave` that need to be restored to `saves` on pop
    nsave: usize,
    max_stack: usize,
    trace: bool,
}

// Each element in the stack conceptually represents the entire state
// of the machine: the pc (index into prog), the index into the
// string, and the entire vector of saves. However, copying the save
// vector on every push/pop would be inefficient, so instead we use a
// copy-on-write approach for each slot within the save vector. The
// top `nsave` elements in `oldsave` represent the delta from the
// current machine state to the top of stack.

impl State {
    fn new(n_saves: usize, max_stack: usize) -> State {
        State {
            saves: vec![usize::MAX; n_saves],
            stack: Vec::new(),
            oldsave: Vec::new(),
            nsave: 0,
            max_stack,
            trace: log_enabled!(Level::Trace),
        }
    }

    // forget everything before retrying at the next start position
    fn reset(&mut self) {
        self.saves.iter_mut().for_each(|save| *save = usize::MAX);
        self.stack.clear();
        self.oldsave.clear();
        self.nsave = 0;
    }

    // push a backtrack branch
    fn push(&mut self, pc: usize, ix: usize) -> Result<()> {
        if self.stack.len() < self.max_stack {
            let nsave = self.nsave;
            self.stack.push(Branch { pc, ix, nsave });
            self.nsave = 0;
            self.trace_stack("push");
            Ok(())
        } else {
            Err(Error::RuntimeError(RuntimeError::StackOverflow))
        }
    }

    // pop a backtrack branch
    fn pop(&mut self) -> Option<(usize, usize)> {
        for _ in 0..self.nsave {
            if let Some(Save { slot, value }) = self.oldsave.pop() {
                self.saves[slot] = value;
            }
        }
        let Branch { pc, ix, nsave } = self.stack.pop()?;
        self.nsave = nsave;
        self.trace_stack("pop");
        Some((pc, ix))
    }

    fn save(&mut self, slot: usize, val: usize) {
        for i in 0..self.nsave {
            // could avoid this iteration with some overhead; worth it?
            if self.oldsave[self.oldsave.len() - i - 1].slot == slot {
                // already saved, just update
                self.saves[slot] = val;
                return;
            }
        }
        self.oldsave.push(Save {
            slot,
            value: self.saves[slot],
        });
        self.nsave += 1;
        self.saves[slot] = val;

        if self.trace {
            trace!("saves: {:?}", self.saves);
        }
    }

    fn get(&self, slot: usize) -> usize {
        self.saves[slot]
    }

    #[inline]
    fn trace_stack(&self, operation: &str) {
        if self.trace {
            trace!("stack after {}: {:?}", operation, self.stack);
        }
    }
}

fn codepoint_len_at(s: &str, ix: usize) -> usize {
    codepoint_len(s.as_bytes()[ix])
}

/// Run the program on `s`, trying start positions from `pos` onwards (only
/// `pos` itself when `anchored`). Returns the saves of the first match, with
/// `usize::MAX` for slots that were never set.
///
/// Every failed branch counts as one backtrack, summed over all start
/// positions; exceeding `backtrack_limit` aborts the run with an error.
pub fn run(
    prog: &Prog,
    s: &str,
    pos: usize,
    anchored: bool,
    backtrack_limit: usize,
) -> Result<Option<Vec<usize>>> {
    let mut state = State::new(prog.n_saves, MAX_STACK);
    if state.trace {
        prog.debug_print();
        trace!("pos\tinstruction");
    }
    let mut backtrack_count = 0;
    let mut start = pos;
    loop {
        if prog.anchored && start > 0 {
            return Ok(None);
        }
        state.reset();
        let found = run_from(prog, s, start, &mut state, &mut backtrack_count, backtrack_limit)?;
        if let Some(mut saves) = found {
            saves.truncate(prog.n_slots);
            return Ok(Some(saves));
        }
        if anchored || start >= s.len() {
            return Ok(None);
        }
        start = next_codepoint_ix(s, start);
    }
}

fn run_from(
    prog: &Prog,
    s: &str,
    pos: usize,
    state: &mut State,
    backtrack_count: &mut usize,
    backtrack_limit: usize,
) -> Result<Option<Vec<usize>>> {
    let mut pc = 0;
    let mut ix = pos;
    loop {
        // break from this loop to fail, causes stack to pop
        'fail: loop {
            if state.trace {
                trace!("{}\t{} {:?}", ix, pc, prog.body[pc]);
            }
            match prog.body[pc] {
                Insn::End => {
                    if state.trace {
                        trace!("saves: {:?}", state.saves);
                    }
                    return Ok(Some(state.saves.clone()));
                }
                Insn::Any => {
                    if ix < s.len() && s.as_bytes()[ix] != b'\n' {
                        ix += codepoint_len_at(s, ix)
                    } else {
                        break 'fail;
                    }
                }
                Insn::Lit(ref val) => {
                    let end = ix + val.len();
                    if end > s.len() || &s.as_bytes()[ix..end] != val.as_bytes() {
                        break 'fail;
                    }
                    ix = end;
                }
                Insn::Class(ref class) => match char_at(s, ix) {
                    Some(c) if class.matches(c) => ix += c.len_utf8(),
                    _ => break 'fail,
                },
                Insn::Assertion(assertion) => {
                    if !assertion.holds(s, ix) {
                        break 'fail;
                    }
                }
                Insn::Split(x, y) => {
                    state.push(y, ix)?;
                    pc = x;
                    continue;
                }
                Insn::Jmp(target) => {
                    pc = target;
                    continue;
                }
                Insn::Save(slot) => state.save(slot, ix),
                Insn::Save0(slot) => state.save(slot, 0),
                Insn::Restore(slot) => ix = state.get(slot),
                Insn::RepeatGr {
                    lo,
                    hi,
                    next,
                    repeat,
                } => {
                    let repcount = state.get(repeat);
                    if repcount == hi {
                        pc = next;
                        continue;
                    }
                    state.save(repeat, repcount + 1);
                    if repcount >= lo {
                        state.push(next, ix)?;
                    }
                }
                Insn::RepeatNg {
                    lo,
                    hi,
                    next,
                    repeat,
                } => {
                    let repcount = state.get(repeat);
                    if repcount == hi {
                        pc = next;
                        continue;
                    }
                    state.save(repeat, repcount + 1);
                    if repcount >= lo {
                        state.push(pc + 1, ix)?;
                        pc = next;
                        continue;
                    }
                }
                Insn::RepeatEpsilonGr {
                    lo,
                    next,
                    repeat,
                    check,
                } => {
                    let repcount = state.get(repeat);
                    if repcount > lo && state.get(check) == ix {
                        // prevent zero-length match on repeat
                        break 'fail;
                    }
                    state.save(repeat, repcount + 1);
                    if repcount >= lo {
                        state.save(check, ix);
                        state.push(next, ix)?;
                    }
                }
                Insn::RepeatEpsilonNg {
                    lo,
                    next,
                    repeat,
                    check,
                } => {
                    let repcount = state.get(repeat);
                    if repcount > lo && state.get(check) == ix {
                        // prevent zero-length match on repeat
                        break 'fail;
                    }
                    state.save(repeat, repcount + 1);
                    if repcount >= lo {
                        state.save(check, ix);
                        state.push(pc + 1, ix)?;
                        pc = next;
                        continue;
                    }
                }
                Insn::GoBack { min, max } => {
                    for _ in 0..min {
                        if ix == 0 {
                            break 'fail;
                        }
                        ix = prev_codepoint_ix(s, ix);
                    }
                    // wider windows are pushed first so they are popped last
                    let mut wider = Vec::new();
                    let mut back = ix;
                    for _ in min..max {
                        if back == 0 {
                            break;
                        }
                        back = prev_codepoint_ix(s, back);
                        wider.push(back);
                    }
                    for &back in wider.iter().rev() {
                        state.push(pc + 1, back)?;
                    }
                }
                Insn::CheckPosition(slot) => {
                    if ix != state.get(slot) {
                        break 'fail;
                    }
                }
                Insn::FailNegativeLookAround => {
                    // Reaching this instruction means that the body of the
                    // look-around matched. Because it's a *negative* look-around,
                    // the look-around itself fails. The branches pushed inside
                    // the look-around are discarded, down to the one that
                    // continues after it.
                    while let Some((popped_pc, _)) = state.pop() {
                        if popped_pc == pc + 1 {
                            break;
                        }
                    }
                    break 'fail;
                }
                Insn::Backref(slot) => {
                    let lo = state.get(slot);
                    let hi = state.get(slot + 1);
                    if lo == usize::MAX || hi == usize::MAX || lo > hi {
                        // the group did not participate in the match, or is
                        // still open in this iteration
                        break 'fail;
                    }
                    let ix_end = ix + (hi - lo);
                    if ix_end > s.len() || s.as_bytes()[ix..ix_end] != s.as_bytes()[lo..hi] {
                        break 'fail;
                    }
                    ix = ix_end;
                }
            }
            pc += 1;
        }
        if state.trace {
            trace!("fail");
        }
        // "break 'fail" goes here
        match state.pop() {
            Some((newpc, newix)) => {
                *backtrack_count += 1;
                if *backtrack_count > backtrack_limit {
                    return Err(Error::RuntimeError(RuntimeError::BacktrackLimitExceeded));
                }
                pc = newpc;
                ix = newix;
            }
            None => return Ok(None),
        }
    }
}
