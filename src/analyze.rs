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

//! Analysis of regex expressions.

use std::cmp::{max, min};

use crate::{Assertion, Expr, LookAround};

/// Facts about an expression and all of its subexpressions. Sizes are
/// counted in characters.
#[derive(Debug)]
pub struct Info<'a> {
    pub(crate) min_size: usize,
    /// `None` when the expression can match arbitrarily many characters.
    pub(crate) max_size: Option<usize>,
    /// Needs the backtracking VM: contains a backref, or a look-behind
    /// without a bound on its width.
    pub(crate) hard: bool,
    /// Every match starts at the start of the text.
    pub(crate) anchored_start: bool,
    pub(crate) expr: &'a Expr,
    pub(crate) children: Vec<Info<'a>>,
}

impl<'a> Info<'a> {
    pub(crate) fn is_literal(&self) -> bool {
        match *self.expr {
            Expr::Literal(_) | Expr::Empty => true,
            Expr::Concat(_) => self.children.iter().all(|child| child.is_literal()),
            _ => false,
        }
    }

    pub(crate) fn push_literal(&self, buf: &mut String) {
        match *self.expr {
            Expr::Literal(ref val) => buf.push_str(val),
            Expr::Concat(_) => {
                for child in &self.children {
                    child.push_literal(buf);
                }
            }
            _ => (),
        }
    }

    /// The literal this expression matches, if it only ever matches one
    /// fixed string.
    pub fn literal(&self) -> Option<String> {
        if !self.is_literal() {
            return None;
        }
        let mut buf = String::new();
        self.push_literal(&mut buf);
        Some(buf)
    }

    /// Whether the expression has a fixed width.
    pub fn is_const_size(&self) -> bool {
        self.max_size == Some(self.min_size)
    }

    /// Whether the expression needs the backtracking VM.
    pub fn is_hard(&self) -> bool {
        self.hard
    }
}

fn visit(expr: &Expr) -> Info<'_> {
    let mut children = Vec::new();
    let mut min_size = 0;
    let mut max_size = Some(0);
    let mut hard = false;
    let mut anchored_start = false;
    match *expr {
        Expr::Empty | Expr::Assertion(_) => {
            anchored_start = *expr == Expr::Assertion(Assertion::StartText);
        }
        Expr::Any | Expr::Class(_) => {
            min_size = 1;
            max_size = Some(1);
        }
        Expr::Literal(ref val) => {
            let len = val.chars().count();
            min_size = len;
            max_size = Some(len);
        }
        Expr::Concat(ref v) => {
            for child in v {
                let child_info = visit(child);
                min_size += child_info.min_size;
                max_size = max_size.zip(child_info.max_size).map(|(a, b)| a + b);
                hard |= child_info.hard;
                children.push(child_info);
            }
            // zero-width prefixes such as `\b^` do not unanchor the rest
            anchored_start = children
                .iter()
                .take_while(|child| child.max_size == Some(0))
                .any(|child| child.anchored_start);
        }
        Expr::Alt(ref v) => {
            for (i, child) in v.iter().enumerate() {
                let child_info = visit(child);
                if i == 0 {
                    min_size = child_info.min_size;
                    max_size = child_info.max_size;
                    anchored_start = child_info.anchored_start;
                } else {
                    min_size = min(min_size, child_info.min_size);
                    max_size = max_size.zip(child_info.max_size).map(|(a, b)| max(a, b));
                    anchored_start &= child_info.anchored_start;
                }
                hard |= child_info.hard;
                children.push(child_info);
            }
        }
        Expr::Group { ref child, .. } => {
            let child_info = visit(child);
            min_size = child_info.min_size;
            max_size = child_info.max_size;
            hard = child_info.hard;
            anchored_start = child_info.anchored_start;
            children.push(child_info);
        }
        Expr::LookAround(ref child, la) => {
            let child_info = visit(child);
            // min_size = 0
            hard = child_info.hard;
            if matches!(la, LookAround::LookBehind | LookAround::LookBehindNeg) {
                hard |= child_info.max_size.is_none();
            }
            children.push(child_info);
        }
        Expr::Repeat {
            ref child, lo, hi, ..
        } => {
            let child_info = visit(child);
            min_size = child_info.min_size.saturating_mul(lo);
            max_size = match child_info.max_size {
                Some(0) => Some(0),
                _ if hi == usize::MAX => None,
                Some(child_max) => child_max.checked_mul(hi),
                None => None,
            };
            hard = child_info.hard;
            anchored_start = lo > 0 && child_info.anchored_start;
            children.push(child_info);
        }
        Expr::Backref(_) => {
            max_size = None;
            hard = true;
        }
    };

    Info {
        min_size,
        max_size,
        hard,
        anchored_start,
        expr,
        children,
    }
}

/// Analyze the parsed expression to determine its width and whether it
/// requires the backtracking VM.
pub fn analyze(expr: &Expr) -> Info<'_> {
    visit(expr)
}
