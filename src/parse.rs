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

//! A regex parser yielding an AST.

use bit_set::BitSet;
use regex_syntax::hir::{Class, HirKind};

use crate::LookAround::*;
use crate::{codepoint_len, Assertion, CharClass, Error, Expr, ParseError, Result, MAX_RECURSION};

/// A parsed pattern.
#[derive(Debug, Clone)]
pub struct ExprTree {
    /// The root of the AST.
    pub expr: Expr,
    /// The groups that are the target of a backref.
    pub backrefs: BitSet,
    /// The number of capture groups, not counting group 0.
    pub group_count: usize,
}

#[derive(Debug)]
pub(crate) struct Parser<'a> {
    re: &'a str, // source
    backrefs: BitSet,
    curr_group: usize, // need to keep track of which group number we're parsing
}

// One element of a bracketed class, before ranges are formed.
enum ClassItem {
    Char(char),
    Set(Vec<(char, char)>),
}

impl<'a> Parser<'a> {
    pub(crate) fn parse(re: &str) -> Result<ExprTree> {
        let mut p = Parser::new(re);
        let (ix, expr) = p.parse_re(0, 0)?;
        if ix < re.len() {
            // parse_re only stops early in front of a `)`
            return Err(Error::ParseError(ix, ParseError::UnmatchedCloseParen));
        }
        Ok(ExprTree {
            expr,
            backrefs: p.backrefs,
            group_count: p.curr_group,
        })
    }

    fn new(re: &str) -> Parser<'_> {
        Parser {
            re,
            backrefs: Default::default(),
            curr_group: 0,
        }
    }

    fn parse_re(&mut self, ix: usize, depth: usize) -> Result<(usize, Expr)> {
        let (ix, child) = self.parse_branch(ix, depth)?;
        let mut ix = ix;
        if self.re[ix..].starts_with('|') {
            let mut children = vec![child];
            while self.re[ix..].starts_with('|') {
                ix += 1;
                let (next, child) = self.parse_branch(ix, depth)?;
                children.push(child);
                ix = next;
            }
            return Ok((ix, Expr::Alt(children)));
        }
        Ok((ix, child))
    }

    fn parse_branch(&mut self, ix: usize, depth: usize) -> Result<(usize, Expr)> {
        let mut children = Vec::new();
        let mut ix = ix;
        while ix < self.re.len() {
            let (next, child) = self.parse_piece(ix, depth)?;
            if next == ix {
                break;
            }
            if child != Expr::Empty {
                children.push(child);
            }
            ix = next;
        }
        let expr = if children.len() > 1 {
            Expr::Concat(children)
        } else {
            children.pop().unwrap_or(Expr::Empty)
        };
        Ok((ix, expr))
    }

    fn parse_piece(&mut self, ix: usize, depth: usize) -> Result<(usize, Expr)> {
        let (next, child) = self.parse_atom(ix, depth)?;
        // an atom that consumed nothing is a quantifier with no target
        let repeatable = next > ix && !matches!(child, Expr::LookAround(_, _));
        let mut ix = next;
        if ix < self.re.len() {
            let (lo, hi) = match self.re.as_bytes()[ix] {
                b'?' => (0, 1),
                b'*' => (0, usize::MAX),
                b'+' => (1, usize::MAX),
                b'{' => {
                    match self.parse_repeat(ix) {
                        Ok((next, lo, hi)) => {
                            if hi < lo {
                                return Err(Error::ParseError(ix, ParseError::InvalidRepeat));
                            }
                            ix = next - 1;
                            (lo, hi)
                        }
                        Err(_) => {
                            // Invalid repeat syntax, which results in `{` being treated as a literal
                            return Ok((ix, child));
                        }
                    }
                }
                _ => return Ok((ix, child)),
            };
            if !repeatable {
                return Err(Error::ParseError(ix, ParseError::TargetNotRepeatable));
            }
            ix += 1;
            let mut greedy = true;
            if ix < self.re.len() && self.re.as_bytes()[ix] == b'?' {
                greedy = false;
                ix += 1;
            }
            let node = Expr::Repeat {
                child: Box::new(child),
                lo,
                hi,
                greedy,
            };
            return Ok((ix, node));
        }
        Ok((ix, child))
    }

    // ix, lo, hi
    fn parse_repeat(&self, ix: usize) -> Result<(usize, usize, usize)> {
        let ix = ix + 1; // skip opening '{'
        let bytes = self.re.as_bytes();
        if ix == self.re.len() {
            return Err(Error::ParseError(ix, ParseError::InvalidRepeat));
        }
        let mut end = ix;
        let lo = if bytes[ix] == b',' {
            0
        } else if let Some((next, lo)) = parse_decimal(self.re, ix) {
            end = next;
            lo
        } else {
            return Err(Error::ParseError(ix, ParseError::InvalidRepeat));
        };
        let ix = end; // past lo number
        if ix == self.re.len() {
            return Err(Error::ParseError(ix, ParseError::InvalidRepeat));
        }
        let hi = match bytes[ix] {
            b'}' => lo,
            b',' => {
                end = ix + 1; // past ','
                if let Some((next, hi)) = parse_decimal(self.re, end) {
                    end = next;
                    hi
                } else {
                    usize::MAX
                }
            }
            _ => return Err(Error::ParseError(ix, ParseError::InvalidRepeat)),
        };
        let ix = end; // past hi number
        if ix == self.re.len() || bytes[ix] != b'}' {
            return Err(Error::ParseError(ix, ParseError::InvalidRepeat));
        }
        Ok((ix + 1, lo, hi))
    }

    fn parse_atom(&mut self, ix: usize, depth: usize) -> Result<(usize, Expr)> {
        if ix == self.re.len() {
            return Ok((ix, Expr::Empty));
        }
        match self.re.as_bytes()[ix] {
            b'.' => Ok((ix + 1, Expr::Any)),
            b'^' => Ok((ix + 1, Expr::Assertion(Assertion::StartText))),
            b'$' => Ok((ix + 1, Expr::Assertion(Assertion::EndText))),
            b'(' => self.parse_group(ix, depth),
            b'\\' => self.parse_escape(ix, false),
            b'+' | b'*' | b'?' | b'|' | b')' => Ok((ix, Expr::Empty)),
            b'[' => self.parse_class(ix),
            b => {
                let next = ix + codepoint_len(b);
                Ok((next, make_literal(&self.re[ix..next])))
            }
        }
    }

    fn parse_backref(&mut self, ix: usize) -> Result<(usize, Expr)> {
        if let Some((end, group)) = parse_decimal(self.re, ix + 1) {
            // only groups whose opening paren is already behind us
            if group <= self.curr_group {
                self.backrefs.insert(group);
                return Ok((end, Expr::Backref(group)));
            }
        }
        Err(Error::ParseError(ix, ParseError::InvalidBackref))
    }

    // ix points to \ character
    fn parse_escape(&mut self, ix: usize, in_class: bool) -> Result<(usize, Expr)> {
        let bytes = self.re.as_bytes();
        let Some(b) = bytes.get(ix + 1).copied() else {
            return Err(Error::ParseError(ix, ParseError::TrailingBackslash));
        };
        let end = ix + 1 + codepoint_len(b);
        Ok(match b {
            b'1'..=b'9' if !in_class => return self.parse_backref(ix),
            b'b' if !in_class => (end, Expr::Assertion(Assertion::WordBoundary)),
            b'B' if !in_class => (end, Expr::Assertion(Assertion::NotWordBoundary)),
            b'd' | b'D' | b'w' | b'W' | b's' | b'S' => (end, Expr::Class(perl_class(ix, b)?)),
            b'x' => return self.parse_hex(end, 2),
            b'u' => return self.parse_hex(end, 4),
            b => (
                end,
                make_literal(match b {
                    b'0' => "\0",
                    b'a' => "\x07", // BEL
                    b'b' => "\x08", // BS, only inside a class
                    b'e' => "\x1b", // ESC
                    b'f' => "\x0c", // FF
                    b'n' => "\n",   // LF
                    b'r' => "\r",   // CR
                    b't' => "\t",   // TAB
                    b'v' => "\x0b", // VT
                    b => {
                        let s = &self.re[ix + 1..end];
                        if b.is_ascii_alphanumeric() {
                            return Err(Error::ParseError(
                                ix,
                                ParseError::InvalidEscape(format!("\\{}", s)),
                            ));
                        }
                        s
                    }
                }),
            ),
        })
    }

    // ix points after '\x' or '\u', eg to 'A0' or '{12345}'
    fn parse_hex(&self, ix: usize, digits: usize) -> Result<(usize, Expr)> {
        if ix >= self.re.len() {
            // Incomplete escape sequence
            return Err(Error::ParseError(ix, ParseError::InvalidHex));
        }
        let bytes = self.re.as_bytes();
        if ix + digits <= self.re.len() && bytes[ix..ix + digits].iter().all(u8::is_ascii_hexdigit)
        {
            return self.hex_to_literal(ix, ix + digits, &self.re[ix..ix + digits]);
        }
        if bytes[ix] == b'{' {
            let start = ix + 1;
            let mut pos = start;
            while pos < self.re.len() && bytes[pos].is_ascii_hexdigit() && pos - start < 8 {
                pos += 1;
            }
            if pos > start && bytes.get(pos) == Some(&b'}') {
                return self.hex_to_literal(ix, pos + 1, &self.re[start..pos]);
            }
        }
        Err(Error::ParseError(ix, ParseError::InvalidHex))
    }

    fn hex_to_literal(&self, ix: usize, end: usize, hex_str: &str) -> Result<(usize, Expr)> {
        let codepoint = u32::from_str_radix(hex_str, 16)
            .map_err(|_| Error::ParseError(ix, ParseError::InvalidHex))?;
        match char::from_u32(codepoint) {
            Some(c) => Ok((end, Expr::Literal(c.to_string()))),
            None => Err(Error::ParseError(ix, ParseError::InvalidCodepointValue)),
        }
    }

    fn parse_class(&mut self, ix: usize) -> Result<(usize, Expr)> {
        let bytes = self.re.as_bytes();
        let mut ix = ix + 1; // skip opening '['
        let mut negated = false;
        let mut ranges = Vec::new();

        // Negated character class
        if bytes.get(ix) == Some(&b'^') {
            negated = true;
            ix += 1;
        }

        // `]` does not have to be escaped after opening `[` or `[^`
        let mut first = true;
        loop {
            if ix == self.re.len() {
                return Err(Error::ParseError(ix, ParseError::InvalidClass));
            }
            if bytes[ix] == b']' && !first {
                break;
            }
            first = false;
            let (next, item) = self.parse_class_item(ix)?;
            ix = match item {
                ClassItem::Set(set) => {
                    ranges.extend(set);
                    next
                }
                ClassItem::Char(lo) => {
                    // `-` is literal at the end of the class
                    if bytes.get(next) == Some(&b'-')
                        && next + 1 < self.re.len()
                        && bytes[next + 1] != b']'
                    {
                        let (after, hi) = self.parse_class_item(next + 1)?;
                        match hi {
                            ClassItem::Char(hi) if hi >= lo => ranges.push((lo, hi)),
                            _ => return Err(Error::ParseError(ix, ParseError::InvalidClassRange)),
                        }
                        after
                    } else {
                        ranges.push((lo, lo));
                        next
                    }
                }
            };
        }
        let class = Expr::Class(CharClass::new(ranges, negated));
        Ok((ix + 1, class)) // skip closing ']'
    }

    fn parse_class_item(&mut self, ix: usize) -> Result<(usize, ClassItem)> {
        let b = self.re.as_bytes()[ix];
        if b == b'\\' {
            let (end, expr) = self.parse_escape(ix, true)?;
            return match expr {
                Expr::Literal(val) => match val.chars().next() {
                    Some(c) => Ok((end, ClassItem::Char(c))),
                    None => Err(Error::ParseError(ix, ParseError::InvalidClass)),
                },
                Expr::Class(class) => Ok((end, ClassItem::Set(class.positive_ranges()))),
                _ => Err(Error::ParseError(ix, ParseError::InvalidClass)),
            };
        }
        let end = ix + codepoint_len(b);
        match self.re[ix..end].chars().next() {
            Some(c) => Ok((end, ClassItem::Char(c))),
            None => Err(Error::ParseError(ix, ParseError::InvalidClass)),
        }
    }

    fn parse_group(&mut self, ix: usize, depth: usize) -> Result<(usize, Expr)> {
        let depth = depth + 1;
        if depth >= MAX_RECURSION {
            return Err(Error::ParseError(ix, ParseError::RecursionExceeded));
        }
        let open = ix;
        let ix = ix + 1;
        let rest = &self.re[ix..];
        let (la, skip) = if rest.starts_with("?=") {
            (Some(LookAhead), 2)
        } else if rest.starts_with("?!") {
            (Some(LookAheadNeg), 2)
        } else if rest.starts_with("?<=") {
            (Some(LookBehind), 3)
        } else if rest.starts_with("?<!") {
            (Some(LookBehindNeg), 3)
        } else if rest.starts_with("?:") {
            (None, 2)
        } else if rest.starts_with('?') {
            let flag_end = ix + 1 + rest[1..].chars().next().map_or(0, char::len_utf8);
            return Err(Error::ParseError(
                open,
                ParseError::UnknownGroupFlag(self.re[open..flag_end].to_string()),
            ));
        } else {
            self.curr_group += 1; // this is a capture group
            (None, 0)
        };
        let index = self.curr_group;
        let (ix, child) = self.parse_re(ix + skip, depth)?;
        let ix = self.check_for_close_paren(ix)?;
        let result = match (la, skip) {
            (Some(la), _) => Expr::LookAround(Box::new(child), la),
            (None, 2) => child,
            _ => make_group(index, child),
        };
        Ok((ix, result))
    }

    fn check_for_close_paren(&self, ix: usize) -> Result<usize> {
        if ix == self.re.len() {
            return Err(Error::ParseError(ix, ParseError::UnclosedOpenParen));
        } else if self.re.as_bytes()[ix] != b')' {
            return Err(Error::ParseError(
                ix,
                ParseError::GeneralParseError("expected close paren".to_string()),
            ));
        }
        Ok(ix + 1)
    }
}

// Expands `\d \w \s` and their negations to the ranges regex-syntax uses.
fn perl_class(ix: usize, b: u8) -> Result<CharClass> {
    let pattern = match b.to_ascii_lowercase() {
        b'd' => r"\d",
        b'w' => r"\w",
        _ => r"\s",
    };
    let hir = regex_syntax::Parser::new()
        .parse(pattern)
        .map_err(|e| Error::ParseError(ix, ParseError::GeneralParseError(e.to_string())))?;
    match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => {
            let ranges = class.ranges().iter().map(|r| (r.start(), r.end())).collect();
            Ok(CharClass::new(ranges, b.is_ascii_uppercase()))
        }
        _ => Err(Error::ParseError(
            ix,
            ParseError::GeneralParseError(format!("unexpected expansion of {}", pattern)),
        )),
    }
}

pub(crate) fn parse_decimal(s: &str, ix: usize) -> Option<(usize, usize)> {
    let mut end = ix;
    while end < s.len() && s.as_bytes()[end].is_ascii_digit() {
        end += 1;
    }
    s[ix..end].parse::<usize>().ok().map(|val| (end, val))
}

pub(crate) fn make_literal(s: &str) -> Expr {
    Expr::Literal(String::from(s))
}

pub(crate) fn make_group(index: usize, inner: Expr) -> Expr {
    Expr::Group {
        index,
        child: Box::new(inner),
    }
}

#[cfg(test)]
mod tests {
    use crate::parse::{make_group, make_literal};
    use crate::{Assertion, CharClass, Error, Expr, LookAround::*, ParseError};

    fn p(s: &str) -> Expr {
        Expr::parse_tree(s).unwrap().expr
    }

    #[cfg_attr(feature = "track_caller", track_caller)]
    fn fail(s: &str) {
        assert!(
            Expr::parse_tree(s).is_err(),
            "Expected parse error, but was: {:?}",
            Expr::parse_tree(s)
        );
    }

    #[cfg_attr(feature = "track_caller", track_caller)]
    fn assert_error(re: &str, expected_error: &str) {
        let result = Expr::parse_tree(re);
        assert!(
            result.is_err(),
            "Expected parse error, but was: {:?}",
            result
        );
        assert_eq!(&format!("{}", result.err().unwrap()), expected_error);
    }

    #[cfg_attr(feature = "track_caller", track_caller)]
    fn assert_error_kind(re: &str, position: usize, kind: ParseError) {
        match Expr::parse_tree(re) {
            Err(Error::ParseError(pos, k)) => assert_eq!((pos, k), (position, kind), "{}", re),
            other => panic!("Expected parse error for {}, but was: {:?}", re, other),
        }
    }

    fn class(ranges: &[(char, char)], negated: bool) -> Expr {
        Expr::Class(CharClass::new(ranges.to_vec(), negated))
    }

    #[test]
    fn empty() {
        assert_eq!(p(""), Expr::Empty);
    }

    #[test]
    fn any() {
        assert_eq!(p("."), Expr::Any);
    }

    #[test]
    fn start_text() {
        assert_eq!(p("^"), Expr::Assertion(Assertion::StartText));
    }

    #[test]
    fn end_text() {
        assert_eq!(p("$"), Expr::Assertion(Assertion::EndText));
    }

    #[test]
    fn literal() {
        assert_eq!(p("a"), make_literal("a"));
        assert_eq!(p("\u{e9}"), make_literal("\u{e9}"));
    }

    #[test]
    fn literal_special() {
        assert_eq!(p("}"), make_literal("}"));
        assert_eq!(p("]"), make_literal("]"));
    }

    #[test]
    fn literal_unescaped_opening_curly() {
        // `{` in position where quantifier is not allowed results in literal `{`
        assert_eq!(p("{"), make_literal("{"));
        assert_eq!(p("({)"), make_group(1, make_literal("{")));
        assert_eq!(
            p("a|{"),
            Expr::Alt(vec![make_literal("a"), make_literal("{")])
        );
        assert_eq!(
            p("{{2}"),
            Expr::Repeat {
                child: Box::new(make_literal("{")),
                lo: 2,
                hi: 2,
                greedy: true
            }
        );
    }

    #[test]
    fn literal_escape() {
        assert_eq!(p("\\'"), make_literal("'"));
        assert_eq!(p("\\\""), make_literal("\""));
        assert_eq!(p("\\ "), make_literal(" "));
        assert_eq!(p("\\."), make_literal("."));
        assert_eq!(p("\\n"), make_literal("\n"));
        assert_eq!(p("\\0"), make_literal("\0"));
        assert_eq!(p("\\e"), make_literal("\x1b"));
        assert_eq!(p("\\xA0"), make_literal("\u{A0}"));
        assert_eq!(p("\\x{1F4A9}"), make_literal("\u{1F4A9}"));
        assert_eq!(p("\\x{000000B7}"), make_literal("\u{B7}"));
        assert_eq!(p("\\u21D2"), make_literal("\u{21D2}"));
        assert_eq!(p("\\u{21D2}"), make_literal("\u{21D2}"));
        assert_eq!(p("\\u21D2x"), p("\u{21D2}x"));
    }

    #[test]
    fn invalid_escape() {
        assert_error(
            "\\",
            "Parsing error at position 0: Backslash without following character",
        );
        assert_error("\\q", "Parsing error at position 0: Invalid escape: \\q");
        assert_error("\\u", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\x", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\xAG", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\xA", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\x{}", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\x{AG}", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\x{42", "Parsing error at position 2: Invalid hex escape");
        assert_error(
            "\\x{D800}",
            "Parsing error at position 2: Invalid codepoint for hex escape",
        );
        assert_error(
            "\\x{110000}",
            "Parsing error at position 2: Invalid codepoint for hex escape",
        );
        assert_error("\\u123", "Parsing error at position 2: Invalid hex escape");
        assert_error("\\u{}", "Parsing error at position 2: Invalid hex escape");
    }

    #[test]
    fn concat() {
        assert_eq!(
            p("ab"),
            Expr::Concat(vec![make_literal("a"), make_literal("b")])
        );
    }

    #[test]
    fn alt() {
        assert_eq!(
            p("a|b"),
            Expr::Alt(vec![make_literal("a"), make_literal("b")])
        );
        assert_eq!(p("a|"), Expr::Alt(vec![make_literal("a"), Expr::Empty]));
    }

    #[test]
    fn group() {
        assert_eq!(p("(a)"), make_group(1, make_literal("a")));
    }

    #[test]
    fn nested_groups_numbered_by_open_paren() {
        assert_eq!(
            p("((a)(b))"),
            make_group(
                1,
                Expr::Concat(vec![
                    make_group(2, make_literal("a")),
                    make_group(3, make_literal("b")),
                ])
            )
        );
        assert_eq!(Expr::parse_tree("((a)(b))").unwrap().group_count, 3);
    }

    #[test]
    fn group_repeat() {
        assert_eq!(
            p("(a){2}"),
            Expr::Repeat {
                child: Box::new(make_group(1, make_literal("a"))),
                lo: 2,
                hi: 2,
                greedy: true
            }
        );
    }

    #[test]
    fn repeat() {
        let rep = |lo, hi, greedy| Expr::Repeat {
            child: Box::new(make_literal("a")),
            lo,
            hi,
            greedy,
        };
        assert_eq!(p("a{2,42}"), rep(2, 42, true));
        assert_eq!(p("a{2,}"), rep(2, usize::MAX, true));
        assert_eq!(p("a{,3}"), rep(0, 3, true));
        assert_eq!(p("a{2}?"), rep(2, 2, false));
        assert_eq!(p("a*"), rep(0, usize::MAX, true));
        assert_eq!(p("a+?"), rep(1, usize::MAX, false));
        assert_eq!(p("a??"), rep(0, 1, false));
    }

    #[test]
    fn invalid_repeat() {
        // Invalid repeat syntax results in literal
        assert_eq!(
            p("a{"),
            Expr::Concat(vec![make_literal("a"), make_literal("{")])
        );
        assert_eq!(
            p("a{6"),
            Expr::Concat(vec![
                make_literal("a"),
                make_literal("{"),
                make_literal("6"),
            ])
        );
        assert_eq!(
            p("a{1,A}"),
            Expr::Concat(vec![
                make_literal("a"),
                make_literal("{"),
                make_literal("1"),
                make_literal(","),
                make_literal("A"),
                make_literal("}"),
            ])
        );
        assert_error_kind("a{3,2}", 1, ParseError::InvalidRepeat);
    }

    #[test]
    fn dangling_quantifiers() {
        assert_error_kind("*a", 0, ParseError::TargetNotRepeatable);
        assert_error_kind("a|+", 2, ParseError::TargetNotRepeatable);
        assert_error_kind("(?a)", 0, ParseError::UnknownGroupFlag("(?a".to_string()));
        assert_error_kind("(*)", 1, ParseError::TargetNotRepeatable);
        assert_error_kind("a**", 2, ParseError::TargetNotRepeatable);
        assert_error_kind("(?=a)*", 5, ParseError::TargetNotRepeatable);
    }

    #[test]
    fn quantifiers_on_assertions() {
        assert_eq!(
            p(r"\b{1}"),
            Expr::Repeat {
                child: Box::new(Expr::Assertion(Assertion::WordBoundary)),
                lo: 1,
                hi: 1,
                greedy: true
            }
        );
        assert_eq!(
            p("(?:)*"),
            Expr::Repeat {
                child: Box::new(Expr::Empty),
                lo: 0,
                hi: usize::MAX,
                greedy: true
            }
        );
        assert_eq!(
            p(r"^*"),
            Expr::Repeat {
                child: Box::new(Expr::Assertion(Assertion::StartText)),
                lo: 0,
                hi: usize::MAX,
                greedy: true
            }
        );
    }

    #[test]
    fn parens() {
        assert_error_kind("(a", 2, ParseError::UnclosedOpenParen);
        assert_error_kind("((a)", 4, ParseError::UnclosedOpenParen);
        assert_error_kind("a)b", 1, ParseError::UnmatchedCloseParen);
        assert_error_kind("(a))", 3, ParseError::UnmatchedCloseParen);
    }

    #[test]
    fn recursion() {
        let deep = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert_error_kind(&deep, 63, ParseError::RecursionExceeded);
        let shallow = format!("{}a{}", "(".repeat(10), ")".repeat(10));
        assert!(Expr::parse_tree(&shallow).is_ok());
    }

    #[test]
    fn backref() {
        assert_eq!(
            p("(.)\\1"),
            Expr::Concat(vec![make_group(1, Expr::Any), Expr::Backref(1)])
        );
        let tree = Expr::parse_tree("(a)(b)\\2").unwrap();
        assert!(tree.backrefs.contains(2));
        assert!(!tree.backrefs.contains(1));
    }

    #[test]
    fn invalid_backref() {
        assert_error("\\1", "Parsing error at position 0: Invalid back reference");
        assert_error_kind("(a)\\2", 3, ParseError::InvalidBackref);
        assert_error_kind("\\1(a)", 0, ParseError::InvalidBackref);
    }

    #[test]
    fn lookaround() {
        assert_eq!(
            p("(?=a)"),
            Expr::LookAround(Box::new(make_literal("a")), LookAhead)
        );
        assert_eq!(
            p("(?!a)"),
            Expr::LookAround(Box::new(make_literal("a")), LookAheadNeg)
        );
        assert_eq!(
            p("(?<=a)"),
            Expr::LookAround(Box::new(make_literal("a")), LookBehind)
        );
        assert_eq!(
            p("(?<!a)"),
            Expr::LookAround(Box::new(make_literal("a")), LookBehindNeg)
        );
    }

    #[test]
    fn shy_group() {
        assert_eq!(
            p("(?:ab)c"),
            Expr::Concat(vec![
                Expr::Concat(vec![make_literal("a"), make_literal("b")]),
                make_literal("c"),
            ])
        );
        assert_eq!(p("(?:a)(b)"), Expr::Concat(vec![make_literal("a"), make_group(1, make_literal("b"))]));
    }

    #[test]
    fn word_boundaries() {
        assert_eq!(
            p(r"\bx\B"),
            Expr::Concat(vec![
                Expr::Assertion(Assertion::WordBoundary),
                make_literal("x"),
                Expr::Assertion(Assertion::NotWordBoundary),
            ])
        );
    }

    #[test]
    fn char_class() {
        assert_eq!(p("[a-c]"), class(&[('a', 'c')], false));
        assert_eq!(p("[^abc]"), class(&[('a', 'c')], true));
        assert_eq!(p("[]a]"), class(&[(']', ']'), ('a', 'a')], false));
        assert_eq!(p("[^]]"), class(&[(']', ']')], true));
        assert_eq!(p("[a-]"), class(&[('-', '-'), ('a', 'a')], false));
        assert_eq!(p(r"[\]\n]"), class(&[('\n', '\n'), (']', ']')], false));
        assert_eq!(p(r"[\x41-\x43]"), class(&[('A', 'C')], false));
        assert_eq!(p("[\\b]"), class(&[('\x08', '\x08')], false));
        assert_eq!(p("[(]"), class(&[('(', '(')], false));
    }

    #[test]
    fn char_class_shorthands() {
        match p(r"[\d_]") {
            Expr::Class(c) => {
                assert!(c.matches('7'));
                assert!(c.matches('_'));
                assert!(c.matches('\u{0663}'));
                assert!(!c.matches('a'));
            }
            e => panic!("unexpected {:?}", e),
        }
        match p(r"\W") {
            Expr::Class(c) => {
                assert!(c.is_negated());
                assert!(c.matches(' '));
                assert!(!c.matches('\u{e9}'));
            }
            e => panic!("unexpected {:?}", e),
        }
        match p(r"[\S]") {
            Expr::Class(c) => {
                assert!(!c.is_negated());
                assert!(!c.matches('\t'));
                assert!(c.matches('x'));
            }
            e => panic!("unexpected {:?}", e),
        }
    }

    #[test]
    fn invalid_class() {
        assert_error_kind("[a-c", 4, ParseError::InvalidClass);
        assert_error_kind("[]", 2, ParseError::InvalidClass);
        assert_error_kind("[z-a]", 1, ParseError::InvalidClassRange);
        assert_error_kind(r"[a-\d]", 1, ParseError::InvalidClassRange);
        assert_error_kind(r"[\B]", 1, ParseError::InvalidEscape("\\B".to_string()));
        fail(r"[\1]");
    }

    #[test]
    fn invalid_group_flags() {
        fail("(?P<name>a)");
        fail("(?i)a");
        fail("(?");
    }
}
