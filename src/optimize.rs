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

//! Optimization of regex expressions.

use crate::Expr;

/// Rewrite the expression tree so that both executable forms get fewer,
/// larger steps. Concatenations nested through non-capturing groups are
/// flattened and runs of adjacent literals are merged into one literal.
/// The rewritten tree matches exactly the same strings with the same
/// captures.
pub fn optimize(expr: Expr) -> Expr {
    match expr {
        Expr::Concat(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match optimize(child) {
                    Expr::Concat(grandchildren) => flat.extend(grandchildren),
                    Expr::Empty => (),
                    child => flat.push(child),
                }
            }
            let mut merged: Vec<Expr> = Vec::with_capacity(flat.len());
            for child in flat {
                if let (Some(Expr::Literal(prev)), Expr::Literal(val)) = (merged.last_mut(), &child)
                {
                    prev.push_str(val);
                    continue;
                }
                merged.push(child);
            }
            if merged.len() > 1 {
                Expr::Concat(merged)
            } else {
                merged.pop().unwrap_or(Expr::Empty)
            }
        }
        Expr::Alt(children) => Expr::Alt(children.into_iter().map(optimize).collect()),
        Expr::Group { index, child } => Expr::Group {
            index,
            child: Box::new(optimize(*child)),
        },
        Expr::LookAround(child, la) => Expr::LookAround(Box::new(optimize(*child)), la),
        Expr::Repeat {
            child,
            lo,
            hi,
            greedy,
        } => Expr::Repeat {
            child: Box::new(optimize(*child)),
            lo,
            hi,
            greedy,
        },
        expr => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::optimize;
    use crate::parse::{make_group, make_literal};
    use crate::Expr;

    fn opt(re: &str) -> Expr {
        optimize(Expr::parse_tree(re).unwrap().expr)
    }

    #[test]
    fn adjacent_literals_merged() {
        assert_eq!(opt("abc"), make_literal("abc"));
        assert_eq!(
            opt("ab.cd"),
            Expr::Concat(vec![make_literal("ab"), Expr::Any, make_literal("cd")])
        );
    }

    #[test]
    fn shy_groups_flattened() {
        assert_eq!(opt("(?:ab)c"), make_literal("abc"));
        assert_eq!(opt("a(?:)b"), make_literal("ab"));
    }

    #[test]
    fn capture_groups_left_alone() {
        assert_eq!(
            opt("a(b)c"),
            Expr::Concat(vec![
                make_literal("a"),
                make_group(1, make_literal("b")),
                make_literal("c"),
            ])
        );
    }

    #[test]
    fn repeat_target_not_merged_with_neighbours() {
        assert_eq!(
            opt("abc*"),
            Expr::Concat(vec![
                make_literal("ab"),
                Expr::Repeat {
                    child: Box::new(make_literal("c")),
                    lo: 0,
                    hi: usize::MAX,
                    greedy: true,
                },
            ])
        );
    }

    #[test]
    fn optimized_tree_renders_equivalent_pattern() {
        let mut s = String::new();
        opt("(?:ab)+(cd|ef)").to_str(&mut s, 0);
        assert_eq!(s, "(?:ab){1,}(cd|ef)");
    }
}
