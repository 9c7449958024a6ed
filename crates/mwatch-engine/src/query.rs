//! Boolean keyword queries: `budget AND (parliament OR NOT rumour)`.
//!
//! Terms match as case-insensitive substrings of the text. Operators are
//! `NOT` (unary), `AND`, `OR`, in descending precedence, with parentheses
//! for grouping. Evaluation is total: unbalanced parentheses and missing
//! operands never fail, a missing operand reads as `false`.

use std::sync::LazyLock;

use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s()]").expect("valid query sanitize regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Not,
    And,
    Or,
}

impl Op {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "NOT" => Some(Self::Not),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Self::Not => 3,
            Self::And => 2,
            Self::Or => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term(String),
    Op(Op),
    Open,
    Close,
}

/// Replace everything except word characters, whitespace and parentheses
/// with a space, then trim.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    UNSAFE_CHARS.replace_all(raw, " ").trim().to_string()
}

fn tokenize(query: &str) -> Vec<Token> {
    query
        .replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(|t| match t {
            "(" => Token::Open,
            ")" => Token::Close,
            _ => Op::parse(t).map_or_else(|| Token::Term(t.to_lowercase()), Token::Op),
        })
        .collect()
}

/// Shunting-yard conversion to postfix. `NOT` is a prefix operator, so
/// pushing it never pops another operator; binary operators pop while the
/// stack top binds at least as tightly.
fn to_postfix(tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Term(_) => output.push(token),
            Token::Op(op) => {
                if op != Op::Not {
                    while let Some(Token::Op(top)) = stack.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        if let Some(popped) = stack.pop() {
                            output.push(popped);
                        }
                    }
                }
                stack.push(Token::Op(op));
            }
            Token::Open => stack.push(Token::Open),
            Token::Close => {
                while let Some(top) = stack.pop() {
                    if top == Token::Open {
                        break;
                    }
                    output.push(top);
                }
            }
        }
    }

    // Unmatched open parentheses are dropped.
    output.extend(stack.into_iter().rev().filter(|t| *t != Token::Open));
    output
}

/// Evaluate `query` against `text`. An empty or blank query is `true`.
#[must_use]
pub fn evaluate(query: &str, text: &str) -> bool {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return true;
    }

    let haystack = text.to_lowercase();
    let mut stack: Vec<bool> = Vec::new();

    for token in to_postfix(tokens) {
        match token {
            Token::Term(term) => stack.push(haystack.contains(&term)),
            Token::Op(Op::Not) => {
                let value = stack.pop().unwrap_or(false);
                stack.push(!value);
            }
            Token::Op(op) => {
                let right = stack.pop().unwrap_or(false);
                let left = stack.pop().unwrap_or(false);
                stack.push(if op == Op::And {
                    left && right
                } else {
                    left || right
                });
            }
            Token::Open | Token::Close => {}
        }
    }

    stack.pop().unwrap_or(false)
}

/// The filter applied to every raw mention: `sanitize` then `evaluate`.
#[must_use]
pub fn matches(raw_query: &str, text: &str) -> bool {
    evaluate(&sanitize(raw_query), text)
}
