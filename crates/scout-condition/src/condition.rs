//! Condition types and parsing
//!
//! Parsing works on the raw text, before any `${name}` reference is resolved,
//! so the shape of a condition never depends on variable contents. Operands
//! keep their raw text and are substituted at evaluation time.

use std::fmt;
use thiserror::Error;

/// Condition errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("Empty condition")]
    Empty,

    #[error("Missing operand for '{op}' in condition '{condition}'")]
    MissingOperand { op: CompareOp, condition: String },

    #[error("Cannot evaluate condition '{0}'")]
    Unparseable(String),

    #[error("Cannot order '{left}' and '{right}'")]
    Incomparable { left: String, right: String },
}

/// Result type for condition operations
pub type ConditionResult<T> = Result<T, ConditionError>;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CompareOp {
    /// Operators in detection order. Two-character operators come first so that
    /// `x >= 5` is never split on `>`.
    pub const DETECTION_ORDER: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Lt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parsed condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `true` or `false`
    Literal(bool),

    /// Binary comparison; operands are raw text, possibly with `${name}` references
    Compare {
        left: String,
        op: CompareOp,
        right: String,
    },

    /// Both sides must hold
    And(Box<Condition>, Box<Condition>),

    /// Either side must hold
    Or(Box<Condition>, Box<Condition>),

    /// Bare word or lone reference, resolved against the variable store at
    /// evaluation time
    Name(String),
}

impl Condition {
    /// Parse raw condition text
    pub fn parse(text: &str) -> ConditionResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ConditionError::Empty);
        }

        // `or` binds loosest, so split on it first
        if let Some((left, right)) = split_keyword(trimmed, "or") {
            return Ok(Condition::Or(
                Box::new(Self::parse(left)?),
                Box::new(Self::parse(right)?),
            ));
        }
        if let Some((left, right)) = split_keyword(trimmed, "and") {
            return Ok(Condition::And(
                Box::new(Self::parse(left)?),
                Box::new(Self::parse(right)?),
            ));
        }

        for op in CompareOp::DETECTION_ORDER {
            let symbol = op.symbol();
            if let Some(idx) = find_outside_quotes(trimmed, symbol) {
                let left = trimmed[..idx].trim();
                let right = trimmed[idx + symbol.len()..].trim();
                if left.is_empty() || right.is_empty() {
                    return Err(ConditionError::MissingOperand {
                        op,
                        condition: trimmed.to_string(),
                    });
                }
                return Ok(Condition::Compare {
                    left: left.to_string(),
                    op,
                    right: right.to_string(),
                });
            }
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return Ok(Condition::Literal(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Ok(Condition::Literal(false));
        }

        Ok(Condition::Name(trimmed.to_string()))
    }
}

/// Walk `text` byte by byte, skipping quoted regions, and return the first
/// index accepted by `accept`
///
/// A quote with no closing partner is an ordinary character (`Don't`).
fn scan_outside_quotes(text: &str, mut accept: impl FnMut(usize) -> bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if (b == b'\'' || b == b'"') && bytes[i + 1..].contains(&b) => {
                quote = Some(b)
            }
            None => {
                if accept(i) {
                    return Some(i);
                }
            }
        }
    }
    None
}

fn find_outside_quotes(text: &str, symbol: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let needle = symbol.as_bytes();
    scan_outside_quotes(text, |i| bytes[i..].starts_with(needle))
}

/// Split on the first whitespace-delimited, case-insensitive `keyword`
fn split_keyword<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let bytes = text.as_bytes();
    let needle = keyword.as_bytes();

    let idx = scan_outside_quotes(text, |i| {
        let end = i + needle.len();
        i > 0
            && end < bytes.len()
            && bytes[i - 1].is_ascii_whitespace()
            && bytes[end].is_ascii_whitespace()
            && bytes[i..end].eq_ignore_ascii_case(needle)
    })?;

    Some((&text[..idx], &text[idx + needle.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_longest_operator_first() {
        let cond = Condition::parse("x >= 5").unwrap();
        assert_eq!(
            cond,
            Condition::Compare {
                left: "x".to_string(),
                op: CompareOp::Ge,
                right: "5".to_string(),
            }
        );

        let cond = Condition::parse("10 <= 20").unwrap();
        assert!(matches!(
            cond,
            Condition::Compare {
                op: CompareOp::Le,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_without_spaces() {
        let cond = Condition::parse("3<4").unwrap();
        assert_eq!(
            cond,
            Condition::Compare {
                left: "3".to_string(),
                op: CompareOp::Lt,
                right: "4".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_connectives() {
        let cond = Condition::parse("a == 1 or b == 2 and c == 3").unwrap();
        match cond {
            Condition::Or(left, right) => {
                assert!(matches!(*left, Condition::Compare { .. }));
                assert!(matches!(*right, Condition::And(_, _)));
            }
            other => panic!("Expected Or, got {:?}", other),
        }

        assert!(matches!(
            Condition::parse("true AND false").unwrap(),
            Condition::And(_, _)
        ));
    }

    #[test]
    fn test_keyword_inside_word_is_not_split() {
        // "android" and "organ" contain the keywords but are not delimited
        let cond = Condition::parse("android == organ").unwrap();
        assert!(matches!(cond, Condition::Compare { .. }));
    }

    #[test]
    fn test_quoted_operands_are_opaque() {
        let cond = Condition::parse("'a > b' == 'a > b'").unwrap();
        assert_eq!(
            cond,
            Condition::Compare {
                left: "'a > b'".to_string(),
                op: CompareOp::Eq,
                right: "'a > b'".to_string(),
            }
        );
    }

    #[test]
    fn test_unmatched_quote_is_plain_text() {
        let cond = Condition::parse("Don't stop == 1").unwrap();
        assert_eq!(
            cond,
            Condition::Compare {
                left: "Don't stop".to_string(),
                op: CompareOp::Eq,
                right: "1".to_string(),
            }
        );
        assert!(matches!(
            Condition::parse("it's over and x > 2").unwrap(),
            Condition::And(_, _)
        ));
    }

    #[test]
    fn test_references_stay_unresolved() {
        let cond = Condition::parse("${loot} == 'Gold or Silver'").unwrap();
        assert_eq!(
            cond,
            Condition::Compare {
                left: "${loot}".to_string(),
                op: CompareOp::Eq,
                right: "'Gold or Silver'".to_string(),
            }
        );
        assert_eq!(
            Condition::parse("${ready}").unwrap(),
            Condition::Name("${ready}".to_string())
        );
    }

    #[test]
    fn test_parse_literals_and_names() {
        assert_eq!(Condition::parse("TRUE").unwrap(), Condition::Literal(true));
        assert_eq!(Condition::parse("false").unwrap(), Condition::Literal(false));
        assert_eq!(
            Condition::parse("ready").unwrap(),
            Condition::Name("ready".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Condition::parse("   "), Err(ConditionError::Empty));
        assert!(matches!(
            Condition::parse("== 5"),
            Err(ConditionError::MissingOperand {
                op: CompareOp::Eq,
                ..
            })
        ));
    }
}
