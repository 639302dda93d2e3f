//! Call Stream Tokens
//!
//! Every builder call that shapes the expression appends exactly one token.
//! Implicit `AND`s are recorded as explicit connective tokens, so a stream
//! always reads the way it is evaluated.

use serde::Serialize;
use std::fmt;

use crate::atom::ConditionAtom;
use crate::operators::Connective;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Atom(ConditionAtom),
    GroupOpen,
    GroupClose,
    /// Appears only between two terms of the same scope
    Connective(Connective),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Atom(atom) => write!(f, "{}", atom),
            Token::GroupOpen => write!(f, "("),
            Token::GroupClose => write!(f, ")"),
            Token::Connective(connective) => write!(f, "{}", connective),
        }
    }
}

/// Render a token stream on one line, e.g. `( a = 1 OR b = 2 ) AND c = 3`
pub fn display_stream(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
