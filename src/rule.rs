//! Rule bodies.
//!
//! A compiled body is a conjunction of [`Goal`]s, each a name applied to
//! argument terms. A rule's `lang` decides where its body comes from:
//! [`LANG_TERM`](crate::construct::LANG_TERM) rules carry goals directly in
//! `body`, while [`LANG_CLAUSE`](crate::construct::LANG_CLAUSE) rules are
//! compiled from `text` written in the grammar of `rule.pest`:
//!
//! ```text
//! grandfather(C, G) :- father(C, F), father(F, G)
//! ```
//!
//! is registered as a rule named `grandfather` with args `["C", "G"]` and
//! text `father(C, F), father(F, G)`.

use pest::Parser;
use pest::iterators::Pair;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::construct::{LANG_CLAUSE, LANG_TERM, Rule};
use crate::datatype::Literal;
use crate::error::{AtomicError, Result};
use crate::term::Term;

mod grammar {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "rule.pest"]
    pub struct ClauseParser;
}

// the grammar's own Rule enum would clash with the registry's Rule
use grammar::{ClauseParser, Rule as Syntax};

// ------------- Goal -------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub args: Vec<Term>,
}

impl Goal {
    pub fn new<S: Into<String>>(name: S, args: Vec<Term>) -> Self {
        Self { name: name.into(), args }
    }
    /// Renames every variable apart by appending `suffix`.
    pub(crate) fn renamed(&self, suffix: &str) -> Goal {
        Goal {
            name: self.name.clone(),
            args: self.args.iter().map(|arg| rename(arg, suffix)).collect(),
        }
    }
}

pub(crate) fn rename(term: &Term, suffix: &str) -> Term {
    match term {
        Term::Variable(name) => Term::Variable(format!("{}{}", name, suffix)),
        Term::List(items) => Term::List(items.iter().map(|t| rename(t, suffix)).collect()),
        Term::Literal(_) => term.clone(),
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|t| t.to_string()).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

// ------------- Compilation -------------
/// The goals a rule evaluates, compiling clause text when needed.
pub fn compile(rule: &Rule) -> Result<Vec<Goal>> {
    match rule.lang {
        LANG_TERM => Ok(rule.body.clone()),
        LANG_CLAUSE if !rule.body.is_empty() => Ok(rule.body.clone()),
        LANG_CLAUSE => parse_body(&rule.text),
        lang => Err(AtomicError::UnsupportedLanguage { rule: rule.name.clone(), lang }),
    }
}

pub fn parse_body(text: &str) -> Result<Vec<Goal>> {
    let mut pairs = ClauseParser::parse(Syntax::body, text).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        AtomicError::Parse { message: e.to_string(), line: Some(line), col: Some(col) }
    })?;
    let mut anonymous = 0;
    let mut goals = Vec::new();
    if let Some(body) = pairs.next() {
        for pair in body.into_inner() {
            if pair.as_rule() == Syntax::goal {
                goals.push(parse_goal(pair, &mut anonymous)?);
            }
        }
    }
    Ok(goals)
}

fn parse_goal(pair: Pair<Syntax>, anonymous: &mut usize) -> Result<Goal> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| parse_error("goal without a name"))?;
    let args = inner.map(|p| parse_term(p, anonymous)).collect::<Result<Vec<_>>>()?;
    Ok(Goal { name, args })
}

fn parse_term(pair: Pair<Syntax>, anonymous: &mut usize) -> Result<Term> {
    let text = pair.as_str();
    Ok(match pair.as_rule() {
        Syntax::integer => Term::lit(text.parse::<i64>().map_err(|e| parse_error(e.to_string()))?),
        Syntax::float => Term::lit(text.parse::<f64>().map_err(|e| parse_error(e.to_string()))?),
        Syntax::boolean => Term::lit(text == "true"),
        Syntax::string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Term::Literal(Literal::String(unescape(inner)))
        }
        Syntax::variable => Term::var(text),
        Syntax::anonymous => {
            // every _ is a distinct variable no clause text can spell
            *anonymous += 1;
            Term::var(format!("_#{}", anonymous))
        }
        Syntax::list => Term::List(
            pair.into_inner()
                .map(|p| parse_term(p, anonymous))
                .collect::<Result<Vec<_>>>()?,
        ),
        other => return Err(parse_error(format!("unexpected {:?}", other))),
    })
}

fn unescape(s: &str) -> String {
    let mut unescaped = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => unescaped.push('\n'),
                Some('t') => unescaped.push('\t'),
                Some(other) => unescaped.push(other),
                None => unescaped.push('\\'),
            }
        } else {
            unescaped.push(c);
        }
    }
    unescaped
}

fn parse_error(message: impl Into<String>) -> AtomicError {
    AtomicError::Parse { message: message.into(), line: None, col: None }
}
