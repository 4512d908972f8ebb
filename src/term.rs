//! Terms and unification.
//!
//! A [`Term`] is either a literal value, a named logic variable, or an ordered
//! list of terms. [`unify`] finds the bindings that make two terms equal and
//! records them in a caller-owned [`Bindings`] environment, so that a sequence
//! of unification steps can build up one consistent solution:
//!
//! ```
//! use atomicdb::term::{unify, Bindings, Term};
//! use atomicdb::datatype::Literal;
//! let mut env = Bindings::new();
//! assert!(unify(&Term::var("X"), &Term::lit(1), &mut env));
//! assert!(unify(&Term::var("Y"), &Term::var("X"), &mut env));
//! assert_eq!(env.value_of("Y"), Some(Literal::Integer(1)));
//! ```
//!
//! There is no general occurs check. Variables are only ever bound at the
//! root of their chain, which keeps variable chains acyclic, and a variable
//! is refused a binding to a list that mentions the variable itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::construct::OtherHasher;
use crate::datatype::{FactValue, Literal};

// ------------- Term -------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Literal(Literal),
    Variable(String),
    List(Vec<Term>),
}

impl Term {
    pub fn lit<L: Into<Literal>>(value: L) -> Self {
        Term::Literal(value.into())
    }
    pub fn var<S: Into<String>>(name: S) -> Self {
        Term::Variable(name.into())
    }
    pub fn list<I: IntoIterator<Item = Term>>(items: I) -> Self {
        Term::List(items.into_iter().collect())
    }
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Literal(_) => "literal",
            Term::Variable(_) => "variable",
            Term::List(_) => "list",
        }
    }
    /// Names of all variables in the term, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }
    fn collect_variables<'t>(&'t self, names: &mut Vec<&'t str>) {
        match self {
            Term::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Term::List(items) => {
                for item in items {
                    item.collect_variables(names);
                }
            }
            Term::Literal(_) => (),
        }
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl From<&FactValue> for Term {
    fn from(value: &FactValue) -> Self {
        match value {
            FactValue::Single(literal) => Term::Literal(literal.clone()),
            FactValue::List(literals) => {
                Term::List(literals.iter().cloned().map(Term::Literal).collect())
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Literal(literal) => write!(f, "{}", literal),
            Term::Variable(name) => write!(f, "{}", name),
            Term::List(items) => {
                let items: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

// ------------- Bindings -------------
/// What a bound variable points at.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Literal(Literal),
    Variable(String),
    List(Vec<Term>),
}

/// A term after following variable chains through an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Literal(Literal),
    Unbound(String),
    List(Vec<Term>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    bound: HashMap<String, Target, OtherHasher>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.bound.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.contains_key(name)
    }
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.bound.get(name)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Target)> {
        self.bound.iter()
    }
    /// Follows a variable chain until it ends in a non-variable or an unbound variable.
    pub fn resolve(&self, term: &Term) -> Resolved {
        let mut name = match term {
            Term::Literal(literal) => return Resolved::Literal(literal.clone()),
            Term::List(items) => return Resolved::List(items.clone()),
            Term::Variable(name) => name,
        };
        loop {
            match self.bound.get(name) {
                None => return Resolved::Unbound(name.clone()),
                Some(Target::Literal(literal)) => return Resolved::Literal(literal.clone()),
                Some(Target::List(items)) => return Resolved::List(items.clone()),
                Some(Target::Variable(next)) => name = next,
            }
        }
    }
    /// The literal a variable resolves to, if it resolves to one.
    pub fn value_of(&self, name: &str) -> Option<Literal> {
        match self.resolve(&Term::var(name)) {
            Resolved::Literal(literal) => Some(literal),
            _ => None,
        }
    }
    /// Applies the bindings throughout a term.
    pub fn substitute(&self, term: &Term) -> Term {
        match self.resolve(term) {
            Resolved::Literal(literal) => Term::Literal(literal),
            Resolved::Unbound(name) => Term::Variable(name),
            Resolved::List(items) => Term::List(items.iter().map(|t| self.substitute(t)).collect()),
        }
    }
    /// Restricts the environment to the named variables, fully resolved.
    /// Variables that resolve to something outside of `names` are left unbound.
    pub fn project(&self, names: &[&str]) -> Bindings {
        let mut projected = Bindings::new();
        for name in names {
            match self.substitute(&Term::var(*name)) {
                Term::Literal(literal) => {
                    projected.bound.insert(name.to_string(), Target::Literal(literal));
                }
                Term::List(items) => {
                    projected.bound.insert(name.to_string(), Target::List(items));
                }
                Term::Variable(root) => {
                    if root != *name && names.contains(&root.as_str()) {
                        projected.bound.insert(name.to_string(), Target::Variable(root));
                    }
                }
            }
        }
        projected
    }
    fn bind(&mut self, name: String, target: Target, trail: &mut Vec<String>) {
        trail.push(name.clone());
        self.bound.insert(name, target);
    }
    fn occurs(&self, name: &str, items: &[Term]) -> bool {
        items.iter().any(|item| match self.resolve(item) {
            Resolved::Unbound(other) => other == name,
            Resolved::List(inner) => self.occurs(name, &inner),
            Resolved::Literal(_) => false,
        })
    }
}

// ------------- Unification -------------
/// Unifies two terms, extending `env` on success.
///
/// On failure `env` is left exactly as it was before the call, while bindings
/// made by earlier successful calls are kept.
pub fn unify(a: &Term, b: &Term, env: &mut Bindings) -> bool {
    let mut trail = Vec::new();
    let unified = unify_trailed(a, b, env, &mut trail);
    if !unified {
        for name in trail {
            env.bound.remove(&name);
        }
    }
    unified
}

/// Consuming form of [`unify`]: returns the augmented environment, or `None`.
pub fn unify_with(a: &Term, b: &Term, mut env: Bindings) -> Option<Bindings> {
    if unify(a, b, &mut env) { Some(env) } else { None }
}

fn unify_trailed(a: &Term, b: &Term, env: &mut Bindings, trail: &mut Vec<String>) -> bool {
    match (env.resolve(a), env.resolve(b)) {
        (Resolved::Literal(x), Resolved::Literal(y)) => x == y,
        (Resolved::Unbound(x), Resolved::Unbound(y)) => {
            if x != y {
                env.bind(x, Target::Variable(y), trail);
            }
            true
        }
        (Resolved::Unbound(x), Resolved::Literal(y)) | (Resolved::Literal(y), Resolved::Unbound(x)) => {
            env.bind(x, Target::Literal(y), trail);
            true
        }
        (Resolved::Unbound(x), Resolved::List(items)) | (Resolved::List(items), Resolved::Unbound(x)) => {
            if env.occurs(&x, &items) {
                return false;
            }
            env.bind(x, Target::List(items), trail);
            true
        }
        (Resolved::List(xs), Resolved::List(ys)) => {
            xs.len() == ys.len()
                && xs.iter().zip(ys.iter()).all(|(x, y)| unify_trailed(x, y, env, trail))
        }
        _ => false,
    }
}
