//! Backward chaining over rules and stored facts.
//!
//! Goals are solved depth first, left to right, the way SLD resolution does
//! it. A goal is, in order of precedence:
//! * a call to a registered rule, whose variables are renamed apart before
//!   its arguments are unified with the caller's;
//! * one of the comparison built-ins `eq`, `neq`, `lt`, `le`, `gt`, `ge`;
//! * otherwise a fact pattern `attribute(Entity, Value)`, matched against
//!   every stored value of that attribute.
//!
//! Each branch works on its own copy of the bindings, so backtracking is a
//! matter of dropping the copy.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::construct::{Database, OtherHasher};
use crate::datatype::Literal;
use crate::error::{AtomicError, Result};
use crate::rule::{self, Goal};
use crate::term::{Bindings, Resolved, Term, unify};

const BUILTINS: [&str; 6] = ["eq", "neq", "lt", "le", "gt", "ge"];
const RENAMING_SEPARATOR: char = '#';

struct Solver<'db> {
    database: &'db Database,
    compiled: HashMap<String, Rc<Vec<Goal>>, OtherHasher>,
    renamings: usize,
    pruned: usize,
}

impl<'db> Solver<'db> {
    fn new(database: &'db Database) -> Self {
        Self {
            database,
            compiled: HashMap::default(),
            renamings: 0,
            pruned: 0,
        }
    }

    fn body(&mut self, name: &str) -> Result<Rc<Vec<Goal>>> {
        if let Some(body) = self.compiled.get(name) {
            return Ok(Rc::clone(body));
        }
        let rule = self
            .database
            .rule(name)
            .ok_or_else(|| AtomicError::UnknownRule(name.to_string()))?;
        let body = Rc::new(rule::compile(rule)?);
        debug!(rule = name, goals = body.len(), "rule compiled");
        self.compiled.insert(name.to_string(), Rc::clone(&body));
        Ok(body)
    }

    fn solve(&mut self, goals: &[Goal], env: &Bindings, depth: usize, answers: &mut Vec<Bindings>) -> Result<()> {
        let Some((goal, rest)) = goals.split_first() else {
            answers.push(env.clone());
            return Ok(());
        };
        trace!(%goal, depth, "solving");
        let database = self.database;
        if let Some(rule) = database.rule(&goal.name) {
            if depth >= database.max_depth {
                self.pruned += 1;
                return Ok(());
            }
            if rule.args.len() != goal.args.len() {
                return Err(AtomicError::Evaluation(format!(
                    "rule '{}' takes {} arguments, {} given",
                    rule.name,
                    rule.args.len(),
                    goal.args.len()
                )));
            }
            let body = self.body(&goal.name)?;
            self.renamings += 1;
            let suffix = format!("{}{}", RENAMING_SEPARATOR, self.renamings);
            let mut callee = env.clone();
            for (param, arg) in rule.args.iter().zip(goal.args.iter()) {
                if !unify(&Term::var(format!("{}{}", param, suffix)), arg, &mut callee) {
                    return Ok(());
                }
            }
            let mut next: Vec<Goal> = body.iter().map(|g| g.renamed(&suffix)).collect();
            next.extend_from_slice(rest);
            return self.solve(&next, &callee, depth + 1, answers);
        }
        if BUILTINS.contains(&goal.name.as_str()) {
            let mut next = env.clone();
            if builtin(goal, &mut next)? {
                self.solve(rest, &next, depth, answers)?;
            }
            return Ok(());
        }
        self.match_facts(goal, rest, env, depth, answers)
    }

    fn match_facts(
        &mut self,
        goal: &Goal,
        rest: &[Goal],
        env: &Bindings,
        depth: usize,
        answers: &mut Vec<Bindings>,
    ) -> Result<()> {
        let [entity, value] = goal.args.as_slice() else {
            return Err(AtomicError::Evaluation(format!(
                "'{}' is neither a rule nor a built-in, and a fact pattern takes 2 arguments",
                goal.name
            )));
        };
        let database = self.database;
        let Some(attribute_id) = database.attribute_keeper.get(&goal.name) else {
            return Ok(());
        };
        let Some(carriers) = database.fact_keeper.carriers(attribute_id) else {
            return Ok(());
        };
        // a known entity narrows the search to one candidate
        let candidates: Vec<u32> = match env.resolve(entity) {
            Resolved::Literal(Literal::String(key)) => match database.entity_keeper.get(&key) {
                Some(id) if carriers.contains(id) => vec![id],
                _ => return Ok(()),
            },
            Resolved::Literal(_) | Resolved::List(_) => return Ok(()),
            Resolved::Unbound(_) => carriers.iter().collect(),
        };
        for entity_id in candidates {
            let Some(key) = database.entity_keeper.lookup(entity_id) else {
                continue;
            };
            let entity_term = Term::lit(key);
            for stored in database.fact_keeper.get_all(entity_id, attribute_id) {
                let mut next = env.clone();
                if unify(entity, &entity_term, &mut next) && unify(value, &Term::from(stored), &mut next) {
                    self.solve(rest, &next, depth, answers)?;
                }
            }
        }
        Ok(())
    }
}

fn builtin(goal: &Goal, env: &mut Bindings) -> Result<bool> {
    let [a, b] = goal.args.as_slice() else {
        return Err(AtomicError::Evaluation(format!("built-in '{}' takes 2 arguments", goal.name)));
    };
    match goal.name.as_str() {
        "eq" => return Ok(unify(a, b, env)),
        "neq" => return Ok(!unify(a, b, &mut env.clone())),
        _ => (),
    }
    let (Resolved::Literal(x), Resolved::Literal(y)) = (env.resolve(a), env.resolve(b)) else {
        return Err(AtomicError::Evaluation(format!(
            "'{}' needs both arguments bound to literals",
            goal.name
        )));
    };
    let Some(ordering) = compare(&x, &y) else {
        return Ok(false);
    };
    Ok(match goal.name.as_str() {
        "lt" => ordering == Ordering::Less,
        "le" => ordering != Ordering::Greater,
        "gt" => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

// integers compare exactly, mixed numbers as floats, strings lexically
fn compare(x: &Literal, y: &Literal) -> Option<Ordering> {
    match (x, y) {
        (Literal::Integer(a), Literal::Integer(b)) => Some(a.cmp(b)),
        (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
        (Literal::Boolean(a), Literal::Boolean(b)) => Some(a.cmp(b)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

impl Database {
    /// Evaluates a rule for the given arguments. Every answer binds the
    /// variables appearing in `args`; an empty result means the rule does not hold.
    pub fn query(&self, rule: &str, args: &[Term]) -> Result<Vec<Bindings>> {
        if self.rule(rule).is_none() {
            return Err(AtomicError::UnknownRule(rule.to_string()));
        }
        let mut names: Vec<&str> = Vec::new();
        for arg in args {
            for name in arg.variables() {
                // the solver renames rule variables apart with this separator
                if name.contains(RENAMING_SEPARATOR) {
                    return Err(AtomicError::Evaluation(format!(
                        "variable '{}' may not contain '{}'",
                        name, RENAMING_SEPARATOR
                    )));
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        let mut solver = Solver::new(self);
        let mut answers = Vec::new();
        solver.solve(&[Goal::new(rule, args.to_vec())], &Bindings::new(), 0, &mut answers)?;
        if solver.pruned > 0 {
            debug!(rule, pruned = solver.pruned, max_depth = self.max_depth, "branches cut at the depth limit");
        }
        debug!(rule, answers = answers.len(), "query evaluated");
        Ok(answers.iter().map(|answer| answer.project(&names)).collect())
    }

    pub fn holds(&self, rule: &str, args: &[Term]) -> Result<bool> {
        Ok(!self.query(rule, args)?.is_empty())
    }

    /// Compiles a rule's body without evaluating it, surfacing parse errors.
    pub fn compile_rule(&self, name: &str) -> Result<Vec<Goal>> {
        let rule = self.rule(name).ok_or_else(|| AtomicError::UnknownRule(name.to_string()))?;
        rule::compile(rule)
    }
}
