//! Loading a database from a JSON document.
//!
//! ```json
//! {
//!   "entities": ["cool@gmail.com"],
//!   "attributes": ["name", "age"],
//!   "attribute_metadata": { "age": { "type": 0, "min": 18 } },
//!   "facts": [["cool@gmail.com", "name", "Joe Cool"], ["cool@gmail.com", "age", 44]],
//!   "rules": { "adult": { "lang": 1, "text": "age(P, A), ge(A, 18)", "args": ["P"] } }
//! }
//! ```
//!
//! Entities and attributes are interned in document order before any fact
//! is added, so their identities follow the document.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::construct::{Database, LANG_TERM, RulePatch};
use crate::datatype::Literal;
use crate::error::{AtomicError, Result};
use crate::rule::Goal;
use crate::schema::AttributeMetadata;
use crate::term::Term;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    pub entities: Vec<String>,
    pub attributes: Vec<String>,
    pub attribute_metadata: BTreeMap<String, AttributeMetadata>,
    pub facts: Vec<(String, String, Value)>,
    pub rules: BTreeMap<String, DocumentRule>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRule {
    #[serde(default = "default_lang")]
    pub lang: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub body: Option<Vec<Goal>>,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_lang() -> i64 {
    LANG_TERM
}

pub fn load_from_str(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let json = std::fs::read_to_string(path)?;
    load_from_str(&json)
}

/// A fact value in a document: a scalar for single values, an array for lists.
pub fn value_terms(value: &Value) -> Result<Vec<Term>> {
    match value {
        Value::Array(items) => items.iter().map(|item| literal(item).map(Term::Literal)).collect(),
        scalar => Ok(vec![Term::Literal(literal(scalar)?)]),
    }
}

fn literal(value: &Value) -> Result<Literal> {
    match value {
        Value::Bool(b) => Ok(Literal::Boolean(*b)),
        Value::String(s) => Ok(Literal::String(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Literal::Integer(i)),
            None => n
                .as_f64()
                .map(Literal::Float)
                .ok_or_else(|| AtomicError::Load(format!("number {} is out of range", n))),
        },
        other => Err(AtomicError::Load(format!("{} is not a literal value", other))),
    }
}

impl Database {
    /// Populates the database from a document. Stops at the first fact that
    /// fails validation; whatever was loaded before it stays.
    pub fn load(&mut self, document: &Document) -> Result<&mut Self> {
        for (name, metadata) in &document.attribute_metadata {
            self.declare_attribute(name, metadata.clone());
        }
        for entity in &document.entities {
            self.get_or_add_entity_id(entity);
        }
        for attribute in &document.attributes {
            self.get_or_add_attribute_id(attribute);
        }
        for (entity, attribute, value) in &document.facts {
            self.add(entity, attribute, &value_terms(value)?)?;
        }
        for (name, rule) in &document.rules {
            let mut patch = RulePatch::new().lang(rule.lang).text(rule.text.clone());
            if let Some(body) = &rule.body {
                patch = patch.body(body.clone());
            }
            self.add_rule(name, rule.args.clone(), patch);
        }
        info!(
            entities = self.entities().len(),
            attributes = self.attributes().len(),
            facts = self.fact_keeper().len(),
            rules = self.rules().len(),
            "document loaded"
        );
        Ok(self)
    }
}
