//! Atomicdb – a small entity-attribute-value store with a logic layer on top.
//!
//! Facts are `(entity, attribute, value)` triples:
//! * An entity or attribute is named by a string key and interned as a
//!   sequential [`construct::Id`], assigned the first time the key is seen.
//! * An attribute may carry [`schema::AttributeMetadata`], a type kind plus
//!   an optional range or allowed-strings constraint. Every value is
//!   validated against it before anything is stored.
//! * A value is a single [`datatype::Literal`] or, for list attributes, an
//!   ordered list of literals.
//!
//! On top of the store sits a Prolog-like layer:
//! * [`term::Term`]s are literals, variables or lists, and [`term::unify`]
//!   matches two terms under a caller-owned [`term::Bindings`] environment.
//! * Rules are named records with a language tag, source text, a compiled
//!   body of goals and formal arguments. [`construct::Database::add_rule`]
//!   upserts them field by field, and [`construct::Database::query`] solves
//!   them against stored facts by backward chaining.
//!
//! ## Modules
//! * [`construct`] – Keepers for identities, facts and rules, and the [`construct::Database`] facade.
//! * [`datatype`] – Literal values and the [`datatype::DataType`] trait.
//! * [`schema`] – Attribute metadata and validation.
//! * [`term`] – Terms, bindings and unification.
//! * [`rule`] – Rule bodies and the clause language (grammar in `rule.pest`).
//! * [`solve`] – Backward-chaining evaluation.
//! * [`persist`] – SQLite persistence & restoration layer.
//! * [`load`] – JSON document loading.
//! * [`settings`] – Layered configuration.
//!
//! ## Quick Start
//! ```
//! use atomicdb::construct::{Database, PersistenceMode, RulePatch, LANG_CLAUSE};
//! use atomicdb::term::Term;
//! let mut db = Database::new(PersistenceMode::InMemory).unwrap();
//! db.add("joe", "age", &[Term::lit(44)]).unwrap()
//!   .add("ann", "age", &[Term::lit(19)]).unwrap();
//! db.add_rule("older", ["P"], RulePatch::new().lang(LANG_CLAUSE).text("age(P, A), gt(A, 40)"));
//! let answers = db.query("older", &[Term::var("Who")]).unwrap();
//! assert_eq!(answers.len(), 1);
//! ```

pub mod construct;
pub mod datatype;
pub mod error;
pub mod load;
pub mod persist;
pub mod rule;
pub mod schema;
pub mod settings;
pub mod solve;
pub mod term;

pub use construct::{Database, PersistenceMode, RulePatch};
pub use error::{AtomicError, Result};
pub use schema::validate;
pub use term::{Bindings, Term, unify};
