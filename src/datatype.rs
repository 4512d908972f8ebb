// used for persistence
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
// used when persisting rule bodies and metadata
use serde::{Deserialize, Serialize};

// used to print out readable forms of a data type
use std::fmt;

/// Rust types backing a literal. Stored elements are tagged with their `UID`.
pub trait DataType: Sized {
    // static stuff which needs to be implemented downstream
    const UID: u8;
    const DATA_TYPE: &'static str;
}

// ------------- Data Types --------------
impl DataType for i64 {
    const UID: u8 = 1;
    const DATA_TYPE: &'static str = "Integer";
}
impl DataType for String {
    const UID: u8 = 2;
    const DATA_TYPE: &'static str = "String";
}
impl DataType for bool {
    const UID: u8 = 3;
    const DATA_TYPE: &'static str = "Boolean";
}
impl DataType for f64 {
    const UID: u8 = 4;
    const DATA_TYPE: &'static str = "Float";
}

// ------------- Literal --------------
/// A runtime-typed value. Two literals are equal only when both their
/// type and their value agree, so `Integer(1)` never equals `Float(1.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    String(String),
    Boolean(bool),
    Float(f64),
}

impl Literal {
    pub fn identifier(&self) -> u8 {
        match self {
            Literal::Integer(_) => i64::UID,
            Literal::String(_) => String::UID,
            Literal::Boolean(_) => bool::UID,
            Literal::Float(_) => f64::UID,
        }
    }
    pub fn data_type(&self) -> &'static str {
        match self {
            Literal::Integer(_) => i64::DATA_TYPE,
            Literal::String(_) => String::DATA_TYPE,
            Literal::Boolean(_) => bool::DATA_TYPE,
            Literal::Float(_) => f64::DATA_TYPE,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
    /// Numeric view used by range constraints and comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }
    /// Rebuilds a literal from a persisted column and its data type identifier.
    pub fn convert(uid: u8, value: &ValueRef) -> Option<Literal> {
        match *value {
            ValueRef::Integer(i) if uid == i64::UID => Some(Literal::Integer(i)),
            ValueRef::Text(t) if uid == String::UID => {
                Some(Literal::String(String::from_utf8_lossy(t).into_owned()))
            }
            ValueRef::Integer(i) if uid == bool::UID => Some(Literal::Boolean(i != 0)),
            ValueRef::Real(f) if uid == f64::UID => Some(Literal::Float(f)),
            ValueRef::Integer(i) if uid == f64::UID => Some(Literal::Float(i as f64)),
            _ => None,
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}
impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Integer(value as i64)
    }
}
impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}
impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}
impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}
impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Float(x) => write!(f, "{:?}", x),
        }
    }
}

impl ToSql for Literal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Literal::Integer(i) => ToSqlOutput::from(*i),
            Literal::String(s) => ToSqlOutput::from(s.as_str()),
            Literal::Boolean(b) => ToSqlOutput::from(*b),
            Literal::Float(x) => ToSqlOutput::from(*x),
        })
    }
}

// ------------- FactValue --------------
/// The value stored for an (entity, attribute) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactValue {
    Single(Literal),
    List(Vec<Literal>),
}

impl FactValue {
    pub fn literals(&self) -> &[Literal] {
        match self {
            FactValue::Single(literal) => std::slice::from_ref(literal),
            FactValue::List(literals) => literals,
        }
    }
    pub fn is_list(&self) -> bool {
        matches!(self, FactValue::List(_))
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FactValue::Single(literal) => write!(f, "{}", literal),
            FactValue::List(literals) => {
                let items: Vec<String> = literals.iter().map(|l| l.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}
