// used to read and write metadata records
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::datatype::{FactValue, Literal};
use crate::error::{AtomicError, Result};
use crate::term::Term;

// ------------- Type kinds -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Integer,
    String,
    Boolean,
    Float,
    /// A reference to another entity, given by its string key.
    Entity,
}

impl ElementKind {
    pub fn accepts(&self, literal: &Literal) -> bool {
        matches!(
            (self, literal),
            (ElementKind::Integer, Literal::Integer(_))
                | (ElementKind::String, Literal::String(_))
                | (ElementKind::Boolean, Literal::Boolean(_))
                | (ElementKind::Float, Literal::Float(_))
                | (ElementKind::Entity, Literal::String(_))
        )
    }
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Integer => "Integer",
            ElementKind::String => "String",
            ElementKind::Boolean => "Boolean",
            ElementKind::Float => "Float",
            ElementKind::Entity => "Entity",
        }
    }
}

/// The declared type of an attribute. Stored documents refer to kinds by
/// their numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TypeKind {
    Integer,
    String,
    Boolean,
    Float,
    Entity,
    List(ElementKind),
}

impl TypeKind {
    pub fn element(&self) -> ElementKind {
        match self {
            TypeKind::Integer => ElementKind::Integer,
            TypeKind::String => ElementKind::String,
            TypeKind::Boolean => ElementKind::Boolean,
            TypeKind::Float => ElementKind::Float,
            TypeKind::Entity => ElementKind::Entity,
            TypeKind::List(element) => *element,
        }
    }
    pub fn is_list(&self) -> bool {
        matches!(self, TypeKind::List(_))
    }
}

impl TryFrom<u8> for TypeKind {
    type Error = String;
    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Ok(match code {
            0 => TypeKind::Integer,
            1 => TypeKind::String,
            2 => TypeKind::Boolean,
            3 => TypeKind::Float,
            4 => TypeKind::Entity,
            5 => TypeKind::List(ElementKind::Integer),
            6 => TypeKind::List(ElementKind::String),
            7 => TypeKind::List(ElementKind::Boolean),
            8 => TypeKind::List(ElementKind::Float),
            9 => TypeKind::List(ElementKind::Entity),
            other => return Err(format!("unknown type code {}", other)),
        })
    }
}

impl From<TypeKind> for u8 {
    fn from(kind: TypeKind) -> u8 {
        match kind {
            TypeKind::Integer => 0,
            TypeKind::String => 1,
            TypeKind::Boolean => 2,
            TypeKind::Float => 3,
            TypeKind::Entity => 4,
            TypeKind::List(ElementKind::Integer) => 5,
            TypeKind::List(ElementKind::String) => 6,
            TypeKind::List(ElementKind::Boolean) => 7,
            TypeKind::List(ElementKind::Float) => 8,
            TypeKind::List(ElementKind::Entity) => 9,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeKind::List(element) => write!(f, "List<{}>", element.name()),
            scalar => write!(f, "{}", scalar.element().name()),
        }
    }
}

// ------------- Constraints -------------
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Constraint {
    #[default]
    None,
    /// Inclusive numeric bounds.
    Range { min: Option<f64>, max: Option<f64> },
    AllowedStrings(BTreeSet<String>),
}

// ------------- Metadata -------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMetadata", into = "RawMetadata")]
pub struct AttributeMetadata {
    pub kind: TypeKind,
    pub constraint: Constraint,
}

impl AttributeMetadata {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, constraint: Constraint::None }
    }
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.constraint = Constraint::Range { min, max };
        self
    }
    pub fn with_allowed_strings<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint = Constraint::AllowedStrings(allowed.into_iter().map(Into::into).collect());
        self
    }
}

// the stored shape: { "type": 0, "min": 18 } or { "type": 1, "allowed_strings": [...] }
#[derive(Serialize, Deserialize)]
struct RawMetadata {
    #[serde(rename = "type")]
    kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed_strings: Option<Vec<String>>,
}

impl TryFrom<RawMetadata> for AttributeMetadata {
    type Error = String;
    fn try_from(raw: RawMetadata) -> std::result::Result<Self, Self::Error> {
        let constraint = match (raw.min, raw.max, raw.allowed_strings) {
            (None, None, None) => Constraint::None,
            (None, None, Some(allowed)) => Constraint::AllowedStrings(allowed.into_iter().collect()),
            (min, max, None) => Constraint::Range { min, max },
            _ => return Err("a range and allowed strings cannot be combined".to_string()),
        };
        let element = raw.kind.element();
        match &constraint {
            Constraint::Range { .. } if !matches!(element, ElementKind::Integer | ElementKind::Float) => {
                return Err(format!("a range does not apply to {}", raw.kind));
            }
            Constraint::AllowedStrings(_) if element != ElementKind::String => {
                return Err(format!("allowed strings do not apply to {}", raw.kind));
            }
            _ => (),
        }
        Ok(Self { kind: raw.kind, constraint })
    }
}

impl From<AttributeMetadata> for RawMetadata {
    fn from(metadata: AttributeMetadata) -> Self {
        let (min, max, allowed_strings) = match metadata.constraint {
            Constraint::None => (None, None, None),
            Constraint::Range { min, max } => (min, max, None),
            Constraint::AllowedStrings(allowed) => (None, None, Some(allowed.into_iter().collect())),
        };
        Self { kind: metadata.kind, min, max, allowed_strings }
    }
}

/// Attributes every database knows about from the start.
pub fn builtin_metadata() -> Vec<(&'static str, AttributeMetadata)> {
    vec![
        ("name", AttributeMetadata::new(TypeKind::String)),
        ("age", AttributeMetadata::new(TypeKind::Integer).with_range(Some(18.), None)),
        ("father", AttributeMetadata::new(TypeKind::Entity)),
        ("listy", AttributeMetadata::new(TypeKind::List(ElementKind::Integer))),
    ]
}

// ------------- Validation -------------
/// Checks one literal against an attribute's metadata. For list attributes
/// the literal is checked as an element of the list.
///
/// The type check runs first, so a value of the wrong type is always a
/// `TypeMismatch`, even when it would also break a constraint.
pub fn validate(metadata: &AttributeMetadata, attribute: &str, value: &Literal) -> Result<()> {
    let element = metadata.kind.element();
    if !element.accepts(value) {
        return Err(AtomicError::type_mismatch(attribute, element.name(), value.data_type()));
    }
    match &metadata.constraint {
        Constraint::None => Ok(()),
        Constraint::Range { min, max } => {
            let Some(number) = value.as_f64() else {
                return Ok(());
            };
            if let Some(min) = min {
                if number < *min {
                    return Err(AtomicError::constraint(
                        attribute,
                        format!("{} is below the minimum {}", value, min),
                    ));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    return Err(AtomicError::constraint(
                        attribute,
                        format!("{} is above the maximum {}", value, max),
                    ));
                }
            }
            Ok(())
        }
        Constraint::AllowedStrings(allowed) => match value.as_str() {
            Some(s) if !allowed.contains(s) => Err(AtomicError::constraint(
                attribute,
                format!("{} is not one of the allowed strings", value),
            )),
            _ => Ok(()),
        },
    }
}

/// Turns the terms given to `add` into a storable value, validating every
/// element. Nothing is mutated, so a failure leaves no trace.
pub fn conform(metadata: Option<&AttributeMetadata>, attribute: &str, terms: &[Term]) -> Result<FactValue> {
    let mut literals = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Term::Literal(literal) => literals.push(literal.clone()),
            other => return Err(AtomicError::type_mismatch(attribute, "literal term", other.kind())),
        }
    }
    let Some(metadata) = metadata else {
        // undeclared attributes are schema free
        return Ok(match literals.len() {
            1 => FactValue::Single(literals.remove(0)),
            _ => FactValue::List(literals),
        });
    };
    if !metadata.kind.is_list() && literals.len() != 1 {
        return Err(AtomicError::type_mismatch(
            attribute,
            format!("a single {}", metadata.kind),
            format!("{} literals", literals.len()),
        ));
    }
    for literal in &literals {
        validate(metadata, attribute, literal)?;
    }
    Ok(if metadata.kind.is_list() {
        FactValue::List(literals)
    } else {
        FactValue::Single(literals.remove(0))
    })
}
