use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtomicError {
    #[error("Type mismatch for '{attribute}': expected {expected}, found {found}")]
    TypeMismatch { attribute: String, expected: String, found: String },
    #[error("Constraint violation for '{attribute}': {message}")]
    ConstraintViolation { attribute: String, message: String },
    #[error("Fact already present for ({entity}, {attribute})")]
    DuplicateFact { entity: String, attribute: String },
    #[error("Unknown rule: {0}")]
    UnknownRule(String),
    #[error("Rule '{rule}' uses unsupported language {lang}")]
    UnsupportedLanguage { rule: String, lang: i64 },
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Load error: {0}")]
    Load(String),
}

pub type Result<T> = std::result::Result<T, AtomicError>;

// Helper conversions
impl From<rusqlite::Error> for AtomicError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for AtomicError {
    fn from(e: serde_json::Error) -> Self { Self::Load(e.to_string()) }
}
impl From<config::ConfigError> for AtomicError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for AtomicError {
    fn from(e: std::io::Error) -> Self { Self::Load(e.to_string()) }
}

impl AtomicError {
    pub(crate) fn type_mismatch(attribute: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            attribute: attribute.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
    pub(crate) fn constraint(attribute: &str, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }
}
