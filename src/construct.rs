// used to keep the one-to-one mapping between keys and their assigned identities
use bimap::BiMap;

// other keepers use HashMap
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

// used for the entities carrying an attribute
use roaring::RoaringBitmap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// our own stuff that we need
use crate::datatype::{FactValue, Literal};
use crate::error::{AtomicError, Result};
use crate::persist::Persistor;
use crate::rule::Goal;
use crate::schema::{self, AttributeMetadata};
use crate::settings::Settings;
use crate::term::Term;

// ------------- Identity -------------
pub type Id = u32;

pub type IdHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

/// Interns string keys as sequential, zero-based identities.
#[derive(Debug, Default)]
pub struct IdKeeper {
    kept: BiMap<String, Id>,
}
impl IdKeeper {
    pub fn new() -> Self {
        Self { kept: BiMap::new() }
    }
    // The identity of a new key is the number of keys kept before it,
    // so identities are never reused and follow insertion order.
    pub fn keep(&mut self, key: &str) -> (Id, bool) {
        if let Some(id) = self.kept.get_by_left(key) {
            return (*id, true);
        }
        let id = self.kept.len() as Id;
        self.kept.insert(key.to_string(), id);
        (id, false)
    }
    pub fn get(&self, key: &str) -> Option<Id> {
        self.kept.get_by_left(key).copied()
    }
    pub fn lookup(&self, id: Id) -> Option<&str> {
        self.kept.get_by_right(&id).map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    /// Keys in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &str)> {
        (0..self.kept.len() as Id).filter_map(|id| self.lookup(id).map(|key| (id, key)))
    }
}

// ------------- Facts -------------
/// What happens when a fact is added for an (entity, attribute) pair that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactPolicy {
    #[default]
    Overwrite,
    Reject,
    Accumulate,
}

#[derive(Debug)]
pub struct FactKeeper {
    kept: HashMap<(Id, Id), Vec<FactValue>, IdHasher>,
    carriers: HashMap<Id, RoaringBitmap, IdHasher>,
    policy: FactPolicy,
    length: usize,
}
impl FactKeeper {
    pub fn new(policy: FactPolicy) -> Self {
        Self {
            kept: HashMap::default(),
            carriers: HashMap::default(),
            policy,
            length: 0,
        }
    }
    pub fn policy(&self) -> FactPolicy {
        self.policy
    }
    /// Keeps a value according to the policy, returning whether the pair already had one.
    pub fn keep(&mut self, entity: Id, attribute: Id, value: FactValue) -> bool {
        let previously_kept = self.kept.contains_key(&(entity, attribute));
        match (self.policy, previously_kept) {
            (FactPolicy::Reject, true) => (),
            (FactPolicy::Overwrite, true) => {
                let values = self.kept.entry((entity, attribute)).or_default();
                self.length -= values.len();
                values.clear();
                values.push(value);
                self.length += 1;
            }
            _ => self.restore(entity, attribute, value),
        }
        previously_kept
    }
    // appends regardless of policy, used when the stored state already reflects it
    pub(crate) fn restore(&mut self, entity: Id, attribute: Id, value: FactValue) {
        self.kept.entry((entity, attribute)).or_default().push(value);
        self.carriers.entry(attribute).or_default().insert(entity);
        self.length += 1;
    }
    pub fn get(&self, entity: Id, attribute: Id) -> Option<&FactValue> {
        self.kept.get(&(entity, attribute)).and_then(|values| values.last())
    }
    pub fn get_all(&self, entity: Id, attribute: Id) -> &[FactValue] {
        self.kept.get(&(entity, attribute)).map(Vec::as_slice).unwrap_or(&[])
    }
    /// The entities having at least one value for the attribute.
    pub fn carriers(&self, attribute: Id) -> Option<&RoaringBitmap> {
        self.carriers.get(&attribute)
    }
    pub fn iter(&self) -> impl Iterator<Item = (Id, Id, &FactValue)> {
        self.kept
            .iter()
            .flat_map(|(&(entity, attribute), values)| values.iter().map(move |v| (entity, attribute, v)))
    }
    pub fn len(&self) -> usize {
        self.length
    }
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

// ------------- Rules -------------
pub const LANG_TERM: i64 = 0;
pub const LANG_CLAUSE: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub lang: i64,
    pub text: String,
    pub body: Vec<Goal>,
    pub args: Vec<String>,
}
impl Rule {
    pub fn new(name: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            lang: LANG_TERM,
            text: String::new(),
            body: Vec::new(),
            args,
        }
    }
    fn apply(&mut self, patch: RulePatch) {
        if let Some(lang) = patch.lang {
            self.lang = lang;
        }
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
    }
}

/// The fields of a rule to set on upsert; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulePatch {
    pub lang: Option<i64>,
    pub text: Option<String>,
    pub body: Option<Vec<Goal>>,
}
impl RulePatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn lang(mut self, lang: i64) -> Self {
        self.lang = Some(lang);
        self
    }
    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }
    pub fn body(mut self, body: Vec<Goal>) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Default)]
pub struct RuleKeeper {
    kept: HashMap<String, Rule, OtherHasher>,
}
impl RuleKeeper {
    pub fn new() -> Self {
        Self { kept: HashMap::default() }
    }
    // An upsert: a new rule starts from the defaults, an existing one keeps
    // every field the patch leaves out. The arguments are always replaced.
    pub fn keep(&mut self, name: &str, args: Vec<String>, patch: RulePatch) -> (&Rule, bool) {
        match self.kept.entry(name.to_string()) {
            Entry::Vacant(e) => {
                let rule = e.insert(Rule::new(name, args));
                rule.apply(patch);
                (rule, false)
            }
            Entry::Occupied(e) => {
                let rule = e.into_mut();
                rule.args = args;
                rule.apply(patch);
                (rule, true)
            }
        }
    }
    pub(crate) fn restore(&mut self, rule: Rule) {
        self.kept.insert(rule.name.clone(), rule);
    }
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.kept.get(name)
    }
    pub fn rules(&self) -> &HashMap<String, Rule, OtherHasher> {
        &self.kept
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Database -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// This sets up the database with the necessary structures
#[derive(Debug)]
pub struct Database {
    // owns keepers for the available constructs
    pub(crate) entity_keeper: IdKeeper,
    pub(crate) attribute_keeper: IdKeeper,
    pub(crate) metadata: HashMap<String, AttributeMetadata, OtherHasher>,
    pub(crate) fact_keeper: FactKeeper,
    pub(crate) rule_keeper: RuleKeeper,
    // bounds rule evaluation
    pub(crate) max_depth: usize,
    // responsible for the persistence layer, absent when in memory
    pub(crate) persistor: Option<Persistor>,
}

impl Database {
    pub fn new(mode: PersistenceMode) -> Result<Database> {
        let settings = Settings { persistence: mode.into(), ..Settings::default() };
        Self::with_settings(&settings)
    }
    pub fn with_settings(settings: &Settings) -> Result<Database> {
        let mut database = Database {
            entity_keeper: IdKeeper::new(),
            attribute_keeper: IdKeeper::new(),
            metadata: HashMap::default(),
            fact_keeper: FactKeeper::new(settings.fact_policy),
            rule_keeper: RuleKeeper::new(),
            max_depth: settings.max_depth,
            persistor: None,
        };
        for (name, metadata) in schema::builtin_metadata() {
            database.metadata.insert(name.to_string(), metadata);
        }
        // Restore the existing database before writes start flowing through
        if let PersistenceMode::File(path) = settings.persistence_mode() {
            let persistor = Persistor::open(&path)?;
            persistor.restore(&mut database)?;
            database.persistor = Some(persistor);
        }
        Ok(database)
    }

    // functions to access the owned keepers
    pub fn entities(&self) -> &IdKeeper {
        &self.entity_keeper
    }
    pub fn attributes(&self) -> &IdKeeper {
        &self.attribute_keeper
    }
    pub fn attribute_metadata(&self) -> &HashMap<String, AttributeMetadata, OtherHasher> {
        &self.metadata
    }
    pub fn fact_keeper(&self) -> &FactKeeper {
        &self.fact_keeper
    }
    pub fn rules(&self) -> &HashMap<String, Rule, OtherHasher> {
        self.rule_keeper.rules()
    }
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rule_keeper.get(name)
    }
    pub fn is_persistent(&self) -> bool {
        self.persistor.is_some()
    }

    pub fn validate(&self, metadata: &AttributeMetadata, attribute: &str, value: &Literal) -> Result<()> {
        schema::validate(metadata, attribute, value)
    }
    pub fn declare_attribute(&mut self, name: &str, metadata: AttributeMetadata) {
        if let Some(persistor) = &self.persistor {
            if let Err(e) = persistor.persist_metadata(name, &metadata) {
                warn!(attribute = name, error = %e, "could not persist metadata");
            }
        }
        debug!(attribute = name, kind = %metadata.kind, "attribute declared");
        self.metadata.insert(name.to_string(), metadata);
    }

    pub fn get_or_add_entity_id(&mut self, key: &str) -> Id {
        let (id, previously_kept) = self.entity_keeper.keep(key);
        if !previously_kept {
            debug!(entity = key, id, "entity interned");
            if let Some(persistor) = &self.persistor {
                if let Err(e) = persistor.persist_entity(id, key) {
                    warn!(entity = key, error = %e, "could not persist entity");
                }
            }
        }
        id
    }
    pub fn get_or_add_attribute_id(&mut self, key: &str) -> Id {
        let (id, previously_kept) = self.attribute_keeper.keep(key);
        if !previously_kept {
            debug!(attribute = key, id, "attribute interned");
            if let Some(persistor) = &self.persistor {
                if let Err(e) = persistor.persist_attribute(id, key) {
                    warn!(attribute = key, error = %e, "could not persist attribute");
                }
            }
        }
        id
    }

    /// Validates and stores a fact. The value is given as literal terms: one
    /// for scalar attributes, any number for list attributes. On error nothing
    /// is interned or stored.
    pub fn add(&mut self, entity: &str, attribute: &str, value: &[Term]) -> Result<&mut Self> {
        let fact_value = schema::conform(self.metadata.get(attribute), attribute, value)?;
        if self.fact_keeper.policy() == FactPolicy::Reject && self.get_value(entity, attribute).is_some() {
            return Err(AtomicError::DuplicateFact {
                entity: entity.to_string(),
                attribute: attribute.to_string(),
            });
        }
        let entity_id = self.get_or_add_entity_id(entity);
        let attribute_id = self.get_or_add_attribute_id(attribute);
        debug!(entity, attribute, value = %fact_value, "fact added");
        let previously_kept = self.fact_keeper.keep(entity_id, attribute_id, fact_value.clone());
        if let Some(persistor) = &self.persistor {
            let replace = previously_kept && self.fact_keeper.policy() == FactPolicy::Overwrite;
            if let Err(e) = persistor.persist_fact(entity_id, attribute_id, &fact_value, replace) {
                warn!(entity, attribute, error = %e, "could not persist fact");
            }
        }
        Ok(self)
    }
    pub fn get_value(&self, entity: &str, attribute: &str) -> Option<&FactValue> {
        let entity_id = self.entity_keeper.get(entity)?;
        let attribute_id = self.attribute_keeper.get(attribute)?;
        self.fact_keeper.get(entity_id, attribute_id)
    }
    pub fn get_values(&self, entity: &str, attribute: &str) -> &[FactValue] {
        match (self.entity_keeper.get(entity), self.attribute_keeper.get(attribute)) {
            (Some(entity_id), Some(attribute_id)) => self.fact_keeper.get_all(entity_id, attribute_id),
            _ => &[],
        }
    }
    /// All stored facts as (entity, attribute, value).
    pub fn facts(&self) -> impl Iterator<Item = (&str, &str, &FactValue)> {
        self.fact_keeper.iter().filter_map(|(entity, attribute, value)| {
            Some((
                self.entity_keeper.lookup(entity)?,
                self.attribute_keeper.lookup(attribute)?,
                value,
            ))
        })
    }

    pub fn add_rule<I, S>(&mut self, name: &str, args: I, new_rule: RulePatch)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        let (rule, previously_kept) = self.rule_keeper.keep(name, args, new_rule);
        debug!(rule = name, lang = rule.lang, args = ?rule.args, previously_kept, "rule kept");
        if let Some(persistor) = &self.persistor {
            if let Err(e) = persistor.persist_rule(rule) {
                warn!(rule = name, error = %e, "could not persist rule");
            }
        }
    }
}

impl From<PersistenceMode> for String {
    fn from(mode: PersistenceMode) -> String {
        match mode {
            PersistenceMode::InMemory => crate::settings::IN_MEMORY.to_string(),
            PersistenceMode::File(path) => path,
        }
    }
}
