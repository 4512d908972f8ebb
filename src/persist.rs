// used for persistence
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::construct::{Database, Id, Rule};
use crate::datatype::{DataType, FactValue, Literal};
use crate::error::{AtomicError, Result};
use crate::schema::AttributeMetadata;

// ------------- Persistence -------------
/// Writes changes through to a SQLite file and restores them on startup.
/// Writes are not wrapped in transactions and carry no durability guarantee.
#[derive(Debug)]
pub struct Persistor {
    connection: Connection,
}

impl Persistor {
    pub fn open(path: &str) -> Result<Persistor> {
        let connection = Connection::open(path)?;
        Self::with_connection(connection)
    }
    pub fn with_connection(connection: Connection) -> Result<Persistor> {
        connection.execute_batch(
            "
            create table if not exists Entity (
                Entity_Identity integer not null,
                Entity text not null,
                constraint referenceable_Entity_Identity primary key (
                    Entity_Identity
                ),
                constraint unique_Entity unique (
                    Entity
                )
            );
            create table if not exists Attribute (
                Attribute_Identity integer not null,
                Attribute text not null,
                constraint referenceable_Attribute_Identity primary key (
                    Attribute_Identity
                ),
                constraint unique_Attribute unique (
                    Attribute
                )
            );
            create table if not exists Metadata (
                Attribute text not null,
                Metadata text not null,
                constraint unique_Metadata primary key (
                    Attribute
                )
            );
            create table if not exists DataType (
                DataType_Identity integer not null,
                DataType text not null,
                constraint referenceable_DataType_Identity primary key (
                    DataType_Identity
                ),
                constraint unique_DataType unique (
                    DataType
                )
            );
            create table if not exists Fact (
                Fact_Identity integer not null,
                Entity_Identity integer not null,
                Attribute_Identity integer not null,
                IsList integer not null,
                constraint Fact_has_Entity foreign key (
                    Entity_Identity
                ) references Entity(Entity_Identity),
                constraint Fact_has_Attribute foreign key (
                    Attribute_Identity
                ) references Attribute(Attribute_Identity),
                constraint referenceable_Fact_Identity primary key (
                    Fact_Identity
                )
            );
            create table if not exists FactElement (
                Fact_Identity integer not null,
                Position integer not null,
                Element blob null,
                ElementType_Identity integer not null,
                constraint FactElement_in_Fact foreign key (
                    Fact_Identity
                ) references Fact(Fact_Identity),
                constraint ElementType_is_DataType foreign key (
                    ElementType_Identity
                ) references DataType(DataType_Identity),
                constraint unique_FactElement primary key (
                    Fact_Identity,
                    Position
                )
            );
            create table if not exists Rule (
                Rule text not null,
                Lang integer not null,
                Text text not null,
                Body text not null,
                Args text not null,
                constraint unique_Rule primary key (
                    Rule
                )
            );
            ",
        )?;
        let mut add_data_type = connection.prepare_cached(
            "insert or ignore into DataType (DataType_Identity, DataType) values (?, ?)",
        )?;
        add_data_type.execute(params![i64::UID, i64::DATA_TYPE])?;
        add_data_type.execute(params![String::UID, String::DATA_TYPE])?;
        add_data_type.execute(params![bool::UID, bool::DATA_TYPE])?;
        add_data_type.execute(params![f64::UID, f64::DATA_TYPE])?;
        drop(add_data_type);
        Ok(Persistor { connection })
    }

    pub fn persist_entity(&self, id: Id, key: &str) -> Result<()> {
        self.connection
            .prepare_cached("insert or ignore into Entity (Entity_Identity, Entity) values (?, ?)")?
            .execute(params![id, key])?;
        Ok(())
    }
    pub fn persist_attribute(&self, id: Id, name: &str) -> Result<()> {
        self.connection
            .prepare_cached("insert or ignore into Attribute (Attribute_Identity, Attribute) values (?, ?)")?
            .execute(params![id, name])?;
        Ok(())
    }
    pub fn persist_metadata(&self, name: &str, metadata: &AttributeMetadata) -> Result<()> {
        let metadata = serde_json::to_string(metadata)?;
        self.connection
            .prepare_cached("insert or replace into Metadata (Attribute, Metadata) values (?, ?)")?
            .execute(params![name, metadata])?;
        Ok(())
    }
    /// Stores a fact value, first removing earlier values for the pair when `replace` is set.
    pub fn persist_fact(&self, entity: Id, attribute: Id, value: &FactValue, replace: bool) -> Result<()> {
        if replace {
            self.connection
                .prepare_cached(
                    "delete from FactElement where Fact_Identity in (
                        select Fact_Identity from Fact where Entity_Identity = ? and Attribute_Identity = ?
                    )",
                )?
                .execute(params![entity, attribute])?;
            self.connection
                .prepare_cached("delete from Fact where Entity_Identity = ? and Attribute_Identity = ?")?
                .execute(params![entity, attribute])?;
        }
        let fact: i64 = self
            .connection
            .prepare_cached("select coalesce(max(Fact_Identity), 0) + 1 from Fact")?
            .query_row([], |row| row.get(0))?;
        self.connection
            .prepare_cached(
                "insert into Fact (Fact_Identity, Entity_Identity, Attribute_Identity, IsList) values (?, ?, ?, ?)",
            )?
            .execute(params![fact, entity, attribute, value.is_list()])?;
        let mut add_element = self.connection.prepare_cached(
            "insert into FactElement (Fact_Identity, Position, Element, ElementType_Identity) values (?, ?, ?, ?)",
        )?;
        for (position, literal) in value.literals().iter().enumerate() {
            add_element.execute(params![fact, position as i64, literal, literal.identifier()])?;
        }
        Ok(())
    }
    pub fn persist_rule(&self, rule: &Rule) -> Result<()> {
        let body = serde_json::to_string(&rule.body)?;
        let args = serde_json::to_string(&rule.args)?;
        self.connection
            .prepare_cached("insert or replace into Rule (Rule, Lang, Text, Body, Args) values (?, ?, ?, ?, ?)")?
            .execute(params![rule.name, rule.lang, rule.text, body, args])?;
        Ok(())
    }

    /// Loads everything persisted so far into the keepers of `db`.
    pub fn restore(&self, db: &mut Database) -> Result<()> {
        self.restore_entities(db)?;
        self.restore_attributes(db)?;
        self.restore_metadata(db)?;
        self.restore_facts(db)?;
        self.restore_rules(db)?;
        debug!(
            entities = db.entity_keeper.len(),
            attributes = db.attribute_keeper.len(),
            facts = db.fact_keeper.len(),
            rules = db.rule_keeper.len(),
            "database restored"
        );
        Ok(())
    }
    fn restore_entities(&self, db: &mut Database) -> Result<()> {
        let mut statement = self
            .connection
            .prepare("select Entity_Identity, Entity from Entity order by Entity_Identity")?;
        let rows = statement.query_map([], |row| Ok((row.get::<_, Id>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, key) = row?;
            let (kept, _) = db.entity_keeper.keep(&key);
            if kept != id {
                return Err(AtomicError::Persistence(format!(
                    "entity '{}' was stored as {} but restored as {}",
                    key, id, kept
                )));
            }
        }
        Ok(())
    }
    fn restore_attributes(&self, db: &mut Database) -> Result<()> {
        let mut statement = self
            .connection
            .prepare("select Attribute_Identity, Attribute from Attribute order by Attribute_Identity")?;
        let rows = statement.query_map([], |row| Ok((row.get::<_, Id>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, name) = row?;
            let (kept, _) = db.attribute_keeper.keep(&name);
            if kept != id {
                return Err(AtomicError::Persistence(format!(
                    "attribute '{}' was stored as {} but restored as {}",
                    name, id, kept
                )));
            }
        }
        Ok(())
    }
    fn restore_metadata(&self, db: &mut Database) -> Result<()> {
        let mut statement = self.connection.prepare("select Attribute, Metadata from Metadata")?;
        let rows = statement.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (name, metadata) = row?;
            let metadata: AttributeMetadata = serde_json::from_str(&metadata)?;
            db.metadata.insert(name, metadata);
        }
        Ok(())
    }
    fn restore_facts(&self, db: &mut Database) -> Result<()> {
        // the outer join keeps empty lists, which have no elements
        let mut statement = self.connection.prepare(
            "select f.Fact_Identity, f.Entity_Identity, f.Attribute_Identity, f.IsList,
                    e.Element, e.ElementType_Identity
                from Fact f
                left join FactElement e
                on e.Fact_Identity = f.Fact_Identity
                order by f.Fact_Identity, e.Position",
        )?;
        let mut rows = statement.query([])?;
        // elements arrive grouped by fact, so a fact is complete when the next one starts
        let mut current: Option<(i64, Id, Id, bool, Vec<Literal>)> = None;
        while let Some(row) = rows.next()? {
            let fact: i64 = row.get(0)?;
            let literal = match row.get::<_, Option<u8>>(5)? {
                Some(uid) => match Literal::convert(uid, &row.get_ref(4)?) {
                    Some(literal) => Some(literal),
                    None => {
                        return Err(AtomicError::Persistence(format!(
                            "element of fact {} does not hold data type {}",
                            fact, uid
                        )));
                    }
                },
                None => None,
            };
            if let Some((id, .., literals)) = current.as_mut() {
                if *id == fact {
                    literals.extend(literal);
                    continue;
                }
            }
            if let Some(done) = current.take() {
                Self::keep_restored(db, done);
            }
            current = Some((fact, row.get(1)?, row.get(2)?, row.get(3)?, literal.into_iter().collect()));
        }
        if let Some(done) = current.take() {
            Self::keep_restored(db, done);
        }
        Ok(())
    }
    fn keep_restored(db: &mut Database, (_, entity, attribute, is_list, mut literals): (i64, Id, Id, bool, Vec<Literal>)) {
        let value = if is_list || literals.len() != 1 {
            FactValue::List(literals)
        } else {
            FactValue::Single(literals.remove(0))
        };
        db.fact_keeper.restore(entity, attribute, value);
    }
    fn restore_rules(&self, db: &mut Database) -> Result<()> {
        let mut statement = self.connection.prepare("select Rule, Lang, Text, Body, Args from Rule")?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        for row in rows {
            let (name, lang, text, body, args) = row?;
            db.rule_keeper.restore(Rule {
                name,
                lang,
                text,
                body: serde_json::from_str(&body)?,
                args: serde_json::from_str(&args)?,
            });
        }
        Ok(())
    }

    /// Number of stored fact values, mostly of interest to tests.
    pub fn fact_count(&self) -> Result<usize> {
        let count: i64 = self
            .connection
            .query_row("select count(*) from Fact", [], |row| row.get(0))?;
        Ok(count as usize)
    }
    pub fn entity_id(&self, key: &str) -> Result<Option<Id>> {
        Ok(self
            .connection
            .query_row("select Entity_Identity from Entity where Entity = ?", params![key], |row| row.get(0))
            .optional()?)
    }
}
