use atomicdb::construct::{Database, FactPolicy, PersistenceMode};
use atomicdb::datatype::{FactValue, Literal};
use atomicdb::error::AtomicError;
use atomicdb::load::load_from_str;
use atomicdb::settings::Settings;
use atomicdb::term::Term;

fn setup() -> Database {
    let mut db = Database::new(PersistenceMode::InMemory).unwrap();
    let document = load_from_str(include_str!("fixtures/test.db.json")).unwrap();
    db.load(&document).unwrap();
    db
}

fn with_policy(fact_policy: FactPolicy) -> Database {
    Database::with_settings(&Settings { fact_policy, ..Settings::default() }).unwrap()
}

#[test]
fn stored_values_can_be_read_back() {
    let db = setup();
    assert_eq!(
        db.get_value("cool@gmail.com", "name"),
        Some(&FactValue::Single(Literal::from("Joe Cool")))
    );
    assert_eq!(db.get_value("cool@gmail.com", "boogaloo"), None);
    assert_eq!(db.get_value("nobody@gmail.com", "name"), None);
}

#[test]
fn values_are_validated_before_they_are_stored() {
    let mut db = setup();
    let err = db.add("cool@gmail.com", "father", &[Term::lit(99)]).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");

    let letters = [Term::lit("A"), Term::lit("B"), Term::lit("C")];
    let err = db.add("cool@gmail.com", "listy", &letters).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");

    let err = db.add("cool@gmail.com", "age", &[Term::lit(12)]).unwrap_err();
    assert!(matches!(err, AtomicError::ConstraintViolation { .. }), "got {err:?}");
    assert_eq!(db.get_value("cool@gmail.com", "age"), Some(&FactValue::Single(Literal::from(44))));
}

#[test]
fn list_attributes_store_every_element_in_order() {
    let mut db = setup();
    db.add("cool@gmail.com", "listy", &[Term::lit(1), Term::lit(2), Term::lit(3)]).unwrap();
    assert_eq!(
        db.get_value("cool@gmail.com", "listy"),
        Some(&FactValue::List(vec![Literal::from(1), Literal::from(2), Literal::from(3)]))
    );
}

#[test]
fn scalar_attributes_take_exactly_one_literal() {
    let mut db = setup();
    let err = db.add("cool@gmail.com", "name", &[Term::lit("Joe"), Term::lit("Cool")]).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
    let err = db.add("cool@gmail.com", "name", &[]).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
}

#[test]
fn only_literals_can_be_stored() {
    let mut db = setup();
    let err = db.add("cool@gmail.com", "name", &[Term::var("X")]).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
    let err = db.add("cool@gmail.com", "listy", &[Term::list([Term::lit(1)])]).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
}

#[test]
fn a_rejected_fact_interns_nothing() {
    let mut db = setup();
    let entities = db.entities().len();
    let attributes = db.attributes().len();
    assert!(db.add("newbie@gmail.com", "age", &[Term::lit("old")]).is_err());
    assert_eq!(db.entities().len(), entities);
    assert_eq!(db.attributes().len(), attributes);
    assert_eq!(db.entities().get("newbie@gmail.com"), None);
}

#[test]
fn undeclared_attributes_accept_any_literal() {
    let mut db = Database::new(PersistenceMode::InMemory).unwrap();
    db.add("car", "color", &[Term::lit("red")])
        .unwrap()
        .add("car", "wheels", &[Term::lit(4)])
        .unwrap()
        .add("car", "sizes", &[Term::lit(1.5), Term::lit("big")])
        .unwrap();
    assert_eq!(db.get_value("car", "color"), Some(&FactValue::Single(Literal::from("red"))));
    assert_eq!(db.get_value("car", "wheels"), Some(&FactValue::Single(Literal::from(4))));
    assert_eq!(
        db.get_value("car", "sizes"),
        Some(&FactValue::List(vec![Literal::from(1.5), Literal::from("big")]))
    );
    assert_eq!(db.facts().count(), 3);
    assert_eq!(db.entities().len(), 1);
}

#[test]
fn overwrite_replaces_the_previous_value() {
    let mut db = with_policy(FactPolicy::Overwrite);
    db.add("joe", "age", &[Term::lit(40)]).unwrap();
    db.add("joe", "age", &[Term::lit(41)]).unwrap();
    assert_eq!(db.get_value("joe", "age"), Some(&FactValue::Single(Literal::from(41))));
    assert_eq!(db.get_values("joe", "age").len(), 1);
    assert_eq!(db.fact_keeper().len(), 1);
}

#[test]
fn reject_refuses_a_second_value() {
    let mut db = with_policy(FactPolicy::Reject);
    db.add("joe", "age", &[Term::lit(40)]).unwrap();
    let err = db.add("joe", "age", &[Term::lit(41)]).unwrap_err();
    assert!(matches!(err, AtomicError::DuplicateFact { .. }), "got {err:?}");
    assert_eq!(db.get_value("joe", "age"), Some(&FactValue::Single(Literal::from(40))));
}

#[test]
fn accumulate_keeps_every_value() {
    let mut db = with_policy(FactPolicy::Accumulate);
    db.add("joe", "nickname", &[Term::lit("Joe")]).unwrap();
    db.add("joe", "nickname", &[Term::lit("Joey")]).unwrap();
    assert_eq!(db.get_values("joe", "nickname").len(), 2);
    assert_eq!(db.get_value("joe", "nickname"), Some(&FactValue::Single(Literal::from("Joey"))));
    assert_eq!(db.fact_keeper().len(), 2);
}

#[test]
fn carriers_track_entities_per_attribute() {
    let db = setup();
    let age = db.attributes().get("age").unwrap();
    let carriers = db.fact_keeper().carriers(age).unwrap();
    assert_eq!(carriers.len(), 3);
    let father = db.attributes().get("father").unwrap();
    let carriers = db.fact_keeper().carriers(father).unwrap();
    assert!(carriers.contains(db.entities().get("cool@gmail.com").unwrap()));
    assert!(!carriers.contains(db.entities().get("granddad@gmail.com").unwrap()));
}
