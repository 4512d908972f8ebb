use atomicdb::construct::{Database, PersistenceMode};
use atomicdb::datatype::Literal;
use atomicdb::error::AtomicError;
use atomicdb::load::load_from_str;
use atomicdb::schema::{AttributeMetadata, Constraint, ElementKind, TypeKind, validate};

fn setup() -> Database {
    let mut db = Database::new(PersistenceMode::InMemory).unwrap();
    let document = load_from_str(include_str!("fixtures/test.db.json")).unwrap();
    db.load(&document).unwrap();
    db
}

#[test]
fn age_must_be_an_integer_of_at_least_18() {
    let db = setup();
    let age = &db.attribute_metadata()["age"];
    let err = db.validate(age, "age", &Literal::from("44")).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
    let err = db.validate(age, "age", &Literal::from(10)).unwrap_err();
    assert!(matches!(err, AtomicError::ConstraintViolation { .. }), "got {err:?}");
    assert!(db.validate(age, "age", &Literal::from(18)).is_ok());
    assert!(db.validate(age, "age", &Literal::from(44)).is_ok());
}

#[test]
fn father_must_be_an_entity_reference() {
    let db = setup();
    let father = &db.attribute_metadata()["father"];
    let err = db.validate(father, "father", &Literal::from(1337)).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
    assert!(db.validate(father, "father", &Literal::from("cool@gmail.com")).is_ok());
}

#[test]
fn validating_an_entity_reference_does_not_intern_it() {
    let db = setup();
    let entities = db.entities().len();
    let father = &db.attribute_metadata()["father"];
    assert!(db.validate(father, "father", &Literal::from("nobody@gmail.com")).is_ok());
    assert_eq!(db.entities().len(), entities);
}

#[test]
fn allowed_strings_constrain_string_values() {
    let metadata = AttributeMetadata::new(TypeKind::String).with_allowed_strings(["Foo", "Bar", "Baz"]);
    for allowed in ["Foo", "Bar", "Baz"] {
        assert!(validate(&metadata, "fake", &Literal::from(allowed)).is_ok());
    }
    let err = validate(&metadata, "fake", &Literal::from("Nope")).unwrap_err();
    assert!(matches!(err, AtomicError::ConstraintViolation { .. }), "got {err:?}");
}

#[test]
fn the_type_is_checked_before_constraints() {
    let metadata = AttributeMetadata::new(TypeKind::Integer).with_range(Some(18.0), None);
    // would also violate the range if it were compared as a number
    let err = validate(&metadata, "age", &Literal::from("10")).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
}

#[test]
fn ranges_are_inclusive_on_both_ends() {
    let metadata = AttributeMetadata::new(TypeKind::Integer).with_range(Some(1.0), Some(10.0));
    assert!(validate(&metadata, "score", &Literal::from(1)).is_ok());
    assert!(validate(&metadata, "score", &Literal::from(10)).is_ok());
    let err = validate(&metadata, "score", &Literal::from(11)).unwrap_err();
    assert!(matches!(err, AtomicError::ConstraintViolation { .. }), "got {err:?}");
    let err = validate(&metadata, "score", &Literal::from(0)).unwrap_err();
    assert!(matches!(err, AtomicError::ConstraintViolation { .. }), "got {err:?}");
}

#[test]
fn floats_and_booleans_are_strictly_typed() {
    let float = AttributeMetadata::new(TypeKind::Float).with_range(None, Some(1.0));
    assert!(validate(&float, "ratio", &Literal::from(0.5)).is_ok());
    let err = validate(&float, "ratio", &Literal::from(1)).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
    let err = validate(&float, "ratio", &Literal::from(1.5)).unwrap_err();
    assert!(matches!(err, AtomicError::ConstraintViolation { .. }), "got {err:?}");

    let flag = AttributeMetadata::new(TypeKind::Boolean);
    assert!(validate(&flag, "active", &Literal::from(true)).is_ok());
    let err = validate(&flag, "active", &Literal::from("true")).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
}

#[test]
fn list_attributes_validate_each_element() {
    let db = setup();
    let listy = &db.attribute_metadata()["listy"];
    assert!(db.validate(listy, "listy", &Literal::from(3)).is_ok());
    let err = db.validate(listy, "listy", &Literal::from("A")).unwrap_err();
    assert!(matches!(err, AtomicError::TypeMismatch { .. }), "got {err:?}");
}

#[test]
fn metadata_reads_from_json_codes() {
    let metadata: AttributeMetadata =
        serde_json::from_str(r#"{ "type": 1, "allowed_strings": ["Foo", "Bar"] }"#).unwrap();
    assert_eq!(metadata.kind, TypeKind::String);
    assert!(matches!(metadata.constraint, Constraint::AllowedStrings(ref allowed) if allowed.len() == 2));

    let metadata: AttributeMetadata = serde_json::from_str(r#"{ "type": 5 }"#).unwrap();
    assert_eq!(metadata.kind, TypeKind::List(ElementKind::Integer));
    assert!(metadata.kind.is_list());

    assert!(serde_json::from_str::<AttributeMetadata>(r#"{ "type": 42 }"#).is_err());
}

#[test]
fn builtin_metadata_is_registered_without_interning() {
    let db = Database::new(PersistenceMode::InMemory).unwrap();
    for name in ["name", "age", "father", "listy"] {
        assert!(db.attribute_metadata().contains_key(name), "missing {name}");
    }
    assert!(db.attributes().is_empty());
    assert!(db.entities().is_empty());
}

#[test]
fn constraints_must_fit_the_kind() {
    assert!(serde_json::from_str::<AttributeMetadata>(r#"{ "type": 1, "min": 3 }"#).is_err());
    assert!(serde_json::from_str::<AttributeMetadata>(r#"{ "type": 4, "max": 3 }"#).is_err());
    assert!(serde_json::from_str::<AttributeMetadata>(r#"{ "type": 0, "allowed_strings": ["a"] }"#).is_err());
    assert!(serde_json::from_str::<AttributeMetadata>(r#"{ "type": 0, "min": 1, "allowed_strings": ["a"] }"#).is_err());

    let metadata: AttributeMetadata = serde_json::from_str(r#"{ "type": 8, "min": 0.5 }"#).unwrap();
    assert_eq!(metadata.constraint, Constraint::Range { min: Some(0.5), max: None });
    let metadata: AttributeMetadata = serde_json::from_str(r#"{ "type": 6, "allowed_strings": ["a"] }"#).unwrap();
    assert!(matches!(metadata.constraint, Constraint::AllowedStrings(_)));
}

#[test]
fn mismatches_name_the_literal_data_type() {
    let metadata = AttributeMetadata::new(TypeKind::Integer);
    let AtomicError::TypeMismatch { expected, found, .. } =
        validate(&metadata, "age", &Literal::from("44")).unwrap_err()
    else {
        panic!("expected a type mismatch");
    };
    assert_eq!(expected, "Integer");
    assert_eq!(found, "String");
    assert_eq!(Literal::from(1.5).data_type(), "Float");
    assert_eq!(Literal::from(true).identifier(), 3);
}
