use atomicdb::construct::{LANG_CLAUSE, LANG_TERM, Rule};
use atomicdb::datatype::Literal;
use atomicdb::error::AtomicError;
use atomicdb::rule::{Goal, compile, parse_body};
use atomicdb::term::Term;

#[test]
fn goals_are_separated_by_commas() {
    let goals = parse_body("father(C, F), father(F, G)").unwrap();
    assert_eq!(
        goals,
        [
            Goal::new("father", vec![Term::var("C"), Term::var("F")]),
            Goal::new("father", vec![Term::var("F"), Term::var("G")]),
        ]
    );
}

#[test]
fn every_literal_kind_is_understood() {
    let goals = parse_body(r#"p(1, -2, 3.5, "say \"hi\"", true, false, [X, [Y]])"#).unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(
        goals[0].args,
        [
            Term::lit(1),
            Term::lit(-2),
            Term::lit(3.5),
            Term::lit("say \"hi\""),
            Term::lit(true),
            Term::lit(false),
            Term::list([Term::var("X"), Term::list([Term::var("Y")])]),
        ]
    );
}

#[test]
fn anonymous_variables_are_all_distinct() {
    let goals = parse_body("listy(E, [_, _, Last])").unwrap();
    let Term::List(items) = &goals[0].args[1] else {
        panic!("expected a list");
    };
    assert_ne!(items[0], items[1]);
    assert!(matches!(&items[0], Term::Variable(_)));
    assert_eq!(items[2], Term::var("Last"));
}

#[test]
fn layout_comments_and_a_final_period_are_allowed() {
    let text = "
        % whose father is who
        father(C, F),
        age(F, A),   % the father's age
        ge(A, 40).
    ";
    let goals = parse_body(text).unwrap();
    let names: Vec<&str> = goals.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["father", "age", "ge"]);
    assert!(parse_body("").unwrap().is_empty());
    assert_eq!(parse_body("zero-args()").unwrap(), [Goal::new("zero-args", vec![])]);
}

#[test]
fn errors_carry_their_position() {
    let err = parse_body("father(C, F),\n  father(F G)").unwrap_err();
    let AtomicError::Parse { line, col, .. } = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(line, Some(2));
    assert!(col.is_some());
    assert!(matches!(parse_body("Father(C)"), Err(AtomicError::Parse { .. })));
    assert!(matches!(parse_body("father(c)"), Err(AtomicError::Parse { .. })));
}

#[test]
fn compilation_follows_the_language_tag() {
    let body = vec![Goal::new("name", vec![Term::var("P"), Term::lit("Joe")])];
    let mut rule = Rule::new("joe", vec!["P".to_string()]);
    rule.body = body.clone();
    rule.text = "age(P, 44)".to_string();
    assert_eq!(compile(&rule).unwrap(), body);

    // clause rules prefer an already compiled body over their text
    rule.lang = LANG_CLAUSE;
    assert_eq!(compile(&rule).unwrap(), body);
    rule.body.clear();
    assert_eq!(
        compile(&rule).unwrap(),
        [Goal::new("age", vec![Term::var("P"), Term::Literal(Literal::Integer(44))])]
    );

    rule.lang = 3;
    assert!(matches!(compile(&rule), Err(AtomicError::UnsupportedLanguage { lang: 3, .. })));
    rule.lang = LANG_TERM;
    assert!(compile(&rule).unwrap().is_empty());
}

#[test]
fn goals_print_as_clause_text() {
    let goal = Goal::new("age", vec![Term::var("P"), Term::lit(44)]);
    assert_eq!(goal.to_string(), "age(P, 44)");
}
