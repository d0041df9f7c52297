//! Key template parse vectors and value escaping.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use tollbooth_core::template::{escape_value, KeyTemplate, Segment};

#[test]
fn key_template_vectors() {
    for v in vector_loader::load("key_templates.json") {
        match &v.expect_error {
            None => {
                let t = KeyTemplate::parse(&v.template)
                    .unwrap_or_else(|e| panic!("{}: unexpected error {e}", v.description));
                let names: Vec<&str> = t.placeholders().collect();
                assert_eq!(names, v.placeholders, "{}", v.description);
            }
            Some(err) => {
                let e = KeyTemplate::parse(&v.template)
                    .expect_err(&format!("{} must fail", v.description));
                assert_eq!(e.client_code().as_str(), err.code, "{}", v.description);
            }
        }
    }
}

#[test]
fn literal_and_placeholder_segments_alternate() {
    let t = KeyTemplate::parse("op:{entityId}:tail").unwrap();
    assert_eq!(
        t.segments(),
        &[
            Segment::Literal("op:".into()),
            Segment::Placeholder("entityId".into()),
            Segment::Literal(":tail".into()),
        ]
    );
    assert_eq!(t.as_str(), "op:{entityId}:tail");
}

#[test]
fn plain_identifiers_are_not_escaped() {
    for v in ["u-42", "exp_1", "3f2c9a1e-0b7d-4c55-9a3e-1b2c3d4e5f60", "a.b"] {
        assert_eq!(escape_value(v), v);
    }
}

#[test]
fn separators_and_percent_are_escaped() {
    assert_eq!(escape_value("a:b"), "a%3Ab");
    assert_eq!(escape_value("a/b c"), "a%2Fb%20c");
    assert_eq!(escape_value("100%"), "100%25");
    assert_eq!(escape_value("é"), "%C3%A9");
}

#[test]
fn escaped_values_cannot_collide_across_a_separator() {
    let left = format!("{}:{}", escape_value("a:b"), escape_value("c"));
    let right = format!("{}:{}", escape_value("a"), escape_value("b:c"));
    assert_ne!(left, right);
    // An already-escaped looking value stays distinct from its source.
    assert_ne!(escape_value("a%3Ab"), escape_value("a:b"));
}
