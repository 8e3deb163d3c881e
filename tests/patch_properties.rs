//! Property-based tests for PATCH invariants.
//!
//! Uses proptest to verify the engine's laws over generated inputs:
//! determinism of resolution, add/read round trips, append length behavior,
//! and parser totality (no panics on arbitrary input).

use proptest::prelude::*;
use scim_patch::{
    PatchEngine, PatchOp, PatchOperation, PathExpression, Resource, SchemaRegistry,
};
use serde_json::{Value, json};

fn registry() -> SchemaRegistry {
    SchemaRegistry::new().expect("embedded schemas load")
}

fn add_op(path: &str, value: Value) -> PatchOperation {
    PatchOperation {
        op: PatchOp::Add,
        path: Some(PathExpression::parse(path).expect("valid path")),
        value,
    }
}

/// Strategy for plausible attribute string values.
fn attribute_string() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._-]{1,40}"
}

/// Strategy for email element objects.
fn email_element() -> impl Strategy<Value = Value> {
    ("[a-z]{1,12}", "[a-z]{1,12}", prop_oneof!["work", "home", "other"]).prop_map(
        |(local, domain, kind)| json!({"value": format!("{local}@{domain}.example"), "type": kind}),
    )
}

proptest! {
    /// Add on a singular string attribute followed by a read returns the
    /// value that was added.
    #[test]
    fn add_then_read_round_trips(value in attribute_string()) {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource =
            Resource::from_json(&registry, "User", json!({"userName": "bjensen"})).unwrap();

        let outcome = engine.apply(&mut resource, &add_op("nickName", json!(value.clone())), 0);
        prop_assert!(outcome.is_applied());
        prop_assert_eq!(resource.attribute("nickName"), Some(&json!(value)));
    }

    /// Appending N elements grows the collection by exactly N and never
    /// mutates the collection observed before the call.
    #[test]
    fn append_grows_by_n_without_aliasing(
        initial in proptest::collection::vec(email_element(), 1..4),
        added in proptest::collection::vec(email_element(), 1..4),
    ) {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource =
            Resource::from_json(&registry, "User", json!({"emails": initial.clone()})).unwrap();

        let before = resource.attribute("emails").cloned().unwrap();

        for (i, element) in added.iter().enumerate() {
            let outcome = engine.apply(&mut resource, &add_op("emails", element.clone()), i);
            prop_assert!(outcome.is_applied());
        }

        prop_assert_eq!(before.as_array().unwrap().len(), initial.len());
        let after = resource.attribute("emails").unwrap().as_array().unwrap();
        prop_assert_eq!(after.len(), initial.len() + added.len());
        prop_assert_eq!(&after[..initial.len()], before.as_array().unwrap().as_slice());
    }

    /// Applying the same operations to identical resources produces
    /// identical post-states: resolution has no hidden nondeterminism.
    #[test]
    fn application_is_deterministic(
        elements in proptest::collection::vec(email_element(), 2..5),
        replacement in "[a-z]{1,12}",
    ) {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let data = json!({"userName": "bjensen", "emails": elements});

        let operation = add_op(
            "emails[type eq \"work\"]",
            json!({"display": replacement}),
        );

        let mut first = Resource::from_json(&registry, "User", data.clone()).unwrap();
        let mut second = Resource::from_json(&registry, "User", data).unwrap();
        let outcome_first = engine.apply(&mut first, &operation, 0);
        let outcome_second = engine.apply(&mut second, &operation, 0);

        prop_assert_eq!(outcome_first, outcome_second);
        prop_assert_eq!(first.to_json(), second.to_json());
    }

    /// The path parser is total: arbitrary input either parses or returns an
    /// error, never panics, and successful parses round-trip through Display.
    #[test]
    fn parser_never_panics(raw in "\\PC{0,60}") {
        if let Ok(path) = PathExpression::parse(&raw) {
            let rendered = path.to_string();
            prop_assert_eq!(PathExpression::parse(&rendered).unwrap(), path);
        }
    }
}
