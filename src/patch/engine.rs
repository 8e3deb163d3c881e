//! Application of PATCH operations to resolved targets.
//!
//! The [`PatchEngine`] owns the error-reporting policy and the full RFC 7644
//! Section 3.5.2 add/remove/replace semantics: value conversion through the
//! declared attribute type, mutability enforcement, and collection-merge
//! behavior. Mutation is value-replacing — appends build a new collection
//! from the existing contents plus the converted elements, so a failure
//! partway through an operation never leaves a half-mutated attribute behind.
//!
//! Batches execute strictly in request order; later operations observe the
//! effects of earlier ones.

use super::analyzer::{PropertyTarget, Resolution, TreeAnalyzer, navigate_mut};
use super::convert;
use super::path::PathExpression;
use super::request::{PatchOp, PatchOperation, PatchRequest};
use crate::error::{PatchError, PatchResult};
use crate::resource::{Resource, json_type_name, map_insert};
use crate::schema::SchemaRegistry;

use log::{debug, warn};
use serde_json::{Map, Value};

/// Error-reporting policy, resolved at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the batch on the first error and surface that single error
    #[default]
    FailFast,
    /// Keep processing, record every outcome, let the caller decide
    CollectErrors,
}

/// Outcome of applying one PATCH operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    Applied,
    Failed(PatchError),
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn error(&self) -> Option<&PatchError> {
        match self {
            Self::Applied => None,
            Self::Failed(error) => Some(error),
        }
    }
}

/// Applies PATCH operations to resources.
///
/// The engine is synchronous and performs no I/O; callers serialize access
/// per resource instance. After a batch returns, the mutated resource is
/// handed to whatever business-rule validation the caller runs before
/// committing to storage.
#[derive(Debug, Clone, Copy)]
pub struct PatchEngine<'a> {
    registry: &'a SchemaRegistry,
    analyzer: TreeAnalyzer<'a>,
    policy: ErrorPolicy,
}

impl<'a> PatchEngine<'a> {
    /// Engine with the default fail-fast policy.
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self::with_policy(registry, ErrorPolicy::default())
    }

    pub fn with_policy(registry: &'a SchemaRegistry, policy: ErrorPolicy) -> Self {
        Self {
            registry,
            analyzer: TreeAnalyzer::new(registry),
            policy,
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Apply a whole request batch in order.
    ///
    /// Under [`ErrorPolicy::FailFast`] the first failure aborts the batch and
    /// becomes the returned error; operations already applied stay applied.
    /// Under [`ErrorPolicy::CollectErrors`] every operation is attempted,
    /// each failure is logged, and the per-operation outcomes are returned
    /// for the caller to accept or reject.
    pub fn apply_request(
        &self,
        resource: &mut Resource,
        request: &PatchRequest,
    ) -> PatchResult<Vec<PatchOutcome>> {
        let mut outcomes = Vec::with_capacity(request.operations.len());
        for (index, operation) in request.operations.iter().enumerate() {
            let outcome = self.apply(resource, operation, index);
            if let PatchOutcome::Failed(error) = &outcome {
                match self.policy {
                    ErrorPolicy::FailFast => return Err(error.clone()),
                    ErrorPolicy::CollectErrors => {
                        warn!("patch operation {index} failed: {error}");
                    }
                }
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Apply a single operation, reporting the outcome without aborting.
    pub fn apply(
        &self,
        resource: &mut Resource,
        operation: &PatchOperation,
        index: usize,
    ) -> PatchOutcome {
        let result = match operation.op {
            PatchOp::Add => {
                self.apply_add(resource, operation.path.as_ref(), &operation.value, index)
            }
            PatchOp::Remove => self.apply_remove(resource, operation.path.as_ref(), index),
            PatchOp::Replace => {
                self.apply_replace(resource, operation.path.as_ref(), &operation.value, index)
            }
        };
        match result {
            Ok(()) => {
                debug!(
                    "applied {} at {}",
                    operation.op,
                    operation
                        .path
                        .as_ref()
                        .map(PathExpression::to_string)
                        .unwrap_or_else(|| "resource root".to_string())
                );
                PatchOutcome::Applied
            }
            Err(mut error) => {
                if error.path.is_none() {
                    if let Some(path) = &operation.path {
                        error = error.with_path(path.to_string());
                    }
                }
                PatchOutcome::Failed(error)
            }
        }
    }

    fn apply_add(
        &self,
        resource: &mut Resource,
        path: Option<&PathExpression>,
        value: &Value,
        index: usize,
    ) -> PatchResult<()> {
        let Some(path) = path else {
            return self.apply_to_root(resource, value, index, PatchOp::Add);
        };
        match self.analyzer.analyze(resource, path, index)? {
            Resolution::Extension(target) => {
                self.add_to_extension(resource, &target.key, value, index)
            }
            Resolution::Property(target) => self.add_to_property(resource, &target, value, index),
        }
    }

    /// Pathless add/replace: the value object's key/value pairs become
    /// independent root-level operations, applied in key order. Each key is
    /// atomic on its own; a failing key never corrupts keys already applied.
    fn apply_to_root(
        &self,
        resource: &mut Resource,
        value: &Value,
        index: usize,
        verb: PatchOp,
    ) -> PatchResult<()> {
        let Value::Object(entries) = value else {
            return Err(PatchError::invalid_value(
                index,
                format!(
                    "{verb} without a path requires an object value, got {}",
                    json_type_name(value)
                ),
            ));
        };

        let mut first_error: Option<PatchError> = None;
        for (key, item) in entries {
            // Extension namespace keys (URNs) are not addressable by the
            // path grammar; they go straight to the extension container.
            let result = if key.contains(':') {
                self.add_to_extension(resource, key, item, index)
            } else {
                match PathExpression::parse(key) {
                    Ok(path) => match verb {
                        PatchOp::Replace => {
                            self.apply_replace(resource, Some(&path), item, index)
                        }
                        _ => self.apply_add(resource, Some(&path), item, index),
                    },
                    Err(e) => Err(PatchError::invalid_path(index, e.to_string()).with_path(key)),
                }
            };
            if let Err(error) = result {
                match self.policy {
                    ErrorPolicy::FailFast => return Err(error),
                    ErrorPolicy::CollectErrors => {
                        warn!("patch operation {index}: key '{key}' failed: {error}");
                        first_error.get_or_insert(error);
                    }
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Add into the extension container: append to an existing array, merge
    /// into an existing object, type-checked replace of an existing scalar,
    /// or unconditional raw insert when the key is absent.
    fn add_to_extension(
        &self,
        resource: &mut Resource,
        key: &str,
        value: &Value,
        index: usize,
    ) -> PatchResult<()> {
        let existing = resource.extensions().get(key).cloned();
        match existing {
            None => {
                resource.extensions_mut().insert(key, value.clone());
                Ok(())
            }
            Some(Value::Array(items)) => {
                let new_items: Vec<Value> = match value {
                    Value::Array(values) => values.clone(),
                    single => vec![single.clone()],
                };
                if let Some(first) = items.first() {
                    for item in &new_items {
                        if json_type_name(item) != json_type_name(first) {
                            return Err(PatchError::invalid_value(
                                index,
                                format!(
                                    "extension attribute '{key}' holds {} elements, got {}",
                                    json_type_name(first),
                                    json_type_name(item)
                                ),
                            ));
                        }
                    }
                }
                let mut merged = items;
                merged.extend(new_items);
                resource.extensions_mut().insert(key, Value::Array(merged));
                Ok(())
            }
            Some(Value::Object(fields)) => {
                let Value::Object(new_fields) = value else {
                    return Err(PatchError::invalid_value(
                        index,
                        format!(
                            "extension attribute '{key}' holds an object, got {}",
                            json_type_name(value)
                        ),
                    ));
                };
                let mut merged = fields;
                for (field, field_value) in new_fields {
                    map_insert(&mut merged, field, field_value.clone());
                }
                resource.extensions_mut().insert(key, Value::Object(merged));
                Ok(())
            }
            Some(scalar) => {
                if json_type_name(&scalar) != json_type_name(value) {
                    return Err(PatchError::invalid_value(
                        index,
                        format!(
                            "extension attribute '{key}' holds a {}, got {}",
                            json_type_name(&scalar),
                            json_type_name(value)
                        ),
                    ));
                }
                resource.extensions_mut().insert(key, value.clone());
                Ok(())
            }
        }
    }

    fn add_to_property(
        &self,
        resource: &mut Resource,
        target: &PropertyTarget<'a>,
        value: &Value,
        index: usize,
    ) -> PatchResult<()> {
        let descriptor = target.descriptor;

        // Filtered collection element without a sub-attribute hop: the value
        // object's fields merge into the matched element, first match wins.
        if let Some(matched) = target.matched_index {
            if !descriptor.is_writable(true) {
                return Err(PatchError::mutability(
                    index,
                    format!("attribute '{}' is not writable", descriptor.name()),
                ));
            }
            let converted = convert::convert_single(descriptor.definition(), value, index)?;
            let Value::Object(converted_fields) = converted else {
                return Err(PatchError::invalid_value(
                    index,
                    format!(
                        "attribute '{}' elements are complex, got {}",
                        descriptor.name(),
                        json_type_name(value)
                    ),
                ));
            };
            let parent = self.parent_of(resource, target, index)?;
            let mut items = match descriptor.get(parent) {
                Some(Value::Array(items)) => items.clone(),
                _ => return Err(target_vanished(descriptor.name(), index)),
            };
            let Some(Value::Object(element)) = items.get_mut(matched) else {
                return Err(target_vanished(descriptor.name(), index));
            };
            for (field, field_value) in converted_fields {
                map_insert(element, &field, field_value);
            }
            descriptor.set(parent, Value::Array(items));
            return Ok(());
        }

        let parent = self.parent_of(resource, target, index)?;

        if descriptor.is_multi_valued() {
            let current_items = match descriptor.get(parent) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(PatchError::invalid_value(
                        index,
                        format!(
                            "attribute '{}' holds {}, expected a collection",
                            descriptor.name(),
                            json_type_name(other)
                        ),
                    ));
                }
            };

            if current_items.is_empty() {
                if !descriptor.is_writable(false) {
                    return Err(PatchError::mutability(
                        index,
                        format!("attribute '{}' is not writable", descriptor.name()),
                    ));
                }
                let converted = convert::convert(descriptor.definition(), value, index)?;
                descriptor.set(parent, converted);
            } else {
                if !descriptor.is_readable() {
                    return Err(PatchError::mutability(
                        index,
                        format!(
                            "attribute '{}' cannot be read to extend its contents",
                            descriptor.name()
                        ),
                    ));
                }
                if !descriptor.is_writable(true) {
                    return Err(PatchError::mutability(
                        index,
                        format!("attribute '{}' is not writable", descriptor.name()),
                    ));
                }
                let elements = convert::convert_elements(descriptor.definition(), value, index)?;
                // New collection instance: existing contents plus the new
                // elements. The previously referenced array is never touched.
                let mut merged = current_items;
                merged.extend(elements);
                descriptor.set(parent, Value::Array(merged));
            }
            return Ok(());
        }

        let has_current = descriptor.get(parent).is_some_and(|v| !v.is_null());
        if !descriptor.is_writable(has_current) {
            return Err(PatchError::mutability(
                index,
                format!("attribute '{}' is not writable", descriptor.name()),
            ));
        }
        let converted = convert::convert(descriptor.definition(), value, index)?;
        descriptor.set(parent, converted);
        Ok(())
    }

    fn apply_remove(
        &self,
        resource: &mut Resource,
        path: Option<&PathExpression>,
        index: usize,
    ) -> PatchResult<()> {
        let Some(path) = path else {
            return Err(PatchError::no_target(
                index,
                "remove operation requires a path",
            ));
        };
        match self.analyzer.analyze(resource, path, index)? {
            Resolution::Extension(target) => match resource.extensions_mut().remove(&target.key) {
                Some(_) => Ok(()),
                None => Err(PatchError::no_target(
                    index,
                    format!("extension attribute '{}' has no value", target.key),
                )),
            },
            Resolution::Property(target) => self.remove_property(resource, &target, index),
        }
    }

    fn remove_property(
        &self,
        resource: &mut Resource,
        target: &PropertyTarget<'a>,
        index: usize,
    ) -> PatchResult<()> {
        let descriptor = target.descriptor;
        self.require_unique_match(target, index)?;

        if descriptor.is_required() {
            return Err(PatchError::mutability(
                index,
                format!("required attribute '{}' cannot be removed", descriptor.name()),
            ));
        }
        if !descriptor.is_writable(true) {
            return Err(PatchError::mutability(
                index,
                format!("attribute '{}' is not writable", descriptor.name()),
            ));
        }

        let parent = self.parent_of(resource, target, index)?;

        if let Some(matched) = target.matched_index {
            let mut items = match descriptor.get(parent) {
                Some(Value::Array(items)) => items.clone(),
                _ => return Err(target_vanished(descriptor.name(), index)),
            };
            if matched >= items.len() {
                return Err(target_vanished(descriptor.name(), index));
            }
            items.remove(matched);
            if items.is_empty() {
                // Removing the last element removes the attribute itself.
                descriptor.remove(parent);
            } else {
                descriptor.set(parent, Value::Array(items));
            }
            return Ok(());
        }

        let has_current = descriptor.get(parent).is_some_and(|v| !v.is_null());
        if !has_current {
            return Err(PatchError::no_target(
                index,
                format!("attribute '{}' has no value to remove", descriptor.name()),
            ));
        }
        descriptor.remove(parent);
        Ok(())
    }

    fn apply_replace(
        &self,
        resource: &mut Resource,
        path: Option<&PathExpression>,
        value: &Value,
        index: usize,
    ) -> PatchResult<()> {
        let Some(path) = path else {
            return self.apply_to_root(resource, value, index, PatchOp::Replace);
        };
        match self.analyzer.analyze(resource, path, index)? {
            Resolution::Extension(target) => {
                resource.extensions_mut().insert(target.key, value.clone());
                Ok(())
            }
            Resolution::Property(target) => {
                self.replace_property(resource, &target, value, index)
            }
        }
    }

    fn replace_property(
        &self,
        resource: &mut Resource,
        target: &PropertyTarget<'a>,
        value: &Value,
        index: usize,
    ) -> PatchResult<()> {
        let descriptor = target.descriptor;
        self.require_unique_match(target, index)?;

        // Filtered collection element: the matched element is replaced
        // wholesale with the converted value.
        if let Some(matched) = target.matched_index {
            if !descriptor.is_writable(true) {
                return Err(PatchError::mutability(
                    index,
                    format!("attribute '{}' is not writable", descriptor.name()),
                ));
            }
            let converted = convert::convert_single(descriptor.definition(), value, index)?;
            let parent = self.parent_of(resource, target, index)?;
            let mut items = match descriptor.get(parent) {
                Some(Value::Array(items)) => items.clone(),
                _ => return Err(target_vanished(descriptor.name(), index)),
            };
            if matched >= items.len() {
                return Err(target_vanished(descriptor.name(), index));
            }
            items[matched] = converted;
            descriptor.set(parent, Value::Array(items));
            return Ok(());
        }

        // Unlike add, a missing target attribute is not an error: replace
        // creates it. A missing intermediate container still fails during
        // resolution.
        let parent = self.parent_of(resource, target, index)?;
        let has_current = descriptor.get(parent).is_some_and(|v| !v.is_null());
        if !descriptor.is_writable(has_current) {
            return Err(PatchError::mutability(
                index,
                format!("attribute '{}' is not writable", descriptor.name()),
            ));
        }
        let converted = convert::convert(descriptor.definition(), value, index)?;
        descriptor.set(parent, converted);
        Ok(())
    }

    /// Singular-target operations require the final segment's filter to have
    /// matched exactly one element.
    fn require_unique_match(
        &self,
        target: &PropertyTarget<'a>,
        index: usize,
    ) -> PatchResult<()> {
        if let Some(count) = target.filter_matches {
            if count > 1 {
                return Err(PatchError::invalid_path(
                    index,
                    format!(
                        "filter on '{}' matches {count} elements; a single target is required",
                        target.descriptor.name()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn parent_of<'r>(
        &self,
        resource: &'r mut Resource,
        target: &PropertyTarget<'a>,
        index: usize,
    ) -> PatchResult<&'r mut Map<String, Value>> {
        navigate_mut(resource.data_mut(), &target.steps)
            .ok_or_else(|| target_vanished(target.descriptor.name(), index))
    }
}

fn target_vanished(attribute: &str, index: usize) -> PatchError {
    PatchError::no_target(
        index,
        format!("target '{attribute}' is no longer present on the resource"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScimErrorKind;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new().unwrap()
    }

    fn user(registry: &SchemaRegistry, data: Value) -> Resource {
        Resource::from_json(registry, "User", data).unwrap()
    }

    fn operation(op: PatchOp, path: Option<&str>, value: Value) -> PatchOperation {
        PatchOperation {
            op,
            path: path.map(|p| PathExpression::parse(p).unwrap()),
            value,
        }
    }

    #[test]
    fn test_add_then_read_round_trip() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Add, Some("nickName"), json!("Babs")),
            0,
        );
        assert!(outcome.is_applied());
        assert_eq!(resource.attribute("nickName"), Some(&json!("Babs")));
    }

    #[test]
    fn test_add_appends_to_populated_collection() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(
            &registry,
            json!({"emails": [{"value": "a@example.com", "type": "work"}]}),
        );

        let outcome = engine.apply(
            &mut resource,
            &operation(
                PatchOp::Add,
                Some("emails"),
                json!({"value": "b@example.com", "type": "home"}),
            ),
            0,
        );
        assert!(outcome.is_applied());
        let emails = resource.attribute("emails").unwrap().as_array().unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[1]["value"], json!("b@example.com"));
    }

    #[test]
    fn test_add_to_readonly_attribute_is_mutability_error() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Add, Some("id"), json!("2819c223")),
            0,
        );
        assert_eq!(
            outcome.error().unwrap().kind,
            ScimErrorKind::Mutability
        );
    }

    #[test]
    fn test_remove_requires_path() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Remove, None, Value::Null),
            0,
        );
        assert_eq!(outcome.error().unwrap().kind, ScimErrorKind::NoTarget);
    }

    #[test]
    fn test_remove_filtered_element_drops_only_that_element() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(
            &registry,
            json!({"emails": [
                {"value": "a@example.com", "type": "work"},
                {"value": "b@example.com", "type": "home"}
            ]}),
        );

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Remove, Some(r#"emails[type eq "home"]"#), Value::Null),
            0,
        );
        assert!(outcome.is_applied());
        let emails = resource.attribute("emails").unwrap().as_array().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0]["type"], json!("work"));
    }

    #[test]
    fn test_remove_last_element_removes_attribute() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(
            &registry,
            json!({"emails": [{"value": "a@example.com", "type": "work"}]}),
        );

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Remove, Some(r#"emails[type eq "work"]"#), Value::Null),
            0,
        );
        assert!(outcome.is_applied());
        assert!(resource.attribute("emails").is_none());
    }

    #[test]
    fn test_remove_required_attribute_is_mutability_error() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Remove, Some("userName"), Value::Null),
            0,
        );
        assert_eq!(outcome.error().unwrap().kind, ScimErrorKind::Mutability);
    }

    #[test]
    fn test_ambiguous_filter_rejected_for_remove_and_replace() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let data = json!({"emails": [
            {"value": "a@example.com", "type": "home"},
            {"value": "b@example.com", "type": "home"}
        ]});

        let mut resource = user(&registry, data.clone());
        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Remove, Some(r#"emails[type eq "home"]"#), Value::Null),
            0,
        );
        assert_eq!(outcome.error().unwrap().kind, ScimErrorKind::InvalidPath);

        let mut resource = user(&registry, data);
        let outcome = engine.apply(
            &mut resource,
            &operation(
                PatchOp::Replace,
                Some(r#"emails[type eq "home"].value"#),
                json!("c@example.com"),
            ),
            0,
        );
        assert_eq!(outcome.error().unwrap().kind, ScimErrorKind::InvalidPath);
    }

    #[test]
    fn test_replace_creates_missing_singular_attribute() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Replace, Some("title"), json!("Tour Guide")),
            0,
        );
        assert!(outcome.is_applied());
        assert_eq!(resource.attribute("title"), Some(&json!("Tour Guide")));
    }

    #[test]
    fn test_replace_whole_collection() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(
            &registry,
            json!({"emails": [
                {"value": "a@example.com", "type": "work"},
                {"value": "b@example.com", "type": "home"}
            ]}),
        );

        let outcome = engine.apply(
            &mut resource,
            &operation(
                PatchOp::Replace,
                Some("emails"),
                json!([{"value": "only@example.com", "type": "other"}]),
            ),
            0,
        );
        assert!(outcome.is_applied());
        let emails = resource.attribute("emails").unwrap().as_array().unwrap();
        assert_eq!(emails.len(), 1);
    }

    #[test]
    fn test_extension_add_semantics() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({}));

        // Absent key: raw insert
        assert!(
            engine
                .apply(
                    &mut resource,
                    &operation(PatchOp::Add, Some("badgeCodes"), json!(["A1"])),
                    0
                )
                .is_applied()
        );
        // Existing array: append
        assert!(
            engine
                .apply(
                    &mut resource,
                    &operation(PatchOp::Add, Some("badgeCodes"), json!("B2")),
                    1
                )
                .is_applied()
        );
        assert_eq!(
            resource.extensions().get("badgecodes"),
            Some(&json!(["A1", "B2"]))
        );
        // Existing array, mismatched element kind
        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Add, Some("badgeCodes"), json!(7)),
            2,
        );
        assert_eq!(outcome.error().unwrap().kind, ScimErrorKind::InvalidValue);

        // Existing scalar: type-checked replace
        assert!(
            engine
                .apply(
                    &mut resource,
                    &operation(PatchOp::Add, Some("favoriteColor"), json!("teal")),
                    3
                )
                .is_applied()
        );
        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Add, Some("favoriteColor"), json!(42)),
            4,
        );
        assert_eq!(outcome.error().unwrap().kind, ScimErrorKind::InvalidValue);
    }

    #[test]
    fn test_fail_fast_aborts_batch() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let request = PatchRequest {
            operations: vec![
                operation(PatchOp::Add, Some("nickName"), json!("Babs")),
                operation(PatchOp::Add, Some("id"), json!("x")),
                operation(PatchOp::Add, Some("title"), json!("Tour Guide")),
            ],
        };
        let error = engine.apply_request(&mut resource, &request).unwrap_err();
        assert_eq!(error.kind, ScimErrorKind::Mutability);
        assert_eq!(error.operation_index, 1);
        // First operation applied, third never attempted
        assert_eq!(resource.attribute("nickName"), Some(&json!("Babs")));
        assert!(resource.attribute("title").is_none());
    }

    #[test]
    fn test_collect_errors_processes_whole_batch() {
        let registry = registry();
        let engine = PatchEngine::with_policy(&registry, ErrorPolicy::CollectErrors);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let request = PatchRequest {
            operations: vec![
                operation(PatchOp::Add, Some("nickName"), json!("Babs")),
                operation(PatchOp::Add, Some("id"), json!("x")),
                operation(PatchOp::Add, Some("title"), json!("Tour Guide")),
            ],
        };
        let outcomes = engine.apply_request(&mut resource, &request).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_applied());
        assert_eq!(
            outcomes[1].error().unwrap().kind,
            ScimErrorKind::Mutability
        );
        assert!(outcomes[2].is_applied());
        assert_eq!(resource.attribute("title"), Some(&json!("Tour Guide")));
    }

    #[test]
    fn test_batch_order_last_write_wins() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let request = PatchRequest {
            operations: vec![
                operation(PatchOp::Add, Some("displayName"), json!("First")),
                operation(PatchOp::Add, Some("displayName"), json!("Second")),
            ],
        };
        engine.apply_request(&mut resource, &request).unwrap();
        assert_eq!(resource.attribute("displayName"), Some(&json!("Second")));
    }

    #[test]
    fn test_failed_outcome_carries_path_string() {
        let registry = registry();
        let engine = PatchEngine::new(&registry);
        let mut resource = user(&registry, json!({"userName": "jdoe"}));

        let outcome = engine.apply(
            &mut resource,
            &operation(PatchOp::Add, Some("name.familyName"), json!("Jensen")),
            0,
        );
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ScimErrorKind::InvalidPath);
        assert_eq!(error.path.as_deref(), Some("name.familyName"));
    }
}
