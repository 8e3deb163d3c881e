//! Path resolution against a concrete resource instance.
//!
//! The [`TreeAnalyzer`] walks a parsed [`PathExpression`] over a resource,
//! consulting the schema-built [`PropertyResolver`] at every hop and
//! evaluating filter predicates against multi-valued attributes. The outcome
//! is a [`Resolution`]: either a typed property target (navigation steps plus
//! the final attribute's descriptor) or a dynamic extension-container key.
//! Failure kinds are diagnostic categories returned as errors, never panics.

use super::path::{FilterClause, FilterOperator, PathExpression, PathSegment};
use super::resolver::{PropertyDescriptor, PropertyResolver};
use crate::error::{PatchError, PatchResult};
use crate::resource::{Resource, map_get, map_get_mut};
use crate::schema::{AttributeDefinition, AttributeType, SchemaRegistry};

use chrono::{DateTime, FixedOffset};
use log::debug;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// One navigation hop from the resource data root to a resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Descend into a named attribute of the current object
    Attribute(String),
    /// Descend into the element at the given index of the current array
    Element(usize),
}

/// A resolved, schema-backed patch target.
#[derive(Debug, Clone)]
pub struct PropertyTarget<'a> {
    /// Hops from the resource data root to the object owning the attribute
    pub steps: Vec<Step>,
    /// Descriptor of the addressed attribute on that owner
    pub descriptor: PropertyDescriptor<'a>,
    /// Element selected by a filter on the final segment, when the path stops
    /// at the collection itself rather than a sub-attribute of the element
    pub matched_index: Option<usize>,
    /// How many elements the final segment's filter matched, when it had one.
    /// Singular-target operations use this to enforce uniqueness.
    pub filter_matches: Option<usize>,
}

/// A patch target falling through to the extension container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTarget {
    /// Raw attribute key as given by the client
    pub key: String,
}

/// Outcome of resolving a path against a resource.
#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    /// Static, typed target backed by a schema descriptor
    Property(PropertyTarget<'a>),
    /// Dynamic, name-keyed target in the extension container
    Extension(ExtensionTarget),
}

/// Resolves path expressions against resource instances.
///
/// Resolution is read-only; mutation happens afterwards in the engine via
/// [`navigate_mut`] over the returned steps.
#[derive(Debug, Clone, Copy)]
pub struct TreeAnalyzer<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> TreeAnalyzer<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `path` against `resource`.
    ///
    /// `operation_index` is carried into any produced error. Unknown
    /// attributes resolve to the extension container only for bare
    /// single-segment paths; everything else must be schema-backed.
    pub fn analyze(
        &self,
        resource: &Resource,
        path: &PathExpression,
        operation_index: usize,
    ) -> PatchResult<Resolution<'a>> {
        let mut resolver = PropertyResolver::for_resource_type(self.registry, resource.resource_type())
            .map_err(|e| PatchError::invalid_path(operation_index, e.to_string()))?;

        let segments = path.segments();
        let mut steps: Vec<Step> = Vec::new();
        // Borrow of the current object being resolved against. Starts at the
        // resource data root and descends as steps are recorded.
        let mut current: &Map<String, Value> = resource.data();

        for (position, segment) in segments.iter().enumerate() {
            let is_last = position + 1 == segments.len();

            let Some(descriptor) = resolver.resolve(segment.name()) else {
                if position == 0 && is_last && matches!(segment, PathSegment::Attribute(_)) {
                    debug!(
                        "path '{path}' has no descriptor on {}, using extension container",
                        resource.resource_type()
                    );
                    return Ok(Resolution::Extension(ExtensionTarget {
                        key: segment.name().to_string(),
                    }));
                }
                return Err(PatchError::invalid_path(
                    operation_index,
                    format!(
                        "attribute '{}' is not defined for resource type '{}'",
                        segment.name(),
                        resource.resource_type()
                    ),
                ));
            };

            match segment {
                PathSegment::Attribute(_) => {
                    if is_last {
                        return Ok(Resolution::Property(PropertyTarget {
                            steps,
                            descriptor,
                            matched_index: None,
                            filter_matches: None,
                        }));
                    }
                    current = self.descend(
                        &mut steps,
                        current,
                        &descriptor,
                        operation_index,
                    )?;
                    resolver = descriptor.element_resolver();
                }
                PathSegment::FilteredAttribute {
                    filter,
                    sub_attribute,
                    ..
                } => {
                    let (index, count) =
                        self.select_element(current, &descriptor, filter, operation_index)?;

                    match sub_attribute {
                        None if is_last => {
                            return Ok(Resolution::Property(PropertyTarget {
                                steps,
                                descriptor,
                                matched_index: Some(index),
                                filter_matches: Some(count),
                            }));
                        }
                        None => {
                            // The grammar folds a post-bracket hop into the
                            // segment, so a filtered segment without one can
                            // only continue via a fresh dotted segment.
                            steps.push(Step::Attribute(descriptor.name().to_string()));
                            steps.push(Step::Element(index));
                            let element = element_at(current, &descriptor, index);
                            current = element.ok_or_else(|| {
                                PatchError::invalid_path(
                                    operation_index,
                                    format!("'{}' element is not a complex value", descriptor.name()),
                                )
                            })?;
                            resolver = descriptor.element_resolver();
                        }
                        Some(sub) => {
                            let sub_descriptor =
                                descriptor.sub_descriptor(sub).ok_or_else(|| {
                                    PatchError::invalid_path(
                                        operation_index,
                                        format!(
                                            "attribute '{}' has no sub-attribute '{sub}'",
                                            descriptor.name()
                                        ),
                                    )
                                })?;
                            steps.push(Step::Attribute(descriptor.name().to_string()));
                            steps.push(Step::Element(index));

                            if is_last {
                                return Ok(Resolution::Property(PropertyTarget {
                                    steps,
                                    descriptor: sub_descriptor,
                                    matched_index: None,
                                    filter_matches: Some(count),
                                }));
                            }
                            let element = element_at(current, &descriptor, index)
                                .ok_or_else(|| {
                                    PatchError::invalid_path(
                                        operation_index,
                                        format!("'{}' element is not a complex value", descriptor.name()),
                                    )
                                })?;
                            current =
                                self.descend(&mut steps, element, &sub_descriptor, operation_index)?;
                            resolver = sub_descriptor.element_resolver();
                        }
                    }
                }
            }
        }

        // segments is non-empty by construction, so the loop always returns.
        unreachable!("path expression resolved without producing a target")
    }

    /// Descend through an intermediate complex attribute, recording the step.
    ///
    /// The intermediate container must already exist: PATCH does not create
    /// parents on the way to a nested target, and its absence is classified
    /// `invalidPath` on every code path.
    fn descend<'v>(
        &self,
        steps: &mut Vec<Step>,
        current: &'v Map<String, Value>,
        descriptor: &PropertyDescriptor<'a>,
        operation_index: usize,
    ) -> PatchResult<&'v Map<String, Value>> {
        if descriptor.is_multi_valued() {
            return Err(PatchError::invalid_path(
                operation_index,
                format!(
                    "multi-valued attribute '{}' requires a filter to select an element",
                    descriptor.name()
                ),
            ));
        }
        if descriptor.data_type() != AttributeType::Complex {
            return Err(PatchError::invalid_path(
                operation_index,
                format!("attribute '{}' is not a complex attribute", descriptor.name()),
            ));
        }
        match descriptor.get(current) {
            Some(Value::Object(map)) => {
                steps.push(Step::Attribute(descriptor.name().to_string()));
                Ok(map)
            }
            Some(Value::Null) | None => Err(PatchError::invalid_path(
                operation_index,
                format!("intermediate attribute '{}' has no value", descriptor.name()),
            )),
            Some(_) => Err(PatchError::invalid_path(
                operation_index,
                format!("attribute '{}' does not hold a complex value", descriptor.name()),
            )),
        }
    }

    /// Evaluate a filter against the current value of a multi-valued
    /// attribute. Elements are tested in declaration order and the first
    /// match wins; the total match count is reported for uniqueness checks.
    fn select_element(
        &self,
        current: &Map<String, Value>,
        descriptor: &PropertyDescriptor<'a>,
        filter: &FilterClause,
        operation_index: usize,
    ) -> PatchResult<(usize, usize)> {
        if !descriptor.is_multi_valued() {
            return Err(PatchError::invalid_path(
                operation_index,
                format!(
                    "filter applied to single-valued attribute '{}'",
                    descriptor.name()
                ),
            ));
        }
        let filter_attr = descriptor
            .sub_descriptor(&filter.attribute)
            .ok_or_else(|| {
                PatchError::invalid_path(
                    operation_index,
                    format!(
                        "filter attribute '{}' is not defined on '{}' elements",
                        filter.attribute,
                        descriptor.name()
                    ),
                )
            })?;

        let items = match descriptor.get(current) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => {
                return Err(PatchError::no_target(
                    operation_index,
                    format!("attribute '{}' has no elements to match", descriptor.name()),
                ));
            }
            Some(_) => {
                return Err(PatchError::invalid_path(
                    operation_index,
                    format!("attribute '{}' does not hold a collection", descriptor.name()),
                ));
            }
        };

        let matches: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, element)| filter_matches(element, filter, filter_attr.definition()))
            .map(|(index, _)| index)
            .collect();

        debug!(
            "filter [{filter}] on '{}' matched {} of {} element(s)",
            descriptor.name(),
            matches.len(),
            items.len()
        );

        match matches.first() {
            Some(&first) => Ok((first, matches.len())),
            None => Err(PatchError::no_target(
                operation_index,
                format!("no '{}' element matches [{filter}]", descriptor.name()),
            )),
        }
    }
}

fn element_at<'v>(
    current: &'v Map<String, Value>,
    descriptor: &PropertyDescriptor<'_>,
    index: usize,
) -> Option<&'v Map<String, Value>> {
    match descriptor.get(current) {
        Some(Value::Array(items)) => items.get(index).and_then(Value::as_object),
        _ => None,
    }
}

/// Navigate mutably from a resource data root along previously resolved
/// steps, yielding the object that owns the target attribute.
///
/// Returns `None` when the structure changed shape since resolution; callers
/// treat that as the target having vanished.
pub(crate) fn navigate_mut<'v>(
    root: &'v mut Map<String, Value>,
    steps: &[Step],
) -> Option<&'v mut Map<String, Value>> {
    let Some(first) = steps.first() else {
        return Some(root);
    };
    let mut value: &mut Value = match first {
        Step::Attribute(name) => map_get_mut(root, name)?,
        Step::Element(_) => return None,
    };
    for step in &steps[1..] {
        value = match step {
            Step::Attribute(name) => map_get_mut(value.as_object_mut()?, name)?,
            Step::Element(index) => value.as_array_mut()?.get_mut(*index)?,
        };
    }
    value.as_object_mut()
}

/// Evaluate one filter predicate against a collection element.
fn filter_matches(element: &Value, clause: &FilterClause, attr: &AttributeDefinition) -> bool {
    let Some(element) = element.as_object() else {
        return false;
    };
    let value = map_get(element, &clause.attribute);

    match clause.operator {
        FilterOperator::Present => value.is_some_and(is_present),
        FilterOperator::Equal => match (value, &clause.comparand) {
            (Some(value), Some(comparand)) => values_equal(value, comparand, attr.case_exact),
            (None, Some(Value::Null)) => true,
            _ => false,
        },
        FilterOperator::NotEqual => match (value, &clause.comparand) {
            (Some(value), Some(comparand)) => !values_equal(value, comparand, attr.case_exact),
            (None, Some(Value::Null)) => false,
            _ => true,
        },
        FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
            let (Some(Value::String(value)), Some(Value::String(comparand))) =
                (value, clause.comparand.as_ref())
            else {
                return false;
            };
            let (value, comparand) = if attr.case_exact {
                (value.clone(), comparand.clone())
            } else {
                (value.to_lowercase(), comparand.to_lowercase())
            };
            match clause.operator {
                FilterOperator::Contains => value.contains(&comparand),
                FilterOperator::StartsWith => value.starts_with(&comparand),
                _ => value.ends_with(&comparand),
            }
        }
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual
        | FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual => {
            let (Some(value), Some(comparand)) = (value, clause.comparand.as_ref()) else {
                return false;
            };
            let Some(ordering) = compare_order(value, comparand, attr) else {
                return false;
            };
            match clause.operator {
                FilterOperator::GreaterThan => ordering == Ordering::Greater,
                FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                FilterOperator::LessThan => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            }
        }
    }
}

/// Presence per the protocol: a value exists and is non-empty.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Natural equality with case-insensitive string comparison per protocol
/// convention, unless the attribute declares `caseExact`.
fn values_equal(left: &Value, right: &Value, case_exact: bool) -> bool {
    match (left, right) {
        (Value::String(left), Value::String(right)) => {
            if case_exact {
                left == right
            } else {
                left.eq_ignore_ascii_case(right)
            }
        }
        (Value::Number(left), Value::Number(right)) => match (left.as_f64(), right.as_f64()) {
            (Some(left), Some(right)) => left == right,
            _ => left == right,
        },
        (left, right) => left == right,
    }
}

/// Type-aware ordering: numeric for numbers, chronological for `dateTime`
/// attributes, lexicographic for other strings. Non-comparable pairs yield
/// `None`, which makes every ordering operator false.
fn compare_order(left: &Value, right: &Value, attr: &AttributeDefinition) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        (Value::String(left), Value::String(right)) => {
            if attr.data_type == AttributeType::DateTime {
                let left = DateTime::<FixedOffset>::parse_from_rfc3339(left).ok()?;
                let right = DateTime::<FixedOffset>::parse_from_rfc3339(right).ok()?;
                Some(left.cmp(&right))
            } else if attr.case_exact {
                Some(left.cmp(right))
            } else {
                Some(left.to_lowercase().cmp(&right.to_lowercase()))
            }
        }
        _ => None,
    }
}
