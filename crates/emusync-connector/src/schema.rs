//! Schema definitions: ordered mapper collections with bulk operations.
//!
//! A [`SchemaDefinition`] is the per-resource contract the REST layer and
//! the resource handlers program against: it applies external attributes to
//! create destinations, turns replace deltas into patch payloads, and
//! materializes wire objects into connector objects with partial-fetch
//! semantics. Every schema carries exactly one identity mapper (the stable
//! unique id) and exactly one display-name mapper (the unique, updatable
//! handle used for name lookups).

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConnectorError, ConnectorResult};
use crate::mapping::AttributeMapper;
use crate::operation::{AttributeSet, ConnectorObject, ObjectAttribute, Uid};
use crate::value::AttributeValue;

/// Builder for [`SchemaDefinition`].
pub struct SchemaBuilder<D, U, S> {
    object_class: String,
    mappers: Vec<AttributeMapper<D, U, S>>,
    identity: Option<usize>,
    display_name: Option<usize>,
}

impl<D, U, S> SchemaBuilder<D, U, S> {
    /// Start a schema for the given object class.
    pub fn new(object_class: impl Into<String>) -> Self {
        Self {
            object_class: object_class.into(),
            mappers: Vec::new(),
            identity: None,
            display_name: None,
        }
    }

    /// Add the identity mapper: the stable, non-updatable unique id.
    pub fn identity(mut self, mapper: AttributeMapper<D, U, S>) -> Self {
        self.identity = Some(self.mappers.len());
        self.mappers.push(mapper);
        self
    }

    /// Add the display-name mapper: the unique handle used for name lookups.
    pub fn display_name(mut self, mapper: AttributeMapper<D, U, S>) -> Self {
        self.display_name = Some(self.mappers.len());
        self.mappers.push(mapper);
        self
    }

    /// Add a plain attribute mapper.
    pub fn add(mut self, mapper: AttributeMapper<D, U, S>) -> Self {
        self.mappers.push(mapper);
        self
    }

    /// Validate and build the immutable schema.
    pub fn build(self) -> ConnectorResult<SchemaDefinition<D, U, S>> {
        let identity = self.identity.ok_or_else(|| {
            ConnectorError::invalid_configuration(format!(
                "schema '{}' has no identity mapper",
                self.object_class
            ))
        })?;
        let display_name = self.display_name.ok_or_else(|| {
            ConnectorError::invalid_configuration(format!(
                "schema '{}' has no display-name mapper",
                self.object_class
            ))
        })?;
        // Identity must be stable across the object lifetime.
        if self.mappers[identity].flags().updatable {
            return Err(ConnectorError::invalid_configuration(format!(
                "identity attribute '{}' must not be updatable",
                self.mappers[identity].name()
            )));
        }

        let mut seen = HashSet::new();
        for mapper in &self.mappers {
            if !seen.insert(mapper.name().to_string()) {
                return Err(ConnectorError::invalid_configuration(format!(
                    "duplicate attribute '{}' in schema '{}'",
                    mapper.name(),
                    self.object_class
                )));
            }
        }

        // Memoized view: attributes included when the caller requests no
        // explicit projection. Identity and display name are always in.
        let returned_by_default = self
            .mappers
            .iter()
            .enumerate()
            .filter(|(idx, m)| {
                *idx == identity
                    || *idx == display_name
                    || (m.flags().readable && m.flags().returned_by_default)
            })
            .map(|(_, m)| (m.name().to_string(), m.fetch_field_name().to_string()))
            .collect();

        debug!(
            object_class = %self.object_class,
            attributes = self.mappers.len(),
            "constructed schema definition"
        );

        Ok(SchemaDefinition {
            object_class: self.object_class,
            mappers: self.mappers,
            identity,
            display_name,
            returned_by_default,
        })
    }
}

/// An ordered, name-unique collection of attribute mappers for one resource
/// type. Built once, immutable, shared across requests.
pub struct SchemaDefinition<D, U, S> {
    object_class: String,
    mappers: Vec<AttributeMapper<D, U, S>>,
    identity: usize,
    display_name: usize,
    returned_by_default: Vec<(String, String)>,
}

impl<D, U, S> std::fmt::Debug for SchemaDefinition<D, U, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDefinition")
            .field("object_class", &self.object_class)
            .field("identity", &self.identity)
            .field("display_name", &self.display_name)
            .field("returned_by_default", &self.returned_by_default)
            .finish_non_exhaustive()
    }
}

impl<D, U, S> SchemaDefinition<D, U, S> {
    /// Get the object class name.
    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    /// Get the identity attribute name.
    pub fn identity_attribute(&self) -> &str {
        self.mappers[self.identity].name()
    }

    /// Get the display-name attribute name.
    pub fn display_name_attribute(&self) -> &str {
        self.mappers[self.display_name].name()
    }

    /// The `(name, fetch field)` pairs included in a default projection.
    /// Identity and display name are always present regardless of flags.
    pub fn returned_by_default(&self) -> &[(String, String)] {
        &self.returned_by_default
    }

    /// Resolve the fetch field for a logical attribute name.
    pub fn fetch_field_of(&self, name: &str) -> Option<&str> {
        self.mapper(name).map(|m| m.fetch_field_name())
    }

    fn mapper(&self, name: &str) -> Option<&AttributeMapper<D, U, S>> {
        self.mappers.iter().find(|m| m.matches_name(name))
    }

    /// Reject the first attribute name the schema does not declare.
    ///
    /// Runs before any destination mutation so an unknown name can never
    /// cause partial writes; insertion order makes the rejection
    /// deterministic.
    fn reject_unknown(&self, attrs: &AttributeSet) -> ConnectorResult<()> {
        for attr in attrs.iter() {
            if self.mapper(&attr.name).is_none() {
                return Err(ConnectorError::unknown_attribute(
                    &attr.name,
                    &self.object_class,
                ));
            }
        }
        Ok(())
    }

    /// Apply external attributes to a create destination.
    pub fn apply(&self, attrs: &AttributeSet, dest: &mut D) -> ConnectorResult<()> {
        self.reject_unknown(attrs)?;
        for attr in attrs.iter() {
            if let Some(mapper) = self.mapper(&attr.name) {
                mapper.apply_create(attr, dest)?;
            }
        }
        Ok(())
    }

    /// Apply replace deltas to an update destination.
    ///
    /// Returns whether any mapper actually wrote a change, so the caller can
    /// skip the remote PATCH when nothing changed.
    pub fn apply_delta(&self, deltas: &AttributeSet, dest: &mut U) -> ConnectorResult<bool> {
        self.reject_unknown(deltas)?;
        let mut changed = false;
        for delta in deltas.iter() {
            if let Some(mapper) = self.mapper(&delta.name) {
                changed |= mapper.apply_replace(delta, dest)?;
            }
        }
        Ok(changed)
    }

    /// Materialize a wire object into its external representation.
    ///
    /// Identity and display name are mandatory in every representation.
    /// When `allow_partial` is true, a readable attribute that is neither
    /// returned by default nor explicitly requested is emitted as
    /// present-but-incomplete (empty value) instead of being read, which
    /// lets callers distinguish "not fetched" from "no value".
    pub fn materialize(
        &self,
        source: &S,
        requested: Option<&HashSet<String>>,
        allow_partial: bool,
    ) -> ConnectorResult<ConnectorObject> {
        let uid_value = self.read_mandatory(self.identity, source)?;
        let name_value = self.read_mandatory(self.display_name, source)?;
        let uid = Uid::with_hint(uid_value, name_value.clone());

        let mut attributes = Vec::with_capacity(self.mappers.len());
        for (idx, mapper) in self.mappers.iter().enumerate() {
            let mandatory = idx == self.identity || idx == self.display_name;
            if !mandatory && !mapper.flags().readable {
                continue;
            }

            let explicitly_requested = requested
                .map(|names| names.contains(mapper.name()))
                .unwrap_or(false);
            let fetched = mandatory
                || mapper.flags().returned_by_default
                || explicitly_requested
                || !allow_partial;

            if !fetched {
                attributes.push(ObjectAttribute::incomplete(mapper.name()));
                continue;
            }

            if let Some(attr) = mapper.read(source)? {
                attributes.push(ObjectAttribute::complete(attr.name, flatten(attr.value)));
            } else if mandatory {
                return Err(ConnectorError::invalid_attribute_value(
                    mapper.name(),
                    "mandatory attribute is missing from the source object",
                ));
            }
        }

        Ok(ConnectorObject {
            object_class: self.object_class.clone(),
            uid,
            name: name_value,
            attributes,
        })
    }

    fn read_mandatory(&self, idx: usize, source: &S) -> ConnectorResult<String> {
        let mapper = &self.mappers[idx];
        let attr = mapper.read(source)?.ok_or_else(|| {
            ConnectorError::invalid_attribute_value(
                mapper.name(),
                "mandatory attribute is missing from the source object",
            )
        })?;
        scalar_string(&attr.value).ok_or_else(|| {
            ConnectorError::invalid_attribute_value(
                mapper.name(),
                "mandatory attribute is not a scalar",
            )
        })
    }
}

fn flatten(value: AttributeValue) -> Vec<AttributeValue> {
    match value {
        AttributeValue::Array(values) => values,
        other => vec![other],
    }
}

fn scalar_string(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::String(s) => Some(s.clone()),
        AttributeValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}
