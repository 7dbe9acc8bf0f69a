//! Operation types: attributes, attribute sets, UIDs, and connector objects.

use crate::value::AttributeValue;

/// One named external attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An insertion-ordered set of attributes for create and patch operations.
///
/// Iteration order is the order attributes were added, which keeps apply
/// behavior deterministic when a schema rejects an unknown name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    entries: Vec<Attribute>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute value, replacing any existing value for the name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Attribute { name, value }),
        }
    }

    /// Set an attribute using builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|a| a.name == name)
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    /// Get all attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|a| a.name.as_str())
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut set = Self::new();
        for attr in iter {
            set.set(attr.name, attr.value);
        }
        set
    }
}

/// Unique identifier of an object in the target system, with an optional
/// human-readable name hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid {
    value: String,
    name_hint: Option<String>,
}

impl Uid {
    /// Create a new UID.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name_hint: None,
        }
    }

    /// Create a new UID carrying the object's display name as a hint.
    pub fn with_hint(value: impl Into<String>, name_hint: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name_hint: Some(name_hint.into()),
        }
    }

    /// Get the identifier value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the display-name hint, if one was captured.
    pub fn name_hint(&self) -> Option<&str> {
        self.name_hint.as_deref()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// A materialized attribute on a connector object.
///
/// `complete` is false when the attribute is known to exist but its value
/// was not fetched (partial projection); the empty value then means "not
/// fetched", not "resource has no value".
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttribute {
    pub name: String,
    pub values: Vec<AttributeValue>,
    pub complete: bool,
}

impl ObjectAttribute {
    /// A fully-fetched attribute.
    pub fn complete(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values,
            complete: true,
        }
    }

    /// A present-but-unfetched attribute with an empty value.
    pub fn incomplete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            complete: false,
        }
    }
}

/// The external representation of one target-system object.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorObject {
    pub object_class: String,
    pub uid: Uid,
    pub name: String,
    pub attributes: Vec<ObjectAttribute>,
}

impl ConnectorObject {
    /// Look up a materialized attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&ObjectAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up the first value of an attribute.
    pub fn value(&self, name: &str) -> Option<&AttributeValue> {
        self.attribute(name).and_then(|a| a.values.first())
    }
}
