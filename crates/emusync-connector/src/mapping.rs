//! Attribute mapping: one declarative binding per logical attribute.
//!
//! An [`AttributeMapper`] ties a logical attribute name to the three ways a
//! value moves between the external attribute model and a typed wire object:
//! a create setter, an incremental replace setter, and a read getter. Any of
//! the three may be absent; the missing direction is a silent no-op rather
//! than an error, which is what lets one schema describe read-only metadata
//! and write-only credentials alike.
//!
//! Mappers are built once at schema construction time and never mutated, so
//! a single instance is shared by every request for its resource type.

use crate::error::ConnectorResult;
use crate::operation::Attribute;
use crate::value::{coerce_for_read, coerce_for_write, AttributeType, AttributeValue, DateFormats};

/// Setter invoked on create with the coerced value and the wire object.
pub type CreateSetter<D> = Box<dyn Fn(&AttributeValue, &mut D) + Send + Sync>;

/// Setter invoked on incremental replace with the coerced value and the
/// patch destination. Add/remove-style list deltas are resource-specific
/// and stay with the caller.
pub type ReplaceSetter<U> = Box<dyn Fn(&AttributeValue, &mut U) + Send + Sync>;

/// Getter producing the raw wire value for an attribute, or `None` when the
/// source object carries no value.
pub type ReadGetter<S> = Box<dyn Fn(&S) -> Option<AttributeValue> + Send + Sync>;

/// Visibility flags for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFlags {
    pub creatable: bool,
    pub updatable: bool,
    pub readable: bool,
    pub returned_by_default: bool,
    pub required: bool,
}

impl Default for AttributeFlags {
    fn default() -> Self {
        Self {
            creatable: true,
            updatable: true,
            readable: true,
            returned_by_default: true,
            required: false,
        }
    }
}

/// One declarative binding of a logical attribute.
pub struct AttributeMapper<D, U, S> {
    name: String,
    fetch_field: Option<String>,
    attr_type: AttributeType,
    create: Option<CreateSetter<D>>,
    replace: Option<ReplaceSetter<U>>,
    read: Option<ReadGetter<S>>,
    flags: AttributeFlags,
    formats: DateFormats,
}

impl<D, U, S> AttributeMapper<D, U, S> {
    /// Create a mapper with no setters, no getter, and default flags.
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            fetch_field: None,
            attr_type,
            create: None,
            replace: None,
            read: None,
            flags: AttributeFlags::default(),
            formats: DateFormats::default(),
        }
    }

    /// Bind the create setter.
    pub fn on_create(mut self, setter: impl Fn(&AttributeValue, &mut D) + Send + Sync + 'static) -> Self {
        self.create = Some(Box::new(setter));
        self
    }

    /// Bind the incremental replace setter.
    pub fn on_replace(
        mut self,
        setter: impl Fn(&AttributeValue, &mut U) + Send + Sync + 'static,
    ) -> Self {
        self.replace = Some(Box::new(setter));
        self
    }

    /// Bind the read getter.
    pub fn on_read(
        mut self,
        getter: impl Fn(&S) -> Option<AttributeValue> + Send + Sync + 'static,
    ) -> Self {
        self.read = Some(Box::new(getter));
        self
    }

    /// Set the field name used to request partial projections.
    pub fn fetch_field(mut self, field: impl Into<String>) -> Self {
        self.fetch_field = Some(field.into());
        self
    }

    /// Override the date formatters for this attribute.
    pub fn date_formats(mut self, formats: DateFormats) -> Self {
        self.formats = formats;
        self
    }

    /// Mark the attribute as not settable on create.
    pub fn not_creatable(mut self) -> Self {
        self.flags.creatable = false;
        self
    }

    /// Mark the attribute as not settable on update.
    pub fn not_updatable(mut self) -> Self {
        self.flags.updatable = false;
        self
    }

    /// Mark the attribute as not readable.
    pub fn not_readable(mut self) -> Self {
        self.flags.readable = false;
        self.flags.returned_by_default = false;
        self
    }

    /// Mark the attribute as excluded from default projections.
    pub fn not_returned_by_default(mut self) -> Self {
        self.flags.returned_by_default = false;
        self
    }

    /// Mark the attribute as required on create.
    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    /// Get the logical attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared type.
    pub fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    /// Get the fetch field, falling back to the attribute name.
    pub fn fetch_field_name(&self) -> &str {
        self.fetch_field.as_deref().unwrap_or(&self.name)
    }

    /// Get the visibility flags.
    pub fn flags(&self) -> &AttributeFlags {
        &self.flags
    }

    /// Whether name matching for this attribute ignores case.
    pub fn matches_name(&self, name: &str) -> bool {
        if self.attr_type.is_case_insensitive() {
            self.name.eq_ignore_ascii_case(name)
        } else {
            self.name == name
        }
    }

    /// Apply one external attribute to a create destination.
    ///
    /// A mapper without a create setter silently ignores the value.
    pub fn apply_create(&self, attribute: &Attribute, dest: &mut D) -> ConnectorResult<()> {
        let Some(setter) = &self.create else {
            return Ok(());
        };
        let value = coerce_for_write(&self.name, self.attr_type, &attribute.value, &self.formats)?;
        setter(&value, dest);
        Ok(())
    }

    /// Apply one replace delta to an update destination.
    ///
    /// Returns whether a setter actually ran, so the schema can report
    /// whether anything changed.
    pub fn apply_replace(&self, delta: &Attribute, dest: &mut U) -> ConnectorResult<bool> {
        let Some(setter) = &self.replace else {
            return Ok(false);
        };
        let value = coerce_for_write(&self.name, self.attr_type, &delta.value, &self.formats)?;
        setter(&value, dest);
        Ok(true)
    }

    /// Read this attribute from a wire object.
    ///
    /// No getter, or a getter yielding `None`/null, produces no attribute.
    pub fn read(&self, source: &S) -> ConnectorResult<Option<Attribute>> {
        let Some(getter) = &self.read else {
            return Ok(None);
        };
        let Some(raw) = getter(source) else {
            return Ok(None);
        };
        let coerced = coerce_for_read(&self.name, self.attr_type, raw, &self.formats)?;
        Ok(coerced.map(|value| Attribute {
            name: self.name.clone(),
            value,
        }))
    }
}

impl<D, U, S> std::fmt::Debug for AttributeMapper<D, U, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeMapper")
            .field("name", &self.name)
            .field("type", &self.attr_type)
            .field("fetch_field", &self.fetch_field)
            .field("creatable", &(self.create.is_some() && self.flags.creatable))
            .field("updatable", &(self.replace.is_some() && self.flags.updatable))
            .field("readable", &(self.read.is_some() && self.flags.readable))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Default)]
    struct Dest {
        login: Option<String>,
        active: Option<bool>,
        since: Option<String>,
    }

    #[derive(Default)]
    struct Patch {
        last: Option<(String, String)>,
    }

    struct Source {
        login: Option<String>,
        created: Option<String>,
    }

    fn login_mapper() -> AttributeMapper<Dest, Patch, Source> {
        AttributeMapper::new("login", AttributeType::StringCaseIgnore)
            .on_create(|v, d: &mut Dest| d.login = v.as_string().map(String::from))
            .on_replace(|v, p: &mut Patch| {
                p.last = Some(("login".into(), v.as_string().unwrap_or_default().into()))
            })
            .on_read(|s: &Source| s.login.clone().map(AttributeValue::from))
    }

    #[test]
    fn test_apply_create_sets_value() {
        let mapper = login_mapper();
        let mut dest = Dest::default();
        mapper
            .apply_create(&Attribute::new("login", "JDoe"), &mut dest)
            .unwrap();
        assert_eq!(dest.login.as_deref(), Some("JDoe"));
    }

    #[test]
    fn test_missing_create_setter_is_a_silent_noop() {
        let mapper: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("id", AttributeType::Uuid)
                .on_read(|s: &Source| s.login.clone().map(AttributeValue::from));
        let mut dest = Dest::default();
        mapper
            .apply_create(&Attribute::new("id", "ignored"), &mut dest)
            .unwrap();
        assert!(dest.login.is_none());
    }

    #[test]
    fn test_apply_replace_reports_whether_it_ran() {
        let mapper = login_mapper();
        let mut patch = Patch::default();
        let changed = mapper
            .apply_replace(&Attribute::new("login", "new"), &mut patch)
            .unwrap();
        assert!(changed);
        assert_eq!(patch.last, Some(("login".into(), "new".into())));

        let no_replace: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("meta", AttributeType::String);
        let changed = no_replace
            .apply_replace(&Attribute::new("meta", "x"), &mut Patch::default())
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_read_absent_value_produces_no_attribute() {
        let mapper = login_mapper();
        let source = Source {
            login: None,
            created: None,
        };
        assert!(mapper.read(&source).unwrap().is_none());

        let no_getter: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("login", AttributeType::String);
        let source = Source {
            login: Some("jdoe".into()),
            created: None,
        };
        assert!(no_getter.read(&source).unwrap().is_none());
    }

    #[test]
    fn test_read_parses_datetime_strings() {
        let mapper: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("created", AttributeType::DateTimeString)
                .on_read(|s: &Source| s.created.clone().map(AttributeValue::from))
                .not_creatable()
                .not_updatable();
        let source = Source {
            login: None,
            created: Some("2026-02-10T00:00:00+00:00".into()),
        };
        let attr = mapper.read(&source).unwrap().unwrap();
        let expected = Utc
            .with_ymd_and_hms(2026, 2, 10, 0, 0, 0)
            .unwrap()
            .fixed_offset();
        assert_eq!(attr.value, AttributeValue::DateTime(expected));
    }

    #[test]
    fn test_bad_value_is_scoped_to_the_attribute() {
        let mapper: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("active", AttributeType::Boolean)
                .on_create(|v, d: &mut Dest| d.active = v.as_boolean());
        let err = mapper
            .apply_create(&Attribute::new("active", "yes"), &mut Dest::default())
            .unwrap_err();
        assert!(err.to_string().contains("active"));
    }

    #[test]
    fn test_date_string_create_formats_before_setter() {
        let mapper: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("since", AttributeType::DateString)
                .on_create(|v, d: &mut Dest| d.since = v.as_string().map(String::from));
        let dt = Utc
            .with_ymd_and_hms(2026, 2, 10, 0, 0, 0)
            .unwrap()
            .fixed_offset();
        let mut dest = Dest::default();
        mapper
            .apply_create(&Attribute::new("since", AttributeValue::DateTime(dt)), &mut dest)
            .unwrap();
        assert_eq!(dest.since.as_deref(), Some("2026-02-10"));
    }

    #[test]
    fn test_case_insensitive_name_matching() {
        let mapper = login_mapper();
        assert!(mapper.matches_name("LOGIN"));

        let strict: AttributeMapper<Dest, Patch, Source> =
            AttributeMapper::new("login", AttributeType::String);
        assert!(!strict.matches_name("LOGIN"));
        assert!(strict.matches_name("login"));
    }
}
