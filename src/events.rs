use crate::{
    predicates::PredicateKind,
    strings::{StringId, StringTable},
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, PartialEq, Debug)]
pub enum EventError {
    #[error("attribute {0} has already been defined")]
    AlreadyPresent(String),
    #[error("attribute {0} does not exist")]
    NonExisting(String),
    #[error("attribute {0} has already been set on this event")]
    AlreadySet(String),
    #[error("event is missing some attributes")]
    MissingAttributes,
    #[error("expression refers to non-existing attribute '{0:?}'")]
    NonExistingAttribute(String),
    #[error("{name:?}: mismatching types => expected: {expected:?}, found: {actual:?}")]
    MismatchingTypes {
        name: String,
        expected: AttributeKind,
        actual: PredicateKind,
    },
    #[error("{name:?}: a {actual:?} value cannot be assigned to a {expected:?} attribute")]
    MismatchingValue {
        name: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },
    #[error("event type #{0} does not exist")]
    NonExistingEventType(usize),
    #[error("event type {0} has already been defined")]
    EventTypeAlreadyPresent(String),
}

/// Identifies one event type registered with the engine. Filters and
/// indexes are partitioned by event type.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug)]
pub struct EventTypeId(pub(crate) usize);

/// A named attribute schema. Every event carries the id of the type it
/// was built against.
pub struct EventType {
    id: EventTypeId,
    name: String,
    attributes: AttributeTable,
}

impl EventType {
    pub(crate) fn new(
        id: EventTypeId,
        name: &str,
        definitions: &[AttributeDefinition],
    ) -> Result<Self, EventError> {
        Ok(Self {
            id,
            name: name.to_owned(),
            attributes: AttributeTable::new(definitions)?,
        })
    }

    pub fn id(&self) -> EventTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }
}

pub struct EventBuilder<'a> {
    by_ids: Vec<(AttributeIndex, AttributeValue)>,
    event_type: EventTypeId,
    attributes: &'a AttributeTable,
    strings: &'a RwLock<StringTable>,
}

impl<'a> EventBuilder<'a> {
    pub(crate) fn new(
        event_type: EventTypeId,
        attributes: &'a AttributeTable,
        strings: &'a RwLock<StringTable>,
    ) -> Self {
        Self {
            by_ids: Vec::with_capacity(attributes.len()),
            event_type,
            attributes,
            strings,
        }
    }

    /// Finishes the event. Every attribute declared by the event type must
    /// have been assigned, either to a value or to undefined.
    pub fn build(mut self) -> Result<Event, EventError> {
        if self.by_ids.len() != self.attributes.len() {
            return Err(EventError::MissingAttributes);
        }
        self.by_ids.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
        Ok(Event {
            event_type: self.event_type,
            values: self.by_ids.into_iter().map(|(_, v)| v).collect(),
        })
    }

    pub fn with_boolean(&mut self, name: &str, value: bool) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Boolean, || {
            AttributeValue::Boolean(value)
        })
    }

    pub fn with_integer(&mut self, name: &str, value: i64) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Integer, || {
            AttributeValue::Integer(value)
        })
    }

    pub fn with_float(&mut self, name: &str, value: Decimal) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Float, || AttributeValue::Float(value))
    }

    pub fn with_string(&mut self, name: &str, value: &str) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::String, || {
            let string_index = self.strings.read().get(value);
            AttributeValue::String(string_index)
        })
    }

    pub fn with_integer_list(&mut self, name: &str, value: &[i64]) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::IntegerList, || {
            AttributeValue::IntegerList(value.to_vec())
        })
    }

    pub fn with_string_list(&mut self, name: &str, values: &[&str]) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::StringList, || {
            let strings = self.strings.read();
            let mut values: Vec<_> = values.iter().map(|v| strings.get(v)).collect();
            values.sort();
            AttributeValue::StringList(values)
        })
    }

    /// Marks an attribute as explicitly absent for this event. Predicates
    /// other than `is null` never match an undefined value.
    pub fn with_undefined(&mut self, name: &str) -> Result<(), EventError> {
        let index = self.checked_index(name)?;
        self.by_ids.push((index, AttributeValue::Undefined));
        Ok(())
    }

    fn add_value<F>(&mut self, name: &str, kind: AttributeKind, f: F) -> Result<(), EventError>
    where
        F: FnOnce() -> AttributeValue,
    {
        let index = self.checked_index(name)?;
        let expected = self.attributes.by_id(index);
        if expected != kind {
            return Err(EventError::MismatchingValue {
                name: name.to_string(),
                expected,
                actual: kind,
            });
        }
        self.by_ids.push((index, f()));
        Ok(())
    }

    fn checked_index(&self, name: &str) -> Result<AttributeIndex, EventError> {
        let Some(index) = self.attributes.by_name(name) else {
            return Err(EventError::NonExisting(name.to_string()));
        };
        if self.by_ids.iter().any(|(set, _)| *set == index) {
            return Err(EventError::AlreadySet(name.to_string()));
        }
        Ok(index)
    }
}

pub struct Event {
    event_type: EventTypeId,
    values: Vec<AttributeValue>,
}

impl Event {
    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }

    /// Returns the value extracted for an attribute, or `None` when the
    /// attribute is undefined on this event.
    pub fn value(&self, index: AttributeIndex) -> Option<&AttributeValue> {
        match self.values.get(index.0) {
            None | Some(AttributeValue::Undefined) => None,
            Some(value) => Some(value),
        }
    }

    pub(crate) fn raw_value(&self, index: AttributeIndex) -> &AttributeValue {
        self.values
            .get(index.0)
            .unwrap_or(&AttributeValue::Undefined)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum AttributeValue {
    Undefined,
    Boolean(bool),
    Integer(i64),
    Float(Decimal),
    String(StringId),
    IntegerList(Vec<i64>),
    StringList(Vec<StringId>),
}

pub struct AttributeTable {
    by_names: HashMap<String, AttributeIndex>,
    by_ids: Vec<AttributeKind>,
    names: Vec<String>,
}

#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug)]
pub struct AttributeIndex(pub(crate) usize);

impl AttributeTable {
    pub fn new(definitions: &[AttributeDefinition]) -> Result<Self, EventError> {
        let size = definitions.len();
        let mut by_names = HashMap::with_capacity(size);
        let mut by_ids = Vec::with_capacity(size);
        let mut names = Vec::with_capacity(size);
        for (i, definition) in definitions.iter().enumerate() {
            let name = definition.name.to_owned();
            if by_names.contains_key(&name) {
                return Err(EventError::AlreadyPresent(name));
            }

            by_names.insert(name, AttributeIndex(i));
            by_ids.push(definition.kind.clone());
            names.push(definition.name.to_owned());
        }

        Ok(Self {
            by_names,
            by_ids,
            names,
        })
    }

    pub fn by_name(&self, name: &str) -> Option<AttributeIndex> {
        self.by_names.get(name).cloned()
    }

    pub fn by_id(&self, id: AttributeIndex) -> AttributeKind {
        self.by_ids[id.0].clone()
    }

    pub fn name_of(&self, id: AttributeIndex) -> &str {
        &self.names[id.0]
    }

    pub fn len(&self) -> usize {
        self.by_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ids.is_empty()
    }
}

#[derive(Clone)]
pub struct AttributeDefinition {
    name: String,
    kind: AttributeKind,
}

#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub enum AttributeKind {
    Boolean,
    Integer,
    Float,
    String,
    IntegerList,
    StringList,
}

impl AttributeDefinition {
    pub fn boolean(name: &str) -> Self {
        let kind = AttributeKind::Boolean;
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn integer(name: &str) -> Self {
        let kind = AttributeKind::Integer;
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn float(name: &str) -> Self {
        let kind = AttributeKind::Float;
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn string(name: &str) -> Self {
        let kind = AttributeKind::String;
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn integer_list(name: &str) -> Self {
        let kind = AttributeKind::IntegerList;
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn string_list(name: &str) -> Self {
        let kind = AttributeKind::StringList;
        Self {
            name: name.to_owned(),
            kind,
        }
    }
}
