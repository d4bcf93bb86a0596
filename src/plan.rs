use crate::{
    ast::Node,
    events::{AttributeIndex, AttributeKind, AttributeValue, EventTypeId},
    strings::StringId,
};
use rust_decimal::Decimal;
use std::{collections::HashMap, sync::Arc};

/// A named accessor for the event attribute an indexable parameter keys on.
///
/// Lookupables are canonicalized per event type so that every parameter over
/// the same attribute shares one allocation.
#[derive(Clone, Eq, Hash, PartialEq, Debug)]
pub struct Lookupable {
    name: String,
    attribute: AttributeIndex,
    kind: AttributeKind,
}

impl Lookupable {
    pub fn new(name: &str, attribute: AttributeIndex, kind: AttributeKind) -> Self {
        Self {
            name: name.to_owned(),
            attribute,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> AttributeIndex {
        self.attribute
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }
}

/// The closed set of operators an index can be specialized for.
///
/// `BooleanExpression` marks the residual part of a filter that could not be
/// decomposed into an indexable parameter. It never reaches an index.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    /// Both endpoints included.
    RangeClosed,
    /// Both endpoints excluded.
    RangeOpen,
    /// Low endpoint included, high endpoint excluded.
    RangeHalfOpen,
    /// Low endpoint excluded, high endpoint included.
    RangeHalfClosed,
    InList,
    NotInList,
    BooleanExpression,
}

impl FilterOperator {
    pub(crate) fn is_range(self) -> bool {
        matches!(
            self,
            Self::RangeClosed | Self::RangeOpen | Self::RangeHalfOpen | Self::RangeHalfClosed
        )
    }

    pub(crate) fn includes_low(self) -> bool {
        matches!(self, Self::RangeClosed | Self::RangeHalfOpen)
    }

    pub(crate) fn includes_high(self) -> bool {
        matches!(self, Self::RangeClosed | Self::RangeHalfClosed)
    }
}

/// A single typed value as it appears in an index key.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug)]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i64),
    Float(Decimal),
    String(StringId),
}

impl ScalarValue {
    pub(crate) fn kind(&self) -> AttributeKind {
        match self {
            Self::Boolean(_) => AttributeKind::Boolean,
            Self::Integer(_) => AttributeKind::Integer,
            Self::Float(_) => AttributeKind::Float,
            Self::String(_) => AttributeKind::String,
        }
    }

    /// The scalar probe for an extracted attribute value. List-valued
    /// attributes have no scalar form and never reach an index.
    pub(crate) fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Boolean(value) => Some(Self::Boolean(*value)),
            AttributeValue::Integer(value) => Some(Self::Integer(*value)),
            AttributeValue::Float(value) => Some(Self::Float(*value)),
            AttributeValue::String(value) => Some(Self::String(*value)),
            _ => None,
        }
    }
}

/// An immutable list of scalars with structural equality and hashing, used
/// both as the stored form of `in`/`not in` literals and as a removal key.
#[derive(Clone, Eq, Hash, PartialEq, Debug)]
pub struct MultiKey(Box<[ScalarValue]>);

impl MultiKey {
    pub(crate) fn new(values: Vec<ScalarValue>) -> Self {
        Self(values.into_boxed_slice())
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.0
    }
}

/// The comparison operand a parameter carries once fully resolved.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum FilterValue {
    Scalar(ScalarValue),
    Range { low: ScalarValue, high: ScalarValue },
    List(MultiKey),
}

/// Parameters either carry their operand directly or defer to a `$name`
/// placeholder resolved against [`Bindings`] when the filter is registered.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum FilterValueSource {
    Constant(FilterValue),
    Binding(String),
}

/// One indexable unit of a decomposed filter: which attribute to probe, with
/// which operator, against which operand.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FilterParameter {
    lookupable: Arc<Lookupable>,
    operator: FilterOperator,
    source: FilterValueSource,
}

impl FilterParameter {
    pub(crate) fn new(
        lookupable: Arc<Lookupable>,
        operator: FilterOperator,
        source: FilterValueSource,
    ) -> Self {
        Self {
            lookupable,
            operator,
            source,
        }
    }

    pub fn lookupable(&self) -> &Arc<Lookupable> {
        &self.lookupable
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn source(&self) -> &FilterValueSource {
        &self.source
    }

    pub(crate) fn into_parts(self) -> (Arc<Lookupable>, FilterOperator, FilterValueSource) {
        (self.lookupable, self.operator, self.source)
    }
}

/// The compiled form of one filter expression: the indexable parameters plus
/// whatever could not be decomposed, kept as a residual expression that is
/// evaluated only for events the indexes already agreed on.
#[derive(Clone, PartialEq, Debug)]
pub struct FilterPlan {
    event_type: EventTypeId,
    parameters: Vec<FilterParameter>,
    residual: Option<Node>,
}

impl FilterPlan {
    pub(crate) fn new(
        event_type: EventTypeId,
        parameters: Vec<FilterParameter>,
        residual: Option<Node>,
    ) -> Self {
        Self {
            event_type,
            parameters,
            residual,
        }
    }

    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }

    pub fn parameters(&self) -> &[FilterParameter] {
        &self.parameters
    }

    pub fn residual(&self) -> Option<&Node> {
        self.residual.as_ref()
    }

    /// How many top-level conjuncts could not be indexed. Callers weigh this
    /// against the parameter count to decide whether a plan is worth
    /// registering or the filter should fall back to direct evaluation.
    pub fn unassigned_count(&self) -> usize {
        self.residual
            .as_ref()
            .map_or(0, |residual| residual.conjuncts().len())
    }

    pub(crate) fn into_parts(self) -> (EventTypeId, Vec<FilterParameter>, Option<Node>) {
        (self.event_type, self.parameters, self.residual)
    }
}

/// A value supplied for a `$name` placeholder at registration time.
#[derive(Clone, PartialEq, Debug)]
pub enum BindingValue {
    Integer(i64),
    Float(Decimal),
    String(String),
}

/// Values for the `$name` placeholders of an expression, supplied when the
/// filter is registered rather than baked into its text.
#[derive(Clone, Default, Debug)]
pub struct Bindings {
    values: HashMap<String, BindingValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_integer(mut self, name: &str, value: i64) -> Self {
        self.values.insert(name.to_owned(), BindingValue::Integer(value));
        self
    }

    pub fn with_float(mut self, name: &str, value: Decimal) -> Self {
        self.values.insert(name.to_owned(), BindingValue::Float(value));
        self
    }

    pub fn with_string(mut self, name: &str, value: &str) -> Self {
        self.values
            .insert(name.to_owned(), BindingValue::String(value.to_owned()));
        self
    }

    pub(crate) fn get(&self, name: &str) -> Option<&BindingValue> {
        self.values.get(name)
    }
}
