use crate::{
    ast::Node,
    decompose,
    error::FilterError,
    events::{
        AttributeDefinition, AttributeKind, AttributeTable, Event, EventBuilder, EventError,
        EventType, EventTypeId,
    },
    index::{self, FilterHandle, HandleCounts},
    parser,
    plan::{
        BindingValue, Bindings, FilterOperator, FilterParameter, FilterPlan, FilterValue,
        FilterValueSource, Lookupable, ScalarValue,
    },
    predicates::{ComparisonValue, Predicate, PredicateKind, PrimitiveLiteral},
    registry::FilterIndexRegistry,
    strings::StringTable,
};
use parking_lot::RwLock;
use slab::Slab;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

type ResolvedParameter = (Arc<Lookupable>, FilterOperator, FilterValue);

/// The continuous-query driver: event type definitions, the registered
/// filters, and the shared parameter indexes that match events against them.
///
/// Event types are defined up front through `&mut self`. Subscription,
/// removal, and matching all run concurrently through `&self` afterwards.
pub struct FilterEngine {
    event_types: Vec<EventType>,
    by_name: HashMap<String, EventTypeId>,
    strings: RwLock<StringTable>,
    filters: RwLock<FilterTable>,
    registry: FilterIndexRegistry,
}

/// Live filters keyed by their arena slot, plus the handles whose plans have
/// no indexable parameter and are therefore candidates for every event of
/// their type.
#[derive(Default)]
struct FilterTable {
    registrations: Slab<Registration>,
    unindexed: HashMap<EventTypeId, HashSet<FilterHandle>>,
}

struct Registration {
    event_type: EventTypeId,
    parameters: Vec<ResolvedParameter>,
    residual: Option<Arc<Node>>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            event_types: Vec::new(),
            by_name: HashMap::new(),
            strings: RwLock::new(StringTable::new()),
            filters: RwLock::new(FilterTable::default()),
            registry: FilterIndexRegistry::new(),
        }
    }

    /// Defines a named event type over the given attribute declarations.
    /// Filters and events are always scoped to a single event type.
    pub fn define_event_type(
        &mut self,
        name: &str,
        definitions: &[AttributeDefinition],
    ) -> Result<EventTypeId, EventError> {
        if self.by_name.contains_key(name) {
            return Err(EventError::EventTypeAlreadyPresent(name.to_string()));
        }
        let id = EventTypeId(self.event_types.len());
        self.event_types.push(EventType::new(id, name, definitions)?);
        self.by_name.insert(name.to_string(), id);
        debug!(name, id = id.0, "defined an event type");
        Ok(id)
    }

    /// The id a type name was registered under.
    pub fn event_type_id(&self, name: &str) -> Option<EventTypeId> {
        self.by_name.get(name).copied()
    }

    /// Starts an event of the given type. The builder resolves strings
    /// against the engine's intern table, so strings no filter mentions
    /// collapse to a sentinel that matches nothing.
    pub fn make_event(&self, event_type: EventTypeId) -> Result<EventBuilder<'_>, EventError> {
        let definition = self.event_type(event_type)?;
        Ok(EventBuilder::new(
            event_type,
            definition.attributes(),
            &self.strings,
        ))
    }

    /// Compiles an expression against an event type without registering
    /// anything, for callers that only need the plan.
    pub fn decompose<'a>(
        &self,
        event_type: EventTypeId,
        expression: &'a str,
    ) -> Result<FilterPlan, FilterError<'a>> {
        let definition = self.event_type(event_type)?;
        let tree = {
            let mut strings = self.strings.write();
            parser::parse(definition.attributes(), &mut strings, expression)
                .map_err(FilterError::Parse)?
        };
        Ok(decompose::decompose(
            event_type,
            definition.attributes(),
            tree,
        ))
    }

    pub fn subscribe<'a>(
        &self,
        event_type: EventTypeId,
        expression: &'a str,
    ) -> Result<FilterHandle, FilterError<'a>> {
        self.subscribe_with_bindings(event_type, expression, &Bindings::new())
    }

    /// Registers a filter over one event type and returns the handle it
    /// matches under until [`FilterEngine::unsubscribe`]. Every `$name`
    /// placeholder in the expression must be covered by `bindings`; the
    /// bound values are baked in here, so later binding changes never
    /// affect a registered filter.
    pub fn subscribe_with_bindings<'a>(
        &self,
        event_type: EventTypeId,
        expression: &'a str,
        bindings: &Bindings,
    ) -> Result<FilterHandle, FilterError<'a>> {
        let plan = self.decompose(event_type, expression)?;
        let attributes = self.event_type(event_type)?.attributes();
        let (event_type, parameters, residual) = plan.into_parts();
        let parameters = self.resolve_parameters(parameters, bindings)?;
        let residual = residual
            .map(|node| self.resolve_residual(node, attributes, bindings))
            .transpose()?
            .map(Arc::new);
        // Every parameter is validated before any shared structure changes,
        // so a rejected filter leaves the engine untouched.
        for (lookupable, operator, value) in &parameters {
            index::check_value(lookupable, *operator, value)?;
        }

        let handle = {
            let mut filters = self.filters.write();
            let handle = FilterHandle(filters.registrations.insert(Registration {
                event_type,
                parameters: parameters.clone(),
                residual,
            }));
            if parameters.is_empty() {
                filters
                    .unindexed
                    .entry(event_type)
                    .or_default()
                    .insert(handle);
            }
            handle
        };
        // The filter is visible in the table before its first index entry
        // lands, so a concurrent match sees a partial count and skips it
        // rather than matching on a fraction of the parameters.
        for (position, (lookupable, operator, value)) in parameters.iter().enumerate() {
            if let Err(error) = self
                .registry
                .register(event_type, lookupable, *operator, value, handle)
            {
                self.roll_back(event_type, &parameters[..position], handle);
                return Err(error.into());
            }
        }
        debug!(
            handle = handle.0,
            event_type = event_type.0,
            parameters = parameters.len(),
            "subscribed a filter"
        );
        Ok(handle)
    }

    /// Removes a filter and withdraws its index registrations. Unknown or
    /// already removed handles are a no-op returning `false`.
    pub fn unsubscribe(&self, handle: FilterHandle) -> bool {
        let mut filters = self.filters.write();
        let Some(registration) = filters.registrations.try_remove(handle.0) else {
            return false;
        };
        if registration.parameters.is_empty() {
            if let Some(unindexed) = filters.unindexed.get_mut(&registration.event_type) {
                unindexed.remove(&handle);
            }
        }
        // The table lock spans the index cleanup, so a subscription reusing
        // this arena slot cannot start while an index can still produce the
        // old handle.
        for (lookupable, operator, value) in &registration.parameters {
            self.registry.unregister(
                registration.event_type,
                lookupable.attribute(),
                *operator,
                value,
                handle,
            );
        }
        debug!(handle = handle.0, "unsubscribed a filter");
        true
    }

    /// Matches one event against every filter of its event type. The report
    /// lists each matching filter exactly once, in handle order.
    pub fn match_event(&self, event: &Event) -> MatchReport {
        self.match_event_with(event, &DirectEvaluator)
    }

    /// Same as [`FilterEngine::match_event`], but gates residual expressions
    /// through the supplied evaluator instead of direct tree evaluation.
    pub fn match_event_with(
        &self,
        event: &Event,
        evaluator: &impl ResidualEvaluator,
    ) -> MatchReport {
        let mut counts = HandleCounts::new();
        let mut candidates = Vec::new();
        {
            // Holding the table lock across the probe keeps the counts
            // consistent with the registrations they are compared against.
            let filters = self.filters.read();
            self.registry.match_event(event, &mut counts);
            if let Some(unindexed) = filters.unindexed.get(&event.event_type()) {
                for handle in unindexed {
                    let registration = &filters.registrations[handle.0];
                    candidates.push((*handle, registration.residual.clone()));
                }
            }
            for (handle, count) in &counts {
                let Some(registration) = filters.registrations.get(handle.0) else {
                    continue;
                };
                if *count == registration.parameters.len() {
                    candidates.push((*handle, registration.residual.clone()));
                }
            }
        }
        // Residual gating runs outside every lock.
        let mut matches: Vec<_> = candidates
            .into_iter()
            .filter(|(handle, residual)| {
                residual
                    .as_ref()
                    .map_or(true, |node| evaluator.evaluate(*handle, node, event))
            })
            .map(|(handle, _)| handle)
            .collect();
        matches.sort_unstable();
        MatchReport { matches }
    }

    /// How many filters are currently registered across every event type.
    pub fn filter_count(&self) -> usize {
        self.filters.read().registrations.len()
    }

    fn event_type(&self, id: EventTypeId) -> Result<&EventType, EventError> {
        self.event_types
            .get(id.0)
            .ok_or(EventError::NonExistingEventType(id.0))
    }

    fn resolve_parameters<'a>(
        &self,
        parameters: Vec<FilterParameter>,
        bindings: &Bindings,
    ) -> Result<Vec<ResolvedParameter>, FilterError<'a>> {
        parameters
            .into_iter()
            .map(|parameter| {
                let (lookupable, operator, source) = parameter.into_parts();
                let value = match source {
                    FilterValueSource::Constant(value) => value,
                    FilterValueSource::Binding(name) => {
                        let scalar = self.binding_scalar(self.bound_value(&name, bindings)?);
                        if scalar.kind() != lookupable.kind() {
                            return Err(FilterError::MismatchedBinding {
                                placeholder: name,
                                attribute: lookupable.name().to_owned(),
                            });
                        }
                        FilterValue::Scalar(scalar)
                    }
                };
                Ok((lookupable, operator, value))
            })
            .collect()
    }

    fn resolve_residual<'a>(
        &self,
        node: Node,
        attributes: &AttributeTable,
        bindings: &Bindings,
    ) -> Result<Node, FilterError<'a>> {
        Ok(match node {
            Node::And(left, right) => Node::And(
                Box::new(self.resolve_residual(*left, attributes, bindings)?),
                Box::new(self.resolve_residual(*right, attributes, bindings)?),
            ),
            Node::Or(left, right) => Node::Or(
                Box::new(self.resolve_residual(*left, attributes, bindings)?),
                Box::new(self.resolve_residual(*right, attributes, bindings)?),
            ),
            Node::Not(inner) => {
                Node::Not(Box::new(self.resolve_residual(*inner, attributes, bindings)?))
            }
            Node::Value(predicate) => {
                Node::Value(self.resolve_predicate(predicate, attributes, bindings)?)
            }
        })
    }

    fn resolve_predicate<'a>(
        &self,
        predicate: Predicate,
        attributes: &AttributeTable,
        bindings: &Bindings,
    ) -> Result<Predicate, FilterError<'a>> {
        let resolved = match predicate.kind() {
            PredicateKind::Comparison(operator, ComparisonValue::Binding(name)) => {
                let expected = attributes.by_id(predicate.attribute());
                let value = match (self.bound_value(name, bindings)?, expected) {
                    (BindingValue::Integer(value), AttributeKind::Integer) => {
                        ComparisonValue::Integer(*value)
                    }
                    (BindingValue::Float(value), AttributeKind::Float) => {
                        ComparisonValue::Float(*value)
                    }
                    _ => {
                        return Err(FilterError::MismatchedBinding {
                            placeholder: name.clone(),
                            attribute: attributes.name_of(predicate.attribute()).to_owned(),
                        })
                    }
                };
                Some(PredicateKind::Comparison(*operator, value))
            }
            PredicateKind::Equality(operator, PrimitiveLiteral::Binding(name)) => {
                let expected = attributes.by_id(predicate.attribute());
                let value = match (self.bound_value(name, bindings)?, expected) {
                    (BindingValue::Integer(value), AttributeKind::Integer) => {
                        PrimitiveLiteral::Integer(*value)
                    }
                    (BindingValue::Float(value), AttributeKind::Float) => {
                        PrimitiveLiteral::Float(*value)
                    }
                    (BindingValue::String(value), AttributeKind::String) => {
                        PrimitiveLiteral::String(self.strings.write().get_or_update(value))
                    }
                    _ => {
                        return Err(FilterError::MismatchedBinding {
                            placeholder: name.clone(),
                            attribute: attributes.name_of(predicate.attribute()).to_owned(),
                        })
                    }
                };
                Some(PredicateKind::Equality(*operator, value))
            }
            _ => None,
        };
        Ok(match resolved {
            Some(kind) => predicate.with_kind(kind),
            None => predicate,
        })
    }

    fn bound_value<'a, 'b>(
        &self,
        name: &str,
        bindings: &'b Bindings,
    ) -> Result<&'b BindingValue, FilterError<'a>> {
        bindings
            .get(name)
            .ok_or_else(|| FilterError::UnboundPlaceholder(name.to_owned()))
    }

    fn binding_scalar(&self, value: &BindingValue) -> ScalarValue {
        match value {
            BindingValue::Integer(value) => ScalarValue::Integer(*value),
            BindingValue::Float(value) => ScalarValue::Float(*value),
            BindingValue::String(value) => {
                ScalarValue::String(self.strings.write().get_or_update(value))
            }
        }
    }

    /// Unwinds a partially registered filter so a failed subscription is
    /// invisible to matching.
    fn roll_back(
        &self,
        event_type: EventTypeId,
        registered: &[ResolvedParameter],
        handle: FilterHandle,
    ) {
        for (lookupable, operator, value) in registered {
            self.registry.unregister(
                event_type,
                lookupable.attribute(),
                *operator,
                value,
                handle,
            );
        }
        self.filters.write().registrations.try_remove(handle.0);
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// The filters an event matched, one handle each, in ascending handle order.
#[derive(Clone, Debug)]
pub struct MatchReport {
    matches: Vec<FilterHandle>,
}

impl MatchReport {
    pub fn matches(&self) -> &[FilterHandle] {
        &self.matches
    }

    pub fn contains(&self, handle: FilterHandle) -> bool {
        self.matches.binary_search(&handle).is_ok()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Evaluates the residual expression of a candidate filter against an event.
///
/// The engine consults this once per candidate whose indexable parameters
/// all matched, outside every lock. [`DirectEvaluator`] walks the stored
/// expression tree; external expression compilers can key their compiled
/// form on the filter handle instead.
pub trait ResidualEvaluator {
    fn evaluate(&self, handle: FilterHandle, residual: &Node, event: &Event) -> bool;
}

/// The built-in gate: direct recursive evaluation of the residual tree.
pub struct DirectEvaluator;

impl ResidualEvaluator for DirectEvaluator {
    fn evaluate(&self, _: FilterHandle, residual: &Node, event: &Event) -> bool {
        residual.evaluate(event)
    }
}
