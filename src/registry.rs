use crate::{
    events::{AttributeIndex, Event, EventTypeId},
    index::{FilterHandle, FilterParamIndex, HandleCounts, IndexError},
    plan::{FilterOperator, FilterValue, Lookupable, ScalarValue},
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

type Shard = Arc<DashMap<(AttributeIndex, FilterOperator), Arc<FilterParamIndex>>>;

/// The two-level index registry: event type to shard, then attribute and
/// operator to the one shared [`FilterParamIndex`] for that pair.
///
/// Shards are created on first use and live as long as their event type, so
/// only inner indexes are ever pruned. Registration keeps the shard entry
/// locked while it stores the value, which is what keeps a concurrent prune
/// of the same index from dropping the registration.
pub struct FilterIndexRegistry {
    by_event_type: DashMap<EventTypeId, Shard>,
}

impl Default for FilterIndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterIndexRegistry {
    pub fn new() -> Self {
        Self {
            by_event_type: DashMap::new(),
        }
    }

    /// Stores `handle` under `value` in the index for the parameter's
    /// attribute and operator, creating that index on first use.
    pub fn register(
        &self,
        event_type: EventTypeId,
        lookupable: &Arc<Lookupable>,
        operator: FilterOperator,
        value: &FilterValue,
        handle: FilterHandle,
    ) -> Result<(), IndexError> {
        let shard = self.shard(event_type);
        match shard.entry((lookupable.attribute(), operator)) {
            Entry::Occupied(entry) => entry.get().put(value, handle)?,
            Entry::Vacant(entry) => {
                let index = Arc::new(FilterParamIndex::new(Arc::clone(lookupable), operator)?);
                index.put(value, handle)?;
                entry.insert(index);
                debug!(
                    event_type = event_type.0,
                    attribute = lookupable.name(),
                    ?operator,
                    "created a filter parameter index"
                );
            }
        }
        Ok(())
    }

    /// Removes `handle` from the index for the given attribute and operator,
    /// dropping the index once its last entry is gone. Returns whether the
    /// registration existed.
    pub fn unregister(
        &self,
        event_type: EventTypeId,
        attribute: AttributeIndex,
        operator: FilterOperator,
        value: &FilterValue,
        handle: FilterHandle,
    ) -> bool {
        let Some(shard) = self
            .by_event_type
            .get(&event_type)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return false;
        };
        let key = (attribute, operator);
        let Some(index) = shard.get(&key).map(|entry| Arc::clone(entry.value())) else {
            return false;
        };
        let removed = index.remove(value, handle);
        if removed {
            // Emptiness is re-checked under the shard entry lock, after any
            // in-flight registration against this index has finished.
            let pruned = shard.remove_if(&key, |_, index| index.is_empty());
            if pruned.is_some() {
                debug!(
                    event_type = event_type.0,
                    ?operator,
                    "pruned an empty filter parameter index"
                );
            }
        }
        removed
    }

    /// Probes every index of the event's type and accumulates the number of
    /// satisfied parameters per filter handle. Each attribute is extracted
    /// from the event once and the value reused for every operator index
    /// over it; an attribute the event leaves undefined probes nothing.
    pub fn match_event(&self, event: &Event, matches: &mut HandleCounts) {
        let Some(shard) = self
            .by_event_type
            .get(&event.event_type())
            .map(|entry| Arc::clone(entry.value()))
        else {
            return;
        };
        let mut extracted: HashMap<AttributeIndex, Option<ScalarValue>> = HashMap::new();
        for entry in shard.iter() {
            let (attribute, _) = *entry.key();
            let value = extracted.entry(attribute).or_insert_with(|| {
                event.value(attribute).and_then(ScalarValue::from_attribute)
            });
            if let Some(value) = value {
                entry.value().match_value(value, matches);
            }
        }
    }

    /// The live index for one attribute and operator pair, if any.
    pub fn index(
        &self,
        event_type: EventTypeId,
        attribute: AttributeIndex,
        operator: FilterOperator,
    ) -> Option<Arc<FilterParamIndex>> {
        let shard = self.by_event_type.get(&event_type)?;
        let index = shard.get(&(attribute, operator))?;
        Some(Arc::clone(index.value()))
    }

    /// How many indexes are currently live for an event type.
    pub fn index_count(&self, event_type: EventTypeId) -> usize {
        self.by_event_type
            .get(&event_type)
            .map(|shard| shard.len())
            .unwrap_or(0)
    }

    fn shard(&self, event_type: EventTypeId) -> Shard {
        Arc::clone(&self.by_event_type.entry(event_type).or_default())
    }
}
