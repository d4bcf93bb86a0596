use crate::{
    events::AttributeKind,
    plan::{FilterOperator, FilterValue, Lookupable, MultiKey, ScalarValue},
};
use parking_lot::RwLock;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    ops::Bound,
    sync::Arc,
};
use thiserror::Error;

/// Identifies one registered filter across every index it touches. A handle
/// is only meaningful while its registration is live; the slot behind it is
/// recycled once the filter is unsubscribed.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Debug)]
pub struct FilterHandle(pub(crate) usize);

/// How many satisfied parameters each filter has accumulated so far, and,
/// inside an index, how many registrations a handle holds under one key.
/// A filter becomes a match candidate once its count reaches its parameter
/// total.
pub type HandleCounts = HashMap<FilterHandle, usize>;

#[derive(Error, Clone, PartialEq, Debug)]
pub enum IndexError {
    #[error("the {operator:?} index over '{name}' cannot accept {value:?}")]
    TypeMismatch {
        name: String,
        operator: FilterOperator,
        value: FilterValue,
    },
    #[error("no index structure exists for {0:?}")]
    Unindexable(FilterOperator),
}

/// A concurrent single-operator index mapping operand values to the filters
/// that registered them.
///
/// Every probe and mutation takes the index's own read-write lock, so
/// matching proceeds in parallel with matching on other indexes and blocks
/// only on writers of this one.
pub struct FilterParamIndex {
    lookupable: Arc<Lookupable>,
    operator: FilterOperator,
    store: RwLock<Store>,
}

enum Store {
    Equality(HashMap<ScalarValue, HandleCounts>),
    NotEquality(HashMap<ScalarValue, HandleCounts>),
    Comparison(BTreeMap<ScalarValue, HandleCounts>),
    Range(RangeStore),
    InList(InListStore),
    NotInList(NotInListStore),
}

impl FilterParamIndex {
    /// Creates the index structure specialized for `operator` over one
    /// attribute. There is nothing to index for `BooleanExpression`:
    /// residual expressions stay with their registration.
    pub fn new(lookupable: Arc<Lookupable>, operator: FilterOperator) -> Result<Self, IndexError> {
        let store = match operator {
            FilterOperator::Equal => Store::Equality(HashMap::new()),
            FilterOperator::NotEqual => Store::NotEquality(HashMap::new()),
            FilterOperator::LessThan
            | FilterOperator::LessThanEqual
            | FilterOperator::GreaterThan
            | FilterOperator::GreaterThanEqual => Store::Comparison(BTreeMap::new()),
            FilterOperator::RangeClosed
            | FilterOperator::RangeOpen
            | FilterOperator::RangeHalfOpen
            | FilterOperator::RangeHalfClosed => Store::Range(RangeStore::default()),
            FilterOperator::InList => Store::InList(InListStore::default()),
            FilterOperator::NotInList => Store::NotInList(NotInListStore::default()),
            FilterOperator::BooleanExpression => {
                return Err(IndexError::Unindexable(operator));
            }
        };
        Ok(Self {
            lookupable,
            operator,
            store: RwLock::new(store),
        })
    }

    /// The attribute this index probes.
    pub fn lookupable(&self) -> &Arc<Lookupable> {
        &self.lookupable
    }

    /// The operator this index was specialized for at construction.
    pub fn filter_operator(&self) -> FilterOperator {
        self.operator
    }

    /// Registers `handle` under `value`. Registering the same pair again
    /// stacks, so a filter probing one attribute twice is counted twice.
    pub fn put(&self, value: &FilterValue, handle: FilterHandle) -> Result<(), IndexError> {
        self.check(value)?;
        let mut store = self.store.write();
        match (&mut *store, value) {
            (Store::Equality(map) | Store::NotEquality(map), FilterValue::Scalar(scalar)) => {
                *map.entry(*scalar).or_default().entry(handle).or_insert(0) += 1;
            }
            (Store::Comparison(map), FilterValue::Scalar(scalar)) => {
                *map.entry(*scalar).or_default().entry(handle).or_insert(0) += 1;
            }
            (Store::Range(ranges), FilterValue::Range { low, high }) => {
                ranges.put(*low, *high, handle);
            }
            (Store::InList(lists), FilterValue::List(key)) => lists.put(key, handle),
            (Store::NotInList(lists), FilterValue::List(key)) => lists.put(key, handle),
            (_, value) => {
                unreachable!("Invalid store and value combination => got: {value:?}. This is a bug.")
            }
        }
        Ok(())
    }

    /// Removes one registration of `handle` under `value`. Removing a pair
    /// that is not present is a no-op and returns `false`.
    pub fn remove(&self, value: &FilterValue, handle: FilterHandle) -> bool {
        let mut store = self.store.write();
        match (&mut *store, value) {
            (Store::Equality(map) | Store::NotEquality(map), FilterValue::Scalar(scalar)) => {
                remove_scalar_entry(map, scalar, handle)
            }
            (Store::Comparison(map), FilterValue::Scalar(scalar)) => {
                let Some(handles) = map.get_mut(scalar) else {
                    return false;
                };
                let removed = decrement(handles, handle);
                if handles.is_empty() {
                    map.remove(scalar);
                }
                removed
            }
            (Store::Range(ranges), FilterValue::Range { low, high }) => {
                ranges.remove(low, high, handle)
            }
            (Store::InList(lists), FilterValue::List(key)) => lists.remove(key, handle),
            (Store::NotInList(lists), FilterValue::List(key)) => lists.remove(key, handle),
            _ => false,
        }
    }

    /// Adds to `matches` the satisfied-parameter count this index
    /// contributes for one extracted attribute value. The caller extracts
    /// the value once per attribute and reuses it across every operator
    /// index over that attribute.
    pub fn match_value(&self, value: &ScalarValue, matches: &mut HandleCounts) {
        let store = self.store.read();
        match &*store {
            Store::Equality(map) => {
                if let Some(handles) = map.get(value) {
                    tally(handles, matches);
                }
            }
            Store::NotEquality(map) => {
                for (key, handles) in map {
                    if key != value {
                        tally(handles, matches);
                    }
                }
            }
            Store::Comparison(map) => match_comparison(map, self.operator, *value, matches),
            Store::Range(ranges) => ranges.match_value(self.operator, *value, matches),
            Store::InList(lists) => lists.match_value(value, matches),
            Store::NotInList(lists) => lists.match_value(value, matches),
        }
    }

    /// The handles registered under exactly `value`, if any.
    pub fn get(&self, value: &FilterValue) -> Option<HashSet<FilterHandle>> {
        let store = self.store.read();
        let handles = match (&*store, value) {
            (Store::Equality(map) | Store::NotEquality(map), FilterValue::Scalar(scalar)) => {
                map.get(scalar)
            }
            (Store::Comparison(map), FilterValue::Scalar(scalar)) => map.get(scalar),
            (Store::Range(ranges), FilterValue::Range { low, high }) => {
                ranges.by_low.get(low).and_then(|by_high| by_high.get(high))
            }
            (Store::InList(lists), FilterValue::List(key)) => lists.by_key.get(key),
            (Store::NotInList(lists), FilterValue::List(key)) => lists.by_key.get(key),
            _ => None,
        };
        handles.map(|handles| handles.keys().copied().collect())
    }

    pub fn is_empty(&self) -> bool {
        match &*self.store.read() {
            Store::Equality(map) | Store::NotEquality(map) => map.is_empty(),
            Store::Comparison(map) => map.is_empty(),
            Store::Range(ranges) => ranges.by_low.is_empty(),
            Store::InList(lists) => lists.by_key.is_empty(),
            Store::NotInList(lists) => lists.universe.is_empty(),
        }
    }

    fn check(&self, value: &FilterValue) -> Result<(), IndexError> {
        check_value(&self.lookupable, self.operator, value)
    }
}

/// Validates that `value` has the shape and scalar kind `operator` accepts
/// over the attribute, without touching any index. Registration runs this
/// for every parameter of a filter before inserting the first one.
pub(crate) fn check_value(
    lookupable: &Lookupable,
    operator: FilterOperator,
    value: &FilterValue,
) -> Result<(), IndexError> {
    let kind = lookupable.kind();
    let numeric = matches!(kind, AttributeKind::Integer | AttributeKind::Float);
    let compatible = match (operator, value) {
        (FilterOperator::Equal | FilterOperator::NotEqual, FilterValue::Scalar(scalar)) => {
            scalar.kind() == kind
        }
        (
            FilterOperator::LessThan
            | FilterOperator::LessThanEqual
            | FilterOperator::GreaterThan
            | FilterOperator::GreaterThanEqual,
            FilterValue::Scalar(scalar),
        ) => numeric && scalar.kind() == kind,
        (operator, FilterValue::Range { low, high }) if operator.is_range() => {
            numeric && low.kind() == kind && high.kind() == kind
        }
        (FilterOperator::InList | FilterOperator::NotInList, FilterValue::List(key)) => {
            key.values().iter().all(|value| value.kind() == kind)
        }
        _ => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(IndexError::TypeMismatch {
            name: lookupable.name().to_owned(),
            operator,
            value: value.clone(),
        })
    }
}

fn tally(handles: &HandleCounts, matches: &mut HandleCounts) {
    for (handle, count) in handles {
        *matches.entry(*handle).or_insert(0) += count;
    }
}

fn decrement(handles: &mut HandleCounts, handle: FilterHandle) -> bool {
    match handles.get_mut(&handle) {
        Some(count) if *count > 1 => {
            *count -= 1;
            true
        }
        Some(_) => {
            handles.remove(&handle);
            true
        }
        None => false,
    }
}

fn remove_scalar_entry(
    map: &mut HashMap<ScalarValue, HandleCounts>,
    scalar: &ScalarValue,
    handle: FilterHandle,
) -> bool {
    let Some(handles) = map.get_mut(scalar) else {
        return false;
    };
    let removed = decrement(handles, handle);
    if handles.is_empty() {
        map.remove(scalar);
    }
    removed
}

fn match_comparison(
    map: &BTreeMap<ScalarValue, HandleCounts>,
    operator: FilterOperator,
    value: ScalarValue,
    matches: &mut HandleCounts,
) {
    // A filter `attribute <op> constant` matches when `value <op> constant`
    // holds, so the satisfied constants sit on the operator's open side.
    let bounds: (Bound<ScalarValue>, Bound<ScalarValue>) = match operator {
        FilterOperator::LessThan => (Bound::Excluded(value), Bound::Unbounded),
        FilterOperator::LessThanEqual => (Bound::Included(value), Bound::Unbounded),
        FilterOperator::GreaterThan => (Bound::Unbounded, Bound::Excluded(value)),
        FilterOperator::GreaterThanEqual => (Bound::Unbounded, Bound::Included(value)),
        operator => {
            unreachable!("Invalid comparison operator => got: {operator:?}. This is a bug.")
        }
    };
    for (_, handles) in map.range(bounds) {
        tally(handles, matches);
    }
}

/// Interval entries sorted by their lower endpoint, with the widths kept as a
/// multiset so a probe only scans lower endpoints within the widest interval
/// of the current value.
#[derive(Default)]
struct RangeStore {
    by_low: BTreeMap<ScalarValue, BTreeMap<ScalarValue, HandleCounts>>,
    widths: BTreeMap<Decimal, usize>,
}

impl RangeStore {
    fn put(&mut self, low: ScalarValue, high: ScalarValue, handle: FilterHandle) {
        *self
            .by_low
            .entry(low)
            .or_default()
            .entry(high)
            .or_default()
            .entry(handle)
            .or_insert(0) += 1;
        *self.widths.entry(width_between(&low, &high)).or_insert(0) += 1;
    }

    fn remove(&mut self, low: &ScalarValue, high: &ScalarValue, handle: FilterHandle) -> bool {
        let Some(by_high) = self.by_low.get_mut(low) else {
            return false;
        };
        let Some(handles) = by_high.get_mut(high) else {
            return false;
        };
        if !decrement(handles, handle) {
            return false;
        }
        if handles.is_empty() {
            by_high.remove(high);
            if by_high.is_empty() {
                self.by_low.remove(low);
            }
        }
        let width = width_between(low, high);
        if let Some(count) = self.widths.get_mut(&width) {
            if *count > 1 {
                *count -= 1;
            } else {
                self.widths.remove(&width);
            }
        }
        true
    }

    fn match_value(
        &self,
        operator: FilterOperator,
        value: ScalarValue,
        matches: &mut HandleCounts,
    ) {
        let Some((max_width, _)) = self.widths.last_key_value() else {
            return;
        };
        // Only inverted intervals are stored, and those contain nothing.
        if max_width.is_sign_negative() {
            return;
        }
        // Any interval containing the value starts at most one maximal width
        // below it; a saturated width cannot bound that distance, so the
        // scan covers every lower endpoint.
        let from = if *max_width == Decimal::MAX {
            Bound::Unbounded
        } else {
            Bound::Included(stepped_back(&value, *max_width))
        };
        let low_bounds = (
            from,
            if operator.includes_low() {
                Bound::Included(value)
            } else {
                Bound::Excluded(value)
            },
        );
        let high_bounds: (Bound<ScalarValue>, Bound<ScalarValue>) = (
            if operator.includes_high() {
                Bound::Included(value)
            } else {
                Bound::Excluded(value)
            },
            Bound::Unbounded,
        );
        for (_, by_high) in self.by_low.range(low_bounds) {
            for (_, handles) in by_high.range(high_bounds) {
                tally(handles, matches);
            }
        }
    }
}

fn width_between(low: &ScalarValue, high: &ScalarValue) -> Decimal {
    match (low, high) {
        (ScalarValue::Integer(low), ScalarValue::Integer(high)) => {
            Decimal::from(*high) - Decimal::from(*low)
        }
        (ScalarValue::Float(low), ScalarValue::Float(high)) => {
            // Saturates when the span exceeds what Decimal can represent.
            high.checked_sub(*low).unwrap_or(if high < low {
                Decimal::MIN
            } else {
                Decimal::MAX
            })
        }
        _ => Decimal::ZERO,
    }
}

fn stepped_back(value: &ScalarValue, width: Decimal) -> ScalarValue {
    match value {
        ScalarValue::Integer(value) => {
            let low = Decimal::from(*value)
                .checked_sub(width)
                .map(|low| low.floor().to_i64().unwrap_or(i64::MIN))
                .unwrap_or(i64::MIN);
            ScalarValue::Integer(low)
        }
        ScalarValue::Float(value) => {
            ScalarValue::Float(value.checked_sub(width).unwrap_or(Decimal::MIN))
        }
        other => *other,
    }
}

#[derive(Default)]
struct InListStore {
    by_element: HashMap<ScalarValue, HandleCounts>,
    by_key: HashMap<MultiKey, HandleCounts>,
}

impl InListStore {
    fn put(&mut self, key: &MultiKey, handle: FilterHandle) {
        *self
            .by_key
            .entry(key.clone())
            .or_default()
            .entry(handle)
            .or_insert(0) += 1;
        for element in key.values() {
            *self
                .by_element
                .entry(*element)
                .or_default()
                .entry(handle)
                .or_insert(0) += 1;
        }
    }

    fn remove(&mut self, key: &MultiKey, handle: FilterHandle) -> bool {
        let Some(handles) = self.by_key.get_mut(key) else {
            return false;
        };
        if !decrement(handles, handle) {
            return false;
        }
        if handles.is_empty() {
            self.by_key.remove(key);
        }
        for element in key.values() {
            if let Some(handles) = self.by_element.get_mut(element) {
                decrement(handles, handle);
                if handles.is_empty() {
                    self.by_element.remove(element);
                }
            }
        }
        true
    }

    fn match_value(&self, value: &ScalarValue, matches: &mut HandleCounts) {
        if let Some(handles) = self.by_element.get(value) {
            tally(handles, matches);
        }
    }
}

/// The inverted membership index: it remembers which handles exclude each
/// value, plus the universe of every handle it holds. A probed value matches
/// all handles that do not exclude it, so an empty index matches nothing and
/// a value no handle excludes matches everything.
#[derive(Default)]
struct NotInListStore {
    excluded: HashMap<ScalarValue, HandleCounts>,
    by_key: HashMap<MultiKey, HandleCounts>,
    universe: HandleCounts,
}

impl NotInListStore {
    fn put(&mut self, key: &MultiKey, handle: FilterHandle) {
        *self
            .by_key
            .entry(key.clone())
            .or_default()
            .entry(handle)
            .or_insert(0) += 1;
        for element in key.values() {
            *self
                .excluded
                .entry(*element)
                .or_default()
                .entry(handle)
                .or_insert(0) += 1;
        }
        *self.universe.entry(handle).or_insert(0) += 1;
    }

    fn remove(&mut self, key: &MultiKey, handle: FilterHandle) -> bool {
        let Some(handles) = self.by_key.get_mut(key) else {
            return false;
        };
        if !decrement(handles, handle) {
            return false;
        }
        if handles.is_empty() {
            self.by_key.remove(key);
        }
        for element in key.values() {
            if let Some(handles) = self.excluded.get_mut(element) {
                decrement(handles, handle);
                if handles.is_empty() {
                    self.excluded.remove(element);
                }
            }
        }
        decrement(&mut self.universe, handle);
        true
    }

    fn match_value(&self, value: &ScalarValue, matches: &mut HandleCounts) {
        let hidden = self.excluded.get(value);
        for (handle, total) in &self.universe {
            let hidden = hidden
                .and_then(|handles| handles.get(handle))
                .copied()
                .unwrap_or(0);
            if *total > hidden {
                *matches.entry(*handle).or_insert(0) += total - hidden;
            }
        }
    }
}
