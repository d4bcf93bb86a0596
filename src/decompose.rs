use crate::{
    ast::Node,
    events::{AttributeIndex, AttributeTable, EventTypeId},
    plan::{
        FilterOperator, FilterParameter, FilterPlan, FilterValue, FilterValueSource, Lookupable,
        MultiKey, ScalarValue,
    },
    predicates::{
        ComparisonOperator, ComparisonValue, EqualityOperator, ListLiteral, Predicate,
        PredicateKind, PrimitiveLiteral, SetOperator,
    },
};
use indexmap::IndexMap;
use itertools::Itertools;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Rewrites a filter expression into its indexable parameters plus the
/// residual it could not decompose.
///
/// Only top-level conjuncts are considered, one parameter per conjunct at
/// most. Decomposition is exact: a registration built from the returned plan
/// accepts precisely the events the original expression accepts.
pub(crate) fn decompose(
    event_type: EventTypeId,
    attributes: &AttributeTable,
    tree: Node,
) -> FilterPlan {
    let mut lookupables = LookupableCache::new(attributes);
    let mut map = DecompositionMap::new();
    for conjunct in tree.conjuncts() {
        let parameter = indexable(conjunct, &mut lookupables);
        map.put(conjunct.clone(), parameter);
    }
    consolidate_ranges(&mut map);
    consolidate_not_equals(&mut map);
    debug!(
        parameters = map.parameters().count(),
        unassigned = map.count_unassigned(),
        "decomposed a filter expression"
    );
    map.into_plan(event_type)
}

/// Two-sided bookkeeping for one decomposition: every top-level conjunct is
/// either assigned to exactly one parameter or tracked as unassigned, never
/// both. Insertion order is preserved so plans come out deterministic.
#[derive(Default)]
pub(crate) struct DecompositionMap {
    assignments: IndexMap<Node, Option<FilterParameter>>,
}

impl DecompositionMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&mut self, node: Node, parameter: Option<FilterParameter>) {
        self.assignments.insert(node, parameter);
    }

    pub(crate) fn parameters(&self) -> impl Iterator<Item = &FilterParameter> {
        self.assignments.values().flatten()
    }

    pub(crate) fn unassigned(&self) -> impl Iterator<Item = &Node> {
        self.assignments
            .iter()
            .filter_map(|(node, parameter)| parameter.is_none().then_some(node))
    }

    pub(crate) fn count_unassigned(&self) -> usize {
        self.assignments
            .values()
            .filter(|parameter| parameter.is_none())
            .count()
    }

    /// Withdraws a parameter assignment, re-filing its expression as
    /// unassigned so the residual still covers it.
    pub(crate) fn remove_value(&mut self, parameter: &FilterParameter) {
        let node = self.assignments.iter().find_map(|(node, assigned)| {
            (assigned.as_ref() == Some(parameter)).then(|| node.clone())
        });
        let Some(node) = node else {
            unreachable!("Withdrew a parameter that was never assigned. This is a bug.");
        };
        self.assignments.insert(node, None);
    }

    /// Drops an expression wholly covered by a consolidated parameter.
    fn remove_entry(&mut self, node: &Node) {
        if self.assignments.shift_remove(node).is_none() {
            unreachable!("Removed an expression that was never tracked. This is a bug.");
        }
    }

    fn into_plan(self, event_type: EventTypeId) -> FilterPlan {
        let parameters = self.parameters().cloned().collect();
        let residual = Node::conjoin(self.unassigned().cloned().collect());
        FilterPlan::new(event_type, parameters, residual)
    }
}

struct LookupableCache<'a> {
    attributes: &'a AttributeTable,
    by_attribute: HashMap<AttributeIndex, Arc<Lookupable>>,
}

impl<'a> LookupableCache<'a> {
    fn new(attributes: &'a AttributeTable) -> Self {
        Self {
            attributes,
            by_attribute: HashMap::new(),
        }
    }

    fn lookupable(&mut self, attribute: AttributeIndex) -> Arc<Lookupable> {
        Arc::clone(self.by_attribute.entry(attribute).or_insert_with(|| {
            Arc::new(Lookupable::new(
                self.attributes.name_of(attribute),
                attribute,
                self.attributes.by_id(attribute),
            ))
        }))
    }
}

fn indexable(node: &Node, lookupables: &mut LookupableCache) -> Option<FilterParameter> {
    match node {
        Node::Value(predicate) => from_predicate(predicate, lookupables),
        Node::Not(inner) => from_negation(inner, lookupables),
        Node::Or(..) => {
            let (lookupable, values) = equality_disjunction(node, lookupables)?;
            Some(FilterParameter::new(
                lookupable,
                FilterOperator::InList,
                FilterValueSource::Constant(FilterValue::List(values)),
            ))
        }
        Node::And(..) => None,
    }
}

fn from_predicate(
    predicate: &Predicate,
    lookupables: &mut LookupableCache,
) -> Option<FilterParameter> {
    let kind = predicate.kind().clone();
    let (operator, source) = match kind {
        PredicateKind::Variable => (
            FilterOperator::Equal,
            FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::Boolean(true))),
        ),
        PredicateKind::Equality(operator, literal) => (
            equality_operator(operator),
            primitive_source(literal),
        ),
        PredicateKind::Comparison(operator, value) => (
            comparison_operator(operator),
            comparison_source(value),
        ),
        PredicateKind::Set(operator, values) => (
            set_operator(operator),
            FilterValueSource::Constant(FilterValue::List(multi_key(&values))),
        ),
        PredicateKind::List(..) | PredicateKind::Null(..) => return None,
    };
    Some(FilterParameter::new(
        lookupables.lookupable(predicate.attribute()),
        operator,
        source,
    ))
}

/// Negations are pushed down rather than left residual: the negated operator
/// is indexable whenever the affirmative one is.
fn from_negation(inner: &Node, lookupables: &mut LookupableCache) -> Option<FilterParameter> {
    match inner {
        Node::Value(predicate) => {
            let kind = predicate.kind().clone();
            let (operator, source) = match kind {
                PredicateKind::Variable => (
                    FilterOperator::Equal,
                    FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::Boolean(false))),
                ),
                PredicateKind::Equality(operator, literal) => (
                    equality_operator(operator.inverse()),
                    primitive_source(literal),
                ),
                PredicateKind::Comparison(operator, value) => (
                    comparison_operator(operator.inverse()),
                    comparison_source(value),
                ),
                PredicateKind::Set(operator, values) => (
                    set_operator(inverse_set_operator(operator)),
                    FilterValueSource::Constant(FilterValue::List(multi_key(&values))),
                ),
                PredicateKind::List(..) | PredicateKind::Null(..) => return None,
            };
            Some(FilterParameter::new(
                lookupables.lookupable(predicate.attribute()),
                operator,
                source,
            ))
        }
        Node::Not(inner) => indexable(inner, lookupables),
        Node::Or(..) => {
            let (lookupable, values) = equality_disjunction(inner, lookupables)?;
            Some(FilterParameter::new(
                lookupable,
                FilterOperator::NotInList,
                FilterValueSource::Constant(FilterValue::List(values)),
            ))
        }
        Node::And(..) => None,
    }
}

/// A disjunction of constant equalities over one attribute, collapsed into
/// the sorted set of accepted values.
fn equality_disjunction(
    node: &Node,
    lookupables: &mut LookupableCache,
) -> Option<(Arc<Lookupable>, MultiKey)> {
    let mut disjuncts = Vec::new();
    collect_disjuncts(node, &mut disjuncts);
    let equalities = disjuncts
        .iter()
        .map(|disjunct| {
            let Node::Value(predicate) = disjunct else {
                return None;
            };
            let PredicateKind::Equality(EqualityOperator::Equal, literal) = predicate.kind()
            else {
                return None;
            };
            Some((predicate.attribute(), constant_scalar(literal)?))
        })
        .collect::<Option<Vec<_>>>()?;
    if !equalities.iter().map(|(attribute, _)| attribute).all_equal() {
        return None;
    }
    let (attribute, _) = *equalities.first()?;
    let mut values: Vec<_> = equalities.into_iter().map(|(_, value)| value).collect();
    values.sort_unstable();
    values.dedup();
    Some((lookupables.lookupable(attribute), MultiKey::new(values)))
}

fn collect_disjuncts<'a>(node: &'a Node, into: &mut Vec<&'a Node>) {
    match node {
        Node::Or(left, right) => {
            collect_disjuncts(left, into);
            collect_disjuncts(right, into);
        }
        other => into.push(other),
    }
}

/// Fuses a lower-bound and an upper-bound comparison over one attribute into
/// a single range parameter with the matching endpoint inclusivity.
fn consolidate_ranges(map: &mut DecompositionMap) {
    while let Some((low_node, high_node, parameter)) = find_range_pair(map) {
        map.remove_entry(&high_node);
        map.put(low_node, Some(parameter));
    }
}

fn find_range_pair(map: &DecompositionMap) -> Option<(Node, Node, FilterParameter)> {
    for (low_node, assigned) in &map.assignments {
        let Some(low) = assigned else {
            continue;
        };
        let lower_inclusive = match low.operator() {
            FilterOperator::GreaterThan => false,
            FilterOperator::GreaterThanEqual => true,
            _ => continue,
        };
        let FilterValueSource::Constant(FilterValue::Scalar(low_value)) = low.source() else {
            continue;
        };
        for (high_node, assigned) in &map.assignments {
            let Some(high) = assigned else {
                continue;
            };
            let upper_inclusive = match high.operator() {
                FilterOperator::LessThan => false,
                FilterOperator::LessThanEqual => true,
                _ => continue,
            };
            if high.lookupable().attribute() != low.lookupable().attribute() {
                continue;
            }
            let FilterValueSource::Constant(FilterValue::Scalar(high_value)) = high.source()
            else {
                continue;
            };
            let operator = match (lower_inclusive, upper_inclusive) {
                (true, true) => FilterOperator::RangeClosed,
                (false, false) => FilterOperator::RangeOpen,
                (true, false) => FilterOperator::RangeHalfOpen,
                (false, true) => FilterOperator::RangeHalfClosed,
            };
            let parameter = FilterParameter::new(
                Arc::clone(low.lookupable()),
                operator,
                FilterValueSource::Constant(FilterValue::Range {
                    low: *low_value,
                    high: *high_value,
                }),
            );
            return Some((low_node.clone(), high_node.clone(), parameter));
        }
    }
    None
}

/// Collapses two or more constant inequalities over one attribute into a
/// single excluded-value set.
fn consolidate_not_equals(map: &mut DecompositionMap) {
    let groups: HashMap<AttributeIndex, Vec<(Node, FilterParameter)>> = map
        .assignments
        .iter()
        .filter_map(|(node, assigned)| {
            let parameter = assigned.as_ref()?;
            if parameter.operator() != FilterOperator::NotEqual {
                return None;
            }
            let FilterValueSource::Constant(FilterValue::Scalar(_)) = parameter.source() else {
                return None;
            };
            Some((
                parameter.lookupable().attribute(),
                (node.clone(), parameter.clone()),
            ))
        })
        .into_group_map();
    for group in groups.into_values() {
        let [(first, parameter), rest @ ..] = group.as_slice() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let mut values: Vec<ScalarValue> = group
            .iter()
            .map(|(_, parameter)| match parameter.source() {
                FilterValueSource::Constant(FilterValue::Scalar(value)) => *value,
                source => {
                    unreachable!("Grouped a non-scalar source => got: {source:?}. This is a bug.")
                }
            })
            .collect();
        values.sort_unstable();
        values.dedup();
        let combined = FilterParameter::new(
            Arc::clone(parameter.lookupable()),
            FilterOperator::NotInList,
            FilterValueSource::Constant(FilterValue::List(MultiKey::new(values))),
        );
        map.remove_value(parameter);
        for (node, _) in rest {
            map.remove_entry(node);
        }
        map.put(first.clone(), Some(combined));
    }
}

fn equality_operator(operator: EqualityOperator) -> FilterOperator {
    match operator {
        EqualityOperator::Equal => FilterOperator::Equal,
        EqualityOperator::NotEqual => FilterOperator::NotEqual,
    }
}

fn comparison_operator(operator: ComparisonOperator) -> FilterOperator {
    match operator {
        ComparisonOperator::LessThan => FilterOperator::LessThan,
        ComparisonOperator::LessThanEqual => FilterOperator::LessThanEqual,
        ComparisonOperator::GreaterThan => FilterOperator::GreaterThan,
        ComparisonOperator::GreaterThanEqual => FilterOperator::GreaterThanEqual,
    }
}

fn set_operator(operator: SetOperator) -> FilterOperator {
    match operator {
        SetOperator::In => FilterOperator::InList,
        SetOperator::NotIn => FilterOperator::NotInList,
    }
}

fn inverse_set_operator(operator: SetOperator) -> SetOperator {
    match operator {
        SetOperator::In => SetOperator::NotIn,
        SetOperator::NotIn => SetOperator::In,
    }
}

fn primitive_source(literal: PrimitiveLiteral) -> FilterValueSource {
    match literal {
        PrimitiveLiteral::Integer(value) => {
            FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::Integer(value)))
        }
        PrimitiveLiteral::Float(value) => {
            FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::Float(value)))
        }
        PrimitiveLiteral::String(value) => {
            FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::String(value)))
        }
        PrimitiveLiteral::Binding(name) => FilterValueSource::Binding(name),
    }
}

fn comparison_source(value: ComparisonValue) -> FilterValueSource {
    match value {
        ComparisonValue::Integer(value) => {
            FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::Integer(value)))
        }
        ComparisonValue::Float(value) => {
            FilterValueSource::Constant(FilterValue::Scalar(ScalarValue::Float(value)))
        }
        ComparisonValue::Binding(name) => FilterValueSource::Binding(name),
    }
}

fn constant_scalar(literal: &PrimitiveLiteral) -> Option<ScalarValue> {
    match literal {
        PrimitiveLiteral::Integer(value) => Some(ScalarValue::Integer(*value)),
        PrimitiveLiteral::Float(value) => Some(ScalarValue::Float(*value)),
        PrimitiveLiteral::String(value) => Some(ScalarValue::String(*value)),
        PrimitiveLiteral::Binding(_) => None,
    }
}

fn multi_key(values: &ListLiteral) -> MultiKey {
    match values {
        ListLiteral::IntegerList(values) => MultiKey::new(
            values.iter().map(|value| ScalarValue::Integer(*value)).collect(),
        ),
        ListLiteral::StringList(values) => MultiKey::new(
            values.iter().map(|value| ScalarValue::String(*value)).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::AttributeDefinition, parser, strings::StringTable};

    fn a_table() -> AttributeTable {
        AttributeTable::new(&[
            AttributeDefinition::boolean("private"),
            AttributeDefinition::boolean("exclusive"),
            AttributeDefinition::integer("price"),
            AttributeDefinition::float("bidfloor"),
            AttributeDefinition::string("country"),
            AttributeDefinition::integer_list("segment_ids"),
            AttributeDefinition::string_list("deals"),
        ])
        .unwrap()
    }

    fn a_plan(expression: &str) -> FilterPlan {
        a_plan_with_strings(expression).0
    }

    fn a_plan_with_strings(expression: &str) -> (FilterPlan, StringTable) {
        let table = a_table();
        let mut strings = StringTable::new();
        let tree = parser::parse(&table, &mut strings, expression).unwrap();
        (decompose(EventTypeId(0), &table, tree), strings)
    }

    fn a_parameter(
        name: &str,
        operator: FilterOperator,
        source: FilterValueSource,
    ) -> FilterParameter {
        let table = a_table();
        let attribute = table.by_name(name).unwrap();
        FilterParameter::new(
            Arc::new(Lookupable::new(name, attribute, table.by_id(attribute))),
            operator,
            source,
        )
    }

    fn constant(value: ScalarValue) -> FilterValueSource {
        FilterValueSource::Constant(FilterValue::Scalar(value))
    }

    fn constant_list(values: Vec<ScalarValue>) -> FilterValueSource {
        FilterValueSource::Constant(FilterValue::List(MultiKey::new(values)))
    }

    fn integers(values: &[i64]) -> Vec<ScalarValue> {
        values.iter().map(|value| ScalarValue::Integer(*value)).collect()
    }

    #[test]
    fn a_single_comparison_becomes_one_parameter() {
        let plan = a_plan("price < 15");

        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::LessThan,
                constant(ScalarValue::Integer(15))
            )],
            plan.parameters()
        );
        assert_eq!(None, plan.residual());
    }

    #[test]
    fn each_conjunct_decomposes_independently() {
        let (plan, strings) = a_plan_with_strings("price < 15 and country = 'CA'");

        assert_eq!(
            vec![
                a_parameter(
                    "price",
                    FilterOperator::LessThan,
                    constant(ScalarValue::Integer(15))
                ),
                a_parameter(
                    "country",
                    FilterOperator::Equal,
                    constant(ScalarValue::String(strings.get("CA")))
                ),
            ],
            plan.parameters()
        );
        assert_eq!(None, plan.residual());
    }

    #[test]
    fn boolean_variables_become_equalities_on_their_truth_value() {
        let plan = a_plan("private and not exclusive");

        assert_eq!(
            vec![
                a_parameter(
                    "private",
                    FilterOperator::Equal,
                    constant(ScalarValue::Boolean(true))
                ),
                a_parameter(
                    "exclusive",
                    FilterOperator::Equal,
                    constant(ScalarValue::Boolean(false))
                ),
            ],
            plan.parameters()
        );
        assert_eq!(None, plan.residual());
    }

    #[test]
    fn negations_push_down_to_the_complementary_operator() {
        let plan = a_plan("not price < 15");
        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::GreaterThanEqual,
                constant(ScalarValue::Integer(15))
            )],
            plan.parameters()
        );

        let (plan, strings) = a_plan_with_strings("not country <> 'CA'");
        assert_eq!(
            vec![a_parameter(
                "country",
                FilterOperator::Equal,
                constant(ScalarValue::String(strings.get("CA")))
            )],
            plan.parameters()
        );

        let plan = a_plan("not not private");
        assert_eq!(
            vec![a_parameter(
                "private",
                FilterOperator::Equal,
                constant(ScalarValue::Boolean(true))
            )],
            plan.parameters()
        );

        let plan = a_plan("not price in (1, 2)");
        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::NotInList,
                constant_list(integers(&[1, 2]))
            )],
            plan.parameters()
        );
    }

    #[test]
    fn an_equality_disjunction_over_one_attribute_collapses_to_in_list() {
        let plan = a_plan("price = 3 or price = 1 or price = 2");

        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::InList,
                constant_list(integers(&[1, 2, 3]))
            )],
            plan.parameters()
        );
        assert_eq!(None, plan.residual());
    }

    #[test]
    fn a_negated_equality_disjunction_collapses_to_not_in_list() {
        let plan = a_plan("not (price = 1 or price = 2)");

        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::NotInList,
                constant_list(integers(&[1, 2]))
            )],
            plan.parameters()
        );
    }

    #[test]
    fn a_disjunction_across_attributes_stays_residual() {
        let (plan, _) = a_plan_with_strings("price = 1 or country = 'CA'");

        assert!(plan.parameters().is_empty());
        assert!(plan.residual().is_some());
    }

    #[test]
    fn repeated_inequalities_consolidate_into_not_in_list() {
        let plan = a_plan("price <> 3 and price <> 1 and price <> 2");

        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::NotInList,
                constant_list(integers(&[1, 2, 3]))
            )],
            plan.parameters()
        );
        assert_eq!(None, plan.residual());
    }

    #[test]
    fn a_single_inequality_stays_not_equals() {
        let plan = a_plan("price <> 3");

        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::NotEqual,
                constant(ScalarValue::Integer(3))
            )],
            plan.parameters()
        );
    }

    #[test]
    fn bound_pairs_fuse_into_ranges() {
        for (expression, operator) in [
            ("price >= 10 and price <= 20", FilterOperator::RangeClosed),
            ("price > 10 and price < 20", FilterOperator::RangeOpen),
            ("price >= 10 and price < 20", FilterOperator::RangeHalfOpen),
            ("price > 10 and price <= 20", FilterOperator::RangeHalfClosed),
        ] {
            let plan = a_plan(expression);
            assert_eq!(
                vec![a_parameter(
                    "price",
                    operator,
                    FilterValueSource::Constant(FilterValue::Range {
                        low: ScalarValue::Integer(10),
                        high: ScalarValue::Integer(20),
                    })
                )],
                plan.parameters(),
                "{expression}"
            );
            assert_eq!(None, plan.residual(), "{expression}");
        }
    }

    #[test]
    fn an_unpaired_bound_stays_a_comparison() {
        let plan = a_plan("price >= 10 and price <= 20 and price >= 15");

        assert_eq!(
            vec![
                a_parameter(
                    "price",
                    FilterOperator::RangeClosed,
                    FilterValueSource::Constant(FilterValue::Range {
                        low: ScalarValue::Integer(10),
                        high: ScalarValue::Integer(20),
                    })
                ),
                a_parameter(
                    "price",
                    FilterOperator::GreaterThanEqual,
                    constant(ScalarValue::Integer(15))
                ),
            ],
            plan.parameters()
        );
    }

    #[test]
    fn binding_bounds_do_not_fuse_into_ranges() {
        let plan = a_plan("price >= $low and price <= 20");

        assert_eq!(
            vec![
                a_parameter(
                    "price",
                    FilterOperator::GreaterThanEqual,
                    FilterValueSource::Binding("low".to_string())
                ),
                a_parameter(
                    "price",
                    FilterOperator::LessThanEqual,
                    constant(ScalarValue::Integer(20))
                ),
            ],
            plan.parameters()
        );
    }

    #[test]
    fn membership_predicates_become_list_parameters() {
        let plan = a_plan("price in (3, 1)");
        assert_eq!(
            vec![a_parameter(
                "price",
                FilterOperator::InList,
                constant_list(integers(&[1, 3]))
            )],
            plan.parameters()
        );

        let (plan, strings) = a_plan_with_strings("country not in ('US', 'CA')");
        assert_eq!(
            vec![a_parameter(
                "country",
                FilterOperator::NotInList,
                constant_list(vec![
                    ScalarValue::String(strings.get("US")),
                    ScalarValue::String(strings.get("CA")),
                ])
            )],
            plan.parameters()
        );
    }

    #[test]
    fn null_tests_and_list_operators_stay_residual() {
        let plan = a_plan("price < 15 and deals is empty");

        assert_eq!(1, plan.parameters().len());
        assert_eq!(1, plan.unassigned_count());
        let residual = plan.residual().unwrap();
        assert!(matches!(residual, Node::Value(_)));

        let plan = a_plan("segment_ids one of (1, 2) and price is null");
        assert!(plan.parameters().is_empty());
        assert_eq!(2, plan.unassigned_count());
        assert!(plan.residual().is_some());
    }

    #[test]
    fn a_fully_indexed_plan_has_no_unassigned_conjuncts() {
        let plan = a_plan("price < 15 and private");

        assert_eq!(2, plan.parameters().len());
        assert_eq!(0, plan.unassigned_count());
    }

    #[test]
    fn lookupables_are_shared_within_a_plan() {
        let plan = a_plan("price >= 10 and price <= 20 and price <> 5");

        let [range, not_equals] = plan.parameters() else {
            panic!("expected two parameters, got {:?}", plan.parameters());
        };
        assert!(Arc::ptr_eq(range.lookupable(), not_equals.lookupable()));
    }

    #[test]
    fn withdrawing_an_assignment_refiles_the_expression_as_unassigned() {
        let table = a_table();
        let mut strings = StringTable::new();
        let tree = parser::parse(&table, &mut strings, "price < 15").unwrap();
        let mut lookupables = LookupableCache::new(&table);

        let mut map = DecompositionMap::new();
        let parameter = indexable(&tree, &mut lookupables).unwrap();
        map.put(tree.clone(), Some(parameter.clone()));
        assert_eq!(0, map.count_unassigned());

        map.remove_value(&parameter);
        assert_eq!(1, map.count_unassigned());
        assert_eq!(0, map.parameters().count());
        assert_eq!(vec![&tree], map.unassigned().collect::<Vec<_>>());
    }
}
