use crate::{events::Event, predicates::Predicate};

pub type TreeNode = Box<Node>;

/// A boolean filter expression tree. This is the input to decomposition
/// and the form residual expressions keep after it.
#[derive(Eq, Hash, PartialEq, Clone, Debug)]
pub enum Node {
    And(TreeNode, TreeNode),
    Or(TreeNode, TreeNode),
    Not(TreeNode),
    Value(Predicate),
}

impl Node {
    /// Flattens the top-level conjunction into its conjuncts, in source
    /// order. Anything that is not an `And` is a single conjunct.
    pub(crate) fn conjuncts(&self) -> Vec<&Node> {
        let mut conjuncts = vec![];
        self.collect_conjuncts(&mut conjuncts);
        conjuncts
    }

    fn collect_conjuncts<'a>(&'a self, conjuncts: &mut Vec<&'a Node>) {
        match self {
            Self::And(left, right) => {
                left.collect_conjuncts(conjuncts);
                right.collect_conjuncts(conjuncts);
            }
            node => conjuncts.push(node),
        }
    }

    /// Rebuilds a left-associative conjunction from conjuncts. Returns
    /// `None` for an empty slice.
    pub(crate) fn conjoin(conjuncts: Vec<Node>) -> Option<Node> {
        conjuncts.into_iter().reduce(|conjunction, conjunct| {
            Node::And(Box::new(conjunction), Box::new(conjunct))
        })
    }

    /// Direct evaluation against one event. Used for residual expressions
    /// and as the reference semantics for index matching.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            Self::And(left, right) => left.evaluate(event) && right.evaluate(event),
            Self::Or(left, right) => left.evaluate(event) || right.evaluate(event),
            Self::Not(node) => !node.evaluate(event),
            Self::Value(predicate) => predicate.evaluate(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{AttributeDefinition, AttributeTable, EventBuilder, EventTypeId},
        predicates::{
            ComparisonOperator, ComparisonValue, ListLiteral, PredicateKind, SetOperator,
        },
        strings::StringTable,
    };
    use parking_lot::RwLock;

    fn a_table() -> AttributeTable {
        AttributeTable::new(&[
            AttributeDefinition::integer("price"),
            AttributeDefinition::boolean("private"),
        ])
        .unwrap()
    }

    fn a_predicate(table: &AttributeTable) -> Node {
        Node::Value(
            Predicate::new(
                table,
                "price",
                PredicateKind::Comparison(
                    ComparisonOperator::LessThan,
                    ComparisonValue::Integer(10),
                ),
            )
            .unwrap(),
        )
    }

    fn another_predicate(table: &AttributeTable) -> Node {
        Node::Value(
            Predicate::new(
                table,
                "price",
                PredicateKind::Set(SetOperator::In, ListLiteral::IntegerList(vec![1, 2])),
            )
            .unwrap(),
        )
    }

    #[test]
    fn conjuncts_flatten_nested_conjunctions() {
        let table = a_table();
        let tree = Node::And(
            Box::new(Node::And(
                Box::new(a_predicate(&table)),
                Box::new(another_predicate(&table)),
            )),
            Box::new(Node::Not(Box::new(a_predicate(&table)))),
        );

        let conjuncts = tree.conjuncts();

        assert_eq!(3, conjuncts.len());
        assert!(matches!(conjuncts[2], Node::Not(_)));
    }

    #[test]
    fn a_disjunction_is_a_single_conjunct() {
        let table = a_table();
        let tree = Node::Or(
            Box::new(a_predicate(&table)),
            Box::new(another_predicate(&table)),
        );

        assert_eq!(1, tree.conjuncts().len());
    }

    #[test]
    fn conjoin_rebuilds_a_left_associative_tree() {
        let table = a_table();
        let rebuilt = Node::conjoin(vec![
            a_predicate(&table),
            another_predicate(&table),
            a_predicate(&table),
        ])
        .unwrap();

        assert_eq!(3, rebuilt.conjuncts().len());
        assert!(matches!(rebuilt, Node::And(_, _)));
    }

    #[test]
    fn conjoin_of_nothing_is_none() {
        assert_eq!(None, Node::conjoin(vec![]));
    }

    #[test]
    fn evaluation_follows_boolean_semantics() {
        let table = a_table();
        let strings = RwLock::new(StringTable::new());
        let mut builder = EventBuilder::new(EventTypeId(0), &table, &strings);
        builder.with_integer("price", 5).unwrap();
        builder.with_boolean("private", false).unwrap();
        let event = builder.build().unwrap();

        let lhs = a_predicate(&table);
        let rhs = another_predicate(&table);
        assert!(lhs.evaluate(&event));
        assert!(!rhs.evaluate(&event));
        assert!(!Node::And(Box::new(lhs.clone()), Box::new(rhs.clone())).evaluate(&event));
        assert!(Node::Or(Box::new(lhs.clone()), Box::new(rhs.clone())).evaluate(&event));
        assert!(Node::Not(Box::new(rhs)).evaluate(&event));
    }
}
