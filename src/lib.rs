//! A filter indexing and matching engine for continuous queries: filter
//! expressions are decomposed into indexable parameters when they are
//! registered, and typed events are matched against every standing filter
//! through shared per-operator indexes.
mod ast;
mod decompose;
mod engine;
mod error;
mod events;
mod index;
mod lexer;
mod parser;
mod plan;
mod predicates;
mod registry;
mod strings;
#[cfg(test)]
mod test_utils;

pub use crate::{
    ast::Node,
    engine::{DirectEvaluator, FilterEngine, MatchReport, ResidualEvaluator},
    error::{FilterError, ParserError},
    events::{
        AttributeDefinition, AttributeIndex, AttributeKind, AttributeTable, AttributeValue, Event,
        EventBuilder, EventError, EventType, EventTypeId,
    },
    index::{FilterHandle, FilterParamIndex, HandleCounts, IndexError},
    lexer::Token,
    parser::FilterParseError,
    plan::{
        BindingValue, Bindings, FilterOperator, FilterParameter, FilterPlan, FilterValue,
        FilterValueSource, Lookupable, MultiKey, ScalarValue,
    },
    predicates::{
        ComparisonOperator, ComparisonValue, EqualityOperator, ListLiteral, ListOperator,
        NullOperator, Predicate, PredicateKind, PrimitiveLiteral, SetOperator,
    },
    registry::FilterIndexRegistry,
    strings::StringId,
};
