use crate::{
    engine::FilterEngine,
    events::{AttributeDefinition, Event, EventError, EventTypeId},
};
use serde_json::{Map, Value};

pub(crate) fn bid_request_definitions() -> Vec<AttributeDefinition> {
    vec![
        AttributeDefinition::boolean("private"),
        AttributeDefinition::integer("price"),
        AttributeDefinition::integer("exchange_id"),
        AttributeDefinition::float("bidfloor"),
        AttributeDefinition::string("country"),
        AttributeDefinition::integer_list("segment_ids"),
        AttributeDefinition::string_list("deals"),
    ]
}

pub(crate) fn an_engine() -> (FilterEngine, EventTypeId) {
    let mut engine = FilterEngine::new();
    let event_type = engine
        .define_event_type("bid_request", &bid_request_definitions())
        .expect("the fixture schema is valid");
    (engine, event_type)
}

/// Builds an event from a JSON object, routing each field to the setter for
/// its value shape. `null` marks an attribute as undefined; every declared
/// attribute must appear, mirroring the builder's own completeness rule.
pub(crate) fn event_from_json(engine: &FilterEngine, event_type: EventTypeId, json: &str) -> Event {
    let fields: Map<String, Value> =
        serde_json::from_str(json).expect("event fixtures are JSON objects");
    let mut builder = engine
        .make_event(event_type)
        .expect("the event type exists");
    for (name, value) in &fields {
        match value {
            Value::Null => builder.with_undefined(name),
            Value::Bool(value) => builder.with_boolean(name, *value),
            Value::Number(number) if number.is_i64() => {
                builder.with_integer(name, number.as_i64().expect("checked just above"))
            }
            Value::Number(number) => builder.with_float(
                name,
                number
                    .to_string()
                    .parse()
                    .expect("JSON numbers are valid decimals"),
            ),
            Value::String(value) => builder.with_string(name, value),
            Value::Array(values) if values.iter().all(Value::is_i64) => {
                let integers: Vec<i64> = values.iter().filter_map(Value::as_i64).collect();
                // An empty literal fits either list kind.
                match builder.with_integer_list(name, &integers) {
                    Err(EventError::MismatchingValue { .. }) if integers.is_empty() => {
                        builder.with_string_list(name, &[])
                    }
                    result => result,
                }
            }
            Value::Array(values) => {
                let strings: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
                builder.with_string_list(name, &strings)
            }
            Value::Object(_) => panic!("unsupported fixture value for {name:?}"),
        }
        .expect("the fixture matches the schema");
    }
    builder.build().expect("the fixture covers every attribute")
}
