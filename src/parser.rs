use crate::{
    ast::Node,
    error::ParserError,
    events::AttributeTable,
    lexer::{Lexer, Token},
    predicates::{Predicate, PredicateKind},
    strings::StringTable,
};
use lalrpop_util::{lalrpop_mod, ParseError};

lalrpop_mod!(
    #[allow(clippy::all)]
    #[rustfmt::skip]
    grammar
);

pub type FilterParseError<'a> = ParseError<usize, Token<'a>, ParserError>;

pub fn parse<'a>(
    attributes: &AttributeTable,
    strings: &mut StringTable,
    input: &'a str,
) -> Result<Node, FilterParseError<'a>> {
    let lexer = Lexer::new(input);
    grammar::TreeParser::new().parse(attributes, strings, lexer)
}

pub(crate) fn predicate<'a>(
    attributes: &AttributeTable,
    name: &str,
    kind: PredicateKind,
) -> Result<Predicate, FilterParseError<'a>> {
    Predicate::new(attributes, name, kind).map_err(|error| ParseError::User {
        error: ParserError::Event(error),
    })
}
