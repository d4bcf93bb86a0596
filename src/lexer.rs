use crate::error::ParserError;
use logos::{Logos, SpannedIter};
use rust_decimal::Decimal;

fn trim_edges<'input>(lexer: &logos::Lexer<'input, Token<'input>>) -> &'input str {
    let slice = lexer.slice();
    &slice[1..slice.len() - 1]
}

#[derive(Logos, Clone, PartialEq, Debug)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'input> {
    #[token("and")]
    #[token("&&")]
    And,
    #[token("or")]
    #[token("||")]
    Or,
    #[token("not")]
    #[token("!")]
    Not,
    #[token("is")]
    Is,
    #[token("null")]
    Null,
    #[token("empty")]
    Empty,
    #[token("in")]
    In,
    #[token("one")]
    One,
    #[token("none")]
    None,
    #[token("all")]
    All,
    #[token("of")]
    Of,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEqual,
    #[token("=")]
    Equal,
    #[token("<>")]
    NotEqual,
    #[token("(")]
    LeftParenthesis,
    #[token(")")]
    RightParenthesis,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*", |lexer| lexer.slice())]
    Identifier(&'input str),
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lexer| &lexer.slice()[1..])]
    Binding(&'input str),
    #[regex("-?[0-9]+", |lexer| lexer.slice().parse::<i64>().ok())]
    Integer(i64),
    #[regex(r"-?[0-9]+\.[0-9]+", |lexer| lexer.slice().parse::<Decimal>().ok())]
    Float(Decimal),
    #[regex(r#""[^"]*""#, trim_edges)]
    #[regex(r"'[^']*'", trim_edges)]
    String(&'input str),
}

pub type Spanned<Token, Location, Error> = Result<(Location, Token, Location), Error>;

/// Adapts the [`logos`] token stream to the triples expected by the
/// generated parser.
pub struct Lexer<'input> {
    token_stream: SpannedIter<'input, Token<'input>>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            token_stream: Token::lexer(input).spanned(),
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Spanned<Token<'input>, usize, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.token_stream.next().map(|(token, span)| match token {
            Ok(token) => Ok((span.start, token, span.end)),
            Err(()) => Err(ParserError::InvalidToken(span.start, span.end)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token<'_>> {
        Token::lexer(input)
            .map(|token| token.unwrap_or_else(|_| panic!("invalid token in {input:?}")))
            .collect()
    }

    #[test]
    fn can_tokenize_keywords_and_symbols() {
        assert_eq!(
            vec![
                Token::Identifier("price"),
                Token::LessThanEqual,
                Token::Integer(10),
                Token::And,
                Token::Not,
                Token::Identifier("private"),
            ],
            tokenize(r#"price <= 10 and not private"#)
        );
    }

    #[test]
    fn can_tokenize_symbolic_operator_aliases() {
        assert_eq!(
            vec![
                Token::Identifier("a"),
                Token::And,
                Token::Identifier("b"),
                Token::Or,
                Token::Not,
                Token::Identifier("c"),
            ],
            tokenize(r#"a && b || !c"#)
        );
    }

    #[test]
    fn can_tokenize_numbers() {
        assert_eq!(
            vec![
                Token::Integer(-5),
                Token::Float(Decimal::new(25, 1)),
                Token::Float(Decimal::new(-10, 2)),
            ],
            tokenize(r#"-5 2.5 -0.10"#)
        );
    }

    #[test]
    fn can_tokenize_strings_with_both_quote_styles() {
        assert_eq!(
            vec![Token::String("doe"), Token::String("john")],
            tokenize(r#"'doe' "john""#)
        );
    }

    #[test]
    fn can_tokenize_bindings() {
        assert_eq!(
            vec![
                Token::Identifier("deal"),
                Token::Equal,
                Token::Binding("deal_id"),
            ],
            tokenize(r#"deal = $deal_id"#)
        );
    }

    #[test]
    fn reports_invalid_tokens_with_their_span() {
        let mut lexer = Lexer::new("a @ b");

        assert_eq!(Some(Ok((0, Token::Identifier("a"), 1))), lexer.next());
        assert_eq!(Some(Err(ParserError::InvalidToken(2, 3))), lexer.next());
    }
}
