//! Module for parsing algebraic expression strings (rate equations and symbolic
//! stoichiometric coefficients) into [`Expr`] values

use crate::expression::{Expr, Symbol};
use crate::io::expr_parse::lexer::LexerError;
use crate::io::expr_parse::parser::ParseError;
use indexmap::IndexMap;
use thiserror::Error;

mod lexer;
pub mod parser;
mod token;

/// Parse an expression string into an [`Expr`]
///
/// # Parameters
/// - `input`: &str holding the expression, e.g. `"mu*S/(K + S)"`
/// - `symbols`: map of the names allowed in the expression to their symbols
///
/// # Returns
/// Parse result which is
/// - `Ok`: The expression in canonical form
/// - `Err`: The ExpressionParseError describing the issue with the expression, a name
///   missing from `symbols` gives [`ParseError::UndefinedSymbol`]
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use stoichrs_core::expression::Symbol;
/// use stoichrs_core::io::expr_parse::parse_expression;
/// let mut symbols = IndexMap::new();
/// symbols.insert("k".to_string(), Symbol::new("k"));
/// symbols.insert("A".to_string(), Symbol::new("A"));
/// let rate = parse_expression("k * A", &symbols).unwrap();
/// assert_eq!(rate.to_string(), "A*k");
/// ```
pub fn parse_expression(
    input: &str,
    symbols: &IndexMap<String, Symbol>,
) -> Result<Expr, ExpressionParseError> {
    // Start by converting the expression string into tokens
    let tokens = lexer::Lexer::new(input).lex()?;

    // Now parse those tokens into an expression tree
    let mut parser = parser::ExpressionParser::new(tokens, symbols);
    let expr = parser.parse()?;
    Ok(expr)
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionParseError {
    /// Lexing Error
    #[error("Error occurred during lexing: {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing: {0}")]
    ParsingError(#[from] ParseError),
}

impl ExpressionParseError {
    /// Name of the undeclared symbol, if that is what caused the error
    pub fn undefined_symbol(&self) -> Option<&str> {
        match self {
            ExpressionParseError::ParsingError(ParseError::UndefinedSymbol(name)) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_equation() {
        let symbols: IndexMap<String, Symbol> = ["mu", "S", "K", "X"]
            .iter()
            .map(|n| (n.to_string(), Symbol::new(n)))
            .collect();
        let rate = parse_expression("mu * S / (K + S) * X", &symbols).unwrap();
        assert_eq!(rate.to_string(), "S*X*mu/(K + S)");
        let free: Vec<String> = rate
            .free_symbols()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(free, vec!["K", "S", "X", "mu"]);
    }

    #[test]
    fn test_undefined_symbol() {
        let symbols = IndexMap::new();
        let err = parse_expression("k", &symbols).unwrap_err();
        assert_eq!(err.undefined_symbol(), Some("k"));
        let err = parse_expression("1 $ 2", &symbols).unwrap_err();
        assert!(matches!(err, ExpressionParseError::LexingError(_)));
    }
}
