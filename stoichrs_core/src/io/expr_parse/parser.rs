use crate::expression::{Expr, Function, Symbol};
use crate::io::expr_parse::token::Token;

use indexmap::IndexMap;
use thiserror::Error;
/*
Expression Grammar:
expression -> term (("+" | "-") term)* ;
term -> unary (("*" | "/") unary)* ;
unary -> ("-" | "+") unary | power ;
power -> primary ("^" unary)? ;
primary -> NUMBER | FUNCTION "(" expression ")" | SYMBOL | "(" expression ")" ;

e.g. mu_H * S_S / (K_S + S_S) * exp(-E_a / T)
 */

/// Expression Parser
pub struct ExpressionParser<'st> {
    /// Vector of tokens from the expression string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
    /// Names which may appear in the expression
    symbols: &'st IndexMap<String, Symbol>,
}

impl<'st> ExpressionParser<'st> {
    /// Create a new ExpressionParser
    pub fn new(tokens: Vec<Token>, symbols: &'st IndexMap<String, Symbol>) -> ExpressionParser<'st> {
        ExpressionParser {
            tokens,
            current: 0,
            symbols,
        }
    }

    // region Parsing Functions

    /// Parse the token vector into an expression
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        if !self.is_at_end() {
            // If entire expression has not been parsed, an error has occurred
            return Err(ParseError::EarlyTermination(format!("{:?}", self.peek())));
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;

        while self.match_token(&[Token::Plus, Token::Minus]) {
            let operator = self.previous();
            let right = self.term()?;
            expr = match operator {
                Token::Plus => expr + right,
                _ => expr - right,
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;

        while self.match_token(&[Token::Star, Token::Slash]) {
            let operator = self.previous();
            let right = self.unary()?;
            expr = match operator {
                Token::Star => expr * right,
                _ => expr / right,
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[Token::Minus]) {
            return Ok(-self.unary()?);
        }
        if self.match_token(&[Token::Plus]) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.match_token(&[Token::Caret]) {
            // Right associative, a^b^c is a^(b^c)
            let exp = self.unary()?;
            return Ok(Expr::pow(base, exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        if let Token::Number(value) = self.peek() {
            self.advance();
            return Ok(Expr::number(value));
        }

        if let Some(identifier) = self.match_identifier() {
            if self.check(&Token::LeftParen) {
                let func = match Function::from_name(&identifier) {
                    Some(func) => func,
                    None => return Err(ParseError::UnknownFunction(identifier)),
                };
                self.advance();
                let arg = self.expression()?;
                self.consume(Token::RightParen, "Expect ')' after function argument.")?;
                return Ok(Expr::call(func, arg));
            }
            return match self.symbols.get(&identifier) {
                Some(symbol) => Ok(Expr::Symbol(symbol.clone())),
                None => Err(ParseError::UndefinedSymbol(identifier)),
            };
        }

        if self.match_token(&[Token::LeftParen]) {
            let expr = self.expression()?;
            self.consume(Token::RightParen, "Expect ')' after expression.")?;
            return Ok(expr);
        }

        Err(ParseError::ExpectedExpression)
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// Check whether the token at the current position matches one of the provided `tokens`,
    /// if it does advance [`self.current`] and return true, otherwise return false
    fn match_token(&mut self, tokens: &[Token]) -> bool {
        for t in tokens {
            if self.check(t) {
                self.advance();
                return true;
            }
        }
        false
    }

    /// Similar to [`match_token`], but for matching an identifier token. If the current
    /// token is an identifier return `Some(name)`, otherwise return None
    fn match_identifier(&mut self) -> Option<String> {
        if self.is_at_end() {
            return None;
        }
        if let Token::Identifier(id) = self.peek() {
            self.advance();
            return Some(id);
        }
        None
    }

    /// Check whether the current token matches the provided `token`
    fn check(&self, token: &Token) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek() == *token
    }

    /// Advance `self.current` one position unless at the end of the token Vec, then return
    /// the previous token.
    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    /// Check whether the parser is at the end of the source Vec
    fn is_at_end(&self) -> bool {
        self.peek() == Token::Eof
    }

    /// Get a copy of the current token
    fn peek(&self) -> Token {
        self.tokens[self.current].clone()
    }

    /// Get a copy of the previous token
    fn previous(&self) -> Token {
        self.tokens[self.current - 1].clone()
    }

    /// Check whether the current token matches an input token, if it matches advance to the
    /// next token, and if it doesn't return an error. Used mainly for matching parenthesis.
    fn consume(&mut self, token: Token, msg: &str) -> Result<Token, ParseError> {
        if self.check(&token) {
            return Ok(self.advance());
        }

        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Identifier is neither a component nor a declared parameter
    #[error("Undefined symbol `{0}`, declare it as a parameter or a component")]
    UndefinedSymbol(String),
    /// Identifier followed by `(` is not a supported function
    #[error("Unknown function `{0}`")]
    UnknownFunction(String),
    /// Missing expected token (e.g. a right parenthesis)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// No expression found when one was expected
    #[error("No expression found, check that the expression is not empty")]
    ExpectedExpression,
    /// Expression was not completed when parsing terminated
    #[error("Parsing terminated early at {0}")]
    EarlyTermination(String),
}
