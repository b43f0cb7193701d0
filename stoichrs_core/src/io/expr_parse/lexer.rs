//! Lex an expression string into a series of tokens for later parsing

use thiserror::Error;

use crate::io::expr_parse::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, terminated by [`Token::Eof`]
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            // Single Character Tokens
            '(' => self.add_token(Token::LeftParen),
            ')' => self.add_token(Token::RightParen),
            '+' => self.add_token(Token::Plus),
            '-' => self.add_token(Token::Minus),
            '/' => self.add_token(Token::Slash),
            '^' => self.add_token(Token::Caret),
            // `*` or `**`
            '*' => {
                if self.peek() == '*' {
                    self.advance();
                    self.add_token(Token::Caret)
                } else {
                    self.add_token(Token::Star)
                }
            }
            // Literals and Identifiers
            '0'..='9' | '.' => self.read_number()?,
            'a'..='z' | 'A'..='Z' | '_' => self.read_identifier(),
            // Whitespace
            ' ' | '\r' | '\n' | '\t' => {}
            other => return Err(LexerError::InvalidToken(other)),
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_number(&mut self) -> Result<(), LexerError> {
        while Lexer::is_digit(self.peek()) || self.peek() == '.' {
            self.advance();
        }
        // Exponent, only when followed by digits so `2e` is not swallowed
        if matches!(self.peek(), 'e' | 'E') {
            let sign_offset = if matches!(self.peek_at(1), '+' | '-') { 2 } else { 1 };
            if Lexer::is_digit(self.peek_at(sign_offset)) {
                for _ in 0..sign_offset {
                    self.advance();
                }
                while Lexer::is_digit(self.peek()) {
                    self.advance();
                }
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match text.parse::<f64>() {
            Ok(value) => {
                self.add_token(Token::Number(value));
                Ok(())
            }
            Err(_) => Err(LexerError::InvalidNumber(text)),
        }
    }

    fn read_identifier(&mut self) {
        while Lexer::is_alphanumeric(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        self.add_token(Token::Identifier(text));
    }

    fn is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    fn is_alpha(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_alphanumeric(c: char) -> bool {
        Lexer::is_alpha(c) || Lexer::is_digit(c)
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        match self.source.get(self.current + offset) {
            Some(c) => *c,
            None => '\0',
        }
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Enum representing possible lexing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("Invalid character `{0}` in expression")]
    InvalidToken(char),
    #[error("Invalid numeric literal `{0}`")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use crate::io::expr_parse::lexer::{Lexer, LexerError};
    use crate::io::expr_parse::token::Token;

    #[test]
    fn test_single_identifier() {
        let tokens = Lexer::new("S_NH4").lex().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::Identifier(String::from("S_NH4")));
    }

    #[test]
    fn test_monod_expression() {
        let tokens = Lexer::new("mu*S/(K_S + S)").lex().unwrap();
        let expected_tokens = vec![
            Token::Identifier(String::from("mu")),
            Token::Star,
            Token::Identifier(String::from("S")),
            Token::Slash,
            Token::LeftParen,
            Token::Identifier(String::from("K_S")),
            Token::Plus,
            Token::Identifier(String::from("S")),
            Token::RightParen,
            Token::Eof,
        ];
        assert_eq!(tokens, expected_tokens);
    }

    #[test]
    fn test_numbers_and_powers() {
        let tokens = Lexer::new("1.5e-3 ** 2 ^ .5").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.5e-3),
                Token::Caret,
                Token::Number(2.),
                Token::Caret,
                Token::Number(0.5),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            Lexer::new("k # A").lex(),
            Err(LexerError::InvalidToken('#'))
        );
        assert_eq!(
            Lexer::new("1.2.3").lex(),
            Err(LexerError::InvalidNumber("1.2.3".to_string()))
        );
    }
}
