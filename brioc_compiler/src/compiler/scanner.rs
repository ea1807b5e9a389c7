//! Converts brio source text into a flat stream of [tokens](Token)

use crate::compiler::common::{error::*, token::*};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

pub struct Scanner<'a> {
    source: Peekable<Chars<'a>>,

    // position of the character about to be consumed
    line: i32,
    column: i32,

    // reserved keywords which cannot be used as identifiers
    keywords: HashMap<&'a str, TokenKind>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source: source.chars().peekable(),
            line: 1,
            column: 1,
            keywords: HashMap::from([
                ("int", TokenKind::Int),
                ("bool", TokenKind::Bool),
                ("void", TokenKind::Void),
                ("tru", TokenKind::True),
                ("fls", TokenKind::False),
                ("struct", TokenKind::Struct),
                ("receive", TokenKind::Receive),
                ("print", TokenKind::Print),
                ("if", TokenKind::If),
                ("else", TokenKind::Else),
                ("while", TokenKind::While),
                ("repeat", TokenKind::Repeat),
                ("return", TokenKind::Return),
            ]),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.source.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => (),
        }
        c
    }

    fn matches(&mut self, expected: char) -> bool {
        match self.source.peek() {
            Some(c) if *c == expected => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn match_next(&mut self, expected: char, if_match: TokenKind, if_not: TokenKind) -> TokenKind {
        match self.matches(expected) {
            true => if_match,
            false => if_not,
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.source.peek() {
            if *c == '\n' {
                break;
            }
            self.advance();
        }
    }

    pub fn scan_token(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<Error> = Vec::new();

        while let Some(&peeked) = self.source.peek() {
            let (line, column) = (self.line, self.column);
            let mut push = |kind| tokens.push(Token::new(kind, line, column));

            match peeked {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '#' => self.skip_line(),
                '(' => {
                    self.advance();
                    push(TokenKind::LeftParen);
                }
                ')' => {
                    self.advance();
                    push(TokenKind::RightParen);
                }
                '{' => {
                    self.advance();
                    push(TokenKind::LeftBrace);
                }
                '}' => {
                    self.advance();
                    push(TokenKind::RightBrace);
                }
                ',' => {
                    self.advance();
                    push(TokenKind::Comma);
                }
                '.' => {
                    self.advance();
                    push(TokenKind::Dot);
                }
                ';' => {
                    self.advance();
                    push(TokenKind::Semicolon);
                }
                '*' => {
                    self.advance();
                    push(TokenKind::Star);
                }
                '+' => {
                    self.advance();
                    let kind = self.match_next('+', TokenKind::PlusPlus, TokenKind::Plus);
                    push(kind);
                }
                '-' => {
                    self.advance();
                    let kind = self.match_next('-', TokenKind::MinusMinus, TokenKind::Minus);
                    push(kind);
                }
                '!' => {
                    self.advance();
                    let kind = self.match_next('=', TokenKind::BangEqual, TokenKind::Bang);
                    push(kind);
                }
                '=' => {
                    self.advance();
                    let kind = self.match_next('=', TokenKind::EqualEqual, TokenKind::Equal);
                    push(kind);
                }
                '<' => {
                    self.advance();
                    let mut kind = TokenKind::Less;
                    if self.matches('<') {
                        kind = TokenKind::LessLess;
                    } else if self.matches('=') {
                        kind = TokenKind::LessEqual;
                    }
                    push(kind);
                }
                '>' => {
                    self.advance();
                    let mut kind = TokenKind::Greater;
                    if self.matches('>') {
                        kind = TokenKind::GreaterGreater;
                    } else if self.matches('=') {
                        kind = TokenKind::GreaterEqual;
                    }
                    push(kind);
                }
                '&' => {
                    self.advance();
                    if self.matches('&') {
                        push(TokenKind::AmpAmp);
                    } else {
                        errors.push(Error { line, column, kind: ErrorKind::UnexpectedChar('&') });
                    }
                }
                '|' => {
                    self.advance();
                    if self.matches('|') {
                        push(TokenKind::PipePipe);
                    } else {
                        errors.push(Error { line, column, kind: ErrorKind::UnexpectedChar('|') });
                    }
                }
                '/' => {
                    self.advance();
                    if self.matches('/') {
                        self.skip_line();
                    } else {
                        push(TokenKind::Slash);
                    }
                }
                '"' => match self.string_lit() {
                    Ok(string) => push(TokenKind::String(string)),
                    Err(kind) => errors.push(Error { line, column, kind }),
                },
                '0'..='9' => match self.number_lit() {
                    Ok(num) => push(TokenKind::Number(num)),
                    Err(kind) => errors.push(Error { line, column, kind }),
                },
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let ident = self.ident();
                    match self.keywords.get(ident.as_str()) {
                        Some(keyword) => push(keyword.clone()),
                        None => push(TokenKind::Ident(ident)),
                    }
                }
                c => {
                    self.advance();
                    errors.push(Error { line, column, kind: ErrorKind::UnexpectedChar(c) });
                }
            }
        }

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    fn string_lit(&mut self) -> Result<String, ErrorKind> {
        self.advance(); // opening quote

        let mut string = String::new();
        while let Some(&c) = self.source.peek() {
            match c {
                '"' => {
                    self.advance();
                    return Ok(string);
                }
                '\n' => return Err(ErrorKind::UnterminatedString),
                '\\' => {
                    self.advance();
                    match self.advance() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some('\'') => string.push('\''),
                        Some('?') => string.push('?'),
                        Some(c) => return Err(ErrorKind::InvalidEscape(c)),
                        None => return Err(ErrorKind::UnterminatedString),
                    }
                }
                _ => {
                    string.push(c);
                    self.advance();
                }
            }
        }
        Err(ErrorKind::UnterminatedString)
    }

    fn number_lit(&mut self) -> Result<i32, ErrorKind> {
        let mut digits = String::new();
        while let Some(c) = self.source.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(*c);
            self.advance();
        }
        digits
            .parse::<i32>()
            .map_err(|_| ErrorKind::NumberTooLarge(digits))
    }

    fn ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&c) = self.source.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            ident.push(c);
            self.advance();
        }
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_token()
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn scans_declaration_and_operators() {
        assert_eq!(
            kinds("int x; x = x + 1;"),
            vec![
                TokenKind::Int,
                TokenKind::Ident("x".to_string()),
                TokenKind::Semicolon,
                TokenKind::Ident("x".to_string()),
                TokenKind::Equal,
                TokenKind::Ident("x".to_string()),
                TokenKind::Plus,
                TokenKind::Number(1),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn distinguishes_compound_operators() {
        assert_eq!(
            kinds("< <= << > >= >> = == ! != ++ --"),
            vec![
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::LessLess,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::GreaterGreater,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
            ]
        );
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert_eq!(
            kinds("tru fls truth"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::Ident("truth".to_string()),
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Scanner::new("int a;\n  a = 3;").scan_token().unwrap();

        let a_use = &tokens[3];
        assert_eq!(a_use.kind, TokenKind::Ident("a".to_string()));
        assert_eq!((a_use.line, a_use.column), (2, 3));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("int a; // trailing words = 1\n# whole line\na;"),
            vec![
                TokenKind::Int,
                TokenKind::Ident("a".to_string()),
                TokenKind::Semicolon,
                TokenKind::Ident("a".to_string()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn string_escapes_and_errors() {
        assert_eq!(
            kinds(r#""hi\n""#),
            vec![TokenKind::String("hi\n".to_string())]
        );

        let errors = Scanner::new("\"open\n").scan_token().unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::UnterminatedString);
    }
}
