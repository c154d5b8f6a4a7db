//! Lexical analysis: bytes → token stream with source locations.
//!
//! A hand-written scanner over a `Peekable<Chars>`, dispatching on the
//! current character's class. A regex-per-token-pattern matcher can't
//! express the recursive `\(...)` string-interpolation re-entry, so this
//! stays hand-rolled rather than table- or macro-driven.

mod token;

pub use token::*;

use std::fmt;

use crate::source::{FileId, Location, SourceRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    InvalidCharacter(char),
    InvalidEscape(String),
    UnterminatedLiteral,
    UnexpectedEof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub range: SourceRange,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::InvalidCharacter(c) => write!(f, "invalid character '{c}'"),
            LexErrorKind::InvalidEscape(s) => write!(f, "invalid escape sequence '\\{s}'"),
            LexErrorKind::UnterminatedLiteral => write!(f, "unterminated literal"),
            LexErrorKind::UnexpectedEof => write!(f, "unexpected end of file"),
        }
    }
}

impl std::error::Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;

/// Recursive interpolation re-entry is bounded to avoid unbounded native
/// stack growth on pathological input.
const MAX_INTERPOLATION_DEPTH: usize = 64;

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    file: FileId,
    interpolation_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file: FileId) -> Self {
        Lexer { input, bytes: input.as_bytes(), pos: 0, line: 0, col: 0, file, interpolation_depth: 0 }
    }

    fn loc(&self) -> Location {
        Location { file: self.file, line: self.line, col: self.col, offset: self.pos }
    }

    fn range_from(&self, start: Location) -> SourceRange {
        SourceRange { start, end: self.loc() }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_byte_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    fn eat_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' => {
                    self.advance();
                }
                Some('/') if self.peek_byte_at(1) == Some(b'/') => {
                    self.eat_while(|c| c != '\n');
                }
                Some('/') if self.peek_byte_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek_char() {
                            None => break,
                            Some('*') if self.peek_byte_at(1) == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Lex the entire input into a flat token stream terminated by EOF.
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = vec![];
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> LexResult<Token> {
        self.eat_whitespace_and_comments();

        let start = self.loc();

        let Some(c) = self.peek_char() else {
            return Ok(Token::new(TokenKind::Eof, self.range_from(start)));
        };

        if c == '\n' {
            self.advance();
            return Ok(Token::new(TokenKind::Newline, self.range_from(start)));
        }

        if c == ';' {
            self.advance();
            return Ok(Token::new(TokenKind::Semicolon, self.range_from(start)));
        }

        if c == '#' {
            return self.lex_directive(start);
        }

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }

        if c == '_' || c.is_ascii_alphabetic() {
            return self.lex_ident_or_keyword(start);
        }

        if c == '"' {
            return self.lex_string(start);
        }

        if c == '\'' {
            return self.lex_char(start);
        }

        if let Some(punct) = self.lex_fixed_punct(c) {
            return Ok(punct);
        }

        if is_operator_char(c) {
            return Ok(self.lex_operator(start));
        }

        self.advance();
        Err(LexError { kind: LexErrorKind::InvalidCharacter(c), range: self.range_from(start) })
    }

    fn lex_fixed_punct(&mut self, c: char) -> Option<Token> {
        let start = self.loc();
        let kind = match c {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            ',' => Punct::Comma,
            ':' => Punct::Colon,
            '?' => Punct::Question,
            '@' => Punct::At,
            '.' => {
                if self.peek_byte_at(1) == Some(b'.') && self.peek_byte_at(2) == Some(b'.') {
                    self.advance();
                    self.advance();
                    self.advance();
                    return Some(Token::new(TokenKind::Punct(Punct::Ellipsis), self.range_from(start)));
                }
                self.advance();
                return Some(Token::new(TokenKind::Punct(Punct::Dot), self.range_from(start)));
            }
            _ => return None,
        };
        self.advance();
        Some(Token::new(TokenKind::Punct(kind), self.range_from(start)))
    }

    /// Maximal munch over `OPERATOR_CHARS`.
    fn lex_operator(&mut self, start: Location) -> Token {
        let raw = self.eat_while(is_operator_char);
        Token::new(TokenKind::Operator(raw), self.range_from(start))
    }

    fn lex_directive(&mut self, start: Location) -> LexResult<Token> {
        self.advance(); // '#'
        let word = self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        match Directive::lookup(&word) {
            Some(d) => Ok(Token::new(TokenKind::Directive(d), self.range_from(start))),
            None => Err(LexError { kind: LexErrorKind::InvalidCharacter('#'), range: self.range_from(start) }),
        }
    }

    fn lex_ident_or_keyword(&mut self, start: Location) -> LexResult<Token> {
        let word = self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = match Keyword::lookup(&word) {
            Some(k) => TokenKind::Keyword(k),
            None => match word.as_str() {
                "foreign" | "static" | "mutating" | "indirect" | "noreturn" | "implicit" => {
                    TokenKind::Modifier(word)
                }
                _ => TokenKind::Ident(word),
            },
        };
        Ok(Token::new(kind, self.range_from(start)))
    }

    fn lex_number(&mut self, start: Location) -> LexResult<Token> {
        let radix = if self.peek_byte() == Some(b'0') {
            match self.peek_byte_at(1) {
                Some(b'x') | Some(b'X') => Some(16),
                Some(b'b') | Some(b'B') => Some(2),
                Some(b'o') | Some(b'O') => Some(8),
                _ => None,
            }
        } else {
            None
        };

        if let Some(radix) = radix {
            self.advance(); // '0'
            self.advance(); // prefix letter
            let digits = self.eat_while(|c| c.is_digit(radix) || c == '_');
            let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
            let value = u64::from_str_radix(&cleaned, radix)
                .map_err(|_| LexError { kind: LexErrorKind::InvalidEscape(digits.clone()), range: self.range_from(start) })?;
            let range = self.range_from(start);
            let raw = self.input[start.offset..self.pos].to_string();
            return Ok(Token::new(TokenKind::Integer { raw, value }, range));
        }

        let int_part = self.eat_while(|c| c.is_ascii_digit() || c == '_');

        let is_float = self.peek_char() == Some('.')
            && self.peek_byte_at(1).map(|b| b.is_ascii_digit()).unwrap_or(false);

        if is_float {
            self.advance(); // '.'
            let frac_part = self.eat_while(|c| c.is_ascii_digit() || c == '_');
            let raw = self.input[start.offset..self.pos].to_string();
            let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
            let value: f64 = cleaned.parse().map_err(|_| LexError {
                kind: LexErrorKind::InvalidEscape(raw.clone()),
                range: self.range_from(start),
            })?;
            let _ = frac_part;
            return Ok(Token::new(TokenKind::Float { raw, value }, self.range_from(start)));
        }

        let cleaned: String = int_part.chars().filter(|c| *c != '_').collect();
        let value: u64 = cleaned.parse().map_err(|_| LexError {
            kind: LexErrorKind::InvalidEscape(int_part.clone()),
            range: self.range_from(start),
        })?;
        Ok(Token::new(TokenKind::Integer { raw: int_part, value }, self.range_from(start)))
    }

    /// Decode a single escape sequence after a consumed `\`. Supports
    /// `\n \t \r \" \\ \x{HEX}`. The simple single-char escapes are decoded
    /// via the `unescape` crate rather than a hand-written match table;
    /// `\x{HEX}` needs multi-char lookahead the crate doesn't offer, so it
    /// stays bespoke.
    fn decode_escape(&mut self, start: Location) -> LexResult<char> {
        let Some(c) = self.advance() else {
            return Err(LexError { kind: LexErrorKind::UnexpectedEof, range: self.range_from(start) });
        };
        if c != 'x' {
            let mut buf = [0u8; 4];
            let escaped = format!("\\{}", c.encode_utf8(&mut buf));
            if let Some(decoded) = unescape::unescape(&escaped) {
                if let Some(ch) = decoded.chars().next() {
                    return Ok(ch);
                }
            }
        }
        Ok(match c {
            'x' => {
                if self.peek_char() != Some('{') {
                    return Err(LexError {
                        kind: LexErrorKind::InvalidEscape("x".into()),
                        range: self.range_from(start),
                    });
                }
                self.advance(); // '{'
                let hex = self.eat_while(|c| c != '}');
                if self.peek_char() != Some('}') {
                    return Err(LexError { kind: LexErrorKind::UnterminatedLiteral, range: self.range_from(start) });
                }
                self.advance(); // '}'
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| LexError { kind: LexErrorKind::InvalidEscape(hex.clone()), range: self.range_from(start) })?;
                char::from_u32(code)
                    .ok_or_else(|| LexError { kind: LexErrorKind::InvalidEscape(hex.clone()), range: self.range_from(start) })?
            }
            other => {
                return Err(LexError {
                    kind: LexErrorKind::InvalidEscape(other.to_string()),
                    range: self.range_from(start),
                })
            }
        })
    }

    fn lex_char(&mut self, start: Location) -> LexResult<Token> {
        self.advance(); // opening quote
        let c = match self.peek_char() {
            Some('\\') => {
                self.advance();
                self.decode_escape(start)?
            }
            Some(c) => {
                self.advance();
                c
            }
            None => return Err(LexError { kind: LexErrorKind::UnexpectedEof, range: self.range_from(start) }),
        };
        if self.peek_char() != Some('\'') {
            return Err(LexError { kind: LexErrorKind::UnterminatedLiteral, range: self.range_from(start) });
        }
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::Char(c), self.range_from(start)))
    }

    /// Lex a (possibly interpolated) string literal. `\(` re-enters the
    /// lexer to scan a nested expression token stream, bounded by paren
    /// depth.
    fn lex_string(&mut self, start: Location) -> LexResult<Token> {
        self.advance(); // opening quote
        let mut segments = vec![];
        let mut current = String::new();

        loop {
            match self.peek_char() {
                None => return Err(LexError { kind: LexErrorKind::UnterminatedLiteral, range: self.range_from(start) }),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_byte_at(1) == Some(b'(') => {
                    if !current.is_empty() {
                        segments.push(StringSegment::Literal(std::mem::take(&mut current)));
                    }
                    self.advance(); // '\'
                    self.advance(); // '('
                    let inner = self.lex_interpolation(start)?;
                    segments.push(StringSegment::Interpolation(inner));
                }
                Some('\\') => {
                    self.advance();
                    current.push(self.decode_escape(start)?);
                }
                Some(c) => {
                    self.advance();
                    current.push(c);
                }
            }
        }

        if !current.is_empty() || segments.is_empty() {
            segments.push(StringSegment::Literal(current));
        }

        Ok(Token::new(TokenKind::Str(segments), self.range_from(start)))
    }

    /// Scan tokens until the `)` matching the one just opened by `\(`,
    /// tracking nested parens so `\("\(a + b)")` style nesting works.
    fn lex_interpolation(&mut self, string_start: Location) -> LexResult<Vec<Token>> {
        self.interpolation_depth += 1;
        if self.interpolation_depth > MAX_INTERPOLATION_DEPTH {
            self.interpolation_depth -= 1;
            return Err(LexError { kind: LexErrorKind::UnterminatedLiteral, range: self.range_from(string_start) });
        }

        let mut tokens = vec![];
        let mut depth: u32 = 0;
        loop {
            self.eat_whitespace_and_comments();
            if self.peek_char() == Some(')') && depth == 0 {
                self.advance();
                break;
            }
            if self.peek_char().is_none() {
                self.interpolation_depth -= 1;
                return Err(LexError { kind: LexErrorKind::UnterminatedLiteral, range: self.range_from(string_start) });
            }
            if self.peek_char() == Some('(') {
                depth += 1;
            }
            if self.peek_char() == Some(')') {
                depth -= 1;
            }
            let tok = self.next_token()?;
            tokens.push(tok);
        }

        self.interpolation_depth -= 1;
        tokens.push(Token::new(TokenKind::Eof, self.range_from(string_start)));
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, FileId(0)).lex().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_identifiers_and_keywords() {
        assert_eq!(lex("foo"), vec![TokenKind::Ident("foo".into()), TokenKind::Eof]);
        assert_eq!(lex("func"), vec![TokenKind::Keyword(Keyword::Func), TokenKind::Eof]);
    }

    #[test]
    fn lexes_radix_integers() {
        assert_eq!(
            lex("0xFF"),
            vec![TokenKind::Integer { raw: "0xFF".into(), value: 255 }, TokenKind::Eof]
        );
        assert_eq!(
            lex("0b101"),
            vec![TokenKind::Integer { raw: "0b101".into(), value: 5 }, TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_float_literal() {
        assert_eq!(
            lex("3.14"),
            vec![TokenKind::Float { raw: "3.14".into(), value: 3.14 }, TokenKind::Eof]
        );
    }

    #[test]
    fn maximal_munch_operator() {
        assert_eq!(lex("<<="), vec![TokenKind::Operator("<<=".into()), TokenKind::Eof]);
    }

    #[test]
    fn lexes_ellipsis_inside_operator_run() {
        assert_eq!(lex("..."), vec![TokenKind::Punct(Punct::Ellipsis), TokenKind::Eof]);
    }

    #[test]
    fn lexes_plain_string() {
        assert_eq!(
            lex("\"hi\\n\""),
            vec![TokenKind::Str(vec![StringSegment::Literal("hi\n".into())]), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_string_interpolation() {
        let toks = lex("\"a\\(1)b\"");
        match &toks[0] {
            TokenKind::Str(segments) => {
                assert_eq!(segments.len(), 3);
                assert_eq!(segments[0], StringSegment::Literal("a".into()));
                match &segments[1] {
                    StringSegment::Interpolation(inner) => {
                        assert!(matches!(inner[0].kind, TokenKind::Integer { value: 1, .. }));
                    }
                    other => panic!("expected interpolation, got {other:?}"),
                }
                assert_eq!(segments[2], StringSegment::Literal("b".into()));
            }
            other => panic!("expected string token, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_character() {
        assert!(Lexer::new("`", FileId(0)).lex().is_err());
    }

    #[test]
    fn newline_and_semicolon_are_separators() {
        assert_eq!(
            lex("a\nb;c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Semicolon,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }
}
