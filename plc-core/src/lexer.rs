//! Lexer for the PLC language.
//!
//! The lexer turns raw program text into a flat sequence of tokens. It does
//! not know about keywords: `LET`, `DEF`, `IF` and friends come out as
//! ordinary identifiers and are told apart by the parser comparing literals.

use tracing::trace;

use crate::error::CoreError;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Integer,
    Decimal,
    Character,
    String,
    Operator,
}

/// A single token: its kind, the exact source text, and the byte offset of
/// its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub index: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, index: usize) -> Self {
        Token {
            kind,
            literal: literal.into(),
            index,
        }
    }

    /// Byte offset one past the last character of the token.
    pub fn end(&self) -> usize {
        self.index + self.literal.len()
    }
}

/// Lex a source string into tokens, failing at the first character that
/// cannot extend any token rule.
pub fn lex(source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        source,
        chars: source.char_indices().collect(),
        index: 0,
        start: 0,
    };
    let tokens = lexer.run()?;
    trace!(count = tokens.len(), "lexed source");
    Ok(tokens)
}

/// A single-character lookahead pattern.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Exactly this character.
    Char(char),
    /// Any one of the characters in the string.
    OneOf(&'static str),
    /// Any character accepted by the predicate.
    Class(fn(char) -> bool),
}

impl Pattern {
    fn accepts(self, ch: char) -> bool {
        match self {
            Pattern::Char(expected) => ch == expected,
            Pattern::OneOf(set) => set.contains(ch),
            Pattern::Class(predicate) => predicate(ch),
        }
    }
}

const DIGIT: Pattern = Pattern::Class(is_digit);
const ESCAPE: Pattern = Pattern::OneOf("bnrt'\"\\");

struct Lexer<'src> {
    source: &'src str,
    /// Characters paired with their byte offsets.
    chars: Vec<(usize, char)>,
    /// Position (in `chars`) of the next unread character.
    index: usize,
    /// Position where the token being built started.
    start: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();

        while self.has(0) {
            if self.matches(&[Pattern::Class(is_whitespace)]) {
                self.skip();
                continue;
            }
            tokens.push(self.lex_token()?);
        }

        Ok(tokens)
    }

    /// Dispatch on the first character of the next token. Only `peek` is
    /// used here so the chosen rule sees the token from its first character.
    fn lex_token(&mut self) -> Result<Token, CoreError> {
        if self.peek(&[Pattern::Class(is_ident_start)]) {
            Ok(self.lex_identifier())
        } else if self.peek(&[DIGIT]) || self.peek(&[Pattern::OneOf("+-"), DIGIT]) {
            Ok(self.lex_number())
        } else if self.peek(&[Pattern::Char('\'')]) {
            self.lex_character()
        } else if self.peek(&[Pattern::Char('"')]) {
            self.lex_string()
        } else {
            Ok(self.lex_operator())
        }
    }

    fn lex_identifier(&mut self) -> Token {
        while self.matches(&[Pattern::Class(is_ident_continue)]) {}
        self.emit(TokenKind::Identifier)
    }

    fn lex_number(&mut self) -> Token {
        self.matches(&[Pattern::OneOf("+-")]);
        while self.matches(&[DIGIT]) {}

        if self.matches(&[Pattern::Char('.'), DIGIT]) {
            // A further '.' is left for the next token.
            while self.matches(&[DIGIT]) {}
            return self.emit(TokenKind::Decimal);
        }

        self.emit(TokenKind::Integer)
    }

    fn lex_character(&mut self) -> Result<Token, CoreError> {
        self.matches(&[Pattern::Char('\'')]);

        let content = self.matches(&[Pattern::Char('\\'), ESCAPE])
            || self.matches(&[Pattern::Class(is_plain_character)]);
        if !content {
            return Err(CoreError::lex(self.offset(), "invalid character literal"));
        }
        if !self.matches(&[Pattern::Char('\'')]) {
            return Err(CoreError::lex(
                self.offset(),
                "unterminated character literal",
            ));
        }

        Ok(self.emit(TokenKind::Character))
    }

    fn lex_string(&mut self) -> Result<Token, CoreError> {
        self.matches(&[Pattern::Char('"')]);

        loop {
            if self.matches(&[Pattern::Char('"')]) {
                return Ok(self.emit(TokenKind::String));
            }
            if self.matches(&[Pattern::Char('\\')]) {
                if !self.matches(&[ESCAPE]) {
                    return Err(CoreError::lex(self.offset(), "invalid escape sequence"));
                }
            } else if self.has(0) {
                self.advance();
            } else {
                return Err(CoreError::lex(self.offset(), "unterminated string literal"));
            }
        }
    }

    fn lex_operator(&mut self) -> Token {
        if !self.matches(&[Pattern::OneOf("<>!="), Pattern::Char('=')]) {
            self.advance();
        }
        self.emit(TokenKind::Operator)
    }

    /// True when the next characters match `patterns` one for one.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        patterns.iter().enumerate().all(|(offset, pattern)| {
            self.get(offset)
                .is_some_and(|ch| pattern.accepts(ch))
        })
    }

    /// Like `peek`, consuming every matched character only on a full match.
    fn matches(&mut self, patterns: &[Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in patterns {
                self.advance();
            }
        }
        matched
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.chars.len()
    }

    fn get(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|&(_, ch)| ch)
    }

    fn advance(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }

    /// Drop whatever has been consumed so far from the current token.
    fn skip(&mut self) {
        self.start = self.index;
    }

    /// Byte offset of the next unread character, or the input length at the
    /// end of the stream.
    fn offset(&self) -> usize {
        self.byte_offset(self.index)
    }

    fn byte_offset(&self, position: usize) -> usize {
        self.chars
            .get(position)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        let start = self.byte_offset(self.start);
        let end = self.byte_offset(self.index);
        self.skip();
        Token::new(kind, &self.source[start..end], start)
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{8}')
}

fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

fn is_plain_character(ch: char) -> bool {
    !matches!(ch, '\'' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| (token.kind, token.literal))
            .collect()
    }

    #[test]
    fn lexes_identifiers_with_hyphens_and_digits() {
        let tokens = lex("getName thelegend27 -five abc-def").expect("lex");
        assert_eq!(tokens[0], Token::new(TokenKind::Identifier, "getName", 0));
        assert_eq!(tokens[1], Token::new(TokenKind::Identifier, "thelegend27", 8));
        // A sign only starts a number when a digit follows.
        assert_eq!(tokens[2], Token::new(TokenKind::Operator, "-", 20));
        assert_eq!(tokens[3], Token::new(TokenKind::Identifier, "five", 21));
        assert_eq!(tokens[4], Token::new(TokenKind::Identifier, "abc-def", 26));
    }

    #[test]
    fn lexes_signed_numbers() {
        assert_eq!(
            kinds("1 -12 +3.50 007"),
            vec![
                (TokenKind::Integer, "1".to_string()),
                (TokenKind::Integer, "-12".to_string()),
                (TokenKind::Decimal, "+3.50".to_string()),
                (TokenKind::Integer, "007".to_string()),
            ]
        );
    }

    #[test]
    fn trailing_dot_is_an_operator() {
        assert_eq!(
            kinds("1."),
            vec![
                (TokenKind::Integer, "1".to_string()),
                (TokenKind::Operator, ".".to_string()),
            ]
        );
    }

    #[test]
    fn second_dot_ends_a_decimal() {
        assert_eq!(
            kinds("1.2.3"),
            vec![
                (TokenKind::Decimal, "1.2".to_string()),
                (TokenKind::Operator, ".".to_string()),
                (TokenKind::Integer, "3".to_string()),
            ]
        );
    }

    #[test]
    fn lexes_characters_and_escapes() {
        assert_eq!(
            kinds(r"'c' '\n' '\''"),
            vec![
                (TokenKind::Character, "'c'".to_string()),
                (TokenKind::Character, r"'\n'".to_string()),
                (TokenKind::Character, r"'\''".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_empty_and_long_characters() {
        assert_eq!(lex("''").unwrap_err().index(), Some(1));
        assert_eq!(lex("'ab'").unwrap_err().index(), Some(2));
        assert_eq!(lex("'a").unwrap_err().index(), Some(2));
    }

    #[test]
    fn lexes_strings_with_escapes() {
        let tokens = lex(r#""Hello,\tWorld!\n""#).expect("lex");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, r#""Hello,\tWorld!\n""#);
    }

    #[test]
    fn rejects_invalid_escape() {
        let err = lex(r#""invalid\escape""#).unwrap_err();
        assert!(matches!(err, CoreError::LexError { index: 9, .. }));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = lex("\"unterminated").unwrap_err();
        assert!(matches!(err, CoreError::LexError { index: 13, .. }));
    }

    #[test]
    fn strings_may_span_lines() {
        let tokens = lex("\"line\nbreak\r\" x").expect("lex");
        assert_eq!(tokens[0], Token::new(TokenKind::String, "\"line\nbreak\r\"", 0));
        assert_eq!(tokens[1], Token::new(TokenKind::Identifier, "x", 14));
    }

    #[test]
    fn prefers_two_character_operators() {
        assert_eq!(
            kinds("<= >= == != < = !"),
            vec![
                (TokenKind::Operator, "<=".to_string()),
                (TokenKind::Operator, ">=".to_string()),
                (TokenKind::Operator, "==".to_string()),
                (TokenKind::Operator, "!=".to_string()),
                (TokenKind::Operator, "<".to_string()),
                (TokenKind::Operator, "=".to_string()),
                (TokenKind::Operator, "!".to_string()),
            ]
        );
    }

    #[test]
    fn skips_all_whitespace_kinds() {
        let tokens = lex(" \t\r\n\u{8}x").expect("lex");
        assert_eq!(tokens, vec![Token::new(TokenKind::Identifier, "x", 5)]);
    }

    #[test]
    fn lexes_a_statement() {
        let tokens = lex("LET x = 5;").expect("lex");
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Identifier, "LET", 0),
                Token::new(TokenKind::Identifier, "x", 4),
                Token::new(TokenKind::Operator, "=", 6),
                Token::new(TokenKind::Integer, "5", 8),
                Token::new(TokenKind::Operator, ";", 9),
            ]
        );
    }

    #[test]
    fn offsets_are_bytes() {
        let tokens = lex("\"é\" x").expect("lex");
        assert_eq!(tokens[1], Token::new(TokenKind::Identifier, "x", 5));
    }
}
