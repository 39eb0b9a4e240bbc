//! Tokens and source positions.
use std::fmt;

use smol_str::SmolStr;

/// Location of a single character in the source text.
///
/// Lines and columns start at 1, the byte offset starts at 0.
/// A token's end position points one character past the text
/// that produced it, so `end.offset - start.offset` is the
/// token's byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl SourcePos {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for SourcePos {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub data: TokenData,
    pub start: SourcePos,
    pub end: SourcePos,
}

impl Token {
    /// Identifier name, if this token is an identifier.
    #[inline]
    pub fn name(&self) -> Option<&SmolStr> {
        match &self.data {
            TokenData::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Parsed literal value, if this token is an integer.
    #[inline]
    pub fn int(&self) -> Option<i32> {
        match self.data {
            TokenData::Int(value) => Some(value),
            _ => None,
        }
    }

    /// Tests whether this token is an identifier with the given text.
    ///
    /// Keywords (`let`, `do`) are identifier tokens matched by text,
    /// not a separate token kind.
    #[inline]
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.name().map(|name| name == text).unwrap_or(false)
    }
}

/// Payload carried by a token alongside its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenData {
    None,
    Name(SmolStr),
    Int(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum TokenKind {
    Identifier,
    Integer,
    /// Reserved for a future literal form, never produced.
    Float,

    // ------------------------------------------------------------------------
    // Single-character punctuation
    Equal,      // =
    Plus,       // +
    Hyphen,     // -
    Star,       // *
    FSlash,     // /
    LParen,     // (
    LCurly,     // {
    LSquare,    // [
    RParen,     // )
    RCurly,     // }
    RSquare,    // ]
    Semicolon,  // ;
    Colon,      // :
    Comma,      // ,
    Dot,        // .
    Bang,       // !
    At,         // @
    Hash,       // #
    Dollar,     // $
    Mod,        // %
    Caret,      // ^
    Amp,        // &
    Underscore, // _
    Apost,      // '
    Quote,      // "
    LAngle,     // <
    RAngle,     // >
    Question,   // ?
    BSlash,     // \
    Pipe,       // |
    Tick,       // `
    Tilde,      // ~
}

impl TokenKind {
    /// Maps a recognised punctuation character to its token kind.
    #[rustfmt::skip]
    pub fn punctuation(c: char) -> Option<Self> {
        use TokenKind as T;
        match c {
            '='  => Some(T::Equal),
            '+'  => Some(T::Plus),
            '-'  => Some(T::Hyphen),
            '*'  => Some(T::Star),
            '/'  => Some(T::FSlash),
            '('  => Some(T::LParen),
            '{'  => Some(T::LCurly),
            '['  => Some(T::LSquare),
            ')'  => Some(T::RParen),
            '}'  => Some(T::RCurly),
            ']'  => Some(T::RSquare),
            ';'  => Some(T::Semicolon),
            ':'  => Some(T::Colon),
            ','  => Some(T::Comma),
            '.'  => Some(T::Dot),
            '!'  => Some(T::Bang),
            '@'  => Some(T::At),
            '#'  => Some(T::Hash),
            '$'  => Some(T::Dollar),
            '%'  => Some(T::Mod),
            '^'  => Some(T::Caret),
            '&'  => Some(T::Amp),
            '_'  => Some(T::Underscore),
            '\'' => Some(T::Apost),
            '"'  => Some(T::Quote),
            '<'  => Some(T::LAngle),
            '>'  => Some(T::RAngle),
            '?'  => Some(T::Question),
            '\\' => Some(T::BSlash),
            '|'  => Some(T::Pipe),
            '`'  => Some(T::Tick),
            '~'  => Some(T::Tilde),
            _    => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_punctuation_lookup() {
        assert_eq!(TokenKind::punctuation('='), Some(TokenKind::Equal));
        assert_eq!(TokenKind::punctuation('-'), Some(TokenKind::Hyphen));
        assert_eq!(TokenKind::punctuation('~'), Some(TokenKind::Tilde));
        assert_eq!(TokenKind::punctuation('0'), None);
        assert_eq!(TokenKind::punctuation('x'), None);
    }

    #[test]
    fn test_keyword_match_by_text() {
        let token = Token {
            kind: TokenKind::Identifier,
            data: TokenData::Name(SmolStr::new("let")),
            start: SourcePos::default(),
            end: SourcePos::new(1, 4, 3),
        };

        assert!(token.is_ident("let"));
        assert!(!token.is_ident("do"));
    }
}
