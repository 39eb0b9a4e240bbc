//! Lexical analysis (tokenizer)
use std::str::CharIndices;

use itertools::{multipeek, MultiPeek};
use smol_str::SmolStr;

use super::tokens::{SourcePos, Token, TokenData, TokenKind};
use crate::error::DiagnosticList;

/// Tokenize the whole source, accumulating diagnostics in the
/// per-run buffer.
///
/// The token sequence is complete on success. Lexing aborts at the
/// first integer literal that does not fit a signed 32-bit value;
/// the tokens produced before the bad literal are returned so the
/// caller can still inspect them, but the diagnostic list will be
/// non-empty and the pipeline halts.
pub fn tokenize(source: &str, diagnostics: &mut DiagnosticList) -> Vec<Token> {
    let mut lexer = Lexer::new(source, diagnostics);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }

    tokens
}

/// Lexical analyzer.
///
/// Scans left-to-right tracking `(line, column, offset)`. Whitespace
/// produces no tokens: a newline advances the line and resets the
/// column, a space advances the column by one, a tab by three.
/// Unrecognised characters are skipped silently.
pub struct Lexer<'a, 'd> {
    source: SourceText<'a>,
    token_start: SourcePos,
    diagnostics: &'d mut DiagnosticList,
    /// Set when lexing hit a fatal literal error.
    halted: bool,
}

impl<'a, 'd> Lexer<'a, 'd> {
    pub fn new(source_code: &'a str, diagnostics: &'d mut DiagnosticList) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: SourcePos::default(),
            diagnostics,
            halted: false,
        }
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Returns `None` at end of source, and after a fatal literal
    /// diagnostic has been pushed.
    pub fn next_token(&mut self) -> Option<Token> {
        if self.halted {
            return None;
        }

        loop {
            let (at, next_char) = self.source.next_char()?;
            self.token_start = at;

            match next_char {
                // Whitespace produces no token; column bookkeeping
                // happens inside the source cursor.
                ' ' | '\t' | '\n' | '\r' => continue,
                '0'..='9' => return self.consume_number(),
                'a'..='z' | 'A'..='Z' => return Some(self.consume_ident()),
                c => match TokenKind::punctuation(c) {
                    Some(kind) => return Some(self.make_token(kind, TokenData::None)),
                    // Unrecognised characters are skipped silently.
                    None => continue,
                },
            }
        }
    }

    fn make_token(&self, kind: TokenKind, data: TokenData) -> Token {
        Token {
            kind,
            data,
            start: self.token_start,
            end: self.source.end_pos,
        }
    }

    /// The source text from the start of the current token to the
    /// last consumed character.
    fn token_fragment(&self) -> &'a str {
        &self.source.original[self.token_start.offset as usize..self.source.end_pos.offset as usize]
    }

    /// Consume a digit run (`[0-9]+`) and parse it as a signed
    /// 32-bit integer. Out-of-range literals are fatal.
    fn consume_number(&mut self) -> Option<Token> {
        self.source.reset_peek();

        while let Some((_, '0'..='9')) = self.source.peek_char() {
            self.source.next_char();
        }
        self.source.reset_peek();

        let fragment = self.token_fragment();
        match fragment.parse::<i32>() {
            Ok(value) => Some(self.make_token(TokenKind::Integer, TokenData::Int(value))),
            Err(_) => {
                self.diagnostics.push(
                    self.token_start,
                    self.source.end_pos,
                    format!("Integer literal out of 32-bit range: {}", fragment),
                );
                self.halted = true;
                None
            }
        }
    }

    /// Consume a letter run (`[A-Za-z][A-Za-z0-9_]*`).
    fn consume_ident(&mut self) -> Token {
        self.source.reset_peek();

        while let Some((_, c)) = self.source.peek_char() {
            match c {
                '_' | 'a'..='z' | 'A'..='Z' | '0'..='9' => {
                    self.source.next_char();
                }
                _ => break,
            }
        }
        self.source.reset_peek();

        let name = SmolStr::new(self.token_fragment());
        self.make_token(TokenKind::Identifier, TokenData::Name(name))
    }
}

/// Wrapper for source code that keeps a cursor position.
///
/// The `MultiPeek` wrapper allows lookahead by consuming the
/// iterator internally and buffering the result. Peeking advances
/// the peek cursor by one character per call; it is restored by
/// `next()` or an explicit `reset_peek()`.
struct SourceText<'a> {
    original: &'a str,
    source: MultiPeek<CharIndices<'a>>,
    /// Line of the next unconsumed character.
    line: u32,
    /// Column of the next unconsumed character.
    column: u32,
    /// Position one past the last consumed character.
    end_pos: SourcePos,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            source: multipeek(source.char_indices()),
            line: 1,
            column: 1,
            end_pos: SourcePos::default(),
        }
    }

    /// Advance the cursor and return the consumed character with
    /// the position it occupied.
    fn next_char(&mut self) -> Option<(SourcePos, char)> {
        let (index, c) = self.source.next()?;
        let at = SourcePos::new(self.line, self.column, index as u32);

        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            // A tab stands for three columns of whitespace.
            '\t' => self.column += 3,
            _ => self.column += 1,
        }

        self.end_pos = SourcePos::new(self.line, self.column, (index + c.len_utf8()) as u32);
        Some((at, c))
    }

    /// Peeks the next character in the stream.
    ///
    /// This call advances the peek cursor. Subsequent calls will
    /// look ahead by one character each call.
    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.source.peek().copied()
    }

    /// Reset the stream peek cursor.
    fn reset_peek(&mut self) {
        self.source.reset_peek()
    }
}
