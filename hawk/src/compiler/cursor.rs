//! Token cursor with checkpointed backtracking.
use super::tokens::{Token, TokenKind};

/// Linear reader over the token sequence.
///
/// The parser drives speculative descents by saving the current
/// index on a checkpoint stack before an alternation, and either
/// committing (dropping the saved index) or restoring (rewinding to
/// it) once the alternative resolves.
#[derive(Debug)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    index: usize,
    /// Stack of saved indices for backtracking.
    saved: Vec<usize>,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            saved: Vec::new(),
        }
    }

    /// Return the current token without advancing the cursor.
    ///
    /// Returns `None` at the end of the stream.
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    /// Return the current token kind without advancing the cursor.
    #[inline]
    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    /// Consume the current token regardless of type.
    ///
    /// Returns `None` when the cursor is at the end of the stream.
    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// The most recently consumed token.
    ///
    /// This can be used to build errors that refer to the end of the
    /// previous token's span.
    pub fn previous(&self) -> Option<&Token> {
        self.index.checked_sub(1).map(|i| &self.tokens[i])
    }

    /// Save the current index on the checkpoint stack.
    pub fn checkpoint(&mut self) {
        self.saved.push(self.index);
    }

    /// Rewind to the most recent checkpoint, popping it.
    ///
    /// # Panics
    ///
    /// Panics if no checkpoint was saved; a restore must always pair
    /// with a preceding `checkpoint`.
    pub fn restore(&mut self) {
        self.index = self
            .saved
            .pop()
            .expect("restore without a matching checkpoint");
    }

    /// Drop the most recent checkpoint, keeping the current index.
    ///
    /// # Panics
    ///
    /// Panics if no checkpoint was saved.
    pub fn commit(&mut self) {
        self.saved
            .pop()
            .expect("commit without a matching checkpoint");
    }

    /// Indicates whether all tokens have been consumed.
    pub fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }
}
