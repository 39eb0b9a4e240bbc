//! Result and errors.
use std::{
    fmt::{self, Display, Formatter},
    io,
};

use crate::compiler::tokens::SourcePos;

pub type HawkResult<T> = std::result::Result<T, HawkError>;

#[derive(Debug)]
pub enum HawkError {
    /// VM error during the execution loop.
    Runtime(&'static str),
    /// Opcode byte outside the defined set.
    UnknownOpcode { opcode: u8, offset: usize },
    /// Operand extends past the end of the bytecode packet.
    TruncatedOperand { offset: usize },
    /// Integer division with a zero divisor.
    DivideByZero,
    /// Stack was empty when the final value was requested.
    EmptyStack,
    /// Compilation produced diagnostics instead of bytecode.
    Compile(DiagnosticList),
    Io(io::Error),
    Utf8(std::string::FromUtf8Error),
}

impl Display for HawkError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Runtime(msg) => write!(f, "runtime error: {}", msg),
            Self::UnknownOpcode { opcode, offset } => {
                write!(f, "unknown opcode 0x{:02X} at offset {}", opcode, offset)
            }
            Self::TruncatedOperand { offset } => {
                write!(f, "truncated operand at offset {}", offset)
            }
            Self::DivideByZero => write!(f, "division by zero"),
            Self::EmptyStack => write!(f, "stack is empty at end of program"),
            Self::Compile(diagnostics) => write!(f, "{}", diagnostics),
            Self::Io(err) => write!(f, "{}", err),
            Self::Utf8(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for HawkError {}

impl From<io::Error> for HawkError {
    fn from(err: io::Error) -> Self {
        HawkError::Io(err)
    }
}

impl From<std::string::FromUtf8Error> for HawkError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        HawkError::Utf8(err)
    }
}

impl From<DiagnosticList> for HawkError {
    fn from(diagnostics: DiagnosticList) -> Self {
        HawkError::Compile(diagnostics)
    }
}

/// A single compile diagnostic with the source line it points into.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub start: SourcePos,
    pub end: SourcePos,
    /// Copy of the offending source line, captured when the
    /// diagnostic is pushed.
    pub line: String,
}

impl Diagnostic {
    const MARKER: u8 = 0x7E; // tilde (~)
    const SPACE: u8 = 0x20; // space ( )
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "{}:{} - {}", self.start.line, self.start.column, self.message)?;
        writeln!(f, "{}", self.line)?;

        let indent =
            String::from_utf8(vec![Self::SPACE; self.start.column as usize - 1]).unwrap_or_default();

        // A zero-width span still gets a minimal marker so something shows up.
        let marker_width = usize::max(1, (self.end.offset - self.start.offset) as usize);
        let marker = String::from_utf8(vec![Self::MARKER; marker_width]).unwrap_or_default();
        write!(f, "{}{}", indent, marker)?;

        Ok(())
    }
}

/// Per-run buffer of compile diagnostics.
///
/// Every pass pushes into the same list; the pipeline driver halts
/// between stages when the list is non-empty.
#[derive(Debug, Default)]
pub struct DiagnosticList {
    path: String,
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Path of the source file this run is compiling.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn push(&mut self, start: SourcePos, end: SourcePos, message: impl ToString) {
        let line = surrounding_line(&self.source, start.offset as usize).to_string();
        self.diagnostics.push(Diagnostic {
            message: message.to_string(),
            start,
            end,
            line,
        });
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }
}

impl Display for DiagnosticList {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (index, diagnostic) in self.diagnostics.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Slice out the line of text containing the given byte offset,
/// without its trailing newline.
fn surrounding_line(text: &str, offset: usize) -> &str {
    let offset = usize::min(offset, text.len());
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len());
    &text[start..end]
}
