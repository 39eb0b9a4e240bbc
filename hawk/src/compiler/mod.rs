//! Compiler pipeline.
//!
//! Source text flows through tokenizer, parser, symbol resolver,
//! type inferencer and code generator. Every stage accumulates into
//! the same per-run diagnostic buffer, and the driver halts the
//! pipeline as soon as the buffer is non-empty.
pub mod ast;
pub mod codegen;
pub mod cursor;
pub mod lexer;
pub mod parser;
pub mod symbol;
pub mod tokens;
pub mod typemap;

pub use self::{
    ast::{Ast, AstKind, NodeId},
    cursor::TokenCursor,
    symbol::SymbolTable,
    tokens::{SourcePos, Token, TokenKind},
    typemap::TypeMap,
};

use crate::error::DiagnosticList;

/// Compile Hawk source text into a bytecode packet.
///
/// On failure the accumulated diagnostics are returned instead; the
/// caller decides how to present them.
pub fn compile(path: &str, source: &str) -> Result<Vec<u8>, DiagnosticList> {
    let mut diagnostics = DiagnosticList::new(path, source);

    // Lexical analysis
    let tokens = lexer::tokenize(source, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    // Syntactic analysis
    let ast = match parser::parse(tokens, &mut diagnostics) {
        Some(ast) => ast,
        None => return Err(diagnostics),
    };
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    // Semantic analysis
    let mut table = symbol::resolve(&ast, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let _typemap = typemap::infer(&ast, &mut table, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    // Code generation
    match codegen::generate(&ast, &mut diagnostics) {
        Some(bytecode) if !diagnostics.has_errors() => Ok(bytecode),
        _ => Err(diagnostics),
    }
}
