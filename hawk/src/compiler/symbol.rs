//! Symbols and lexical scopes.
use std::fmt::Write;

use smol_str::SmolStr;

use super::{
    ast::{Ast, AstKind, NodeId},
    tokens::SourcePos,
};
use crate::error::DiagnosticList;

/// A declared name with its declaration span.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub ident: SmolStr,
    pub start: SourcePos,
    pub end: SourcePos,
    /// Open extension point, currently unused.
    pub properties: Vec<SmolStr>,
}

impl Symbol {
    pub fn new(ident: SmolStr, start: SourcePos, end: SourcePos) -> Self {
        Self {
            ident,
            start,
            end,
            properties: Vec::new(),
        }
    }
}

/// One `let` block's worth of declarations.
#[derive(Debug)]
pub struct Scope {
    /// Stable label, only used by debug dumps.
    pub ident: String,
    symbols: Vec<Symbol>,
}

/// Append-only ordered list of scopes with a cursor.
///
/// `create_scope` appends and enters, `enter_scope` moves the cursor
/// forward, `leave_scope` moves it back. Scopes are never removed:
/// passes after symbol resolution re-walk the AST in the same order
/// and re-enter the same scope sequence with `enter_scope` /
/// `leave_scope` only. The cursor is signed because leaving the
/// outermost scope parks it below zero.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    cursor: isize,
    next_label: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            cursor: -1,
            next_label: 0,
        }
    }

    /// Append a fresh scope and enter it.
    pub fn create_scope(&mut self) {
        let ident = format!("let_{}", self.next_label);
        self.next_label += 1;
        self.scopes.push(Scope {
            ident,
            symbols: Vec::new(),
        });
        self.cursor = self.scopes.len() as isize - 1;
    }

    pub fn enter_scope(&mut self) {
        self.cursor += 1;
    }

    pub fn leave_scope(&mut self) {
        self.cursor -= 1;
    }

    /// Define a symbol in the current scope. Shadowing an existing
    /// name is permitted.
    pub fn define(&mut self, symbol: Symbol) {
        debug_assert!(self.cursor >= 0, "define outside any scope");
        if let Some(scope) = self.scopes.get_mut(self.cursor as usize) {
            scope.symbols.push(symbol);
        }
    }

    /// Search scopes from the current one down to the first, taking
    /// the most recent definition within each scope.
    pub fn find_symbol(&self, name: &str) -> Option<&Symbol> {
        let mut index = self.cursor;
        while index >= 0 {
            let scope = self.scopes.get(index as usize)?;
            if let Some(symbol) = scope.symbols.iter().rev().find(|s| s.ident == name) {
                return Some(symbol);
            }
            index -= 1;
        }
        None
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Render every scope with its symbols as an indented listing.
    pub fn dump(&self) -> String {
        let mut buf = String::new();
        for scope in &self.scopes {
            let _ = writeln!(buf, "{}", scope.ident);
            for symbol in &scope.symbols {
                let _ = writeln!(buf, "  {} [{}-{}]", symbol.ident, symbol.start, symbol.end);
            }
        }
        buf
    }
}

/// Build the symbol table for an AST, flagging undeclared uses.
///
/// The table is returned even when diagnostics were pushed so debug
/// dumps can show the partial result; the pipeline driver decides
/// whether to continue.
pub fn resolve(ast: &Ast, diagnostics: &mut DiagnosticList) -> SymbolTable {
    let mut resolver = Resolver {
        ast,
        table: SymbolTable::new(),
        diagnostics,
    };

    if let Some(root) = ast.root() {
        resolver.visit_let(root);
    }
    resolver.table
}

struct Resolver<'a, 'd> {
    ast: &'a Ast,
    table: SymbolTable,
    diagnostics: &'d mut DiagnosticList,
}

impl<'a, 'd> Resolver<'a, 'd> {
    fn visit_let(&mut self, id: NodeId) {
        self.table.create_scope();

        let children = self.ast.children(id);
        let (do_block, vars) = match children.split_last() {
            Some(split) => split,
            None => return,
        };

        for &var in vars {
            self.visit_var(var);
        }
        self.visit_do(*do_block);
    }

    fn visit_var(&mut self, id: NodeId) {
        let children = self.ast.children(id);
        let ident = self.ast.node(children[0]);
        debug_assert_eq!(ident.kind, AstKind::Identifier);

        // The variable is defined before its initializer is visited,
        // so it is in scope for its own initializer and for
        // subsequent siblings.
        if let Some(name) = ident.name() {
            self.table
                .define(Symbol::new(name.clone(), ident.start, ident.end));
        }

        self.visit_expr(children[1]);
    }

    fn visit_do(&mut self, id: NodeId) {
        self.visit_expr(self.ast.children(id)[0]);
        self.table.leave_scope();
    }

    fn visit_expr(&mut self, id: NodeId) {
        let node = self.ast.node(id);
        match node.kind {
            AstKind::IntLiteral => {}
            AstKind::VarRef => {
                let name = node.name().cloned().unwrap_or_default();
                if self.table.find_symbol(&name).is_none() {
                    self.diagnostics.push(
                        node.start,
                        node.end,
                        format!("Use of undeclared symbol: {}", name),
                    );
                }
            }
            kind if kind.is_binary() => {
                self.visit_expr(node.children[0]);
                self.visit_expr(node.children[1]);
            }
            AstKind::Let => self.visit_let(id),
            _ => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::{lexer::tokenize, parser::parse};

    fn resolve_source(source: &str) -> (SymbolTable, DiagnosticList) {
        let mut diagnostics = DiagnosticList::new("test.hawk", source);
        let tokens = tokenize(source, &mut diagnostics);
        let ast = parse(tokens, &mut diagnostics).expect("parse failed");
        let table = resolve(&ast, &mut diagnostics);
        (table, diagnostics)
    }

    #[test]
    fn test_declared_symbols_resolve() {
        let (table, diagnostics) = resolve_source("let a = 5 b = a do b");

        assert!(!diagnostics.has_errors());
        assert_eq!(table.scopes().len(), 1);
    }

    #[test]
    fn test_undeclared_symbol_reported() {
        let (_, diagnostics) = resolve_source("let a = b do a");

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.message, "Use of undeclared symbol: b");
        assert_eq!(diagnostic.start.column, 9);
    }

    #[test]
    fn test_one_diagnostic_per_occurrence() {
        let (_, diagnostics) = resolve_source("let a = b do b + b");

        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_nested_let_gets_own_scope() {
        let (table, diagnostics) = resolve_source("let a = let b = 5 do b do a");

        assert!(!diagnostics.has_errors());
        assert_eq!(table.scopes().len(), 2);
        assert_eq!(table.scopes()[0].ident, "let_0");
        assert_eq!(table.scopes()[1].ident, "let_1");
    }

    #[test]
    fn test_outer_symbol_visible_in_nested_scope() {
        let (_, diagnostics) = resolve_source("let a = 5 b = let c = 10 do c + a do b");

        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_shadowing_picks_most_recent() {
        let (table, diagnostics) = resolve_source("let a = 1 a = 2 do a");

        assert!(!diagnostics.has_errors());
        // Both definitions are retained; lookup returns the latest.
        let found = table.find_symbol("a");
        assert!(found.is_none(), "cursor has left every scope");
    }

    #[test]
    fn test_var_in_scope_for_own_initializer() {
        let (_, diagnostics) = resolve_source("let a = a do a");

        assert!(!diagnostics.has_errors());
    }
}
