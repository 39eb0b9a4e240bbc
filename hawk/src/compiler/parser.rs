//! Combinator-style parser with local backtracking.
//!
//! Each rule receives a `can_fail` flag. When set, a deviation from
//! the rule produces a silent [`ParseFail::NoMatch`] so the caller
//! can try another alternative; when not set, the first deviation
//! pushes a diagnostic and propagates [`ParseFail::Fatal`] up to the
//! pipeline driver. Speculative descents bracket themselves with the
//! token cursor's checkpoint stack and either commit or restore.
use super::{
    ast::{Ast, AstData, AstKind, NodeId},
    cursor::TokenCursor,
    tokens::{SourcePos, Token, TokenKind},
};
use crate::error::DiagnosticList;

/// Outcome of a failed parse rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseFail {
    /// Tolerated failure during a speculative descent; no diagnostic.
    NoMatch,
    /// A diagnostic has been pushed; unwind the whole parse.
    Fatal,
}

type Parse<T> = Result<T, ParseFail>;

/// Parse a token sequence into an AST.
///
/// Returns `None` when parsing failed; the diagnostics buffer holds
/// the reason.
pub fn parse(tokens: Vec<Token>, diagnostics: &mut DiagnosticList) -> Option<Ast> {
    let mut parser = Parser {
        cursor: TokenCursor::new(tokens),
        ast: Ast::new(),
        diagnostics,
    };

    match parser.let_block(false) {
        Ok(root) => {
            parser.ast.set_root(root);
            Some(parser.ast)
        }
        Err(_) => None,
    }
}

struct Parser<'d> {
    cursor: TokenCursor,
    ast: Ast,
    diagnostics: &'d mut DiagnosticList,
}

impl<'d> Parser<'d> {
    /// `Let := 'let' Var* Do`
    fn let_block(&mut self, can_fail: bool) -> Parse<NodeId> {
        let keyword = self.ident_keyword("let", can_fail)?;

        let mut vars = Vec::new();
        loop {
            match self.cursor.peek() {
                Some(token) if token.is_ident("do") => break,
                Some(_) => vars.push(self.var_def(can_fail)?),
                None => break, // do_block reports the missing `do`
            }
        }

        let do_block = self.do_block(can_fail)?;

        let end = self.ast.node(do_block).end;
        let id = self
            .ast
            .alloc(AstKind::Let, AstData::None, keyword.start, end);
        for var in vars {
            self.ast.attach(id, var);
        }
        self.ast.attach(id, do_block);
        Ok(id)
    }

    /// `Var := IDENT '=' Expr`
    fn var_def(&mut self, can_fail: bool) -> Parse<NodeId> {
        let name = match self.cursor.peek() {
            Some(token) if token.kind == TokenKind::Identifier => self.cursor.next().unwrap(),
            _ => return self.fail(can_fail, "Expected variable name"),
        };

        match self.cursor.peek_kind() {
            Some(TokenKind::Equal) => {
                self.cursor.next();
            }
            _ => return self.fail(can_fail, "Expected '=' after variable name"),
        }

        let expr = self.expression(can_fail)?;

        let ident = self.ast.alloc(
            AstKind::Identifier,
            AstData::Name(name.name().cloned().unwrap_or_default()),
            name.start,
            name.end,
        );

        let end = self.ast.node(expr).end;
        let id = self.ast.alloc(AstKind::Var, AstData::None, name.start, end);
        self.ast.attach(id, ident);
        self.ast.attach(id, expr);
        Ok(id)
    }

    /// `Do := 'do' Expr`
    fn do_block(&mut self, can_fail: bool) -> Parse<NodeId> {
        let keyword = self.ident_keyword("do", can_fail)?;
        let expr = self.expression(can_fail)?;

        let end = self.ast.node(expr).end;
        let id = self.ast.alloc(AstKind::Do, AstData::None, keyword.start, end);
        self.ast.attach(id, expr);
        Ok(id)
    }

    /// `Expr := Atom ((Plus|Hyphen|Star|FSlash) Expr)? | Let`
    ///
    /// The binary continuation is always speculative: its failure
    /// restores the cursor and the atom stands alone. Nesting to the
    /// right makes every operator right-associative with equal
    /// precedence.
    fn expression(&mut self, can_fail: bool) -> Parse<NodeId> {
        match self.cursor.peek_kind() {
            Some(TokenKind::Integer) => {
                let atom = self.cursor.next().unwrap();

                self.cursor.checkpoint();
                match self.binary_continuation(&atom) {
                    Ok(id) => {
                        self.cursor.commit();
                        Ok(id)
                    }
                    Err(_) => {
                        self.cursor.restore();
                        Ok(self.atom_node(&atom))
                    }
                }
            }
            Some(TokenKind::Identifier) => {
                // A nested let-expression also starts with an
                // identifier token; try it first with failure
                // tolerated.
                self.cursor.checkpoint();
                match self.let_block(true) {
                    Ok(id) => {
                        self.cursor.commit();
                        return Ok(id);
                    }
                    Err(_) => self.cursor.restore(),
                }

                let atom = self.cursor.next().unwrap();

                self.cursor.checkpoint();
                match self.binary_continuation(&atom) {
                    Ok(id) => {
                        self.cursor.commit();
                        Ok(id)
                    }
                    Err(_) => {
                        self.cursor.restore();
                        Ok(self.atom_node(&atom))
                    }
                }
            }
            _ => self.fail(can_fail, "Expected expression"),
        }
    }

    /// One operator token and a recursive `Expr` as the right
    /// operand. The already-consumed atom token becomes the left
    /// operand node.
    fn binary_continuation(&mut self, left: &Token) -> Parse<NodeId> {
        let kind = match self.cursor.peek_kind() {
            Some(TokenKind::Plus) => AstKind::BinaryPlus,
            Some(TokenKind::Hyphen) => AstKind::BinaryMinus,
            Some(TokenKind::Star) => AstKind::BinaryMul,
            Some(TokenKind::FSlash) => AstKind::BinaryDiv,
            _ => return Err(ParseFail::NoMatch),
        };
        self.cursor.next();

        let right = self.expression(true)?;

        let left_id = self.atom_node(left);
        let end = self.ast.node(right).end;
        let id = self.ast.alloc(kind, AstData::None, left.start, end);
        self.ast.attach(id, left_id);
        self.ast.attach(id, right);
        Ok(id)
    }

    /// Build an `IntLiteral` or `VarRef` leaf from a consumed token.
    fn atom_node(&mut self, token: &Token) -> NodeId {
        match token.kind {
            TokenKind::Integer => self.ast.alloc(
                AstKind::IntLiteral,
                AstData::Int(token.int().unwrap_or_default()),
                token.start,
                token.end,
            ),
            TokenKind::Identifier => self.ast.alloc(
                AstKind::VarRef,
                AstData::Name(token.name().cloned().unwrap_or_default()),
                token.start,
                token.end,
            ),
            kind => unreachable!("atom built from non-atom token {:?}", kind),
        }
    }

    /// Consume an identifier token whose text matches `text`.
    fn ident_keyword(&mut self, text: &str, can_fail: bool) -> Parse<Token> {
        match self.cursor.peek() {
            Some(token) if token.is_ident(text) => Ok(self.cursor.next().unwrap()),
            _ => self.fail(can_fail, format!("Expected '{}'", text)),
        }
    }

    /// Fail the current rule: silently under `can_fail`, otherwise
    /// with a diagnostic at the offending token.
    #[inline(never)]
    #[cold]
    fn fail<T>(&mut self, can_fail: bool, message: impl ToString) -> Parse<T> {
        if can_fail {
            return Err(ParseFail::NoMatch);
        }

        let (start, end) = match self.cursor.peek() {
            Some(token) => (token.start, token.end),
            // At end of stream, point past the previous token.
            None => match self.cursor.previous() {
                Some(token) => (token.end, token.end),
                None => (SourcePos::default(), SourcePos::default()),
            },
        };
        self.diagnostics.push(start, end, message);
        Err(ParseFail::Fatal)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::lexer::tokenize;

    fn parse_source(source: &str) -> (Option<Ast>, DiagnosticList) {
        let mut diagnostics = DiagnosticList::new("test.hawk", source);
        let tokens = tokenize(source, &mut diagnostics);
        let ast = parse(tokens, &mut diagnostics);
        (ast, diagnostics)
    }

    fn kinds_of(ast: &Ast, id: NodeId) -> Vec<AstKind> {
        ast.children(id).iter().map(|&c| ast.kind(c)).collect()
    }

    #[test]
    fn test_minimal_program() {
        let (ast, diagnostics) = parse_source("let a = 5 do a");
        assert!(!diagnostics.has_errors());

        let ast = ast.unwrap();
        let root = ast.root().unwrap();
        assert_eq!(ast.kind(root), AstKind::Let);
        assert_eq!(kinds_of(&ast, root), vec![AstKind::Var, AstKind::Do]);

        let var = ast.children(root)[0];
        assert_eq!(kinds_of(&ast, var), vec![AstKind::Identifier, AstKind::IntLiteral]);
    }

    #[test]
    fn test_right_associative_chain() {
        // `a + b * c` parses as `a + (b * c)`.
        let (ast, diagnostics) = parse_source("let a = 1 b = 2 c = 3 do a + b * c");
        assert!(!diagnostics.has_errors());

        let ast = ast.unwrap();
        let root = ast.root().unwrap();
        let do_block = *ast.children(root).last().unwrap();
        let plus = ast.children(do_block)[0];
        assert_eq!(ast.kind(plus), AstKind::BinaryPlus);

        let operands = kinds_of(&ast, plus);
        assert_eq!(operands, vec![AstKind::VarRef, AstKind::BinaryMul]);
    }

    #[test]
    fn test_nested_let_initializer() {
        let (ast, diagnostics) = parse_source("let a = let b = 5 do b do a");
        assert!(!diagnostics.has_errors());

        let ast = ast.unwrap();
        let root = ast.root().unwrap();
        let var = ast.children(root)[0];
        assert_eq!(kinds_of(&ast, var), vec![AstKind::Identifier, AstKind::Let]);
    }

    #[test]
    fn test_parent_links() {
        let (ast, _) = parse_source("let a = 5 b = a + 1 do b");
        let ast = ast.unwrap();
        let root = ast.root().unwrap();

        assert_eq!(ast.parent(root), None);
        let mut checked = 0;
        ast.walk(root, &mut |id, node| {
            for &child in &node.children {
                assert_eq!(ast.parent(child), Some(id));
                checked += 1;
            }
        });
        assert!(checked > 0);
    }

    #[test]
    fn test_span_nesting() {
        let (ast, _) = parse_source("let a = 5 do a + 2");
        let ast = ast.unwrap();
        let root = ast.root().unwrap();

        ast.walk(root, &mut |_, node| {
            for &child in &node.children {
                let child = ast.node(child);
                assert!(child.start.offset >= node.start.offset);
                assert!(child.end.offset <= node.end.offset);
            }
        });
    }

    #[test]
    fn test_missing_do_is_fatal() {
        let (ast, diagnostics) = parse_source("let a = 5");
        assert!(ast.is_none());
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_missing_equal_is_fatal() {
        let (ast, diagnostics) = parse_source("let a 5 do a");
        assert!(ast.is_none());
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_missing_expression_is_fatal() {
        let (ast, diagnostics) = parse_source("let a = do a");
        assert!(ast.is_none());
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_empty_source_is_fatal() {
        let (ast, diagnostics) = parse_source("");
        assert!(ast.is_none());
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_operator_without_operand_falls_back_to_atom() {
        // The continuation claims `do` as a variable reference,
        // leaving the trailing `a` to trip the var loop.
        let (ast, diagnostics) = parse_source("let a = 5 + do a");
        assert!(ast.is_none());
        assert!(diagnostics.has_errors());
    }
}
