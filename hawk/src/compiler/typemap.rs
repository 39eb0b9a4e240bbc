//! Type inference over a typemap.
//!
//! The typemap is an ordered list of root nodes, one per `Var` in
//! declaration order. Visiting an initializer drives propagation via
//! an upward AST walk: the nearest enclosing `Var` names the target
//! node, literals promote it to `int` directly, and references
//! attach the referenced node as a child and copy its type. Because
//! declaration order is strict, an initializer can only reference
//! already-declared names and the reference graph stays acyclic.
use std::fmt::{self, Write};

use super::{
    ast::{Ast, AstKind, NodeId},
    symbol::{Symbol, SymbolTable},
};
use crate::error::DiagnosticList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    /// Not yet inferred.
    Dyn,
    /// The only concrete type in the language.
    Int,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeName::Dyn => write!(f, "dyn"),
            TypeName::Int => write!(f, "int"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type {
    pub id: u32,
    pub name: TypeName,
}

/// How a typemap node came to be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// First binding of the name.
    Assignment,
    /// Reserved, never produced.
    Reassignment,
}

/// Shape tag; a leaf becomes a branch when its first child is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Leaf,
    Branch,
}

/// Index of a node in the typemap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeNodeId(u32);

impl TypeNodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct TypeNode {
    pub id: u32,
    pub symbol: Symbol,
    pub ty: Type,
    pub kind: BindKind,
    pub shape: NodeShape,
    children: Vec<TypeNodeId>,
}

#[derive(Debug, Default)]
pub struct TypeMap {
    nodes: Vec<TypeNode>,
    roots: Vec<TypeNodeId>,
    next_type_id: u32,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_type(&mut self, name: TypeName) -> Type {
        let id = self.next_type_id;
        self.next_type_id += 1;
        Type { id, name }
    }

    /// Append a new root leaf of type `dyn` for a declaration.
    pub fn add_root(&mut self, symbol: Symbol) -> TypeNodeId {
        let id = TypeNodeId(self.nodes.len() as u32);
        let ty = self.fresh_type(TypeName::Dyn);
        self.nodes.push(TypeNode {
            id: id.0,
            symbol,
            ty,
            kind: BindKind::Assignment,
            shape: NodeShape::Leaf,
            children: Vec::new(),
        });
        self.roots.push(id);
        id
    }

    /// Attach `child` under `parent`, turning a leaf into a branch.
    /// The same node may be attached under several branches.
    pub fn attach(&mut self, parent: TypeNodeId, child: TypeNodeId) {
        let node = &mut self.nodes[parent.index()];
        node.shape = NodeShape::Branch;
        node.children.push(child);
    }

    /// Replace the node's type, keeping a fresh type id.
    pub fn promote(&mut self, id: TypeNodeId, name: TypeName) {
        let ty = self.fresh_type(name);
        self.nodes[id.index()].ty = ty;
    }

    #[inline]
    pub fn node(&self, id: TypeNodeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn roots(&self) -> &[TypeNodeId] {
        &self.roots
    }

    #[inline]
    pub fn children(&self, id: TypeNodeId) -> &[TypeNodeId] {
        &self.nodes[id.index()].children
    }

    /// Find the typemap node for a name.
    ///
    /// Traverses the root list in declaration order, falling through
    /// into branch children, and returns the *last* occurrence seen.
    /// Shadowed and cross-scope uses of a name therefore alias to one
    /// node.
    pub fn find_node(&self, name: &str) -> Option<TypeNodeId> {
        let mut found = None;
        for &root in &self.roots {
            self.find_in(root, name, &mut found);
        }
        found
    }

    fn find_in(&self, id: TypeNodeId, name: &str, found: &mut Option<TypeNodeId>) {
        let node = self.node(id);
        if node.symbol.ident == name {
            *found = Some(id);
        }
        for &child in &node.children {
            self.find_in(child, name, found);
        }
    }

    /// Render the root list with nested children as an indented
    /// listing.
    pub fn dump(&self) -> String {
        let mut buf = String::new();
        for &root in &self.roots {
            self.dump_node(root, 0, &mut buf);
        }
        buf
    }

    fn dump_node(&self, id: TypeNodeId, depth: usize, buf: &mut String) {
        let node = self.node(id);
        let indent = "  ".repeat(depth);
        let kind = match node.kind {
            BindKind::Assignment => "assignment",
            BindKind::Reassignment => "reassignment",
        };
        let _ = writeln!(
            buf,
            "{}[{}] {:?} {}: {} ({})",
            indent, node.id, node.shape, node.symbol.ident, node.ty.name, kind
        );
        for &child in &node.children {
            self.dump_node(child, depth + 1, buf);
        }
    }
}

/// Build the typemap for a resolved AST.
///
/// Re-walks the tree in the same order as symbol resolution,
/// re-entering the retained scope sequence with `enter_scope` /
/// `leave_scope` only.
pub fn infer(ast: &Ast, table: &mut SymbolTable, diagnostics: &mut DiagnosticList) -> TypeMap {
    let mut inferencer = Inferencer {
        ast,
        table,
        map: TypeMap::new(),
        diagnostics,
    };

    if let Some(root) = ast.root() {
        inferencer.visit_let(root);
    }
    inferencer.map
}

struct Inferencer<'a, 'd> {
    ast: &'a Ast,
    table: &'a mut SymbolTable,
    map: TypeMap,
    diagnostics: &'d mut DiagnosticList,
}

impl<'a, 'd> Inferencer<'a, 'd> {
    fn visit_let(&mut self, id: NodeId) {
        self.table.enter_scope();

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

        let name = ident.name().cloned().unwrap_or_default();
        self.map
            .add_root(Symbol::new(name, ident.start, ident.end));

        self.visit_expr(children[1]);
    }

    fn visit_do(&mut self, id: NodeId) {
        self.visit_expr(self.ast.children(id)[0]);
        self.table.leave_scope();
    }

    fn visit_expr(&mut self, id: NodeId) {
        let node = self.ast.node(id);
        match node.kind {
            AstKind::IntLiteral => self.type_literal(id),
            AstKind::VarRef => self.type_var_ref(id),
            kind if kind.is_binary() => {
                // Matches the reference inferencer: the first child
                // is visited twice, the second never.
                self.visit_expr(node.children[0]);
                self.visit_expr(node.children[0]);
            }
            AstKind::Let => self.visit_let(id),
            _ => {}
        }
    }

    /// The typemap node named by the nearest enclosing `Var`, if the
    /// expression sits inside one. The walk passes through binary,
    /// `Do` and nested `Let` parents alike; the outermost `Do` has no
    /// enclosing `Var` and contributes to no target.
    fn target_node(&self, id: NodeId) -> Option<TypeNodeId> {
        let var = self.ast.ancestor_of_kind(id, AstKind::Var)?;
        let ident = self.ast.node(self.ast.children(var)[0]);
        self.map.find_node(ident.name()?)
    }

    /// An integer literal types its enclosing variable as `int`.
    fn type_literal(&mut self, id: NodeId) {
        if let Some(target) = self.target_node(id) {
            self.map.promote(target, TypeName::Int);
        }
    }

    /// A reference propagates the referenced node's type to the
    /// enclosing variable, linking the nodes. Referencing a variable
    /// that is still `dyn` is an error at the reference site.
    fn type_var_ref(&mut self, id: NodeId) {
        let node = self.ast.node(id);
        let name = match node.name() {
            Some(name) => name.clone(),
            None => return,
        };

        // Symbol resolution guarantees the declaration exists.
        let referenced = match self.map.find_node(&name) {
            Some(referenced) => referenced,
            None => return,
        };

        let referenced_node = self.map.node(referenced);
        if referenced_node.ty.name == TypeName::Dyn {
            let (decl_start, decl_end) = (referenced_node.symbol.start, referenced_node.symbol.end);
            self.diagnostics
                .push(node.start, node.end, "Cannot infer type of var ref");
            self.diagnostics.push(
                decl_start,
                decl_end,
                format!("Because {} has not been typed", name),
            );
            return;
        }

        let ty = referenced_node.ty.name;
        if let Some(target) = self.target_node(id) {
            self.map.attach(target, referenced);
            self.map.promote(target, ty);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::{lexer::tokenize, parser::parse, symbol::resolve};

    fn infer_source(source: &str) -> (TypeMap, DiagnosticList) {
        let mut diagnostics = DiagnosticList::new("test.hawk", source);
        let tokens = tokenize(source, &mut diagnostics);
        let ast = parse(tokens, &mut diagnostics).expect("parse failed");
        let mut table = resolve(&ast, &mut diagnostics);
        assert!(!diagnostics.has_errors(), "unexpected resolver errors");
        let map = infer(&ast, &mut table, &mut diagnostics);
        (map, diagnostics)
    }

    #[test]
    fn test_literal_types_variable() {
        let (map, diagnostics) = infer_source("let a = 5 do a");

        assert!(!diagnostics.has_errors());
        let root = map.roots()[0];
        assert_eq!(map.node(root).ty.name, TypeName::Int);
        assert_eq!(map.node(root).shape, NodeShape::Leaf);
    }

    #[test]
    fn test_reference_links_and_promotes() {
        let (map, diagnostics) = infer_source("let a = 5 b = a do b");

        assert!(!diagnostics.has_errors());
        let b = map.roots()[1];
        assert_eq!(map.node(b).ty.name, TypeName::Int);
        assert_eq!(map.node(b).shape, NodeShape::Branch);
        assert_eq!(map.children(b), &[map.roots()[0]]);
    }

    #[test]
    fn test_nested_let_types_outer_variable() {
        let (map, diagnostics) = infer_source("let a = let b = 5 do b do a");

        assert!(!diagnostics.has_errors());
        // Roots are in declaration order: a first, then nested b.
        let a = map.roots()[0];
        let b = map.roots()[1];
        assert_eq!(map.node(a).symbol.ident, "a");
        assert_eq!(map.node(a).ty.name, TypeName::Int);
        assert_eq!(map.children(a), &[b]);
    }

    #[test]
    fn test_self_reference_is_dyn_error() {
        let (map, diagnostics) = infer_source("let a = a do a");

        // One pair: the reference site and the declaration site.
        assert_eq!(diagnostics.len(), 2);
        let messages: Vec<String> =
            diagnostics.iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages[0], "Cannot infer type of var ref");
        assert_eq!(messages[1], "Because a has not been typed");

        let a = map.roots()[0];
        assert_eq!(map.node(a).ty.name, TypeName::Dyn);
    }

    #[test]
    fn test_binary_visits_first_operand_twice() {
        let (map, diagnostics) = infer_source("let a = 5 c = a b = a + c do b");

        assert!(!diagnostics.has_errors());
        let b = map.roots()[2];
        assert_eq!(map.node(b).symbol.ident, "b");
        // The inferencer visits the first operand twice and the
        // second never, so `b` links to `a` twice and to `c` not at
        // all.
        assert_eq!(map.children(b), &[map.roots()[0], map.roots()[0]]);
    }

    #[test]
    fn test_find_node_returns_last_occurrence() {
        let (map, _) = infer_source("let a = 1 a = 2 do a");

        let found = map.find_node("a").unwrap();
        assert_eq!(found, map.roots()[1]);
    }
}
