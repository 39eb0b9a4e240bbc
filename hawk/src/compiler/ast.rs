//! Abstract syntax tree.
//!
//! Nodes live in an arena indexed by [`NodeId`]; every non-root node
//! keeps a link to its structural parent so later passes can walk
//! upward from an expression to its enclosing `Var`.
use std::fmt::Write;

use smol_str::SmolStr;

use super::tokens::SourcePos;

/// Index of a node in the AST arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstKind {
    Let,
    Do,
    Var,
    Identifier,
    VarRef,
    IntLiteral,
    BinaryPlus,
    BinaryMinus,
    BinaryMul,
    BinaryDiv,
    /// Reserved expression tag, never produced.
    Expression,
}

impl AstKind {
    /// True for the four arithmetic node kinds.
    #[inline]
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            AstKind::BinaryPlus | AstKind::BinaryMinus | AstKind::BinaryMul | AstKind::BinaryDiv
        )
    }
}

/// Payload carried by a node alongside its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AstData {
    None,
    Name(SmolStr),
    Int(i32),
}

#[derive(Debug)]
pub struct AstNode {
    pub kind: AstKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: AstData,
    pub start: SourcePos,
    pub end: SourcePos,
}

impl AstNode {
    /// Name payload, for `Identifier` and `VarRef` nodes.
    #[inline]
    pub fn name(&self) -> Option<&SmolStr> {
        match &self.data {
            AstData::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Integer payload, for `IntLiteral` nodes.
    #[inline]
    pub fn int(&self) -> Option<i32> {
        match self.data {
            AstData::Int(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<AstNode>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, kind: AstKind, data: AstData, start: SourcePos, end: SourcePos) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode {
            kind,
            parent: None,
            children: Vec::new(),
            data,
            start,
            end,
        });
        id
    }

    /// Append `child` to `parent`, establishing the parent link.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.nodes[child.index()].parent.is_none(),
            "node is already attached"
        );
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> AstKind {
        self.nodes[id.index()].kind
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Walk upward from `id` to the nearest enclosing node of the
    /// given kind, exclusive of `id` itself.
    pub fn ancestor_of_kind(&self, id: NodeId, kind: AstKind) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.kind(node) == kind {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Pre-order walk from `id`, calling `visit` on every reachable
    /// node.
    pub fn walk(&self, id: NodeId, visit: &mut impl FnMut(NodeId, &AstNode)) {
        let node = self.node(id);
        visit(id, node);
        for &child in &node.children {
            self.walk(child, visit);
        }
    }

    /// Render the tree back to source text.
    ///
    /// The grammar has no parentheses, but binary left operands are
    /// always atoms and operators associate right, so the rendering
    /// re-parses to the same tree.
    pub fn pretty(&self) -> String {
        let mut buf = String::new();
        if let Some(root) = self.root {
            self.pretty_node(root, &mut buf);
        }
        buf
    }

    fn pretty_node(&self, id: NodeId, buf: &mut String) {
        let node = self.node(id);
        match node.kind {
            AstKind::Let => {
                buf.push_str("let");
                for &child in &node.children {
                    buf.push(' ');
                    self.pretty_node(child, buf);
                }
            }
            AstKind::Do => {
                buf.push_str("do ");
                self.pretty_node(node.children[0], buf);
            }
            AstKind::Var => {
                self.pretty_node(node.children[0], buf);
                buf.push_str(" = ");
                self.pretty_node(node.children[1], buf);
            }
            AstKind::Identifier | AstKind::VarRef => {
                if let Some(name) = node.name() {
                    buf.push_str(name);
                }
            }
            AstKind::IntLiteral => {
                let _ = write!(buf, "{}", node.int().unwrap_or_default());
            }
            kind if kind.is_binary() => {
                self.pretty_node(node.children[0], buf);
                buf.push_str(match kind {
                    AstKind::BinaryPlus => " + ",
                    AstKind::BinaryMinus => " - ",
                    AstKind::BinaryMul => " * ",
                    _ => " / ",
                });
                self.pretty_node(node.children[1], buf);
            }
            _ => {}
        }
    }

    /// Render the tree under the root as an indented listing.
    pub fn dump(&self) -> String {
        let mut buf = String::new();
        if let Some(root) = self.root {
            self.dump_node(root, 0, &mut buf);
        }
        buf
    }

    fn dump_node(&self, id: NodeId, depth: usize, buf: &mut String) {
        let node = self.node(id);
        let indent = "  ".repeat(depth);

        let _ = match &node.data {
            AstData::Name(name) => writeln!(
                buf,
                "{}{:?} {} [{}-{}]",
                indent, node.kind, name, node.start, node.end
            ),
            AstData::Int(value) => writeln!(
                buf,
                "{}{:?} {} [{}-{}]",
                indent, node.kind, value, node.start, node.end
            ),
            AstData::None => writeln!(buf, "{}{:?} [{}-{}]", indent, node.kind, node.start, node.end),
        };

        for &child in &node.children {
            self.dump_node(child, depth + 1, buf);
        }
    }
}
