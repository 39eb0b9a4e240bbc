//! Code generation with a compile-time stack emulator.
//!
//! The generator keeps a shadow stack that mirrors the VM stack slot
//! for slot at every emission point. Variable references compile to
//! `READ` with the name's index-from-top in the shadow stack, which
//! is where the VM will find the value at run time. Block entry
//! pushes a frame sentinel on both stacks (the runtime marker is the
//! value `0xff`); neither sentinel is ever removed, so offsets into
//! enclosing blocks stay aligned.
use log::trace;
use smol_str::SmolStr;

use super::ast::{Ast, AstKind, NodeId};
use crate::{
    bytecode::{encode_op, encode_op_i32, opcodes, FRAME_MARKER},
    error::DiagnosticList,
};

/// Compile-time model of one VM stack slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    /// Bottom-of-block sentinel.
    Frame,
    /// A value slot, named either by a declared variable or by a
    /// synthetic temporary.
    Var(SmolStr),
}

/// Ordered tree of byte chunks; the in-order concatenation of its
/// statements is the final packet.
#[derive(Debug)]
enum BcNode {
    Block(Vec<BcNode>),
    Statement(Vec<u8>),
}

impl BcNode {
    fn flatten_into(&self, buf: &mut Vec<u8>) {
        match self {
            BcNode::Block(children) => {
                for child in children {
                    child.flatten_into(buf);
                }
            }
            BcNode::Statement(bytes) => buf.extend_from_slice(bytes),
        }
    }
}

/// Structural failure during generation; the diagnostic has already
/// been pushed.
#[derive(Debug)]
struct GenFail;

type Gen<T> = Result<T, GenFail>;

/// Generate the bytecode packet for a resolved AST.
///
/// Returns `None` when generation failed; the diagnostics buffer
/// holds the reason.
pub fn generate(ast: &Ast, diagnostics: &mut DiagnosticList) -> Option<Vec<u8>> {
    let root = ast.root()?;
    let mut codegen = CodeGen::new(ast, diagnostics);

    match codegen.emit_let(root) {
        Ok(()) => Some(codegen.finish()),
        Err(GenFail) => None,
    }
}

struct CodeGen<'a, 'd> {
    ast: &'a Ast,
    /// Compile-time mirror of the VM stack.
    shadow: Vec<StackEntry>,
    /// Stack of open blocks; the first entry is the packet root.
    blocks: Vec<Vec<BcNode>>,
    next_temp: u32,
    diagnostics: &'d mut DiagnosticList,
}

impl<'a, 'd> CodeGen<'a, 'd> {
    fn new(ast: &'a Ast, diagnostics: &'d mut DiagnosticList) -> Self {
        Self {
            ast,
            shadow: Vec::new(),
            blocks: vec![Vec::new()],
            next_temp: 0,
            diagnostics,
        }
    }

    fn finish(mut self) -> Vec<u8> {
        debug_assert_eq!(self.blocks.len(), 1, "unbalanced block nesting");
        let root = BcNode::Block(self.blocks.pop().unwrap_or_default());
        let mut buf = Vec::new();
        root.flatten_into(&mut buf);
        buf
    }

    // ------------------------------------------------------------------------
    // Emission

    fn enter_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    fn leave_block(&mut self) {
        debug_assert!(self.blocks.len() > 1, "leave without matching enter");
        if let Some(block) = self.blocks.pop() {
            self.statement_target().push(BcNode::Block(block));
        }
    }

    fn statement_target(&mut self) -> &mut Vec<BcNode> {
        self.blocks.last_mut().expect("no open block")
    }

    fn emit(&mut self, opcode: u8) {
        let mut bytes = Vec::with_capacity(1);
        encode_op(&mut bytes, opcode);
        self.statement_target().push(BcNode::Statement(bytes));
    }

    fn emit_i32(&mut self, opcode: u8, operand: i32) {
        let mut bytes = Vec::with_capacity(5);
        encode_op_i32(&mut bytes, opcode, operand);
        self.statement_target().push(BcNode::Statement(bytes));
    }

    fn temp_name(&mut self) -> SmolStr {
        let name = SmolStr::new(format!("tmp{}", self.next_temp));
        self.next_temp += 1;
        name
    }

    /// Index-from-top of the most recent occurrence of `name` on the
    /// shadow stack.
    fn locate(&self, name: &str) -> Option<i32> {
        self.shadow
            .iter()
            .rev()
            .position(|entry| matches!(entry, StackEntry::Var(n) if n == name))
            .map(|index| index as i32)
    }

    /// Rename the top of the shadow stack.
    ///
    /// Pops the top entry without verifying it is a `Var`.
    fn name_top(&mut self, name: SmolStr) {
        self.shadow.pop();
        self.shadow.push(StackEntry::Var(name));
    }

    // ------------------------------------------------------------------------
    // Recursive visitor

    /// Emit a `let` block: frame marker, variable initializers, then
    /// the `do` cleanup. Leaves the block's result on top with the
    /// frame sentinel beneath it.
    fn emit_let(&mut self, id: NodeId) -> Gen<()> {
        let depth = self.shadow.len();

        self.enter_block();
        self.shadow.push(StackEntry::Frame);
        self.emit_i32(opcodes::PUSH, FRAME_MARKER);

        let children = self.ast.children(id);
        let (last, vars) = match children.split_last() {
            Some(split) if self.ast.kind(*split.0) == AstKind::Do => split,
            _ => {
                // The parser guarantees a do block; surfaced again
                // defensively.
                let node = self.ast.node(id);
                self.diagnostics
                    .push(node.start, node.end, "Missing 'do' block under 'let'");
                return Err(GenFail);
            }
        };

        for &var in vars {
            self.emit_var(var)?;
        }
        self.emit_do(*last)?;

        self.leave_block();

        debug_assert_eq!(self.shadow.len(), depth + 2, "block left unbalanced stack");
        Ok(())
    }

    /// Emit a variable initializer and claim the resulting top slot
    /// for the variable's name.
    fn emit_var(&mut self, id: NodeId) -> Gen<()> {
        let children = self.ast.children(id);
        let ident = self.ast.node(children[0]);
        debug_assert_eq!(ident.kind, AstKind::Identifier);
        let name = ident.name().cloned().unwrap_or_default();

        self.emit_expr(children[1])?;
        trace!("stack[{}] = {}", self.shadow.len() - 1, name);
        self.name_top(name);
        Ok(())
    }

    /// Emit the block result expression, then carry it across the
    /// cleanup: `SAVE`, one `POP` per local above the frame sentinel,
    /// `LOAD`.
    fn emit_do(&mut self, id: NodeId) -> Gen<()> {
        self.emit_expr(self.ast.children(id)[0])?;

        self.emit(opcodes::SAVE);
        self.shadow.pop();

        while matches!(self.shadow.last(), Some(StackEntry::Var(_))) {
            self.emit(opcodes::POP);
            self.shadow.pop();
        }
        debug_assert!(
            matches!(self.shadow.last(), Some(StackEntry::Frame)),
            "cleanup ran past the frame sentinel"
        );

        self.emit(opcodes::LOAD);
        let result = self.temp_name();
        self.shadow.push(StackEntry::Var(result));
        Ok(())
    }

    /// Emit code leaving exactly one new value on the VM stack and
    /// one new entry on the shadow stack.
    fn emit_expr(&mut self, id: NodeId) -> Gen<()> {
        let node = self.ast.node(id);
        match node.kind {
            AstKind::IntLiteral => {
                self.emit_i32(opcodes::PUSH, node.int().unwrap_or_default());
                let temp = self.temp_name();
                self.shadow.push(StackEntry::Var(temp));
                Ok(())
            }
            AstKind::VarRef => self.emit_var_ref(id),
            kind if kind.is_binary() => self.emit_binary(id),
            AstKind::Let => self.emit_let(id),
            kind => {
                self.diagnostics.push(
                    node.start,
                    node.end,
                    format!("Cannot generate code for {:?}", kind),
                );
                Err(GenFail)
            }
        }
    }

    /// Copy a variable's slot to the top of the stack.
    fn emit_var_ref(&mut self, id: NodeId) -> Gen<()> {
        let node = self.ast.node(id);
        let name = node.name().cloned().unwrap_or_default();

        let offset = match self.locate(&name) {
            Some(offset) => offset,
            None => {
                // Symbol resolution catches this first; surfaced
                // again defensively.
                self.diagnostics.push(
                    node.start,
                    node.end,
                    format!("Use of undeclared symbol: {}", name),
                );
                return Err(GenFail);
            }
        };

        self.emit_i32(opcodes::READ, offset);
        self.shadow.push(StackEntry::Var(name));
        Ok(())
    }

    /// Emit right operand, then left, so the left operand sits on
    /// top at run time, then the operator byte.
    fn emit_binary(&mut self, id: NodeId) -> Gen<()> {
        let node = self.ast.node(id);
        let opcode = match node.kind {
            AstKind::BinaryPlus => opcodes::ADD,
            AstKind::BinaryMinus => opcodes::SUB,
            AstKind::BinaryMul => opcodes::MUL,
            AstKind::BinaryDiv => opcodes::DIV,
            kind => unreachable!("not a binary node: {:?}", kind),
        };

        self.emit_expr(node.children[1])?;
        self.emit_expr(node.children[0])?;

        self.emit(opcode);
        self.shadow.pop();
        self.shadow.pop();
        let temp = self.temp_name();
        self.shadow.push(StackEntry::Var(temp));
        Ok(())
    }
}
