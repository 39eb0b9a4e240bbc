//! Bytecode opcodes and operand helpers.
//!
//! A packet is a raw byte stream: one byte per opcode, with `PUSH`
//! and `READ` followed by a signed 32-bit big-endian operand. There
//! is no header, version or trailer.
use log::trace;

#[rustfmt::skip]
pub mod opcodes {
    /// Push the following `i32` operand.
    pub const PUSH: u8 = 0;
    /// Discard the top of the stack.
    pub const POP: u8  = 1;
    /// Pop two, push their sum.
    pub const ADD: u8  = 2;
    /// Pop two, push `left - right`.
    pub const SUB: u8  = 3;
    /// Pop two, push their product.
    pub const MUL: u8  = 4;
    /// Pop two, push `left / right`.
    pub const DIV: u8  = 5;
    /// Copy the element `operand` slots below the top onto the top.
    pub const READ: u8 = 6;
    /// Pop the top into the save register.
    pub const SAVE: u8 = 7;
    /// Push the save register.
    pub const LOAD: u8 = 8;
}

/// Value pushed at block entry to mark the bottom of a block's
/// locals.
pub const FRAME_MARKER: i32 = 0xff;

/// Append an opcode byte.
#[inline]
pub fn encode_op(buf: &mut Vec<u8>, opcode: u8) {
    trace!("encode {}", op_name(opcode).unwrap_or("??"));
    buf.push(opcode);
}

/// Append an opcode byte with its `i32` operand in big-endian order.
#[inline]
pub fn encode_op_i32(buf: &mut Vec<u8>, opcode: u8, operand: i32) {
    trace!("encode {} {}", op_name(opcode).unwrap_or("??"), operand);
    buf.push(opcode);
    buf.extend_from_slice(&operand.to_be_bytes());
}

/// Extract a big-endian `i32` operand from the packet at the cursor.
///
/// Returns `None` when fewer than four bytes remain.
#[inline(always)]
pub fn read_i32(bytecode: &[u8], cursor: usize) -> Option<i32> {
    let bytes = bytecode.get(cursor..cursor + 4)?;
    Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Human-readable mnemonic for an opcode byte.
#[rustfmt::skip]
pub fn op_name(opcode: u8) -> Option<&'static str> {
    use opcodes as op;
    match opcode {
        op::PUSH => Some("PUSH"),
        op::POP  => Some("POP"),
        op::ADD  => Some("ADD"),
        op::SUB  => Some("SUB"),
        op::MUL  => Some("MUL"),
        op::DIV  => Some("DIV"),
        op::READ => Some("READ"),
        op::SAVE => Some("SAVE"),
        op::LOAD => Some("LOAD"),
        _        => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operand_round_trip() {
        let mut buf = Vec::new();
        encode_op_i32(&mut buf, opcodes::PUSH, -123456);

        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], opcodes::PUSH);
        assert_eq!(read_i32(&buf, 1), Some(-123456));
    }

    #[test]
    fn test_operand_is_big_endian() {
        let mut buf = Vec::new();
        encode_op_i32(&mut buf, opcodes::PUSH, 5);

        assert_eq!(&buf[1..], &[0x00, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn test_read_truncated_operand() {
        let buf = vec![opcodes::PUSH, 0x00, 0x00];

        assert_eq!(read_i32(&buf, 1), None);
    }
}
