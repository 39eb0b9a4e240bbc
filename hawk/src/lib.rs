pub mod bytecode;
pub mod compiler;
mod error;
mod vm;

pub use self::{
    compiler::compile,
    error::{Diagnostic, DiagnosticList, HawkError, HawkResult},
    vm::Vm,
};

/// Version of *this* implementation.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        compiler::compile,
        error::{DiagnosticList, HawkError, HawkResult},
        vm::Vm,
    };
}
