//! Cool compiler back-end: semantic analysis and MIPS code generation.
//!
//! This crate provides the two phases that follow parsing:
//! - `semant` - inheritance-graph validation and type checking; decorates
//!   every expression with its static type
//! - `cgen` - object layout planning and SPIM assembly emission
//!
//! Supporting modules:
//! - `ast` - the tree produced by the external parser
//! - `diagnostics` - error collection and the `file:line:` printer

pub mod ast;
pub mod cgen;
pub mod diagnostics;
pub mod semant;

mod scope;

#[cfg(test)]
pub mod test_utils;

use std::io;

pub use coolc_core::{Interner, Names, Symbol};
pub use diagnostics::{Diagnostics, DiagnosticsPrinter};

/// Errors that can abort compilation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The program failed semantic analysis; the diagnostics carry the
    /// individual errors.
    #[error("semantic analysis failed with {} errors", .0.error_count())]
    Semant(Diagnostics),

    #[error("failed to write assembly output")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Run the full back-end: analyze `program`, then emit SPIM assembly to
/// `out`. Nothing is written when analysis fails.
pub fn compile<W: io::Write>(
    program: &ast::Program,
    interner: &Interner,
    names: &Names,
    options: &cgen::EmitOptions,
    out: &mut W,
) -> Result<()> {
    let basics = semant::basic_classes(names);
    let table = semant::analyze(program, &basics, interner, names)?;
    cgen::emit(&table, interner, options, out)?;
    Ok(())
}
