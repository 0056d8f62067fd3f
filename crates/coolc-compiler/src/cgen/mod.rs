//! Code generation: MIPS/SPIM assembly from a type-checked program.
//!
//! Three stages behind one entry point:
//! - `layout` - class tags, prototype sizes, attribute offsets, dispatch
//!   indices, and the BFS emission order
//! - `constants` - the string/int constant pools
//! - `emitter` - section and per-expression emission, driven by the
//!   per-body `CgenContext`
//!
//! The emitter assumes a successfully analyzed program; it must not be
//! invoked when the analysis phase reported errors.

mod constants;
mod context;
mod emitter;
mod layout;


pub use constants::ConstantPool;
pub use context::{Base, CgenContext, MemAddr};
pub use layout::{ClassLayout, Layouts, OBJECT_HEADER_WORDS};

use std::io;

use coolc_core::Interner;

use crate::semant::ClassTable;

/// Garbage collector linked into the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcStrategy {
    #[default]
    NoGc,
    Generational,
    SnapshotCopying,
}

impl GcStrategy {
    fn init_routine(self) -> &'static str {
        match self {
            GcStrategy::NoGc => "_NoGC_Init",
            GcStrategy::Generational => "_GenGC_Init",
            GcStrategy::SnapshotCopying => "_ScnGC_Init",
        }
    }

    fn collect_routine(self) -> &'static str {
        match self {
            GcStrategy::NoGc => "_NoGC_Collect",
            GcStrategy::Generational => "_GenGC_Collect",
            GcStrategy::SnapshotCopying => "_ScnGC_Collect",
        }
    }
}

/// Emission configuration.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub gc: GcStrategy,
    /// Sets the `_MemMgr_TEST` word, putting the collector in test mode.
    pub gc_test: bool,
}

/// Emit the complete SPIM program for an analyzed class table.
pub fn emit<W: io::Write>(
    table: &ClassTable<'_>,
    interner: &Interner,
    options: &EmitOptions,
    out: &mut W,
) -> io::Result<()> {
    let layouts = Layouts::plan(table);
    let pool = ConstantPool::collect(table, &layouts, interner);
    emitter::Emitter::new(table, &layouts, &pool, interner, options, out).emit_program()
}
