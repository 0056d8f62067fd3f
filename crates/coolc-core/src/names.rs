//! Pre-interned well-known symbols.
//!
//! The analyzer and the code generator both test against a fixed set of
//! names: the five basic classes, the pseudo-classes used as sentinels
//! (`_no_class`, `_no_type`, `_prim_slot`), `SELF_TYPE`, `self`, `Main`,
//! and the features of the basic classes. Interning them once up front
//! turns every such test into an integer comparison.

use crate::interner::{Interner, Symbol};

/// Table of well-known symbols. Cheap to copy; every phase carries one.
#[derive(Debug, Clone, Copy)]
pub struct Names {
    // Class names.
    pub object: Symbol,
    pub io: Symbol,
    pub int: Symbol,
    pub bool_: Symbol,
    pub string: Symbol,
    pub main_class: Symbol,
    /// The static type of `self`; never a key in the inheritance graph.
    pub self_type: Symbol,
    /// Sentinel parent of `Object`; cannot be the name of a user class.
    pub no_class: Symbol,
    /// Type given to absent expressions (`NoExpr`).
    pub no_type: Symbol,
    /// Type of the raw value slots inside `Int`, `Bool`, and `String`.
    pub prim_slot: Symbol,

    // Identifiers.
    pub self_: Symbol,
    pub main_method: Symbol,

    // Basic-class features.
    pub val: Symbol,
    pub str_field: Symbol,
    pub abort: Symbol,
    pub type_name: Symbol,
    pub copy: Symbol,
    pub out_string: Symbol,
    pub out_int: Symbol,
    pub in_string: Symbol,
    pub in_int: Symbol,
    pub length: Symbol,
    pub concat: Symbol,
    pub substr: Symbol,
    pub arg: Symbol,
    pub arg2: Symbol,

    /// Filename attached to the synthesized basic classes.
    pub basic_filename: Symbol,
}

impl Names {
    /// Intern every well-known name into `interner`.
    pub fn intern_in(interner: &mut Interner) -> Self {
        Self {
            object: interner.intern("Object"),
            io: interner.intern("IO"),
            int: interner.intern("Int"),
            bool_: interner.intern("Bool"),
            string: interner.intern("String"),
            main_class: interner.intern("Main"),
            self_type: interner.intern("SELF_TYPE"),
            no_class: interner.intern("_no_class"),
            no_type: interner.intern("_no_type"),
            prim_slot: interner.intern("_prim_slot"),
            self_: interner.intern("self"),
            main_method: interner.intern("main"),
            val: interner.intern("_val"),
            str_field: interner.intern("_str_field"),
            abort: interner.intern("abort"),
            type_name: interner.intern("type_name"),
            copy: interner.intern("copy"),
            out_string: interner.intern("out_string"),
            out_int: interner.intern("out_int"),
            in_string: interner.intern("in_string"),
            in_int: interner.intern("in_int"),
            length: interner.intern("length"),
            concat: interner.intern("concat"),
            substr: interner.intern("substr"),
            arg: interner.intern("arg"),
            arg2: interner.intern("arg2"),
            basic_filename: interner.intern("<basic class>"),
        }
    }

    /// Whether `class` is one of the five built-in classes, whose methods
    /// live in the runtime and are never emitted.
    pub fn is_basic_class(&self, class: Symbol) -> bool {
        class == self.object
            || class == self.io
            || class == self.int
            || class == self.bool_
            || class == self.string
    }
}
