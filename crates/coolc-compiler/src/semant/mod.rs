//! Semantic analysis.
//!
//! Two stages over the parsed program:
//! 1. `ClassTable` - build the inheritance graph, check its
//!    well-formedness, and flatten per-class feature maps with the
//!    override-compatibility rules.
//! 2. `TypeChecker` - assign a static type to every expression.
//!
//! Structural errors (bad hierarchy, bad overrides, `self` misuse in
//! bindings) are fatal and stop the phase; type errors are counted and
//! checking continues. Either way a nonzero error count fails the phase.

mod class_table;
mod typecheck;

#[cfg(test)]
mod typecheck_tests;

pub use class_table::ClassTable;

use coolc_core::{Interner, Names};

use crate::ast::{Attr, Class, Expr, Feature, Formal, Method, Program};
use crate::diagnostics::Diagnostics;
use crate::{Error, Result};

/// Marker for errors that abort analysis immediately. The diagnostic has
/// already been recorded when this is returned.
pub(crate) struct Fatal;

/// Synthesize the five built-in classes.
///
/// Their method bodies are `NoExpr`; the implementations live in the
/// runtime and are never emitted. The caller owns the returned classes for
/// as long as the `ClassTable` borrows them.
pub fn basic_classes(names: &Names) -> Vec<Class> {
    let filename = names.basic_filename;
    let method = |name, formals: Vec<Formal>, return_ty| {
        Feature::Method(Method {
            name,
            formals,
            return_ty,
            body: Expr::no_expr(0),
            line: 0,
        })
    };
    let attr = |name, declared_ty| {
        Feature::Attr(Attr {
            name,
            declared_ty,
            init: Expr::no_expr(0),
            line: 0,
        })
    };
    let formal = |name, declared_ty| Formal {
        name,
        declared_ty,
        line: 0,
    };

    vec![
        Class {
            name: names.object,
            parent: names.no_class,
            features: vec![
                method(names.abort, vec![], names.object),
                method(names.type_name, vec![], names.string),
                method(names.copy, vec![], names.self_type),
            ],
            filename,
            line: 0,
        },
        Class {
            name: names.io,
            parent: names.object,
            features: vec![
                method(
                    names.out_string,
                    vec![formal(names.arg, names.string)],
                    names.self_type,
                ),
                method(
                    names.out_int,
                    vec![formal(names.arg, names.int)],
                    names.self_type,
                ),
                method(names.in_string, vec![], names.string),
                method(names.in_int, vec![], names.int),
            ],
            filename,
            line: 0,
        },
        Class {
            name: names.int,
            parent: names.object,
            features: vec![attr(names.val, names.prim_slot)],
            filename,
            line: 0,
        },
        Class {
            name: names.bool_,
            parent: names.object,
            features: vec![attr(names.val, names.prim_slot)],
            filename,
            line: 0,
        },
        Class {
            name: names.string,
            parent: names.object,
            features: vec![
                attr(names.val, names.int),
                attr(names.str_field, names.prim_slot),
                method(names.length, vec![], names.int),
                method(
                    names.concat,
                    vec![formal(names.arg, names.string)],
                    names.string,
                ),
                method(
                    names.substr,
                    vec![formal(names.arg, names.int), formal(names.arg2, names.int)],
                    names.string,
                ),
            ],
            filename,
            line: 0,
        },
    ]
}

/// Analyze `program`: validate the class hierarchy, then type every
/// expression. On success the returned table carries the flattened feature
/// maps the code generator consumes; on failure the collected diagnostics
/// are returned inside [`Error::Semant`].
pub fn analyze<'a>(
    program: &'a Program,
    basics: &'a [Class],
    interner: &Interner,
    names: &Names,
) -> Result<ClassTable<'a>> {
    let mut diag = Diagnostics::new();
    let mut table = ClassTable::build(basics, &program.classes, *names, interner, &mut diag);

    let graph_ok = !diag.has_errors()
        && table.check_main_defined(&mut diag)
        && table.check_parents_defined(interner, &mut diag)
        && table.check_acyclic(interner, &mut diag);
    if !graph_ok {
        return Err(Error::Semant(diag));
    }

    if table.build_feature_maps(interner, &mut diag).is_err() {
        return Err(Error::Semant(diag));
    }

    if typecheck::check_program(program, &table, interner, &mut diag).is_err()
        || diag.has_errors()
    {
        return Err(Error::Semant(diag));
    }

    Ok(table)
}
