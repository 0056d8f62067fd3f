//! Constant pools for string and integer objects.
//!
//! Collects every constant the program needs before emission starts, in a
//! deterministic order: class names and filenames (BFS order), literals
//! from user-class bodies (declaration order), then the `""` and `0`
//! defaults used by prototype objects and uninitialized `let` bindings.
//! Every string also pools its length as an integer constant, referenced
//! from the string object's header.

use coolc_core::{Interner, Symbol};
use indexmap::IndexSet;

use crate::ast::{Expr, ExprKind, Feature};
use crate::semant::ClassTable;

use super::Layouts;

/// Deduplicated, insertion-ordered string and integer constants.
/// Integers are kept as their token text (`"42"`), exactly as emitted.
#[derive(Debug, Default)]
pub struct ConstantPool {
    strings: IndexSet<String>,
    ints: IndexSet<String>,
}

impl ConstantPool {
    pub fn collect(table: &ClassTable<'_>, layouts: &Layouts, interner: &Interner) -> Self {
        let mut pool = Self::default();

        for &class in layouts.emit_order() {
            pool.add_string(interner.resolve(class));
            pool.add_string(interner.resolve(table.class(class).filename));
        }

        for (_, class) in table.classes() {
            for feature in &class.features {
                match feature {
                    Feature::Attr(attr) => pool.collect_expr(&attr.init, interner),
                    Feature::Method(method) => pool.collect_expr(&method.body, interner),
                }
            }
        }

        pool.add_string("");
        pool.add_int("0");
        pool
    }

    fn collect_expr(&mut self, expr: &Expr, interner: &Interner) {
        match &expr.kind {
            ExprKind::IntConst { token } => {
                self.add_int(interner.resolve(*token));
            }
            ExprKind::StrConst { token } => {
                self.add_string(interner.resolve(*token));
            }
            ExprKind::Assign { value, .. } => self.collect_expr(value, interner),
            ExprKind::StaticDispatch { recv, args, .. }
            | ExprKind::Dispatch { recv, args, .. } => {
                self.collect_expr(recv, interner);
                for arg in args {
                    self.collect_expr(arg, interner);
                }
            }
            ExprKind::If {
                pred,
                then_exp,
                else_exp,
            } => {
                self.collect_expr(pred, interner);
                self.collect_expr(then_exp, interner);
                self.collect_expr(else_exp, interner);
            }
            ExprKind::While { pred, body } => {
                self.collect_expr(pred, interner);
                self.collect_expr(body, interner);
            }
            ExprKind::Block { body } => {
                for sub in body {
                    self.collect_expr(sub, interner);
                }
            }
            ExprKind::Let { init, body, .. } => {
                self.collect_expr(init, interner);
                self.collect_expr(body, interner);
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                self.collect_expr(scrutinee, interner);
                for branch in branches {
                    self.collect_expr(&branch.body, interner);
                }
            }
            ExprKind::Arith { lhs, rhs, .. }
            | ExprKind::Cmp { lhs, rhs, .. }
            | ExprKind::Eq { lhs, rhs } => {
                self.collect_expr(lhs, interner);
                self.collect_expr(rhs, interner);
            }
            ExprKind::Neg { operand }
            | ExprKind::Not { operand }
            | ExprKind::IsVoid { operand } => self.collect_expr(operand, interner),
            ExprKind::BoolConst { .. }
            | ExprKind::New { .. }
            | ExprKind::NoExpr
            | ExprKind::Id { .. } => {}
        }
    }

    fn add_string(&mut self, s: &str) {
        if self.strings.insert(s.to_owned()) {
            self.add_int(&s.len().to_string());
        }
    }

    fn add_int(&mut self, token: &str) {
        self.ints.insert(token.to_owned());
    }

    /// Index of a pooled string, as referenced by `str_const<i>` labels.
    pub fn string_index(&self, s: &str) -> Option<usize> {
        self.strings.get_index_of(s)
    }

    /// Index of a pooled integer token, as referenced by `int_const<i>`.
    pub fn int_index(&self, token: &str) -> Option<usize> {
        self.ints.get_index_of(token)
    }

    pub fn string_by_symbol(&self, sym: Symbol, interner: &Interner) -> Option<usize> {
        self.string_index(interner.resolve(sym))
    }

    /// `(index, text)` for every pooled string, in pool order.
    pub fn strings(&self) -> impl Iterator<Item = (usize, &str)> {
        self.strings.iter().enumerate().map(|(i, s)| (i, s.as_str()))
    }

    /// `(index, token)` for every pooled integer, in pool order.
    pub fn ints(&self) -> impl Iterator<Item = (usize, &str)> {
        self.ints.iter().enumerate().map(|(i, s)| (i, s.as_str()))
    }
}
