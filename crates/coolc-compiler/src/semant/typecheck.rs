//! Type checking: assigns a static type to every expression.
//!
//! The checker walks each user class with an object environment `O` (a
//! scope stack), the enclosing class `C`, and the completed class table
//! `M`. Each rule writes the computed type into the expression's
//! annotated-type slot and returns it. Type errors annotate the offending
//! expression with `Object` and checking continues; `self` misuse in an
//! assignment is fatal.

use coolc_core::{Interner, Names, Symbol};

use crate::ast::{Attr, CaseBranch, Class, Expr, ExprKind, Feature, Formal, Method, Program};
use crate::diagnostics::Diagnostics;
use crate::scope::Scopes;

use super::{ClassTable, Fatal};

/// Type-check every user class in `program`, annotating the tree in place.
pub(crate) fn check_program(
    program: &Program,
    table: &ClassTable<'_>,
    interner: &Interner,
    diag: &mut Diagnostics,
) -> Result<(), Fatal> {
    for class in &program.classes {
        let mut checker = TypeChecker {
            table,
            interner,
            names: table.names(),
            class,
            env: Scopes::new(),
            diag: &mut *diag,
        };
        checker.check_class()?;
    }
    Ok(())
}

struct TypeChecker<'a, 'd> {
    table: &'a ClassTable<'a>,
    interner: &'a Interner,
    names: Names,
    class: &'a Class,
    env: Scopes<Symbol>,
    diag: &'d mut Diagnostics,
}

impl TypeChecker<'_, '_> {
    fn check_class(&mut self) -> Result<(), Fatal> {
        // The class scope holds every attribute, inherited ones included.
        // `self` is not installed; the Id rule handles it.
        self.env.enter();
        let attrs: Vec<(Symbol, Symbol)> = self
            .table
            .attrs_of(self.class.name)
            .iter()
            .map(|(&name, attr)| (name, attr.declared_ty))
            .collect();
        for (name, declared_ty) in attrs {
            self.env.add(name, declared_ty);
        }
        for feature in &self.class.features {
            match feature {
                Feature::Attr(attr) => self.check_attr(attr)?,
                Feature::Method(method) => self.check_method(method)?,
            }
        }
        self.env.exit();
        Ok(())
    }

    fn check_attr(&mut self, attr: &Attr) -> Result<(), Fatal> {
        let inferred = self.check_expr(&attr.init)?;
        let inferred = self.resolve_self_type(inferred);
        if inferred != self.names.no_type && !self.table.is_subtype_of(inferred, attr.declared_ty)
        {
            self.error(format!(
                "Inferred type {} of initialization of attribute {} does not conform \
                 to declared type {}.",
                self.text(inferred),
                self.text(attr.name),
                self.text(attr.declared_ty)
            ));
        }
        if attr.name == self.names.self_ {
            self.error("'self' cannot be the name of an attribute.");
        }
        Ok(())
    }

    fn check_method(&mut self, method: &Method) -> Result<(), Fatal> {
        self.env.enter();
        for formal in &method.formals {
            self.check_formal(formal);
        }
        let inferred = self.check_expr(&method.body)?;
        let declared = method.return_ty;
        if !(declared == self.names.self_type && inferred == self.names.self_type) {
            let inferred = self.resolve_self_type(inferred);
            if !self.table.is_subtype_of(inferred, declared) {
                self.error(format!(
                    "Inferred return type {} of method {} does not conform to declared \
                     return type {}.",
                    self.text(inferred),
                    self.text(method.name),
                    self.text(declared)
                ));
            }
        }
        self.env.exit();
        Ok(())
    }

    fn check_formal(&mut self, formal: &Formal) {
        if formal.declared_ty == self.names.self_type {
            self.error(format!(
                "Formal parameter {} cannot have type SELF_TYPE.",
                self.text(formal.name)
            ));
        }
        if !self.table.has_class(formal.declared_ty) {
            self.error(format!(
                "Class {} of formal parameter {} is undefined.",
                self.text(formal.declared_ty),
                self.text(formal.name)
            ));
        }
        if self.env.probe(formal.name).is_some() {
            self.error(format!(
                "Formal parameter {} is multiply defined.",
                self.text(formal.name)
            ));
        } else {
            self.env.add(formal.name, formal.declared_ty);
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Symbol, Fatal> {
        let names = self.names;
        let ty = match &expr.kind {
            ExprKind::IntConst { .. } => names.int,
            ExprKind::StrConst { .. } => names.string,
            ExprKind::BoolConst { .. } => names.bool_,
            ExprKind::NoExpr => names.no_type,

            ExprKind::Id { name } => {
                if *name == names.self_ {
                    names.self_type
                } else if let Some(declared) = self.env.lookup(*name) {
                    declared
                } else {
                    self.error(format!("Undeclared identifier {}.", self.text(*name)));
                    names.object
                }
            }

            ExprKind::Assign { name, value } => {
                if *name == names.self_ {
                    self.error("Cannot assign to 'self'.");
                    return Err(Fatal);
                }
                let declared = self.env.lookup(*name);
                if declared.is_none() {
                    self.error(format!("Undeclared identifier {}.", self.text(*name)));
                }
                let value_ty = self.check_expr(value)?;
                let value_ty = self.resolve_self_type(value_ty);
                match declared {
                    Some(declared) if self.table.is_subtype_of(value_ty, declared) => value_ty,
                    Some(declared) => {
                        self.error(format!(
                            "Inferred type {} of initialization of attribute {} does not \
                             conform to declared type {}.",
                            self.text(value_ty),
                            self.text(*name),
                            self.text(declared)
                        ));
                        names.object
                    }
                    None => names.object,
                }
            }

            ExprKind::Dispatch { recv, method, args } => {
                let recv_ty = self.check_expr(recv)?;
                let lookup_ty = self.resolve_self_type(recv_ty);
                let Some(definition) = self.table.method(lookup_ty, *method) else {
                    self.error(format!(
                        "Dispatch to undefined method {}.",
                        self.text(*method)
                    ));
                    return Ok(expr.set_ty(names.object));
                };
                self.check_args(*method, definition, args)?;
                if definition.return_ty == names.self_type {
                    recv_ty
                } else {
                    definition.return_ty
                }
            }

            ExprKind::StaticDispatch {
                recv,
                static_ty,
                method,
                args,
            } => {
                let recv_ty = self.check_expr(recv)?;
                let recv_ty = self.resolve_self_type(recv_ty);
                if !self.table.is_subtype_of(recv_ty, *static_ty) {
                    self.error(format!(
                        "Expression type {} does not conform to declared static dispatch \
                         type {}.",
                        self.text(recv_ty),
                        self.text(*static_ty)
                    ));
                    return Ok(expr.set_ty(names.object));
                }
                let Some(definition) = self.table.method(*static_ty, *method) else {
                    self.error(format!(
                        "Static dispatch to undefined method {}.",
                        self.text(*method)
                    ));
                    return Ok(expr.set_ty(names.object));
                };
                self.check_args(*method, definition, args)?;
                if definition.return_ty == names.self_type {
                    recv_ty
                } else {
                    definition.return_ty
                }
            }

            ExprKind::If {
                pred,
                then_exp,
                else_exp,
            } => {
                let pred_ty = self.check_expr(pred)?;
                let then_ty = self.check_expr(then_exp)?;
                let else_ty = self.check_expr(else_exp)?;
                let then_ty = self.resolve_self_type(then_ty);
                let else_ty = self.resolve_self_type(else_ty);
                if pred_ty != names.bool_ {
                    self.error("Predicate of 'if' does not have type Bool.");
                    names.object
                } else {
                    self.table.lub(then_ty, else_ty)
                }
            }

            ExprKind::While { pred, body } => {
                let pred_ty = self.check_expr(pred)?;
                self.check_expr(body)?;
                if pred_ty != names.bool_ {
                    self.error("Loop condition does not have type Bool.");
                }
                names.object
            }

            ExprKind::Block { body } => {
                let mut last = names.object;
                for sub in body {
                    last = self.check_expr(sub)?;
                }
                last
            }

            ExprKind::Let {
                name,
                declared_ty,
                init,
                body,
            } => {
                if *name == names.self_ {
                    self.error("'self' cannot be bound in a 'let' expression.");
                    return Ok(expr.set_ty(names.object));
                }
                let init_ty = self.check_expr(init)?;
                if init_ty != names.no_type && !self.table.is_subtype_of(init_ty, *declared_ty) {
                    self.error(format!(
                        "Inferred type {} of initialization of {} does not conform to \
                         identifier's declared type {}.",
                        self.text(init_ty),
                        self.text(*name),
                        self.text(*declared_ty)
                    ));
                    return Ok(expr.set_ty(names.object));
                }
                self.env.enter();
                self.env.add(*name, *declared_ty);
                let body_ty = self.check_expr(body)?;
                self.env.exit();
                body_ty
            }

            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                self.check_expr(scrutinee)?;
                let mut seen = std::collections::HashSet::new();
                let mut joined: Option<Symbol> = None;
                for branch in branches {
                    if !seen.insert(branch.declared_ty) {
                        self.error(format!(
                            "Duplicate branch {} in case statement.",
                            self.text(branch.declared_ty)
                        ));
                        return Ok(expr.set_ty(names.object));
                    }
                    let branch_ty = self.check_branch(branch)?;
                    let branch_ty = self.resolve_self_type(branch_ty);
                    joined = Some(match joined {
                        None => branch_ty,
                        Some(acc) => self.table.lub(acc, branch_ty),
                    });
                }
                joined.unwrap_or(names.object)
            }

            ExprKind::Arith { op, lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty == names.int && rhs_ty == names.int {
                    names.int
                } else {
                    self.error(format!(
                        "non-Int arguments: {} {} {}.",
                        self.text(lhs_ty),
                        op.symbol(),
                        self.text(rhs_ty)
                    ));
                    names.object
                }
            }

            ExprKind::Neg { operand } => {
                let operand_ty = self.check_expr(operand)?;
                if operand_ty == names.int {
                    names.int
                } else {
                    self.error(format!(
                        "Argument of '~' has type {} instead of Int.",
                        self.text(operand_ty)
                    ));
                    names.object
                }
            }

            ExprKind::Cmp { op, lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty == names.int && rhs_ty == names.int {
                    names.bool_
                } else {
                    self.error(format!(
                        "non-Int arguments: {} {} {}.",
                        self.text(lhs_ty),
                        op.symbol(),
                        self.text(rhs_ty)
                    ));
                    names.object
                }
            }

            ExprKind::Eq { lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                let basic = [names.int, names.string, names.bool_];
                let mixed = basic
                    .iter()
                    .any(|&b| (lhs_ty == b) != (rhs_ty == b));
                if mixed {
                    self.error("Illegal comparison with a basic type.");
                    names.object
                } else {
                    names.bool_
                }
            }

            ExprKind::Not { operand } => {
                let operand_ty = self.check_expr(operand)?;
                if operand_ty == names.bool_ {
                    names.bool_
                } else {
                    self.error(format!(
                        "Argument of 'not' has type {} instead of Bool.",
                        self.text(operand_ty)
                    ));
                    names.object
                }
            }

            ExprKind::New { class } => {
                if *class == names.self_type || self.table.has_class(*class) {
                    *class
                } else {
                    self.error(format!(
                        "'new' used with undefined class {}.",
                        self.text(*class)
                    ));
                    names.object
                }
            }

            ExprKind::IsVoid { operand } => {
                self.check_expr(operand)?;
                names.bool_
            }
        };
        Ok(expr.set_ty(ty))
    }

    /// Arity check, then pairwise conformance of each argument against its
    /// formal. Shared by both dispatch forms.
    fn check_args(
        &mut self,
        method: Symbol,
        definition: &Method,
        args: &[Expr],
    ) -> Result<(), Fatal> {
        if definition.formals.len() != args.len() {
            self.error(format!(
                "Method {} invoked with wrong number of arguments.",
                self.text(method)
            ));
        }
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            let arg_ty = self.check_expr(arg)?;
            arg_tys.push(self.resolve_self_type(arg_ty));
        }
        for (formal, &arg_ty) in definition.formals.iter().zip(&arg_tys) {
            if !self.table.is_subtype_of(arg_ty, formal.declared_ty) {
                self.error(format!(
                    "In call of method {}, type {} of parameter {} does not conform to \
                     declared type {}.",
                    self.text(method),
                    self.text(arg_ty),
                    self.text(formal.name),
                    self.text(formal.declared_ty)
                ));
            }
        }
        Ok(())
    }

    /// The branch identifier hides any binding of the same name in the
    /// containing scope.
    fn check_branch(&mut self, branch: &CaseBranch) -> Result<Symbol, Fatal> {
        self.env.enter();
        self.env.add(branch.name, branch.declared_ty);
        let body_ty = self.check_expr(&branch.body)?;
        self.env.exit();
        Ok(body_ty)
    }

    fn resolve_self_type(&self, ty: Symbol) -> Symbol {
        if ty == self.names.self_type {
            self.class.name
        } else {
            ty
        }
    }

    fn text(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn error(&mut self, message: impl Into<String>) {
        self.diag
            .error_at(self.class.filename, self.class.line, message);
    }
}
