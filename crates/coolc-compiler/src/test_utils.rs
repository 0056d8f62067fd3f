//! AST construction helpers shared by the phase tests.
//!
//! The parser is an external collaborator, so tests build trees directly;
//! these helpers keep them readable. Every node gets line 1, which is also
//! what the diagnostics assertions expect.

use coolc_core::{Interner, Names, Symbol};

use crate::ast::{
    Attr, CaseBranch, Class, Expr, ExprKind, Feature, Formal, Method, Program,
};
use crate::cgen::EmitOptions;
use crate::diagnostics::Diagnostics;
use crate::semant::{self, ClassTable};
use crate::{Error, cgen};

/// Interner plus the well-known names, the ambient state every test needs.
pub struct Ctx {
    pub interner: Interner,
    pub names: Names,
}

impl Ctx {
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let names = Names::intern_in(&mut interner);
        Self { interner, names }
    }

    pub fn sym(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }
}

pub fn class(name: Symbol, parent: Symbol, features: Vec<Feature>, filename: Symbol) -> Class {
    Class {
        name,
        parent,
        features,
        filename,
        line: 1,
    }
}

pub fn attr(name: Symbol, declared_ty: Symbol, init: Expr) -> Feature {
    Feature::Attr(Attr {
        name,
        declared_ty,
        init,
        line: 1,
    })
}

pub fn method(
    name: Symbol,
    formals: Vec<(Symbol, Symbol)>,
    return_ty: Symbol,
    body: Expr,
) -> Feature {
    Feature::Method(Method {
        name,
        formals: formals
            .into_iter()
            .map(|(name, declared_ty)| Formal {
                name,
                declared_ty,
                line: 1,
            })
            .collect(),
        return_ty,
        body,
        line: 1,
    })
}

fn e(kind: ExprKind) -> Expr {
    Expr::new(kind, 1)
}

pub fn no_expr() -> Expr {
    Expr::no_expr(1)
}

pub fn int_lit(token: Symbol) -> Expr {
    e(ExprKind::IntConst { token })
}

pub fn str_lit(token: Symbol) -> Expr {
    e(ExprKind::StrConst { token })
}

pub fn bool_lit(value: bool) -> Expr {
    e(ExprKind::BoolConst { value })
}

pub fn id(name: Symbol) -> Expr {
    e(ExprKind::Id { name })
}

pub fn new_(class: Symbol) -> Expr {
    e(ExprKind::New { class })
}

pub fn assign(name: Symbol, value: Expr) -> Expr {
    e(ExprKind::Assign {
        name,
        value: Box::new(value),
    })
}

pub fn dispatch(recv: Expr, method: Symbol, args: Vec<Expr>) -> Expr {
    e(ExprKind::Dispatch {
        recv: Box::new(recv),
        method,
        args,
    })
}

pub fn static_dispatch(recv: Expr, static_ty: Symbol, method: Symbol, args: Vec<Expr>) -> Expr {
    e(ExprKind::StaticDispatch {
        recv: Box::new(recv),
        static_ty,
        method,
        args,
    })
}

pub fn arith(op: crate::ast::ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    e(ExprKind::Arith {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn plus(lhs: Expr, rhs: Expr) -> Expr {
    arith(crate::ast::ArithOp::Add, lhs, rhs)
}

pub fn cmp(op: crate::ast::CmpOp, lhs: Expr, rhs: Expr) -> Expr {
    e(ExprKind::Cmp {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    e(ExprKind::Eq {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn not_(operand: Expr) -> Expr {
    e(ExprKind::Not {
        operand: Box::new(operand),
    })
}

pub fn neg(operand: Expr) -> Expr {
    e(ExprKind::Neg {
        operand: Box::new(operand),
    })
}

pub fn isvoid(operand: Expr) -> Expr {
    e(ExprKind::IsVoid {
        operand: Box::new(operand),
    })
}

pub fn if_(pred: Expr, then_exp: Expr, else_exp: Expr) -> Expr {
    e(ExprKind::If {
        pred: Box::new(pred),
        then_exp: Box::new(then_exp),
        else_exp: Box::new(else_exp),
    })
}

pub fn while_(pred: Expr, body: Expr) -> Expr {
    e(ExprKind::While {
        pred: Box::new(pred),
        body: Box::new(body),
    })
}

pub fn block(body: Vec<Expr>) -> Expr {
    e(ExprKind::Block { body })
}

pub fn let_(name: Symbol, declared_ty: Symbol, init: Expr, body: Expr) -> Expr {
    e(ExprKind::Let {
        name,
        declared_ty,
        init: Box::new(init),
        body: Box::new(body),
    })
}

pub fn case(scrutinee: Expr, branches: Vec<(Symbol, Symbol, Expr)>) -> Expr {
    e(ExprKind::Case {
        scrutinee: Box::new(scrutinee),
        branches: branches
            .into_iter()
            .map(|(name, declared_ty, body)| CaseBranch {
                name,
                declared_ty,
                body,
                line: 1,
            })
            .collect(),
    })
}

/// `class Main { main(): Int { 0 } }` with filename `test.cl`.
pub fn main_class(ctx: &mut Ctx) -> Class {
    let zero = ctx.sym("0");
    let filename = ctx.sym("test.cl");
    class(
        ctx.names.main_class,
        ctx.names.object,
        vec![method(
            ctx.names.main_method,
            vec![],
            ctx.names.int,
            int_lit(zero),
        )],
        filename,
    )
}

pub fn analyze_ok<'a>(program: &'a Program, basics: &'a [Class], ctx: &Ctx) -> ClassTable<'a> {
    match semant::analyze(program, basics, &ctx.interner, &ctx.names) {
        Ok(table) => table,
        Err(Error::Semant(diag)) => panic!(
            "unexpected semantic errors:\n{}",
            diag.printer(&ctx.interner)
        ),
        Err(err) => panic!("unexpected error: {err}"),
    }
}

pub fn analyze_err(program: &Program, basics: &[Class], ctx: &Ctx) -> Diagnostics {
    match semant::analyze(program, basics, &ctx.interner, &ctx.names) {
        Ok(_) => panic!("expected semantic errors"),
        Err(Error::Semant(diag)) => diag,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

pub fn messages(diag: &Diagnostics) -> Vec<&str> {
    diag.iter().map(|d| d.message.as_str()).collect()
}

/// Body expression of the `feature_index`-th feature of a class, which
/// must be a method.
pub fn method_body(program: &Program, class_index: usize, feature_index: usize) -> &Expr {
    match &program.classes[class_index].features[feature_index] {
        Feature::Method(method) => &method.body,
        Feature::Attr(_) => panic!("feature is an attribute, not a method"),
    }
}

/// Analyze and emit the whole program, returning the assembly text.
pub fn emit_program(program: &Program, ctx: &Ctx) -> String {
    emit_program_with(program, ctx, &EmitOptions::default())
}

pub fn emit_program_with(program: &Program, ctx: &Ctx, options: &EmitOptions) -> String {
    let basics = semant::basic_classes(&ctx.names);
    let table = analyze_ok(program, &basics, ctx);
    let mut out = Vec::new();
    cgen::emit(&table, &ctx.interner, options, &mut out).expect("emission failed");
    String::from_utf8(out).expect("emitted assembly is not UTF-8")
}
