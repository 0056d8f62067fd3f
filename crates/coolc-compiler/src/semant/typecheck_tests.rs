use coolc_core::Symbol;

use crate::ast::{Class, CmpOp, Expr, ExprKind, Program};
use crate::semant;
use crate::test_utils::{
    Ctx, analyze_err, analyze_ok, assign, attr, block, bool_lit, case, class, cmp, dispatch, eq,
    id, if_, int_lit, isvoid, let_, messages, method, method_body, neg, new_, no_expr, not_, plus,
    static_dispatch, str_lit, while_,
};

/// `class Main { main(): <ret> { <body> } }` plus `extra` classes.
/// `ctx` comes last so callers can read `ctx.names` in the other arguments.
fn program_with_main_body(ret: Symbol, body: Expr, extra: Vec<Class>, ctx: &mut Ctx) -> Program {
    let filename = ctx.sym("test.cl");
    let mut classes = vec![class(
        ctx.names.main_class,
        ctx.names.object,
        vec![method(ctx.names.main_method, vec![], ret, body)],
        filename,
    )];
    classes.extend(extra);
    Program { classes }
}

#[test]
fn constants_annotate_with_basic_types() {
    let mut ctx = Ctx::new();
    let (one, hello) = (ctx.sym("1"), ctx.sym("hello"));
    let body = block(vec![int_lit(one), str_lit(hello), bool_lit(true)]);
    let program = program_with_main_body(ctx.names.bool_, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);

    let ExprKind::Block { body } = &method_body(&program, 0, 0).kind else {
        panic!("expected a block");
    };
    assert_eq!(body[0].ty(), Some(ctx.names.int));
    assert_eq!(body[1].ty(), Some(ctx.names.string));
    assert_eq!(body[2].ty(), Some(ctx.names.bool_));
    // The block takes the type of its last expression.
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.bool_));
}

#[test]
fn arithmetic_requires_ints() {
    let mut ctx = Ctx::new();
    let (one, two) = (ctx.sym("1"), ctx.sym("2"));
    let body = plus(int_lit(one), int_lit(two));
    let program = program_with_main_body(ctx.names.int, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.int));

    let mut ctx = Ctx::new();
    let one = ctx.sym("1");
    let body = plus(int_lit(one), bool_lit(true));
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(messages(&diag), vec!["non-Int arguments: Int + Bool."]);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.object));
}

#[test]
fn comparison_and_logic_operators() {
    let mut ctx = Ctx::new();
    let (one, two) = (ctx.sym("1"), ctx.sym("2"));
    let body = block(vec![
        cmp(CmpOp::Lt, int_lit(one), int_lit(two)),
        not_(bool_lit(false)),
        neg(int_lit(one)),
        isvoid(new_(ctx.names.object)),
    ]);
    let program = program_with_main_body(ctx.names.bool_, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);

    let ExprKind::Block { body } = &method_body(&program, 0, 0).kind else {
        panic!("expected a block");
    };
    assert_eq!(body[0].ty(), Some(ctx.names.bool_));
    assert_eq!(body[1].ty(), Some(ctx.names.bool_));
    assert_eq!(body[2].ty(), Some(ctx.names.int));
    assert_eq!(body[3].ty(), Some(ctx.names.bool_));
}

#[test]
fn if_joins_branches_at_their_lub() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (p, a, b) = (ctx.sym("P"), ctx.sym("A"), ctx.sym("B"));
    let body = if_(bool_lit(true), new_(a), new_(b));
    let extra = vec![
        class(p, ctx.names.object, vec![], filename),
        class(a, p, vec![], filename),
        class(b, p, vec![], filename),
    ];
    let program = program_with_main_body(p, body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(p));
}

#[test]
fn self_type_is_preserved_through_dispatch() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, d, m) = (ctx.sym("A"), ctx.sym("Derived"), ctx.sym("m"));
    // class A { m(): SELF_TYPE { self } }; class Derived inherits A {}
    let extra = vec![
        class(
            a,
            ctx.names.object,
            vec![method(m, vec![], ctx.names.self_type, id(ctx.names.self_))],
            filename,
        ),
        class(d, a, vec![], filename),
    ];
    let body = dispatch(new_(d), m, vec![]);
    let program = program_with_main_body(d, body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    // (new Derived).m() is a Derived, not an A.
    assert_eq!(method_body(&program, 0, 0).ty(), Some(d));
}

#[test]
fn static_dispatch_checks_receiver_conformance() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, d, m) = (ctx.sym("A"), ctx.sym("Derived"), ctx.sym("m"));
    let extra = vec![
        class(
            a,
            ctx.names.object,
            vec![method(m, vec![], ctx.names.self_type, id(ctx.names.self_))],
            filename,
        ),
        class(d, a, vec![], filename),
    ];
    // new Derived @A.m() is fine and keeps the receiver's type.
    let body = static_dispatch(new_(d), a, m, vec![]);
    let program = program_with_main_body(d, body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(d));

    // new A @Derived.m() does not conform.
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, d, m) = (ctx.sym("A"), ctx.sym("Derived"), ctx.sym("m"));
    let extra = vec![
        class(
            a,
            ctx.names.object,
            vec![method(m, vec![], ctx.names.self_type, id(ctx.names.self_))],
            filename,
        ),
        class(d, a, vec![], filename),
    ];
    let body = static_dispatch(new_(a), d, m, vec![]);
    let program = program_with_main_body(ctx.names.object, body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["Expression type A does not conform to declared static dispatch type Derived."]
    );
}

#[test]
fn dispatch_argument_diagnostics_name_the_argument_type() {
    let mut ctx = Ctx::new();
    let one = ctx.sym("1");
    // (new IO).out_string(1)
    let body = dispatch(new_(ctx.names.io), ctx.names.out_string, vec![int_lit(one)]);
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec![
            "In call of method out_string, type Int of parameter arg does not conform to \
             declared type String."
        ]
    );
}

#[test]
fn dispatch_arity_and_unknown_method() {
    let mut ctx = Ctx::new();
    let body = dispatch(new_(ctx.names.io), ctx.names.out_string, vec![]);
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["Method out_string invoked with wrong number of arguments."]
    );

    let mut ctx = Ctx::new();
    let missing = ctx.sym("frobnicate");
    let body = dispatch(new_(ctx.names.io), missing, vec![]);
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["Dispatch to undefined method frobnicate."]
    );
}

#[test]
fn undeclared_identifier_defaults_to_object() {
    let mut ctx = Ctx::new();
    let x = ctx.sym("x");
    let body = id(x);
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(messages(&diag), vec!["Undeclared identifier x."]);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.object));
}

#[test]
fn assign_checks_conformance_against_declared_type() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, b, x, m) = (ctx.sym("A"), ctx.sym("B"), ctx.sym("x"), ctx.sym("m"));
    // class A { x: A; m(): B { x <- new B } }; class B inherits A {}
    let extra = vec![
        class(
            a,
            ctx.names.object,
            vec![
                attr(x, a, no_expr()),
                method(m, vec![], b, assign(x, new_(b))),
            ],
            filename,
        ),
        class(b, a, vec![], filename),
    ];
    let zero_body = int_lit(ctx.sym("0"));
    let program = program_with_main_body(ctx.names.int, zero_body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 1, 1).ty(), Some(b));

    // The other direction fails.
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, b, x, m) = (ctx.sym("A"), ctx.sym("B"), ctx.sym("x"), ctx.sym("m"));
    let extra = vec![
        class(
            a,
            ctx.names.object,
            vec![
                attr(x, b, no_expr()),
                method(m, vec![], ctx.names.object, assign(x, new_(a))),
            ],
            filename,
        ),
        class(b, a, vec![], filename),
    ];
    let zero_body = int_lit(ctx.sym("0"));
    let program = program_with_main_body(ctx.names.int, zero_body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec![
            "Inferred type A of initialization of attribute x does not conform to declared \
             type B."
        ]
    );
}

#[test]
fn assign_to_self_is_fatal() {
    let mut ctx = Ctx::new();
    let body = assign(ctx.names.self_, new_(ctx.names.object));
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(messages(&diag), vec!["Cannot assign to 'self'."]);
}

#[test]
fn let_binds_and_checks_initializer() {
    let mut ctx = Ctx::new();
    let (x, one) = (ctx.sym("x"), ctx.sym("1"));
    // let x: Int in x + 1
    let body = let_(x, ctx.names.int, no_expr(), plus(id(x), int_lit(one)));
    let program = program_with_main_body(ctx.names.int, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.int));

    let mut ctx = Ctx::new();
    let x = ctx.sym("x");
    let body = let_(x, ctx.names.int, bool_lit(true), id(x));
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec![
            "Inferred type Bool of initialization of x does not conform to identifier's \
             declared type Int."
        ]
    );

    let mut ctx = Ctx::new();
    let body = let_(
        ctx.names.self_,
        ctx.names.object,
        no_expr(),
        id(ctx.names.self_),
    );
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["'self' cannot be bound in a 'let' expression."]
    );
}

#[test]
fn case_joins_branches_and_rejects_duplicates() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (p, a, b) = (ctx.sym("P"), ctx.sym("A"), ctx.sym("B"));
    let (x, y) = (ctx.sym("x"), ctx.sym("y"));
    let extra = vec![
        class(p, ctx.names.object, vec![], filename),
        class(a, p, vec![], filename),
        class(b, p, vec![], filename),
    ];
    let body = case(new_(a), vec![(x, a, new_(a)), (y, b, new_(b))]);
    let program = program_with_main_body(p, body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(p));

    let mut ctx = Ctx::new();
    let (x, y) = (ctx.sym("x"), ctx.sym("y"));
    let (one, two) = (ctx.sym("1"), ctx.sym("2"));
    let body = case(
        new_(ctx.names.object),
        vec![
            (x, ctx.names.int, int_lit(one)),
            (y, ctx.names.int, int_lit(two)),
        ],
    );
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["Duplicate branch Int in case statement."]
    );
}

#[test]
fn while_types_to_object_and_requires_bool_predicate() {
    let mut ctx = Ctx::new();
    let zero = ctx.sym("0");
    let body = while_(bool_lit(true), int_lit(zero));
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.object));

    let mut ctx = Ctx::new();
    let (zero, one) = (ctx.sym("0"), ctx.sym("1"));
    let body = while_(int_lit(one), int_lit(zero));
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["Loop condition does not have type Bool."]
    );
}

#[test]
fn equality_rejects_mixed_basic_types() {
    let mut ctx = Ctx::new();
    let one = ctx.sym("1");
    let body = eq(int_lit(one), bool_lit(true));
    let program = program_with_main_body(ctx.names.bool_, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(messages(&diag), vec!["Illegal comparison with a basic type."]);

    // Two arbitrary objects may always be compared.
    let mut ctx = Ctx::new();
    let body = eq(new_(ctx.names.object), new_(ctx.names.io));
    let program = program_with_main_body(ctx.names.bool_, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), Some(ctx.names.bool_));
}

#[test]
fn method_return_type_must_conform() {
    let mut ctx = Ctx::new();
    let body = new_(ctx.names.object);
    let program = program_with_main_body(ctx.names.int, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec![
            "Inferred return type Object of method main does not conform to declared return \
             type Int."
        ]
    );
}

#[test]
fn duplicate_formals_are_rejected() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, f, x) = (ctx.sym("A"), ctx.sym("f"), ctx.sym("x"));
    let zero = ctx.sym("0");
    let extra = vec![class(
        a,
        ctx.names.object,
        vec![method(
            f,
            vec![(x, ctx.names.int), (x, ctx.names.int)],
            ctx.names.int,
            int_lit(zero),
        )],
        filename,
    )];
    let zero_body = int_lit(ctx.sym("0"));
    let program = program_with_main_body(ctx.names.int, zero_body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["Formal parameter x is multiply defined."]
    );
}

#[test]
fn new_with_undefined_class_is_an_error() {
    let mut ctx = Ctx::new();
    let ghost = ctx.sym("Ghost");
    let body = new_(ghost);
    let program = program_with_main_body(ctx.names.object, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec!["'new' used with undefined class Ghost."]
    );
}

#[test]
fn attribute_initializer_must_conform() {
    let mut ctx = Ctx::new();
    let filename = ctx.sym("test.cl");
    let (a, x, hello) = (ctx.sym("A"), ctx.sym("x"), ctx.sym("hello"));
    let extra = vec![class(
        a,
        ctx.names.object,
        vec![attr(x, ctx.names.int, str_lit(hello))],
        filename,
    )];
    let zero_body = int_lit(ctx.sym("0"));
    let program = program_with_main_body(ctx.names.int, zero_body, extra, &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    let diag = analyze_err(&program, &basics, &ctx);
    assert_eq!(
        messages(&diag),
        vec![
            "Inferred type String of initialization of attribute x does not conform to \
             declared type Int."
        ]
    );
}

#[test]
fn retyping_an_annotated_tree_is_idempotent() {
    let mut ctx = Ctx::new();
    let (x, one) = (ctx.sym("x"), ctx.sym("1"));
    let body = let_(x, ctx.names.int, no_expr(), plus(id(x), int_lit(one)));
    let program = program_with_main_body(ctx.names.int, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    let first = method_body(&program, 0, 0).ty();

    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);
    assert_eq!(method_body(&program, 0, 0).ty(), first);
}

#[test]
fn every_expression_is_annotated_after_checking() {
    let mut ctx = Ctx::new();
    let (x, one, hello) = (ctx.sym("x"), ctx.sym("1"), ctx.sym("hello"));
    let body = block(vec![
        let_(x, ctx.names.int, int_lit(one), plus(id(x), int_lit(one))),
        if_(bool_lit(true), str_lit(hello), str_lit(hello)),
        dispatch(new_(ctx.names.io), ctx.names.in_int, vec![]),
    ]);
    let program = program_with_main_body(ctx.names.int, body, vec![], &mut ctx);
    let basics = semant::basic_classes(&ctx.names);
    analyze_ok(&program, &basics, &ctx);

    fn assert_annotated(expr: &Expr) {
        assert!(
            expr.ty().is_some(),
            "unannotated expression: {:?}",
            expr.kind
        );
        match &expr.kind {
            ExprKind::Assign { value, .. } => assert_annotated(value),
            ExprKind::StaticDispatch { recv, args, .. }
            | ExprKind::Dispatch { recv, args, .. } => {
                assert_annotated(recv);
                args.iter().for_each(assert_annotated);
            }
            ExprKind::If {
                pred,
                then_exp,
                else_exp,
            } => {
                assert_annotated(pred);
                assert_annotated(then_exp);
                assert_annotated(else_exp);
            }
            ExprKind::While { pred, body } => {
                assert_annotated(pred);
                assert_annotated(body);
            }
            ExprKind::Block { body } => body.iter().for_each(assert_annotated),
            ExprKind::Let { init, body, .. } => {
                assert_annotated(init);
                assert_annotated(body);
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                assert_annotated(scrutinee);
                for branch in branches {
                    assert_annotated(&branch.body);
                }
            }
            ExprKind::Arith { lhs, rhs, .. }
            | ExprKind::Cmp { lhs, rhs, .. }
            | ExprKind::Eq { lhs, rhs } => {
                assert_annotated(lhs);
                assert_annotated(rhs);
            }
            ExprKind::Neg { operand }
            | ExprKind::Not { operand }
            | ExprKind::IsVoid { operand } => assert_annotated(operand),
            ExprKind::IntConst { .. }
            | ExprKind::StrConst { .. }
            | ExprKind::BoolConst { .. }
            | ExprKind::New { .. }
            | ExprKind::NoExpr
            | ExprKind::Id { .. } => {}
        }
    }
    assert_annotated(method_body(&program, 0, 0));
}
