//! Assembly emission.
//!
//! Emits the complete SPIM program: data-segment globals, GC selector
//! words, constants, the class tables, prototype objects, and finally the
//! init and method bodies. Expression emission follows the runtime's
//! calling convention: `$a0` carries every result and the receiver on
//! entry, `$s0` holds self for the whole body, and the callee pops its
//! arguments.

use std::io;

use coolc_core::{Interner, Names, Symbol};

use crate::ast::{Expr, ExprKind};
use crate::semant::ClassTable;

use super::context::{Base, CgenContext, MemAddr};
use super::layout::{Layouts, OBJECT_HEADER_WORDS};
use super::{ConstantPool, EmitOptions};

// Register names of the runtime interface.
const ACC: &str = "$a0";
const A1: &str = "$a1";
const SELF: &str = "$s0";
const T1: &str = "$t1";
const T2: &str = "$t2";
const SP: &str = "$sp";
const FP: &str = "$fp";
const RA: &str = "$ra";
const ZERO: &str = "$zero";

const WORD_SIZE: i32 = 4;

/// Word offset of the dispatch-table pointer inside every object.
const DISPTABLE_OFFSET: i32 = 2;

// Value slots of the boxed basic classes.
const INT_SLOTS: i32 = 1;
const BOOL_SLOTS: i32 = 1;
const STRING_SLOTS: i32 = 1;

// Fixed label names of the runtime interface.
const CLASS_NAME_TAB: &str = "class_nameTab";
const CLASS_OBJ_TAB: &str = "class_objTab";
const INT_TAG_LABEL: &str = "_int_tag";
const BOOL_TAG_LABEL: &str = "_bool_tag";
const STRING_TAG_LABEL: &str = "_string_tag";
const HEAP_START: &str = "heap_start";
const BOOL_FALSE: &str = "bool_const0";
const BOOL_TRUE: &str = "bool_const1";

/// Saved `$fp`, `$s0`, `$ra` in every activation record.
const FRAME_BYTES: i32 = 12;

pub(crate) struct Emitter<'a, W: io::Write> {
    table: &'a ClassTable<'a>,
    layouts: &'a Layouts,
    pool: &'a ConstantPool,
    interner: &'a Interner,
    names: Names,
    options: &'a EmitOptions,
    next_label: u32,
    out: &'a mut W,
}

impl<'a, W: io::Write> Emitter<'a, W> {
    pub fn new(
        table: &'a ClassTable<'a>,
        layouts: &'a Layouts,
        pool: &'a ConstantPool,
        interner: &'a Interner,
        options: &'a EmitOptions,
        out: &'a mut W,
    ) -> Self {
        Self {
            table,
            layouts,
            pool,
            interner,
            names: table.names(),
            options,
            next_label: 0,
            out,
        }
    }

    pub fn emit_program(mut self) -> io::Result<()> {
        writeln!(self.out, "# start of generated code")?;
        self.global_data()?;
        self.select_gc()?;
        self.constants()?;
        self.class_name_table()?;
        self.class_object_table()?;
        self.dispatch_tables()?;
        self.prototype_objects()?;
        self.global_text()?;
        self.class_inits()?;
        self.class_methods()?;
        writeln!(self.out, "\n# end of generated code")
    }

    // ------------------------------------------------------------------
    // Data segment
    // ------------------------------------------------------------------

    fn global_data(&mut self) -> io::Result<()> {
        let names = self.names;
        let main_prot = self.prot_obj(names.main_class);
        let int_prot = self.prot_obj(names.int);
        let string_prot = self.prot_obj(names.string);

        writeln!(self.out, "\t.data")?;
        self.align()?;
        self.global(CLASS_NAME_TAB)?;
        self.global(&main_prot)?;
        self.global(&int_prot)?;
        self.global(&string_prot)?;
        self.global(BOOL_FALSE)?;
        self.global(BOOL_TRUE)?;
        self.global(INT_TAG_LABEL)?;
        self.global(BOOL_TAG_LABEL)?;
        self.global(STRING_TAG_LABEL)?;

        // The runtime reads the basic-class tags from these words.
        let int_tag = self.layouts.class(names.int).tag;
        let bool_tag = self.layouts.class(names.bool_).tag;
        let string_tag = self.layouts.class(names.string).tag;
        self.named_label(INT_TAG_LABEL)?;
        self.word(int_tag)?;
        self.named_label(BOOL_TAG_LABEL)?;
        self.word(bool_tag)?;
        self.named_label(STRING_TAG_LABEL)?;
        self.word(string_tag)
    }

    fn select_gc(&mut self) -> io::Result<()> {
        let gc = self.options.gc;
        self.global("_MemMgr_INITIALIZER")?;
        self.named_label("_MemMgr_INITIALIZER")?;
        self.word(gc.init_routine())?;
        self.global("_MemMgr_COLLECTOR")?;
        self.named_label("_MemMgr_COLLECTOR")?;
        self.word(gc.collect_routine())?;
        self.global("_MemMgr_TEST")?;
        self.named_label("_MemMgr_TEST")?;
        self.word(self.options.gc_test as i32)
    }

    fn constants(&mut self) -> io::Result<()> {
        let pool = self.pool;
        let int_tag = self.layouts.class(self.names.int).tag;
        let bool_tag = self.layouts.class(self.names.bool_).tag;
        let string_tag = self.layouts.class(self.names.string).tag;

        for (index, s) in pool.strings() {
            self.string_object(index, s, string_tag)?;
        }
        for (index, token) in pool.ints() {
            self.int_object(index, token, int_tag)?;
        }
        self.bool_object(false, bool_tag)?;
        self.bool_object(true, bool_tag)
    }

    /// A string object: header, length reference, escaped bytes.
    fn string_object(&mut self, index: usize, s: &str, string_tag: i32) -> io::Result<()> {
        let size =
            OBJECT_HEADER_WORDS + STRING_SLOTS + (s.len() as i32 + WORD_SIZE) / WORD_SIZE;
        let length_ref = self.int_const_label(&s.len().to_string());
        let disp_tab = self.disp_tab(self.names.string);

        self.word(-1)?;
        self.named_label(&format!("str_const{index}"))?;
        self.word(string_tag)?;
        self.word(size)?;
        self.word(&disp_tab)?;
        self.word(&length_ref)?;
        if !s.is_empty() {
            write!(self.out, "\t.ascii\t\"")?;
            for byte in s.bytes() {
                match byte {
                    b'\\' => write!(self.out, "\\\\")?,
                    b'"' => write!(self.out, "\\\"")?,
                    b'\n' => write!(self.out, "\\n")?,
                    b'\t' => write!(self.out, "\\t")?,
                    0x20..=0x7e => write!(self.out, "{}", byte as char)?,
                    _ => write!(self.out, "\\{:03o}", byte)?,
                }
            }
            writeln!(self.out, "\"")?;
        }
        writeln!(self.out, "\t.byte\t0")?;
        self.align()
    }

    fn int_object(&mut self, index: usize, token: &str, int_tag: i32) -> io::Result<()> {
        let disp_tab = self.disp_tab(self.names.int);
        self.word(-1)?;
        self.named_label(&format!("int_const{index}"))?;
        self.word(int_tag)?;
        self.word(OBJECT_HEADER_WORDS + INT_SLOTS)?;
        self.word(&disp_tab)?;
        self.word(token)
    }

    fn bool_object(&mut self, value: bool, bool_tag: i32) -> io::Result<()> {
        let disp_tab = self.disp_tab(self.names.bool_);
        self.word(-1)?;
        self.named_label(if value { BOOL_TRUE } else { BOOL_FALSE })?;
        self.word(bool_tag)?;
        self.word(OBJECT_HEADER_WORDS + BOOL_SLOTS)?;
        self.word(&disp_tab)?;
        self.word(value as i32)
    }

    fn class_name_table(&mut self) -> io::Result<()> {
        let order = self.layouts.emit_order().to_vec();
        self.named_label(CLASS_NAME_TAB)?;
        for class in order {
            let name_ref = self.str_const_label(self.interner.resolve(class));
            self.word(&name_ref)?;
        }
        Ok(())
    }

    fn class_object_table(&mut self) -> io::Result<()> {
        let order = self.layouts.emit_order().to_vec();
        self.named_label(CLASS_OBJ_TAB)?;
        for class in order {
            let prot = self.prot_obj(class);
            let init = self.init_label(class);
            self.word(&prot)?;
            self.word(&init)?;
        }
        Ok(())
    }

    fn dispatch_tables(&mut self) -> io::Result<()> {
        let layouts = self.layouts;
        for &class in layouts.emit_order() {
            let disp_tab = self.disp_tab(class);
            self.named_label(&disp_tab)?;
            for (method, owner) in layouts.class(class).methods() {
                let entry = self.method_label(owner, method);
                self.word(&entry)?;
            }
        }
        Ok(())
    }

    fn prototype_objects(&mut self) -> io::Result<()> {
        let names = self.names;
        let table = self.table;
        let layouts = self.layouts;
        for &class in layouts.emit_order() {
            let layout = layouts.class(class);
            let prot = self.prot_obj(class);
            let disp_tab = self.disp_tab(class);

            self.word(-1)?;
            self.named_label(&prot)?;
            self.word(layout.tag)?;
            self.word(layout.size)?;
            self.word(&disp_tab)?;
            for (attr, _) in layout.attrs() {
                let declared_ty = table.attrs_of(class)[&attr].declared_ty;
                if declared_ty == names.int {
                    let zero = self.int_const_label("0");
                    self.word(&zero)?;
                } else if declared_ty == names.string {
                    let empty = self.str_const_label("");
                    self.word(&empty)?;
                } else if declared_ty == names.bool_ {
                    self.word(BOOL_FALSE)?;
                } else {
                    // All other attributes start out void.
                    self.word(0)?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Text segment
    // ------------------------------------------------------------------

    fn global_text(&mut self) -> io::Result<()> {
        let names = self.names;
        let main_init = self.init_label(names.main_class);
        let int_init = self.init_label(names.int);
        let string_init = self.init_label(names.string);
        let bool_init = self.init_label(names.bool_);
        let main_entry = self.method_label(names.main_class, names.main_method);

        self.global(HEAP_START)?;
        self.named_label(HEAP_START)?;
        self.word(0)?;
        writeln!(self.out, "\t.text")?;
        self.global(&main_init)?;
        self.global(&int_init)?;
        self.global(&string_init)?;
        self.global(&bool_init)?;
        self.global(&main_entry)
    }

    /// `<C>_init` for every class: call the parent init, then evaluate the
    /// initializers of the class's own attributes. Attributes without an
    /// initializer keep the default already present in the prototype.
    fn class_inits(&mut self) -> io::Result<()> {
        let names = self.names;
        let table = self.table;
        let layouts = self.layouts;
        for &class in layouts.emit_order() {
            let decl = table.class(class);
            let init = self.init_label(class);
            self.named_label(&init)?;
            self.prologue()?;
            if class != names.object {
                let parent_init = self.init_label(decl.parent);
                self.jal(&parent_init)?;
            }

            let layout = layouts.class(class);
            let mut ctx = CgenContext::new(class, decl.filename);
            ctx.enter_scope();
            for (index, (attr, _)) in layout.attrs().enumerate() {
                ctx.bind(
                    attr,
                    MemAddr {
                        offset: OBJECT_HEADER_WORDS + index as i32,
                        base: Base::SelfObj,
                    },
                );
            }
            for (attr, owner) in layout.attrs() {
                if owner != class {
                    continue;
                }
                let definition = table.attrs_of(class)[&attr];
                if definition.init.is_no_expr() {
                    continue;
                }
                self.code_expr(&definition.init, &mut ctx)?;
                let addr = ctx.address_of(attr);
                self.store(ACC, addr.offset, SELF)?;
            }
            ctx.exit_scope();

            self.mov(ACC, SELF)?;
            self.epilogue(0)?;
        }
        Ok(())
    }

    /// `<C>.<m>` for every method a user class defines or overrides.
    /// Basic-class methods live in the runtime.
    fn class_methods(&mut self) -> io::Result<()> {
        let names = self.names;
        let table = self.table;
        let layouts = self.layouts;
        for &class in layouts.emit_order() {
            if names.is_basic_class(class) {
                continue;
            }
            let filename = table.class(class).filename;
            for (method, owner) in layouts.class(class).methods() {
                if owner != class {
                    continue;
                }
                let definition = *table
                    .methods_of(class)
                    .get(&method)
                    .expect("method present in layout but not in feature map");

                let label = self.method_label(class, method);
                self.named_label(&label)?;
                self.prologue()?;

                let mut ctx = CgenContext::new(class, filename);
                ctx.enter_scope();
                for (index, (attr, _)) in layouts.class(class).attrs().enumerate() {
                    ctx.bind(
                        attr,
                        MemAddr {
                            offset: OBJECT_HEADER_WORDS + index as i32,
                            base: Base::SelfObj,
                        },
                    );
                }
                let arg_count = definition.formals.len() as i32;
                for (index, formal) in definition.formals.iter().enumerate() {
                    // Leftmost argument sits highest in the frame.
                    ctx.bind(
                        formal.name,
                        MemAddr {
                            offset: OBJECT_HEADER_WORDS + arg_count - 1 - index as i32,
                            base: Base::Frame,
                        },
                    );
                }
                self.code_expr(&definition.body, &mut ctx)?;
                ctx.exit_scope();

                // The callee pops its arguments.
                self.epilogue(WORD_SIZE * arg_count)?;
            }
        }
        Ok(())
    }

    fn prologue(&mut self) -> io::Result<()> {
        self.addiu(SP, SP, -FRAME_BYTES)?;
        self.store(FP, 3, SP)?;
        self.store(SELF, 2, SP)?;
        self.store(RA, 1, SP)?;
        self.addiu(FP, SP, 4)?;
        self.mov(SELF, ACC)
    }

    fn epilogue(&mut self, argument_bytes: i32) -> io::Result<()> {
        self.load(FP, 3, SP)?;
        self.load(SELF, 2, SP)?;
        self.load(RA, 1, SP)?;
        self.addiu(SP, SP, FRAME_BYTES + argument_bytes)?;
        self.ret()
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn code_expr(&mut self, expr: &Expr, ctx: &mut CgenContext) -> io::Result<()> {
        match &expr.kind {
            ExprKind::IntConst { token } => {
                let label = self.int_const_label(self.interner.resolve(*token));
                self.load_address(ACC, &label)
            }
            ExprKind::StrConst { token } => {
                let label = self.str_const_label(self.interner.resolve(*token));
                self.load_address(ACC, &label)
            }
            ExprKind::BoolConst { value } => self.load_bool(ACC, *value),
            ExprKind::NoExpr => self.mov(ACC, ZERO),

            ExprKind::Id { name } => {
                if *name == self.names.self_ {
                    return self.mov(ACC, SELF);
                }
                let addr = ctx.address_of(*name);
                match addr.base {
                    Base::Stack => self.load(ACC, ctx.sp_offset(addr.offset), SP),
                    base => self.load(ACC, addr.offset, base.register()),
                }
            }

            ExprKind::Assign { name, value } => {
                self.code_expr(value, ctx)?;
                let addr = ctx.address_of(*name);
                match addr.base {
                    Base::Stack => self.store(ACC, ctx.sp_offset(addr.offset), SP),
                    base => self.store(ACC, addr.offset, base.register()),
                }
            }

            ExprKind::New { class } => self.code_new(*class),

            ExprKind::IsVoid { operand } => {
                self.code_expr(operand, ctx)?;
                self.mov(T1, ACC)?;
                let done = self.fresh_label();
                self.load_bool(ACC, true)?;
                self.beqz(T1, done)?;
                self.load_bool(ACC, false)?;
                self.label_def(done)
            }

            ExprKind::Not { operand } => {
                self.code_expr(operand, ctx)?;
                self.fetch_value(T1, ACC)?;
                let done = self.fresh_label();
                self.load_bool(ACC, true)?;
                self.beqz(T1, done)?;
                self.load_bool(ACC, false)?;
                self.label_def(done)
            }

            ExprKind::Neg { operand } => {
                self.code_expr(operand, ctx)?;
                self.jal("Object.copy")?;
                self.fetch_value(T1, ACC)?;
                writeln!(self.out, "\tneg\t{T1} {T1}")?;
                self.store_value(T1, ACC)
            }

            ExprKind::Arith { op, lhs, rhs } => {
                self.code_expr(lhs, ctx)?;
                self.push(ACC)?;
                ctx.push_var();
                self.code_expr(rhs, ctx)?;
                ctx.pop_var();
                // Copy the right operand so the result is a fresh Int.
                self.jal("Object.copy")?;
                self.pop(T1)?;
                self.fetch_value(T1, T1)?;
                self.fetch_value(T2, ACC)?;
                self.binop(op.instruction(), T1, T1, T2)?;
                self.store_value(T1, ACC)
            }

            ExprKind::Cmp { op, lhs, rhs } => {
                self.code_expr(lhs, ctx)?;
                self.push(ACC)?;
                ctx.push_var();
                self.code_expr(rhs, ctx)?;
                ctx.pop_var();
                self.pop(T1)?;
                self.fetch_value(T1, T1)?;
                self.fetch_value(T2, ACC)?;
                let done = self.fresh_label();
                self.load_bool(ACC, true)?;
                self.cond_branch(op.instruction(), T1, T2, done)?;
                self.load_bool(ACC, false)?;
                self.label_def(done)
            }

            ExprKind::Eq { lhs, rhs } => {
                self.code_expr(lhs, ctx)?;
                self.push(ACC)?;
                ctx.push_var();
                self.code_expr(rhs, ctx)?;
                ctx.pop_var();
                self.pop(T1)?;
                self.mov(T2, ACC)?;
                let lhs_ty = self.static_type(lhs);
                if lhs_ty == self.names.int
                    || lhs_ty == self.names.string
                    || lhs_ty == self.names.bool_
                {
                    // Value comparison of boxed basics is the runtime's job.
                    self.load_bool(ACC, true)?;
                    self.load_bool(A1, false)?;
                    self.jal("equality_test")
                } else {
                    let done = self.fresh_label();
                    self.load_bool(ACC, true)?;
                    self.cond_branch("beq", T1, T2, done)?;
                    self.load_bool(ACC, false)?;
                    self.label_def(done)
                }
            }

            ExprKind::If {
                pred,
                then_exp,
                else_exp,
            } => {
                let false_label = self.fresh_label();
                let done = self.fresh_label();
                self.code_expr(pred, ctx)?;
                self.fetch_value(T1, ACC)?;
                self.beqz(T1, false_label)?;
                self.code_expr(then_exp, ctx)?;
                self.branch(done)?;
                self.label_def(false_label)?;
                self.code_expr(else_exp, ctx)?;
                self.label_def(done)
            }

            ExprKind::While { pred, body } => {
                let begin = self.fresh_label();
                let end = self.fresh_label();
                self.label_def(begin)?;
                self.code_expr(pred, ctx)?;
                self.fetch_value(T1, ACC)?;
                self.beqz(T1, end)?;
                self.code_expr(body, ctx)?;
                self.branch(begin)?;
                self.label_def(end)?;
                self.mov(ACC, ZERO)
            }

            ExprKind::Block { body } => {
                for sub in body {
                    self.code_expr(sub, ctx)?;
                }
                Ok(())
            }

            ExprKind::Let {
                name,
                declared_ty,
                init,
                body,
            } => {
                if init.is_no_expr() {
                    self.load_default(*declared_ty)?;
                } else {
                    self.code_expr(init, ctx)?;
                }
                self.push(ACC)?;
                ctx.enter_scope();
                ctx.bind(
                    *name,
                    MemAddr {
                        offset: ctx.var_count(),
                        base: Base::Stack,
                    },
                );
                ctx.push_var();
                self.code_expr(body, ctx)?;
                ctx.pop_var();
                ctx.exit_scope();
                self.addiu(SP, SP, WORD_SIZE)
            }

            ExprKind::Dispatch { recv, method, args } => {
                self.code_args(args, ctx)?;
                self.code_expr(recv, ctx)?;
                self.abort_if_void("_dispatch_abort", expr.line, ctx, None)?;
                // Dispatch table of the receiver object.
                self.load(T1, DISPTABLE_OFFSET, ACC)?;
                let target = self.dispatch_target(recv, ctx);
                self.dispatch_through(T1, target, *method)?;
                ctx.pop_vars(args.len() as i32);
                Ok(())
            }

            ExprKind::StaticDispatch {
                recv,
                static_ty,
                method,
                args,
            } => {
                self.code_args(args, ctx)?;
                self.code_expr(recv, ctx)?;
                self.abort_if_void("_dispatch_abort", expr.line, ctx, None)?;
                // Dispatch table of the named class, not the receiver.
                let disp_tab = self.disp_tab(*static_ty);
                self.load_address(T1, &disp_tab)?;
                self.dispatch_through(T1, *static_ty, *method)?;
                ctx.pop_vars(args.len() as i32);
                Ok(())
            }

            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                let done = self.fresh_label();
                self.code_expr(scrutinee, ctx)?;
                self.abort_if_void("_case_abort2", expr.line, ctx, Some(done))?;

                let branch_labels: Vec<u32> =
                    branches.iter().map(|_| self.fresh_label()).collect();

                // Match the runtime tag against each branch class and its
                // subclasses, walking all branches level by level so a
                // class reachable from two branches lands in the more
                // specific one (smaller ancestor distance tests first).
                let mut levels: Vec<Vec<Symbol>> =
                    branches.iter().map(|b| vec![b.declared_ty]).collect();
                self.load(T2, 0, ACC)?;
                loop {
                    let mut all_empty = true;
                    for (index, level) in levels.iter_mut().enumerate() {
                        if level.is_empty() {
                            continue;
                        }
                        all_empty = false;
                        let mut next = Vec::new();
                        for &node in level.iter() {
                            let tag = self.layouts.class(node).tag;
                            self.load_imm(T1, tag)?;
                            self.cond_branch("beq", T1, T2, branch_labels[index])?;
                            next.extend_from_slice(self.layouts.children_of(node));
                        }
                        *level = next;
                    }
                    if all_empty {
                        break;
                    }
                }

                // No branch matched the runtime class.
                self.jal("_case_abort")?;
                self.branch(done)?;

                for (branch, &label) in branches.iter().zip(&branch_labels) {
                    self.label_def(label)?;
                    self.push(ACC)?;
                    ctx.enter_scope();
                    ctx.bind(
                        branch.name,
                        MemAddr {
                            offset: ctx.var_count(),
                            base: Base::Stack,
                        },
                    );
                    ctx.push_var();
                    self.code_expr(&branch.body, ctx)?;
                    ctx.pop_var();
                    ctx.exit_scope();
                    self.addiu(SP, SP, WORD_SIZE)?;
                    self.branch(done)?;
                }
                self.label_def(done)
            }
        }
    }

    fn code_new(&mut self, class: Symbol) -> io::Result<()> {
        if class != self.names.self_type {
            let prot = self.prot_obj(class);
            let init = self.init_label(class);
            self.load_address(ACC, &prot)?;
            self.jal("Object.copy")?;
            self.jal(&init)
        } else {
            // Index class_objTab by the self object's tag; each class has
            // two words there (prototype, init).
            self.load_address(T1, CLASS_OBJ_TAB)?;
            self.load(T2, 0, SELF)?;
            self.sll(T2, T2, 3)?;
            self.binop("addu", T1, T1, T2)?;
            self.push(T1)?;
            self.load(ACC, 0, T1)?;
            self.jal("Object.copy")?;
            self.pop(T1)?;
            self.load(T1, 1, T1)?;
            self.jalr(T1)
        }
    }

    /// Push every actual left-to-right, growing the live-binding count so
    /// stack-relative offsets stay correct while later actuals evaluate.
    fn code_args(&mut self, args: &[Expr], ctx: &mut CgenContext) -> io::Result<()> {
        for arg in args {
            self.code_expr(arg, ctx)?;
            self.push(ACC)?;
            ctx.push_var();
        }
        Ok(())
    }

    /// Branch over the abort call when `$a0` is non-void; otherwise hand
    /// the runtime the current line and filename. `_dispatch_abort` and
    /// `_case_abort2` never return, but a case needs the fall-through
    /// jump to its done label to keep the branch list well-formed.
    fn abort_if_void(
        &mut self,
        abort_routine: &str,
        line: u32,
        ctx: &CgenContext,
        done: Option<u32>,
    ) -> io::Result<()> {
        let skip = self.fresh_label();
        self.cond_branch("bne", ACC, ZERO, skip)?;
        self.load_imm(T1, line as i32)?;
        let filename_ref = self.str_const_label(self.interner.resolve(ctx.filename()));
        self.load_address(ACC, &filename_ref)?;
        self.jal(abort_routine)?;
        if let Some(done) = done {
            self.branch(done)?;
        }
        self.label_def(skip)
    }

    /// Load the method pointer out of the dispatch table in `table_reg`
    /// and call it.
    fn dispatch_through(&mut self, table_reg: &str, class: Symbol, method: Symbol) -> io::Result<()> {
        let index = self
            .layouts
            .class(class)
            .method_index(method)
            .expect("dispatch to a method missing from the table");
        self.load(table_reg, index, table_reg)?;
        self.jalr(table_reg)
    }

    /// Static type of the receiver, with `SELF_TYPE` resolved to the
    /// enclosing class.
    fn dispatch_target(&self, recv: &Expr, ctx: &CgenContext) -> Symbol {
        let ty = self.static_type(recv);
        if ty == self.names.self_type {
            ctx.self_class()
        } else {
            ty
        }
    }

    /// Default value for a binding with no initializer.
    fn load_default(&mut self, declared_ty: Symbol) -> io::Result<()> {
        if declared_ty == self.names.int {
            let zero = self.int_const_label("0");
            self.load_address(ACC, &zero)
        } else if declared_ty == self.names.string {
            let empty = self.str_const_label("");
            self.load_address(ACC, &empty)
        } else if declared_ty == self.names.bool_ {
            self.load_bool(ACC, false)
        } else {
            self.mov(ACC, ZERO)
        }
    }

    fn static_type(&self, expr: &Expr) -> Symbol {
        expr.ty()
            .expect("expression not annotated; the type checker must run first")
    }

    // ------------------------------------------------------------------
    // Label and name helpers
    // ------------------------------------------------------------------

    fn fresh_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn str_const_label(&self, s: &str) -> String {
        let index = self
            .pool
            .string_index(s)
            .expect("string constant not collected before emission");
        format!("str_const{index}")
    }

    fn int_const_label(&self, token: &str) -> String {
        let index = self
            .pool
            .int_index(token)
            .expect("int constant not collected before emission");
        format!("int_const{index}")
    }

    fn prot_obj(&self, class: Symbol) -> String {
        format!("{}_protObj", self.interner.resolve(class))
    }

    fn disp_tab(&self, class: Symbol) -> String {
        format!("{}_dispTab", self.interner.resolve(class))
    }

    fn init_label(&self, class: Symbol) -> String {
        format!("{}_init", self.interner.resolve(class))
    }

    fn method_label(&self, class: Symbol, method: Symbol) -> String {
        format!(
            "{}.{}",
            self.interner.resolve(class),
            self.interner.resolve(method)
        )
    }

    // ------------------------------------------------------------------
    // Instruction helpers. Offsets are in words; the stack grows toward
    // smaller addresses.
    // ------------------------------------------------------------------

    fn load(&mut self, dest: &str, offset: i32, base: &str) -> io::Result<()> {
        writeln!(self.out, "\tlw\t{dest} {}({base})", offset * WORD_SIZE)
    }

    fn store(&mut self, src: &str, offset: i32, base: &str) -> io::Result<()> {
        writeln!(self.out, "\tsw\t{src} {}({base})", offset * WORD_SIZE)
    }

    fn load_imm(&mut self, dest: &str, value: i32) -> io::Result<()> {
        writeln!(self.out, "\tli\t{dest} {value}")
    }

    fn load_address(&mut self, dest: &str, address: &str) -> io::Result<()> {
        writeln!(self.out, "\tla\t{dest} {address}")
    }

    fn load_bool(&mut self, dest: &str, value: bool) -> io::Result<()> {
        self.load_address(dest, if value { BOOL_TRUE } else { BOOL_FALSE })
    }

    fn mov(&mut self, dest: &str, src: &str) -> io::Result<()> {
        writeln!(self.out, "\tmove\t{dest} {src}")
    }

    fn binop(&mut self, op: &str, dest: &str, src1: &str, src2: &str) -> io::Result<()> {
        writeln!(self.out, "\t{op}\t{dest} {src1} {src2}")
    }

    fn addiu(&mut self, dest: &str, src: &str, imm: i32) -> io::Result<()> {
        writeln!(self.out, "\taddiu\t{dest} {src} {imm}")
    }

    fn sll(&mut self, dest: &str, src: &str, amount: i32) -> io::Result<()> {
        writeln!(self.out, "\tsll\t{dest} {src} {amount}")
    }

    fn jal(&mut self, target: &str) -> io::Result<()> {
        writeln!(self.out, "\tjal\t{target}")
    }

    fn jalr(&mut self, reg: &str) -> io::Result<()> {
        writeln!(self.out, "\tjalr\t\t{reg}")
    }

    fn ret(&mut self) -> io::Result<()> {
        writeln!(self.out, "\tjr\t{RA}")
    }

    fn branch(&mut self, label: u32) -> io::Result<()> {
        writeln!(self.out, "\tb\tlabel{label}")
    }

    fn beqz(&mut self, reg: &str, label: u32) -> io::Result<()> {
        writeln!(self.out, "\tbeqz\t{reg} label{label}")
    }

    fn cond_branch(&mut self, op: &str, src1: &str, src2: &str, label: u32) -> io::Result<()> {
        writeln!(self.out, "\t{op}\t{src1} {src2} label{label}")
    }

    fn label_def(&mut self, label: u32) -> io::Result<()> {
        writeln!(self.out, "label{label}:")
    }

    fn named_label(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "{name}:")
    }

    fn word(&mut self, value: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.out, "\t.word\t{value}")
    }

    fn global(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "\t.globl\t{name}")
    }

    fn align(&mut self) -> io::Result<()> {
        writeln!(self.out, "\t.align\t2")
    }

    fn push(&mut self, reg: &str) -> io::Result<()> {
        self.store(reg, 0, SP)?;
        self.addiu(SP, SP, -WORD_SIZE)
    }

    fn pop(&mut self, reg: &str) -> io::Result<()> {
        self.load(reg, 1, SP)?;
        self.addiu(SP, SP, WORD_SIZE)
    }

    /// Fetch the raw value slot of a boxed Int or Bool.
    fn fetch_value(&mut self, dest: &str, src: &str) -> io::Result<()> {
        self.load(dest, OBJECT_HEADER_WORDS, src)
    }

    fn store_value(&mut self, src: &str, dest: &str) -> io::Result<()> {
        self.store(src, OBJECT_HEADER_WORDS, dest)
    }
}
