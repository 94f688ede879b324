//! AST-directed Python source emitter.
//!
//! Walks a [`CompilationUnit`] and produces Python 3.10+ text. Each class is
//! emitted in two passes: a scan that partitions members into constructors,
//! instance fields, static fields and methods, then the emission itself. All
//! constructors of a class collapse into a single `__init__` with a union
//! signature; instance fields that the constructor body does not assign are
//! injected with their declared initializer or a type-appropriate default,
//! so every field is defined once `__init__` returns.
//!
//! The emitter is total: any tree the parser can build renders to a string,
//! and rendering is deterministic for a given tree and configuration.

use std::collections::{HashMap, HashSet};

use crate::ast::*;

/// Python version the emitted source targets. `match` statements require
/// 3.10, which is the only supported target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PythonTarget {
    #[default]
    Py310,
}

#[derive(Clone, Debug)]
pub struct TranslateConfig {
    /// String prepended once per indentation level.
    pub indent: String,
    pub target_python: PythonTarget,
    /// When false, parameter and return annotations are omitted.
    pub emit_type_hints: bool,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        TranslateConfig {
            indent: "    ".into(),
            target_python: PythonTarget::Py310,
            emit_type_hints: true,
        }
    }
}

// Python operator binding strengths, loosest to tightest. Operands are
// parenthesized only when their level binds looser than the context requires.
const TERNARY: u8 = 1;
const OR: u8 = 2;
const AND: u8 = 3;
const NOT: u8 = 4;
const CMP: u8 = 5;
const BITOR: u8 = 6;
const BITXOR: u8 = 7;
const BITAND: u8 = 8;
const SHIFT: u8 = 9;
const ADD: u8 = 10;
const MUL: u8 = 11;
const UNARY: u8 = 12;
const ATOM: u8 = 14;

pub struct Translator {
    config: TranslateConfig,
    output: String,
    indent_level: usize,
    /// Set while emitting `__init__`: field name to mapped Python type.
    /// Assignments whose target is such a field gain `self.` and a type
    /// annotation.
    ctor_fields: Option<HashMap<String, String>>,
}

impl Translator {
    pub fn new(config: TranslateConfig) -> Self {
        Translator {
            config,
            output: String::new(),
            indent_level: 0,
            ctor_fields: None,
        }
    }

    pub fn translate(mut self, unit: &CompilationUnit) -> String {
        for (i, class) in unit.classes.iter().enumerate() {
            if i > 0 {
                self.blank_line();
            }
            self.emit_class(class);
        }
        self.output
    }

    /// Emit a bare statement list at depth zero. Companion to
    /// [`crate::parser::Parser::parse_statements`].
    pub fn translate_statements(mut self, stmts: &[Stmt]) -> String {
        for stmt in stmts {
            self.emit_statement(stmt);
        }
        self.output
    }

    // --- Classes ---

    fn emit_class(&mut self, class: &ClassDecl) {
        // Scan pass: fields declared after the constructor still have to
        // appear in __init__, so partition the members up front.
        let mut ctors: Vec<&ConstructorDecl> = Vec::new();
        let mut instance_fields: Vec<&FieldDecl> = Vec::new();
        let mut static_fields: Vec<&FieldDecl> = Vec::new();
        let mut methods: Vec<&MethodDecl> = Vec::new();
        for member in &class.members {
            match member {
                Member::Constructor(c) => ctors.push(c),
                Member::Field(f) if f.modifiers.is_static => static_fields.push(f),
                Member::Field(f) => instance_fields.push(f),
                Member::Method(m) => methods.push(m),
            }
        }

        match &class.extends {
            Some(base) => self.writeln(&format!("class {}({}):", class.name, base)),
            None => self.writeln(&format!("class {}:", class.name)),
        }
        self.indent_level += 1;

        let has_init = !ctors.is_empty() || !instance_fields.is_empty();
        if static_fields.is_empty() && !has_init && methods.is_empty() {
            self.writeln("pass");
            self.indent_level -= 1;
            return;
        }

        let mut emitted_member = false;
        for field in &static_fields {
            self.emit_static_field(field);
            emitted_member = true;
        }
        if has_init {
            if emitted_member {
                self.blank_line();
            }
            self.emit_init(&ctors, &instance_fields);
            emitted_member = true;
        }
        for method in &methods {
            if emitted_member {
                self.blank_line();
            }
            self.emit_method(method);
            emitted_member = true;
        }
        self.indent_level -= 1;
    }

    fn emit_static_field(&mut self, field: &FieldDecl) {
        let value = match &field.init {
            Some(init) => self.render_expr(init),
            None => self.type_default(&field.ty),
        };
        let line = if self.config.emit_type_hints {
            format!("{}: {} = {}", field.name, self.map_type(&field.ty), value)
        } else {
            format!("{} = {}", field.name, value)
        };
        self.writeln(&line);
    }

    /// Collapse all constructors into one `__init__`.
    ///
    /// The signature comes from the longest constructor; every parameter
    /// position a shorter overload lacks gets a type-appropriate default.
    /// Only the longest constructor's body is kept.
    fn emit_init(&mut self, ctors: &[&ConstructorDecl], fields: &[&FieldDecl]) {
        let longest: Option<&ConstructorDecl> = ctors.iter().copied().fold(None, |best, c| match best {
            Some(b) if c.params.len() <= b.params.len() => Some(b),
            _ => Some(c),
        });
        let min_len = ctors.iter().map(|c| c.params.len()).min().unwrap_or(0);

        let mut sig = String::from("self");
        if let Some(longest) = longest {
            for (i, param) in longest.params.iter().enumerate() {
                sig.push_str(", ");
                if self.config.emit_type_hints {
                    sig.push_str(&format!("{}: {}", param.name, self.map_type(&param.ty)));
                    if i >= min_len {
                        sig.push_str(&format!(" = {}", self.type_default(&param.ty)));
                    }
                } else {
                    sig.push_str(&param.name);
                    if i >= min_len {
                        sig.push_str(&format!("={}", self.type_default(&param.ty)));
                    }
                }
            }
        }
        self.writeln(&format!("def __init__({}):", sig));
        self.indent_level += 1;

        self.ctor_fields = Some(
            fields
                .iter()
                .map(|f| (f.name.clone(), self.map_type(&f.ty)))
                .collect(),
        );

        let body: &[Stmt] = longest.map(|c| c.body.as_slice()).unwrap_or(&[]);

        // A leading this(...)/super(...) call stays first.
        let mut rest = body;
        if let Some(first) = body.first() {
            if matches!(
                first,
                Stmt::ExprStmt(Expr::ThisCall(_)) | Stmt::ExprStmt(Expr::SuperCall(_))
            ) {
                self.emit_statement(first);
                rest = &body[1..];
            }
        }

        // Inject fields the body never assigns, in declaration order.
        let assigned = assigned_field_names(body);
        for field in fields {
            if assigned.contains(field.name.as_str()) {
                continue;
            }
            let value = match &field.init {
                Some(init) => self.render_expr(init),
                None => self.type_default(&field.ty),
            };
            let line = if self.config.emit_type_hints {
                format!("self.{}: {} = {}", field.name, self.map_type(&field.ty), value)
            } else {
                format!("self.{} = {}", field.name, value)
            };
            self.writeln(&line);
        }

        let before = self.output.len();
        for stmt in rest {
            self.emit_statement(stmt);
        }
        let emitted_chain = rest.len() != body.len();
        let injected = fields.iter().any(|f| !assigned.contains(f.name.as_str()));
        if self.output.len() == before && !emitted_chain && !injected {
            self.writeln("pass");
        }

        self.indent_level -= 1;
        self.ctor_fields = None;
    }

    fn emit_method(&mut self, method: &MethodDecl) {
        if method.modifiers.is_static {
            self.writeln("@staticmethod");
        }
        let mut parts: Vec<String> = Vec::new();
        if !method.modifiers.is_static {
            parts.push("self".into());
        }
        for param in &method.params {
            if self.config.emit_type_hints {
                parts.push(format!("{}: {}", param.name, self.map_type(&param.ty)));
            } else {
                parts.push(param.name.clone());
            }
        }
        let header = if self.config.emit_type_hints {
            format!(
                "def {}({}) -> {}:",
                method.name,
                parts.join(", "),
                self.map_type(&method.return_type)
            )
        } else {
            format!("def {}({}):", method.name, parts.join(", "))
        };
        self.writeln(&header);
        self.indent_level += 1;
        self.emit_body(&method.body);
        self.indent_level -= 1;
    }

    // --- Statements ---

    fn emit_body(&mut self, stmts: &[Stmt]) {
        let before = self.output.len();
        for stmt in stmts {
            self.emit_statement(stmt);
        }
        if self.output.len() == before {
            self.writeln("pass");
        }
    }

    fn emit_statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::LocalDecl { ty, name, init } => {
                if let Some(init) = init {
                    self.hoist_increments(init);
                }
                let value = match init {
                    Some(init) => self.render_expr(init),
                    None => self.type_default(ty),
                };
                let line = if self.config.emit_type_hints {
                    format!("{}: {} = {}", name, self.map_type(ty), value)
                } else {
                    format!("{} = {}", name, value)
                };
                self.writeln(&line);
            }
            Stmt::ExprStmt(expr) => self.emit_expr_as_stmt(expr),
            Stmt::Return(expr) => match expr {
                Some(expr) => {
                    self.hoist_increments(expr);
                    let src = self.render_expr(expr);
                    self.writeln(&format!("return {}", src));
                }
                None => self.writeln("return"),
            },
            Stmt::Throw(expr) => {
                self.hoist_increments(expr);
                let src = self.render_expr(expr);
                self.writeln(&format!("raise {}", src));
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => self.emit_if(condition, then_body, else_body.as_ref()),
            Stmt::While { condition, body } => {
                self.hoist_increments(condition);
                let cond = self.render_expr(condition);
                self.writeln(&format!("while {}:", cond));
                self.indent_level += 1;
                self.emit_body(body);
                self.indent_level -= 1;
            }
            Stmt::DoWhile { body, condition } => {
                self.writeln("while True:");
                self.indent_level += 1;
                for stmt in body {
                    self.emit_statement(stmt);
                }
                // The condition is evaluated at the end of each pass, so
                // embedded increments hoist to just before the check
                self.hoist_increments(condition);
                let cond = self.render_prec(condition, 0);
                self.writeln(&format!("if not ({}):", cond));
                self.indent_level += 1;
                self.writeln("break");
                self.indent_level -= 2;
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => self.emit_for(init.as_deref(), condition.as_ref(), update.as_ref(), body),
            Stmt::ForEach {
                var,
                iterable,
                body,
            } => {
                self.hoist_increments(iterable);
                let iter = self.render_expr(iterable);
                self.writeln(&format!("for {} in {}:", var.name, iter));
                self.indent_level += 1;
                self.emit_body(body);
                self.indent_level -= 1;
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default_body,
            } => {
                self.hoist_increments(scrutinee);
                let subject = self.render_expr(scrutinee);
                self.writeln(&format!("match {}:", subject));
                self.indent_level += 1;
                for case in cases {
                    let labels: Vec<String> =
                        case.labels.iter().map(|l| self.render_prec(l, ATOM)).collect();
                    self.writeln(&format!("case {}:", labels.join(" | ")));
                    self.indent_level += 1;
                    self.emit_case_body(&case.body);
                    self.indent_level -= 1;
                }
                if let Some(default_body) = default_body {
                    self.writeln("case _:");
                    self.indent_level += 1;
                    self.emit_case_body(default_body);
                    self.indent_level -= 1;
                }
                self.indent_level -= 1;
            }
            Stmt::Try {
                body,
                catches,
                finally_body,
            } => {
                self.writeln("try:");
                self.indent_level += 1;
                self.emit_body(body);
                self.indent_level -= 1;
                for catch in catches {
                    let types: Vec<String> = catch
                        .exception_types
                        .iter()
                        .map(|t| exception_name(t))
                        .collect();
                    let clause = if types.len() == 1 {
                        format!("except {} as {}:", types[0], catch.var_name)
                    } else {
                        format!("except ({}) as {}:", types.join(", "), catch.var_name)
                    };
                    self.writeln(&clause);
                    self.indent_level += 1;
                    self.emit_body(&catch.body);
                    self.indent_level -= 1;
                }
                if let Some(finally_body) = finally_body {
                    self.writeln("finally:");
                    self.indent_level += 1;
                    self.emit_body(finally_body);
                    self.indent_level -= 1;
                }
            }
            Stmt::Break => self.writeln("break"),
            Stmt::Continue => self.writeln("continue"),
            Stmt::Block(stmts) => {
                // Java braces do not open a scope in the output
                for stmt in stmts {
                    self.emit_statement(stmt);
                }
            }
        }
    }

    /// A `match` arm body: Java's per-case `break` is dropped, fall-through
    /// is not preserved.
    fn emit_case_body(&mut self, stmts: &[Stmt]) {
        let before = self.output.len();
        for stmt in stmts {
            if matches!(stmt, Stmt::Break) {
                continue;
            }
            self.emit_statement(stmt);
        }
        if self.output.len() == before {
            self.writeln("pass");
        }
    }

    fn emit_if(&mut self, condition: &Expr, then_body: &[Stmt], else_body: Option<&Vec<Stmt>>) {
        self.hoist_increments(condition);
        let cond = self.render_expr(condition);
        self.writeln(&format!("if {}:", cond));
        self.indent_level += 1;
        self.emit_body(then_body);
        self.indent_level -= 1;

        let mut next_else = else_body;
        while let Some(body) = next_else {
            // A sole trailing If is an else-if chain link
            if let [Stmt::If {
                condition,
                then_body,
                else_body,
            }] = body.as_slice()
            {
                self.hoist_increments(condition);
                let cond = self.render_expr(condition);
                self.writeln(&format!("elif {}:", cond));
                self.indent_level += 1;
                self.emit_body(then_body);
                self.indent_level -= 1;
                next_else = else_body.as_ref();
            } else {
                self.writeln("else:");
                self.indent_level += 1;
                self.emit_body(body);
                self.indent_level -= 1;
                next_else = None;
            }
        }
    }

    fn emit_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &[Stmt],
    ) {
        if let Some((var, start, stop, step)) = self.match_range_form(init, condition, update) {
            let line = if step == 1 {
                format!("for {} in range({}, {}):", var, start, stop)
            } else {
                format!("for {} in range({}, {}, -1):", var, start, stop)
            };
            self.writeln(&line);
            self.indent_level += 1;
            self.emit_body(body);
            self.indent_level -= 1;
            return;
        }

        // General C-style loop: init statement, then a while with the update
        // appended to the body.
        if let Some(init) = init {
            self.emit_statement(init);
        }
        match condition {
            Some(condition) => {
                self.hoist_increments(condition);
                let cond = self.render_expr(condition);
                self.writeln(&format!("while {}:", cond));
            }
            None => self.writeln("while True:"),
        }
        self.indent_level += 1;
        let before = self.output.len();
        for stmt in body {
            self.emit_statement(stmt);
        }
        match update {
            Some(update) => self.emit_expr_as_stmt(update),
            None => {
                if self.output.len() == before {
                    self.writeln("pass");
                }
            }
        }
        self.indent_level -= 1;
    }

    /// Recognize `for (T i = a; i < b; i++)` (and the `<=`, `>`, `>=`, `--`
    /// variants over an integer loop variable) for the `range` rewrite.
    /// Returns (var, start, stop, step).
    fn match_range_form(
        &self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
    ) -> Option<(String, String, String, i32)> {
        let (var, start) = match init {
            Some(Stmt::LocalDecl {
                ty: TypeName::Primitive(p),
                name,
                init: Some(start),
            }) if matches!(
                p,
                PrimitiveKind::Int | PrimitiveKind::Long | PrimitiveKind::Short | PrimitiveKind::Byte
            ) =>
            {
                (name, start)
            }
            _ => return None,
        };

        let step = match update {
            Some(Expr::PostIncrement(op)) | Some(Expr::PreIncrement(op)) => {
                match op.as_ref() {
                    Expr::Ident(name) if name == var => 1,
                    _ => return None,
                }
            }
            Some(Expr::PostDecrement(op)) | Some(Expr::PreDecrement(op)) => {
                match op.as_ref() {
                    Expr::Ident(name) if name == var => -1,
                    _ => return None,
                }
            }
            _ => return None,
        };

        let (op, bound) = match condition {
            Some(Expr::Comparison { op, left, right }) => match left.as_ref() {
                Expr::Ident(name) if name == var => (*op, right.as_ref()),
                _ => return None,
            },
            _ => return None,
        };

        let stop = match (op, step) {
            (CompareOp::Lt, 1) => self.render_prec(bound, 0),
            (CompareOp::Le, 1) => self.bound_offset(bound, 1),
            (CompareOp::Gt, -1) => self.render_prec(bound, 0),
            (CompareOp::Ge, -1) => self.bound_offset(bound, -1),
            _ => return None,
        };

        Some((var.clone(), self.render_prec(start, 0), stop, step))
    }

    /// Inclusive bounds shift by one; literal bounds fold.
    fn bound_offset(&self, bound: &Expr, offset: i64) -> String {
        match bound {
            Expr::IntLiteral(v) => (v + offset).to_string(),
            _ if offset > 0 => format!("{} + 1", self.render_prec(bound, ADD)),
            _ => format!("{} - 1", self.render_prec(bound, ADD)),
        }
    }

    /// Emit an expression in statement position.
    fn emit_expr_as_stmt(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { target, value } => {
                self.hoist_increments(target);
                self.hoist_increments(value);
                self.emit_assign(target, value);
            }
            Expr::CompoundAssign { op, target, value } => {
                self.hoist_increments(target);
                self.hoist_increments(value);
                let target_src = self.render_prec(target, ATOM);
                let value_src = self.render_expr(value);
                self.writeln(&format!("{} {}= {}", target_src, binop_symbol(*op), value_src));
            }
            Expr::PostIncrement(op) | Expr::PreIncrement(op) => {
                let target = self.render_prec(op, ATOM);
                self.writeln(&format!("{} += 1", target));
            }
            Expr::PostDecrement(op) | Expr::PreDecrement(op) => {
                let target = self.render_prec(op, ATOM);
                self.writeln(&format!("{} -= 1", target));
            }
            _ => {
                self.hoist_increments(expr);
                let src = self.render_expr(expr);
                self.writeln(&src);
            }
        }
    }

    /// Plain or field assignment. Inside `__init__`, targets that name an
    /// instance field gain `self.` and the field's type annotation, which is
    /// how declared fields become attributes.
    fn emit_assign(&mut self, target: &Expr, value: &Expr) {
        let value_src = self.render_expr(value);
        let field = self.ctor_fields.as_ref().and_then(|fields| {
            let name = match target {
                Expr::FieldAccess { object, name } if matches!(object.as_ref(), Expr::This) => {
                    Some(name)
                }
                Expr::Ident(name) => Some(name),
                _ => None,
            }?;
            fields.get(name).map(|ty| (name.clone(), ty.clone()))
        });
        if let Some((name, py_ty)) = field {
            let line = if self.config.emit_type_hints {
                format!("self.{}: {} = {}", name, py_ty, value_src)
            } else {
                format!("self.{} = {}", name, value_src)
            };
            self.writeln(&line);
        } else {
            let target_src = self.render_prec(target, ATOM);
            self.writeln(&format!("{} = {}", target_src, value_src));
        }
    }

    /// Embedded `++`/`--` cannot stay expressions in Python; emit the
    /// mutation as its own line before the statement that contains it. The
    /// expression itself then renders as the bare operand.
    fn hoist_increments(&mut self, expr: &Expr) {
        let mut lines = Vec::new();
        self.collect_increments(expr, &mut lines);
        for line in lines {
            self.writeln(&line);
        }
    }

    fn collect_increments(&self, expr: &Expr, out: &mut Vec<String>) {
        match expr {
            Expr::PostIncrement(op) | Expr::PreIncrement(op) => {
                self.collect_increments(op, out);
                out.push(format!("{} += 1", self.render_prec(op, ATOM)));
            }
            Expr::PostDecrement(op) | Expr::PreDecrement(op) => {
                self.collect_increments(op, out);
                out.push(format!("{} -= 1", self.render_prec(op, ATOM)));
            }
            Expr::Binary { left, right, .. } | Expr::Comparison { left, right, .. } => {
                self.collect_increments(left, out);
                self.collect_increments(right, out);
            }
            Expr::LogicalAnd(left, right) | Expr::LogicalOr(left, right) => {
                self.collect_increments(left, out);
                self.collect_increments(right, out);
            }
            Expr::LogicalNot(op) | Expr::Unary { operand: op, .. } | Expr::Cast { operand: op, .. } => {
                self.collect_increments(op, out);
            }
            Expr::Instanceof { operand, .. } => self.collect_increments(operand, out),
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.collect_increments(condition, out);
                self.collect_increments(then_expr, out);
                self.collect_increments(else_expr, out);
            }
            Expr::Assign { target, value } | Expr::CompoundAssign { target, value, .. } => {
                self.collect_increments(target, out);
                self.collect_increments(value, out);
            }
            Expr::MethodCall { object, args, .. } => {
                if let Some(object) = object {
                    self.collect_increments(object, out);
                }
                for arg in args {
                    self.collect_increments(arg, out);
                }
            }
            Expr::FieldAccess { object, .. } => self.collect_increments(object, out),
            Expr::ArrayAccess { array, index } => {
                self.collect_increments(array, out);
                self.collect_increments(index, out);
            }
            Expr::NewObject { args, .. } | Expr::ThisCall(args) | Expr::SuperCall(args) => {
                for arg in args {
                    self.collect_increments(arg, out);
                }
            }
            Expr::NewArray { size, .. } => self.collect_increments(size, out),
            Expr::NewArrayInit { elements, .. } | Expr::ArrayInit(elements) => {
                for element in elements {
                    self.collect_increments(element, out);
                }
            }
            _ => {}
        }
    }

    // --- Expressions ---

    pub fn render_expr(&self, expr: &Expr) -> String {
        self.render_prec(expr, 0)
    }

    fn render_prec(&self, expr: &Expr, min: u8) -> String {
        let (src, level) = self.render(expr);
        if level < min {
            format!("({})", src)
        } else {
            src
        }
    }

    fn render(&self, expr: &Expr) -> (String, u8) {
        match expr {
            Expr::IntLiteral(v) | Expr::LongLiteral(v) => (v.to_string(), ATOM),
            Expr::FloatLiteral(v) | Expr::DoubleLiteral(v) => (format!("{:?}", v), ATOM),
            Expr::StringLiteral(s) => (format!("\"{}\"", escape_py_string(s)), ATOM),
            Expr::CharLiteral(c) => (
                format!("\"{}\"", escape_py_string(&c.to_string())),
                ATOM,
            ),
            Expr::BoolLiteral(true) => ("True".into(), ATOM),
            Expr::BoolLiteral(false) => ("False".into(), ATOM),
            Expr::NullLiteral => ("None".into(), ATOM),
            Expr::Ident(name) => (name.clone(), ATOM),
            Expr::This => ("self".into(), ATOM),
            Expr::Super => ("super()".into(), ATOM),
            Expr::Binary { op, left, right } => {
                let level = binop_level(*op);
                let left = self.render_prec(left, level);
                let right = self.render_prec(right, level + 1);
                (format!("{} {} {}", left, binop_symbol(*op), right), level)
            }
            Expr::Comparison { op, left, right } => {
                // Parenthesize nested comparisons: Python would chain them
                let left = self.render_prec(left, CMP + 1);
                let right = self.render_prec(right, CMP + 1);
                let symbol = match op {
                    CompareOp::Eq => "==",
                    CompareOp::Ne => "!=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                };
                (format!("{} {} {}", left, symbol, right), CMP)
            }
            Expr::LogicalAnd(left, right) => {
                let left = self.render_prec(left, AND);
                let right = self.render_prec(right, AND + 1);
                (format!("{} and {}", left, right), AND)
            }
            Expr::LogicalOr(left, right) => {
                let left = self.render_prec(left, OR);
                let right = self.render_prec(right, OR + 1);
                (format!("{} or {}", left, right), OR)
            }
            Expr::LogicalNot(operand) => {
                (format!("not {}", self.render_prec(operand, NOT)), NOT)
            }
            Expr::Unary { op, operand } => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::BitNot => "~",
                };
                (format!("{}{}", symbol, self.render_prec(operand, UNARY)), UNARY)
            }
            Expr::PreIncrement(operand)
            | Expr::PreDecrement(operand)
            | Expr::PostIncrement(operand)
            | Expr::PostDecrement(operand) => {
                // The mutation was hoisted to a sibling statement
                self.render(operand)
            }
            Expr::Assign { target, value } => {
                let target = self.render_prec(target, ATOM);
                let value = self.render_prec(value, 0);
                (format!("{} = {}", target, value), 0)
            }
            Expr::CompoundAssign { op, target, value } => {
                let target = self.render_prec(target, ATOM);
                let value = self.render_prec(value, 0);
                (format!("{} {}= {}", target, binop_symbol(*op), value), 0)
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let then_src = self.render_prec(then_expr, TERNARY + 1);
                let cond_src = self.render_prec(condition, TERNARY + 1);
                let else_src = self.render_prec(else_expr, TERNARY);
                (format!("{} if {} else {}", then_src, cond_src, else_src), TERNARY)
            }
            Expr::MethodCall { object, name, args } => self.render_call(object, name, args),
            Expr::FieldAccess { object, name } => {
                if name == "length" {
                    return (format!("len({})", self.render_prec(object, 0)), ATOM);
                }
                if matches!(object.as_ref(), Expr::Super) {
                    return (format!("super().{}", name), ATOM);
                }
                (format!("{}.{}", self.render_prec(object, ATOM), name), ATOM)
            }
            Expr::ArrayAccess { array, index } => (
                format!(
                    "{}[{}]",
                    self.render_prec(array, ATOM),
                    self.render_prec(index, 0)
                ),
                ATOM,
            ),
            Expr::NewObject { ty, args } => self.render_new_object(ty, args),
            Expr::NewArray { element_type, size } => (
                format!(
                    "[{}] * {}",
                    self.type_default(element_type),
                    self.render_prec(size, MUL + 1)
                ),
                MUL,
            ),
            Expr::NewArrayInit { elements, .. } | Expr::ArrayInit(elements) => {
                (format!("[{}]", self.render_args(elements)), ATOM)
            }
            Expr::Cast { ty, operand } => match cast_builtin(ty) {
                Some(builtin) => (
                    format!("{}({})", builtin, self.render_prec(operand, 0)),
                    ATOM,
                ),
                // Reference casts have no runtime counterpart
                None => self.render(operand),
            },
            Expr::Instanceof { operand, ty } => (
                format!(
                    "isinstance({}, {})",
                    self.render_prec(operand, 0),
                    runtime_type_name(ty)
                ),
                ATOM,
            ),
            Expr::ThisCall(args) => {
                (format!("self.__init__({})", self.render_args(args)), ATOM)
            }
            Expr::SuperCall(args) => {
                (format!("super().__init__({})", self.render_args(args)), ATOM)
            }
        }
    }

    fn render_call(&self, object: &Option<Box<Expr>>, name: &str, args: &[Expr]) -> (String, u8) {
        if let Some(object) = object {
            if is_system_out(object) && (name == "println" || name == "print") {
                let src = if name == "println" {
                    format!("print({})", self.render_args(args))
                } else if args.is_empty() {
                    "print(end='')".to_string()
                } else {
                    format!("print({}, end='')", self.render_args(args))
                };
                return (src, ATOM);
            }
            if let Expr::Ident(base) = object.as_ref() {
                if (base == "List" && name == "of") || (base == "Arrays" && name == "asList") {
                    return (format!("[{}]", self.render_args(args)), ATOM);
                }
            }
            if matches!(object.as_ref(), Expr::Super) {
                return (
                    format!("super().{}({})", name, self.render_args(args)),
                    ATOM,
                );
            }
            if args.is_empty() && (name == "length" || name == "size") {
                return (format!("len({})", self.render_prec(object, 0)), ATOM);
            }
            if name == "charAt" && args.len() == 1 {
                return (
                    format!(
                        "{}[{}]",
                        self.render_prec(object, ATOM),
                        self.render_prec(&args[0], 0)
                    ),
                    ATOM,
                );
            }
            (
                format!(
                    "{}.{}({})",
                    self.render_prec(object, ATOM),
                    name,
                    self.render_args(args)
                ),
                ATOM,
            )
        } else {
            (format!("{}({})", name, self.render_args(args)), ATOM)
        }
    }

    /// Collection constructors become their Python literal; everything else
    /// is a plain call on the class name.
    fn render_new_object(&self, ty: &TypeName, args: &[Expr]) -> (String, u8) {
        let name = match ty {
            TypeName::Class { name, .. } => name.as_str(),
            _ => "",
        };
        let builtin = match name {
            "ArrayList" | "LinkedList" | "List" => Some(("[]", "list")),
            "HashMap" | "TreeMap" | "Map" => Some(("{}", "dict")),
            "HashSet" | "TreeSet" | "Set" => Some(("set()", "set")),
            _ => None,
        };
        match builtin {
            Some((empty, _)) if args.is_empty() => (empty.to_string(), ATOM),
            Some((_, ctor)) => (format!("{}({})", ctor, self.render_args(args)), ATOM),
            None => (format!("{}({})", name, self.render_args(args)), ATOM),
        }
    }

    fn render_args(&self, args: &[Expr]) -> String {
        let rendered: Vec<String> = args.iter().map(|a| self.render_prec(a, 0)).collect();
        rendered.join(", ")
    }

    // --- Type mapping ---

    /// Map a Java type spelling to its Python annotation. The mapping
    /// applies recursively inside generic arguments.
    pub fn map_type(&self, ty: &TypeName) -> String {
        match ty {
            TypeName::Primitive(p) => match p {
                PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Short
                | PrimitiveKind::Byte => "int".into(),
                PrimitiveKind::Float | PrimitiveKind::Double => "float".into(),
                PrimitiveKind::Boolean => "bool".into(),
                PrimitiveKind::Char => "str".into(),
                PrimitiveKind::Void => "None".into(),
            },
            TypeName::Array(inner) => format!("list[{}]", self.map_type(inner)),
            TypeName::Class { name, args } => match name.as_str() {
                "String" | "Character" => "str".into(),
                "Integer" | "Long" | "Short" | "Byte" => "int".into(),
                "Float" | "Double" => "float".into(),
                "Boolean" => "bool".into(),
                "List" | "ArrayList" | "LinkedList" => match args.as_slice() {
                    [element] => format!("list[{}]", self.map_type(element)),
                    _ => "list[Any]".into(),
                },
                "Map" | "HashMap" | "TreeMap" => match args.as_slice() {
                    [key, value] => {
                        format!("dict[{}, {}]", self.map_type(key), self.map_type(value))
                    }
                    _ => "dict[Any, Any]".into(),
                },
                "Set" | "HashSet" | "TreeSet" => match args.as_slice() {
                    [element] => format!("set[{}]", self.map_type(element)),
                    _ => "set[Any]".into(),
                },
                "Optional" => match args.as_slice() {
                    [inner] => format!("{} | None", self.map_type(inner)),
                    _ => "Any | None".into(),
                },
                _ => "Any".into(),
            },
        }
    }

    /// The value a variable of the given type starts from when no
    /// initializer is available.
    pub fn type_default(&self, ty: &TypeName) -> String {
        match ty {
            TypeName::Primitive(p) => match p {
                PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Short
                | PrimitiveKind::Byte => "0".into(),
                PrimitiveKind::Float | PrimitiveKind::Double => "0.0".into(),
                PrimitiveKind::Boolean => "False".into(),
                PrimitiveKind::Char => "\"\"".into(),
                PrimitiveKind::Void => "None".into(),
            },
            TypeName::Array(_) => "[]".into(),
            TypeName::Class { name, .. } => match name.as_str() {
                "String" | "Character" => "\"\"".into(),
                "Integer" | "Long" | "Short" | "Byte" => "0".into(),
                "Float" | "Double" => "0.0".into(),
                "Boolean" => "False".into(),
                "List" | "ArrayList" | "LinkedList" => "[]".into(),
                "Map" | "HashMap" | "TreeMap" => "{}".into(),
                "Set" | "HashSet" | "TreeSet" => "set()".into(),
                _ => "None".into(),
            },
        }
    }

    // --- Output helpers ---

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(&self.config.indent);
        }
    }

    fn writeln(&mut self, text: &str) {
        self.write_indent();
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn blank_line(&mut self) {
        self.output.push('\n');
    }
}

/// Names of instance fields the constructor body assigns at its top level,
/// as `this.name = ...` or `name = ...`. Conditional assignments deeper in
/// the tree do not count: a field assigned only on some paths still gets its
/// injected default.
fn assigned_field_names(body: &[Stmt]) -> HashSet<&str> {
    let mut names = HashSet::new();
    for stmt in body {
        if let Stmt::ExprStmt(Expr::Assign { target, .. }) = stmt {
            match target.as_ref() {
                Expr::FieldAccess { object, name } if matches!(object.as_ref(), Expr::This) => {
                    names.insert(name.as_str());
                }
                Expr::Ident(name) => {
                    names.insert(name.as_str());
                }
                _ => {}
            }
        }
    }
    names
}

fn is_system_out(expr: &Expr) -> bool {
    match expr {
        Expr::FieldAccess { object, name } => {
            name == "out" && matches!(object.as_ref(), Expr::Ident(base) if base == "System")
        }
        _ => false,
    }
}

fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::Shl => "<<",
        // Python has no unsigned shift; >> differs on negative operands
        BinOp::Shr | BinOp::Ushr => ">>",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
    }
}

fn binop_level(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => ADD,
        BinOp::Mul | BinOp::Div | BinOp::Rem => MUL,
        BinOp::Shl | BinOp::Shr | BinOp::Ushr => SHIFT,
        BinOp::BitAnd => BITAND,
        BinOp::BitOr => BITOR,
        BinOp::BitXor => BITXOR,
    }
}

/// The builtin conversion a cast maps to, when it has one.
fn cast_builtin(ty: &TypeName) -> Option<&'static str> {
    match ty {
        TypeName::Primitive(p) => match p {
            PrimitiveKind::Int
            | PrimitiveKind::Long
            | PrimitiveKind::Short
            | PrimitiveKind::Byte => Some("int"),
            PrimitiveKind::Float | PrimitiveKind::Double => Some("float"),
            PrimitiveKind::Boolean => Some("bool"),
            PrimitiveKind::Char => Some("str"),
            PrimitiveKind::Void => None,
        },
        TypeName::Class { name, .. } => match name.as_str() {
            "String" => Some("str"),
            "Integer" | "Long" | "Short" | "Byte" => Some("int"),
            "Float" | "Double" => Some("float"),
            "Boolean" => Some("bool"),
            _ => None,
        },
        TypeName::Array(_) => None,
    }
}

/// Exception class name for an `except` clause.
fn exception_name(ty: &TypeName) -> String {
    match ty {
        TypeName::Class { name, .. } => name.clone(),
        _ => ty.display_name(),
    }
}

/// Runtime class name for `isinstance` checks.
fn runtime_type_name(ty: &TypeName) -> String {
    match ty {
        TypeName::Primitive(p) => match p {
            PrimitiveKind::Int
            | PrimitiveKind::Long
            | PrimitiveKind::Short
            | PrimitiveKind::Byte => "int".into(),
            PrimitiveKind::Float | PrimitiveKind::Double => "float".into(),
            PrimitiveKind::Boolean => "bool".into(),
            PrimitiveKind::Char => "str".into(),
            PrimitiveKind::Void => "type(None)".into(),
        },
        TypeName::Array(_) => "list".into(),
        TypeName::Class { name, .. } => match name.as_str() {
            "String" | "Character" => "str".into(),
            "Integer" | "Long" | "Short" | "Byte" => "int".into(),
            "Float" | "Double" => "float".into(),
            "Boolean" => "bool".into(),
            "List" | "ArrayList" | "LinkedList" => "list".into(),
            "Map" | "HashMap" | "TreeMap" => "dict".into(),
            "Set" | "HashSet" | "TreeSet" => "set".into(),
            _ => name.clone(),
        },
    }
}

fn escape_py_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn translate_src(src: &str) -> String {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let unit = Parser::new(tokens).parse().unwrap();
        Translator::new(TranslateConfig::default()).translate(&unit)
    }

    fn translate_stmts(src: &str) -> String {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let stmts = Parser::new(tokens).parse_statements().unwrap();
        Translator::new(TranslateConfig::default()).translate_statements(&stmts)
    }

    fn ty(src: &str) -> TypeName {
        let tokens = Lexer::new(&format!("{} x;", src)).tokenize().unwrap();
        let stmts = Parser::new(tokens).parse_statements().unwrap();
        match stmts.into_iter().next() {
            Some(Stmt::LocalDecl { ty, .. }) => ty,
            other => panic!("not a declaration: {:?}", other),
        }
    }

    #[test]
    fn test_type_mapping_table() {
        let translator = Translator::new(TranslateConfig::default());
        assert_eq!(translator.map_type(&ty("int")), "int");
        assert_eq!(translator.map_type(&ty("double")), "float");
        assert_eq!(translator.map_type(&ty("boolean")), "bool");
        assert_eq!(translator.map_type(&ty("String")), "str");
        assert_eq!(translator.map_type(&ty("int[]")), "list[int]");
        assert_eq!(translator.map_type(&ty("int[][]")), "list[list[int]]");
        assert_eq!(translator.map_type(&ty("List<String>")), "list[str]");
        assert_eq!(
            translator.map_type(&ty("Map<String, Integer>")),
            "dict[str, int]"
        );
        assert_eq!(translator.map_type(&ty("Set<Long>")), "set[int]");
        assert_eq!(translator.map_type(&ty("Optional<String>")), "str | None");
        assert_eq!(translator.map_type(&ty("List")), "list[Any]");
        assert_eq!(translator.map_type(&ty("Widget")), "Any");
        assert_eq!(
            translator.map_type(&ty("List<List<Integer>>")),
            "list[list[int]]"
        );
    }

    #[test]
    fn test_type_mapping_ignores_whitespace() {
        // The parser normalizes spelling, so both forms map identically
        let translator = Translator::new(TranslateConfig::default());
        let spaced = ty("List < String > []");
        let tight = ty("List<String>[]");
        assert_eq!(spaced, tight);
        assert_eq!(translator.map_type(&spaced), "list[list[str]]");
    }

    #[test]
    fn test_type_defaults() {
        let translator = Translator::new(TranslateConfig::default());
        assert_eq!(translator.type_default(&ty("int")), "0");
        assert_eq!(translator.type_default(&ty("double")), "0.0");
        assert_eq!(translator.type_default(&ty("boolean")), "False");
        assert_eq!(translator.type_default(&ty("String")), "\"\"");
        assert_eq!(translator.type_default(&ty("int[]")), "[]");
        assert_eq!(translator.type_default(&ty("Map<String, Integer>")), "{}");
        assert_eq!(translator.type_default(&ty("Set<Integer>")), "set()");
        assert_eq!(translator.type_default(&ty("Widget")), "None");
    }

    #[test]
    fn test_ternary_becomes_conditional_expression() {
        let out = translate_stmts("int r = c ? a : b;");
        assert_eq!(out, "r: int = a if c else b\n");
    }

    #[test]
    fn test_logical_operators() {
        let out = translate_stmts("boolean r = a && b || !c;");
        assert_eq!(out, "r: bool = a and b or not c\n");
    }

    #[test]
    fn test_precedence_parentheses_only_when_needed() {
        assert_eq!(translate_stmts("int r = a + b * c;"), "r: int = a + b * c\n");
        assert_eq!(
            translate_stmts("int r = (a + b) * c;"),
            "r: int = (a + b) * c\n"
        );
        assert_eq!(
            translate_stmts("boolean r = (a || b) && c;"),
            "r: bool = (a or b) and c\n"
        );
    }

    #[test]
    fn test_nested_comparison_is_parenthesized() {
        // Left-nested comparison would otherwise chain in Python
        assert_eq!(
            translate_stmts("boolean r = a == b == c;"),
            "r: bool = (a == b) == c\n"
        );
    }

    #[test]
    fn test_unsigned_shift_degrades_to_shift() {
        assert_eq!(translate_stmts("int r = a >>> n;"), "r: int = a >> n\n");
    }

    #[test]
    fn test_println_and_print() {
        assert_eq!(
            translate_stmts("System.out.println(x);"),
            "print(x)\n"
        );
        assert_eq!(
            translate_stmts("System.out.print(x);"),
            "print(x, end='')\n"
        );
        assert_eq!(translate_stmts("System.out.println();"), "print()\n");
    }

    #[test]
    fn test_list_of_and_as_list() {
        assert_eq!(
            translate_stmts("List<Integer> xs = List.of(1, 2, 3);"),
            "xs: list[int] = [1, 2, 3]\n"
        );
        assert_eq!(
            translate_stmts("List<Integer> xs = Arrays.asList(1, 2);"),
            "xs: list[int] = [1, 2]\n"
        );
    }

    #[test]
    fn test_collection_constructors() {
        assert_eq!(
            translate_stmts("List<String> xs = new ArrayList<>();"),
            "xs: list[str] = []\n"
        );
        assert_eq!(
            translate_stmts("Map<String, Integer> m = new HashMap<>();"),
            "m: dict[str, int] = {}\n"
        );
        assert_eq!(
            translate_stmts("Set<Integer> s = new HashSet<>();"),
            "s: set[int] = set()\n"
        );
    }

    #[test]
    fn test_new_array_and_initializer() {
        assert_eq!(
            translate_stmts("int[] a = new int[5];"),
            "a: list[int] = [0] * 5\n"
        );
        assert_eq!(
            translate_stmts("int[] a = new int[]{1, 2};"),
            "a: list[int] = [1, 2]\n"
        );
        assert_eq!(
            translate_stmts("int[] a = {1, 2, 3};"),
            "a: list[int] = [1, 2, 3]\n"
        );
    }

    #[test]
    fn test_length_and_size_become_len() {
        assert_eq!(translate_stmts("int n = arr.length;"), "n: int = len(arr)\n");
        assert_eq!(translate_stmts("int n = s.length();"), "n: int = len(s)\n");
        assert_eq!(translate_stmts("int n = xs.size();"), "n: int = len(xs)\n");
    }

    #[test]
    fn test_standalone_increment() {
        assert_eq!(translate_stmts("i++;"), "i += 1\n");
        assert_eq!(translate_stmts("--j;"), "j -= 1\n");
    }

    #[test]
    fn test_embedded_increment_is_hoisted() {
        assert_eq!(
            translate_stmts("x = a[i++];"),
            "i += 1\nx = a[i]\n"
        );
    }

    #[test]
    fn test_cast_rendering() {
        assert_eq!(translate_stmts("int r = (int) x;"), "r: int = int(x)\n");
        assert_eq!(
            translate_stmts("double r = (double) x;"),
            "r: float = float(x)\n"
        );
        // Reference casts vanish
        assert_eq!(translate_stmts("Widget w = (Widget) x;"), "w: Any = x\n");
    }

    #[test]
    fn test_instanceof() {
        assert_eq!(
            translate_stmts("boolean b = x instanceof String;"),
            "b: bool = isinstance(x, str)\n"
        );
        assert_eq!(
            translate_stmts("boolean b = x instanceof Widget;"),
            "b: bool = isinstance(x, Widget)\n"
        );
    }

    #[test]
    fn test_throw_becomes_raise() {
        assert_eq!(
            translate_stmts("throw new RuntimeException(\"boom\");"),
            "raise RuntimeException(\"boom\")\n"
        );
    }

    #[test]
    fn test_do_while() {
        let out = translate_stmts("do { work(); } while (busy);");
        assert_eq!(
            out,
            "while True:\n    work()\n    if not (busy):\n        break\n"
        );
    }

    #[test]
    fn test_for_range_inclusive_bound() {
        assert_eq!(
            translate_stmts("for (int i = 0; i <= 3; i++) f(i);"),
            "for i in range(0, 4):\n    f(i)\n"
        );
        assert_eq!(
            translate_stmts("for (int i = 10; i > 0; i--) f(i);"),
            "for i in range(10, 0, -1):\n    f(i)\n"
        );
    }

    #[test]
    fn test_for_fallback_to_while() {
        let out = translate_stmts("for (int i = 0; i < n; i += 2) f(i);");
        assert_eq!(
            out,
            "i: int = 0\nwhile i < n:\n    f(i)\n    i += 2\n"
        );
    }

    #[test]
    fn test_for_without_clauses() {
        let out = translate_stmts("for (;;) spin();");
        assert_eq!(out, "while True:\n    spin()\n");
    }

    #[test]
    fn test_static_method_and_field() {
        let out = translate_src(
            "class C { static int count = 0; static int next() { count++; return count; } }",
        );
        assert_eq!(
            out,
            "class C:\n    count: int = 0\n\n    @staticmethod\n    def next() -> int:\n        count += 1\n        return count\n"
        );
    }

    #[test]
    fn test_hints_can_be_disabled() {
        let config = TranslateConfig {
            emit_type_hints: false,
            ..TranslateConfig::default()
        };
        let tokens = Lexer::new("class Foo { private int x; public Foo(int x) { this.x = x; } }")
            .tokenize()
            .unwrap();
        let unit = Parser::new(tokens).parse().unwrap();
        let out = Translator::new(config).translate(&unit);
        assert_eq!(out, "class Foo:\n    def __init__(self, x):\n        self.x = x\n");
    }

    #[test]
    fn test_translator_is_deterministic() {
        let src = "class A { int x = 1; void f() { for (int i = 0; i < x; i++) g(i); } }";
        assert_eq!(translate_src(src), translate_src(src));
    }

    #[test]
    fn test_conditional_field_assignment_still_injects_default() {
        let out = translate_src(
            "class C { int x; C(boolean p) { if (p) { x = 1; } } }",
        );
        assert_eq!(
            out,
            "class C:\n    def __init__(self, p: bool):\n        self.x: int = 0\n        if p:\n            self.x: int = 1\n"
        );
    }

    #[test]
    fn test_custom_indent() {
        let config = TranslateConfig {
            indent: "  ".into(),
            ..TranslateConfig::default()
        };
        let tokens = Lexer::new("class A {}").tokenize().unwrap();
        let unit = Parser::new(tokens).parse().unwrap();
        let out = Translator::new(config).translate(&unit);
        assert_eq!(out, "class A:\n  pass\n");
    }
}
