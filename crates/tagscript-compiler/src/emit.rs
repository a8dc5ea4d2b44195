//! Émission JavaScript.
//!
//! Deux formes :
//! - **lisible** : indentation de 4 espaces, une instruction par ligne,
//!   `function (x) { return x; }` sur une ligne quand le corps est un seul `return` simple ;
//! - **compacte** : aucun blanc facultatif, `;` final retiré avant `}`.
//!
//! Les parenthèses sont recalculées à partir des précédences de [`tagscript_ast::prec`].

use tagscript_ast::{
    format_number, prec, AttrValue, BinaryOp, Child, Element, Export, Expr, Function, FunctionBody, Import,
    LogicalOp, MemberProp, Program, Prop, PropKey, PropKind, Stmt, UnaryOp, VarDecl, VarKind,
};

/// Prologue strict émis en tête des modules CommonJS.
pub const STRICT_PROLOGUE: &str = "\"use strict\";";

/// Forme de sortie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Forme compacte (minification).
    pub compact: bool,
    /// Écrire [`STRICT_PROLOGUE`] en tête.
    pub strict_prologue: bool,
}

/// Imprime `program`.
pub fn emit_program(program: &Program, opts: EmitOptions) -> String {
    let mut e = Emitter::new(opts);
    e.program(program);
    e.finish()
}

/// Chaîne JavaScript entre guillemets doubles.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/* ─────────────────────────── Émetteur ─────────────────────────── */

/// Tampon de sortie + état d’indentation.
#[derive(Debug)]
pub struct Emitter {
    out: String,
    indent: usize,
    opts: EmitOptions,
}

fn is_word(c: char) -> bool { c.is_alphanumeric() || c == '_' || c == '$' || !c.is_ascii() }

/// Deux fragments accolés fusionneraient en un autre jeton.
fn needs_space(prev: char, next: char) -> bool {
    (is_word(prev) && is_word(next)) || (prev == '+' && next == '+') || (prev == '-' && next == '-')
}

impl Emitter {
    /// Émetteur vide.
    pub fn new(opts: EmitOptions) -> Self { Self { out: String::new(), indent: 0, opts } }

    /// Texte produit.
    pub fn finish(self) -> String { self.out }

    /// Programme complet.
    pub fn program(&mut self, program: &Program) {
        if self.opts.strict_prologue {
            self.write(STRICT_PROLOGUE);
        }
        for s in &program.body {
            self.line();
            self.stmt(s);
        }
    }

    fn write(&mut self, s: &str) {
        if let (Some(prev), Some(next)) = (self.out.chars().next_back(), s.chars().next()) {
            if needs_space(prev, next) {
                self.out.push(' ');
            }
        }
        self.out.push_str(s);
    }

    fn sp(&mut self) {
        if !self.opts.compact {
            self.out.push(' ');
        }
    }

    fn line(&mut self) {
        if self.opts.compact {
            return;
        }
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn comma(&mut self) {
        self.write(",");
        self.sp();
    }

    /* ───── Instructions ───── */

    fn stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::Var { kind, decls } => {
                self.var_decl(*kind, decls);
                self.write(";");
            }
            Stmt::Function(f) => self.function(f, None),
            Stmt::Expr(e) => {
                if starts_ambiguously(e) {
                    self.write("(");
                    self.expr(e, 0);
                    self.write(")");
                } else {
                    self.expr(e, 0);
                }
                self.write(";");
            }
            Stmt::Return(e) => {
                self.write("return");
                if let Some(e) = e {
                    self.sp();
                    self.expr(e, 0);
                }
                self.write(";");
            }
            Stmt::If { test, then, otherwise } => {
                self.write("if");
                self.sp();
                self.paren(test);
                // `if (a) if (b) x; else y;` : le else appartiendrait au if interne
                let force_block = otherwise.is_some() && matches!(**then, Stmt::If { otherwise: None, .. });
                self.body(then, force_block);
                if let Some(o) = otherwise {
                    if force_block || matches!(**then, Stmt::Block(_)) {
                        self.sp();
                    } else {
                        self.line();
                    }
                    self.write("else");
                    if matches!(**o, Stmt::If { .. }) {
                        self.sp();
                        self.stmt(o);
                    } else {
                        self.body(o, false);
                    }
                }
            }
            Stmt::Block(stmts) => self.block(stmts),
            Stmt::While { test, body } => {
                self.write("while");
                self.sp();
                self.paren(test);
                self.body(body, false);
            }
            Stmt::For { init, test, update, body } => {
                self.write("for");
                self.sp();
                self.write("(");
                match init.as_deref() {
                    Some(Stmt::Var { kind, decls }) => self.var_decl(*kind, decls),
                    Some(Stmt::Expr(e)) => self.expr(e, 0),
                    _ => {}
                }
                self.write(";");
                if let Some(t) = test {
                    self.sp();
                    self.expr(t, 0);
                }
                self.write(";");
                if let Some(u) = update {
                    self.sp();
                    self.expr(u, 0);
                }
                self.write(")");
                self.body(body, false);
            }
            Stmt::ForOf { kind, name, iter, body } => {
                self.write("for");
                self.sp();
                self.write("(");
                self.write(kind.keyword());
                self.sp();
                self.write(name);
                self.sp();
                self.write("of");
                self.sp();
                self.expr(iter, prec::ASSIGN);
                self.write(")");
                self.body(body, false);
            }
            Stmt::Break => self.write("break;"),
            Stmt::Continue => self.write("continue;"),
            Stmt::Throw(e) => {
                self.write("throw");
                self.sp();
                self.expr(e, 0);
                self.write(";");
            }
            Stmt::Try { block, handler, finalizer } => {
                self.write("try");
                self.sp();
                self.block(block);
                if let Some(h) = handler {
                    self.sp();
                    self.write("catch");
                    if let Some(p) = &h.param {
                        self.sp();
                        self.write("(");
                        self.write(p);
                        self.write(")");
                    }
                    self.sp();
                    self.block(&h.body);
                }
                if let Some(f) = finalizer {
                    self.sp();
                    self.write("finally");
                    self.sp();
                    self.block(f);
                }
            }
            Stmt::Import(imp) => self.import(imp),
            Stmt::Export(exp) => self.export(exp),
            Stmt::TypeDecl { .. } => {}
            Stmt::Empty => self.write(";"),
        }
    }

    fn paren(&mut self, e: &Expr) {
        self.write("(");
        self.expr(e, 0);
        self.write(")");
    }

    fn var_decl(&mut self, kind: VarKind, decls: &[VarDecl]) {
        self.write(kind.keyword());
        self.sp();
        for (i, d) in decls.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.write(&d.name);
            if let Some(init) = &d.init {
                self.assign_sign();
                self.expr(init, prec::ASSIGN);
            }
        }
    }

    fn assign_sign(&mut self) {
        self.sp();
        self.write("=");
        self.sp();
    }

    /// Corps d’une structure de contrôle.
    fn body(&mut self, s: &Stmt, force_block: bool) {
        match s {
            Stmt::Block(stmts) => {
                self.sp();
                self.block(stmts);
            }
            _ if force_block => {
                self.sp();
                self.block(std::slice::from_ref(s));
            }
            Stmt::Empty => self.write(";"),
            other => {
                self.indent += 1;
                self.line();
                self.stmt(other);
                self.indent -= 1;
            }
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        self.write("{");
        if stmts.is_empty() {
            self.sp();
            self.write("}");
            return;
        }
        self.indent += 1;
        for s in stmts {
            self.line();
            self.stmt(s);
        }
        self.indent -= 1;
        self.line();
        if self.opts.compact && self.out.ends_with(';') && !stmts.last().is_some_and(ends_with_empty) {
            self.out.pop();
        }
        self.write("}");
    }

    fn function_body(&mut self, stmts: &[Stmt]) {
        if self.opts.compact || !single_line_body(stmts) {
            self.block(stmts);
            return;
        }
        self.write("{");
        for s in stmts {
            self.out.push(' ');
            self.stmt(s);
        }
        self.out.push_str(" }");
    }

    fn import(&mut self, imp: &Import) {
        self.write("import");
        self.sp();
        if imp.default.is_none() && imp.namespace.is_none() && imp.named.is_empty() {
            self.write(&quote(&imp.source));
            self.write(";");
            return;
        }
        let mut first = true;
        if let Some(d) = &imp.default {
            self.write(d);
            first = false;
        }
        if let Some(ns) = &imp.namespace {
            if !first {
                self.comma();
            }
            self.write("*");
            self.sp();
            self.write("as");
            self.sp();
            self.write(ns);
            first = false;
        }
        if !imp.named.is_empty() {
            if !first {
                self.comma();
            }
            self.write("{");
            self.sp();
            for (i, s) in imp.named.iter().enumerate() {
                if i > 0 {
                    self.comma();
                }
                self.write(&s.imported);
                if s.local != s.imported {
                    self.sp();
                    self.write("as");
                    self.sp();
                    self.write(&s.local);
                }
            }
            self.sp();
            self.write("}");
        }
        self.sp();
        self.write("from");
        self.sp();
        self.write(&quote(&imp.source));
        self.write(";");
    }

    fn export(&mut self, exp: &Export) {
        self.write("export");
        self.sp();
        match exp {
            Export::Default(e) => {
                self.write("default");
                self.sp();
                self.expr(e, prec::ASSIGN);
                self.write(";");
            }
            Export::DefaultFunction(f) => {
                self.write("default");
                self.sp();
                self.function(f, None);
            }
            Export::Decl(s) => self.stmt(s),
            Export::Named(specs) => {
                self.write("{");
                for (i, s) in specs.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                    }
                    self.sp();
                    self.write(&s.local);
                    if s.local != s.exported {
                        self.sp();
                        self.write("as");
                        self.sp();
                        self.write(&s.exported);
                    }
                }
                if !specs.is_empty() {
                    self.sp();
                }
                self.write("};");
            }
        }
    }

    /* ───── Fonctions ───── */

    fn function(&mut self, f: &Function, method_key: Option<&PropKey>) {
        if f.is_async {
            self.write("async");
            self.sp();
        }
        if f.is_arrow {
            match f.params.as_slice() {
                [p] if p.default.is_none() => self.write(&p.name),
                _ => self.params(f),
            }
            self.sp();
            self.write("=>");
            self.sp();
            match &f.body {
                FunctionBody::Expr(e) if matches!(leftmost(e), Expr::Object(_)) => self.paren(e),
                FunctionBody::Expr(e) => self.expr(e, prec::ASSIGN),
                FunctionBody::Block(stmts) => self.function_body(stmts),
            }
            return;
        }
        match method_key {
            Some(key) => self.prop_key(key),
            None => {
                self.write("function");
                self.sp();
                if let Some(name) = &f.name {
                    self.write(name);
                }
            }
        }
        self.params(f);
        self.sp();
        match &f.body {
            FunctionBody::Block(stmts) => self.function_body(stmts),
            // corps concis hors flèche : seulement après réécriture partielle
            FunctionBody::Expr(e) => self.function_body(&[Stmt::Return(Some((**e).clone()))]),
        }
    }

    fn params(&mut self, f: &Function) {
        self.write("(");
        for (i, p) in f.params.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.write(&p.name);
            if let Some(d) = &p.default {
                self.assign_sign();
                self.expr(d, prec::ASSIGN);
            }
        }
        self.write(")");
    }

    fn prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) => self.write(name),
            PropKey::Str(s) => self.write(&quote(s)),
            PropKey::Num(n) => self.write(&format_number(*n)),
        }
    }

    /* ───── Expressions ───── */

    /// Écrit `e`, entre parenthèses si sa précédence est inférieure à `min`.
    pub fn expr(&mut self, e: &Expr, min: u8) {
        if precedence(e) < min {
            self.write("(");
            self.expr_inner(e);
            self.write(")");
        } else {
            self.expr_inner(e);
        }
    }

    fn expr_inner(&mut self, e: &Expr) {
        match e {
            Expr::Num(n) => self.write(&format_number(*n)),
            Expr::Str(s) => self.write(&quote(s)),
            Expr::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Expr::Null => self.write("null"),
            Expr::Ident(name) => self.write(name),
            Expr::Array(items) => {
                self.write("[");
                self.list(items);
                self.write("]");
            }
            Expr::Object(props) => self.object(props),
            Expr::Function(f) => self.function(f, None),
            Expr::Unary { op, expr } => {
                self.write(op.as_str());
                if matches!(op, UnaryOp::Typeof | UnaryOp::Void) {
                    self.sp();
                }
                self.expr(expr, prec::UNARY);
            }
            Expr::Update { op, prefix, target } => {
                if *prefix {
                    self.write(op.as_str());
                    self.expr(target, prec::UNARY);
                } else {
                    self.expr(target, prec::POSTFIX);
                    self.write(op.as_str());
                }
            }
            Expr::Binary { op, left, right } => {
                let p = op.precedence();
                let (lmin, rmin) = if *op == BinaryOp::Pow { (prec::UNARY + 1, p) } else { (p, p + 1) };
                self.expr(left, lmin);
                self.operator(op.as_str());
                self.expr(right, rmin);
            }
            Expr::Logical { op, left, right } => {
                let p = op.precedence();
                self.expr(left, logical_min(*op, left, p));
                self.operator(op.as_str());
                self.expr(right, logical_min(*op, right, p + 1));
            }
            Expr::Cond { test, then, otherwise } => {
                self.expr(test, prec::OR);
                self.operator("?");
                self.expr(then, prec::ASSIGN);
                self.operator(":");
                self.expr(otherwise, prec::ASSIGN);
            }
            Expr::Assign { op, target, value } => {
                self.expr(target, prec::POSTFIX);
                self.operator(op.as_str());
                self.expr(value, prec::ASSIGN);
            }
            Expr::Call { callee, args } => {
                self.expr(callee, prec::CALL);
                self.write("(");
                self.list(args);
                self.write(")");
            }
            Expr::New { callee, args } => {
                self.write("new");
                self.sp();
                if new_callee_needs_parens(callee) {
                    self.paren(callee);
                } else {
                    self.expr(callee, prec::CALL);
                }
                self.write("(");
                self.list(args);
                self.write(")");
            }
            Expr::Member { object, prop } => {
                if matches!(**object, Expr::Num(_)) {
                    self.paren(object);
                } else {
                    self.expr(object, prec::CALL);
                }
                match prop {
                    MemberProp::Name(name) => {
                        self.write(".");
                        self.write(name);
                    }
                    MemberProp::Computed(index) => {
                        self.write("[");
                        self.expr(index, 0);
                        self.write("]");
                    }
                }
            }
            Expr::Await(inner) => {
                self.write("await");
                self.sp();
                self.expr(inner, prec::UNARY);
            }
            Expr::Markup(el) => self.element(el),
            Expr::TypeAssert(inner) => self.expr_inner(inner),
        }
    }

    fn operator(&mut self, op: &str) {
        self.sp();
        self.write(op);
        self.sp();
    }

    fn list(&mut self, items: &[Expr]) {
        for (i, e) in items.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.expr(e, prec::ASSIGN);
        }
    }

    fn object(&mut self, props: &[Prop]) {
        if props.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.sp();
        for (i, p) in props.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            match (p.kind, &p.value) {
                (PropKind::Shorthand, _) => self.prop_key(&p.key),
                (PropKind::Method, Expr::Function(f)) => self.function(f, Some(&p.key)),
                _ => {
                    self.prop_key(&p.key);
                    self.write(":");
                    self.sp();
                    self.expr(&p.value, prec::ASSIGN);
                }
            }
        }
        self.sp();
        self.write("}");
    }

    fn element(&mut self, el: &Element) {
        let name = el.name.as_deref().unwrap_or("");
        self.write("<");
        self.out.push_str(name);
        for a in &el.attrs {
            self.out.push(' ');
            self.out.push_str(&a.name);
            match &a.value {
                None => {}
                Some(AttrValue::Str(s)) => {
                    let q = if s.contains('"') { '\'' } else { '"' };
                    self.out.push('=');
                    self.out.push(q);
                    self.out.push_str(s);
                    self.out.push(q);
                }
                Some(AttrValue::Expr(e)) => {
                    self.out.push_str("={");
                    self.expr(e, prec::ASSIGN);
                    self.out.push('}');
                }
            }
        }
        if el.children.is_empty() && el.name.is_some() {
            self.out.push_str(" />");
            return;
        }
        self.out.push('>');
        for c in &el.children {
            match c {
                Child::Text(t) => self.out.push_str(t),
                Child::Expr(e) => {
                    self.out.push('{');
                    self.expr(e, prec::ASSIGN);
                    self.out.push('}');
                }
                Child::Element(child) => self.element(child),
            }
        }
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }
}

/* ─────────────────────────── Précédences ─────────────────────────── */

fn precedence(e: &Expr) -> u8 {
    match e {
        Expr::Num(n) if n.is_sign_negative() && *n != 0.0 => prec::UNARY,
        Expr::Num(_)
        | Expr::Str(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Ident(_)
        | Expr::Array(_)
        | Expr::Object(_)
        | Expr::Markup(_) => prec::PRIMARY,
        Expr::Function(f) if f.is_arrow => prec::ASSIGN,
        Expr::Function(_) => prec::PRIMARY,
        Expr::Unary { .. } | Expr::Await(_) | Expr::Update { prefix: true, .. } => prec::UNARY,
        Expr::Update { .. } => prec::POSTFIX,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Logical { op, .. } => op.precedence(),
        Expr::Cond { .. } => prec::CONDITIONAL,
        Expr::Assign { .. } => prec::ASSIGN,
        Expr::Call { .. } | Expr::New { .. } | Expr::Member { .. } => prec::CALL,
        Expr::TypeAssert(inner) => precedence(inner),
    }
}

/// `??` ne se mélange pas à `&&`/`||` sans parenthèses.
fn logical_min(parent: LogicalOp, child: &Expr, min: u8) -> u8 {
    match child {
        Expr::Logical { op, .. } if (parent == LogicalOp::Nullish) != (*op == LogicalOp::Nullish) => prec::PRIMARY,
        _ => min,
    }
}

fn new_callee_needs_parens(e: &Expr) -> bool {
    match e {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => new_callee_needs_parens(object),
        other => precedence(other) < prec::CALL,
    }
}

/// Expression la plus à gauche, telle qu’imprimée en tête.
fn leftmost(e: &Expr) -> &Expr {
    match e {
        Expr::Binary { left, .. } | Expr::Logical { left, .. } => leftmost(left),
        Expr::Cond { test, .. } => leftmost(test),
        Expr::Assign { target, .. } => leftmost(target),
        Expr::Call { callee, .. } => leftmost(callee),
        Expr::Member { object, .. } => leftmost(object),
        Expr::Update { prefix: false, target, .. } => leftmost(target),
        Expr::TypeAssert(inner) => leftmost(inner),
        other => other,
    }
}

/// Une instruction-expression commençant par `{` ou `function` serait lue comme bloc/déclaration.
fn starts_ambiguously(e: &Expr) -> bool {
    match leftmost(e) {
        Expr::Object(_) => true,
        Expr::Function(f) => !f.is_arrow,
        _ => false,
    }
}

fn ends_with_empty(s: &Stmt) -> bool {
    match s {
        Stmt::Empty => true,
        Stmt::If { then, otherwise, .. } => otherwise.as_deref().map_or_else(|| ends_with_empty(then), ends_with_empty),
        Stmt::While { body, .. } | Stmt::For { body, .. } | Stmt::ForOf { body, .. } => ends_with_empty(body),
        Stmt::Export(Export::Decl(inner)) => ends_with_empty(inner),
        _ => false,
    }
}

/* ─────────────────────────── Corps sur une ligne ─────────────────────────── */

fn single_line_body(stmts: &[Stmt]) -> bool {
    match stmts {
        [] => true,
        [Stmt::Return(e)] => e.as_ref().map_or(true, inline_expr),
        _ => false,
    }
}

fn inline_expr(e: &Expr) -> bool {
    match e {
        Expr::Function(f) => {
            f.params.iter().all(|p| p.default.as_ref().map_or(true, inline_expr))
                && match &f.body {
                    FunctionBody::Block(stmts) => single_line_body(stmts),
                    FunctionBody::Expr(e) => inline_expr(e),
                }
        }
        Expr::Array(items) => items.iter().all(inline_expr),
        Expr::Object(props) => props.iter().all(|p| inline_expr(&p.value)),
        Expr::Unary { expr, .. } | Expr::Await(expr) | Expr::TypeAssert(expr) => inline_expr(expr),
        Expr::Update { target, .. } => inline_expr(target),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => inline_expr(left) && inline_expr(right),
        Expr::Cond { test, then, otherwise } => inline_expr(test) && inline_expr(then) && inline_expr(otherwise),
        Expr::Assign { target, value, .. } => inline_expr(target) && inline_expr(value),
        Expr::Call { callee, args } | Expr::New { callee, args } => inline_expr(callee) && args.iter().all(inline_expr),
        Expr::Member { object, prop } => {
            inline_expr(object)
                && match prop {
                    MemberProp::Name(_) => true,
                    MemberProp::Computed(i) => inline_expr(i),
                }
        }
        Expr::Num(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Ident(_) | Expr::Markup(_) => true,
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagscript_parser::{parse, ParseOptions};

    fn pretty(src: &str) -> String {
        let p = parse(src, ParseOptions::source()).unwrap();
        emit_program(&p, EmitOptions::default())
    }

    fn compact(src: &str) -> String {
        let p = parse(src, ParseOptions::source()).unwrap();
        emit_program(&p, EmitOptions { compact: true, strict_prologue: false })
    }

    #[test]
    fn statements_layout() {
        assert_eq!(
            pretty("if (a) { b(); } else if (c) d(); else { e(); }"),
            "if (a) {\n    b();\n} else if (c)\n    d();\nelse {\n    e();\n}"
        );
        assert_eq!(
            pretty("try { f() } catch (e) { g(e) } finally { h() }"),
            "try {\n    f();\n} catch (e) {\n    g(e);\n} finally {\n    h();\n}"
        );
        assert_eq!(pretty("while (x) ;"), "while (x);");
        assert_eq!(pretty("for (let i = 0; i < n; i++) {}"), "for (let i = 0; i < n; i++) { }");
    }

    #[test]
    fn parentheses_follow_precedence() {
        assert_eq!(pretty("x = (a + b) * c - (d - e);"), "x = (a + b) * c - (d - e);");
        assert_eq!(pretty("x = a - (b + c);"), "x = a - (b + c);");
        assert_eq!(pretty("x = (a, b) => ({ a });"), "x = (a, b) => ({ a });");
        assert_eq!(pretty("x = (a ?? b) || c;"), "x = (a ?? b) || c;");
        assert_eq!(pretty("x = (-a) ** b;"), "x = (-a) ** b;");
        assert_eq!(pretty("x = new (f())();"), "x = new (f())();");
        assert_eq!(pretty("x = new a.B(1);"), "x = new a.B(1);");
        assert_eq!(pretty("x = (1).toString();"), "x = (1).toString();");
        assert_eq!(pretty("x = typeof a === \"string\" ? !b : void 0;"), "x = typeof a === \"string\" ? !b : void 0;");
    }

    #[test]
    fn ambiguous_statement_starts_are_wrapped() {
        assert_eq!(pretty("({ a: 1 }).a;"), "({ a: 1 }.a);");
        assert_eq!(pretty("(function () {})();"), "(function () { }());");
    }

    #[test]
    fn dangling_else_gets_a_block() {
        let p = tagscript_ast::Program {
            body: vec![Stmt::If {
                test: Expr::ident("a"),
                then: Box::new(Stmt::If {
                    test: Expr::ident("b"),
                    then: Box::new(Stmt::Expr(Expr::ident("x"))),
                    otherwise: None,
                }),
                otherwise: Some(Box::new(Stmt::Expr(Expr::ident("y")))),
            }],
        };
        assert_eq!(
            emit_program(&p, EmitOptions { compact: true, strict_prologue: false }),
            "if(a){if(b)x}else y;"
        );
    }

    #[test]
    fn compact_form() {
        assert_eq!(compact("function f(a, b) { return a + b; }"), "function f(a,b){return a+b}");
        assert_eq!(compact("x = a - -b + +c;"), "x=a- -b+ +c;");
        assert_eq!(compact("var o = { a: 1, b: [1, 2] };"), "var o={a:1,b:[1,2]};");
        assert_eq!(compact("for (;;) ;"), "for(;;);");
        assert_eq!(compact("function g() { for (;;) ; }"), "function g(){for(;;);}");
        assert_eq!(compact("x = typeof y;"), "x=typeof y;");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(quote("\u{1}"), "\"\\u0001\"");
        assert_eq!(pretty("x = 'it\\'s';"), "x = \"it's\";");
    }

    #[test]
    fn preserved_markup() {
        assert_eq!(
            pretty("x = <a href=\"/\" on={f}>hi {n}<br /></a>;"),
            "x = <a href=\"/\" on={f}>hi {n}<br /></a>;"
        );
        assert_eq!(pretty("x = <></>;"), "x = <></>;");
    }

    #[test]
    fn module_items_in_esm_form() {
        assert_eq!(
            pretty("import d, { a as b } from \"m\"; export { b as c }; export default 1;"),
            "import d, { a as b } from \"m\";\nexport { b as c };\nexport default 1;"
        );
    }

    #[test]
    fn strict_prologue_is_first() {
        let p = parse("a();", ParseOptions::portable()).unwrap();
        let out = emit_program(&p, EmitOptions { compact: false, strict_prologue: true });
        assert_eq!(out, "\"use strict\";\na();");
    }
}
