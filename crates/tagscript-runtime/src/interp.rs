//! Interpréteur arborescent du code portable.
//!
//! Modèle d’exécution :
//! - `var` et déclarations de fonction hissées, `let`/`const` en zone morte
//!   jusqu’à leur initialisation ;
//! - fermetures par capture de portée (et du texte source qui les définit) ;
//! - fonctions `async` exécutées jusqu’au bout, rendant une promesse réglée ;
//! - échéance murale vérifiée toutes les [`TICK_INTERVAL`] étapes, profondeur
//!   d’appel bornée.

use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;
use tagscript_ast::{
    AssignOp, BinaryOp, CatchClause, Expr, Function, FunctionBody, LogicalOp, MemberProp, Program, Prop, PropKind, Stmt,
    UnaryOp, UpdateOp, VarDecl, VarKind,
};

use crate::builtins;
use crate::error::{ExecError, Exception};
use crate::policy::Limits;
use crate::scope::Scope;
use crate::value::{Closure, PromiseState, Value, MAX_STRING_LENGTH};

/// Nombre d’étapes entre deux lectures de l’horloge.
pub const TICK_INTERVAL: u32 = 1024;

/// Issue d’une instruction.
#[derive(Debug)]
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

type Exec = Result<Flow, Exception>;

/// État d’une évaluation : échéance, profondeur, texte source courant.
pub struct Interpreter {
    limits: Limits,
    deadline: Option<Instant>,
    ticks: u32,
    depth: usize,
    source: Rc<str>,
}

impl Interpreter {
    /// Nouvel interpréteur ; l’échéance part de maintenant.
    pub fn new(limits: Limits, source: Rc<str>) -> Self {
        Self { limits, deadline: Instant::now().checked_add(limits.timeout), ticks: 0, depth: 0, source }
    }

    /// Limites appliquées.
    pub const fn limits(&self) -> Limits { self.limits }

    fn tick(&mut self) -> Result<(), Exception> {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % TICK_INTERVAL == 0 {
            self.check_deadline()?;
        }
        Ok(())
    }

    fn check_deadline(&self) -> Result<(), Exception> {
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Exception::Timeout(self.limits.timeout)),
            _ => Ok(()),
        }
    }

    /* ───────────────────────── Programme ───────────────────────── */

    /// Exécute un programme dans `scope`.
    pub fn run_program(&mut self, program: &Program, scope: &Scope) -> Result<(), Exception> {
        hoist_vars(&program.body, scope);
        self.hoist_block(&program.body, scope);
        self.check_deadline()?;
        for stmt in &program.body {
            if let Flow::Return(_) = self.exec(stmt, scope)? {
                break;
            }
        }
        Ok(())
    }

    fn closure(&self, func: &Rc<Function>, scope: &Scope) -> Value {
        Value::Function(Rc::new(Closure {
            func: Rc::clone(func),
            env: scope.clone(),
            source: Rc::clone(&self.source),
            limits: self.limits,
        }))
    }

    /// Déclarations de bloc : fonctions initialisées, `let`/`const` réservés.
    fn hoist_block(&self, stmts: &[Stmt], scope: &Scope) {
        for stmt in stmts {
            match stmt {
                Stmt::Var { kind: kind @ (VarKind::Let | VarKind::Const), decls } => {
                    for d in decls {
                        scope.declare_uninit(&d.name, *kind == VarKind::Let);
                    }
                }
                Stmt::Function(f) => {
                    if let Some(name) = &f.name {
                        scope.declare(name, self.closure(f, scope), true);
                    }
                }
                _ => {}
            }
        }
    }

    fn exec_scoped(&mut self, stmts: &[Stmt], scope: &Scope) -> Exec {
        let inner = scope.child();
        self.hoist_block(stmts, &inner);
        self.exec_block(stmts, &inner)
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Scope) -> Exec {
        for stmt in stmts {
            match self.exec(stmt, scope)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /* ───────────────────────── Instructions ───────────────────────── */

    fn exec(&mut self, stmt: &Stmt, scope: &Scope) -> Exec {
        self.tick()?;
        match stmt {
            Stmt::Var { kind, decls } => self.exec_var(*kind, decls, scope),
            Stmt::Function(_) | Stmt::TypeDecl { .. } | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expr(e) => {
                self.eval(e, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(e) => {
                let v = match e {
                    Some(e) => self.eval(e, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(v))
            }
            Stmt::If { test, then, otherwise } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec(then, scope)
                } else if let Some(o) = otherwise {
                    self.exec(o, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(stmts) => self.exec_scoped(stmts, scope),
            Stmt::While { test, body } => {
                loop {
                    self.tick()?;
                    if !self.eval(test, scope)?.truthy() {
                        break;
                    }
                    match self.exec(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { init, test, update, body } => self.exec_for(init.as_deref(), test.as_ref(), update.as_ref(), body, scope),
            Stmt::ForOf { kind, name, iter, body } => self.exec_for_of(*kind, name, iter, body, scope),
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(e) => Err(Exception::Throw(self.eval(e, scope)?)),
            Stmt::Try { block, handler, finalizer } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), scope),
            Stmt::Import(_) => Err(Exception::error("SyntaxError", "Cannot use import statement outside a module")),
            Stmt::Export(_) => Err(Exception::error("SyntaxError", "Unexpected token 'export'")),
        }
    }

    // Branches volumineuses hors de `exec`/`eval` : ces deux cadres s’empilent
    // à chaque appel du script.

    fn exec_var(&mut self, kind: VarKind, decls: &[VarDecl], scope: &Scope) -> Exec {
        for d in decls {
            match (kind, &d.init) {
                (VarKind::Var, None) => {}
                (VarKind::Var, Some(init)) => {
                    let v = self.eval(init, scope)?;
                    assign_var(scope, &d.name, v)?;
                }
                (_, init) => {
                    let v = match init {
                        Some(e) => self.eval(e, scope)?,
                        None => Value::Undefined,
                    };
                    scope.initialize(&d.name, v);
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for_of(&mut self, kind: VarKind, name: &str, iter: &Expr, body: &Stmt, scope: &Scope) -> Exec {
        let items = iterate(&self.eval(iter, scope)?)?;
        for item in items {
            self.tick()?;
            let iteration = scope.child();
            match kind {
                VarKind::Var => assign_var(scope, name, item)?,
                k => iteration.declare(name, item, k == VarKind::Let),
            }
            match self.exec(body, &iteration)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_try(&mut self, block: &[Stmt], handler: Option<&CatchClause>, finalizer: Option<&[Stmt]>, scope: &Scope) -> Exec {
        let mut result = self.exec_scoped(block, scope);
        if let (Err(Exception::Throw(thrown)), Some(h)) = (&result, handler) {
            let catch_scope = scope.child();
            if let Some(param) = &h.param {
                catch_scope.declare(param, thrown.clone(), true);
            }
            result = self.exec_scoped(&h.body, &catch_scope);
        }
        match finalizer {
            // l’échéance traverse `finally`
            Some(_) if matches!(result, Err(Exception::Timeout(_))) => result,
            Some(f) => match self.exec_scoped(f, scope)? {
                Flow::Normal => result,
                other => Ok(other),
            },
            None => result,
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Scope,
    ) -> Exec {
        let mut current = scope.child();
        let per_iteration = matches!(init, Some(Stmt::Var { kind: VarKind::Let | VarKind::Const, .. }));
        if let Some(init) = init {
            self.hoist_block(std::slice::from_ref(init), &current);
            self.exec(init, &current)?;
        }
        if per_iteration {
            current = current.sibling_copy();
        }
        loop {
            self.tick()?;
            if let Some(t) = test {
                if !self.eval(t, &current)?.truthy() {
                    break;
                }
            }
            match self.exec(body, &current)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
            // chaque itération voit sa propre copie des liaisons `let`
            if per_iteration {
                current = current.sibling_copy();
            }
            if let Some(u) = update {
                self.eval(u, &current)?;
            }
        }
        Ok(Flow::Normal)
    }

    /* ───────────────────────── Expressions ───────────────────────── */

    /// Évalue une expression.
    pub fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, Exception> {
        match expr {
            Expr::Num(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::string(s.as_str())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => scope.get(name),
            Expr::Array(items) => {
                let items = items.iter().map(|e| self.eval(e, scope)).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(items))
            }
            Expr::Object(props) => self.eval_object(props, scope),
            Expr::Function(f) => Ok(self.closure(f, scope)),
            Expr::Unary { op, expr } => self.eval_unary(*op, expr, scope),
            Expr::Update { op, prefix, target } => self.eval_update(*op, *prefix, target, scope),
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                binary(*op, &l, &r)
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left, scope)?;
                let short = match op {
                    LogicalOp::And => !l.truthy(),
                    LogicalOp::Or => l.truthy(),
                    LogicalOp::Nullish => !l.is_nullish(),
                };
                if short { Ok(l) } else { self.eval(right, scope) }
            }
            Expr::Cond { test, then, otherwise } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value, scope),
            Expr::Call { callee, args } => self.eval_call(callee, args, false, scope),
            Expr::New { callee, args } => self.eval_call(callee, args, true, scope),
            Expr::Member { object, prop } => {
                let obj = self.eval(object, scope)?;
                let key = self.member_key(prop, scope)?;
                builtins::get_property(&obj, &key)
            }
            Expr::Await(e) => {
                let v = self.eval(e, scope)?;
                await_value(v)
            }
            Expr::Markup(_) => Err(Exception::error("SyntaxError", "Unexpected token '<'")),
            Expr::TypeAssert(e) => self.eval(e, scope),
        }
    }

    fn eval_object(&mut self, props: &[Prop], scope: &Scope) -> Result<Value, Exception> {
        let mut out = IndexMap::with_capacity(props.len());
        for p in props {
            let key = p.key.name();
            let v = match p.kind {
                PropKind::Shorthand => scope.get(&key)?,
                PropKind::Init | PropKind::Method => self.eval(&p.value, scope)?,
            };
            out.insert(key, v);
        }
        Ok(Value::object(out))
    }

    fn eval_unary(&mut self, op: UnaryOp, expr: &Expr, scope: &Scope) -> Result<Value, Exception> {
        if let (UnaryOp::Typeof, Expr::Ident(name)) = (op, expr) {
            if !scope.has(name) {
                return Ok(Value::from("undefined"));
            }
        }
        let v = self.eval(expr, scope)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!v.truthy()),
            UnaryOp::Neg => Value::Number(-v.to_number()),
            UnaryOp::Plus => Value::Number(v.to_number()),
            UnaryOp::Typeof => Value::from(v.type_of()),
            UnaryOp::Void => Value::Undefined,
        })
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr, scope: &Scope) -> Result<Value, Exception> {
        let old = self.eval(target, scope)?.to_number();
        let new = match op {
            UpdateOp::Inc => old + 1.0,
            UpdateOp::Dec => old - 1.0,
        };
        self.assign(target, Value::Number(new), scope)?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, scope: &Scope) -> Result<Value, Exception> {
        let v = match op.binary() {
            None => self.eval(value, scope)?,
            Some(bin) => {
                let old = self.eval(target, scope)?;
                let r = self.eval(value, scope)?;
                binary(bin, &old, &r)?
            }
        };
        self.assign(target, v.clone(), scope)?;
        Ok(v)
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], is_new: bool, scope: &Scope) -> Result<Value, Exception> {
        let f = self.eval(callee, scope)?;
        let args = self.eval_args(args, scope)?;
        match &f {
            Value::Native(n) if is_new && n.constructor => self.call(&f, &args),
            _ if is_new => Err(Exception::type_error(format!("{} is not a constructor", describe(callee)))),
            _ if !f.is_callable() => Err(Exception::type_error(format!("{} is not a function", describe(callee)))),
            _ => self.call(&f, &args),
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Scope) -> Result<Vec<Value>, Exception> {
        args.iter().map(|a| self.eval(a, scope)).collect()
    }

    fn member_key(&mut self, prop: &MemberProp, scope: &Scope) -> Result<String, Exception> {
        Ok(match prop {
            MemberProp::Name(n) => n.clone(),
            MemberProp::Computed(e) => self.eval(e, scope)?.to_js_string(),
        })
    }

    fn assign(&mut self, target: &Expr, value: Value, scope: &Scope) -> Result<(), Exception> {
        match target {
            Expr::Ident(name) => scope.set(name, value),
            Expr::Member { object, prop } => {
                let obj = self.eval(object, scope)?;
                let key = self.member_key(prop, scope)?;
                builtins::set_property(&obj, &key, value)
            }
            Expr::TypeAssert(inner) => self.assign(inner, value, scope),
            _ => Err(Exception::error("SyntaxError", "Invalid left-hand side in assignment")),
        }
    }

    /* ───────────────────────── Appels ───────────────────────── */

    /// Appelle `f` avec `args`.
    pub fn call(&mut self, f: &Value, args: &[Value]) -> Result<Value, Exception> {
        self.tick()?;
        if self.depth >= self.limits.max_call_depth {
            return Err(Exception::range_error("Maximum call stack size exceeded"));
        }
        self.depth += 1;
        let result = match f {
            Value::Function(c) => self.call_closure(c, f, args),
            Value::Native(n) => (n.func)(self, &n.this, args),
            other => Err(Exception::type_error(format!("{} is not a function", other.type_of()))),
        };
        self.depth -= 1;
        result
    }

    fn call_closure(&mut self, c: &Rc<Closure>, callee: &Value, args: &[Value]) -> Result<Value, Exception> {
        let saved = std::mem::replace(&mut self.source, Rc::clone(&c.source));
        let result = self.invoke(c, callee, args);
        self.source = saved;
        if !c.func.is_async {
            return result;
        }
        match result {
            Ok(v) => Ok(adopt(v)),
            Err(Exception::Throw(reason)) => Ok(Value::rejected(reason)),
            Err(timeout) => Err(timeout),
        }
    }

    fn invoke(&mut self, c: &Closure, callee: &Value, args: &[Value]) -> Result<Value, Exception> {
        let func = &c.func;
        let scope = c.env.child();
        if let (false, Some(name)) = (func.is_arrow, &func.name) {
            scope.declare(name, callee.clone(), true);
        }
        for (i, p) in func.params.iter().enumerate() {
            let mut v = args.get(i).cloned().unwrap_or(Value::Undefined);
            if let (true, Some(d)) = (v.is_undefined(), &p.default) {
                v = self.eval(d, &scope)?;
            }
            scope.declare(&p.name, v, true);
        }
        match &func.body {
            FunctionBody::Expr(e) => self.eval(e, &scope),
            FunctionBody::Block(stmts) => {
                hoist_vars(stmts, &scope);
                self.hoist_block(stmts, &scope);
                match self.exec_block(stmts, &scope)? {
                    Flow::Return(v) => Ok(v),
                    _ => Ok(Value::Undefined),
                }
            }
        }
    }
}

/* ───────────────────────── Utilitaires ───────────────────────── */

/// Hisse les `var` d’un corps de fonction (sans descendre dans les fonctions imbriquées).
fn hoist_vars(stmts: &[Stmt], scope: &Scope) {
    for stmt in stmts {
        match stmt {
            Stmt::Var { kind: VarKind::Var, decls } => decls.iter().for_each(|d| scope.declare_var(&d.name)),
            Stmt::ForOf { kind: VarKind::Var, name, body, .. } => {
                scope.declare_var(name);
                hoist_vars(std::slice::from_ref(body), scope);
            }
            Stmt::If { then, otherwise, .. } => {
                hoist_vars(std::slice::from_ref(then), scope);
                if let Some(o) = otherwise {
                    hoist_vars(std::slice::from_ref(o), scope);
                }
            }
            Stmt::Block(stmts) => hoist_vars(stmts, scope),
            Stmt::While { body, .. } | Stmt::ForOf { body, .. } => hoist_vars(std::slice::from_ref(body), scope),
            Stmt::For { init, body, .. } => {
                if let Some(init) = init {
                    hoist_vars(std::slice::from_ref(init), scope);
                }
                hoist_vars(std::slice::from_ref(body), scope);
            }
            Stmt::Try { block, handler, finalizer } => {
                hoist_vars(block, scope);
                if let Some(h) = handler {
                    hoist_vars(&h.body, scope);
                }
                if let Some(f) = finalizer {
                    hoist_vars(f, scope);
                }
            }
            _ => {}
        }
    }
}

fn assign_var(scope: &Scope, name: &str, value: Value) -> Result<(), Exception> {
    if scope.has(name) {
        scope.set(name, value)
    } else {
        scope.declare(name, value, true);
        Ok(())
    }
}

/// Éléments parcourus par `for … of`.
fn iterate(v: &Value) -> Result<Vec<Value>, Exception> {
    match v {
        Value::Array(a) => Ok(a.borrow().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
        other => Err(Exception::type_error(format!("{} is not iterable", other.type_of()))),
    }
}

/// Texte court d’un appelé pour les messages d’erreur.
fn describe(e: &Expr) -> String {
    match e {
        Expr::Ident(n) => n.clone(),
        Expr::Member { object, prop: MemberProp::Name(n) } => format!("{}.{n}", describe(object)),
        Expr::Member { object, .. } => format!("{}[…]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(…)", describe(callee)),
        _ => "expression".into(),
    }
}

/// Opérateurs binaires avec les conversions implicites du langage.
pub fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, Exception> {
    use BinaryOp::*;
    Ok(match op {
        Add => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            _ if is_stringy(l) || is_stringy(r) => concat(&l.to_js_string(), &r.to_js_string())?,
            _ => Value::Number(l.to_number() + r.to_number()),
        },
        Sub => Value::Number(l.to_number() - r.to_number()),
        Mul => Value::Number(l.to_number() * r.to_number()),
        Div => Value::Number(l.to_number() / r.to_number()),
        Mod => Value::Number(l.to_number() % r.to_number()),
        Pow => Value::Number(pow(l.to_number(), r.to_number())),
        Lt | Le | Gt | Ge => Value::Bool(compare(op, l, r)),
        Eq => Value::Bool(l.loose_eq(r)),
        Ne => Value::Bool(!l.loose_eq(r)),
        StrictEq => Value::Bool(l.strict_eq(r)),
        StrictNe => Value::Bool(!l.strict_eq(r)),
    })
}

fn concat(a: &str, b: &str) -> Result<Value, Exception> {
    if a.len() + b.len() > MAX_STRING_LENGTH {
        return Err(Exception::range_error("Invalid string length"));
    }
    Ok(Value::string(format!("{a}{b}")))
}

/// Opérande converti en chaîne par `+` (chaînes et non-primitifs).
const fn is_stringy(v: &Value) -> bool {
    !matches!(v, Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_))
}

/// `**` : `NaN` pour `(±1) ** ±Infinity` et tout exposant `NaN`.
pub fn pow(base: f64, exp: f64) -> f64 {
    if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exp)
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (l.to_number(), r.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

/// Une promesse rendue par un corps `async` n’est pas réemballée.
pub fn adopt(v: Value) -> Value {
    match v {
        Value::Promise(_) => v,
        other => Value::fulfilled(other),
    }
}

/// `await v` dans le modèle synchrone.
pub fn await_value(v: Value) -> Result<Value, Exception> {
    let Value::Promise(p) = &v else { return Ok(v) };
    let state = p.state.borrow().clone();
    match state {
        PromiseState::Fulfilled(x) => Ok(x),
        PromiseState::Rejected(reason) => Err(Exception::Throw(reason)),
        PromiseState::Pending => Err(Exception::type_error("await of a promise that never settles")),
    }
}

/* ───────────────────────── Appels hôte ───────────────────────── */

impl Value {
    /// Appelle une fonction du script depuis l’hôte, avec une échéance neuve
    /// tirée des limites capturées à sa création.
    pub fn call(&self, args: &[Value]) -> Result<Value, ExecError> {
        let (limits, source) = match self {
            Value::Function(c) => (c.limits, Rc::clone(&c.source)),
            _ => (Limits::default(), Rc::from("")),
        };
        if !self.is_callable() {
            return Err(Exception::type_error(format!("{} is not a function", self.type_of())).into());
        }
        let mut interp = Interpreter::new(limits, source);
        interp.call(self, args).map_err(ExecError::from)
    }

    /// Déballe une promesse réglée ; toute autre valeur est rendue telle quelle.
    pub fn settle(&self) -> Result<Value, ExecError> { await_value(self.clone()).map_err(ExecError::from) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tagscript_parser::{parse, ParseOptions};

    fn run(src: &str) -> Result<Scope, Exception> { run_with(src, Limits::default()) }

    fn run_with(src: &str, limits: Limits) -> Result<Scope, Exception> {
        let program = parse(src, ParseOptions::portable()).unwrap();
        let scope = Scope::root();
        builtins::install(&scope);
        let mut interp = Interpreter::new(limits, Rc::from(src));
        interp.run_program(&program, &scope)?;
        Ok(scope)
    }

    fn value_of(src: &str, name: &str) -> Value { run(src).unwrap().get(name).unwrap() }

    fn thrown(src: &str) -> String {
        match run(src) {
            Err(Exception::Throw(v)) => v.to_js_string(),
            other => panic!("attendu une exception, obtenu {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn arithmetic_and_strings() {
        assert_eq!(value_of("var x = 1 + 2 * 3;", "x"), Value::from(7));
        assert_eq!(value_of("var s = 'a' + 1 + 2;", "s"), Value::from("a12"));
        assert_eq!(value_of("var s = 1 + 2 + 'a';", "s"), Value::from("3a"));
        assert_eq!(value_of("var p = 2 ** 10;", "p"), Value::from(1024));
        assert_eq!(value_of("var m = -7 % 3;", "m"), Value::from(-1));
        assert_eq!(value_of("var b = 'b' > 'a';", "b"), Value::Bool(true));
    }

    #[test]
    fn hoisting_and_closures() {
        let src = "var r = f(); function f() { return g(); } function g() { return 3; }";
        assert_eq!(value_of(src, "r"), Value::from(3));
        let src = "function counter() { var n = 0; return function () { n += 1; return n; }; }\n\
                   var c = counter(); c(); var r = c();";
        assert_eq!(value_of(src, "r"), Value::from(2));
    }

    #[test]
    fn block_scoping() {
        assert_eq!(thrown("const a = 1; a = 2;"), "TypeError: Assignment to constant variable.");
        assert_eq!(thrown("x; let x = 1;"), "ReferenceError: Cannot access 'x' before initialization");
        assert_eq!(value_of("let a = 1; { let a = 2; } var r = a;", "r"), Value::from(1));
        let src = "var fs = []; for (let i = 0; i < 3; i++) { fs.push(() => i); } var r = fs[0]() + fs[2]();";
        assert_eq!(value_of(src, "r"), Value::from(2));
    }

    #[test]
    fn loops_and_control_flow() {
        let src = "var t = 0; for (var i = 0; i < 10; i++) { if (i === 5) break; if (i % 2) continue; t += i; }";
        assert_eq!(value_of(src, "t"), Value::from(6));
        assert_eq!(value_of("var t = ''; for (const c of 'abc') t = c + t;", "t"), Value::from("cba"));
        assert_eq!(value_of("var n = 0; while (n < 4) n++;", "n"), Value::from(4));
    }

    #[test]
    fn try_catch_finally() {
        let src = "var log = []; try { throw new Error('boom'); } catch (e) { log.push(e.message); } finally { log.push('end'); }\n\
                   var r = log.join(',');";
        assert_eq!(value_of(src, "r"), Value::from("boom,end"));
        let src = "function f() { try { return 1; } finally { return 2; } } var r = f();";
        assert_eq!(value_of(src, "r"), Value::from(2));
    }

    #[test]
    fn runtime_errors_are_named() {
        assert_eq!(thrown("undefinedThing();"), "ReferenceError: undefinedThing is not defined");
        assert_eq!(thrown("var o = {}; o.f();"), "TypeError: o.f is not a function");
        assert_eq!(thrown("var o; o.x;"), "TypeError: Cannot read properties of undefined (reading 'x')");
        assert_eq!(thrown("function F() {} new F();"), "TypeError: F is not a constructor");
        assert_eq!(value_of("var t = typeof nothing;", "t"), Value::from("undefined"));
    }

    #[test]
    fn call_depth_is_bounded() {
        let limits = Limits { max_call_depth: 16, ..Limits::default() };
        let src = "function f() { return f(); } var r; try { f(); } catch (e) { r = e.name + ': ' + e.message; }";
        let r = run_with(src, limits).unwrap().get("r").unwrap();
        assert_eq!(r, Value::from("RangeError: Maximum call stack size exceeded"));
        let src = "function f(n) { return n === 0 ? 0 : 1 + f(n - 1); } var r = f(10);";
        assert_eq!(run_with(src, limits).unwrap().get("r").unwrap(), Value::from(10));
    }

    #[test]
    fn default_depth_raises_before_native_overflow() {
        let max = crate::DEFAULT_MAX_CALL_DEPTH;
        let src = format!(
            "function f(n) {{ return n == 0 ? 0 : 1 + f(n - 1); }}\n\
             var ok = f({}); var r; try {{ f(1000); }} catch (e) {{ r = e.name + ': ' + e.message; }}",
            max - 1
        );
        let scope = run(&src).unwrap();
        assert_eq!(scope.get("ok").unwrap(), Value::from(max as i32 - 1));
        assert_eq!(scope.get("r").unwrap(), Value::from("RangeError: Maximum call stack size exceeded"));
    }

    #[test]
    fn async_functions_settle_eagerly() {
        let src = "async function f(x) { return x + 1; } async function g() { return await f(1); } var p = g();";
        assert_eq!(value_of(src, "p").settle().unwrap(), Value::from(2));
        let src = "var f = async () => { throw new Error('no'); }; var p = f();";
        let err = value_of(src, "p").settle().unwrap_err();
        assert_eq!(err.to_string(), "exception non rattrapée : Error: no");
    }

    #[test]
    fn host_calls_use_captured_limits() {
        let f = value_of("function add(a, b = 10) { return a + b; }", "add");
        assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from(11));
        assert!(Value::from(1).call(&[]).is_err());
    }

    #[test]
    fn infinite_loop_times_out() {
        let program = parse("while (true) {}", ParseOptions::portable()).unwrap();
        let limits = Limits { timeout: Duration::from_millis(20), ..Limits::default() };
        let mut interp = Interpreter::new(limits, Rc::from(""));
        let err = interp.run_program(&program, &Scope::root()).unwrap_err();
        assert!(matches!(err, Exception::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[test]
    fn timeout_is_not_catchable() {
        let program = parse("try { while (true) {} } catch (e) {} finally { x = 1; }", ParseOptions::portable()).unwrap();
        let limits = Limits { timeout: Duration::from_millis(20), ..Limits::default() };
        let mut interp = Interpreter::new(limits, Rc::from(""));
        assert!(matches!(interp.run_program(&program, &Scope::root()), Err(Exception::Timeout(_))));
    }
}
