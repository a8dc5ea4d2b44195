//! tagscript AST (Abstract Syntax Tree)
//!
//! Structures produites par `tagscript-parser`, réécrites par les passes de
//! `tagscript-compiler` puis interprétées par `tagscript-runtime`.
//!
//! - Les fonctions sont partagées via `Rc<Function>` : les fermetures du runtime
//!   les référencent sans recopier le sous-arbre, les passes les modifient via
//!   `Rc::make_mut`.
//! - `Function::span` couvre le texte source complet de la fonction.
//! - Les annotations de type sont jetées au parsing ; seules subsistent
//!   `Stmt::TypeDecl` et `Expr::TypeAssert`, retirées par la passe d’effacement.
//!
//! # Exemple
//! ```rust
//! use tagscript_ast::{BinaryOp, Expr};
//!
//! let e = Expr::binary(BinaryOp::Add, Expr::Num(1.0), Expr::Num(2.0));
//! assert!(matches!(e, Expr::Binary { op: BinaryOp::Add, .. }));
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::rc::Rc;

pub use tagscript_core::Span;

/* ─────────────────────────── Programme / instructions ─────────────────────────── */

/// Un programme complet (module).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// Instructions de premier niveau.
    pub body: Vec<Stmt>,
}

/// Genre de déclaration de variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

impl VarKind {
    /// Mot-clé source.
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// Déclarateur `name = init`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// Nom lié.
    pub name: String,
    /// Initialiseur.
    pub init: Option<Expr>,
}

/// Instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var|let|const a = 1, b;`
    Var {
        /// Genre.
        kind: VarKind,
        /// Déclarateurs.
        decls: Vec<VarDecl>,
    },
    /// Déclaration de fonction (nom toujours présent).
    Function(Rc<Function>),
    /// Expression seule.
    Expr(Expr),
    /// `return e;`
    Return(Option<Expr>),
    /// `if (test) then else otherwise`
    If {
        /// Condition.
        test: Expr,
        /// Branche vraie.
        then: Box<Stmt>,
        /// Branche fausse.
        otherwise: Option<Box<Stmt>>,
    },
    /// `{ … }`
    Block(Vec<Stmt>),
    /// `while (test) body`
    While {
        /// Condition.
        test: Expr,
        /// Corps.
        body: Box<Stmt>,
    },
    /// `for (init; test; update) body`
    For {
        /// `Stmt::Var` ou `Stmt::Expr`.
        init: Option<Box<Stmt>>,
        /// Condition.
        test: Option<Expr>,
        /// Mise à jour.
        update: Option<Expr>,
        /// Corps.
        body: Box<Stmt>,
    },
    /// `for (kind name of iter) body`
    ForOf {
        /// Genre de la variable de boucle.
        kind: VarKind,
        /// Variable de boucle.
        name: String,
        /// Itérable.
        iter: Expr,
        /// Corps.
        body: Box<Stmt>,
    },
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `throw e;`
    Throw(Expr),
    /// `try { } catch (e) { } finally { }`
    Try {
        /// Bloc protégé.
        block: Vec<Stmt>,
        /// Clause `catch`.
        handler: Option<CatchClause>,
        /// Clause `finally`.
        finalizer: Option<Vec<Stmt>>,
    },
    /// `import … from "m";`
    Import(Import),
    /// `export …`
    Export(Export),
    /// `type X = …;` / `interface X { … }` (effacé à la transpilation).
    TypeDecl {
        /// Nom déclaré.
        name: String,
    },
    /// `;`
    Empty,
}

/// Clause `catch (param) { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Paramètre (optionnel depuis ES2019).
    pub param: Option<String>,
    /// Corps.
    pub body: Vec<Stmt>,
}

/// `import d, * as ns, { a as b } from "source";`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Import {
    /// Module importé.
    pub source: String,
    /// Import par défaut.
    pub default: Option<String>,
    /// `* as ns`.
    pub namespace: Option<String>,
    /// `{ a, b as c }`.
    pub named: Vec<ImportSpec>,
}

/// Spécificateur `imported as local`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Nom exporté par le module.
    pub imported: String,
    /// Nom local.
    pub local: String,
}

/// Formes d’export.
#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    /// `export default <expr>;`
    Default(Expr),
    /// `export default function name() {}`
    DefaultFunction(Rc<Function>),
    /// `export const …` / `export function …` / `export type …`
    Decl(Box<Stmt>),
    /// `export { a, b as c };`
    Named(Vec<ExportSpec>),
}

/// Spécificateur `local as exported`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    /// Nom local.
    pub local: String,
    /// Nom exporté.
    pub exported: String,
}

/* ─────────────────────────── Fonctions ─────────────────────────── */

/// Fonction (déclaration, expression, flèche ou méthode).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Nom (absent pour les expressions anonymes).
    pub name: Option<String>,
    /// Paramètres.
    pub params: Vec<Param>,
    /// Corps.
    pub body: FunctionBody,
    /// Fonction fléchée.
    pub is_arrow: bool,
    /// `async`.
    pub is_async: bool,
    /// Texte source complet (vide pour les fonctions synthétisées).
    pub span: Span,
}

/// Paramètre `name = default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Nom.
    pub name: String,
    /// Valeur par défaut.
    pub default: Option<Expr>,
}

impl Param {
    /// Paramètre simple.
    pub fn named(name: impl Into<String>) -> Self { Self { name: name.into(), default: None } }
}

/// Corps de fonction.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// `{ … }`
    Block(Vec<Stmt>),
    /// Corps concis d’une flèche : `x => x + 1`.
    Expr(Box<Expr>),
}

/* ─────────────────────────── Expressions ─────────────────────────── */

/// Expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Littéral numérique.
    Num(f64),
    /// Littéral chaîne.
    Str(String),
    /// `true` / `false`.
    Bool(bool),
    /// `null`.
    Null,
    /// Identifiant.
    Ident(String),
    /// `[a, b]`
    Array(Vec<Expr>),
    /// `{ k: v }`
    Object(Vec<Prop>),
    /// Fonction (expression ou flèche).
    Function(Rc<Function>),
    /// `op e`
    Unary {
        /// Opérateur.
        op: UnaryOp,
        /// Opérande.
        expr: Box<Expr>,
    },
    /// `++x`, `x--`
    Update {
        /// Opérateur.
        op: UpdateOp,
        /// Préfixe.
        prefix: bool,
        /// Cible (identifiant ou membre).
        target: Box<Expr>,
    },
    /// `l op r`
    Binary {
        /// Opérateur.
        op: BinaryOp,
        /// Gauche.
        left: Box<Expr>,
        /// Droite.
        right: Box<Expr>,
    },
    /// `l && r`, `l || r`, `l ?? r`
    Logical {
        /// Opérateur.
        op: LogicalOp,
        /// Gauche.
        left: Box<Expr>,
        /// Droite.
        right: Box<Expr>,
    },
    /// `test ? then : otherwise`
    Cond {
        /// Condition.
        test: Box<Expr>,
        /// Branche vraie.
        then: Box<Expr>,
        /// Branche fausse.
        otherwise: Box<Expr>,
    },
    /// `target op= value`
    Assign {
        /// Opérateur.
        op: AssignOp,
        /// Cible (identifiant ou membre).
        target: Box<Expr>,
        /// Valeur.
        value: Box<Expr>,
    },
    /// `callee(args)`
    Call {
        /// Appelé.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `new callee(args)`
    New {
        /// Constructeur.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `object.prop` / `object[expr]`
    Member {
        /// Objet.
        object: Box<Expr>,
        /// Propriété.
        prop: MemberProp,
    },
    /// `await e`
    Await(Box<Expr>),
    /// Élément de balisage `<a b="c">…</a>`.
    Markup(Box<Element>),
    /// `e as T`, `e!` (effacé à la transpilation).
    TypeAssert(Box<Expr>),
}

impl Expr {
    /// Identifiant.
    pub fn ident(name: impl Into<String>) -> Self { Expr::Ident(name.into()) }

    /// Chaîne.
    pub fn str(s: impl Into<String>) -> Self { Expr::Str(s.into()) }

    /// `object.name`
    pub fn member(object: Expr, name: impl Into<String>) -> Self {
        Expr::Member { object: Box::new(object), prop: MemberProp::Name(name.into()) }
    }

    /// `object[index]`
    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Member { object: Box::new(object), prop: MemberProp::Computed(Box::new(index)) }
    }

    /// `callee(args)`
    pub fn call(callee: Expr, args: Vec<Expr>) -> Self { Expr::Call { callee: Box::new(callee), args } }

    /// `l op r`
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    /// `target = value`
    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign { op: AssignOp::Assign, target: Box::new(target), value: Box::new(value) }
    }

    /// `void 0`
    pub fn void0() -> Self { Expr::Unary { op: UnaryOp::Void, expr: Box::new(Expr::Num(0.0)) } }

    /// Vrai si l’expression est une cible d’affectation valide.
    pub fn is_assign_target(&self) -> bool {
        match self {
            Expr::Ident(_) | Expr::Member { .. } => true,
            Expr::TypeAssert(inner) => inner.is_assign_target(),
            _ => false,
        }
    }
}

/// Propriété accédée.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    /// `.name`
    Name(String),
    /// `[expr]`
    Computed(Box<Expr>),
}

/// Propriété de littéral objet.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    /// Clé.
    pub key: PropKey,
    /// Valeur.
    pub value: Expr,
    /// Forme écrite.
    pub kind: PropKind,
}

/// Clé de propriété.
#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    /// `a: …`
    Ident(String),
    /// `"a-b": …`
    Str(String),
    /// `1: …`
    Num(f64),
}

impl PropKey {
    /// Nom de propriété effectif.
    pub fn name(&self) -> String {
        match self {
            PropKey::Ident(s) | PropKey::Str(s) => s.clone(),
            PropKey::Num(n) => format_number(*n),
        }
    }
}

/// Forme d’une propriété.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    /// `k: v`
    Init,
    /// `{ k }`
    Shorthand,
    /// `{ k() {} }`
    Method,
}

/* ─────────────────────────── Balisage ─────────────────────────── */

/// Élément de balisage ; `name == None` pour un fragment `<>…</>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Nom de balise (`div`, `Foo.Bar`).
    pub name: Option<String>,
    /// Attributs.
    pub attrs: Vec<Attr>,
    /// Enfants.
    pub children: Vec<Child>,
}

/// Attribut `name="v"`, `name={e}` ou `name` seul.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// Nom.
    pub name: String,
    /// Valeur.
    pub value: Option<AttrValue>,
}

/// Valeur d’attribut.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Chaîne littérale (non décodée).
    Str(String),
    /// `{expr}`
    Expr(Expr),
}

/// Enfant d’élément.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Texte (blancs déjà normalisés).
    Text(String),
    /// `{expr}`
    Expr(Expr),
    /// Élément imbriqué.
    Element(Element),
}

/* ─────────────────────────── Opérateurs ─────────────────────────── */

/// Opérateurs unaires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `typeof`
    Typeof,
    /// `void`
    Void,
}

impl UnaryOp {
    /// Texte source.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
        }
    }
}

/// `++` / `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// `++`
    Inc,
    /// `--`
    Dec,
}

impl UpdateOp {
    /// Texte source.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Inc => "++",
            UpdateOp::Dec => "--",
        }
    }
}

/// Opérateurs binaires (hors logiques).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
}

impl BinaryOp {
    /// Texte source.
    pub fn as_str(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Pow => "**",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            StrictEq => "===",
            StrictNe => "!==",
        }
    }

    /// Précédence (plus grand = lie plus fort), alignée sur [`prec`].
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Eq | Ne | StrictEq | StrictNe => prec::EQUALITY,
            Lt | Le | Gt | Ge => prec::RELATIONAL,
            Add | Sub => prec::ADDITIVE,
            Mul | Div | Mod => prec::MULTIPLICATIVE,
            Pow => prec::EXPONENT,
        }
    }
}

/// Opérateurs logiques (court-circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `??`
    Nullish,
}

impl LogicalOp {
    /// Texte source.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }

    /// Précédence.
    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::And => prec::AND,
            LogicalOp::Or | LogicalOp::Nullish => prec::OR,
        }
    }
}

/// Opérateurs d’affectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
    /// `%=`
    Mod,
}

impl AssignOp {
    /// Texte source.
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
        }
    }

    /// Opérateur binaire sous-jacent (`+=` → `+`).
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}

/// Niveaux de précédence partagés par le parser et l’émetteur.
pub mod prec {
    /// Affectation, flèches.
    pub const ASSIGN: u8 = 2;
    /// `?:`
    pub const CONDITIONAL: u8 = 3;
    /// `||`, `??`
    pub const OR: u8 = 4;
    /// `&&`
    pub const AND: u8 = 5;
    /// `==`, `===`…
    pub const EQUALITY: u8 = 9;
    /// `<`, `<=`…
    pub const RELATIONAL: u8 = 10;
    /// `+`, `-`
    pub const ADDITIVE: u8 = 12;
    /// `*`, `/`, `%`
    pub const MULTIPLICATIVE: u8 = 13;
    /// `**`
    pub const EXPONENT: u8 = 14;
    /// Unaires, `await`.
    pub const UNARY: u8 = 15;
    /// `x++`
    pub const POSTFIX: u8 = 16;
    /// Appels, membres.
    pub const CALL: u8 = 18;
    /// `new X` sans appel.
    pub const NEW: u8 = 19;
    /// Littéraux, identifiants.
    pub const PRIMARY: u8 = 20;
}

/* ─────────────────────────── Nombres ─────────────────────────── */

/// Rendu textuel d’un nombre selon les règles JavaScript (`1`, `0.5`, `1e+21`, `NaN`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if n == 0.0 {
        return "0".into();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        // `{}` de Rust donne déjà l’écriture décimale la plus courte.
        return format!("{n}");
    }
    let s = format!("{n:e}");
    match s.split_once('e') {
        Some((mantissa, exp)) if exp.starts_with('-') => format!("{mantissa}e{exp}"),
        Some((mantissa, exp)) => format!("{mantissa}e+{exp}"),
        None => s,
    }
}

/* ─────────────────────────── Parcours mutable ─────────────────────────── */

/// Parcours mutable de l’AST ; chaque méthode par défaut descend via `walk_*`.
pub trait VisitMut {
    /// Visite une liste d’instructions.
    fn visit_stmts(&mut self, stmts: &mut Vec<Stmt>) { walk_stmts(self, stmts); }
    /// Visite une instruction.
    fn visit_stmt(&mut self, stmt: &mut Stmt) { walk_stmt(self, stmt); }
    /// Visite une expression.
    fn visit_expr(&mut self, expr: &mut Expr) { walk_expr(self, expr); }
    /// Visite une fonction.
    fn visit_function(&mut self, func: &mut Function) { walk_function(self, func); }
}

/// Descend dans chaque instruction.
pub fn walk_stmts<V: VisitMut + ?Sized>(v: &mut V, stmts: &mut Vec<Stmt>) {
    for s in stmts.iter_mut() {
        v.visit_stmt(s);
    }
}

/// Descend dans les enfants d’une instruction.
pub fn walk_stmt<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Var { decls, .. } => {
            for d in decls {
                if let Some(init) = &mut d.init {
                    v.visit_expr(init);
                }
            }
        }
        Stmt::Function(f) => v.visit_function(Rc::make_mut(f)),
        Stmt::Expr(e) | Stmt::Throw(e) => v.visit_expr(e),
        Stmt::Return(e) => {
            if let Some(e) = e {
                v.visit_expr(e);
            }
        }
        Stmt::If { test, then, otherwise } => {
            v.visit_expr(test);
            v.visit_stmt(then);
            if let Some(o) = otherwise {
                v.visit_stmt(o);
            }
        }
        Stmt::Block(body) => v.visit_stmts(body),
        Stmt::While { test, body } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        Stmt::For { init, test, update, body } => {
            if let Some(i) = init {
                v.visit_stmt(i);
            }
            if let Some(t) = test {
                v.visit_expr(t);
            }
            if let Some(u) = update {
                v.visit_expr(u);
            }
            v.visit_stmt(body);
        }
        Stmt::ForOf { iter, body, .. } => {
            v.visit_expr(iter);
            v.visit_stmt(body);
        }
        Stmt::Try { block, handler, finalizer } => {
            v.visit_stmts(block);
            if let Some(h) = handler {
                v.visit_stmts(&mut h.body);
            }
            if let Some(f) = finalizer {
                v.visit_stmts(f);
            }
        }
        Stmt::Export(export) => match export {
            Export::Default(e) => v.visit_expr(e),
            Export::DefaultFunction(f) => v.visit_function(Rc::make_mut(f)),
            Export::Decl(s) => v.visit_stmt(s),
            Export::Named(_) => {}
        },
        Stmt::Break | Stmt::Continue | Stmt::Import(_) | Stmt::TypeDecl { .. } | Stmt::Empty => {}
    }
}

/// Descend dans les enfants d’une expression.
pub fn walk_expr<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Num(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Ident(_) => {}
        Expr::Array(items) => {
            for e in items {
                v.visit_expr(e);
            }
        }
        Expr::Object(props) => {
            for p in props {
                v.visit_expr(&mut p.value);
            }
        }
        Expr::Function(f) => v.visit_function(Rc::make_mut(f)),
        Expr::Unary { expr, .. } | Expr::Await(expr) | Expr::TypeAssert(expr) => v.visit_expr(expr),
        Expr::Update { target, .. } => v.visit_expr(target),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Cond { test, then, otherwise } => {
            v.visit_expr(test);
            v.visit_expr(then);
            v.visit_expr(otherwise);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Member { object, prop } => {
            v.visit_expr(object);
            if let MemberProp::Computed(e) = prop {
                v.visit_expr(e);
            }
        }
        Expr::Markup(el) => walk_element(v, el),
    }
}

fn walk_element<V: VisitMut + ?Sized>(v: &mut V, el: &mut Element) {
    for a in &mut el.attrs {
        if let Some(AttrValue::Expr(e)) = &mut a.value {
            v.visit_expr(e);
        }
    }
    for c in &mut el.children {
        match c {
            Child::Text(_) => {}
            Child::Expr(e) => v.visit_expr(e),
            Child::Element(child) => walk_element(v, child),
        }
    }
}

/// Descend dans les paramètres et le corps d’une fonction.
pub fn walk_function<V: VisitMut + ?Sized>(v: &mut V, func: &mut Function) {
    for p in &mut func.params {
        if let Some(d) = &mut p.default {
            v.visit_expr(d);
        }
    }
    match &mut func.body {
        FunctionBody::Block(body) => v.visit_stmts(body),
        FunctionBody::Expr(e) => v.visit_expr(e),
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_format_like_javascript() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-9), "1.5e-9");
        assert_eq!(format_number(123_456_789.0), "123456789");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn precedence_order() {
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() > BinaryOp::Lt.precedence());
        assert!(BinaryOp::Lt.precedence() > BinaryOp::StrictEq.precedence());
        assert!(BinaryOp::StrictEq.precedence() > LogicalOp::And.precedence());
        assert!(LogicalOp::And.precedence() > LogicalOp::Or.precedence());
        assert_eq!(AssignOp::Add.binary(), Some(BinaryOp::Add));
        assert_eq!(AssignOp::Assign.binary(), None);
    }

    struct RenameIdents;

    impl VisitMut for RenameIdents {
        fn visit_expr(&mut self, expr: &mut Expr) {
            if let Expr::Ident(name) = expr {
                name.insert(0, '_');
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn visitor_reaches_nested_functions() {
        let inner = Function {
            name: None,
            params: vec![Param::named("x")],
            body: FunctionBody::Expr(Box::new(Expr::ident("a"))),
            is_arrow: true,
            is_async: false,
            span: Span::DUMMY,
        };
        let shared = Rc::new(inner);
        let mut program = Program {
            body: vec![Stmt::Expr(Expr::call(Expr::ident("f"), vec![Expr::Function(Rc::clone(&shared))]))],
        };
        RenameIdents.visit_stmts(&mut program.body);

        let Stmt::Expr(Expr::Call { callee, args }) = &program.body[0] else { panic!("call expected") };
        assert_eq!(**callee, Expr::ident("_f"));
        let Expr::Function(f) = &args[0] else { panic!("function expected") };
        assert_eq!(f.body, FunctionBody::Expr(Box::new(Expr::ident("_a"))));
        // copie sur écriture : l’original partagé est intact
        assert_eq!(shared.body, FunctionBody::Expr(Box::new(Expr::ident("a"))));
    }

    #[test]
    fn prop_key_names() {
        assert_eq!(PropKey::Ident("a".into()).name(), "a");
        assert_eq!(PropKey::Str("a-b".into()).name(), "a-b");
        assert_eq!(PropKey::Num(1.0).name(), "1");
    }
}
