//! Passes d’abaissement.
//!
//! Chaque passe réécrit l’AST en place ; l’ordre est fixé par [`pipeline`] :
//! effacement des types, balisage, `**`, `async`, ES2015, modules.

mod async_fn;
mod erase;
mod es2015;
mod exponent;
mod markup;
mod modules;

use std::collections::HashSet;
use std::rc::Rc;

use tagscript_ast::{self as ast, walk_expr, walk_function, walk_stmt, Expr, Stmt, VisitMut};

use crate::{CompilerOptions, JsxMode, ModuleKind, Target};

pub use async_fn::AsyncLowering;
pub use erase::TypeErasure;
pub use es2015::Es2015Lowering;
pub use exponent::ExponentLowering;
pub use markup::MarkupLowering;
pub use modules::CommonJsModules;

/* ─────────────────────────── Contexte ─────────────────────────── */

/// Contexte partagé par les passes d’une même compilation.
pub struct Ctx<'a> {
    /// Options actives.
    pub opts: &'a CompilerOptions,
    /// Générateur de noms frais.
    pub names: FreshNames,
}

impl<'a> Ctx<'a> {
    /// Nouveau contexte.
    pub fn new(opts: &'a CompilerOptions, names: FreshNames) -> Self { Self { opts, names } }
}

/// Une passe de réécriture.
pub trait Pass {
    /// Nom (traces).
    fn name(&self) -> &'static str;
    /// Réécrit `program` en place.
    fn run(&mut self, ctx: &mut Ctx<'_>, program: &mut ast::Program);
}

/// Passes actives pour `opts`, dans l’ordre.
pub fn pipeline(opts: &CompilerOptions) -> Vec<Box<dyn Pass>> {
    let mut passes: Vec<Box<dyn Pass>> = vec![Box::new(TypeErasure)];
    if opts.jsx == JsxMode::React {
        passes.push(Box::new(MarkupLowering::new(&opts.jsx_factory, &opts.jsx_fragment_factory)));
    }
    if opts.target < Target::Es2016 {
        passes.push(Box::new(ExponentLowering));
    }
    if opts.target < Target::Es2017 {
        passes.push(Box::new(AsyncLowering));
    }
    if opts.target < Target::Es2015 {
        passes.push(Box::new(Es2015Lowering));
    }
    if opts.module == ModuleKind::CommonJs {
        passes.push(Box::new(CommonJsModules));
    }
    passes
}

/* ─────────────────────────── Noms frais ─────────────────────────── */

/// Noms déjà utilisés par le programme ; fournit des noms qui n’y entrent pas en collision.
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
    used: HashSet<String>,
}

impl FreshNames {
    /// Relève tous les identifiants liés ou référencés dans `program`.
    pub fn collect(program: &mut ast::Program) -> Self {
        let mut c = Collector::default();
        c.visit_stmts(&mut program.body);
        Self { used: c.names }
    }

    /// Vrai si `name` est déjà pris.
    pub fn is_used(&self, name: &str) -> bool { self.used.contains(name) }

    /// `base` s’il est libre, sinon `base_1`, `base_2`… ; le nom rendu est réservé.
    pub fn fresh(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

#[derive(Default)]
struct Collector {
    names: HashSet<String>,
}

impl VisitMut for Collector {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Var { decls, .. } => self.names.extend(decls.iter().map(|d| d.name.clone())),
            Stmt::ForOf { name, .. } => {
                self.names.insert(name.clone());
            }
            Stmt::Try { handler: Some(ast::CatchClause { param: Some(p), .. }), .. } => {
                self.names.insert(p.clone());
            }
            Stmt::Import(imp) => {
                self.names.extend(imp.default.iter().cloned());
                self.names.extend(imp.namespace.iter().cloned());
                self.names.extend(imp.named.iter().map(|s| s.local.clone()));
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Expr::Ident(name) = expr {
            self.names.insert(name.clone());
        }
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, func: &mut ast::Function) {
        self.names.extend(func.name.iter().cloned());
        self.names.extend(func.params.iter().map(|p| p.name.clone()));
        walk_function(self, func);
    }
}

/* ─────────────────────────── Aides ─────────────────────────── */

/// Référence à un nom pointé : `React.createElement` → `React.createElement` (membres).
pub(crate) fn dotted(path: &str) -> Expr {
    let mut parts = path.split('.').filter(|p| !p.is_empty());
    let head = parts.next().unwrap_or("undefined");
    parts.fold(Expr::ident(head), Expr::member)
}

/// Fonction anonyme synthétisée.
pub(crate) fn synthetic_function(params: Vec<ast::Param>, body: Vec<Stmt>) -> Rc<ast::Function> {
    Rc::new(ast::Function {
        name: None,
        params,
        body: ast::FunctionBody::Block(body),
        is_arrow: false,
        is_async: false,
        span: ast::Span::DUMMY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagscript_parser::{parse, ParseOptions};

    #[test]
    fn fresh_names_avoid_collisions() {
        let mut program = parse("var _i = 1; function f(_a) { return _a_1; }", ParseOptions::source()).unwrap();
        let mut names = FreshNames::collect(&mut program);
        assert!(names.is_used("f"));
        assert_eq!(names.fresh("_i"), "_i_1");
        assert_eq!(names.fresh("_a"), "_a_2");
        assert_eq!(names.fresh("_a"), "_a_3");
        assert_eq!(names.fresh("_x"), "_x");
    }

    #[test]
    fn pipeline_depends_on_options() {
        let names = |o: &CompilerOptions| pipeline(o).iter().map(|p| p.name()).collect::<Vec<_>>();
        assert_eq!(
            names(&CompilerOptions::default()),
            ["type-erasure", "markup", "exponent", "async", "es2015", "commonjs"]
        );
        let modern = CompilerOptions {
            target: Target::EsNext,
            module: ModuleKind::EsModule,
            jsx: JsxMode::Preserve,
            ..CompilerOptions::default()
        };
        assert_eq!(names(&modern), ["type-erasure"]);
    }

    #[test]
    fn dotted_paths() {
        assert_eq!(dotted("h"), Expr::ident("h"));
        assert_eq!(dotted("React.Fragment"), Expr::member(Expr::ident("React"), "Fragment"));
    }
}
