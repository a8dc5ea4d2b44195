//! Abaissement ES2015 → ES5.
//!
//! - `let`/`const` → `var`
//! - flèches → expressions `function` (corps concis → `{ return e; }`)
//! - propriétés abrégées et méthodes → `k: v`
//! - paramètres par défaut → `if (p === void 0) { p = d; }`
//! - `for (x of xs)` → boucle indexée sur un tableau mis en cache

use tagscript_ast::{
    walk_expr, walk_function, walk_stmt, BinaryOp, Expr, Function, FunctionBody, Program, PropKind, Stmt,
    UpdateOp, VarDecl, VarKind, VisitMut,
};

use super::{Ctx, FreshNames, Pass};

/// Passe ES2015.
#[derive(Debug, Default, Clone, Copy)]
pub struct Es2015Lowering;

impl Pass for Es2015Lowering {
    fn name(&self) -> &'static str { "es2015" }

    fn run(&mut self, ctx: &mut Ctx<'_>, program: &mut Program) {
        Lowerer { names: &mut ctx.names }.visit_stmts(&mut program.body);
    }
}

struct Lowerer<'n> {
    names: &'n mut FreshNames,
}

impl Lowerer<'_> {
    fn lower_for_of(&mut self, stmt: Stmt) -> Stmt {
        let Stmt::ForOf { name, iter, body, .. } = stmt else { return stmt };
        let index = self.names.fresh("_i");
        let array = self.names.fresh("_a");
        let element = Stmt::Var {
            kind: VarKind::Var,
            decls: vec![VarDecl {
                name,
                init: Some(Expr::index(Expr::ident(&array), Expr::ident(&index))),
            }],
        };
        let body = match *body {
            Stmt::Block(mut stmts) => {
                stmts.insert(0, element);
                stmts
            }
            Stmt::Empty => vec![element],
            other => vec![element, other],
        };
        Stmt::For {
            init: Some(Box::new(Stmt::Var {
                kind: VarKind::Var,
                decls: vec![
                    VarDecl { name: index.clone(), init: Some(Expr::Num(0.0)) },
                    VarDecl { name: array.clone(), init: Some(iter) },
                ],
            })),
            test: Some(Expr::binary(
                BinaryOp::Lt,
                Expr::ident(&index),
                Expr::member(Expr::ident(array), "length"),
            )),
            update: Some(Expr::Update { op: UpdateOp::Inc, prefix: false, target: Box::new(Expr::ident(index)) }),
            body: Box::new(Stmt::Block(body)),
        }
    }
}

impl VisitMut for Lowerer<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        // les boucles externes reçoivent les premiers noms
        if matches!(stmt, Stmt::ForOf { .. }) {
            let taken = std::mem::replace(stmt, Stmt::Empty);
            *stmt = self.lower_for_of(taken);
        }
        walk_stmt(self, stmt);
        if let Stmt::Var { kind, .. } = stmt {
            *kind = VarKind::Var;
        }
    }

    fn visit_function(&mut self, func: &mut Function) {
        walk_function(self, func);
        func.is_arrow = false;
        if let FunctionBody::Expr(e) = &mut func.body {
            let e = std::mem::replace(e.as_mut(), Expr::Null);
            func.body = FunctionBody::Block(vec![Stmt::Return(Some(e))]);
        }
        let defaults: Vec<Stmt> = func
            .params
            .iter_mut()
            .filter_map(|p| {
                let d = p.default.take()?;
                let is_missing = Expr::binary(BinaryOp::StrictEq, Expr::ident(&p.name), Expr::void0());
                Some(Stmt::If {
                    test: is_missing,
                    then: Box::new(Stmt::Block(vec![Stmt::Expr(Expr::assign(Expr::ident(&p.name), d))])),
                    otherwise: None,
                })
            })
            .collect();
        if !defaults.is_empty() {
            if let FunctionBody::Block(body) = &mut func.body {
                body.splice(0..0, defaults);
            }
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
        if let Expr::Object(props) = expr {
            for p in props {
                match p.kind {
                    PropKind::Init => {}
                    PropKind::Shorthand => p.kind = PropKind::Init,
                    PropKind::Method => {
                        p.kind = PropKind::Init;
                        if let Expr::Function(f) = &mut p.value {
                            std::rc::Rc::make_mut(f).name = None;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{transpile, CompilerOptions};
    use pretty_assertions::assert_eq;

    fn es5(src: &str) -> String { transpile(src, &CompilerOptions::default()).unwrap() }

    #[test]
    fn block_scoped_declarations_become_var() {
        assert_eq!(es5("const a = 1, b = 2; let c;"), "var a = 1, b = 2;\nvar c;");
    }

    #[test]
    fn arrows_become_functions() {
        assert_eq!(es5("var f = (a, b) => a + b;"), "var f = function (a, b) { return a + b; };");
        assert_eq!(es5("var g = x => ({ x });"), "var g = function (x) { return { x: x }; };");
    }

    #[test]
    fn methods_and_shorthand_expand() {
        assert_eq!(es5("var o = { a, m() { return 1; } };"), "var o = { a: a, m: function () { return 1; } };");
    }

    #[test]
    fn default_parameters() {
        assert_eq!(
            es5("function f(a, b = 2) { return a + b; }"),
            "function f(a, b) {\n    if (b === void 0) {\n        b = 2;\n    }\n    return a + b;\n}"
        );
    }

    #[test]
    fn for_of_becomes_indexed_loop() {
        assert_eq!(
            es5("for (const x of xs) f(x);"),
            "for (var _i = 0, _a = xs; _i < _a.length; _i++) {\n    var x = _a[_i];\n    f(x);\n}"
        );
    }

    #[test]
    fn nested_for_of_get_distinct_names() {
        let out = es5("for (const a of xs) { for (const b of a) g(b); }");
        assert!(out.contains("var _i = 0, _a = xs"), "{out}");
        assert!(out.contains("var _i_1 = 0, _a_1 = a"), "{out}");
    }
}
