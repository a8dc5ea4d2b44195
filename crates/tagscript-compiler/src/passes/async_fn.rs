//! `async`/`await` → aides d’exécution `__async` / `__await` (cibles antérieures à ES2017).
//!
//! ```text
//! async function f(x) { return await g(x); }
//! // devient
//! function f(x) { return __async(function () { return __await(g(x)); }); }
//! ```
//!
//! `__async(fn)` exécute `fn` et rend une promesse réglée ; `__await(v)` déballe
//! une promesse réglée (ou lève sa raison de rejet).

use tagscript_ast::{walk_expr, walk_function, Expr, Function, FunctionBody, Program, Stmt, VisitMut};

use super::{synthetic_function, Ctx, Pass};

/// Abaissement des fonctions asynchrones.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncLowering;

impl Pass for AsyncLowering {
    fn name(&self) -> &'static str { "async" }

    fn run(&mut self, _ctx: &mut Ctx<'_>, program: &mut Program) {
        self.visit_stmts(&mut program.body);
    }
}

impl VisitMut for AsyncLowering {
    fn visit_function(&mut self, func: &mut Function) {
        walk_function(self, func);
        if !func.is_async {
            return;
        }
        func.is_async = false;
        let body = match std::mem::replace(&mut func.body, FunctionBody::Block(Vec::new())) {
            FunctionBody::Block(stmts) => stmts,
            FunctionBody::Expr(e) => vec![Stmt::Return(Some(*e))],
        };
        let task = Expr::Function(synthetic_function(Vec::new(), body));
        func.body = FunctionBody::Block(vec![Stmt::Return(Some(Expr::call(Expr::ident("__async"), vec![task])))]);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
        if let Expr::Await(inner) = expr {
            let inner = std::mem::replace(inner.as_mut(), Expr::Null);
            *expr = Expr::call(Expr::ident("__await"), vec![inner]);
        }
    }
}
