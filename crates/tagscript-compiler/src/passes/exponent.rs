//! `a ** b` → `Math.pow(a, b)` (cibles antérieures à ES2016).

use tagscript_ast::{walk_expr, BinaryOp, Expr, Program, VisitMut};

use super::{Ctx, Pass};

/// Abaissement de l’exponentiation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExponentLowering;

impl Pass for ExponentLowering {
    fn name(&self) -> &'static str { "exponent" }

    fn run(&mut self, _ctx: &mut Ctx<'_>, program: &mut Program) {
        self.visit_stmts(&mut program.body);
    }
}

impl VisitMut for ExponentLowering {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
        if let Expr::Binary { op: BinaryOp::Pow, left, right } = expr {
            let base = std::mem::replace(left.as_mut(), Expr::Null);
            let exp = std::mem::replace(right.as_mut(), Expr::Null);
            *expr = pow(base, exp);
        }
    }
}

fn pow(base: Expr, exp: Expr) -> Expr {
    Expr::call(Expr::member(Expr::ident("Math"), "pow"), vec![base, exp])
}
