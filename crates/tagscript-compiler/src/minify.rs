//! Minification du code portable.
//!
//! Re-parse le texte transpilé, raccourcit les booléens (`true` → `!0`,
//! `false` → `!1`) puis réémet en forme compacte. Déterministe.

use tagscript_ast::{walk_expr, Expr, UnaryOp, VisitMut};
use tagscript_core::Diagnostic;
use tagscript_parser::{parse, ParseOptions};

use crate::emit::{emit_program, EmitOptions};

/// Minifie `portable` ; une erreur de syntaxe est rendue telle quelle.
pub fn minify(portable: &str) -> Result<String, Diagnostic> {
    let mut program = parse(portable, ParseOptions::portable())?;
    ShortenBooleans.visit_stmts(&mut program.body);
    let out = emit_program(&program, EmitOptions { compact: true, strict_prologue: false });
    log::debug!("minify: {} → {} octets", portable.len(), out.len());
    Ok(out.trim().to_string())
}

struct ShortenBooleans;

impl VisitMut for ShortenBooleans {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
        if let Expr::Bool(b) = *expr {
            let n = if b { 0.0 } else { 1.0 };
            *expr = Expr::Unary { op: UnaryOp::Not, expr: Box::new(Expr::Num(n)) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn minifies_transpiled_function() {
        assert_eq!(
            minify("exports.default = function () { return true; };").unwrap(),
            "exports.default=function(){return!0};"
        );
    }

    #[test]
    fn keeps_semantics_of_layout() {
        let src = "function f(a, b) {\n    if (a) {\n        return b;\n    }\n    else {\n        return false;\n    }\n}\nexports.default = f;";
        assert_eq!(
            minify(src).unwrap(),
            "function f(a,b){if(a){return b}else{return!1}}exports.default=f;"
        );
    }

    #[test]
    fn boolean_member_access_is_parenthesized() {
        assert_eq!(minify("x = true.toString();").unwrap(), "x=(!0).toString();");
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(minify("// head\nvar a = 1; /* tail */").unwrap(), "var a=1;");
    }

    #[test]
    fn failure_is_propagated() {
        let err = minify("var = 1;").unwrap_err();
        assert_eq!(err.to_string(), "SyntaxError: Identifier expected. (1:5)");
    }

    fn arith() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![(0u32..1000).prop_map(|n| n.to_string()), "[a-e]".prop_map(String::from)];
        leaf.prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone(), prop_oneof![Just("+"), Just("-"), Just("*"), Just("<")])
                    .prop_map(|(l, r, op)| format!("({l} {op} {r})")),
                inner.clone().prop_map(|e| format!("-({e})")),
                (inner.clone(), inner).prop_map(|(t, e)| format!("(t ? {t} : {e})")),
            ]
        })
    }

    proptest! {
        #[test]
        fn minify_is_idempotent(e in arith()) {
            let once = minify(&format!("x = {e};")).unwrap();
            let twice = minify(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
