//! Effacement des types : `type`/`interface`, `e as T`, `e!`.

use std::collections::HashSet;

use tagscript_ast::{walk_expr, walk_stmt, Export, Expr, Program, Stmt, VisitMut};

use super::{Ctx, Pass};

/// Retire tout ce qui n’existe qu’au niveau des types.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeErasure;

impl Pass for TypeErasure {
    fn name(&self) -> &'static str { "type-erasure" }

    fn run(&mut self, _ctx: &mut Ctx<'_>, program: &mut Program) {
        let mut eraser = Eraser::default();
        eraser.type_names = program.body.iter().filter_map(type_name).map(str::to_string).collect();
        // un nom à la fois type et valeur reste exportable
        for stmt in &program.body {
            for value in value_names(stmt) {
                eraser.type_names.remove(value);
            }
        }
        eraser.visit_stmts(&mut program.body);
    }
}

#[derive(Default)]
struct Eraser {
    type_names: HashSet<String>,
}

fn type_name(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::TypeDecl { name } => Some(name),
        Stmt::Export(Export::Decl(inner)) => type_name(inner),
        _ => None,
    }
}

fn value_names(stmt: &Stmt) -> Vec<&str> {
    match stmt {
        Stmt::Var { decls, .. } => decls.iter().map(|d| d.name.as_str()).collect(),
        Stmt::Function(f) => f.name.as_deref().into_iter().collect(),
        Stmt::Import(imp) => imp
            .default
            .iter()
            .chain(imp.namespace.iter())
            .map(String::as_str)
            .chain(imp.named.iter().map(|s| s.local.as_str()))
            .collect(),
        Stmt::Export(Export::Decl(inner)) => value_names(inner),
        _ => Vec::new(),
    }
}

impl VisitMut for Eraser {
    fn visit_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        stmts.retain(|s| type_name(s).is_none());
        for stmt in stmts.iter_mut() {
            self.visit_stmt(stmt);
        }
        stmts.retain(|s| !matches!(s, Stmt::Export(Export::Named(specs)) if specs.is_empty()));
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        if type_name(stmt).is_some() {
            *stmt = Stmt::Empty;
            return;
        }
        if let Stmt::Export(Export::Named(specs)) = stmt {
            specs.retain(|s| !self.type_names.contains(&s.local));
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        while let Expr::TypeAssert(inner) = expr {
            let inner = std::mem::replace(inner.as_mut(), Expr::Null);
            *expr = inner;
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use crate::{transpile, CompilerOptions, ModuleKind, Target};
    use pretty_assertions::assert_eq;

    fn esnext(src: &str) -> String {
        let opts = CompilerOptions { target: Target::EsNext, module: ModuleKind::EsModule, ..CompilerOptions::default() };
        transpile(src, &opts).unwrap()
    }

    #[test]
    fn type_items_vanish() {
        assert_eq!(
            esnext("type A = string | number;\ninterface B { x: A }\nexport type C = A[];\nconst a = 1;"),
            "const a = 1;"
        );
    }

    #[test]
    fn assertions_are_unwrapped() {
        assert_eq!(esnext("const v = (x as any as number)! + 1;"), "const v = x + 1;");
    }

    #[test]
    fn type_only_named_exports_are_dropped() {
        assert_eq!(esnext("type T = number;\nconst v = 1;\nexport { T, v };"), "const v = 1;\nexport { v };");
        assert_eq!(esnext("interface T {}\nexport { T };"), "");
    }
}
