//! `import`/`export` → CommonJS.
//!
//! | Source                          | Émis                                            |
//! |---------------------------------|-------------------------------------------------|
//! | `import d from "m"`             | `var d = require("m").default;`                 |
//! | `import * as ns from "m"`       | `var ns = require("m");`                        |
//! | `import { a, b as c } from "m"` | `var m_1 = require("m"); var a = m_1.a; …`      |
//! | `import "m"`                    | `require("m");`                                 |
//! | `export default e`              | `exports.default = e;`                          |
//! | `export const x = 1`            | `const x = 1; exports.x = x;`                   |
//! | `export { a as b }`             | `exports.b = a;`                                |

use tagscript_ast::{Export, Expr, Import, Program, Stmt, VarDecl, VarKind};

use super::{Ctx, FreshNames, Pass};

/// Réécriture CommonJS des éléments de module.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonJsModules;

impl Pass for CommonJsModules {
    fn name(&self) -> &'static str { "commonjs" }

    fn run(&mut self, ctx: &mut Ctx<'_>, program: &mut Program) {
        let body = std::mem::take(&mut program.body);
        let mut out = Vec::with_capacity(body.len());
        let mut stmts = body.into_iter().peekable();
        // le prologue strict est réémis par l’émetteur
        if matches!(stmts.peek(), Some(Stmt::Expr(Expr::Str(s))) if s == "use strict") {
            stmts.next();
        }
        for stmt in stmts {
            match stmt {
                Stmt::Import(imp) => lower_import(imp, &mut ctx.names, &mut out),
                Stmt::Export(exp) => lower_export(exp, &mut out),
                other => out.push(other),
            }
        }
        program.body = out;
    }
}

fn exports_member(name: &str) -> Expr { Expr::member(Expr::ident("exports"), name) }

fn export_assign(exported: &str, value: Expr) -> Stmt { Stmt::Expr(Expr::assign(exports_member(exported), value)) }

fn var(name: impl Into<String>, init: Expr) -> Stmt {
    Stmt::Var { kind: VarKind::Var, decls: vec![VarDecl { name: name.into(), init: Some(init) }] }
}

/// `"./lib/util-x.js"` → `util_x_1`.
fn module_binding(source: &str) -> String {
    let base = source.rsplit('/').find(|s| !s.is_empty() && *s != "." && *s != "..").unwrap_or("module");
    let base = base.split('.').next().filter(|s| !s.is_empty()).unwrap_or("module");
    let mut name: String = base.chars().map(|c| if c.is_alphanumeric() || c == '$' { c } else { '_' }).collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.push_str("_1");
    name
}

fn lower_import(imp: Import, names: &mut FreshNames, out: &mut Vec<Stmt>) {
    let require = Expr::call(Expr::ident("require"), vec![Expr::Str(imp.source.clone())]);
    if imp.namespace.is_none() && imp.named.is_empty() {
        match imp.default {
            None => out.push(Stmt::Expr(require)),
            Some(d) => out.push(var(d, Expr::member(require, "default"))),
        }
        return;
    }
    let module = match imp.namespace {
        Some(ns) => ns,
        None => names.fresh(&module_binding(&imp.source)),
    };
    out.push(var(&module, require));
    if let Some(d) = imp.default {
        out.push(var(d, Expr::member(Expr::ident(&module), "default")));
    }
    for spec in imp.named {
        out.push(var(spec.local, Expr::member(Expr::ident(&module), spec.imported)));
    }
}

fn lower_export(exp: Export, out: &mut Vec<Stmt>) {
    match exp {
        Export::Default(e) => out.push(export_assign("default", e)),
        Export::DefaultFunction(f) => {
            match f.name.clone() {
                Some(name) => {
                    out.push(Stmt::Function(f));
                    out.push(export_assign("default", Expr::ident(name)));
                }
                None => out.push(export_assign("default", Expr::Function(f))),
            }
        }
        Export::Decl(decl) => {
            let exported: Vec<String> = match decl.as_ref() {
                Stmt::Var { decls, .. } => decls.iter().map(|d| d.name.clone()).collect(),
                Stmt::Function(f) => f.name.iter().cloned().collect(),
                _ => Vec::new(),
            };
            if !matches!(*decl, Stmt::TypeDecl { .. }) {
                out.push(*decl);
            }
            out.extend(exported.iter().map(|n| export_assign(n, Expr::ident(n))));
        }
        Export::Named(specs) => {
            out.extend(specs.into_iter().map(|s| export_assign(&s.exported, Expr::ident(s.local))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::module_binding;
    use crate::{transpile, CompilerOptions, Target};
    use pretty_assertions::assert_eq;

    fn cjs(src: &str) -> String {
        let opts = CompilerOptions { target: Target::EsNext, ..CompilerOptions::default() };
        transpile(src, &opts).unwrap()
    }

    #[test]
    fn import_forms() {
        assert_eq!(cjs("import d from \"m\";"), "var d = require(\"m\").default;");
        assert_eq!(cjs("import * as ns from \"m\";"), "var ns = require(\"m\");");
        assert_eq!(cjs("import \"side\";"), "require(\"side\");");
        assert_eq!(
            cjs("import d, { a, b as c } from \"./lib/m\";"),
            "var m_1 = require(\"./lib/m\");\nvar d = m_1.default;\nvar a = m_1.a;\nvar c = m_1.b;"
        );
    }

    #[test]
    fn export_forms() {
        assert_eq!(cjs("export default 42"), "exports.default = 42;");
        assert_eq!(cjs("export let x = 1, y;"), "let x = 1, y;\nexports.x = x;\nexports.y = y;");
        assert_eq!(cjs("const a = 1;\nexport { a as b };"), "const a = 1;\nexports.b = a;");
        assert_eq!(
            cjs("export default function main() { return 1; }"),
            "function main() { return 1; }\nexports.default = main;"
        );
        assert_eq!(cjs("export default function () { return 1; }"), "exports.default = function () { return 1; };");
    }

    #[test]
    fn binding_names() {
        assert_eq!(module_binding("m"), "m_1");
        assert_eq!(module_binding("./lib/util-x.js"), "util_x_1");
        assert_eq!(module_binding("@scope/pkg/"), "pkg_1");
        assert_eq!(module_binding("./2d"), "_2d_1");
    }
}
