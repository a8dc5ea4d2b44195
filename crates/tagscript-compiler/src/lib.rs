//! tagscript-compiler — transformateur source → JavaScript portable
//!
//! Pipeline : `parse` (tagscript-parser) → passes d’abaissement → émission.
//!
//! - [`CompilerOptions`] : cible, format de module, traitement du balisage.
//! - [`Pass`] : une réécriture de l’AST ; [`Compiler`] les enchaîne dans l’ordre.
//! - [`emit`] : impression lisible (transpilation) ou compacte (minification).
//!
//! ```rust
//! use tagscript_compiler::{transpile, CompilerOptions};
//!
//! let out = transpile("export default () => true", &CompilerOptions::default()).unwrap();
//! assert_eq!(out, "exports.default = function () { return true; };");
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod emit;
pub mod minify;
pub mod passes;

use std::fmt;
use std::str::FromStr;

use tagscript_ast as ast;
use tagscript_core::Diagnostic;
use tagscript_parser::{parse, ParseOptions};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use emit::{emit_program, EmitOptions};
pub use minify::minify;
pub use passes::{Ctx, FreshNames, Pass};

/* ─────────────────────────── Options ─────────────────────────── */

/// Niveau de langage visé par l’émission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Target {
    /// ES5 : ni flèches, ni `let`/`const`, ni `**`, ni `async`.
    #[default]
    Es5,
    /// ES2015.
    Es2015,
    /// ES2016 (`**`).
    Es2016,
    /// ES2017 (`async`/`await`).
    Es2017,
    /// Tout ce que le dialecte connaît.
    EsNext,
}

/// Format de module émis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum ModuleKind {
    /// `require(…)` / `exports.x = …`.
    #[default]
    CommonJs,
    /// `import` / `export` conservés.
    EsModule,
}

/// Traitement du balisage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum JsxMode {
    /// Appels à la fabrique (`React.createElement`).
    #[default]
    React,
    /// Balisage réimprimé tel quel.
    Preserve,
    /// Balisage refusé au parsing.
    None,
}

macro_rules! keyword_enum {
    ($ty:ident, $what:literal, { $($text:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(concat!($what, " inconnu : `{}`"), other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($ty::$variant => $text,)+
                };
                f.write_str(s)
            }
        }
    };
}

keyword_enum!(Target, "target", { "es5" => Es5, "es2015" => Es2015, "es2016" => Es2016, "es2017" => Es2017, "esnext" => EsNext });
keyword_enum!(ModuleKind, "module", { "commonjs" => CommonJs, "esmodule" => EsModule });
keyword_enum!(JsxMode, "jsx", { "react" => React, "preserve" => Preserve, "none" => None });

/// Options de transpilation ; toutes les clés ont une valeur par défaut fixe.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default, rename_all = "snake_case"))]
pub struct CompilerOptions {
    /// Niveau de langage.
    pub target: Target,
    /// Format de module.
    pub module: ModuleKind,
    /// Balisage.
    pub jsx: JsxMode,
    /// Fabrique d’éléments (nom pointé).
    pub jsx_factory: String,
    /// Fabrique de fragments (nom pointé).
    pub jsx_fragment_factory: String,
    /// Les commentaires ne sont jamais reportés ; conservé pour la compatibilité des fichiers de configuration.
    pub remove_comments: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: Target::Es5,
            module: ModuleKind::CommonJs,
            jsx: JsxMode::React,
            jsx_factory: "React.createElement".into(),
            jsx_fragment_factory: "React.Fragment".into(),
            remove_comments: true,
        }
    }
}

impl CompilerOptions {
    /// Dialecte accepté par le parseur pour ces options.
    pub fn parse_options(&self) -> ParseOptions {
        match self.jsx {
            JsxMode::None => ParseOptions::source_without_markup(),
            JsxMode::React | JsxMode::Preserve => ParseOptions::source(),
        }
    }
}

/* ─────────────────────────── Compilateur ─────────────────────────── */

/// Façade : parse, abaisse, émet.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Options actives.
    pub options: CompilerOptions,
}

impl Compiler {
    /// Nouveau compilateur.
    pub fn new(options: CompilerOptions) -> Self { Self { options } }

    /// Parse `source` (syntaxe + validations contextuelles).
    pub fn parse(&self, source: &str) -> Result<ast::Program, Diagnostic> {
        parse(source, self.options.parse_options())
    }

    /// Passes actives, dans l’ordre d’exécution.
    pub fn passes(&self) -> Vec<Box<dyn Pass>> {
        passes::pipeline(&self.options)
    }

    /// Applique toutes les passes actives sur `program`.
    pub fn lower(&self, program: &mut ast::Program) {
        let mut ctx = Ctx::new(&self.options, FreshNames::collect(program));
        for mut pass in self.passes() {
            log::trace!("pass {}", pass.name());
            pass.run(&mut ctx, program);
        }
    }

    /// Vérifie `source` sans rien émettre.
    pub fn check(&self, source: &str) -> Result<(), Diagnostic> {
        self.parse(source).map(|_| ())
    }

    /// Transpile `source` en code portable (prologue strict retiré, blancs rognés).
    pub fn transpile(&self, source: &str) -> Result<String, Diagnostic> {
        let mut program = self.parse(source).map_err(|d| {
            log::debug!("transpile: {d}");
            d
        })?;
        self.lower(&mut program);
        let opts = EmitOptions {
            compact: false,
            strict_prologue: self.options.module == ModuleKind::CommonJs,
        };
        let text = emit_program(&program, opts);
        let text = text.trim_start();
        let text = text.strip_prefix(emit::STRICT_PROLOGUE).unwrap_or(text);
        let out = text.trim().to_string();
        log::debug!("transpile: {} → {} octets (target {})", source.len(), out.len(), self.options.target);
        Ok(out)
    }
}

/// Transpile `source` avec `options`.
pub fn transpile(source: &str, options: &CompilerOptions) -> Result<String, Diagnostic> {
    Compiler::new(options.clone()).transpile(source)
}

/// Mode vérification seule : `check(s).is_ok()` ssi `transpile(s).is_ok()`.
pub fn check(source: &str, options: &CompilerOptions) -> Result<(), Diagnostic> {
    Compiler::new(options.clone()).check(source)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn es5(src: &str) -> String {
        transpile(src, &CompilerOptions::default()).unwrap()
    }

    fn with(src: &str, f: impl FnOnce(&mut CompilerOptions)) -> String {
        let mut opts = CompilerOptions::default();
        f(&mut opts);
        transpile(src, &opts).unwrap()
    }

    #[test]
    fn default_export_arrow() {
        assert_eq!(es5("export default () => true"), "exports.default = function () { return true; };");
    }

    #[test]
    fn exported_const_and_function() {
        assert_eq!(
            es5("export const a: number = 1\nexport function f(x: string): string { return x }"),
            "var a = 1;\nexports.a = a;\nfunction f(x) { return x; }\nexports.f = f;"
        );
    }

    #[test]
    fn plain_script_has_no_exports() {
        assert_eq!(es5("let x = 1; x += 2;"), "var x = 1;\nx += 2;");
    }

    #[test]
    fn leading_directive_is_stripped_once() {
        assert_eq!(es5("\"use strict\";\nvar a = 1;"), "var a = 1;");
    }

    #[test]
    fn check_matches_transpile() {
        let opts = CompilerOptions::default();
        for src in ["export default 1", "let = ;", "a ** b", "const x;", "await f()"] {
            assert_eq!(check(src, &opts).is_ok(), transpile(src, &opts).is_ok(), "{src}");
        }
    }

    #[test]
    fn syntax_error_is_rendered() {
        let err = transpile("export default {", &CompilerOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("SyntaxError: "), "{err}");
    }

    #[test]
    fn esnext_keeps_modern_syntax() {
        let out = with("export const f = async (x = 1) => x ** 2", |o| {
            o.target = Target::EsNext;
            o.module = ModuleKind::EsModule;
        });
        assert_eq!(out, "export const f = async (x = 1) => x ** 2;");
    }

    #[test]
    fn markup_disabled_rejects_elements() {
        let mut opts = CompilerOptions::default();
        opts.jsx = JsxMode::None;
        assert!(transpile("export default <div />", &opts).is_err());
    }

    #[test]
    fn option_keywords_parse() {
        assert_eq!("ES2016".parse::<Target>(), Ok(Target::Es2016));
        assert_eq!("commonjs".parse::<ModuleKind>(), Ok(ModuleKind::CommonJs));
        assert_eq!(JsxMode::Preserve.to_string(), "preserve");
        assert!("es3".parse::<Target>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_deserialize_with_defaults() {
        let opts: CompilerOptions = serde_json::from_str(r#"{ "target": "es2017", "jsx": "preserve" }"#).unwrap();
        assert_eq!(opts.target, Target::Es2017);
        assert_eq!(opts.jsx, JsxMode::Preserve);
        assert_eq!(opts.jsx_factory, "React.createElement");
        assert_eq!(opts.module, ModuleKind::CommonJs);
    }
}
