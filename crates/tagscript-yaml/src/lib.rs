//! tagscript-yaml — code embarqué dans des documents YAML
//!
//! - [`ModuleTag`] / [`FunctionTag`] : scalaires de code transpilés puis
//!   exécutés en bac à sable au chargement.
//! - [`IncludeTag`] : même chose, le source étant lu dans un fichier.
//! - [`Provenance`] : texte d’origine et code portable gardés par chaque valeur,
//!   pour la réécrire en style [`Style::Original`], [`Style::Transpiled`] ou
//!   [`Style::Minified`].
//! - [`Schema`] : charge, vérifie et réécrit un document complet.
//!
//! ```rust
//! use tagscript_yaml::{DumpOptions, Schema, Style, TagConfig, Value};
//!
//! let schema = Schema::default_tags(&TagConfig::new());
//! let doc = schema.load("double: !ts/function |\n  export default (x: number) => x * 2\n").unwrap();
//! let f = doc.get("double").and_then(|n| n.as_code()).and_then(|c| c.as_function()).unwrap();
//! assert_eq!(f.call(&[Value::from(21)]).unwrap(), Value::from(42));
//!
//! let out = schema.dump(&doc, &DumpOptions::default().with_style(Style::Transpiled)).unwrap();
//! assert!(out.contains("exports.default = function (x)"));
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod error;
pub mod provenance;
pub mod schema;
pub mod style;
pub mod tag;

pub use error::{TagError, TagResult};
pub use provenance::{CodeValue, CompiledFunction, CompiledModule, Provenance};
pub use schema::{normalize, DumpOptions, Finding, Node, Schema};
pub use style::Style;
pub use tagscript_runtime::Value;
pub use tag::{FormatFn, FunctionTag, IncludeTag, LogFn, ModuleTag, ScalarTag, TagConfig, TagKind};

/// Charge `text` avec les tags standard et `config`.
pub fn load(text: &str, config: &TagConfig) -> TagResult<Node> { Schema::default_tags(config).load(text) }

/// Écrit `node` avec les tags standard et `config`.
pub fn dump(node: &Node, config: &TagConfig, options: &DumpOptions) -> TagResult<String> {
    Schema::default_tags(config).dump(node, options)
}

/// Outils rapides pour l’hôte.
pub mod prelude {
    pub use crate::{
        CodeValue, CompiledFunction, CompiledModule, DumpOptions, Node, ScalarTag, Schema, Style, TagConfig, TagError,
    };
}
