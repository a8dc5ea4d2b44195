//! tagscript-runtime — exécution isolée du code portable
//!
//! - [`Value`] : valeurs dynamiques (primitives, tableaux, objets, fermetures,
//!   natives, promesses réglées).
//! - [`Sandbox`] : exécute un module portable dans un contexte neuf et rend
//!   `module.exports`, sous une [`SandboxPolicy`] (délai, profondeur, globales).
//! - [`print_value`] : repli valeur → texte source.
//!
//! ```rust
//! use tagscript_runtime::{Sandbox, Value};
//!
//! let exports = Sandbox::default().execute("exports.answer = 6 * 7;").unwrap();
//! assert_eq!(exports.get("answer"), Some(Value::from(42)));
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod builtins;
pub mod error;
pub mod interp;
pub mod policy;
pub mod printer;
pub mod sandbox;
pub mod scope;
pub mod value;

pub use error::{ExecError, ExecResult, Exception};
pub use interp::Interpreter;
pub use policy::{Limits, SandboxPolicy, DEFAULT_MAX_CALL_DEPTH, DEFAULT_TIMEOUT};
pub use printer::print_value;
pub use sandbox::Sandbox;
pub use value::{Native, NativeFn, Object, PromiseState, Value, MAX_ARRAY_LENGTH, MAX_STRING_LENGTH};

/// Outils rapides pour l’hôte.
pub mod prelude {
    pub use crate::{print_value, ExecError, ExecResult, Exception, Interpreter, Sandbox, SandboxPolicy, Value};
}
