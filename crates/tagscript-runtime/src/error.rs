//! Erreurs du runtime.

use std::time::Duration;

use tagscript_core::Diagnostic;
use thiserror::Error;

use crate::value::Value;

/// Interruption du flot normal pendant l’évaluation.
#[derive(Debug, Clone)]
pub enum Exception {
    /// `throw v` (interceptable par `try/catch`).
    Throw(Value),
    /// Budget de temps épuisé (non interceptable).
    Timeout(Duration),
}

impl Exception {
    /// Lève une erreur `name: message`.
    pub fn error(name: &str, message: impl AsRef<str>) -> Self { Exception::Throw(Value::error(name, message.as_ref())) }

    /// `TypeError`.
    pub fn type_error(message: impl AsRef<str>) -> Self { Self::error("TypeError", message) }

    /// `ReferenceError`.
    pub fn reference_error(message: impl AsRef<str>) -> Self { Self::error("ReferenceError", message) }

    /// `RangeError`.
    pub fn range_error(message: impl AsRef<str>) -> Self { Self::error("RangeError", message) }
}

/// Échec d’une exécution en bac à sable.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Le code portable ne se parse pas.
    #[error("{0}")]
    Syntax(#[from] Diagnostic),

    /// Exception non rattrapée.
    #[error("exception non rattrapée : {message}")]
    Uncaught {
        /// Rendu `Name: message` (ou `String(v)` pour une valeur quelconque).
        message: String,
        /// Valeur levée.
        value: Value,
    },

    /// Budget de temps dépassé.
    #[error("délai d’exécution dépassé ({0:?})")]
    Timeout(Duration),
}

impl ExecError {
    /// Convertit une interruption remontée jusqu’au sommet.
    pub fn from_exception(e: Exception) -> Self {
        match e {
            Exception::Throw(value) => ExecError::Uncaught { message: value.to_js_string(), value },
            Exception::Timeout(d) => ExecError::Timeout(d),
        }
    }
}

impl From<Exception> for ExecError {
    fn from(e: Exception) -> Self { Self::from_exception(e) }
}

/// Résultat d’une exécution.
pub type ExecResult<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncaught_message_uses_error_name() {
        let err = ExecError::from(Exception::type_error("x is not a function"));
        assert_eq!(err.to_string(), "exception non rattrapée : TypeError: x is not a function");
        let err = ExecError::from(Exception::Throw(Value::from(42)));
        assert!(matches!(err, ExecError::Uncaught { ref message, .. } if message == "42"));
    }
}
