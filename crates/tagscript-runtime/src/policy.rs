//! Politique du bac à sable : budget de temps, profondeur d’appel, globales injectées.

use std::time::Duration;

use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Exception;
use crate::interp::Interpreter;
use crate::value::Value;

/// Délai par défaut d’une exécution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Profondeur d’appel par défaut ; tient dans la pile de 2 Mio d’un fil
/// secondaire, même sans optimisations.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Limites numériques appliquées à une évaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    /// Durée maximale (horloge murale).
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub timeout: Duration,
    /// Nombre maximal d’appels imbriqués.
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self { Self { timeout: DEFAULT_TIMEOUT, max_call_depth: DEFAULT_MAX_CALL_DEPTH } }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Politique complète : limites + globales visibles du script.
///
/// Les globales de données sont copiées en profondeur à chaque exécution ; les
/// natives restent partagées.
#[derive(Debug, Clone, Default)]
pub struct SandboxPolicy {
    /// Limites.
    pub limits: Limits,
    /// Globales additionnelles (par défaut aucune).
    pub globals: IndexMap<String, Value>,
}

impl SandboxPolicy {
    /// Politique par défaut (10 s, aucune globale).
    pub fn new() -> Self { Self::default() }

    /// Remplace le délai.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.limits.timeout = timeout;
        self
    }

    /// Remplace la profondeur d’appel maximale.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.limits.max_call_depth = depth;
        self
    }

    /// Ajoute une globale de données.
    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    /// Ajoute une fonction hôte.
    #[must_use]
    pub fn with_native(
        mut self,
        name: &str,
        f: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception> + 'static,
    ) -> Self {
        self.globals.insert(name.to_string(), Value::native(name, f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let p = SandboxPolicy::new()
            .with_timeout(Duration::from_millis(50))
            .with_max_call_depth(8)
            .with_global("answer", 42)
            .with_native("twice", |_, _, args| Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0)));
        assert_eq!(p.limits, Limits { timeout: Duration::from_millis(50), max_call_depth: 8 });
        assert_eq!(p.globals.keys().collect::<Vec<_>>(), ["answer", "twice"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn limits_serialize_as_millis() {
        let l: Limits = serde_json::from_str(r#"{"timeout":250}"#).unwrap();
        assert_eq!(l, Limits { timeout: Duration::from_millis(250), max_call_depth: DEFAULT_MAX_CALL_DEPTH });
        assert_eq!(serde_json::to_string(&Limits::default()).unwrap(), r#"{"timeout":10000,"max_call_depth":64}"#);
    }
}
