//! Valeurs compilées porteuses de provenance.
//!
//! Une valeur construite par un tag garde le texte qui l’a produite (source
//! d’origine et code portable) ; ce texte n’apparaît jamais parmi ses
//! exports et ne peut pas être réaffecté.

use std::fmt;
use std::rc::Rc;

use tagscript_compiler::{transpile, CompilerOptions};
use tagscript_runtime::{ExecError, Sandbox, Value};

use crate::error::{TagError, TagResult};

/// Textes d’origine d’une valeur compilée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    original_code: Rc<str>,
    transpiled_code: Rc<str>,
}

impl Provenance {
    /// Nouvelle provenance.
    pub fn new(original_code: impl Into<Rc<str>>, transpiled_code: impl Into<Rc<str>>) -> Self {
        Self { original_code: original_code.into(), transpiled_code: transpiled_code.into() }
    }

    /// Source tel qu’écrit.
    pub fn original_code(&self) -> &str { &self.original_code }

    /// Code portable.
    pub fn transpiled_code(&self) -> &str { &self.transpiled_code }
}

/// Module exécuté : ses exports + sa provenance.
#[derive(Clone)]
pub struct CompiledModule {
    exports: Value,
    provenance: Provenance,
}

impl CompiledModule {
    /// Transpile `source`, l’exécute dans `sandbox` et garde la provenance.
    pub fn compile(source: &str, options: &CompilerOptions, sandbox: &Sandbox) -> TagResult<Self> {
        let transpiled = transpile(source, options)?;
        log::debug!("compile: {} → {} octets portables", source.len(), transpiled.len());
        let exports = sandbox.execute(&transpiled)?;
        Ok(Self { exports, provenance: Provenance::new(source, transpiled) })
    }

    /// Export `name` (`default`, …).
    pub fn get(&self, name: &str) -> Option<Value> { self.exports.get(name) }

    /// Objet des exports.
    pub const fn exports(&self) -> &Value { &self.exports }

    /// Noms exportés, dans l’ordre d’exécution.
    pub fn export_names(&self) -> Vec<String> { self.exports.keys() }

    /// Provenance.
    pub const fn provenance(&self) -> &Provenance { &self.provenance }

    /// Source d’origine.
    pub fn original_code(&self) -> &str { self.provenance.original_code() }

    /// Code portable.
    pub fn transpiled_code(&self) -> &str { self.provenance.transpiled_code() }
}

impl fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModule").field("exports", &self.export_names()).finish_non_exhaustive()
    }
}

/// Fonction extraite de l’export par défaut d’un module.
#[derive(Clone)]
pub struct CompiledFunction {
    func: Value,
    provenance: Provenance,
}

impl CompiledFunction {
    /// Compile `source` et en extrait l’export par défaut, qui doit être appelable.
    pub fn compile(source: &str, options: &CompilerOptions, sandbox: &Sandbox) -> TagResult<Self> {
        let module = CompiledModule::compile(source, options, sandbox)?;
        Self::from_module(module)
    }

    /// Déballe l’export par défaut de `module`.
    pub fn from_module(module: CompiledModule) -> TagResult<Self> {
        match module.get("default") {
            Some(func) if func.is_callable() => Ok(Self { func, provenance: module.provenance }),
            _ => Err(TagError::MissingExport),
        }
    }

    /// Appelle la fonction (échéance neuve à chaque appel).
    pub fn call(&self, args: &[Value]) -> Result<Value, ExecError> { self.func.call(args) }

    /// Valeur appelable.
    pub const fn value(&self) -> &Value { &self.func }

    /// Provenance.
    pub const fn provenance(&self) -> &Provenance { &self.provenance }

    /// Source d’origine.
    pub fn original_code(&self) -> &str { self.provenance.original_code() }

    /// Code portable.
    pub fn transpiled_code(&self) -> &str { self.provenance.transpiled_code() }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction").field("func", &self.func).finish_non_exhaustive()
    }
}

/// Valeur de code d’un document, discriminée par origine.
#[derive(Debug, Clone)]
pub enum CodeValue {
    /// Construite par un tag module.
    Module(CompiledModule),
    /// Construite par un tag fonction.
    Function(CompiledFunction),
    /// Placée en mémoire par l’hôte, sans provenance.
    Detached(Value),
}

impl CodeValue {
    /// Provenance, si la valeur a été construite depuis du texte.
    pub const fn provenance(&self) -> Option<&Provenance> {
        match self {
            CodeValue::Module(m) => Some(m.provenance()),
            CodeValue::Function(f) => Some(f.provenance()),
            CodeValue::Detached(_) => None,
        }
    }

    /// Valeur d’exécution sous-jacente (exports, fonction ou valeur hôte).
    pub const fn value(&self) -> &Value {
        match self {
            CodeValue::Module(m) => m.exports(),
            CodeValue::Function(f) => f.value(),
            CodeValue::Detached(v) => v,
        }
    }

    /// Module, si c’en est un.
    pub const fn as_module(&self) -> Option<&CompiledModule> {
        match self {
            CodeValue::Module(m) => Some(m),
            _ => None,
        }
    }

    /// Fonction, si c’en est une.
    pub const fn as_function(&self) -> Option<&CompiledFunction> {
        match self {
            CodeValue::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl From<CompiledModule> for CodeValue {
    fn from(m: CompiledModule) -> Self { CodeValue::Module(m) }
}

impl From<CompiledFunction> for CodeValue {
    fn from(f: CompiledFunction) -> Self { CodeValue::Function(f) }
}

impl From<Value> for CodeValue {
    fn from(v: Value) -> Self { CodeValue::Detached(v) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(src: &str) -> TagResult<CompiledModule> {
        CompiledModule::compile(src, &CompilerOptions::default(), &Sandbox::default())
    }

    #[test]
    fn provenance_is_not_an_export() {
        let m = compile("export const a = 1;").unwrap();
        assert_eq!(m.export_names(), ["a"]);
        assert_eq!(m.original_code(), "export const a = 1;");
        assert_eq!(m.transpiled_code(), "var a = 1;\nexports.a = a;");
        assert_eq!(m.get("originalCode"), None);
    }

    #[test]
    fn function_requires_callable_default() {
        let opts = CompilerOptions::default();
        let f = CompiledFunction::compile("export default (a: number) => a * 3", &opts, &Sandbox::default()).unwrap();
        assert_eq!(f.call(&[Value::from(5)]).unwrap(), Value::from(15));
        assert_eq!(f.original_code(), "export default (a: number) => a * 3");
        let err = CompiledFunction::compile("export default 3", &opts, &Sandbox::default()).unwrap_err();
        assert!(matches!(err, TagError::MissingExport));
        let err = CompiledFunction::compile("export const f = () => 1;", &opts, &Sandbox::default()).unwrap_err();
        assert!(matches!(err, TagError::MissingExport));
    }

    #[test]
    fn syntax_and_runtime_failures_propagate() {
        assert!(matches!(compile("---").unwrap_err(), TagError::Syntax(_)));
        assert!(matches!(compile("throw new Error('x');").unwrap_err(), TagError::Exec(ExecError::Uncaught { .. })));
    }

    #[test]
    fn detached_values_have_no_provenance() {
        let v = CodeValue::from(Value::from(1));
        assert!(v.provenance().is_none());
        assert_eq!(v.value(), &Value::from(1));
    }
}
