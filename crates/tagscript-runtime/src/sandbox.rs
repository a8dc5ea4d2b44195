//! Bac à sable : exécution isolée d’un module portable.

use std::rc::Rc;

use indexmap::IndexMap;
use tagscript_parser::{parse, ParseOptions};

use crate::builtins;
use crate::error::{ExecError, ExecResult};
use crate::interp::Interpreter;
use crate::policy::SandboxPolicy;
use crate::scope::Scope;
use crate::value::Value;

/// Exécuteur sans état : chaque appel repart d’un contexte neuf.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    policy: SandboxPolicy,
}

impl Sandbox {
    /// Bac à sable régi par `policy`.
    pub fn new(policy: SandboxPolicy) -> Self { Self { policy } }

    /// Politique appliquée.
    pub fn policy(&self) -> &SandboxPolicy { &self.policy }

    /// Exécute `portable` et rend `module.exports`.
    ///
    /// Le script voit `exports` et `module` ; `module.exports` peut être
    /// réaffecté. Aucune globale hôte n’est visible hors de celles de la
    /// politique.
    pub fn execute(&self, portable: &str) -> ExecResult<Value> {
        let program = parse(portable, ParseOptions::portable())?;
        let globals = self.fresh_globals();
        let scope = globals.child();
        let exports = Value::object(IndexMap::new());
        let mut module = IndexMap::new();
        module.insert("exports".to_string(), exports.clone());
        let module = Value::object(module);
        scope.declare("exports", exports, true);
        scope.declare("module", module.clone(), true);

        log::trace!("sandbox: exécution de {} octets (délai {:?})", portable.len(), self.policy.limits.timeout);
        let mut interp = Interpreter::new(self.policy.limits, Rc::from(portable));
        interp.run_program(&program, &scope).map_err(ExecError::from)?;
        let result = module.get("exports").unwrap_or(Value::Undefined);
        log::trace!("sandbox: terminé, exports = {result:?}");
        Ok(result)
    }

    /// Appelle une fonction produite par une exécution précédente.
    pub fn call(&self, f: &Value, args: &[Value]) -> ExecResult<Value> { f.call(args) }

    fn fresh_globals(&self) -> Scope {
        let globals = Scope::root();
        builtins::install(&globals);
        for (name, v) in &self.policy.globals {
            globals.declare(name, builtins::isolate(v), true);
        }
        globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Limits;
    use crate::printer::print_value;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tagscript_compiler::{transpile, CompilerOptions};

    fn run(source: &str) -> ExecResult<Value> {
        let portable = transpile(source, &CompilerOptions::default()).unwrap();
        Sandbox::default().execute(&portable)
    }

    #[test]
    fn default_export_object() {
        let exports = run("export default { boolean: true, func: () => true }").unwrap();
        let default = exports.get("default").unwrap();
        assert_eq!(default.get("boolean"), Some(Value::Bool(true)));
        let func = default.get("func").unwrap();
        assert_eq!(func.call(&[]).unwrap(), Value::Bool(true));
        assert_eq!(print_value(&func), "function () { return true; }");
    }

    #[test]
    fn named_exports_and_module_exports() {
        let exports = run("export const a = 1;\nexport function inc(x: number) { return x + a; }").unwrap();
        assert_eq!(exports.keys(), ["a", "inc"]);
        assert_eq!(exports.get("inc").unwrap().call(&[Value::from(41)]).unwrap(), Value::from(42));

        let replaced = Sandbox::default().execute("module.exports = [1, 2];").unwrap();
        assert_eq!(print_value(&replaced), "[ 1, 2 ]");
    }

    #[test]
    fn async_export_resolves_to_its_value() {
        let exports = run("export default async (n: number) => n * 2").unwrap();
        let p = exports.get("default").unwrap().call(&[Value::from(21)]).unwrap();
        assert_eq!(p.settle().unwrap(), Value::from(42));
    }

    #[test]
    fn no_host_globals_by_default() {
        let err = Sandbox::default().execute("exports.x = require('fs');").unwrap_err();
        assert_eq!(err.to_string(), "exception non rattrapée : ReferenceError: require is not defined");
        let exports = Sandbox::default().execute("exports.t = typeof process;").unwrap();
        assert_eq!(exports.get("t"), Some(Value::from("undefined")));
    }

    #[test]
    fn policy_globals_are_copied_per_execution() {
        let policy = SandboxPolicy::new()
            .with_global("config", Value::array(vec![1.into()]))
            .with_native("twice", |_, _, a| Ok(Value::Number(a.first().map_or(0.0, Value::to_number) * 2.0)));
        let sandbox = Sandbox::new(policy);
        let src = "config.push(2); exports.n = config.length; exports.d = twice(4);";
        let first = sandbox.execute(src).unwrap();
        let second = sandbox.execute(src).unwrap();
        assert_eq!(first.get("n"), Some(Value::from(2)));
        assert_eq!(second.get("n"), Some(Value::from(2)));
        assert_eq!(second.get("d"), Some(Value::from(8)));
    }

    #[test]
    fn executions_do_not_share_state() {
        let sandbox = Sandbox::default();
        sandbox.execute("leaked = 1;").unwrap_err();
        let exports = sandbox.execute("var leaked = 2; exports.v = leaked;").unwrap();
        assert_eq!(exports.get("v"), Some(Value::from(2)));
        let exports = sandbox.execute("exports.t = typeof leaked;").unwrap();
        assert_eq!(exports.get("t"), Some(Value::from("undefined")));
    }

    #[test]
    fn runtime_failures() {
        let err = Sandbox::default().execute("throw new TypeError('nope');").unwrap_err();
        assert!(matches!(err, ExecError::Uncaught { ref message, .. } if message == "TypeError: nope"));
        let err = Sandbox::default().execute("exports.x = ;").unwrap_err();
        assert!(matches!(err, ExecError::Syntax(_)));
        let err = Sandbox::default().execute("export default 1;").unwrap_err();
        assert!(err.to_string().contains("SyntaxError"), "{err}");
    }

    #[test]
    fn timeout_aborts_execution() {
        let sandbox = Sandbox::new(SandboxPolicy::new().with_timeout(Duration::from_millis(30)));
        let err = sandbox.execute("for (;;) {}").unwrap_err();
        assert!(matches!(err, ExecError::Timeout(d) if d == Duration::from_millis(30)));
        assert_eq!(sandbox.policy().limits, Limits { timeout: Duration::from_millis(30), ..Limits::default() });
    }

    #[test]
    fn functions_keep_their_deadline_for_host_calls() {
        let sandbox = Sandbox::new(SandboxPolicy::new().with_timeout(Duration::from_millis(30)));
        let exports = sandbox.execute("exports.spin = function () { while (true) {} };").unwrap();
        let spin = exports.get("spin").unwrap();
        assert!(matches!(sandbox.call(&spin, &[]), Err(ExecError::Timeout(_))));
    }
}
