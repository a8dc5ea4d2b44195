//! Portées lexicales chaînées.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Exception;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
    initialized: bool,
}

#[derive(Debug, Default)]
struct ScopeData {
    vars: HashMap<String, Binding>,
    parent: Option<Scope>,
}

/// Portée partagée (les fermetures la capturent par référence).
#[derive(Debug, Clone, Default)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    /// Portée racine.
    pub fn root() -> Self { Self::default() }

    /// Portée enfant.
    pub fn child(&self) -> Self {
        Scope(Rc::new(RefCell::new(ScopeData { vars: HashMap::new(), parent: Some(self.clone()) })))
    }

    /// Copie superficielle des liaisons dans une portée sœur (itérations de `for (let …)`).
    pub fn sibling_copy(&self) -> Self {
        let data = self.0.borrow();
        Scope(Rc::new(RefCell::new(ScopeData { vars: data.vars.clone(), parent: data.parent.clone() })))
    }

    /// Déclare (ou redéclare) une liaison initialisée.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.0.borrow_mut().vars.insert(name.to_string(), Binding { value, mutable, initialized: true });
    }

    /// Déclare `var name` sans écraser une valeur existante.
    pub fn declare_var(&self, name: &str) {
        self.0
            .borrow_mut()
            .vars
            .entry(name.to_string())
            .or_insert(Binding { value: Value::Undefined, mutable: true, initialized: true });
    }

    /// Réserve une liaison `let`/`const` non encore initialisée.
    pub fn declare_uninit(&self, name: &str, mutable: bool) {
        self.0
            .borrow_mut()
            .vars
            .insert(name.to_string(), Binding { value: Value::Undefined, mutable, initialized: false });
    }

    /// Initialise une liaison réservée dans *cette* portée.
    pub fn initialize(&self, name: &str, value: Value) {
        let mut data = self.0.borrow_mut();
        match data.vars.get_mut(name) {
            Some(b) => {
                b.value = value;
                b.initialized = true;
            }
            None => {
                data.vars.insert(name.to_string(), Binding { value, mutable: true, initialized: true });
            }
        }
    }

    /// Vrai si `name` est lié quelque part dans la chaîne.
    pub fn has(&self, name: &str) -> bool {
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            let data = scope.0.borrow();
            if data.vars.contains_key(name) {
                return true;
            }
            cur = data.parent.clone();
        }
        false
    }

    /// Lit `name`.
    pub fn get(&self, name: &str) -> Result<Value, Exception> {
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            let data = scope.0.borrow();
            if let Some(b) = data.vars.get(name) {
                if !b.initialized {
                    return Err(Exception::reference_error(format!("Cannot access '{name}' before initialization")));
                }
                return Ok(b.value.clone());
            }
            cur = data.parent.clone();
        }
        Err(Exception::reference_error(format!("{name} is not defined")))
    }

    /// Écrit `name` (liaison existante uniquement).
    pub fn set(&self, name: &str, value: Value) -> Result<(), Exception> {
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            let mut data = scope.0.borrow_mut();
            if let Some(b) = data.vars.get_mut(name) {
                if !b.initialized {
                    return Err(Exception::reference_error(format!("Cannot access '{name}' before initialization")));
                }
                if !b.mutable {
                    return Err(Exception::type_error("Assignment to constant variable."));
                }
                b.value = value;
                return Ok(());
            }
            cur = data.parent.clone();
        }
        Err(Exception::reference_error(format!("{name} is not defined")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(e: Exception) -> String {
        match e {
            Exception::Throw(v) => v.to_js_string(),
            Exception::Timeout(_) => "timeout".into(),
        }
    }

    #[test]
    fn lookup_walks_parents() {
        let root = Scope::root();
        root.declare("a", 1.into(), true);
        let inner = root.child();
        inner.set("a", 2.into()).unwrap();
        assert_eq!(root.get("a").unwrap(), Value::from(2));
        assert!(inner.has("a"));
        assert_eq!(message(inner.get("b").unwrap_err()), "ReferenceError: b is not defined");
    }

    #[test]
    fn const_and_dead_zone() {
        let s = Scope::root();
        s.declare_uninit("c", false);
        assert_eq!(message(s.get("c").unwrap_err()), "ReferenceError: Cannot access 'c' before initialization");
        s.initialize("c", 3.into());
        assert_eq!(s.get("c").unwrap(), Value::from(3));
        assert_eq!(message(s.set("c", 4.into()).unwrap_err()), "TypeError: Assignment to constant variable.");
    }

    #[test]
    fn var_redeclaration_keeps_value() {
        let s = Scope::root();
        s.declare("v", "x".into(), true);
        s.declare_var("v");
        assert_eq!(s.get("v").unwrap(), Value::from("x"));
    }
}
