//! Valeurs dynamiques du runtime.
//!
//! - primitives copiées (`Undefined`, `Null`, `Bool`, `Number`, `String`) ;
//! - références partagées (`Array`, `Object`, `Function`, `Native`, `Promise`) :
//!   cloner une `Value` clone le pointeur, pas le contenu.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tagscript_ast::{self as ast, format_number};

use crate::error::Exception;
use crate::interp::Interpreter;
use crate::policy::Limits;
use crate::scope::Scope;

/// Tableau partagé.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// Objet partagé.
pub type ObjectRef = Rc<RefCell<Object>>;

/// Longueur maximale d’un tableau agrandi par le script (`RangeError` au-delà).
pub const MAX_ARRAY_LENGTH: usize = 1 << 22;
/// Taille maximale, en octets, d’une chaîne produite par le script.
pub const MAX_STRING_LENGTH: usize = 1 << 26;

/// Signature d’une native : interpréteur, receveur lié, arguments.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception>>;

/// Valeur dynamique.
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Booléen.
    Bool(bool),
    /// Nombre IEEE-754.
    Number(f64),
    /// Chaîne immuable.
    String(Rc<str>),
    /// Tableau.
    Array(ArrayRef),
    /// Objet ordinaire ou erreur.
    Object(ObjectRef),
    /// Fonction définie par le script.
    Function(Rc<Closure>),
    /// Fonction fournie par l’hôte ou le runtime.
    Native(Rc<Native>),
    /// Promesse (réglée de façon synchrone).
    Promise(Rc<Promise>),
}

/* ─────────────────────────── Objets ─────────────────────────── */

/// Objet : propriétés propres dans l’ordre d’insertion.
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// Propriétés énumérables.
    pub props: IndexMap<String, Value>,
    /// Données d’erreur (`name`/`message`, non énumérables).
    pub error: Option<ErrorData>,
}

/// Partie non énumérable d’un objet erreur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorData {
    /// `Error`, `TypeError`…
    pub name: Rc<str>,
    /// Message.
    pub message: Rc<str>,
}

impl Object {
    /// Objet vide.
    pub fn new() -> Self { Self::default() }

    /// Objet erreur.
    pub fn error(name: &str, message: &str) -> Self {
        Self { props: IndexMap::new(), error: Some(ErrorData { name: name.into(), message: message.into() }) }
    }
}

/* ─────────────────────────── Fonctions ─────────────────────────── */

/// Fermeture : fonction du script + portée capturée.
pub struct Closure {
    /// Définition.
    pub func: Rc<ast::Function>,
    /// Portée de définition.
    pub env: Scope,
    /// Texte complet du programme qui a défini la fonction.
    pub source: Rc<str>,
    /// Limites héritées de l’exécution de définition (appels hôte ultérieurs).
    pub limits: Limits,
}

impl Closure {
    /// Nom déclaré (vide si anonyme).
    pub fn name(&self) -> &str { self.func.name.as_deref().unwrap_or("") }

    /// Texte source de la fonction, tel qu’écrit.
    pub fn source_text(&self) -> &str {
        self.func
            .span
            .slice(&self.source)
            .filter(|s| !s.is_empty())
            .unwrap_or("function () { [synthetic code] }")
    }
}

/// Fonction native.
pub struct Native {
    /// Nom affiché.
    pub name: Rc<str>,
    /// Receveur lié (méthodes de tableaux, chaînes, promesses).
    pub this: Value,
    /// Implémentation.
    pub func: NativeFn,
    /// Utilisable avec `new`.
    pub constructor: bool,
    /// Membres statiques (`Promise.resolve`, `Object.keys`…).
    pub props: RefCell<IndexMap<String, Value>>,
}

impl Native {
    /// Native libre.
    pub fn new(name: &str, func: NativeFn) -> Self {
        Self { name: name.into(), this: Value::Undefined, func, constructor: false, props: RefCell::default() }
    }
}

/* ─────────────────────────── Promesses ─────────────────────────── */

/// État d’une promesse.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Jamais réglée (exécuteur qui n’appelle ni `resolve` ni `reject`).
    Pending,
    /// Tenue.
    Fulfilled(Value),
    /// Rompue.
    Rejected(Value),
}

/// Promesse ; l’exécution étant synchrone, elle est réglée dès sa création.
#[derive(Debug)]
pub struct Promise {
    /// État courant.
    pub state: RefCell<PromiseState>,
}

impl Promise {
    /// Promesse dans `state`.
    pub fn new(state: PromiseState) -> Self { Self { state: RefCell::new(state) } }
}

/* ─────────────────────────── Constructeurs / accès ─────────────────────────── */

impl Value {
    /// Chaîne.
    pub fn string(s: impl Into<Rc<str>>) -> Self { Value::String(s.into()) }

    /// Tableau.
    pub fn array(items: Vec<Value>) -> Self { Value::Array(Rc::new(RefCell::new(items))) }

    /// Objet depuis ses propriétés.
    pub fn object(props: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object { props, error: None })))
    }

    /// Objet erreur `name: message`.
    pub fn error(name: &str, message: &str) -> Self { Value::Object(Rc::new(RefCell::new(Object::error(name, message)))) }

    /// Native libre.
    pub fn native(name: &str, f: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception> + 'static) -> Self {
        Value::Native(Rc::new(Native::new(name, Rc::new(f))))
    }

    /// Promesse tenue.
    pub fn fulfilled(v: Value) -> Self { Value::Promise(Rc::new(Promise::new(PromiseState::Fulfilled(v)))) }

    /// Promesse rompue.
    pub fn rejected(reason: Value) -> Self { Value::Promise(Rc::new(Promise::new(PromiseState::Rejected(reason)))) }

    /// Vrai pour `undefined`.
    pub const fn is_undefined(&self) -> bool { matches!(self, Value::Undefined) }

    /// Vrai pour `null` et `undefined`.
    pub const fn is_nullish(&self) -> bool { matches!(self, Value::Undefined | Value::Null) }

    /// Vrai si appelable.
    pub const fn is_callable(&self) -> bool { matches!(self, Value::Function(_) | Value::Native(_)) }

    /// Booléen si c’en est un.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Nombre si c’en est un.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Chaîne si c’en est une.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Propriété propre `key` d’un objet (ou élément d’un tableau), sans natives liées.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(o) => o.borrow().props.get(key).cloned(),
            Value::Array(a) => match key {
                "length" => Some(Value::Number(a.borrow().len() as f64)),
                _ => key.parse::<usize>().ok().and_then(|i| a.borrow().get(i).cloned()),
            },
            Value::Native(n) => n.props.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Clés propres énumérables (objets).
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Object(o) => o.borrow().props.keys().cloned().collect(),
            Value::Array(a) => (0..a.borrow().len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// `typeof v`.
    pub const fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Promise(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Conversion booléenne.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Conversion numérique.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// Conversion en chaîne (`String(v)`).
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(a) => join_array(a, ","),
            Value::Object(o) => match &o.borrow().error {
                Some(e) if e.message.is_empty() => e.name.to_string(),
                Some(e) => format!("{}: {}", e.name, e.message),
                None => "[object Object]".into(),
            },
            Value::Function(c) => c.source_text().to_string(),
            Value::Native(n) => format!("function {}() {{ [native code] }}", n.name),
            Value::Promise(_) => "[object Promise]".into(),
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_) | Value::String(_) | Value::Bool(_), Value::Number(_) | Value::String(_) | Value::Bool(_))
                if std::mem::discriminant(self) != std::mem::discriminant(other) =>
            {
                self.to_number() == other.to_number()
            }
            _ => self.strict_eq(other),
        }
    }

    /// Copie profonde des données (tableaux, objets) ; fonctions et natives restent partagées.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Array(a) => Value::array(a.borrow().iter().map(Value::deep_copy).collect()),
            Value::Object(o) => {
                let o = o.borrow();
                let props = o.props.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect();
                Value::Object(Rc::new(RefCell::new(Object { props, error: o.error.clone() })))
            }
            other => other.clone(),
        }
    }

    /// Encodage JSON (`JSON.stringify`) ; `None` pour `undefined` et les fonctions.
    /// Une structure cyclique lève `TypeError`.
    pub fn to_json(&self) -> Result<Option<serde_json::Value>, Exception> { self.json_in(&mut Vec::new()) }

    fn json_in(&self, seen: &mut Vec<*const ()>) -> Result<Option<serde_json::Value>, Exception> {
        use serde_json::Value as J;
        let ptr = match self {
            Value::Array(a) => Rc::as_ptr(a).cast::<()>(),
            Value::Object(o) => Rc::as_ptr(o).cast::<()>(),
            _ => std::ptr::null(),
        };
        if !ptr.is_null() {
            if seen.contains(&ptr) {
                return Err(Exception::type_error("Converting circular structure to JSON"));
            }
            seen.push(ptr);
        }
        let json = match self {
            Value::Undefined | Value::Function(_) | Value::Native(_) => None,
            Value::Null => Some(J::Null),
            Value::Bool(b) => Some(J::Bool(*b)),
            Value::Number(n) => Some(json_number(*n)),
            Value::String(s) => Some(J::String(s.to_string())),
            Value::Array(a) => {
                let items = a.borrow().clone();
                let mut out = Vec::with_capacity(items.len());
                for v in &items {
                    out.push(v.json_in(seen)?.unwrap_or(J::Null));
                }
                Some(J::Array(out))
            }
            Value::Object(o) => {
                let props = o.borrow().props.clone();
                let mut out = serde_json::Map::new();
                for (k, v) in &props {
                    if let Some(j) = v.json_in(seen)? {
                        out.insert(k.clone(), j);
                    }
                }
                Some(J::Object(out))
            }
            Value::Promise(_) => Some(J::Object(serde_json::Map::new())),
        };
        if !ptr.is_null() {
            seen.pop();
        }
        Ok(json)
    }
}

/// `Array.prototype.join` : `null`, `undefined` et les renvois cycliques
/// vers un tableau en cours de jointure deviennent `''`.
pub fn join_array(a: &ArrayRef, sep: &str) -> String { join_in(a, sep, &mut Vec::new()) }

fn join_in(a: &ArrayRef, sep: &str, seen: &mut Vec<*const RefCell<Vec<Value>>>) -> String {
    let ptr = Rc::as_ptr(a);
    if seen.contains(&ptr) {
        return String::new();
    }
    seen.push(ptr);
    let items = a.borrow().clone();
    let parts: Vec<String> = items
        .iter()
        .map(|v| match v {
            Value::Undefined | Value::Null => String::new(),
            Value::Array(inner) => join_in(inner, ",", seen),
            other => other.to_js_string(),
        })
        .collect();
    seen.pop();
    parts.join(sep)
}

/// Entiers exacts sans `.0`, non-finis → `null`.
fn json_number(n: f64) -> serde_json::Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        #[allow(clippy::cast_possible_truncation)]
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// `Number("…")` : blancs ignorés, `""` → 0, préfixes `0x`/`0o`/`0b`.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    let radix = |digits: &str, r: u32| u64::from_str_radix(digits, r).map_or(f64::NAN, |v| v as f64);
    match t.get(..2) {
        Some("0x" | "0X") => return radix(&t[2..], 16),
        Some("0o" | "0O") => return radix(&t[2..], 8),
        Some("0b" | "0B") => return radix(&t[2..], 2),
        _ => {}
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) => {
            t.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/* ─────────────────────────── Conversions ─────────────────────────── */

impl From<()> for Value { fn from((): ()) -> Self { Value::Undefined } }
impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Number(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Number(f64::from(v)) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::string(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::string(v) } }
impl From<Vec<Value>> for Value { fn from(v: Vec<Value>) -> Self { Value::array(v) } }
impl From<IndexMap<String, Value>> for Value { fn from(v: IndexMap<String, Value>) -> Self { Value::object(v) } }

impl PartialEq for Value {
    /// Égalité stricte, sauf `NaN == NaN` (comparaison structurelle des tests).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.strict_eq(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({})", format_number(*n)),
            Value::String(s) => {
                if s.chars().count() > 64 {
                    write!(f, "String({:?}…)", s.chars().take(64).collect::<String>())
                } else {
                    write!(f, "String({s:?})")
                }
            }
            Value::Array(a) => match a.try_borrow() {
                Ok(a) => write!(f, "Array(len={})", a.len()),
                Err(_) => write!(f, "Array(<borrowed>)"),
            },
            Value::Object(o) => match o.try_borrow() {
                Ok(o) => match &o.error {
                    Some(e) => write!(f, "Error({}: {})", e.name, e.message),
                    None => write!(f, "Object(keys={:?})", o.props.keys().collect::<Vec<_>>()),
                },
                Err(_) => write!(f, "Object(<borrowed>)"),
            },
            Value::Function(c) => write!(f, "Function({})", c.name()),
            Value::Native(n) => write!(f, "Native({})", n.name),
            Value::Promise(p) => write!(f, "Promise({:?})", p.state.borrow()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_js_string()) }
}
