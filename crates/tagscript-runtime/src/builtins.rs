//! Intrinsèques du langage et méthodes des types natifs.
//!
//! Ce ne sont pas des capacités de l’hôte : aucune n’accède au système
//! (fichiers, horloge, réseau). Les capacités viennent uniquement de
//! [`SandboxPolicy`](crate::SandboxPolicy).

use std::rc::Rc;

use indexmap::IndexMap;
use tagscript_ast::format_number;

use crate::error::Exception;
use crate::interp::{adopt, await_value, pow, Interpreter};
use crate::scope::Scope;
use crate::value::{
    join_array, string_to_number, ArrayRef, Native, Promise, PromiseState, Value, MAX_ARRAY_LENGTH, MAX_STRING_LENGTH,
};

/// Native sous forme de pointeur de fonction (tables d’enregistrement).
pub type Builtin = fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception>;

fn arg(args: &[Value], i: usize) -> Value { args.get(i).cloned().unwrap_or(Value::Undefined) }

fn num(args: &[Value], i: usize) -> f64 { args.get(i).map_or(f64::NAN, Value::to_number) }

fn native(name: &str, f: Builtin) -> Native { Native::new(name, Rc::new(f)) }

fn bound(name: &str, this: &Value, f: Builtin) -> Value {
    Value::Native(Rc::new(Native { this: this.clone(), ..native(name, f) }))
}

/// Objet-espace de noms (`Math`, `JSON`…) garni d’une table de natives.
fn namespace(entries: &[(&str, Builtin)]) -> Value {
    let props = entries.iter().map(|(n, f)| ((*n).to_string(), Value::Native(Rc::new(native(n, *f))))).collect();
    Value::object(props)
}

/// Constructeur (utilisable avec `new`) portant des membres statiques.
fn constructor(name: &str, f: Builtin, statics: &[(&str, Builtin)]) -> Value {
    let n = Native { constructor: true, ..native(name, f) };
    {
        let mut props = n.props.borrow_mut();
        for (s, g) in statics {
            props.insert((*s).to_string(), Value::Native(Rc::new(native(s, *g))));
        }
    }
    Value::Native(Rc::new(n))
}

/* ───────────────────────── Installation ───────────────────────── */

/// Déclare les intrinsèques dans la portée globale `scope`.
pub fn install(scope: &Scope) {
    scope.declare("undefined", Value::Undefined, false);
    scope.declare("NaN", Value::Number(f64::NAN), false);
    scope.declare("Infinity", Value::Number(f64::INFINITY), false);

    let math = namespace(&[
        ("abs",   |_, _, a| Ok(num(a, 0).abs().into())),
        ("floor", |_, _, a| Ok(num(a, 0).floor().into())),
        ("ceil",  |_, _, a| Ok(num(a, 0).ceil().into())),
        ("round", |_, _, a| Ok((num(a, 0) + 0.5).floor().into())),
        ("sqrt",  |_, _, a| Ok(num(a, 0).sqrt().into())),
        ("pow",   |_, _, a| Ok(pow(num(a, 0), num(a, 1)).into())),
        ("max",   math_max),
        ("min",   math_min),
    ]);
    if let Value::Object(o) = &math {
        o.borrow_mut().props.insert("PI".into(), std::f64::consts::PI.into());
    }
    scope.declare("Math", math, true);

    scope.declare("JSON", namespace(&[("stringify", json_stringify)]), true);
    scope.declare("Object", constructor("Object", object_ctor, &[
        ("keys",    object_keys),
        ("values",  object_values),
        ("entries", object_entries),
        ("assign",  object_assign),
    ]), true);
    scope.declare("Array", constructor("Array", array_ctor, &[
        ("isArray", |_, _, a| Ok(matches!(arg(a, 0), Value::Array(_)).into())),
    ]), true);
    scope.declare("String", constructor("String", |_, _, a| {
        Ok(a.first().map_or_else(String::new, Value::to_js_string).into())
    }, &[]), true);
    scope.declare("Number", constructor("Number", |_, _, a| Ok(a.first().map_or(0.0, Value::to_number).into()), &[]), true);
    scope.declare("Boolean", constructor("Boolean", |_, _, a| Ok(arg(a, 0).truthy().into()), &[]), true);
    scope.declare("Error", constructor("Error", |_, _, a| Ok(make_error("Error", a)), &[]), true);
    scope.declare("TypeError", constructor("TypeError", |_, _, a| Ok(make_error("TypeError", a)), &[]), true);
    scope.declare("RangeError", constructor("RangeError", |_, _, a| Ok(make_error("RangeError", a)), &[]), true);
    scope.declare("Promise", constructor("Promise", promise_ctor, &[
        ("resolve", |_, _, a| Ok(adopt(arg(a, 0)))),
        ("reject",  |_, _, a| Ok(Value::rejected(arg(a, 0)))),
    ]), true);

    let globals: &[(&str, Builtin)] = &[
        ("parseInt",   parse_int),
        ("parseFloat", |_, _, a| Ok(parse_float(&arg(a, 0).to_js_string()).into())),
        ("isNaN",      |_, _, a| Ok(num(a, 0).is_nan().into())),
        ("__async",    run_async),
        ("__await",    |_, _, a| await_value(arg(a, 0))),
    ];
    for (name, f) in globals {
        scope.declare(name, Value::Native(Rc::new(native(name, *f))), true);
    }
}

fn math_max(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    Ok(a.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |m, x| if m.is_nan() || x.is_nan() { f64::NAN } else { m.max(x) }).into())
}

fn math_min(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    Ok(a.iter().map(Value::to_number).fold(f64::INFINITY, |m, x| if m.is_nan() || x.is_nan() { f64::NAN } else { m.min(x) }).into())
}

fn make_error(name: &str, args: &[Value]) -> Value {
    let message = match args.first() {
        None | Some(Value::Undefined) => String::new(),
        Some(m) => m.to_js_string(),
    };
    Value::error(name, &message)
}

/* ───────────────────────── JSON / Object / Array ───────────────────────── */

fn json_stringify(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    let Some(json) = arg(a, 0).to_json()? else { return Ok(Value::Undefined) };
    let indent = match arg(a, 2) {
        Value::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    if indent.is_empty() {
        return Ok(json.to_string().into());
    }
    let pretty = serde_json::to_string_pretty(&json).map_err(|e| Exception::type_error(e.to_string()))?;
    // `to_string_pretty` indente par deux espaces ; les sauts de ligne ne
    // peuvent venir que de la structure (échappés dans les chaînes).
    let reindented = pretty
        .lines()
        .map(|line| {
            let depth = (line.len() - line.trim_start_matches(' ').len()) / 2;
            format!("{}{}", indent.repeat(depth), line.trim_start_matches(' '))
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(reindented.into())
}

fn object_ctor(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    Ok(match arg(a, 0) {
        v if v.is_nullish() => Value::object(IndexMap::new()),
        v => v,
    })
}

fn object_keys(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    Ok(Value::array(arg(a, 0).keys().into_iter().map(Value::from).collect()))
}

fn object_values(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    let o = arg(a, 0);
    Ok(Value::array(o.keys().iter().map(|k| o.get(k).unwrap_or(Value::Undefined)).collect()))
}

fn object_entries(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    let o = arg(a, 0);
    let entries = o
        .keys()
        .into_iter()
        .map(|k| {
            let v = o.get(&k).unwrap_or(Value::Undefined);
            Value::array(vec![Value::from(k), v])
        })
        .collect();
    Ok(Value::array(entries))
}

fn object_assign(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    let target = arg(a, 0);
    if target.is_nullish() {
        return Err(Exception::type_error("Cannot convert undefined or null to object"));
    }
    for source in a.iter().skip(1) {
        for k in source.keys() {
            let v = source.get(&k).unwrap_or(Value::Undefined);
            set_property(&target, &k, v)?;
        }
    }
    Ok(target)
}

fn array_ctor(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    match a {
        [Value::Number(n)] if n.fract() == 0.0 && *n >= 0.0 && *n <= MAX_ARRAY_LENGTH as f64 => {
            Ok(Value::array(vec![Value::Undefined; *n as usize]))
        }
        [Value::Number(n)] => Err(Exception::range_error(format!("Invalid array length: {}", format_number(*n)))),
        items => Ok(Value::array(items.to_vec())),
    }
}

/* ───────────────────────── Nombres ───────────────────────── */

fn parse_int(_: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    let text = arg(a, 0).to_js_string();
    let mut s = text.trim();
    let negative = s.starts_with('-');
    s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let explicit = !arg(a, 1).is_undefined();
    let mut radix = if explicit { arg(a, 1).to_number() as u32 } else { 10 };
    let hex = s.starts_with("0x") || s.starts_with("0X");
    if hex && (!explicit || radix == 16) {
        s = &s[2..];
        radix = 16;
    }
    if !(2..=36).contains(&radix) {
        return Ok(f64::NAN.into());
    }
    let digits: String = s.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return Ok(f64::NAN.into());
    }
    let v = digits.chars().fold(0.0_f64, |acc, c| acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0)));
    Ok((if negative { -v } else { v }).into())
}

/// Plus long préfixe numérique de `s` (`parseFloat`).
fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    for lit in ["Infinity", "+Infinity", "-Infinity"] {
        if t.starts_with(lit) {
            return string_to_number(lit);
        }
    }
    let candidate: String = t
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || (matches!(c, '+' | '-') && (*i == 0 || t[..*i].ends_with(['e', 'E']))))
        .map(|(_, c)| c)
        .collect();
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/* ───────────────────────── Promesses ───────────────────────── */

fn settle_with(p: &Rc<Promise>, state: PromiseState) {
    let mut current = p.state.borrow_mut();
    if *current == PromiseState::Pending {
        *current = state;
    }
}

fn promise_ctor(interp: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    let executor = arg(a, 0);
    if !executor.is_callable() {
        return Err(Exception::type_error("Promise resolver is not a function"));
    }
    let p = Rc::new(Promise::new(PromiseState::Pending));
    let (pr, pj) = (Rc::clone(&p), Rc::clone(&p));
    let resolve = Value::native("resolve", move |_, _, a| {
        let state = match adopt(arg(a, 0)) {
            Value::Promise(inner) => inner.state.borrow().clone(),
            other => PromiseState::Fulfilled(other),
        };
        settle_with(&pr, state);
        Ok(Value::Undefined)
    });
    let reject = Value::native("reject", move |_, _, a| {
        settle_with(&pj, PromiseState::Rejected(arg(a, 0)));
        Ok(Value::Undefined)
    });
    match interp.call(&executor, &[resolve, reject]) {
        Ok(_) => {}
        Err(Exception::Throw(reason)) => settle_with(&p, PromiseState::Rejected(reason)),
        Err(timeout) => return Err(timeout),
    }
    Ok(Value::Promise(p))
}

fn promise_then(interp: &mut Interpreter, this: &Value, a: &[Value]) -> Result<Value, Exception> {
    let Value::Promise(p) = this else { return Err(Exception::type_error("then called on a non-promise")) };
    let state = p.state.borrow().clone();
    let (handler, input) = match &state {
        PromiseState::Pending => return Ok(Value::Promise(Rc::new(Promise::new(PromiseState::Pending)))),
        PromiseState::Fulfilled(v) => (arg(a, 0), v.clone()),
        PromiseState::Rejected(r) => (arg(a, 1), r.clone()),
    };
    if !handler.is_callable() {
        return Ok(Value::Promise(Rc::new(Promise::new(state))));
    }
    match interp.call(&handler, &[input]) {
        Ok(v) => Ok(adopt(v)),
        Err(Exception::Throw(reason)) => Ok(Value::rejected(reason)),
        Err(timeout) => Err(timeout),
    }
}

fn promise_catch(interp: &mut Interpreter, this: &Value, a: &[Value]) -> Result<Value, Exception> {
    promise_then(interp, this, &[Value::Undefined, arg(a, 0)])
}

/// `__async(fn)` : exécute le corps d’une fonction asynchrone abaissée.
fn run_async(interp: &mut Interpreter, _: &Value, a: &[Value]) -> Result<Value, Exception> {
    match interp.call(&arg(a, 0), &[]) {
        Ok(v) => Ok(adopt(v)),
        Err(Exception::Throw(reason)) => Ok(Value::rejected(reason)),
        Err(timeout) => Err(timeout),
    }
}

/* ───────────────────────── Accès aux propriétés ───────────────────────── */

/// Lecture `obj[key]`, méthodes natives comprises.
pub fn get_property(obj: &Value, key: &str) -> Result<Value, Exception> {
    if key == "toString" && !obj.is_nullish() && obj.get(key).is_none() {
        return Ok(bound("toString", obj, |_, this, _| Ok(this.to_js_string().into())));
    }
    Ok(match obj {
        Value::Undefined | Value::Null => {
            return Err(Exception::type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                obj.to_js_string()
            )))
        }
        Value::Object(o) => {
            let o = o.borrow();
            match (&o.error, key) {
                (_, k) if o.props.contains_key(k) => o.props.get(k).cloned().unwrap_or(Value::Undefined),
                (Some(e), "name") => Value::string(Rc::clone(&e.name)),
                (Some(e), "message") => Value::string(Rc::clone(&e.message)),
                _ => Value::Undefined,
            }
        }
        Value::Array(a) => array_property(obj, a, key),
        Value::String(s) => string_property(obj, s, key),
        Value::Number(_) => match key {
            "toFixed" => bound("toFixed", obj, |_, this, a| {
                let digits = num(a, 0);
                let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
                Ok(format!("{:.*}", digits, this.to_number()).into())
            }),
            _ => Value::Undefined,
        },
        Value::Bool(_) => Value::Undefined,
        Value::Function(c) => match key {
            "name" => Value::from(c.name()),
            "length" => Value::Number(c.func.params.iter().take_while(|p| p.default.is_none()).count() as f64),
            _ => Value::Undefined,
        },
        Value::Native(n) => match key {
            "name" => Value::string(Rc::clone(&n.name)),
            _ => n.props.borrow().get(key).cloned().unwrap_or(Value::Undefined),
        },
        Value::Promise(_) => match key {
            "then" => bound("then", obj, promise_then),
            "catch" => bound("catch", obj, promise_catch),
            _ => Value::Undefined,
        },
    })
}

/// Écriture `obj[key] = value`.
pub fn set_property(obj: &Value, key: &str, value: Value) -> Result<(), Exception> {
    match obj {
        Value::Undefined | Value::Null => Err(Exception::type_error(format!(
            "Cannot set properties of {} (setting '{key}')",
            obj.to_js_string()
        ))),
        Value::Object(o) => {
            o.borrow_mut().props.insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(a) => {
            let mut items = a.borrow_mut();
            if key == "length" {
                let n = value.to_number();
                if n.fract() != 0.0 || n < 0.0 || n > MAX_ARRAY_LENGTH as f64 {
                    return Err(Exception::range_error("Invalid array length"));
                }
                items.resize(n as usize, Value::Undefined);
            } else if let Ok(i) = key.parse::<usize>() {
                if i >= MAX_ARRAY_LENGTH {
                    return Err(Exception::range_error("Invalid array length"));
                }
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
            }
            Ok(())
        }
        Value::Native(n) => {
            n.props.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        _ => Ok(()),
    }
}

/* ───────────────────────── Tableaux ───────────────────────── */

fn array_of(this: &Value) -> Result<ArrayRef, Exception> {
    match this {
        Value::Array(a) => Ok(Rc::clone(a)),
        other => Err(Exception::type_error(format!("{} is not an array", other.type_of()))),
    }
}

/// Indice relatif (`slice(-2)`) ramené dans `0..=len`.
fn relative(v: &Value, len: usize, default: usize) -> usize {
    if v.is_undefined() {
        return default;
    }
    let n = v.to_number();
    if n.is_nan() {
        return 0;
    }
    let len_f = len as f64;
    let idx = if n < 0.0 { (len_f + n.trunc()).max(0.0) } else { n.trunc().min(len_f) };
    idx as usize
}

/// Élément `i` relu à chaque pas : l’intervalle est fixé au départ, les
/// indices retirés entre-temps par le rappel sont sautés.
fn item_at(a: &ArrayRef, i: usize) -> Option<Value> { a.borrow().get(i).cloned() }

/// Appelle `cb(item, index, array)` sur les indices présents au départ.
fn each(
    interp: &mut Interpreter,
    this: &Value,
    cb: &Value,
    mut f: impl FnMut(usize, &Value, Value) -> Option<Value>,
) -> Result<Option<Value>, Exception> {
    if !cb.is_callable() {
        return Err(Exception::type_error(format!("{} is not a function", cb.to_js_string())));
    }
    let a = array_of(this)?;
    let len = a.borrow().len();
    for i in 0..len {
        let Some(item) = item_at(&a, i) else { continue };
        let r = interp.call(cb, &[item.clone(), Value::Number(i as f64), this.clone()])?;
        if let Some(done) = f(i, &item, r) {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_eq(b),
    }
}

fn array_property(obj: &Value, a: &ArrayRef, key: &str) -> Value {
    let f: Builtin = match key {
        "length" => return Value::Number(a.borrow().len() as f64),
        k if k.parse::<usize>().is_ok() => return obj.get(k).unwrap_or(Value::Undefined),
        "push" => |_, this, args| {
            let a = array_of(this)?;
            if a.borrow().len() + args.len() > MAX_ARRAY_LENGTH {
                return Err(Exception::range_error("Invalid array length"));
            }
            a.borrow_mut().extend(args.iter().cloned());
            let len = a.borrow().len();
            Ok(Value::Number(len as f64))
        },
        "pop" => |_, this, _| Ok(array_of(this)?.borrow_mut().pop().unwrap_or(Value::Undefined)),
        "map" => |interp, this, args| {
            let mut out = Vec::new();
            each(interp, this, &arg(args, 0), |_, _, r| {
                out.push(r);
                None
            })?;
            Ok(Value::array(out))
        },
        "filter" => |interp, this, args| {
            let mut out = Vec::new();
            each(interp, this, &arg(args, 0), |_, item, r| {
                if r.truthy() {
                    out.push(item.clone());
                }
                None
            })?;
            Ok(Value::array(out))
        },
        "forEach" => |interp, this, args| {
            each(interp, this, &arg(args, 0), |_, _, _| None)?;
            Ok(Value::Undefined)
        },
        "some" => |interp, this, args| {
            let hit = each(interp, this, &arg(args, 0), |_, _, r| r.truthy().then_some(Value::Bool(true)))?;
            Ok(Value::Bool(hit.is_some()))
        },
        "every" => |interp, this, args| {
            let miss = each(interp, this, &arg(args, 0), |_, _, r| (!r.truthy()).then_some(Value::Bool(false)))?;
            Ok(Value::Bool(miss.is_none()))
        },
        "find" => |interp, this, args| {
            let found = each(interp, this, &arg(args, 0), |_, item, r| r.truthy().then(|| item.clone()))?;
            Ok(found.unwrap_or(Value::Undefined))
        },
        "reduce" => |interp, this, args| {
            let cb = arg(args, 0);
            if !cb.is_callable() {
                return Err(Exception::type_error(format!("{} is not a function", cb.to_js_string())));
            }
            let a = array_of(this)?;
            let len = a.borrow().len();
            let (mut acc, start) = match args.get(1) {
                Some(init) => (init.clone(), 0),
                None => match item_at(&a, 0) {
                    Some(first) => (first, 1),
                    None => return Err(Exception::type_error("Reduce of empty array with no initial value")),
                },
            };
            for i in start..len {
                let Some(item) = item_at(&a, i) else { continue };
                acc = interp.call(&cb, &[acc, item, Value::Number(i as f64), this.clone()])?;
            }
            Ok(acc)
        },
        "join" => |_, this, args| {
            let sep = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                s => s.to_js_string(),
            };
            Ok(join_array(&array_of(this)?, &sep).into())
        },
        "indexOf" => |_, this, args| {
            let needle = arg(args, 0);
            let pos = array_of(this)?.borrow().iter().position(|v| v.strict_eq(&needle));
            Ok(pos.map_or(-1.0, |i| i as f64).into())
        },
        "includes" => |_, this, args| {
            let needle = arg(args, 0);
            Ok(array_of(this)?.borrow().iter().any(|v| same_value_zero(v, &needle)).into())
        },
        "slice" => |_, this, args| {
            let items = array_of(this)?.borrow().clone();
            let start = relative(&arg(args, 0), items.len(), 0);
            let end = relative(&arg(args, 1), items.len(), items.len());
            Ok(Value::array(items.get(start..end.max(start)).map(<[Value]>::to_vec).unwrap_or_default()))
        },
        "concat" => |_, this, args| {
            let mut out = array_of(this)?.borrow().clone();
            for a in args {
                match a {
                    Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::array(out))
        },
        "reverse" => |_, this, _| {
            array_of(this)?.borrow_mut().reverse();
            Ok(this.clone())
        },
        _ => return Value::Undefined,
    };
    bound(key, obj, f)
}

/* ───────────────────────── Chaînes ───────────────────────── */

fn str_of(this: &Value) -> Rc<str> {
    match this {
        Value::String(s) => Rc::clone(s),
        other => other.to_js_string().into(),
    }
}

/// Indice en caractères → indice en octets.
fn byte_index(s: &str, chars: usize) -> usize { s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i) }

fn string_property(obj: &Value, s: &str, key: &str) -> Value {
    let f: Builtin = match key {
        "length" => return Value::Number(s.chars().count() as f64),
        k if k.parse::<usize>().is_ok() => {
            return k
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map_or(Value::Undefined, |c| Value::string(c.to_string()))
        }
        "toUpperCase" => |_, this, _| Ok(str_of(this).to_uppercase().into()),
        "toLowerCase" => |_, this, _| Ok(str_of(this).to_lowercase().into()),
        "trim" => |_, this, _| Ok(str_of(this).trim().into()),
        "split" => |_, this, args| {
            let s = str_of(this);
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => vec![Value::String(s)],
                sep => match sep.to_js_string().as_str() {
                    "" => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    sep => s.split(sep).map(Value::from).collect(),
                },
            };
            Ok(Value::array(parts))
        },
        "indexOf" => |_, this, args| {
            let s = str_of(this);
            let needle = arg(args, 0).to_js_string();
            Ok(s.find(&needle).map_or(-1.0, |b| s[..b].chars().count() as f64).into())
        },
        "includes" => |_, this, args| Ok(str_of(this).contains(&arg(args, 0).to_js_string()).into()),
        "startsWith" => |_, this, args| Ok(str_of(this).starts_with(&arg(args, 0).to_js_string()).into()),
        "endsWith" => |_, this, args| Ok(str_of(this).ends_with(&arg(args, 0).to_js_string()).into()),
        "slice" => |_, this, args| {
            let s = str_of(this);
            let len = s.chars().count();
            let start = relative(&arg(args, 0), len, 0);
            let end = relative(&arg(args, 1), len, len).max(start);
            Ok(s[byte_index(&s, start)..byte_index(&s, end)].into())
        },
        "charAt" => |_, this, args| {
            let i = num(args, 0);
            let i = if i.is_nan() { 0 } else { i as usize };
            Ok(str_of(this).chars().nth(i).map_or_else(String::new, |c| c.to_string()).into())
        },
        "replace" => |interp, this, args| {
            let s = str_of(this);
            let pattern = arg(args, 0).to_js_string();
            let Some(at) = s.find(&pattern) else { return Ok(Value::String(s)) };
            let replacement = match arg(args, 1) {
                f if f.is_callable() => interp.call(&f, &[Value::from(pattern.as_str())])?.to_js_string(),
                r => r.to_js_string(),
            };
            Ok(format!("{}{}{}", &s[..at], replacement, &s[at + pattern.len()..]).into())
        },
        "repeat" => |_, this, args| {
            let n = num(args, 0);
            let n = if n.is_nan() { 0.0 } else { n };
            if n < 0.0 || n.is_infinite() {
                return Err(Exception::range_error(format!("Invalid count value: {}", format_number(n))));
            }
            let s = str_of(this);
            if !s.is_empty() && n * s.len() as f64 > MAX_STRING_LENGTH as f64 {
                return Err(Exception::range_error("Invalid string length"));
            }
            Ok(s.repeat(n as usize).into())
        },
        _ => return Value::Undefined,
    };
    bound(key, obj, f)
}

/// Copie une globale de données (politique) vers une nouvelle exécution.
pub fn isolate(v: &Value) -> Value {
    match v {
        Value::Native(_) | Value::Function(_) => v.clone(),
        data => data.deep_copy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Limits;
    use pretty_assertions::assert_eq;
    use tagscript_parser::{parse, ParseOptions};

    fn run(src: &str) -> Value {
        let program = parse(src, ParseOptions::portable()).unwrap();
        let scope = Scope::root();
        install(&scope);
        Interpreter::new(Limits::default(), Rc::from(src)).run_program(&program, &scope).unwrap();
        scope.get("r").unwrap()
    }

    fn eval(src: &str) -> Value { run(&format!("var r = {src};")) }

    /// `name: message` de l’erreur levée par `stmts`.
    fn caught(stmts: &str) -> String {
        run(&format!("var r = 'rien'; try {{ {stmts} }} catch (e) {{ r = e.name + ': ' + e.message; }}")).to_js_string()
    }

    fn text(src: &str) -> String { eval(src).to_js_string() }

    #[test]
    fn math_and_numbers() {
        assert_eq!(eval("Math.max(1, 5, 3)"), Value::from(5));
        assert_eq!(eval("Math.min()"), Value::Number(f64::INFINITY));
        assert_eq!(eval("Math.round(2.5) + Math.round(-2.5)"), Value::from(1));
        assert_eq!(eval("Math.pow(2, 8)"), Value::from(256));
        assert_eq!(eval("parseInt('42px')"), Value::from(42));
        assert_eq!(eval("parseInt('0x1F')"), Value::from(31));
        assert_eq!(eval("parseInt('101', 2)"), Value::from(5));
        assert!(eval("parseInt('px')").to_number().is_nan());
        assert_eq!(eval("parseFloat('3.5e2 units')"), Value::from(350));
        assert_eq!(eval("parseFloat('-.5')"), Value::from(-0.5));
        assert_eq!(text("(1.005).toFixed(1)"), "1.0");
        assert_eq!(eval("isNaN('abc')"), Value::Bool(true));
    }

    #[test]
    fn json_and_objects() {
        assert_eq!(text("JSON.stringify({ a: [1, 'x', null], b: undefined })"), r#"{"a":[1,"x",null]}"#);
        assert_eq!(text("JSON.stringify({ a: { b: 1 } }, null, 4)"), "{\n    \"a\": {\n        \"b\": 1\n    }\n}");
        assert_eq!(text("Object.keys({ b: 1, a: 2 })"), "b,a");
        assert_eq!(text("Object.entries({ k: 'v' })[0]"), "k,v");
        assert_eq!(text("Object.assign({ a: 1 }, { b: 2 }, { a: 3 }).a"), "3");
        assert_eq!(eval("Array.isArray([])"), Value::Bool(true));
    }

    #[test]
    fn array_methods() {
        assert_eq!(text("[1, 2, 3].map(x => x * 2)"), "2,4,6");
        assert_eq!(text("[1, 2, 3, 4].filter(x => x % 2 === 0)"), "2,4");
        assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b)"), Value::from(6));
        assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b, 10)"), Value::from(16));
        assert_eq!(text("[3, 1, 2].slice(-2)"), "1,2");
        assert_eq!(text("[1].concat([2, 3], 4)"), "1,2,3,4");
        assert_eq!(text("[1, 2, 3].reverse()"), "3,2,1");
        assert_eq!(eval("[1, 2].some(x => x > 1) && [1, 2].every(x => x > 0)"), Value::Bool(true));
        assert_eq!(eval("[5, 6].find(x => x > 5)"), Value::from(6));
        assert_eq!(eval("[NaN].includes(NaN)"), Value::Bool(true));
        assert_eq!(eval("[NaN].indexOf(NaN)"), Value::from(-1));
        assert_eq!(text("[1, null, 2].join('-')"), "1--2");
    }

    #[test]
    fn iteration_skips_removed_items() {
        assert_eq!(run("var a = [1, 2]; var r = a.reduce((s, x) => { a.pop(); return s + x; }, 0);"), Value::from(1));
        assert_eq!(run("var a = [1, 2, 3]; var r = 0; a.forEach(x => { a.pop(); r += x; });"), Value::from(3));
        assert_eq!(run("var a = [1]; var r = a.map(x => { a.push(9); return x; }).length;"), Value::from(1));
    }

    #[test]
    fn growth_is_bounded() {
        assert_eq!(caught("var a = []; a[1e10] = 1;"), "RangeError: Invalid array length");
        assert_eq!(caught("var a = []; a.length = 1e10;"), "RangeError: Invalid array length");
        assert_eq!(caught("new Array(1e10);"), "RangeError: Invalid array length: 10000000000");
        assert_eq!(caught("'ab'.repeat(1e9);"), "RangeError: Invalid string length");
        assert_eq!(caught("var s = 'x'.repeat(40000000); s = s + s;"), "RangeError: Invalid string length");
        assert_eq!(run("var a = []; a[3] = 1; var r = a.length;"), Value::from(4));
    }

    #[test]
    fn cyclic_structures() {
        assert_eq!(
            caught("var o = {}; o.self = o; JSON.stringify(o);"),
            "TypeError: Converting circular structure to JSON"
        );
        assert_eq!(run("var a = [1]; a.push(a); var r = a.join(',');"), Value::from("1,"));
        assert_eq!(run("var a = [1]; a.push([a, 2]); var r = String(a);"), Value::from("1,,2"));
    }

    #[test]
    fn string_methods() {
        assert_eq!(text("' Hi '.trim().toUpperCase()"), "HI");
        assert_eq!(text("'a,b,c'.split(',').length"), "3");
        assert_eq!(text("'héllo'.slice(1, 3)"), "él");
        assert_eq!(text("'abc'.charAt(1) + 'abc'[2]"), "bc");
        assert_eq!(text("'a-b-c'.replace('-', '+')"), "a+b-c");
        assert_eq!(text("'ab'.repeat(3)"), "ababab");
        assert_eq!(eval("'hello'.indexOf('l')"), Value::from(2));
        assert_eq!(eval("'hello'.startsWith('he') && 'hello'.endsWith('lo')"), Value::Bool(true));
    }

    #[test]
    fn promises_settle_synchronously() {
        assert_eq!(eval("Promise.resolve(1).then(x => x + 1)").settle().unwrap(), Value::from(2));
        assert_eq!(eval("Promise.reject(1).catch(x => x + 2)").settle().unwrap(), Value::from(3));
        assert_eq!(eval("new Promise((res) => res(7))").settle().unwrap(), Value::from(7));
        assert_eq!(eval("__await(__async(function () { return 4; }))"), Value::from(4));
        assert!(eval("new Promise(() => { throw new TypeError('x'); })").settle().is_err());
    }

    #[test]
    fn errors_expose_name_and_message() {
        assert_eq!(text("new TypeError('bad').name"), "TypeError");
        assert_eq!(text("Error('plain').message"), "plain");
        assert_eq!(text("String(new RangeError('r'))"), "RangeError: r");
    }
}
