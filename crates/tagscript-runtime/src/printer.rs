//! Impression d’une valeur en texte source.
//!
//! Sert de repli quand une valeur doit redevenir du code sans en avoir de
//! provenance (objet construit à la main, fonction assignée en mémoire).
//!
//! Règles, dans l’ordre :
//!
//! | Valeur       | Texte                                   |
//! |--------------|-----------------------------------------|
//! | `undefined`  | `undefined`                             |
//! | `null`       | `null`                                  |
//! | chaîne       | `'…'` (guillemets internes non échappés) |
//! | fonction     | son texte source capturé                |
//! | nombre       | écriture décimale                       |
//! | tableau      | `[ a, b ]`, vide : `[  ]`               |
//! | objet        | `{ k: v }`, vide : `{  }`               |
//! | autre        | encodage JSON                           |

use crate::value::Value;

/// Rend `value` sous forme de texte source.
pub fn print_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::String(s) => {
            out.push('\'');
            out.push_str(s);
            out.push('\'');
        }
        Value::Function(_) | Value::Native(_) | Value::Number(_) => out.push_str(&value.to_js_string()),
        Value::Array(items) => {
            out.push_str("[ ");
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push_str(" ]");
        }
        Value::Object(o) => {
            out.push_str("{ ");
            for (i, (k, v)) in o.borrow().props.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(k);
                out.push_str(": ");
                write_value(out, v);
            }
            out.push_str(" }");
        }
        Value::Bool(_) | Value::Promise(_) => {
            let json = value.to_json().ok().flatten().map_or_else(|| "undefined".to_string(), |j| j.to_string());
            out.push_str(&json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn obj(entries: Vec<(&str, Value)>) -> Value {
        Value::object(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>())
    }

    #[test]
    fn primitives() {
        assert_eq!(print_value(&Value::Undefined), "undefined");
        assert_eq!(print_value(&Value::Null), "null");
        assert_eq!(print_value(&Value::from("hi")), "'hi'");
        assert_eq!(print_value(&Value::from(1.5)), "1.5");
        assert_eq!(print_value(&Value::from(-3)), "-3");
        assert_eq!(print_value(&Value::Bool(true)), "true");
    }

    #[test]
    fn empty_containers_keep_inner_spaces() {
        assert_eq!(print_value(&Value::array(vec![])), "[  ]");
        assert_eq!(print_value(&obj(vec![])), "{  }");
    }

    #[test]
    fn nested_structures() {
        let v = obj(vec![
            ("list", Value::array(vec![1.into(), "a".into(), Value::Null])),
            ("inner", obj(vec![("flag", false.into())])),
        ]);
        assert_eq!(print_value(&v), "{ list: [ 1, 'a', null ], inner: { flag: false } }");
    }

    #[test]
    fn quotes_are_not_escaped() {
        assert_eq!(print_value(&Value::from("it's")), "'it's'");
    }

    #[test]
    fn natives_print_placeholder_body() {
        let f = Value::native("twice", |_, _, _| Ok(Value::Undefined));
        assert_eq!(print_value(&f), "function twice() { [native code] }");
    }

    #[test]
    fn error_objects_print_like_empty_objects() {
        assert_eq!(print_value(&Value::error("Error", "hidden")), "{  }");
    }

    fn data() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1000i32..1000).prop_map(Value::from),
            "[a-z ]{0,6}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|entries| {
                    Value::object(entries.into_iter().collect::<IndexMap<_, _>>())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn printing_is_deterministic_and_balanced(v in data()) {
            let once = print_value(&v);
            prop_assert_eq!(&once, &print_value(&v.deep_copy()));
            prop_assert_eq!(once.matches('[').count(), once.matches(']').count());
            prop_assert_eq!(once.matches('{').count(), once.matches('}').count());
        }
    }
}
