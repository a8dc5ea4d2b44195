use std::cell::Cell;
use std::fs;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tagscript_compiler::{transpile, CompilerOptions};
use tagscript_yaml::{CodeValue, DumpOptions, Node, Schema, Style, TagConfig, TagError, Value};

const DOC: &str = "\
customModule: !ts/module |
  export default {
    boolean: true,
    func: () => true,
    asyncFunc: async (x: number) => x * 2,
  }
greet: !ts/function |
  export default function greet(name: string): string {
    return 'hello ' + name;
  }
plain: 3
";

const MODULE_SRC: &str = "\
export default {
  boolean: true,
  func: () => true,
  asyncFunc: async (x: number) => x * 2,
}
";

fn schema() -> Schema { Schema::default_tags(&TagConfig::new()) }

fn code<'a>(doc: &'a Node, key: &str) -> &'a CodeValue {
    doc.get(key).and_then(Node::as_code).unwrap_or_else(|| panic!("`{key}` n’est pas du code"))
}

#[test]
fn module_exports_are_live_values() {
    let doc = schema().load(DOC).unwrap();
    let module = code(&doc, "customModule").as_module().unwrap();
    let default = module.get("default").unwrap();
    assert_eq!(default.get("boolean"), Some(Value::Bool(true)));
    assert_eq!(default.get("func").unwrap().call(&[]).unwrap(), Value::Bool(true));

    let promise = default.get("asyncFunc").unwrap().call(&[Value::from(21)]).unwrap();
    assert_eq!(promise.settle().unwrap(), Value::from(42));

    assert_eq!(module.original_code(), MODULE_SRC);
    assert_eq!(module.transpiled_code(), transpile(MODULE_SRC, &CompilerOptions::default()).unwrap());
    assert!(matches!(doc.get("plain"), Some(Node::Number(_))));
}

#[test]
fn function_tag_yields_a_callable() {
    let doc = schema().load(DOC).unwrap();
    let greet = code(&doc, "greet").as_function().unwrap();
    assert_eq!(greet.call(&[Value::from("yaml")]).unwrap(), Value::from("hello yaml"));
    assert_eq!(greet.call(&[Value::from("yaml")]).unwrap(), Value::from("hello yaml"));
}

#[test]
fn original_style_round_trips() {
    let schema = schema();
    let doc = schema.load(DOC).unwrap();
    let out = schema.dump(&doc, &DumpOptions::default()).unwrap();
    let again = schema.load(&out).unwrap();
    let module = code(&again, "customModule").as_module().unwrap();
    assert_eq!(module.original_code(), MODULE_SRC);
    assert_eq!(schema.dump(&again, &DumpOptions::default()).unwrap(), out);
}

#[test]
fn transpiled_style_drops_module_syntax() {
    let schema = schema();
    let doc = schema.load(DOC).unwrap();
    let opts = DumpOptions::default().with_style(Style::Transpiled);
    let out = schema.dump(&doc, &opts).unwrap();
    assert!(!out.contains("export default"), "{out}");
    assert!(out.contains("exports.default"), "{out}");
    assert_eq!(out, schema.dump(&doc, &opts).unwrap());
}

#[test]
fn per_tag_style_wins() {
    let schema = schema();
    let doc = schema.load(DOC).unwrap();
    let opts = DumpOptions::default().with_style(Style::Transpiled).with_tag_style("ts/function", Style::Minified);
    let out = schema.dump(&doc, &opts).unwrap();
    assert!(out.contains("function greet(name){return\"hello \"+name}exports.default=greet;"), "{out}");
}

#[test]
fn invalid_scalar_is_logged_once() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let schema = Schema::default_tags(&TagConfig::new().with_log(move |_| counter.set(counter.get() + 1)));
    let err = schema.load("bad: !ts/module '---'\n").unwrap_err();
    assert!(matches!(&err, TagError::InvalidScalar { tag } if tag == "!ts/module"), "{err}");
    assert_eq!(calls.get(), 1);
}

#[test]
fn runtime_failures_abort_the_load() {
    let err = schema().load("m: !ts/module throw new TypeError('nope')\n").unwrap_err();
    assert!(err.to_string().contains("TypeError: nope"), "{err}");

    let err = schema().load("f: !ts/function export const x = 1\n").unwrap_err();
    assert!(matches!(err, TagError::MissingExport));
}

#[test]
fn includes_read_relative_to_base() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("square.ts"), "export default (n: number) => n * n;\n").unwrap();
    fs::write(dir.path().join("consts.ts"), "export const answer = 42;\n").unwrap();

    let schema = Schema::default_tags(&TagConfig::new().with_base_path(dir.path()));
    let doc = schema.load("sq: !ts/include/function square.ts\nc: !ts/include/module consts.ts\n").unwrap();
    let sq = code(&doc, "sq").as_function().unwrap();
    assert_eq!(sq.call(&[Value::from(7)]).unwrap(), Value::from(49));
    assert_eq!(code(&doc, "c").as_module().unwrap().get("answer"), Some(Value::from(42)));

    let out = schema.dump(&doc, &DumpOptions::default()).unwrap();
    assert!(out.contains("!ts/function"), "{out}");
    assert!(out.contains("!ts/module"), "{out}");
    assert!(!out.contains("include"), "{out}");
}

#[test]
fn missing_include_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = TagConfig::new().with_base_path(dir.path());
    let tag = tagscript_yaml::IncludeTag::module(config);
    let err = tagscript_yaml::ScalarTag::construct(&tag, "nowhere.ts").unwrap_err();
    assert!(matches!(err, TagError::Io { .. }));
    assert!(err.to_string().contains("nowhere.ts"), "{err}");
}

#[test]
fn host_values_are_written_by_kind() {
    let schema = schema();
    let mut doc = schema.load("greet: !ts/function export default () => 1\n").unwrap();
    let f = code(&doc, "greet").as_function().unwrap().value().clone();
    doc.insert("copy", Node::Code(CodeValue::Detached(f)));
    doc.insert("data", Node::Code(CodeValue::Detached(Value::from(vec![Value::from(1), Value::from("x")]))));
    let out = schema.dump(&doc, &DumpOptions::default()).unwrap();
    let again = schema.load(&out).unwrap();
    let copy = code(&again, "copy").as_function().unwrap();
    assert_eq!(copy.call(&[]).unwrap(), Value::from(1));
    assert!(code(&again, "data").as_module().is_some());
}
