//! Balisage → appels à la fabrique d’éléments.
//!
//! `<div id="a">{x}</div>` → `React.createElement("div", { id: "a" }, x)`.

use tagscript_ast::{walk_expr, AttrValue, Child, Element, Expr, Program, Prop, PropKey, PropKind, VisitMut};
use tagscript_lexer::is_identifier;

use super::{dotted, Ctx, Pass};

/// Abaissement du balisage (mode `react`).
#[derive(Debug, Clone)]
pub struct MarkupLowering {
    factory: String,
    fragment: String,
}

impl MarkupLowering {
    /// Fabriques données en noms pointés.
    pub fn new(factory: &str, fragment: &str) -> Self {
        Self { factory: factory.to_string(), fragment: fragment.to_string() }
    }

    fn lower(&self, el: Element) -> Expr {
        let tag = match el.name {
            None => dotted(&self.fragment),
            Some(name) if is_intrinsic(&name) => Expr::Str(name),
            Some(name) => dotted(&name),
        };
        let props = if el.attrs.is_empty() {
            Expr::Null
        } else {
            Expr::Object(
                el.attrs
                    .into_iter()
                    .map(|a| Prop {
                        key: if is_identifier(&a.name) { PropKey::Ident(a.name) } else { PropKey::Str(a.name) },
                        value: match a.value {
                            None => Expr::Bool(true),
                            Some(AttrValue::Str(s)) => Expr::Str(s),
                            Some(AttrValue::Expr(e)) => e,
                        },
                        kind: PropKind::Init,
                    })
                    .collect(),
            )
        };
        let mut args = vec![tag, props];
        for child in el.children {
            args.push(match child {
                Child::Text(t) => Expr::Str(t),
                Child::Expr(e) => e,
                Child::Element(c) => self.lower(c),
            });
        }
        Expr::call(dotted(&self.factory), args)
    }
}

/// `div`, `my-widget` : balises natives, passées en chaîne.
fn is_intrinsic(name: &str) -> bool {
    !name.contains('.') && (name.starts_with(|c: char| c.is_ascii_lowercase()) || name.contains('-'))
}

impl Pass for MarkupLowering {
    fn name(&self) -> &'static str { "markup" }

    fn run(&mut self, _ctx: &mut Ctx<'_>, program: &mut Program) {
        self.visit_stmts(&mut program.body);
    }
}

impl VisitMut for MarkupLowering {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
        if matches!(expr, Expr::Markup(_)) {
            if let Expr::Markup(el) = std::mem::replace(expr, Expr::Null) {
                *expr = self.lower(*el);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{transpile, CompilerOptions, Target};
    use pretty_assertions::assert_eq;

    fn react(src: &str) -> String {
        let opts = CompilerOptions { target: Target::EsNext, ..CompilerOptions::default() };
        transpile(src, &opts).unwrap()
    }

    #[test]
    fn intrinsic_and_component_tags() {
        assert_eq!(react("x = <div />"), "x = React.createElement(\"div\", null);");
        assert_eq!(react("x = <Foo.Bar />"), "x = React.createElement(Foo.Bar, null);");
        assert_eq!(react("x = <my-tag />"), "x = React.createElement(\"my-tag\", null);");
    }

    #[test]
    fn attributes_and_children() {
        assert_eq!(
            react("x = <a href=\"/\" disabled data-x={1}>hi {name}<b /></a>"),
            "x = React.createElement(\"a\", { href: \"/\", disabled: true, \"data-x\": 1 }, \"hi \", name, React.createElement(\"b\", null));"
        );
    }

    #[test]
    fn fragments_use_fragment_factory() {
        let opts = CompilerOptions {
            target: Target::EsNext,
            jsx_factory: "h".into(),
            jsx_fragment_factory: "Frag".into(),
            ..CompilerOptions::default()
        };
        assert_eq!(transpile("x = <><i /></>", &opts).unwrap(), "x = h(Frag, null, h(\"i\", null));");
    }

    #[test]
    fn nested_markup_inside_expressions() {
        assert_eq!(
            react("x = <ul>{items.map(i => <li>{i}</li>)}</ul>"),
            "x = React.createElement(\"ul\", null, items.map(i => React.createElement(\"li\", null, i)));"
        );
    }
}
