//! Balisage `<Tag attr="v" x={e}>texte {e}</Tag>` lu en mode brut.
//!
//! À l’entrée `look` vaut `<` et le lexer est positionné juste après ; le texte et
//! les attributs sont lus caractère par caractère, les `{…}` repassent par le parser.

use tagscript_ast::{Attr, AttrValue, Child, Element, Expr};
use tagscript_core::{Pos, Span};
use tagscript_lexer::TokenKind;

use crate::{PResult, Parser};

impl Parser<'_> {
    pub(crate) fn parse_markup(&mut self) -> PResult<Expr> {
        let el = self.parse_element()?;
        self.prime()?;
        Ok(Expr::Markup(Box::new(el)))
    }

    /// Reprend la lecture par jetons là où le mode brut s’est arrêté.
    fn prime(&mut self) -> PResult<()> {
        self.prev_end = u32::try_from(self.lx.offset()).unwrap_or(u32::MAX);
        self.look = self.lx.next()?;
        Ok(())
    }

    /// Élément dont le `<` vient d’être consommé.
    fn parse_element(&mut self) -> PResult<Element> {
        self.lx.skip_markup_ws();
        if self.lx.raw_eat('>') {
            let children = self.parse_children(None)?;
            return Ok(Element { name: None, attrs: Vec::new(), children });
        }
        let name = self.lx.scan_markup_name();
        if name.is_empty() {
            return self.raw_error("Identifier expected.");
        }
        let mut attrs = Vec::new();
        loop {
            self.lx.skip_markup_ws();
            if self.lx.raw_eat('/') {
                self.lx.skip_markup_ws();
                if !self.lx.raw_eat('>') {
                    return self.raw_error("'>' expected.");
                }
                return Ok(Element { name: Some(name.to_string()), attrs, children: Vec::new() });
            }
            if self.lx.raw_eat('>') {
                break;
            }
            if self.lx.raw_peek() == Some('{') {
                return self.raw_error("Spread attributes are not supported.");
            }
            let attr = self.lx.scan_markup_name();
            if attr.is_empty() {
                return self.raw_error("Identifier expected.");
            }
            self.lx.skip_markup_ws();
            let value = if self.lx.raw_eat('=') {
                self.lx.skip_markup_ws();
                match self.lx.raw_peek() {
                    Some('"' | '\'') => Some(AttrValue::Str(self.lx.scan_markup_string()?.to_string())),
                    Some('{') => {
                        self.lx.raw_bump();
                        match self.parse_embedded_expr()? {
                            Some(e) => Some(AttrValue::Expr(e)),
                            None => {
                                return self.error(self.look.span, "JSX attributes must only be assigned a non-empty expression.");
                            }
                        }
                    }
                    _ => return self.raw_error("'{' expected."),
                }
            } else {
                None
            };
            attrs.push(Attr { name: attr.to_string(), value });
        }
        let children = self.parse_children(Some(name))?;
        Ok(Element { name: Some(name.to_string()), attrs, children })
    }

    fn parse_children(&mut self, closing: Option<&str>) -> PResult<Vec<Child>> {
        let mut children = Vec::new();
        loop {
            if let Some(text) = fold_markup_text(self.lx.scan_markup_text()) {
                children.push(Child::Text(text));
            }
            match self.lx.raw_peek() {
                Some('{') => {
                    self.lx.raw_bump();
                    if let Some(e) = self.parse_embedded_expr()? {
                        children.push(Child::Expr(e));
                    }
                }
                Some('<') => {
                    self.lx.raw_bump();
                    self.lx.skip_markup_ws();
                    if !self.lx.raw_eat('/') {
                        children.push(Child::Element(self.nested(Self::parse_element)?));
                        continue;
                    }
                    self.lx.skip_markup_ws();
                    let name = self.lx.scan_markup_name();
                    self.lx.skip_markup_ws();
                    if name != closing.unwrap_or("") {
                        return match closing {
                            Some(tag) => self.raw_error(format!("Expected corresponding JSX closing tag for '{tag}'.")),
                            None => self.raw_error("Expected corresponding closing tag for JSX fragment."),
                        };
                    }
                    if !self.lx.raw_eat('>') {
                        return self.raw_error("'>' expected.");
                    }
                    return Ok(children);
                }
                _ => {
                    return match closing {
                        Some(tag) => self.raw_error(format!("JSX element '{tag}' has no corresponding closing tag.")),
                        None => self.raw_error("JSX fragment has no corresponding closing tag."),
                    };
                }
            }
        }
    }

    /// Contenu d’un `{…}` dont l’accolade ouvrante est consommée ; `None` si vide.
    /// Le lexer reste positionné juste après `}`.
    fn parse_embedded_expr(&mut self) -> PResult<Option<Expr>> {
        self.look = self.lx.next()?;
        if self.at(&TokenKind::RBrace) {
            return Ok(None);
        }
        let e = self.parse_assign()?;
        if !self.at(&TokenKind::RBrace) {
            return self.error(self.look.span, "'}' expected.");
        }
        Ok(Some(e))
    }

    fn raw_error<T>(&self, message: impl Into<String>) -> PResult<T> {
        let at = Pos(u32::try_from(self.lx.offset()).unwrap_or(u32::MAX));
        self.error(Span::new(self.source, at, at), message)
    }
}

/// Normalise le texte brut : lignes rognées (sauf bords extérieurs), lignes vides
/// supprimées, jointure par une espace.
fn fold_markup_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim_end_matches('\r').replace('\t', " ");
        let mut l = line.as_str();
        if i != 0 {
            l = l.trim_start_matches(' ');
        }
        if i != last {
            l = l.trim_end_matches(' ');
        }
        if l.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(l);
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::fold_markup_text;
    use crate::tests::{parse_err, parse_ok};
    use crate::{parse, ParseOptions};
    use pretty_assertions::assert_eq;
    use tagscript_ast::{AttrValue, Child, Expr, Stmt};

    fn markup(src: &str) -> tagscript_ast::Element {
        let p = parse_ok(src);
        let Some(Stmt::Var { decls, .. }) = p.body.into_iter().next() else { panic!() };
        match decls.into_iter().next().and_then(|d| d.init) {
            Some(Expr::Markup(el)) => *el,
            other => panic!("markup expected, got {other:?}"),
        }
    }

    #[test]
    fn elements_attributes_children() {
        let el = markup(r#"const e = <div id="main" hidden data-x={1 + 2}>Hello {name}!<br/></div>"#);
        assert_eq!(el.name.as_deref(), Some("div"));
        assert_eq!(el.attrs.len(), 3);
        assert_eq!(el.attrs[0].value, Some(AttrValue::Str("main".into())));
        assert_eq!(el.attrs[1].value, None);
        assert_eq!(el.attrs[2].name, "data-x");
        assert_eq!(el.children.len(), 4);
        assert_eq!(el.children[0], Child::Text("Hello ".into()));
        assert_eq!(el.children[1], Child::Expr(Expr::ident("name")));
        assert_eq!(el.children[2], Child::Text("!".into()));
        assert!(matches!(&el.children[3], Child::Element(br) if br.name.as_deref() == Some("br")));
    }

    #[test]
    fn fragments_and_nesting() {
        let el = markup("const e = <>\n  <A.B x={<i/>} />\n  {/* rien */}\n  {cond ? <b>1</b> : null}\n</>;");
        assert_eq!(el.name, None);
        assert_eq!(el.children.len(), 2);
        let Child::Element(inner) = &el.children[0] else { panic!() };
        assert_eq!(inner.name.as_deref(), Some("A.B"));
        assert!(matches!(&el.children[1], Child::Expr(Expr::Cond { .. })));
    }

    #[test]
    fn statement_continues_after_markup() {
        let p = parse_ok("const a = <p/>\nconst b = 2");
        assert_eq!(p.body.len(), 2);
    }

    #[test]
    fn markup_errors() {
        assert_eq!(
            parse_err("const e = <a><b></a>").message,
            "Expected corresponding JSX closing tag for 'b'."
        );
        assert_eq!(parse_err("const e = <a>").message, "JSX element 'a' has no corresponding closing tag.");
        assert_eq!(parse_err("const e = <a {...p} />").message, "Spread attributes are not supported.");
    }

    #[test]
    fn markup_disabled_reports_expression_expected() {
        let d = parse("const e = <a/>", ParseOptions::portable()).unwrap_err();
        assert_eq!(d.message, "Expression expected.");
    }

    #[test]
    fn text_folding() {
        assert_eq!(fold_markup_text("  Hello  "), Some("  Hello  ".into()));
        assert_eq!(fold_markup_text("\n   Hello\n   world  \n "), Some("Hello world".into()));
        assert_eq!(fold_markup_text("\n   \n"), None);
        assert_eq!(fold_markup_text("a\tb"), Some("a b".into()));
    }
}
