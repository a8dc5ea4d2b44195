//! Schéma YAML : chargement, vérification et écriture des documents tagués.
//!
//! Le document passe par [`serde_yaml::Value`] ; chaque nœud tagué dont le
//! tag appartient au schéma est validé puis construit. Les tags inconnus sont
//! conservés tels quels.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Number, Value as Yaml};

use crate::error::{TagError, TagResult};
use crate::provenance::CodeValue;
use crate::style::Style;
use crate::tag::{FunctionTag, IncludeTag, ModuleTag, ScalarTag, TagConfig, TagKind};

/* ─────────────────────────── Nœuds ─────────────────────────── */

/// Nœud d’un document chargé.
#[derive(Debug, Clone)]
pub enum Node {
    /// `~` / vide.
    Null,
    /// Booléen.
    Bool(bool),
    /// Nombre.
    Number(Number),
    /// Chaîne.
    String(String),
    /// Séquence.
    Sequence(Vec<Node>),
    /// Mapping, ordre du document conservé.
    Mapping(Vec<(Node, Node)>),
    /// Tag hors schéma, conservé.
    Tagged {
        /// Tag (forme `!nom`).
        tag: String,
        /// Contenu.
        value: Box<Node>,
    },
    /// Valeur de code.
    Code(CodeValue),
}

impl Node {
    /// Valeur associée à la clé chaîne `key` d’un mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|(k, _)| k.as_str() == Some(key)).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Élément `index` d’une séquence.
    pub fn at(&self, index: usize) -> Option<&Node> {
        match self {
            Node::Sequence(items) => items.get(index),
            _ => None,
        }
    }

    /// Chaîne, si c’en est une.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Valeur de code, si c’en est une.
    pub const fn as_code(&self) -> Option<&CodeValue> {
        match self {
            Node::Code(c) => Some(c),
            _ => None,
        }
    }

    /// Insère ou remplace `key` dans un mapping (sans effet sinon).
    pub fn insert(&mut self, key: &str, value: Node) {
        if let Node::Mapping(entries) = self {
            match entries.iter_mut().find(|(k, _)| k.as_str() == Some(key)) {
                Some((_, slot)) => *slot = value,
                None => entries.push((Node::String(key.to_string()), value)),
            }
        }
    }
}

impl From<CodeValue> for Node {
    fn from(c: CodeValue) -> Self { Node::Code(c) }
}

/* ─────────────────────────── Options d’écriture ─────────────────────────── */

/// Choix des styles à l’écriture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    /// Style commun (sinon le style par défaut de chaque tag).
    pub style: Option<Style>,
    /// Styles par tag, prioritaires (clé : nom du tag, avec ou sans `!`).
    pub styles: IndexMap<String, Style>,
}

impl DumpOptions {
    /// Style commun.
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Style pour un tag.
    #[must_use]
    pub fn with_tag_style(mut self, tag: &str, style: Style) -> Self {
        self.styles.insert(normalize(tag).to_string(), style);
        self
    }

    fn resolve(&self, tag: &dyn ScalarTag) -> Style {
        let name = normalize(tag.name());
        self.styles
            .iter()
            .find(|(k, _)| normalize(k) == name)
            .map(|(_, s)| *s)
            .or(self.style)
            .unwrap_or_else(|| tag.default_style())
    }
}

/// Problème relevé par [`Schema::check`].
#[derive(Debug)]
pub struct Finding {
    /// Chemin du nœud (`a.b[2]`, `$` pour la racine).
    pub path: String,
    /// Cause.
    pub error: TagError,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.path, self.error) }
}

/* ─────────────────────────── Schéma ─────────────────────────── */

const CORE_PREFIX: &str = "tag:yaml.org,2002:";

/// Forme canonique d’un nom de tag : sans `!` ni préfixe `tag:yaml.org,2002:`.
pub fn normalize(tag: &str) -> &str {
    let tag = tag.strip_prefix(CORE_PREFIX).unwrap_or(tag);
    tag.trim_start_matches('!')
}

/// Ensemble ordonné de tags.
#[derive(Default)]
pub struct Schema {
    tags: Vec<Box<dyn ScalarTag>>,
}

impl Schema {
    /// Schéma vide.
    pub fn new() -> Self { Self::default() }

    /// Les quatre tags standard, partageant `config` (le nom éventuel est ignoré).
    pub fn default_tags(config: &TagConfig) -> Self {
        let config = TagConfig { name: None, ..config.clone() };
        Self::new()
            .with_tag(ModuleTag::new(config.clone()))
            .with_tag(FunctionTag::new(config.clone()))
            .with_tag(IncludeTag::module(config.clone()))
            .with_tag(IncludeTag::function(config))
    }

    /// Ajoute un tag ; à nom égal, le premier ajouté l’emporte.
    #[must_use]
    pub fn with_tag(mut self, tag: impl ScalarTag + 'static) -> Self {
        self.tags.push(Box::new(tag));
        self
    }

    /// Tags, dans l’ordre d’ajout.
    pub fn tags(&self) -> impl Iterator<Item = &dyn ScalarTag> { self.tags.iter().map(|t| &**t) }

    /// Tag nommé `name`.
    pub fn find(&self, name: &str) -> Option<&dyn ScalarTag> {
        let name = normalize(name);
        self.tags().find(|t| normalize(t.name()) == name)
    }

    /* ───── Chargement ───── */

    /// Charge `text` en construisant chaque valeur de code.
    pub fn load(&self, text: &str) -> TagResult<Node> {
        let doc: Yaml = serde_yaml::from_str(text)?;
        self.load_node(doc)
    }

    fn load_node(&self, yaml: Yaml) -> TagResult<Node> {
        Ok(match yaml {
            Yaml::Null => Node::Null,
            Yaml::Bool(b) => Node::Bool(b),
            Yaml::Number(n) => Node::Number(n),
            Yaml::String(s) => Node::String(s),
            Yaml::Sequence(items) => Node::Sequence(items.into_iter().map(|i| self.load_node(i)).collect::<TagResult<_>>()?),
            Yaml::Mapping(map) => Node::Mapping(
                map.into_iter()
                    .map(|(k, v)| Ok::<_, TagError>((self.load_node(k)?, self.load_node(v)?)))
                    .collect::<TagResult<_>>()?,
            ),
            Yaml::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let name = tag.to_string();
                match self.find(&name) {
                    Some(t) => {
                        let scalar = scalar_text(&name, value)?;
                        if !t.validate(&scalar) {
                            return Err(TagError::InvalidScalar { tag: t.name().to_string() });
                        }
                        log::debug!("load: construction de {}", t.name());
                        Node::Code(t.construct(&scalar)?)
                    }
                    None => Node::Tagged { tag: name, value: Box::new(self.load_node(value)?) },
                }
            }
        })
    }

    /// Vérifie `text` sans rien exécuter ; rend tous les problèmes trouvés.
    pub fn check(&self, text: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        match serde_yaml::from_str::<Yaml>(text) {
            Ok(doc) => self.check_node(&doc, "$".to_string(), &mut findings),
            Err(e) => findings.push(Finding { path: "$".to_string(), error: e.into() }),
        }
        findings
    }

    fn check_node(&self, yaml: &Yaml, path: String, out: &mut Vec<Finding>) {
        match yaml {
            Yaml::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.check_node(item, format!("{path}[{i}]"), out);
                }
            }
            Yaml::Mapping(map) => {
                for (k, v) in map {
                    let key = match k {
                        Yaml::String(s) => s.clone(),
                        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
                    };
                    let child = if path == "$" { key } else { format!("{path}.{key}") };
                    self.check_node(v, child, out);
                }
            }
            Yaml::Tagged(tagged) => {
                let name = tagged.tag.to_string();
                match self.find(&name) {
                    Some(t) => {
                        let result = scalar_text(&name, tagged.value.clone()).and_then(|s| t.check(&s));
                        if let Err(error) = result {
                            out.push(Finding { path, error });
                        }
                    }
                    None => self.check_node(&tagged.value, path, out),
                }
            }
            _ => {}
        }
    }

    /* ───── Écriture ───── */

    /// Écrit `node` en YAML.
    pub fn dump(&self, node: &Node, options: &DumpOptions) -> TagResult<String> {
        let yaml = self.dump_node(node, options)?;
        Ok(serde_yaml::to_string(&yaml)?)
    }

    /// Tag chargé d’écrire `value`.
    pub fn owner(&self, value: &CodeValue) -> Option<&dyn ScalarTag> {
        self.tags().find(|t| t.recognize(value)).or_else(|| {
            let CodeValue::Detached(v) = value else { return None };
            let kind = if v.is_callable() { TagKind::Function } else { TagKind::Module };
            self.tags().find(|t| t.kind() == kind && !t.is_include())
        })
    }

    /// Rend une valeur de code seule, dans le style résolu par `options`.
    pub fn render(&self, value: &CodeValue, options: &DumpOptions) -> TagResult<(String, String)> {
        let tag = self
            .owner(value)
            .ok_or_else(|| TagError::Unrepresentable(format!("{:?}", value.value())))?;
        let text = tag.render(value, options.resolve(tag))?;
        Ok((tag.name().to_string(), text))
    }

    fn dump_node(&self, node: &Node, options: &DumpOptions) -> TagResult<Yaml> {
        Ok(match node {
            Node::Null => Yaml::Null,
            Node::Bool(b) => Yaml::Bool(*b),
            Node::Number(n) => Yaml::Number(n.clone()),
            Node::String(s) => Yaml::String(s.clone()),
            Node::Sequence(items) => {
                Yaml::Sequence(items.iter().map(|i| self.dump_node(i, options)).collect::<TagResult<_>>()?)
            }
            Node::Mapping(entries) => {
                let mut map = Mapping::new();
                for (k, v) in entries {
                    map.insert(self.dump_node(k, options)?, self.dump_node(v, options)?);
                }
                Yaml::Mapping(map)
            }
            Node::Tagged { tag, value } => {
                Yaml::Tagged(Box::new(TaggedValue { tag: Tag::new(tag.as_str()), value: self.dump_node(value, options)? }))
            }
            Node::Code(code) => {
                let (name, text) = self.render(code, options)?;
                Yaml::Tagged(Box::new(TaggedValue { tag: Tag::new(name), value: Yaml::String(text) }))
            }
        })
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tags().map(ScalarTag::name)).finish()
    }
}

/// Texte d’un scalaire tagué ; séquences et mappings sont refusés.
fn scalar_text(tag: &str, value: Yaml) -> TagResult<String> {
    match value {
        Yaml::String(s) => Ok(s),
        Yaml::Null => Ok(String::new()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Sequence(_) | Yaml::Mapping(_) | Yaml::Tagged(_) => Err(TagError::NotAScalar { tag: tag.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize("!ts/module"), "ts/module");
        assert_eq!(normalize("!!ts/module"), "ts/module");
        assert_eq!(normalize("tag:yaml.org,2002:ts/module"), "ts/module");
        let schema = Schema::default_tags(&TagConfig::new());
        assert_eq!(schema.find("ts/function").map(ScalarTag::name), Some("!ts/function"));
        assert!(schema.find("!ts/other").is_none());
    }

    #[test]
    fn unknown_tags_survive() {
        let schema = Schema::default_tags(&TagConfig::new());
        let node = schema.load("a: !env HOME\nb: [1, two]\n").unwrap();
        assert!(matches!(node.get("a"), Some(Node::Tagged { tag, .. }) if tag == "!env"));
        assert_eq!(node.get("b").and_then(|b| b.at(1)).and_then(Node::as_str), Some("two"));
        let out = schema.dump(&node, &DumpOptions::default()).unwrap();
        assert!(out.contains("!env HOME"), "{out}");
    }

    #[test]
    fn code_tag_on_mapping_is_refused() {
        let schema = Schema::default_tags(&TagConfig::new());
        let err = schema.load("m: !ts/module\n  a: 1\n").unwrap_err();
        assert!(matches!(err, TagError::NotAScalar { .. }), "{err}");
    }

    #[test]
    fn check_collects_every_problem() {
        let schema = Schema::default_tags(&TagConfig::new());
        let doc = "ok: !ts/module export const a = 1\nbad: !ts/module '---'\nlist:\n  - !ts/function 'export default ('\n";
        let findings = schema.check(doc);
        let paths: Vec<_> = findings.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["bad", "list[0]"]);
        assert!(findings[0].to_string().starts_with("bad: SyntaxError:"), "{}", findings[0]);
    }

    #[test]
    fn tag_style_overrides_common_style() {
        let schema = Schema::default_tags(&TagConfig::new());
        let opts = DumpOptions::default().with_style(Style::Transpiled).with_tag_style("!ts/function", Style::Minified);
        assert_eq!(opts.resolve(schema.find("ts/module").unwrap()), Style::Transpiled);
        assert_eq!(opts.resolve(schema.find("ts/function").unwrap()), Style::Minified);
        assert_eq!(DumpOptions::default().resolve(schema.find("ts/module").unwrap()), Style::Original);
    }
}
