//! Définitions de tags : validation, construction, reconnaissance, rendu.
//!
//! | Tag                    | Charge utile      | Valeur construite    | Styles                        |
//! |------------------------|-------------------|----------------------|-------------------------------|
//! | `!ts/module`           | source            | [`CompiledModule`]   | original, transpiled          |
//! | `!ts/function`         | source            | [`CompiledFunction`] | original, transpiled, minified |
//! | `!ts/include/module`   | chemin de fichier | [`CompiledModule`]   | (écrit par `!ts/module`)      |
//! | `!ts/include/function` | chemin de fichier | [`CompiledFunction`] | (écrit par `!ts/function`)    |

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tagscript_compiler::{check, minify, transpile, CompilerOptions};
use tagscript_runtime::{print_value, Sandbox, SandboxPolicy};

use crate::error::{TagError, TagResult};
use crate::provenance::{CodeValue, CompiledFunction, CompiledModule, Provenance};
use crate::style::Style;

/// Rappel recevant chaque erreur de validation.
pub type LogFn = Rc<dyn Fn(&TagError)>;
/// Post-traitement appliqué à tout texte rendu.
pub type FormatFn = Rc<dyn Fn(&str) -> String>;

/// Genre de valeur produite par un tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Objet d’exports.
    Module,
    /// Fonction unique (export par défaut).
    Function,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TagKind::Module => "module",
            TagKind::Function => "function",
        })
    }
}

/* ─────────────────────────── Configuration ─────────────────────────── */

/// Configuration d’un tag, capturée à sa création.
#[derive(Clone, Default)]
pub struct TagConfig {
    /// Identifiant du tag (`None` : nom par défaut du genre de tag).
    pub name: Option<String>,
    /// Options de transpilation.
    pub compiler: CompilerOptions,
    /// Politique d’exécution.
    pub sandbox: SandboxPolicy,
    /// Base de résolution des inclusions relatives.
    pub base_path: PathBuf,
    /// Rappel de validation.
    pub log: Option<LogFn>,
    /// Post-traitement du texte rendu.
    pub formatter: Option<FormatFn>,
    /// Style par défaut (`original` si absent).
    pub default_style: Option<Style>,
}

impl TagConfig {
    /// Configuration par défaut.
    pub fn new() -> Self { Self::default() }

    /// Identifiant du tag.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Options de transpilation.
    #[must_use]
    pub fn with_compiler(mut self, compiler: CompilerOptions) -> Self {
        self.compiler = compiler;
        self
    }

    /// Politique d’exécution.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: SandboxPolicy) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Base des inclusions.
    #[must_use]
    pub fn with_base_path(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_path = base.into();
        self
    }

    /// Rappel de validation.
    #[must_use]
    pub fn with_log(mut self, log: impl Fn(&TagError) + 'static) -> Self {
        self.log = Some(Rc::new(log));
        self
    }

    /// Post-traitement du texte rendu.
    #[must_use]
    pub fn with_formatter(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.formatter = Some(Rc::new(f));
        self
    }

    /// Style par défaut.
    #[must_use]
    pub fn with_default_style(mut self, style: Style) -> Self {
        self.default_style = Some(style);
        self
    }

    fn report(&self, tag: &str, err: &TagError) {
        log::warn!("{tag}: scalaire refusé : {err}");
        if let Some(log) = &self.log {
            log(err);
        }
    }

    fn format(&self, text: String) -> String {
        match &self.formatter {
            Some(f) => f(&text),
            None => text,
        }
    }
}

impl fmt::Debug for TagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagConfig")
            .field("name", &self.name)
            .field("compiler", &self.compiler)
            .field("sandbox", &self.sandbox.limits)
            .field("base_path", &self.base_path)
            .field("log", &self.log.is_some())
            .field("formatter", &self.formatter.is_some())
            .field("default_style", &self.default_style)
            .finish()
    }
}

/* ─────────────────────────── Contrat ─────────────────────────── */

/// Un genre de scalaire de code.
pub trait ScalarTag {
    /// Identifiant du tag.
    fn name(&self) -> &str;

    /// Genre de valeur produite.
    fn kind(&self) -> TagKind;

    /// Configuration capturée.
    fn config(&self) -> &TagConfig;

    /// Vérifie le scalaire sans l’exécuter.
    fn check(&self, scalar: &str) -> TagResult<()>;

    /// Variante booléenne de [`check`](Self::check) ; l’erreur part au rappel `log`.
    fn validate(&self, scalar: &str) -> bool {
        match self.check(scalar) {
            Ok(()) => true,
            Err(e) => {
                self.config().report(self.name(), &e);
                false
            }
        }
    }

    /// Construit la valeur (transpilation puis exécution).
    fn construct(&self, scalar: &str) -> TagResult<CodeValue>;

    /// Vrai si ce tag écrit `value`.
    fn recognize(&self, value: &CodeValue) -> bool;

    /// Styles pris en charge.
    fn styles(&self) -> &'static [Style];

    /// Style appliqué sans demande explicite ; un style configuré que le tag
    /// ne sait pas rendre retombe sur `original`.
    fn default_style(&self) -> Style {
        match self.config().default_style {
            Some(style) if self.styles().contains(&style) => style,
            _ => Style::Original,
        }
    }

    /// Rend `value` dans `style`.
    fn render(&self, value: &CodeValue, style: Style) -> TagResult<String>;

    /// Vrai si le scalaire désigne un fichier plutôt que du code.
    fn is_include(&self) -> bool { false }
}

/* ─────────────────────────── Tags directs ─────────────────────────── */

const MODULE_STYLES: &[Style] = &[Style::Original, Style::Transpiled];
const FUNCTION_STYLES: &[Style] = &[Style::Original, Style::Transpiled, Style::Minified];

/// État partagé des tags directs.
#[derive(Debug, Clone)]
struct Direct {
    name: String,
    kind: TagKind,
    config: TagConfig,
    sandbox: Sandbox,
}

impl Direct {
    fn new(kind: TagKind, default_name: &str, config: TagConfig, styles: &[Style]) -> Self {
        let name = config.name.clone().unwrap_or_else(|| default_name.to_string());
        if let Some(style) = config.default_style.filter(|s| !styles.contains(s)) {
            log::warn!("{name}: style par défaut `{style}` non pris en charge, `original` retenu");
        }
        let sandbox = Sandbox::new(config.sandbox.clone());
        Self { name, kind, config, sandbox }
    }

    fn check(&self, scalar: &str) -> TagResult<()> { Ok(check(scalar, &self.config.compiler)?) }

    fn construct(&self, scalar: &str) -> TagResult<CodeValue> {
        let module = CompiledModule::compile(scalar, &self.config.compiler, &self.sandbox)?;
        Ok(match self.kind {
            TagKind::Module => CodeValue::Module(module),
            TagKind::Function => CodeValue::Function(CompiledFunction::from_module(module)?),
        })
    }

    /// Texte source synthétisé pour une valeur sans provenance.
    fn synthesize(&self, value: &CodeValue) -> TagResult<Provenance> {
        if let Some(p) = value.provenance() {
            return Ok(p.clone());
        }
        let printed = print_value(value.value());
        let source = match self.kind {
            TagKind::Function => format!("export default {printed}"),
            TagKind::Module => format!("Object.assign(exports, {printed})"),
        };
        let transpiled = transpile(&source, &self.config.compiler)?;
        Ok(Provenance::new(source, transpiled))
    }

    fn render(&self, styles: &[Style], value: &CodeValue, style: Style) -> TagResult<String> {
        if !styles.contains(&style) {
            return Err(TagError::UnsupportedStyle { tag: self.name.clone(), style });
        }
        let provenance = self.synthesize(value)?;
        let text = match style {
            Style::Original => provenance.original_code().to_string(),
            Style::Transpiled => provenance.transpiled_code().to_string(),
            Style::Minified => minify(provenance.transpiled_code()).map_err(TagError::Minify)?,
        };
        Ok(self.config.format(text))
    }
}

/// Tag module : le scalaire est un module, la valeur ses exports.
#[derive(Debug, Clone)]
pub struct ModuleTag(Direct);

impl ModuleTag {
    /// Nom par défaut.
    pub const DEFAULT_NAME: &'static str = "!ts/module";

    /// Nouveau tag module.
    pub fn new(config: TagConfig) -> Self { Self(Direct::new(TagKind::Module, Self::DEFAULT_NAME, config, MODULE_STYLES)) }
}

impl ScalarTag for ModuleTag {
    fn name(&self) -> &str { &self.0.name }
    fn kind(&self) -> TagKind { TagKind::Module }
    fn config(&self) -> &TagConfig { &self.0.config }
    fn check(&self, scalar: &str) -> TagResult<()> { self.0.check(scalar) }
    fn construct(&self, scalar: &str) -> TagResult<CodeValue> { self.0.construct(scalar) }
    fn recognize(&self, value: &CodeValue) -> bool { matches!(value, CodeValue::Module(_)) }
    fn styles(&self) -> &'static [Style] { MODULE_STYLES }
    fn render(&self, value: &CodeValue, style: Style) -> TagResult<String> { self.0.render(MODULE_STYLES, value, style) }
}

/// Tag fonction : le scalaire est un module dont l’export par défaut est la valeur.
#[derive(Debug, Clone)]
pub struct FunctionTag(Direct);

impl FunctionTag {
    /// Nom par défaut.
    pub const DEFAULT_NAME: &'static str = "!ts/function";

    /// Nouveau tag fonction.
    pub fn new(config: TagConfig) -> Self { Self(Direct::new(TagKind::Function, Self::DEFAULT_NAME, config, FUNCTION_STYLES)) }
}

impl ScalarTag for FunctionTag {
    fn name(&self) -> &str { &self.0.name }
    fn kind(&self) -> TagKind { TagKind::Function }
    fn config(&self) -> &TagConfig { &self.0.config }
    fn check(&self, scalar: &str) -> TagResult<()> { self.0.check(scalar) }
    fn construct(&self, scalar: &str) -> TagResult<CodeValue> { self.0.construct(scalar) }
    fn recognize(&self, value: &CodeValue) -> bool { matches!(value, CodeValue::Function(_)) }
    fn styles(&self) -> &'static [Style] { FUNCTION_STYLES }
    fn render(&self, value: &CodeValue, style: Style) -> TagResult<String> { self.0.render(FUNCTION_STYLES, value, style) }
}

/* ─────────────────────────── Inclusions ─────────────────────────── */

/// Tag d’inclusion : le scalaire est un chemin dont le contenu est le source.
///
/// Validation et construction relisent chacune le fichier. Le chemin n’étant
/// pas retrouvable depuis la valeur, ce tag n’écrit jamais rien : les valeurs
/// qu’il produit sont écrites par le tag direct du même genre.
#[derive(Debug, Clone)]
pub struct IncludeTag {
    name: String,
    styles: &'static [Style],
    inner: Direct,
}

impl IncludeTag {
    /// Nom par défaut de l’inclusion de module.
    pub const MODULE_NAME: &'static str = "!ts/include/module";
    /// Nom par défaut de l’inclusion de fonction.
    pub const FUNCTION_NAME: &'static str = "!ts/include/function";

    /// Inclusion d’un module.
    pub fn module(config: TagConfig) -> Self { Self::new(TagKind::Module, config) }

    /// Inclusion d’une fonction.
    pub fn function(config: TagConfig) -> Self { Self::new(TagKind::Function, config) }

    fn new(kind: TagKind, config: TagConfig) -> Self {
        let (default_name, styles) = match kind {
            TagKind::Module => (Self::MODULE_NAME, MODULE_STYLES),
            TagKind::Function => (Self::FUNCTION_NAME, FUNCTION_STYLES),
        };
        let inner = Direct::new(kind, default_name, config, styles);
        Self { name: inner.name.clone(), styles, inner }
    }

    /// Chemin résolu d’un scalaire (relatif à la base, ou absolu).
    pub fn resolve(&self, scalar: &str) -> PathBuf { self.inner.config.base_path.join(scalar.trim()) }

    fn read(&self, scalar: &str) -> TagResult<String> {
        let path = self.resolve(scalar);
        log::debug!("{}: lecture de {}", self.name, path.display());
        fs::read_to_string(&path).map_err(|source| TagError::Io { path, source })
    }

    /// Base de résolution.
    pub fn base_path(&self) -> &Path { &self.inner.config.base_path }
}

impl ScalarTag for IncludeTag {
    fn name(&self) -> &str { &self.name }
    fn kind(&self) -> TagKind { self.inner.kind }
    fn config(&self) -> &TagConfig { &self.inner.config }

    fn check(&self, scalar: &str) -> TagResult<()> {
        let source = self.read(scalar)?;
        self.inner.check(&source)
    }

    fn construct(&self, scalar: &str) -> TagResult<CodeValue> {
        let source = self.read(scalar)?;
        self.inner.construct(&source)
    }

    fn recognize(&self, _value: &CodeValue) -> bool { false }

    fn styles(&self) -> &'static [Style] { self.styles }

    fn is_include(&self) -> bool { true }

    fn render(&self, value: &CodeValue, style: Style) -> TagResult<String> { self.inner.render(self.styles, value, style) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use tagscript_runtime::Value;

    #[test]
    fn module_tag_round_trip() {
        let tag = ModuleTag::new(TagConfig::new());
        let src = "export default { boolean: true, func: () => true }";
        assert!(tag.validate(src));
        let value = tag.construct(src).unwrap();
        assert!(tag.recognize(&value));
        assert_eq!(tag.render(&value, Style::Original).unwrap(), src);
        let transpiled = tag.render(&value, Style::Transpiled).unwrap();
        assert_eq!(transpiled, "exports.default = { boolean: true, func: function () { return true; } };");
        assert!(!transpiled.contains("export default"));
        assert!(matches!(tag.render(&value, Style::Minified), Err(TagError::UnsupportedStyle { .. })));
    }

    #[test]
    fn function_tag_unwraps_default_export() {
        let tag = FunctionTag::new(TagConfig::new().with_default_style(Style::Minified));
        let value = tag.construct("export default function add(a: number, b: number) { return a + b; }").unwrap();
        let f = value.as_function().unwrap();
        assert_eq!(f.call(&[Value::from(2), Value::from(3)]).unwrap(), Value::from(5));
        assert_eq!(tag.default_style(), Style::Minified);
        assert_eq!(
            tag.render(&value, tag.default_style()).unwrap(),
            "function add(a,b){return a+b}exports.default=add;"
        );
        assert!(!ModuleTag::new(TagConfig::new()).recognize(&value));
    }

    #[test]
    fn unsupported_default_style_falls_back_to_original() {
        let tag = ModuleTag::new(TagConfig::new().with_default_style(Style::Minified));
        assert_eq!(tag.default_style(), Style::Original);
        let value = tag.construct("export const a = 1").unwrap();
        assert_eq!(tag.render(&value, tag.default_style()).unwrap(), "export const a = 1");
        let include = IncludeTag::module(TagConfig::new().with_default_style(Style::Minified));
        assert_eq!(include.default_style(), Style::Original);
        assert_eq!(IncludeTag::function(TagConfig::new().with_default_style(Style::Minified)).default_style(), Style::Minified);
    }

    #[test]
    fn deeply_nested_scalar_is_rejected_not_fatal() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let tag = FunctionTag::new(TagConfig::new().with_log(move |e| sink.borrow_mut().push(e.to_string())));
        let deep = format!("export default {}1{}", "(".repeat(1000), ")".repeat(1000));
        assert!(!tag.validate(&deep));
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].contains("Expression too deeply nested."), "{:?}", seen.borrow());
        assert!(tag.construct(&deep).is_err());
    }

    #[test]
    fn validation_reports_once_through_log() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let tag = ModuleTag::new(TagConfig::new().with_log(move |e| sink.borrow_mut().push(e.to_string())));
        assert!(!tag.validate("---"));
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].starts_with("SyntaxError:"), "{:?}", seen.borrow());
        assert!(matches!(tag.construct("---"), Err(TagError::Syntax(_))));
    }

    #[test]
    fn formatter_applies_to_every_style() {
        let tag = FunctionTag::new(TagConfig::new().with_formatter(|s| format!("{s}\n")));
        let value = tag.construct("export default () => 1").unwrap();
        for style in tag.styles() {
            assert!(tag.render(&value, *style).unwrap().ends_with('\n'));
        }
    }

    #[test]
    fn detached_values_are_printed_first() {
        let tag = FunctionTag::new(TagConfig::new());
        let f = tag.construct("export default (x: number) => x + 1").unwrap();
        let detached = CodeValue::Detached(f.value().clone());
        assert_eq!(tag.render(&detached, Style::Original).unwrap(), "export default function (x) { return x + 1; }");
        assert_eq!(
            tag.render(&detached, Style::Transpiled).unwrap(),
            "exports.default = function (x) { return x + 1; };"
        );

        let module = ModuleTag::new(TagConfig::new());
        let data = tagscript_runtime::Sandbox::default().execute("module.exports = { a: [1, 'b'] };").unwrap();
        let detached = CodeValue::Detached(data);
        assert_eq!(module.render(&detached, Style::Original).unwrap(), "Object.assign(exports, { a: [ 1, 'b' ] })");
        assert_eq!(module.render(&detached, Style::Transpiled).unwrap(), "Object.assign(exports, { a: [1, \"b\"] });");
    }

    #[test]
    fn custom_names() {
        let tag = ModuleTag::new(TagConfig::new().with_name("!code"));
        assert_eq!(tag.name(), "!code");
        assert_eq!(IncludeTag::function(TagConfig::new()).name(), IncludeTag::FUNCTION_NAME);
    }
}
