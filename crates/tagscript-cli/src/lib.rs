//! tagscript-cli — bibliothèque interne du binaire `tagscript`
//!
//! Le parsing d’arguments reste dans `main.rs` ; ici on ne trouve que des
//! tâches typées et leur exécution, avec sortie injectable pour les tests.
//!
//! - `check` : vérifie chaque scalaire de code d’un document, sans exécuter.
//! - `dump` : charge puis réécrit un document dans les styles demandés.
//! - `transpile` / `minify` : le transformateur seul.
//! - `run` : transpile, exécute en bac à sable, imprime les exports.

#![forbid(unsafe_code)]

pub mod config;

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use tagscript_compiler::{minify, transpile, CompilerOptions, JsxMode, ModuleKind, Target};
use tagscript_runtime::{print_value, Sandbox};
use tagscript_yaml::{Schema, Style};

#[cfg(feature = "color")]
use owo_colors::OwoColorize;

pub use config::{Settings, CONFIG_FILE};

/* ─────────────────────────── Types publics ─────────────────────────── */

/// Commande haut niveau (sans parsing CLI).
#[derive(Clone, Debug)]
pub enum Command {
    /// Vérifier un document.
    Check(CheckTask),
    /// Réécrire un document.
    Dump(DumpTask),
    /// Transpiler une source.
    Transpile(TranspileTask),
    /// Minifier du code portable.
    Minify(MinifyTask),
    /// Exécuter une source.
    Run(RunTask),
}

/// Entrée texte : fichier ou `-` (stdin).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Input {
    /// Fichier.
    Path(PathBuf),
    /// Entrée standard.
    #[default]
    Stdin,
}

impl Input {
    /// `-` ou absent : stdin.
    pub fn from_arg(p: Option<PathBuf>) -> Self {
        match p {
            Some(path) if path.as_os_str() != "-" => Self::Path(path),
            _ => Self::Stdin,
        }
    }

    /// Dossier de résolution des inclusions par défaut.
    pub fn base_dir(&self) -> PathBuf {
        match self {
            Input::Path(p) => p.parent().map(Path::to_path_buf).unwrap_or_default(),
            Input::Stdin => PathBuf::from("."),
        }
    }

    fn read(&self) -> Result<String> {
        match self {
            Input::Stdin => {
                let mut s = String::new();
                io::stdin().read_to_string(&mut s).context("lecture de stdin")?;
                Ok(s)
            }
            Input::Path(p) => fs::read_to_string(p).with_context(|| format!("lecture de {}", p.display())),
        }
    }

    fn label(&self) -> String {
        match self {
            Input::Path(p) => p.display().to_string(),
            Input::Stdin => "<stdin>".to_string(),
        }
    }
}

/// `tagscript check`.
#[derive(Clone, Debug, Default)]
pub struct CheckTask {
    /// Document.
    pub input: Input,
}

/// `tagscript dump`.
#[derive(Clone, Debug, Default)]
pub struct DumpTask {
    /// Document.
    pub input: Input,
    /// Style commun.
    pub style: Option<Style>,
    /// Styles par tag (`TAG=STYLE`).
    pub tag_styles: Vec<(String, Style)>,
}

/// `tagscript transpile`.
#[derive(Clone, Debug, Default)]
pub struct TranspileTask {
    /// Source.
    pub input: Input,
    /// Cible.
    pub target: Option<Target>,
    /// Format de module.
    pub module: Option<ModuleKind>,
    /// Balisage.
    pub jsx: Option<JsxMode>,
}

/// `tagscript minify`.
#[derive(Clone, Debug, Default)]
pub struct MinifyTask {
    /// Code portable.
    pub input: Input,
}

/// `tagscript run`.
#[derive(Clone, Debug, Default)]
pub struct RunTask {
    /// Source.
    pub input: Input,
    /// Délai (sinon celui de la configuration).
    pub timeout: Option<Duration>,
}

/// Réglages communs à toutes les commandes.
#[derive(Clone, Debug, Default)]
pub struct Session {
    /// Configuration chargée.
    pub settings: Settings,
    /// Base imposée par `--base`.
    pub base: Option<PathBuf>,
}

/* ─────────────────────────── Initialisation ─────────────────────────── */

/// Initialise le logger (`RUST_LOG`, défaut `warn`).
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp(None)
            .try_init();
    }
}

/// Analyse `TAG=STYLE`.
pub fn parse_tag_style(s: &str) -> Result<(String, Style), String> {
    let (tag, style) = s.split_once('=').ok_or_else(|| format!("attendu TAG=STYLE, reçu `{s}`"))?;
    Ok((tag.trim().to_string(), style.parse()?))
}

/* ─────────────────────────── Exécution ─────────────────────────── */

/// Exécute `cmd` ; le résultat utile va dans `out`, les statuts sur stderr.
/// Rend le code de sortie.
pub fn execute(cmd: Command, ctx: &Session, out: &mut dyn Write) -> Result<i32> {
    match cmd {
        Command::Check(t) => check_entry(&t, ctx, out),
        Command::Dump(t) => dump_entry(&t, ctx, out).map(|()| 0),
        Command::Transpile(t) => transpile_entry(&t, ctx, out).map(|()| 0),
        Command::Minify(t) => minify_entry(&t, out).map(|()| 0),
        Command::Run(t) => run_entry(&t, ctx, out).map(|()| 0),
    }
}

fn schema_for(input: &Input, ctx: &Session) -> Schema {
    let fallback = ctx.base.clone().unwrap_or_else(|| input.base_dir());
    let mut config = ctx.settings.tag_config(&fallback);
    if let Some(base) = &ctx.base {
        config.base_path.clone_from(base);
    }
    Schema::default_tags(&config)
}

fn check_entry(task: &CheckTask, ctx: &Session, out: &mut dyn Write) -> Result<i32> {
    let text = task.input.read()?;
    let findings = schema_for(&task.input, ctx).check(&text);
    for f in &findings {
        writeln!(out, "{}: {f}", task.input.label())?;
    }
    if findings.is_empty() {
        status_ok("CHECK", &task.input.label());
        Ok(0)
    } else {
        status_err("CHECK", &format!("{} problème(s)", findings.len()));
        Ok(1)
    }
}

fn dump_entry(task: &DumpTask, ctx: &Session, out: &mut dyn Write) -> Result<()> {
    let text = task.input.read()?;
    let schema = schema_for(&task.input, ctx);
    let mut options = ctx.settings.dump.clone();
    if let Some(style) = task.style {
        options.style = Some(style);
    }
    for (tag, style) in &task.tag_styles {
        options = options.with_tag_style(tag, *style);
    }
    // Les erreurs d’exécution portent des valeurs non `Send` : on garde leur texte.
    let node = schema.load(&text).map_err(|e| anyhow!("{}: {e}", task.input.label()))?;
    let yaml = schema.dump(&node, &options).map_err(|e| anyhow!("{}: {e}", task.input.label()))?;
    out.write_all(yaml.as_bytes())?;
    Ok(())
}

fn compiler_options(task: &TranspileTask, ctx: &Session) -> CompilerOptions {
    let mut opts = ctx.settings.compiler.clone();
    if let Some(t) = task.target {
        opts.target = t;
    }
    if let Some(m) = task.module {
        opts.module = m;
    }
    if let Some(j) = task.jsx {
        opts.jsx = j;
    }
    opts
}

fn transpile_entry(task: &TranspileTask, ctx: &Session, out: &mut dyn Write) -> Result<()> {
    let src = task.input.read()?;
    let code = transpile(&src, &compiler_options(task, ctx)).with_context(|| task.input.label())?;
    writeln!(out, "{code}")?;
    Ok(())
}

fn minify_entry(task: &MinifyTask, out: &mut dyn Write) -> Result<()> {
    let src = task.input.read()?;
    let code = minify(&src).with_context(|| task.input.label())?;
    writeln!(out, "{code}")?;
    Ok(())
}

fn run_entry(task: &RunTask, ctx: &Session, out: &mut dyn Write) -> Result<()> {
    let src = task.input.read()?;
    let portable = transpile(&src, &ctx.settings.compiler).with_context(|| task.input.label())?;
    let mut policy = ctx.settings.policy();
    if let Some(timeout) = task.timeout {
        policy.limits.timeout = timeout;
    }
    let exports = Sandbox::new(policy)
        .execute(&portable)
        .map_err(|e| anyhow!("{}: {e}", task.input.label()))?;
    writeln!(out, "{}", print_value(&exports))?;
    Ok(())
}

/* ─────────────────────────── Sorties jolies ─────────────────────────── */

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.green().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

fn status_err(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.red().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file(dir: &Path, name: &str, text: &str) -> Input {
        let p = dir.join(name);
        fs::write(&p, text).unwrap();
        Input::Path(p)
    }

    fn run(cmd: Command, ctx: &Session) -> (i32, String) {
        let mut out = Vec::new();
        let code = execute(cmd, ctx, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn input_from_arg() {
        assert_eq!(Input::from_arg(None), Input::Stdin);
        assert_eq!(Input::from_arg(Some("-".into())), Input::Stdin);
        assert_eq!(Input::from_arg(Some("a.yaml".into())), Input::Path("a.yaml".into()));
        assert_eq!(Input::Path("dir/a.yaml".into()).base_dir(), PathBuf::from("dir"));
    }

    #[test]
    fn tag_style_argument() {
        assert_eq!(parse_tag_style("ts/function=minified"), Ok(("ts/function".to_string(), Style::Minified)));
        assert!(parse_tag_style("ts/function").is_err());
        assert!(parse_tag_style("ts/function=ugly").is_err());
    }

    #[test]
    fn check_reports_each_invalid_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let input = file(dir.path(), "doc.yaml", "a: !ts/module '---'\nb: !ts/module export const b = 1\nc: !ts/include/module missing.ts\n");
        let (code, out) = run(Command::Check(CheckTask { input }), &Session::default());
        assert_eq!(code, 1);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2, "{out}");
        assert!(lines[0].contains("a: SyntaxError:"), "{out}");
        assert!(lines[1].contains("missing.ts"), "{out}");
    }

    #[test]
    fn dump_applies_styles() {
        let dir = tempfile::tempdir().unwrap();
        let input = file(dir.path(), "doc.yaml", "f: !ts/function |\n  export default () => true\n");
        let task = DumpTask { input, style: Some(Style::Transpiled), tag_styles: vec![] };
        let (_, out) = run(Command::Dump(task.clone()), &Session::default());
        assert!(out.contains("exports.default = function () { return true; };"), "{out}");

        let task = DumpTask { tag_styles: vec![("!ts/function".into(), Style::Minified)], ..task };
        let (_, out) = run(Command::Dump(task), &Session::default());
        assert!(out.contains("exports.default=function(){return!0};"), "{out}");
    }

    #[test]
    fn includes_resolve_next_to_the_document() {
        let dir = tempfile::tempdir().unwrap();
        file(dir.path(), "one.ts", "export const one = 1;\n");
        let input = file(dir.path(), "doc.yaml", "m: !ts/include/module one.ts\n");
        let (_, out) = run(Command::Dump(DumpTask { input, ..DumpTask::default() }), &Session::default());
        assert!(out.contains("!ts/module"), "{out}");
        assert!(out.contains("export const one = 1;"), "{out}");
    }

    #[test]
    fn transpile_flags_override_settings() {
        let dir = tempfile::tempdir().unwrap();
        let input = file(dir.path(), "a.ts", "export const f = (x: number) => x ** 2");
        let task = TranspileTask { input: input.clone(), ..TranspileTask::default() };
        let (_, out) = run(Command::Transpile(task), &Session::default());
        assert_eq!(out, "var f = function (x) { return Math.pow(x, 2); };\nexports.f = f;\n");

        let task = TranspileTask { input, target: Some(Target::EsNext), module: Some(ModuleKind::EsModule), jsx: None };
        let (_, out) = run(Command::Transpile(task), &Session::default());
        assert_eq!(out, "export const f = x => x ** 2;\n");
    }

    #[test]
    fn minify_and_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = file(dir.path(), "p.js", "exports.default = function () { return true; };");
        let (_, out) = run(Command::Minify(MinifyTask { input }), &Session::default());
        assert_eq!(out, "exports.default=function(){return!0};\n");

        let input = file(dir.path(), "m.ts", "export const answer: number = 6 * 7;\nexport default 'ok';");
        let (_, out) = run(Command::Run(RunTask { input, timeout: None }), &Session::default());
        assert_eq!(out, "{ answer: 42, default: 'ok' }\n");
    }

    #[test]
    fn run_timeout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = file(dir.path(), "loop.ts", "while (true) {}");
        let mut out = Vec::new();
        let task = RunTask { input, timeout: Some(Duration::from_millis(20)) };
        let err = execute(Command::Run(task), &Session::default(), &mut out).unwrap_err();
        assert!(err.to_string().contains("délai"), "{err}");
    }
}
