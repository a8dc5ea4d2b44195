//! `tagscript` — CLI
//!
//! Ici : parsing d’arguments, initialisation (logger, couleur, configuration)
//! et délégation à `tagscript_cli` (lib).

#![forbid(unsafe_code)]

use std::{io, path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tagscript_compiler::{JsxMode, ModuleKind, Target};
use tagscript_yaml::Style;

use tagscript_cli as cli;

/* ─────────────────────────── CLI (clap) ─────────────────────────── */

#[derive(Debug, Parser)]
#[command(name = "tagscript", version, about = "tagscript — code embarqué dans YAML : vérifier, réécrire, transpiler, exécuter", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Couleur des statuts
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Fichier de configuration (sinon `.tagscript.toml` cherché vers le haut)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Racine des inclusions (sinon dossier du document)
    #[arg(long, global = true)]
    base: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Vérifier les scalaires de code d’un document (sans exécution)
    Check {
        /// Document YAML (ou - pour stdin)
        input: Option<PathBuf>,
    },

    /// Charger puis réécrire un document
    Dump {
        /// Document YAML (ou - pour stdin)
        input: Option<PathBuf>,
        /// Style commun : original, transpiled, minified
        #[arg(long)]
        style: Option<Style>,
        /// Style d’un tag (répétable) : TAG=STYLE
        #[arg(long = "tag-style", value_parser = cli::parse_tag_style)]
        tag_style: Vec<(String, Style)>,
    },

    /// Transpiler une source
    Transpile {
        /// Source (ou - pour stdin)
        input: Option<PathBuf>,
        /// es5, es2015, es2016, es2017, esnext
        #[arg(long)]
        target: Option<Target>,
        /// commonjs, esmodule
        #[arg(long)]
        module: Option<ModuleKind>,
        /// react, preserve, none
        #[arg(long)]
        jsx: Option<JsxMode>,
    },

    /// Minifier du code portable
    Minify {
        /// Code (ou - pour stdin)
        input: Option<PathBuf>,
    },

    /// Transpiler, exécuter en bac à sable, imprimer les exports
    Run {
        /// Source (ou - pour stdin)
        input: Option<PathBuf>,
        /// Délai d’exécution en millisecondes
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
}

/* ─────────────────────────── Logger / couleur ─────────────────────────── */

fn init_telemetry(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", level);
    }
    cli::init_logger();
}

fn init_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Auto => {}
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        }
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        }
    }
}

/* ─────────────────────────── main ─────────────────────────── */

fn main() -> ExitCode {
    match real_main() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn real_main() -> Result<i32> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    let cwd = std::env::current_dir().context("dossier courant introuvable")?;
    let settings = cli::Settings::resolve(opt.config.as_deref(), &cwd)?;
    let session = cli::Session { settings, base: opt.base };

    use cli::{CheckTask, Command as C, DumpTask, Input, MinifyTask, RunTask, TranspileTask};

    let command = match opt.cmd {
        Command::Check { input } => C::Check(CheckTask { input: Input::from_arg(input) }),
        Command::Dump { input, style, tag_style } => {
            C::Dump(DumpTask { input: Input::from_arg(input), style, tag_styles: tag_style })
        }
        Command::Transpile { input, target, module, jsx } => {
            C::Transpile(TranspileTask { input: Input::from_arg(input), target, module, jsx })
        }
        Command::Minify { input } => C::Minify(MinifyTask { input: Input::from_arg(input) }),
        Command::Run { input, timeout_ms } => {
            C::Run(RunTask { input: Input::from_arg(input), timeout: timeout_ms.map(Duration::from_millis) })
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::execute(command, &session, &mut out).context("échec de la commande")
}
