//! Fichier `.tagscript.toml` : options par défaut du CLI.
//!
//! ```toml
//! base = "fixtures"            # racine des inclusions (relative au fichier)
//!
//! [compiler]
//! target = "es5"
//!
//! [sandbox]
//! timeout = 250                # millisecondes
//!
//! [dump]
//! style = "transpiled"
//! styles = { "ts/function" = "minified" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tagscript_compiler::CompilerOptions;
use tagscript_runtime::{Limits, SandboxPolicy};
use tagscript_yaml::{DumpOptions, TagConfig};

/// Nom du fichier cherché.
pub const CONFIG_FILE: &str = ".tagscript.toml";

/// Réglages lus dans `.tagscript.toml` ; les options de ligne de commande priment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base des inclusions.
    pub base: Option<PathBuf>,
    /// Options de transpilation.
    pub compiler: CompilerOptions,
    /// Limites d’exécution.
    pub sandbox: Limits,
    /// Styles d’écriture.
    pub dump: DumpOptions,
}

impl Settings {
    /// Analyse un texte TOML.
    pub fn parse(text: &str) -> Result<Self> { toml::from_str(text).context("configuration invalide") }

    /// Lit `path` ; une base relative est rapportée au dossier du fichier.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("lecture de {}", path.display()))?;
        let mut settings = Self::parse(&text).with_context(|| format!("dans {}", path.display()))?;
        if let (Some(base), Some(dir)) = (settings.base.as_mut(), path.parent()) {
            if base.is_relative() {
                *base = dir.join(&*base);
            }
        }
        log::debug!("configuration chargée : {}", path.display());
        Ok(settings)
    }

    /// Cherche `.tagscript.toml` dans `start` puis ses parents.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().map(|dir| dir.join(CONFIG_FILE)).find(|p| p.is_file())
    }

    /// Configuration explicite, sinon découverte depuis `start`, sinon défauts.
    pub fn resolve(explicit: Option<&Path>, start: &Path) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(start)) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Politique d’exécution correspondante.
    pub fn policy(&self) -> SandboxPolicy { SandboxPolicy { limits: self.sandbox, ..SandboxPolicy::default() } }

    /// Configuration de tag correspondante ; `fallback_base` sert si aucune base n’est fixée.
    pub fn tag_config(&self, fallback_base: &Path) -> TagConfig {
        TagConfig::new()
            .with_compiler(self.compiler.clone())
            .with_sandbox(self.policy())
            .with_base_path(self.base.clone().unwrap_or_else(|| fallback_base.to_path_buf()))
    }
}
