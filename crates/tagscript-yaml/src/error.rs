//! Erreurs des tags.

use std::io;
use std::path::PathBuf;

use tagscript_core::Diagnostic;
use tagscript_runtime::ExecError;
use thiserror::Error;

use crate::style::Style;

/// Échec de validation, construction ou rendu d’un scalaire de code.
#[derive(Debug, Error)]
pub enum TagError {
    /// Le code source ne se transpile pas.
    #[error("{0}")]
    Syntax(#[from] Diagnostic),

    /// L’exécution a levé une exception ou dépassé son délai.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Le module d’un tag fonction n’a pas d’export par défaut appelable.
    #[error("le module n’exporte pas de fonction par défaut")]
    MissingExport,

    /// Fichier d’inclusion illisible.
    #[error("lecture de `{}` impossible : {source}", .path.display())]
    Io {
        /// Chemin résolu.
        path: PathBuf,
        /// Cause.
        #[source]
        source: io::Error,
    },

    /// La minification du code portable a échoué.
    #[error("minification impossible : {0}")]
    Minify(Diagnostic),

    /// Style absent de ceux du tag.
    #[error("style `{style}` non pris en charge par `{tag}`")]
    UnsupportedStyle {
        /// Tag concerné.
        tag: String,
        /// Style demandé.
        style: Style,
    },

    /// Un scalaire n’a pas passé la validation de son tag.
    #[error("scalaire invalide pour `{tag}`")]
    InvalidScalar {
        /// Tag concerné.
        tag: String,
    },

    /// Un tag de code posé sur une séquence ou un mapping.
    #[error("`{tag}` s’applique à un scalaire")]
    NotAScalar {
        /// Tag concerné.
        tag: String,
    },

    /// Valeur qu’aucun tag ne sait écrire.
    #[error("valeur non représentable : {0}")]
    Unrepresentable(String),

    /// Document YAML mal formé.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Résultat des opérations de tags.
pub type TagResult<T> = Result<T, TagError>;
