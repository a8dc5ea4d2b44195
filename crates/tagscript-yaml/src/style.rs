//! Styles de rendu.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Forme textuelle choisie à l’écriture d’une valeur de code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Source tel qu’écrit.
    #[default]
    Original,
    /// Code portable issu de la transpilation.
    Transpiled,
    /// Code portable minifié.
    Minified,
}

impl Style {
    /// Tous les styles connus.
    pub const ALL: [Style; 3] = [Style::Original, Style::Transpiled, Style::Minified];

    /// Nom du style.
    pub const fn as_str(self) -> &'static str {
        match self {
            Style::Original => "original",
            Style::Transpiled => "transpiled",
            Style::Minified => "minified",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("style inconnu : `{s}` (attendu : original, transpiled, minified)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("Transpiled".parse::<Style>(), Ok(Style::Transpiled));
        assert_eq!(Style::Minified.to_string(), "minified");
        assert!("pretty".parse::<Style>().unwrap_err().contains("pretty"));
    }
}
