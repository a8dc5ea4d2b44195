//! tagscript-core — primitives partagées
//!
//! Fournit :
//! - `SourceId`, `Pos`, `Span`, `Spanned<T>`
//! - `LineMap` pour convertir un offset en `(ligne, colonne)`
//! - `Diagnostic` + `Severity`, rendus au format `SyntaxError: <message>`
//!
//! Features :
//! - `serde` (par défaut) : derive (dé)sérialisation sur les structures utiles

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Identifiant de source (fichier, scalaire YAML, buffer…).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(pub u32);

/// Position (offset byte) depuis le début de la source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pos(pub u32);

impl Pos {
    /// Position nulle.
    pub const ZERO: Self = Pos(0);
    /// Addition saturée.
    pub fn saturating_add(self, v: u32) -> Self { Pos(self.0.saturating_add(v)) }
}

/// Plage (demi-ouverte) `[start, end)` dans une source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Source d’où provient l’item.
    pub source: SourceId,
    /// Début inclus.
    pub start: Pos,
    /// Fin exclue.
    pub end: Pos,
}

impl Span {
    /// Span vide, pour les nœuds synthétisés par les passes.
    pub const DUMMY: Self = Span { source: SourceId(0), start: Pos::ZERO, end: Pos::ZERO };

    /// Crée un span.
    pub const fn new(source: SourceId, start: Pos, end: Pos) -> Self { Self { source, start, end } }
    /// Longueur en bytes.
    pub fn len(&self) -> u32 { self.end.0.saturating_sub(self.start.0) }
    /// Vrai si le span est vide.
    pub fn is_empty(&self) -> bool { self.start.0 >= self.end.0 }

    /// Plus petit span couvrant `self` et `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            source: self.source,
            start: Pos(self.start.0.min(other.start.0)),
            end: Pos(self.end.0.max(other.end.0)),
        }
    }

    /// Extrait le texte couvert. `None` si le span déborde ou coupe un caractère.
    pub fn slice<'a>(&self, src: &'a str) -> Option<&'a str> {
        src.get(self.start.0 as usize..self.end.0 as usize)
    }
}

/// Wrapper utilitaire « valeur + span ».
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spanned<T> {
    /// La valeur.
    pub value: T,
    /// La localisation.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Construit un `Spanned<T>`.
    pub fn new(value: T, span: Span) -> Self { Self { value, span } }
    /// Applique une fonction à la valeur et conserve le span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> { Spanned { value: f(self.value), span: self.span } }
}

/* ─────────────────────────── LineMap ─────────────────────────── */

/// Table des lignes pour (byte offset) → (ligne, colonne).
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Offsets des débuts de lignes (toujours contient 0).
    pub line_starts: Vec<u32>,
}

impl LineMap {
    /// Construit la table à partir d’un `&str`.
    pub fn new(src: &str) -> Self {
        let mut ls = Vec::with_capacity(64);
        ls.push(0);
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                ls.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
            }
        }
        Self { line_starts: ls }
    }

    /// Convertit un `Pos` en (ligne, colonne), 1-based.
    pub fn line_col(&self, pos: Pos) -> (u32, u32) {
        let off = pos.0;
        let idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[idx];
        let col = off.saturating_sub(line_start) + 1;
        (u32::try_from(idx + 1).unwrap_or(u32::MAX), col)
    }

    /// Nombre de lignes.
    pub fn len(&self) -> usize { self.line_starts.len() }

    /// Toujours faux : une source vide compte une ligne.
    pub fn is_empty(&self) -> bool { false }
}

/* ─────────────────────────── Diagnostics ─────────────────────────── */

/// Gravité d’un diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// Erreur bloquante.
    Error,
    /// Avertissement.
    Warning,
}

/// Diagnostic de compilation localisé.
///
/// `line`/`column` valent 0 tant que le diagnostic n’a pas été localisé via
/// [`Diagnostic::located`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// Gravité.
    pub severity: Severity,
    /// Message (sans préfixe).
    pub message: String,
    /// Localisation brute.
    pub span: Span,
    /// Ligne (1-based, 0 si inconnue).
    pub line: u32,
    /// Colonne (1-based, 0 si inconnue).
    pub column: u32,
}

impl Diagnostic {
    /// Nouvelle erreur.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self { severity: Severity::Error, message: message.into(), span, line: 0, column: 0 }
    }

    /// Nouvel avertissement.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self { severity: Severity::Warning, ..Self::error(message, span) }
    }

    /// Calcule ligne et colonne à partir de la table des lignes.
    #[must_use]
    pub fn located(mut self, lines: &LineMap) -> Self {
        let (line, column) = lines.line_col(self.span.start);
        self.line = line;
        self.column = column;
        self
    }

    /// Vrai si erreur.
    pub fn is_error(&self) -> bool { self.severity == Severity::Error }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {}", self.message)?;
        if self.line > 0 {
            write!(f, " ({}:{})", self.line, self.column)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn linemap_resolves_lines_and_columns() {
        let lm = LineMap::new("ab\ncd\n\nef");
        assert_eq!(lm.line_col(Pos(0)), (1, 1));
        assert_eq!(lm.line_col(Pos(1)), (1, 2));
        assert_eq!(lm.line_col(Pos(3)), (2, 1));
        assert_eq!(lm.line_col(Pos(6)), (3, 1));
        assert_eq!(lm.line_col(Pos(8)), (4, 2));
        assert_eq!(lm.len(), 4);
    }

    #[test]
    fn span_join_and_slice() {
        let a = Span::new(SourceId(0), Pos(2), Pos(4));
        let b = Span::new(SourceId(0), Pos(6), Pos(9));
        let j = a.join(b);
        assert_eq!((j.start, j.end), (Pos(2), Pos(9)));
        assert_eq!(j.slice("0123456789"), Some("2345678"));
        assert_eq!(Span::new(SourceId(0), Pos(8), Pos(20)).slice("0123"), None);
        assert!(Span::DUMMY.is_empty());
    }

    #[test]
    fn diagnostic_display() {
        let span = Span::new(SourceId(0), Pos(4), Pos(5));
        let d = Diagnostic::error("';' expected.", span);
        assert_eq!(d.to_string(), "SyntaxError: ';' expected.");
        let d = d.located(&LineMap::new("a\nbc d"));
        assert_eq!(d.to_string(), "SyntaxError: ';' expected. (2:3)");
        assert!(d.is_error());
        assert!(!Diagnostic::warning("w", span).is_error());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn span_serializes() {
        let s = Span::new(SourceId(1), Pos(2), Pos(3));
        let json = serde_json::to_string(&s).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
