//! tagscript-lexer — analyse lexicale du dialecte tagscript
//!
//! Faits saillants :
//! - `Lexer` : commentaires `//` et `/* */`, identifiants Unicode, mots-clés,
//!   nombres (2/8/10/16, `_`, flottants + exposant), chaînes `'…'`/`"…"` avec échappements
//! - chaque `Token` porte `newline_before` (insertion automatique de `;` côté parser)
//! - primitives « brutes » (`raw_*`, `scan_markup_*`) pour le balisage, pilotées par le parser
//! - les gabarits `` `…` `` sont refusés avec un message dédié
//!
//! Exemple éclair :
//! ```
//! use tagscript_core::SourceId;
//! use tagscript_lexer::{Lexer, TokenKind};
//!
//! let mut lx = Lexer::new("const a = 1;", SourceId(0));
//! let toks = lx.tokenize().unwrap();
//! assert!(matches!(toks.last().map(|t| &t.value), Some(TokenKind::Eof)));
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fmt;

use tagscript_core::{Pos, SourceId, Span};

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Mots réservés.
///
/// Les mots contextuels (`async`, `of`, `as`, `from`, `type`, `interface`, `get`, `set`)
/// restent des `Ident`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
    /// `function`
    Function,
    /// `return`
    Return,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `for`
    For,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `throw`
    Throw,
    /// `try`
    Try,
    /// `catch`
    Catch,
    /// `finally`
    Finally,
    /// `new`
    New,
    /// `typeof`
    Typeof,
    /// `void`
    Void,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `import`
    Import,
    /// `export`
    Export,
    /// `default`
    Default,
    /// `await`
    Await,
    /// `class`
    Class,
    /// `switch`
    Switch,
    /// `case`
    Case,
    /// `do`
    Do,
    /// `in`
    In,
    /// `instanceof`
    Instanceof,
    /// `delete`
    Delete,
    /// `this`
    This,
    /// `yield`
    Yield,
    /// `with`
    With,
}

impl Keyword {
    /// Texte source du mot-clé.
    pub fn as_str(self) -> &'static str {
        use Keyword::*;
        match self {
            Var => "var",
            Let => "let",
            Const => "const",
            Function => "function",
            Return => "return",
            If => "if",
            Else => "else",
            While => "while",
            For => "for",
            Break => "break",
            Continue => "continue",
            Throw => "throw",
            Try => "try",
            Catch => "catch",
            Finally => "finally",
            New => "new",
            Typeof => "typeof",
            Void => "void",
            True => "true",
            False => "false",
            Null => "null",
            Import => "import",
            Export => "export",
            Default => "default",
            Await => "await",
            Class => "class",
            Switch => "switch",
            Case => "case",
            Do => "do",
            In => "in",
            Instanceof => "instanceof",
            Delete => "delete",
            This => "this",
            Yield => "yield",
            With => "with",
        }
    }
}

/// Genre de jeton lexical.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    /// Fin de fichier.
    Eof,
    /// Identifiant (hors mots réservés).
    Ident(&'a str),
    /// Mot réservé.
    Kw(Keyword),
    /// Littéral numérique.
    Num(f64),
    /// Littéral chaîne (décodée).
    Str(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `;`
    Semi,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `?.`
    QuestionDot,
    /// `??`
    QuestionQuestion,
    /// `=>`
    FatArrow,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    Ne,
    /// `!==`
    NeEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `+=`
    PlusEq,
    /// `-=`
    MinusEq,
    /// `*=`
    StarEq,
    /// `/=`
    SlashEq,
    /// `%=`
    PercentEq,
}

impl TokenKind<'_> {
    /// Représentation courte pour les messages (`';'`, `'{'`…).
    pub fn describe(&self) -> String {
        use TokenKind::*;
        let s = match self {
            Eof => return "end of file".into(),
            Ident(s) => return format!("'{s}'"),
            Kw(k) => return format!("'{}'", k.as_str()),
            Num(n) => return format!("'{n}'"),
            Str(_) => return "string literal".into(),
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Comma => ",",
            Dot => ".",
            Ellipsis => "...",
            Semi => ";",
            Colon => ":",
            Question => "?",
            QuestionDot => "?.",
            QuestionQuestion => "??",
            FatArrow => "=>",
            Plus => "+",
            Minus => "-",
            Star => "*",
            StarStar => "**",
            Slash => "/",
            Percent => "%",
            PlusPlus => "++",
            MinusMinus => "--",
            Eq => "=",
            EqEq => "==",
            EqEqEq => "===",
            Ne => "!=",
            NeEq => "!==",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            AndAnd => "&&",
            OrOr => "||",
            Bang => "!",
            Amp => "&",
            Pipe => "|",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
        };
        format!("'{s}'")
    }
}

/// Jeton avec span et indicateur de saut de ligne.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    /// Genre.
    pub value: TokenKind<'a>,
    /// Localisation.
    pub span: Span,
    /// Un saut de ligne précède ce jeton (depuis le jeton précédent).
    pub newline_before: bool,
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d’erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Caractère inattendu.
    UnexpectedChar(char),
    /// Commentaire bloc non terminé.
    UnterminatedBlockComment,
    /// Chaîne non terminée.
    UnterminatedString,
    /// Séquence d’échappement invalide.
    InvalidEscape,
    /// Littéral numérique invalide.
    InvalidNumber,
    /// Construction reconnue mais hors dialecte.
    Unsupported(&'static str),
}

/// Erreur lexicale avec localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Localisation.
    pub span: Span,
    /// Genre d’erreur.
    pub kind: LexErrorKind,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LexErrorKind::*;
        match &self.kind {
            UnexpectedChar(c) => write!(f, "Invalid character {c:?}."),
            UnterminatedBlockComment => write!(f, "'*/' expected."),
            UnterminatedString => write!(f, "Unterminated string literal."),
            InvalidEscape => write!(f, "Invalid escape sequence."),
            InvalidNumber => write!(f, "Invalid number literal."),
            Unsupported(what) => write!(f, "{what} are not supported."),
        }
    }
}

impl std::error::Error for LexError {}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// Analyseur lexical (itératif, clonable pour les retours arrière du parser).
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    /// Position courante en bytes.
    off: usize,
    /// Id de la source.
    source: SourceId,
}

impl<'a> Lexer<'a> {
    /// Crée un lexer.
    pub fn new(src: &'a str, source: SourceId) -> Self {
        Self { src, off: 0, source }
    }

    /// Source complète.
    pub fn src(&self) -> &'a str { self.src }

    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }

    /// Repositionne le curseur (doit tomber sur une frontière de caractère).
    pub fn seek(&mut self, off: usize) {
        debug_assert!(self.src.is_char_boundary(off));
        self.off = off.min(self.src.len());
    }

    /// Prochain jeton ; émet `Eof` indéfiniment en fin de source.
    pub fn next(&mut self) -> Result<Token<'a>, LexError> {
        let newline_before = self.skip_ws_and_comments()?;
        let start = self.off;
        let Some(c) = self.bump_char() else {
            return Ok(Token { value: TokenKind::Eof, span: self.span_from(start), newline_before });
        };

        let kind = match c {
            ch if is_ident_start(ch) => {
                self.consume_while(is_ident_continue);
                let s = &self.src[start..self.off];
                keyword_of(s).map_or(TokenKind::Ident(s), TokenKind::Kw)
            }
            ch if ch.is_ascii_digit() => self.lex_number(start, ch)?,
            '.' if self.peek_char().is_some_and(|d| d.is_ascii_digit()) => self.lex_number(start, '.')?,
            '"' | '\'' => TokenKind::Str(self.lex_string(start, c)?),
            '`' => return Err(self.err_from(start, LexErrorKind::Unsupported("Template literals"))),

            '.' => if self.peek_char() == Some('.') && self.peek2() == Some('.') {
                self.off += 2;
                TokenKind::Ellipsis
            } else {
                TokenKind::Dot
            },
            '?' => if self.eat('?') {
                TokenKind::QuestionQuestion
            } else if self.peek_char() == Some('.') && !self.peek2().is_some_and(|d| d.is_ascii_digit()) {
                self.off += 1;
                TokenKind::QuestionDot
            } else {
                TokenKind::Question
            },
            '=' => if self.eat('>') {
                TokenKind::FatArrow
            } else if self.eat('=') {
                if self.eat('=') { TokenKind::EqEqEq } else { TokenKind::EqEq }
            } else {
                TokenKind::Eq
            },
            '!' => if self.eat('=') {
                if self.eat('=') { TokenKind::NeEq } else { TokenKind::Ne }
            } else {
                TokenKind::Bang
            },
            '+' => if self.eat('+') { TokenKind::PlusPlus } else if self.eat('=') { TokenKind::PlusEq } else { TokenKind::Plus },
            '-' => if self.eat('-') { TokenKind::MinusMinus } else if self.eat('=') { TokenKind::MinusEq } else { TokenKind::Minus },
            '*' => if self.eat('*') { TokenKind::StarStar } else if self.eat('=') { TokenKind::StarEq } else { TokenKind::Star },
            '/' => if self.eat('=') { TokenKind::SlashEq } else { TokenKind::Slash },
            '%' => if self.eat('=') { TokenKind::PercentEq } else { TokenKind::Percent },
            '&' => if self.eat('&') { TokenKind::AndAnd } else { TokenKind::Amp },
            '|' => if self.eat('|') { TokenKind::OrOr } else { TokenKind::Pipe },
            '<' => if self.eat('=') { TokenKind::Le } else { TokenKind::Lt },
            '>' => if self.eat('=') { TokenKind::Ge } else { TokenKind::Gt },

            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' => TokenKind::Colon,

            other => return Err(self.err_from(start, LexErrorKind::UnexpectedChar(other))),
        };

        #[cfg(feature = "trace")]
        log::trace!("token {kind:?} @ {start}..{}", self.off);

        Ok(Token { value: kind, span: self.span_from(start), newline_before })
    }

    /// Tokenise toute la source (ajoute `Eof` final).
    pub fn tokenize(&mut self) -> Result<Vec<Token<'a>>, LexError> {
        let mut out = Vec::new();
        loop {
            let t = self.next()?;
            let is_eof = matches!(t.value, TokenKind::Eof);
            out.push(t);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }

    /* ────────── Mode brut (balisage) ────────── */

    /// Caractère courant sans rien sauter.
    pub fn raw_peek(&self) -> Option<char> { self.peek_char() }

    /// Consomme le caractère courant.
    pub fn raw_bump(&mut self) -> Option<char> { self.bump_char() }

    /// Consomme `ch` s’il est le caractère courant.
    pub fn raw_eat(&mut self, ch: char) -> bool { self.eat(ch) }

    /// Saute les blancs (sans commentaires).
    pub fn skip_markup_ws(&mut self) { self.consume_while(char::is_whitespace); }

    /// Lit un nom de balise ou d’attribut (`div`, `my-tag`, `Foo.Bar`, `aria-label`).
    pub fn scan_markup_name(&mut self) -> &'a str {
        let start = self.off;
        if self.peek_char().is_some_and(is_ident_start) {
            self.consume_while(|c| is_ident_continue(c) || c == '-' || c == '.');
        }
        &self.src[start..self.off]
    }

    /// Lit du texte jusqu’au prochain `<` ou `{` (non inclus).
    pub fn scan_markup_text(&mut self) -> &'a str {
        let start = self.off;
        self.consume_while(|c| c != '<' && c != '{');
        &self.src[start..self.off]
    }

    /// Lit une valeur d’attribut entre guillemets (sans échappements) ; le guillemet ouvrant
    /// est le caractère courant.
    pub fn scan_markup_string(&mut self) -> Result<&'a str, LexError> {
        let start = self.off;
        let quote = self.bump_char().ok_or_else(|| self.err_from(start, LexErrorKind::UnterminatedString))?;
        let body = self.off;
        self.consume_while(|c| c != quote);
        if !self.eat(quote) {
            return Err(self.err_from(start, LexErrorKind::UnterminatedString));
        }
        Ok(&self.src[body..self.off - quote.len_utf8()])
    }

    /// Span `[start, offset courant)`.
    pub fn span_from(&self, start: usize) -> Span {
        Span { source: self.source, start: pos(start), end: pos(self.off) }
    }

    /* ────────── Primitives internes ────────── */

    #[inline] fn peek_char(&self) -> Option<char> { self.src[self.off..].chars().next() }
    #[inline] fn peek2(&self) -> Option<char> { self.src[self.off..].chars().nth(1) }
    #[inline] fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.off += c.len_utf8();
        Some(c)
    }
    #[inline] fn eat(&mut self, ch: char) -> bool {
        if self.peek_char() == Some(ch) { self.off += ch.len_utf8(); true } else { false }
    }

    fn consume_while(&mut self, mut p: impl FnMut(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if p(c) { self.off += c.len_utf8(); } else { break; }
        }
    }

    /// Saute blancs et commentaires ; renvoie vrai si un saut de ligne a été franchi.
    fn skip_ws_and_comments(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        loop {
            while let Some(c) = self.peek_char() {
                if !c.is_whitespace() { break; }
                newline |= is_line_terminator(c);
                self.off += c.len_utf8();
            }
            // shebang
            if self.off == 0 && self.src.starts_with("#!") {
                self.consume_while(|c| !is_line_terminator(c));
                continue;
            }
            if self.peek_char() == Some('/') && self.peek2() == Some('/') {
                self.consume_while(|c| !is_line_terminator(c));
                continue;
            }
            if self.peek_char() == Some('/') && self.peek2() == Some('*') {
                let start = self.off;
                self.off += 2;
                loop {
                    let Some(c) = self.bump_char() else {
                        return Err(self.err_from(start, LexErrorKind::UnterminatedBlockComment));
                    };
                    newline |= is_line_terminator(c);
                    if c == '*' && self.eat('/') { break; }
                }
                continue;
            }
            return Ok(newline);
        }
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            let c = self.bump_char().ok_or_else(|| self.err_from(start, LexErrorKind::UnterminatedString))?;
            match c {
                c if c == quote => break,
                '\n' | '\r' => return Err(self.err_from(start, LexErrorKind::UnterminatedString)),
                '\\' => {
                    let esc = self.bump_char().ok_or_else(|| self.err_from(start, LexErrorKind::UnterminatedString))?;
                    match esc {
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'v' => out.push('\u{b}'),
                        '0' if !self.peek_char().is_some_and(|d| d.is_ascii_digit()) => out.push('\0'),
                        'x' => {
                            let v = self.read_hex_digits(2)?;
                            out.push(char::from_u32(v).ok_or_else(|| self.err_here(LexErrorKind::InvalidEscape))?);
                        }
                        'u' => out.push(self.read_unicode_escape()?),
                        // continuation de ligne
                        '\r' => { self.eat('\n'); }
                        '\n' | '\u{2028}' | '\u{2029}' => {}
                        c if c.is_ascii_digit() => return Err(self.err_here(LexErrorKind::InvalidEscape)),
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn read_hex_digits(&mut self, n: usize) -> Result<u32, LexError> {
        let mut v = 0u32;
        for _ in 0..n {
            let d = self
                .bump_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.err_here(LexErrorKind::InvalidEscape))?;
            v = (v << 4) | d;
        }
        Ok(v)
    }

    fn read_unicode_escape(&mut self) -> Result<char, LexError> {
        let v = if self.eat('{') {
            let start = self.off;
            self.consume_while(|c| c.is_ascii_hexdigit());
            let raw = &self.src[start..self.off];
            if raw.is_empty() || !self.eat('}') {
                return Err(self.err_here(LexErrorKind::InvalidEscape));
            }
            u32::from_str_radix(raw, 16).map_err(|_| self.err_here(LexErrorKind::InvalidEscape))?
        } else {
            let hi = self.read_hex_digits(4)?;
            // paire de substitution 😀
            if (0xD800..0xDC00).contains(&hi) && self.src[self.off..].starts_with("\\u") {
                let save = self.off;
                self.off += 2;
                match self.read_hex_digits(4) {
                    Ok(lo) if (0xDC00..0xE000).contains(&lo) => 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00),
                    _ => {
                        self.off = save;
                        hi
                    }
                }
            } else {
                hi
            }
        };
        Ok(char::from_u32(v).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn lex_number(&mut self, start: usize, first: char) -> Result<TokenKind<'a>, LexError> {
        if first == '0' {
            let radix = match self.peek_char() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.off += 1;
                self.consume_while(|c| c.is_digit(radix) || c == '_');
                let raw = self.src[start + 2..self.off].replace('_', "");
                if raw.is_empty() || self.peek_char().is_some_and(is_ident_start) {
                    return Err(self.err_from(start, LexErrorKind::InvalidNumber));
                }
                let v = raw
                    .chars()
                    .filter_map(|c| c.to_digit(radix))
                    .fold(0f64, |acc, d| acc * f64::from(radix) + f64::from(d));
                return Ok(TokenKind::Num(v));
            }
        }

        // Décimal / flottant
        if first != '.' {
            self.consume_while(|c| c.is_ascii_digit() || c == '_');
            if self.peek_char() == Some('.') {
                self.off += 1;
                self.consume_while(|c| c.is_ascii_digit() || c == '_');
            }
        } else {
            self.consume_while(|c| c.is_ascii_digit() || c == '_');
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            self.off += 1;
            if matches!(self.peek_char(), Some('+' | '-')) { self.off += 1; }
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.err_from(start, LexErrorKind::InvalidNumber));
            }
            self.consume_while(|c| c.is_ascii_digit());
        }
        if self.peek_char().is_some_and(is_ident_start) {
            return Err(self.err_from(start, LexErrorKind::InvalidNumber));
        }

        let raw = self.src[start..self.off].replace('_', "");
        raw.parse::<f64>()
            .map(TokenKind::Num)
            .map_err(|_| self.err_from(start, LexErrorKind::InvalidNumber))
    }

    /* ────────── Spans / erreurs ────────── */

    #[inline] fn err_here(&self, kind: LexErrorKind) -> LexError {
        let end = self.off + self.peek_char().map_or(0, char::len_utf8);
        LexError { span: Span { source: self.source, start: pos(self.off), end: pos(end) }, kind }
    }
    #[inline] fn err_from(&self, start: usize, kind: LexErrorKind) -> LexError { LexError { span: self.span_from(start), kind } }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
fn pos(off: usize) -> Pos { Pos(u32::try_from(off).unwrap_or(u32::MAX)) }

/// Premier caractère d’identifiant.
#[inline]
pub fn is_ident_start(c: char) -> bool { c == '_' || c == '$' || c.is_alphabetic() }

/// Caractère d’identifiant (hors premier).
#[inline]
pub fn is_ident_continue(c: char) -> bool { c == '_' || c == '$' || c.is_alphanumeric() }

/// Vrai si `s` est un nom d’identifiant valide et non réservé.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_continue) && keyword_of(s).is_none()
}

#[inline]
fn is_line_terminator(c: char) -> bool { matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') }

/// Mot réservé correspondant à `s`.
pub fn keyword_of(s: &str) -> Option<Keyword> {
    use Keyword::*;
    Some(match s {
        "var" => Var,
        "let" => Let,
        "const" => Const,
        "function" => Function,
        "return" => Return,
        "if" => If,
        "else" => Else,
        "while" => While,
        "for" => For,
        "break" => Break,
        "continue" => Continue,
        "throw" => Throw,
        "try" => Try,
        "catch" => Catch,
        "finally" => Finally,
        "new" => New,
        "typeof" => Typeof,
        "void" => Void,
        "true" => True,
        "false" => False,
        "null" => Null,
        "import" => Import,
        "export" => Export,
        "default" => Default,
        "await" => Await,
        "class" => Class,
        "switch" => Switch,
        "case" => Case,
        "do" => Do,
        "in" => In,
        "instanceof" => Instanceof,
        "delete" => Delete,
        "this" => This,
        "yield" => Yield,
        "with" => With,
        _ => return None,
    })
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn toks(src: &str) -> Vec<TokenKind<'_>> {
        let mut lx = Lexer::new(src, SourceId(0));
        lx.tokenize().unwrap().into_iter().map(|t| t.value).collect()
    }

    fn err(src: &str) -> LexErrorKind {
        Lexer::new(src, SourceId(0)).tokenize().unwrap_err().kind
    }

    #[test]
    fn idents_keywords() {
        use Keyword::*;
        use TokenKind::*;
        let v = toks("const async of function return export default $el _x x1 été");
        assert_eq!(v[0], Kw(Const));
        assert_eq!(v[1], Ident("async"));
        assert_eq!(v[2], Ident("of"));
        assert_eq!(v[3], Kw(Function));
        assert_eq!(v[4], Kw(Return));
        assert_eq!(v[5], Kw(Export));
        assert_eq!(v[6], Kw(Default));
        assert_eq!(v[7], Ident("$el"));
        assert_eq!(v[8], Ident("_x"));
        assert_eq!(v[9], Ident("x1"));
        assert_eq!(v[10], Ident("été"));
        assert_eq!(v[11], Eof);
    }

    #[test]
    fn numbers() {
        use TokenKind::*;
        let v = toks("0xFF 0o17 0b1010 123 1_000 12.5 1e3 2.5e-2 .5 7.");
        assert_eq!(
            v[..10],
            [Num(255.0), Num(15.0), Num(10.0), Num(123.0), Num(1000.0), Num(12.5), Num(1000.0), Num(0.025), Num(0.5), Num(7.0)]
        );
        assert_eq!(err("12abc"), LexErrorKind::InvalidNumber);
        assert_eq!(err("0x"), LexErrorKind::InvalidNumber);
        assert_eq!(err("1e+"), LexErrorKind::InvalidNumber);
    }

    #[test]
    fn strings_and_escapes() {
        use TokenKind::*;
        let v = toks(r#"'a\'b' "c\"d" "\n\t\x41B\u{1F600}" 'line\
next'"#);
        assert_eq!(v[0], Str("a'b".into()));
        assert_eq!(v[1], Str("c\"d".into()));
        assert_eq!(v[2], Str("\n\tAB😀".into()));
        assert_eq!(v[3], Str("linenext".into()));
        assert_eq!(toks(r#""😀""#)[0], Str("😀".into()));
        assert_eq!(err("'abc"), LexErrorKind::UnterminatedString);
        assert_eq!(err("'ab\ncd'"), LexErrorKind::UnterminatedString);
        assert_eq!(err(r#""\x4""#), LexErrorKind::InvalidEscape);
    }

    #[test]
    fn punctuation_is_greedy() {
        use TokenKind::*;
        let v = toks("=== !== == != => ** ++ -- ?? ?. ... += -= *= /= %= && || & | ? a?.5:1");
        assert_eq!(
            v[..20],
            [
                EqEqEq, NeEq, EqEq, Ne, FatArrow, StarStar, PlusPlus, MinusMinus, QuestionQuestion, QuestionDot,
                Ellipsis, PlusEq, MinusEq, StarEq, SlashEq, PercentEq, AndAnd, OrOr, Amp, Pipe
            ]
        );
        assert_eq!(v[20], Question);
        assert_eq!(v[21..25], [Ident("a"), Question, Num(0.5), Colon]);
    }

    #[test]
    fn comments_and_newlines() {
        let mut lx = Lexer::new("a // c\n/* x\n */ b /* y */ c", SourceId(0));
        let t = lx.tokenize().unwrap();
        assert_eq!(t[0].value, TokenKind::Ident("a"));
        assert!(!t[0].newline_before);
        assert_eq!(t[1].value, TokenKind::Ident("b"));
        assert!(t[1].newline_before);
        assert_eq!(t[2].value, TokenKind::Ident("c"));
        assert!(!t[2].newline_before);
        assert_eq!(err("/* open"), LexErrorKind::UnterminatedBlockComment);
    }

    #[test]
    fn spans_are_byte_offsets() {
        let mut lx = Lexer::new("  été = 1", SourceId(3));
        let t = lx.next().unwrap();
        assert_eq!((t.span.start.0, t.span.end.0), (2, 7));
        assert_eq!(t.span.source, SourceId(3));
    }

    #[test]
    fn unsupported_constructs() {
        assert_eq!(err("`tpl`"), LexErrorKind::Unsupported("Template literals"));
        assert_eq!(err("#"), LexErrorKind::UnexpectedChar('#'));
        let e = Lexer::new("`x`", SourceId(0)).next().unwrap_err();
        assert_eq!(e.to_string(), "Template literals are not supported.");
    }

    #[test]
    fn raw_markup_primitives() {
        let src = "<my-el a=\"x y\">text {";
        let mut lx = Lexer::new(src, SourceId(0));
        assert!(lx.raw_eat('<'));
        assert_eq!(lx.scan_markup_name(), "my-el");
        lx.skip_markup_ws();
        assert_eq!(lx.scan_markup_name(), "a");
        assert!(lx.raw_eat('='));
        assert_eq!(lx.scan_markup_string().unwrap(), "x y");
        assert!(lx.raw_eat('>'));
        assert_eq!(lx.scan_markup_text(), "text ");
        assert_eq!(lx.raw_peek(), Some('{'));
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("foo"));
        assert!(is_identifier("$_1"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("default"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
    }

    proptest::proptest! {
        #[test]
        fn lexing_never_panics(src in "\\PC{0,64}") {
            let _ = Lexer::new(&src, SourceId(0)).tokenize();
        }

        #[test]
        fn integers_roundtrip(n in 0u32..1_000_000) {
            let s = n.to_string();
            let v = toks(&s);
            proptest::prop_assert_eq!(v[0].clone(), TokenKind::Num(f64::from(n)));
        }
    }
}
