//! tagscript-parser — parseur du dialecte tagscript
//!
//! Branches :
//! - `tagscript-lexer` pour la tokenisation
//! - `tagscript-core` pour `Span` et `Diagnostic`
//! - `tagscript-ast` pour l’AST cible
//!
//! Grammaire (essentiel) :
//! ```text
//! program    := stmt*
//! stmt       := var_decl | function_decl | import | export | type_decl
//!             | "if" "(" expr ")" stmt ("else" stmt)?
//!             | "while" "(" expr ")" stmt
//!             | "for" "(" (var_decl | expr)? ";" expr? ";" expr? ")" stmt
//!             | "for" "(" ("let"|"const"|"var") ident "of" expr ")" stmt
//!             | "try" block ("catch" ("(" ident ")")? block)? ("finally" block)?
//!             | "return" expr? ";" | "throw" expr ";" | "break" ";" | "continue" ";"
//!             | block | expr ";"
//! expr       := arrow | assign
//! assign     := conditional (assign_op assign)?
//! conditional:= binary ("?" assign ":" assign)?
//! binary     := pratt (`??` `||` `&&` égalités comparaisons `+` `*` `**`)
//! unary      := ("!"|"-"|"+"|"typeof"|"void"|"await"|"++"|"--") unary | postfix
//! postfix    := call_member ("++"|"--")?
//! primary    := literal | ident | "(" expr ")" | array | object | function | markup
//! ```
//!
//! Les `;` peuvent être omis en fin de ligne, avant `}` ou en fin de source.
//! Les annotations de type sont reconnues puis jetées (voir `types.rs`).

#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

mod expr;
mod markup;
mod types;

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tagscript_ast as ast;
use tagscript_core::{Diagnostic, LineMap, Pos, SourceId, Span};
use tagscript_lexer::{Keyword, LexError, Lexer, Token, TokenKind};

/* ─────────────────────────── Options ─────────────────────────── */

/// Dialecte accepté.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accepter annotations de type, `as`, `!` postfixe, `type`/`interface`.
    pub typescript: bool,
    /// Accepter le balisage `<div>…</div>`.
    pub markup: bool,
}

impl ParseOptions {
    /// Dialecte source complet.
    pub const fn source() -> Self { Self { typescript: true, markup: true } }

    /// Dialecte source sans balisage (les `<` sont des comparaisons ou des types).
    pub const fn source_without_markup() -> Self { Self { typescript: true, markup: false } }

    /// Code portable émis par le transformateur (ni types ni balisage).
    pub const fn portable() -> Self { Self { typescript: false, markup: false } }
}

impl Default for ParseOptions {
    fn default() -> Self { Self::source() }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur de parsing avec span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Localisation.
    pub span: Span,
    /// Message humain.
    pub message: String,
}

impl ParseError {
    fn new(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into() }
    }

    /// Convertit en diagnostic localisé (ligne/colonne) dans `src`.
    pub fn into_diagnostic(self, src: &str) -> Diagnostic {
        Diagnostic::error(self.message, self.span).located(&LineMap::new(src))
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self { Self::new(e.span, e.to_string()) }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{}..{}", self.message, self.span.start.0, self.span.end.0)
    }
}

impl std::error::Error for ParseError {}

type PResult<T> = Result<T, ParseError>;

/* ─────────────────────────── API ─────────────────────────── */

/// Imbrication maximale (instructions, expressions, types, balisage) ;
/// au-delà le source est rejeté au lieu d’épuiser la pile.
pub const MAX_NESTING: u32 = 64;

/// Parse `src` entièrement ; la première erreur est rendue en `Diagnostic` localisé.
pub fn parse(src: &str, opts: ParseOptions) -> Result<ast::Program, Diagnostic> {
    let mut p = Parser::new(src, SourceId(0), opts).map_err(|e| e.into_diagnostic(src))?;
    p.parse_program().map_err(|e| e.into_diagnostic(src))
}

/* ─────────────────────────── Parser ─────────────────────────── */

/// Contexte syntaxique courant (validations sémantiques).
#[derive(Debug, Clone, Copy, Default)]
struct Ctx {
    in_function: bool,
    in_async: bool,
    loop_depth: u32,
}

/// État restaurable pour les tentatives (flèches).
#[derive(Clone)]
struct Snapshot<'a> {
    lx: Lexer<'a>,
    look: Token<'a>,
    prev_end: u32,
    ctx: Ctx,
}

/// Parser tagscript.
pub struct Parser<'a> {
    /// Lexer interne.
    lx: Lexer<'a>,
    /// Buffer 1-token d’anticipation.
    look: Token<'a>,
    /// Fin du dernier jeton consommé.
    prev_end: u32,
    /// Source id (propagé dans les spans composés).
    source: SourceId,
    opts: ParseOptions,
    ctx: Ctx,
    default_exported: bool,
    /// Niveaux d’imbrication ouverts.
    depth: u32,
}

impl<'a> Parser<'a> {
    /// Crée un parser ; échoue si le premier jeton est invalide.
    pub fn new(src: &'a str, source: SourceId, opts: ParseOptions) -> PResult<Self> {
        let mut lx = Lexer::new(src, source);
        let look = lx.next()?;
        Ok(Self { lx, look, prev_end: 0, source, opts, ctx: Ctx::default(), default_exported: false, depth: 0 })
    }

    /// Parse un programme complet.
    pub fn parse_program(&mut self) -> PResult<ast::Program> {
        #[cfg(feature = "trace")]
        log::trace!("parse_program: {} bytes", self.lx.src().len());

        let mut body = Vec::new();
        while !self.at(&TokenKind::Eof) {
            body.push(self.parse_statement(true)?);
        }
        Ok(ast::Program { body })
    }

    /* ─────────── Instructions ─────────── */

    fn parse_statement(&mut self, top_level: bool) -> PResult<ast::Stmt> { self.nested(|p| p.statement(top_level)) }

    fn statement(&mut self, top_level: bool) -> PResult<ast::Stmt> {
        use ast::Stmt;
        match &self.look.value {
            TokenKind::Semi => {
                self.bump()?;
                Ok(Stmt::Empty)
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block_body()?)),
            TokenKind::Kw(Keyword::Var | Keyword::Let | Keyword::Const) => {
                let (kind, decls) = self.parse_var(false)?;
                self.consume_semi()?;
                Ok(Stmt::Var { kind, decls })
            }
            TokenKind::Kw(Keyword::Function) => {
                let start = self.start();
                Ok(Stmt::Function(Rc::new(self.parse_function_keyword(start, false, true)?)))
            }
            TokenKind::Ident("async") if self.next_is_function() => {
                let start = self.start();
                self.bump()?;
                Ok(Stmt::Function(Rc::new(self.parse_function_keyword(start, true, true)?)))
            }
            TokenKind::Kw(Keyword::Return) => self.parse_return(),
            TokenKind::Kw(Keyword::If) => self.parse_if(),
            TokenKind::Kw(Keyword::While) => {
                self.bump()?;
                let test = self.parse_paren_expr()?;
                let body = Box::new(self.parse_loop_body()?);
                Ok(Stmt::While { test, body })
            }
            TokenKind::Kw(Keyword::For) => self.parse_for(),
            TokenKind::Kw(Keyword::Break) => self.parse_jump(true),
            TokenKind::Kw(Keyword::Continue) => self.parse_jump(false),
            TokenKind::Kw(Keyword::Throw) => {
                self.bump()?;
                if self.look.newline_before {
                    return self.error(self.look.span, "Line break not permitted here.");
                }
                let e = self.parse_expr()?;
                self.consume_semi()?;
                Ok(Stmt::Throw(e))
            }
            TokenKind::Kw(Keyword::Try) => self.parse_try(),
            TokenKind::Kw(Keyword::Import) => {
                if !top_level {
                    return self.error(self.look.span, "An import declaration can only be used at the top level of a module.");
                }
                self.parse_import()
            }
            TokenKind::Kw(Keyword::Export) => {
                if !top_level {
                    return self.error(self.look.span, "Modifiers cannot appear here.");
                }
                self.parse_export()
            }
            TokenKind::Ident("type" | "interface") if self.opts.typescript && self.next_is_ident_on_same_line() => {
                self.parse_type_decl()
            }
            TokenKind::Kw(Keyword::Class) => self.error(self.look.span, "Class declarations are not supported."),
            TokenKind::Kw(Keyword::Switch) => self.error(self.look.span, "'switch' statements are not supported."),
            TokenKind::Kw(Keyword::Do) => self.error(self.look.span, "'do' statements are not supported."),
            TokenKind::Kw(Keyword::With) => self.error(self.look.span, "'with' statements are not supported."),
            _ => {
                let e = self.parse_expr()?;
                self.consume_semi()?;
                Ok(Stmt::Expr(e))
            }
        }
    }

    /// `{ stmt* }`
    fn parse_block_body(&mut self) -> PResult<Vec<ast::Stmt>> {
        self.expect(&TokenKind::LBrace)?;
        let mut out = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                return self.error(self.look.span, "'}' expected.");
            }
            out.push(self.parse_statement(false)?);
        }
        self.bump()?;
        Ok(out)
    }

    fn parse_var(&mut self, in_for: bool) -> PResult<(ast::VarKind, Vec<ast::VarDecl>)> {
        let kind = self.var_kind()?;
        let mut decls = Vec::new();
        loop {
            let span = self.look.span;
            let name = self.expect_binding()?;
            decls.push(self.parse_declarator_tail(kind, name, span, in_for)?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        Ok((kind, decls))
    }

    fn var_kind(&mut self) -> PResult<ast::VarKind> {
        let kind = match self.look.value {
            TokenKind::Kw(Keyword::Var) => ast::VarKind::Var,
            TokenKind::Kw(Keyword::Let) => ast::VarKind::Let,
            TokenKind::Kw(Keyword::Const) => ast::VarKind::Const,
            _ => return self.error(self.look.span, "Variable declaration expected."),
        };
        self.bump()?;
        Ok(kind)
    }

    /// Annotation de type, initialiseur et contrôle `const`.
    fn parse_declarator_tail(&mut self, kind: ast::VarKind, name: String, name_span: Span, in_for: bool) -> PResult<ast::VarDecl> {
        if self.opts.typescript {
            if self.at(&TokenKind::Bang) {
                self.bump()?;
            }
            if self.eat(&TokenKind::Colon)? {
                self.skip_type()?;
            }
        }
        let init = if self.eat(&TokenKind::Eq)? { Some(self.parse_assign()?) } else { None };
        if kind == ast::VarKind::Const && init.is_none() && !in_for {
            return self.error(name_span, "'const' declarations must be initialized.");
        }
        Ok(ast::VarDecl { name, init })
    }

    fn parse_return(&mut self) -> PResult<ast::Stmt> {
        let span = self.look.span;
        if !self.ctx.in_function {
            return self.error(span, "A 'return' statement can only be used within a function body.");
        }
        self.bump()?;
        let value = if self.at_statement_end() { None } else { Some(self.parse_expr()?) };
        self.consume_semi()?;
        Ok(ast::Stmt::Return(value))
    }

    fn parse_if(&mut self) -> PResult<ast::Stmt> {
        self.bump()?;
        let test = self.parse_paren_expr()?;
        let then = Box::new(self.parse_statement(false)?);
        let otherwise = if self.at_kw(Keyword::Else) {
            self.bump()?;
            Some(Box::new(self.parse_statement(false)?))
        } else {
            None
        };
        Ok(ast::Stmt::If { test, then, otherwise })
    }

    fn parse_for(&mut self) -> PResult<ast::Stmt> {
        self.bump()?;
        self.expect(&TokenKind::LParen)?;
        let init = if self.at(&TokenKind::Semi) {
            None
        } else if matches!(self.look.value, TokenKind::Kw(Keyword::Var | Keyword::Let | Keyword::Const)) {
            let kind = self.var_kind()?;
            let span = self.look.span;
            let name = self.expect_binding()?;
            if self.at_ident("of") {
                self.bump()?;
                let iter = self.parse_assign()?;
                self.expect(&TokenKind::RParen)?;
                let body = Box::new(self.parse_loop_body()?);
                return Ok(ast::Stmt::ForOf { kind, name, iter, body });
            }
            if self.at_kw(Keyword::In) {
                return self.error(self.look.span, "'for...in' statements are not supported.");
            }
            let mut decls = vec![self.parse_declarator_tail(kind, name, span, false)?];
            while self.eat(&TokenKind::Comma)? {
                let span = self.look.span;
                let name = self.expect_binding()?;
                decls.push(self.parse_declarator_tail(kind, name, span, false)?);
            }
            Some(Box::new(ast::Stmt::Var { kind, decls }))
        } else {
            let e = self.parse_expr()?;
            if self.at_ident("of") || self.at_kw(Keyword::In) {
                return self.error(self.look.span, "The loop variable must be declared with 'const', 'let' or 'var'.");
            }
            Some(Box::new(ast::Stmt::Expr(e)))
        };
        self.expect(&TokenKind::Semi)?;
        let test = if self.at(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Semi)?;
        let update = if self.at(&TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_loop_body()?);
        Ok(ast::Stmt::For { init, test, update, body })
    }

    fn parse_loop_body(&mut self) -> PResult<ast::Stmt> {
        self.ctx.loop_depth += 1;
        let body = self.parse_statement(false);
        self.ctx.loop_depth -= 1;
        body
    }

    fn parse_jump(&mut self, is_break: bool) -> PResult<ast::Stmt> {
        let span = self.look.span;
        if self.ctx.loop_depth == 0 {
            let which = if is_break { "break" } else { "continue" };
            return self.error(span, format!("A '{which}' statement can only be used within an enclosing iteration statement."));
        }
        self.bump()?;
        if matches!(self.look.value, TokenKind::Ident(_)) && !self.look.newline_before {
            return self.error(self.look.span, "Labels are not supported.");
        }
        self.consume_semi()?;
        Ok(if is_break { ast::Stmt::Break } else { ast::Stmt::Continue })
    }

    fn parse_try(&mut self) -> PResult<ast::Stmt> {
        self.bump()?;
        let block = self.parse_block_body()?;
        let handler = if self.at_kw(Keyword::Catch) {
            self.bump()?;
            let param = if self.eat(&TokenKind::LParen)? {
                let name = self.expect_binding()?;
                if self.opts.typescript && self.eat(&TokenKind::Colon)? {
                    self.skip_type()?;
                }
                self.expect(&TokenKind::RParen)?;
                Some(name)
            } else {
                None
            };
            Some(ast::CatchClause { param, body: self.parse_block_body()? })
        } else {
            None
        };
        let finalizer = if self.at_kw(Keyword::Finally) {
            self.bump()?;
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return self.error(self.look.span, "'catch' or 'finally' expected.");
        }
        Ok(ast::Stmt::Try { block, handler, finalizer })
    }

    /* ─────────── Modules ─────────── */

    fn parse_import(&mut self) -> PResult<ast::Stmt> {
        self.bump()?;
        let mut import = ast::Import::default();
        if let TokenKind::Str(s) = &self.look.value {
            import.source = s.clone();
            self.bump()?;
            self.consume_semi()?;
            return Ok(ast::Stmt::Import(import));
        }
        if matches!(self.look.value, TokenKind::Ident(_)) {
            import.default = Some(self.expect_binding()?);
            if !self.eat(&TokenKind::Comma)? {
                return self.finish_import(import);
            }
        }
        if self.eat(&TokenKind::Star)? {
            self.expect_contextual("as")?;
            import.namespace = Some(self.expect_binding()?);
        } else if self.eat(&TokenKind::LBrace)? {
            while !self.at(&TokenKind::RBrace) {
                let span = self.look.span;
                let imported = self.expect_property_name()?;
                let local = if self.at_ident("as") {
                    self.bump()?;
                    self.expect_binding()?
                } else if tagscript_lexer::is_identifier(&imported) {
                    imported.clone()
                } else {
                    return self.error(span, "Identifier expected.");
                };
                import.named.push(ast::ImportSpec { imported, local });
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
        } else {
            return self.error(self.look.span, "Declaration or statement expected.");
        }
        self.finish_import(import)
    }

    fn finish_import(&mut self, mut import: ast::Import) -> PResult<ast::Stmt> {
        self.expect_contextual("from")?;
        let TokenKind::Str(s) = &self.look.value else {
            return self.error(self.look.span, "String literal expected.");
        };
        import.source = s.clone();
        self.bump()?;
        self.consume_semi()?;
        Ok(ast::Stmt::Import(import))
    }

    fn parse_export(&mut self) -> PResult<ast::Stmt> {
        use ast::{Export, Stmt};
        self.bump()?;
        match &self.look.value {
            TokenKind::Kw(Keyword::Default) => {
                let span = self.look.span;
                if self.default_exported {
                    return self.error(span, "A module cannot have multiple default exports.");
                }
                self.default_exported = true;
                self.bump()?;
                let start = self.start();
                let is_async = self.at_ident("async") && self.next_is_function();
                if is_async || self.at_kw(Keyword::Function) {
                    if is_async {
                        self.bump()?;
                    }
                    let f = self.parse_function_keyword(start, is_async, false)?;
                    self.eat(&TokenKind::Semi)?;
                    return Ok(Stmt::Export(if f.name.is_some() {
                        Export::DefaultFunction(Rc::new(f))
                    } else {
                        Export::Default(ast::Expr::Function(Rc::new(f)))
                    }));
                }
                let e = self.parse_assign()?;
                self.consume_semi()?;
                Ok(Stmt::Export(Export::Default(e)))
            }
            TokenKind::Kw(Keyword::Var | Keyword::Let | Keyword::Const | Keyword::Function) => {
                Ok(Stmt::Export(Export::Decl(Box::new(self.parse_statement(false)?))))
            }
            TokenKind::Ident("async") if self.next_is_function() => {
                Ok(Stmt::Export(Export::Decl(Box::new(self.parse_statement(false)?))))
            }
            TokenKind::Ident("type" | "interface") if self.opts.typescript => {
                Ok(Stmt::Export(Export::Decl(Box::new(self.parse_type_decl()?))))
            }
            TokenKind::LBrace => {
                self.bump()?;
                let mut specs = Vec::new();
                while !self.at(&TokenKind::RBrace) {
                    let local = self.expect_binding()?;
                    let exported = if self.at_ident("as") {
                        self.bump()?;
                        self.expect_property_name()?
                    } else {
                        local.clone()
                    };
                    specs.push(ast::ExportSpec { local, exported });
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                if self.at_ident("from") {
                    return self.error(self.look.span, "Re-exports are not supported.");
                }
                self.consume_semi()?;
                Ok(Stmt::Export(Export::Named(specs)))
            }
            TokenKind::Star => self.error(self.look.span, "Re-exports are not supported."),
            _ => self.error(self.look.span, "Declaration or statement expected."),
        }
    }

    /* ─────────── Fonctions ─────────── */

    /// `function name? <T>? (params) : R? { body }` ; le curseur est sur `function`.
    fn parse_function_keyword(&mut self, start: u32, is_async: bool, require_name: bool) -> PResult<ast::Function> {
        self.expect(&TokenKind::Kw(Keyword::Function))?;
        if self.at(&TokenKind::Star) {
            return self.error(self.look.span, "Generators are not supported.");
        }
        let name = if matches!(self.look.value, TokenKind::Ident(_)) {
            Some(self.expect_binding()?)
        } else if require_name {
            return self.error(self.look.span, "Identifier expected.");
        } else {
            None
        };
        self.parse_function_rest(start, is_async, name)
    }

    /// Suite d’une fonction à partir des paramètres (ou des paramètres de type).
    fn parse_function_rest(&mut self, start: u32, is_async: bool, name: Option<String>) -> PResult<ast::Function> {
        if self.opts.typescript && self.at(&TokenKind::Lt) {
            self.skip_balanced(&TokenKind::Lt, &TokenKind::Gt)?;
        }
        let params = self.parse_params()?;
        if self.opts.typescript && self.eat(&TokenKind::Colon)? {
            self.skip_type()?;
        }
        let body = self.parse_function_body(is_async)?;
        Ok(ast::Function {
            name,
            params,
            body: ast::FunctionBody::Block(body),
            is_arrow: false,
            is_async,
            span: self.span_from(start),
        })
    }

    fn parse_function_body(&mut self, is_async: bool) -> PResult<Vec<ast::Stmt>> {
        let saved = self.ctx;
        self.ctx = Ctx { in_function: true, in_async: is_async, loop_depth: 0 };
        let body = self.parse_block_body();
        self.ctx = saved;
        body
    }

    fn parse_params(&mut self) -> PResult<Vec<ast::Param>> {
        self.expect(&TokenKind::LParen)?;
        let mut params: Vec<ast::Param> = Vec::new();
        let mut seen = HashSet::new();
        while !self.at(&TokenKind::RParen) {
            match self.look.value {
                TokenKind::Ellipsis => return self.error(self.look.span, "Rest parameters are not supported."),
                TokenKind::LBrace | TokenKind::LBracket => {
                    return self.error(self.look.span, "Destructuring patterns are not supported.");
                }
                _ => {}
            }
            let span = self.look.span;
            let name = self.expect_binding()?;
            if !seen.insert(name.clone()) {
                return self.error(span, format!("Duplicate identifier '{name}'."));
            }
            if self.opts.typescript {
                self.eat(&TokenKind::Question)?;
                if self.eat(&TokenKind::Colon)? {
                    self.skip_type()?;
                }
            }
            let default = if self.eat(&TokenKind::Eq)? { Some(self.parse_assign()?) } else { None };
            params.push(ast::Param { name, default });
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    /* ─────────── Utilitaires jetons ─────────── */

    fn bump(&mut self) -> PResult<Token<'a>> {
        let next = self.lx.next()?;
        let prev = std::mem::replace(&mut self.look, next);
        self.prev_end = prev.span.end.0;
        Ok(prev)
    }

    fn at(&self, kind: &TokenKind<'_>) -> bool { &self.look.value == kind }

    fn at_kw(&self, kw: Keyword) -> bool { matches!(self.look.value, TokenKind::Kw(k) if k == kw) }

    fn at_ident(&self, s: &str) -> bool { matches!(self.look.value, TokenKind::Ident(got) if got == s) }

    fn eat(&mut self, kind: &TokenKind<'_>) -> PResult<bool> {
        if self.at(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind<'_>) -> PResult<Token<'a>> {
        if self.at(kind) {
            return self.bump();
        }
        self.error(self.look.span, format!("{} expected.", kind.describe()))
    }

    fn expect_contextual(&mut self, word: &str) -> PResult<()> {
        if self.at_ident(word) {
            self.bump()?;
            return Ok(());
        }
        self.error(self.look.span, format!("'{word}' expected."))
    }

    /// Identifiant liable (pas un mot réservé).
    fn expect_binding(&mut self) -> PResult<String> {
        match self.look.value {
            TokenKind::Ident(s) => {
                self.bump()?;
                Ok(s.to_string())
            }
            TokenKind::Kw(k) => self.error(
                self.look.span,
                format!("Identifier expected. '{}' is a reserved word that cannot be used here.", k.as_str()),
            ),
            _ => self.error(self.look.span, "Identifier expected."),
        }
    }

    /// Nom de propriété après `.` ou dans `{ a as default }` (mots réservés admis).
    fn expect_property_name(&mut self) -> PResult<String> {
        let name = match self.look.value {
            TokenKind::Ident(s) => s.to_string(),
            TokenKind::Kw(k) => k.as_str().to_string(),
            _ => return self.error(self.look.span, "Identifier expected."),
        };
        self.bump()?;
        Ok(name)
    }

    /// Jeton suivant `look`, sans consommer (None si illisible).
    fn peek_next(&self) -> Option<Token<'a>> { self.lx.clone().next().ok() }

    fn next_is_function(&self) -> bool {
        self.peek_next()
            .is_some_and(|t| t.value == TokenKind::Kw(Keyword::Function) && !t.newline_before)
    }

    fn next_is_ident_on_same_line(&self) -> bool {
        self.peek_next()
            .is_some_and(|t| matches!(t.value, TokenKind::Ident(_)) && !t.newline_before)
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.look.value, TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof) || self.look.newline_before
    }

    /// Fin d’instruction : `;`, ou insertion automatique avant `}`, en fin de source
    /// ou après un saut de ligne.
    fn consume_semi(&mut self) -> PResult<()> {
        if self.eat(&TokenKind::Semi)? {
            return Ok(());
        }
        if matches!(self.look.value, TokenKind::RBrace | TokenKind::Eof) || self.look.newline_before {
            return Ok(());
        }
        self.error(self.look.span, "';' expected.")
    }

    fn parse_paren_expr(&mut self) -> PResult<ast::Expr> {
        self.expect(&TokenKind::LParen)?;
        let e = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        Ok(e)
    }

    fn snapshot(&self) -> Snapshot<'a> {
        Snapshot { lx: self.lx.clone(), look: self.look.clone(), prev_end: self.prev_end, ctx: self.ctx }
    }

    fn restore(&mut self, s: Snapshot<'a>) {
        self.lx = s.lx;
        self.look = s.look;
        self.prev_end = s.prev_end;
        self.ctx = s.ctx;
    }

    /// Exécute `f` un niveau d’imbrication plus bas.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return self.error(self.look.span, "Expression too deeply nested.");
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    /// Début du jeton courant.
    fn start(&self) -> u32 { self.look.span.start.0 }

    fn span_from(&self, start: u32) -> Span { Span::new(self.source, Pos(start), Pos(self.prev_end)) }

    fn error<T>(&self, span: Span, message: impl Into<String>) -> PResult<T> { Err(ParseError::new(span, message)) }
}

/* ─────────────────────────── Tests ─────────────────────────── */
