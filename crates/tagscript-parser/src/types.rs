//! Annotations de type : reconnues puis jetées.
//!
//! Seule la forme est vérifiée ; aucune vérification de typage n’est faite.

use tagscript_ast::Stmt;
use tagscript_lexer::{Keyword, TokenKind};

use crate::{PResult, Parser};

impl Parser<'_> {
    /// `A | B & C[]`
    pub(crate) fn skip_type(&mut self) -> PResult<()> {
        if matches!(self.look.value, TokenKind::Pipe | TokenKind::Amp) {
            self.bump()?;
        }
        self.skip_type_operand()?;
        while matches!(self.look.value, TokenKind::Pipe | TokenKind::Amp) {
            self.bump()?;
            self.skip_type_operand()?;
        }
        Ok(())
    }

    fn skip_type_operand(&mut self) -> PResult<()> {
        while self.at_ident("keyof") || self.at_ident("readonly") || self.at_ident("unique") {
            self.bump()?;
        }
        match self.look.value {
            TokenKind::Kw(Keyword::Typeof) => {
                self.bump()?;
                self.expect_property_name()?;
                while self.eat(&TokenKind::Dot)? {
                    self.expect_property_name()?;
                }
            }
            TokenKind::Ident(_)
            | TokenKind::Kw(Keyword::Null | Keyword::Void | Keyword::True | Keyword::False | Keyword::This) => {
                self.bump()?;
                while self.eat(&TokenKind::Dot)? {
                    self.expect_property_name()?;
                }
                if self.at(&TokenKind::Lt) {
                    self.skip_balanced(&TokenKind::Lt, &TokenKind::Gt)?;
                }
                // prédicat `x is T`
                if self.at_ident("is") && !self.look.newline_before {
                    self.bump()?;
                    self.nested(Self::skip_type_operand)?;
                }
            }
            TokenKind::Str(_) | TokenKind::Num(_) => {
                self.bump()?;
            }
            TokenKind::Minus => {
                self.bump()?;
                if !matches!(self.look.value, TokenKind::Num(_)) {
                    return self.error(self.look.span, "Type expected.");
                }
                self.bump()?;
            }
            TokenKind::LBrace => self.skip_balanced(&TokenKind::LBrace, &TokenKind::RBrace)?,
            TokenKind::LBracket => self.skip_balanced(&TokenKind::LBracket, &TokenKind::RBracket)?,
            // type parenthésé ou type fonction `(a: T) => R`
            TokenKind::LParen => {
                self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
                if self.eat(&TokenKind::FatArrow)? {
                    self.nested(Self::skip_type)?;
                }
            }
            // type fonction générique `<T>(a: T) => T`
            TokenKind::Lt => {
                self.skip_balanced(&TokenKind::Lt, &TokenKind::Gt)?;
                return self.nested(Self::skip_type_operand);
            }
            TokenKind::Kw(Keyword::New) => {
                self.bump()?;
                return self.nested(Self::skip_type_operand);
            }
            _ => return self.error(self.look.span, "Type expected."),
        }
        while self.at(&TokenKind::LBracket) && !self.look.newline_before {
            self.skip_balanced(&TokenKind::LBracket, &TokenKind::RBracket)?;
        }
        Ok(())
    }

    /// Saute un groupe équilibré `open … close` (le curseur est sur `open`).
    pub(crate) fn skip_balanced(&mut self, open: &TokenKind<'_>, close: &TokenKind<'_>) -> PResult<()> {
        self.expect(open)?;
        let mut depth = 1u32;
        while depth > 0 {
            if self.at(&TokenKind::Eof) {
                return self.error(self.look.span, format!("{} expected.", close.describe()));
            }
            if self.at(open) {
                depth += 1;
            } else if self.at(close) {
                depth -= 1;
            }
            self.bump()?;
        }
        Ok(())
    }

    /// `type X<T> = …;` ou `interface X<T> extends Y { … }`
    pub(crate) fn parse_type_decl(&mut self) -> PResult<Stmt> {
        let is_interface = self.at_ident("interface");
        self.bump()?;
        let name = self.expect_binding()?;
        if self.at(&TokenKind::Lt) {
            self.skip_balanced(&TokenKind::Lt, &TokenKind::Gt)?;
        }
        if is_interface {
            if self.at_ident("extends") {
                self.bump()?;
                loop {
                    self.skip_type_operand()?;
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
            }
            self.skip_balanced(&TokenKind::LBrace, &TokenKind::RBrace)?;
        } else {
            self.expect(&TokenKind::Eq)?;
            self.skip_type()?;
            self.consume_semi()?;
        }
        Ok(Stmt::TypeDecl { name })
    }
}
