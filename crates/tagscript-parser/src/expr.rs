//! Expressions : flèches (avec retour arrière), Pratt, unaires, appels, littéraux.

use std::rc::Rc;

use tagscript_ast::{self as ast, prec, Expr};
use tagscript_lexer::{Keyword, TokenKind};

use crate::{Ctx, PResult, Parser};

/// Opérateur binaire reconnu dans la boucle Pratt.
#[derive(Clone, Copy)]
enum Infix {
    Bin(ast::BinaryOp),
    Logic(ast::LogicalOp),
}

impl Infix {
    fn of(kind: &TokenKind<'_>) -> Option<Self> {
        use ast::BinaryOp as B;
        use ast::LogicalOp as L;
        Some(match kind {
            TokenKind::QuestionQuestion => Infix::Logic(L::Nullish),
            TokenKind::OrOr => Infix::Logic(L::Or),
            TokenKind::AndAnd => Infix::Logic(L::And),
            TokenKind::EqEq => Infix::Bin(B::Eq),
            TokenKind::Ne => Infix::Bin(B::Ne),
            TokenKind::EqEqEq => Infix::Bin(B::StrictEq),
            TokenKind::NeEq => Infix::Bin(B::StrictNe),
            TokenKind::Lt => Infix::Bin(B::Lt),
            TokenKind::Le => Infix::Bin(B::Le),
            TokenKind::Gt => Infix::Bin(B::Gt),
            TokenKind::Ge => Infix::Bin(B::Ge),
            TokenKind::Plus => Infix::Bin(B::Add),
            TokenKind::Minus => Infix::Bin(B::Sub),
            TokenKind::Star => Infix::Bin(B::Mul),
            TokenKind::Slash => Infix::Bin(B::Div),
            TokenKind::Percent => Infix::Bin(B::Mod),
            TokenKind::StarStar => Infix::Bin(B::Pow),
            _ => return None,
        })
    }

    fn precedence(self) -> u8 {
        match self {
            Infix::Bin(op) => op.precedence(),
            Infix::Logic(op) => op.precedence(),
        }
    }

    fn right_assoc(self) -> bool { matches!(self, Infix::Bin(ast::BinaryOp::Pow)) }
}

fn assign_op(kind: &TokenKind<'_>) -> Option<ast::AssignOp> {
    use ast::AssignOp as A;
    Some(match kind {
        TokenKind::Eq => A::Assign,
        TokenKind::PlusEq => A::Add,
        TokenKind::MinusEq => A::Sub,
        TokenKind::StarEq => A::Mul,
        TokenKind::SlashEq => A::Div,
        TokenKind::PercentEq => A::Mod,
        _ => return None,
    })
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> { self.parse_assign() }

    pub(crate) fn parse_assign(&mut self) -> PResult<Expr> { self.nested(Self::assignment) }

    fn assignment(&mut self) -> PResult<Expr> {
        if let Some(f) = self.try_arrow()? {
            return Ok(Expr::Function(Rc::new(f)));
        }
        let span = self.look.span;
        let left = self.parse_conditional()?;
        let Some(op) = assign_op(&self.look.value) else {
            return Ok(left);
        };
        if !left.is_assign_target() {
            return self.error(span, "The left-hand side of an assignment expression must be a variable or a property access.");
        }
        self.bump()?;
        let value = self.parse_assign()?;
        Ok(Expr::Assign { op, target: Box::new(left), value: Box::new(value) })
    }

    /* ─────────── Flèches ─────────── */

    fn try_arrow(&mut self) -> PResult<Option<ast::Function>> {
        let start = self.start();
        match self.look.value {
            TokenKind::Ident("async") => {
                let Some(next) = self.peek_next() else { return Ok(None) };
                if next.newline_before {
                    return Ok(None);
                }
                match next.value {
                    TokenKind::Ident(_) => {
                        let snap = self.snapshot();
                        self.bump()?;
                        let name = self.expect_binding()?;
                        if !self.at(&TokenKind::FatArrow) {
                            self.restore(snap);
                            return Ok(None);
                        }
                        self.parse_arrow_body(start, vec![ast::Param::named(name)], true).map(Some)
                    }
                    TokenKind::LParen => {
                        let snap = self.snapshot();
                        self.bump()?;
                        self.speculate_arrow(start, true, snap)
                    }
                    _ => Ok(None),
                }
            }
            TokenKind::Ident(name) => {
                let is_arrow = self
                    .peek_next()
                    .is_some_and(|t| t.value == TokenKind::FatArrow && !t.newline_before);
                if !is_arrow {
                    return Ok(None);
                }
                self.bump()?;
                self.parse_arrow_body(start, vec![ast::Param::named(name)], false).map(Some)
            }
            TokenKind::LParen => {
                let snap = self.snapshot();
                self.speculate_arrow(start, false, snap)
            }
            _ => Ok(None),
        }
    }

    /// Tente `(params) [: T] =>` ; restaure l’état et renvoie `None` en cas d’échec.
    fn speculate_arrow(&mut self, start: u32, is_async: bool, snap: crate::Snapshot<'a>) -> PResult<Option<ast::Function>> {
        let head = self.parse_params().and_then(|params| {
            if self.opts.typescript && self.at(&TokenKind::Colon) {
                self.bump()?;
                self.skip_type()?;
            }
            if self.at(&TokenKind::FatArrow) && !self.look.newline_before {
                Ok(params)
            } else {
                self.error(self.look.span, "'=>' expected.")
            }
        });
        match head {
            Ok(params) => self.parse_arrow_body(start, params, is_async).map(Some),
            Err(_) => {
                self.restore(snap);
                Ok(None)
            }
        }
    }

    fn parse_arrow_body(&mut self, start: u32, params: Vec<ast::Param>, is_async: bool) -> PResult<ast::Function> {
        self.expect(&TokenKind::FatArrow)?;
        let body = if self.at(&TokenKind::LBrace) {
            ast::FunctionBody::Block(self.parse_function_body(is_async)?)
        } else {
            let saved = self.ctx;
            self.ctx = Ctx { in_function: true, in_async: is_async, loop_depth: 0 };
            let e = self.parse_assign();
            self.ctx = saved;
            ast::FunctionBody::Expr(Box::new(e?))
        };
        Ok(ast::Function { name: None, params, body, is_arrow: true, is_async, span: self.span_from(start) })
    }

    /* ─────────── Pratt ─────────── */

    fn parse_conditional(&mut self) -> PResult<Expr> {
        let test = self.parse_binary(prec::OR)?;
        if !self.eat(&TokenKind::Question)? {
            return Ok(test);
        }
        let then = self.parse_assign()?;
        self.expect(&TokenKind::Colon)?;
        let otherwise = self.parse_assign()?;
        Ok(Expr::Cond { test: Box::new(test), then: Box::new(then), otherwise: Box::new(otherwise) })
    }

    fn parse_binary(&mut self, min: u8) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            if self.opts.typescript && self.at_ident("as") && !self.look.newline_before && prec::RELATIONAL >= min {
                self.bump()?;
                if !self.eat(&TokenKind::Kw(Keyword::Const))? {
                    self.skip_type()?;
                }
                left = Expr::TypeAssert(Box::new(left));
                continue;
            }
            if let TokenKind::Kw(kw @ (Keyword::In | Keyword::Instanceof)) = self.look.value {
                return self.error(self.look.span, format!("'{}' expressions are not supported.", kw.as_str()));
            }
            let Some(op) = Infix::of(&self.look.value) else { break };
            let p = op.precedence();
            if p < min {
                break;
            }
            self.bump()?;
            // seule l’associativité à droite (`**`) empile sans borne
            let right = if op.right_assoc() { self.nested(|s| s.parse_binary(p))? } else { self.parse_binary(p + 1)? };
            left = match op {
                Infix::Bin(op) => Expr::binary(op, left, right),
                Infix::Logic(op) => Expr::Logical { op, left: Box::new(left), right: Box::new(right) },
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        use ast::UnaryOp as U;
        let op = match self.look.value {
            TokenKind::Bang => Some(U::Not),
            TokenKind::Minus => Some(U::Neg),
            TokenKind::Plus => Some(U::Plus),
            TokenKind::Kw(Keyword::Typeof) => Some(U::Typeof),
            TokenKind::Kw(Keyword::Void) => Some(U::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let expr = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary { op, expr: Box::new(expr) });
        }
        match self.look.value {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.at(&TokenKind::PlusPlus) { ast::UpdateOp::Inc } else { ast::UpdateOp::Dec };
                self.bump()?;
                let span = self.look.span;
                let target = self.nested(Self::parse_unary)?;
                if !target.is_assign_target() {
                    return self.error(span, "The operand of an increment or decrement operator must be a variable or a property access.");
                }
                Ok(Expr::Update { op, prefix: true, target: Box::new(target) })
            }
            TokenKind::Kw(Keyword::Await) => {
                if !self.ctx.in_async {
                    return self.error(
                        self.look.span,
                        "'await' expressions are only allowed within async functions and at the top levels of modules.",
                    );
                }
                self.bump()?;
                let operand = self.nested(Self::parse_unary)?;
                Ok(Expr::Await(Box::new(operand)))
            }
            TokenKind::Kw(Keyword::Delete) => self.error(self.look.span, "'delete' expressions are not supported."),
            TokenKind::Lt if self.opts.typescript && !self.opts.markup => {
                self.error(self.look.span, "Angle-bracket type assertions are not supported.")
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let span = self.look.span;
        let e = self.parse_call_member()?;
        if matches!(self.look.value, TokenKind::PlusPlus | TokenKind::MinusMinus) && !self.look.newline_before {
            if !e.is_assign_target() {
                return self.error(span, "The operand of an increment or decrement operator must be a variable or a property access.");
            }
            let op = if self.at(&TokenKind::PlusPlus) { ast::UpdateOp::Inc } else { ast::UpdateOp::Dec };
            self.bump()?;
            return Ok(Expr::Update { op, prefix: false, target: Box::new(e) });
        }
        Ok(e)
    }

    fn parse_call_member(&mut self) -> PResult<Expr> {
        let mut e = if self.at_kw(Keyword::New) { self.parse_new()? } else { self.parse_primary()? };
        loop {
            match self.look.value {
                TokenKind::Dot | TokenKind::LBracket => e = self.parse_member_suffix(e)?,
                TokenKind::LParen => {
                    let args = self.parse_args()?;
                    e = Expr::call(e, args);
                }
                TokenKind::QuestionDot => return self.error(self.look.span, "Optional chaining is not supported."),
                TokenKind::Bang if self.opts.typescript && !self.look.newline_before => {
                    self.bump()?;
                    e = Expr::TypeAssert(Box::new(e));
                }
                _ => return Ok(e),
            }
        }
    }

    fn parse_member_suffix(&mut self, object: Expr) -> PResult<Expr> {
        if self.eat(&TokenKind::Dot)? {
            let name = self.expect_property_name()?;
            return Ok(Expr::member(object, name));
        }
        self.expect(&TokenKind::LBracket)?;
        let index = self.parse_expr()?;
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::index(object, index))
    }

    fn parse_new(&mut self) -> PResult<Expr> {
        self.bump()?;
        let mut callee = if self.at_kw(Keyword::New) { self.nested(Self::parse_new)? } else { self.parse_primary()? };
        while matches!(self.look.value, TokenKind::Dot | TokenKind::LBracket) {
            callee = self.parse_member_suffix(callee)?;
        }
        let args = if self.at(&TokenKind::LParen) { self.parse_args()? } else { Vec::new() };
        Ok(Expr::New { callee: Box::new(callee), args })
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.at(&TokenKind::RParen) {
            if self.at(&TokenKind::Ellipsis) {
                return self.error(self.look.span, "Spread elements are not supported.");
            }
            args.push(self.parse_assign()?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    /* ─────────── Primaires ─────────── */

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.look.span;
        match &self.look.value {
            TokenKind::Num(n) => {
                let n = *n;
                self.bump()?;
                Ok(Expr::Num(n))
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.bump()?;
                Ok(Expr::Str(s))
            }
            TokenKind::Kw(Keyword::True) => {
                self.bump()?;
                Ok(Expr::Bool(true))
            }
            TokenKind::Kw(Keyword::False) => {
                self.bump()?;
                Ok(Expr::Bool(false))
            }
            TokenKind::Kw(Keyword::Null) => {
                self.bump()?;
                Ok(Expr::Null)
            }
            TokenKind::Ident("async") if self.next_is_function() => {
                let start = self.start();
                self.bump()?;
                let f = self.parse_function_keyword(start, true, false)?;
                Ok(Expr::Function(Rc::new(f)))
            }
            TokenKind::Ident(name) => {
                let name = (*name).to_string();
                self.bump()?;
                Ok(Expr::Ident(name))
            }
            TokenKind::Kw(Keyword::Function) => {
                let start = self.start();
                let f = self.parse_function_keyword(start, false, false)?;
                Ok(Expr::Function(Rc::new(f)))
            }
            TokenKind::LParen => {
                self.bump()?;
                let e = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Lt if self.opts.markup => self.parse_markup(),
            TokenKind::Kw(Keyword::This) => self.error(span, "'this' is not supported."),
            TokenKind::Kw(Keyword::Class) => self.error(span, "Class expressions are not supported."),
            TokenKind::Kw(Keyword::Yield) => self.error(span, "Generators are not supported."),
            TokenKind::Kw(Keyword::Import) => self.error(span, "Dynamic imports are not supported."),
            TokenKind::Slash | TokenKind::SlashEq => self.error(span, "Regular expression literals are not supported."),
            _ => self.error(span, "Expression expected."),
        }
    }

    fn parse_array(&mut self) -> PResult<Expr> {
        self.expect(&TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.at(&TokenKind::RBracket) {
            match self.look.value {
                TokenKind::Comma => return self.error(self.look.span, "Array holes are not supported."),
                TokenKind::Ellipsis => return self.error(self.look.span, "Spread elements are not supported."),
                _ => {}
            }
            items.push(self.parse_assign()?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Array(items))
    }

    fn parse_object(&mut self) -> PResult<Expr> {
        self.expect(&TokenKind::LBrace)?;
        let mut props = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            props.push(self.parse_prop()?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Object(props))
    }

    fn parse_prop(&mut self) -> PResult<ast::Prop> {
        let start = self.start();
        match self.look.value {
            TokenKind::Ellipsis => return self.error(self.look.span, "Spread properties are not supported."),
            TokenKind::LBracket => return self.error(self.look.span, "Computed property names are not supported."),
            TokenKind::Star => return self.error(self.look.span, "Generators are not supported."),
            _ => {}
        }
        let mut is_async = false;
        if let TokenKind::Ident(word @ ("get" | "set" | "async")) = self.look.value {
            let modifies = self.peek_next().is_some_and(|t| {
                !t.newline_before
                    && matches!(t.value, TokenKind::Ident(_) | TokenKind::Kw(_) | TokenKind::Str(_) | TokenKind::Num(_))
            });
            if modifies && word == "async" {
                self.bump()?;
                is_async = true;
            } else if modifies {
                return self.error(self.look.span, "Accessors are not supported.");
            }
        }

        let key_span = self.look.span;
        let key = match &self.look.value {
            TokenKind::Ident(s) => ast::PropKey::Ident((*s).to_string()),
            TokenKind::Kw(k) => ast::PropKey::Ident(k.as_str().to_string()),
            TokenKind::Str(s) => ast::PropKey::Str(s.clone()),
            TokenKind::Num(n) => ast::PropKey::Num(*n),
            _ => return self.error(key_span, "Property assignment expected."),
        };
        let shorthand_ok = matches!(self.look.value, TokenKind::Ident(_));
        self.bump()?;

        match self.look.value {
            TokenKind::Colon if !is_async => {
                self.bump()?;
                let value = self.parse_assign()?;
                Ok(ast::Prop { key, value, kind: ast::PropKind::Init })
            }
            TokenKind::LParen | TokenKind::Lt => {
                let f = self.parse_function_rest(start, is_async, Some(key.name()))?;
                Ok(ast::Prop { key, value: Expr::Function(Rc::new(f)), kind: ast::PropKind::Method })
            }
            TokenKind::Comma | TokenKind::RBrace if shorthand_ok && !is_async => {
                let value = Expr::Ident(key.name());
                Ok(ast::Prop { key, value, kind: ast::PropKind::Shorthand })
            }
            TokenKind::Comma | TokenKind::RBrace => self.error(key_span, "Identifier expected."),
            TokenKind::Eq => self.error(self.look.span, "Shorthand property initializers are not supported."),
            _ => self.error(self.look.span, "':' expected."),
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use crate::tests::{parse_err, parse_ok};
    use pretty_assertions::assert_eq;
    use tagscript_ast::{self as ast, BinaryOp, Expr, FunctionBody, LogicalOp, PropKind, Stmt};

    fn expr(src: &str) -> Expr {
        let p = parse_ok(src);
        match p.body.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expression statement expected, got {other:?}"),
        }
    }

    #[test]
    fn precedence_climbing() {
        let e = expr("1 + 2 * 3 === 7 && a || b ?? c");
        let Expr::Logical { op: LogicalOp::Nullish, left, .. } = e else { panic!() };
        let Expr::Logical { op: LogicalOp::Or, left, .. } = *left else { panic!() };
        let Expr::Logical { op: LogicalOp::And, left, .. } = *left else { panic!() };
        let Expr::Binary { op: BinaryOp::StrictEq, left, .. } = *left else { panic!() };
        let Expr::Binary { op: BinaryOp::Add, right, .. } = *left else { panic!() };
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn exponent_is_right_associative() {
        let e = expr("2 ** 3 ** 2");
        let Expr::Binary { op: BinaryOp::Pow, left, right } = e else { panic!() };
        assert_eq!(*left, Expr::Num(2.0));
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn arrows_with_backtracking() {
        let e = expr("(a, b = 2) => a + b");
        let Expr::Function(f) = e else { panic!() };
        assert!(f.is_arrow);
        assert_eq!(f.params.len(), 2);
        assert!(f.params[1].default.is_some());

        // parenthèses ordinaires
        assert!(matches!(expr("(a + b) * c"), Expr::Binary { op: BinaryOp::Mul, .. }));
        // conditionnelle dont la branche vraie est parenthésée
        assert!(matches!(expr("x ? (y) : z"), Expr::Cond { .. }));

        let Expr::Function(f) = expr("async x => await x") else { panic!() };
        assert!(f.is_async);
        assert!(matches!(&f.body, FunctionBody::Expr(b) if matches!(**b, Expr::Await(_))));

        let Expr::Function(f) = expr("async () => { return 1 }") else { panic!() };
        assert!(f.is_async && f.params.is_empty());
    }

    #[test]
    fn arrow_span_covers_source() {
        let src = "const f = (x: number): number => x * 2";
        let p = parse_ok(src);
        let Stmt::Var { decls, .. } = &p.body[0] else { panic!() };
        let Some(Expr::Function(f)) = &decls[0].init else { panic!() };
        assert_eq!(f.span.slice(src), Some("(x: number): number => x * 2"));
    }

    #[test]
    fn calls_members_new() {
        let e = expr("new Error('x').message.length");
        let Expr::Member { object, .. } = e else { panic!() };
        let Expr::Member { object, .. } = *object else { panic!() };
        assert!(matches!(*object, Expr::New { ref args, .. } if args.len() == 1));

        let e = expr("a.b[c](1, 2,)(3)");
        let Expr::Call { callee, args } = e else { panic!() };
        assert_eq!(args, vec![Expr::Num(3.0)]);
        assert!(matches!(*callee, Expr::Call { ref args, .. } if args.len() == 2));

        assert_eq!(expr("exports.default = 1"), Expr::assign(Expr::member(Expr::ident("exports"), "default"), Expr::Num(1.0)));
    }

    #[test]
    fn object_literals() {
        let Expr::Object(props) = expr("({ a: 1, 'b-c': 2, 3: x, d, e() { return 1 }, async f() {}, default: 0 })") else {
            panic!()
        };
        assert_eq!(props.len(), 7);
        assert_eq!(props[1].key, ast::PropKey::Str("b-c".into()));
        assert_eq!(props[3].kind, PropKind::Shorthand);
        assert_eq!(props[3].value, Expr::ident("d"));
        assert_eq!(props[4].kind, PropKind::Method);
        assert!(matches!(&props[5].value, Expr::Function(f) if f.is_async && f.name.as_deref() == Some("f")));
        assert_eq!(props[6].key, ast::PropKey::Ident("default".into()));
    }

    #[test]
    fn method_span_starts_at_key() {
        let src = "x = { hello(n) { return n } }";
        let Expr::Assign { value, .. } = expr(src) else { panic!() };
        let Expr::Object(props) = *value else { panic!() };
        let Expr::Function(f) = &props[0].value else { panic!() };
        assert_eq!(f.span.slice(src), Some("hello(n) { return n }"));
    }

    #[test]
    fn updates_and_unary() {
        assert!(matches!(expr("i++"), Expr::Update { prefix: false, .. }));
        assert!(matches!(expr("--i"), Expr::Update { prefix: true, .. }));
        assert!(matches!(expr("typeof x === 'string'"), Expr::Binary { op: BinaryOp::StrictEq, .. }));
        assert!(matches!(expr("!-x"), Expr::Unary { op: ast::UnaryOp::Not, .. }));
    }

    #[test]
    fn type_assertions_are_wrapped() {
        assert!(matches!(expr("x as number"), Expr::TypeAssert(_)));
        assert!(matches!(expr("x!.y"), Expr::Member { .. }));
        assert!(matches!(expr("[1] as const"), Expr::TypeAssert(_)));
    }

    #[test]
    fn invalid_targets_and_unsupported() {
        assert_eq!(
            parse_err("1 = 2").message,
            "The left-hand side of an assignment expression must be a variable or a property access."
        );
        assert_eq!(
            parse_err("1++").message,
            "The operand of an increment or decrement operator must be a variable or a property access."
        );
        assert_eq!(
            parse_err("function f() { await x }").message,
            "'await' expressions are only allowed within async functions and at the top levels of modules."
        );
        assert_eq!(parse_err("a?.b").message, "Optional chaining is not supported.");
        assert_eq!(parse_err("[1, , 2]").message, "Array holes are not supported.");
        assert_eq!(parse_err("f(...a)").message, "Spread elements are not supported.");
        assert_eq!(parse_err("x = this").message, "'this' is not supported.");
        assert_eq!(parse_err("'a' in o").message, "'in' expressions are not supported.");
        assert_eq!(parse_err("({ get a() {} })").message, "Accessors are not supported.");
        assert_eq!(parse_err("x = /re/").message, "Regular expression literals are not supported.");
        assert_eq!(parse_err("let x = ;").message, "Expression expected.");
    }
}
