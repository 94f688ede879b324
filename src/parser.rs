//! Recursive-descent parser for the supported Java subset.
//!
//! Consumes the token vector produced by [`crate::lexer::Lexer`] and builds a
//! [`CompilationUnit`]. Binary expressions use precedence climbing over a
//! fixed operator table; the handful of ambiguous spots (declaration vs.
//! expression statement, for-each vs. C-style `for`, cast vs. parenthesized
//! expression) are resolved with bounded lookahead. The first unexpected
//! token aborts the parse.

use crate::ast::*;
use crate::error::TranspileError;
use crate::lexer::{SpannedToken, Token};

enum BinaryKind {
    Arith(BinOp),
    Cmp(CompareOp),
    And,
    Or,
    Instanceof,
}

/// Binding strength for each binary operator, highest binds tightest.
/// All levels are left-associative.
fn binary_op(token: &Token) -> Option<(u8, BinaryKind)> {
    let entry = match token {
        Token::Star => (60, BinaryKind::Arith(BinOp::Mul)),
        Token::Slash => (60, BinaryKind::Arith(BinOp::Div)),
        Token::Percent => (60, BinaryKind::Arith(BinOp::Rem)),
        Token::Plus => (50, BinaryKind::Arith(BinOp::Add)),
        Token::Minus => (50, BinaryKind::Arith(BinOp::Sub)),
        Token::LtLt => (45, BinaryKind::Arith(BinOp::Shl)),
        Token::GtGt => (45, BinaryKind::Arith(BinOp::Shr)),
        Token::GtGtGt => (45, BinaryKind::Arith(BinOp::Ushr)),
        Token::Lt => (40, BinaryKind::Cmp(CompareOp::Lt)),
        Token::LtEq => (40, BinaryKind::Cmp(CompareOp::Le)),
        Token::Gt => (40, BinaryKind::Cmp(CompareOp::Gt)),
        Token::GtEq => (40, BinaryKind::Cmp(CompareOp::Ge)),
        Token::Instanceof => (40, BinaryKind::Instanceof),
        Token::EqEq => (30, BinaryKind::Cmp(CompareOp::Eq)),
        Token::BangEq => (30, BinaryKind::Cmp(CompareOp::Ne)),
        Token::Amp => (26, BinaryKind::Arith(BinOp::BitAnd)),
        Token::Caret => (24, BinaryKind::Arith(BinOp::BitXor)),
        Token::Pipe => (22, BinaryKind::Arith(BinOp::BitOr)),
        Token::AmpAmp => (20, BinaryKind::And),
        Token::PipePipe => (10, BinaryKind::Or),
        _ => return None,
    };
    Some(entry)
}

fn is_primitive_token(token: &Token) -> bool {
    matches!(
        token,
        Token::KwInt
            | Token::KwLong
            | Token::KwShort
            | Token::KwByte
            | Token::KwFloat
            | Token::KwDouble
            | Token::KwBoolean
            | Token::KwChar
    )
}

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        let mut tokens = tokens;
        if tokens.is_empty() {
            tokens.push(SpannedToken {
                token: Token::Eof,
                line: 1,
                column: 1,
            });
        }
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    /// Lookahead without consuming; indexes past the end clamp to `Eof`.
    fn token_at(&self, i: usize) -> &Token {
        &self.tokens[i.min(self.tokens.len() - 1)].token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), TranspileError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("'{}'", expected.text())))
        }
    }

    fn error(&self, expected: impl Into<String>) -> TranspileError {
        let span = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        TranspileError::Parse {
            found: span.token.text(),
            expected: expected.into(),
            line: span.line,
            column: span.column,
            token_index: self.pos,
        }
    }

    fn expect_ident(&mut self) -> Result<String, TranspileError> {
        if let Token::Ident(name) = self.peek().clone() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error("an identifier"))
        }
    }

    // --- Top level ---

    /// Parse a whole source file: zero or more class declarations.
    pub fn parse(&mut self) -> Result<CompilationUnit, TranspileError> {
        let mut classes = Vec::new();
        while !self.at(&Token::Eof) {
            classes.push(self.parse_class_declaration()?);
        }
        Ok(CompilationUnit { classes })
    }

    /// Parse a bare statement list running to end of input. Entry point for
    /// translating snippets that are not wrapped in a class.
    pub fn parse_statements(&mut self) -> Result<Vec<Stmt>, TranspileError> {
        let mut stmts = Vec::new();
        while !self.at(&Token::Eof) {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            match self.peek() {
                Token::Public => modifiers.visibility = Visibility::Public,
                Token::Private => modifiers.visibility = Visibility::Private,
                Token::Protected => modifiers.visibility = Visibility::Protected,
                Token::Static => modifiers.is_static = true,
                Token::Final => modifiers.is_final = true,
                Token::Abstract => modifiers.is_abstract = true,
                _ => break,
            }
            self.advance();
        }
        modifiers
    }

    fn parse_class_declaration(&mut self) -> Result<ClassDecl, TranspileError> {
        let modifiers = self.parse_modifiers();
        self.expect(&Token::Class)?;
        let name = self.expect_ident()?;
        let extends = if self.at(&Token::Extends) {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(&Token::LBrace)?;
        let mut members = Vec::new();
        while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
            self.parse_member(&name, &mut members)?;
        }
        self.expect(&Token::RBrace)?;
        Ok(ClassDecl {
            modifiers,
            name,
            extends,
            members,
        })
    }

    /// Parse one class member. A multi-declarator field contributes several
    /// `Member::Field` entries, hence the out-parameter.
    fn parse_member(
        &mut self,
        class_name: &str,
        members: &mut Vec<Member>,
    ) -> Result<(), TranspileError> {
        let modifiers = self.parse_modifiers();

        // Constructor: the class name itself directly followed by '('.
        // No return type is present; detection is purely by name.
        if let Token::Ident(name) = self.peek() {
            if name == class_name && *self.token_at(self.pos + 1) == Token::LParen {
                let name = self.expect_ident()?;
                let params = self.parse_param_list()?;
                let body = self.parse_brace_block()?;
                members.push(Member::Constructor(ConstructorDecl { name, params, body }));
                return Ok(());
            }
        }

        let ty = self.parse_type_name()?;
        let mut name = self.expect_ident()?;

        if self.at(&Token::LParen) {
            let params = self.parse_param_list()?;
            let body = self.parse_brace_block()?;
            members.push(Member::Method(MethodDecl {
                modifiers,
                return_type: ty,
                name,
                params,
                body,
            }));
            return Ok(());
        }

        // Field, possibly with further declarators: `int a = 1, b, c = 3;`
        loop {
            let init = if self.at(&Token::Eq) {
                self.advance();
                Some(self.parse_initializer()?)
            } else {
                None
            };
            members.push(Member::Field(FieldDecl {
                modifiers: modifiers.clone(),
                ty: ty.clone(),
                name,
                init,
            }));
            if self.at(&Token::Comma) {
                self.advance();
                name = self.expect_ident()?;
            } else {
                break;
            }
        }
        self.expect(&Token::Semicolon)?;
        Ok(())
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, TranspileError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                let ty = self.parse_type_name()?;
                let name = self.expect_ident()?;
                params.push(Param { ty, name });
                if self.at(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(params)
    }

    fn parse_brace_block(&mut self) -> Result<Vec<Stmt>, TranspileError> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(stmts)
    }

    // --- Types ---

    /// Scan the shape of a type starting at token index `i` without
    /// consuming: identifier or primitive keyword, optional generic argument
    /// list, optional `[]` repetitions. Returns the index just past the type,
    /// or `None` when the tokens cannot spell a type.
    fn scan_type_shape(&self, mut i: usize) -> Option<usize> {
        match self.token_at(i) {
            t if is_primitive_token(t) => i += 1,
            Token::Ident(_) => {
                i += 1;
                if *self.token_at(i) == Token::Lt {
                    i += 1;
                    let mut depth: i32 = 1;
                    while depth > 0 {
                        match self.token_at(i) {
                            Token::Lt => depth += 1,
                            Token::Gt => depth -= 1,
                            Token::GtGt => depth -= 2,
                            Token::GtGtGt => depth -= 3,
                            Token::Ident(_) | Token::Comma => {}
                            Token::LBracket | Token::RBracket => {}
                            t if is_primitive_token(t) => {}
                            _ => return None,
                        }
                        i += 1;
                    }
                    if depth < 0 {
                        return None;
                    }
                }
            }
            _ => return None,
        }
        while *self.token_at(i) == Token::LBracket && *self.token_at(i + 1) == Token::RBracket {
            i += 2;
        }
        Some(i)
    }

    /// Declaration vs. expression statement: commit to a declaration when a
    /// type shape is followed by an identifier and then `=`, `,` or `;`.
    fn is_local_decl_start(&self) -> bool {
        match self.scan_type_shape(self.pos) {
            Some(i) => {
                matches!(self.token_at(i), Token::Ident(_))
                    && matches!(
                        self.token_at(i + 1),
                        Token::Eq | Token::Comma | Token::Semicolon
                    )
            }
            None => false,
        }
    }

    /// After `for (`: `Type name :` means for-each.
    fn is_foreach_header(&self) -> bool {
        match self.scan_type_shape(self.pos) {
            Some(i) => {
                matches!(self.token_at(i), Token::Ident(_))
                    && *self.token_at(i + 1) == Token::Colon
            }
            None => false,
        }
    }

    fn is_for_init_decl(&self) -> bool {
        is_primitive_token(self.peek())
            || (matches!(self.peek(), Token::Ident(_)) && self.is_local_decl_start())
    }

    fn parse_type_name(&mut self) -> Result<TypeName, TranspileError> {
        let base = match self.peek() {
            Token::KwInt => { self.advance(); TypeName::Primitive(PrimitiveKind::Int) }
            Token::KwLong => { self.advance(); TypeName::Primitive(PrimitiveKind::Long) }
            Token::KwShort => { self.advance(); TypeName::Primitive(PrimitiveKind::Short) }
            Token::KwByte => { self.advance(); TypeName::Primitive(PrimitiveKind::Byte) }
            Token::KwFloat => { self.advance(); TypeName::Primitive(PrimitiveKind::Float) }
            Token::KwDouble => { self.advance(); TypeName::Primitive(PrimitiveKind::Double) }
            Token::KwBoolean => { self.advance(); TypeName::Primitive(PrimitiveKind::Boolean) }
            Token::KwChar => { self.advance(); TypeName::Primitive(PrimitiveKind::Char) }
            Token::KwVoid => { self.advance(); TypeName::Primitive(PrimitiveKind::Void) }
            Token::Ident(_) => {
                let name = self.expect_ident()?;
                let args = if self.at(&Token::Lt) {
                    self.parse_type_args()?
                } else {
                    Vec::new()
                };
                TypeName::Class { name, args }
            }
            _ => return Err(self.error("a type name")),
        };

        let mut ty = base;
        while self.at(&Token::LBracket) && *self.token_at(self.pos + 1) == Token::RBracket {
            self.advance();
            self.advance();
            ty = TypeName::Array(Box::new(ty));
        }
        Ok(ty)
    }

    /// Parse `<Type, Type, ...>` generic arguments, including the empty
    /// diamond `<>`.
    fn parse_type_args(&mut self) -> Result<Vec<TypeName>, TranspileError> {
        self.expect(&Token::Lt)?;
        let mut args = Vec::new();
        if self.at(&Token::Gt) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_type_name()?);
            if self.at(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_close_angle()?;
        Ok(args)
    }

    /// Consume one level of closing `>`. Nested generics end on `>>` (or
    /// `>>>`), which the lexer folded into shift tokens; split off a single
    /// `>` in place and leave the remainder for the enclosing level.
    fn expect_close_angle(&mut self) -> Result<(), TranspileError> {
        match self.peek() {
            Token::Gt => {
                self.advance();
                Ok(())
            }
            Token::GtGt => {
                self.tokens[self.pos].token = Token::Gt;
                Ok(())
            }
            Token::GtGtGt => {
                self.tokens[self.pos].token = Token::GtGt;
                Ok(())
            }
            _ => Err(self.error("'>'")),
        }
    }

    // --- Statements ---

    fn parse_statement(&mut self) -> Result<Stmt, TranspileError> {
        match self.peek() {
            Token::LBrace => {
                let stmts = self.parse_brace_block()?;
                Ok(Stmt::Block(stmts))
            }
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_while(),
            Token::For => self.parse_for(),
            Token::Switch => self.parse_switch(),
            Token::Try => self.parse_try(),
            Token::Return => self.parse_return(),
            Token::Throw => self.parse_throw(),
            Token::Break => {
                self.advance();
                self.expect(&Token::Semicolon)?;
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.advance();
                self.expect(&Token::Semicolon)?;
                Ok(Stmt::Continue)
            }
            t if is_primitive_token(t) => self.parse_local_decl(),
            Token::Ident(_) if self.is_local_decl_start() => self.parse_local_decl(),
            _ => self.parse_expr_statement(),
        }
    }

    /// `Type a = e1, b, c = e3;` — a lone declarator stays a single
    /// statement, several become a block of independent declarations.
    fn parse_local_decl(&mut self) -> Result<Stmt, TranspileError> {
        let ty = self.parse_type_name()?;
        let mut decls = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let init = if self.at(&Token::Eq) {
                self.advance();
                Some(self.parse_initializer()?)
            } else {
                None
            };
            decls.push(Stmt::LocalDecl {
                ty: ty.clone(),
                name,
                init,
            });
            if self.at(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::Semicolon)?;
        if decls.len() == 1 {
            Ok(decls.remove(0))
        } else {
            Ok(Stmt::Block(decls))
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        let then_body = self.parse_block_or_single()?;
        let else_body = if self.at(&Token::Else) {
            self.advance();
            Some(self.parse_block_or_single()?)
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::While)?;
        self.expect(&Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        let body = self.parse_block_or_single()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::Do)?;
        let body = self.parse_block_or_single()?;
        self.expect(&Token::While)?;
        self.expect(&Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::DoWhile { body, condition })
    }

    fn parse_for(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::For)?;
        self.expect(&Token::LParen)?;

        // for (Type name : iterable)
        if self.is_foreach_header() {
            let ty = self.parse_type_name()?;
            let name = self.expect_ident()?;
            self.expect(&Token::Colon)?;
            let iterable = self.parse_expression()?;
            self.expect(&Token::RParen)?;
            let body = self.parse_block_or_single()?;
            return Ok(Stmt::ForEach {
                var: Param { ty, name },
                iterable,
                body,
            });
        }

        // C-style: for (init; condition; update)
        let init = if self.at(&Token::Semicolon) {
            self.advance();
            None
        } else {
            let stmt = if self.is_for_init_decl() {
                let ty = self.parse_type_name()?;
                let name = self.expect_ident()?;
                let init = if self.at(&Token::Eq) {
                    self.advance();
                    Some(self.parse_initializer()?)
                } else {
                    None
                };
                Stmt::LocalDecl { ty, name, init }
            } else {
                Stmt::ExprStmt(self.parse_expression()?)
            };
            self.expect(&Token::Semicolon)?;
            Some(Box::new(stmt))
        };

        let condition = if self.at(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semicolon)?;

        let update = if self.at(&Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::RParen)?;

        let body = self.parse_block_or_single()?;
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::Switch)?;
        self.expect(&Token::LParen)?;
        let scrutinee = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::LBrace)?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        let mut default_body: Option<Vec<Stmt>> = None;
        // Consecutive case labels before a body share that body
        let mut pending_labels: Vec<Expr> = Vec::new();

        while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
            if self.at(&Token::Case) {
                self.advance();
                let label = self.parse_expression()?;
                self.expect(&Token::Colon)?;
                pending_labels.push(label);
            } else if self.at(&Token::Default) {
                self.advance();
                self.expect(&Token::Colon)?;
                if !pending_labels.is_empty() {
                    cases.push(SwitchCase {
                        labels: std::mem::take(&mut pending_labels),
                        body: Vec::new(),
                    });
                }
                default_body = Some(self.parse_case_body()?);
            } else {
                let body = self.parse_case_body()?;
                if pending_labels.is_empty() {
                    return Err(self.error("'case' or 'default'"));
                }
                cases.push(SwitchCase {
                    labels: std::mem::take(&mut pending_labels),
                    body,
                });
            }
        }
        if !pending_labels.is_empty() {
            cases.push(SwitchCase {
                labels: pending_labels,
                body: Vec::new(),
            });
        }
        self.expect(&Token::RBrace)?;
        Ok(Stmt::Switch {
            scrutinee,
            cases,
            default_body,
        })
    }

    fn parse_case_body(&mut self) -> Result<Vec<Stmt>, TranspileError> {
        let mut body = Vec::new();
        while !self.at(&Token::RBrace)
            && !self.at(&Token::Case)
            && !self.at(&Token::Default)
            && !self.at(&Token::Eof)
        {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_try(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::Try)?;
        let body = self.parse_block_or_single()?;

        let mut catches = Vec::new();
        let mut finally_body = None;

        while self.at(&Token::Catch) {
            self.advance();
            self.expect(&Token::LParen)?;
            let mut exception_types = vec![self.parse_type_name()?];
            while self.at(&Token::Pipe) {
                self.advance();
                exception_types.push(self.parse_type_name()?);
            }
            let var_name = self.expect_ident()?;
            self.expect(&Token::RParen)?;
            let catch_body = self.parse_block_or_single()?;
            catches.push(CatchClause {
                exception_types,
                var_name,
                body: catch_body,
            });
        }

        if self.at(&Token::Finally) {
            self.advance();
            finally_body = Some(self.parse_block_or_single()?);
        }

        if catches.is_empty() && finally_body.is_none() {
            return Err(self.error("'catch' or 'finally'"));
        }

        Ok(Stmt::Try {
            body,
            catches,
            finally_body,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::Return)?;
        if self.at(&Token::Semicolon) {
            self.advance();
            Ok(Stmt::Return(None))
        } else {
            let expr = self.parse_expression()?;
            self.expect(&Token::Semicolon)?;
            Ok(Stmt::Return(Some(expr)))
        }
    }

    fn parse_throw(&mut self) -> Result<Stmt, TranspileError> {
        self.expect(&Token::Throw)?;
        let expr = self.parse_expression()?;
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::Throw(expr))
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt, TranspileError> {
        let expr = self.parse_expression()?;
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::ExprStmt(expr))
    }

    fn parse_block_or_single(&mut self) -> Result<Vec<Stmt>, TranspileError> {
        if self.at(&Token::LBrace) {
            self.parse_brace_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    // --- Expressions ---

    fn parse_expression(&mut self) -> Result<Expr, TranspileError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, TranspileError> {
        let expr = self.parse_ternary()?;
        let op = match self.peek() {
            Token::Eq => None,
            Token::PlusEq => Some(BinOp::Add),
            Token::MinusEq => Some(BinOp::Sub),
            Token::StarEq => Some(BinOp::Mul),
            Token::SlashEq => Some(BinOp::Div),
            Token::PercentEq => Some(BinOp::Rem),
            Token::AmpEq => Some(BinOp::BitAnd),
            Token::PipeEq => Some(BinOp::BitOr),
            Token::CaretEq => Some(BinOp::BitXor),
            Token::LtLtEq => Some(BinOp::Shl),
            Token::GtGtEq => Some(BinOp::Shr),
            Token::GtGtGtEq => Some(BinOp::Ushr),
            _ => return Ok(expr),
        };
        self.advance();
        // Assignment is right-associative
        let value = self.parse_assignment()?;
        Ok(match op {
            None => Expr::Assign {
                target: Box::new(expr),
                value: Box::new(value),
            },
            Some(op) => Expr::CompoundAssign {
                op,
                target: Box::new(expr),
                value: Box::new(value),
            },
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr, TranspileError> {
        let expr = self.parse_binary(0)?;
        if self.at(&Token::Question) {
            self.advance();
            let then_expr = self.parse_expression()?;
            self.expect(&Token::Colon)?;
            let else_expr = self.parse_ternary()?;
            Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            })
        } else {
            Ok(expr)
        }
    }

    /// Precedence climbing over the binary operator table.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, TranspileError> {
        let mut left = self.parse_unary()?;
        loop {
            let (prec, kind) = match binary_op(self.peek()) {
                Some(entry) if entry.0 >= min_prec => entry,
                _ => break,
            };
            self.advance();
            left = match kind {
                BinaryKind::Instanceof => {
                    let ty = self.parse_type_name()?;
                    Expr::Instanceof {
                        operand: Box::new(left),
                        ty,
                    }
                }
                BinaryKind::Arith(op) => {
                    let right = self.parse_binary(prec + 1)?;
                    Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
                BinaryKind::Cmp(op) => {
                    let right = self.parse_binary(prec + 1)?;
                    Expr::Comparison {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
                BinaryKind::And => {
                    let right = self.parse_binary(prec + 1)?;
                    Expr::LogicalAnd(Box::new(left), Box::new(right))
                }
                BinaryKind::Or => {
                    let right = self.parse_binary(prec + 1)?;
                    Expr::LogicalOr(Box::new(left), Box::new(right))
                }
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, TranspileError> {
        match self.peek() {
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            Token::Minus => {
                self.advance();
                // Fold negative literals directly
                match self.peek().clone() {
                    Token::IntLiteral(v) => {
                        self.advance();
                        Ok(Expr::IntLiteral(-v))
                    }
                    Token::LongLiteral(v) => {
                        self.advance();
                        Ok(Expr::LongLiteral(-v))
                    }
                    Token::FloatLiteral(v) => {
                        self.advance();
                        Ok(Expr::FloatLiteral(-v))
                    }
                    Token::DoubleLiteral(v) => {
                        self.advance();
                        Ok(Expr::DoubleLiteral(-v))
                    }
                    _ => {
                        let operand = self.parse_unary()?;
                        Ok(Expr::Unary {
                            op: UnaryOp::Neg,
                            operand: Box::new(operand),
                        })
                    }
                }
            }
            Token::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::LogicalNot(Box::new(operand)))
            }
            Token::Tilde => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::BitNot,
                    operand: Box::new(operand),
                })
            }
            Token::PlusPlus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::PreIncrement(Box::new(operand)))
            }
            Token::MinusMinus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::PreDecrement(Box::new(operand)))
            }
            Token::LParen => {
                if self.is_cast() {
                    self.advance(); // (
                    let ty = self.parse_type_name()?;
                    self.expect(&Token::RParen)?;
                    let operand = self.parse_unary()?;
                    Ok(Expr::Cast {
                        ty,
                        operand: Box::new(operand),
                    })
                } else {
                    self.parse_postfix()
                }
            }
            _ => self.parse_postfix(),
        }
    }

    /// Distinguish `(Type) expr` from `(expr)`. Primitive casts are
    /// unambiguous; class casts use the capitalized-name heuristic.
    fn is_cast(&self) -> bool {
        let start = self.pos + 1;
        if is_primitive_token(self.token_at(start)) {
            return self
                .scan_type_shape(start)
                .is_some_and(|i| *self.token_at(i) == Token::RParen);
        }
        if let Token::Ident(name) = self.token_at(start) {
            if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                return self
                    .scan_type_shape(start)
                    .is_some_and(|i| *self.token_at(i) == Token::RParen);
            }
        }
        false
    }

    fn parse_postfix(&mut self) -> Result<Expr, TranspileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    if self.at(&Token::LParen) {
                        let args = self.parse_args()?;
                        expr = Expr::MethodCall {
                            object: Some(Box::new(expr)),
                            name,
                            args,
                        };
                    } else {
                        expr = Expr::FieldAccess {
                            object: Box::new(expr),
                            name,
                        };
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Token::PlusPlus => {
                    self.advance();
                    expr = Expr::PostIncrement(Box::new(expr));
                }
                Token::MinusMinus => {
                    self.advance();
                    expr = Expr::PostDecrement(Box::new(expr));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, TranspileError> {
        match self.peek().clone() {
            Token::IntLiteral(v) => {
                self.advance();
                Ok(Expr::IntLiteral(v))
            }
            Token::LongLiteral(v) => {
                self.advance();
                Ok(Expr::LongLiteral(v))
            }
            Token::FloatLiteral(v) => {
                self.advance();
                Ok(Expr::FloatLiteral(v))
            }
            Token::DoubleLiteral(v) => {
                self.advance();
                Ok(Expr::DoubleLiteral(v))
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Expr::StringLiteral(s))
            }
            Token::CharLiteral(c) => {
                self.advance();
                Ok(Expr::CharLiteral(c))
            }
            Token::True => {
                self.advance();
                Ok(Expr::BoolLiteral(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::BoolLiteral(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::NullLiteral)
            }
            Token::This => {
                self.advance();
                if self.at(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::ThisCall(args))
                } else {
                    Ok(Expr::This)
                }
            }
            Token::Super => {
                self.advance();
                if self.at(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::SuperCall(args))
                } else {
                    Ok(Expr::Super)
                }
            }
            Token::New => {
                self.advance();
                let ty = self.parse_type_name()?;
                if self.at(&Token::LBracket) {
                    if *self.token_at(self.pos + 1) == Token::RBracket {
                        // new Type[] { e1, e2, ... }
                        self.advance();
                        self.advance();
                        match self.parse_initializer()? {
                            Expr::ArrayInit(elements) => Ok(Expr::NewArrayInit {
                                element_type: ty,
                                elements,
                            }),
                            _ => Err(self.error("'{'")),
                        }
                    } else {
                        // new Type[size]
                        self.advance();
                        let size = self.parse_expression()?;
                        self.expect(&Token::RBracket)?;
                        Ok(Expr::NewArray {
                            element_type: ty,
                            size: Box::new(size),
                        })
                    }
                } else if self.at(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::NewObject { ty, args })
                } else {
                    Err(self.error("'(' or '['"))
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) => {
                self.advance();
                if self.at(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::MethodCall {
                        object: None,
                        name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            _ => Err(self.error("an expression")),
        }
    }

    /// An initializer is either an expression or a brace-enclosed element
    /// list (array initializer), which may nest.
    fn parse_initializer(&mut self) -> Result<Expr, TranspileError> {
        if self.at(&Token::LBrace) {
            self.advance();
            let mut elements = Vec::new();
            if !self.at(&Token::RBrace) {
                elements.push(self.parse_initializer()?);
                while self.at(&Token::Comma) {
                    self.advance();
                    elements.push(self.parse_initializer()?);
                }
            }
            self.expect(&Token::RBrace)?;
            Ok(Expr::ArrayInit(elements))
        } else {
            self.parse_expression()
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, TranspileError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            args.push(self.parse_expression()?);
            while self.at(&Token::Comma) {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_unit(src: &str) -> CompilationUnit {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_stmts(src: &str) -> Vec<Stmt> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse_statements().unwrap()
    }

    #[test]
    fn test_empty_class_with_extends() {
        let unit = parse_unit("public class A extends B {}");
        assert_eq!(unit.classes.len(), 1);
        let class = &unit.classes[0];
        assert_eq!(class.name, "A");
        assert_eq!(class.extends.as_deref(), Some("B"));
        assert!(class.members.is_empty());
        assert_eq!(class.modifiers.visibility, Visibility::Public);
    }

    #[test]
    fn test_constructor_vs_method() {
        let unit = parse_unit(
            "class Foo { Foo(int x) { this.x = x; } int get() { return x; } }",
        );
        let members = &unit.classes[0].members;
        assert!(matches!(members[0], Member::Constructor(_)));
        assert!(matches!(members[1], Member::Method(_)));
    }

    #[test]
    fn test_field_multi_declarator() {
        let unit = parse_unit("class K { int a = 1, b, c = 3; }");
        let members = &unit.classes[0].members;
        assert_eq!(members.len(), 3);
        match (&members[0], &members[1], &members[2]) {
            (Member::Field(a), Member::Field(b), Member::Field(c)) => {
                assert_eq!(a.name, "a");
                assert!(a.init.is_some());
                assert_eq!(b.name, "b");
                assert!(b.init.is_none());
                assert_eq!(c.name, "c");
                assert!(c.init.is_some());
            }
            other => panic!("unexpected members: {:?}", other),
        }
    }

    #[test]
    fn test_generic_field_type() {
        let unit = parse_unit("class K { Map<String, List<Integer>> index; }");
        match &unit.classes[0].members[0] {
            Member::Field(f) => {
                assert_eq!(f.ty.display_name(), "Map<String, List<Integer>>");
            }
            other => panic!("unexpected member: {:?}", other),
        }
    }

    #[test]
    fn test_local_decl() {
        let stmts = parse_stmts("int x = 10;");
        assert_eq!(
            stmts,
            vec![Stmt::LocalDecl {
                ty: TypeName::Primitive(PrimitiveKind::Int),
                name: "x".into(),
                init: Some(Expr::IntLiteral(10)),
            }]
        );
    }

    #[test]
    fn test_local_decl_vs_expression() {
        let stmts = parse_stmts("a * b;");
        assert!(matches!(&stmts[0], Stmt::ExprStmt(Expr::Binary { .. })));
        let stmts = parse_stmts("Foo bar = baz;");
        assert!(matches!(&stmts[0], Stmt::LocalDecl { .. }));
    }

    #[test]
    fn test_comparison_is_not_a_declaration() {
        let stmts = parse_stmts("a < b && c > d;");
        assert!(matches!(&stmts[0], Stmt::ExprStmt(Expr::LogicalAnd(_, _))));
    }

    #[test]
    fn test_if_else_chain() {
        let stmts = parse_stmts("if (x > 0) { a(); } else if (x < 0) { b(); } else { c(); }");
        match &stmts[0] {
            Stmt::If { else_body: Some(else_body), .. } => {
                assert_eq!(else_body.len(), 1);
                assert!(matches!(&else_body[0], Stmt::If { else_body: Some(_), .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_do_while() {
        let stmts = parse_stmts("do { i++; } while (i < 10);");
        assert!(matches!(&stmts[0], Stmt::DoWhile { .. }));
    }

    #[test]
    fn test_for_loop() {
        let stmts = parse_stmts("for (int i = 0; i < 10; i++) { sum += i; }");
        match &stmts[0] {
            Stmt::For { init, condition, update, .. } => {
                assert!(matches!(init.as_deref(), Some(Stmt::LocalDecl { .. })));
                assert!(matches!(condition, Some(Expr::Comparison { .. })));
                assert!(matches!(update, Some(Expr::PostIncrement(_))));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_for_each() {
        let stmts = parse_stmts("for (String s : names) { use(s); }");
        match &stmts[0] {
            Stmt::ForEach { var, .. } => {
                assert_eq!(var.name, "s");
                assert_eq!(var.ty.display_name(), "String");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_switch_label_grouping() {
        let stmts = parse_stmts(
            "switch (x) { case 1: return 1; case 2: case 3: return 23; default: return 0; }",
        );
        match &stmts[0] {
            Stmt::Switch { cases, default_body, .. } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].labels, vec![Expr::IntLiteral(1)]);
                assert_eq!(
                    cases[1].labels,
                    vec![Expr::IntLiteral(2), Expr::IntLiteral(3)]
                );
                assert!(default_body.is_some());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_try_catch_finally() {
        let stmts = parse_stmts(
            "try { risky(); } catch (IOException | RuntimeException e) { log(e); } finally { close(); }",
        );
        match &stmts[0] {
            Stmt::Try { catches, finally_body, .. } => {
                assert_eq!(catches.len(), 1);
                assert_eq!(catches[0].exception_types.len(), 2);
                assert_eq!(catches[0].var_name, "e");
                assert!(finally_body.is_some());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_try_requires_catch_or_finally() {
        let tokens = Lexer::new("try { risky(); }").tokenize().unwrap();
        assert!(Parser::new(tokens).parse_statements().is_err());
    }

    #[test]
    fn test_arithmetic_precedence() {
        let stmts = parse_stmts("return a + b * c;");
        match &stmts[0] {
            Stmt::Return(Some(Expr::Binary { op: BinOp::Add, right, .. })) => {
                assert!(matches!(right.as_ref(), Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_precedence_shift_below_additive() {
        let stmts = parse_stmts("return a + b << c;");
        match &stmts[0] {
            Stmt::Return(Some(Expr::Binary { op: BinOp::Shl, left, .. })) => {
                assert!(matches!(left.as_ref(), Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ternary_right_associative() {
        let stmts = parse_stmts("return a ? 1 : b ? 2 : 3;");
        match &stmts[0] {
            Stmt::Return(Some(Expr::Ternary { else_expr, .. })) => {
                assert!(matches!(else_expr.as_ref(), Expr::Ternary { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_assignment_expression() {
        let stmts = parse_stmts("x = y = 1;");
        match &stmts[0] {
            Stmt::ExprStmt(Expr::Assign { value, .. }) => {
                assert!(matches!(value.as_ref(), Expr::Assign { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_compound_assign() {
        let stmts = parse_stmts("x += 1;");
        assert!(matches!(
            &stmts[0],
            Stmt::ExprStmt(Expr::CompoundAssign { op: BinOp::Add, .. })
        ));
    }

    #[test]
    fn test_cast() {
        let stmts = parse_stmts("long x = (long) y;");
        match &stmts[0] {
            Stmt::LocalDecl { init: Some(Expr::Cast { ty, .. }), .. } => {
                assert_eq!(*ty, TypeName::Primitive(PrimitiveKind::Long));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_is_not_cast() {
        let stmts = parse_stmts("int x = (y) + 1;");
        match &stmts[0] {
            Stmt::LocalDecl { init: Some(Expr::Binary { op: BinOp::Add, .. }), .. } => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_new_array_forms() {
        let stmts = parse_stmts("int[] a = new int[5]; int[] b = new int[]{1, 2};");
        assert!(matches!(
            &stmts[0],
            Stmt::LocalDecl { init: Some(Expr::NewArray { .. }), .. }
        ));
        match &stmts[1] {
            Stmt::LocalDecl { init: Some(Expr::NewArrayInit { elements, .. }), .. } => {
                assert_eq!(elements.len(), 2);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_brace_initializer() {
        let stmts = parse_stmts("int[] a = {1, 2, 3};");
        match &stmts[0] {
            Stmt::LocalDecl { init: Some(Expr::ArrayInit(elements)), .. } => {
                assert_eq!(elements.len(), 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_this_and_super_calls() {
        let unit = parse_unit(
            "class D extends B { D() { this(0); } D(int x) { super(x); this.x = x; } }",
        );
        let members = &unit.classes[0].members;
        match &members[0] {
            Member::Constructor(c) => {
                assert!(matches!(&c.body[0], Stmt::ExprStmt(Expr::ThisCall(_))));
            }
            other => panic!("unexpected: {:?}", other),
        }
        match &members[1] {
            Member::Constructor(c) => {
                assert!(matches!(&c.body[0], Stmt::ExprStmt(Expr::SuperCall(_))));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_super_method_call() {
        let stmts = parse_stmts("super.render(x);");
        match &stmts[0] {
            Stmt::ExprStmt(Expr::MethodCall { object: Some(obj), name, .. }) => {
                assert!(matches!(obj.as_ref(), Expr::Super));
                assert_eq!(name, "render");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_instanceof() {
        let stmts = parse_stmts("boolean b = x instanceof String;");
        match &stmts[0] {
            Stmt::LocalDecl { init: Some(Expr::Instanceof { ty, .. }), .. } => {
                assert_eq!(ty.display_name(), "String");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_nested_generics_close_with_shift_token() {
        let stmts = parse_stmts("List<List<Integer>> grid = x;");
        match &stmts[0] {
            Stmt::LocalDecl { ty, .. } => {
                assert_eq!(ty.display_name(), "List<List<Integer>>");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_reports_found_and_expected() {
        let tokens = Lexer::new("class A { int }").tokenize().unwrap();
        let err = Parser::new(tokens).parse().unwrap_err();
        match err {
            TranspileError::Parse { found, expected, .. } => {
                assert_eq!(found, "}");
                assert_eq!(expected, "an identifier");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parser_is_deterministic() {
        let src = "class A { int x = 1; void f() { for (int i = 0; i < x; i++) g(i); } }";
        assert_eq!(parse_unit(src), parse_unit(src));
    }
}
