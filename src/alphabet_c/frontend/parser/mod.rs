pub mod arena;
pub mod ast;
pub mod error;

use miette::SourceSpan;

use crate::alphabet_c::frontend::lexer::token::{Token, TokenKind, TokenKindVec};
use crate::alphabet_c::frontend::parser::error::{
    ExpectedExpressionError, InterfaceMemberError, InvalidAssignmentTargetError, ParseResult,
    SyntaxError, UnexpectedTokenError,
};
use arena::AstArena;
use ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, ClassStmt, Expr, ExpressionStmt, FunctionStmt,
    GetExpr, GroupingExpr, IfStmt, IndexExpr, ListExpr, LiteralExpr, LiteralValue, LogicalExpr,
    LoopStmt, MapExpr, NewExpr, ReturnStmt, SetExpr, Stmt, TryStmt, UnaryExpr, VarStmt,
    VariableExpr,
};

/// Recursive-descent parser with one-token lookahead.
///
/// A failed declaration is dropped: the error is recorded, the token stream
/// is advanced past the next synchronization boundary (`c`, `m`, `i`, `l` or
/// `r`) and parsing resumes, so one bad declaration does not poison the rest
/// of the program.
pub struct Parser<'ast> {
    arena: &'ast AstArena<'ast>,
    tokens: Vec<Token<'ast>>,
    pos: usize,
    src: String,
    errors: Vec<SyntaxError>,
}

impl<'ast> Parser<'ast> {
    pub fn new(arena: &'ast AstArena<'ast>, tokens: Vec<Token<'ast>>, src: &str) -> Parser<'ast> {
        Parser {
            arena,
            tokens,
            pos: 0,
            src: src.to_string(),
            errors: Vec::new(),
        }
    }

    /// Errors recovered from during the last `parse` call.
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<SyntaxError> {
        std::mem::take(&mut self.errors)
    }

    fn current(&self) -> &Token<'ast> {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token<'ast> {
        &self.tokens[self.pos - 1]
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::EoI
    }

    fn advance(&mut self) -> Token<'ast> {
        let token = *self.current();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token<'ast>> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(vec![kind]))
        }
    }

    fn unexpected(&self, expected: Vec<TokenKind>) -> SyntaxError {
        let token = self.current();
        SyntaxError::UnexpectedToken(UnexpectedTokenError {
            found: token.to_string(),
            expected: TokenKindVec(expected),
            line: token.line,
            span: SourceSpan::from(token.span),
            src: self.src.clone(),
        })
    }

    /// The language lets any single alphabetic letter double as a name, so a
    /// keyword token can still serve as an identifier here.
    fn is_identifier(&self) -> bool {
        let token = self.current();
        token.kind == TokenKind::Identifier
            || (token.lexeme.len() == 1 && token.lexeme.as_bytes()[0].is_ascii_alphabetic())
    }

    fn next_is_identifier(&self) -> bool {
        match self.tokens.get(self.pos + 1) {
            Some(token) => {
                token.kind == TokenKind::Identifier
                    || (token.lexeme.len() == 1 && token.lexeme.as_bytes()[0].is_ascii_alphabetic())
            }
            None => false,
        }
    }

    fn consume_identifier(&mut self) -> ParseResult<Token<'ast>> {
        if self.is_identifier() {
            Ok(self.advance())
        } else {
            Err(self.unexpected(vec![TokenKind::Identifier]))
        }
    }

    /// Skips tokens until just past a declaration boundary keyword.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            match self.previous().kind {
                TokenKind::KwClass
                | TokenKind::KwMethod
                | TokenKind::KwIf
                | TokenKind::KwLoop
                | TokenKind::KwReturn => return,
                _ => {}
            }
            self.advance();
        }
    }

    pub fn parse(&mut self) -> Vec<&'ast Stmt<'ast>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    fn declaration(&mut self) -> Option<&'ast Stmt<'ast>> {
        let result = if self.check(TokenKind::KwInterface) {
            self.advance();
            self.interface_declaration()
        } else if self.check(TokenKind::KwClass) && self.next_is_identifier() {
            self.advance();
            self.class_declaration()
        } else {
            self.statement()
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                tracing::warn!("dropped declaration after parse error: {err}");
                self.errors.push(err);
                self.synchronize();
                None
            }
        }
    }

    fn interface_declaration(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        let name = self.consume_identifier()?;
        self.expect(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if !self.matches(TokenKind::KwMethod) {
                return Err(SyntaxError::InterfaceMember(InterfaceMemberError {
                    span: SourceSpan::from(self.current().span),
                    src: self.src.clone(),
                }));
            }
            let return_type = self.expect(TokenKind::Number)?;
            let method_name = self.consume_identifier()?;
            let params = self.parameters()?;
            methods.push(FunctionStmt {
                name: method_name,
                params: self.arena.alloc_vec(params),
                body: &[],
                return_type,
                visibility: None,
                is_static: false,
            });
        }
        self.expect(TokenKind::RBrace)?;

        Ok(self.arena.alloc(Stmt::Class(ClassStmt {
            name,
            superclass: None,
            methods: self.arena.alloc_vec(methods),
            fields: &[],
            interfaces: &[],
            is_interface: true,
        })))
    }

    fn class_declaration(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        let name = self.consume_identifier()?;

        let mut superclass = None;
        let mut interfaces = Vec::new();
        if self.matches(TokenKind::Caret) {
            superclass = Some(self.consume_identifier()?);
            while self.matches(TokenKind::Comma) {
                interfaces.push(self.consume_identifier()?);
            }
        }

        self.expect(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let (visibility, is_static) = self.modifiers();
            if self.matches(TokenKind::KwMethod) {
                methods.push(self.method(visibility, is_static)?);
            } else if self.check(TokenKind::Number) {
                fields.push(self.var_declaration(visibility, is_static)?);
            } else {
                return Err(self.unexpected(vec![TokenKind::KwMethod, TokenKind::Number]));
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(self.arena.alloc(Stmt::Class(ClassStmt {
            name,
            superclass,
            methods: self.arena.alloc_vec(methods),
            fields: self.arena.alloc_vec(fields),
            interfaces: self.arena.alloc_vec(interfaces),
            is_interface: false,
        })))
    }

    /// Consumes `v`/`p`/`s` modifier tokens until a non-modifier appears. A
    /// repeated modifier breaks the loop rather than erroring.
    fn modifiers(&mut self) -> (Option<Token<'ast>>, bool) {
        let mut visibility = None;
        let mut is_static = false;
        loop {
            match self.current().kind {
                TokenKind::KwPublic | TokenKind::KwPrivate => {
                    if visibility.is_some() {
                        break;
                    }
                    visibility = Some(self.advance());
                }
                TokenKind::KwStatic => {
                    if is_static {
                        break;
                    }
                    self.advance();
                    is_static = true;
                }
                _ => break,
            }
        }
        (visibility, is_static)
    }

    fn method(
        &mut self,
        visibility: Option<Token<'ast>>,
        is_static: bool,
    ) -> ParseResult<FunctionStmt<'ast>> {
        let return_type = self.expect(TokenKind::Number)?;
        let name = self.consume_identifier()?;
        let params = self.parameters()?;
        self.expect(TokenKind::LBrace)?;
        let body = self.block()?;

        Ok(FunctionStmt {
            name,
            params: self.arena.alloc_vec(params),
            body,
            return_type,
            visibility,
            is_static,
        })
    }

    fn parameters(&mut self) -> ParseResult<Vec<VarStmt<'ast>>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let type_id = self.expect(TokenKind::Number)?;
                let name = self.consume_identifier()?;
                params.push(VarStmt {
                    type_id,
                    name,
                    initializer: None,
                    visibility: None,
                    is_static: false,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn var_declaration(
        &mut self,
        visibility: Option<Token<'ast>>,
        is_static: bool,
    ) -> ParseResult<VarStmt<'ast>> {
        let type_id = self.expect(TokenKind::Number)?;
        let name = self.consume_identifier()?;
        let initializer = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(VarStmt {
            type_id,
            name,
            initializer,
            visibility,
            is_static,
        })
    }

    fn statement(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        match self.current().kind {
            TokenKind::KwIf => {
                self.advance();
                self.if_statement()
            }
            TokenKind::KwReturn => {
                self.advance();
                self.return_statement()
            }
            TokenKind::KwLoop => {
                self.advance();
                self.loop_statement()
            }
            TokenKind::KwTry => {
                self.advance();
                self.try_statement()
            }
            TokenKind::LBrace => {
                self.advance();
                let statements = self.block()?;
                Ok(self
                    .arena
                    .alloc(Stmt::Block(BlockStmt { statements })))
            }
            // Declared types are always number literals, so a leading number
            // commits to a var statement over an expression statement.
            TokenKind::Number => {
                let var = self.var_declaration(None, false)?;
                Ok(self.arena.alloc(Stmt::Var(var)))
            }
            _ => self.expression_statement(),
        }
    }

    fn if_statement(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        self.expect(TokenKind::LParen)?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;

        let then_branch = self.statement()?;
        let else_branch = if self.matches(TokenKind::KwElse) {
            Some(self.statement()?)
        } else {
            None
        };

        Ok(self.arena.alloc(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
        })))
    }

    fn loop_statement(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        self.expect(TokenKind::LParen)?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.statement()?;

        Ok(self.arena.alloc(Stmt::Loop(LoopStmt { condition, body })))
    }

    fn try_statement(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        self.expect(TokenKind::LBrace)?;
        let try_block = BlockStmt {
            statements: self.block()?,
        };

        self.expect(TokenKind::KwHandle)?;
        self.expect(TokenKind::LParen)?;
        let exception_type = self.expect(TokenKind::Number)?;
        let exception_var = self.consume_identifier()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let handle_block = BlockStmt {
            statements: self.block()?,
        };

        Ok(self.arena.alloc(Stmt::Try(TryStmt {
            try_block,
            exception_type,
            exception_var,
            handle_block,
        })))
    }

    fn return_statement(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        let keyword = *self.previous();
        let mut value = None;
        if !self.check(TokenKind::RBrace) && !self.is_at_end() {
            // A bare `r` before something that is not an expression returns
            // null; the failed parse is rolled back.
            let saved = self.pos;
            match self.expression() {
                Ok(expr) => value = Some(expr),
                Err(_) => self.pos = saved,
            }
        }
        Ok(self.arena.alloc(Stmt::Return(ReturnStmt { keyword, value })))
    }

    fn block(&mut self) -> ParseResult<&'ast [&'ast Stmt<'ast>]> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.arena.alloc_vec(statements))
    }

    fn expression_statement(&mut self) -> ParseResult<&'ast Stmt<'ast>> {
        let expression = self.expression()?;
        Ok(self
            .arena
            .alloc(Stmt::Expression(ExpressionStmt { expression })))
    }

    fn expression(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let expr = self.or_expr()?;

        if self.matches(TokenKind::Eq) {
            let equals = *self.previous();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable(var) => Ok(self.arena.alloc(Expr::Assign(AssignExpr {
                    name: var.name,
                    value,
                }))),
                Expr::Get(get) => Ok(self.arena.alloc(Expr::Set(SetExpr {
                    object: get.object,
                    name: get.name,
                    value,
                }))),
                _ => Err(SyntaxError::InvalidAssignmentTarget(
                    InvalidAssignmentTargetError {
                        line: equals.line,
                        span: SourceSpan::from(equals.span),
                        src: self.src.clone(),
                    },
                )),
            };
        }

        Ok(expr)
    }

    fn or_expr(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.and_expr()?;
        while self.matches(TokenKind::OpOr) {
            let op = *self.previous();
            let right = self.and_expr()?;
            expr = self.arena.alloc(Expr::Logical(LogicalExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.equality()?;
        while self.matches(TokenKind::OpAnd) {
            let op = *self.previous();
            let right = self.equality()?;
            expr = self.arena.alloc(Expr::Logical(LogicalExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.comparison()?;
        while self.check(TokenKind::EqEq) || self.check(TokenKind::NEq) {
            let op = self.advance();
            let right = self.comparison()?;
            expr = self.arena.alloc(Expr::Binary(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.term()?;
        while matches!(
            self.current().kind,
            TokenKind::LAngle | TokenKind::LAngleEq | TokenKind::RAngle | TokenKind::RAngleEq
        ) {
            let op = self.advance();
            let right = self.term()?;
            expr = self.arena.alloc(Expr::Binary(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.factor()?;
        while self.check(TokenKind::Plus) || self.check(TokenKind::Minus) {
            let op = self.advance();
            let right = self.factor()?;
            expr = self.arena.alloc(Expr::Binary(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.unary()?;
        while matches!(
            self.current().kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            let op = self.advance();
            let right = self.unary()?;
            expr = self.arena.alloc(Expr::Binary(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        if matches!(
            self.current().kind,
            TokenKind::Bang | TokenKind::Minus | TokenKind::At
        ) {
            let op = self.advance();
            let right = self.unary()?;
            return Ok(self.arena.alloc(Expr::Unary(UnaryExpr { op, right })));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(TokenKind::LParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenKind::Dot) {
                let name = self.consume_identifier()?;
                expr = self.arena.alloc(Expr::Get(GetExpr { object: expr, name }));
            } else if self.matches(TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                expr = self.arena.alloc(Expr::Index(IndexExpr {
                    object: expr,
                    index,
                }));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: &'ast Expr<'ast>) -> ParseResult<&'ast Expr<'ast>> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                arguments.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(self.arena.alloc(Expr::Call(CallExpr {
            callee,
            arguments: self.arena.alloc_vec(arguments),
        })))
    }

    fn primary(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        match self.current().kind {
            TokenKind::Number => {
                let token = self.advance();
                Ok(self.arena.alloc(Expr::Literal(LiteralExpr {
                    value: LiteralValue::Number(token.literal),
                })))
            }
            TokenKind::Str => {
                let token = self.advance();
                Ok(self.arena.alloc(Expr::Literal(LiteralExpr {
                    value: LiteralValue::Str(token.lexeme),
                })))
            }
            TokenKind::KwSystem => {
                let token = self.advance();
                Ok(self
                    .arena
                    .alloc(Expr::Variable(VariableExpr { name: token })))
            }
            TokenKind::KwNew => {
                self.advance();
                self.new_expr()
            }
            TokenKind::LBracket => {
                self.advance();
                self.list_literal()
            }
            TokenKind::LBrace => {
                self.advance();
                self.map_literal()
            }
            TokenKind::LParen => {
                self.advance();
                let expression = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(self
                    .arena
                    .alloc(Expr::Grouping(GroupingExpr { expression })))
            }
            _ if self.is_identifier() => {
                let token = self.advance();
                Ok(self
                    .arena
                    .alloc(Expr::Variable(VariableExpr { name: token })))
            }
            _ => Err(SyntaxError::ExpectedExpression(ExpectedExpressionError {
                line: self.current().line,
                span: SourceSpan::from(self.current().span),
                src: self.src.clone(),
            })),
        }
    }

    fn new_expr(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let name = self.consume_identifier()?;
        let mut arguments = Vec::new();
        if self.matches(TokenKind::LParen) {
            if !self.check(TokenKind::RParen) {
                loop {
                    arguments.push(self.expression()?);
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        Ok(self.arena.alloc(Expr::New(NewExpr {
            name,
            arguments: self.arena.alloc_vec(arguments),
        })))
    }

    fn list_literal(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(self.arena.alloc(Expr::List(ListExpr {
            elements: self.arena.alloc_vec(elements),
        })))
    }

    fn map_literal(&mut self) -> ParseResult<&'ast Expr<'ast>> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                keys.push(self.expression()?);
                self.expect(TokenKind::Colon)?;
                values.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.arena.alloc(Expr::Map(MapExpr {
            keys: self.arena.alloc_vec(keys),
            values: self.arena.alloc_vec(values),
        })))
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;

    use super::*;
    use crate::alphabet_c::frontend::lexer::AlphabetLexer;

    fn parse_source<'ast>(arena: &'ast AstArena<'ast>, source: &'ast str) -> Vec<&'ast Stmt<'ast>> {
        let tokens = AlphabetLexer::new("<test>", source)
            .tokenize()
            .expect("test source must carry the header");
        let mut parser = Parser::new(arena, tokens, source);
        let statements = parser.parse();
        assert!(
            parser.errors().is_empty(),
            "unexpected parse errors: {:?}",
            parser.errors()
        );
        statements
    }

    #[test]
    fn precedence_builds_the_standard_ladder() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\n10 + 20 * 3");

        let Stmt::Expression(stmt) = statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Binary(add) = stmt.expression else {
            panic!("expected '+' at the root");
        };
        assert_eq!(add.op.lexeme, "+");
        assert!(matches!(
            add.left,
            Expr::Literal(LiteralExpr {
                value: LiteralValue::Number(n)
            }) if *n == 10.0
        ));
        let Expr::Binary(mul) = add.right else {
            panic!("expected '*' on the right");
        };
        assert_eq!(mul.op.lexeme, "*");
    }

    #[test]
    fn binary_operators_associate_left() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\n1 - 2 - 3");

        let Stmt::Expression(stmt) = statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Binary(outer) = stmt.expression else {
            panic!("expected binary root");
        };
        // ((1 - 2) - 3): the left child is itself a subtraction
        assert!(matches!(outer.left, Expr::Binary(_)));
        assert!(matches!(outer.right, Expr::Literal(_)));
    }

    #[test]
    fn leading_number_commits_to_a_var_statement() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\n5 x = 10");

        let Stmt::Var(var) = statements[0] else {
            panic!("expected var statement");
        };
        assert_eq!(var.type_id.literal, 5.0);
        assert_eq!(var.name.lexeme, "x");
        assert!(var.initializer.is_some());
    }

    #[test]
    fn keyword_letters_can_name_variables() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        // `i` is the if-keyword but also a legal variable name; `e` (else) can
        // even head an expression statement because nothing dispatches on it
        let statements = parse_source(&arena, "#alphabet<x>\n5 i = 0\n5 e = i + 1\ne = e * 2");

        let Stmt::Var(var) = statements[0] else {
            panic!("expected var statement");
        };
        assert_eq!(var.name.lexeme, "i");
        assert!(matches!(statements[1], Stmt::Var(_)));
        let Stmt::Expression(stmt) = statements[2] else {
            panic!("expected assignment statement");
        };
        assert!(matches!(stmt.expression, Expr::Assign(_)));
    }

    #[test]
    fn class_with_modifiers_methods_and_fields() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(
            &arena,
            "#alphabet<x>\nc Counter ^ Base, Printable {\n  p 5 count = 0\n  s 5 total\n  v m 5 get() { r 10 }\n}",
        );

        let Stmt::Class(class) = statements[0] else {
            panic!("expected class statement");
        };
        assert_eq!(class.name.lexeme, "Counter");
        assert_eq!(class.superclass.unwrap().lexeme, "Base");
        assert_eq!(class.interfaces.len(), 1);
        assert!(!class.is_interface);

        assert_eq!(class.fields.len(), 2);
        assert_eq!(class.fields[0].visibility.unwrap().lexeme, "p");
        assert!(class.fields[1].is_static);

        assert_eq!(class.methods.len(), 1);
        let method = &class.methods[0];
        assert_eq!(method.name.lexeme, "get");
        assert_eq!(method.visibility.unwrap().lexeme, "v");
        assert_eq!(method.return_type.literal, 5.0);
    }

    #[test]
    fn interface_collects_method_signatures() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(
            &arena,
            "#alphabet<x>\nj Printable {\n  m 3 show(12 text)\n  m 3 hide()\n}",
        );

        let Stmt::Class(interface) = statements[0] else {
            panic!("expected interface statement");
        };
        assert!(interface.is_interface);
        assert_eq!(interface.methods.len(), 2);
        assert_eq!(interface.methods[0].params.len(), 1);
        assert!(interface.methods[0].body.is_empty());
    }

    #[test]
    fn try_handle_round_trip() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\nt { z.t() } h (12 e) { z.o(e) }");

        let Stmt::Try(try_stmt) = statements[0] else {
            panic!("expected try statement");
        };
        assert_eq!(try_stmt.exception_type.literal, 12.0);
        assert_eq!(try_stmt.exception_var.lexeme, "e");
        assert_eq!(try_stmt.try_block.statements.len(), 1);
        assert_eq!(try_stmt.handle_block.statements.len(), 1);
    }

    #[test]
    fn new_without_parens_is_accepted() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\n15 o = n Thing");

        let Stmt::Var(var) = statements[0] else {
            panic!("expected var statement");
        };
        let Some(Expr::New(new_expr)) = var.initializer else {
            panic!("expected new expression initializer");
        };
        assert_eq!(new_expr.name.lexeme, "Thing");
        assert!(new_expr.arguments.is_empty());
    }

    #[test]
    fn list_and_map_literals() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\n13 a = [1, 2, 3]\n14 b = {\"k\": 1}");

        let Stmt::Var(list_var) = statements[0] else {
            panic!("expected list var");
        };
        let Some(Expr::List(list)) = list_var.initializer else {
            panic!("expected list literal");
        };
        assert_eq!(list.elements.len(), 3);

        let Stmt::Var(map_var) = statements[1] else {
            panic!("expected map var");
        };
        let Some(Expr::Map(map)) = map_var.initializer else {
            panic!("expected map literal");
        };
        assert_eq!(map.keys.len(), 1);
    }

    #[test]
    fn chained_calls_gets_and_indexing() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\nfoo.bar(1)[0].baz");

        let Stmt::Expression(stmt) = statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Get(get) = stmt.expression else {
            panic!("expected trailing property access");
        };
        assert_eq!(get.name.lexeme, "baz");
        assert!(matches!(get.object, Expr::Index(_)));
    }

    #[test]
    fn invalid_assignment_target_is_an_error() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let source = "#alphabet<x>\n1 + 2 = 3";
        let tokens = AlphabetLexer::new("<test>", source).tokenize().unwrap();
        let mut parser = Parser::new(&arena, tokens, source);
        parser.parse();
        assert!(
            parser
                .errors()
                .iter()
                .any(|e| matches!(e, SyntaxError::InvalidAssignmentTarget(_)))
        );
    }

    #[test]
    fn parser_recovers_after_a_bad_declaration() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        // the interface declaration is broken; synchronization skips to just
        // past the `r` boundary and the var after it must still parse
        let source = "#alphabet<x>\nj 5 { }\nr\n5 x = 1";
        let tokens = AlphabetLexer::new("<test>", source).tokenize().unwrap();
        let mut parser = Parser::new(&arena, tokens, source);
        let statements = parser.parse();

        assert!(!parser.errors().is_empty());
        assert!(statements.iter().any(|s| matches!(s, Stmt::Var(_))));
    }

    #[test]
    fn bare_return_swallows_a_missing_expression() {
        let bump = Bump::new();
        let arena = AstArena::new(&bump);
        let statements = parse_source(&arena, "#alphabet<x>\nc A { v m 3 f() { r } }");

        let Stmt::Class(class) = statements[0] else {
            panic!("expected class");
        };
        let Stmt::Return(ret) = class.methods[0].body[0] else {
            panic!("expected return statement");
        };
        assert!(ret.value.is_none());
    }
}
