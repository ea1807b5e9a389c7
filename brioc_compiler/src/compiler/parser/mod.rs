//! Recursive descent parser building the [AST](hir) and reporting syntax
//! errors. Does not stop after the first error but synchronizes back into
//! a valid state to emit multiple errors at once.

pub mod hir;

use crate::compiler::common::{error::*, token::*};
use crate::compiler::parser::hir::{decl::*, expr::*, stmt::*};

use std::iter::Peekable;

// helper macros that allow comparing token-kinds without specifying their
// fields: TokenKind::Ident(_)
macro_rules! match_next {
    ($parser:expr, $expected:pat) => {{
        let matched = match $parser.tokens.peek() {
            Some(token) => matches!(token.kind, $expected),
            None => false,
        };
        if matched {
            $parser.tokens.next()
        } else {
            None
        }
    }};
}
macro_rules! consume {
    ($parser:expr, $expected:pat, $msg:expr) => {{
        let token = $parser.peek($msg)?;
        if matches!(token.kind, $expected) {
            Ok($parser.tokens.next().unwrap())
        } else {
            Err(Error::new(
                token,
                ErrorKind::Expected($msg, token.kind.to_string()),
            ))
        }
    }};
}
macro_rules! check {
    ($parser:expr, $expected:pat) => {
        matches!($parser.tokens.peek(), Some(Token { kind: $expected, .. }))
    };
}

pub struct Parser {
    tokens: Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    pub fn parse(mut self) -> Result<Vec<Declaration>, Vec<Error>> {
        let mut declarations: Vec<Declaration> = Vec::new();
        let mut errors: Vec<Error> = Vec::new();

        while self.tokens.peek().is_some() {
            match self.declaration() {
                Ok(decl) => declarations.push(decl),
                Err(e) => {
                    errors.push(e);
                    self.sync();
                }
            }
        }

        if errors.is_empty() {
            Ok(declarations)
        } else {
            Err(errors)
        }
    }

    fn peek(&mut self, expected: &'static str) -> Result<&Token, Error> {
        self.tokens.peek().ok_or_else(|| Error::eof(expected))
    }

    // skips tokens until the end of the current declaration or statement
    fn sync(&mut self) {
        let mut open_braces = 0;

        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Semicolon if open_braces <= 0 => break,
                TokenKind::LeftBrace => open_braces += 1,
                TokenKind::RightBrace => {
                    if open_braces <= 1 {
                        break;
                    }
                    open_braces -= 1;
                }
                _ => (),
            }
        }
    }

    // <declaration> ::= <var-decl> | <fn-decl> | <struct-decl>
    fn declaration(&mut self) -> Result<Declaration, Error> {
        if check!(self, TokenKind::Struct) {
            // 'struct id {' opens a definition, 'struct id id' declares a
            // variable of that struct type
            self.tokens.next();
            let name = self.ident("struct name")?;

            if match_next!(self, TokenKind::LeftBrace).is_some() {
                return self.struct_declaration(name);
            }

            let var = self.var_declarator(TypeSpec::Struct(name))?;
            return Ok(Declaration::Var(var));
        }

        let spec = self.type_spec()?;
        let name = self.ident("identifier")?;

        if check!(self, TokenKind::LeftParen) {
            self.function_declaration(spec, name)
        } else {
            consume!(self, TokenKind::Semicolon, "';' after declaration")?;
            Ok(Declaration::Var(VarDecl { ty: spec, name }))
        }
    }

    fn type_spec(&mut self) -> Result<TypeSpec, Error> {
        let token = self.peek("type-declaration")?;
        let spec = match token.kind {
            TokenKind::Int => TypeSpec::Int,
            TokenKind::Bool => TypeSpec::Bool,
            TokenKind::Void => TypeSpec::Void,
            TokenKind::Struct => {
                self.tokens.next();
                let name = self.ident("struct name")?;
                return Ok(TypeSpec::Struct(name));
            }
            _ => {
                return Err(Error::new(
                    token,
                    ErrorKind::Expected("type-declaration", token.kind.to_string()),
                ))
            }
        };
        self.tokens.next();
        Ok(spec)
    }

    fn ident(&mut self, msg: &'static str) -> Result<Ident, Error> {
        let token = consume!(self, TokenKind::Ident(_), msg)?;
        Ok(Ident::new(token.unwrap_string(), token.line, token.column))
    }

    fn var_declarator(&mut self, spec: TypeSpec) -> Result<VarDecl, Error> {
        let name = self.ident("identifier")?;
        consume!(self, TokenKind::Semicolon, "';' after declaration")?;
        Ok(VarDecl { ty: spec, name })
    }

    // <struct-decl> ::= struct <id> { <var-decl>+ } ;
    fn struct_declaration(&mut self, name: Ident) -> Result<Declaration, Error> {
        let mut fields = Vec::new();
        while !check!(self, TokenKind::RightBrace) {
            self.peek("'}' closing struct definition")?;
            let spec = self.type_spec()?;
            fields.push(self.var_declarator(spec)?);
        }
        consume!(self, TokenKind::RightBrace, "'}' closing struct definition")?;
        consume!(self, TokenKind::Semicolon, "';' after struct definition")?;

        Ok(Declaration::Struct(StructDecl { name, fields }))
    }

    // <fn-decl> ::= <type> <id> ( <formals>? ) <block>
    fn function_declaration(&mut self, ret: TypeSpec, name: Ident) -> Result<Declaration, Error> {
        consume!(self, TokenKind::LeftParen, "'(' after function name")?;

        let mut formals = Vec::new();
        if !check!(self, TokenKind::RightParen) {
            loop {
                let spec = self.type_spec()?;
                let formal_name = self.ident("parameter name")?;
                formals.push(FormalDecl { ty: spec, name: formal_name });

                if match_next!(self, TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        consume!(self, TokenKind::RightParen, "')' after parameters")?;

        let body = self.block()?;
        Ok(Declaration::Fn(FnDecl { ret, name, formals, body }))
    }

    // <block> ::= { <var-decl>* <stmt>* }
    fn block(&mut self) -> Result<Block, Error> {
        consume!(self, TokenKind::LeftBrace, "'{' starting block")?;

        let mut decls = Vec::new();
        while check!(
            self,
            TokenKind::Int | TokenKind::Bool | TokenKind::Void | TokenKind::Struct
        ) {
            let spec = self.type_spec()?;
            decls.push(self.var_declarator(spec)?);
        }

        let mut stmts = Vec::new();
        while !check!(self, TokenKind::RightBrace) {
            self.peek("'}' closing block")?;
            stmts.push(self.statement()?);
        }
        consume!(self, TokenKind::RightBrace, "'}' closing block")?;

        Ok(Block { decls, stmts })
    }

    fn statement(&mut self) -> Result<Stmt, Error> {
        let token = self.peek("statement")?;
        match token.kind {
            TokenKind::PlusPlus => {
                self.tokens.next();
                let operand = self.location()?;
                consume!(self, TokenKind::Semicolon, "';' after statement")?;
                Ok(Stmt::PreInc(operand))
            }
            TokenKind::MinusMinus => {
                self.tokens.next();
                let operand = self.location()?;
                consume!(self, TokenKind::Semicolon, "';' after statement")?;
                Ok(Stmt::PreDec(operand))
            }
            TokenKind::Receive => {
                self.tokens.next();
                consume!(self, TokenKind::GreaterGreater, "'>>' after 'receive'")?;
                let exp = self.location()?;
                consume!(self, TokenKind::Semicolon, "';' after statement")?;
                Ok(Stmt::Receive { exp, exp_type: None })
            }
            TokenKind::Print => {
                self.tokens.next();
                consume!(self, TokenKind::LessLess, "'<<' after 'print'")?;
                let exp = self.expression()?;
                consume!(self, TokenKind::Semicolon, "';' after statement")?;
                Ok(Stmt::Print { exp, exp_type: None })
            }
            TokenKind::If => {
                self.tokens.next();
                consume!(self, TokenKind::LeftParen, "'(' after 'if'")?;
                let cond = self.expression()?;
                consume!(self, TokenKind::RightParen, "')' after condition")?;
                let body = self.block()?;

                if match_next!(self, TokenKind::Else).is_some() {
                    let otherwise = self.block()?;
                    Ok(Stmt::IfElse { cond, then: body, otherwise })
                } else {
                    Ok(Stmt::If { cond, body })
                }
            }
            TokenKind::While => {
                self.tokens.next();
                consume!(self, TokenKind::LeftParen, "'(' after 'while'")?;
                let cond = self.expression()?;
                consume!(self, TokenKind::RightParen, "')' after condition")?;
                let body = self.block()?;
                Ok(Stmt::While { cond, body })
            }
            TokenKind::Repeat => {
                self.tokens.next();
                consume!(self, TokenKind::LeftParen, "'(' after 'repeat'")?;
                let cond = self.expression()?;
                consume!(self, TokenKind::RightParen, "')' after clause")?;
                let body = self.block()?;
                Ok(Stmt::Repeat { cond, body })
            }
            TokenKind::Return => {
                self.tokens.next();
                let value = if check!(self, TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                consume!(self, TokenKind::Semicolon, "';' after return")?;
                Ok(Stmt::Return { value })
            }
            TokenKind::Ident(_) => {
                let exp = self.expression()?;
                let stmt = match exp {
                    Expr::Assign(assign) => Stmt::Assign(*assign),
                    Expr::Call(call) => Stmt::Call(call),
                    other => {
                        return Err(Error::new(
                            &other,
                            ErrorKind::Regular("expected assignment or call statement"),
                        ))
                    }
                };
                consume!(self, TokenKind::Semicolon, "';' after statement")?;
                Ok(stmt)
            }
            _ => Err(Error::new(
                token,
                ErrorKind::Expected("statement", token.kind.to_string()),
            )),
        }
    }

    // <loc> ::= <id> (. <id>)*
    fn location(&mut self) -> Result<Expr, Error> {
        let id = self.ident("identifier")?;
        self.dot_chain(Expr::Id(id))
    }

    fn dot_chain(&mut self, mut loc: Expr) -> Result<Expr, Error> {
        while match_next!(self, TokenKind::Dot).is_some() {
            let field = self.ident("field name after '.'")?;
            loc = Expr::Dot(Box::new(DotAccess {
                loc,
                field,
                struct_def: None,
                bad_access: false,
            }));
        }
        Ok(loc)
    }

    fn expression(&mut self) -> Result<Expr, Error> {
        self.assignment()
    }

    // right-associative, lowest precedence; the left side must be a
    // location (plain id or dot-access)
    fn assignment(&mut self) -> Result<Expr, Error> {
        let exp = self.or_expr()?;

        if match_next!(self, TokenKind::Equal).is_some() {
            if !matches!(exp, Expr::Id(_) | Expr::Dot(_)) {
                return Err(Error::new(
                    &exp,
                    ErrorKind::Regular("left side of '=' is not an assignable location"),
                ));
            }
            let rhs = self.assignment()?;
            return Ok(Expr::Assign(Box::new(AssignExpr { lhs: exp, rhs })));
        }

        Ok(exp)
    }

    fn or_expr(&mut self) -> Result<Expr, Error> {
        let mut exp = self.and_expr()?;
        while match_next!(self, TokenKind::PipePipe).is_some() {
            let right = self.and_expr()?;
            exp = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(exp),
                right: Box::new(right),
            };
        }
        Ok(exp)
    }

    fn and_expr(&mut self) -> Result<Expr, Error> {
        let mut exp = self.equality()?;
        while match_next!(self, TokenKind::AmpAmp).is_some() {
            let right = self.equality()?;
            exp = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(exp),
                right: Box::new(right),
            };
        }
        Ok(exp)
    }

    fn equality(&mut self) -> Result<Expr, Error> {
        let mut exp = self.relational()?;
        while let Some(token) = match_next!(self, TokenKind::EqualEqual | TokenKind::BangEqual) {
            let op = match token.kind {
                TokenKind::EqualEqual => BinaryOp::Equals,
                _ => BinaryOp::NotEquals,
            };
            let right = self.relational()?;
            exp = Expr::Binary {
                op,
                left: Box::new(exp),
                right: Box::new(right),
            };
        }
        Ok(exp)
    }

    fn relational(&mut self) -> Result<Expr, Error> {
        let mut exp = self.additive()?;
        while let Some(token) = match_next!(
            self,
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual
        ) {
            let op = match token.kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                _ => BinaryOp::GreaterEq,
            };
            let right = self.additive()?;
            exp = Expr::Binary {
                op,
                left: Box::new(exp),
                right: Box::new(right),
            };
        }
        Ok(exp)
    }

    fn additive(&mut self) -> Result<Expr, Error> {
        let mut exp = self.multiplicative()?;
        while let Some(token) = match_next!(self, TokenKind::Plus | TokenKind::Minus) {
            let op = match token.kind {
                TokenKind::Plus => BinaryOp::Plus,
                _ => BinaryOp::Minus,
            };
            let right = self.multiplicative()?;
            exp = Expr::Binary {
                op,
                left: Box::new(exp),
                right: Box::new(right),
            };
        }
        Ok(exp)
    }

    fn multiplicative(&mut self) -> Result<Expr, Error> {
        let mut exp = self.unary()?;
        while let Some(token) = match_next!(self, TokenKind::Star | TokenKind::Slash) {
            let op = match token.kind {
                TokenKind::Star => BinaryOp::Times,
                _ => BinaryOp::Divide,
            };
            let right = self.unary()?;
            exp = Expr::Binary {
                op,
                left: Box::new(exp),
                right: Box::new(right),
            };
        }
        Ok(exp)
    }

    fn unary(&mut self) -> Result<Expr, Error> {
        if let Some(token) = match_next!(self, TokenKind::Minus | TokenKind::Bang) {
            let op = match token.kind {
                TokenKind::Minus => UnaryOp::Minus,
                _ => UnaryOp::Not,
            };
            let operand = self.unary()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand) });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, Error> {
        let token = self.peek("expression")?.clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.tokens.next();
                Ok(Expr::IntLit {
                    value,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenKind::String(value) => {
                self.tokens.next();
                Ok(Expr::StringLit {
                    value,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenKind::True => {
                self.tokens.next();
                Ok(Expr::True { line: token.line, column: token.column })
            }
            TokenKind::False => {
                self.tokens.next();
                Ok(Expr::False { line: token.line, column: token.column })
            }
            TokenKind::LeftParen => {
                self.tokens.next();
                let exp = self.expression()?;
                consume!(self, TokenKind::RightParen, "')' closing expression")?;
                Ok(exp)
            }
            TokenKind::Ident(_) => {
                let id = self.ident("identifier")?;

                if match_next!(self, TokenKind::LeftParen).is_some() {
                    let mut args = Vec::new();
                    if !check!(self, TokenKind::RightParen) {
                        loop {
                            args.push(self.expression()?);
                            if match_next!(self, TokenKind::Comma).is_none() {
                                break;
                            }
                        }
                    }
                    consume!(self, TokenKind::RightParen, "')' after arguments")?;
                    return Ok(Expr::Call(CallExpr { name: id, args }));
                }

                self.dot_chain(Expr::Id(id))
            }
            _ => Err(Error::new(
                &token,
                ErrorKind::Expected("expression", token.kind.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::scanner::Scanner;

    fn parse(source: &str) -> Vec<Declaration> {
        let tokens = Scanner::new(source).scan_token().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_err(source: &str) -> Vec<Error> {
        let tokens = Scanner::new(source).scan_token().unwrap();
        Parser::new(tokens).parse().unwrap_err()
    }

    #[test]
    fn parses_globals_functions_and_structs() {
        let decls = parse(
            "int g;
             struct point { int x; int y; };
             struct point p;
             void main() { g = 1; }",
        );

        assert_eq!(decls.len(), 4);
        assert!(matches!(&decls[0], Declaration::Var(v) if v.name.name == "g"));
        assert!(matches!(&decls[1], Declaration::Struct(s) if s.fields.len() == 2));
        assert!(matches!(
            &decls[2],
            Declaration::Var(VarDecl { ty: TypeSpec::Struct(id), .. }) if id.name == "point"
        ));
        assert!(matches!(&decls[3], Declaration::Fn(f) if f.name.name == "main"));
    }

    #[test]
    fn binds_precedence_correctly() {
        // a = 1 + 2 * 3 parses as a = (1 + (2 * 3))
        let decls = parse("void main() { int a; a = 1 + 2 * 3; }");
        let Declaration::Fn(func) = &decls[0] else {
            panic!("expected function")
        };
        let Stmt::Assign(assign) = &func.body.stmts[0] else {
            panic!("expected assignment")
        };

        let Expr::Binary { op: BinaryOp::Plus, right, .. } = &assign.rhs else {
            panic!("expected '+' at the top")
        };
        assert!(matches!(
            right.as_ref(),
            Expr::Binary { op: BinaryOp::Times, .. }
        ));
    }

    #[test]
    fn assignment_chains_are_right_associative() {
        let decls = parse("void main() { int a; int b; a = b = 3; }");
        let Declaration::Fn(func) = &decls[0] else {
            panic!("expected function")
        };

        let Stmt::Assign(assign) = &func.body.stmts[0] else {
            panic!("expected assignment")
        };
        assert!(matches!(assign.rhs, Expr::Assign(_)));
    }

    #[test]
    fn parses_dot_chains_as_left_nested_accesses() {
        let decls = parse("void main() { a.b.c = 1; }");
        let Declaration::Fn(func) = &decls[0] else {
            panic!("expected function")
        };
        let Stmt::Assign(assign) = &func.body.stmts[0] else {
            panic!("expected assignment")
        };

        let Expr::Dot(outer) = &assign.lhs else {
            panic!("expected dot-access")
        };
        assert_eq!(outer.field.name, "c");
        assert!(matches!(&outer.loc, Expr::Dot(inner) if inner.field.name == "b"));
    }

    #[test]
    fn keeps_parsing_after_an_error() {
        let errors = parse_err("int 1x; bool b void main() {}");
        assert!(errors.len() >= 2);
    }

    #[test]
    fn rejects_expression_statements() {
        let errors = parse_err("void main() { a + 1; }");
        assert_eq!(
            errors[0].kind,
            ErrorKind::Regular("expected assignment or call statement")
        );
    }
}
