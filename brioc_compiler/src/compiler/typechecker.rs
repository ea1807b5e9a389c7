//! Walks the resolved AST computing a type for every expression and
//! enforcing the typing rules. Once a subexpression has gone wrong its
//! type is [Type::Error], which silences every rule that sees it so a
//! single defect produces a single diagnostic.

use crate::compiler::common::environment::Symbol;
use crate::compiler::common::error::*;
use crate::compiler::common::types::Type;
use crate::compiler::parser::hir::{decl::*, expr::*, stmt::*};

pub struct TypeChecker {
    errors: Vec<Error>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker { errors: Vec::new() }
    }

    /// Checks every function body against its declared return type.
    /// Non-function declarations need no checks beyond name analysis.
    pub fn check(mut self, program: &mut [Declaration]) -> Result<(), Vec<Error>> {
        for decl in program.iter_mut() {
            if let Declaration::Fn(func) = decl {
                self.fn_body(func);
            }
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn fn_body(&mut self, func: &mut FnDecl) {
        let ret = match &*func.name.symbol().borrow() {
            Symbol::Function { ret, .. } => ret.clone(),
            _ => unreachable!("function declaration linked to non-function symbol"),
        };
        self.block(&mut func.body, &ret);
    }

    fn block(&mut self, block: &mut Block, ret: &Type) {
        for stmt in block.stmts.iter_mut() {
            self.statement(stmt, ret);
        }
    }

    fn statement(&mut self, stmt: &mut Stmt, ret: &Type) {
        match stmt {
            Stmt::Assign(assign) => {
                self.assign(assign);
            }
            Stmt::PreInc(exp) | Stmt::PreDec(exp) => {
                let ty = self.expression(exp);
                if !ty.is_error() && !ty.is_int() {
                    self.errors.push(Error::new(exp, ErrorKind::NonNumericArith));
                }
            }
            Stmt::Receive { exp, exp_type } => {
                let ty = self.expression(exp);
                if ty.is_function() {
                    self.errors.push(Error::new(exp, ErrorKind::ReadFn));
                }
                if ty.is_struct_def() {
                    self.errors.push(Error::new(exp, ErrorKind::ReadStructName));
                }
                if ty.is_struct() {
                    self.errors.push(Error::new(exp, ErrorKind::ReadStructVar));
                }
                *exp_type = Some(ty);
            }
            Stmt::Print { exp, exp_type } => {
                let ty = self.expression(exp);
                if ty.is_function() {
                    self.errors.push(Error::new(exp, ErrorKind::WriteFn));
                }
                if ty.is_struct_def() {
                    self.errors.push(Error::new(exp, ErrorKind::WriteStructName));
                }
                if ty.is_struct() {
                    self.errors.push(Error::new(exp, ErrorKind::WriteStructVar));
                }
                if ty.is_void() {
                    self.errors.push(Error::new(exp, ErrorKind::WriteVoid));
                }
                *exp_type = Some(ty);
            }
            Stmt::If { cond, body } => {
                let ty = self.expression(cond);
                if !ty.is_error() && !ty.is_bool() {
                    self.errors.push(Error::new(cond, ErrorKind::NonBoolIf));
                }
                self.block(body, ret);
            }
            Stmt::IfElse { cond, then, otherwise } => {
                let ty = self.expression(cond);
                if !ty.is_error() && !ty.is_bool() {
                    self.errors.push(Error::new(cond, ErrorKind::NonBoolIf));
                }
                self.block(then, ret);
                self.block(otherwise, ret);
            }
            Stmt::While { cond, body } => {
                let ty = self.expression(cond);
                if !ty.is_error() && !ty.is_bool() {
                    self.errors.push(Error::new(cond, ErrorKind::NonBoolWhile));
                }
                self.block(body, ret);
            }
            Stmt::Repeat { cond, body } => {
                let ty = self.expression(cond);
                if !ty.is_error() && !ty.is_int() {
                    self.errors.push(Error::new(cond, ErrorKind::NonIntRepeat));
                }
                self.block(body, ret);
            }
            Stmt::Call(call) => {
                self.call(call);
            }
            Stmt::Return { value } => match value {
                Some(exp) => {
                    let ty = self.expression(exp);
                    if ret.is_void() {
                        self.errors.push(Error::new(exp, ErrorKind::ReturnValueInVoid));
                    } else if !ty.is_error() && *ret != ty {
                        self.errors.push(Error::new(exp, ErrorKind::BadReturnValue));
                    }
                }
                None => {
                    if !ret.is_void() {
                        self.errors.push(Error::program_level(ErrorKind::MissingReturn));
                    }
                }
            },
        }
    }

    fn expression(&mut self, exp: &mut Expr) -> Type {
        match exp {
            Expr::IntLit { .. } => Type::Int,
            Expr::StringLit { .. } => Type::String,
            Expr::True { .. } | Expr::False { .. } => Type::Bool,
            Expr::Id(id) => id.symbol().borrow().ty(),
            Expr::Dot(dot) => dot.field.symbol().borrow().ty(),
            Expr::Assign(assign) => self.assign(assign),
            Expr::Call(call) => self.call(call),
            Expr::Unary { op: UnaryOp::Minus, operand } => {
                let ty = self.expression(operand);
                if ty.is_error() {
                    Type::Error
                } else if !ty.is_int() {
                    self.errors
                        .push(Error::new(operand.as_ref(), ErrorKind::NonNumericArith));
                    Type::Error
                } else {
                    Type::Int
                }
            }
            Expr::Unary { op: UnaryOp::Not, operand } => {
                let ty = self.expression(operand);
                if ty.is_error() {
                    Type::Error
                } else if !ty.is_bool() {
                    self.errors
                        .push(Error::new(operand.as_ref(), ErrorKind::NonBoolLogical));
                    Type::Error
                } else {
                    Type::Bool
                }
            }
            Expr::Binary { op, left, right } => {
                let op = *op;
                self.binary(op, left, right)
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &mut Expr, right: &mut Expr) -> Type {
        let left_type = self.expression(left);
        let right_type = self.expression(right);

        let mut result = if op.is_arithmetic() {
            Type::Int
        } else {
            Type::Bool
        };

        if op.is_arithmetic() || op.is_relational() {
            let kind = if op.is_arithmetic() {
                ErrorKind::NonNumericArith
            } else {
                ErrorKind::NonNumericRelational
            };
            if !left_type.is_error() && !left_type.is_int() {
                self.errors.push(Error::new(left, kind.clone()));
                result = Type::Error;
            }
            if !right_type.is_error() && !right_type.is_int() {
                self.errors.push(Error::new(right, kind));
                result = Type::Error;
            }
        } else if op.is_logical() {
            if !left_type.is_error() && !left_type.is_bool() {
                self.errors.push(Error::new(left, ErrorKind::NonBoolLogical));
                result = Type::Error;
            }
            if !right_type.is_error() && !right_type.is_bool() {
                self.errors.push(Error::new(right, ErrorKind::NonBoolLogical));
                result = Type::Error;
            }
        } else if op.is_equality() {
            // equality bans whole categories before the same-type check,
            // reporting at the left operand
            if left_type.is_void() && right_type.is_void() {
                self.errors.push(Error::new(left, ErrorKind::EqualityVoidFns));
                result = Type::Error;
            }
            if left_type.is_function() && right_type.is_function() {
                self.errors.push(Error::new(left, ErrorKind::EqualityFns));
                result = Type::Error;
            }
            if left_type.is_struct_def() && right_type.is_struct_def() {
                self.errors.push(Error::new(left, ErrorKind::EqualityStructNames));
                result = Type::Error;
            }
            if left_type.is_struct() && right_type.is_struct() {
                self.errors.push(Error::new(left, ErrorKind::EqualityStructVars));
                result = Type::Error;
            }
            if left_type != right_type && !left_type.is_error() && !right_type.is_error() {
                self.errors.push(Error::new(left, ErrorKind::TypeMismatch));
                result = Type::Error;
            }
        }

        if left_type.is_error() || right_type.is_error() {
            result = Type::Error;
        }
        result
    }

    fn assign(&mut self, assign: &mut AssignExpr) -> Type {
        let lhs_type = self.expression(&mut assign.lhs);
        let rhs_type = self.expression(&mut assign.rhs);

        // assignment yields the assigned value, so its type is the right
        // side's on success
        let mut result = rhs_type.clone();

        if lhs_type.is_function() && rhs_type.is_function() {
            self.errors.push(Error::new(&assign.lhs, ErrorKind::FnAssign));
            result = Type::Error;
        }
        if lhs_type.is_struct_def() && rhs_type.is_struct_def() {
            self.errors.push(Error::new(&assign.lhs, ErrorKind::StructNameAssign));
            result = Type::Error;
        }
        if lhs_type.is_struct() && rhs_type.is_struct() {
            self.errors.push(Error::new(&assign.lhs, ErrorKind::StructVarAssign));
            result = Type::Error;
        }
        if lhs_type != rhs_type && !lhs_type.is_error() && !rhs_type.is_error() {
            self.errors.push(Error::new(&assign.lhs, ErrorKind::TypeMismatch));
            result = Type::Error;
        }
        if lhs_type.is_error() || rhs_type.is_error() {
            result = Type::Error;
        }
        result
    }

    fn call(&mut self, call: &mut CallExpr) -> Type {
        let callee = match &*call.name.symbol().borrow() {
            Symbol::Function { ret, params, arity, .. } => {
                Some((ret.clone(), params.clone(), *arity))
            }
            _ => None,
        };

        // calling a non-function poisons the whole call; the arguments are
        // not checked since there is nothing to check them against
        let Some((ret, params, arity)) = callee else {
            self.errors.push(Error::new(&call.name, ErrorKind::CallNonFn));
            return Type::Error;
        };

        if call.args.len() != arity {
            self.errors.push(Error::new(&call.name, ErrorKind::WrongArgCount));
            // the declared return type still flows outward so the
            // surrounding expression keeps type-checking
            return ret;
        }

        for (arg, formal) in call.args.iter_mut().zip(params.iter()) {
            let arg_type = self.expression(arg);
            if !arg_type.is_error() && arg_type != *formal {
                self.errors.push(Error::new(arg, ErrorKind::ArgTypeMismatch));
            }
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::name_analysis::NameAnalyzer;
    use crate::compiler::parser::Parser;
    use crate::compiler::scanner::Scanner;

    fn check(source: &str) -> Result<(), Vec<Error>> {
        let tokens = Scanner::new(source).scan_token().unwrap();
        let mut program = Parser::new(tokens).parse().unwrap();
        NameAnalyzer::new().analyze(&mut program).unwrap();
        TypeChecker::new().check(&mut program)
    }

    fn check_err(source: &str) -> Vec<Error> {
        check(source).unwrap_err()
    }

    #[test]
    fn arithmetic_on_bool_reports_at_the_offender_only() {
        // the assignment sees an error type on the right and stays silent
        let errors = check_err("int main() { int a; bool b; a = a + b; return 0; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NonNumericArith);
        assert_eq!((errors[0].line, errors[0].column), (1, 37));
    }

    #[test]
    fn both_bad_operands_are_reported_separately() {
        let errors = check_err("int main() { bool b; int a; a = b * b; return 0; }");
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::NonNumericArith));
    }

    #[test]
    fn logical_and_relational_operand_rules() {
        let errors = check_err("int main() { int a; bool b; b = a && tru; b = b < b; return 0; }");
        assert_eq!(errors[0].kind, ErrorKind::NonBoolLogical);
        assert_eq!(errors[1].kind, ErrorKind::NonNumericRelational);
        assert_eq!(errors[2].kind, ErrorKind::NonNumericRelational);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn not_requires_a_bool_operand() {
        let errors = check_err("int main() { bool b; int a; b = !a; return 0; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NonBoolLogical);
    }

    #[test]
    fn type_mismatch_on_assignment_reports_at_the_left_side() {
        let errors = check_err("int main() { int a; a = tru; return 0; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!((errors[0].line, errors[0].column), (1, 21));
    }

    #[test]
    fn assignment_bans_before_the_mismatch_check() {
        let errors = check_err(
            "struct point { int x; };
             struct point p;
             struct point q;
             int f() { return 0; }
             int g() { return 0; }
             int main() { p = q; f = g; point = point; return 0; }",
        );
        assert_eq!(errors[0].kind, ErrorKind::StructVarAssign);
        assert_eq!(errors[1].kind, ErrorKind::FnAssign);
        assert_eq!(errors[2].kind, ErrorKind::StructNameAssign);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn equality_category_bans() {
        let errors = check_err(
            "void v() { }
             int f() { return 0; }
             int main() {
                 bool b;
                 b = v() == v();
                 b = f == f;
                 return 0;
             }",
        );
        assert_eq!(errors[0].kind, ErrorKind::EqualityVoidFns);
        assert_eq!(errors[1].kind, ErrorKind::EqualityFns);
        // both assignments see error types afterwards, so no cascades
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn equality_type_mismatch() {
        let errors = check_err("int main() { bool b; int a; b = a == b; return 0; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn conditions_and_repeat_clause() {
        let errors = check_err(
            "int main() {
                 int a;
                 if (a) { }
                 while (a) { }
                 repeat (tru) { }
                 return 0;
             }",
        );
        assert_eq!(errors[0].kind, ErrorKind::NonBoolIf);
        assert_eq!(errors[1].kind, ErrorKind::NonBoolWhile);
        assert_eq!(errors[2].kind, ErrorKind::NonIntRepeat);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn increment_requires_an_int() {
        let errors = check_err("int main() { bool b; ++b; return 0; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NonNumericArith);
    }

    #[test]
    fn print_and_receive_operand_bans() {
        let errors = check_err(
            "struct point { int x; };
             struct point p;
             void v() { }
             int main() {
                 print << v;
                 print << v();
                 print << p;
                 receive >> point;
                 return 0;
             }",
        );
        assert_eq!(errors[0].kind, ErrorKind::WriteFn);
        assert_eq!(errors[1].kind, ErrorKind::WriteVoid);
        assert_eq!(errors[2].kind, ErrorKind::WriteStructVar);
        assert_eq!(errors[3].kind, ErrorKind::ReadStructName);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn print_records_the_operand_type_for_codegen() {
        let tokens = Scanner::new("int main() { print << \"hi\"; return 0; }")
            .scan_token()
            .unwrap();
        let mut program = Parser::new(tokens).parse().unwrap();
        NameAnalyzer::new().analyze(&mut program).unwrap();
        TypeChecker::new().check(&mut program).unwrap();

        let Declaration::Fn(main) = &program[0] else {
            panic!("expected function")
        };
        let Stmt::Print { exp_type, .. } = &main.body.stmts[0] else {
            panic!("expected print")
        };
        assert_eq!(*exp_type, Some(Type::String));
    }

    #[test]
    fn return_rules() {
        let errors = check_err(
            "void v() { return 3; }
             int f() { return; }
             int g() { return tru; }
             int main() { return 0; }",
        );
        assert_eq!(errors[0].kind, ErrorKind::ReturnValueInVoid);
        assert_eq!(errors[1].kind, ErrorKind::MissingReturn);
        assert_eq!((errors[1].line, errors[1].column), (0, 0));
        assert_eq!(errors[2].kind, ErrorKind::BadReturnValue);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn call_rules() {
        let errors = check_err(
            "int a;
             int f(int x, bool y) { return 0; }
             int main() {
                 int r;
                 r = a();
                 r = f(1);
                 r = f(1, 2);
                 return 0;
             }",
        );
        assert_eq!(errors[0].kind, ErrorKind::CallNonFn);
        assert_eq!(errors[1].kind, ErrorKind::WrongArgCount);
        assert_eq!(errors[2].kind, ErrorKind::ArgTypeMismatch);
        // r = a() assigns an error type silently; r = f(1) still yields
        // int, so neither assignment cascades
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn well_typed_program_passes() {
        check(
            "struct point { int x; int y; };
             struct point p;
             int add(int a, int b) { return a + b; }
             int main() {
                 int n;
                 p.x = 3;
                 n = add(p.x, 4);
                 print << n;
                 if (n > 5 && tru) { print << \"big\"; }
                 return 0;
             }",
        )
        .unwrap();
    }
}
