use crate::compiler::common::types::Type;
use crate::compiler::parser::hir::decl::VarDecl;
use crate::compiler::parser::hir::expr::*;

/// A braced body: declarations first, then statements. `if`/`while`/
/// `repeat` bodies and function bodies all share this shape and each opens
/// its own scope during name analysis.
#[derive(Debug, Clone)]
pub struct Block {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign(AssignExpr),
    PreInc(Expr),
    PreDec(Expr),

    /// `receive >> loc`. The operand type is recorded by the type checker.
    Receive {
        exp: Expr,
        exp_type: Option<Type>,
    },

    /// `print << exp`. The operand type decides the print syscall.
    Print {
        exp: Expr,
        exp_type: Option<Type>,
    },

    If {
        cond: Expr,
        body: Block,
    },
    IfElse {
        cond: Expr,
        then: Block,
        otherwise: Block,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Repeat {
        cond: Expr,
        body: Block,
    },
    Call(CallExpr),
    Return {
        value: Option<Expr>,
    },
}

impl PrintIndent for Block {
    fn print_indent(&self, indent_level: usize) -> String {
        self.decls
            .iter()
            .map(|decl| indent_fmt(decl, indent_level))
            .chain(self.stmts.iter().map(|stmt| indent_fmt(stmt, indent_level)))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

impl PrintIndent for Stmt {
    fn print_indent(&self, indent_level: usize) -> String {
        match self {
            Stmt::Assign(assign) => format!(
                "AssignStmt:\n{}\n{}",
                indent_fmt(&assign.lhs, indent_level + 1),
                indent_fmt(&assign.rhs, indent_level + 1)
            ),
            Stmt::PreInc(exp) => format!("PreInc:\n{}", indent_fmt(exp, indent_level + 1)),
            Stmt::PreDec(exp) => format!("PreDec:\n{}", indent_fmt(exp, indent_level + 1)),
            Stmt::Receive { exp, .. } => {
                format!("Receive:\n{}", indent_fmt(exp, indent_level + 1))
            }
            Stmt::Print { exp, .. } => format!("Print:\n{}", indent_fmt(exp, indent_level + 1)),
            Stmt::If { cond, body } => format!(
                "If:\n{}\n{}",
                indent_fmt(cond, indent_level + 1),
                indent_fmt(body, indent_level + 1)
            ),
            Stmt::IfElse { cond, then, otherwise } => format!(
                "IfElse:\n{}\n{}\n{}",
                indent_fmt(cond, indent_level + 1),
                indent_fmt(then, indent_level + 1),
                indent_fmt(otherwise, indent_level + 1)
            ),
            Stmt::While { cond, body } => format!(
                "While:\n{}\n{}",
                indent_fmt(cond, indent_level + 1),
                indent_fmt(body, indent_level + 1)
            ),
            Stmt::Repeat { cond, body } => format!(
                "Repeat:\n{}\n{}",
                indent_fmt(cond, indent_level + 1),
                indent_fmt(body, indent_level + 1)
            ),
            Stmt::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| indent_fmt(arg, indent_level + 1))
                    .collect::<Vec<String>>()
                    .join("\n");
                if args.is_empty() {
                    format!("CallStmt: '{}'", call.name.name)
                } else {
                    format!("CallStmt: '{}'\n{}", call.name.name, args)
                }
            }
            Stmt::Return { value: Some(exp) } => {
                format!("Return:\n{}", indent_fmt(exp, indent_level + 1))
            }
            Stmt::Return { value: None } => "Return".to_string(),
        }
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", indent_fmt(self, 0))
    }
}
