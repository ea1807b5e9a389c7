use crate::compiler::common::environment::{StructRef, SymbolRef};
use crate::compiler::common::error::Location;

/// An occurrence of a name. After name analysis every resolved occurrence
/// carries a link to its symbol.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub line: i32,
    pub column: i32,
    pub symbol: Option<SymbolRef>,
}

impl Ident {
    pub fn new(name: String, line: i32, column: i32) -> Self {
        Ident {
            name,
            line,
            column,
            symbol: None,
        }
    }

    /// The linked symbol. Only valid after name analysis succeeded.
    pub fn symbol(&self) -> &SymbolRef {
        self.symbol
            .as_ref()
            .expect("identifier not linked during name analysis")
    }
}

impl Location for Ident {
    fn line(&self) -> i32 {
        self.line
    }
    fn column(&self) -> i32 {
        self.column
    }
}

/// Field access `loc.field`. `struct_def` is set by name analysis when the
/// accessed field is itself struct-typed, so an enclosing dot-access can
/// continue the chain. `bad_access` suppresses cascading diagnostics once
/// one component of the chain failed to resolve.
#[derive(Debug, Clone)]
pub struct DotAccess {
    pub loc: Expr,
    pub field: Ident,
    pub struct_def: Option<StructRef>,
    pub bad_access: bool,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub lhs: Expr,
    pub rhs: Expr,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub name: Ident,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Divide,
    And,
    Or,
    Equals,
    NotEquals,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Times | BinaryOp::Divide
        )
    }
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Equals | BinaryOp::NotEquals)
    }
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq
        )
    }

    fn op_str(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Divide => "/",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEq => "<=",
            BinaryOp::GreaterEq => ">=",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit {
        value: i32,
        line: i32,
        column: i32,
    },
    StringLit {
        value: String,
        line: i32,
        column: i32,
    },
    True {
        line: i32,
        column: i32,
    },
    False {
        line: i32,
        column: i32,
    },
    Id(Ident),
    Dot(Box<DotAccess>),
    Assign(Box<AssignExpr>),
    Call(CallExpr),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Location for Expr {
    // binary and assignment expressions report at their left operand,
    // dot-access at its field, calls at the callee name, unary at the
    // operand
    fn line(&self) -> i32 {
        match self {
            Expr::IntLit { line, .. }
            | Expr::StringLit { line, .. }
            | Expr::True { line, .. }
            | Expr::False { line, .. } => *line,
            Expr::Id(id) => id.line,
            Expr::Dot(dot) => dot.field.line,
            Expr::Assign(assign) => assign.lhs.line(),
            Expr::Call(call) => call.name.line,
            Expr::Unary { operand, .. } => operand.line(),
            Expr::Binary { left, .. } => left.line(),
        }
    }

    fn column(&self) -> i32 {
        match self {
            Expr::IntLit { column, .. }
            | Expr::StringLit { column, .. }
            | Expr::True { column, .. }
            | Expr::False { column, .. } => *column,
            Expr::Id(id) => id.column,
            Expr::Dot(dot) => dot.field.column,
            Expr::Assign(assign) => assign.lhs.column(),
            Expr::Call(call) => call.name.column,
            Expr::Unary { operand, .. } => operand.column(),
            Expr::Binary { left, .. } => left.column(),
        }
    }
}

pub trait PrintIndent {
    fn print_indent(&self, indent_level: usize) -> String;
}

pub fn indent_fmt<T: PrintIndent>(object: &T, indent_level: usize) -> String {
    format!(
        "{}{}",
        "-".repeat(indent_level),
        object.print_indent(indent_level)
    )
}

impl PrintIndent for Expr {
    fn print_indent(&self, indent_level: usize) -> String {
        match self {
            Expr::IntLit { value, .. } => format!("IntLit: {}", value),
            Expr::StringLit { value, .. } => format!("StringLit: {:?}", value),
            Expr::True { .. } => "BoolLit: tru".to_string(),
            Expr::False { .. } => "BoolLit: fls".to_string(),
            Expr::Id(id) => format!("Ident: '{}'", id.name),
            Expr::Dot(dot) => format!(
                "DotAccess: '{}'\n{}",
                dot.field.name,
                indent_fmt(&dot.loc, indent_level + 1)
            ),
            Expr::Assign(assign) => format!(
                "Assign:\n{}\n{}",
                indent_fmt(&assign.lhs, indent_level + 1),
                indent_fmt(&assign.rhs, indent_level + 1)
            ),
            Expr::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| indent_fmt(arg, indent_level + 1))
                    .collect::<Vec<String>>()
                    .join("\n");
                if args.is_empty() {
                    format!("Call: '{}'", call.name.name)
                } else {
                    format!("Call: '{}'\n{}", call.name.name, args)
                }
            }
            Expr::Unary { op, operand } => {
                let op = match op {
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "!",
                };
                format!("Unary: '{}'\n{}", op, indent_fmt(operand.as_ref(), indent_level + 1))
            }
            Expr::Binary { op, left, right } => format!(
                "Binary: '{}'\n{}\n{}",
                op.op_str(),
                indent_fmt(left.as_ref(), indent_level + 1),
                indent_fmt(right.as_ref(), indent_level + 1)
            ),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", indent_fmt(self, 0))
    }
}
