use crate::compiler::parser::hir::expr::{indent_fmt, Ident, PrintIndent};
use crate::compiler::parser::hir::stmt::Block;

/// A type as written in a declaration. Resolution to a [type
/// value](crate::compiler::common::types::Type) happens in name analysis,
/// where struct names are looked up and linked.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Int,
    Bool,
    Void,
    Struct(Ident),
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub ty: TypeSpec,
    pub name: Ident,
}

#[derive(Debug, Clone)]
pub struct FormalDecl {
    pub ty: TypeSpec,
    pub name: Ident,
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub ret: TypeSpec,
    pub name: Ident,
    pub formals: Vec<FormalDecl>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Ident,
    pub fields: Vec<VarDecl>,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
}

fn type_str(spec: &TypeSpec) -> String {
    match spec {
        TypeSpec::Int => "int".to_string(),
        TypeSpec::Bool => "bool".to_string(),
        TypeSpec::Void => "void".to_string(),
        TypeSpec::Struct(id) => format!("struct {}", id.name),
    }
}

impl PrintIndent for VarDecl {
    fn print_indent(&self, _indent_level: usize) -> String {
        format!("VarDecl: {} '{}'", type_str(&self.ty), self.name.name)
    }
}

impl PrintIndent for Declaration {
    fn print_indent(&self, indent_level: usize) -> String {
        match self {
            Declaration::Var(var) => var.print_indent(indent_level),
            Declaration::Fn(func) => {
                let formals = func
                    .formals
                    .iter()
                    .map(|formal| format!("{} '{}'", type_str(&formal.ty), formal.name.name))
                    .collect::<Vec<String>>()
                    .join(", ");
                format!(
                    "FnDecl: {} '{}'({})\n{}",
                    type_str(&func.ret),
                    func.name.name,
                    formals,
                    indent_fmt(&func.body, indent_level + 1)
                )
            }
            Declaration::Struct(decl) => {
                let fields = decl
                    .fields
                    .iter()
                    .map(|field| indent_fmt(field, indent_level + 1))
                    .collect::<Vec<String>>()
                    .join("\n");
                format!("StructDecl: '{}'\n{}", decl.name.name, fields)
            }
        }
    }
}

impl std::fmt::Display for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", indent_fmt(self, 0))
    }
}
