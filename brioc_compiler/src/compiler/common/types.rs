//! The type values computed for declarations and expressions

use crate::compiler::common::environment::StructRef;
use std::fmt::Display;
use std::rc::Rc;

/// The type of a declaration or expression. `Struct` is the type of a
/// variable declared with a struct type; `StructDef` is what the struct's
/// own name refers to. The two must stay distinct: the checker bans
/// different operations on each.
#[derive(Debug, Clone)]
pub enum Type {
    Int,
    Bool,
    Void,
    String,
    Struct(StructRef),
    StructDef(StructRef),
    Function { params: Vec<Type>, ret: Box<Type> },

    /// Synthetic type silencing cascading diagnostics after the first
    /// error on an expression subtree
    Error,
}

impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        match (self, other) {
            // Error compares unequal to everything, itself included, so
            // that a poisoned operand can never satisfy a type-match rule
            (Type::Error, _) | (_, Type::Error) => false,

            (Type::Int, Type::Int)
            | (Type::Bool, Type::Bool)
            | (Type::Void, Type::Void)
            | (Type::String, Type::String) => true,

            // struct types are equal iff they name the same definition,
            // not iff their definitions are spelled the same
            (Type::Struct(left), Type::Struct(right))
            | (Type::StructDef(left), Type::StructDef(right)) => Rc::ptr_eq(left, right),

            (
                Type::Function { params: params1, ret: ret1 },
                Type::Function { params: params2, ret: ret2 },
            ) => params1 == params2 && ret1 == ret2,

            _ => false,
        }
    }
}

impl Type {
    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int)
    }
    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
    pub fn is_string(&self) -> bool {
        matches!(self, Type::String)
    }
    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }
    pub fn is_struct_def(&self) -> bool {
        matches!(self, Type::StructDef(_))
    }
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::String => write!(f, "string"),
            Type::Struct(def) | Type::StructDef(def) => {
                write!(f, "struct {}", def.borrow().name)
            }
            Type::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<String>>()
                    .join(",");
                write!(f, "{}({})", ret, params)
            }
            Type::Error => write!(f, "<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::common::environment::StructDef;
    use std::cell::RefCell;

    fn struct_ref(name: &str) -> StructRef {
        Rc::new(RefCell::new(StructDef::new(name.to_string())))
    }

    #[test]
    fn error_type_is_unequal_to_everything() {
        assert_ne!(Type::Error, Type::Error);
        assert_ne!(Type::Error, Type::Int);
        assert_ne!(Type::Int, Type::Error);
        assert_ne!(Type::Error, Type::Struct(struct_ref("point")));
    }

    #[test]
    fn struct_types_compare_by_definition_identity() {
        let point = struct_ref("point");
        let other_point = struct_ref("point");

        assert_eq!(Type::Struct(Rc::clone(&point)), Type::Struct(Rc::clone(&point)));
        // same spelling, different definition
        assert_ne!(Type::Struct(Rc::clone(&point)), Type::Struct(other_point));
        // a struct variable is not the struct name
        assert_ne!(Type::Struct(Rc::clone(&point)), Type::StructDef(point));
    }

    #[test]
    fn function_types_compare_structurally() {
        let f = Type::Function {
            params: vec![Type::Int, Type::Bool],
            ret: Box::new(Type::Void),
        };
        let same = Type::Function {
            params: vec![Type::Int, Type::Bool],
            ret: Box::new(Type::Void),
        };
        let other = Type::Function {
            params: vec![Type::Int],
            ret: Box::new(Type::Void),
        };
        assert_eq!(f, same);
        assert_ne!(f, other);
    }
}
