//! The symbol-table used to store information about variables, functions
//! and struct definitions

use crate::compiler::common::types::Type;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type SymbolRef = Rc<RefCell<Symbol>>;
pub type StructRef = Rc<RefCell<StructDef>>;

/// Where a variable lives at runtime, deciding how its address is formed
/// during code generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Storage {
    Global,
    Local,
    Param,
}

/// A struct definition: its name and the symbols of its fields. Variables
/// of the struct's type share one definition via [StructRef], so two such
/// variables have equal types exactly when they reference the same
/// definition.
#[derive(Debug, PartialEq)]
pub struct StructDef {
    pub name: String,
    fields: HashMap<String, SymbolRef>,
}

impl StructDef {
    pub fn new(name: String) -> Self {
        StructDef { name, fields: HashMap::new() }
    }

    pub fn declare_field(&mut self, name: String, symbol: SymbolRef) {
        self.fields.insert(name, symbol);
    }

    pub fn get_field(&self, name: &str) -> Option<SymbolRef> {
        self.fields.get(name).map(Rc::clone)
    }
}

/// The information stored for a name in the symbol-table
#[derive(Debug, PartialEq)]
pub enum Symbol {
    /// A global, local, parameter or struct-field declaration. For
    /// variables of struct type `ty` is [Type::Struct], which carries the
    /// defining struct's [StructRef].
    Variable {
        ty: Type,
        storage: Storage,
        /// Byte offset from the frame pointer; negative for locals,
        /// positive for parameters, meaningless for globals
        offset: i32,
    },

    /// A function declaration. `arity` is the declared parameter count,
    /// which can exceed `params.len()` when a formal was itself bad.
    /// `frame_bytes` is the size of the local portion of the activation
    /// record, known once the whole body has been analyzed.
    Function {
        ret: Type,
        params: Vec<Type>,
        arity: usize,
        frame_bytes: i32,
    },

    /// The name of a struct type itself
    StructDef(StructRef),
}

impl Symbol {
    /// The type this symbol contributes to an expression naming it
    pub fn ty(&self) -> Type {
        match self {
            Symbol::Variable { ty, .. } => ty.clone(),
            Symbol::Function { ret, params, .. } => Type::Function {
                params: params.clone(),
                ret: Box::new(ret.clone()),
            },
            Symbol::StructDef(def) => Type::StructDef(Rc::clone(def)),
        }
    }

    /// For a variable of struct type, the definition of that struct
    pub fn struct_def(&self) -> Option<StructRef> {
        match self {
            Symbol::Variable { ty: Type::Struct(def), .. } => Some(Rc::clone(def)),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function { .. })
    }

    pub fn storage(&self) -> Storage {
        match self {
            Symbol::Variable { storage, .. } => *storage,
            _ => unreachable!("only variables have a storage class"),
        }
    }

    pub fn offset(&self) -> i32 {
        match self {
            Symbol::Variable { offset, .. } => *offset,
            _ => unreachable!("only variables have a frame offset"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum TableError {
    /// A scope operation ran on a table whose scopes were all popped
    EmptyTable,
    /// The name is already bound in the innermost scope
    Duplicate(String),
}

type Scope = HashMap<String, SymbolRef>;

/// A stack of scopes, outermost first. The table starts with the single
/// global scope already in place and must never be empty while
/// declarations or uses are processed.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { scopes: vec![Scope::new()] }
    }

    pub fn enter(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn exit(&mut self) -> Result<(), TableError> {
        self.scopes.pop().map(|_| ()).ok_or(TableError::EmptyTable)
    }

    pub fn is_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Binds `name` in the innermost scope. Outer bindings of the same
    /// name are shadowed, not rejected.
    pub fn declare(&mut self, name: String, symbol: Symbol) -> Result<SymbolRef, TableError> {
        let scope = self.scopes.last_mut().ok_or(TableError::EmptyTable)?;
        if scope.contains_key(&name) {
            return Err(TableError::Duplicate(name));
        }

        let symbol = Rc::new(RefCell::new(symbol));
        scope.insert(name, Rc::clone(&symbol));
        Ok(symbol)
    }

    /// Checks the innermost scope only
    pub fn get_current(&self, name: &str) -> Option<SymbolRef> {
        self.scopes.last().and_then(|scope| scope.get(name)).map(Rc::clone)
    }

    /// Scans innermost to outermost and returns the first binding
    pub fn get(&self, name: &str) -> Option<SymbolRef> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.get(name) {
                return Some(Rc::clone(symbol));
            }
        }
        None
    }
}
