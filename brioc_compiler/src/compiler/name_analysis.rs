//! Binds every use of a name to its declaration, enforces the scoping
//! rules and assigns frame offsets to locals and parameters.

use crate::compiler::common::environment::*;
use crate::compiler::common::error::*;
use crate::compiler::common::types::Type;
use crate::compiler::parser::hir::{decl::*, expr::*, stmt::*};

use std::rc::Rc;

pub struct NameAnalyzer {
    table: SymbolTable,
    errors: Vec<Error>,

    // number of local slots handed out in the current function; nested
    // block scopes keep counting so the frame covers every local
    local_count: i32,
}

impl NameAnalyzer {
    pub fn new() -> Self {
        NameAnalyzer {
            table: SymbolTable::new(),
            errors: Vec::new(),
            local_count: 0,
        }
    }

    pub fn analyze(mut self, program: &mut [Declaration]) -> Result<(), Vec<Error>> {
        for decl in program.iter_mut() {
            self.declaration(decl);
        }

        // the program must define a function named main at global scope
        match self.table.get("main") {
            Some(symbol) if symbol.borrow().is_function() => (),
            _ => self.errors.push(Error::program_level(ErrorKind::NoMain)),
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn declaration(&mut self, decl: &mut Declaration) {
        match decl {
            Declaration::Var(var) => self.var_decl(var),
            Declaration::Fn(func) => self.fn_decl(func),
            Declaration::Struct(decl) => self.struct_decl(decl),
        }
    }

    /// Resolves the written type of a variable-like declaration, reporting
    /// void and unknown-struct errors. `None` means the declaration is bad
    /// and must not be inserted.
    fn resolve_var_type(&mut self, var: &mut VarDecl) -> Option<Type> {
        match &mut var.ty {
            TypeSpec::Void => {
                self.errors.push(Error::new(&var.name, ErrorKind::NonFunctionVoid));
                None
            }
            TypeSpec::Int => Some(Type::Int),
            TypeSpec::Bool => Some(Type::Bool),
            TypeSpec::Struct(type_name) => self.resolve_struct_type(type_name).map(Type::Struct),
        }
    }

    /// Looks up a struct type name and links it to its definition
    fn resolve_struct_type(&mut self, type_name: &mut Ident) -> Option<StructRef> {
        let symbol = self.table.get(&type_name.name);
        let def = symbol.as_ref().and_then(|symbol| match &*symbol.borrow() {
            Symbol::StructDef(def) => Some(Rc::clone(def)),
            _ => None,
        });

        match def {
            Some(def) => {
                type_name.symbol = symbol;
                Some(def)
            }
            None => {
                self.errors.push(Error::new(type_name, ErrorKind::InvalidStructType));
                None
            }
        }
    }

    fn next_local_offset(&mut self) -> i32 {
        let offset = -8 - 4 * self.local_count;
        self.local_count += 1;
        offset
    }

    fn var_decl(&mut self, var: &mut VarDecl) {
        let ty = self.resolve_var_type(var);

        // the duplicate check runs even for a bad type so both causes get
        // their own diagnostic
        let duplicate = self.table.get_current(&var.name.name).is_some();
        if duplicate {
            self.errors.push(Error::new(&var.name, ErrorKind::MultiplyDeclared));
        }

        if let (Some(ty), false) = (ty, duplicate) {
            let (storage, offset) = if self.table.is_global_scope() {
                (Storage::Global, 0)
            } else {
                (Storage::Local, self.next_local_offset())
            };
            let symbol = self
                .table
                .declare(var.name.name.clone(), Symbol::Variable { ty, storage, offset })
                .expect("duplicate checked above");
            var.name.symbol = Some(symbol);
        }
    }

    fn fn_decl(&mut self, func: &mut FnDecl) {
        let ret = self.return_type(&mut func.ret);

        // a duplicate function is still analyzed for diagnostic coverage,
        // it just doesn't get a symbol
        let mut fn_symbol = None;
        if self.table.get_current(&func.name.name).is_some() {
            self.errors.push(Error::new(&func.name, ErrorKind::MultiplyDeclared));
        } else {
            let symbol = self
                .table
                .declare(
                    func.name.name.clone(),
                    Symbol::Function {
                        ret,
                        params: Vec::new(),
                        arity: func.formals.len(),
                        frame_bytes: 0,
                    },
                )
                .expect("duplicate checked above");
            func.name.symbol = Some(Rc::clone(&symbol));
            fn_symbol = Some(symbol);
        }

        self.local_count = 0;
        self.table.enter();

        // first formal sits highest above the frame pointer
        let count = func.formals.len() as i32;
        let mut param_types = Vec::new();
        for (i, formal) in func.formals.iter_mut().enumerate() {
            if let Some(ty) = self.formal_decl(formal, 4 * (count - i as i32)) {
                param_types.push(ty);
            }
        }
        if let Some(symbol) = &fn_symbol {
            if let Symbol::Function { params, .. } = &mut *symbol.borrow_mut() {
                *params = param_types;
            }
        }

        for decl in func.body.decls.iter_mut() {
            self.var_decl(decl);
        }
        for stmt in func.body.stmts.iter_mut() {
            self.statement(stmt);
        }

        // the frame must hold every local declared anywhere in the body,
        // nested scopes included
        if let Some(symbol) = &fn_symbol {
            if let Symbol::Function { frame_bytes, .. } = &mut *symbol.borrow_mut() {
                *frame_bytes = 4 * self.local_count;
            }
        }
        self.table.exit().expect("function scope still open");
    }

    fn return_type(&mut self, spec: &mut TypeSpec) -> Type {
        match spec {
            TypeSpec::Int => Type::Int,
            TypeSpec::Bool => Type::Bool,
            TypeSpec::Void => Type::Void,
            TypeSpec::Struct(type_name) => match self.resolve_struct_type(type_name) {
                Some(def) => Type::Struct(def),
                None => Type::Error,
            },
        }
    }

    fn formal_decl(&mut self, formal: &mut FormalDecl, offset: i32) -> Option<Type> {
        let mut bad_decl = false;

        let ty = match &mut formal.ty {
            TypeSpec::Void => {
                self.errors.push(Error::new(&formal.name, ErrorKind::NonFunctionVoid));
                bad_decl = true;
                None
            }
            TypeSpec::Int => Some(Type::Int),
            TypeSpec::Bool => Some(Type::Bool),
            TypeSpec::Struct(type_name) => {
                let def = self.resolve_struct_type(type_name);
                if def.is_none() {
                    bad_decl = true;
                }
                def.map(Type::Struct)
            }
        };

        if self.table.get_current(&formal.name.name).is_some() {
            self.errors.push(Error::new(&formal.name, ErrorKind::MultiplyDeclared));
            bad_decl = true;
        }

        if bad_decl {
            return None;
        }

        let ty = ty.expect("bad formals returned above");
        let symbol = self
            .table
            .declare(
                formal.name.name.clone(),
                Symbol::Variable {
                    ty: ty.clone(),
                    storage: Storage::Param,
                    offset,
                },
            )
            .expect("duplicate checked above");
        formal.name.symbol = Some(symbol);
        Some(ty)
    }

    fn struct_decl(&mut self, decl: &mut StructDecl) {
        let duplicate = self.table.get_current(&decl.name.name).is_some();
        if duplicate {
            self.errors.push(Error::new(&decl.name, ErrorKind::MultiplyDeclared));
        }

        // fields live in the definition's own table; struct-typed fields
        // still resolve against the enclosing scopes
        let def = Rc::new(std::cell::RefCell::new(StructDef::new(decl.name.name.clone())));
        let mut offset = 0;
        for field in decl.fields.iter_mut() {
            let Some(ty) = self.resolve_var_type(field) else {
                continue;
            };
            if def.borrow().get_field(&field.name.name).is_some() {
                self.errors.push(Error::new(&field.name, ErrorKind::MultiplyDeclared));
                continue;
            }

            let symbol = Rc::new(std::cell::RefCell::new(Symbol::Variable {
                ty,
                storage: Storage::Local,
                offset,
            }));
            def.borrow_mut().declare_field(field.name.name.clone(), Rc::clone(&symbol));
            field.name.symbol = Some(symbol);
            offset += 4;
        }

        if !duplicate {
            let symbol = self
                .table
                .declare(decl.name.name.clone(), Symbol::StructDef(def))
                .expect("duplicate checked above");
            decl.name.symbol = Some(symbol);
        }
    }

    fn scoped_block(&mut self, block: &mut Block) {
        self.table.enter();
        for decl in block.decls.iter_mut() {
            self.var_decl(decl);
        }
        for stmt in block.stmts.iter_mut() {
            self.statement(stmt);
        }
        self.table.exit().expect("block scope still open");
    }

    fn statement(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Assign(assign) => {
                self.expression(&mut assign.lhs);
                self.expression(&mut assign.rhs);
            }
            Stmt::PreInc(exp) | Stmt::PreDec(exp) => self.expression(exp),
            Stmt::Receive { exp, .. } | Stmt::Print { exp, .. } => self.expression(exp),
            Stmt::If { cond, body } | Stmt::While { cond, body } | Stmt::Repeat { cond, body } => {
                self.expression(cond);
                self.scoped_block(body);
            }
            Stmt::IfElse { cond, then, otherwise } => {
                self.expression(cond);
                self.scoped_block(then);
                self.scoped_block(otherwise);
            }
            Stmt::Call(call) => self.call(call),
            Stmt::Return { value } => {
                if let Some(exp) = value {
                    self.expression(exp);
                }
            }
        }
    }

    fn expression(&mut self, exp: &mut Expr) {
        match exp {
            Expr::Id(id) => self.ident(id),
            Expr::Dot(dot) => self.dot_access(dot),
            Expr::Assign(assign) => {
                self.expression(&mut assign.lhs);
                self.expression(&mut assign.rhs);
            }
            Expr::Call(call) => self.call(call),
            Expr::Unary { operand, .. } => self.expression(operand),
            Expr::Binary { left, right, .. } => {
                self.expression(left);
                self.expression(right);
            }
            Expr::IntLit { .. } | Expr::StringLit { .. } | Expr::True { .. } | Expr::False { .. } => {
            }
        }
    }

    fn ident(&mut self, id: &mut Ident) {
        match self.table.get(&id.name) {
            Some(symbol) => id.symbol = Some(symbol),
            None => self.errors.push(Error::new(id, ErrorKind::UndeclaredIdent)),
        }
    }

    fn call(&mut self, call: &mut CallExpr) {
        self.ident(&mut call.name);
        for arg in call.args.iter_mut() {
            self.expression(arg);
        }
    }

    /// Resolves `loc.field`. The left side must name a struct variable;
    /// once one component of a chain fails, `bad_access` suppresses the
    /// diagnostics that would cascade from it.
    fn dot_access(&mut self, dot: &mut DotAccess) {
        dot.bad_access = false;
        dot.struct_def = None;
        self.expression(&mut dot.loc);

        let def: Option<StructRef> = match &dot.loc {
            Expr::Id(id) => match &id.symbol {
                // lhs was undeclared, which is already reported
                None => {
                    dot.bad_access = true;
                    None
                }
                Some(symbol) => {
                    let def = symbol.borrow().struct_def();
                    if def.is_none() {
                        self.errors.push(Error::new(&dot.loc, ErrorKind::DotAccessNonStruct));
                        dot.bad_access = true;
                    }
                    def
                }
            },
            Expr::Dot(inner) => {
                if inner.bad_access {
                    dot.bad_access = true;
                    None
                } else if inner.struct_def.is_none() {
                    // the inner field resolved but is not struct-typed
                    self.errors.push(Error::new(&dot.loc, ErrorKind::DotAccessNonStruct));
                    dot.bad_access = true;
                    None
                } else {
                    inner.struct_def.clone()
                }
            }
            _ => unreachable!("parser only produces ids and dot-accesses left of '.'"),
        };

        let Some(def) = def else {
            return;
        };

        let field_symbol = def.borrow().get_field(&dot.field.name);
        match field_symbol {
            None => {
                self.errors.push(Error::new(&dot.field, ErrorKind::InvalidStructField));
                dot.bad_access = true;
            }
            Some(field_symbol) => {
                // a struct-typed field lets an enclosing access continue
                // the chain through this node
                dot.struct_def = field_symbol.borrow().struct_def();
                dot.field.symbol = Some(field_symbol);
            }
        }
    }
}
