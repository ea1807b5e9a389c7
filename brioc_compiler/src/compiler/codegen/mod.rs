//! Lowers the checked AST to MIPS-style stack-machine assembly. Every
//! expression leaves exactly one word on the stack; statements pop what
//! they consume, so the stack is balanced around every statement.

pub mod emitter;
pub mod register;

use crate::compiler::codegen::emitter::Emitter;
use crate::compiler::codegen::register::*;
use crate::compiler::common::environment::{Storage, Symbol};
use crate::compiler::common::types::Type;
use crate::compiler::parser::hir::{decl::*, expr::*, stmt::*};

pub struct Codegen {
    emitter: Emitter,

    // decides whether the exit sequence ends in syscall 10 or jr $ra
    in_main: bool,
}

impl Codegen {
    pub fn new() -> Self {
        Codegen {
            emitter: Emitter::new(),
            in_main: false,
        }
    }

    pub fn generate(mut self, program: &[Declaration]) -> String {
        for decl in program {
            match decl {
                Declaration::Var(var) => self.global_var(var),
                Declaration::Fn(func) => self.function(func),
                // struct layout exists only at name-analysis level
                Declaration::Struct(_) => (),
            }
        }
        self.emitter.finish()
    }

    fn global_var(&mut self, var: &VarDecl) {
        // every global occupies a single word
        self.emitter.directive(".data");
        self.emitter.directive(".align 2");
        self.emitter
            .labeled_directive(&format!("_{}", var.name.name), ".space 4");
    }

    fn function(&mut self, func: &FnDecl) {
        self.in_main = func.name.name == "main";
        let frame_bytes = match &*func.name.symbol().borrow() {
            Symbol::Function { frame_bytes, .. } => *frame_bytes,
            _ => unreachable!("function declaration linked to non-function symbol"),
        };

        self.emitter.directive(".text");
        if self.in_main {
            self.emitter.directive(".globl main");
            self.emitter.label("main");
        } else {
            self.emitter.label(&format!("_{}", func.name.name));
        }

        // entry: save the return address and control link, anchor $fp
        // above them, then open the local frame
        self.emitter.push(RA);
        self.emitter.push(FP);
        self.emitter.instr("addu", &[FP, SP, "8"]);
        self.emitter.instr("subu", &[SP, SP, &frame_bytes.to_string()]);

        self.stmts(&func.body.stmts);

        self.exit_sequence();
    }

    /// Tears the frame down and leaves the function. `$fp` still holds the
    /// saved return address at `0($fp)` and the control link at `-4($fp)`.
    fn exit_sequence(&mut self) {
        self.emitter.indexed("lw", RA, FP, 0);
        self.emitter.instr("move", &[T0, FP]);
        self.emitter.indexed("lw", FP, FP, -4);
        self.emitter.instr("move", &[SP, T0]);
        if self.in_main {
            self.emitter.instr("li", &[V0, "10"]);
            self.emitter.instr("syscall", &[]);
        } else {
            self.emitter.instr("jr", &[RA]);
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(assign) => {
                self.assign(assign);
                self.emitter.pop(T0); // result unused as a statement
            }
            Stmt::PreInc(exp) => self.step_by_one(exp, "add"),
            Stmt::PreDec(exp) => self.step_by_one(exp, "sub"),
            Stmt::Receive { exp, .. } => {
                // struct fields are not lowered
                if matches!(exp, Expr::Dot(_)) {
                    return;
                }
                self.emitter.instr("li", &[V0, "5"]);
                self.emitter.instr("syscall", &[]);

                self.location_addr(exp);
                self.emitter.pop(T0);
                self.emitter.indexed("sw", V0, T0, 0);
            }
            Stmt::Print { exp, exp_type } => {
                self.expression(exp);
                self.emitter.pop(A0);

                // strings print through syscall 4, everything else is a
                // one-word integer value
                let syscall = match exp_type {
                    Some(Type::String) => "4",
                    _ => "1",
                };
                self.emitter.instr("li", &[V0, syscall]);
                self.emitter.instr("syscall", &[]);
            }
            Stmt::If { cond, body } => {
                self.expression(cond);
                let end_label = self.emitter.next_label();

                self.emitter.pop(T0);
                self.emitter.instr("li", &[T1, "0"]);
                self.emitter.instr("beq", &[T0, T1, &end_label]);
                self.stmts(&body.stmts);
                self.emitter.label(&end_label);
            }
            Stmt::IfElse { cond, then, otherwise } => {
                self.expression(cond);
                let else_label = self.emitter.next_label();
                let exit_label = self.emitter.next_label();

                self.emitter.pop(T0);
                self.emitter.instr("li", &[T1, "0"]);
                self.emitter.instr("beq", &[T0, T1, &else_label]);
                self.stmts(&then.stmts);
                self.emitter.instr("b", &[&exit_label]);
                self.emitter.label(&else_label);
                self.stmts(&otherwise.stmts);
                self.emitter.label(&exit_label);
            }
            Stmt::While { cond, body } => {
                let top_label = self.emitter.next_label();
                let end_label = self.emitter.next_label();

                self.emitter.label(&top_label);
                self.expression(cond);
                self.emitter.pop(T0);
                self.emitter.instr("li", &[T1, "0"]);
                self.emitter.instr("beq", &[T0, T1, &end_label]);
                self.stmts(&body.stmts);
                self.emitter.instr("b", &[&top_label]);
                self.emitter.label(&end_label);
            }
            // repeat has no lowering
            Stmt::Repeat { .. } => (),
            Stmt::Call(call) => {
                self.call(call);
                self.emitter.pop(T0); // result unused as a statement
            }
            Stmt::Return { value } => {
                if let Some(exp) = value {
                    self.expression(exp);
                    self.emitter.pop(V0);
                }
                // exiting mid-body is fine, the frame teardown only needs $fp
                self.exit_sequence();
            }
        }
    }

    /// Shared lowering of `++x` and `--x`
    fn step_by_one(&mut self, exp: &Expr, op: &str) {
        // struct fields are not lowered
        if matches!(exp, Expr::Dot(_)) {
            return;
        }
        self.location_addr(exp);
        self.emitter.pop(T0);
        self.emitter.indexed("lw", T1, T0, 0);
        self.emitter.instr(op, &[T1, T1, "1"]);
        self.emitter.indexed("sw", T1, T0, 0);
    }

    /// Leaves exactly one word on the stack
    fn expression(&mut self, exp: &Expr) {
        match exp {
            Expr::IntLit { value, .. } => {
                self.emitter.instr("li", &[T0, &value.to_string()]);
                self.emitter.push(T0);
            }
            Expr::True { .. } => {
                self.emitter.instr("li", &[T0, "1"]);
                self.emitter.push(T0);
            }
            Expr::False { .. } => {
                self.emitter.instr("li", &[T0, "0"]);
                self.emitter.push(T0);
            }
            Expr::StringLit { value, .. } => {
                let label = self.emitter.string_label(value);
                self.emitter.instr("la", &[T0, &label]);
                self.emitter.push(T0);
            }
            Expr::Id(id) => {
                let (storage, offset) = {
                    let symbol = id.symbol().borrow();
                    (symbol.storage(), symbol.offset())
                };
                match storage {
                    Storage::Global => {
                        self.emitter.instr("lw", &[T0, &format!("_{}", id.name)])
                    }
                    Storage::Local | Storage::Param => {
                        self.emitter.indexed("lw", T0, FP, offset)
                    }
                }
                self.emitter.push(T0);
            }
            // struct fields have no runtime layout and are not lowered
            Expr::Dot(_) => (),
            Expr::Assign(assign) => self.assign(assign),
            Expr::Call(call) => self.call(call),
            Expr::Unary { op: UnaryOp::Minus, operand } => {
                self.expression(operand);
                self.emitter.pop(T0);
                self.emitter.instr("li", &[T1, "0"]);
                self.emitter.instr("sub", &[T0, T1, T0]);
                self.emitter.push(T0);
            }
            Expr::Unary { op: UnaryOp::Not, operand } => {
                // booleans are always 0 or 1, so 1 - x flips them
                self.expression(operand);
                self.emitter.pop(T0);
                self.emitter.instr("li", &[T1, "1"]);
                self.emitter.instr("neg", &[T0, T0]);
                self.emitter.instr("add", &[T0, T1, T0]);
                self.emitter.push(T0);
            }
            Expr::Binary { op: BinaryOp::And, left, right } => self.short_circuit_and(left, right),
            Expr::Binary { op: BinaryOp::Or, left, right } => self.short_circuit_or(left, right),
            Expr::Binary { op, left, right } => {
                // right first, so the left operand ends up on top
                self.expression(right);
                self.expression(left);
                self.emitter.pop(T0);
                self.emitter.pop(T1);
                self.emitter.instr(mnemonic(*op), &[T0, T0, T1]);
                self.emitter.push(T0);
            }
        }
    }

    fn short_circuit_and(&mut self, left: &Expr, right: &Expr) {
        self.expression(left);
        let short_label = self.emitter.next_label();
        let exit_label = self.emitter.next_label();

        self.emitter.pop(T0);
        self.emitter.instr("li", &[T1, "0"]);
        self.emitter.instr("beq", &[T0, T1, &short_label]);

        self.expression(right);
        self.emitter.pop(T1);
        self.emitter.instr("li", &[T0, "1"]);
        self.emitter.instr("and", &[T0, T0, T1]);
        self.emitter.push(T0);
        self.emitter.instr("b", &[&exit_label]);

        // left was zero, which is still in $t0
        self.emitter.label(&short_label);
        self.emitter.push(T0);
        self.emitter.label(&exit_label);
    }

    fn short_circuit_or(&mut self, left: &Expr, right: &Expr) {
        self.expression(left);
        let short_label = self.emitter.next_label();
        let exit_label = self.emitter.next_label();

        self.emitter.pop(T0);
        self.emitter.instr("li", &[T1, "1"]);
        self.emitter.instr("beq", &[T0, T1, &short_label]);

        self.expression(right);
        self.emitter.pop(T1);
        self.emitter.instr("li", &[T0, "0"]);
        self.emitter.instr("or", &[T0, T0, T1]);
        self.emitter.push(T0);
        self.emitter.instr("b", &[&exit_label]);

        // left was one, which is still in $t0
        self.emitter.label(&short_label);
        self.emitter.push(T0);
        self.emitter.label(&exit_label);
    }

    /// Assignment as an expression: the stored value stays on the stack
    fn assign(&mut self, assign: &AssignExpr) {
        self.expression(&assign.rhs);

        match &assign.lhs {
            Expr::Id(_) => {
                self.location_addr(&assign.lhs);
                self.emitter.pop(T0); // destination address
                self.emitter.pop(T1); // value
                self.emitter.indexed("sw", T1, T0, 0);
                self.emitter.push(T1);
            }
            // struct fields are not lowered; the value is left as the
            // expression result without a store
            Expr::Dot(_) => (),
            _ => unreachable!("non-location on the left of assignment"),
        }
    }

    /// Pushes the address of a variable
    fn location_addr(&mut self, exp: &Expr) {
        let Expr::Id(id) = exp else {
            unreachable!("address taken of a non-variable");
        };

        let (storage, offset) = {
            let symbol = id.symbol().borrow();
            (symbol.storage(), symbol.offset())
        };
        match storage {
            Storage::Global => self.emitter.instr("la", &[T0, &format!("_{}", id.name)]),
            Storage::Local | Storage::Param => self.emitter.indexed("la", T0, FP, offset),
        }
        self.emitter.push(T0);
    }

    fn call(&mut self, call: &CallExpr) {
        // actuals are pushed in order, so the first argument sits highest
        for arg in &call.args {
            self.expression(arg);
        }

        let target = if call.name.name == "main" {
            "main".to_string()
        } else {
            format!("_{}", call.name.name)
        };
        self.emitter.instr("jal", &[&target]);

        // the caller drops its arguments, then publishes the return value
        self.emitter
            .instr("addu", &[SP, SP, &(4 * call.args.len()).to_string()]);
        self.emitter.push(V0);
    }
}

fn mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Plus => "add",
        BinaryOp::Minus => "sub",
        BinaryOp::Times => "mul",
        BinaryOp::Divide => "div",
        BinaryOp::Equals => "seq",
        BinaryOp::NotEquals => "sne",
        BinaryOp::Less => "slt",
        BinaryOp::Greater => "sgt",
        BinaryOp::LessEq => "sle",
        BinaryOp::GreaterEq => "sge",
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::name_analysis::NameAnalyzer;
    use crate::compiler::parser::Parser;
    use crate::compiler::scanner::Scanner;
    use crate::compiler::typechecker::TypeChecker;

    fn generate(source: &str) -> String {
        let tokens = Scanner::new(source).scan_token().unwrap();
        let mut program = Parser::new(tokens).parse().unwrap();
        NameAnalyzer::new().analyze(&mut program).unwrap();
        TypeChecker::new().check(&mut program).unwrap();
        Codegen::new().generate(&program)
    }

    // strips indentation so tests can assert on instruction sequences
    fn lines(asm: &str) -> Vec<String> {
        asm.lines().map(|line| line.trim().to_string()).collect()
    }

    fn find_sequence(haystack: &[String], needle: &[&str]) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window.iter().zip(needle.iter()).all(|(a, b)| a == b))
    }

    #[test]
    fn globals_are_one_word_of_data() {
        let asm = generate("int g; bool b; int main() { return 0; }");
        assert!(asm.contains("_g: .space 4"));
        assert!(asm.contains("_b: .space 4"));
    }

    #[test]
    fn main_gets_the_entry_label_and_exit_syscall() {
        let asm = generate("int main() { return 0; }");
        assert!(asm.contains(".globl main\nmain:\n"));

        let asm = lines(&asm);
        // entry: $ra, control link, $fp anchored 8 above its old value
        assert!(find_sequence(
            &asm,
            &[
                "subu $sp, $sp, 4",
                "sw $ra, 4($sp)",
                "subu $sp, $sp, 4",
                "sw $fp, 4($sp)",
                "addu $fp, $sp, 8",
                "subu $sp, $sp, 0",
            ]
        ));
        // exit for main is syscall 10, not jr
        assert!(find_sequence(
            &asm,
            &[
                "lw $ra, 0($fp)",
                "move $t0, $fp",
                "lw $fp, -4($fp)",
                "move $sp, $t0",
                "li $v0, 10",
                "syscall",
            ]
        ));
    }

    #[test]
    fn other_functions_return_with_jr() {
        let asm = generate("void f() { } int main() { f(); return 0; }");
        assert!(asm.contains("_f:\n"));
        assert!(lines(&asm).contains(&"jr $ra".to_string()));
    }

    #[test]
    fn frame_covers_all_locals() {
        let asm = generate(
            "int main() {
                 int a;
                 int b;
                 if (tru) { int c; }
                 return 0;
             }",
        );
        assert!(lines(&asm).contains(&"subu $sp, $sp, 12".to_string()));
    }

    #[test]
    fn locals_and_globals_are_addressed_differently() {
        let asm = generate(
            "int g;
             int main() {
                 int a;
                 a = 3;
                 g = a;
                 return 0;
             }",
        );
        let asm = lines(&asm);
        assert!(find_sequence(&asm, &["la $t0, -8($fp)"]));
        assert!(find_sequence(&asm, &["lw $t0, -8($fp)"]));
        assert!(find_sequence(&asm, &["la $t0, _g"]));
    }

    #[test]
    fn assignment_stores_and_keeps_the_value() {
        let asm = generate("int main() { int a; a = 3; return 0; }");
        let asm = lines(&asm);
        assert!(find_sequence(
            &asm,
            &[
                // pop address, pop value, store, push the value back
                "lw $t0, 4($sp)",
                "addu $sp, $sp, 4",
                "lw $t1, 4($sp)",
                "addu $sp, $sp, 4",
                "sw $t1, 0($t0)",
                "subu $sp, $sp, 4",
                "sw $t1, 4($sp)",
            ]
        ));
    }

    #[test]
    fn binary_operands_pop_left_into_t0() {
        let asm = generate("int main() { int a; a = a - 1; return 0; }");
        let asm = lines(&asm);
        // right operand is evaluated first, so the left ends up on top
        assert!(find_sequence(
            &asm,
            &[
                "li $t0, 1",
                "subu $sp, $sp, 4",
                "sw $t0, 4($sp)",
                "lw $t0, -8($fp)",
                "subu $sp, $sp, 4",
                "sw $t0, 4($sp)",
                "lw $t0, 4($sp)",
                "addu $sp, $sp, 4",
                "lw $t1, 4($sp)",
                "addu $sp, $sp, 4",
                "sub $t0, $t0, $t1",
            ]
        ));
    }

    #[test]
    fn and_skips_the_right_operand_when_left_is_false() {
        // the branch must jump past the evaluation of fls and leave the
        // zero already in $t0 on the stack
        let asm = generate("bool b; int main() { b = tru && fls; return 0; }");
        let asm = lines(&asm);
        assert!(find_sequence(
            &asm,
            &[
                "lw $t0, 4($sp)",
                "addu $sp, $sp, 4",
                "li $t1, 0",
                "beq $t0, $t1, L0",
            ]
        ));
        // short-circuit target pushes $t0 without touching the right operand
        assert!(find_sequence(
            &asm,
            &[
                "b L1",
                "L0:",
                "subu $sp, $sp, 4",
                "sw $t0, 4($sp)",
                "L1:",
            ]
        ));
    }

    #[test]
    fn or_skips_the_right_operand_when_left_is_true() {
        let asm = generate("bool b; int main() { b = fls || tru; return 0; }");
        let asm = lines(&asm);
        assert!(find_sequence(&asm, &["li $t1, 1", "beq $t0, $t1, L0"]));
    }

    #[test]
    fn string_pool_emits_one_definition_per_value() {
        let asm = generate(
            "int main() {
                 print << \"hi\";
                 print << \"hi\";
                 print << \"bye\";
                 return 0;
             }",
        );
        assert_eq!(asm.matches(".asciiz \"hi\"").count(), 1);
        assert_eq!(asm.matches(".asciiz \"bye\"").count(), 1);
    }

    #[test]
    fn print_dispatches_on_the_recorded_type() {
        let asm = generate("int main() { print << \"s\"; print << 3; return 0; }");
        let asm = lines(&asm);
        assert!(find_sequence(&asm, &["lw $a0, 4($sp)", "addu $sp, $sp, 4", "li $v0, 4", "syscall"]));
        assert!(find_sequence(&asm, &["lw $a0, 4($sp)", "addu $sp, $sp, 4", "li $v0, 1", "syscall"]));
    }

    #[test]
    fn receive_reads_before_storing() {
        let asm = generate("int main() { int a; receive >> a; return 0; }");
        let asm = lines(&asm);
        assert!(find_sequence(
            &asm,
            &[
                "li $v0, 5",
                "syscall",
                "la $t0, -8($fp)",
                "subu $sp, $sp, 4",
                "sw $t0, 4($sp)",
                "lw $t0, 4($sp)",
                "addu $sp, $sp, 4",
                "sw $v0, 0($t0)",
            ]
        ));
    }

    #[test]
    fn calls_push_args_drop_them_and_publish_v0() {
        let asm = generate(
            "int f(int a, int b) { return a + b; }
             int main() { return f(1, 2); }",
        );
        let asm = lines(&asm);
        // two words of arguments are dropped after the jump-and-link and
        // the result is pushed
        assert!(find_sequence(
            &asm,
            &[
                "jal _f",
                "addu $sp, $sp, 8",
                "subu $sp, $sp, 4",
                "sw $v0, 4($sp)",
            ]
        ));
    }

    #[test]
    fn while_loops_test_at_the_top_and_jump_back() {
        let asm = generate(
            "int main() {
                 int i;
                 i = 0;
                 while (i < 3) { ++i; }
                 return i;
             }",
        );
        let asm = lines(&asm);
        let top = asm.iter().position(|line| line == "L0:").unwrap();
        let back_jump = asm.iter().position(|line| line == "b L0").unwrap();
        assert!(top < back_jump);
        assert!(find_sequence(&asm, &["beq $t0, $t1, L1"]));
    }

    #[test]
    fn pre_increment_updates_in_place() {
        let asm = generate("int main() { int a; ++a; --a; return 0; }");
        let asm = lines(&asm);
        assert!(find_sequence(
            &asm,
            &["lw $t1, 0($t0)", "add $t1, $t1, 1", "sw $t1, 0($t0)"]
        ));
        assert!(find_sequence(
            &asm,
            &["lw $t1, 0($t0)", "sub $t1, $t1, 1", "sw $t1, 0($t0)"]
        ));
    }

    #[test]
    fn repeat_is_not_lowered() {
        let asm = generate("int main() { repeat (3) { print << 1; } return 0; }");
        // the body must not appear in the output
        assert!(!asm.contains("li $v0, 1\n\tsyscall"));
    }

    #[test]
    fn return_mid_body_still_tears_down_the_frame() {
        let asm = generate(
            "int f() { return 1; print << 2; return 2; }
             int main() { return f(); }",
        );
        // both returns emit the teardown, plus the one closing the body
        assert_eq!(lines(&asm).iter().filter(|line| *line == "jr $ra").count(), 3);
    }
}
