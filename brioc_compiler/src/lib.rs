//! Compiles brio source text to MIPS-style stack-machine assembly.
//!
//! The pipeline is strictly sequential; each phase consumes the whole
//! program before the next starts, and a phase with diagnostics stops the
//! pipeline so later phases only ever see a well-formed tree:
//! - [scanner](compiler::scanner) turns source text into tokens
//! - [parser](compiler::parser) builds the AST
//! - [name analysis](compiler::name_analysis) links uses to declarations,
//!   enforces scoping and assigns frame offsets
//! - [type checking](compiler::typechecker) computes and checks a type for
//!   every expression
//! - [codegen](compiler::codegen) lowers the checked tree to assembly

pub mod compiler;

use compiler::codegen::Codegen;
use compiler::common::error::Error;
use compiler::name_analysis::NameAnalyzer;
use compiler::parser::Parser;
use compiler::scanner::Scanner;
use compiler::typechecker::TypeChecker;

pub fn compile(source: &str, dump_ast: bool) -> Result<String, Vec<Error>> {
    let tokens = Scanner::new(source).scan_token()?;

    let mut program = Parser::new(tokens).parse()?;

    if dump_ast {
        program.iter().for_each(|decl| eprintln!("{}", decl));
    }

    NameAnalyzer::new().analyze(&mut program)?;
    TypeChecker::new().check(&mut program)?;

    Ok(Codegen::new().generate(&program))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::common::error::ErrorKind;

    #[test]
    fn compiles_a_complete_program() {
        let asm = compile(
            "int counter;

             int double(int n) {
                 return n * 2;
             }

             int main() {
                 receive >> counter;
                 while (counter > 0) {
                     print << double(counter);
                     print << \"\\n\";
                     --counter;
                 }
                 return 0;
             }",
            false,
        )
        .unwrap();

        assert!(asm.contains("_counter: .space 4"));
        assert!(asm.contains("_double:"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn semantic_errors_stop_before_codegen() {
        let errors = compile("int foo() { return 0; }", false).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NoMain);
    }

    #[test]
    fn type_errors_stop_before_codegen() {
        let errors = compile("int main() { return tru; }", false).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::BadReturnValue);
    }
}
