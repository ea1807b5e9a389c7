use clap::Parser;
use snafu::{ResultExt, Snafu};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "brioc", about = "Compiles the brio language to MIPS-style assembly")]
struct Args {
    /// Path to the brio source file
    file: PathBuf,

    /// Where to write the generated assembly (defaults to the source path
    /// with a .s extension)
    #[arg(short)]
    output: Option<PathBuf>,

    /// Print the parsed AST to stderr
    #[arg(long)]
    dump_ast: bool,
}

#[derive(Debug, Snafu)]
enum DriverError {
    #[snafu(display("cannot read '{}': {}", path.display(), source))]
    ReadSource { path: PathBuf, source: std::io::Error },

    #[snafu(display("cannot write '{}': {}", path.display(), source))]
    WriteOutput { path: PathBuf, source: std::io::Error },
}

fn run(args: &Args) -> Result<bool, DriverError> {
    let source = std::fs::read_to_string(&args.file)
        .context(ReadSourceSnafu { path: args.file.clone() })?;

    match brioc_compiler::compile(&source, args.dump_ast) {
        Ok(asm) => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.file.with_extension("s"));
            std::fs::write(&output, asm).context(WriteOutputSnafu { path: output.clone() })?;
            Ok(true)
        }
        Err(errors) => {
            let filename = args.file.display().to_string();
            for error in &errors {
                error.print_error(&filename);
            }
            eprintln!(
                "{} error{} generated.",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            );
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("brioc: {}", error);
            ExitCode::FAILURE
        }
    }
}
