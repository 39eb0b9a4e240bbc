//! Entrypoint for CLI
use std::{env, error::Error, fs, path::Path};

use hawk::{
    compiler::{lexer, parser, symbol, typemap},
    prelude::*,
    IMPL_VERSION,
};
use log::{debug, info};

static USAGE: &str = r#"
usage: hawk [-debug STAGE] FILE

arguments:
    FILE    a .hawk source file to compile and run,
            or a .bc bytecode file to run

options:
    -debug STAGE    print the intermediate artifact once STAGE has
                    completed, then exit; one of: ast, symtab, tymap

examples:
    hawk program.hawk
    hawk program.bc
    hawk -debug ast program.hawk
"#;

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Run { filepath }) => run_file(&filepath)?,
        Some(Cmd::Debug { stage, filepath }) => run_debug(stage, &filepath)?,
        None => print_usage(),
    }

    Ok(())
}

enum Cmd {
    /// Compile and/or execute a file, chosen by extension.
    Run { filepath: String },
    /// Print an intermediate compiler artifact.
    Debug { stage: DebugStage, filepath: String },
}

#[derive(Debug, Clone, Copy)]
enum DebugStage {
    Ast,
    Symtab,
    Tymap,
}

impl DebugStage {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "ast" => Some(Self::Ast),
            "symtab" => Some(Self::Symtab),
            "tymap" => Some(Self::Tymap),
            _ => None,
        }
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(arg) => match arg.as_str() {
            "-debug" => {
                let stage = DebugStage::parse(args.next()?.as_str())?;
                let filepath = args.next()?;
                Some(Cmd::Debug { stage, filepath })
            }
            _ => Some(Cmd::Run { filepath: arg }),
        },
        None => None,
    }
}

fn print_usage() {
    println!("Hawk v{IMPL_VERSION}");
    println!("{USAGE}");
}

/// Dispatch on the file extension: `.hawk` compiles then executes,
/// `.bc` executes raw bytes. Anything else is rejected gently.
fn run_file(filepath: &str) -> HawkResult<()> {
    let extension = Path::new(filepath)
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default();

    match extension.as_str() {
        "hawk" => run_source(filepath),
        "bc" => run_bytecode(filepath),
        ext => {
            println!("Unrecognized extension: {ext}");
            Ok(())
        }
    }
}

fn run_source(filepath: &str) -> HawkResult<()> {
    let source = read_source(filepath)?;

    match compile(filepath, &source) {
        Ok(bytecode) => {
            // Cache the compiled packet next to the input.
            let cache_path = Path::new(filepath).with_extension("bc");
            info!("writing bytecode to {}", cache_path.display());
            fs::write(&cache_path, &bytecode)?;

            execute(&bytecode)
        }
        Err(diagnostics) => {
            // Diagnostics go to stdout; this is not a process error.
            print!("{diagnostics}");
            Ok(())
        }
    }
}

fn run_bytecode(filepath: &str) -> HawkResult<()> {
    let bytecode = fs::read(filepath)?;
    execute(&bytecode)
}

fn execute(bytecode: &[u8]) -> HawkResult<()> {
    if log::max_level() >= log::Level::Debug {
        dump_bytecode(bytecode);
    }

    let mut vm = Vm::new();
    let value = vm.execute(bytecode)?;
    println!("{value}");
    Ok(())
}

/// Opcode listing for troubleshooting.
fn dump_bytecode(bytecode: &[u8]) {
    use hawk::bytecode::{op_name, opcodes};

    let mut cursor = 0;
    while cursor < bytecode.len() {
        let opcode = bytecode[cursor];
        let name = op_name(opcode).unwrap_or("??");

        match opcode {
            opcodes::PUSH | opcodes::READ => {
                let operand = hawk::bytecode::read_i32(bytecode, cursor + 1).unwrap_or_default();
                debug!("{cursor:04} {name} {operand}");
                cursor += 5;
            }
            _ => {
                debug!("{cursor:04} {name}");
                cursor += 1;
            }
        }
    }
}

/// Run the pipeline up to the requested stage and print its dump.
fn run_debug(stage: DebugStage, filepath: &str) -> HawkResult<()> {
    let source = read_source(filepath)?;
    let mut diagnostics = DiagnosticList::new(filepath, &source);

    let tokens = lexer::tokenize(&source, &mut diagnostics);
    if diagnostics.has_errors() {
        print!("{diagnostics}");
        return Ok(());
    }

    let ast = match parser::parse(tokens, &mut diagnostics) {
        Some(ast) => ast,
        None => {
            print!("{diagnostics}");
            return Ok(());
        }
    };
    if let DebugStage::Ast = stage {
        print!("{}", ast.dump());
        return Ok(());
    }

    let mut table = symbol::resolve(&ast, &mut diagnostics);
    if diagnostics.has_errors() {
        print!("{diagnostics}");
        return Ok(());
    }
    if let DebugStage::Symtab = stage {
        print!("{}", table.dump());
        return Ok(());
    }

    let map = typemap::infer(&ast, &mut table, &mut diagnostics);
    if diagnostics.has_errors() {
        print!("{diagnostics}");
        return Ok(());
    }
    print!("{}", map.dump());
    Ok(())
}

fn read_source(filepath: &str) -> HawkResult<String> {
    let bytes = fs::read(filepath)?;
    Ok(String::from_utf8(bytes)?)
}
