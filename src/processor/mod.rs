//! Component 3 – the compiler proper.
//!
//! Scanner, parsers and code generation, plus the entry points that compile
//! a script file, a console command, or just collect a script's locals.
pub mod bytecode;
pub mod context;
pub mod control_parser;
pub mod declaration_parser;
pub mod error;
pub mod expr_parser;
pub mod extensions;
pub mod file_parser;
pub mod generator;
pub mod leaf;
pub mod lexer;
pub mod line_parser;
pub mod literals;
pub mod locals;
pub mod message_format;
pub mod output;
pub mod parser;
pub mod script_parser;
pub mod token;
pub mod value_type;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::Context;
pub use error::{CompileError, ErrorHandler, WarningsMode};
pub use locals::Locals;
pub use output::Output;

use anyhow::{Result, anyhow};
use log::{debug, error, info};

use crate::model::{CompileMode, CompileOptions, CompiledScript, ProcessedProject, SourceScript};
use file_parser::{FileParser, QuickFileParser};
use lexer::Scanner;
use literals::Literals;
use parser::Session;
use script_parser::ScriptParser;

/// Compiles a complete `begin … end` script.
///
/// Diagnostics go to `errors`; the returned output is only meaningful if
/// `errors.is_good()` afterwards.
pub fn compile_script(
    source: &str,
    context: &dyn Context,
    errors: &mut ErrorHandler,
) -> Result<Output, CompileError> {
    let mut locals = Locals::new();
    let mut literals = Literals::new();
    let mut scanner = Scanner::new(source);
    let mut parser = FileParser::new();

    let mut session = Session::new(errors, context, &mut locals, &mut literals);
    scanner.scan(&mut parser, &mut session)?;

    let mut code = Vec::new();
    parser.append(&mut code);
    Ok(Output {
        name: parser.name().to_string(),
        literals,
        locals,
        code,
    })
}

/// Compiles console input: statements without `begin`/`end`, bare
/// expressions allowed. `locals` persist between console commands.
pub fn compile_console(
    source: &str,
    context: &dyn Context,
    errors: &mut ErrorHandler,
    locals: &mut Locals,
) -> Result<Output, CompileError> {
    // the last line may lack its terminator
    let source = format!("{source}\n");
    let mut literals = Literals::new();
    let mut scanner = Scanner::new(&source);
    let mut parser = ScriptParser::new(false);

    let mut session = Session::new(errors, context, locals, &mut literals);
    scanner.scan(&mut parser, &mut session)?;

    let mut code = Vec::new();
    parser.append(&mut code);
    Ok(Output {
        name: String::new(),
        literals,
        locals: locals.clone(),
        code,
    })
}

/// Collects the local declarations of a script without compiling it.
pub fn scan_locals(
    source: &str,
    context: &dyn Context,
    errors: &mut ErrorHandler,
) -> Result<Locals, CompileError> {
    let mut locals = Locals::new();
    let mut literals = Literals::new();
    let mut scanner = Scanner::new(source);
    let mut parser = QuickFileParser::new();

    let mut session = Session::new(errors, context, &mut locals, &mut literals);
    scanner.scan(&mut parser, &mut session)?;
    Ok(locals)
}

// ── pipeline ────────────────────────────────────────────────────────────

/// Compiles every source and returns a read-only structure for writers.
///
/// Scripts with errors are logged and listed in `failed`; only an internal
/// compiler error aborts the run.
pub fn run(
    context: &dyn Context,
    sources: &[SourceScript],
    options: &CompileOptions,
) -> Result<ProcessedProject> {
    let mut processed = ProcessedProject {
        mode: options.mode,
        ..ProcessedProject::default()
    };

    for source in sources {
        let mut errors = ErrorHandler::new();
        errors.set_warnings_mode(options.warnings);
        errors.set_context(Some(source.name.clone()));

        debug!("compiling {} ({} bytes)", source.name, source.text.len());
        let result = match options.mode {
            CompileMode::Script => compile_script(&source.text, context, &mut errors),
            CompileMode::Console => {
                let mut locals = Locals::new();
                compile_console(&source.text, context, &mut errors, &mut locals)
            }
            CompileMode::LocalsOnly => {
                scan_locals(&source.text, context, &mut errors).map(|locals| Output {
                    locals,
                    ..Output::default()
                })
            }
        };

        processed.warnings += errors.count_warnings();
        processed.errors += errors.count_errors();

        match result {
            Ok(output) if errors.is_good() => {
                info!(
                    "{}: {} code words, {} warnings",
                    source.name,
                    output.code.len(),
                    errors.count_warnings()
                );
                processed.scripts.push(CompiledScript {
                    name: source.name.clone(),
                    output,
                });
            }
            Ok(_) | Err(CompileError::Source) | Err(CompileError::EndOfFile) => {
                error!("{}: compilation failed", source.name);
                processed.failed.push(source.name.clone());
            }
            Err(internal @ CompileError::Internal(_)) => {
                return Err(anyhow!("{}: {internal}", source.name));
            }
        }
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::bytecode::{OP_PUSH, Opcode, segment0, segment5};
    use crate::processor::test_support::TestContext;
    use crate::processor::value_type::ValueType;

    #[test]
    fn test_compile_script() {
        let context = TestContext::new();
        let mut errors = ErrorHandler::new();
        let output = compile_script(
            "begin Test\nshort x\nset x to 3\nend\n",
            &context,
            &mut errors,
        )
        .unwrap();

        assert!(errors.is_good());
        assert_eq!(output.name, "Test");
        assert_eq!(output.locals.get(ValueType::Short), ["x"]);
        assert_eq!(output.literals.integers(), [3]);
        assert_eq!(
            output.code,
            vec![
                segment0(OP_PUSH, 0),
                segment0(OP_PUSH, 0),
                segment5(Opcode::FetchIntLiteral as u32),
                segment5(Opcode::StoreLocalShort as u32),
            ]
        );
    }

    #[test]
    fn test_compile_console() {
        let context = TestContext::new();
        let mut errors = ErrorHandler::new();
        let mut locals = Locals::new();

        let first = compile_console("long n", &context, &mut errors, &mut locals).unwrap();
        assert!(first.code.is_empty());

        let second = compile_console("set n to 2", &context, &mut errors, &mut locals).unwrap();
        assert!(errors.is_good());
        assert_eq!(second.locals.get(ValueType::Long), ["n"]);
        assert_eq!(second.code.len(), 4);

        let third = compile_console("gamehour * 2", &context, &mut errors, &mut locals).unwrap();
        assert!(errors.is_good());
        assert_eq!(third.literals.strings(), ["gamehour", "%f"]);
    }

    #[test]
    fn test_scan_locals() {
        let context = TestContext::new();
        let mut errors = ErrorHandler::new();
        let locals = scan_locals(
            "begin Test\nfloat speed\nset speed to 1\nshort done\nend\n",
            &context,
            &mut errors,
        )
        .unwrap();

        assert_eq!(locals.get(ValueType::Float), ["speed"]);
        assert_eq!(locals.get(ValueType::Short), ["done"]);
        assert!(errors.is_good());
    }

    #[test]
    fn test_run_collects_failures() {
        let context = TestContext::new();
        let sources = vec![
            SourceScript {
                name: "good".into(),
                text: "begin good\nreturn\nend\n".into(),
            },
            SourceScript {
                name: "bad".into(),
                text: "this is not a valid script\n".into(),
            },
            SourceScript {
                name: "unterminated".into(),
                text: "begin unterminated\nreturn\n".into(),
            },
        ];

        let test_cases = vec![
            (CompileMode::Script, vec!["good"], vec!["bad", "unterminated"]),
            (CompileMode::LocalsOnly, vec!["good", "bad", "unterminated"], vec![]),
        ];

        for (mode, compiled, failed) in test_cases {
            let options = CompileOptions {
                mode,
                warnings: WarningsMode::Normal,
            };
            let processed = run(&context, &sources, &options).unwrap();
            let names: Vec<&str> = processed.scripts.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, compiled, "{mode:?}");
            assert_eq!(processed.failed, failed, "{mode:?}");
        }
    }
}
