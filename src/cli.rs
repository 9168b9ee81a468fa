use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::model::{CompileMode, CompileOptions};
use crate::processor::WarningsMode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Script source files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,
    /// Environment .json file (ids, globals, member variables, extensions)
    #[arg(short, long)]
    pub environment: Option<PathBuf>,
    /// Compile each input as console input (no begin/end)
    #[arg(long, conflicts_with = "locals_only")]
    pub console: bool,
    /// Only collect local declarations
    #[arg(long)]
    pub locals_only: bool,
    /// Also write a disassembly listing per script
    #[arg(long)]
    pub listing: bool,
    /// Also write opcodes.h
    #[arg(long)]
    pub header: bool,
    #[arg(long, value_enum, default_value_t = WarningsArg::Normal)]
    pub warnings: WarningsArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningsArg {
    Ignore,
    Normal,
    /// Report warnings as errors
    Strict,
}

impl From<WarningsArg> for WarningsMode {
    fn from(arg: WarningsArg) -> Self {
        match arg {
            WarningsArg::Ignore => WarningsMode::Ignore,
            WarningsArg::Normal => WarningsMode::Normal,
            WarningsArg::Strict => WarningsMode::AsErrors,
        }
    }
}

impl Cli {
    pub fn options(&self) -> CompileOptions {
        let mode = if self.console {
            CompileMode::Console
        } else if self.locals_only {
            CompileMode::LocalsOnly
        } else {
            CompileMode::Script
        };
        CompileOptions {
            mode,
            warnings: self.warnings.into(),
        }
    }
}
