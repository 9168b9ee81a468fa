//! Data passed between the pipeline stages: the environment scripts are
//! compiled against, the sources, and the compiled result.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::processor::extensions::Extensions;
use crate::processor::value_type::ValueType;
use crate::processor::{Context, Output, WarningsMode};

/// ─────────────────────────────────────────────────────
/// Environment file, 1-to-1 with the JSON
/// ─────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
pub struct EnvironmentFile {
    #[serde(default = "default_true")]
    pub can_declare_locals: bool,
    /// Object ids usable as explicit references.
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub globals: HashMap<String, ValueType>,
    /// Scripts with member variables, keyed by object id or script name.
    #[serde(default)]
    pub members: HashMap<String, MemberScript>,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub instructions: Vec<InstructionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MemberScript {
    /// `true` for a reference's script, `false` for a global script.
    #[serde(default = "default_true")]
    pub reference: bool,
    #[serde(default)]
    pub variables: HashMap<String, ValueType>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionEntry {
    pub keyword: String,
    pub returns: ValueType,
    #[serde(default)]
    pub arguments: String,
    pub opcode: OpcodeValue,
    #[serde(default)]
    pub opcode_explicit: Option<OpcodeValue>,
}

#[derive(Debug, Deserialize)]
pub struct InstructionEntry {
    pub keyword: String,
    #[serde(default)]
    pub arguments: String,
    pub opcode: OpcodeValue,
    #[serde(default)]
    pub opcode_explicit: Option<OpcodeValue>,
}

/// Opcodes are written either as JSON numbers or as `"0x…"` strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpcodeValue {
    Number(u32),
    Text(String),
}

impl OpcodeValue {
    pub fn value(&self) -> Option<u32> {
        match self {
            OpcodeValue::Number(value) => Some(*value),
            OpcodeValue::Text(text) => {
                let text = text.trim();
                match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => text.parse().ok(),
                }
            }
        }
    }
}

fn default_true() -> bool {
    true
}

/// ─────────────────────────────────────────────────────
/// Environment as seen by the compiler
/// ─────────────────────────────────────────────────────
#[derive(Debug)]
pub struct Environment {
    pub can_declare_locals: bool,
    pub ids: HashSet<String>,
    pub globals: HashMap<String, ValueType>,
    /// id -> (is reference, member name -> type); all lower case.
    pub members: HashMap<String, (bool, HashMap<String, ValueType>)>,
    pub extensions: Extensions,
}

impl Default for Environment {
    /// No ids, globals or extensions; locals may be declared.
    fn default() -> Self {
        Self {
            can_declare_locals: true,
            ids: HashSet::new(),
            globals: HashMap::new(),
            members: HashMap::new(),
            extensions: Extensions::new(),
        }
    }
}

impl Context for Environment {
    fn can_declare_locals(&self) -> bool {
        self.can_declare_locals
    }

    fn extensions(&self) -> Option<&Extensions> {
        Some(&self.extensions)
    }

    fn global_type(&self, name: &str) -> Option<ValueType> {
        self.globals.get(name).copied()
    }

    fn member_type(&self, name: &str, id: &str) -> Option<(ValueType, bool)> {
        let (reference, variables) = self.members.get(id)?;
        variables.get(name).map(|ty| (*ty, *reference))
    }

    fn is_id(&self, name: &str) -> bool {
        self.ids.contains(name)
    }
}

/// ─────────────────────────────────────────────────────
/// Sources and results
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SourceScript {
    /// File stem; names the output files.
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    #[default]
    Script,
    /// Each source is one console command.
    Console,
    /// Only collect local declarations.
    LocalsOnly,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub mode: CompileMode,
    pub warnings: WarningsMode,
}

/// Immediately-after-load representation.
#[derive(Debug)]
pub struct RawProject {
    pub environment: Environment,
    pub scripts: Vec<SourceScript>,
}

#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub name: String,
    pub output: Output,
}

/// Fully processed output handed to `writer`.
#[derive(Debug, Default)]
pub struct ProcessedProject {
    pub mode: CompileMode,
    pub scripts: Vec<CompiledScript>,
    /// Names of the sources that did not compile.
    pub failed: Vec<String>,
    pub warnings: usize,
    pub errors: usize,
}
