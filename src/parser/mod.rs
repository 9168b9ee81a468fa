use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use log::{debug, info};

use crate::model::{EnvironmentFile, Environment, OpcodeValue, RawProject, SourceScript};

/// Loads the environment (if any) and every script source.
pub fn load(environment: Option<&Path>, inputs: &[PathBuf]) -> Result<RawProject> {
    let environment = match environment {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            load_environment(&json)
                .with_context(|| format!("Parsing environment {}", path.display()))?
        }
        None => Environment::default(),
    };

    let scripts = inputs
        .iter()
        .map(|path| load_source(path))
        .collect::<Result<Vec<_>>>()?;

    Ok(RawProject {
        environment,
        scripts,
    })
}

/// Parse an environment JSON string into an [`Environment`].
///
/// Every name is lower-cased; extension opcodes are checked against their
/// segment while registering.
pub fn load_environment(json: &str) -> Result<Environment> {
    let file: EnvironmentFile = serde_json::from_str(json)?;
    build_environment(file)
}

pub fn build_environment(file: EnvironmentFile) -> Result<Environment> {
    let mut environment = Environment {
        can_declare_locals: file.can_declare_locals,
        ids: file.ids.iter().map(|id| id.to_lowercase()).collect(),
        globals: file
            .globals
            .into_iter()
            .map(|(name, ty)| (name.to_lowercase(), ty))
            .collect(),
        ..Environment::default()
    };

    for (id, script) in file.members {
        let variables = script
            .variables
            .into_iter()
            .map(|(name, ty)| (name.to_lowercase(), ty))
            .collect();
        environment
            .members
            .insert(id.to_lowercase(), (script.reference, variables));
    }

    for function in &file.functions {
        let keyword = function.keyword.to_lowercase();
        let (code, explicit) = opcodes(&keyword, &function.opcode, &function.opcode_explicit)?;
        environment
            .extensions
            .register_function(&keyword, function.returns, &function.arguments, code, explicit)
            .with_context(|| format!("Registering function `{keyword}`"))?;
    }

    for instruction in &file.instructions {
        let keyword = instruction.keyword.to_lowercase();
        let (code, explicit) =
            opcodes(&keyword, &instruction.opcode, &instruction.opcode_explicit)?;
        environment
            .extensions
            .register_instruction(&keyword, &instruction.arguments, code, explicit)
            .with_context(|| format!("Registering instruction `{keyword}`"))?;
    }

    info!(
        "Environment: {} ids, {} globals, {} member scripts, {} extensions",
        environment.ids.len(),
        environment.globals.len(),
        environment.members.len(),
        file.functions.len() + file.instructions.len()
    );

    Ok(environment)
}

/// Reads one script source. Bytes that are not UTF-8 are replaced rather
/// than rejected.
pub fn load_source(path: &Path) -> Result<SourceScript> {
    let bytes = fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();

    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceScript {
        name,
        text: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

// ─────────────────────────────────────────────────────
/// Helper: resolve the regular and the explicit opcode of an extension.
fn opcodes(
    keyword: &str,
    opcode: &OpcodeValue,
    explicit: &Option<OpcodeValue>,
) -> Result<(u32, Option<u32>)> {
    let code = opcode
        .value()
        .ok_or_else(|| anyhow!("`{keyword}`: invalid opcode {opcode:?}"))?;
    let explicit = match explicit {
        Some(value) => Some(
            value
                .value()
                .ok_or_else(|| anyhow!("`{keyword}`: invalid explicit opcode {value:?}"))?,
        ),
        None => None,
    };
    Ok((code, explicit))
}
