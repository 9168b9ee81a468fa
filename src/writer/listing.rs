//! Human readable disassembly, one `<name>.lst` per script.

use crate::model::ProcessedProject;
use crate::processor::Output;
use crate::processor::bytecode::Instruction;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

pub fn emit(project: &ProcessedProject, out_dir: &Path) -> io::Result<()> {
    for script in &project.scripts {
        fs::write(
            out_dir.join(format!("{}.lst", script.name)),
            disassemble(&script.output),
        )?;
    }
    Ok(())
}

/// Code words with their decoded form, followed by the literal pools.
pub fn disassemble(output: &Output) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "; {}", output.name);
    let _ = writeln!(text, "; code words: {}", output.code.len());

    for (index, word) in output.code.iter().enumerate() {
        match Instruction::decode(*word) {
            Some(instruction) => {
                let _ = writeln!(text, "{index:5}  {word:08x}  {instruction}");
            }
            None => {
                let _ = writeln!(text, "{index:5}  {word:08x}  ???");
            }
        }
    }

    let literals = &output.literals;
    if !literals.integers().is_empty() {
        let _ = writeln!(text, "\n; integers");
        for (index, value) in literals.integers().iter().enumerate() {
            let _ = writeln!(text, "{index:5}  {value}");
        }
    }
    if !literals.floats().is_empty() {
        let _ = writeln!(text, "\n; floats");
        for (index, value) in literals.floats().iter().enumerate() {
            let _ = writeln!(text, "{index:5}  {value}");
        }
    }
    if !literals.strings().is_empty() {
        let _ = writeln!(text, "\n; strings");
        for (index, value) in literals.strings().iter().enumerate() {
            let _ = writeln!(text, "{index:5}  {value:?}");
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::bytecode::{OP_JUMP_FORWARD, OP_PUSH, Opcode, segment0, segment5};

    #[test]
    fn test_disassemble() {
        let mut output = Output {
            name: "Demo".into(),
            ..Output::default()
        };
        output.literals.add_integer(7);
        output.literals.add_string("hi");
        output.code = vec![
            segment0(OP_PUSH, 0),
            segment5(Opcode::FetchIntLiteral as u32),
            segment0(OP_JUMP_FORWARD, 2),
            0xffff_ffff,
        ];

        let text = disassemble(&output);
        let expected_lines = vec![
            "; Demo",
            "; code words: 4",
            "    0  00000000  push 0",
            "    1  c8000004  FetchIntLiteral",
            "    2  01000002  jump +2",
            "    3  ffffffff  ???",
            "; integers",
            "    0  7",
            "; strings",
            "    0  \"hi\"",
        ];
        for line in expected_lines {
            assert!(text.lines().any(|l| l == line), "missing {line:?} in\n{text}");
        }
        assert!(!text.contains("; floats"));
    }
}
