//! Emit a C header with the built-in opcodes of the script VM.

use crate::processor::bytecode::{OP_JUMP_BACKWARD, OP_JUMP_FORWARD, OP_MESSAGE_BOX, OP_PUSH, Opcode};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn emit(out_dir: &Path) -> io::Result<()> {
    let mut h = BufWriter::new(File::create(out_dir.join("opcodes.h"))?);
    write_header(&mut h)?;
    h.flush()
}

pub fn write_header<W: Write>(h: &mut W) -> io::Result<()> {
    writeln!(h, "#pragma once")?;
    writeln!(h, "#include <stdint.h>")?;
    writeln!(h, "// Auto-generated – DO NOT EDIT\n")?;

    // ---------------------------------------------------------------
    // 1. Segment 0 / segment 3 opcodes with operands
    // ---------------------------------------------------------------
    writeln!(h, "#define MWSCRIPT_OP_PUSH          {OP_PUSH}")?;
    writeln!(h, "#define MWSCRIPT_OP_JUMP_FORWARD  {OP_JUMP_FORWARD}")?;
    writeln!(h, "#define MWSCRIPT_OP_JUMP_BACKWARD {OP_JUMP_BACKWARD}")?;
    writeln!(h, "#define MWSCRIPT_OP_MESSAGE_BOX   {OP_MESSAGE_BOX}\n")?;

    // ---------------------------------------------------------------
    // 2. Segment 5 opcodes – derived from Opcode::ALL
    // ---------------------------------------------------------------
    writeln!(h, "enum MwScriptOpcode {{")?;
    for opcode in Opcode::ALL {
        writeln!(h, "    MWSCRIPT_{} = {},", opcode.name(), *opcode as u32)?;
    }
    writeln!(h, "}};")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lists_every_opcode() {
        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("#pragma once\n"));
        for opcode in Opcode::ALL {
            let line = format!("    MWSCRIPT_{} = {},", opcode.name(), *opcode as u32);
            assert!(text.contains(&line), "{line}");
        }
        assert!(text.contains("MWSCRIPT_StoreLocalShort = 0,"));
    }
}
