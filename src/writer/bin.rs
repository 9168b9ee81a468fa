//! Dump compiled scripts: `<name>.bin` holds the little-endian words of
//! the serialised output, `<name>.locals` the local variable table.

use crate::model::{CompileMode, ProcessedProject};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn emit(project: &ProcessedProject, out_dir: &Path) -> io::Result<()> {
    for script in &project.scripts {
        if project.mode != CompileMode::LocalsOnly {
            fs::write(
                out_dir.join(format!("{}.bin", script.name)),
                script.output.to_bytes(),
            )?;
        }

        let mut locals = BufWriter::new(File::create(
            out_dir.join(format!("{}.locals", script.name)),
        )?);
        script.output.locals.write(&mut locals)?;
        locals.flush()?;
    }
    Ok(())
}
