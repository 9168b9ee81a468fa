//! Result of one compilation and its serialised form.

use super::bytecode::Code;
use super::literals::Literals;
use super::locals::Locals;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    pub name: String,
    pub literals: Literals,
    pub locals: Locals,
    pub code: Vec<Code>,
}

impl Output {
    /// Serialises the script:
    ///
    /// ```text
    /// [code words] [integer words] [float words] [string bytes]
    /// code...
    /// integers... floats... strings...
    /// ```
    pub fn get_code(&self) -> Vec<Code> {
        let mut out = Vec::with_capacity(
            4 + self.code.len()
                + (self.literals.integer_size()
                    + self.literals.float_size()
                    + self.literals.string_size())
                    / 4,
        );
        out.push(self.code.len() as Code);
        out.push((self.literals.integer_size() / 4) as Code);
        out.push((self.literals.float_size() / 4) as Code);
        out.push(self.literals.string_size() as Code);
        out.extend_from_slice(&self.code);
        self.literals.append(&mut out);
        out
    }

    /// Little-endian byte image of `get_code`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.get_code()
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.literals.clear();
        self.locals.clear();
        self.code.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header() {
        let mut output = Output::default();
        output.code = vec![1, 2, 3];
        output.literals.add_integer(7);
        output.literals.add_float(0.5);
        output.literals.add_float(0.25);
        output.literals.add_string("hello");

        let code = output.get_code();
        assert_eq!(&code[..4], &[3, 1, 2, 8]);
        assert_eq!(&code[4..7], &[1, 2, 3]);
        assert_eq!(code[7], 7);
        assert_eq!(code.len(), 4 + 3 + 1 + 2 + 2);
        assert_eq!(output.to_bytes().len(), code.len() * 4);
    }

    #[test]
    fn test_empty() {
        assert_eq!(Output::default().get_code(), vec![0, 0, 0, 0]);
    }
}
