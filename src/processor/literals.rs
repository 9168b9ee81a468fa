//! Literal pools referenced by index from the instruction stream.

use super::bytecode::Code;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Literals {
    integers: Vec<i32>,
    floats: Vec<f32>,
    strings: Vec<String>,
}

impl Literals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an integer literal and returns its index. No deduplication.
    pub fn add_integer(&mut self, value: i32) -> u32 {
        self.integers.push(value);
        (self.integers.len() - 1) as u32
    }

    pub fn add_float(&mut self, value: f32) -> u32 {
        self.floats.push(value);
        (self.floats.len() - 1) as u32
    }

    pub fn add_string(&mut self, value: &str) -> u32 {
        self.strings.push(value.to_string());
        (self.strings.len() - 1) as u32
    }

    pub fn integers(&self) -> &[i32] {
        &self.integers
    }

    pub fn floats(&self) -> &[f32] {
        &self.floats
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Size of the integer block in bytes.
    pub fn integer_size(&self) -> usize {
        self.integers.len() * 4
    }

    /// Size of the float block in bytes.
    pub fn float_size(&self) -> usize {
        self.floats.len() * 4
    }

    /// Size of the string block in bytes: every string plus its terminating
    /// NUL, the whole block padded to a multiple of 4.
    pub fn string_size(&self) -> usize {
        let size: usize = self.strings.iter().map(|s| s.len() + 1).sum();
        size.next_multiple_of(4)
    }

    /// Appends all three blocks, in order integers, floats, strings.
    pub fn append(&self, code: &mut Vec<Code>) {
        code.extend(self.integers.iter().map(|value| *value as u32));
        code.extend(self.floats.iter().map(|value| value.to_bits()));

        let mut bytes = Vec::with_capacity(self.string_size());
        for string in &self.strings {
            bytes.extend_from_slice(string.as_bytes());
            bytes.push(0);
        }
        bytes.resize(self.string_size(), 0);

        code.extend(
            bytes
                .chunks_exact(4)
                .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]])),
        );
    }

    pub fn clear(&mut self) {
        self.integers.clear();
        self.floats.clear();
        self.strings.clear();
    }
}
