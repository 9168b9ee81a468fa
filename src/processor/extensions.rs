//! Registry of instructions and functions contributed by the host engine.
//
//  Extension keywords get negative codes (-1, -2, ...) so they never clash
//  with the built-in keyword table. Functions return a value; instructions
//  do not.

use std::collections::HashMap;

use thiserror::Error;

use super::bytecode::{Code, segment3, segment5};
use super::error::CompileError;
use super::generator;
use super::literals::Literals;
use super::value_type::ValueType;

const SEGMENT5_RANGE: std::ops::RangeInclusive<u32> = 0x200_0000..=0x3ff_ffff;
const SEGMENT3_RANGE: std::ops::RangeInclusive<u32> = 0x2_0000..=0x2_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Carries the number of optional arguments in its operand.
    Three,
    Five,
}

impl Segment {
    fn for_arguments(arguments: &str) -> Self {
        if arguments.contains('/') {
            Segment::Three
        } else {
            Segment::Five
        }
    }

    fn range(self) -> std::ops::RangeInclusive<u32> {
        match self {
            Segment::Three => SEGMENT3_RANGE,
            Segment::Five => SEGMENT5_RANGE,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtensionError {
    #[error("opcode {code:#x} of `{keyword}` is outside the {segment:?} segment range")]
    OpcodeOutOfRange {
        keyword: String,
        code: u32,
        segment: Segment,
    },
    #[error("keyword `{0}` is already registered")]
    DuplicateKeyword(String),
    #[error("function `{0}` must return long or float")]
    InvalidReturnType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// `None` for instructions.
    pub return_type: Option<ValueType>,
    pub arguments: String,
    pub code: u32,
    pub code_explicit: Option<u32>,
    pub segment: Segment,
}

impl Extension {
    pub fn has_explicit(&self) -> bool {
        self.code_explicit.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Extensions {
    next_keyword: i32,
    keywords: HashMap<String, i32>,
    functions: HashMap<i32, Extension>,
    instructions: HashMap<i32, Extension>,
}

impl Default for Extensions {
    fn default() -> Self {
        Self {
            next_keyword: -1,
            keywords: HashMap::new(),
            functions: HashMap::new(),
            instructions: HashMap::new(),
        }
    }
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code of an extension keyword. `keyword` must be lower case.
    pub fn search_keyword(&self, keyword: &str) -> Option<i32> {
        self.keywords.get(keyword).copied()
    }

    pub fn function(&self, keyword: i32) -> Option<&Extension> {
        self.functions.get(&keyword)
    }

    pub fn instruction(&self, keyword: i32) -> Option<&Extension> {
        self.instructions.get(&keyword)
    }

    pub fn register_function(
        &mut self,
        keyword: &str,
        return_type: ValueType,
        arguments: &str,
        code: u32,
        code_explicit: Option<u32>,
    ) -> Result<(), ExtensionError> {
        if return_type == ValueType::Short {
            return Err(ExtensionError::InvalidReturnType(keyword.to_string()));
        }
        let extension = Self::build(keyword, Some(return_type), arguments, code, code_explicit)?;
        let index = self.allocate(keyword)?;
        self.functions.insert(index, extension);
        Ok(())
    }

    pub fn register_instruction(
        &mut self,
        keyword: &str,
        arguments: &str,
        code: u32,
        code_explicit: Option<u32>,
    ) -> Result<(), ExtensionError> {
        let extension = Self::build(keyword, None, arguments, code, code_explicit)?;
        let index = self.allocate(keyword)?;
        self.instructions.insert(index, extension);
        Ok(())
    }

    fn build(
        keyword: &str,
        return_type: Option<ValueType>,
        arguments: &str,
        code: u32,
        code_explicit: Option<u32>,
    ) -> Result<Extension, ExtensionError> {
        let segment = Segment::for_arguments(arguments);
        for opcode in std::iter::once(code).chain(code_explicit) {
            if !segment.range().contains(&opcode) {
                return Err(ExtensionError::OpcodeOutOfRange {
                    keyword: keyword.to_string(),
                    code: opcode,
                    segment,
                });
            }
        }
        Ok(Extension {
            return_type,
            arguments: arguments.to_string(),
            code,
            code_explicit,
            segment,
        })
    }

    fn allocate(&mut self, keyword: &str) -> Result<i32, ExtensionError> {
        let keyword = keyword.to_lowercase();
        if self.keywords.contains_key(&keyword) {
            return Err(ExtensionError::DuplicateKeyword(keyword));
        }
        let index = self.next_keyword;
        self.next_keyword -= 1;
        self.keywords.insert(keyword, index);
        Ok(index)
    }

    pub fn generate_function_code(
        &self,
        keyword: i32,
        code: &mut Vec<Code>,
        literals: &mut Literals,
        id: &str,
        optional_arguments: u32,
    ) -> Result<(), CompileError> {
        let function = self
            .function(keyword)
            .ok_or_else(|| CompileError::internal("unknown custom function keyword"))?;
        Self::generate(function, code, literals, id, optional_arguments)
    }

    pub fn generate_instruction_code(
        &self,
        keyword: i32,
        code: &mut Vec<Code>,
        literals: &mut Literals,
        id: &str,
        optional_arguments: u32,
    ) -> Result<(), CompileError> {
        let instruction = self
            .instruction(keyword)
            .ok_or_else(|| CompileError::internal("unknown custom instruction keyword"))?;
        Self::generate(instruction, code, literals, id, optional_arguments)
    }

    fn generate(
        extension: &Extension,
        code: &mut Vec<Code>,
        literals: &mut Literals,
        id: &str,
        optional_arguments: u32,
    ) -> Result<(), CompileError> {
        if optional_arguments != 0 && extension.segment != Segment::Three {
            return Err(CompileError::internal(
                "extension does not support optional arguments",
            ));
        }

        let opcode = if id.is_empty() {
            extension.code
        } else {
            let explicit = extension.code_explicit.ok_or_else(|| {
                CompileError::internal("explicit references not supported")
            })?;
            let index = literals.add_string(id);
            generator::push_int(code, literals, index as i32);
            explicit
        };

        match extension.segment {
            Segment::Three => {
                if optional_arguments >= 256 {
                    return Err(CompileError::internal("number of optional arguments is too large"));
                }
                code.push(segment3(opcode, optional_arguments));
            }
            Segment::Five => code.push(segment5(opcode)),
        }
        Ok(())
    }

    /// All registered keywords, sorted.
    pub fn list_keywords(&self) -> Vec<String> {
        let mut keywords: Vec<String> = self.keywords.keys().cloned().collect();
        keywords.sort();
        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::bytecode::{OP_PUSH, Opcode, segment0};

    fn registry() -> Extensions {
        let mut extensions = Extensions::new();
        extensions
            .register_function("getdisposition", ValueType::Long, "", 0x20001a6, Some(0x20001a7))
            .unwrap();
        extensions
            .register_instruction("additem", "clX", 0x2000076, Some(0x2000077))
            .unwrap();
        extensions
            .register_instruction("aitravel", "fff/lx", 0x20000, Some(0x20001))
            .unwrap();
        extensions
            .register_instruction("addtopic", "S", 0x200013d, None)
            .unwrap();
        extensions
    }

    #[test]
    fn test_keyword_codes_count_down() {
        let extensions = registry();
        let test_cases = vec![
            ("getdisposition", Some(-1)),
            ("additem", Some(-2)),
            ("aitravel", Some(-3)),
            ("addtopic", Some(-4)),
            ("fargoth", None),
        ];

        for (keyword, expected) in test_cases {
            assert_eq!(extensions.search_keyword(keyword), expected, "{keyword}");
        }
        assert!(extensions.function(-1).is_some());
        assert!(extensions.instruction(-1).is_none());
        assert_eq!(extensions.instruction(-3).unwrap().segment, Segment::Three);
    }

    #[test]
    fn test_registration_errors() {
        let mut extensions = registry();
        assert!(matches!(
            extensions.register_instruction("bad", "", 0x1000, None),
            Err(ExtensionError::OpcodeOutOfRange { .. })
        ));
        assert!(matches!(
            extensions.register_instruction("bad", "l/l", 0x2000000, None),
            Err(ExtensionError::OpcodeOutOfRange { .. })
        ));
        assert_eq!(
            extensions.register_instruction("AddItem", "cl", 0x2000100, None),
            Err(ExtensionError::DuplicateKeyword("additem".into()))
        );
        assert_eq!(
            extensions.register_function("x", ValueType::Short, "", 0x2000100, None),
            Err(ExtensionError::InvalidReturnType("x".into()))
        );
    }

    #[test]
    fn test_generate_explicit() {
        let extensions = registry();
        let mut code = vec![];
        let mut literals = Literals::new();

        extensions
            .generate_function_code(-1, &mut code, &mut literals, "fargoth", 0)
            .unwrap();

        assert_eq!(literals.strings(), &["fargoth".to_string()]);
        assert_eq!(literals.integers(), &[0]);
        assert_eq!(
            code,
            vec![
                segment0(OP_PUSH, 0),
                segment5(Opcode::FetchIntLiteral as u32),
                segment5(0x20001a7),
            ]
        );
    }

    #[test]
    fn test_generate_segment3_optionals() {
        let extensions = registry();
        let mut code = vec![];
        let mut literals = Literals::new();

        extensions
            .generate_instruction_code(-3, &mut code, &mut literals, "", 1)
            .unwrap();
        assert_eq!(code, vec![segment3(0x20000, 1)]);

        assert!(
            extensions
                .generate_instruction_code(-3, &mut code, &mut literals, "", 256)
                .is_err()
        );
        assert!(
            extensions
                .generate_instruction_code(-2, &mut code, &mut literals, "", 1)
                .is_err()
        );
        assert!(
            extensions
                .generate_instruction_code(-4, &mut code, &mut literals, "fargoth", 0)
                .is_err()
        );
    }

    #[test]
    fn test_list_keywords() {
        assert_eq!(
            registry().list_keywords(),
            vec!["additem", "addtopic", "aitravel", "getdisposition"]
        );
    }
}
