//! Shared fixtures for the unit tests.

use std::collections::HashMap;

use super::context::Context;
use super::error::{CompileError, ErrorHandler};
use super::extensions::Extensions;
use super::lexer::Scanner;
use super::literals::Literals;
use super::locals::Locals;
use super::parser::{ParseResult, Parser, ParserState, Session};
use super::token::{Keyword, Special, Token, TokenLoc};
use super::value_type::ValueType;

pub struct TestContext {
    pub extensions: Extensions,
    pub globals: HashMap<String, ValueType>,
    pub ids: Vec<String>,
    /// (id, member) -> (type, is reference)
    pub members: HashMap<(String, String), (ValueType, bool)>,
    pub can_declare_locals: bool,
}

impl TestContext {
    pub fn new() -> Self {
        let mut extensions = Extensions::new();
        extensions
            .register_function("getdisposition", ValueType::Long, "", 0x20001a6, Some(0x20001a7))
            .unwrap();
        extensions
            .register_function("getpos", ValueType::Float, "c", 0x2000190, Some(0x2000191))
            .unwrap();
        extensions
            .register_instruction("additem", "clX", 0x2000076, Some(0x2000077))
            .unwrap();
        extensions
            .register_instruction("setpos", "cf", 0x2000192, Some(0x2000193))
            .unwrap();
        extensions
            .register_instruction("positioncell", "ffffcX", 0x2000198, Some(0x2000199))
            .unwrap();
        extensions
            .register_instruction("addtopic", "S", 0x200013d, None)
            .unwrap();
        extensions
            .register_instruction("aitravel", "fff/lx", 0x20000, Some(0x20001))
            .unwrap();
        extensions
            .register_instruction("choice", "j/SlSlSlSl", 0x2000a, None)
            .unwrap();

        let globals = HashMap::from([
            ("gamehour".to_string(), ValueType::Float),
            ("dayspassed".to_string(), ValueType::Long),
            ("pcrace".to_string(), ValueType::Short),
        ]);

        let members = HashMap::from([
            (
                ("fargoth".to_string(), "ringstate".to_string()),
                (ValueType::Long, true),
            ),
            (
                ("questscript".to_string(), "progress".to_string()),
                (ValueType::Float, false),
            ),
        ]);

        Self {
            extensions,
            globals,
            ids: vec!["fargoth".into(), "player".into(), "questscript".into()],
            members,
            can_declare_locals: true,
        }
    }
}

impl Context for TestContext {
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
        self.members
            .get(&(id.to_string(), name.to_string()))
            .copied()
    }

    fn is_id(&self, name: &str) -> bool {
        self.ids.iter().any(|id| id == name)
    }
}

/// Runs `f` with a fresh session; returns its result plus the warning and
/// error counts.
pub fn with_session<R>(
    context: &TestContext,
    f: impl FnOnce(&mut Session<'_>) -> R,
) -> (R, usize, usize) {
    let mut errors = ErrorHandler::new();
    let mut locals = Locals::new();
    let mut literals = Literals::new();
    let result = {
        let mut session = Session::new(&mut errors, context, &mut locals, &mut literals);
        f(&mut session)
    };
    (result, errors.count_warnings(), errors.count_errors())
}

/// Records every token until the end of input.
#[derive(Default)]
pub struct Recorder {
    state: ParserState,
    pub tokens: Vec<Token>,
}

impl Parser for Recorder {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_int(&mut self, value: i32, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.tokens.push(Token::Int(value));
        Ok(true)
    }

    fn parse_float(&mut self, value: f32, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.tokens.push(Token::Float(value));
        Ok(true)
    }

    fn parse_name(&mut self, name: &str, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.tokens.push(Token::Name(name.to_string()));
        Ok(true)
    }

    fn parse_keyword(&mut self, keyword: Keyword, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.tokens.push(Token::Keyword(keyword));
        Ok(true)
    }

    fn parse_special(&mut self, special: Special, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.tokens.push(Token::Special(special));
        Ok(true)
    }

    fn parse_comment(&mut self, comment: &str, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.tokens.push(Token::Comment(comment.to_string()));
        Ok(true)
    }

    fn parse_eof(&mut self, _: &mut Scanner, _: &mut Session<'_>) -> Result<(), CompileError> {
        self.tokens.push(Token::Eof);
        Ok(())
    }
}
