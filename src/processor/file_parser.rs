//! Top level of a script file: `begin <name>`, the body, `end [<name>]`.

use super::bytecode::Code;
use super::declaration_parser::DeclarationParser;
use super::error::CompileError;
use super::lexer::Scanner;
use super::parser::{ParseResult, Parser, ParserState, Session, skip_line};
use super::script_parser::ScriptParser;
use super::token::{Keyword, Special, Token, TokenLoc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FileState {
    #[default]
    Begin,
    Name,
    BeginComplete,
    EndName,
    EndComplete,
}

#[derive(Debug)]
pub struct FileParser {
    state: ParserState,
    file: FileState,
    name: String,
    script: ScriptParser,
}

impl Default for FileParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FileParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::default(),
            file: FileState::Begin,
            name: String::new(),
            script: ScriptParser::new(true),
        }
    }

    /// Script name as written after `begin`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append(&mut self, code: &mut Vec<Code>) {
        self.script.append(code);
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.file = FileState::Begin;
        self.name.clear();
        self.script.reset();
    }

    /// Optional name after `end`. Whatever follows on that line is ignored.
    fn end_name(&mut self, name: &str, loc: &TokenLoc, session: &mut Session<'_>) -> ParseResult {
        if !self.name.eq_ignore_ascii_case(name) {
            session.warning(&format!("Names for script {} do not match", self.name), loc);
        }
        self.file = FileState::EndComplete;
        Ok(false)
    }
}

impl Parser for FileParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match self.file {
            FileState::Name => {
                self.name = name.to_string();
                self.file = FileState::BeginComplete;
                Ok(true)
            }
            FileState::EndName => self.end_name(name, loc, session),
            FileState::BeginComplete => {
                session.warning(&format!("Stray string ({name}) after script name"), loc);
                Ok(true)
            }
            _ => self.reject(Token::Name(name.to_string()), loc, scanner, session),
        }
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match self.file {
            FileState::Begin if keyword == Keyword::Begin => {
                self.state.start();
                self.file = FileState::Name;
                scanner.enable_tolerant_names();
                Ok(true)
            }
            // keywords make valid script names too
            FileState::Name => {
                self.name = loc.literal.clone();
                self.file = FileState::BeginComplete;
                Ok(true)
            }
            FileState::EndName => self.end_name(&loc.literal, loc, session),
            _ => self.reject(Token::Keyword(keyword), loc, scanner, session),
        }
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if self.file == FileState::Begin {
            if special != Special::Newline {
                session.warning("Stray special character before begin statement", loc);
            }
            return Ok(true);
        }

        if special == Special::Newline {
            match self.file {
                FileState::BeginComplete => {
                    self.script.reset();
                    scanner.scan(&mut self.script, session)?;
                    self.file = FileState::EndName;
                    return Ok(true);
                }
                // done; the rest of the file is ignored
                FileState::EndName | FileState::EndComplete => return Ok(false),
                _ => {}
            }
        }

        self.reject(Token::Special(special), loc, scanner, session)
    }

    fn parse_eof(
        &mut self,
        _scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        match self.file {
            FileState::EndName | FileState::EndComplete => Ok(()),
            _ => Err(session.end_of_file()),
        }
    }
}

/// Collects the local declarations of a script without compiling it.
#[derive(Debug, Default)]
pub struct QuickFileParser {
    state: ParserState,
    declaration: DeclarationParser,
}

impl QuickFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.declaration.reset();
    }
}

impl Parser for QuickFileParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_int(
        &mut self,
        _value: i32,
        _loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        skip_line(scanner, session)?;
        Ok(true)
    }

    fn parse_float(
        &mut self,
        _value: f32,
        _loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        skip_line(scanner, session)?;
        Ok(true)
    }

    fn parse_name(
        &mut self,
        _name: &str,
        _loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        skip_line(scanner, session)?;
        Ok(true)
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match keyword {
            Keyword::End => Ok(false),
            Keyword::Short | Keyword::Long | Keyword::Float => {
                self.declaration.reset();
                scanner.putback(Token::Keyword(keyword), loc.clone());
                scanner.scan(&mut self.declaration, session)?;
                Ok(true)
            }
            _ => {
                skip_line(scanner, session)?;
                Ok(true)
            }
        }
    }

    fn parse_special(
        &mut self,
        special: Special,
        _loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if special != Special::Newline {
            skip_line(scanner, session)?;
        }
        Ok(true)
    }

    fn parse_eof(
        &mut self,
        _scanner: &mut Scanner,
        _session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        Ok(())
    }
}
