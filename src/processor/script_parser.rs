//! Parser for a script body: statement lines and control blocks up to the
//! closing `end`, or up to the end of input for console commands.

use super::bytecode::Code;
use super::control_parser::ControlParser;
use super::error::CompileError;
use super::lexer::Scanner;
use super::line_parser::LineParser;
use super::parser::{ParseResult, Parser, ParserState, Session, recover_line, skip_line};
use super::token::{Keyword, Special, Token, TokenLoc};

#[derive(Debug, Default)]
pub struct ScriptParser {
    state: ParserState,
    /// Stop at `end` (script file) rather than at the end of input (console).
    end: bool,
    line: LineParser,
    control: ControlParser,
    code: Vec<Code>,
}

impl ScriptParser {
    /// `end == false` parses console input: no `end` keyword, bare
    /// expressions are allowed.
    pub fn new(end: bool) -> Self {
        Self {
            end,
            line: LineParser::new(!end),
            control: ControlParser::new(),
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.line.reset();
        self.control.reset();
        self.code.clear();
    }

    pub fn append(&mut self, code: &mut Vec<Code>) {
        code.append(&mut self.code);
    }

    fn parse_line(
        &mut self,
        keyword: Option<(Keyword, &TokenLoc)>,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.line.parse_line(keyword, scanner, session, &mut self.code)?;
        Ok(true)
    }

    fn parse_control(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.control.reset();
        let result = match self.control.parse_keyword(keyword, loc, scanner, session) {
            Ok(true) => scanner.scan(&mut self.control, session),
            Ok(false) => Ok(()),
            Err(error) => Err(error),
        };
        if recover_line(result, scanner, session)? {
            self.control.append(&mut self.code);
        } else {
            self.control.reset();
        }
        Ok(true)
    }
}

impl Parser for ScriptParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_int(
        &mut self,
        value: i32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        scanner.putback(Token::Int(value), loc.clone());
        self.parse_line(None, scanner, session)
    }

    fn parse_float(
        &mut self,
        value: f32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        scanner.putback(Token::Float(value), loc.clone());
        self.parse_line(None, scanner, session)
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        scanner.putback(Token::Name(name.to_string()), loc.clone());
        self.parse_line(None, scanner, session)
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match keyword {
            Keyword::If | Keyword::Elseif | Keyword::While => {
                self.parse_control(keyword, loc, scanner, session)
            }
            Keyword::Endif => {
                session.warning("endif without matching if/elseif", loc);
                skip_line(scanner, session)?;
                Ok(true)
            }
            Keyword::End if self.end => Ok(false),
            _ => self.parse_line(Some((keyword, loc)), scanner, session),
        }
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match special {
            // empty line
            Special::Newline => Ok(true),
            // `(cond)` on its own opens an if block
            Special::Open => {
                scanner.putback(Token::Special(special), loc.clone());
                self.parse_control(Keyword::If, loc, scanner, session)
            }
            _ => {
                scanner.putback(Token::Special(special), loc.clone());
                self.parse_line(None, scanner, session)
            }
        }
    }

    fn parse_eof(
        &mut self,
        _scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        if self.end {
            return Err(session.end_of_file());
        }
        Ok(())
    }
}
