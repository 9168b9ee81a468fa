//! `short|long|float <name>` local variable declarations.

use super::error::CompileError;
use super::leaf::SkipParser;
use super::lexer::Scanner;
use super::parser::{ParseResult, Parser, ParserState, Session};
use super::token::{Keyword, Special, Token, TokenLoc};
use super::value_type::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DeclarationState {
    #[default]
    Begin,
    Name(ValueType),
    End,
}

#[derive(Debug, Default)]
pub struct DeclarationParser {
    state: ParserState,
    declaration: DeclarationState,
}

impl DeclarationParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.declaration = DeclarationState::Begin;
    }

    /// Drops the rest of the line after a complete declaration.
    fn extra_text(
        &mut self,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        session.warning("Extra text after local variable declaration", loc);
        scanner.scan(&mut SkipParser::new(), session)?;
        Ok(false)
    }
}

impl Parser for DeclarationParser {
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
        match self.declaration {
            DeclarationState::Name(ty) => {
                let name = name.to_lowercase();
                if session.locals.get_type(&name).is_some() {
                    session.warning("Local variable re-declaration", loc);
                } else {
                    session.locals.declare(ty, &name);
                }
                self.declaration = DeclarationState::End;
                Ok(true)
            }
            DeclarationState::End => self.extra_text(loc, scanner, session),
            DeclarationState::Begin => {
                self.reject(Token::Name(name.to_string()), loc, scanner, session)
            }
        }
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match self.declaration {
            DeclarationState::Begin => {
                let ty = match keyword {
                    Keyword::Short => ValueType::Short,
                    Keyword::Long => ValueType::Long,
                    Keyword::Float => ValueType::Float,
                    _ => return self.reject(Token::Keyword(keyword), loc, scanner, session),
                };
                self.state.start();
                self.declaration = DeclarationState::Name(ty);
                Ok(true)
            }
            // keywords are fine as variable names
            DeclarationState::Name(_) => self.parse_name(&loc.literal, loc, scanner, session),
            DeclarationState::End => self.extra_text(loc, scanner, session),
        }
    }

    fn parse_int(
        &mut self,
        value: i32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match self.declaration {
            DeclarationState::Name(_) => {
                session.error("Integer is not a valid variable name", loc);
                scanner.scan(&mut SkipParser::new(), session)?;
                self.declaration = DeclarationState::End;
                Ok(false)
            }
            DeclarationState::End => self.extra_text(loc, scanner, session),
            DeclarationState::Begin => self.reject(Token::Int(value), loc, scanner, session),
        }
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if self.declaration == DeclarationState::End {
            if special == Special::Newline {
                return Ok(false);
            }
            return self.extra_text(loc, scanner, session);
        }
        self.reject(Token::Special(special), loc, scanner, session)
    }

    fn parse_eof(
        &mut self,
        _scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        if self.declaration == DeclarationState::End {
            return Ok(());
        }
        Err(session.end_of_file())
    }
}
