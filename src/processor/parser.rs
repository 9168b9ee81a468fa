//! The token callback protocol shared by every parser.
//!
//! The scanner drives a parser by calling one `parse_*` method per token.
//! A method returns `Ok(true)` to receive the next token and `Ok(false)` to
//! hand control back to whoever started the scan. Serious problems are
//! reported to the `ErrorHandler` and unwound as `CompileError::Source`.

use super::context::Context;
use super::error::{CompileError, ErrorHandler};
use super::extensions::Extensions;
use super::leaf::SkipParser;
use super::lexer::Scanner;
use super::literals::Literals;
use super::locals::Locals;
use super::token::{Keyword, Special, Token, TokenLoc};

pub type ParseResult = Result<bool, CompileError>;

/// Everything the parsers of one compilation share.
pub struct Session<'a> {
    pub errors: &'a mut ErrorHandler,
    pub context: &'a dyn Context,
    pub locals: &'a mut Locals,
    pub literals: &'a mut Literals,
}

impl<'a> Session<'a> {
    pub fn new(
        errors: &'a mut ErrorHandler,
        context: &'a dyn Context,
        locals: &'a mut Locals,
        literals: &'a mut Literals,
    ) -> Self {
        Self {
            errors,
            context,
            locals,
            literals,
        }
    }

    pub fn extensions(&self) -> Option<&'a Extensions> {
        let context: &'a dyn Context = self.context;
        context.extensions()
    }

    pub fn warning(&mut self, message: &str, loc: &TokenLoc) {
        self.errors.warning(message, loc);
    }

    pub fn error(&mut self, message: &str, loc: &TokenLoc) {
        self.errors.error(message, loc);
    }

    /// Reports an error and returns the error that aborts the parse.
    pub fn serious_error(&mut self, message: &str, loc: &TokenLoc) -> CompileError {
        self.errors.error(message, loc);
        CompileError::Source
    }

    pub fn end_of_file(&mut self) -> CompileError {
        self.errors.end_of_file();
        CompileError::EndOfFile
    }
}

impl AsMut<ErrorHandler> for Session<'_> {
    fn as_mut(&mut self) -> &mut ErrorHandler {
        &mut *self.errors
    }
}

/// Bookkeeping for optional parses: an optional parser that has not
/// accepted anything yet puts unexpected tokens back instead of failing.
#[derive(Debug, Clone)]
pub struct ParserState {
    optional: bool,
    empty: bool,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            optional: false,
            empty: true,
        }
    }
}

impl ParserState {
    /// Marks that the parser has accepted a token.
    pub fn start(&mut self) {
        self.empty = false;
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    pub fn reset(&mut self) {
        self.optional = false;
        self.empty = true;
    }
}

pub trait Parser {
    fn state(&mut self) -> &mut ParserState;

    fn parse_int(
        &mut self,
        value: i32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.reject(Token::Int(value), loc, scanner, session)
    }

    fn parse_float(
        &mut self,
        value: f32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.reject(Token::Float(value), loc, scanner, session)
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.reject(Token::Name(name.to_string()), loc, scanner, session)
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.reject(Token::Keyword(keyword), loc, scanner, session)
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.reject(Token::Special(special), loc, scanner, session)
    }

    fn parse_comment(
        &mut self,
        _comment: &str,
        _loc: &TokenLoc,
        _scanner: &mut Scanner,
        _session: &mut Session<'_>,
    ) -> ParseResult {
        Ok(true)
    }

    fn parse_eof(
        &mut self,
        _scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        Err(session.end_of_file())
    }

    /// Default handling of a token the parser has no use for.
    fn reject(
        &mut self,
        token: Token,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        let state = self.state();
        if state.optional && state.empty {
            scanner.putback(token, loc.clone());
            return Ok(false);
        }
        let message = match token {
            Token::Int(_) => "Unexpected numeric value",
            Token::Float(_) => "Unexpected floating point value",
            Token::Name(_) => "Unexpected name",
            Token::Keyword(_) => "Unexpected keyword",
            Token::Special(_) => "Unexpected special token",
            Token::Comment(_) | Token::Eof => "Unexpected token",
        };
        Err(session.serious_error(message, loc))
    }
}

/// Skips the remainder of the current line, unless the line terminator has
/// already been consumed.
pub fn skip_line(scanner: &mut Scanner, session: &mut Session<'_>) -> Result<(), CompileError> {
    if scanner.at_line_start() {
        return Ok(());
    }
    scanner.scan(&mut SkipParser::new(), session)
}

/// Line-level error recovery: a reported error abandons the rest of the
/// line, everything else propagates.
pub fn recover_line(
    result: Result<(), CompileError>,
    scanner: &mut Scanner,
    session: &mut Session<'_>,
) -> Result<bool, CompileError> {
    match result {
        Ok(()) => Ok(true),
        Err(CompileError::Source) => {
            skip_line(scanner, session)?;
            Ok(false)
        }
        Err(error) => Err(error),
    }
}
