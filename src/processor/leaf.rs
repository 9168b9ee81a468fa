//! Small single-purpose parsers used for arguments and error recovery.

use super::bytecode::Code;
use super::error::CompileError;
use super::generator;
use super::lexer::Scanner;
use super::parser::{ParseResult, Parser, ParserState, Session};
use super::token::{Keyword, Special, Token, TokenLoc, unquote};

// ── SkipParser ──────────────────────────────────────────────────────────

/// Swallows everything up to and including the next newline.
#[derive(Debug, Default)]
pub struct SkipParser {
    state: ParserState,
}

impl SkipParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parser for SkipParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_int(&mut self, _: i32, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        Ok(true)
    }

    fn parse_float(&mut self, _: f32, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        Ok(true)
    }

    fn parse_name(&mut self, _: &str, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        Ok(true)
    }

    fn parse_keyword(&mut self, _: Keyword, _: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        Ok(true)
    }

    fn parse_special(
        &mut self,
        special: Special,
        _: &TokenLoc,
        _: &mut Scanner,
        _: &mut Session<'_>,
    ) -> ParseResult {
        Ok(special != Special::Newline)
    }

    fn parse_eof(&mut self, _: &mut Scanner, _: &mut Session<'_>) -> Result<(), CompileError> {
        Ok(())
    }
}

// ── DiscardParser ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DiscardState {
    #[default]
    Start,
    Minus,
}

/// Accepts and drops a single value (optionally negated number or a name).
#[derive(Debug, Default)]
pub struct DiscardParser {
    state: ParserState,
    discard: DiscardState,
    loc: TokenLoc,
}

impl DiscardParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of the dropped value.
    pub fn token_loc(&self) -> &TokenLoc {
        &self.loc
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.state.set_optional(optional);
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.discard = DiscardState::Start;
        self.loc = TokenLoc::default();
    }

    fn accept(&mut self, loc: &TokenLoc) {
        if self.state.is_empty() {
            self.loc = loc.clone();
        }
        self.state.start();
    }
}

impl Parser for DiscardParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_int(&mut self, _: i32, loc: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.accept(loc);
        Ok(false)
    }

    fn parse_float(&mut self, _: f32, loc: &TokenLoc, _: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        self.accept(loc);
        Ok(false)
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if self.discard == DiscardState::Start {
            self.accept(loc);
            return Ok(false);
        }
        self.reject(Token::Name(name.to_string()), loc, scanner, session)
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if self.discard == DiscardState::Start && special == Special::Minus {
            self.accept(loc);
            self.discard = DiscardState::Minus;
            return Ok(true);
        }
        self.reject(Token::Special(special), loc, scanner, session)
    }
}

// ── JunkParser ──────────────────────────────────────────────────────────

/// Drops stray tokens some legacy scripts put after an instruction
/// (a repeated keyword or a lone `.`); everything else is handed back.
#[derive(Debug, Default)]
pub struct JunkParser {
    state: ParserState,
    ignore_keyword: Option<Keyword>,
}

impl JunkParser {
    pub fn new(ignore_keyword: Option<Keyword>) -> Self {
        Self {
            state: ParserState::default(),
            ignore_keyword,
        }
    }
}

impl Parser for JunkParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_int(&mut self, value: i32, loc: &TokenLoc, scanner: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        scanner.putback(Token::Int(value), loc.clone());
        Ok(false)
    }

    fn parse_float(&mut self, value: f32, loc: &TokenLoc, scanner: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        scanner.putback(Token::Float(value), loc.clone());
        Ok(false)
    }

    fn parse_name(&mut self, name: &str, loc: &TokenLoc, scanner: &mut Scanner, _: &mut Session<'_>) -> ParseResult {
        scanner.putback(Token::Name(name.to_string()), loc.clone());
        Ok(false)
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if Some(keyword) == self.ignore_keyword {
            session.warning("Ignoring found junk", loc);
        } else {
            scanner.putback(Token::Keyword(keyword), loc.clone());
        }
        Ok(false)
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if special == Special::Member {
            session.warning("Ignoring found junk", loc);
        } else {
            scanner.putback(Token::Special(special), loc.clone());
        }
        Ok(false)
    }
}

// ── StringParser ────────────────────────────────────────────────────────

/// Parses one string argument and emits a push of its literal index.
#[derive(Debug, Default)]
pub struct StringParser {
    state: ParserState,
    smash_case: bool,
    discard: bool,
    comma: bool,
    loc: TokenLoc,
    code: Vec<Code>,
}

impl StringParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower-case the string before storing it (object ids).
    pub fn smash_case(&mut self) {
        self.smash_case = true;
    }

    /// Accept the string but emit nothing.
    pub fn discard(&mut self) {
        self.discard = true;
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.state.set_optional(optional);
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn token_loc(&self) -> &TokenLoc {
        &self.loc
    }

    pub fn append(&mut self, code: &mut Vec<Code>) {
        code.append(&mut self.code);
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.smash_case = false;
        self.discard = false;
        self.comma = false;
        self.loc = TokenLoc::default();
        self.code.clear();
    }
}

impl Parser for StringParser {
    fn state(&mut self) -> &mut ParserState {
        &mut self.state
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        _scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.state.start();
        self.loc = loc.clone();
        if !self.discard {
            let value = if self.smash_case {
                name.to_lowercase()
            } else {
                name.to_string()
            };
            generator::push_string(&mut self.code, session.literals, &value);
        }
        Ok(false)
    }

    /// Keywords that are not functions are taken as the string they were
    /// spelled with.
    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        let as_name = match keyword {
            Keyword::Extension(code) => session
                .extensions()
                .is_some_and(|extensions| extensions.instruction(code).is_some()),
            _ => true,
        };
        if as_name {
            return self.parse_name(unquote(&loc.literal), loc, scanner, session);
        }
        self.reject(Token::Keyword(keyword), loc, scanner, session)
    }

    fn parse_int(
        &mut self,
        _value: i32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        session.warning("Treating integer argument as a string", loc);
        self.parse_name(&loc.literal, loc, scanner, session)
    }

    /// One comma may precede the string.
    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if special == Special::Comma && !self.comma && self.state.is_empty() {
            self.comma = true;
            return Ok(true);
        }
        self.reject(Token::Special(special), loc, scanner, session)
    }
}
