//! Hand-written scanner for the script language.
//!
//! The scanner does not build a token list. It pulls characters on demand
//! and feeds every token straight into the `Parser` that is currently
//! driving it, so a parser can switch scanning modes (strict keywords,
//! tolerant names, ...) between two tokens.
//
//  Lexical items (informal):
//
//      Name     ::= [alpha _ "] [alnum _ ` ' -]*   | '"' .* '"'
//      Int      ::= [0-9]+
//      Float    ::= [0-9]* '.' [0-9]+  | [0-9]+ '.'
//      Special  ::= ( ) [ ] , + - * / . -> == != < <= > >= NEWLINE
//      Comment  ::= ';' .* (up to the end of the line)
//
//  Blanks, ':' and '\r' separate tokens and are otherwise ignored.

use super::error::CompileError;
use super::extensions::Extensions;
use super::parser::{ParseResult, Parser, Session};
use super::token::{Keyword, Special, Token, TokenLoc};

/// `Ok(None)` means the input could not be tokenised; the caller reports it
/// as a syntax error.
type ScanResult = Result<Option<bool>, CompileError>;

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    loc: TokenLoc,
    prev_loc: TokenLoc,
    putback: Option<(Token, TokenLoc)>,
    strict_keywords: bool,
    tolerant_names: bool,
    ignore_newline: bool,
    expect_name: bool,
    ignore_special: bool,
    line_start: bool,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            loc: TokenLoc::default(),
            prev_loc: TokenLoc::default(),
            putback: None,
            strict_keywords: false,
            tolerant_names: false,
            ignore_newline: false,
            expect_name: false,
            ignore_special: true,
            line_start: true,
        }
    }

    /// Feeds tokens to `parser` until it returns `false` or input ends.
    pub fn scan<P: Parser + ?Sized>(
        &mut self,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        while self.scan_token(parser, session)? {}
        Ok(())
    }

    /// Makes `token` the next token delivered. Only one token can be held;
    /// a second push-back replaces the first.
    pub fn putback(&mut self, token: Token, loc: TokenLoc) {
        self.putback = Some((token, loc));
    }

    /// Quoted strings are names even if their content is a keyword.
    /// Ends with the current line.
    pub fn enable_strict_keywords(&mut self) {
        self.strict_keywords = true;
    }

    /// Accept `.` and `-` inside names. Ends with the current line.
    pub fn enable_tolerant_names(&mut self) {
        self.tolerant_names = true;
    }

    /// Scan the next token as a name even if it starts with a digit, `.` or
    /// `-`. Ends with the next token or the current line.
    pub fn enable_expect_name(&mut self) {
        self.expect_name = true;
    }

    /// Allow newlines inside quoted strings until the next newline token.
    pub fn enable_ignore_newlines(&mut self) {
        self.ignore_newline = true;
    }

    /// Was the last token delivered a newline (or nothing delivered yet)?
    pub fn at_line_start(&self) -> bool {
        self.line_start
    }

    /// Every keyword the scanner recognises.
    pub fn list_keywords(extensions: Option<&Extensions>) -> Vec<String> {
        let mut keywords: Vec<String> = Keyword::BUILTIN
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        if let Some(extensions) = extensions {
            keywords.extend(extensions.list_keywords());
        }
        keywords
    }

    // ── character level ─────────────────────────────────────────────────

    fn get(&mut self) -> Option<char> {
        let c = *self.chars.get(self.pos)?;
        self.pos += 1;
        self.prev_loc = self.loc.clone();

        if c == '\n' {
            self.strict_keywords = false;
            self.tolerant_names = false;
            self.expect_name = false;
            self.ignore_special = true;
            self.loc.column = 0;
            self.loc.line += 1;
            self.loc.literal.clear();
        } else {
            self.loc.column += 1;
            self.loc.literal.push(c);
        }
        Some(c)
    }

    /// Undoes the last `get`. Must not be called twice in a row.
    fn unget(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
            self.loc = std::mem::take(&mut self.prev_loc);
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn take_loc(&mut self) -> TokenLoc {
        let loc = self.loc.clone();
        self.loc.literal.clear();
        loc
    }

    /// Characters that may continue a name. A `-` counts when it is followed
    /// by such a character.
    fn is_string_character(&self, c: char, lookahead: bool) -> bool {
        if lookahead && c == '-' {
            if let Some(next) = self.peek() {
                if self.is_string_character(next, false) {
                    return true;
                }
            }
        }
        c.is_alphabetic() || c.is_ascii_digit() || matches!(c, '_' | '`' | '\'')
    }

    // ── token level ─────────────────────────────────────────────────────

    fn scan_token<P: Parser + ?Sized>(
        &mut self,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if let Some((token, loc)) = self.putback.take() {
            return self.dispatch(parser, token, &loc, session);
        }

        let Some(c) = self.get() else {
            parser.parse_eof(self, session)?;
            return Ok(false);
        };

        let scanned = match c {
            ';' => self.scan_comment(parser, session)?,
            ' ' | '\t' | ':' | '\r' => {
                self.loc.literal.clear();
                Some(true)
            }
            c if c.is_alphabetic() || c == '_' || c == '"' => {
                self.ignore_special = false;
                self.expect_name = false;
                self.scan_name(c.to_string(), parser, session)?
            }
            c if c.is_ascii_digit() => {
                self.ignore_special = false;
                if std::mem::take(&mut self.expect_name) {
                    self.scan_name(c.to_string(), parser, session)?
                } else {
                    self.scan_int(c, parser, session)?
                }
            }
            c => self.scan_special(c, parser, session)?,
        };

        match scanned {
            Some(cont) => Ok(cont),
            None => {
                let loc = self.take_loc();
                Err(session.serious_error("Syntax error", &loc))
            }
        }
    }

    fn dispatch<P: Parser + ?Sized>(
        &mut self,
        parser: &mut P,
        token: Token,
        loc: &TokenLoc,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.line_start = token == Token::Special(Special::Newline);
        match token {
            Token::Int(value) => parser.parse_int(value, loc, self, session),
            Token::Float(value) => parser.parse_float(value, loc, self, session),
            Token::Name(name) => parser.parse_name(&name, loc, self, session),
            Token::Keyword(keyword) => parser.parse_keyword(keyword, loc, self, session),
            Token::Special(special) => parser.parse_special(special, loc, self, session),
            Token::Comment(comment) => parser.parse_comment(&comment, loc, self, session),
            Token::Eof => {
                parser.parse_eof(self, session)?;
                Ok(false)
            }
        }
    }

    fn scan_comment<P: Parser + ?Sized>(
        &mut self,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> ScanResult {
        let mut comment = String::new();
        while let Some(c) = self.get() {
            if c == '\n' {
                self.unget();
                break;
            }
            comment.push(c);
        }
        let loc = self.take_loc();
        self.dispatch(parser, Token::Comment(comment), &loc, session)
            .map(Some)
    }

    fn scan_int<P: Parser + ?Sized>(
        &mut self,
        first: char,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> ScanResult {
        let mut value = first.to_string();

        while let Some(c) = self.get() {
            if c.is_ascii_digit() {
                value.push(c);
            } else if c != '-' && self.is_string_character(c, true) {
                // names beginning with digits
                value.push(c);
                return self.scan_name(value, parser, session);
            } else if c == '.' {
                return self.scan_float(value, parser, session);
            } else {
                self.unget();
                break;
            }
        }

        let loc = self.take_loc();
        let number = value.parse::<i32>().unwrap_or(i32::MAX);
        self.dispatch(parser, Token::Int(number), &loc, session)
            .map(Some)
    }

    /// Continues after the decimal point; `int_part` holds the digits before it.
    fn scan_float<P: Parser + ?Sized>(
        &mut self,
        int_part: String,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> ScanResult {
        let mut empty = int_part.is_empty();
        let mut error = false;
        let mut value = if empty { "0".to_string() } else { int_part };
        value.push('.');

        while let Some(c) = self.get() {
            if c.is_ascii_digit() {
                value.push(c);
                empty = false;
            } else if c.is_alphabetic() || c == '_' {
                error = true;
            } else {
                self.unget();
                break;
            }
        }

        if empty || error {
            return Ok(None);
        }

        let loc = self.take_loc();
        let number = value.parse::<f32>().unwrap_or(0.0);
        self.dispatch(parser, Token::Float(number), &loc, session)
            .map(Some)
    }

    /// `name` holds the characters consumed so far.
    fn scan_name<P: Parser + ?Sized>(
        &mut self,
        mut name: String,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> ScanResult {
        if !self.scan_name_tail(&mut name, session) {
            return Ok(None);
        }

        if name.is_empty() {
            self.loc.literal.clear();
            return Ok(Some(true));
        }

        let loc = self.take_loc();

        if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
            name = name[1..name.len() - 1].to_string();
            if self.strict_keywords {
                return self
                    .dispatch(parser, Token::Name(name), &loc, session)
                    .map(Some);
            }
        }

        let lower = name.to_lowercase();

        if let Some(keyword) = Keyword::builtin(&lower) {
            if keyword == Keyword::MessageBox {
                self.enable_ignore_newlines();
            }
            return self
                .dispatch(parser, Token::Keyword(keyword), &loc, session)
                .map(Some);
        }

        if let Some(code) = session
            .extensions()
            .and_then(|extensions| extensions.search_keyword(&lower))
        {
            return self
                .dispatch(parser, Token::Keyword(Keyword::Extension(code)), &loc, session)
                .map(Some);
        }

        self.dispatch(parser, Token::Name(name), &loc, session)
            .map(Some)
    }

    /// Consumes the rest of a name. Returns `false` on an unterminated
    /// string; `name` is cleared for a lone quote at the end of a line.
    fn scan_name_tail(&mut self, name: &mut String, session: &mut Session<'_>) -> bool {
        let quoted = name.starts_with('"');

        while let Some(c) = self.get() {
            if quoted {
                if c == '"' {
                    name.push(c);
                    break;
                }
                if c == '\n' {
                    if self.ignore_newline {
                        session.warning("String contains newline", &self.loc);
                        name.push(c);
                        continue;
                    }

                    let content = name[1..].split(';').next().unwrap_or_default();
                    if content.chars().all(|c| matches!(c, ' ' | '\t' | '\r')) {
                        self.unget();
                        let loc = self.loc.clone();
                        session.warning("Stray string argument", &loc);
                        name.clear();
                        return true;
                    }

                    self.unget();
                    session.error("Incomplete string or name", &self.loc);
                    return false;
                }
            } else if !(self.is_string_character(c, true)
                || (self.tolerant_names && matches!(c, '.' | '-')))
            {
                self.unget();
                break;
            }

            name.push(c);
        }

        true
    }

    fn scan_special<P: Parser + ?Sized>(
        &mut self,
        c: char,
        parser: &mut P,
        session: &mut Session<'_>,
    ) -> ScanResult {
        let expect_name = std::mem::take(&mut self.expect_name);

        let special = if c == '\n' {
            Special::Newline
        } else if self.ignore_special {
            while let Some(next) = self.peek() {
                if next.is_whitespace()
                    || next.is_alphanumeric()
                    || matches!(next, '_' | '"' | ';' | ':')
                {
                    break;
                }
                self.get();
            }
            let loc = self.take_loc();
            session.warning("Stray special character at start of line", &loc);
            return Ok(Some(true));
        } else {
            match c {
                '(' | '[' => Special::Open,
                ')' | ']' => Special::Close,
                '.' => {
                    if self.peek().is_some_and(|next| next.is_ascii_digit()) {
                        return self.scan_float(String::new(), parser, session);
                    }
                    Special::Member
                }
                ',' => Special::Comma,
                '-' => {
                    if self.peek() == Some('>') {
                        self.get();
                        Special::Ref
                    } else {
                        Special::Minus
                    }
                }
                '=' | '!' | '<' | '>' => match self.scan_comparison(c, session) {
                    Some(special) => special,
                    None => return Ok(None),
                },
                '+' => Special::Plus,
                '*' => Special::Mult,
                '/' => Special::Div,
                _ => return Ok(None),
            }
        };

        if expect_name && matches!(special, Special::Member | Special::Minus) {
            let tolerant = std::mem::replace(&mut self.tolerant_names, true);
            let scanned = self.scan_name(c.to_string(), parser, session);
            self.tolerant_names = tolerant;
            return scanned;
        }

        if special == Special::Newline {
            self.ignore_newline = false;
            self.loc.literal = "<newline>".to_string();
        }

        let loc = self.take_loc();
        self.dispatch(parser, Token::Special(special), &loc, session)
            .map(Some)
    }

    /// Reads a comparison operator starting with `first`, tolerating blanks
    /// inside it and a few legacy misspellings.
    fn scan_comparison(&mut self, first: char, session: &mut Session<'_>) -> Option<Special> {
        let mut op = first.to_string();
        while let Some(c) = self.peek() {
            if !matches!(c, '=' | '!' | '<' | '>' | ' ' | '\t') {
                break;
            }
            self.get();
            op.push(c);
        }

        let trimmed = self.loc.literal.trim_end_matches([' ', '\t']).len();
        self.loc.literal.truncate(trimmed);

        let compact: String = op.chars().filter(|c| !matches!(c, ' ' | '\t')).collect();

        let special = match compact.as_str() {
            "==" => Special::CmpEq,
            "!=" => Special::CmpNe,
            "<" => Special::CmpLt,
            "<=" | "<==" => Special::CmpLe,
            ">" => Special::CmpGt,
            ">=" | ">==" => Special::CmpGe,
            _ => {
                let (special, text) = match first {
                    '=' => (Special::CmpEq, "=="),
                    '<' if compact.starts_with("<=") => (Special::CmpLe, "<="),
                    '<' => (Special::CmpLt, "<"),
                    '>' if compact.starts_with(">=") => (Special::CmpGe, ">="),
                    '>' => (Special::CmpGt, ">"),
                    '!' if compact.starts_with("!=") => (Special::CmpNe, "!="),
                    _ => return None,
                };
                let loc = self.loc.clone();
                session.warning(
                    &format!("Invalid operator {compact}, treating it as {text}"),
                    &loc,
                );
                special
            }
        };

        Some(special)
    }
}
