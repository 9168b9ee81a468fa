//! Expression parser.
//!
//! Operands are emitted as soon as they are seen; operators wait on a stack
//! until an operator of lower or equal priority (or the end of the
//! expression) forces them out. A parallel stack tracks the stack type
//! (`Long` or `Float`) of every emitted operand so that each operator can
//! pick its integer or float instruction.
//!
//! The parser is also used for call arguments. In argument mode a top-level
//! `+`, `-` or comparison ends the expression, since arguments are often
//! written without separating commas (`Foo 1 -2` passes two arguments).

use super::bytecode::Code;
use super::error::CompileError;
use super::generator::{self, Comparison};
use super::leaf::{DiscardParser, JunkParser, StringParser};
use super::lexer::Scanner;
use super::parser::{ParseResult, Parser, ParserState, Session};
use super::token::{Keyword, Special, Token, TokenLoc, unquote};
use super::value_type::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Open,
    Compare(Comparison),
    Add,
    Sub,
    Mul,
    Div,
    Negate,
}

impl Operator {
    fn priority(self) -> u8 {
        match self {
            Operator::Open => 0,
            Operator::Compare(_) => 1,
            Operator::Add | Operator::Sub => 2,
            Operator::Mul | Operator::Div => 3,
            Operator::Negate => 4,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExprParser {
    state: ParserState,
    argument: bool,
    operands: Vec<ValueType>,
    operators: Vec<Operator>,
    next_operand: bool,
    first: bool,
    loc: TokenLoc,
    code: Vec<Code>,
    /// Object id of a pending explicit reference (`id->` or `id.`).
    explicit: String,
    ref_op: bool,
    member_op: bool,
}

impl ExprParser {
    /// `argument` selects argument mode (see the module docs).
    pub fn new(argument: bool) -> Self {
        Self {
            argument,
            next_operand: true,
            first: true,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.operands.clear();
        self.operators.clear();
        self.next_operand = true;
        self.first = true;
        self.loc = TokenLoc::default();
        self.code.clear();
        self.explicit.clear();
        self.ref_op = false;
        self.member_op = false;
    }

    /// Location of the last token that contributed to the expression.
    pub fn token_loc(&self) -> &TokenLoc {
        &self.loc
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.state.set_optional(optional);
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Finishes the expression, appends its code and returns its type.
    ///
    /// A malformed expression is reported and typed as `Long`; no code is
    /// appended in that case.
    pub fn append(
        &mut self,
        code: &mut Vec<Code>,
        session: &mut Session<'_>,
    ) -> Result<ValueType, CompileError> {
        if self.operands.is_empty() && self.operators.is_empty() {
            session.error("Missing expression", &self.loc);
            return Ok(ValueType::Long);
        }

        if self.next_operand || self.operands.is_empty() {
            session.error("Syntax error in expression", &self.loc);
            return Ok(ValueType::Long);
        }

        if self.is_open() {
            session.error("Missing closing parenthesis", &self.loc);
            return Ok(ValueType::Long);
        }

        while !self.operators.is_empty() {
            self.pop()?;
        }

        code.extend_from_slice(&self.code);

        debug_assert_eq!(self.operands.len(), 1);
        self.operands
            .last()
            .copied()
            .ok_or_else(|| CompileError::internal("expression left no operand"))
    }

    /// Parses the arguments described by the signature `arguments` and
    /// appends their code to `code`. Returns how many optional arguments
    /// were present.
    ///
    /// Argument code is appended in reverse order, so the first argument
    /// ends up on top of the VM stack.
    pub fn parse_arguments(
        arguments: &str,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
        code: &mut Vec<Code>,
        ignore_keyword: Option<Keyword>,
        expect_names: bool,
    ) -> Result<u32, CompileError> {
        let mut optional = false;
        let mut optional_count = 0;

        let mut parser = ExprParser::new(true);
        let mut string_parser = StringParser::new();
        let mut discard_parser = DiscardParser::new();

        let mut stack: Vec<Vec<Code>> = Vec::new();

        for argument in arguments.chars() {
            match argument {
                '/' => optional = true,
                'S' | 'c' | 'x' => {
                    string_parser.reset();
                    if optional || argument == 'x' {
                        string_parser.set_optional(true);
                    }
                    if argument == 'c' {
                        string_parser.smash_case();
                    }
                    if argument == 'x' {
                        string_parser.discard();
                    }
                    scanner.enable_expect_name();
                    scanner.scan(&mut string_parser, session)?;

                    if (optional || argument == 'x') && string_parser.is_empty() {
                        break;
                    }

                    if argument == 'x' {
                        session.warning("Extra argument", string_parser.token_loc());
                    } else {
                        let mut argument_code = Vec::new();
                        string_parser.append(&mut argument_code);
                        stack.push(argument_code);
                        if optional {
                            optional_count += 1;
                        }
                    }
                }
                'X' => {
                    parser.reset();
                    parser.set_optional(true);
                    scanner.scan(&mut parser, session)?;
                    if parser.is_empty() {
                        break;
                    }
                    session.warning("Extra argument", parser.token_loc());
                }
                'z' => {
                    discard_parser.reset();
                    discard_parser.set_optional(true);
                    scanner.scan(&mut discard_parser, session)?;
                    if discard_parser.is_empty() {
                        break;
                    }
                    session.warning("Extra argument", discard_parser.token_loc());
                }
                'j' => {
                    scanner.scan(&mut JunkParser::new(ignore_keyword), session)?;
                }
                letter => {
                    let expected = ValueType::from_code(letter).ok_or_else(|| {
                        CompileError::internal(format!("unknown argument type '{letter}'"))
                    })?;

                    parser.reset();
                    if optional {
                        parser.set_optional(true);
                    }
                    if expect_names {
                        scanner.enable_expect_name();
                    }
                    scanner.scan(&mut parser, session)?;

                    if optional && parser.is_empty() {
                        break;
                    }

                    let mut argument_code = Vec::new();
                    let found = parser.append(&mut argument_code, session)?;
                    generator::convert(&mut argument_code, found, expected);
                    stack.push(argument_code);
                    if optional {
                        optional_count += 1;
                    }
                }
            }
        }

        for argument_code in stack.into_iter().rev() {
            code.extend(argument_code);
        }

        Ok(optional_count)
    }

    // ── operator stack ──────────────────────────────────────────────────

    fn is_open(&self) -> bool {
        self.operators.contains(&Operator::Open)
    }

    fn operand(&self, depth: usize) -> Result<ValueType, CompileError> {
        self.operands
            .len()
            .checked_sub(depth + 1)
            .map(|index| self.operands[index])
            .ok_or_else(|| CompileError::internal("operand stack underflow"))
    }

    /// Replaces the two topmost operand types by the type of their result.
    fn replace_binary_operands(&mut self) -> Result<(), CompileError> {
        let left = self.operand(1)?;
        let right = self.operand(0)?;
        self.operands.truncate(self.operands.len() - 2);
        self.operands.push(if left.is_float() || right.is_float() {
            ValueType::Float
        } else {
            ValueType::Long
        });
        Ok(())
    }

    fn pop(&mut self) -> Result<(), CompileError> {
        let operator = self
            .operators
            .pop()
            .ok_or_else(|| CompileError::internal("operator stack underflow"))?;

        match operator {
            Operator::Negate => {
                let ty = self.operand(0)?;
                generator::negate(&mut self.code, ty);
            }
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                let (left, right) = (self.operand(1)?, self.operand(0)?);
                let emit: fn(&mut Vec<Code>, ValueType, ValueType) = match operator {
                    Operator::Add => generator::add,
                    Operator::Sub => generator::sub,
                    Operator::Mul => generator::mul,
                    _ => generator::div,
                };
                emit(&mut self.code, left, right);
                self.replace_binary_operands()?;
            }
            Operator::Compare(comparison) => {
                let (left, right) = (self.operand(1)?, self.operand(0)?);
                generator::compare(&mut self.code, comparison, left, right);
                self.operands.truncate(self.operands.len() - 2);
                self.operands.push(ValueType::Long);
            }
            Operator::Open => return Err(CompileError::internal("unknown operator")),
        }
        Ok(())
    }

    fn push_binary_operator(&mut self, operator: Operator) -> Result<(), CompileError> {
        while let Some(top) = self.operators.last() {
            if top.priority() < operator.priority() {
                break;
            }
            self.pop()?;
        }
        self.operators.push(operator);
        self.next_operand = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CompileError> {
        while self.operators.last() != Some(&Operator::Open) {
            self.pop()?;
        }
        self.operators.pop();
        Ok(())
    }

    // ── operands ────────────────────────────────────────────────────────

    fn push_operand(&mut self, ty: ValueType) {
        self.operands.push(ty.operand());
        self.next_operand = false;
    }

    fn push_integer(&mut self, value: i32, session: &mut Session<'_>) {
        generator::push_int(&mut self.code, session.literals, value);
        self.push_operand(ValueType::Long);
    }

    fn push_float(&mut self, value: f32, session: &mut Session<'_>) {
        generator::push_float(&mut self.code, session.literals, value);
        self.push_operand(ValueType::Float);
    }

    /// Resolves `name` after `id.` as a member variable of `id`.
    fn handle_member_access(&mut self, name: &str, session: &mut Session<'_>) -> bool {
        self.member_op = false;

        let name = name.to_lowercase();
        let Some((ty, reference)) = session.context.member_type(&name, &self.explicit) else {
            return false;
        };

        generator::fetch_member(
            &mut self.code,
            session.literals,
            ty,
            &name,
            &self.explicit,
            !reference,
        );
        self.explicit.clear();
        self.push_operand(ty);
        true
    }

    /// Emits a built-in function. Returns `false` if `keyword` is not one.
    fn builtin_function(
        &mut self,
        keyword: Keyword,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<bool, CompileError> {
        let ty = match keyword {
            Keyword::GetSquareRoot => {
                Self::parse_arguments("f", scanner, session, &mut self.code, None, false)?;
                generator::square_root(&mut self.code);
                ValueType::Float
            }
            Keyword::MenuMode => {
                generator::menu_mode(&mut self.code);
                ValueType::Long
            }
            Keyword::Random => {
                Self::parse_arguments("l", scanner, session, &mut self.code, None, false)?;
                generator::random(&mut self.code);
                ValueType::Float
            }
            Keyword::ScriptRunning => {
                Self::parse_arguments("c", scanner, session, &mut self.code, None, false)?;
                generator::script_running(&mut self.code);
                ValueType::Long
            }
            Keyword::GetDistance => {
                Self::parse_arguments("c", scanner, session, &mut self.code, None, false)?;
                generator::get_distance(&mut self.code, session.literals, &self.explicit);
                self.explicit.clear();
                ValueType::Float
            }
            Keyword::GetSecondsPassed => {
                generator::get_seconds_passed(&mut self.code);
                ValueType::Float
            }
            Keyword::GetDisabled => {
                generator::get_disabled(&mut self.code, session.literals, &self.explicit);
                self.explicit.clear();
                ValueType::Long
            }
            _ => return Ok(false),
        };

        self.ref_op = false;
        self.push_operand(ty);
        Ok(true)
    }

    /// Emits a call of the extension function `keyword`, applied to the
    /// pending explicit reference if there is one.
    fn extension_function(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<bool, CompileError> {
        let Keyword::Extension(code) = keyword else {
            return Ok(false);
        };
        let Some(extensions) = session.extensions() else {
            return Ok(false);
        };
        let Some(function) = extensions.function(code) else {
            return Ok(false);
        };

        if !self.explicit.is_empty() && !function.has_explicit() {
            session.warning("Stray explicit reference", loc);
            self.explicit.clear();
        }

        self.state.start();
        self.loc = loc.clone();
        let optionals = Self::parse_arguments(
            &function.arguments,
            scanner,
            session,
            &mut self.code,
            None,
            false,
        )?;
        extensions.generate_function_code(
            code,
            &mut self.code,
            session.literals,
            &self.explicit,
            optionals,
        )?;

        let ty = function.return_type.unwrap_or(ValueType::Long);
        self.explicit.clear();
        self.ref_op = false;
        self.push_operand(ty);
        Ok(true)
    }
}

impl Parser for ExprParser {
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
        if !self.explicit.is_empty() {
            return self.reject(Token::Int(value), loc, scanner, session);
        }

        self.first = false;

        if !self.next_operand {
            // no comma between arguments
            scanner.putback(Token::Int(value), loc.clone());
            return Ok(false);
        }

        self.state.start();
        self.push_integer(value, session);
        self.loc = loc.clone();
        Ok(true)
    }

    fn parse_float(
        &mut self,
        value: f32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if !self.explicit.is_empty() {
            return self.reject(Token::Float(value), loc, scanner, session);
        }

        self.first = false;

        if !self.next_operand {
            scanner.putback(Token::Float(value), loc.clone());
            return Ok(false);
        }

        self.state.start();
        self.push_float(value, session);
        self.loc = loc.clone();
        Ok(true)
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if !self.explicit.is_empty() {
            if !self.ref_op {
                if self.member_op && self.handle_member_access(name, session) {
                    return Ok(true);
                }
                return self.reject(Token::Name(name.to_string()), loc, scanner, session);
            }
            self.explicit.clear();
            session.warning("Stray explicit reference", loc);
        }

        self.first = false;

        if !self.next_operand {
            scanner.putback(Token::Name(name.to_string()), loc.clone());
            return Ok(false);
        }

        self.state.start();
        let lower = name.to_lowercase();

        if let Some(ty) = session.locals.get_type(&lower) {
            let index = session.locals.get_index(&lower).unwrap_or_default();
            generator::fetch_local(&mut self.code, ty, index);
            self.push_operand(ty);
            return Ok(true);
        }

        if let Some(ty) = session.context.global_type(&lower) {
            generator::fetch_global(&mut self.code, session.literals, ty, &lower);
            self.push_operand(ty);
            return Ok(true);
        }

        if self.explicit.is_empty() && session.context.is_id(&lower) {
            self.explicit = lower;
            return Ok(true);
        }

        // Legacy content uses bare words where numbers are expected. Read
        // whatever number the word starts with (zero if none).
        let number = leading_float(&lower);
        self.push_float(number, session);
        self.loc = loc.clone();
        session.warning(
            &format!(
                "Parsing a non-variable string as a number: {}",
                format_general(number)
            ),
            loc,
        );
        Ok(true)
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if let Keyword::Extension(code) = keyword {
            let is_instruction = session
                .extensions()
                .is_some_and(|extensions| extensions.instruction(code).is_some());
            if is_instruction {
                // an instruction here can only be meant as a name
                return self.parse_name(unquote(&loc.literal), loc, scanner, session);
            }
        }

        if keyword.is_statement_keyword() {
            return self.parse_name(&loc.literal, loc, scanner, session);
        }

        self.first = false;

        if !self.explicit.is_empty() {
            if self.ref_op && self.next_operand {
                if matches!(keyword, Keyword::GetDisabled | Keyword::GetDistance) {
                    self.state.start();
                    self.loc = loc.clone();
                    self.builtin_function(keyword, scanner, session)?;
                    return Ok(true);
                }
                if self.extension_function(keyword, loc, scanner, session)? {
                    return Ok(true);
                }
            }
            return self.reject(Token::Keyword(keyword), loc, scanner, session);
        }

        if !self.next_operand {
            scanner.putback(Token::Keyword(keyword), loc.clone());
            return Ok(false);
        }

        self.state.start();
        self.loc = loc.clone();
        if self.builtin_function(keyword, scanner, session)? {
            return Ok(true);
        }
        if self.extension_function(keyword, loc, scanner, session)? {
            return Ok(true);
        }

        self.reject(Token::Keyword(keyword), loc, scanner, session)
    }

    fn parse_special(
        &mut self,
        special: Special,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if !self.explicit.is_empty() {
            if self.ref_op && special == Special::Open {
                self.operators.push(Operator::Open);
                self.loc = loc.clone();
                return Ok(true);
            }
            if !self.ref_op && special == Special::Ref {
                self.ref_op = true;
                return Ok(true);
            }
            if !self.member_op && special == Special::Member {
                self.member_op = true;
                return Ok(true);
            }
            return self.reject(Token::Special(special), loc, scanner, session);
        }

        if special == Special::Comma {
            self.loc = loc.clone();
            if self.first {
                // leading comma
                self.first = false;
                return Ok(true);
            }
            // argument separator
            scanner.putback(Token::Special(special), loc.clone());
            return Ok(false);
        }

        self.first = false;

        if special == Special::Newline {
            self.loc = loc.clone();
            scanner.putback(Token::Special(special), loc.clone());
            return Ok(false);
        }

        if self.next_operand {
            match special {
                Special::Minus => {
                    self.operators.push(Operator::Negate);
                    self.loc = loc.clone();
                    return Ok(true);
                }
                Special::Plus => {
                    // unary plus is a no-op
                    self.loc = loc.clone();
                    return Ok(true);
                }
                Special::Open => {
                    self.operators.push(Operator::Open);
                    self.loc = loc.clone();
                    return Ok(true);
                }
                _ => {}
            }
        } else {
            if special == Special::Open {
                // no comma between arguments
                scanner.putback(Token::Special(special), loc.clone());
                return Ok(false);
            }

            if special == Special::Close {
                if self.is_open() {
                    self.close()?;
                    return Ok(true);
                }
                self.loc = loc.clone();
                scanner.putback(Token::Special(special), loc.clone());
                return Ok(false);
            }

            self.loc = loc.clone();
            let operator = match special {
                Special::Mult => Some(Operator::Mul),
                Special::Div => Some(Operator::Div),
                Special::Plus => Some(Operator::Add),
                Special::Minus => Some(Operator::Sub),
                Special::CmpEq => Some(Operator::Compare(Comparison::Equal)),
                Special::CmpNe => Some(Operator::Compare(Comparison::NotEqual)),
                Special::CmpLt => Some(Operator::Compare(Comparison::Less)),
                Special::CmpLe => Some(Operator::Compare(Comparison::LessOrEqual)),
                Special::CmpGt => Some(Operator::Compare(Comparison::Greater)),
                Special::CmpGe => Some(Operator::Compare(Comparison::GreaterOrEqual)),
                _ => None,
            };

            if let Some(operator) = operator {
                let ends_argument = !matches!(operator, Operator::Mul | Operator::Div)
                    && self.argument
                    && !self.is_open();
                if ends_argument {
                    scanner.putback(Token::Special(special), loc.clone());
                    return Ok(false);
                }
                self.push_binary_operator(operator)?;
                return Ok(true);
            }
        }

        self.reject(Token::Special(special), loc, scanner, session)
    }
}

/// Value of the longest prefix of `text` that reads as a decimal number,
/// or zero.
fn leading_float(text: &str) -> f32 {
    let bytes = text.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let whole = digits(end);
    end += whole;

    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits(end + 1);
        end += 1 + fraction;
    }

    if whole + fraction == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let count = digits(exponent);
        if count > 0 {
            end = exponent + count;
        }
    }

    text[..end].parse().unwrap_or(0.0)
}

/// Formats like C's `%g`: six significant digits, trailing zeros dropped,
/// scientific notation for very small or large magnitudes.
fn format_general(value: f32) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }

    let scientific = format!("{:.5e}", f64::from(value));
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        );
    }

    let decimals = (5 - exponent) as usize;
    trim_fraction(&format!("{:.decimals$}", f64::from(value)))
}

fn trim_fraction(number: &str) -> String {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        number.to_string()
    }
}
