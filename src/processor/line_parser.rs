//! Parser for a single statement line.
//!
//! Handles assignments, message boxes, built-in and extension instructions
//! (optionally applied to an explicit reference), local declarations and,
//! in console mode, bare expressions whose value is reported.
//!
//! The line's code collects in the parser's own buffer. The caller moves
//! it out with [`LineParser::append`] once the line is complete, or drops
//! it with [`LineParser::reset`] when the line had to be skipped.

use super::bytecode::Code;
use super::declaration_parser::DeclarationParser;
use super::error::{CompileError, ErrorDowngrade};
use super::expr_parser::ExprParser;
use super::generator;
use super::lexer::Scanner;
use super::message_format;
use super::parser::{ParseResult, Parser, ParserState, Session, recover_line, skip_line};
use super::token::{Keyword, Special, Token, TokenLoc, unquote};
use super::value_type::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LineState {
    #[default]
    Begin,
    Set,
    SetLocalVar(ValueType, usize),
    SetGlobalVar(ValueType),
    SetPotentialMemberVar,
    SetMemberVar,
    /// member type, member of a reference (not a global script)
    SetMemberVar2(ValueType, bool),
    Message,
    MessageComma,
    MessageButton,
    MessageButtonComma,
    End,
    PotentialExplicit,
    Explicit,
    Member,
}

#[derive(Debug, Default)]
pub struct LineParser {
    state: ParserState,
    line: LineState,
    allow_expression: bool,
    /// Variable being assigned, or the message box format string.
    name: String,
    member_name: String,
    buttons: u32,
    explicit: String,
    expr: ExprParser,
    code: Vec<Code>,
}

impl LineParser {
    /// `allow_expression` accepts bare expressions (console input).
    pub fn new(allow_expression: bool) -> Self {
        Self {
            allow_expression,
            expr: ExprParser::new(false),
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.line = LineState::Begin;
        self.name.clear();
        self.member_name.clear();
        self.buttons = 0;
        self.explicit.clear();
        self.expr.reset();
        self.code.clear();
    }

    /// Moves the code of the parsed line to `code`.
    pub fn append(&mut self, code: &mut Vec<Code>) {
        code.append(&mut self.code);
    }

    /// Parses a whole line into `code`. The line starts with `keyword` if
    /// given, otherwise with the next token of `scanner`.
    ///
    /// A line with a reported error is skipped and contributes no code;
    /// returns whether the line compiled.
    pub fn parse_line(
        &mut self,
        keyword: Option<(Keyword, &TokenLoc)>,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
        code: &mut Vec<Code>,
    ) -> Result<bool, CompileError> {
        self.reset();
        let result = match keyword {
            Some((keyword, loc)) => match self.parse_keyword(keyword, loc, scanner, session) {
                Ok(true) => scanner.scan(self, session),
                Ok(false) => Ok(()),
                Err(error) => Err(error),
            },
            None => scanner.scan(self, session),
        };

        let compiled = recover_line(result, scanner, session)?;
        if compiled {
            self.append(code);
        } else {
            self.reset();
        }
        Ok(compiled)
    }

    /// Parses an expression and reports its value.
    fn parse_expression(
        &mut self,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        self.expr.reset();

        if !self.explicit.is_empty() {
            let explicit = self.explicit.clone();
            self.expr.parse_name(&explicit, loc, scanner, session)?;
            let special = if self.line == LineState::Member {
                Special::Member
            } else {
                Special::Ref
            };
            self.expr.parse_special(special, loc, scanner, session)?;
        }

        scanner.scan(&mut self.expr, session)?;
        let ty = self.expr.append(&mut self.code, session)?;
        self.line = LineState::End;

        let format = if ty.is_float() { "%f" } else { "%d" };
        generator::report(&mut self.code, session.literals, format);
        Ok(())
    }

    /// Parses the value of a `set` statement.
    fn parse_value(
        &mut self,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(Vec<Code>, ValueType), CompileError> {
        self.expr.reset();
        scanner.scan(&mut self.expr, session)?;
        let mut value = Vec::new();
        let ty = self.expr.append(&mut value, session)?;
        Ok((value, ty))
    }

    /// Built-in instructions. Returns `false` if `keyword` is not one.
    fn builtin_instruction(
        &mut self,
        keyword: Keyword,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<bool, CompileError> {
        match keyword {
            Keyword::Enable => generator::enable(&mut self.code, session.literals, &self.explicit),
            Keyword::Disable => {
                generator::disable(&mut self.code, session.literals, &self.explicit)
            }
            Keyword::StartScript => {
                ExprParser::parse_arguments("c", scanner, session, &mut self.code, None, false)?;
                generator::start_script(&mut self.code, session.literals, &self.explicit);
            }
            Keyword::StopScript if self.line == LineState::Begin => {
                ExprParser::parse_arguments("c", scanner, session, &mut self.code, None, false)?;
                generator::stop_script(&mut self.code);
            }
            _ => return Ok(false),
        }
        self.line = LineState::End;
        Ok(true)
    }

    /// Extension instructions and functions. Returns `None` if `keyword`
    /// is neither.
    fn extension(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<Option<bool>, CompileError> {
        let Keyword::Extension(code) = keyword else {
            return Ok(None);
        };
        let Some(extensions) = session.extensions() else {
            return Ok(None);
        };

        if let Some(instruction) = extensions.instruction(code) {
            if self.line == LineState::Explicit && !instruction.has_explicit() {
                session.warning("Stray explicit reference", loc);
                self.explicit.clear();
            }

            // Some shipped content calls PositionCell with broken arguments;
            // tolerate them and drop the line.
            let position_cell = unquote(&loc.literal).eq_ignore_ascii_case("positioncell");
            let mut arguments = Vec::new();
            let parsed = if position_cell {
                let mut downgraded = ErrorDowngrade::new(session);
                ExprParser::parse_arguments(
                    &instruction.arguments,
                    scanner,
                    &mut downgraded,
                    &mut arguments,
                    Some(keyword),
                    false,
                )
            } else {
                ExprParser::parse_arguments(
                    &instruction.arguments,
                    scanner,
                    session,
                    &mut arguments,
                    Some(keyword),
                    false,
                )
            };

            let optionals = match parsed {
                Ok(optionals) => optionals,
                Err(CompileError::Source) if position_cell => {
                    skip_line(scanner, session)?;
                    return Ok(Some(false));
                }
                Err(error) => return Err(error),
            };

            self.code.extend(arguments);
            extensions.generate_instruction_code(
                code,
                &mut self.code,
                session.literals,
                &self.explicit,
                optionals,
            )?;
            self.line = LineState::End;
            return Ok(Some(true));
        }

        if let Some(function) = extensions.function(code) {
            if self.line == LineState::Explicit && !function.has_explicit() {
                session.warning("Stray explicit reference", loc);
                self.explicit.clear();
            }
            scanner.putback(Token::Keyword(keyword), loc.clone());
            self.parse_expression(loc, scanner, session)?;
            return Ok(Some(true));
        }

        Ok(None)
    }

    fn declaration(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if !session.context.can_declare_locals() {
            session.error("Local variables cannot be declared in this context", loc);
            skip_line(scanner, session)?;
            return Ok(false);
        }

        let mut declaration = DeclarationParser::new();
        if declaration.parse_keyword(keyword, loc, scanner, session)? {
            scanner.scan(&mut declaration, session)?;
        }
        Ok(false)
    }
}

impl Parser for LineParser {
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
        if self.allow_expression && self.line == LineState::Begin {
            scanner.putback(Token::Int(value), loc.clone());
            self.parse_expression(loc, scanner, session)?;
            return Ok(true);
        }
        if self.line == LineState::Set {
            // integers are valid variable names here
            return self.parse_name(&loc.literal, loc, scanner, session);
        }
        self.reject(Token::Int(value), loc, scanner, session)
    }

    fn parse_float(
        &mut self,
        value: f32,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        if self.allow_expression && self.line == LineState::Begin {
            scanner.putback(Token::Float(value), loc.clone());
            self.parse_expression(loc, scanner, session)?;
            return Ok(true);
        }
        self.reject(Token::Float(value), loc, scanner, session)
    }

    fn parse_name(
        &mut self,
        name: &str,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.state.start();

        match self.line {
            LineState::Set => {
                let name = name.to_lowercase();

                self.line = if let Some(ty) = session.locals.get_type(&name) {
                    let index = session.locals.get_index(&name).unwrap_or_default();
                    LineState::SetLocalVar(ty, index)
                } else if let Some(ty) = session.context.global_type(&name) {
                    LineState::SetGlobalVar(ty)
                } else {
                    LineState::SetPotentialMemberVar
                };
                self.name = name;
                Ok(true)
            }
            LineState::SetMemberVar => {
                let member = name.to_lowercase();
                if let Some((ty, reference)) = session.context.member_type(&member, &self.name) {
                    self.member_name = member;
                    self.line = LineState::SetMemberVar2(ty, reference);
                    return Ok(true);
                }
                session.error("Unknown variable", loc);
                skip_line(scanner, session)?;
                Ok(false)
            }
            LineState::Message | LineState::MessageComma => {
                let arguments = message_format::argument_signature(name);
                if !arguments.is_empty() {
                    ExprParser::parse_arguments(
                        &arguments,
                        scanner,
                        session,
                        &mut self.code,
                        None,
                        true,
                    )?;
                }
                self.name = name.to_string();
                self.buttons = 0;
                self.line = LineState::MessageButton;
                Ok(true)
            }
            LineState::MessageButton | LineState::MessageButtonComma => {
                generator::push_string(&mut self.code, session.literals, name);
                self.buttons += 1;
                self.line = LineState::MessageButton;
                Ok(true)
            }
            LineState::Begin => {
                let lower = name.to_lowercase();
                if session.context.is_id(&lower) {
                    self.explicit = lower;
                    self.line = LineState::PotentialExplicit;
                    return Ok(true);
                }

                let is_variable = session.locals.get_type(&lower).is_some()
                    || session.context.global_type(&lower).is_some();
                if self.allow_expression && is_variable {
                    scanner.putback(Token::Name(name.to_string()), loc.clone());
                    self.parse_expression(loc, scanner, session)?;
                    return Ok(true);
                }

                self.reject(Token::Name(name.to_string()), loc, scanner, session)
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
        self.state.start();

        let in_message = matches!(
            self.line,
            LineState::Message
                | LineState::MessageComma
                | LineState::MessageButton
                | LineState::MessageButtonComma
        );
        if in_message {
            if let Keyword::Extension(code) = keyword {
                let is_instruction = session
                    .extensions()
                    .is_some_and(|extensions| extensions.instruction(code).is_some());
                if is_instruction {
                    return self.parse_name(unquote(&loc.literal), loc, scanner, session);
                }
            }
        }

        if self.line == LineState::SetMemberVar {
            let member = loc.literal.to_lowercase();
            if let Some((ty, reference)) = session.context.member_type(&member, &self.name) {
                self.member_name = member;
                self.line = LineState::SetMemberVar2(ty, reference);
                return Ok(true);
            }
        }

        if self.line == LineState::SetPotentialMemberVar && keyword == Keyword::To {
            session.error("Unknown variable", loc);
            skip_line(scanner, session)?;
            return Ok(false);
        }

        if self.line == LineState::Set {
            // keywords are valid variable names here
            return self.parse_name(&loc.literal, loc, scanner, session);
        }

        if matches!(self.line, LineState::Begin | LineState::Explicit) {
            if self.builtin_instruction(keyword, scanner, session)? {
                return Ok(true);
            }
            if let Some(result) = self.extension(keyword, loc, scanner, session)? {
                return Ok(result);
            }

            let is_function = matches!(
                keyword,
                Keyword::GetSquareRoot
                    | Keyword::MenuMode
                    | Keyword::Random
                    | Keyword::ScriptRunning
                    | Keyword::GetSecondsPassed
                    | Keyword::GetDistance
                    | Keyword::GetDisabled
            );
            if self.allow_expression && is_function {
                scanner.putback(Token::Keyword(keyword), loc.clone());
                self.parse_expression(loc, scanner, session)?;
                return Ok(true);
            }
        }

        if self.line == LineState::Explicit {
            session.warning("Stray explicit reference", loc);
            self.line = LineState::Begin;
            self.explicit.clear();
        }

        if self.line == LineState::Begin {
            match keyword {
                Keyword::Short | Keyword::Long | Keyword::Float => {
                    return self.declaration(keyword, loc, scanner, session);
                }
                Keyword::Set => {
                    self.line = LineState::Set;
                    return Ok(true);
                }
                Keyword::MessageBox => {
                    self.line = LineState::Message;
                    scanner.enable_strict_keywords();
                    return Ok(true);
                }
                Keyword::Return => {
                    generator::exit(&mut self.code);
                    self.line = LineState::End;
                    return Ok(true);
                }
                Keyword::Else => {
                    session.warning("Stray else", loc);
                    self.line = LineState::End;
                    return Ok(true);
                }
                Keyword::Endif => {
                    session.warning("Stray endif", loc);
                    self.line = LineState::End;
                    return Ok(true);
                }
                Keyword::Begin => {
                    session.warning("Stray begin", loc);
                    self.line = LineState::End;
                    return Ok(true);
                }
                _ => {}
            }
        }

        if keyword == Keyword::To {
            match self.line {
                LineState::SetLocalVar(ty, index) => {
                    let (value, value_type) = self.parse_value(scanner, session)?;
                    generator::assign_to_local(&mut self.code, ty, index, &value, value_type);
                    self.line = LineState::End;
                    return Ok(true);
                }
                LineState::SetGlobalVar(ty) => {
                    let (value, value_type) = self.parse_value(scanner, session)?;
                    generator::assign_to_global(
                        &mut self.code,
                        session.literals,
                        ty,
                        &self.name,
                        &value,
                        value_type,
                    );
                    self.line = LineState::End;
                    return Ok(true);
                }
                LineState::SetMemberVar2(ty, reference) => {
                    let (value, value_type) = self.parse_value(scanner, session)?;
                    generator::assign_to_member(
                        &mut self.code,
                        session.literals,
                        ty,
                        &self.member_name,
                        &self.name,
                        &value,
                        value_type,
                        !reference,
                    );
                    self.line = LineState::End;
                    return Ok(true);
                }
                _ => {}
            }
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
        use LineState::*;

        match (self.line, special) {
            (End, Special::Open) => {
                session.warning("Stray '[' or '(' at the end of the line", loc);
                Ok(true)
            }
            (End | Begin, Special::Newline) => Ok(false),
            (Message, Special::Comma) => {
                self.line = MessageComma;
                Ok(true)
            }
            (SetPotentialMemberVar, Special::Ref) => {
                session.warning("Stray explicit reference", loc);
                self.line = Set;
                Ok(true)
            }
            (PotentialExplicit, Special::Ref) => {
                self.line = Explicit;
                Ok(true)
            }
            (PotentialExplicit, Special::Member) if self.allow_expression => {
                self.line = Member;
                self.parse_expression(loc, scanner, session)?;
                Ok(true)
            }
            (MessageButton | MessageButtonComma, Special::Newline) => {
                generator::message(&mut self.code, session.literals, &self.name, self.buttons)?;
                Ok(false)
            }
            (MessageButton, Special::Comma) => {
                self.line = MessageButtonComma;
                Ok(true)
            }
            (SetPotentialMemberVar, Special::Member) => {
                self.line = SetMemberVar;
                Ok(true)
            }
            (Begin, Special::Open | Special::Minus | Special::Plus) if self.allow_expression => {
                scanner.putback(Token::Special(special), loc.clone());
                self.parse_expression(loc, scanner, session)?;
                Ok(true)
            }
            _ => self.reject(Token::Special(special), loc, scanner, session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::bytecode::{OP_MESSAGE_BOX, OP_PUSH, Opcode, segment0, segment3, segment5};
    use crate::processor::test_support::{TestContext, with_session};

    fn s5(opcode: Opcode) -> Code {
        segment5(opcode as u32)
    }

    fn push(index: u32) -> Code {
        segment0(OP_PUSH, index)
    }

    struct Compiled {
        code: Vec<Code>,
        strings: Vec<String>,
        messages: Vec<String>,
        warnings: usize,
        errors: usize,
    }

    /// Parses one line after declaring `short a`, `float f`.
    fn compile_line(context: &TestContext, source: &str, allow_expression: bool) -> Compiled {
        let ((code, strings, messages), warnings, errors) = with_session(context, |session| {
            session.locals.declare(ValueType::Short, "a");
            session.locals.declare(ValueType::Float, "f");

            let mut scanner = Scanner::new(source);
            let mut parser = LineParser::new(allow_expression);
            scanner.scan(&mut parser, session).unwrap();
            let mut code = Vec::new();
            parser.append(&mut code);

            let messages = session
                .errors
                .diagnostics()
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>();
            (code, session.literals.strings().to_vec(), messages)
        });
        Compiled {
            code,
            strings,
            messages,
            warnings,
            errors,
        }
    }

    fn line(source: &str) -> Compiled {
        compile_line(&TestContext::new(), source, false)
    }

    #[test]
    fn test_assignments() {
        let test_cases = vec![
            (
                "set a to 5\n",
                vec![push(0), push(0), s5(Opcode::FetchIntLiteral), s5(Opcode::StoreLocalShort)],
            ),
            (
                "set F to 5\n",
                vec![
                    push(0),
                    push(0),
                    s5(Opcode::FetchIntLiteral),
                    s5(Opcode::IntToFloat),
                    s5(Opcode::StoreLocalFloat),
                ],
            ),
            (
                "set a to f\n",
                vec![
                    push(0),
                    push(0),
                    s5(Opcode::FetchLocalFloat),
                    s5(Opcode::FloatToInt),
                    s5(Opcode::StoreLocalShort),
                ],
            ),
            (
                "set dayspassed to 1\n",
                vec![push(0), push(0), s5(Opcode::FetchIntLiteral), s5(Opcode::StoreGlobalLong)],
            ),
            (
                "set fargoth.ringstate to 1\n",
                vec![
                    push(0),
                    push(1),
                    push(0),
                    s5(Opcode::FetchIntLiteral),
                    s5(Opcode::StoreMemberLong),
                ],
            ),
            (
                "set questscript.progress to 1.5\n",
                vec![
                    push(0),
                    push(1),
                    push(0),
                    s5(Opcode::FetchFloatLiteral),
                    s5(Opcode::StoreGlobalMemberFloat),
                ],
            ),
        ];

        for (source, expected) in test_cases {
            let compiled = line(source);
            assert_eq!(compiled.code, expected, "{source:?}");
            assert_eq!(compiled.errors, 0, "{source:?}");
        }
    }

    #[test]
    fn test_unknown_variable() {
        let compiled = line("set nothing to 5\n");
        assert!(compiled.code.is_empty());
        assert_eq!(compiled.errors, 1);
        assert_eq!(compiled.messages, vec!["Unknown variable".to_string()]);
    }

    #[test]
    fn test_message_box() {
        let compiled = line("MessageBox \"%s has %d rings\" \"Fargoth\" a \"Ok\" , \"Cancel\"\n");
        assert_eq!(compiled.errors, 0);
        assert_eq!(
            compiled.strings,
            vec![
                "Fargoth".to_string(),
                "Ok".to_string(),
                "Cancel".to_string(),
                "%s has %d rings".to_string(),
            ]
        );
        assert_eq!(
            compiled.code,
            vec![
                push(0),
                s5(Opcode::FetchLocalShort),
                push(0),
                push(1),
                push(2),
                push(3),
                segment3(OP_MESSAGE_BOX, 2),
            ]
        );
    }

    #[test]
    fn test_message_box_keyword_text() {
        // quoted keywords stay text inside a message box
        let compiled = line("messagebox \"Set\" \"AddItem\"\n");
        assert_eq!(compiled.errors, 0);
        assert_eq!(compiled.strings, vec!["AddItem".to_string(), "Set".to_string()]);
    }

    #[test]
    fn test_builtin_instructions() {
        let test_cases = vec![
            ("return\n", vec![s5(Opcode::Return)], vec![]),
            ("enable\n", vec![s5(Opcode::Enable)], vec![]),
            ("fargoth->disable\n", vec![push(0), s5(Opcode::DisableExplicit)], vec!["fargoth"]),
            (
                "StartScript QuestScript\n",
                vec![push(0), s5(Opcode::StartScript)],
                vec!["questscript"],
            ),
            (
                "player->StartScript QuestScript\n",
                vec![push(0), push(1), s5(Opcode::StartScriptExplicit)],
                vec!["questscript", "player"],
            ),
            ("stopscript questscript\n", vec![push(0), s5(Opcode::StopScript)], vec!["questscript"]),
        ];

        for (source, expected, strings) in test_cases {
            let compiled = line(source);
            assert_eq!(compiled.code, expected, "{source:?}");
            assert_eq!(compiled.strings, strings, "{source:?}");
            assert_eq!(compiled.errors, 0, "{source:?}");
        }
    }

    #[test]
    fn test_extension_instructions() {
        let test_cases = vec![
            (
                "AddItem Gold_001 10\n",
                vec![
                    push(0),
                    s5(Opcode::FetchIntLiteral),
                    push(0),
                    segment5(0x2000076),
                ],
                0,
            ),
            (
                "fargoth->AddItem \"gold_001\", 10\n",
                vec![
                    push(0),
                    s5(Opcode::FetchIntLiteral),
                    push(0),
                    push(1),
                    s5(Opcode::FetchIntLiteral),
                    segment5(0x2000077),
                ],
                0,
            ),
            // the id does not turn the count into a name
            (
                "AddItem gold 10\n",
                vec![push(0), s5(Opcode::FetchIntLiteral), push(0), segment5(0x2000076)],
                0,
            ),
            (
                "AddItem gold, 10\n",
                vec![push(0), s5(Opcode::FetchIntLiteral), push(0), segment5(0x2000076)],
                0,
            ),
            ("AddTopic \"Latest Rumors\"\n", vec![push(0), segment5(0x200013d)], 0),
            // no explicit variant
            ("fargoth->AddTopic rumors\n", vec![push(0), segment5(0x200013d)], 1),
        ];

        for (source, expected, warnings) in test_cases {
            let compiled = line(source);
            assert_eq!(compiled.code, expected, "{source:?}");
            assert_eq!((compiled.warnings, compiled.errors), (warnings, 0), "{source:?}");
        }
    }

    #[test]
    fn test_optional_arguments() {
        let compiled = line("AITravel 1 2 3\n");
        assert_eq!(compiled.code.last(), Some(&segment3(0x20000, 0)));

        let compiled = line("AITravel 1 2 3 4\n");
        assert_eq!(compiled.code.last(), Some(&segment3(0x20000, 1)));
        assert_eq!(compiled.errors, 0);
    }

    #[test]
    fn test_position_cell_errors_are_downgraded() {
        let compiled = line("PositionCell 1 2 3 4 ) \"Balmora\"\n");
        assert!(compiled.code.is_empty());
        assert_eq!(compiled.errors, 0);
        assert!(compiled.warnings >= 1);

        let compiled = line("PositionCell 1 2 3 4 \"Balmora\"\n");
        assert_eq!(compiled.code.last(), Some(&segment5(0x2000198)));
        assert_eq!((compiled.warnings, compiled.errors), (0, 0));
    }

    #[test]
    fn test_stray_keywords() {
        let test_cases = vec![
            ("else\n", "Stray else"),
            ("endif\n", "Stray endif"),
            ("begin\n", "Stray begin"),
            ("fargoth->return\n", "Stray explicit reference"),
        ];

        for (source, message) in test_cases {
            let compiled = line(source);
            assert_eq!(compiled.messages.first().map(String::as_str), Some(message), "{source:?}");
        }
    }

    #[test]
    fn test_declarations() {
        let context = TestContext::new();
        let ((shorts, code), _, errors) = with_session(&context, |session| {
            let mut scanner = Scanner::new("short counter\n");
            let mut parser = LineParser::new(false);
            scanner.scan(&mut parser, session).unwrap();
            let mut code = Vec::new();
            parser.append(&mut code);
            (session.locals.get(ValueType::Short).to_vec(), code)
        });
        assert_eq!(shorts, vec!["counter".to_string()]);
        assert!(code.is_empty());
        assert_eq!(errors, 0);

        let mut context = TestContext::new();
        context.can_declare_locals = false;
        let (locals, _, errors) = with_session(&context, |session| {
            let mut scanner = Scanner::new("short counter\nset");
            let mut parser = LineParser::new(false);
            scanner.scan(&mut parser, session).unwrap();
            assert!(scanner.at_line_start());
            session.locals.clone()
        });
        assert!(locals.get(ValueType::Short).is_empty());
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_console_expressions() {
        let context = TestContext::new();
        let test_cases = vec![
            ("a + 1\n", "%d"),
            ("f\n", "%f"),
            ("GetSecondsPassed\n", "%f"),
            ("3 * 2\n", "%d"),
            ("fargoth->GetDisposition\n", "%d"),
            ("questscript.progress\n", "%f"),
            ("fargoth->GetDisabled\n", "%d"),
        ];

        for (source, format) in test_cases {
            let compiled = compile_line(&context, source, true);
            assert_eq!(compiled.errors, 0, "{source:?}");
            assert_eq!(compiled.strings.last().map(String::as_str), Some(format), "{source:?}");
            assert_eq!(compiled.code.last(), Some(&s5(Opcode::Report)), "{source:?}");
        }
    }

    #[test]
    fn test_reset_discards_partial_line() {
        let context = TestContext::new();
        let (code, _, _) = with_session(&context, |session| {
            session.locals.declare(ValueType::Short, "a");
            let mut parser = LineParser::new(false);
            let mut scanner = Scanner::new("set a to 1 )\nreturn\n");
            assert!(scanner.scan(&mut parser, session).is_err());
            parser.reset();
            skip_line(&mut scanner, session).unwrap();
            scanner.scan(&mut parser, session).unwrap();
            let mut code = Vec::new();
            parser.append(&mut code);
            code
        });
        assert_eq!(code, vec![s5(Opcode::Return)]);
    }
}
