//! `if`/`elseif`/`else`/`endif` and `while`/`endwhile` blocks.
//!
//! Nested blocks get their own `ControlParser`; the finished block is
//! flattened into linear code with relative jumps.

use super::bytecode::Code;
use super::error::CompileError;
use super::expr_parser::ExprParser;
use super::generator;
use super::leaf::SkipParser;
use super::lexer::Scanner;
use super::line_parser::LineParser;
use super::parser::{ParseResult, Parser, ParserState, Session, recover_line};
use super::token::{Keyword, Special, Token, TokenLoc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ControlState {
    #[default]
    Start,
    /// condition of `if`/`elseif` parsed, newline expected
    IfEnd,
    IfBody,
    /// after `else`, before the newline
    ElseJunk,
    ElseBody,
    Endif,
    WhileEnd,
    WhileBody,
    Endwhile,
}

#[derive(Debug, Default)]
pub struct ControlParser {
    state: ParserState,
    control: ControlState,
    expr: ExprParser,
    line: LineParser,
    condition: Vec<Code>,
    /// Body of the arm being parsed.
    code_block: Vec<Code>,
    /// Finished arms; `None` marks the `else` arm.
    arms: Vec<(Option<Vec<Code>>, Vec<Code>)>,
    code: Vec<Code>,
}

impl ControlParser {
    pub fn new() -> Self {
        Self {
            expr: ExprParser::new(false),
            line: LineParser::new(false),
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.control = ControlState::Start;
        self.expr.reset();
        self.line.reset();
        self.condition.clear();
        self.code_block.clear();
        self.arms.clear();
        self.code.clear();
    }

    /// Moves the code of the finished block to `code`.
    pub fn append(&mut self, code: &mut Vec<Code>) {
        code.append(&mut self.code);
    }

    fn in_body(&self) -> bool {
        matches!(
            self.control,
            ControlState::IfBody | ControlState::ElseBody | ControlState::WhileBody
        )
    }

    /// Parses a condition. If it fails, the rest of the line is gone and
    /// the body starts right away with an empty condition.
    fn parse_condition(
        &mut self,
        end: ControlState,
        body: ControlState,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> Result<(), CompileError> {
        self.expr.reset();
        self.condition.clear();
        let result = scanner.scan(&mut self.expr, session);
        if recover_line(result, scanner, session)? {
            self.expr.append(&mut self.condition, session)?;
            self.control = end;
        } else {
            self.control = body;
        }
        Ok(())
    }

    /// Parses one body line into the current arm.
    fn body_line(
        &mut self,
        keyword: Option<(Keyword, &TokenLoc)>,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        self.line
            .parse_line(keyword, scanner, session, &mut self.code_block)?;
        Ok(true)
    }

    fn nested(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        let mut parser = ControlParser::new();
        if parser.parse_keyword(keyword, loc, scanner, session)? {
            scanner.scan(&mut parser, session)?;
        }
        parser.append(&mut self.code_block);
        Ok(true)
    }

    fn skip_else_junk(
        &mut self,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        scanner.scan(&mut SkipParser::new(), session)?;
        self.control = ControlState::ElseBody;
        Ok(true)
    }

    fn parse_if_body(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match keyword {
            Keyword::Endif | Keyword::Elseif | Keyword::Else => {
                let condition = if self.control == ControlState::ElseBody {
                    None
                } else {
                    Some(std::mem::take(&mut self.condition))
                };
                let body = std::mem::take(&mut self.code_block);
                self.arms.push((condition, body));

                match keyword {
                    Keyword::Endif => {
                        self.assemble_if()?;
                        self.control = ControlState::Endif;
                    }
                    Keyword::Elseif => self.parse_condition(
                        ControlState::IfEnd,
                        ControlState::IfBody,
                        scanner,
                        session,
                    )?,
                    _ => self.control = ControlState::ElseJunk,
                }
                Ok(true)
            }
            Keyword::If | Keyword::While => self.nested(keyword, loc, scanner, session),
            _ => self.body_line(Some((keyword, loc)), scanner, session),
        }
    }

    fn parse_while_body(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match keyword {
            Keyword::Endwhile => {
                self.assemble_while()?;
                self.control = ControlState::Endwhile;
                Ok(true)
            }
            Keyword::If | Keyword::While => self.nested(keyword, loc, scanner, session),
            _ => self.body_line(Some((keyword, loc)), scanner, session),
        }
    }

    /// Flattens the arms, last to first. Every arm but the last ends with a
    /// jump past the rest of the cascade; every conditional arm starts with
    /// a guard that jumps over its body.
    fn assemble_if(&mut self) -> Result<(), CompileError> {
        let arms = std::mem::take(&mut self.arms);
        let mut codes: Vec<Code> = Vec::new();

        for (index, (condition, mut body)) in arms.into_iter().rev().enumerate() {
            if index > 0 {
                generator::jump(&mut body, codes.len() as i32 + 1)?;
            }

            let mut block = Vec::new();
            if let Some(condition) = condition {
                block.extend(condition);
                generator::jump_on_zero(&mut block, body.len() as i32 + 1)?;
            }
            block.extend(body);
            block.extend(codes);
            codes = block;
        }

        self.code.extend(codes);
        Ok(())
    }

    /// `condition, guard, body, jump back to condition`.
    fn assemble_while(&mut self) -> Result<(), CompileError> {
        let condition = std::mem::take(&mut self.condition);
        let block = std::mem::take(&mut self.code_block);
        if condition.is_empty() {
            // condition failed to parse and was already reported
            return Ok(());
        }

        let mut probe = Vec::new();
        generator::jump(&mut probe, -((block.len() + condition.len()) as i32))?;

        let mut skip = Vec::new();
        generator::jump_on_zero(&mut skip, (block.len() + probe.len() + 1) as i32)?;

        let mut back = Vec::new();
        generator::jump(
            &mut back,
            -((block.len() + condition.len() + skip.len()) as i32),
        )?;

        if probe.len() != back.len() {
            return Err(CompileError::internal("loop size mismatch"));
        }

        self.code.extend(condition);
        self.code.extend(skip);
        self.code.extend(block);
        self.code.extend(back);
        Ok(())
    }
}

impl Parser for ControlParser {
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
        if self.in_body() {
            scanner.putback(Token::Int(value), loc.clone());
            return self.body_line(None, scanner, session);
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
        if self.in_body() {
            scanner.putback(Token::Float(value), loc.clone());
            return self.body_line(None, scanner, session);
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
        if self.in_body() {
            scanner.putback(Token::Name(name.to_string()), loc.clone());
            return self.body_line(None, scanner, session);
        }
        if self.control == ControlState::ElseJunk {
            session.warning("Extra text after else", loc);
            return self.skip_else_junk(scanner, session);
        }
        self.reject(Token::Name(name.to_string()), loc, scanner, session)
    }

    fn parse_keyword(
        &mut self,
        keyword: Keyword,
        loc: &TokenLoc,
        scanner: &mut Scanner,
        session: &mut Session<'_>,
    ) -> ParseResult {
        match (self.control, keyword) {
            (ControlState::Start, Keyword::If | Keyword::Elseif) => {
                if keyword == Keyword::Elseif {
                    session.warning("elseif without matching if", loc);
                }
                self.state.start();
                self.parse_condition(ControlState::IfEnd, ControlState::IfBody, scanner, session)?;
                Ok(true)
            }
            (ControlState::Start, Keyword::While) => {
                self.state.start();
                self.parse_condition(
                    ControlState::WhileEnd,
                    ControlState::WhileBody,
                    scanner,
                    session,
                )?;
                Ok(true)
            }
            (ControlState::IfBody | ControlState::ElseBody, _) => {
                self.parse_if_body(keyword, loc, scanner, session)
            }
            (ControlState::WhileBody, _) => self.parse_while_body(keyword, loc, scanner, session),
            (ControlState::ElseJunk, _) => {
                session.warning("Extra text after else", loc);
                self.skip_else_junk(scanner, session)
            }
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
        if special == Special::Newline {
            match self.control {
                ControlState::IfEnd => self.control = ControlState::IfBody,
                ControlState::ElseJunk => self.control = ControlState::ElseBody,
                ControlState::WhileEnd => self.control = ControlState::WhileBody,
                // empty line
                ControlState::IfBody | ControlState::ElseBody | ControlState::WhileBody => {}
                ControlState::Endif | ControlState::Endwhile => return Ok(false),
                ControlState::Start => {
                    return self.reject(Token::Special(special), loc, scanner, session);
                }
            }
            return Ok(true);
        }

        if special == Special::Open && self.control == ControlState::ElseJunk {
            return self.skip_else_junk(scanner, session);
        }

        if self.in_body() {
            scanner.putback(Token::Special(special), loc.clone());
            return self.body_line(None, scanner, session);
        }

        self.reject(Token::Special(special), loc, scanner, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::bytecode::{
        Instruction, OP_JUMP_BACKWARD, OP_JUMP_FORWARD, OP_PUSH, Opcode, segment0, segment5,
    };
    use crate::processor::test_support::{TestContext, with_session};
    use crate::processor::value_type::ValueType;

    fn s5(opcode: Opcode) -> Code {
        segment5(opcode as u32)
    }

    fn push(index: u32) -> Code {
        segment0(OP_PUSH, index)
    }

    fn forward(offset: u32) -> Code {
        segment0(OP_JUMP_FORWARD, offset)
    }

    /// Compiles one block with `short a`, `short b` declared.
    fn block(source: &str) -> (Result<Vec<Code>, CompileError>, Vec<String>, usize) {
        let context = TestContext::new();
        let ((result, messages), _, errors) = with_session(&context, |session| {
            session.locals.declare(ValueType::Short, "a");
            session.locals.declare(ValueType::Short, "b");

            let mut scanner = Scanner::new(source);
            let mut parser = ControlParser::new();
            let result = scanner.scan(&mut parser, session).map(|()| {
                let mut code = Vec::new();
                parser.append(&mut code);
                code
            });
            let messages = session
                .errors
                .diagnostics()
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>();
            (result, messages)
        });
        (result, messages, errors)
    }

    /// `set b to <literal index>`
    fn set_b(literal: u32) -> Vec<Code> {
        vec![push(1), push(literal), s5(Opcode::FetchIntLiteral), s5(Opcode::StoreLocalShort)]
    }

    /// `a == <literal index>`
    fn a_equals(literal: u32) -> Vec<Code> {
        vec![
            push(0),
            s5(Opcode::FetchLocalShort),
            push(literal),
            s5(Opcode::FetchIntLiteral),
            s5(Opcode::EqualInt),
        ]
    }

    #[test]
    fn test_if_cascade() {
        let source = "if a == 1\nset b to 10\nelseif a == 2\nset b to 20\nelse\nset b to 30\nendif\n";
        let (code, messages, errors) = block(source);

        let mut expected = a_equals(0);
        expected.extend([s5(Opcode::SkipOnNonZero), forward(6)]);
        expected.extend(set_b(1));
        expected.push(forward(17));
        expected.extend(a_equals(2));
        expected.extend([s5(Opcode::SkipOnNonZero), forward(6)]);
        expected.extend(set_b(3));
        expected.push(forward(5));
        expected.extend(set_b(4));

        assert_eq!(code.unwrap(), expected);
        assert!(messages.is_empty(), "{messages:?}");
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_single_arm() {
        let (code, _, errors) = block("if a\nset b to 1\nendif\n");

        let mut expected = vec![push(0), s5(Opcode::FetchLocalShort)];
        expected.extend([s5(Opcode::SkipOnNonZero), forward(5)]);
        expected.extend(set_b(0));
        assert_eq!(code.unwrap(), expected);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_while_offsets() {
        let (code, _, errors) = block("while a\nset a to a - 1\nendwhile\n");
        let code = code.unwrap();
        assert_eq!(errors, 0);

        // condition (2), guard (2), body (7), jump back (1)
        assert_eq!(code.len(), 12);
        assert_eq!(&code[..3], &[push(0), s5(Opcode::FetchLocalShort), s5(Opcode::SkipOnNonZero)]);

        let guard = Instruction::decode(code[3]).unwrap();
        assert_eq!(
            guard,
            Instruction::Segment0 {
                opcode: OP_JUMP_FORWARD,
                arg0: 9,
            }
        );
        // the guard lands right after the loop
        assert_eq!(3 + 9, code.len());

        let back = Instruction::decode(code[11]).unwrap();
        assert_eq!(
            back,
            Instruction::Segment0 {
                opcode: OP_JUMP_BACKWARD,
                arg0: 11,
            }
        );
    }

    #[test]
    fn test_nested_blocks() {
        let source = "while a\nif b\nset a to 0\nelse\nset b to 1\nendif\nendwhile\n";
        let (code, messages, errors) = block(source);
        let code = code.unwrap();
        assert!(messages.is_empty(), "{messages:?}");
        assert_eq!(errors, 0);

        // inner if: cond 2 + guard 2 + body 4 + jump 1 + else 4 = 13
        // loop: cond 2 + guard 2 + 13 + back 1
        assert_eq!(code.len(), 18);
        assert_eq!(
            Instruction::decode(code[17]).unwrap(),
            Instruction::Segment0 {
                opcode: OP_JUMP_BACKWARD,
                arg0: 17,
            }
        );
    }

    #[test]
    fn test_recovery() {
        let test_cases = vec![
            // broken body line is dropped, the block continues
            ("if a\nset x to 1\nset b to 1\nendif\n", 1, 8),
            ("while a\n5\nset b to 1\nendwhile\n", 1, 9),
            // junk after else is skipped
            ("if a\nset b to 1\nelse if\nset b to 2\nendif\n", 0, 13),
        ];

        for (source, expected_errors, len) in test_cases {
            let (code, _, errors) = block(source);
            assert_eq!(code.unwrap().len(), len, "{source:?}");
            assert_eq!(errors, expected_errors, "{source:?}");
        }
    }

    #[test]
    fn test_warnings() {
        let test_cases = vec![
            ("elseif a\nset b to 1\nendif\n", "elseif without matching if"),
            ("if a\nelse junk\nendif\n", "Extra text after else"),
        ];

        for (source, expected) in test_cases {
            let (code, messages, errors) = block(source);
            assert!(code.is_ok(), "{source:?}");
            assert_eq!(messages, vec![expected.to_string()], "{source:?}");
            assert_eq!(errors, 0);
        }
    }

    #[test]
    fn test_unterminated_block() {
        let (code, _, errors) = block("if a\nset b to 1\n");
        assert_eq!(code, Err(CompileError::EndOfFile));
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_reset() {
        let context = TestContext::new();
        with_session(&context, |session| {
            session.locals.declare(ValueType::Short, "a");
            let mut scanner = Scanner::new("if a\nreturn\nendif\nwhile a\nendwhile\n");
            let mut parser = ControlParser::new();
            scanner.scan(&mut parser, session).unwrap();

            parser.reset();
            scanner.scan(&mut parser, session).unwrap();
            let mut code = Vec::new();
            parser.append(&mut code);
            // condition, guard, jump back
            assert_eq!(code.len(), 5);
        });
    }
}
