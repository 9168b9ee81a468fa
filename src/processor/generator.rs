//! Instruction emission helpers.
//!
//! Every function appends to a code buffer; most of them are one or two
//! words. Operand types passed in are the stack types (`Long` or `Float`);
//! `Short` is accepted and treated as `Long`.

use super::bytecode::{
    Code, OP_JUMP_BACKWARD, OP_JUMP_FORWARD, OP_MESSAGE_BOX, OP_PUSH, Opcode, segment0, segment3,
    segment5,
};
use super::error::CompileError;
use super::literals::Literals;
use super::value_type::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

fn op(code: &mut Vec<Code>, opcode: Opcode) {
    code.push(segment5(opcode as u32));
}

fn push(code: &mut Vec<Code>, value: u32) {
    code.push(segment0(OP_PUSH, value));
}

// ── literals ────────────────────────────────────────────────────────────

pub fn push_int(code: &mut Vec<Code>, literals: &mut Literals, value: i32) {
    let index = literals.add_integer(value);
    push(code, index);
    op(code, Opcode::FetchIntLiteral);
}

pub fn push_float(code: &mut Vec<Code>, literals: &mut Literals, value: f32) {
    let index = literals.add_float(value);
    push(code, index);
    op(code, Opcode::FetchFloatLiteral);
}

/// Pushes the string literal index only; the consuming instruction reads
/// the string.
pub fn push_string(code: &mut Vec<Code>, literals: &mut Literals, value: &str) {
    let index = literals.add_string(value);
    push(code, index);
}

// ── arithmetic ──────────────────────────────────────────────────────────

pub fn convert(code: &mut Vec<Code>, from: ValueType, to: ValueType) {
    match (from.is_float(), to.is_float()) {
        (true, false) => op(code, Opcode::FloatToInt),
        (false, true) => op(code, Opcode::IntToFloat),
        _ => {}
    }
}

pub fn negate(code: &mut Vec<Code>, ty: ValueType) {
    if ty.is_float() {
        op(code, Opcode::NegateFloat);
    } else {
        op(code, Opcode::NegateInt);
    }
}

/// Integer variant if both operands are integers, else promotes the
/// integer side (`IntToFloat1` for the lower stack slot, `IntToFloat` for
/// the top) and uses the float variant.
fn binary(
    code: &mut Vec<Code>,
    left: ValueType,
    right: ValueType,
    int_op: Opcode,
    float_op: Opcode,
) {
    if !left.is_float() && !right.is_float() {
        op(code, int_op);
        return;
    }
    if !left.is_float() {
        op(code, Opcode::IntToFloat1);
    }
    if !right.is_float() {
        op(code, Opcode::IntToFloat);
    }
    op(code, float_op);
}

pub fn add(code: &mut Vec<Code>, left: ValueType, right: ValueType) {
    binary(code, left, right, Opcode::AddInt, Opcode::AddFloat);
}

pub fn sub(code: &mut Vec<Code>, left: ValueType, right: ValueType) {
    binary(code, left, right, Opcode::SubInt, Opcode::SubFloat);
}

pub fn mul(code: &mut Vec<Code>, left: ValueType, right: ValueType) {
    binary(code, left, right, Opcode::MulInt, Opcode::MulFloat);
}

pub fn div(code: &mut Vec<Code>, left: ValueType, right: ValueType) {
    binary(code, left, right, Opcode::DivInt, Opcode::DivFloat);
}

/// Leaves an integer (0 or 1) on the stack.
pub fn compare(code: &mut Vec<Code>, comparison: Comparison, left: ValueType, right: ValueType) {
    let (int_op, float_op) = match comparison {
        Comparison::Equal => (Opcode::EqualInt, Opcode::EqualFloat),
        Comparison::NotEqual => (Opcode::NonEqualInt, Opcode::NonEqualFloat),
        Comparison::Less => (Opcode::LessThanInt, Opcode::LessThanFloat),
        Comparison::LessOrEqual => (Opcode::LessOrEqualInt, Opcode::LessOrEqualFloat),
        Comparison::Greater => (Opcode::GreaterThanInt, Opcode::GreaterThanFloat),
        Comparison::GreaterOrEqual => (Opcode::GreaterOrEqualInt, Opcode::GreaterOrEqualFloat),
    };
    binary(code, left, right, int_op, float_op);
}

pub fn square_root(code: &mut Vec<Code>) {
    op(code, Opcode::SquareRoot);
}

// ── variables ───────────────────────────────────────────────────────────

fn store_local_op(ty: ValueType) -> Opcode {
    match ty {
        ValueType::Short => Opcode::StoreLocalShort,
        ValueType::Long => Opcode::StoreLocalLong,
        ValueType::Float => Opcode::StoreLocalFloat,
    }
}

pub fn assign_to_local(
    code: &mut Vec<Code>,
    local_type: ValueType,
    index: usize,
    value: &[Code],
    value_type: ValueType,
) {
    push(code, index as u32);
    code.extend_from_slice(value);
    convert(code, value_type, local_type);
    op(code, store_local_op(local_type));
}

pub fn fetch_local(code: &mut Vec<Code>, local_type: ValueType, index: usize) {
    push(code, index as u32);
    op(
        code,
        match local_type {
            ValueType::Short => Opcode::FetchLocalShort,
            ValueType::Long => Opcode::FetchLocalLong,
            ValueType::Float => Opcode::FetchLocalFloat,
        },
    );
}

pub fn assign_to_global(
    code: &mut Vec<Code>,
    literals: &mut Literals,
    global_type: ValueType,
    name: &str,
    value: &[Code],
    value_type: ValueType,
) {
    push(code, literals.add_string(name));
    code.extend_from_slice(value);
    convert(code, value_type, global_type);
    op(
        code,
        match global_type {
            ValueType::Short => Opcode::StoreGlobalShort,
            ValueType::Long => Opcode::StoreGlobalLong,
            ValueType::Float => Opcode::StoreGlobalFloat,
        },
    );
}

pub fn fetch_global(
    code: &mut Vec<Code>,
    literals: &mut Literals,
    global_type: ValueType,
    name: &str,
) {
    push(code, literals.add_string(name));
    op(
        code,
        match global_type {
            ValueType::Short => Opcode::FetchGlobalShort,
            ValueType::Long => Opcode::FetchGlobalLong,
            ValueType::Float => Opcode::FetchGlobalFloat,
        },
    );
}

/// `global` selects the global-script member opcodes instead of the
/// reference member ones.
#[allow(clippy::too_many_arguments)]
pub fn assign_to_member(
    code: &mut Vec<Code>,
    literals: &mut Literals,
    member_type: ValueType,
    name: &str,
    id: &str,
    value: &[Code],
    value_type: ValueType,
    global: bool,
) {
    push(code, literals.add_string(name));
    push(code, literals.add_string(id));
    code.extend_from_slice(value);
    convert(code, value_type, member_type);
    let opcode = match (member_type, global) {
        (ValueType::Short, false) => Opcode::StoreMemberShort,
        (ValueType::Long, false) => Opcode::StoreMemberLong,
        (ValueType::Float, false) => Opcode::StoreMemberFloat,
        (ValueType::Short, true) => Opcode::StoreGlobalMemberShort,
        (ValueType::Long, true) => Opcode::StoreGlobalMemberLong,
        (ValueType::Float, true) => Opcode::StoreGlobalMemberFloat,
    };
    op(code, opcode);
}

pub fn fetch_member(
    code: &mut Vec<Code>,
    literals: &mut Literals,
    member_type: ValueType,
    name: &str,
    id: &str,
    global: bool,
) {
    push(code, literals.add_string(name));
    push(code, literals.add_string(id));
    let opcode = match (member_type, global) {
        (ValueType::Short, false) => Opcode::FetchMemberShort,
        (ValueType::Long, false) => Opcode::FetchMemberLong,
        (ValueType::Float, false) => Opcode::FetchMemberFloat,
        (ValueType::Short, true) => Opcode::FetchGlobalMemberShort,
        (ValueType::Long, true) => Opcode::FetchGlobalMemberLong,
        (ValueType::Float, true) => Opcode::FetchGlobalMemberFloat,
    };
    op(code, opcode);
}

// ── control flow ────────────────────────────────────────────────────────

/// Relative jump; positive offsets jump forward, negative backward.
pub fn jump(code: &mut Vec<Code>, offset: i32) -> Result<(), CompileError> {
    match offset {
        0 => Err(CompileError::internal("infinite loop")),
        offset if offset > 0 => {
            code.push(segment0(OP_JUMP_FORWARD, offset as u32));
            Ok(())
        }
        offset => {
            code.push(segment0(OP_JUMP_BACKWARD, offset.unsigned_abs()));
            Ok(())
        }
    }
}

/// Jumps by `offset` if the integer on top of the stack is zero. The offset
/// is relative to the jump, so backward jumps account for the extra skip
/// instruction.
pub fn jump_on_zero(code: &mut Vec<Code>, offset: i32) -> Result<(), CompileError> {
    op(code, Opcode::SkipOnNonZero);
    let offset = if offset < 0 { offset - 1 } else { offset };
    jump(code, offset)
}

pub fn exit(code: &mut Vec<Code>) {
    op(code, Opcode::Return);
}

// ── output ──────────────────────────────────────────────────────────────

pub fn message(
    code: &mut Vec<Code>,
    literals: &mut Literals,
    message: &str,
    buttons: u32,
) -> Result<(), CompileError> {
    if buttons >= 256 {
        return Err(CompileError::internal("too many buttons"));
    }
    push_string(code, literals, message);
    code.push(segment3(OP_MESSAGE_BOX, buttons));
    Ok(())
}

pub fn report(code: &mut Vec<Code>, literals: &mut Literals, message: &str) {
    push_string(code, literals, message);
    op(code, Opcode::Report);
}

// ── built-in functions and instructions ────────────────────────────────

pub fn menu_mode(code: &mut Vec<Code>) {
    op(code, Opcode::MenuMode);
}

pub fn random(code: &mut Vec<Code>) {
    op(code, Opcode::Random);
}

pub fn script_running(code: &mut Vec<Code>) {
    op(code, Opcode::ScriptRunning);
}

pub fn stop_script(code: &mut Vec<Code>) {
    op(code, Opcode::StopScript);
}

pub fn get_seconds_passed(code: &mut Vec<Code>) {
    op(code, Opcode::GetSecondsPassed);
}

/// Emits `explicit_op` with the id pushed first, or `plain_op` for an
/// empty id.
fn with_reference(
    code: &mut Vec<Code>,
    literals: &mut Literals,
    id: &str,
    plain_op: Opcode,
    explicit_op: Opcode,
) {
    if id.is_empty() {
        op(code, plain_op);
    } else {
        push_string(code, literals, id);
        op(code, explicit_op);
    }
}

pub fn start_script(code: &mut Vec<Code>, literals: &mut Literals, id: &str) {
    with_reference(code, literals, id, Opcode::StartScript, Opcode::StartScriptExplicit);
}

pub fn get_distance(code: &mut Vec<Code>, literals: &mut Literals, id: &str) {
    with_reference(code, literals, id, Opcode::GetDistance, Opcode::GetDistanceExplicit);
}

pub fn get_disabled(code: &mut Vec<Code>, literals: &mut Literals, id: &str) {
    with_reference(code, literals, id, Opcode::GetDisabled, Opcode::GetDisabledExplicit);
}

pub fn enable(code: &mut Vec<Code>, literals: &mut Literals, id: &str) {
    with_reference(code, literals, id, Opcode::Enable, Opcode::EnableExplicit);
}

pub fn disable(code: &mut Vec<Code>, literals: &mut Literals, id: &str) {
    with_reference(code, literals, id, Opcode::Disable, Opcode::DisableExplicit);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s5(opcode: Opcode) -> Code {
        segment5(opcode as u32)
    }

    #[test]
    fn test_binary_promotion() {
        use ValueType::{Float, Long};

        let test_cases = vec![
            ((Long, Long), vec![s5(Opcode::AddInt)]),
            ((Long, Float), vec![s5(Opcode::IntToFloat1), s5(Opcode::AddFloat)]),
            ((Float, Long), vec![s5(Opcode::IntToFloat), s5(Opcode::AddFloat)]),
            ((Float, Float), vec![s5(Opcode::AddFloat)]),
        ];

        for ((left, right), expected) in test_cases {
            let mut code = vec![];
            add(&mut code, left, right);
            assert_eq!(code, expected, "{left:?} + {right:?}");
        }
    }

    #[test]
    fn test_compare_is_integer_result() {
        let mut code = vec![];
        compare(&mut code, Comparison::LessOrEqual, ValueType::Long, ValueType::Float);
        assert_eq!(
            code,
            vec![s5(Opcode::IntToFloat1), s5(Opcode::LessOrEqualFloat)]
        );
    }

    #[test]
    fn test_jumps() {
        let test_cases = vec![
            (3, vec![segment0(OP_JUMP_FORWARD, 3)]),
            (-4, vec![segment0(OP_JUMP_BACKWARD, 4)]),
        ];
        for (offset, expected) in test_cases {
            let mut code = vec![];
            jump(&mut code, offset).unwrap();
            assert_eq!(code, expected);
        }

        let mut code = vec![];
        assert!(matches!(jump(&mut code, 0), Err(CompileError::Internal(_))));

        let mut code = vec![];
        jump_on_zero(&mut code, -3).unwrap();
        assert_eq!(
            code,
            vec![s5(Opcode::SkipOnNonZero), segment0(OP_JUMP_BACKWARD, 4)]
        );
    }

    #[test]
    fn test_assign_to_local_converts() {
        let mut code = vec![];
        assign_to_local(&mut code, ValueType::Short, 2, &[0xdead], ValueType::Float);
        assert_eq!(
            code,
            vec![
                segment0(OP_PUSH, 2),
                0xdead,
                s5(Opcode::FloatToInt),
                s5(Opcode::StoreLocalShort)
            ]
        );
    }

    #[test]
    fn test_explicit_variants() {
        let mut literals = Literals::new();
        let mut code = vec![];
        enable(&mut code, &mut literals, "");
        disable(&mut code, &mut literals, "fargoth");
        assert_eq!(
            code,
            vec![
                s5(Opcode::Enable),
                segment0(OP_PUSH, 0),
                s5(Opcode::DisableExplicit)
            ]
        );
        assert_eq!(literals.strings(), &["fargoth".to_string()]);
    }

    #[test]
    fn test_message_button_limit() {
        let mut literals = Literals::new();
        let mut code = vec![];
        message(&mut code, &mut literals, "hi", 2).unwrap();
        assert_eq!(code, vec![segment0(OP_PUSH, 0), segment3(OP_MESSAGE_BOX, 2)]);
        assert!(message(&mut code, &mut literals, "hi", 256).is_err());
    }
}
