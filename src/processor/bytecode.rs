//! Instruction word layout of the script VM.
//
//  Every instruction is one 32-bit word. The top bits select a segment, the
//  remaining bits hold the opcode and up to two operands:
//
//      segment 0   00oooooo aaaaaaaa aaaaaaaa aaaaaaaa   6-bit op, 24-bit arg
//      segment 1   01oooooo aaaaaaaa aaaabbbb bbbbbbbb   6-bit op, 2 x 12-bit args
//      segment 2   10oooooo oooooaaa aaaaaaaa aaaaaaaa   10-bit op, 20-bit arg
//      segment 3   110000oo oooooooo oooooooo aaaaaaaa   18-bit op, 8-bit arg
//      segment 4   110001oo oooooooo aaaaaaaa bbbbbbbb   10-bit op, 2 x 8-bit args
//      segment 5   110010oo oooooooo oooooooo oooooooo   26-bit op, no args
//
//  Operands are masked to their field width; opcodes must fit.

use std::fmt;

pub type Code = u32;

// ── segment 0 ───────────────────────────────────────────────────────────
pub const OP_PUSH: u32 = 0;
pub const OP_JUMP_FORWARD: u32 = 1;
pub const OP_JUMP_BACKWARD: u32 = 2;

// ── segment 3 ───────────────────────────────────────────────────────────
pub const OP_MESSAGE_BOX: u32 = 0;

pub fn segment0(opcode: u32, arg0: u32) -> Code {
    debug_assert!(opcode < 64, "segment 0 opcode out of range");
    (opcode << 24) | (arg0 & 0x00ff_ffff)
}

pub fn segment1(opcode: u32, arg0: u32, arg1: u32) -> Code {
    debug_assert!(opcode < 64, "segment 1 opcode out of range");
    0x4000_0000 | (opcode << 24) | ((arg0 & 0xfff) << 12) | (arg1 & 0xfff)
}

pub fn segment2(opcode: u32, arg0: u32) -> Code {
    debug_assert!(opcode < 1024, "segment 2 opcode out of range");
    0x8000_0000 | (opcode << 20) | (arg0 & 0x000f_ffff)
}

pub fn segment3(opcode: u32, arg0: u32) -> Code {
    debug_assert!(opcode < 262_144, "segment 3 opcode out of range");
    0xc000_0000 | (opcode << 8) | (arg0 & 0xff)
}

pub fn segment4(opcode: u32, arg0: u32, arg1: u32) -> Code {
    debug_assert!(opcode < 1024, "segment 4 opcode out of range");
    0xc400_0000 | (opcode << 16) | ((arg0 & 0xff) << 8) | (arg1 & 0xff)
}

pub fn segment5(opcode: u32) -> Code {
    debug_assert!(opcode < 67_108_864, "segment 5 opcode out of range");
    0xc800_0000 | opcode
}

/// One decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Segment0 { opcode: u32, arg0: u32 },
    Segment1 { opcode: u32, arg0: u32, arg1: u32 },
    Segment2 { opcode: u32, arg0: u32 },
    Segment3 { opcode: u32, arg0: u32 },
    Segment4 { opcode: u32, arg0: u32, arg1: u32 },
    Segment5 { opcode: u32 },
}

impl Instruction {
    pub fn encode(self) -> Code {
        match self {
            Instruction::Segment0 { opcode, arg0 } => segment0(opcode, arg0),
            Instruction::Segment1 { opcode, arg0, arg1 } => segment1(opcode, arg0, arg1),
            Instruction::Segment2 { opcode, arg0 } => segment2(opcode, arg0),
            Instruction::Segment3 { opcode, arg0 } => segment3(opcode, arg0),
            Instruction::Segment4 { opcode, arg0, arg1 } => segment4(opcode, arg0, arg1),
            Instruction::Segment5 { opcode } => segment5(opcode),
        }
    }

    /// Splits a word back into its fields. Returns `None` for the reserved
    /// sub-ranges of the last segment.
    pub fn decode(code: Code) -> Option<Self> {
        match code >> 30 {
            0 => Some(Instruction::Segment0 {
                opcode: (code >> 24) & 0x3f,
                arg0: code & 0x00ff_ffff,
            }),
            1 => Some(Instruction::Segment1 {
                opcode: (code >> 24) & 0x3f,
                arg0: (code >> 12) & 0xfff,
                arg1: code & 0xfff,
            }),
            2 => Some(Instruction::Segment2 {
                opcode: (code >> 20) & 0x3ff,
                arg0: code & 0x000f_ffff,
            }),
            _ => match code >> 26 {
                0x30 => Some(Instruction::Segment3 {
                    opcode: (code >> 8) & 0x3ffff,
                    arg0: code & 0xff,
                }),
                0x31 => Some(Instruction::Segment4 {
                    opcode: (code >> 16) & 0x3ff,
                    arg0: (code >> 8) & 0xff,
                    arg1: code & 0xff,
                }),
                0x32 => Some(Instruction::Segment5 {
                    opcode: code & 0x03ff_ffff,
                }),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Segment0 { opcode: OP_PUSH, arg0 } => write!(f, "push {arg0}"),
            Instruction::Segment0 {
                opcode: OP_JUMP_FORWARD,
                arg0,
            } => write!(f, "jump +{arg0}"),
            Instruction::Segment0 {
                opcode: OP_JUMP_BACKWARD,
                arg0,
            } => write!(f, "jump -{arg0}"),
            Instruction::Segment0 { opcode, arg0 } => write!(f, "op0:{opcode} {arg0}"),
            Instruction::Segment1 { opcode, arg0, arg1 } => {
                write!(f, "op1:{opcode} {arg0} {arg1}")
            }
            Instruction::Segment2 { opcode, arg0 } => write!(f, "op2:{opcode} {arg0}"),
            Instruction::Segment3 {
                opcode: OP_MESSAGE_BOX,
                arg0,
            } => write!(f, "MessageBox buttons={arg0}"),
            Instruction::Segment3 { opcode, arg0 } => write!(f, "op3:{opcode:#x} optional={arg0}"),
            Instruction::Segment4 { opcode, arg0, arg1 } => {
                write!(f, "op4:{opcode:#x} {arg0} {arg1}")
            }
            Instruction::Segment5 { opcode } => match Opcode::from_code(opcode) {
                Some(op) => write!(f, "{}", op.name()),
                None => write!(f, "op5:{opcode:#x}"),
            },
        }
    }
}

macro_rules! opcodes {
    ($($name:ident = $value:literal),* $(,)?) => {
        /// Built-in segment 5 opcodes.
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($name = $value),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name)),*
                }
            }

            pub fn from_code(code: u32) -> Option<Opcode> {
                match code {
                    $($value => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    StoreLocalShort = 0,
    StoreLocalLong = 1,
    StoreLocalFloat = 2,
    IntToFloat = 3,
    FetchIntLiteral = 4,
    FetchFloatLiteral = 5,
    FloatToInt = 6,
    NegateInt = 7,
    NegateFloat = 8,
    AddInt = 9,
    AddFloat = 10,
    SubInt = 11,
    SubFloat = 12,
    MulInt = 13,
    MulFloat = 14,
    DivInt = 15,
    DivFloat = 16,
    IntToFloat1 = 17,
    FloatToInt1 = 18,
    SquareRoot = 19,
    Return = 20,
    FetchLocalShort = 21,
    FetchLocalLong = 22,
    FetchLocalFloat = 23,
    SkipOnZero = 24,
    SkipOnNonZero = 25,
    EqualInt = 26,
    NonEqualInt = 27,
    LessThanInt = 28,
    LessOrEqualInt = 29,
    GreaterThanInt = 30,
    GreaterOrEqualInt = 31,
    EqualFloat = 32,
    NonEqualFloat = 33,
    LessThanFloat = 34,
    LessOrEqualFloat = 35,
    GreaterThanFloat = 36,
    GreaterOrEqualFloat = 37,
    MenuMode = 38,
    StoreGlobalShort = 39,
    StoreGlobalLong = 40,
    StoreGlobalFloat = 41,
    FetchGlobalShort = 42,
    FetchGlobalLong = 43,
    FetchGlobalFloat = 44,
    Random = 45,
    ScriptRunning = 46,
    StartScript = 47,
    StopScript = 48,
    GetDistance = 49,
    GetSecondsPassed = 50,
    Enable = 51,
    Disable = 52,
    GetDisabled = 53,
    EnableExplicit = 54,
    DisableExplicit = 55,
    GetDisabledExplicit = 56,
    GetDistanceExplicit = 57,
    Report = 58,
    StoreMemberShort = 59,
    StoreMemberLong = 60,
    StoreMemberFloat = 61,
    FetchMemberShort = 62,
    FetchMemberLong = 63,
    FetchMemberFloat = 64,
    StoreGlobalMemberShort = 65,
    StoreGlobalMemberLong = 66,
    StoreGlobalMemberFloat = 67,
    FetchGlobalMemberShort = 68,
    FetchGlobalMemberLong = 69,
    FetchGlobalMemberFloat = 70,
    StartScriptExplicit = 71,
}
