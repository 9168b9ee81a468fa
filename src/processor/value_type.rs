use serde::Deserialize;

/// Storage type of a variable, or the type of a value on the VM stack.
///
/// Values on the stack are only ever `Long` or `Float`; `Short` is a storage
/// type that behaves like `Long` in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Short,
    Long,
    Float,
}

impl ValueType {
    /// Maps the one-letter type codes (`s`, `l`, `f`) used by argument
    /// signatures and the locals file.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            's' => Some(ValueType::Short),
            'l' => Some(ValueType::Long),
            'f' => Some(ValueType::Float),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            ValueType::Short => 's',
            ValueType::Long => 'l',
            ValueType::Float => 'f',
        }
    }

    pub fn is_float(self) -> bool {
        self == ValueType::Float
    }

    /// Type this variable has once fetched onto the stack.
    pub fn operand(self) -> Self {
        if self.is_float() {
            ValueType::Float
        } else {
            ValueType::Long
        }
    }
}
