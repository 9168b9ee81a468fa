//! Tokens delivered by the scanner.
//
//  Every token travels together with a `TokenLoc` so that diagnostics can
//  point at the offending source text.

use std::fmt;

/// Source position of a token plus the raw text it was scanned from.
///
/// `line` is zero-based; `column` counts the characters consumed on the
/// current line. A default location means "nothing scanned yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLoc {
    pub column: usize,
    pub line: usize,
    pub literal: String,
}

impl fmt::Display for TokenLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} ({})",
            self.line + 1,
            self.column + 1,
            self.literal
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Begin,
    End,
    Short,
    Long,
    Float,
    If,
    Elseif,
    Else,
    Endif,
    While,
    Endwhile,
    Return,
    MessageBox,
    Set,
    To,
    GetSquareRoot,
    MenuMode,
    Random,
    StartScript,
    StopScript,
    ScriptRunning,
    GetDistance,
    GetSecondsPassed,
    Enable,
    Disable,
    GetDisabled,
    /// Keyword registered through `Extensions`; carries its negative code.
    Extension(i32),
}

impl Keyword {
    /// Built-in keywords in code order.
    pub const BUILTIN: [(&'static str, Keyword); 26] = [
        ("begin", Keyword::Begin),
        ("end", Keyword::End),
        ("short", Keyword::Short),
        ("long", Keyword::Long),
        ("float", Keyword::Float),
        ("if", Keyword::If),
        ("elseif", Keyword::Elseif),
        ("else", Keyword::Else),
        ("endif", Keyword::Endif),
        ("while", Keyword::While),
        ("endwhile", Keyword::Endwhile),
        ("return", Keyword::Return),
        ("messagebox", Keyword::MessageBox),
        ("set", Keyword::Set),
        ("to", Keyword::To),
        ("getsquareroot", Keyword::GetSquareRoot),
        ("menumode", Keyword::MenuMode),
        ("random", Keyword::Random),
        ("startscript", Keyword::StartScript),
        ("stopscript", Keyword::StopScript),
        ("scriptrunning", Keyword::ScriptRunning),
        ("getdistance", Keyword::GetDistance),
        ("getsecondspassed", Keyword::GetSecondsPassed),
        ("enable", Keyword::Enable),
        ("disable", Keyword::Disable),
        ("getdisabled", Keyword::GetDisabled),
    ];

    /// Looks up a built-in keyword. `name` must already be lower case.
    pub fn builtin(name: &str) -> Option<Keyword> {
        Self::BUILTIN
            .iter()
            .find(|(text, _)| *text == name)
            .map(|(_, keyword)| *keyword)
    }

    /// Numeric keyword code: table index for built-ins, negative for extensions.
    pub fn code(self) -> i32 {
        match self {
            Keyword::Extension(code) => code,
            builtin => Self::BUILTIN
                .iter()
                .position(|(_, keyword)| *keyword == builtin)
                .map_or(0, |index| index as i32),
        }
    }

    /// Keywords that may legitimately appear as plain names (variable names,
    /// script names, string arguments).
    pub fn is_statement_keyword(self) -> bool {
        matches!(
            self,
            Keyword::End
                | Keyword::Begin
                | Keyword::Short
                | Keyword::Long
                | Keyword::Float
                | Keyword::If
                | Keyword::Endif
                | Keyword::Else
                | Keyword::Elseif
                | Keyword::While
                | Keyword::Endwhile
                | Keyword::Return
                | Keyword::MessageBox
                | Keyword::Set
                | Keyword::To
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    Newline,
    Open,
    Close,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    Plus,
    Minus,
    Mult,
    Div,
    Comma,
    /// `->`
    Ref,
    /// `.`
    Member,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i32),
    Float(f32),
    Name(String),
    Keyword(Keyword),
    Special(Special),
    Comment(String),
    Eof,
}

/// Strips one pair of surrounding double quotes, if present.
pub fn unquote(literal: &str) -> &str {
    if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
        &literal[1..literal.len() - 1]
    } else {
        literal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_codes() {
        let test_cases = vec![
            (Keyword::Begin, 0),
            (Keyword::Set, 13),
            (Keyword::GetDisabled, 25),
            (Keyword::Extension(-3), -3),
        ];

        for (keyword, expected) in test_cases {
            assert_eq!(keyword.code(), expected);
        }
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(Keyword::builtin("messagebox"), Some(Keyword::MessageBox));
        assert_eq!(Keyword::builtin("getsquareroot"), Some(Keyword::GetSquareRoot));
        assert_eq!(Keyword::builtin("MessageBox"), None);
        assert_eq!(Keyword::builtin("fargoth"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"set\""), "set");
        assert_eq!(unquote("set"), "set");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_loc_display() {
        let loc = TokenLoc {
            column: 4,
            line: 2,
            literal: "fargoth".into(),
        };
        assert_eq!(loc.to_string(), "line 3, column 5 (fargoth)");
    }
}
