//! printf-style placeholder scanning for `messagebox` format strings.
//!
//! Supported: `%s`/`%S` (string), `%d`/`%i` (integer), `%f`/`%e`/`%g`/`%a`
//! and their upper-case forms (float), with optional `0`/blank padding, a
//! width and a `.precision`. `%%` is a literal percent sign; anything else
//! after `%` is ignored.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    String,
    Integer,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub placeholder: Placeholder,
    pub pad: char,
    pub width: Option<usize>,
    pub precision: Option<usize>,
}

pub fn placeholders(format: &str) -> Vec<FormatSpec> {
    let chars: Vec<char> = format.chars().collect();
    let mut specs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '%' {
            i += 1;
            continue;
        }
        i += 1;
        if chars.get(i) == Some(&'%') {
            i += 1;
            continue;
        }

        let mut pad = ' ';
        if let Some(&c @ ('0' | ' ')) = chars.get(i) {
            pad = c;
            i += 1;
        }

        let mut width = None;
        while let Some(digit) = chars.get(i).and_then(|c| c.to_digit(10)) {
            width = Some(width.unwrap_or(0) * 10 + digit as usize);
            i += 1;
        }

        let mut precision = None;
        if chars.get(i) == Some(&'.') {
            i += 1;
            let mut value = 0;
            while let Some(digit) = chars.get(i).and_then(|c| c.to_digit(10)) {
                value = value * 10 + digit as usize;
                i += 1;
            }
            precision = Some(value);
        }

        let Some(&conversion) = chars.get(i) else {
            break;
        };
        i += 1;

        let placeholder = match conversion {
            's' | 'S' => Placeholder::String,
            'd' | 'i' => Placeholder::Integer,
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A' => Placeholder::Float,
            _ => continue,
        };
        specs.push(FormatSpec {
            placeholder,
            pad,
            width,
            precision,
        });
    }

    specs
}

/// Argument signature (`S`, `l`, `f` letters) implied by a format string.
pub fn argument_signature(format: &str) -> String {
    placeholders(format)
        .iter()
        .map(|spec| match spec.placeholder {
            Placeholder::String => 'S',
            Placeholder::Integer => 'l',
            Placeholder::Float => 'f',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_signature() {
        let test_cases = vec![
            ("Hello", ""),
            ("%d gold", "l"),
            ("%s has %i of %.2f", "Slf"),
            ("100%% sure %G", "f"),
            ("%05.1f %q %S", "fS"),
            ("trailing %", ""),
            ("%3", ""),
        ];

        for (format, expected) in test_cases {
            assert_eq!(argument_signature(format), expected, "{format}");
        }
    }

    #[test]
    fn test_spec_fields() {
        let specs = placeholders("%08.3f % 4d");
        assert_eq!(
            specs,
            vec![
                FormatSpec {
                    placeholder: Placeholder::Float,
                    pad: '0',
                    width: Some(8),
                    precision: Some(3),
                },
                FormatSpec {
                    placeholder: Placeholder::Integer,
                    pad: ' ',
                    width: Some(4),
                    precision: None,
                },
            ]
        );
    }
}
