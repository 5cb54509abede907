use std::borrow::Cow;

use crate::error::{PostScriptError, PostScriptResult};

const FORM_FEED: u8 = b'\x0C';
const BACKSPACE: u8 = b'\x08';

/// Restartable byte source with lookahead, shared by the program scanner and
/// the string conversion operators
pub(crate) trait LexBase {
    fn buffer(&self) -> &[u8];
    fn cursor(&self) -> usize;
    fn cursor_mut(&mut self) -> &mut usize;

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if Self::is_whitespace(b) {
                self.next_byte();
            } else if b == b'%' {
                self.next_byte();
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        self.buffer().get(self.cursor()).copied().map(|b| {
            *self.cursor_mut() += 1;
            b
        })
    }

    fn peek_byte(&self) -> Option<u8> {
        self.buffer().get(self.cursor()).copied()
    }

    fn peek_byte_offset(&self, offset: usize) -> Option<u8> {
        self.buffer().get(self.cursor() + offset).copied()
    }

    fn at_eof(&self) -> bool {
        self.cursor() >= self.buffer().len()
    }

    /// Whitespace chars are defined as
    ///
    /// * NUL             0x0
    /// * Horizontal tab  0x9
    /// * Line feed       0xa
    /// * Form feed       0xc
    /// * Carriage return 0xd
    /// * Space           0x20
    fn is_whitespace(b: u8) -> bool {
        matches!(b, b'\0' | 0x9 | b'\n' | FORM_FEED | b'\r' | b' ')
    }

    fn is_delimiter(b: u8) -> bool {
        matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
    }

    fn is_regular(b: u8) -> bool {
        !Self::is_whitespace(b) && !Self::is_delimiter(b)
    }

    /// Assumes the leading `%` has already been consumed
    fn skip_comment(&mut self) {
        while !self.next_is_eol() {
            self.next_byte();
        }
    }

    fn next_is_eol(&self) -> bool {
        match self.peek_byte() {
            Some(b'\r' | b'\n') => true,
            Some(..) => false,
            None => true,
        }
    }

    fn expect_byte(&mut self, expected: u8) -> PostScriptResult<()> {
        match self.next_byte() {
            Some(found) if expected == found => Ok(()),
            _ => anyhow::bail!(PostScriptError::SyntaxError(Cow::Owned(format!(
                "expected {:?}",
                expected as char
            )))),
        }
    }

    /// The run of regular characters starting at the cursor
    fn lex_regular_token(&mut self) -> Vec<u8> {
        let start = self.cursor();

        while let Some(b) = self.peek_byte() {
            if !Self::is_regular(b) {
                break;
            }

            self.next_byte();
        }

        self.buffer()[start..self.cursor()].to_vec()
    }

    /// Assumes the leading `/` has already been consumed
    fn lex_name(&mut self) -> Vec<u8> {
        self.lex_regular_token()
    }

    /// A `(...)` string body with balanced parentheses, the standard escape
    /// set, 1-3 digit octal escapes, and backslash line continuation.
    /// Assumes the leading `(` has already been consumed
    fn lex_string_body(&mut self) -> PostScriptResult<Vec<u8>> {
        let mut string = Vec::new();
        let mut open_parens = 0u32;

        loop {
            let b = match self.next_byte() {
                Some(b) => b,
                None => {
                    anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                        "unterminated string"
                    )))
                }
            };

            match b {
                b')' if open_parens == 0 => break,
                b')' => {
                    open_parens -= 1;
                    string.push(b')');
                }
                b'(' => {
                    open_parens += 1;
                    string.push(b'(');
                }
                b'\\' => match self.next_byte() {
                    Some(b'n') => string.push(b'\n'),
                    Some(b'r') => string.push(b'\r'),
                    Some(b't') => string.push(b'\t'),
                    Some(b'b') => string.push(BACKSPACE),
                    Some(b'f') => string.push(FORM_FEED),
                    Some(b'(') => string.push(b'('),
                    Some(b')') => string.push(b')'),
                    Some(b'\\') => string.push(b'\\'),
                    // line continuation: the escaped newline is dropped
                    Some(b'\n') => {}
                    Some(b'\r') => {
                        if self.peek_byte() == Some(b'\n') {
                            self.next_byte();
                        }
                    }
                    // octal escape of the form `\d`, `\dd`, or `\ddd`
                    Some(c @ b'0'..=b'7') => {
                        let mut n = u16::from(c - b'0');

                        for _ in 0..2 {
                            match self.peek_byte() {
                                Some(d @ b'0'..=b'7') => {
                                    self.next_byte();
                                    n = n * 8 + u16::from(d - b'0');
                                }
                                _ => break,
                            }
                        }

                        string.push(n as u8);
                    }
                    // an unrecognized escape stands for the character itself
                    Some(c) => string.push(c),
                    None => {
                        anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                            "unterminated string escape"
                        )))
                    }
                },
                _ => string.push(b),
            }
        }

        Ok(string)
    }

    /// A `<...>` hex string body: hex pairs with interior whitespace skipped,
    /// an odd trailing nibble zero-padded. Assumes the leading `<` has been
    /// consumed
    fn lex_hex_string_body(&mut self) -> PostScriptResult<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut nibble: Option<u8> = None;

        loop {
            let b = match self.next_byte() {
                Some(b) => b,
                None => {
                    anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                        "unterminated hex string"
                    )))
                }
            };

            if b == b'>' {
                break;
            }

            if Self::is_whitespace(b) {
                continue;
            }

            let digit = hex_digit(b).ok_or_else(|| {
                anyhow::anyhow!(PostScriptError::SyntaxError(Cow::Borrowed(
                    "invalid hex digit"
                )))
            })?;

            match nibble.take() {
                Some(high) => bytes.push(high << 4 | digit),
                None => nibble = Some(digit),
            }
        }

        if let Some(high) = nibble {
            bytes.push(high << 4);
        }

        Ok(bytes)
    }
}

pub(crate) fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// A parsed numeric token
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i32),
    Real(f64),
}

/// Parses a complete token using the numeric grammar shared by the scanner
/// and `cvi`/`cvr`/`token`: decimal integers, reals with optional fraction
/// and exponent (`12.3`, `12.3e4`, `12E-3`), and radix integers
/// (`radix#digits`, radix 2-36)
///
/// Returns `None` when the token is not a number, in which case the scanner
/// treats it as an executable name
pub(crate) fn parse_number(token: &[u8]) -> Option<Number> {
    if token.is_empty() {
        return None;
    }

    if let Some(radix_pos) = token.iter().position(|&b| b == b'#') {
        return parse_radix(&token[..radix_pos], &token[radix_pos + 1..]);
    }

    let mut rest = token;
    let mut saw_digit = false;
    let mut is_real = false;

    if matches!(rest.first(), Some(b'+' | b'-')) {
        rest = &rest[1..];
    }

    while matches!(rest.first(), Some(b'0'..=b'9')) {
        saw_digit = true;
        rest = &rest[1..];
    }

    if rest.first() == Some(&b'.') {
        is_real = true;
        rest = &rest[1..];

        while matches!(rest.first(), Some(b'0'..=b'9')) {
            saw_digit = true;
            rest = &rest[1..];
        }
    }

    if !saw_digit {
        return None;
    }

    if matches!(rest.first(), Some(b'e' | b'E')) {
        is_real = true;
        rest = &rest[1..];

        if matches!(rest.first(), Some(b'+' | b'-')) {
            rest = &rest[1..];
        }

        if !matches!(rest.first(), Some(b'0'..=b'9')) {
            return None;
        }

        while matches!(rest.first(), Some(b'0'..=b'9')) {
            rest = &rest[1..];
        }
    }

    if !rest.is_empty() {
        return None;
    }

    // the grammar above admits only ascii
    let text = std::str::from_utf8(token).ok()?;

    if is_real {
        return text.parse::<f64>().ok().map(Number::Real);
    }

    match text.parse::<i32>() {
        Ok(n) => Some(Number::Int(n)),
        // integer literals that overflow are promoted to reals
        Err(_) => text.parse::<f64>().ok().map(Number::Real),
    }
}

fn parse_radix(radix: &[u8], digits: &[u8]) -> Option<Number> {
    let radix = std::str::from_utf8(radix).ok()?.parse::<u32>().ok()?;

    if !(2..=36).contains(&radix) || digits.is_empty() {
        return None;
    }

    let digits = std::str::from_utf8(digits).ok()?;

    // radix digits are unsigned; the full 32-bit pattern is accepted, so
    // 16#FFFFFFFF wraps to -1
    let value = i64::from_str_radix(digits, radix).ok()?;

    if !(0..=i64::from(u32::MAX)).contains(&value) {
        return None;
    }

    Some(Number::Int(value as u32 as i32))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(parse_number(b"0"), Some(Number::Int(0)));
        assert_eq!(parse_number(b"-98"), Some(Number::Int(-98)));
        assert_eq!(parse_number(b"+17"), Some(Number::Int(17)));
    }

    #[test]
    fn reals() {
        assert_eq!(parse_number(b"-.002"), Some(Number::Real(-0.002)));
        assert_eq!(parse_number(b"34.5"), Some(Number::Real(34.5)));
        assert_eq!(parse_number(b"123.6e10"), Some(Number::Real(123.6e10)));
        assert_eq!(parse_number(b"1E-5"), Some(Number::Real(1e-5)));
        assert_eq!(parse_number(b"12E-3"), Some(Number::Real(0.012)));
    }

    #[test]
    fn radix_numbers() {
        assert_eq!(parse_number(b"8#1777"), Some(Number::Int(0o1777)));
        assert_eq!(parse_number(b"16#FFFE"), Some(Number::Int(0xFFFE)));
        assert_eq!(parse_number(b"2#1000"), Some(Number::Int(8)));
        assert_eq!(parse_number(b"16#FFFFFFFF"), Some(Number::Int(-1)));
        assert_eq!(parse_number(b"1#0"), None);
        assert_eq!(parse_number(b"37#0"), None);
    }

    #[test]
    fn not_numbers() {
        assert_eq!(parse_number(b"marks"), None);
        assert_eq!(parse_number(b"12x"), None);
        assert_eq!(parse_number(b"."), None);
        assert_eq!(parse_number(b"-"), None);
        assert_eq!(parse_number(b"1e"), None);
        assert_eq!(parse_number(b""), None);
    }

    #[test]
    fn overflowing_integer_promotes() {
        assert_eq!(
            parse_number(b"4294967296"),
            Some(Number::Real(4294967296.0))
        );
    }
}
