use std::borrow::Cow;

use crate::{
    error::{PostScriptError, PostScriptResult},
    filter,
    geometry::BoundingBox,
    lex::{parse_number, LexBase, Number},
    object::{Name, Object, ObjectKind, PostScriptArray, PostScriptString, Vm},
};

/// Structural metadata extracted from the DSC prologue
///
/// Only the leading comment block is examined; `%%` comments appearing after
/// the first line of executable content are ordinary comments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub bounding_box: Option<BoundingBox>,
    pub title: Option<String>,
    pub creator: Option<String>,
}

impl DocumentMetadata {
    pub fn from_source(source: &[u8]) -> Self {
        let mut metadata = Self::default();

        for line in source.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if line.iter().all(|&b| matches!(b, b' ' | b'\t')) {
                continue;
            }

            if !line.starts_with(b"%") {
                break;
            }

            if let Some(rest) = line.strip_prefix(b"%%BoundingBox:") {
                if metadata.bounding_box.is_none() {
                    metadata.bounding_box = parse_bounding_box(rest);
                }
            } else if let Some(rest) = line.strip_prefix(b"%%Title:") {
                if metadata.title.is_none() {
                    metadata.title = parse_text_line(rest);
                }
            } else if let Some(rest) = line.strip_prefix(b"%%Creator:") {
                if metadata.creator.is_none() {
                    metadata.creator = parse_text_line(rest);
                }
            }
        }

        metadata
    }
}

fn parse_bounding_box(rest: &[u8]) -> Option<BoundingBox> {
    let text = std::str::from_utf8(rest).ok()?;

    let mut numbers = text
        .split_ascii_whitespace()
        .map(|word| word.parse::<f64>());

    let llx = numbers.next()?.ok()?;
    let lly = numbers.next()?.ok()?;
    let urx = numbers.next()?.ok()?;
    let ury = numbers.next()?.ok()?;

    Some(BoundingBox {
        llx,
        lly,
        urx,
        ury,
    })
}

fn parse_text_line(rest: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(rest).trim().to_owned();

    (!text.is_empty()).then_some(text)
}

/// A classified raw token. The scanner promotes these to typed [`Object`]s
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(Number),
    /// A bare identifier, executed when fetched
    ExecutableName(Vec<u8>),
    /// `/ident`
    LiteralName(Vec<u8>),
    /// `//ident`
    ImmediateName(Vec<u8>),
    /// `(...)`, `<...>`, or `<~...~>`
    String(Vec<u8>),
    ProcedureStart,
    ProcedureEnd,
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
}

#[derive(Debug)]
pub(crate) struct PostScriptLexer<'a> {
    cursor: usize,
    buffer: Cow<'a, [u8]>,
}

impl LexBase for PostScriptLexer<'_> {
    fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn cursor_mut(&mut self) -> &mut usize {
        &mut self.cursor
    }
}

impl<'a> PostScriptLexer<'a> {
    pub fn new(buffer: Cow<'a, [u8]>) -> Self {
        Self { buffer, cursor: 0 }
    }

    fn next_token(&mut self) -> PostScriptResult<Option<Token>> {
        self.skip_whitespace();

        let b = match self.peek_byte() {
            Some(b) => b,
            None => return Ok(None),
        };

        Ok(Some(match b {
            b'{' => {
                self.next_byte();
                Token::ProcedureStart
            }
            b'}' => {
                self.next_byte();
                Token::ProcedureEnd
            }
            b'[' => {
                self.next_byte();
                Token::ArrayStart
            }
            b']' => {
                self.next_byte();
                Token::ArrayEnd
            }
            b'/' => {
                self.next_byte();

                if self.peek_byte() == Some(b'/') {
                    self.next_byte();
                    Token::ImmediateName(self.lex_name())
                } else {
                    Token::LiteralName(self.lex_name())
                }
            }
            b'(' => {
                self.next_byte();
                Token::String(self.lex_string_body()?)
            }
            b'<' => {
                self.next_byte();

                match self.peek_byte() {
                    Some(b'<') => {
                        self.next_byte();
                        Token::DictStart
                    }
                    Some(b'~') => {
                        self.next_byte();
                        Token::String(self.lex_base85_body()?)
                    }
                    _ => Token::String(self.lex_hex_string_body()?),
                }
            }
            b'>' => {
                self.next_byte();

                if self.peek_byte() == Some(b'>') {
                    self.next_byte();
                    Token::DictEnd
                } else {
                    anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                        "unexpected '>'"
                    )));
                }
            }
            b')' => {
                anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                    "unexpected ')'"
                )));
            }
            _ => {
                let token = self.lex_regular_token();

                match parse_number(&token) {
                    Some(number) => Token::Number(number),
                    None => Token::ExecutableName(token),
                }
            }
        }))
    }

    /// A `<~...~>` base-85 string body. Assumes `<~` has been consumed
    fn lex_base85_body(&mut self) -> PostScriptResult<Vec<u8>> {
        let start = self.cursor;

        loop {
            match self.peek_byte() {
                Some(b'~') if self.peek_byte_offset(1) == Some(b'>') => {
                    let body = self.buffer[start..self.cursor].to_vec();
                    self.cursor += 2;
                    return filter::ascii::decode_ascii_85(&body);
                }
                Some(..) => {
                    self.next_byte();
                }
                None => anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                    "unterminated base-85 string"
                ))),
            }
        }
    }
}

/// Lifts tokens into typed values with the correct executability, collecting
/// `{ ... }` procedure bodies eagerly
///
/// A scanner is an execution-stack frame: the interpreter asks the topmost
/// scanner for values until it reports EOF
#[derive(Debug)]
pub(crate) struct Scanner<'a> {
    lexer: PostScriptLexer<'a>,
}

impl<'a> Scanner<'a> {
    pub fn new(buffer: Cow<'a, [u8]>) -> Self {
        Self {
            lexer: PostScriptLexer::new(buffer),
        }
    }

    /// The next typed value in the program, or `None` at end of input
    pub fn next_object(&mut self, vm: &mut Vm) -> PostScriptResult<Option<Object>> {
        let token = match self.lexer.next_token()? {
            Some(token) => token,
            None => return Ok(None),
        };

        Ok(Some(self.lift(token, vm)?))
    }

    fn lift(&mut self, token: Token, vm: &mut Vm) -> PostScriptResult<Object> {
        Ok(match token {
            Token::Number(Number::Int(n)) => Object::int(n),
            Token::Number(Number::Real(n)) => Object::real(n),
            Token::LiteralName(name) => {
                Object::literal(ObjectKind::Name(Name::from_bytes(name)))
            }
            Token::ExecutableName(name) => {
                Object::executable(ObjectKind::Name(Name::from_bytes(name)))
            }
            // immediate names are resolved by the interpreter at fetch time;
            // they behave as executable names here
            Token::ImmediateName(name) => {
                Object::executable(ObjectKind::Name(Name::from_bytes(name)))
            }
            Token::String(bytes) => vm.intern_string(PostScriptString::from_bytes(bytes)),
            Token::ProcedureStart => {
                let body = self.collect_procedure(vm)?;
                Object::executable(ObjectKind::Array(
                    vm.new_array(PostScriptArray::from_objects(body)),
                ))
            }
            Token::ProcedureEnd => {
                anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                    "unmatched '}'"
                )))
            }
            // `[` and `<<` push a mark; `]` and `>>` resolve to the operators
            // that collect the marked region
            Token::ArrayStart | Token::DictStart => Object::literal(ObjectKind::Mark),
            Token::ArrayEnd => Object::executable(ObjectKind::Name(Name::from_bytes(
                b"]".to_vec(),
            ))),
            Token::DictEnd => Object::executable(ObjectKind::Name(Name::from_bytes(
                b">>".to_vec(),
            ))),
        })
    }

    fn collect_procedure(&mut self, vm: &mut Vm) -> PostScriptResult<Vec<Object>> {
        let mut body = Vec::new();

        loop {
            let token = match self.lexer.next_token()? {
                Some(token) => token,
                None => anyhow::bail!(PostScriptError::SyntaxError(Cow::Borrowed(
                    "unterminated procedure"
                ))),
            };

            if token == Token::ProcedureEnd {
                break;
            }

            body.push(self.lift(token, vm)?);
        }

        Ok(body)
    }

    /// Consumes at most one whitespace byte separating an operator from
    /// inline data, per the file-read operators
    pub fn skip_data_separator(&mut self) {
        if self.lexer.peek_byte().map_or(false, PostScriptLexer::is_whitespace) {
            self.lexer.next_byte();
        }
    }

    /// Reads up to `n` raw bytes from the source, advancing past them
    pub fn read_raw(&mut self, n: usize) -> Vec<u8> {
        let start = self.lexer.cursor();
        let end = (start + n).min(self.lexer.buffer().len());

        let bytes = self.lexer.buffer()[start..end].to_vec();
        *self.lexer.cursor_mut() = end;

        bytes
    }

    /// Reads raw bytes up to and including `marker`, returning the bytes
    /// before it. Consumes the rest of the source when the marker is absent
    pub fn read_until(&mut self, marker: &[u8]) -> Vec<u8> {
        let start = self.lexer.cursor();
        let rest = &self.lexer.buffer()[start..];

        match rest
            .windows(marker.len())
            .position(|window| window == marker)
        {
            Some(pos) => {
                let bytes = rest[..pos].to_vec();
                *self.lexer.cursor_mut() = start + pos + marker.len();
                bytes
            }
            None => {
                let bytes = rest.to_vec();
                *self.lexer.cursor_mut() = self.lexer.buffer().len();
                bytes
            }
        }
    }

    /// Reads the remainder of the source
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let start = self.lexer.cursor();
        *self.lexer.cursor_mut() = self.lexer.buffer().len();

        self.lexer.buffer()[start..].to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn scan_all(source: &[u8]) -> (Vec<Object>, Vm) {
        let mut vm = Vm::new();
        let mut scanner = Scanner::new(Cow::Borrowed(source));
        let mut objects = Vec::new();

        while let Some(obj) = scanner.next_object(&mut vm).unwrap() {
            objects.push(obj);
        }

        (objects, vm)
    }

    #[test]
    fn numbers_and_names() {
        let (objects, _) = scan_all(b"5 -3.14 /lit bare 16#FF");

        assert_eq!(objects[0], Object::int(5));
        assert_eq!(objects[1], Object::real(-3.14));
        assert_eq!(
            objects[2],
            Object::literal(ObjectKind::Name(Name::from_bytes(b"lit".to_vec())))
        );
        assert_eq!(
            objects[3],
            Object::executable(ObjectKind::Name(Name::from_bytes(b"bare".to_vec())))
        );
        assert_eq!(objects[4], Object::int(255));
    }

    #[test]
    fn string_escapes() {
        let (objects, vm) = scan_all(br"(a\(b\)c\n\101\53)");

        match objects[0].kind {
            ObjectKind::String(idx) => {
                assert_eq!(vm.get_str(idx).as_bytes(), b"a(b)c\nA+");
            }
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn nested_parens_balance() {
        let (objects, vm) = scan_all(b"(outer (inner) tail)");

        match objects[0].kind {
            ObjectKind::String(idx) => {
                assert_eq!(vm.get_str(idx).as_bytes(), b"outer (inner) tail");
            }
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn hex_string_odd_nibble_padded() {
        // the trailing lone nibble `2` reads as 0x20
        let (objects, vm) = scan_all(b"<48 65 6C6C 6F2>");

        match objects[0].kind {
            ObjectKind::String(idx) => {
                assert_eq!(vm.get_str(idx).as_bytes(), b"Hello ");
            }
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn base85_string() {
        let (objects, vm) = scan_all(b"<~9jqo^F*2M7/c~>");

        match objects[0].kind {
            ObjectKind::String(idx) => {
                assert_eq!(vm.get_str(idx).as_bytes(), b"Man sure.");
            }
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn nested_procedures() {
        let (objects, vm) = scan_all(b"{ 1 { 2 } 3 }");

        let outer = match objects[0] {
            Object {
                kind: ObjectKind::Array(idx),
                executable: true,
            } => vm.get_arr(idx),
            _ => panic!("expected executable array"),
        };

        assert_eq!(outer.len(), 3);
        assert_eq!(outer.get(0).unwrap(), &Object::int(1));
        assert!(matches!(
            outer.get(1).unwrap().kind,
            ObjectKind::Array(..)
        ));
        assert_eq!(outer.get(2).unwrap(), &Object::int(3));
    }

    #[test]
    fn unmatched_procedure_end_is_syntax_error() {
        let mut vm = Vm::new();
        let mut scanner = Scanner::new(Cow::Borrowed(b"}".as_slice()));

        assert!(scanner.next_object(&mut vm).is_err());
    }

    #[test]
    fn brackets_scan_to_mark_and_name() {
        let (objects, _) = scan_all(b"[ ]");

        assert_eq!(objects[0], Object::literal(ObjectKind::Mark));
        assert_eq!(
            objects[1],
            Object::executable(ObjectKind::Name(Name::from_bytes(b"]".to_vec())))
        );
    }

    #[test]
    fn comments_skipped() {
        let (objects, _) = scan_all(b"1 % this is a comment\n2");

        assert_eq!(objects, vec![Object::int(1), Object::int(2)]);
    }

    #[test]
    fn bounding_box_metadata() {
        let metadata = DocumentMetadata::from_source(
            b"%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 10 20 300 400\n%%Title: test\n1 2 add\n",
        );

        assert_eq!(
            metadata.bounding_box,
            Some(BoundingBox {
                llx: 10.0,
                lly: 20.0,
                urx: 300.0,
                ury: 400.0
            })
        );
        assert_eq!(metadata.title.as_deref(), Some("test"));
    }

    #[test]
    fn bounding_box_only_in_prologue() {
        let metadata =
            DocumentMetadata::from_source(b"%!PS\n1 2 add\n%%BoundingBox: 0 0 100 100\n");

        assert_eq!(metadata.bounding_box, None);
    }
}
