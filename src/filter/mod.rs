use crate::error::{PostScriptError, PostScriptResult};

pub mod ascii;
pub mod flate;

/// The decoding filters supported by the `filter` operator. Other filter
/// names raise *undefinedfilename*
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Ascii85,
    AsciiHex,
    Flate,
}

impl FilterKind {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ASCII85Decode" => Some(Self::Ascii85),
            b"ASCIIHexDecode" => Some(Self::AsciiHex),
            b"FlateDecode" => Some(Self::Flate),
            _ => None,
        }
    }

    /// The end-of-data marker that delimits this filter's encoded bytes when
    /// reading from the program source. Flate data is binary and runs to the
    /// end of the stream
    pub fn eod_marker(self) -> Option<&'static [u8]> {
        match self {
            Self::Ascii85 => Some(b"~>"),
            Self::AsciiHex => Some(b">"),
            Self::Flate => None,
        }
    }

    pub fn decode(self, data: &[u8]) -> PostScriptResult<Vec<u8>> {
        match self {
            Self::Ascii85 => ascii::decode_ascii_85(data),
            Self::AsciiHex => ascii::decode_ascii_hex(data),
            Self::Flate => flate::decode_flate(data),
        }
    }
}

/// A byte source addressable through a file object
///
/// `Source` stands for the currently executing program (the object returned
/// by `currentfile`); reads from it consume bytes from the topmost scanner.
/// `Memory` holds decoded filter output
#[derive(Debug)]
pub enum FileStream {
    Source,
    Memory { buffer: Vec<u8>, cursor: usize },
}

impl FileStream {
    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self::Memory { buffer, cursor: 0 }
    }

    /// Reads up to `n` bytes from an in-memory stream. Reading from `Source`
    /// is handled by the interpreter, which owns the scanner
    pub fn read(&mut self, n: usize) -> PostScriptResult<Vec<u8>> {
        match self {
            Self::Source => anyhow::bail!(PostScriptError::IoError(
                "raw read from program source outside interpreter".into()
            )),
            Self::Memory { buffer, cursor } => {
                let end = cursor.saturating_add(n).min(buffer.len());
                let bytes = buffer[*cursor..end].to_vec();
                *cursor = end;

                Ok(bytes)
            }
        }
    }
}
