use std::{borrow::Cow, fmt};

use crate::object::PostScriptString;

pub type PostScriptResult<T> = anyhow::Result<T>;

/*
postscript spec page 523

dictfull No more room in dictionary
dictstackunderflow Too many end operators
invalidaccess Attempt to violate access attribute
invalidexit exit not in loop
invalidfont Invalid Font resource name or font dictionary
ioerror Input/output error
limitcheck Implementation limit exceeded
nocurrentpoint Current point undefined
rangecheck Operand out of bounds
stackunderflow Operand stack underflow
syntaxerror PostScript language syntax error
typecheck Operand of wrong type
undefined Name not known
undefinedfilename File not found
undefinedresult Overflow, underflow, or meaningless result
unmatchedmark Expected mark not on stack
*/

#[derive(Debug, Clone, PartialEq)]
pub enum PostScriptError {
    /// Operand stack underflow
    StackUnderflow,

    /// Operand of wrong type
    TypeCheck,

    /// Operand out of bounds
    RangeCheck,

    /// Name not known
    Undefined { name: PostScriptString },

    /// Overflow, underflow, or meaningless arithmetic result
    UndefinedResult,

    /// No more room in dictionary
    DictFull,

    /// Too many end operators
    DictStackUnderflow,

    /// Attempt to violate an access attribute
    InvalidAccess,

    /// Expected mark not on stack
    UnmatchedMark,

    /// File not found, or a file operator without a backing provider
    UndefinedFilename,

    /// Malformed source text
    SyntaxError(Cow<'static, str>),

    /// Filter decoding failure
    IoError(Cow<'static, str>),

    /// Implementation limit exceeded: step budget, loop stack depth, or
    /// dictionary capacity
    LimitCheck,

    /// Current point undefined
    NoCurrentPoint,

    /// Invalid font name or font dictionary
    InvalidFont,

    /// exit executed outside of a loop body
    InvalidExit,
}

impl PostScriptError {
    /// The standard lowercase error name, as it would be reported by the
    /// `$error` machinery of a conforming interpreter
    pub fn name(&self) -> &'static str {
        match self {
            Self::StackUnderflow => "stackunderflow",
            Self::TypeCheck => "typecheck",
            Self::RangeCheck => "rangecheck",
            Self::Undefined { .. } => "undefined",
            Self::UndefinedResult => "undefinedresult",
            Self::DictFull => "dictfull",
            Self::DictStackUnderflow => "dictstackunderflow",
            Self::InvalidAccess => "invalidaccess",
            Self::UnmatchedMark => "unmatchedmark",
            Self::UndefinedFilename => "undefinedfilename",
            Self::SyntaxError(..) => "syntaxerror",
            Self::IoError(..) => "ioerror",
            Self::LimitCheck => "limitcheck",
            Self::NoCurrentPoint => "nocurrentpoint",
            Self::InvalidFont => "invalidfont",
            Self::InvalidExit => "invalidexit",
        }
    }
}

impl fmt::Display for PostScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined { name } => write!(f, "undefined: {:?}", name),
            Self::SyntaxError(msg) => write!(f, "syntaxerror: {}", msg),
            Self::IoError(msg) => write!(f, "ioerror: {}", msg),
            err => f.write_str(err.name()),
        }
    }
}

impl std::error::Error for PostScriptError {}

/// Raised by the `stop` operator. Propagates until the nearest enclosing
/// `stopped` context, which converts it into a boolean result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StopSignal;

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stop")
    }
}

impl std::error::Error for StopSignal {}
