//! Builtin operator registrations provided by the execution environment
//!
//! Every operator is declared here as a (name, signature, operator) triple.
//! The signature lists one type-set per argument, bottom-to-top; a name
//! registered more than once is overloaded, and the interpreter picks the
//! first signature matching the operand stack. The interpreter constructor
//! turns this table into the system dictionary — nothing here relies on
//! registration side effects

use once_cell::sync::Lazy;

use crate::{
    error::PostScriptResult,
    object::{
        DictKey, Object, ObjectKind, OperatorIndex, PostScriptDictionary, Signature, TypeSet,
    },
    operator::Operator,
};

const ANY: TypeSet = TypeSet::ANY;
const INT: TypeSet = TypeSet::INT;
const BOOL: TypeSet = TypeSet::BOOL;
const NUM: TypeSet = TypeSet::NUMBER;
const STR: TypeSet = TypeSet::STRING;
const NAME: TypeSet = TypeSet::NAME;
const ARR: TypeSet = TypeSet::ANY_ARRAY;
const DICT: TypeSet = TypeSet::DICTIONARY;
const FILE: TypeSet = TypeSet::FILE;
const SAVE: TypeSet = TypeSet::SAVE;

/// Procedures are executable arrays; the executability check happens in the
/// operator body
const PROC: TypeSet = TypeSet::ANY_ARRAY;

const KEYED: TypeSet = NAME.union(STR);

/// Numbers and strings support the ordering operators
const ORDERED: TypeSet = NUM.union(STR);

/// Booleans and integers share the logical operators
const LOGICAL: TypeSet = BOOL.union(INT);

/// Arrays and strings support interval addressing
const SLICEABLE: TypeSet = ARR.union(STR);

const CONTAINER: TypeSet = SLICEABLE.union(DICT);

/// Everything carrying an access attribute
const ACCESSED: TypeSet = CONTAINER.union(FILE);

struct Registration {
    name: &'static str,
    signature: Signature,
    op: Operator,
}

const fn reg(name: &'static str, signature: Signature, op: Operator) -> Registration {
    Registration {
        name,
        signature,
        op,
    }
}

#[rustfmt::skip]
static REGISTRATIONS: &[Registration] = &[
    // operand stack
    reg("pop", &[ANY], Operator::Pop),
    reg("exch", &[ANY, ANY], Operator::Exch),
    reg("dup", &[ANY], Operator::Dup),
    reg("copy", &[INT], Operator::CopyN),
    reg("copy", &[CONTAINER, CONTAINER], Operator::CopyComposite),
    reg("index", &[INT], Operator::Index),
    reg("roll", &[INT, INT], Operator::Roll),
    reg("clear", &[], Operator::Clear),
    reg("count", &[], Operator::Count),
    reg("mark", &[], Operator::Mark),
    reg("[", &[], Operator::Mark),
    reg("<<", &[], Operator::Mark),
    reg("]", &[], Operator::ArrayEnd),
    reg(">>", &[], Operator::DictEnd),
    reg("cleartomark", &[], Operator::ClearToMark),
    reg("counttomark", &[], Operator::CountToMark),

    // arithmetic
    reg("add", &[NUM, NUM], Operator::Add),
    reg("sub", &[NUM, NUM], Operator::Sub),
    reg("mul", &[NUM, NUM], Operator::Mul),
    reg("div", &[NUM, NUM], Operator::Div),
    reg("idiv", &[INT, INT], Operator::Idiv),
    reg("mod", &[INT, INT], Operator::Mod),
    reg("neg", &[NUM], Operator::Neg),
    reg("abs", &[NUM], Operator::Abs),
    reg("ceiling", &[NUM], Operator::Ceiling),
    reg("floor", &[NUM], Operator::Floor),
    reg("round", &[NUM], Operator::Round),
    reg("truncate", &[NUM], Operator::Truncate),
    reg("sqrt", &[NUM], Operator::Sqrt),
    reg("atan", &[NUM, NUM], Operator::Atan),
    reg("cos", &[NUM], Operator::Cos),
    reg("sin", &[NUM], Operator::Sin),
    reg("exp", &[NUM, NUM], Operator::Exp),
    reg("ln", &[NUM], Operator::Ln),
    reg("log", &[NUM], Operator::Log),
    reg("rand", &[], Operator::Rand),
    reg("srand", &[INT], Operator::SRand),
    reg("rrand", &[], Operator::RRand),

    // relational, boolean, bitwise
    reg("eq", &[ANY, ANY], Operator::Eq),
    reg("ne", &[ANY, ANY], Operator::Ne),
    reg("lt", &[ORDERED, ORDERED], Operator::Lt),
    reg("le", &[ORDERED, ORDERED], Operator::Le),
    reg("gt", &[ORDERED, ORDERED], Operator::Gt),
    reg("ge", &[ORDERED, ORDERED], Operator::Ge),
    reg("and", &[LOGICAL, LOGICAL], Operator::And),
    reg("or", &[LOGICAL, LOGICAL], Operator::Or),
    reg("xor", &[LOGICAL, LOGICAL], Operator::Xor),
    reg("not", &[LOGICAL], Operator::Not),
    reg("true", &[], Operator::True),
    reg("false", &[], Operator::False),
    reg("bitshift", &[INT, INT], Operator::BitShift),

    // arrays and strings
    reg("array", &[INT], Operator::Array),
    reg("string", &[INT], Operator::String),
    reg("length", &[CONTAINER.union(NAME)], Operator::Length),
    reg("get", &[CONTAINER, ANY], Operator::Get),
    reg("put", &[CONTAINER, ANY, ANY], Operator::Put),
    reg("getinterval", &[SLICEABLE, INT, INT], Operator::GetInterval),
    reg("putinterval", &[SLICEABLE, INT, SLICEABLE], Operator::PutInterval),
    reg("astore", &[ARR], Operator::AStore),
    reg("aload", &[ARR], Operator::ALoad),
    reg("forall", &[CONTAINER, PROC], Operator::ForAll),
    reg("anchorsearch", &[STR, STR], Operator::AnchorSearch),
    reg("search", &[STR, STR], Operator::Search),
    reg("token", &[STR], Operator::Token),

    // dictionaries
    reg("dict", &[INT], Operator::Dict),
    reg("maxlength", &[DICT], Operator::MaxLength),
    reg("begin", &[DICT], Operator::Begin),
    reg("end", &[], Operator::End),
    reg("def", &[ANY, ANY], Operator::Def),
    reg("load", &[ANY], Operator::Load),
    reg("store", &[ANY, ANY], Operator::Store),
    reg("undef", &[DICT, ANY], Operator::Undef),
    reg("known", &[DICT, ANY], Operator::Known),
    reg("where", &[ANY], Operator::Where),
    reg("currentdict", &[], Operator::CurrentDict),
    reg("countdictstack", &[], Operator::CountDictStack),
    reg("dictstack", &[ARR], Operator::DictStack),
    reg("cleardictstack", &[], Operator::ClearDictStack),

    // control
    reg("exec", &[ANY], Operator::Exec),
    reg("if", &[BOOL, PROC], Operator::If),
    reg("ifelse", &[BOOL, PROC, PROC], Operator::IfElse),
    reg("for", &[NUM, NUM, NUM, PROC], Operator::For),
    reg("repeat", &[INT, PROC], Operator::Repeat),
    reg("loop", &[PROC], Operator::Loop),
    reg("exit", &[], Operator::Exit),
    reg("stop", &[], Operator::Stop),
    reg("stopped", &[ANY], Operator::Stopped),
    reg("countexecstack", &[], Operator::CountExecStack),
    reg("execstack", &[ARR], Operator::ExecStack),
    reg("quit", &[], Operator::Quit),
    reg("start", &[], Operator::Start),

    // graphics state
    reg("gsave", &[], Operator::GSave),
    reg("grestore", &[], Operator::GRestore),
    reg("setlinewidth", &[NUM], Operator::SetLineWidth),
    reg("currentlinewidth", &[], Operator::CurrentLineWidth),
    reg("setlinecap", &[INT], Operator::SetLineCap),
    reg("currentlinecap", &[], Operator::CurrentLineCap),
    reg("setlinejoin", &[INT], Operator::SetLineJoin),
    reg("currentlinejoin", &[], Operator::CurrentLineJoin),
    reg("setmiterlimit", &[NUM], Operator::SetMiterLimit),
    reg("currentmiterlimit", &[], Operator::CurrentMiterLimit),
    reg("setdash", &[ARR, NUM], Operator::SetDash),
    reg("currentdash", &[], Operator::CurrentDash),
    reg("setrgbcolor", &[NUM, NUM, NUM], Operator::SetRgbColor),
    reg("currentrgbcolor", &[], Operator::CurrentRgbColor),
    reg("setgray", &[NUM], Operator::SetGray),
    reg("currentgray", &[], Operator::CurrentGray),
    reg("setcolorspace", &[NAME.union(ARR)], Operator::SetColorSpace),

    // coordinate systems
    reg("matrix", &[], Operator::MatrixOp),
    reg("currentmatrix", &[ARR], Operator::CurrentMatrix),
    reg("setmatrix", &[ARR], Operator::SetMatrix),
    reg("translate", &[NUM, NUM, ARR], Operator::TranslateMatrix),
    reg("translate", &[NUM, NUM], Operator::Translate),
    reg("scale", &[NUM, NUM, ARR], Operator::ScaleMatrix),
    reg("scale", &[NUM, NUM], Operator::Scale),
    reg("rotate", &[NUM, ARR], Operator::RotateMatrix),
    reg("rotate", &[NUM], Operator::Rotate),
    reg("concat", &[ARR], Operator::Concat),

    // path construction
    reg("newpath", &[], Operator::NewPath),
    reg("currentpoint", &[], Operator::CurrentPoint),
    reg("moveto", &[NUM, NUM], Operator::MoveTo),
    reg("rmoveto", &[NUM, NUM], Operator::RMoveTo),
    reg("lineto", &[NUM, NUM], Operator::LineTo),
    reg("rlineto", &[NUM, NUM], Operator::RLineTo),
    reg("arc", &[NUM, NUM, NUM, NUM, NUM], Operator::Arc),
    reg("arcn", &[NUM, NUM, NUM, NUM, NUM], Operator::ArcN),
    reg("arct", &[NUM, NUM, NUM, NUM, NUM], Operator::ArcT),
    reg("arcto", &[NUM, NUM, NUM, NUM, NUM], Operator::ArcTo),
    reg("curveto", &[NUM, NUM, NUM, NUM, NUM, NUM], Operator::CurveTo),
    reg("rcurveto", &[NUM, NUM, NUM, NUM, NUM, NUM], Operator::RCurveTo),
    reg("closepath", &[], Operator::ClosePath),
    reg("clip", &[], Operator::Clip),
    reg("eoclip", &[], Operator::EoClip),
    reg("rectclip", &[NUM, NUM, NUM, NUM], Operator::RectClip),

    // painting
    reg("stroke", &[], Operator::Stroke),
    reg("fill", &[], Operator::Fill),
    reg("eofill", &[], Operator::EoFill),
    reg("rectstroke", &[NUM, NUM, NUM, NUM], Operator::RectStroke),
    reg("rectfill", &[NUM, NUM, NUM, NUM], Operator::RectFill),
    reg("show", &[STR], Operator::Show),
    reg("stringwidth", &[STR], Operator::StringWidth),
    reg("charpath", &[STR, BOOL], Operator::CharPath),

    // type, attribute, conversion
    reg("type", &[ANY], Operator::Type),
    reg("cvlit", &[ANY], Operator::CvLit),
    reg("cvx", &[ANY], Operator::Cvx),
    reg("xcheck", &[ANY], Operator::XCheck),
    reg("executeonly", &[ACCESSED], Operator::ExecuteOnly),
    reg("noaccess", &[ACCESSED], Operator::NoAccess),
    reg("readonly", &[ACCESSED], Operator::ReadOnly),
    reg("rcheck", &[ACCESSED], Operator::RCheck),
    reg("wcheck", &[ACCESSED], Operator::WCheck),
    reg("cvi", &[NUM.union(STR)], Operator::Cvi),
    reg("cvn", &[STR], Operator::Cvn),
    reg("cvr", &[NUM.union(STR)], Operator::Cvr),
    reg("cvrs", &[NUM, INT, STR], Operator::Cvrs),
    reg("cvs", &[ANY, STR], Operator::Cvs),

    // files
    reg("currentfile", &[], Operator::CurrentFile),
    reg("filter", &[FILE.union(STR), NAME], Operator::Filter),
    reg("readstring", &[FILE, STR], Operator::ReadString),
    reg("file", &[ANY, ANY], Operator::FileStub),
    reg("read", &[FILE], Operator::FileStub),
    reg("write", &[FILE, INT], Operator::FileStub),
    reg("closefile", &[FILE], Operator::FileStub),
    reg("flushfile", &[FILE], Operator::FileStub),

    // fonts
    reg("findfont", &[KEYED], Operator::FindFont),
    reg("definefont", &[ANY, DICT], Operator::DefineFont),
    reg("scalefont", &[DICT, NUM], Operator::ScaleFont),
    reg("makefont", &[DICT, ARR], Operator::MakeFont),
    reg("selectfont", &[KEYED, NUM.union(ARR)], Operator::SelectFont),
    reg("setfont", &[DICT], Operator::SetFont),

    // miscellaneous
    reg("bind", &[PROC], Operator::Bind),
    reg("save", &[], Operator::Save),
    reg("restore", &[SAVE], Operator::Restore),
    reg("null", &[], Operator::Null),
    reg("=", &[ANY], Operator::DebugPrint),
    reg("==", &[ANY], Operator::DebugPrintFull),
    reg("print", &[STR], Operator::Print),
    reg("stack", &[], Operator::Stack),
    reg("pstack", &[], Operator::PStack),
];

/// All registrations for one surface name, in declaration order
#[derive(Debug)]
pub(crate) struct OperatorSet {
    pub name: &'static str,
    pub defs: Vec<(Signature, Operator)>,
}

/// The operator table the interpreter dispatches through. Built once from
/// [`REGISTRATIONS`]; [`OperatorIndex`] values index into this slice
pub(crate) fn operator_table() -> &'static [OperatorSet] {
    static TABLE: Lazy<Vec<OperatorSet>> = Lazy::new(|| {
        let mut table: Vec<OperatorSet> = Vec::new();

        for registration in REGISTRATIONS {
            match table
                .iter_mut()
                .find(|set| set.name == registration.name)
            {
                Some(set) => set.defs.push((registration.signature, registration.op)),
                None => table.push(OperatorSet {
                    name: registration.name,
                    defs: vec![(registration.signature, registration.op)],
                }),
            }
        }

        table
    });

    &TABLE
}

/// The system dictionary: one entry per registered operator name. The
/// caller inserts the handful of non-operator entries (`systemdict` itself,
/// `errordict`, `FontDirectory`, `StandardEncoding`) before marking it
/// execute-only
pub(crate) fn gen_system_dict() -> PostScriptResult<PostScriptDictionary> {
    let table = operator_table();

    let mut system_dict = PostScriptDictionary::with_capacity(table.len() + 8);

    for (idx, set) in table.iter().enumerate() {
        system_dict.insert(
            DictKey::name(set.name.as_bytes()),
            Object::executable(ObjectKind::Operator(OperatorIndex(idx))),
        )?;
    }

    Ok(system_dict)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn overloads_grouped_in_declaration_order() {
        let table = operator_table();

        let translate = table.iter().find(|set| set.name == "translate").unwrap();

        assert_eq!(translate.defs.len(), 2);
        assert_eq!(translate.defs[0].1, Operator::TranslateMatrix);
        assert_eq!(translate.defs[1].1, Operator::Translate);
    }

    #[test]
    fn no_duplicate_sets() {
        let table = operator_table();

        for (i, set) in table.iter().enumerate() {
            assert!(
                table[i + 1..].iter().all(|other| other.name != set.name),
                "{} appears twice",
                set.name
            );
        }
    }

    #[test]
    fn system_dict_contains_every_name() {
        let dict = gen_system_dict().unwrap();

        for set in operator_table() {
            assert!(dict.contains(&DictKey::name(set.name.as_bytes())));
        }
    }
}
