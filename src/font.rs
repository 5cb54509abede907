use crate::{
    data_structures::Matrix,
    error::{PostScriptError, PostScriptResult},
    object::{
        ArrayIndex, DictKey, DictionaryIndex, Name, Object, ObjectKind, PostScriptArray,
        PostScriptDictionary, Vm,
    },
};

/// Glyph-space units per em for Type 1 style fonts
pub const UNITS_PER_EM: f64 = 1000.0;

/// The advance width, in glyph-space units, assumed for characters when no
/// host metrics are available
pub const FALLBACK_GLYPH_ADVANCE: f64 = 600.0;

/// The resolved font parameters a graphics context needs to measure and
/// paint text
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub name: Vec<u8>,
    pub matrix: Matrix,
}

impl FontInfo {
    /// The nominal point size, recovered from the vertical scale of the font
    /// matrix
    pub fn size(&self) -> f64 {
        self.matrix.d.abs() * UNITS_PER_EM
    }

    /// The user-space advance vector for `text` using fallback metrics
    pub fn fallback_advance(&self, text: &[u8]) -> crate::geometry::Point {
        let glyph_space = crate::geometry::Point::new(
            FALLBACK_GLYPH_ADVANCE * text.len() as f64,
            0.0,
        );

        self.matrix.apply_delta(glyph_space)
    }
}

/// A host-supplied font a registry hands back from `load_font`
#[derive(Debug, Clone)]
pub struct FontDescription {
    pub name: Vec<u8>,
    pub font_type: i32,
}

/// The extension hook consulted by `findfont` after the program-defined
/// `FontDirectory`
pub trait FontHost {
    fn has_font(&self, name: &[u8]) -> bool;

    fn load_font(&self, name: &[u8]) -> Option<FontDescription>;
}

/// Builds a font dictionary carrying the four required entries. Used both
/// for host-registry fonts and for the substitution font `findfont` falls
/// back to
pub(crate) fn make_font_dict(
    vm: &mut Vm,
    name: Name,
    font_type: i32,
) -> PostScriptResult<DictionaryIndex> {
    let matrix = default_font_matrix_array(vm);
    let encoding = standard_encoding_array(vm);

    let mut dict = PostScriptDictionary::with_capacity(8);

    dict.insert(
        DictKey::name(b"FontName"),
        Object::literal(ObjectKind::Name(name)),
    )?;
    dict.insert(
        DictKey::name(b"FontMatrix"),
        Object::literal(ObjectKind::Array(matrix)),
    )?;
    dict.insert(DictKey::name(b"FontType"), Object::int(font_type))?;
    dict.insert(
        DictKey::name(b"Encoding"),
        Object::literal(ObjectKind::Array(encoding)),
    )?;

    Ok(vm.new_dict(dict))
}

/// The default `FontMatrix`, `[0.001 0 0 0.001 0 0]`, as a fresh array
pub(crate) fn default_font_matrix_array(vm: &mut Vm) -> ArrayIndex {
    matrix_to_array(vm, Matrix::scaling(1.0 / UNITS_PER_EM, 1.0 / UNITS_PER_EM))
}

pub(crate) fn matrix_to_array(vm: &mut Vm, matrix: Matrix) -> ArrayIndex {
    let elements = matrix
        .as_array()
        .iter()
        .map(|&n| Object::real(n))
        .collect();

    vm.new_array(PostScriptArray::from_objects(elements))
}

/// Reads a six-element numeric array into a matrix
pub(crate) fn matrix_from_array(vm: &Vm, idx: ArrayIndex) -> PostScriptResult<Matrix> {
    let arr = vm.get_arr(idx);

    if arr.len() != 6 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let mut values = [0.0; 6];

    for (slot, obj) in values.iter_mut().zip(arr.as_slice()) {
        *slot = obj.clone().into_real()?;
    }

    Ok(Matrix::from_array(values))
}

/// Reads the `FontMatrix` out of a font dictionary
pub(crate) fn font_matrix_from_dict(
    vm: &Vm,
    dict: DictionaryIndex,
) -> PostScriptResult<Matrix> {
    match vm.get_dict(dict).get(&DictKey::name(b"FontMatrix")) {
        Some(Object {
            kind: ObjectKind::Array(arr) | ObjectKind::PackedArray(arr),
            ..
        }) => matrix_from_array(vm, *arr),
        Some(..) => anyhow::bail!(PostScriptError::InvalidFont),
        None => anyhow::bail!(PostScriptError::InvalidFont),
    }
}

/// Copies `font` and replaces its `FontMatrix` with `matrix`, as `scalefont`
/// and `makefont` require. The copy is shallow apart from the matrix
pub(crate) fn with_font_matrix(
    vm: &mut Vm,
    font: DictionaryIndex,
    matrix: Matrix,
) -> PostScriptResult<DictionaryIndex> {
    let mut copy = vm.get_dict(font).clone();
    let matrix_arr = matrix_to_array(vm, matrix);

    copy.insert(
        DictKey::name(b"FontMatrix"),
        Object::literal(ObjectKind::Array(matrix_arr)),
    )?;

    Ok(vm.new_dict(copy))
}

/// Resolves the pieces of a font dictionary the graphics context cares
/// about
pub(crate) fn font_info_from_dict(
    vm: &Vm,
    dict: DictionaryIndex,
) -> PostScriptResult<FontInfo> {
    let matrix = font_matrix_from_dict(vm, dict)?;

    let name = match vm.get_dict(dict).get(&DictKey::name(b"FontName")) {
        Some(Object {
            kind: ObjectKind::Name(name),
            ..
        }) => name.as_bytes().to_vec(),
        Some(Object {
            kind: ObjectKind::String(s),
            ..
        }) => vm.get_str(*s).as_bytes().to_vec(),
        _ => Vec::new(),
    };

    Ok(FontInfo { name, matrix })
}

/// Glyph names for the printable ascii range of the standard encoding
/// vector. Codes outside this range map to `.notdef`
const STANDARD_ENCODING_ASCII: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand", "quoteright",
    "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen", "period", "slash", "zero",
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "colon", "semicolon",
    "less", "equal", "greater", "question", "at", "A", "B", "C", "D", "E", "F", "G", "H", "I",
    "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
    "bracketleft", "backslash", "bracketright", "asciicircum", "underscore", "quoteleft", "a",
    "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar", "braceright", "asciitilde",
];

/// The 256-entry `StandardEncoding` vector
pub(crate) fn standard_encoding_array(vm: &mut Vm) -> ArrayIndex {
    let notdef = Name::from_bytes(b".notdef".to_vec());

    let mut elements =
        vec![Object::literal(ObjectKind::Name(notdef)); 256];

    for (offset, glyph) in STANDARD_ENCODING_ASCII.iter().enumerate() {
        elements[0x20 + offset] = Object::literal(ObjectKind::Name(Name::from_bytes(
            glyph.as_bytes().to_vec(),
        )));
    }

    vm.new_array(PostScriptArray::from_objects(elements))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn font_size_from_matrix() {
        let info = FontInfo {
            name: b"Helvetica".to_vec(),
            matrix: Matrix::scaling(0.001, 0.001) * Matrix::scaling(12.0, 12.0),
        };

        assert!((info.size() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn font_dict_round_trip() {
        let mut vm = Vm::new();

        let dict = make_font_dict(&mut vm, Name::from_bytes(b"Times".to_vec()), 1).unwrap();
        let info = font_info_from_dict(&vm, dict).unwrap();

        assert_eq!(info.name, b"Times");
        assert!((info.matrix.a - 0.001).abs() < 1e-12);
    }

    #[test]
    fn standard_encoding_maps_ascii() {
        let mut vm = Vm::new();
        let encoding = standard_encoding_array(&mut vm);
        let arr = vm.get_arr(encoding);

        assert_eq!(arr.len(), 256);

        match &arr.get(b'A' as usize).unwrap().kind {
            ObjectKind::Name(name) => assert_eq!(name.as_bytes(), b"A"),
            _ => panic!("expected name"),
        }

        match &arr.get(0).unwrap().kind {
            ObjectKind::Name(name) => assert_eq!(name.as_bytes(), b".notdef"),
            _ => panic!("expected name"),
        }
    }
}
