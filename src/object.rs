use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
};

use crate::{
    error::{PostScriptError, PostScriptResult},
    filter::FileStream,
};

pub type Name = PostScriptString;

/// A tagged PostScript value
///
/// Composite objects (strings, arrays, dictionaries, files) are stored by
/// index into the interpreter's [`Vm`]; copying an `Object` copies the
/// reference, not the container, which gives the language's aliasing
/// semantics (`dup` of an array followed by `put` is visible through both
/// references)
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub kind: ObjectKind,

    /// Executable objects are looked up and invoked by the interpreter;
    /// literal objects push themselves
    pub executable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Null,
    Bool(bool),
    Int(i32),
    Real(f64),
    Name(Name),
    String(StringIndex),
    Array(ArrayIndex),
    PackedArray(ArrayIndex),
    Dictionary(DictionaryIndex),
    Operator(OperatorIndex),
    File(FileIndex),
    Mark,
    FontId(u32),
    GState(u32),
    Save(u32),
}

impl Object {
    pub fn literal(kind: ObjectKind) -> Self {
        Self {
            kind,
            executable: false,
        }
    }

    pub fn executable(kind: ObjectKind) -> Self {
        Self {
            kind,
            executable: true,
        }
    }

    pub fn int(n: i32) -> Self {
        Self::literal(ObjectKind::Int(n))
    }

    pub fn real(n: f64) -> Self {
        Self::literal(ObjectKind::Real(n))
    }

    pub fn bool(b: bool) -> Self {
        Self::literal(ObjectKind::Bool(b))
    }

    pub fn is_int(&self) -> bool {
        matches!(self.kind, ObjectKind::Int(..))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind, ObjectKind::Int(..) | ObjectKind::Real(..))
    }

    pub fn is_mark(&self) -> bool {
        matches!(self.kind, ObjectKind::Mark)
    }

    pub fn into_int(self) -> PostScriptResult<i32> {
        match self.kind {
            ObjectKind::Int(n) => Ok(n),
            ObjectKind::Real(f) => Ok(f.round() as i32),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub fn into_real(self) -> PostScriptResult<f64> {
        match self.kind {
            ObjectKind::Int(n) => Ok(f64::from(n)),
            ObjectKind::Real(f) => Ok(f),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// The single-bit [`TypeSet`] of this object's type tag
    pub fn type_set(&self) -> TypeSet {
        match self.kind {
            ObjectKind::Null => TypeSet::NULL,
            ObjectKind::Bool(..) => TypeSet::BOOL,
            ObjectKind::Int(..) => TypeSet::INT,
            ObjectKind::Real(..) => TypeSet::REAL,
            ObjectKind::Name(..) => TypeSet::NAME,
            ObjectKind::String(..) => TypeSet::STRING,
            ObjectKind::Array(..) => TypeSet::ARRAY,
            ObjectKind::PackedArray(..) => TypeSet::PACKED_ARRAY,
            ObjectKind::Dictionary(..) => TypeSet::DICTIONARY,
            ObjectKind::Operator(..) => TypeSet::OPERATOR,
            ObjectKind::File(..) => TypeSet::FILE,
            ObjectKind::Mark => TypeSet::MARK,
            ObjectKind::FontId(..) => TypeSet::FONT_ID,
            ObjectKind::GState(..) => TypeSet::GSTATE,
            ObjectKind::Save(..) => TypeSet::SAVE,
        }
    }

    /// The name pushed by the `type` operator
    pub fn type_name(&self) -> &'static [u8] {
        match self.kind {
            ObjectKind::Null => b"nulltype",
            ObjectKind::Bool(..) => b"booleantype",
            ObjectKind::Int(..) => b"integertype",
            ObjectKind::Real(..) => b"realtype",
            ObjectKind::Name(..) => b"nametype",
            ObjectKind::String(..) => b"stringtype",
            ObjectKind::Array(..) => b"arraytype",
            ObjectKind::PackedArray(..) => b"packedarraytype",
            ObjectKind::Dictionary(..) => b"dicttype",
            ObjectKind::Operator(..) => b"operatortype",
            ObjectKind::File(..) => b"filetype",
            ObjectKind::Mark => b"marktype",
            ObjectKind::FontId(..) => b"fonttype",
            ObjectKind::GState(..) => b"gstatetype",
            ObjectKind::Save(..) => b"savetype",
        }
    }
}

/// A union of object type tags, used to declare operator signatures
///
/// Each type is assigned a distinct bit so that a signature position can
/// accept several types at once, e.g. `TypeSet::NUMBER` for operators that
/// take either an integer or a real
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSet(u16);

impl TypeSet {
    pub const NULL: TypeSet = TypeSet(1 << 0);
    pub const BOOL: TypeSet = TypeSet(1 << 1);
    pub const INT: TypeSet = TypeSet(1 << 2);
    pub const REAL: TypeSet = TypeSet(1 << 3);
    pub const NAME: TypeSet = TypeSet(1 << 4);
    pub const STRING: TypeSet = TypeSet(1 << 5);
    pub const ARRAY: TypeSet = TypeSet(1 << 6);
    pub const PACKED_ARRAY: TypeSet = TypeSet(1 << 7);
    pub const DICTIONARY: TypeSet = TypeSet(1 << 8);
    pub const OPERATOR: TypeSet = TypeSet(1 << 9);
    pub const FILE: TypeSet = TypeSet(1 << 10);
    pub const MARK: TypeSet = TypeSet(1 << 11);
    pub const FONT_ID: TypeSet = TypeSet(1 << 12);
    pub const GSTATE: TypeSet = TypeSet(1 << 13);
    pub const SAVE: TypeSet = TypeSet(1 << 14);

    pub const ANY: TypeSet = TypeSet(u16::MAX);

    pub const NUMBER: TypeSet = TypeSet::INT.union(TypeSet::REAL);
    pub const ANY_ARRAY: TypeSet = TypeSet::ARRAY.union(TypeSet::PACKED_ARRAY);
    pub const COMPOSITE: TypeSet = TypeSet::STRING
        .union(TypeSet::ANY_ARRAY)
        .union(TypeSet::DICTIONARY);

    pub const fn union(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    pub fn intersects(self, other: TypeSet) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for TypeSet {
    type Output = TypeSet;

    fn bitor(self, rhs: TypeSet) -> TypeSet {
        self.union(rhs)
    }
}

/// An operator signature: one [`TypeSet`] per declared argument, listed
/// bottom-to-top so the last element describes the top of the operand stack
pub type Signature = &'static [TypeSet];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Normally, objects have unlimited access: all operations defined for
    /// that object are allowed
    #[default]
    Unlimited,

    /// An object with read-only access may not have its value written, but
    /// may still be read or executed
    ReadOnly,

    /// An object with execute-only access may not have its value either read
    /// or written, but may still be executed
    ExecuteOnly,

    /// An object with no access may not be operated on in any way by a
    /// program
    None,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Access::Unlimited | Access::ReadOnly)
    }

    pub fn writable(self) -> bool {
        matches!(self, Access::Unlimited)
    }

    /// Access attributes may only ever be downgraded, never restored
    pub fn is_at_most(self, other: Access) -> bool {
        fn rank(access: Access) -> u8 {
            match access {
                Access::Unlimited => 3,
                Access::ReadOnly => 2,
                Access::ExecuteOnly => 1,
                Access::None => 0,
            }
        }

        rank(self) <= rank(other)
    }
}

#[derive(Clone, Default)]
pub struct PostScriptString {
    inner: Vec<u8>,
    access: Access,
}

impl PostScriptString {
    /// A string of `capacity` NUL bytes, as created by the `string` operator
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: vec![0; capacity],
            access: Access::default(),
        }
    }

    pub fn from_bytes(inner: Vec<u8>) -> Self {
        Self {
            inner,
            access: Access::default(),
        }
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn put(&mut self, idx: usize, byte: u8) -> PostScriptResult<()> {
        match self.inner.get_mut(idx) {
            Some(b) => {
                *b = byte;
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::RangeCheck),
        }
    }

    pub fn get(&self, idx: usize) -> PostScriptResult<u8> {
        self.inner
            .get(idx)
            .copied()
            .ok_or(anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    /// `0 <= index <= index + count <= len`, otherwise rangecheck
    pub fn substring(&self, index: usize, count: usize) -> PostScriptResult<&[u8]> {
        self.inner
            .get(index..index.saturating_add(count))
            .ok_or(anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    /// Overwrites `source` starting at `index`. Writing exactly up to the end
    /// of the string is permitted; extending past it is a rangecheck
    pub fn write_at(&mut self, index: usize, source: &[u8]) -> PostScriptResult<()> {
        match self.inner.get_mut(index..index.saturating_add(source.len())) {
            Some(dst) => {
                dst.copy_from_slice(source);
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::RangeCheck),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }

    /// Byte offset of the first occurrence of `needle`, if any
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }

        self.inner
            .windows(needle.len())
            .position(|window| window == needle)
    }
}

impl PartialEq for PostScriptString {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq(&other.inner)
    }
}

impl Eq for PostScriptString {}

impl PartialOrd for PostScriptString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PostScriptString {
    /// Byte-lexicographic, per the string relational operators
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl Hash for PostScriptString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Debug for PostScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.inner))
    }
}

#[derive(Clone, Debug)]
pub struct PostScriptArray {
    inner: Vec<Object>,
    access: Access,
}

impl PostScriptArray {
    pub fn new(len: usize) -> Self {
        Self::from_objects(vec![Object::literal(ObjectKind::Null); len])
    }

    pub fn from_objects(inner: Vec<Object>) -> Self {
        Self {
            inner,
            access: Access::default(),
        }
    }

    pub fn put(&mut self, idx: usize, obj: Object) -> PostScriptResult<()> {
        match self.inner.get_mut(idx) {
            Some(slot) => {
                *slot = obj;
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::RangeCheck),
        }
    }

    pub fn get(&self, idx: usize) -> PostScriptResult<&Object> {
        self.inner
            .get(idx)
            .ok_or(anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    pub fn interval(&self, index: usize, count: usize) -> PostScriptResult<&[Object]> {
        self.inner
            .get(index..index.saturating_add(count))
            .ok_or(anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    pub fn write_at(&mut self, index: usize, source: &[Object]) -> PostScriptResult<()> {
        match self.inner.get_mut(index..index.saturating_add(source.len())) {
            Some(dst) => {
                dst.clone_from_slice(source);
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::RangeCheck),
        }
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn as_slice(&self) -> &[Object] {
        &self.inner
    }

    pub fn as_mut_slice(&mut self) -> &mut [Object] {
        &mut self.inner
    }

    pub fn into_inner(self) -> Vec<Object> {
        self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A dictionary key. Names and integers hash directly; string keys are
/// converted to names at the call site, mirroring how the language treats
/// string and name keys interchangeably
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Name(Name),
    Integer(i32),
}

impl DictKey {
    pub fn name(bytes: &[u8]) -> Self {
        Self::Name(Name::from_bytes(bytes.to_vec()))
    }

    /// The object pushed for this key during dictionary enumeration
    pub fn to_object(&self) -> Object {
        match self {
            DictKey::Name(name) => Object::literal(ObjectKind::Name(name.clone())),
            DictKey::Integer(n) => Object::int(*n),
        }
    }
}

/// A capacity-bounded mapping preserving insertion order for enumeration
#[derive(Debug, Clone)]
pub struct PostScriptDictionary {
    entries: HashMap<DictKey, Object>,
    order: Vec<DictKey>,
    access: Access,
    capacity: usize,
}

impl PostScriptDictionary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: Vec::new(),
            access: Access::default(),
            capacity,
        }
    }

    pub fn insert(&mut self, key: DictKey, value: Object) -> PostScriptResult<()> {
        if !self.entries.contains_key(&key) {
            if self.entries.len() >= self.capacity {
                anyhow::bail!(PostScriptError::DictFull);
            }

            self.order.push(key.clone());
        }

        self.entries.insert(key, value);

        Ok(())
    }

    pub fn get(&self, key: &DictKey) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &DictKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &DictKey) -> Option<Object> {
        let removed = self.entries.remove(key);

        if removed.is_some() {
            self.order.retain(|k| k != key);
        }

        removed
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&DictKey, &Object)> {
        self.order.iter().map(|key| (key, &self.entries[key]))
    }

    pub fn keys(&self) -> &[DictKey] {
        &self.order
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

pub trait Increment: fmt::Debug + Eq + Hash + Copy {
    /// Initial value
    fn init() -> Self;

    /// Increments self by 1. Returns previous value
    fn increment(&mut self) -> Self;
}

macro_rules! index {
    ($name:ident) => {
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub struct $name(pub usize);

        impl Increment for $name {
            fn init() -> Self {
                Self(0)
            }

            fn increment(&mut self) -> Self {
                let prev = self.0;

                self.0 += 1;

                Self(prev)
            }
        }
    };
}

index!(ArrayIndex);
index!(StringIndex);
index!(DictionaryIndex);
index!(FileIndex);

/// Index into the static operator table; see `builtin::operator_table`
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct OperatorIndex(pub usize);

#[derive(Debug)]
pub struct Container<K: Increment, V> {
    map: HashMap<K, V>,
    counter: K,
}

impl<K: Increment, V> Container<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            counter: K::init(),
        }
    }

    pub fn insert(&mut self, v: V) -> K {
        let idx = self.counter.increment();

        self.map.insert(idx, v);

        idx
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.map.get(k)
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        self.map.get_mut(k)
    }
}

impl<K: Increment, V> Default for Container<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage for composite objects
///
/// Objects on the stacks hold indices into these containers rather than the
/// containers themselves, so that multiple values may share one container
/// identity
#[derive(Debug, Default)]
pub struct Vm {
    pub arrays: Container<ArrayIndex, PostScriptArray>,
    pub strings: Container<StringIndex, PostScriptString>,
    pub dictionaries: Container<DictionaryIndex, PostScriptDictionary>,
    pub files: Container<FileIndex, FileStream>,
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_array(&mut self, arr: PostScriptArray) -> ArrayIndex {
        self.arrays.insert(arr)
    }

    pub fn new_string(&mut self, s: PostScriptString) -> StringIndex {
        self.strings.insert(s)
    }

    pub fn new_dict(&mut self, dict: PostScriptDictionary) -> DictionaryIndex {
        self.dictionaries.insert(dict)
    }

    pub fn new_file(&mut self, file: FileStream) -> FileIndex {
        self.files.insert(file)
    }

    pub fn get_arr(&self, k: ArrayIndex) -> &PostScriptArray {
        self.arrays.get(&k).unwrap()
    }

    pub fn get_arr_mut(&mut self, k: ArrayIndex) -> &mut PostScriptArray {
        self.arrays.get_mut(&k).unwrap()
    }

    pub fn get_str(&self, k: StringIndex) -> &PostScriptString {
        self.strings.get(&k).unwrap()
    }

    pub fn get_str_mut(&mut self, k: StringIndex) -> &mut PostScriptString {
        self.strings.get_mut(&k).unwrap()
    }

    pub fn get_dict(&self, k: DictionaryIndex) -> &PostScriptDictionary {
        self.dictionaries.get(&k).unwrap()
    }

    pub fn get_dict_mut(&mut self, k: DictionaryIndex) -> &mut PostScriptDictionary {
        self.dictionaries.get_mut(&k).unwrap()
    }

    pub fn get_file_mut(&mut self, k: FileIndex) -> &mut FileStream {
        self.files.get_mut(&k).unwrap()
    }

    /// Interns a string and wraps it in a literal object
    pub fn intern_string(&mut self, s: PostScriptString) -> Object {
        Object::literal(ObjectKind::String(self.new_string(s)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dictionary_preserves_insertion_order() {
        let mut dict = PostScriptDictionary::with_capacity(8);

        dict.insert(DictKey::name(b"zeta"), Object::int(0)).unwrap();
        dict.insert(DictKey::name(b"alpha"), Object::int(1)).unwrap();
        dict.insert(DictKey::name(b"mu"), Object::int(2)).unwrap();

        let keys: Vec<_> = dict.entries().map(|(k, _)| k.clone()).collect();

        assert_eq!(
            keys,
            vec![
                DictKey::name(b"zeta"),
                DictKey::name(b"alpha"),
                DictKey::name(b"mu")
            ]
        );
    }

    #[test]
    fn dictionary_capacity_enforced() {
        let mut dict = PostScriptDictionary::with_capacity(1);

        dict.insert(DictKey::name(b"a"), Object::int(0)).unwrap();

        // replacing an existing key never overflows
        dict.insert(DictKey::name(b"a"), Object::int(1)).unwrap();

        assert!(dict.insert(DictKey::name(b"b"), Object::int(2)).is_err());
    }

    #[test]
    fn string_write_at_end_boundary() {
        let mut s = PostScriptString::with_capacity(4);

        // index + source.len() == len is allowed
        s.write_at(2, b"ab").unwrap();
        assert_eq!(s.as_bytes(), b"\0\0ab");

        // one past is not
        assert!(s.write_at(3, b"ab").is_err());
    }

    #[test]
    fn typeset_unions() {
        assert!(TypeSet::NUMBER.intersects(TypeSet::INT));
        assert!(TypeSet::NUMBER.intersects(TypeSet::REAL));
        assert!(!TypeSet::NUMBER.intersects(TypeSet::STRING));
        assert!(TypeSet::ANY.intersects(TypeSet::MARK));
    }
}
