//! The in-memory tag tree.
//!
//! A tree is owned top-down: a [`Compound`] owns its named children, a [`List`] owns its anonymous
//! children. There is no sharing and no back reference, so a tree is dropped with its root.

use std::fmt;

use super::NbtError;

/// Type id of a tag, as written in the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
    UShort = 13,
    UInt = 14,
    ULong = 15,
    ShortArray = 16,
    UShortArray = 17,
    UIntArray = 18,
    ULongArray = 19,
}

impl TagKind {
    const ALL: [TagKind; 20] = [
        TagKind::End,
        TagKind::Byte,
        TagKind::Short,
        TagKind::Int,
        TagKind::Long,
        TagKind::Float,
        TagKind::Double,
        TagKind::ByteArray,
        TagKind::String,
        TagKind::List,
        TagKind::Compound,
        TagKind::IntArray,
        TagKind::LongArray,
        TagKind::UShort,
        TagKind::UInt,
        TagKind::ULong,
        TagKind::ShortArray,
        TagKind::UShortArray,
        TagKind::UIntArray,
        TagKind::ULongArray,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// The canonical name, e.g. `TAG_Byte_Array`. Empty lists render with it in SNBT.
    pub fn name(self) -> &'static str {
        match self {
            TagKind::End => "TAG_End",
            TagKind::Byte => "TAG_Byte",
            TagKind::Short => "TAG_Short",
            TagKind::UShort => "TAG_UShort",
            TagKind::Int => "TAG_Int",
            TagKind::UInt => "TAG_UInt",
            TagKind::Long => "TAG_Long",
            TagKind::ULong => "TAG_ULong",
            TagKind::Float => "TAG_Float",
            TagKind::Double => "TAG_Double",
            TagKind::String => "TAG_String",
            TagKind::ByteArray => "TAG_Byte_Array",
            TagKind::ShortArray => "TAG_Short_Array",
            TagKind::UShortArray => "TAG_UShort_Array",
            TagKind::IntArray => "TAG_Int_Array",
            TagKind::UIntArray => "TAG_UInt_Array",
            TagKind::LongArray => "TAG_Long_Array",
            TagKind::ULongArray => "TAG_ULong_Array",
            TagKind::List => "TAG_List",
            TagKind::Compound => "TAG_Compound",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Smallest number of bytes a payload of this kind takes in the binary format.
    ///
    /// Used to reject declared counts that the remaining input cannot possibly hold.
    pub(crate) fn min_payload_size(self) -> usize {
        match self {
            TagKind::End => 0,
            TagKind::Byte => 1,
            TagKind::Short | TagKind::UShort | TagKind::String => 2,
            TagKind::Int | TagKind::UInt | TagKind::Float => 4,
            TagKind::Long | TagKind::ULong | TagKind::Double => 8,
            TagKind::ByteArray
            | TagKind::ShortArray
            | TagKind::UShortArray
            | TagKind::IntArray
            | TagKind::UIntArray
            | TagKind::LongArray
            | TagKind::ULongArray => 4,
            TagKind::List => 5,
            TagKind::Compound => 1,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tag payload. The name lives with the parent (compound key) or in [`NamedTag`] for a root.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    ShortArray(Vec<i16>),
    UShortArray(Vec<u16>),
    IntArray(Vec<i32>),
    UIntArray(Vec<u32>),
    LongArray(Vec<i64>),
    ULongArray(Vec<u64>),
    List(List),
    Compound(Compound),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::Byte(_) => TagKind::Byte,
            Tag::Short(_) => TagKind::Short,
            Tag::UShort(_) => TagKind::UShort,
            Tag::Int(_) => TagKind::Int,
            Tag::UInt(_) => TagKind::UInt,
            Tag::Long(_) => TagKind::Long,
            Tag::ULong(_) => TagKind::ULong,
            Tag::Float(_) => TagKind::Float,
            Tag::Double(_) => TagKind::Double,
            Tag::String(_) => TagKind::String,
            Tag::ByteArray(_) => TagKind::ByteArray,
            Tag::ShortArray(_) => TagKind::ShortArray,
            Tag::UShortArray(_) => TagKind::UShortArray,
            Tag::IntArray(_) => TagKind::IntArray,
            Tag::UIntArray(_) => TagKind::UIntArray,
            Tag::LongArray(_) => TagKind::LongArray,
            Tag::ULongArray(_) => TagKind::ULongArray,
            Tag::List(_) => TagKind::List,
            Tag::Compound(_) => TagKind::Compound,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut Compound> {
        match self {
            Tag::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i8> for Tag {
    fn from(value: i8) -> Self {
        Tag::Byte(value)
    }
}

impl From<i16> for Tag {
    fn from(value: i16) -> Self {
        Tag::Short(value)
    }
}

impl From<u16> for Tag {
    fn from(value: u16) -> Self {
        Tag::UShort(value)
    }
}

impl From<i32> for Tag {
    fn from(value: i32) -> Self {
        Tag::Int(value)
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Tag::UInt(value)
    }
}

impl From<i64> for Tag {
    fn from(value: i64) -> Self {
        Tag::Long(value)
    }
}

impl From<u64> for Tag {
    fn from(value: u64) -> Self {
        Tag::ULong(value)
    }
}

impl From<f32> for Tag {
    fn from(value: f32) -> Self {
        Tag::Float(value)
    }
}

impl From<f64> for Tag {
    fn from(value: f64) -> Self {
        Tag::Double(value)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_string())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::String(value)
    }
}

impl From<List> for Tag {
    fn from(value: List) -> Self {
        Tag::List(value)
    }
}

impl From<Compound> for Tag {
    fn from(value: Compound) -> Self {
        Tag::Compound(value)
    }
}

/// A root tag together with its name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new<N: Into<String>, T: Into<Tag>>(name: N, tag: T) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// A root with an empty name, which is what the SNBT parser produces.
    pub fn unnamed<T: Into<Tag>>(tag: T) -> Self {
        Self::new(String::new(), tag)
    }

    pub fn kind(&self) -> TagKind {
        self.tag.kind()
    }
}

/// Insertion-ordered mapping from names to tags. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: Vec<(String, Tag)>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tag` under `name`. An existing entry with the same name is replaced in place and
    /// returned.
    pub fn insert<N: Into<String>, T: Into<Tag>>(&mut self, name: N, tag: T) -> Option<Tag> {
        let name = name.into();
        let tag = tag.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, tag)),
            None => {
                self.entries.push((name, tag));
                None
            }
        }
    }

    /// Builder flavour of [`Compound::insert`].
    pub fn with<N: Into<String>, T: Into<Tag>>(mut self, name: N, tag: T) -> Self {
        self.insert(name, tag);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tag)| tag)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, tag)| tag)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(key, tag)| (key.as_str(), tag))
    }

    pub fn get_byte(&self, name: &str) -> Option<i8> {
        match self.get(name)? {
            Tag::Byte(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            Tag::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Tag::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_compound(&self, name: &str) -> Option<&Compound> {
        self.get(name)?.as_compound()
    }

    pub fn get_list(&self, name: &str) -> Option<&List> {
        self.get(name)?.as_list()
    }
}

/// A homogeneous sequence of anonymous tags. The element kind is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    element_kind: TagKind,
    items: Vec<Tag>,
}

impl List {
    pub fn new(element_kind: TagKind) -> Self {
        Self {
            element_kind,
            items: Vec::new(),
        }
    }

    /// Builds a list from `items`, checking each one against `element_kind`.
    pub fn from_tags(element_kind: TagKind, items: Vec<Tag>) -> Result<Self, NbtError> {
        let mut list = Self::new(element_kind);
        list.items.reserve(items.len());
        for item in items {
            list.push(item)?;
        }
        Ok(list)
    }

    /// For decoders that already produced every item as `element_kind`.
    pub(crate) fn from_decoded(element_kind: TagKind, items: Vec<Tag>) -> Self {
        debug_assert!(items.iter().all(|item| item.kind() == element_kind));
        Self {
            element_kind,
            items,
        }
    }

    /// Appends `tag`, refusing one whose kind differs from the declared element kind.
    pub fn push<T: Into<Tag>>(&mut self, tag: T) -> Result<(), NbtError> {
        let tag = tag.into();
        if tag.kind() != self.element_kind {
            return Err(NbtError::ListTypeMismatch {
                expected: self.element_kind,
                found: tag.kind(),
            });
        }
        self.items.push(tag);
        Ok(())
    }

    pub fn element_kind(&self) -> TagKind {
        self.element_kind
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ids_roundtrip() {
        for id in 0..20u8 {
            let kind = TagKind::from_id(id).expect("known id");
            assert_eq!(kind.id(), id);
            assert_eq!(TagKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(TagKind::from_id(20), None);
        assert_eq!(TagKind::from_id(0xFF), None);
    }

    #[test]
    fn test_classic_ids_are_kept() {
        assert_eq!(TagKind::Compound.id(), 10);
        assert_eq!(TagKind::List.id(), 9);
        assert_eq!(TagKind::IntArray.id(), 11);
        assert_eq!(TagKind::LongArray.id(), 12);
    }

    #[test]
    fn test_compound_insert_overwrites_in_place() {
        let mut compound = Compound::new();
        compound.insert("a", 1i32);
        compound.insert("b", 2i32);
        let previous = compound.insert("a", "replaced");

        assert_eq!(previous, Some(Tag::Int(1)));
        assert_eq!(compound.len(), 2);
        let keys: Vec<&str> = compound.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(compound.get_str("a"), Some("replaced"));
    }

    #[test]
    fn test_compound_remove_and_getters() {
        let mut compound = Compound::new()
            .with("x", 5i32)
            .with("time", 10i64)
            .with("flag", 1i8);
        assert_eq!(compound.get_int("x"), Some(5));
        assert_eq!(compound.get_long("time"), Some(10));
        assert_eq!(compound.get_byte("flag"), Some(1));
        assert_eq!(compound.get_int("time"), None);

        assert_eq!(compound.remove("x"), Some(Tag::Int(5)));
        assert!(!compound.contains_key("x"));
        assert_eq!(compound.remove("x"), None);
    }

    #[test]
    fn test_list_rejects_other_kind() {
        let mut list = List::new(TagKind::Int);
        list.push(1i32).unwrap();
        let err = list.push("nope").unwrap_err();
        assert!(matches!(
            err,
            NbtError::ListTypeMismatch {
                expected: TagKind::Int,
                found: TagKind::String
            }
        ));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_end_list_holds_nothing() {
        let mut list = List::new(TagKind::End);
        assert!(list.push(0i8).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn test_list_from_tags() {
        let list = List::from_tags(TagKind::Short, vec![Tag::Short(1), Tag::Short(2)]).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1), Some(&Tag::Short(2)));
        assert!(List::from_tags(TagKind::Short, vec![Tag::Int(1)]).is_err());
    }
}
