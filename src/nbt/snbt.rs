//! SNBT, the text form of a tag tree.
//!
//! | kind    | text      | kind    | text       |
//! |---------|-----------|---------|------------|
//! | Byte    | `1b`      | UInt    | `1u`       |
//! | Short   | `1s`      | Long    | `1L`       |
//! | UShort  | `1us`     | ULong   | `1uL`      |
//! | Int     | `1`       | Float   | `1.5f`     |
//! | String  | `"a\"b"`  | Double  | `1.5d`     |
//!
//! Arrays are written `[B; 1, 2]` (markers `B S US I UI L UL`), compounds `{"key": value}`, lists
//! `[v1, v2]`, and an empty list names its element kind: `[TAG_Int;]`. The root name is not part
//! of the text. A NaN is written `NaNf`/`NaNd` whatever its sign and payload; the binary encoder
//! canonicalizes NaN the same way.

use std::fmt::{self, Write};
use std::str::FromStr;

use thiserror::Error;

use super::{Compound, List, NamedTag, Tag, TagKind};
use crate::consts::nbt::MAX_DEPTH;

/// Renders `tag` as SNBT.
pub fn to_snbt(tag: &Tag) -> String {
    tag.to_string()
}

/// Parses SNBT text into a tag. The whole input must be one value, surrounded by optional
/// whitespace.
pub fn parse(text: &str) -> Result<Tag, ParseError> {
    let mut parser = Parser::new(text);
    parser.skip_whitespace();
    let tag = parser.parse_value()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(parser.error(ParseReason::TrailingCharacters(c)));
    }
    Ok(tag)
}

/// Parses SNBT text and names the resulting root `name`.
pub fn parse_named<N: Into<String>>(text: &str, name: N) -> Result<NamedTag, ParseError> {
    Ok(NamedTag::new(name, parse(text)?))
}

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum ParseReason {
    UnexpectedEnd(&'static str),
    Expected { expected: &'static str, found: char },
    UnterminatedString,
    InvalidEscape(char),
    InvalidNumber(String),
    UnknownArrayType(String),
    UnknownListType(String),
    MixedList { expected: TagKind, found: TagKind },
    TrailingCharacters(char),
    TooDeep,
}

impl fmt::Display for ParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseReason::UnexpectedEnd(expected) => {
                write!(f, "Unexpected end of input, expected {expected}")
            }
            ParseReason::Expected { expected, found } => {
                write!(f, "Expected {expected}, found {found:?}")
            }
            ParseReason::UnterminatedString => write!(f, "Unterminated string"),
            ParseReason::InvalidEscape(c) => write!(f, "Invalid escape sequence \\{c}"),
            ParseReason::InvalidNumber(token) => write!(f, "Invalid numeric literal {token:?}"),
            ParseReason::UnknownArrayType(marker) => write!(f, "Unknown array type {marker:?}"),
            ParseReason::UnknownListType(name) => write!(f, "Unknown list type {name:?}"),
            ParseReason::MixedList { expected, found } => {
                write!(f, "List of {expected} cannot hold a {found}")
            }
            ParseReason::TrailingCharacters(c) => {
                write!(f, "Trailing characters starting with {c:?}")
            }
            ParseReason::TooDeep => write!(f, "Nesting too deep"),
        }
    }
}

/// A grammar violation at byte offset `position` of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("SNBT parse error at position {position}: {reason}")]
pub struct ParseError {
    pub position: usize,
    pub reason: ParseReason,
}

// ---- serializer ----

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tag(f, self)
    }
}

impl fmt::Display for NamedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tag(f, &self.tag)
    }
}

impl FromStr for Tag {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse(text)
    }
}

fn write_tag<W: Write>(out: &mut W, tag: &Tag) -> fmt::Result {
    match tag {
        Tag::Byte(value) => write!(out, "{value}b"),
        Tag::Short(value) => write!(out, "{value}s"),
        Tag::UShort(value) => write!(out, "{value}us"),
        Tag::Int(value) => write!(out, "{value}"),
        Tag::UInt(value) => write!(out, "{value}u"),
        Tag::Long(value) => write!(out, "{value}L"),
        Tag::ULong(value) => write!(out, "{value}uL"),
        Tag::Float(value) => write!(out, "{value}f"),
        Tag::Double(value) => write!(out, "{value}d"),
        Tag::String(value) => write_quoted(out, value),
        Tag::ByteArray(values) => write_array(out, "B", values),
        Tag::ShortArray(values) => write_array(out, "S", values),
        Tag::UShortArray(values) => write_array(out, "US", values),
        Tag::IntArray(values) => write_array(out, "I", values),
        Tag::UIntArray(values) => write_array(out, "UI", values),
        Tag::LongArray(values) => write_array(out, "L", values),
        Tag::ULongArray(values) => write_array(out, "UL", values),
        Tag::List(list) => write_list(out, list),
        Tag::Compound(compound) => write_compound(out, compound),
    }
}

fn write_quoted<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    out.write_char('"')
}

fn write_array<W: Write, T: fmt::Display>(out: &mut W, marker: &str, values: &[T]) -> fmt::Result {
    write!(out, "[{marker}; ")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{value}")?;
    }
    out.write_char(']')
}

fn write_list<W: Write>(out: &mut W, list: &List) -> fmt::Result {
    if list.is_empty() {
        return write!(out, "[{};]", list.element_kind().name());
    }
    out.write_char('[')?;
    for (i, item) in list.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_tag(out, item)?;
    }
    out.write_char(']')
}

fn write_compound<W: Write>(out: &mut W, compound: &Compound) -> fmt::Result {
    out.write_char('{')?;
    for (i, (name, tag)) in compound.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_quoted(out, name)?;
        out.write_str(": ")?;
        write_tag(out, tag)?;
    }
    out.write_char('}')
}

// ---- parser ----

/// Number suffixes, longest first so that `us` wins over `s` and `uL` over `L`.
const SUFFIXES: [(&str, TagKind); 8] = [
    ("uL", TagKind::ULong),
    ("us", TagKind::UShort),
    ("u", TagKind::UInt),
    ("b", TagKind::Byte),
    ("s", TagKind::Short),
    ("L", TagKind::Long),
    ("f", TagKind::Float),
    ("d", TagKind::Double),
];

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\n' | '\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn error(&self, reason: ParseReason) -> ParseError {
        self.error_at(self.pos, reason)
    }

    fn error_at(&self, position: usize, reason: ParseReason) -> ParseError {
        ParseError { position, reason }
    }

    /// Consumes `expected` or fails, describing what was there instead.
    fn expect(&mut self, expected: char, description: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(self.error(ParseReason::Expected {
                expected: description,
                found,
            })),
            None => Err(self.error(ParseReason::UnexpectedEnd(description))),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(ParseReason::TooDeep));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_value(&mut self) -> Result<Tag, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error(ParseReason::UnexpectedEnd("a value"))),
            Some('{') => Ok(Tag::Compound(self.parse_compound()?)),
            Some('[') => self.parse_bracket(),
            Some('"') => Ok(Tag::String(self.parse_string()?)),
            Some(_) => self.parse_number(),
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, ParseError> {
        self.expect('{', "'{'")?;
        self.enter()?;
        let mut compound = Compound::new();

        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.pos += 1;
            self.leave();
            return Ok(compound);
        }

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('"') => {}
                Some(found) => {
                    return Err(self.error(ParseReason::Expected {
                        expected: "a quoted key",
                        found,
                    }))
                }
                None => return Err(self.error(ParseReason::UnexpectedEnd("a quoted key"))),
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            self.expect(':', "':'")?;
            let value = self.parse_value()?;
            compound.insert(key, value);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                Some(found) => {
                    self.pos -= found.len_utf8();
                    return Err(self.error(ParseReason::Expected {
                        expected: "',' or '}'",
                        found,
                    }));
                }
                None => return Err(self.error(ParseReason::UnexpectedEnd("'}'"))),
            }
        }

        self.leave();
        Ok(compound)
    }

    /// `[` starts a typed array (`[B; ...]`), an empty typed list (`[TAG_Int;]`) or a plain list.
    /// Only lists count toward the nesting depth, arrays are leaves like in the binary form.
    fn parse_bracket(&mut self) -> Result<Tag, ParseError> {
        self.expect('[', "'['")?;
        self.skip_whitespace();

        if let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                let start = self.pos;
                let marker = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                self.skip_whitespace();
                if self.peek() == Some(';') {
                    self.pos += 1;
                    return self.parse_typed(marker, start);
                }
                // Not a marker after all, e.g. a list starting with `NaNf`.
                self.pos = start;
            }
        }

        self.enter()?;
        let list = self.parse_list_items()?;
        self.leave();
        Ok(Tag::List(list))
    }

    fn parse_typed(&mut self, marker: &str, start: usize) -> Result<Tag, ParseError> {
        if marker.starts_with("TAG_") {
            let kind = TagKind::from_name(marker).ok_or_else(|| {
                self.error_at(start, ParseReason::UnknownListType(marker.to_string()))
            })?;
            self.enter()?;
            self.skip_whitespace();
            self.expect(']', "']'")?;
            self.leave();
            return Ok(Tag::List(List::new(kind)));
        }

        let tag = match marker {
            "B" => Tag::ByteArray(self.parse_array_items("b")?),
            "S" => Tag::ShortArray(self.parse_array_items("s")?),
            "US" => Tag::UShortArray(self.parse_array_items("us")?),
            "I" => Tag::IntArray(self.parse_array_items("")?),
            "UI" => Tag::UIntArray(self.parse_array_items("u")?),
            "L" => Tag::LongArray(self.parse_array_items("L")?),
            "UL" => Tag::ULongArray(self.parse_array_items("uL")?),
            _ => {
                return Err(
                    self.error_at(start, ParseReason::UnknownArrayType(marker.to_string()))
                )
            }
        };
        Ok(tag)
    }

    /// Elements of a typed array, after the `;`. Each element is a bare number or carries the
    /// element kind's own suffix.
    fn parse_array_items<T: FromStr>(&mut self, suffix: &str) -> Result<Vec<T>, ParseError> {
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(values);
        }

        loop {
            self.skip_whitespace();
            let start = self.pos;
            let token = self.take_number_token();
            if token.is_empty() {
                return Err(match self.peek() {
                    Some(found) => self.error(ParseReason::Expected {
                        expected: "a number",
                        found,
                    }),
                    None => self.error(ParseReason::UnexpectedEnd("a number")),
                });
            }
            let digits = if suffix.is_empty() {
                token
            } else {
                token.strip_suffix(suffix).unwrap_or(token)
            };
            let value = digits.parse::<T>().map_err(|_| {
                self.error_at(start, ParseReason::InvalidNumber(token.to_string()))
            })?;
            values.push(value);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(values),
                Some(found) => {
                    self.pos -= found.len_utf8();
                    return Err(self.error(ParseReason::Expected {
                        expected: "',' or ']'",
                        found,
                    }));
                }
                None => return Err(self.error(ParseReason::UnexpectedEnd("']'"))),
            }
        }
    }

    /// Items of a plain list. The first item fixes the element kind.
    fn parse_list_items(&mut self) -> Result<List, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(List::new(TagKind::End));
        }

        let mut list: Option<List> = None;
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let item = self.parse_value()?;
            let list = list.get_or_insert_with(|| List::new(item.kind()));
            let expected = list.element_kind();
            let found = item.kind();
            if list.push(item).is_err() {
                return Err(self.error_at(start, ParseReason::MixedList { expected, found }));
            }

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                Some(found) => {
                    self.pos -= found.len_utf8();
                    return Err(self.error(ParseReason::Expected {
                        expected: "',' or ']'",
                        found,
                    }));
                }
                None => return Err(self.error(ParseReason::UnexpectedEnd("']'"))),
            }
        }

        Ok(list.unwrap_or_else(|| List::new(TagKind::End)))
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect('"', "'\"'")?;

        let text = self.text;
        let body = self.pos;
        let mut value = String::new();
        let mut chars = text[body..].char_indices();
        loop {
            match chars.next() {
                None => return Err(self.error_at(start, ParseReason::UnterminatedString)),
                Some((i, '"')) => {
                    self.pos = body + i + 1;
                    return Ok(value);
                }
                Some((i, '\\')) => match chars.next() {
                    Some((_, c @ ('"' | '\\'))) => value.push(c),
                    Some((_, c)) => {
                        return Err(self.error_at(body + i, ParseReason::InvalidEscape(c)))
                    }
                    None => return Err(self.error_at(start, ParseReason::UnterminatedString)),
                },
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Tag, ParseError> {
        let start = self.pos;
        let token = self.take_number_token();
        if token.is_empty() {
            let found = self.peek().unwrap_or_default();
            return Err(self.error(ParseReason::Expected {
                expected: "a value",
                found,
            }));
        }
        number_to_tag(token)
            .ok_or_else(|| self.error_at(start, ParseReason::InvalidNumber(token.to_string())))
    }

    fn take_number_token(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let text = self.text;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &text[start..self.pos]
    }
}

/// Turns a literal such as `12us` or `-1.5` into its tag, or `None` if it is not a valid number.
fn number_to_tag(token: &str) -> Option<Tag> {
    let (digits, kind) = SUFFIXES
        .iter()
        .find_map(|(suffix, kind)| token.strip_suffix(suffix).map(|digits| (digits, *kind)))
        .unwrap_or_else(|| {
            if token.contains('.') {
                (token, TagKind::Double)
            } else {
                (token, TagKind::Int)
            }
        });
    if digits.is_empty() {
        return None;
    }

    let tag = match kind {
        TagKind::Byte => Tag::Byte(digits.parse().ok()?),
        TagKind::Short => Tag::Short(digits.parse().ok()?),
        TagKind::UShort => Tag::UShort(digits.parse().ok()?),
        TagKind::Int => Tag::Int(digits.parse().ok()?),
        TagKind::UInt => Tag::UInt(digits.parse().ok()?),
        TagKind::Long => Tag::Long(digits.parse().ok()?),
        TagKind::ULong => Tag::ULong(digits.parse().ok()?),
        TagKind::Float => Tag::Float(digits.parse().ok()?),
        TagKind::Double => Tag::Double(digits.parse().ok()?),
        _ => return None,
    };
    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::binary::encode;
    use rand::Rng;

    fn assert_rejects(text: &str) {
        match parse(text) {
            Ok(tag) => panic!("Expected error for {text:?}, but got {tag:?}"),
            Err(e) => assert!(!e.to_string().is_empty()),
        }
    }

    fn random_tag(rng: &mut impl Rng, depth: usize) -> Tag {
        let upper = if depth >= 3 { 17 } else { 19 };
        match rng.gen_range(0..upper) {
            0 => Tag::Byte(rng.gen()),
            1 => Tag::Short(rng.gen()),
            2 => Tag::UShort(rng.gen()),
            3 => Tag::Int(rng.gen()),
            4 => Tag::UInt(rng.gen()),
            5 => Tag::Long(rng.gen()),
            6 => Tag::ULong(rng.gen()),
            7 => Tag::Float(rng.gen_range(-1.0e6f32..1.0e6)),
            8 => Tag::Double(rng.gen_range(-1.0e12f64..1.0e12)),
            9 => {
                let length = rng.gen_range(0..12);
                let text: String = (0..length)
                    .map(|_| *['a', 'Z', '"', '\\', ' ', 'é', '\n', '1'].get(rng.gen_range(0..8)).unwrap())
                    .collect();
                Tag::String(text)
            }
            10 => Tag::ByteArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            11 => Tag::ShortArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            12 => Tag::UShortArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            13 => Tag::IntArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            14 => Tag::UIntArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            15 => Tag::LongArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            16 => Tag::ULongArray((0..rng.gen_range(0..5)).map(|_| rng.gen()).collect()),
            17 => {
                let first = random_tag(rng, depth + 1);
                let mut list = List::new(first.kind());
                let length = rng.gen_range(0..4);
                if length > 0 {
                    list.push(first.clone()).unwrap();
                    for _ in 1..length {
                        // Retry until the generator yields the same kind.
                        loop {
                            let item = random_tag(rng, depth + 1);
                            if item.kind() == first.kind() {
                                list.push(item).unwrap();
                                break;
                            }
                        }
                    }
                }
                Tag::List(list)
            }
            _ => {
                let mut compound = Compound::new();
                for i in 0..rng.gen_range(0..4) {
                    compound.insert(format!("key \"{i}\""), random_tag(rng, depth + 1));
                }
                Tag::Compound(compound)
            }
        }
    }

    #[test]
    fn test_literal_examples() {
        assert_eq!(to_snbt(&Tag::Byte(127)), "127b");
        assert_eq!(to_snbt(&Tag::UShort(65535)), "65535us");
        assert_eq!(to_snbt(&Tag::ByteArray(vec![])), "[B; ]");
        assert_eq!(to_snbt(&Tag::List(List::new(TagKind::Byte))), "[TAG_Byte;]");
        assert_eq!(
            to_snbt(&Tag::String("Quote: \"test\"".to_string())),
            r#""Quote: \"test\"""#
        );
    }

    #[test]
    fn test_primitive_suffixes() {
        assert_eq!(to_snbt(&Tag::Short(-3)), "-3s");
        assert_eq!(to_snbt(&Tag::Int(42)), "42");
        assert_eq!(to_snbt(&Tag::UInt(7)), "7u");
        assert_eq!(to_snbt(&Tag::Long(-9)), "-9L");
        assert_eq!(to_snbt(&Tag::ULong(u64::MAX)), "18446744073709551615uL");
        assert_eq!(to_snbt(&Tag::Float(1.5)), "1.5f");
        assert_eq!(to_snbt(&Tag::Double(2.0)), "2d");
    }

    #[test]
    fn test_arrays_and_containers() {
        assert_eq!(to_snbt(&Tag::IntArray(vec![1, -2, 3])), "[I; 1, -2, 3]");
        assert_eq!(to_snbt(&Tag::ULongArray(vec![5])), "[UL; 5]");
        assert_eq!(to_snbt(&Tag::List(List::new(TagKind::Compound))), "[TAG_Compound;]");

        let mut list = List::new(TagKind::String);
        list.push("a").unwrap();
        list.push("b").unwrap();
        assert_eq!(to_snbt(&Tag::List(list)), r#"["a", "b"]"#);

        let compound = Compound::new()
            .with("z", 1i8)
            .with("a", Compound::new().with("inner", 2i32));
        assert_eq!(
            to_snbt(&Tag::Compound(compound)),
            r#"{"z": 1b, "a": {"inner": 2}}"#
        );
        assert_eq!(to_snbt(&Tag::Compound(Compound::new())), "{}");
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse("127b").unwrap(), Tag::Byte(127));
        assert_eq!(parse("65535us").unwrap(), Tag::UShort(65535));
        assert_eq!(parse("-5s").unwrap(), Tag::Short(-5));
        assert_eq!(parse("12").unwrap(), Tag::Int(12));
        assert_eq!(parse("12u").unwrap(), Tag::UInt(12));
        assert_eq!(parse("12L").unwrap(), Tag::Long(12));
        assert_eq!(parse("12uL").unwrap(), Tag::ULong(12));
        assert_eq!(parse("0.5f").unwrap(), Tag::Float(0.5));
        assert_eq!(parse("0.5d").unwrap(), Tag::Double(0.5));
        assert_eq!(parse("0.5").unwrap(), Tag::Double(0.5));
        assert_eq!(parse("  \n\t7  ").unwrap(), Tag::Int(7));
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(
            parse(r#""a\"b\\c""#).unwrap(),
            Tag::String("a\"b\\c".to_string())
        );
        assert_eq!(parse("\"two\nlines\"").unwrap(), Tag::String("two\nlines".to_string()));
        assert_eq!(parse(r#""日本""#).unwrap(), Tag::String("日本".to_string()));
    }

    #[test]
    fn test_parse_containers() {
        let tag = parse(r#"{"name": "Steve", "pos": [1.0d, 2.5d], "inv": [TAG_Compound;]}"#).unwrap();
        let compound = tag.as_compound().unwrap();
        assert_eq!(compound.get_str("name"), Some("Steve"));
        let pos = compound.get_list("pos").unwrap();
        assert_eq!(pos.element_kind(), TagKind::Double);
        assert_eq!(pos.len(), 2);
        let inv = compound.get_list("inv").unwrap();
        assert_eq!(inv.element_kind(), TagKind::Compound);
        assert!(inv.is_empty());
    }

    #[test]
    fn test_parse_arrays() {
        assert_eq!(parse("[B; ]").unwrap(), Tag::ByteArray(vec![]));
        assert_eq!(parse("[B; 1, -2]").unwrap(), Tag::ByteArray(vec![1, -2]));
        assert_eq!(parse("[B;1b,2b]").unwrap(), Tag::ByteArray(vec![1, 2]));
        assert_eq!(parse("[US; 65535]").unwrap(), Tag::UShortArray(vec![65535]));
        assert_eq!(parse("[UL; 1uL, 2]").unwrap(), Tag::ULongArray(vec![1, 2]));
        assert_eq!(parse("[I; 3]").unwrap(), Tag::IntArray(vec![3]));
    }

    #[test]
    fn test_parse_float_specials_in_list() {
        let tag = parse("[NaNf, inff]").unwrap();
        let list = tag.as_list().unwrap();
        assert_eq!(list.element_kind(), TagKind::Float);
        assert!(matches!(list.get(0), Some(Tag::Float(v)) if v.is_nan()));
        assert_eq!(list.get(1), Some(&Tag::Float(f32::INFINITY)));
    }

    #[test]
    fn test_parse_empty_plain_list() {
        assert_eq!(parse("[]").unwrap(), Tag::List(List::new(TagKind::End)));
    }

    #[test]
    fn test_parser_rejects() {
        for text in [
            "{",
            r#"{"key"}"#,
            r#"{"key": }"#,
            "[1,2,3",
            r#""unterminated"#,
            "123xyz",
            "[X; 1,2,3]",
            r#"[1,"string"]"#,
            "",
            "1 2",
            "[B; 1, 300]",
            "[TAG_Nope;]",
            "[TAG_Int; 1]",
            r#""bad \n escape""#,
            r#"{"a": 1,}"#,
            "{key: 1}",
            "300b",
            "-",
            "[B; 1, 2",
        ] {
            assert_rejects(text);
        }
    }

    #[test]
    fn test_error_reasons() {
        assert!(matches!(
            parse("[X; 1,2,3]").unwrap_err().reason,
            ParseReason::UnknownArrayType(ref m) if m == "X"
        ));
        assert!(matches!(
            parse(r#"[1,"string"]"#).unwrap_err(),
            ParseError {
                position: 3,
                reason: ParseReason::MixedList {
                    expected: TagKind::Int,
                    found: TagKind::String
                }
            }
        ));
        assert!(matches!(
            parse("123xyz").unwrap_err().reason,
            ParseReason::InvalidNumber(_)
        ));
        assert!(matches!(
            parse(r#""abc"#).unwrap_err(),
            ParseError {
                position: 0,
                reason: ParseReason::UnterminatedString
            }
        ));
        assert!(matches!(
            parse("[1,2,3").unwrap_err().reason,
            ParseReason::UnexpectedEnd(_)
        ));
        assert!(matches!(
            parse("1 2").unwrap_err().reason,
            ParseReason::TrailingCharacters('2')
        ));
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let text = "[".repeat(MAX_DEPTH + 1) + &"]".repeat(MAX_DEPTH + 1);
        assert!(matches!(parse(&text).unwrap_err().reason, ParseReason::TooDeep));
    }

    fn nested_lists(levels: usize, innermost: Tag) -> Tag {
        let mut tag = innermost;
        for _ in 0..levels {
            let mut list = List::new(tag.kind());
            list.push(tag).unwrap();
            tag = Tag::List(list);
        }
        tag
    }

    #[test]
    fn test_roundtrip_at_max_depth() {
        for innermost in [
            Tag::ByteArray(vec![1]),
            Tag::Int(7),
            Tag::List(List::new(TagKind::Byte)),
        ] {
            let levels = if innermost.kind() == TagKind::List {
                MAX_DEPTH - 1
            } else {
                MAX_DEPTH
            };
            let tag = nested_lists(levels, innermost);
            let binary = encode(&NamedTag::unnamed(tag.clone())).unwrap();
            let parsed = parse(&to_snbt(&tag)).unwrap();
            assert_eq!(encode(&NamedTag::unnamed(parsed)).unwrap(), binary);
        }
    }

    #[test]
    fn test_one_past_max_depth_fails_in_both_forms() {
        let tag = nested_lists(MAX_DEPTH + 1, Tag::ByteArray(vec![1]));
        assert!(encode(&NamedTag::unnamed(tag.clone())).is_err());
        assert!(matches!(
            parse(&to_snbt(&tag)).unwrap_err().reason,
            ParseReason::TooDeep
        ));
    }

    #[test]
    fn test_non_canonical_nan_roundtrip() {
        for tag in [
            Tag::Float(f32::from_bits(0xFFC0_0000)),
            Tag::Float(f32::from_bits(0x7F80_0001)),
            Tag::Double(f64::from_bits(0xFFF8_0000_0000_0001)),
        ] {
            let binary = encode(&NamedTag::unnamed(tag.clone())).unwrap();
            let parsed = parse(&to_snbt(&tag)).unwrap();
            assert_eq!(encode(&NamedTag::unnamed(parsed)).unwrap(), binary);
        }
    }

    #[test]
    fn test_canonical_text_roundtrip() {
        for text in [
            "127b",
            "[B; ]",
            "[TAG_Byte;]",
            r#""Quote: \"test\"""#,
            r#"{"a": [1s, 2s], "b": {"c": [L; 1, 2]}, "d": [[TAG_Int;], [1]]}"#,
            "[UI; 0, 4294967295]",
            "-0.5f",
            "{}",
        ] {
            assert_eq!(to_snbt(&parse(text).unwrap()), text);
        }
    }

    #[test]
    fn test_random_tree_roundtrip() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let tag = random_tag(&mut rng, 0);
            let text = to_snbt(&tag);
            let parsed = parse(&text)
                .unwrap_or_else(|e| panic!("Failed to parse {text:?}: {e}"));

            let original = encode(&NamedTag::unnamed(tag)).unwrap();
            let reparsed = encode(&NamedTag::unnamed(parsed.clone())).unwrap();
            assert_eq!(original, reparsed, "Binary round trip failed for {text}");
            assert_eq!(to_snbt(&parsed), text, "Text round trip failed for {text}");
        }
    }

    #[test]
    fn test_from_str_and_named() {
        let tag: Tag = "5b".parse().unwrap();
        assert_eq!(tag, Tag::Byte(5));
        let named = parse_named("{}", "level").unwrap();
        assert_eq!(named.name, "level");
        assert_eq!(named.to_string(), "{}");
    }
}
