//! Binary NBT codec.
//!
//! Every root or compound child is written as
//!
//! ```text
//! [type id: u8][name length: u16][name: UTF-8][payload]
//! ```
//!
//! and all numbers are big-endian. List elements are payload only. Unsigned kinds write the same
//! bit pattern as the signed kind of the same width. Every NaN is written as the canonical quiet
//! NaN, so a tree encodes the same before and after a trip through SNBT.

use bytes::{Buf, BufMut, BytesMut};

use super::{Compound, DataType, ErrorReason, List, NamedTag, NbtError, Tag, TagKind};
use crate::consts::nbt::{MAX_DEPTH, MAX_STRING_BYTES};

/// Encodes a root tag with its header.
pub fn encode(tag: &NamedTag) -> Result<Vec<u8>, NbtError> {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(&tag.name, &tag.tag, &mut buf)?;
    Ok(buf.to_vec())
}

/// Appends `tag` named `name` to `buf`. On error `buf` is left as it was.
pub fn encode_into(name: &str, tag: &Tag, buf: &mut BytesMut) -> Result<(), NbtError> {
    let start = buf.len();
    let result = write_named(buf, name, tag, 0);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

/// Decodes exactly one root tag; `bytes` must contain nothing after it.
pub fn decode(bytes: &[u8]) -> Result<NamedTag, NbtError> {
    let mut data = bytes;
    let tag = consume_from_bytes(&mut data)?;
    if data.has_remaining() {
        return Err(NbtError::Decoding(
            DataType::Header,
            ErrorReason::InvalidFormat(format!("{} trailing bytes after the root tag", data.len())),
        ));
    }
    Ok(tag)
}

/// Reads one root tag from the front of `data` and advances it past the tag.
///
/// `data` is only advanced when the whole tag was read.
pub fn consume_from_bytes(data: &mut &[u8]) -> Result<NamedTag, NbtError> {
    let mut cursor: &[u8] = *data;

    need(cursor, 1, DataType::Header)?;
    let kind = read_kind(cursor.get_u8(), DataType::Header)?;
    if kind == TagKind::End {
        return Err(NbtError::Decoding(
            DataType::Header,
            ErrorReason::InvalidFormat("a root tag cannot be TAG_End".to_string()),
        ));
    }
    let name = read_string(&mut cursor, DataType::Name)?;
    let tag = read_payload(&mut cursor, kind, 0)?;

    *data = cursor;
    Ok(NamedTag { name, tag })
}

// ---- encoding ----

fn write_named(buf: &mut BytesMut, name: &str, tag: &Tag, depth: usize) -> Result<(), NbtError> {
    buf.put_u8(tag.kind().id());
    write_string(buf, name, DataType::Name)?;
    write_payload(buf, tag, depth)
}

fn write_string(buf: &mut BytesMut, value: &str, data_type: DataType) -> Result<(), NbtError> {
    if value.len() > MAX_STRING_BYTES {
        return Err(NbtError::Encoding(data_type, ErrorReason::ValueTooLarge));
    }
    buf.put_u16(value.len() as u16);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn write_count(buf: &mut BytesMut, count: usize, kind: TagKind) -> Result<(), NbtError> {
    let count = i32::try_from(count)
        .map_err(|_| NbtError::Encoding(DataType::Payload(kind), ErrorReason::ValueTooLarge))?;
    buf.put_i32(count);
    Ok(())
}

fn write_payload(buf: &mut BytesMut, tag: &Tag, depth: usize) -> Result<(), NbtError> {
    match tag {
        Tag::Byte(value) => buf.put_i8(*value),
        Tag::Short(value) => buf.put_i16(*value),
        Tag::UShort(value) => buf.put_u16(*value),
        Tag::Int(value) => buf.put_i32(*value),
        Tag::UInt(value) => buf.put_u32(*value),
        Tag::Long(value) => buf.put_i64(*value),
        Tag::ULong(value) => buf.put_u64(*value),
        // NaN payloads and signs are not kept.
        Tag::Float(value) if value.is_nan() => buf.put_f32(f32::NAN),
        Tag::Double(value) if value.is_nan() => buf.put_f64(f64::NAN),
        Tag::Float(value) => buf.put_f32(*value),
        Tag::Double(value) => buf.put_f64(*value),
        Tag::String(value) => write_string(buf, value, DataType::Payload(TagKind::String))?,
        Tag::ByteArray(values) => {
            write_count(buf, values.len(), TagKind::ByteArray)?;
            values.iter().for_each(|v| buf.put_i8(*v));
        }
        Tag::ShortArray(values) => {
            write_count(buf, values.len(), TagKind::ShortArray)?;
            values.iter().for_each(|v| buf.put_i16(*v));
        }
        Tag::UShortArray(values) => {
            write_count(buf, values.len(), TagKind::UShortArray)?;
            values.iter().for_each(|v| buf.put_u16(*v));
        }
        Tag::IntArray(values) => {
            write_count(buf, values.len(), TagKind::IntArray)?;
            values.iter().for_each(|v| buf.put_i32(*v));
        }
        Tag::UIntArray(values) => {
            write_count(buf, values.len(), TagKind::UIntArray)?;
            values.iter().for_each(|v| buf.put_u32(*v));
        }
        Tag::LongArray(values) => {
            write_count(buf, values.len(), TagKind::LongArray)?;
            values.iter().for_each(|v| buf.put_i64(*v));
        }
        Tag::ULongArray(values) => {
            write_count(buf, values.len(), TagKind::ULongArray)?;
            values.iter().for_each(|v| buf.put_u64(*v));
        }
        Tag::List(list) => {
            check_depth(depth, TagKind::List, NbtError::Encoding)?;
            buf.put_u8(list.element_kind().id());
            write_count(buf, list.len(), TagKind::List)?;
            for item in list {
                write_payload(buf, item, depth + 1)?;
            }
        }
        Tag::Compound(compound) => {
            check_depth(depth, TagKind::Compound, NbtError::Encoding)?;
            for (name, child) in compound.iter() {
                write_named(buf, name, child, depth + 1)?;
            }
            buf.put_u8(TagKind::End.id());
        }
    }
    Ok(())
}

// ---- decoding ----

fn check_depth(
    depth: usize,
    kind: TagKind,
    error: fn(DataType, ErrorReason) -> NbtError,
) -> Result<(), NbtError> {
    if depth >= MAX_DEPTH {
        Err(error(DataType::Payload(kind), ErrorReason::TooDeep))
    } else {
        Ok(())
    }
}

fn need(data: &[u8], needed: usize, data_type: DataType) -> Result<(), NbtError> {
    if data.remaining() < needed {
        Err(NbtError::Decoding(
            data_type,
            ErrorReason::UnexpectedEnd {
                needed,
                remaining: data.remaining(),
            },
        ))
    } else {
        Ok(())
    }
}

fn read_kind(id: u8, data_type: DataType) -> Result<TagKind, NbtError> {
    TagKind::from_id(id)
        .ok_or_else(|| NbtError::Decoding(data_type, ErrorReason::UnknownTypeId(id)))
}

fn read_string(data: &mut &[u8], data_type: DataType) -> Result<String, NbtError> {
    need(data, 2, data_type)?;
    let length = data.get_u16() as usize;
    need(data, length, data_type)?;

    let value = std::str::from_utf8(&data[..length])
        .map_err(|err| {
            NbtError::Decoding(
                data_type,
                ErrorReason::InvalidFormat(format!("String UTF-8 decoding error: {err}")),
            )
        })?
        .to_string();
    data.advance(length);
    Ok(value)
}

/// Reads an element count and checks that `count` elements of at least `width` bytes each can
/// still be in the input.
fn read_count(data: &mut &[u8], kind: TagKind, width: usize) -> Result<usize, NbtError> {
    let data_type = DataType::Payload(kind);
    need(data, 4, data_type)?;
    let count = data.get_i32();
    if count < 0 {
        return Err(NbtError::Decoding(data_type, ErrorReason::NegativeLength(count)));
    }
    let count = count as usize;
    let fits = count
        .checked_mul(width)
        .is_some_and(|bytes| bytes <= data.remaining());
    if !fits {
        return Err(NbtError::Decoding(
            data_type,
            ErrorReason::ImplausibleLength(count),
        ));
    }
    Ok(count)
}

macro_rules! read_array {
    ($data:expr, $kind:expr, $width:expr, $get:ident) => {{
        let count = read_count($data, $kind, $width)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push($data.$get());
        }
        values
    }};
}

fn read_fixed<T>(
    data: &mut &[u8],
    kind: TagKind,
    width: usize,
    get: fn(&mut &[u8]) -> T,
) -> Result<T, NbtError> {
    need(data, width, DataType::Payload(kind))?;
    Ok(get(data))
}

fn read_payload(data: &mut &[u8], kind: TagKind, depth: usize) -> Result<Tag, NbtError> {
    let tag = match kind {
        TagKind::End => {
            return Err(NbtError::Decoding(
                DataType::Header,
                ErrorReason::InvalidFormat("TAG_End has no payload".to_string()),
            ))
        }
        TagKind::Byte => Tag::Byte(read_fixed(data, kind, 1, |d| d.get_i8())?),
        TagKind::Short => Tag::Short(read_fixed(data, kind, 2, |d| d.get_i16())?),
        TagKind::UShort => Tag::UShort(read_fixed(data, kind, 2, |d| d.get_u16())?),
        TagKind::Int => Tag::Int(read_fixed(data, kind, 4, |d| d.get_i32())?),
        TagKind::UInt => Tag::UInt(read_fixed(data, kind, 4, |d| d.get_u32())?),
        TagKind::Long => Tag::Long(read_fixed(data, kind, 8, |d| d.get_i64())?),
        TagKind::ULong => Tag::ULong(read_fixed(data, kind, 8, |d| d.get_u64())?),
        TagKind::Float => Tag::Float(read_fixed(data, kind, 4, |d| d.get_f32())?),
        TagKind::Double => Tag::Double(read_fixed(data, kind, 8, |d| d.get_f64())?),
        TagKind::String => Tag::String(read_string(data, DataType::Payload(kind))?),
        TagKind::ByteArray => Tag::ByteArray(read_array!(data, kind, 1, get_i8)),
        TagKind::ShortArray => Tag::ShortArray(read_array!(data, kind, 2, get_i16)),
        TagKind::UShortArray => Tag::UShortArray(read_array!(data, kind, 2, get_u16)),
        TagKind::IntArray => Tag::IntArray(read_array!(data, kind, 4, get_i32)),
        TagKind::UIntArray => Tag::UIntArray(read_array!(data, kind, 4, get_u32)),
        TagKind::LongArray => Tag::LongArray(read_array!(data, kind, 8, get_i64)),
        TagKind::ULongArray => Tag::ULongArray(read_array!(data, kind, 8, get_u64)),
        TagKind::List => Tag::List(read_list(data, depth)?),
        TagKind::Compound => Tag::Compound(read_compound(data, depth)?),
    };
    Ok(tag)
}

fn read_list(data: &mut &[u8], depth: usize) -> Result<List, NbtError> {
    check_depth(depth, TagKind::List, NbtError::Decoding)?;
    need(data, 1, DataType::Payload(TagKind::List))?;
    let element_kind = read_kind(data.get_u8(), DataType::Payload(TagKind::List))?;

    if element_kind == TagKind::End {
        // An End list carries no elements, so only a zero count is plausible.
        let count = read_count(data, TagKind::List, 0)?;
        if count != 0 {
            return Err(NbtError::Decoding(
                DataType::Payload(TagKind::List),
                ErrorReason::ImplausibleLength(count),
            ));
        }
        return Ok(List::new(TagKind::End));
    }

    let count = read_count(data, TagKind::List, element_kind.min_payload_size())?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_payload(data, element_kind, depth + 1)?);
    }
    Ok(List::from_decoded(element_kind, items))
}

fn read_compound(data: &mut &[u8], depth: usize) -> Result<Compound, NbtError> {
    check_depth(depth, TagKind::Compound, NbtError::Decoding)?;
    let mut compound = Compound::new();
    loop {
        need(data, 1, DataType::Payload(TagKind::Compound))?;
        let kind = read_kind(data.get_u8(), DataType::Header)?;
        if kind == TagKind::End {
            return Ok(compound);
        }
        let name = read_string(data, DataType::Name)?;
        let tag = read_payload(data, kind, depth + 1)?;
        compound.insert(name, tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn hello_world_bytes() -> Vec<u8> {
        let mut bytes = vec![0x0A, 0x00, 0x0B];
        bytes.extend_from_slice(b"hello world");
        bytes.extend_from_slice(&[0x08, 0x00, 0x04]);
        bytes.extend_from_slice(b"name");
        bytes.extend_from_slice(&[0x00, 0x09]);
        bytes.extend_from_slice(b"Bananrama");
        bytes.push(0x00);
        bytes
    }

    fn sample_tree() -> NamedTag {
        let mut positions = List::new(TagKind::Double);
        positions.push(1.5f64).unwrap();
        positions.push(-64.0f64).unwrap();

        let mut sections = List::new(TagKind::Compound);
        sections
            .push(
                Compound::new()
                    .with("Y", -4i8)
                    .with("palette", Tag::UShortArray(vec![0, 1, 65535])),
            )
            .unwrap();

        NamedTag::new(
            "",
            Compound::new()
                .with("DataVersion", 3953i32)
                .with("seed", u64::MAX)
                .with("height", 384u16)
                .with("ticks", Tag::UInt(u32::MAX))
                .with("gravity", 0.08f32)
                .with("Status", "minecraft:full")
                .with("Pos", positions)
                .with("sections", sections)
                .with("heightmap", Tag::LongArray(vec![i64::MIN, 0, i64::MAX]))
                .with("light", Tag::ByteArray(vec![-1, 0, 1]))
                .with("shorts", Tag::ShortArray(vec![-2, 2]))
                .with("ints", Tag::IntArray(vec![7]))
                .with("uints", Tag::UIntArray(vec![]))
                .with("ulongs", Tag::ULongArray(vec![1, u64::MAX]))
                .with("empty", List::new(TagKind::End)),
        )
    }

    #[test]
    fn test_encode_hello_world() {
        let tag = NamedTag::new("hello world", Compound::new().with("name", "Bananrama"));
        assert_eq!(encode(&tag).unwrap(), hello_world_bytes());
    }

    #[test]
    fn test_decode_hello_world() {
        let tag = decode(&hello_world_bytes()).unwrap();
        assert_eq!(tag.name, "hello world");
        let compound = tag.tag.as_compound().unwrap();
        assert_eq!(compound.get_str("name"), Some("Bananrama"));
    }

    #[test]
    fn test_primitive_layouts() {
        let bytes = encode(&NamedTag::new("", 0x0102_0304i32)).unwrap();
        assert_eq!(bytes, vec![0x03, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04]);

        let bytes = encode(&NamedTag::new("a", Tag::Short(-2))).unwrap();
        assert_eq!(bytes, vec![0x02, 0x00, 0x01, b'a', 0xFF, 0xFE]);

        let bytes = encode(&NamedTag::new("", Tag::Float(1.0))).unwrap();
        assert_eq!(bytes[3..], 1.0f32.to_be_bytes());
    }

    #[test]
    fn test_nan_is_written_canonical() {
        let bytes = encode(&NamedTag::new("", Tag::Float(f32::from_bits(0xFFC0_0000)))).unwrap();
        assert_eq!(bytes[3..], [0x7F, 0xC0, 0x00, 0x00]);

        let bytes = encode(&NamedTag::new("", Tag::Double(-f64::NAN))).unwrap();
        assert_eq!(bytes[3..], 0x7FF8_0000_0000_0000u64.to_be_bytes());

        let bytes = encode(&NamedTag::new("", Tag::Float(-0.0))).unwrap();
        assert_eq!(bytes[3..], [0x80, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_unsigned_uses_signed_bit_pattern() {
        let unsigned = encode(&NamedTag::new("", Tag::UShort(65535))).unwrap();
        let signed = encode(&NamedTag::new("", Tag::Short(-1))).unwrap();
        assert_eq!(unsigned[3..], signed[3..]);

        let unsigned = encode(&NamedTag::new("", Tag::ULong(u64::MAX))).unwrap();
        let signed = encode(&NamedTag::new("", Tag::Long(-1))).unwrap();
        assert_eq!(unsigned[3..], signed[3..]);
    }

    #[test]
    fn test_list_layout() {
        let mut list = List::new(TagKind::Byte);
        list.push(1i8).unwrap();
        list.push(2i8).unwrap();
        let bytes = encode(&NamedTag::new("", list)).unwrap();
        assert_eq!(bytes, vec![0x09, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_roundtrip_sample_tree() {
        let tree = sample_tree();
        let bytes = encode(&tree).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_any_root_kind() {
        for tag in [
            Tag::Byte(1),
            Tag::String("root".to_string()),
            Tag::List(List::new(TagKind::Int)),
            Tag::ULongArray(vec![3]),
        ] {
            let named = NamedTag::new("r", tag);
            assert_eq!(decode(&encode(&named).unwrap()).unwrap(), named);
        }
    }

    #[test]
    fn test_roundtrip_random_int_arrays() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let length = rng.gen_range(0..64);
            let values: Vec<i32> = (0..length).map(|_| rng.gen()).collect();
            let named = NamedTag::new("data", Tag::IntArray(values));
            assert_eq!(decode(&encode(&named).unwrap()).unwrap(), named);
        }
    }

    #[test]
    fn test_consume_advances_past_one_tag() {
        let mut bytes = hello_world_bytes();
        bytes.extend_from_slice(&[0xAB, 0xCD]);
        let mut data: &[u8] = &bytes;
        consume_from_bytes(&mut data).unwrap();
        assert_eq!(data, &[0xAB, 0xCD]);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = hello_world_bytes();
        bytes.push(0);
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(DataType::Header, ErrorReason::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_type_id() {
        let bytes = vec![0x42, 0x00, 0x00];
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(_, ErrorReason::UnknownTypeId(0x42)))
        ));
    }

    #[test]
    fn test_decode_rejects_end_root() {
        assert!(decode(&[0x00]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_every_truncation() {
        let bytes = encode(&sample_tree()).unwrap();
        for cut in 0..bytes.len() {
            let mut data: &[u8] = &bytes[..cut];
            assert!(
                consume_from_bytes(&mut data).is_err(),
                "Truncation at {cut} was accepted"
            );
            assert_eq!(data.len(), cut, "Slice advanced on failure at {cut}");
        }
    }

    #[test]
    fn test_decode_rejects_negative_count() {
        let bytes = vec![0x0B, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(
                DataType::Payload(TagKind::IntArray),
                ErrorReason::NegativeLength(-1)
            ))
        ));
    }

    #[test]
    fn test_decode_rejects_implausible_count() {
        // A long array claiming 2^30 elements backed by 8 bytes.
        let mut bytes = vec![0x0C, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(_, ErrorReason::ImplausibleLength(_)))
        ));

        // A list of compounds claiming more elements than bytes left.
        let bytes = vec![0x09, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x10, 0x00, 0x00];
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(_, ErrorReason::ImplausibleLength(_)))
        ));
    }

    #[test]
    fn test_decode_rejects_non_empty_end_list() {
        let bytes = vec![0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8_name() {
        let bytes = vec![0x01, 0x00, 0x02, 0xFF, 0xFE, 0x05];
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(DataType::Name, ErrorReason::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        // Lists of lists, each declaring one element, nested past the limit.
        let mut bytes = vec![0x09, 0x00, 0x00];
        for _ in 0..MAX_DEPTH + 1 {
            bytes.extend_from_slice(&[0x09, 0x00, 0x00, 0x00, 0x01]);
        }
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            decode(&bytes),
            Err(NbtError::Decoding(_, ErrorReason::TooDeep))
        ));
    }

    #[test]
    fn test_encode_rejects_long_string() {
        let mut buf = BytesMut::new();
        buf.put_u8(0xAA);
        let tag = Tag::String("a".repeat(MAX_STRING_BYTES + 1));
        let err = encode_into("", &tag, &mut buf).unwrap_err();
        assert_eq!(
            err,
            NbtError::Encoding(DataType::Payload(TagKind::String), ErrorReason::ValueTooLarge)
        );
        assert_eq!(&buf[..], &[0xAA]);
    }

    #[test]
    fn test_encode_accepts_max_length_name() {
        let named = NamedTag::new("n".repeat(MAX_STRING_BYTES), 1i8);
        assert_eq!(decode(&encode(&named).unwrap()).unwrap(), named);
    }
}
