use core::str;

use serde::de::{self, DeserializeSeed, Visitor};
use serde::Deserialize;

use crate::{Error, ErrorKind};

/// Lists and dictionaries nested deeper than this are rejected instead of exhausting the stack
pub const MAX_DEPTH: usize = 128;

/// Strict bencode deserializer: anything that isn't in canonical form is rejected
pub struct BencodeDeserializer<'de> {
    input: &'de [u8],
    position: usize,
    depth: usize,
}

impl<'de> BencodeDeserializer<'de> {
    pub fn from_str(input: &'de str) -> Self {
        Self::from_bytes(input.as_bytes())
    }

    pub fn from_bytes(input: &'de [u8]) -> Self {
        BencodeDeserializer {
            input,
            position: 0,
            depth: 0,
        }
    }

    /// Builds an error pointing at the current offset
    pub fn error(&self, kind: ErrorKind) -> Error {
        Error::from(kind).set_position(self.position)
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    fn advance(&mut self, by: usize) {
        self.position += by;
        self.input = &self.input[by..];
    }

    fn peek(&self, expected: &'static str) -> Result<u8, Error> {
        self.input
            .first()
            .copied()
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEof(expected)))
    }

    /// Consumes `label` or fails with `unexpected`
    fn consume(&mut self, label: u8, expected: &'static str, unexpected: &'static str) -> Result<(), Error> {
        if self.peek(expected)? != label {
            return Err(self.error(ErrorKind::BadInputData(unexpected)));
        }
        self.advance(1);
        Ok(())
    }

    /// `i<digits>e`
    fn parse_integer(&mut self) -> Result<i64, Error> {
        self.consume(b'i', "integer", "expected integer label 'i'")?;

        let end = self
            .input
            .iter()
            .position(|byte| *byte == b'e')
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEof("closing delimiter for integer")))?;
        let digits = &self.input[..end];
        check_canonical_integer(digits).map_err(|kind| self.error(kind))?;

        // Only ASCII digits and '-' are left at this point
        let integer = str::from_utf8(digits)
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| self.error(ErrorKind::BadInputData("integer doesn't fit into i64")))?;
        self.advance(end + 1);
        Ok(integer)
    }

    /// `<length>:<bytes>`
    fn parse_bytes(&mut self) -> Result<&'de [u8], Error> {
        if !self.peek("bytes")?.is_ascii_digit() {
            return Err(self.error(ErrorKind::BadInputData("expected bytes length")));
        }

        let delimiter = self
            .input
            .iter()
            .position(|byte| *byte == b':')
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEof("bytes delimiter ':'")))?;
        let raw_length = &self.input[..delimiter];
        check_canonical_length(raw_length).map_err(|kind| self.error(kind))?;

        let length = str::from_utf8(raw_length)
            .ok()
            .and_then(|length| length.parse::<usize>().ok())
            .ok_or_else(|| self.error(ErrorKind::BadInputData("expected valid bytes length")))?;
        let available = self.input.len() - delimiter - 1;
        if length > available {
            return Err(self.error(ErrorKind::UnexpectedEof("bytes of the announced length")));
        }

        let bytes = &self.input[delimiter + 1..delimiter + 1 + length];
        self.advance(delimiter + 1 + length);
        Ok(bytes)
    }

    /// Reads the next dictionary key without consuming it
    fn peek_key(&self) -> Result<&'de [u8], Error> {
        let mut lookahead = BencodeDeserializer {
            input: self.input,
            position: self.position,
            depth: self.depth,
        };
        lookahead.parse_bytes()
    }

    /// Parses `<open>...e`, delegating the contents to `contents`
    fn parse_container<T>(
        &mut self,
        open: u8,
        what: &'static str,
        contents: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(ErrorKind::BadInputData("nesting too deep")));
        }
        self.consume(open, what, "unexpected container type")?;
        self.depth += 1;
        let value = contents(self);
        self.depth -= 1;
        let value = value?;
        self.consume(b'e', "container end", "expected container end 'e'")?;
        Ok(value)
    }

    fn parse_empty_string(&mut self) -> Result<(), Error> {
        if !self.parse_bytes()?.is_empty() {
            return Err(self.error(ErrorKind::BadInputData("expected bencode string of length 0")));
        }
        Ok(())
    }
}

/// `0`, or an optional `-` followed by digits without a leading zero. `-0` is forbidden.
fn check_canonical_integer(integer: &[u8]) -> Result<(), ErrorKind> {
    let digits = integer.strip_prefix(b"-").unwrap_or(integer);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ErrorKind::BadInputData("integer must consist of decimal digits"));
    }
    if digits[0] == b'0' && (digits.len() > 1 || digits.len() != integer.len()) {
        return Err(ErrorKind::NonCanonical("integer has a leading zero or is a negative zero"));
    }
    Ok(())
}

fn check_canonical_length(length: &[u8]) -> Result<(), ErrorKind> {
    if length.is_empty() || !length.iter().all(u8::is_ascii_digit) {
        return Err(ErrorKind::BadInputData("bytes length must consist of decimal digits"));
    }
    if length[0] == b'0' && length.len() > 1 {
        return Err(ErrorKind::NonCanonical("bytes length has a leading zero"));
    }
    Ok(())
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut BencodeDeserializer<'de> {
    type Error = Error;

    /// Integers are always visited as `i64` and byte strings as borrowed bytes.
    /// Serde's primitive visitors narrow them down.
    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.peek("any bencode value")? {
            b'i' => visitor.visit_i64(self.parse_integer()?),
            b'l' => self.parse_container(b'l', "bencode list", |de| visitor.visit_seq(BencodeAccessor::new(de))),
            b'd' => self.parse_container(b'd', "bencode dictionary", |de| {
                visitor.visit_map(BencodeAccessor::new(de))
            }),
            _ => visitor.visit_borrowed_bytes(self.parse_bytes()?),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(self.error(ErrorKind::Unsupported("bool")))
    }

    fn deserialize_f32<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(self.error(ErrorKind::Unsupported("f32")))
    }

    fn deserialize_f64<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(self.error(ErrorKind::Unsupported("f64")))
    }

    fn deserialize_char<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(self.error(ErrorKind::Unsupported("char")))
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_i64(self.parse_integer()?)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let start = self.position;
        let bytes = self.parse_bytes()?;
        let str = str::from_utf8(bytes).map_err(|_| {
            Error::from(ErrorKind::BadInputData("expected valid utf8 string")).set_position(start)
        })?;
        visitor.visit_borrowed_str(str)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_bytes(self.parse_bytes()?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    /// An empty string stands for `None`, mirroring how the serializer writes it
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.input.starts_with(b"0:") {
            self.advance(2);
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.parse_empty_string()?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.parse_container(b'l', "bencode list", |de| visitor.visit_seq(BencodeAccessor::new(de)))
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.parse_container(b'd', "bencode dictionary", |de| visitor.visit_map(BencodeAccessor::new(de)))
    }

    /// Unit variants are plain strings, everything else is a single-entry dictionary
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        if self.peek("bencode enum")?.is_ascii_digit() {
            return visitor.visit_enum(de::value::BorrowedStrDeserializer::new(self.parse_str()?));
        }
        self.parse_container(b'd', "bencode dictionary", |de| visitor.visit_enum(BencodeAccessor::new(de)))
    }

    serde::forward_to_deserialize_any! {
        i8 i16 i32 u8 u16 u32 u64 tuple tuple_struct struct ignored_any
    }
}

impl<'de> BencodeDeserializer<'de> {
    fn parse_str(&mut self) -> Result<&'de str, Error> {
        let start = self.position;
        str::from_utf8(self.parse_bytes()?)
            .map_err(|_| Error::from(ErrorKind::BadInputData("expected valid utf8 string")).set_position(start))
    }
}

struct BencodeAccessor<'a, 'de> {
    de: &'a mut BencodeDeserializer<'de>,
    last_key: Option<&'de [u8]>,
}

impl<'a, 'de> BencodeAccessor<'a, 'de> {
    fn new(de: &'a mut BencodeDeserializer<'de>) -> Self {
        BencodeAccessor { de, last_key: None }
    }

    fn at_end(&self) -> Result<bool, Error> {
        Ok(self.de.peek("next element or container end")? == b'e')
    }
}

impl<'a, 'de> de::SeqAccess<'de> for BencodeAccessor<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        if self.at_end()? {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

impl<'a, 'de> de::MapAccess<'de> for BencodeAccessor<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        if self.at_end()? {
            return Ok(None);
        }

        // Keys must be strictly ascending within one dictionary
        let key = self.de.peek_key()?;
        match self.last_key {
            Some(last_key) if key == last_key => {
                return Err(self.de.error(ErrorKind::NonCanonical("duplicate dictionary key")))
            }
            Some(last_key) if key < last_key => {
                return Err(self.de.error(ErrorKind::NonCanonical("dictionary keys are not sorted")))
            }
            _ => self.last_key = Some(key),
        }

        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        seed.deserialize(&mut *self.de)
    }
}

impl<'a, 'de> de::EnumAccess<'de> for BencodeAccessor<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self), Error> {
        Ok((seed.deserialize(&mut *self.de)?, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for BencodeAccessor<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        self.de.parse_empty_string()
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, Error> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}

/// Decodes exactly one value. Trailing bytes are an error.
/// Errors raised by visitors get the offset at which decoding stopped.
pub fn from_bytes<'de, T: Deserialize<'de>>(input: &'de [u8]) -> Result<T, Error> {
    let mut deserializer = BencodeDeserializer::from_bytes(input);
    let deserialized = T::deserialize(&mut deserializer).map_err(|e| match e.position {
        Some(_) => e,
        None => e.set_position(deserializer.position),
    })?;
    if !deserializer.input.is_empty() {
        return Err(deserializer.error(ErrorKind::TrailingBytes(deserializer.input.len())));
    }
    Ok(deserialized)
}

pub fn from_str<'de, T: Deserialize<'de>>(input: &'de str) -> Result<T, Error> {
    from_bytes(input.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::de::IgnoredAny;

    use super::*;
    use crate::BencodeValue;

    fn decode_err(input: &str) -> Error {
        from_str::<BencodeValue>(input).expect_err("malformed input must be rejected")
    }

    mod integers {
        use super::*;

        #[test]
        fn rejects_leading_zeros() {
            let err = decode_err("i03e");
            assert!(matches!(err.kind, ErrorKind::NonCanonical(_)));
            assert_eq!(err.position, Some(1));
        }

        #[test]
        fn rejects_negative_zero() {
            assert!(matches!(decode_err("i-0e").kind, ErrorKind::NonCanonical(_)));
        }

        #[test]
        fn rejects_empty_and_garbage() {
            assert!(matches!(decode_err("ie").kind, ErrorKind::BadInputData(_)));
            assert!(matches!(decode_err("i-e").kind, ErrorKind::BadInputData(_)));
            assert!(matches!(decode_err("i+5e").kind, ErrorKind::BadInputData(_)));
            assert!(matches!(decode_err("i1.5e").kind, ErrorKind::BadInputData(_)));
        }

        #[test]
        fn rejects_missing_terminator() {
            assert!(matches!(decode_err("i42").kind, ErrorKind::UnexpectedEof(_)));
        }

        #[test]
        fn rejects_overflow() {
            assert!(matches!(decode_err("i9223372036854775808e").kind, ErrorKind::BadInputData(_)));
        }

        #[test]
        fn accepts_extremes() {
            let value: i64 = from_str("i-9223372036854775808e").expect("failed to decode i64::MIN");
            assert_eq!(value, i64::MIN);
            let value: i64 = from_str("i0e").expect("failed to decode zero");
            assert_eq!(value, 0);
        }
    }

    mod byte_strings {
        use super::*;

        #[test]
        fn rejects_length_past_the_end() {
            let err = decode_err("10:short");
            assert!(matches!(err.kind, ErrorKind::UnexpectedEof(_)));
            assert_eq!(err.position, Some(0));
        }

        #[test]
        fn rejects_leading_zero_in_length() {
            assert!(matches!(decode_err("01:a").kind, ErrorKind::NonCanonical(_)));
        }

        #[test]
        fn accepts_binary_content() {
            let input = b"4:\x00\xff\x10e";
            let value: BencodeValue = from_bytes(input).expect("failed to decode binary bytes");
            assert_eq!(value.as_bytes(), Some(&b"\x00\xff\x10e"[..]));
        }

        #[test]
        fn accepts_empty_string() {
            let value: BencodeValue = from_str("0:").expect("failed to decode an empty string");
            assert_eq!(value.as_bytes(), Some(&b""[..]));
        }
    }

    mod containers {
        use super::*;

        #[test]
        fn rejects_unsorted_keys() {
            let err = decode_err("d1:bi1e1:ai2ee");
            assert!(matches!(err.kind, ErrorKind::NonCanonical("dictionary keys are not sorted")));
            assert_eq!(err.position, Some(7));
        }

        #[test]
        fn rejects_duplicate_keys() {
            let err = decode_err("d1:ai1e1:ai2ee");
            assert!(matches!(err.kind, ErrorKind::NonCanonical("duplicate dictionary key")));
        }

        #[test]
        fn rejects_non_string_keys() {
            assert!(matches!(decode_err("di1ei2ee").kind, ErrorKind::BadInputData(_)));
        }

        #[test]
        fn rejects_unterminated_list_and_dict() {
            assert!(matches!(decode_err("li1e").kind, ErrorKind::UnexpectedEof(_)));
            assert!(matches!(decode_err("d1:ai1e").kind, ErrorKind::UnexpectedEof(_)));
        }

        #[test]
        fn rejects_trailing_bytes() {
            let err = decode_err("i1ei2e");
            assert!(matches!(err.kind, ErrorKind::TrailingBytes(3)));
            assert_eq!(err.position, Some(3));
        }

        #[test]
        fn deep_nesting_is_rejected() {
            let levels = 200_000;
            let input = [vec![b'l'; levels], vec![b'e'; levels]].concat();
            let err = from_bytes::<BencodeValue>(&input).expect_err("deep nesting must be rejected");
            assert!(matches!(err.kind, ErrorKind::BadInputData("nesting too deep")));
            assert_eq!(err.position, Some(MAX_DEPTH));

            let err = from_bytes::<IgnoredAny>(&input).expect_err("deep nesting must be rejected when skipping");
            assert!(matches!(err.kind, ErrorKind::BadInputData("nesting too deep")));
        }

        #[test]
        fn moderate_nesting_is_accepted() {
            let levels = 64;
            let input = [vec![b'l'; levels], vec![b'e'; levels]].concat();
            from_bytes::<BencodeValue>(&input).expect("failed to decode nested lists");
        }

        #[test]
        fn nested_dict_key_order_is_checked_per_level() {
            // The inner dict starts a fresh ordering
            let value: BencodeValue = from_str("d1:bd1:ai1ee1:ci2ee").expect("failed to decode nested dicts");
            let inner = value.get(b"b").and_then(BencodeValue::as_dict).expect("inner dict is missing");
            assert_eq!(inner.len(), 1);
        }
    }

    mod canonical_roundtrip {
        use super::*;
        use crate::to_bytes;

        #[test]
        fn reencoding_reproduces_input() {
            let inputs: [&[u8]; 5] = [
                b"d8:announce3:url4:infod6:lengthi40000e4:name3:foo12:piece lengthi16384e6:pieces3:\x01\x02\x03ee",
                b"li-1ei0ei1e0:le",
                b"d0:i0e1:ale1:bdee",
                b"de",
                b"le",
            ];
            for input in inputs {
                let value: BencodeValue = from_bytes(input).expect("failed to decode canonical input");
                let encoded = to_bytes(&value).expect("failed to reencode");
                assert_eq!(encoded, input);
            }
        }

        #[test]
        fn struct_ignores_unknown_fields() {
            #[derive(Debug, Deserialize, PartialEq)]
            struct Known {
                a: i64,
            }

            let value: Known = from_str("d1:ai1e1:bli2eee").expect("failed to decode a struct");
            assert_eq!(value, Known { a: 1 });
        }

        #[test]
        fn btreemap_decodes() {
            let value: BTreeMap<String, i64> = from_str("d1:ai1e1:bi2ee").expect("failed to decode a map");
            assert_eq!(value.get("b"), Some(&2));
        }
    }
}
