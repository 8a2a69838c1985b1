use std::io::Write;

use serde::ser::Serializer as _;
use serde::Serialize;

use crate::{error::Error, ErrorKind};

pub struct Serializer<'a, W: Write> {
    output: &'a mut W,
}

impl<'a, W: Write> Serializer<'a, W> {
    pub fn new(output: &'a mut W) -> Self {
        Serializer { output }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.output.write_all(bytes).map_err(Error::from)
    }
}

/// Encodes a single value into its own buffer, so that dictionary entries can be reordered before emission
fn encode_to_vec<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let mut buff = Vec::new();
    value.serialize(&mut Serializer { output: &mut buff })?;
    Ok(buff)
}

/// Strips the `<length>:` prefix from an encoded dictionary key
fn raw_key(encoded: Vec<u8>) -> Result<Vec<u8>, Error> {
    match encoded.iter().position(|byte| *byte == b':') {
        Some(delim_pos) if delim_pos > 0 && encoded[..delim_pos].iter().all(u8::is_ascii_digit) => {
            Ok(encoded[delim_pos + 1..].to_vec())
        }
        _ => Err(ErrorKind::Unsupported("dictionary keys that aren't byte strings").into()),
    }
}

/// Dictionary entries collected in insertion order. Bencode requires keys sorted by their raw bytes.
#[derive(Default)]
struct DictEntries {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl DictEntries {
    fn push(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.push((key, value));
    }

    fn write_sorted<W: Write>(mut self, serializer: &mut Serializer<'_, W>) -> Result<(), Error> {
        self.entries.sort_by(|(lkey, _), (rkey, _)| lkey.cmp(rkey));
        if self.entries.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(ErrorKind::BadInputData("duplicate dictionary key").into());
        }

        serializer.write_raw(b"d")?;
        for (key, value) in self.entries.iter() {
            (&mut *serializer).serialize_bytes(key)?;
            serializer.write_raw(value)?;
        }
        serializer.write_raw(b"e")
    }
}

pub struct SerializeMap<'a, 'w, W: Write> {
    serializer: &'a mut Serializer<'w, W>,
    entries: DictEntries,
    pending_key: Option<Vec<u8>>,
}

impl<'a, 'w, W: Write> serde::ser::SerializeMap for SerializeMap<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: serde::Serialize,
    {
        self.pending_key = Some(raw_key(encode_to_vec(key)?)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: serde::Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| ErrorKind::Custom("bug: map value serialized before its key".to_string()))?;
        self.entries.push(key, encode_to_vec(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.entries.write_sorted(self.serializer)
    }
}

pub struct SerializeStruct<'a, 'w, W: Write> {
    serializer: &'a mut Serializer<'w, W>,
    entries: DictEntries,
}

impl<'a, 'w, W: Write> serde::ser::SerializeStruct for SerializeStruct<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: serde::Serialize,
    {
        self.entries.push(key.as_bytes().to_vec(), encode_to_vec(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.entries.write_sorted(self.serializer)
    }
}

pub struct SerializeSeq<'a, 'w, W: Write> {
    serializer: &'a mut Serializer<'w, W>,
}

impl<'a, 'w, W: Write> serde::ser::SerializeSeq for SerializeSeq<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: serde::Serialize,
    {
        value.serialize(&mut *self.serializer)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.serializer.write_raw(b"e")
    }
}

impl<'a, 'w, W: Write> serde::ser::SerializeTuple for SerializeSeq<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        serde::ser::SerializeSeq::end(self)
    }
}

impl<'a, 'w, W: Write> serde::ser::SerializeTupleStruct for SerializeSeq<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        serde::ser::SerializeSeq::end(self)
    }
}

pub struct SerializeTupleVariant<'a, 'w, W: Write> {
    serializer: &'a mut Serializer<'w, W>,
}

impl<'a, 'w, W: Write> serde::ser::SerializeTupleVariant for SerializeTupleVariant<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        value.serialize(&mut *self.serializer)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        // Closes both the list and the wrapping single-key dictionary
        self.serializer.write_raw(b"ee")
    }
}

pub struct SerializeStructVariant<'a, 'w, W: Write> {
    serializer: &'a mut Serializer<'w, W>,
    entries: DictEntries,
}

impl<'a, 'w, W: Write> serde::ser::SerializeStructVariant for SerializeStructVariant<'a, 'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.entries.push(key.as_bytes().to_vec(), encode_to_vec(value)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.entries.write_sorted(&mut *self.serializer)?;
        self.serializer.write_raw(b"e")
    }
}

impl<'a, 'w, W: Write> serde::ser::Serializer for &'a mut Serializer<'w, W> {
    type Ok = ();
    type Error = Error;

    type SerializeTuple = SerializeSeq<'a, 'w, W>;
    type SerializeTupleStruct = SerializeSeq<'a, 'w, W>;
    type SerializeTupleVariant = SerializeTupleVariant<'a, 'w, W>;
    type SerializeSeq = SerializeSeq<'a, 'w, W>;
    type SerializeMap = SerializeMap<'a, 'w, W>;
    type SerializeStruct = SerializeStruct<'a, 'w, W>;
    type SerializeStructVariant = SerializeStructVariant<'a, 'w, W>;

    fn serialize_bool(self, _v: bool) -> Result<Self::Ok, Self::Error> {
        Err(ErrorKind::Unsupported("bool").into())
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.output.write_fmt(format_args!("i{v}e")).map_err(Error::from)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        // The decoder only accepts values that fit into i64
        if v > i64::MAX as u64 {
            return Err(ErrorKind::Unsupported("integers larger than i64::MAX").into());
        }
        self.output.write_fmt(format_args!("i{v}e")).map_err(Error::from)
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok, Self::Error> {
        Err(ErrorKind::Unsupported("f32").into())
    }

    fn serialize_f64(self, _v: f64) -> Result<Self::Ok, Self::Error> {
        Err(ErrorKind::Unsupported("f64").into())
    }

    fn serialize_char(self, _v: char) -> Result<Self::Ok, Self::Error> {
        Err(ErrorKind::Unsupported("char").into())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.serialize_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        let len = v.len();
        self.output.write_fmt(format_args!("{len}:")).map_err(Error::from)?;
        self.write_raw(v)
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.serialize_str("")
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.serialize_str("")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.serialize_str("")
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        let mut map_serializer = self.serialize_map(Some(1))?;
        serde::ser::SerializeMap::serialize_entry(&mut map_serializer, variant, "")?;
        serde::ser::SerializeMap::end(map_serializer)
    }

    fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize,
    {
        let mut map_serializer = self.serialize_map(Some(1))?;
        serde::ser::SerializeMap::serialize_entry(&mut map_serializer, variant, value)?;
        serde::ser::SerializeMap::end(map_serializer)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        self.write_raw(b"l")?;
        Ok(SerializeSeq { serializer: self })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.write_raw(b"d")?;
        variant.serialize(&mut *self)?;
        self.write_raw(b"l")?;
        Ok(SerializeTupleVariant { serializer: self })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(SerializeMap {
            serializer: self,
            entries: DictEntries::default(),
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(SerializeStruct {
            serializer: self,
            entries: DictEntries::default(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        self.write_raw(b"d")?;
        variant.serialize(&mut *self)?;
        Ok(SerializeStructVariant {
            serializer: self,
            entries: DictEntries::default(),
        })
    }
}

pub fn to_bytes<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    encode_to_vec(value)
}

pub fn to_string<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, Error> {
    let buff = to_bytes(value)?;
    String::from_utf8(buff).map_err(|e| ErrorKind::Custom(e.to_string()).into())
}

pub fn to_writer<T: serde::Serialize + ?Sized, W: Write>(value: &T, writer: &mut W) -> Result<(), Error> {
    let mut serializer = Serializer { output: writer };
    value.serialize(&mut serializer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::Serialize;

    use super::*;

    #[test]
    fn struct_fields_are_sorted_by_raw_key() {
        #[derive(Serialize)]
        struct Unordered {
            zebra: i64,
            #[serde(rename = "piece length")]
            piece_length: i64,
            apple: &'static str,
        }

        let value = Unordered {
            zebra: 1,
            piece_length: 2,
            apple: "x",
        };
        let serialized = to_string(&value).expect("failed to serialize a struct");
        assert_eq!(serialized, "d5:apple1:x12:piece lengthi2e5:zebrai1ee");
    }

    #[test]
    fn map_entries_are_sorted_regardless_of_insertion_order() {
        let map = HashMap::from([("b", 2i64), ("a", 1), ("c", 3), ("ab", 4)]);
        let serialized = to_string(&map).expect("failed to serialize a map");
        assert_eq!(serialized, "d1:ai1e2:abi4e1:bi2e1:ci3ee");
    }

    #[test]
    fn keys_are_compared_as_raw_bytes() {
        // Uppercase letters sort before lowercase ones, and a prefix before its extensions
        let map = BTreeMap::from([("a", 1i64), ("B", 2), ("aa", 3)]);
        let serialized = to_string(&map).expect("failed to serialize a map");
        assert_eq!(serialized, "d1:Bi2e1:ai1e2:aai3ee");
    }

    #[test]
    fn skipped_optional_fields_are_absent() {
        #[derive(Serialize)]
        struct WithOptional {
            #[serde(skip_serializing_if = "Option::is_none")]
            source: Option<String>,
            length: u64,
        }

        let value = WithOptional {
            source: None,
            length: 5,
        };
        assert_eq!(to_string(&value).expect("failed to serialize"), "d6:lengthi5ee");
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let map = BTreeMap::from([(1i64, 1i64)]);
        let err = to_bytes(&map).expect_err("integer keys must be rejected");
        assert!(matches!(err.kind, ErrorKind::Unsupported(_)));
    }

    #[test]
    fn negative_and_zero_integers() {
        assert_eq!(to_string(&0i64).expect("failed to serialize zero"), "i0e");
        assert_eq!(to_string(&-42i64).expect("failed to serialize a negative"), "i-42e");
    }

    #[test]
    fn huge_unsigned_integers_are_rejected() {
        assert!(to_bytes(&u64::MAX).is_err());
    }

    #[test]
    fn writer_receives_the_same_bytes() {
        let value = vec![1i64, 2, 3];
        let mut buff = Vec::new();
        to_writer(&value, &mut buff).expect("failed to serialize into a writer");
        assert_eq!(buff, to_bytes(&value).expect("failed to serialize into bytes"));
    }
}
