use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::{Deserializer, Serialize};

/// A bencode byte string. Ordered by raw bytes, which is the order dictionary keys are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes<'a>(pub Cow<'a, [u8]>);

impl<'a> Serialize for Bytes<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

/// Lets dictionaries be queried with plain byte slices
impl Borrow<[u8]> for Bytes<'_> {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl<'a> From<&'a [u8]> for Bytes<'a> {
    fn from(value: &'a [u8]) -> Self {
        Bytes(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a str> for Bytes<'a> {
    fn from(value: &'a str) -> Self {
        Bytes(Cow::Borrowed(value.as_bytes()))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BencodeValue<'a> {
    Int(i64),
    Bytes(Bytes<'a>),
    List(Vec<BencodeValue<'a>>),
    Dict(BTreeMap<Bytes<'a>, BencodeValue<'a>>),
}

impl<'a> BencodeValue<'a> {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            BencodeValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::Bytes(value) => Some(&value.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn as_list(&self) -> Option<&[BencodeValue<'a>]> {
        match self {
            BencodeValue::List(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Bytes<'a>, BencodeValue<'a>>> {
        match self {
            BencodeValue::Dict(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up a key if the value is a dictionary
    pub fn get(&self, key: &[u8]) -> Option<&BencodeValue<'a>> {
        self.as_dict()?.get(key)
    }
}

impl<'a, 'de: 'a> serde::de::Deserialize<'de> for BencodeValue<'a> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor<'a> {
            lifetime: PhantomData<BencodeValue<'a>>,
        }

        impl<'a, 'de: 'a> serde::de::Visitor<'de> for Visitor<'a> {
            type Value = BencodeValue<'a>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a valid bencode value")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(v.into())
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut v: Vec<BencodeValue<'a>> = Vec::new();
                while let Some(value) = seq.next_element()? {
                    v.push(value);
                }
                Ok(v.into())
            }

            fn visit_borrowed_bytes<E>(self, v: &'de [u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(v.into())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut dict = BTreeMap::new();
                while let Some(key) = map.next_key::<&'de [u8]>()? {
                    let value = map.next_value()?;
                    dict.insert(Bytes(Cow::Borrowed(key)), value);
                }
                Ok(dict.into())
            }
        }

        deserializer.deserialize_any(Visitor { lifetime: PhantomData })
    }
}

impl From<i64> for BencodeValue<'_> {
    fn from(value: i64) -> Self {
        BencodeValue::Int(value)
    }
}

impl<'a> From<&'a [u8]> for BencodeValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        BencodeValue::Bytes(Bytes(Cow::Borrowed(value)))
    }
}

impl From<String> for BencodeValue<'_> {
    fn from(s: String) -> Self {
        BencodeValue::Bytes(Bytes(Cow::Owned(s.into_bytes())))
    }
}

impl<'a> From<&'a str> for BencodeValue<'a> {
    fn from(v: &'a str) -> Self {
        BencodeValue::Bytes(Bytes(Cow::Borrowed(v.as_bytes())))
    }
}

impl From<Vec<u8>> for BencodeValue<'_> {
    fn from(value: Vec<u8>) -> Self {
        BencodeValue::Bytes(Bytes(Cow::Owned(value)))
    }
}

impl<'a> From<Vec<BencodeValue<'a>>> for BencodeValue<'a> {
    fn from(value: Vec<BencodeValue<'a>>) -> Self {
        BencodeValue::List(value)
    }
}

impl<'a> From<BTreeMap<Bytes<'a>, BencodeValue<'a>>> for BencodeValue<'a> {
    fn from(value: BTreeMap<Bytes<'a>, BencodeValue<'a>>) -> Self {
        BencodeValue::Dict(value)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::{from_bytes, from_str, to_bytes, to_string};

    mod tree {
        use super::*;

        #[test]
        fn nested_values_encode_canonically() {
            let inner = BTreeMap::from([(Bytes::from("inner"), BencodeValue::Dict(BTreeMap::new()))]);
            let value: BencodeValue = vec![
                BencodeValue::from(-888i64),
                "a nice value".into(),
                vec![BencodeValue::from(20i64)].into(),
                inner.into(),
            ]
            .into();

            let serialized = to_string(&value).expect("failed to serialize a tree");
            assert_eq!(serialized, "li-888e12:a nice valueli20eed5:innerdeee");
            let deserialized = from_str::<BencodeValue>(&serialized).expect("failed to deserialize a tree");
            assert_eq!(deserialized, value);
        }

        #[test]
        fn decoded_bytes_borrow_from_the_input() {
            let input = b"l3:abce";
            let value: BencodeValue = from_bytes(input).expect("failed to deserialize a list");
            let list = value.as_list().expect("a list was decoded");
            assert!(matches!(&list[0], BencodeValue::Bytes(Bytes(Cow::Borrowed(b"abc")))));
        }
    }

    mod dictionaries {
        use super::*;

        #[test]
        fn keys_are_ordered_by_raw_bytes() {
            let dict = BTreeMap::from([
                (Bytes::from(&b"\xff"[..]), BencodeValue::from(1i64)),
                (Bytes::from("a"), 2i64.into()),
                (Bytes::from("B"), 3i64.into()),
                (Bytes::from(""), 4i64.into()),
                (Bytes::from("ab"), 5i64.into()),
            ]);
            let encoded = to_bytes(&BencodeValue::from(dict)).expect("failed to serialize a dict");
            assert_eq!(encoded, b"d0:i4e1:Bi3e1:ai2e2:abi5e1:\xffi1ee");
        }

        #[test]
        fn binary_keys_survive_a_round_trip() {
            let input = b"d1:\x00i1e1:\xffi2ee";
            let value: BencodeValue = from_bytes(input).expect("failed to deserialize binary keys");
            assert_eq!(value.get(b"\xff").and_then(BencodeValue::as_int), Some(2));
            assert_eq!(to_bytes(&value).expect("failed to reencode"), input);
        }
    }

    mod serde_shapes {
        use super::*;

        #[test]
        fn none_is_an_empty_string() {
            let none: Option<i64> = None;
            assert_eq!(to_string(&none).expect("failed to serialize None"), "0:");
            assert_eq!(from_str::<Option<i64>>("0:").expect("failed to deserialize None"), None);
            assert_eq!(from_str::<Option<i64>>("i10e").expect("failed to deserialize Some"), Some(10));
        }

        #[test]
        fn struct_with_renamed_and_skipped_fields() {
            #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
            struct Piece<'a> {
                #[serde(rename = "piece length")]
                piece_length: u64,
                name: &'a str,
                #[serde(default, skip_serializing_if = "Option::is_none")]
                private: Option<u8>,
            }

            let value = Piece {
                piece_length: 16_384,
                name: "test",
                private: None,
            };
            let serialized = to_string(&value).expect("failed to serialize a struct");
            assert_eq!(serialized, "d4:name4:test12:piece lengthi16384ee");
            let deserialized = from_str::<Piece>(&serialized).expect("failed to deserialize a struct");
            assert_eq!(deserialized, value);
        }

        #[test]
        fn unsupported_types_are_rejected() {
            assert!(to_bytes(&true).is_err());
            assert!(to_bytes(&1.5f64).is_err());
            assert!(from_str::<bool>("i1e").is_err());
        }
    }

    mod accessors {
        use super::*;

        #[test]
        fn can_navigate_a_decoded_dictionary() {
            let input = b"d4:infod6:lengthi5e4:name3:fooe4:listli1ei2eee";
            let value: BencodeValue = from_bytes(input).expect("failed to deserialize a dict");
            let info = value.get(b"info").expect("info is missing");
            assert_eq!(info.get(b"length").and_then(BencodeValue::as_int), Some(5));
            assert_eq!(info.get(b"name").and_then(BencodeValue::as_str), Some("foo"));
            assert_eq!(value.get(b"list").and_then(BencodeValue::as_list).map(<[_]>::len), Some(2));
            assert!(value.get(b"missing").is_none());
            assert!(info.as_int().is_none());
        }

        #[test]
        fn dict_built_out_of_order_encodes_sorted() {
            let mut dict = BTreeMap::new();
            dict.insert(Bytes::from("zz"), BencodeValue::from(1i64));
            dict.insert(Bytes::from("aa"), BencodeValue::from(2i64));
            let value: BencodeValue = dict.into();
            let encoded = to_bytes(&value).expect("failed to serialize a dict");
            assert_eq!(encoded, b"d2:aai2e2:zzi1ee");
            let decoded: BencodeValue = from_bytes(&encoded).expect("failed to deserialize a dict");
            assert_eq!(decoded, value);
        }
    }
}
