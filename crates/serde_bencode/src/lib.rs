//! Canonical bencode for serde.
//!
//! Dictionaries are always written with their keys sorted, and the decoder rejects anything that
//! isn't in the single canonical form, so `to_bytes(from_bytes(b)) == b` holds for every accepted input.

mod de;
mod error;
mod ser;
mod value;

pub use de::{from_bytes, from_str, BencodeDeserializer, MAX_DEPTH};
pub use error::{Error, ErrorKind};
pub use ser::{to_bytes, to_string, to_writer, Serializer};
pub use value::{BencodeValue, Bytes};
