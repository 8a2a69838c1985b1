use std::fmt;

use data_encoding::BASE32;

/// SHA1 of the canonical bencoding of the `info` dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    pub fn new(hash: [u8; 20]) -> Self {
        InfoHash(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// 40 lowercase hex characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 32 uppercase base32 characters, as used by older magnet links
    pub fn to_base32(&self) -> String {
        BASE32.encode(&self.0)
    }

    /// `magnet:?xt=urn:btih:<hex>&dn=<name>&tr=<tracker>...`
    pub fn magnet_link<'a>(&self, name: &str, trackers: impl IntoIterator<Item = &'a str>) -> String {
        let mut link = format!("magnet:?xt=urn:btih:{}", self.to_hex());
        link.push_str("&dn=");
        link.extend(form_urlencoded::byte_serialize(name.as_bytes()));
        for tracker in trackers {
            link.push_str("&tr=");
            link.extend(form_urlencoded::byte_serialize(tracker.as_bytes()));
        }
        link
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(hash: [u8; 20]) -> Self {
        InfoHash(hash)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InfoHash {
        let mut hash = [0u8; 20];
        hash.iter_mut().enumerate().for_each(|(i, byte)| *byte = i as u8 * 13);
        InfoHash::new(hash)
    }

    #[test]
    fn hex_is_lowercase_and_40_chars() {
        let hex = sample().to_hex();
        assert_eq!(hex.len(), 40);
        assert!(hex.starts_with("000d1a27"));
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(sample().to_string(), hex);
    }

    #[test]
    fn base32_is_32_chars() {
        let encoded = InfoHash::new([0; 20]).to_base32();
        assert_eq!(encoded, "A".repeat(32));
        assert_eq!(sample().to_base32().len(), 32);
    }

    #[test]
    fn magnet_link_escapes_name_and_trackers() {
        let link = InfoHash::new([0xFF; 20]).magnet_link("my file", ["http://t.example/a?x=1"]);
        assert_eq!(
            link,
            format!(
                "magnet:?xt=urn:btih:{}&dn=my+file&tr=http%3A%2F%2Ft.example%2Fa%3Fx%3D1",
                "f".repeat(40)
            )
        );
    }
}
