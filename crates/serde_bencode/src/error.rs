use std::fmt;

/// A bencode error. Decoding errors carry the byte offset at which they were detected.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub position: Option<usize>,
}

impl Error {
    pub fn set_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{} (at byte {})", self.kind, position),
            None => fmt::Display::fmt(&self.kind, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ErrorKind::Custom(msg.to_string()).into()
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ErrorKind::Custom(msg.to_string()).into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind, position: None }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        ErrorKind::Io(e).into()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("{0}")]
    Custom(String),
    #[error("failed to write bencode: {0}")]
    Io(#[source] std::io::Error),
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),
    #[error("malformed input: {0}")]
    BadInputData(&'static str),
    #[error("input is not canonical: {0}")]
    NonCanonical(&'static str),
    #[error("bencode doesn't support {0}")]
    Unsupported(&'static str),
    #[error("{0} trailing byte(s) after the value")]
    TrailingBytes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_the_offset() {
        let err = Error::from(ErrorKind::NonCanonical("duplicate dictionary key")).set_position(7);
        assert_eq!(err.to_string(), "input is not canonical: duplicate dictionary key (at byte 7)");
        assert_eq!(Error::from(ErrorKind::TrailingBytes(3)).to_string(), "3 trailing byte(s) after the value");
    }
}
