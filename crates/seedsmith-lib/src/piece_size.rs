use crate::{Error, Result};

pub const MIN_PIECE_SIZE: u64 = 1 << 14;
/// Upper bound for automatically selected piece sizes. Manual sizes above it are allowed.
pub const MAX_PIECE_SIZE: u64 = 1 << 26;
/// Automatic selection aims at roughly this many pieces
pub const TARGET_PIECE_COUNT: u64 = 1500;

const MIN_PIECE_SIZE_LOG2: u32 = MIN_PIECE_SIZE.trailing_zeros();
const MAX_PIECE_SIZE_LOG2: u32 = MAX_PIECE_SIZE.trailing_zeros();

/// Number of bytes hashed into each piece. Always a power of two, at least 16 KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceSize(u64);

impl PieceSize {
    /// Validates a user-provided piece size
    pub fn new(size: u64) -> Result<Self> {
        if !size.is_power_of_two() {
            return Err(Error::InvalidPieceSize(size, "piece size must be a power of 2 bytes"));
        }
        if size < MIN_PIECE_SIZE {
            return Err(Error::InvalidPieceSize(size, "piece size should be at least 16 KiB"));
        }
        if size > MAX_PIECE_SIZE {
            tracing::warn!(size, "piece size is greater than 64 MiB");
        }
        Ok(PieceSize(size))
    }

    /// Picks the smallest power of two in `[16 KiB, 64 MiB]` that keeps the piece count at or below
    /// [`TARGET_PIECE_COUNT`]
    pub fn auto(total_length: u64) -> Self {
        let mut exponent = MIN_PIECE_SIZE_LOG2;
        while exponent < MAX_PIECE_SIZE_LOG2 && total_length > TARGET_PIECE_COUNT << exponent {
            exponent += 1;
        }
        PieceSize(1 << exponent)
    }

    /// Uses the manual size if there is one
    pub fn select(total_length: u64, manual: Option<PieceSize>) -> Self {
        manual.unwrap_or_else(|| PieceSize::auto(total_length))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn piece_count(self, total_length: u64) -> u64 {
        total_length.div_ceil(self.0)
    }

    /// Length of the piece at `idx`. Every piece is full-sized except possibly the last one.
    pub fn piece_length(self, total_length: u64, idx: u64) -> u64 {
        if idx + 1 == self.piece_count(total_length) {
            match total_length % self.0 {
                0 => self.0,
                remainder => remainder,
            }
        } else {
            self.0
        }
    }
}

impl TryFrom<u64> for PieceSize {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self> {
        PieceSize::new(value)
    }
}

impl std::fmt::Display for PieceSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
