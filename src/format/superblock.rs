use crate::{
    version::{LibraryVersion, VersionBounds},
    wire::WireReader,
};

use super::FormatError;

/// The container signature.
pub const SIGNATURE: [u8; 8] = *b"\x89RCF\r\n\x1a\n";

/// The size in bytes of an encoded [`Superblock`].
pub const SUPERBLOCK_SIZE: usize = 48;

/// The newest superblock version this crate can read.
pub const SUPERBLOCK_VERSION_MAX: u8 = 1;

/// Offset of the superblock checksum, which covers all preceding bytes.
const SUPERBLOCK_CHECKSUM_OFFSET: usize = 40;

/// A container superblock.
///
/// ```text
/// offset  size  field
/// 0       8     signature
/// 8       1     superblock version
/// 9       1     low bound code
/// 10      1     high bound code
/// 11      5     reserved
/// 16      8     metadata length (u64 LE)
/// 24      8     data length (u64 LE)
/// 32      4     metadata crc32c
/// 36      4     data crc32c
/// 40      4     superblock crc32c (bytes 0..40)
/// 44      4     reserved
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    /// The superblock version.
    pub version: u8,
    /// The version bounds of the session that wrote the container.
    pub bounds: VersionBounds,
    /// The length of the metadata block.
    pub metadata_length: u64,
    /// The length of the data segment.
    pub data_length: u64,
    /// The crc32c checksum of the metadata block.
    pub metadata_checksum: u32,
    /// The crc32c checksum of the data segment.
    pub data_checksum: u32,
}

impl Superblock {
    /// Encode the superblock.
    #[must_use]
    pub fn encode(&self) -> [u8; SUPERBLOCK_SIZE] {
        let mut bytes = [0; SUPERBLOCK_SIZE];
        bytes[0..8].copy_from_slice(&SIGNATURE);
        bytes[8] = self.version;
        bytes[9] = self.bounds.low().code();
        bytes[10] = self.bounds.high().code();
        bytes[16..24].copy_from_slice(&self.metadata_length.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.data_length.to_le_bytes());
        bytes[32..36].copy_from_slice(&self.metadata_checksum.to_le_bytes());
        bytes[36..40].copy_from_slice(&self.data_checksum.to_le_bytes());
        let checksum = crc32c::crc32c(&bytes[..SUPERBLOCK_CHECKSUM_OFFSET]);
        bytes[40..44].copy_from_slice(&checksum.to_le_bytes());
        bytes
    }

    /// Decode a superblock from the start of `bytes`.
    ///
    /// The superblock checksum is validated if `validate_checksum` is true.
    ///
    /// # Errors
    /// Returns a [`FormatError`] if the signature is invalid, `bytes` is too short, the checksum does not match, or the superblock version or version bounds are not supported.
    pub fn decode(bytes: &[u8], validate_checksum: bool) -> Result<Self, FormatError> {
        if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
            return Err(FormatError::InvalidSignature);
        }
        let mut reader = WireReader::new(bytes);
        let _signature = reader.read_bytes(SIGNATURE.len())?;
        let version = reader.read_u8()?;
        let low = reader.read_u8()?;
        let high = reader.read_u8()?;
        let _reserved = reader.read_bytes(5)?;
        let metadata_length = reader.read_u64()?;
        let data_length = reader.read_u64()?;
        let metadata_checksum = reader.read_u32()?;
        let data_checksum = reader.read_u32()?;
        let checksum = reader.read_u32()?;
        let _reserved = reader.read_u32()?;

        if validate_checksum {
            let computed = crc32c::crc32c(&bytes[..SUPERBLOCK_CHECKSUM_OFFSET]);
            if computed != checksum {
                return Err(FormatError::ChecksumMismatch {
                    region: "superblock",
                    stored: checksum,
                    computed,
                });
            }
        }
        if version > SUPERBLOCK_VERSION_MAX {
            return Err(FormatError::UnsupportedSuperblockVersion(version));
        }
        let low = LibraryVersion::from_code(low).ok_or(FormatError::UnknownLibraryVersion(low))?;
        let high =
            LibraryVersion::from_code(high).ok_or(FormatError::UnknownLibraryVersion(high))?;

        Ok(Self {
            version,
            bounds: VersionBounds::new(low, high),
            metadata_length,
            data_length,
            metadata_checksum,
            data_checksum,
        })
    }
}
