/// Magic bytes at the start of every archive: `S`, `L`, `M`, NUL.
pub const SLM_MAGIC: [u8; 4] = [b'S', b'L', b'M', 0];

/// Archive format version written by the encoder.
pub const SLM_VERSION: u8 = 6;

/// Oldest archive format version the decoder accepts.
pub const SLM_VERSION_MIN: u8 = 4;

/// Maximum number of entries in one archive.
pub const MAX_FILES: u32 = 1000;

/// Maximum uncompressed size of a single entry, in bytes (10 GiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Size of the filename field in entry metadata, including the NUL.
pub const MAX_FILENAME: usize = 256;

/// Size of the encrypted comment region in the header.
pub const MAX_COMMENT_REGION: usize = 512;

/// Size of the encrypted output-directory region in the header.
pub const MAX_OUTDIR: usize = 320;

/// AES-256-GCM key size in bytes.
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// HMAC-SHA256 output size in bytes.
pub const HMAC_SIZE: usize = 32;

/// PBKDF2 salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count for key derivation.
pub const PBKDF2_ITERATIONS: u32 = 1_000_000;

/// Fixed overhead of a sealed header region beyond its ciphertext.
pub const SEALED_REGION_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Largest comment plaintext that fits its header region.
pub const COMMENT_PLAIN_MAX: usize = MAX_COMMENT_REGION - SEALED_REGION_OVERHEAD;

/// Largest stored-output-directory plaintext that fits its header region.
pub const OUTDIR_PLAIN_MAX: usize = MAX_OUTDIR - SEALED_REGION_OVERHEAD;
