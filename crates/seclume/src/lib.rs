//! Seclume: password-authenticated encrypted compressed archives.
//!
//! A `.slm` archive is a fixed-layout header followed by a sequence of
//! per-file records. Two AES-256-GCM keys are derived from the password with
//! PBKDF2-SHA256: the *meta key* seals per-entry metadata and the header's
//! comment and output-directory regions, while the *file key* seals the
//! compressed file payloads and authenticates the header with HMAC-SHA256.
//! Wrong passwords and tampered headers are indistinguishable failures.
//!
//! [`encode::Encoder`] produces archives, [`decode::Decoder`] verifies and
//! walks them, and [`extract`] / [`list`] build the two consumer operations
//! on top of the decoder.

#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

#[doc(inline)]
pub use self::constants::*;
mod constants;

pub mod codec;
pub mod crypto;
pub mod decode;
pub mod encode;
pub mod error;
pub mod extract;
pub mod format;
pub mod keys;
pub mod list;
