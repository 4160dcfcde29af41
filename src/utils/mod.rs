//! Shared helpers: path normalisation, content hashing, encoding-aware reads.

pub mod encoding;
pub mod hashing;
pub mod indent;
pub mod paths;

pub use encoding::{decode_bytes, encode_text, is_binary_bytes, DecodedText};
pub use hashing::content_hash;
pub use paths::{file_name, join_path, normalize_path, parent_path, strip_extension};
