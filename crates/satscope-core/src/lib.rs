pub mod decode;
pub mod error;
pub mod models;
pub mod normalize;
pub mod schema;

pub use decode::{decode, decode_hex_id, decode_text, FromJson, Node};
pub use error::DecodeError;
pub use normalize::FeeBand;

/// Length in hex characters of a txid or block hash.
pub const HEX_ID_LEN: usize = 64;

/// True for a 64 character hex string (txid or block hash).
pub fn is_hex_id(s: &str) -> bool {
    s.len() == HEX_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
