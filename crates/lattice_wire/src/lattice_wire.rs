//! Compact transport for topology documents: a dictionary-coded binary form,
//! optional gzip framing and symbol capacity estimates.

pub mod binary;
pub mod capacity;
pub mod compression;
mod config;
mod dictionary;
mod packager;
pub mod varint;

pub use binary::{DecodedPayload, EncodeOptions, WireError, decode, decode_with, encode, encode_with};
pub use capacity::{ErrorCorrection, SymbolEstimate};
pub use compression::{CompressionError, GZIP_AVAILABLE};
pub use config::PackagerConfig;
pub use dictionary::{Dictionary, DictionaryError, ESCAPE_LIMIT, Table};
pub use packager::{Package, Packager};
