pub mod api;
pub mod config;
pub mod converter;
pub mod errors;
pub mod manifest;
pub mod module;
mod utils;
pub mod verify;

pub use api::Wasm2TsError;
pub use config::Config;
pub use converter::{convert, ConversionReport, ConvertError, EntryError};
pub use manifest::Manifest;
