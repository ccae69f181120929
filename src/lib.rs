pub mod error;
pub mod parse;
pub mod search;
pub mod types;
pub mod validate;
pub mod wasm;
