//! Shared helpers: date parsing, content hashing, output minification.

pub mod date;
pub mod hash;
pub mod minify;
