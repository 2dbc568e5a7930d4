//! Backends, one per secret URI scheme. Plain values need none.

#[cfg(feature = "env")]
pub mod env;

#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "base64")]
pub mod base64;
