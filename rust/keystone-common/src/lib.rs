#![warn(missing_docs)]

//! This crate constitutes a library of light weight helpers that are shared
//! across the keystone crates. Their chief quality is that they have
//! virtually zero dependencies.

mod sync;
pub use sync::*;

pub mod nonce;
pub use nonce::generate_nonce;

pub mod time;
