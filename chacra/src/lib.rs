//! The Chacra Library.
//!
//! Types and utilities shared between the server and its tooling:
//! the binary metadata wire format, artifact checksums and field
//! validation.

#![deny(
    asm_sub_register,
    deprecated,
    missing_abi,
    unsafe_code,
    unused_macros,
    unused_must_use,
    unused_unsafe
)]
#![deny(clippy::from_over_into, clippy::needless_question_mark)]
#![cfg_attr(
    not(debug_assertions),
    deny(unused_imports, unused_mut, unused_variables,)
)]

pub mod api;
pub mod binary;
pub mod checksum;
pub mod error;
pub mod io;
pub mod util;

pub use error::{ChacraError, ChacraResult};
