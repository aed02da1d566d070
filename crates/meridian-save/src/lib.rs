// SPDX-License-Identifier: Apache-2.0
//! meridian-save: the DMSG tagged-chunk save container.
//!
//! A save is a bit-exact little-endian container: a fixed header (magic,
//! version, endian sentinel, UPS, tick, seed, feature epoch, content TLV)
//! followed by tagged chunks, one per subsystem, plus an identity chunk
//! binding the save to its instance, run, and content set. Loading
//! reapplies every chunk through the same invariants as normal mutation,
//! so a malformed save can only surface `Format`/`Migration` — never a
//! half-restored kernel that passes its own world hash.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

mod container;
mod identity;
mod wire;

pub use container::{
    load_save, write_save, SaveError, DMSG_ENDIAN, DMSG_MAGIC, DMSG_VERSION,
};
pub use identity::{
    build_identity_tlv, parse_identity_tlv, IdentityBlock, IDENTITY_SCHEMA_VERSION,
};
