//! Core entities for a Bluetooth Mesh node: security keys with their derived
//! material, fixed-layout persistence records, the tag addressing scheme,
//! provisioning output, and proxy advertising payloads.
//!
//! Orchestration (event loop, storage backends, lifecycle) lives in
//! `bluemesh-node`; this crate is pure data and codecs, usable without std.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod advertising;
pub mod error;
pub mod keys;
pub mod provisioning;
pub mod record;
pub mod tag;
pub mod types;
