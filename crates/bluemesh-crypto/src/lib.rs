//! Derivation of Bluetooth Mesh security material.
//!
//! Implements the `s1`, `k1`, `k2`, `k3` and `k4` derivation functions from
//! the Mesh Profile specification (section 3.8.2), all built on AES-CMAC,
//! plus the identity hash used for node identity advertising. The functions
//! here are pure and stateless; network and application key entities that
//! consume them live in higher crates.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod cmac;
pub mod derive;
