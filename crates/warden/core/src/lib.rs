//! Core types for the warden wallet engine.
//!
//! This crate holds everything that is pure data and pure logic: CAIP-2 and
//! CAIP-10 identifiers, CAIP-25 scope validation and merging, the single
//! permission caveat that replaces the legacy `eth_accounts` and
//! permitted-chains permissions, the adapters that translate between the two
//! permission models, and the typed wallet RPC request parameters with their
//! validators.
//!
//! Nothing in here performs IO or talks to a host. The engine crate wires
//! these types to host hooks.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod adapters;
pub mod caip;
pub mod caveat;
pub mod request;
pub mod scope;
pub mod serde_helpers;
