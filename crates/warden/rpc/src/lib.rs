//! Warden JSON-RPC wire types.
//!
//! The JSON-RPC 2.0 envelope for the dapp-facing wallet surface: method
//! calls, success/error responses, and the error-code space, which covers
//! the standard JSON-RPC codes plus the EIP-1193 provider codes dapps
//! expect from a wallet.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod error;
pub mod request;
pub mod response;
