//! Warden: a CAIP-25 permission and chain-switching engine for EVM wallet
//! hosts.
//!
//! The engine reconciles the legacy dapp-facing permission surface
//! (`eth_requestAccounts`, `wallet_addEthereumChain`,
//! `wallet_switchEthereumChain`, `wallet_requestPermissions`) with the
//! CAIP-25 multichain session model: one permission per origin, one caveat
//! holding the authorized scopes, and adapters deriving the flat legacy
//! views from it.
//!
//! Hosts construct a [`WalletApi`] over implementations of the hook traits
//! in [`hooks`] and feed it method calls, either pre-parsed through
//! [`WalletApi::execute`] or as raw JSON-RPC via
//! [`handler::handle_request`]. The engine holds no state beyond its
//! per-origin concurrency guards; everything durable lives behind the
//! hooks.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod api;
mod chains;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod locks;
pub mod metrics;
pub mod session;

pub use api::WalletApi;
pub use error::WalletError;
