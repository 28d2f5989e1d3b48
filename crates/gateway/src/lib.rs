//! HTTP client for the Memoir API, used by front-end hosts.
//!
//! Wraps every call in a [`GatewayOutcome`] so callers branch on what
//! actually happened instead of pattern-matching error strings. Expired
//! bearer tokens are refreshed transparently and the original request is
//! replayed exactly once.

pub mod client;
pub mod dto;
pub mod outcome;
pub mod tokens;

pub use client::{GatewayClient, ReauthHandler};
pub use outcome::GatewayOutcome;
pub use tokens::{TokenPair, TokenStore};
