//! Access-token storage.
//!
//! Obtaining a token is someone else's job; the cache only needs to keep the
//! bearer token for authenticated endpoints somewhere safe between runs.
//! `TokenStore` keeps it in the OS keychain via keyring.

pub mod credentials;

pub use credentials::TokenStore;
