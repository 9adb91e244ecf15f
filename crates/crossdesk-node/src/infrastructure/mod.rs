//! Infrastructure layer for the node daemon.
//!
//! Contains the OS-facing adapters: TCP transport endpoints, the screen
//! source, and file-system configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `crossdesk_core`, but MUST NOT be imported by the `application` layer —
//! with the deliberate exception of the `network` endpoint types, which *are*
//! the transport surface the application's handlers and remote queries are
//! written against.

pub mod network;
pub mod screens;
pub mod storage;
