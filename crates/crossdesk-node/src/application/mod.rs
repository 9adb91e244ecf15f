//! Application layer for the node daemon.
//!
//! # Sub-modules
//!
//! - **`providers`** – the collaborator traits the request service depends
//!   on: machine topology lookup and screen enumeration/capture.  The
//!   transport core calls these only through the service, so the core stays
//!   independently testable.
//!
//! - **`api_service`** – the message handler registered with the server
//!   endpoint; answers topology, screen-info, ping, and screenshot requests
//!   and fans heartbeats out to in-process observers.
//!
//! - **`remote`** – the requesting side: correlated request/response queries
//!   against a remote node over a client endpoint.

pub mod api_service;
pub mod providers;
pub mod remote;
