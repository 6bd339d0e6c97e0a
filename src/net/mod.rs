//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly by the server; this module holds
//! the TLS side (certificate loading for the rustls acceptor).

pub mod tls;
