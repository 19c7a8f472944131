//! GraphQL facade over the SGT (Multiembarcador) SOAP webservices.
//!
//! Callers select the SGT deployment and credentials of each request through
//! the `X-Target-WSDL` and `X-Auth-Token` headers. The facade binds that
//! deployment's WSDL, invokes the requested operation, and folds its flat
//! records into the load and invoice graph of [`models`].

pub mod cache;
pub mod graphql;
pub mod models;
pub mod normalize;
pub mod operations;
pub mod server;
pub mod service;

pub use service::{Outcome, ServiceClient, SoapTransport};
