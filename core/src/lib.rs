//! Core wire types shared between the RPC endpoints and the transport
//! layer: hex-encoded scalars, the polymorphic block tag, log filter
//! predicates and subscription bindings.

pub mod eth;
