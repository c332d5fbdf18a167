//! Network transport used by the caching source.
//!
//! The caching source never talks to reqwest directly. It is generic over a
//! [`Transport`], which keeps the coordination logic testable with scripted
//! transports and leaves connection pooling and TLS to the implementation.

mod http;
mod types;

pub use http::{canonical_header_name, ReqwestTransport, Transport};
pub use types::{
    Method, Response, ResponseSource, TransportError, TransportRequest, ETAG_HEADER,
    LAST_MODIFIED_HEADER,
};
