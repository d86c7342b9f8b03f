//! Outbound HTTP service layer
//!
//! The call executor talks to data sources through the [`HttpClient`]
//! trait so tests can swap in a programmable mock.

mod http;

pub use http::{ApiResponse, HttpClient, MockHttpClient, ReqwestHttpClient};
