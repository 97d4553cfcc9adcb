//! HTTP transport for the `/run` endpoint.

pub mod run;
