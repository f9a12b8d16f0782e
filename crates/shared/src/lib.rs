//! Types shared between the marketplace API client and the UI flows.

pub mod domain;
pub mod error;
pub mod protocol;
