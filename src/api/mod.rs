//! Client for the document library and chat backend

mod client;
mod types;

pub use client::ApiClient;
pub use types::*;
