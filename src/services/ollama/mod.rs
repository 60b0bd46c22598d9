pub mod client;
pub mod models;
pub mod transport;

pub use client::{OllamaClient, DEFAULT_SERVER_ADDRESS};
pub use transport::{Timeouts, Transport};
