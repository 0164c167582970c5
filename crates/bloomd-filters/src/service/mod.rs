//! Filter manager service
//!
//! Orchestration over the domain: the manager itself, the client
//! registry feeding the reclamation watermark, the background vacuum,
//! and the one-shot startup discovery.

mod clients;
mod discovery;
mod manager;
mod vacuum;


pub use manager::FilterManager;
