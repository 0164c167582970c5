//! Port traits (hexagonal seams)

pub mod outbound;

pub use outbound::{FilterBackend, FilterProvider};
