pub mod feed;
pub mod filter;
pub mod service;

pub use feed::ListingFeed;
pub use filter::{FilterSpec, PriceRange};
pub use service::{ListingPage, ListingService, TrackOutcome};
