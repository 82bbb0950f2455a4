//! Marketplace API Adapter
//!
//! Implements the HTTP client for the marketplace REST API: order book
//! queries, collection metadata, and posting of signed offers and
//! listings.
//!
//! Sub-modules:
//! - `auth`: API key authentication
//! - `client`: HTTP client with pacing, concurrency cap and retries
//! - `orders`: `MarketplaceApi` implementation and order assembly
//! - `types`: API request/response type definitions

pub mod auth;
pub mod client;
pub mod orders;
pub mod types;

pub use auth::MarketplaceAuth;
pub use client::{MarketplaceClient, MarketplaceClientConfig};
pub use orders::OpenSeaMarketplace;
