//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `WalletTransport`: Signer-backed wallet session
//! - `TokenContracts`: Token reads and approval writes
//! - `MarketplaceApi`: Order book queries and order creation
//! - `SettlementBackend`: Order fulfillment

pub mod marketplace;
pub mod settlement;
pub mod token_contracts;
pub mod wallet;
