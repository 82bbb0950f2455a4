//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (marketplace HTTP API, chain RPC, local key
//! signing). Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: marketplace REST client, auth, order book and order creation
//! - `chain`: wallet session, token contracts and Seaport settlement via alloy-rs

pub mod api;
pub mod chain;
