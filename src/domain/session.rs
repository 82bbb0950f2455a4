//! Wallet session metadata and provider notifications.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Connection lifecycle of a wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Payload of a provider disconnect notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectInfo {
    pub code: i64,
    pub message: String,
}

/// Advisory notifications pushed by the wallet transport.
///
/// These only update [`SessionMeta`]; no flow step waits on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    ChainChanged { chain_id: u64 },
    AccountsChanged { accounts: Vec<Address> },
    Connected { chain_id: u64 },
    Disconnected(DisconnectInfo),
}

/// Signing authority handed out by a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub address: Address,
    pub chain_id: u64,
}

/// Observable state of one wallet session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub connection_state: ConnectionState,
    pub last_disconnect: Option<DisconnectInfo>,
}

impl Default for SessionMeta {
    fn default() -> Self {
        Self {
            address: None,
            chain_id: None,
            connection_state: ConnectionState::Disconnected,
            last_disconnect: None,
        }
    }
}

impl SessionMeta {
    /// Fold a provider notification into the metadata.
    pub fn apply(&mut self, event: &ProviderEvent) {
        match event {
            ProviderEvent::ChainChanged { chain_id } => self.chain_id = Some(*chain_id),
            ProviderEvent::AccountsChanged { accounts } => {
                self.address = accounts.first().copied();
            }
            ProviderEvent::Connected { chain_id } => {
                self.chain_id = Some(*chain_id);
                self.connection_state = ConnectionState::Connected;
            }
            ProviderEvent::Disconnected(info) => {
                self.last_disconnect = Some(info.clone());
                self.connection_state = ConnectionState::Disconnected;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_events() {
        let mut meta = SessionMeta::default();
        meta.apply(&ProviderEvent::Connected { chain_id: 8453 });
        assert_eq!(meta.connection_state, ConnectionState::Connected);
        assert_eq!(meta.chain_id, Some(8453));

        meta.apply(&ProviderEvent::ChainChanged { chain_id: 1 });
        assert_eq!(meta.chain_id, Some(1));

        let account = Address::repeat_byte(0x11);
        meta.apply(&ProviderEvent::AccountsChanged {
            accounts: vec![account],
        });
        assert_eq!(meta.address, Some(account));

        meta.apply(&ProviderEvent::Disconnected(DisconnectInfo {
            code: 4900,
            message: "bye".to_string(),
        }));
        assert_eq!(meta.connection_state, ConnectionState::Disconnected);
        assert_eq!(meta.last_disconnect.as_ref().map(|d| d.code), Some(4900));
    }
}
