//! Wallet Session Use Case - Connection Lifecycle
//!
//! Wraps a `WalletTransport` for the duration of one run: connects,
//! keeps `SessionMeta` current from provider notifications and releases
//! the transport exactly once.
//!
//! Notifications are drained without blocking whenever the orchestrator
//! changes state. They are telemetry only; nothing in a flow waits on
//! them or branches on them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::domain::error::FlowError;
use crate::domain::session::{ConnectionState, ProviderEvent, SessionMeta, Signer};
use crate::ports::wallet::WalletTransport;

/// One wallet session, owned by a single orchestration run.
pub struct WalletSession<W: WalletTransport> {
  transport: Arc<W>,
  events: Option<broadcast::Receiver<ProviderEvent>>,
  meta: SessionMeta,
  signer: Option<Signer>,
  /// Upper bound on the connect handshake.
  connect_timeout: Duration,
  released: bool,
}

impl<W: WalletTransport> WalletSession<W> {
  /// Create a session with a 30s connect timeout.
  pub fn new(transport: Arc<W>) -> Self {
    Self::with_timeout(transport, Duration::from_secs(30))
  }

  pub fn with_timeout(transport: Arc<W>, connect_timeout: Duration) -> Self {
    Self {
      transport,
      events: None,
      meta: SessionMeta::default(),
      signer: None,
      connect_timeout,
      released: false,
    }
  }

  /// Connect and return the signing identity of the active account.
  pub async fn connect(&mut self) -> Result<Signer, FlowError> {
    self.meta.connection_state = ConnectionState::Connecting;
    if self.events.is_none() {
      self.events = Some(self.transport.subscribe());
    }

    let attempt = tokio::time::timeout(self.connect_timeout, self.transport.connect()).await;
    let signer = match attempt {
      Ok(Ok(signer)) => signer,
      Ok(Err(err)) => {
        self.meta.connection_state = ConnectionState::Error;
        warn!(error = %format!("{err:#}"), "Wallet transport rejected connection");
        return Err(FlowError::connection(&err));
      }
      Err(_) => {
        self.meta.connection_state = ConnectionState::Error;
        warn!(
          timeout_secs = self.connect_timeout.as_secs(),
          "Wallet connection timed out"
        );
        return Err(FlowError::Connection(format!(
          "wallet connection timed out after {}s",
          self.connect_timeout.as_secs()
        )));
      }
    };

    self.meta.address = Some(signer.address);
    self.meta.chain_id = Some(signer.chain_id);
    self.meta.connection_state = ConnectionState::Connected;
    self.signer = Some(signer);
    self.drain_events();

    info!(
      address = %signer.address,
      chain_id = signer.chain_id,
      "Wallet connected"
    );
    Ok(signer)
  }

  pub fn meta(&self) -> &SessionMeta {
    &self.meta
  }

  /// Re-query the active account and chain from the transport.
  pub async fn refresh(&mut self) -> Result<(), FlowError> {
    let accounts = self
      .transport
      .accounts()
      .await
      .map_err(|e| FlowError::connection(&e.context("account query failed")))?;
    let chain_id = self
      .transport
      .chain_id()
      .await
      .map_err(|e| FlowError::connection(&e.context("chain id query failed")))?;

    self.meta.apply(&ProviderEvent::AccountsChanged { accounts });
    self.meta.apply(&ProviderEvent::ChainChanged { chain_id });
    debug!(address = ?self.meta.address, chain_id, "Session metadata refreshed");
    Ok(())
  }

  /// Re-read the session and check the active account is still the one
  /// that connected.
  pub async fn confirm_account(&mut self) -> Result<Signer, FlowError> {
    let signer = self
      .signer
      .ok_or_else(|| FlowError::Connection("wallet is not connected".to_string()))?;
    self.refresh().await?;
    match self.meta.address {
      Some(active) if active == signer.address => Ok(signer),
      active => {
        warn!(connected = %signer.address, ?active, "Active account changed");
        Err(FlowError::Connection(format!(
          "active account changed from {} to {}",
          signer.address,
          active.map_or_else(|| "none".to_string(), |a| a.to_string())
        )))
      }
    }
  }

  /// Fold every pending provider notification into the metadata.
  ///
  /// Returns the number of notifications applied.
  pub fn drain_events(&mut self) -> usize {
    let Some(events) = self.events.as_mut() else {
      return 0;
    };

    let mut applied = 0;
    loop {
      match events.try_recv() {
        Ok(event) => {
          match &event {
            ProviderEvent::Disconnected(info) => warn!(
              code = info.code,
              message = %info.message,
              "Provider reported disconnect"
            ),
            other => debug!(event = ?other, "Provider notification"),
          }
          self.meta.apply(&event);
          applied += 1;
        }
        Err(TryRecvError::Lagged(skipped)) => {
          warn!(skipped, "Provider notifications dropped");
        }
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
    applied
  }

  /// Release the transport. Only the first call reaches the transport.
  ///
  /// Returns whether this call performed the release. Transport errors
  /// are logged and swallowed.
  pub async fn disconnect(&mut self) -> bool {
    if self.released {
      debug!("Wallet already disconnected, skipping");
      return false;
    }
    self.released = true;

    if let Err(err) = self.transport.disconnect().await {
      warn!(error = %format!("{err:#}"), "Wallet disconnect failed");
    }
    self.drain_events();
    self.meta.connection_state = ConnectionState::Disconnected;
    self.signer = None;

    info!("Wallet disconnected");
    true
  }
}
