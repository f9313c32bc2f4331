//! Sequential polling driver
//!
//! The Poller is responsible for:
//! - Asking the IpSource for the current address once per interval
//! - Handing that address to the Syncer
//! - Stopping on the first write failure
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   IpAddr   ┌──────────────┐  list / edit  ┌─────────────┐
//! │  IpSource   │──────────▶ │    Syncer    │─────────────▶ │ RecordStore │
//! └─────────────┘            └──────────────┘               └─────────────┘
//!        ▲                           │
//!        │        ┌──────────────┐   │ SyncOutcome
//!        └────────│    Poller    │◀──┘
//!                 └──────────────┘
//!                         │
//!                         ▼
//!                  PollerEvent channel
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch the current IP; on failure log, sleep and try again next cycle
//! 2. `Syncer::sync` with the address
//! 3. On error stop the loop and return the error (no retry)
//! 4. Sleep the poll interval
//!
//! A cycle always runs to completion. Shutdown is only observed while
//! sleeping between cycles.

use crate::config::PollerConfig;
use crate::error::Result;
use crate::syncer::Syncer;
use crate::traits::IpSource;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Events emitted by the Poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerEvent {
    /// Loop started
    Started {
        target: String,
    },

    /// Current address retrieved
    IpObserved {
        ip: IpAddr,
    },

    /// Current address could not be retrieved
    IpLookupFailed {
        error: String,
    },

    /// Sync finished without a write
    InSync {
        ip: IpAddr,
    },

    /// Sync wrote a new value
    Updated {
        previous: String,
        current: IpAddr,
    },

    /// Sync failed; the loop stops
    SyncFailed {
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// Drives a [`Syncer`] from an [`IpSource`] at a fixed interval
///
/// ## Lifecycle
///
/// 1. Create with [`Poller::new()`]
/// 2. Start with [`Poller::run()`]
/// 3. Runs until Ctrl-C or a write failure
pub struct Poller {
    /// Source of the desired value
    ip_source: Box<dyn IpSource>,

    /// Decision engine
    syncer: Syncer,

    /// Sleep between cycles
    poll_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<PollerEvent>,
}

impl Poller {
    /// Create a new poller
    ///
    /// # Returns
    ///
    /// A tuple of (poller, event_receiver) where event_receiver yields poller events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        syncer: Syncer,
        config: PollerConfig,
    ) -> Result<(Self, mpsc::Receiver<PollerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let poller = Self {
            ip_source,
            syncer,
            poll_interval: config.poll_interval(),
            event_tx: tx,
        };

        Ok((poller, rx))
    }

    /// The driven syncer
    pub fn syncer(&self) -> &Syncer {
        &self.syncer
    }

    /// Run the loop until Ctrl-C or a write failure
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The write failure that stopped the loop
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the loop with a controlled shutdown signal
    ///
    /// Dropping the sender counts as a shutdown signal. With `None` the loop
    /// waits for Ctrl-C, like [`Poller::run()`].
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let target = self.syncer.target().to_string();
        info!(
            "Syncing {} from {} every {:?}",
            target,
            self.ip_source.source_name(),
            self.poll_interval
        );
        self.emit_event(PollerEvent::Started { target });

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            if let Err(e) = self.run_cycle().await {
                self.emit_event(PollerEvent::Stopped {
                    reason: format!("Sync failed: {}", e),
                });
                return Err(e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(PollerEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    return Ok(());
                }
            }
        }
    }

    /// Run one observe-and-sync cycle
    async fn run_cycle(&mut self) -> Result<()> {
        let domain = self.syncer.target().domain.clone();

        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("[{}] Failed to retrieve IP: {}", domain, e);
                self.emit_event(PollerEvent::IpLookupFailed {
                    error: e.to_string(),
                });
                return Ok(());
            }
        };

        info!("[{}] External IP [{}]", domain, ip);
        self.emit_event(PollerEvent::IpObserved { ip });

        match self.syncer.sync(&ip.to_string()).await {
            Ok(outcome) if outcome.changed => {
                info!("[{}] Updated IP Address [{}] => [{}]", domain, outcome.previous, ip);
                self.emit_event(PollerEvent::Updated {
                    previous: outcome.previous,
                    current: ip,
                });
                Ok(())
            }
            Ok(_) => {
                self.emit_event(PollerEvent::InSync { ip });
                Ok(())
            }
            Err(e) => {
                error!("[{}] Failed to update record: {}", domain, e);
                self.emit_event(PollerEvent::SyncFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Emit a poller event
    fn emit_event(&self, event: PollerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
        }
    }
}
