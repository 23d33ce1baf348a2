//! Paced fan-out of encoded reply audio
//!
//! Splits an encoded waveform into fixed-size chunks and delivers each chunk
//! to every live session, sleeping one chunk's worth of playback time between
//! passes so delivery approximates real time. This sleep is the only
//! intentional throttling point in the relay.

use std::sync::Arc;
use std::time::Duration;

use super::protocol::Outbound;
use super::registry::Registry;

/// Streams encoded waveforms to all registered sessions
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    chunk_size: usize,
    target_rate: u32,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`
    #[must_use]
    pub fn new(registry: Arc<Registry>, chunk_size: usize, target_rate: u32) -> Self {
        Self {
            registry,
            chunk_size,
            target_rate,
        }
    }

    /// Seconds of playback one chunk represents
    fn pace(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_size as f64 / f64::from(self.target_rate))
    }

    /// Deliver `waveform` to every live session in paced chunks.
    ///
    /// Delivery is best-effort and per-recipient: a session whose send fails
    /// is removed from the registry immediately and silently, without
    /// affecting delivery to the others. Returns the number of chunk passes.
    pub async fn stream(&self, waveform: &[u8]) -> usize {
        let pace = self.pace();
        let mut passes = 0;

        for chunk in waveform.chunks(self.chunk_size) {
            for (id, tx) in self.registry.snapshot().await {
                if tx.send(Outbound::Audio(chunk.to_vec())).await.is_err() {
                    self.registry.remove(id).await;
                    tracing::debug!(session = %id, "dropped unreachable session mid-broadcast");
                }
            }

            passes += 1;
            tokio::time::sleep(pace).await;
        }

        // The macro's field borrows are not Send, so the len() await must
        // happen before it
        let listeners = self.registry.len().await;
        tracing::info!(
            bytes = waveform.len(),
            chunks = passes,
            listeners,
            "broadcast complete"
        );
        passes
    }
}
