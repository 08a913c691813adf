/// Cached heartbeat payload.
///
/// The payload is built from the identity source on first use and then
/// reused for every heartbeat. It is only rebuilt after `invalidate()`, which
/// the sender calls when its owner asks for `refresh_identity()`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{debug, warn};

use cluster_protocol::payload::encode_heartbeat;

use crate::identity::IdentitySource;
use crate::stats::SenderStats;

#[derive(Debug, Clone)]
pub struct CachedPayload {
    /// URL the bytes were derived from (empty if the lookup failed)
    pub url: String,
    /// gzip-compressed URL, sent verbatim as the datagram body
    pub bytes: Vec<u8>,
}

pub struct PayloadBuilder {
    source: Arc<dyn IdentitySource>,
    stats: Arc<SenderStats>,
    cached: Option<CachedPayload>,
}

impl PayloadBuilder {
    pub fn new(source: Arc<dyn IdentitySource>, stats: Arc<SenderStats>) -> Self {
        Self {
            source,
            stats,
            cached: None,
        }
    }

    /// Current datagram body, building and caching it if needed.
    pub fn payload(&mut self) -> anyhow::Result<&[u8]> {
        let cached = match self.cached.take() {
            Some(cached) => cached,
            None => self.build()?,
        };
        Ok(self.cached.insert(cached).bytes.as_slice())
    }

    pub fn cached(&self) -> Option<&CachedPayload> {
        self.cached.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    fn build(&self) -> anyhow::Result<CachedPayload> {
        // A panicking source is an unexpected error, not a lookup failure
        let lookup = panic::catch_unwind(AssertUnwindSafe(|| self.source.advertised_url()))
            .map_err(|_| anyhow!("identity source panicked"))?;

        let url = match lookup {
            Ok(url) => url,
            Err(e) => {
                self.stats.record_identity_failure();
                warn!(error = %e, "Failed to look up advertised URL, sending empty heartbeat");
                String::new()
            }
        };

        let bytes = encode_heartbeat(&url).context("failed to compress heartbeat payload")?;
        debug!(url = %url, bytes = bytes.len(), "Heartbeat payload built");

        Ok(CachedPayload { url, bytes })
    }
}
