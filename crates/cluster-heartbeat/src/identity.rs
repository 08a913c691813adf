/// Source of the URL this node advertises in its heartbeats.

use std::sync::RwLock;

use anyhow::anyhow;

/// Looks up the URL peers should use to reach this node.
///
/// A lookup error does not stop heartbeats; the sender advertises an empty
/// URL instead.
pub trait IdentitySource: Send + Sync {
    fn advertised_url(&self) -> anyhow::Result<String>;
}

/// Identity set from configuration, replaceable at runtime.
///
/// Replacing the URL does not change heartbeats already being sent until the
/// sender is asked to `refresh_identity()`.
#[derive(Debug, Default)]
pub struct ConfiguredIdentity {
    url: RwLock<Option<String>>,
}

impl ConfiguredIdentity {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: RwLock::new(url),
        }
    }

    pub fn set_url(&self, url: Option<String>) {
        if let Ok(mut guard) = self.url.write() {
            *guard = url;
        }
    }
}

impl IdentitySource for ConfiguredIdentity {
    fn advertised_url(&self) -> anyhow::Result<String> {
        let guard = self
            .url
            .read()
            .map_err(|_| anyhow!("identity lock poisoned"))?;
        guard
            .clone()
            .ok_or_else(|| anyhow!("no advertised URL configured"))
    }
}

impl<F> IdentitySource for F
where
    F: Fn() -> anyhow::Result<String> + Send + Sync,
{
    fn advertised_url(&self) -> anyhow::Result<String> {
        self()
    }
}
