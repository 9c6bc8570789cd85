// Adapters layer: concrete TripStore backends and the ranked chain over them.

pub mod fallback;
pub mod github;
pub mod local;
pub mod remote;

use crate::domain::ports::{ConfigProvider, TripStore};
use crate::utils::error::Result;
use fallback::FallbackStore;
use github::GithubStore;
use local::LocalStore;
use remote::RemoteStore;

/// Builds the backend chain: the remote API, then the GitHub file (each when
/// configured), then the local store.
pub fn build_store(config: &impl ConfigProvider) -> Result<FallbackStore> {
    let mut backends: Vec<Box<dyn TripStore>> = Vec::new();

    if let Some(endpoint) = config.remote_endpoint() {
        tracing::debug!("Remote backend: {}", endpoint);
        backends.push(Box::new(RemoteStore::new(endpoint, config.request_timeout())?));
    }

    if let Some(target) = config.github() {
        tracing::debug!("GitHub backend: {}/{}/{}", target.owner, target.repo, target.path);
        backends.push(Box::new(GithubStore::new(target, config.request_timeout())?));
    }

    tracing::debug!("Local backend: {}", config.data_dir());
    backends.push(Box::new(LocalStore::new(config.data_dir())));

    Ok(FallbackStore::new(backends).with_write_through(config.write_through()))
}
