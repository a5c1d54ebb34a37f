//! Payload key reload.
//!
//! On SIGHUP the codec section is re-read from the configuration file (when
//! one was given), key material is re-read from the environment and the
//! keyring is swapped in place. A failed reload keeps the current keys.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{load_config, CodecConfig, ConfigError};
use crate::crypto::{KeyError, Keyring, StaticKeyProvider};

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("key material: {0}")]
    Keys(#[from] KeyError),
}

/// Rebuild the keyring and rotate it into `keys`.
///
/// `codec` is updated to the freshly loaded section only when the whole
/// reload succeeds.
pub fn reload_keys<F>(
    keys: &StaticKeyProvider,
    config_path: Option<&Path>,
    codec: &mut CodecConfig,
    lookup: F,
) -> Result<(), ReloadError>
where
    F: Fn(&str) -> Option<String>,
{
    let next = match config_path {
        Some(path) => load_config(path)?.codec,
        None => codec.clone(),
    };
    let keyring = Keyring::from_config(&next, lookup)?;

    if next.format != codec.format {
        tracing::warn!(
            configured = ?next.format,
            running = ?codec.format,
            "Token format changes need a restart; only keys were reloaded"
        );
    }

    keys.rotate(keyring);
    *codec = next;
    Ok(())
}

/// Reload keys on every SIGHUP until shutdown.
pub async fn reload_keys_on_hangup(
    keys: Arc<StaticKeyProvider>,
    config_path: Option<PathBuf>,
    mut codec: CodecConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler");
                let _ = shutdown.recv().await;
                return;
            }
        };

        loop {
            tokio::select! {
                _ = hangup.recv() => {
                    tracing::info!("SIGHUP received, reloading payload keys");
                    let lookup = |name: &str| std::env::var(name).ok();
                    let path = config_path.as_deref();
                    if let Err(e) = reload_keys(&keys, path, &mut codec, lookup) {
                        tracing::error!(error = %e, "Key reload failed, keeping current keys");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (keys, config_path, &mut codec);
        let _ = shutdown.recv().await;
    }
}
