//! Turning configuration into a storage backend.

use crate::report;
use hoist_config::Target;
use hoist_storage::BackendHandle;
use hoist_storage::backend::{DryRunBackend, LocalBackend};
use miette::{Result, miette};
use std::path::Path;
use std::sync::Arc;

/// Connect to the upload destination.
///
/// `to` overrides the configured target with a local directory. A dry run
/// wraps whichever backend is chosen so that nothing is written.
pub async fn connect(target: Option<&Target>, to: Option<&Path>, dry_run: bool) -> Result<BackendHandle> {
    let backend: BackendHandle = match (to, target) {
        (Some(root), _) => local(root)?,
        (None, Some(Target::Local { root })) => local(root)?,
        (None, Some(target @ Target::S3 { .. })) => s3(target).await?,
        (None, None) => {
            return Err(miette!(
                help = "pass --to <DIR>, or add a [target] section to the configuration file",
                "no upload target configured"
            ));
        },
    };
    tracing::debug!(backend = backend.name(), dry_run, "Connected to storage backend");
    if dry_run {
        return Ok(Arc::new(DryRunBackend::new(backend)));
    }
    Ok(backend)
}

fn local(root: &Path) -> Result<BackendHandle> {
    let root = std::path::absolute(root).map_err(|e| miette!("could not resolve {}: {e}", root.display()))?;
    Ok(Arc::new(LocalBackend::new("local", root).map_err(report)?))
}

#[cfg(feature = "s3")]
async fn s3(target: &Target) -> Result<BackendHandle> {
    let Target::S3 { bucket, prefix, region, endpoint, public_url, key_id, key_secret } = target else {
        return Err(miette!("not an S3 target"));
    };
    let backend = hoist_storage::backend::S3Backend::new(
        "s3",
        bucket,
        prefix.clone(),
        region,
        endpoint.clone(),
        public_url.clone(),
        key_id,
        key_secret,
    )
    .await
    .map_err(report)?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "s3"))]
async fn s3(_target: &Target) -> Result<BackendHandle> {
    Err(miette!(help = "rebuild with `--features s3`", "S3 support is not enabled in this build"))
}
