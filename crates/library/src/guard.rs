//! Batch size limit.

use crate::collect::Batch;
use crate::error::{ErrorKind, Result};
use hoist_compress::BYTES_PER_MB;

/// Default limit: 500 MB.
pub const DEFAULT_LIMIT_BYTES: u64 = 500 * BYTES_PER_MB;

/// Bytes as (binary) megabytes.
pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

/// Total size of the batch in megabytes.
pub fn total_megabytes(batch: &Batch) -> f64 {
    megabytes(batch.total_size())
}

/// Reject a batch whose total size is strictly over `limit_bytes`.
///
/// Sizes are measured before compression, so this never has to wait for
/// image work or the network.
pub fn validate(batch: &Batch, limit_bytes: u64) -> Result<()> {
    let total_bytes = batch.total_size();
    if total_bytes > limit_bytes {
        tracing::warn!(
            folder = batch.folder_name(),
            total_mb = megabytes(total_bytes),
            limit_mb = megabytes(limit_bytes),
            "Selection is over the size limit"
        );
        exn::bail!(ErrorKind::SizeExceeded { total_bytes, limit_bytes });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::Entry;
    use rstest::rstest;

    fn batch_of(megabytes: &[u64]) -> Batch {
        let entries = megabytes
            .iter()
            .enumerate()
            .map(|(i, mb)| Entry::new(format!("photos/{i}.raw"), vec![0; (*mb * BYTES_PER_MB) as usize], "application/octet-stream"))
            .collect();
        Batch::new("photos", entries)
    }

    #[rstest]
    #[case::empty(&[], true)]
    #[case::small(&[3, 4], true)]
    #[case::exactly_at_limit(&[250, 250], true)]
    #[case::one_over(&[250, 251], false)]
    fn test_limit(#[case] sizes: &[u64], #[case] accepted: bool) {
        let batch = batch_of(sizes);
        assert_eq!(validate(&batch, DEFAULT_LIMIT_BYTES).is_ok(), accepted);
    }

    #[test]
    fn test_exceeded_reports_sizes() {
        let batch = batch_of(&[501]);
        let err = validate(&batch, DEFAULT_LIMIT_BYTES).unwrap_err();
        match &*err {
            ErrorKind::SizeExceeded { total_bytes, limit_bytes } => {
                assert_eq!(*total_bytes, 501 * BYTES_PER_MB);
                assert_eq!(*limit_bytes, DEFAULT_LIMIT_BYTES);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_total_megabytes() {
        let batch = Batch::new("photos", vec![Entry::new("photos/a.jpg", vec![0; 600 * 1024], "image/jpeg")]);
        assert!((total_megabytes(&batch) - 0.5859375).abs() < f64::EPSILON);
    }
}
