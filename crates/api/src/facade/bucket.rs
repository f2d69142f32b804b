//! Bucket management

use datastore_core::Result;
use tracing::info;

use super::convert::map_error;
use super::impl_::Datastore;

/// Bucket facade - whole-bucket operations
pub trait BucketFacade {
    /// Remove every document in the bucket
    ///
    /// Design documents and indexes survive. `FlushDisabled` when the
    /// bucket was provisioned without flush.
    fn flush_bucket(&self) -> Result<()>;
}

impl BucketFacade for Datastore {
    fn flush_bucket(&self) -> Result<()> {
        let _guard = self.span().enter();
        self.client()
            .flush()
            .map_err(|e| map_error(e, "flush_bucket", self.bucket_name()))?;
        info!(target: "datastore::facade", bucket = %self.bucket_name(), "Flushed bucket");
        Ok(())
    }
}
