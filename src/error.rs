use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of a sync-core operation.
///
/// Precondition variants are raised before any gateway call and leave the
/// state untouched. `Gateway` wraps a store failure after which the prior
/// state is kept as it was.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no principal is signed in")]
    NoPrincipal,
    #[error("no project is selected")]
    NoSelection,
    #[error("invalid target: {0}")]
    InvalidTarget(&'static str),
    #[error("gateway call `{op}` failed")]
    Gateway {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    pub fn is_precondition(&self) -> bool {
        !matches!(self, SyncError::Gateway { .. })
    }
}
