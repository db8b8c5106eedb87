use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced by subscription repositories and the cost aggregator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("subscription {id} not found")]
    NotFound { id: i64 },

    /// Underlying store failure. Display stays generic; the driver error
    /// is available as the source.
    #[error("persistence error")]
    Persistence(#[source] BoxError),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("period total exceeds the representable range")]
    TotalOverflow,
}

impl StoreError {
    pub fn persistence<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        StoreError::Persistence(error.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(feature = "db")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Persistence(Box::new(error))
    }
}

impl From<sea_query::error::Error> for StoreError {
    fn from(error: sea_query::error::Error) -> Self {
        StoreError::Persistence(Box::new(error))
    }
}
