/// Errors raised by repositories and token stores.
///
/// Messages never include token values or password hashes; `operation` names
/// the store call that failed so the log line can be traced back.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Token not found or expired")]
    NotFoundOrExpired,

    #[error("Persistence error during {operation}: {message}")]
    Persistence {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    /// Builds a `map_err` adapter tagging a driver error with `operation`.
    ///
    /// ```ignore
    /// sqlx::query("...").execute(&pool).await.map_err(StoreError::persistence("mark_used"))?;
    /// ```
    pub fn persistence<E: std::fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> Self {
        move |e| StoreError::Persistence {
            operation,
            message: e.to_string(),
        }
    }
}
