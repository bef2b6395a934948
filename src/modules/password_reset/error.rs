use dentra_db::StoreError;

use crate::modules::notifications::DispatchError;

#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    #[error("User not found")]
    NotFound,

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Persistence(StoreError),
}

impl From<StoreError> for PasswordResetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PasswordResetError::NotFound,
            StoreError::NotFoundOrExpired => PasswordResetError::InvalidOrExpiredToken,
            persistence @ StoreError::Persistence { .. } => {
                PasswordResetError::Persistence(persistence)
            }
        }
    }
}
