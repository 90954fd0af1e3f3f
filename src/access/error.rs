use thiserror::Error;

use super::store::StoreError;

/// Failure taxonomy for the access core.
///
/// The domain variants are expected, recoverable-by-caller outcomes and are
/// never treated as incidents. `StoreTimeout` and `Persistence` are
/// infrastructure failures and the only variants fatal to an operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown email or wrong password. Deliberately a single variant so the
    /// caller cannot tell which of the two happened.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is inactive")]
    InactiveAccount,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("unknown role")]
    InvalidRole,
    #[error("unknown business element")]
    UnknownElement,
    #[error("invalid session")]
    InvalidSession,
    #[error("session expired")]
    SessionExpired,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("a rule already exists for this role and element")]
    DuplicateRule,
    #[error("store operation timed out")]
    StoreTimeout,
    #[error("persistence failure")]
    Persistence(#[source] anyhow::Error),
}

impl Error {
    /// Whether this is an expected domain outcome rather than an
    /// infrastructure failure.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        !matches!(self, Self::StoreTimeout | Self::Persistence(_))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::StoreTimeout,
            // Callers match unique violations they expect (duplicate email,
            // duplicate rule, token collision) before converting; anything
            // that reaches this blanket path is a store-level surprise.
            StoreError::UniqueViolation(key) => {
                Self::Persistence(anyhow::anyhow!("unexpected unique violation on {key}"))
            }
            StoreError::Backend(source) => Self::Persistence(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_split() {
        assert!(Error::InvalidCredentials.is_domain());
        assert!(Error::DuplicateRule.is_domain());
        assert!(Error::SessionExpired.is_domain());
        assert!(!Error::StoreTimeout.is_domain());
        assert!(!Error::Persistence(anyhow::anyhow!("boom")).is_domain());
    }

    #[test]
    fn store_timeout_maps_to_store_timeout() {
        let err = Error::from(StoreError::Timeout);
        assert!(matches!(err, Error::StoreTimeout));
    }
}
