use std::fmt;

/// Errors raised by the client.
///
/// `Client` failures occur inside the per-document pipeline and are
/// converted into `{_file, _exception}` result records at the per-file
/// boundary, so a batch keeps going. `Validation` failures occur before
/// any network call (arguments, secrets file, credentials) and abort
/// the whole invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapError {
    Client(String),
    Validation(String),
}

impl CapError {
    pub fn client(message: impl Into<String>) -> Self {
        CapError::Client(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CapError::Validation(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            CapError::Client(m) | CapError::Validation(m) => m,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CapError::Validation(_))
    }
}

impl fmt::Display for CapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for CapError {}
