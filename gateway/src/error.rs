use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tokio::task::JoinError;

use crate::decoder::DecodeError;

#[derive(Debug)]
pub struct GatewayError {
    pub(super) source: Option<Box<dyn StdError + Send + Sync>>,
    pub(super) kind: ErrorKind,
}

impl GatewayError {
    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_source(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.source
    }

    pub fn into_parts(self) -> (ErrorKind, Option<Box<dyn StdError + Send + Sync>>) {
        (self.kind, self.source)
    }

    pub(crate) fn closed() -> Self {
        Self {
            source: None,
            kind: ErrorKind::Closed,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            source: Some(message.into()),
            kind: ErrorKind::Configuration,
        }
    }

    /// Wraps a failure of an invite client.
    pub fn invite(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: Some(err.into()),
            kind: ErrorKind::Invite,
        }
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ErrorKind::Decode => f.write_str("failed to decode a gateway payload")?,
            ErrorKind::Closed => f.write_str("the gateway apply loop is no longer running")?,
            ErrorKind::Configuration => f.write_str("invalid gateway configuration")?,
            ErrorKind::Task => f.write_str("the gateway apply loop failed")?,
            ErrorKind::Invite => f.write_str("invite request failed")?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for GatewayError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn StdError + 'static))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    Decode,
    Closed,
    Configuration,
    Task,
    Invite,
}

impl From<DecodeError> for GatewayError {
    fn from(err: DecodeError) -> Self {
        Self {
            source: Some(Box::new(err)),
            kind: ErrorKind::Decode,
        }
    }
}

impl From<JoinError> for GatewayError {
    fn from(err: JoinError) -> Self {
        Self {
            source: Some(Box::new(err)),
            kind: ErrorKind::Task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_source() {
        let err = GatewayError::configuration("STRATA_QUEUE_CAPACITY must be a number");
        assert_eq!(err.kind(), &ErrorKind::Configuration);
        assert_eq!(
            err.to_string(),
            "invalid gateway configuration: STRATA_QUEUE_CAPACITY must be a number"
        );
        assert_eq!(
            GatewayError::closed().to_string(),
            "the gateway apply loop is no longer running"
        );
    }
}
