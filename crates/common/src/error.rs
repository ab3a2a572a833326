//! Error types for the auction core.
//!
//! All fallible operations return [`error_stack::Report<BidonError>`]. The
//! categorical kinds (`NoAdsFound`, `InvalidAuctionKey`, `InvalidSdkVersion`,
//! `NoAdaptersFound`) are stable across transports and map to HTTP 422; every
//! other kind is an internal failure.

use derive_more::Display;
use http::StatusCode;

/// Errors produced by the auction core and its collaborators.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum BidonError {
    /// The ad-unit universe is empty, no candidates matched, or no adapter intersects.
    #[display("No ads found")]
    NoAdsFound,

    /// The request pinned a configuration UID that does not resolve.
    #[display("Invalid auction key")]
    InvalidAuctionKey,

    /// The SDK version header is missing or unparseable.
    #[display("Invalid SDK version")]
    InvalidSdkVersion,

    /// No adapter-init config remains after filtering.
    #[display("No adapters found")]
    NoAdaptersFound,

    /// The request body could not be decoded or failed validation.
    #[display("Bad request: {message}")]
    BadRequest { message: String },

    /// A config, segment or ad-unit store failed.
    #[display("Store error: {message}")]
    Store { message: String },

    /// A bidder failed before producing a demand response.
    #[display("Bidding error: {message}")]
    Bidding { message: String },

    /// An event could not be marshalled or handed to the engine.
    #[display("Event error: {message}")]
    Event { message: String },

    /// Settings could not be loaded or failed validation.
    #[display("Configuration error: {message}")]
    Configuration { message: String },
}

impl core::error::Error for BidonError {}

/// Maps an error to the HTTP surface exposed to SDKs.
pub trait IntoHttpResponse {
    /// HTTP status code for this error.
    fn status_code(&self) -> StatusCode;

    /// Message safe to return to the client.
    fn user_message(&self) -> String;
}

impl IntoHttpResponse for BidonError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoAdsFound
            | Self::InvalidAuctionKey
            | Self::InvalidSdkVersion
            | Self::NoAdaptersFound
            | Self::BadRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store { .. }
            | Self::Bidding { .. }
            | Self::Event { .. }
            | Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::NoAdsFound
            | Self::InvalidAuctionKey
            | Self::InvalidSdkVersion
            | Self::NoAdaptersFound
            | Self::BadRequest { .. } => self.to_string(),
            // Internal details stay in the logs.
            _ => "Internal server error".to_string(),
        }
    }
}

impl BidonError {
    /// True for the categorical 422 kinds that are part of the SDK contract.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(
            self,
            Self::NoAdsFound
                | Self::InvalidAuctionKey
                | Self::InvalidSdkVersion
                | Self::NoAdaptersFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_kinds_map_to_422() {
        for err in [
            BidonError::NoAdsFound,
            BidonError::InvalidAuctionKey,
            BidonError::InvalidSdkVersion,
            BidonError::NoAdaptersFound,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
            assert!(err.is_categorical());
        }
    }

    #[test]
    fn user_messages_are_stable() {
        assert_eq!(BidonError::NoAdsFound.user_message(), "No ads found");
        assert_eq!(
            BidonError::InvalidAuctionKey.user_message(),
            "Invalid auction key"
        );
        assert_eq!(
            BidonError::InvalidSdkVersion.user_message(),
            "Invalid SDK version"
        );
        assert_eq!(
            BidonError::NoAdaptersFound.user_message(),
            "No adapters found"
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = BidonError::Store {
            message: "connection refused to 10.0.0.1".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");
        assert!(!err.is_categorical());
    }
}
