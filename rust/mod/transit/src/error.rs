use thiserror::Error;

/// Why a transit lookup produced no upstream payload.
///
/// Never reaches the client as an HTTP failure: handlers render it as
/// `{"error": "<message>"}` inside a 200 response.
#[derive(Error, Debug)]
pub enum TransitError {
    /// The request is missing something the provider needs.
    #[error("{0}")]
    InvalidRequest(String),

    /// A provider base URL cannot be used.
    #[error("invalid provider URL: {0}")]
    Config(String),

    /// Connection, TLS or timeout failure.
    #[error("{provider} request failed: {message}")]
    Transport { provider: &'static str, message: String },

    /// The provider answered with a non-2xx status.
    #[error("{provider} returned {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The provider answered 2xx with something that is not JSON.
    #[error("{provider} sent an unreadable response: {message}")]
    Decode { provider: &'static str, message: String },
}

impl TransitError {
    /// Transport failure with the request URL (and its API key) stripped.
    pub(crate) fn transport(provider: &'static str, e: reqwest::Error) -> Self {
        TransitError::Transport {
            provider,
            message: e.without_url().to_string(),
        }
    }

    pub(crate) fn decode(provider: &'static str, e: reqwest::Error) -> Self {
        TransitError::Decode {
            provider,
            message: e.without_url().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_names_provider_and_status() {
        let e = TransitError::Upstream {
            provider: "odsay",
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(e.to_string(), "odsay returned 503: busy");
    }

    #[test]
    fn invalid_request_is_just_message() {
        assert_eq!(
            TransitError::InvalidRequest("busID is required".into()).to_string(),
            "busID is required"
        );
    }
}
