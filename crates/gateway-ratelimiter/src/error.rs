use std::fmt;

use gateway_core::GatewayError;

/// Errors that can occur when using the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterError {
    /// The rate limit was exceeded and no permit could be acquired within the timeout.
    RateLimitExceeded,
}

impl fmt::Display for RateLimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimiterError::RateLimitExceeded => write!(f, "rate limit exceeded"),
        }
    }
}

impl std::error::Error for RateLimiterError {}

impl From<RateLimiterError> for GatewayError {
    fn from(_err: RateLimiterError) -> Self {
        GatewayError::RateLimited { retry_after: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = RateLimiterError::RateLimitExceeded;
        assert_eq!(error.to_string(), "rate limit exceeded");
    }

    #[test]
    fn converts_into_gateway_error() {
        let err: GatewayError = RateLimiterError::RateLimitExceeded.into();
        assert_eq!(err.code(), gateway_core::ErrorCode::RateLimited);
    }
}
