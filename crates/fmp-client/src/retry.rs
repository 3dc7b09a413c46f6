use crate::transport::{TransportError, UpstreamResponse};
use evaluation_core::FetchError;
use std::time::Duration;

/// Bounds for the retry driver.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    /// Base backoff after a 429, scaled by attempt number.
    pub retry_delay: Duration,
}

const BACKOFF_502: Duration = Duration::from_secs(10);
const BACKOFF_503: Duration = Duration::from_secs(15);
const BACKOFF_NETWORK: Duration = Duration::from_secs(5);
const BACKOFF_500: Duration = Duration::from_secs(5);

/// What to do with one attempt's result. `Retry` carries both the delay
/// before the next attempt and the error to surface if the budget runs out,
/// so the driver stays a dumb bounded loop.
pub(crate) enum AttemptOutcome {
    Success(UpstreamResponse),
    Retry {
        delay: Duration,
        exhausted: FetchError,
    },
    Terminal(FetchError),
}

/// Classify one attempt. `attempt` is zero-based; backoffs grow linearly
/// with it. A 500 gets a single retry pass, everything else transient is
/// retried up to the policy's budget.
pub(crate) fn classify(
    attempt: u32,
    result: Result<UpstreamResponse, TransportError>,
    policy: &RetryPolicy,
) -> AttemptOutcome {
    let response = match result {
        Ok(r) => r,
        Err(e) => {
            return AttemptOutcome::Retry {
                delay: BACKOFF_NETWORK * (attempt + 1),
                exhausted: FetchError::NetworkError {
                    attempts: attempt + 1,
                    message: e.to_string(),
                },
            }
        }
    };

    match response.status {
        200..=299 => AttemptOutcome::Success(response),
        429 => AttemptOutcome::Retry {
            delay: policy.retry_delay * (attempt + 1),
            exhausted: FetchError::RateLimitExceeded {
                attempts: attempt + 1,
                message: snippet(&response.body),
            },
        },
        status @ (502 | 503) => {
            let base = if status == 502 { BACKOFF_502 } else { BACKOFF_503 };
            AttemptOutcome::Retry {
                delay: base * (attempt + 1),
                exhausted: FetchError::UpstreamUnavailable {
                    status,
                    attempts: attempt + 1,
                    message: snippet(&response.body),
                },
            }
        }
        500 => {
            let err = FetchError::UpstreamInternalError {
                message: snippet(&response.body),
            };
            if attempt == 0 {
                AttemptOutcome::Retry {
                    delay: BACKOFF_500,
                    exhausted: err,
                }
            } else {
                AttemptOutcome::Terminal(err)
            }
        }
        401 => AttemptOutcome::Terminal(FetchError::InvalidCredential {
            message: snippet(&response.body),
        }),
        403 => AttemptOutcome::Terminal(FetchError::PermissionDenied {
            message: snippet(&response.body),
        }),
        404 => AttemptOutcome::Terminal(FetchError::ResourceNotFound {
            message: snippet(&response.body),
        }),
        status => AttemptOutcome::Terminal(FetchError::UnexpectedStatus {
            status,
            message: snippet(&response.body),
        }),
    }
}

/// Upstream error bodies can be large HTML pages; keep log/error payloads short.
fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(60),
        }
    }

    #[test]
    fn success_passes_body_through() {
        let outcome = classify(0, Ok(UpstreamResponse::ok("[{}]")), &policy());
        match outcome {
            AttemptOutcome::Success(r) => assert_eq!(r.body, "[{}]"),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn rate_limit_backs_off_linearly() {
        for attempt in 0..3 {
            match classify(attempt, Ok(UpstreamResponse::status_only(429)), &policy()) {
                AttemptOutcome::Retry { delay, exhausted } => {
                    assert_eq!(delay, Duration::from_secs(60) * (attempt + 1));
                    assert!(matches!(exhausted, FetchError::RateLimitExceeded { .. }));
                }
                _ => panic!("429 must be retryable"),
            }
        }
    }

    #[test]
    fn gateway_errors_use_their_own_backoff() {
        match classify(1, Ok(UpstreamResponse::status_only(502)), &policy()) {
            AttemptOutcome::Retry { delay, exhausted } => {
                assert_eq!(delay, Duration::from_secs(20));
                assert!(matches!(
                    exhausted,
                    FetchError::UpstreamUnavailable { status: 502, .. }
                ));
            }
            _ => panic!("502 must be retryable"),
        }
        match classify(0, Ok(UpstreamResponse::status_only(503)), &policy()) {
            AttemptOutcome::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(15)),
            _ => panic!("503 must be retryable"),
        }
    }

    #[test]
    fn internal_error_gets_exactly_one_retry() {
        assert!(matches!(
            classify(0, Ok(UpstreamResponse::status_only(500)), &policy()),
            AttemptOutcome::Retry { .. }
        ));
        assert!(matches!(
            classify(1, Ok(UpstreamResponse::status_only(500)), &policy()),
            AttemptOutcome::Terminal(FetchError::UpstreamInternalError { .. })
        ));
    }

    #[test]
    fn credential_and_not_found_are_terminal() {
        assert!(matches!(
            classify(0, Ok(UpstreamResponse::status_only(401)), &policy()),
            AttemptOutcome::Terminal(FetchError::InvalidCredential { .. })
        ));
        assert!(matches!(
            classify(0, Ok(UpstreamResponse::status_only(403)), &policy()),
            AttemptOutcome::Terminal(FetchError::PermissionDenied { .. })
        ));
        assert!(matches!(
            classify(0, Ok(UpstreamResponse::status_only(404)), &policy()),
            AttemptOutcome::Terminal(FetchError::ResourceNotFound { .. })
        ));
    }

    #[test]
    fn connect_failures_retry_with_short_backoff() {
        let result = Err(TransportError::Timeout("deadline elapsed".into()));
        match classify(1, result, &policy()) {
            AttemptOutcome::Retry { delay, exhausted } => {
                assert_eq!(delay, Duration::from_secs(10));
                assert!(matches!(
                    exhausted,
                    FetchError::NetworkError { attempts: 2, .. }
                ));
            }
            _ => panic!("timeouts must be retryable"),
        }
    }
}
