//! Bounded external verification.
//!
//! A hosted verifier may be slow or unreachable. [`verify_with_fallback`]
//! gives it a fixed time budget and, on timeout or error, answers with the
//! local verifier instead. Nothing is retried.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::traits::VerifyError;

/// Who produced the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum VerificationSource {
    Remote,
    LocalFallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub verified: bool,
    #[serde(flatten)]
    pub source: VerificationSource,
}

/// Await `remote` for at most `timeout`, then fall back to `local`.
///
/// A remote verdict is final, including `false`. Only local decoding
/// failures surface as errors.
pub async fn verify_with_fallback<F, E, L>(
    remote: F,
    timeout: Duration,
    local: L,
) -> Result<VerificationOutcome, VerifyError>
where
    F: Future<Output = Result<bool, E>>,
    E: std::fmt::Display,
    L: FnOnce() -> Result<bool, VerifyError>,
{
    let reason = match tokio::time::timeout(timeout, remote).await {
        Ok(Ok(verified)) => {
            return Ok(VerificationOutcome {
                verified,
                source: VerificationSource::Remote,
            })
        }
        Ok(Err(e)) => format!("remote verifier failed: {e}"),
        Err(_) => format!("remote verifier timed out after {}ms", timeout.as_millis()),
    };
    tracing::warn!(%reason, "falling back to local verification");
    Ok(VerificationOutcome {
        verified: local()?,
        source: VerificationSource::LocalFallback { reason },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn remote_verdict_wins() {
        let out = verify_with_fallback(async { Ok::<_, String>(false) }, BUDGET, || Ok(true))
            .await
            .unwrap();
        assert!(!out.verified);
        assert_eq!(out.source, VerificationSource::Remote);
    }

    #[tokio::test]
    async fn remote_error_falls_back() {
        let out = verify_with_fallback(
            async { Err::<bool, _>("connection refused") },
            BUDGET,
            || Ok(true),
        )
        .await
        .unwrap();
        assert!(out.verified);
        match out.source {
            VerificationSource::LocalFallback { reason } => {
                assert!(reason.contains("connection refused"))
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_remote_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(true)
        };
        let out = verify_with_fallback(slow, BUDGET, || Ok(false)).await.unwrap();
        assert!(!out.verified);
        assert!(matches!(
            out.source,
            VerificationSource::LocalFallback { ref reason } if reason.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn local_decode_error_propagates() {
        let err = verify_with_fallback(async { Err::<bool, _>("down") }, BUDGET, || {
            Err(VerifyError::MalformedProof("bad".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, VerifyError::MalformedProof(_)));
    }

    #[test]
    fn outcome_serializes_flat() {
        let out = VerificationOutcome {
            verified: true,
            source: VerificationSource::LocalFallback {
                reason: "down".into(),
            },
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["verified"], true);
        assert_eq!(json["source"], "localFallback");
        assert_eq!(json["reason"], "down");
    }
}
