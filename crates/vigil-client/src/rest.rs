//! Session REST lifecycle.
//!
//! Two small calls around the telemetry channel: registering the attempt
//! before connecting, and best-effort teardown after. Session start is the
//! single user-blocking failure in the whole client; everything downstream
//! degrades instead of erroring.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ClientError;

/// Body of `POST /sessions/start`. The service expects camelCase keys here
/// but answers with a snake_case `session_id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub student_id: String,
    pub exam_id: String,
    pub student_name: String,
    pub exam_name: String,
}

#[derive(Debug, Deserialize)]
struct StartSessionResponse {
    session_id: String,
}

/// Register a proctoring session with the detection service.
///
/// Returns the service-assigned session id used to scope the telemetry
/// channel. Any failure here propagates; proctoring cannot begin without a
/// session id.
pub async fn start_session(
    http_base: &str,
    request: &StartSessionRequest,
) -> Result<String, ClientError> {
    let url = format!("{}/sessions/start", http_base.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .json(request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::SessionStart(format!(
            "service returned {status}: {body}"
        )));
    }

    let payload: StartSessionResponse = response
        .json()
        .await
        .map_err(|e| ClientError::SessionStart(format!("malformed response: {e}")))?;
    info!(session_id = %payload.session_id, exam_id = %request.exam_id, "session registered");
    Ok(payload.session_id)
}

/// Tell the service a session ended. Best-effort: the session also times out
/// server-side, so failures are logged and swallowed.
pub async fn end_session(http_base: &str, session_id: &str) {
    let url = format!(
        "{}/sessions/{}/end",
        http_base.trim_end_matches('/'),
        session_id
    );
    match reqwest::Client::new().post(&url).send().await {
        Ok(response) if response.status().is_success() => {
            info!(session_id, "session ended");
        }
        Ok(response) => {
            warn!(session_id, status = %response.status(), "session end rejected");
        }
        Err(e) => {
            warn!(session_id, error = %e, "session end request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_serializes_camel_case() {
        let request = StartSessionRequest {
            student_id: "u-1".into(),
            exam_id: "e-1".into(),
            student_name: "Ana".into(),
            exam_name: "Algebra Midterm".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["studentId"], "u-1");
        assert_eq!(json["examId"], "e-1");
        assert_eq!(json["examName"], "Algebra Midterm");
        assert!(json.get("student_id").is_none());
    }

    #[tokio::test]
    async fn start_against_unreachable_service_is_an_error() {
        // Reserved port with nothing listening.
        let result = start_session(
            "http://127.0.0.1:1",
            &StartSessionRequest {
                student_id: "u-1".into(),
                exam_id: "e-1".into(),
                student_name: "Ana".into(),
                exam_name: "Quiz".into(),
            },
        )
        .await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }

    #[tokio::test]
    async fn end_against_unreachable_service_does_not_panic() {
        end_session("http://127.0.0.1:1", "s-1").await;
    }
}
