// src/client.rs

use crate::error::{ClientError, SubmitError};
use crate::models::{ErrorBody, PredictionResponse, ReferenceOption, SubmitRequest};
use crate::reference::ReferenceKind;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_ATTEMPTS: u32 = 3;

/// Everything the session needs from the prediction backend.
pub trait PredictionService {
    fn submit(&self, request: &SubmitRequest) -> Result<PredictionResponse, SubmitError>;

    /// Options of one reference endpoint, in the order the server sent them.
    fn reference(&self, kind: ReferenceKind) -> Result<Vec<(String, ReferenceOption)>, ClientError>;
}

pub struct ApiHandler {
    client: Client,
    base_url: String,
}

impl ApiHandler {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, agent);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Http { url: base_url.to_string(), source })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub fn get(&self, endpoint: &str) -> Result<Value, ClientError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);
        self.make_request_with_retry(&url, MAX_ATTEMPTS)
    }

    fn make_request_with_retry(&self, url: &str, max_attempts: u32) -> Result<Value, ClientError> {
        let mut attempts = 0;

        loop {
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|source| ClientError::Http { url: url.to_string(), source })?;

            if response.status().is_success() {
                return response
                    .json()
                    .map_err(|source| ClientError::Http { url: url.to_string(), source });
            } else if response.status() == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(ClientError::RetriesExhausted(url.to_string()));
                }

                let wait_time = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!("Rate limited. Waiting {} seconds before retrying...", wait_time);
                thread::sleep(Duration::from_secs(wait_time));
            } else {
                let status = response.status().as_u16();
                let body = response.text().unwrap_or_default();
                return Err(ClientError::Status { url: url.to_string(), status, body });
            }
        }
    }
}

impl PredictionService for ApiHandler {
    /// Single attempt, never retried.
    fn submit(&self, request: &SubmitRequest) -> Result<PredictionResponse, SubmitError> {
        let url = self.url("/submit/");
        info!("Submitting {} characters of sequence text to {}", request.text.len(), url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| SubmitError::Decode(e.to_string()))
        } else {
            Err(submit_error_from_body(status.as_u16(), &body))
        }
    }

    fn reference(&self, kind: ReferenceKind) -> Result<Vec<(String, ReferenceOption)>, ClientError> {
        let url = self.url(kind.endpoint());
        let value = self.get(kind.endpoint())?;
        reference_options_from_value(&url, value)
    }
}

/// Maps a rejected submission's body onto the error taxonomy.
pub fn submit_error_from_body(status: u16, body: &str) -> SubmitError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.detail.is_empty() => {
            SubmitError::Validation(parsed.detail.into_iter().map(|d| d.msg).collect())
        }
        Ok(_) => SubmitError::Unrecognized { status },
        Err(e) => SubmitError::Decode(e.to_string()),
    }
}

/// Reads `{key: {name, description}, ...}` keeping the server's key order.
pub fn reference_options_from_value(
    url: &str,
    value: Value,
) -> Result<Vec<(String, ReferenceOption)>, ClientError> {
    let map: Map<String, Value> = match value {
        Value::Object(map) => map,
        other => {
            return Err(ClientError::Payload {
                url: url.to_string(),
                reason: format!("expected an object, got {}", other),
            })
        }
    };

    map.into_iter()
        .map(|(key, entry)| {
            serde_json::from_value::<ReferenceOption>(entry)
                .map(|option| (key.clone(), option))
                .map_err(|e| ClientError::Payload {
                    url: url.to_string(),
                    reason: format!("option {}: {}", key, e),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn detail_messages_become_validation_errors() {
        let err = submit_error_from_body(
            422,
            r#"{"detail":[{"loc":["body","organism"],"msg":"organism is required","type":"value_error"}]}"#,
        );
        assert_eq!(err.alert_message(), "organism is required");
    }

    #[test]
    fn missing_or_empty_detail_is_unrecognized() {
        assert!(matches!(
            submit_error_from_body(500, r#"{"detail":[]}"#),
            SubmitError::Unrecognized { status: 500 }
        ));
        assert!(matches!(
            submit_error_from_body(404, r#"{"detail":"Not Found"}"#),
            SubmitError::Unrecognized { status: 404 }
        ));
    }

    #[test]
    fn non_json_error_body_is_a_decode_failure() {
        let err = submit_error_from_body(502, "<html>Bad Gateway</html>");
        assert!(matches!(err, SubmitError::Decode(_)));
        assert_eq!(err.alert_message(), "An error occurred.");
    }

    #[test]
    fn reference_options_keep_server_order() {
        let value = json!({
            "PHOSPHORYLATION_Y": {"name": "Phosphorylation (Y)", "description": "tyrosine"},
            "HYDROXYLYSINE_K": {"name": "Hydroxylysine (K)", "description": "lysine"}
        });
        let options = reference_options_from_value("/ptms", value).unwrap();
        let keys: Vec<&str> = options.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["PHOSPHORYLATION_Y", "HYDROXYLYSINE_K"]);
        assert_eq!(options[1].1.name, "Hydroxylysine (K)");
    }

    #[test]
    fn reference_payload_must_be_an_object_of_options() {
        assert!(reference_options_from_value("/labels", json!(["NO_LABELS"])).is_err());
        assert!(reference_options_from_value("/labels", json!({"NO_LABELS": {"name": "No Labels"}})).is_err());
    }

    /// Serves the scripted raw HTTP responses, one connection each, then stops listening.
    fn scripted_server(responses: Vec<String>) -> (String, Arc<AtomicUsize>, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                read_request(&mut stream);
                counter.fetch_add(1, Ordering::SeqCst);
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (base_url, hits, handle)
    }

    fn read_request(stream: &mut TcpStream) {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buffer.len() < header_end + length {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn reply(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            headers,
            body
        )
    }

    // Proxy settings from the environment must not intercept loopback traffic.
    fn handler(base_url: &str) -> ApiHandler {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        ApiHandler { client, base_url: base_url.to_string() }
    }

    #[test]
    fn reference_fetch_retries_after_rate_limit() {
        let (base_url, hits, server) = scripted_server(vec![
            reply("429 Too Many Requests", "Retry-After: 0\r\n", "{}"),
            reply(
                "200 OK",
                "",
                r#"{"NO_LABELS":{"name":"No Labels","description":"No labels does not encode known PTM locations."}}"#,
            ),
        ]);
        let options = handler(&base_url).reference(ReferenceKind::Labels).unwrap();
        server.join().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].0, "NO_LABELS");
    }

    #[test]
    fn reference_fetch_gives_up_after_three_rate_limits() {
        let limited = reply("429 Too Many Requests", "Retry-After: 0\r\n", "{}");
        let (base_url, hits, server) =
            scripted_server(vec![limited.clone(), limited.clone(), limited]);
        let err = handler(&base_url).reference(ReferenceKind::Ptms).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ClientError::RetriesExhausted(_)), "{:?}", err);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn submission_is_sent_once_even_when_rate_limited() {
        let (base_url, hits, server) = scripted_server(vec![reply(
            "429 Too Many Requests",
            "Retry-After: 0\r\n",
            "{}",
        )]);
        let request = SubmitRequest {
            ptm: "PHOSPHORYLATION_Y".to_string(),
            label: "NO_LABELS".to_string(),
            organism: "HUMAN".to_string(),
            text: ">x\nY".to_string(),
        };
        let err = handler(&base_url).submit(&request).unwrap_err();

        assert!(matches!(err, SubmitError::Unrecognized { status: 429 }), "{:?}", err);
        server.join().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn successful_submission_decodes_the_model() {
        let (base_url, _, server) = scripted_server(vec![reply(
            "200 OK",
            "",
            r#"{"sequence_predictions":[{"sequence_name":"x","sequence":"Y","site_predictions":[{"site":1,"amino_acid":"Y","probability":0.7}]}]}"#,
        )]);
        let model = handler(&base_url).submit(&SubmitRequest::default()).unwrap();
        server.join().unwrap();
        assert_eq!(model.site_count(), 1);
    }

    #[test]
    fn handler_trims_trailing_slash() {
        let handler = ApiHandler::new("http://localhost:8000/", "sitetack_client/0.1", Duration::from_secs(5)).unwrap();
        assert_eq!(handler.url("/submit/"), "http://localhost:8000/submit/");
    }
}
