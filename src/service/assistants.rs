//! Assistants-style HTTP API client
//!
//! Agents map to `/assistants`, sessions to `/threads`, and a turn is a user
//! message followed by a streamed run:
//!
//! ```text
//! POST   {endpoint}/assistants
//! POST   {endpoint}/threads
//! POST   {endpoint}/threads/{thread}/messages
//! POST   {endpoint}/threads/{thread}/runs        (stream: true)
//! DELETE {endpoint}/threads/{thread}
//! DELETE {endpoint}/assistants/{assistant}
//! ```

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::io::{BufRead, BufReader};
use ureq::Body;
use ureq::http::Response;

use super::sse::{SseEvent, SseReader};
use super::{AgentHandle, AgentService, AgentSpec, ConversationSession, FragmentStream, SessionHandle, StreamFragment};
use crate::config::ServiceSettings;
use crate::error::ServiceError;

#[derive(Debug, Deserialize)]
struct Created {
    id: Option<String>,
}

impl Created {
    fn into_id(self) -> Result<String, ServiceError> {
        self.id.filter(|id| !id.is_empty()).ok_or(ServiceError::MissingField("id"))
    }
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    delta: DeltaBody,
}

#[derive(Debug, Deserialize)]
struct DeltaBody {
    #[serde(default)]
    content: Vec<DeltaContent>,
}

#[derive(Debug, Deserialize)]
struct DeltaContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<DeltaText>,
}

#[derive(Debug, Deserialize)]
struct DeltaText {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    status: Option<String>,
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    code: String,
    message: String,
}

pub struct AssistantsClient {
    settings: ServiceSettings,
    http: ureq::Agent,
}

impl AssistantsClient {
    pub fn new(settings: ServiceSettings) -> Self {
        // Status codes are inspected here so error bodies can be reported
        let config = ureq::Agent::config_builder().http_status_as_error(false).build();

        Self {
            settings,
            http: ureq::Agent::new_with_config(config),
        }
    }

    fn url(&self, path: &str) -> String {
        match &self.settings.api_version {
            Some(version) => format!("{}/{}?api-version={}", self.settings.endpoint, path, version),
            None => format!("{}/{}", self.settings.endpoint, path),
        }
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response<Body>, ServiceError> {
        let url = self.url(path);
        log::debug!("POST {}", url);

        let request_body = serde_json::to_string(body)?;
        let response = self
            .http
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.settings.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .header("Content-Type", "application/json")
            .send(request_body.as_bytes())?;

        check_status(response)
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T, ServiceError> {
        let mut response = self.post(path, body)?;
        let response_body = response.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&response_body)?)
    }

    fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let url = self.url(path);
        log::debug!("DELETE {}", url);

        let response = self
            .http
            .delete(&url)
            .header("Authorization", &format!("Bearer {}", self.settings.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .call()?;

        check_status(response).map(|_| ())
    }
}

impl AgentService for AssistantsClient {
    fn create_agent(&self, spec: &AgentSpec) -> Result<AgentHandle, ServiceError> {
        let body = json!({
            "model": self.settings.model_name,
            "name": spec.name,
            "instructions": spec.instructions,
            "temperature": spec.parameters.temperature,
            "top_p": spec.parameters.top_p,
        });

        let id = self.post_json::<Created>("assistants", &body)?.into_id()?;
        log::info!("Created agent {} ({})", id, spec.name);

        Ok(AgentHandle {
            id,
            name: spec.name.clone(),
            parameters: spec.parameters,
        })
    }

    fn create_session(&self, agent: &AgentHandle) -> Result<SessionHandle, ServiceError> {
        let id = self.post_json::<Created>("threads", &json!({}))?.into_id()?;
        log::info!("Created thread {} for agent {}", id, agent.id);
        Ok(SessionHandle { id })
    }

    fn send_turn(&self, session: &ConversationSession, text: &str) -> Result<FragmentStream, ServiceError> {
        let thread = &session.thread.id;
        let parameters = &session.agent.parameters;

        self.post(
            &format!("threads/{}/messages", thread),
            &json!({ "role": "user", "content": text }),
        )?;

        let response = self.post(
            &format!("threads/{}/runs", thread),
            &json!({
                "assistant_id": session.agent.id,
                "stream": true,
                "temperature": parameters.temperature,
                "top_p": parameters.top_p,
                "max_completion_tokens": parameters.max_completion_tokens,
                "max_prompt_tokens": parameters.max_prompt_tokens,
            }),
        )?;

        let reader = BufReader::new(response.into_body().into_reader());
        Ok(Box::new(RunStream::new(reader)))
    }

    fn delete_session(&self, session: &SessionHandle) -> Result<(), ServiceError> {
        self.delete(&format!("threads/{}", session.id))?;
        log::info!("Deleted thread {}", session.id);
        Ok(())
    }

    fn delete_agent(&self, agent: &AgentHandle) -> Result<(), ServiceError> {
        self.delete(&format!("assistants/{}", agent.id))?;
        log::info!("Deleted agent {}", agent.id);
        Ok(())
    }
}

fn check_status(mut response: Response<Body>) -> Result<Response<Body>, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .body_mut()
        .read_to_string()
        .unwrap_or_else(|_| "<no body>".to_string());
    log::warn!("Service returned {}: {}", status, error_text.trim());

    Err(api_error(&error_text, &status.as_u16().to_string()))
}

/// Build an API error from a JSON error payload, or from raw text
fn api_error(payload: &str, fallback_code: &str) -> ServiceError {
    let (message, code) = error_parts(payload, fallback_code);
    ServiceError::Api { message, code }
}

/// Message and code of an error payload
fn error_parts(payload: &str, fallback_code: &str) -> (String, String) {
    let trimmed = payload.trim();
    let value = serde_json::from_str::<serde_json::Value>(trimmed).ok();

    let message = value
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
        })
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|| if trimmed.is_empty() { "<empty>".to_string() } else { trimmed.to_string() });

    let code = value
        .as_ref()
        .and_then(|v| v.pointer("/error/code").or_else(|| v.get("code")))
        .and_then(|c| match c {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| fallback_code.to_string());

    (message, code)
}

enum Decoded {
    Fragment(StreamFragment),
    Skip,
    End,
}

/// Map one event of a run stream onto a fragment
fn decode_event(event: &SseEvent) -> Result<Decoded, ServiceError> {
    if event.is_done_sentinel() {
        return Ok(Decoded::End);
    }

    let Some(name) = event.event.as_deref() else {
        return Ok(Decoded::Skip);
    };

    match name {
        "thread.message.delta" => {
            let delta: MessageDelta = serde_json::from_str(&event.data)?;
            let text: String = delta
                .delta
                .content
                .into_iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.and_then(|t| t.value))
                .collect();

            if text.is_empty() {
                Ok(Decoded::Skip)
            } else {
                Ok(Decoded::Fragment(StreamFragment::Delta(text)))
            }
        }
        "thread.run.completed" => Ok(Decoded::Fragment(StreamFragment::Completed)),
        "thread.run.failed" | "thread.run.cancelled" | "thread.run.expired" | "thread.run.incomplete" => {
            let run: RunObject = serde_json::from_str(&event.data)?;
            let fragment = match run.last_error {
                Some(err) => StreamFragment::Failed {
                    message: err.message,
                    code: err.code,
                },
                None => {
                    let status = run
                        .status
                        .unwrap_or_else(|| name.trim_start_matches("thread.run.").to_string());
                    StreamFragment::Failed {
                        message: format!("Run ended with status '{}'", status),
                        code: status,
                    }
                }
            };
            Ok(Decoded::Fragment(fragment))
        }
        "error" => {
            let (message, code) = error_parts(&event.data, "stream_error");
            Ok(Decoded::Fragment(StreamFragment::Failed { message, code }))
        }
        "done" => Ok(Decoded::End),
        other => {
            log::trace!("Skipping stream event {}", other);
            Ok(Decoded::Skip)
        }
    }
}

/// Fragments of one run; fuses after the first terminal fragment or error
pub struct RunStream<R> {
    events: SseReader<R>,
    finished: bool,
}

impl<R: BufRead> RunStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            events: SseReader::new(reader),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for RunStream<R> {
    type Item = Result<StreamFragment, ServiceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let event = match self.events.next() {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            };

            match decode_event(&event) {
                Ok(Decoded::Fragment(fragment)) => {
                    self.finished = fragment.is_terminal();
                    return Some(Ok(fragment));
                }
                Ok(Decoded::Skip) => continue,
                Ok(Decoded::End) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_created_requires_id() {
        let created: Created = serde_json::from_str(r#"{"id":"thread_abc","object":"thread"}"#).unwrap();
        assert_eq!(created.into_id().unwrap(), "thread_abc");

        let missing: Created = serde_json::from_str(r#"{"object":"thread"}"#).unwrap();
        assert!(matches!(missing.into_id(), Err(ServiceError::MissingField("id"))));

        let empty: Created = serde_json::from_str(r#"{"id":""}"#).unwrap();
        assert!(matches!(empty.into_id(), Err(ServiceError::MissingField("id"))));
    }

    fn run(input: &str) -> Vec<Result<StreamFragment, ServiceError>> {
        RunStream::new(Cursor::new(input.as_bytes().to_vec())).collect()
    }

    fn delta(text: &str) -> String {
        format!(
            "event: thread.message.delta\ndata: {{\"id\":\"msg_1\",\"object\":\"thread.message.delta\",\"delta\":{{\"content\":[{{\"index\":0,\"type\":\"text\",\"text\":{{\"value\":\"{}\"}}}}]}}}}\n\n",
            text
        )
    }

    #[test]
    fn test_deltas_then_completed() {
        let input = format!(
            "event: thread.run.created\ndata: {{\"id\":\"run_1\"}}\n\n{}{}event: thread.run.completed\ndata: {{\"id\":\"run_1\",\"status\":\"completed\"}}\n\nevent: done\ndata: [DONE]\n\n",
            delta("Hel"),
            delta("lo")
        );

        let fragments: Vec<StreamFragment> = run(&input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            fragments,
            vec![
                StreamFragment::Delta("Hel".to_string()),
                StreamFragment::Delta("lo".to_string()),
                StreamFragment::Completed,
            ]
        );
    }

    #[test]
    fn test_run_failed_reports_last_error() {
        let input = "event: thread.run.failed\ndata: {\"id\":\"run_1\",\"status\":\"failed\",\"last_error\":{\"code\":\"rate_limit_exceeded\",\"message\":\"Slow down\"}}\n\n";
        let fragments: Vec<StreamFragment> = run(input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            fragments,
            vec![StreamFragment::Failed {
                message: "Slow down".to_string(),
                code: "rate_limit_exceeded".to_string(),
            }]
        );
    }

    #[test]
    fn test_run_expired_without_error_uses_status() {
        let input = "event: thread.run.expired\ndata: {\"id\":\"run_1\",\"status\":\"expired\",\"last_error\":null}\n\n";
        let fragments: Vec<StreamFragment> = run(input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            fragments,
            vec![StreamFragment::Failed {
                message: "Run ended with status 'expired'".to_string(),
                code: "expired".to_string(),
            }]
        );
    }

    #[test]
    fn test_error_event() {
        let input = "event: error\ndata: {\"error\":{\"message\":\"Server  overloaded\",\"code\":\"server_error\"}}\n\n";
        let fragments: Vec<StreamFragment> = run(input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            fragments,
            vec![StreamFragment::Failed {
                message: "Server overloaded".to_string(),
                code: "server_error".to_string(),
            }]
        );
    }

    #[test]
    fn test_stream_stops_after_terminal_fragment() {
        let input = format!(
            "event: thread.run.completed\ndata: {{}}\n\n{}",
            delta("late")
        );
        let fragments = run(&input);
        assert_eq!(fragments.len(), 1);
        assert!(matches!(fragments[0], Ok(StreamFragment::Completed)));
    }

    #[test]
    fn test_non_text_parts_are_skipped() {
        let input = "event: thread.message.delta\ndata: {\"delta\":{\"content\":[{\"index\":0,\"type\":\"image_file\",\"image_file\":{\"file_id\":\"f\"}}]}}\n\nevent: thread.run.completed\ndata: {}\n\n";
        let fragments: Vec<StreamFragment> = run(input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec![StreamFragment::Completed]);
    }

    #[test]
    fn test_malformed_delta_is_error_and_ends_stream() {
        let input = format!("event: thread.message.delta\ndata: not json\n\n{}", delta("x"));
        let fragments = run(&input);
        assert_eq!(fragments.len(), 1);
        assert!(matches!(fragments[0], Err(ServiceError::Decode(_))));
    }

    #[test]
    fn test_done_sentinel_without_event_name() {
        let input = format!("{}data: [DONE]\n\n{}", delta("a"), delta("b"));
        let fragments: Vec<StreamFragment> = run(&input).into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec![StreamFragment::Delta("a".to_string())]);
    }

    #[test]
    fn test_api_error_from_json_body() {
        let err = api_error(r#"{"error":{"message":"Invalid API key","code":"invalid_api_key"}}"#, "401");
        assert!(matches!(
            err,
            ServiceError::Api { ref message, ref code } if message == "Invalid API key" && code == "invalid_api_key"
        ));
    }

    #[test]
    fn test_api_error_from_plain_text_uses_fallback_code() {
        let err = api_error("  Bad Gateway  ", "502");
        assert!(matches!(
            err,
            ServiceError::Api { ref message, ref code } if message == "Bad Gateway" && code == "502"
        ));
    }

    #[test]
    fn test_url_with_api_version() {
        let client = AssistantsClient::new(ServiceSettings {
            endpoint: "https://example.test/openai".to_string(),
            model_name: "gpt-4o".to_string(),
            api_key: "sk".to_string(),
            api_version: Some("2024-05-01-preview".to_string()),
        });
        assert_eq!(
            client.url("threads/t1/runs"),
            "https://example.test/openai/threads/t1/runs?api-version=2024-05-01-preview"
        );
    }
}
