//! Remote store client.
//! Talks to the spreadsheet-backed script service: two GET reads (members,
//! chart data) and two multipart POST writes (photo upload, position update).
//! Every GET carries a `t` timestamp so no cache answers in the service's place.
//! Writes are either opaque (body never read, success assumed) or acknowledged
//! (body read, failures retried).

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::{Config, WriteMode};
use crate::error::StoreError;
use crate::model::{ChartResponse, ChartSnapshot, Member, MembersResponse, WriteResponse};

const ACTION_MEMBERS: &str = "getMembers";
const ACTION_CHART: &str = "getOrganogramaData";
const ACTION_UPLOAD: &str = "uploadFoto";
const ACTION_UPDATE: &str = "updateCargo";

/// What the client knows about a write after sending it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The service confirmed the write.
    Acknowledged,
    /// The request went out but its response was not read.
    Assumed,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_members(&self) -> Result<Vec<Member>, StoreError>;

    async fn fetch_chart(&self) -> Result<ChartSnapshot, StoreError>;

    /// `image_base64` carries no `data:` header.
    async fn upload_photo(&self, position_id: &str, image_base64: &str) -> Result<WriteOutcome, StoreError>;

    async fn update_position(
        &self,
        position_id: &str,
        name: &str,
        member_number: &str,
    ) -> Result<WriteOutcome, StoreError>;
}

// *************** HTTP implementation ***************

pub struct HttpStore {
    client: Client,
    base_url: String,
    write_mode: WriteMode,
    max_write_retries: u32,
    retry_delay: Duration,
}

impl HttpStore {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(StoreError::Client)?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            write_mode: config.write_mode,
            max_write_retries: config.max_write_retries,
            retry_delay: config.retry_delay(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, action: &'static str) -> Result<T, StoreError> {
        let url = read_url(&self.base_url, action, chrono::Utc::now().timestamp_millis());
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StoreError::Network { action, source })?;

        if !response.status().is_success() {
            return Err(StoreError::Http {
                action,
                status: response.status(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| StoreError::Network { action, source })?;
        serde_json::from_str(&body).map_err(|e| StoreError::parse(action, e.to_string()))
    }

    /// Sends a write, retrying only in acknowledged mode.
    async fn post_with_retry(&self, action: &'static str, fields: &[(&str, &str)]) -> Result<WriteOutcome, StoreError> {
        let attempts = match self.write_mode {
            WriteMode::Opaque => 1,
            WriteMode::Acknowledged => self.max_write_retries + 1,
        };

        let mut attempt = 1;
        loop {
            match self.post(action, fields).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    tracing::warn!(action, attempt, attempts, error = %e, "write failed");
                    if attempt >= attempts {
                        return Err(e);
                    }
                }
            }
            attempt += 1;
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    async fn post(&self, action: &'static str, fields: &[(&str, &str)]) -> Result<WriteOutcome, StoreError> {
        // Multipart forms are consumed on send, so one is built per attempt.
        let mut form = Form::new().text("action", action);
        for (key, value) in fields {
            form = form.text(key.to_string(), value.to_string());
        }

        let response = self
            .client
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| StoreError::Network { action, source })?;

        if self.write_mode == WriteMode::Opaque {
            return Ok(WriteOutcome::Assumed);
        }

        if !response.status().is_success() {
            return Err(StoreError::Http {
                action,
                status: response.status(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|source| StoreError::Network { action, source })?;
        parse_write(action, &body)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn fetch_members(&self) -> Result<Vec<Member>, StoreError> {
        let response: MembersResponse = self.get_json(ACTION_MEMBERS).await?;
        let members = members_from_response(response)?;
        tracing::info!(count = members.len(), "members loaded");
        Ok(members)
    }

    async fn fetch_chart(&self) -> Result<ChartSnapshot, StoreError> {
        let response: ChartResponse = self.get_json(ACTION_CHART).await?;
        let snapshot = snapshot_from_response(response)?;
        tracing::info!(positions = snapshot.cargos.len(), "chart data loaded");
        Ok(snapshot)
    }

    async fn upload_photo(&self, position_id: &str, image_base64: &str) -> Result<WriteOutcome, StoreError> {
        let outcome = self
            .post_with_retry(ACTION_UPLOAD, &[("cargoId", position_id), ("imageData", image_base64)])
            .await?;
        tracing::info!(position_id, ?outcome, "photo sent");
        Ok(outcome)
    }

    async fn update_position(
        &self,
        position_id: &str,
        name: &str,
        member_number: &str,
    ) -> Result<WriteOutcome, StoreError> {
        let outcome = self
            .post_with_retry(
                ACTION_UPDATE,
                &[("cargoId", position_id), ("nomeCompleto", name), ("numeroMembro", member_number)],
            )
            .await?;
        tracing::info!(position_id, ?outcome, "position updated");
        Ok(outcome)
    }
}

// *************** Response handling ***************

fn read_url(base_url: &str, action: &str, timestamp_ms: i64) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{sep}action={action}&t={timestamp_ms}")
}

fn members_from_response(response: MembersResponse) -> Result<Vec<Member>, StoreError> {
    if !response.success {
        return Err(StoreError::Remote {
            action: ACTION_MEMBERS,
            message: response.error.unwrap_or_else(|| "unknown error".into()),
        });
    }
    response
        .members
        .ok_or_else(|| StoreError::parse(ACTION_MEMBERS, "missing `members`"))
}

fn snapshot_from_response(response: ChartResponse) -> Result<ChartSnapshot, StoreError> {
    if !response.success {
        return Err(StoreError::Remote {
            action: ACTION_CHART,
            message: response.error.unwrap_or_else(|| "unknown error".into()),
        });
    }
    let incomplete = |field| StoreError::Incomplete {
        action: ACTION_CHART,
        field,
    };
    let cargos = response.cargos.ok_or_else(|| incomplete("cargos"))?;
    let fotos = response.fotos.ok_or_else(|| incomplete("fotos"))?;
    Ok(ChartSnapshot { cargos, fotos })
}

fn parse_write(action: &'static str, body: &str) -> Result<WriteOutcome, StoreError> {
    let ack: WriteResponse = serde_json::from_str(body).map_err(|e| StoreError::parse(action, e.to_string()))?;
    if ack.success {
        Ok(WriteOutcome::Acknowledged)
    } else {
        Err(StoreError::Remote {
            action,
            message: ack.error.unwrap_or_else(|| "unknown error".into()),
        })
    }
}

// *************** Tests ***************

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn parse_members(body: &str) -> Result<Vec<Member>, StoreError> {
        let r: MembersResponse =
            serde_json::from_str(body).map_err(|e| StoreError::parse(ACTION_MEMBERS, e.to_string()))?;
        members_from_response(r)
    }

    fn parse_chart(body: &str) -> Result<ChartSnapshot, StoreError> {
        let r: ChartResponse =
            serde_json::from_str(body).map_err(|e| StoreError::parse(ACTION_CHART, e.to_string()))?;
        snapshot_from_response(r)
    }

    /// Local HTTP/1.1 service answering every request with `200 OK` and `body`.
    struct Loopback {
        url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl Loopback {
        async fn start(body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}/exec", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let request = read_request(&mut socket).await;
                    seen.lock().unwrap().push(request);
                    let reply = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
            Self { url, requests }
        }

        fn hits(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, i: usize) -> String {
            self.requests.lock().unwrap()[i].clone()
        }

        fn store(&self, write_mode: WriteMode) -> HttpStore {
            let config = Config {
                base_url: self.url.clone(),
                write_mode,
                timeout_secs: 5,
                max_write_retries: 2,
                retry_delay_ms: 10,
                ..Config::default()
            };
            HttpStore::new(&config).unwrap()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            if head.contains("transfer-encoding: chunked") {
                if buf.ends_with(b"0\r\n\r\n") {
                    break;
                }
                continue;
            }
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Value of the multipart field `name`, or `None` if it was not sent.
    fn form_field<'a>(request: &'a str, name: &str) -> Option<&'a str> {
        let start = request.find(&format!("name=\"{name}\""))?;
        let rest = &request[start..];
        let value = &rest[rest.find("\r\n\r\n")? + 4..];
        Some(&value[..value.find("\r\n")?])
    }

    #[test]
    fn test_read_url_has_action_and_timestamp() {
        assert_eq!(
            read_url("https://x.test/exec", ACTION_MEMBERS, 42),
            "https://x.test/exec?action=getMembers&t=42"
        );
        assert_eq!(
            read_url("https://x.test/exec?key=1", ACTION_CHART, 7),
            "https://x.test/exec?key=1&action=getOrganogramaData&t=7"
        );
    }

    #[test]
    fn test_members_success() {
        let members = parse_members(r#"{"success":true,"members":[{"numeroMembro":"001","nome":"A"}]}"#).unwrap();
        assert_eq!(members, vec![Member::new("001", "A")]);
    }

    #[test]
    fn test_members_server_failure() {
        let err = parse_members(r#"{"success":false,"error":"sheet missing"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Remote { ref message, .. } if message == "sheet missing"));
    }

    #[test]
    fn test_members_malformed() {
        assert!(matches!(parse_members("<html>").unwrap_err(), StoreError::Parse { .. }));
        assert!(matches!(parse_members(r#"{"success":true}"#).unwrap_err(), StoreError::Parse { .. }));
    }

    #[test]
    fn test_chart_requires_cargos_and_fotos() {
        let ok = parse_chart(
            r#"{"success":true,"cargos":{"presidente-nacional":{"nomeCompleto":"ANA","numeroMembro":"010"}},"fotos":{"presidente-nacional":null}}"#,
        )
        .unwrap();
        assert_eq!(ok.cargos.len(), 1);
        assert_eq!(ok.fotos.get("presidente-nacional"), Some(&None));

        let err = parse_chart(r#"{"success":true,"cargos":{}}"#).unwrap_err();
        assert!(matches!(err, StoreError::Incomplete { field: "fotos", .. }));
        let err = parse_chart(r#"{"success":true,"fotos":{}}"#).unwrap_err();
        assert!(matches!(err, StoreError::Incomplete { field: "cargos", .. }));
    }

    #[test]
    fn test_parse_write_ack() {
        assert_eq!(parse_write(ACTION_UPDATE, r#"{"success":true}"#).unwrap(), WriteOutcome::Acknowledged);
        assert!(matches!(
            parse_write(ACTION_UPDATE, r#"{"success":false,"error":"locked"}"#).unwrap_err(),
            StoreError::Remote { .. }
        ));
        assert!(matches!(parse_write(ACTION_UPLOAD, "ok").unwrap_err(), StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_opaque_write_is_sent_once_and_assumed() {
        let service = Loopback::start("OK").await;
        let store = service.store(WriteMode::Opaque);

        let outcome = store.update_position("presidente-nacional", "ANA", "010").await.unwrap();
        assert_eq!(outcome, WriteOutcome::Assumed);
        assert_eq!(service.hits(), 1);

        let request = service.request(0);
        assert!(request.starts_with("POST /exec "), "{request}");
        assert_eq!(form_field(&request, "action"), Some("updateCargo"));
        assert_eq!(form_field(&request, "cargoId"), Some("presidente-nacional"));
        assert_eq!(form_field(&request, "nomeCompleto"), Some("ANA"));
        assert_eq!(form_field(&request, "numeroMembro"), Some("010"));
    }

    #[tokio::test]
    async fn test_upload_sends_position_and_image() {
        let service = Loopback::start("").await;
        let store = service.store(WriteMode::Opaque);

        store.upload_photo("secretario-presidencia", "AQID").await.unwrap();
        let request = service.request(0);
        assert_eq!(form_field(&request, "action"), Some("uploadFoto"));
        assert_eq!(form_field(&request, "cargoId"), Some("secretario-presidencia"));
        assert_eq!(form_field(&request, "imageData"), Some("AQID"));
        assert_eq!(form_field(&request, "nomeCompleto"), None);
    }

    #[tokio::test]
    async fn test_acknowledged_write_retries_then_fails() {
        // A plain-text reply is not an acknowledgement.
        let service = Loopback::start("OK").await;
        let store = service.store(WriteMode::Acknowledged);

        let err = store.update_position("presidente-nacional", "ANA", "010").await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { action: ACTION_UPDATE, .. }), "{err}");
        assert_eq!(service.hits(), 3);
    }

    #[tokio::test]
    async fn test_acknowledged_write_rejected_by_server() {
        let service = Loopback::start(r#"{"success":false,"error":"locked"}"#).await;
        let store = service.store(WriteMode::Acknowledged);

        let err = store.upload_photo("presidente-nacional", "AQID").await.unwrap_err();
        assert!(matches!(err, StoreError::Remote { ref message, .. } if message == "locked"));
        assert_eq!(service.hits(), 3);
    }

    #[tokio::test]
    async fn test_acknowledged_write_succeeds_first_time() {
        let service = Loopback::start(r#"{"success":true}"#).await;
        let store = service.store(WriteMode::Acknowledged);

        let outcome = store.update_position("vice-presidente-nacional", "RUI", "7").await.unwrap();
        assert_eq!(outcome, WriteOutcome::Acknowledged);
        assert_eq!(service.hits(), 1);
    }

    #[tokio::test]
    async fn test_fetch_members_over_http() {
        let service = Loopback::start(r#"{"success":true,"members":[{"numeroMembro":1,"nome":"ANA"}]}"#).await;
        let store = service.store(WriteMode::Opaque);

        let members = store.fetch_members().await.unwrap();
        assert_eq!(members, vec![Member::new("1", "ANA")]);
        assert!(service.request(0).starts_with("GET /exec?action=getMembers&t="));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = Config {
            base_url: "http://127.0.0.1:9/exec".into(),
            timeout_secs: 2,
            ..Config::default()
        };
        let store = HttpStore::new(&config).unwrap();
        let err = store.fetch_members().await.unwrap_err();
        assert!(matches!(err, StoreError::Network { .. }));
    }

    #[tokio::test]
    #[ignore = "requires the live chart service"]
    async fn test_real_fetch_chart() {
        // Run with: cargo test test_real_fetch_chart -- --ignored
        let store = HttpStore::new(&Config::default()).unwrap();
        let result = store.fetch_chart().await;
        println!("Result: {:?}", result.as_ref().map(|s| s.cargos.len()));
        assert!(result.is_ok());
    }
}
