//! HTTP client for the inference service.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{info, warn};

use super::{InferenceClient, TransportError};
use crate::config::ServiceConfig;
use crate::pipeline::request::{NotePayload, TriagePayload};

const HEALTH_PATH: &str = "/health";

/// reqwest-backed [`InferenceClient`]. Built explicitly from a
/// [`ServiceConfig`] and owned by whoever mounts it.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl HttpInferenceClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                TransportError::ServiceUnavailable(format!("HTTP client setup failed: {e}"))
            })?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Send, check the status, and decode the body as JSON.
    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<Value, TransportError> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            endpoint = path,
            status = status.as_u16(),
            elapsed_ms,
            response_len = body.len(),
            "Inference call finished"
        );

        if !status.is_success() {
            return Err(TransportError::ServiceError {
                status: status.as_u16(),
                detail: error_detail(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(endpoint = path, error = %e, "Response body is not JSON");
            TransportError::MalformedResponse(format!("Response body is not valid JSON: {e}"))
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_connect() {
            TransportError::ServiceUnavailable(format!(
                "Cannot connect to {}",
                self.config.base_url
            ))
        } else if e.is_timeout() {
            TransportError::ServiceUnavailable(format!(
                "Request timed out after {}s",
                self.config.request_timeout.as_secs_f64()
            ))
        } else {
            TransportError::ServiceUnavailable(e.to_string())
        }
    }
}

/// Form part for the encounter image. A media type reqwest cannot parse is
/// a request-building failure, not a service outage.
fn image_part(bytes: &[u8], file_name: &str, media_type: &str) -> Result<Part, TransportError> {
    Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(media_type)
        .map_err(|e| {
            TransportError::InvalidRequest(format!("image media type {media_type:?}: {e}"))
        })
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn triage(&self, payload: &TriagePayload) -> Result<Value, TransportError> {
        let path = payload.endpoint().path();
        let url = self.config.endpoint(path);

        let request = match payload {
            TriagePayload::Multipart { fields, image } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(*name, value.clone());
                }
                if let Some(image) = image {
                    let part = image_part(&image.bytes, &image.file_name, image.media_type)?;
                    form = form.part("image", part);
                }
                self.client.post(&url).multipart(form)
            }
            TriagePayload::Json(body) => self.client.post(&url).json(body),
        };

        self.execute(path, request).await
    }

    async fn generate_note(&self, payload: &NotePayload) -> Result<Value, TransportError> {
        let path = payload.endpoint().path();
        let url = self.config.endpoint(path);

        let request = match payload {
            NotePayload::Query { notes } => self.client.post(&url).query(&[("notes", notes)]),
            NotePayload::Json(body) => self.client.post(&url).json(body),
        };

        self.execute(path, request).await
    }

    async fn health(&self) -> Result<(), TransportError> {
        let url = self.config.endpoint(HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::ServiceError {
            status: status.as_u16(),
            detail: error_detail(status, &body),
        })
    }
}

/// Human-readable reason for a failed call.
///
/// Prefers the service's `{"detail": ...}` field, then the raw body, then the
/// HTTP reason phrase.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::{Multipart, Query};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use crate::pipeline::imaging::{EncounterImage, JPEG_MEDIA_TYPE};
    use crate::pipeline::request::{JsonTriageBody, JsonVitals, NoteRequest};
    use crate::pipeline::transport::{cancel_pair, cancellable};

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: &str) -> HttpInferenceClient {
        HttpInferenceClient::new(&ServiceConfig::new(base_url)).unwrap()
    }

    fn multipart_payload(image: Option<EncounterImage>) -> TriagePayload {
        TriagePayload::Multipart {
            fields: vec![
                ("text", "Severe crushing chest pain radiating to left arm".into()),
                ("hr", "135".into()),
                ("bp_sys", "180".into()),
                ("bp_dia", "110".into()),
                ("spo2", "88".into()),
                ("temp", "98.4".into()),
                ("rr", "28".into()),
            ],
            image,
        }
    }

    /// Echoes each multipart part back as `{name: value}`; the image part
    /// is reported by file name, content type and size.
    async fn echo_multipart(mut multipart: Multipart) -> Json<Value> {
        let mut received = serde_json::Map::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let size = field.bytes().await.unwrap().len();
                received.insert(
                    name,
                    json!({ "file_name": file_name, "content_type": content_type, "size": size }),
                );
            } else {
                received.insert(name, Value::String(field.text().await.unwrap()));
            }
        }
        Json(json!({
            "clinical_json": { "esi_level": 2 },
            "received": received,
        }))
    }

    #[test]
    fn unparseable_media_type_is_an_invalid_request() {
        assert!(image_part(b"jpeg", "wound.jpg", JPEG_MEDIA_TYPE).is_ok());

        let err = image_part(b"jpeg", "wound.jpg", "not a mime").unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn multipart_fields_reach_the_service() {
        let base = serve(Router::new().route("/triage/multimodal", post(echo_multipart))).await;
        let image = EncounterImage {
            file_name: "ecg.png".into(),
            media_type: JPEG_MEDIA_TYPE,
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 1,
            height: 1,
        };

        let body = client_for(&base)
            .triage(&multipart_payload(Some(image)))
            .await
            .unwrap();

        let received = &body["received"];
        assert_eq!(received["text"], "Severe crushing chest pain radiating to left arm");
        assert_eq!(received["hr"], "135");
        assert_eq!(received["bp_sys"], "180");
        assert_eq!(received["bp_dia"], "110");
        assert_eq!(received["spo2"], "88");
        assert_eq!(received["temp"], "98.4");
        assert_eq!(received["rr"], "28");
        assert_eq!(received["image"]["file_name"], "ecg.png");
        assert_eq!(received["image"]["content_type"], "image/jpeg");
        assert_eq!(received["image"]["size"], 4);
    }

    #[tokio::test]
    async fn json_triage_is_posted_as_json() {
        let app = Router::new().route(
            "/api/triage",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "esi_level": 1,
                    "confidence": 0.9,
                    "echo": body,
                }))
            }),
        );
        let base = serve(app).await;
        let payload = TriagePayload::Json(JsonTriageBody {
            chief_complaint: "Stroke symptoms".into(),
            vitals: JsonVitals {
                hr: 90,
                bp_sys: 200,
                bp_dia: 120,
                spo2: 95,
                temp: 98.6,
                rr: 18,
            },
            image_base64: None,
        });

        let body = client_for(&base).triage(&payload).await.unwrap();
        assert_eq!(body["esi_level"], 1);
        assert_eq!(body["echo"]["chief_complaint"], "Stroke symptoms");
        assert_eq!(body["echo"]["vitals"]["bp_sys"], 200);
    }

    #[tokio::test]
    async fn note_query_and_json_routes() {
        let app = Router::new()
            .route(
                "/document/soap",
                post(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({ "notes_seen": params.get("notes") }))
                }),
            )
            .route(
                "/api/generate-note",
                post(|Json(body): Json<Value>| async move { Json(json!({ "echo": body })) }),
            );
        let base = serve(app).await;
        let client = client_for(&base);

        let body = client
            .generate_note(&NotePayload::Query {
                notes: "RLQ pain & fever".into(),
            })
            .await
            .unwrap();
        assert_eq!(body["notes_seen"], "RLQ pain & fever");

        let body = client
            .generate_note(&NotePayload::Json(NoteRequest::new("Laceration, L forearm")))
            .await
            .unwrap();
        assert_eq!(body["echo"]["encounter_text"], "Laceration, L forearm");
        assert_eq!(body["echo"]["encounter_type"], "Emergency");
    }

    #[tokio::test]
    async fn server_error_detail_is_extracted() {
        let app = Router::new().route(
            "/triage/multimodal",
            post(|| async {
                (
                    AxumStatus::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "model overloaded" })),
                )
            }),
        );
        let base = serve(app).await;

        let err = client_for(&base)
            .triage(&multipart_payload(None))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::ServiceError {
                status: 500,
                detail: "model overloaded".into()
            }
        );
    }

    #[tokio::test]
    async fn plain_text_error_body_is_used_as_detail() {
        let app = Router::new().route(
            "/api/triage",
            post(|| async { (AxumStatus::BAD_GATEWAY, "upstream model crashed") }),
        );
        let base = serve(app).await;
        let payload = TriagePayload::Json(JsonTriageBody {
            chief_complaint: "x".into(),
            vitals: JsonVitals {
                hr: 80,
                bp_sys: 120,
                bp_dia: 80,
                spo2: 98,
                temp: 98.6,
                rr: 16,
            },
            image_base64: None,
        });

        let err = client_for(&base).triage(&payload).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::ServiceError {
                status: 502,
                detail: "upstream model crashed".into()
            }
        );
    }

    #[tokio::test]
    async fn non_json_success_is_malformed() {
        let app = Router::new().route(
            "/triage/multimodal",
            post(|| async { "<html>proxy login</html>" }),
        );
        let base = serve(app).await;

        let err = client_for(&base)
            .triage(&multipart_payload(None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        // Grab a free port, then close it so nothing is listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{addr}"))
            .triage(&multipart_payload(None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn slow_service_times_out_as_unavailable() {
        let app = Router::new().route(
            "/triage/multimodal",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );
        let base = serve(app).await;
        let mut config = ServiceConfig::new(&base);
        config.request_timeout = Duration::from_millis(200);

        let err = HttpInferenceClient::new(&config)
            .unwrap()
            .triage(&multipart_payload(None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn in_flight_request_can_be_cancelled() {
        let app = Router::new().route(
            "/triage/multimodal",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );
        let base = serve(app).await;
        let client = client_for(&base);
        let (handle, token) = cancel_pair();

        let payload = multipart_payload(None);
        let call = cancellable(client.triage(&payload), Some(token));
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        };
        let (result, ()) = tokio::join!(call, cancel);
        assert_eq!(result, Err(TransportError::Cancelled));
    }

    #[tokio::test]
    async fn health_probe() {
        let base = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        assert!(client_for(&base).health().await.is_ok());

        let base = serve(Router::new().route(
            "/health",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "") }),
        ))
        .await;
        let err = client_for(&base).health().await.unwrap_err();
        assert_eq!(
            err,
            TransportError::ServiceError {
                status: 503,
                detail: "Service Unavailable".into()
            }
        );
    }

    #[test]
    fn detail_prefers_json_field() {
        assert_eq!(
            error_detail(StatusCode::BAD_REQUEST, r#"{"detail":"bad vitals"}"#),
            "bad vitals"
        );
    }

    #[test]
    fn structured_detail_is_stringified() {
        let detail = error_detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","text"],"msg":"field required"}]}"#,
        );
        assert!(detail.contains("field required"));
    }

    #[test]
    fn empty_body_falls_back_to_reason() {
        assert_eq!(error_detail(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(error_detail(StatusCode::NOT_FOUND, "{}"), "{}");
    }
}
