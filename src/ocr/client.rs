//! Remote OCR service client.
//!
//! Sends the composite JPEG to a general-OCR HTTP API and parses the
//! `images[].fields[].inferText` reply. One request per upload, with a
//! timeout and no retries.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};

/// A service that reads text out of an encoded image.
pub trait OcrService: Send + Sync {
    /// Recognizes `jpeg`; `name` identifies the upload in logs and audit files.
    fn recognize(&self, jpeg: &[u8], name: &str) -> PipelineResult<OcrResponse>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrField {
    #[serde(rename = "inferText")]
    pub infer_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrImage {
    pub fields: Vec<OcrField>,
}

/// The parts of the vendor reply the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrResponse {
    pub images: Vec<OcrImage>,
}

impl OcrResponse {
    /// Fragments per submitted image, in the service's reading order.
    pub fn fragments(&self) -> Vec<Vec<&str>> {
        self.images
            .iter()
            .map(|image| image.fields.iter().map(|f| f.infer_text.as_str()).collect())
            .collect()
    }
}

/// Parses a raw reply body.
pub fn parse_response(body: &str) -> PipelineResult<OcrResponse> {
    serde_json::from_str(body).map_err(|e| PipelineError::MalformedOcrResponse(e.to_string()))
}

/// Client for the general-OCR API (`X-OCR-SECRET` authenticated, V2 schema).
pub struct GeneralOcrClient {
    client: reqwest::blocking::Client,
    url: String,
    secret: String,
    lang: String,
    /// Where raw replies are kept for auditing
    json_dir: Option<PathBuf>,
}

impl GeneralOcrClient {
    pub fn new(config: &AppConfig, json_dir: Option<PathBuf>) -> PipelineResult<Self> {
        if config.ocr_api_url.is_empty() {
            return Err(PipelineError::OcrService(
                "OCR API URL is not configured (set OCR_API_URL or ocr_api_url)".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.ocr_timeout_ms))
            .build()
            .map_err(|e| PipelineError::OcrService(e.to_string()))?;

        Ok(Self {
            client,
            url: config.ocr_api_url.clone(),
            secret: config.ocr_secret.clone(),
            lang: config.ocr_lang.clone(),
            json_dir,
        })
    }

    fn request_body(&self, jpeg: &[u8]) -> (String, serde_json::Value) {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "version": "V2",
            "requestId": request_id,
            "lang": self.lang,
            "timestamp": 0,
            "images": [{
                "format": "jpg",
                "name": "result",
                "data": BASE64.encode(jpeg),
            }],
        });
        (request_id, body)
    }

    fn save_raw(&self, name: &str, body: &str) {
        let Some(dir) = &self.json_dir else {
            return;
        };
        let path = dir.join(format!("{}.json", name));
        if let Err(e) = std::fs::write(&path, body) {
            log::warn!("Failed to save OCR response {}: {}", path.display(), e);
        }
    }
}

impl OcrService for GeneralOcrClient {
    fn recognize(&self, jpeg: &[u8], name: &str) -> PipelineResult<OcrResponse> {
        let (request_id, body) = self.request_body(jpeg);
        log::info!(
            "OCR request {} for {} ({} bytes)",
            request_id,
            name,
            jpeg.len()
        );

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-OCR-SECRET", &self.secret)
            .body(body.to_string())
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::OcrService(format!("request {} timed out", request_id))
                } else {
                    PipelineError::OcrService(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| PipelineError::OcrService(e.to_string()))?;

        self.save_raw(name, &text);
        if !status.is_success() {
            return Err(PipelineError::OcrService(format!("HTTP {}: {}", status, text)));
        }

        let parsed = parse_response(&text)?;
        log::info!(
            "OCR request {} returned {} image(s)",
            request_id,
            parsed.images.len()
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "version": "V2",
            "requestId": "abc",
            "images": [{
                "uid": "x",
                "name": "result",
                "inferResult": "SUCCESS",
                "fields": [
                    {"inferText": "score", "inferConfidence": 0.99},
                    {"inferText": "9876543", "inferConfidence": 0.97}
                ]
            }]
        }"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.fragments(), vec![vec!["score", "9876543"]]);
    }

    #[test]
    fn test_parse_response_missing_images() {
        let err = parse_response(r#"{"version": "V2"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedOcrResponse(_)));
    }

    #[test]
    fn test_parse_response_missing_infer_text() {
        let err = parse_response(r#"{"images": [{"fields": [{"text": "x"}]}]}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedOcrResponse(_)));
    }

    #[test]
    fn test_client_requires_url() {
        let config = AppConfig::default();
        assert!(matches!(
            GeneralOcrClient::new(&config, None),
            Err(PipelineError::OcrService(_))
        ));
    }

    /// Serves one HTTP request with the given status line and body, after
    /// reading the whole request.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/ocr", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (key, value) = line.split_once(':')?;
                            if key.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(reply.as_bytes()).unwrap();
        });
        url
    }

    /// A client for the local responder; bypasses any proxy from the environment.
    fn client_for(url: String, json_dir: &std::path::Path) -> GeneralOcrClient {
        GeneralOcrClient {
            client: reqwest::blocking::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            url,
            secret: "secret".to_string(),
            lang: "ja".to_string(),
            json_dir: Some(json_dir.to_path_buf()),
        }
    }

    #[test]
    fn test_error_reply_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("500 Internal Server Error", r#"{"code":"0500","message":"boom"}"#);
        let client = client_for(url, dir.path());

        let err = client.recognize(&[0xFF, 0xD8], "upload-1").unwrap_err();
        assert!(matches!(err, PipelineError::OcrService(_)));

        let saved = std::fs::read_to_string(dir.path().join("upload-1.json")).unwrap();
        assert!(saved.contains("boom"));
    }

    #[test]
    fn test_success_reply_is_saved_and_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("200 OK", r#"{"images":[{"fields":[{"inferText":"score"}]}]}"#);
        let client = client_for(url, dir.path());

        let response = client.recognize(&[0xFF, 0xD8], "upload-2").unwrap();
        assert_eq!(response.fragments(), vec![vec!["score"]]);
        assert!(dir.path().join("upload-2.json").exists());
    }

    #[test]
    fn test_request_body_shape() {
        let config = AppConfig {
            ocr_api_url: "http://localhost:9/ocr".to_string(),
            ..AppConfig::default()
        };
        let client = GeneralOcrClient::new(&config, None).unwrap();
        let (request_id, body) = client.request_body(&[1, 2, 3]);

        assert_eq!(body["requestId"], request_id.as_str());
        assert_eq!(body["version"], "V2");
        assert_eq!(body["lang"], "ja");
        assert_eq!(body["images"][0]["format"], "jpg");
        assert_eq!(body["images"][0]["data"], "AQID");
    }
}
