// Transport - HTTP plumbing between the orchestrator and the translation service

use super::error::TransportError;
use super::types::{LanguageEntry, TranslateForm};
use crate::config::ClientConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

pub const TRANSLATE_VIDEO_PATH: &str = "/api/translate-video";
pub const VIDEO_LANGUAGES_PATH: &str = "/api/languages/video";

pub const DETECTED_LANGUAGE_HEADER: &str = "X-Detected-Language";
pub const CONFIDENCE_HEADER: &str = "X-Language-Confidence";

/// Sends requests to the translation service
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Upload a video for translation. Resolves once the response head has arrived.
    async fn translate_video(&self, form: TranslateForm) -> Result<Box<dyn TransportResponse>, TransportError>;

    /// Fetch the languages available for video translation
    async fn fetch_languages(&self) -> Result<Vec<LanguageEntry>, TransportError>;
}

/// A response whose body has not been read yet
#[async_trait]
pub trait TransportResponse: Send {
    fn status(&self) -> u16;

    /// Header value by case-insensitive name
    fn header(&self, name: &str) -> Option<String>;

    /// Consume the full body
    async fn bytes(self: Box<Self>) -> Result<Bytes, TransportError>;

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status())
    }
}

#[derive(Deserialize)]
struct LanguagesResponse {
    languages: Vec<LanguageEntry>,
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("vidlingo/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn translate_video(&self, form: TranslateForm) -> Result<Box<dyn TransportResponse>, TransportError> {
        let TranslateForm { file, target_lang } = form;

        tracing::debug!(
            "Uploading {} ({} bytes) for translation to {}",
            file.file_name,
            file.len(),
            target_lang
        );

        let length = file.len() as u64;
        let part = Part::stream_with_length(Body::from(file.bytes), length)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;

        let multipart = Form::new()
            .part("file", part)
            .text("target_lang", target_lang);

        let response = self
            .client
            .post(self.url(TRANSLATE_VIDEO_PATH))
            .multipart(multipart)
            .send()
            .await?;

        Ok(Box::new(HttpResponse(response)))
    }

    async fn fetch_languages(&self) -> Result<Vec<LanguageEntry>, TransportError> {
        let response = self.client.get(self.url(VIDEO_LANGUAGES_PATH)).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let body: LanguagesResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(body.languages)
    }
}

struct HttpResponse(reqwest::Response);

#[async_trait]
impl TransportResponse for HttpResponse {
    fn status(&self) -> u16 {
        self.0.status().as_u16()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.0
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn bytes(self: Box<Self>) -> Result<Bytes, TransportError> {
        self.0
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::types::VideoFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve a single canned HTTP response and hand back the raw request
    async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let head = text[..head_end].to_lowercase();
            let body_len = buf.len() - (head_end + 4);

            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());

            let done = match content_length {
                Some(len) => body_len >= len,
                None if head.contains("transfer-encoding: chunked") => text.ends_with("0\r\n\r\n"),
                None => true,
            };
            if done {
                break;
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");

        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(body);
        bytes
    }

    fn transport_for(base_url: &str) -> HttpTransport {
        let config = ClientConfig {
            api_url: format!("{}/", base_url),
            ..ClientConfig::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_trimmed() {
        let transport = transport_for("http://localhost:8000");
        assert_eq!(transport.base_url(), "http://localhost:8000");
        assert_eq!(transport.url(TRANSLATE_VIDEO_PATH), "http://localhost:8000/api/translate-video");
    }

    #[tokio::test]
    async fn test_translate_video_sends_multipart() {
        let response = http_response(
            "200 OK",
            &[
                ("Content-Type", "video/mp4"),
                (DETECTED_LANGUAGE_HEADER, "en"),
                (CONFIDENCE_HEADER, "0.95"),
            ],
            b"translated-bytes",
        );
        let (base_url, server) = serve_once(response).await;
        let transport = transport_for(&base_url);

        let form = TranslateForm {
            file: VideoFile::from_bytes("talk.mp4", "video/mp4", b"original-bytes".to_vec()),
            target_lang: "de".to_string(),
        };
        let response = transport.translate_video(form).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.header("x-detected-language").as_deref(), Some("en"));
        assert_eq!(response.header(CONFIDENCE_HEADER).as_deref(), Some("0.95"));
        assert_eq!(&response.bytes().await.unwrap()[..], b"translated-bytes");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/translate-video HTTP/1.1"));
        assert!(request.contains("multipart/form-data; boundary="));
        assert!(request.contains(r#"name="file"; filename="talk.mp4""#));
        assert!(request.contains("original-bytes"));
        assert!(request.contains(r#"name="target_lang""#));
        assert!(request.contains("\r\n\r\nde\r\n"));
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let response = http_response(
            "400 Bad Request",
            &[("Content-Type", "application/json")],
            br#"{"detail": "No speech detected"}"#,
        );
        let (base_url, _server) = serve_once(response).await;
        let transport = transport_for(&base_url);

        let form = TranslateForm {
            file: VideoFile::from_bytes("silent.mp4", "video/mp4", vec![0u8; 4]),
            target_lang: "ms".to_string(),
        };
        let response = transport.translate_video(form).await.unwrap();
        assert_eq!(response.status(), 400);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_fetch_languages() {
        let body = r#"{"languages": [
            {"code": "de", "name": "German", "native_name": "Deutsch", "flag": "🇩🇪"},
            {"code": "ms", "name": "Malay", "native_name": "Bahasa Melayu", "flag": "🇲🇾"}
        ]}"#;
        let response = http_response("200 OK", &[("Content-Type", "application/json")], body.as_bytes());
        let (base_url, server) = serve_once(response).await;

        let languages = transport_for(&base_url).fetch_languages().await.unwrap();
        assert_eq!(languages.len(), 2);
        assert_eq!(languages[0].code, "de");
        assert_eq!(languages[1].native_name, "Bahasa Melayu");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/languages/video HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_languages_error_status() {
        let response = http_response("503 Service Unavailable", &[], b"");
        let (base_url, _server) = serve_once(response).await;

        let err = transport_for(&base_url).fetch_languages().await.unwrap_err();
        assert_eq!(err, TransportError::Status(503));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport_for(&format!("http://{}", addr)).fetch_languages().await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
