// Core types for the video translation flow

use super::error::{TranslateError, ValidationError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Confidence below this marks the detected source language as unreliable
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Confidence assumed when the service does not report one
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Download name used when the service does not suggest one
pub const DEFAULT_OUTPUT_NAME: &str = "translated_video.mp4";

/// Video containers accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Mp4,
    Mov,
    Avi,
    Mkv,
    Webm,
}

impl VideoFormat {
    /// Detect the container from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp4" => Some(VideoFormat::Mp4),
            "mov" => Some(VideoFormat::Mov),
            "avi" => Some(VideoFormat::Avi),
            "mkv" => Some(VideoFormat::Mkv),
            "webm" => Some(VideoFormat::Webm),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "video/mp4",
            VideoFormat::Mov => "video/quicktime",
            VideoFormat::Avi => "video/x-msvideo",
            VideoFormat::Mkv => "video/x-matroska",
            VideoFormat::Webm => "video/webm",
        }
    }
}

/// A local video ready to be uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl VideoFile {
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a video from disk, accepting only known video extensions
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let format = VideoFormat::from_extension(ext)
            .ok_or_else(|| ValidationError::UnsupportedFileType(path.display().to_string()))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::UnreadableFile(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();

        Ok(Self::from_bytes(file_name, format.mime_type(), bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Where the video to translate comes from
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    File(VideoFile),
    Url(String),
}

/// User input for one translation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub source: Option<VideoSource>,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            source: None,
            target_language: target_language.into(),
        }
    }

    pub fn with_file(mut self, file: VideoFile) -> Self {
        self.source = Some(VideoSource::File(file));
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(VideoSource::Url(url.into()));
        self
    }

    /// Check the request can be sent and hand back the file to upload.
    /// A blank URL counts as no input at all.
    pub fn into_upload(self) -> Result<TranslateForm, ValidationError> {
        match self.source {
            None => Err(ValidationError::MissingInput),
            Some(VideoSource::Url(url)) if url.trim().is_empty() => Err(ValidationError::MissingInput),
            Some(VideoSource::Url(_)) => Err(ValidationError::UrlNotSupported),
            Some(VideoSource::File(file)) => Ok(TranslateForm {
                file,
                target_lang: self.target_language,
            }),
        }
    }
}

/// Multipart payload for the translate-video endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateForm {
    pub file: VideoFile,
    pub target_lang: String,
}

/// One selectable target language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
    pub native_name: String,
    pub flag: String,
}

impl LanguageEntry {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        native_name: impl Into<String>,
        flag: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            native_name: native_name.into(),
            flag: flag.into(),
        }
    }
}

/// Metadata read from the headers of a successful response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetadata {
    pub detected_language: Option<String>,
    pub confidence: f64,
    pub low_confidence: bool,
}

impl ResponseMetadata {
    /// Interpret raw header values. Missing or garbage confidence means fully confident.
    pub fn from_headers(detected_language: Option<&str>, confidence: Option<&str>) -> Self {
        let detected_language = detected_language
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let confidence = confidence
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE);

        Self {
            detected_language,
            confidence,
            low_confidence: confidence < LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// The translated video, held in memory until saved
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedVideo {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: String,
}

impl TranslatedVideo {
    pub fn new(bytes: Bytes, content_type: Option<String>, file_name: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
            file_name: file_name.unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Save the video to disk
    pub async fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        tokio::fs::write(path, &self.bytes).await
    }
}

/// Pull a download name out of a `Content-Disposition` header value.
///
/// `filename*` (UTF-8 only) is preferred over `filename`. The name is reduced to
/// its last path component; empty, dot and hidden names are refused.
pub fn disposition_file_name(header: &str) -> Option<String> {
    let params = disposition_params(header);
    let param = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

    param("filename*")
        .and_then(decode_extended_value)
        .and_then(|name| safe_file_name(&name))
        .or_else(|| param("filename").and_then(safe_file_name))
}

/// `key=value` parameters after the disposition type, keys lowercased
fn disposition_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let Some((_, mut rest)) = header.split_once(';') else {
        return params;
    };

    while let Some((key, after)) = rest.split_once('=') {
        let key = key.rsplit(';').next().unwrap_or(key).trim().to_ascii_lowercase();
        let after = after.trim_start();

        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => parse_quoted(quoted),
            None => match after.find(';') {
                Some(end) => (after[..end].trim().to_string(), &after[end..]),
                None => (after.trim().to_string(), ""),
            },
        };
        params.push((key, value));

        match remainder.split_once(';') {
            Some((_, next)) => rest = next,
            None => break,
        }
    }

    params
}

/// Read a quoted-string body (opening quote already consumed)
fn parse_quoted(input: &str) -> (String, &str) {
    let mut value = String::new();
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        match c {
            _ if escaped => {
                value.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            '"' => return (value, &input[i + 1..]),
            _ => value.push(c),
        }
    }

    (value, "")
}

/// Decode an RFC 5987 value such as `UTF-8''na%C3%AFve.mp4`
fn decode_extended_value(value: &str) -> Option<String> {
    let (charset, rest) = value.split_once('\'')?;
    let (_language, encoded) = rest.split_once('\'')?;

    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|name| name.into_owned())
}

fn safe_file_name(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\', ':']).next()?.trim();

    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

/// Successful result of an attempt
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationSuccess {
    pub video: TranslatedVideo,
    pub detected_language: Option<String>,
    pub confidence: f64,
    pub low_confidence: bool,
}

/// Terminal result of an attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutcome {
    Success(TranslationSuccess),
    Failure { error: TranslateError },
}

impl TranslationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranslationOutcome::Success(_))
    }

    /// Failure text, if this attempt failed
    pub fn message(&self) -> Option<String> {
        match self {
            TranslationOutcome::Success(_) => None,
            TranslationOutcome::Failure { error } => Some(error.message()),
        }
    }
}

/// Stage of an attempt without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Uploading,
    Translating,
    RenderingPreview,
    Complete,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Idle => "Idle",
            Stage::Uploading => "Uploading",
            Stage::Translating => "Translating",
            Stage::RenderingPreview => "RenderingPreview",
            Stage::Complete => "Complete",
            Stage::Error => "Error",
        }
    }
}

/// Visible progress of the current attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Idle,
    Uploading,
    Translating,
    RenderingPreview(ResponseMetadata),
    Complete(TranslationSuccess),
    Error(TranslateError),
}

impl AttemptState {
    pub fn stage(&self) -> Stage {
        match self {
            AttemptState::Idle => Stage::Idle,
            AttemptState::Uploading => Stage::Uploading,
            AttemptState::Translating => Stage::Translating,
            AttemptState::RenderingPreview(_) => Stage::RenderingPreview,
            AttemptState::Complete(_) => Stage::Complete,
            AttemptState::Error(_) => Stage::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Complete(_) | AttemptState::Error(_))
    }

    /// Progress percentage shown next to the status line
    pub fn progress(&self) -> u8 {
        match self {
            AttemptState::Idle | AttemptState::Error(_) => 0,
            AttemptState::Uploading => 10,
            AttemptState::Translating => 30,
            AttemptState::RenderingPreview(_) => 90,
            AttemptState::Complete(_) => 100,
        }
    }

    pub fn status_line(&self) -> &str {
        match self {
            AttemptState::Idle | AttemptState::Error(_) => "",
            AttemptState::Uploading => "Uploading...",
            AttemptState::Translating => "Translating video...",
            AttemptState::RenderingPreview(_) => "Creating preview...",
            AttemptState::Complete(_) => "Translation complete!",
        }
    }

    /// Terminal states map onto an outcome
    pub fn outcome(&self) -> Option<TranslationOutcome> {
        match self {
            AttemptState::Complete(success) => Some(TranslationOutcome::Success(success.clone())),
            AttemptState::Error(error) => Some(TranslationOutcome::Failure { error: error.clone() }),
            _ => None,
        }
    }
}
