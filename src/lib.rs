//! vidlingo - client for translating videos through a remote translation service
//!
//! The [`translation::Orchestrator`] drives one attempt at a time: it validates the
//! request, uploads the video, reads the detected language and confidence from the
//! response headers, and hands back the translated video.

pub mod config;
pub mod translation;

pub use config::ClientConfig;
pub use translation::{Orchestrator, TranslationOutcome, TranslationRequest};
