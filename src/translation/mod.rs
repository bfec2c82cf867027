// Video translation - request orchestration against the remote translation service

pub mod catalog;
pub mod error;
pub mod orchestrator;
pub mod transport;
pub mod types;

pub use catalog::LanguageCatalog;
pub use error::{TranslateError, TransportError, ValidationError};
pub use orchestrator::{Attempt, AttemptId, AttemptSnapshot, Orchestrator};
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::*;
