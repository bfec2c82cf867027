// Language catalog - target languages offered for video translation

use super::transport::Transport;
use super::types::LanguageEntry;

/// Languages used when the service cannot be reached
pub fn fallback_languages() -> Vec<LanguageEntry> {
    vec![
        LanguageEntry::new("en", "English", "English", "🇬🇧"),
        LanguageEntry::new("zh-CN", "Chinese (Simplified)", "简体中文", "🇨🇳"),
        LanguageEntry::new("ms", "Malay", "Bahasa Melayu", "🇲🇾"),
    ]
}

/// Read-only, order-preserving list of target languages
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageCatalog {
    entries: Vec<LanguageEntry>,
    fallback: bool,
}

impl LanguageCatalog {
    pub fn new(entries: Vec<LanguageEntry>) -> Self {
        Self {
            entries,
            fallback: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            entries: fallback_languages(),
            fallback: true,
        }
    }

    /// Fetch the catalog from the service. Never fails: any error yields the fallback set.
    pub async fn load<T: Transport + ?Sized>(transport: &T) -> Self {
        match transport.fetch_languages().await {
            Ok(entries) => {
                tracing::debug!("Loaded {} video languages", entries.len());
                Self::new(entries)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch languages, using built-in set: {}", e);
                Self::fallback()
            }
        }
    }

    pub fn entries(&self) -> &[LanguageEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&LanguageEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selector label, e.g. `🇩🇪 German`
    pub fn label(&self, code: &str) -> String {
        match self.get(code) {
            Some(entry) => format!("{} {}", entry.flag, entry.name),
            None => code.to_string(),
        }
    }

    /// Short badge for a detected source language, e.g. `🇨🇳 ZH`
    pub fn badge(&self, code: &str) -> String {
        let short = code.split('-').next().unwrap_or(code).to_uppercase();
        match self.get(code) {
            Some(entry) => format!("{} {}", entry.flag, short),
            None => short,
        }
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::fallback()
    }
}
