//! Reciter catalog
//!
//! A reciter is an audio source profile: remote files live at
//! `<base_url><chapter:03><verse:03><suffix>`.

use serde::Serialize;

/// Suffix used when a reciter does not declare one
pub const DEFAULT_SUFFIX: &str = ".mp3";

/// Audio source profile for verse recitations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reciter {
    /// Stable identifier, also the cache directory name
    pub id: String,
    /// Display name
    pub name: String,
    /// Prefix of every remote verse file
    pub base_url: String,
    /// Filename suffix (`.mp3` when None)
    pub suffix: Option<String>,
}

impl Reciter {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Effective filename suffix
    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX)
    }
}

/// Fixed, ordered set of available reciters
///
/// The first entry is the fallback selection.
#[derive(Debug, Clone)]
pub struct ReciterCatalog {
    reciters: Vec<Reciter>,
}

impl ReciterCatalog {
    pub fn new(reciters: Vec<Reciter>) -> Self {
        Self { reciters }
    }

    /// The catalog shipped with the application
    pub fn builtin() -> Self {
        Self::new(vec![
            Reciter::new(
                "alafasy",
                "Mishary Rashid Alafasy",
                "https://everyayah.com/data/Alafasy_128kbps/",
            ),
            Reciter::new(
                "abdul_basit_murattal",
                "Abdul Basit Abdul Samad (Murattal)",
                "https://everyayah.com/data/Abdul_Basit_Murattal_192kbps/",
            ),
            Reciter::new(
                "husary",
                "Mahmoud Khalil Al-Husary",
                "https://everyayah.com/data/Husary_128kbps/",
            ),
            Reciter::new(
                "minshawi_murattal",
                "Mohamed Siddiq El-Minshawi (Murattal)",
                "https://everyayah.com/data/Minshawy_Murattal_128kbps/",
            ),
            Reciter::new(
                "sudais",
                "Abdurrahman As-Sudais",
                "https://everyayah.com/data/Abdurrahmaan_As-Sudais_192kbps/",
            ),
        ])
    }

    pub fn all(&self) -> &[Reciter] {
        &self.reciters
    }

    pub fn find(&self, id: &str) -> Option<&Reciter> {
        self.reciters.iter().find(|r| r.id == id)
    }

    /// Fallback when nothing valid is persisted
    pub fn default_reciter(&self) -> Option<&Reciter> {
        self.reciters.first()
    }

    pub fn is_empty(&self) -> bool {
        self.reciters.is_empty()
    }
}
