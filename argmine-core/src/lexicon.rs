//! # Stopwords e Stemming
//!
//! Recursos lexicais dependentes de idioma usados na normalização do
//! vocabulário:
//!
//! - **Stopwords**: um arquivo texto por idioma (`<dir>/<código>.txt`), uma
//!   palavra por linha.
//! - **Stemmer**: algoritmo Snowball do idioma (via `rust-stemmers`).
//!
//! Um arquivo de stopwords ausente não interrompe a execução: o conjunto fica
//! vazio e a remoção de stopwords vira uma operação nula.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::observe::RunLog;

/// Idiomas suportados pelo provedor léxico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
}

impl Language {
    /// Código ISO 639-1 (também o nome do arquivo de stopwords).
    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
            Language::Portuguese => "pt",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
        }
    }

    fn algorithm(&self) -> Algorithm {
        match self {
            Language::Spanish => Algorithm::Spanish,
            Language::English => Algorithm::English,
            Language::Portuguese => Algorithm::Portuguese,
            Language::French => Algorithm::French,
            Language::German => Algorithm::German,
            Language::Italian => Algorithm::Italian,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Spanish
    }
}

/// Stopwords e stemmer de um idioma.
///
/// O stemmer é criado sob demanda em [`Lexicon::stem`]: `rust_stemmers::Stemmer`
/// não é `Clone` e o custo de criação é desprezível.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub language: Language,
    pub stopwords: HashSet<String>,
}

impl Lexicon {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            stopwords: HashSet::new(),
        }
    }

    pub fn with_stopwords<I, S>(language: Language, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            language,
            stopwords: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Carrega `<dir>/<código>.txt`. Arquivo ausente ou ilegível gera um
    /// aviso e um conjunto vazio.
    pub fn load(dir: &Path, language: Language, log: &RunLog) -> Self {
        let _guard = log.enter();
        let path = stopword_path(dir, language);

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let lexicon = Self::with_stopwords(language, content.lines());
                debug!(path = %path.display(), total = lexicon.stopwords.len(), "stopwords carregadas");
                lexicon
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "stopwords indisponíveis; seguindo sem remoção");
                Self::new(language)
            }
        }
    }

    pub fn has_stopwords(&self) -> bool {
        !self.stopwords.is_empty()
    }

    /// Compara em minúsculas.
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word.to_lowercase())
    }

    /// Radical Snowball da palavra (em minúsculas).
    pub fn stem(&self, word: &str) -> String {
        let stemmer = Stemmer::create(self.language.algorithm());
        stemmer.stem(&word.to_lowercase()).into_owned()
    }
}

fn stopword_path(dir: &Path, language: Language) -> PathBuf {
    dir.join(format!("{}.txt", language.code()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_stopwords_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("es.txt"), "de\nLa\n\n  que \n").unwrap();

        let lexicon = Lexicon::load(dir.path(), Language::Spanish, &RunLog::detached());
        assert_eq!(lexicon.stopwords.len(), 3);
        assert!(lexicon.is_stopword("la"));
        assert!(lexicon.is_stopword("QUE"));
        assert!(!lexicon.is_stopword("ciudad"));
    }

    #[test]
    fn test_missing_file_gives_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = Lexicon::load(dir.path(), Language::English, &RunLog::detached());
        assert!(!lexicon.has_stopwords());
    }

    #[test]
    fn test_stem_spanish_and_english() {
        let es = Lexicon::new(Language::Spanish);
        assert_eq!(es.stem("Rápidamente"), es.stem("rápidamente"));
        let stem = es.stem("corriendo");
        assert!("corriendo".starts_with(&stem) && stem.len() < "corriendo".len());

        let en = Lexicon::new(Language::English);
        assert_eq!(en.stem("running"), "run");
    }

    #[test]
    fn test_language_codes_roundtrip_serde() {
        let lang: Language = serde_json::from_str("\"pt\"").unwrap();
        assert_eq!(lang, Language::Portuguese);
        assert_eq!(lang.code(), "pt");
    }
}
