//! # Montagem do Dataset de Features
//!
//! Transforma os registros de features pré-computadas em uma tabela numérica.
//! Cada registro contribui com:
//!
//! 1. **Saco principal**: n-gramas, POS, pares de palavras e auxiliares modais
//!    habilitados, em minúsculas, opcionalmente sem stopwords.
//! 2. **Grupos categóricos**: entidades (`ent`), advérbios (`adv`), verbos
//!    (`verb`), substantivos (`noun`), pontuação (`punct`) e palavras-chave
//!    (`kw`). Cada token vira `"<prefixo>_<token>"`; grupo vazio vira
//!    `"<prefixo>_none"`.
//! 3. **Estatísticas** estruturais e sintáticas, copiadas sem transformação.
//!
//! ## Vetorização
//!
//! Cada saco é vetorizado de forma independente: as colunas são os tokens
//! distintos observados no corpus inteiro, em ordem lexicográfica. O esquema
//! final depende do corpus:
//!
//! ```text
//! [saco principal][ent_*][adv_*][verb_*][noun_*][punct_*][kw_*][estatísticas]
//! ```
//!
//! ## Colisões de nomes
//!
//! Os grupos categóricos têm prefixo próprio. Uma coluna de grupo que
//! coincide com uma estatística (`punct_marks_count`, por exemplo) recebe o
//! prefixo do grupo outra vez (`punct_punct_marks_count`). O saco principal
//! fica sem prefixo, exceto quando um token coincide com uma coluna de outro
//! grupo, de estatística ou com `label`: nesse caso a coluna vira
//! `bow_<token>`. Com `prefix_vocabulary` todo o saco principal recebe `bow_`.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::corpus::{self, FeatureRecord, LabelRecord};
use crate::dataset::{Dataset, LABEL_COLUMN};
use crate::error::{ArgMineError, Result};
use crate::lexicon::Lexicon;
use crate::observe::RunLog;

/// Prefixo aplicado ao saco principal em caso de colisão.
pub const VOCABULARY_PREFIX: &str = "bow";

/// Seleção de grupos de features e opções de normalização.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub unigrams: bool,
    pub bigrams: bool,
    pub trigrams: bool,
    pub pos_tags: bool,
    pub word_couples: bool,
    pub modal_aux: bool,

    pub entities: bool,
    pub adverbs: bool,
    pub verbs: bool,
    pub nouns: bool,
    pub punctuation: bool,
    pub key_words: bool,

    pub struct_stats: bool,
    pub synt_stats: bool,

    pub remove_stopwords: bool,
    pub stemming: bool,
    /// Indicadores 0/1 em vez de contagens.
    pub binary: bool,
    pub prefix_vocabulary: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            unigrams: true,
            bigrams: false,
            trigrams: false,
            pos_tags: false,
            word_couples: false,
            modal_aux: false,
            entities: false,
            adverbs: false,
            verbs: false,
            nouns: false,
            punctuation: false,
            key_words: false,
            struct_stats: false,
            synt_stats: false,
            remove_stopwords: false,
            stemming: false,
            binary: false,
            prefix_vocabulary: false,
        }
    }
}

impl FeatureConfig {
    /// Tag legível da configuração, usada no registro de métricas.
    ///
    /// Ex: `uni+bi+ent+struct/sw/stem`.
    pub fn tag(&self) -> String {
        let groups = [
            (self.unigrams, "uni"),
            (self.bigrams, "bi"),
            (self.trigrams, "tri"),
            (self.pos_tags, "pos"),
            (self.word_couples, "wc"),
            (self.modal_aux, "aux"),
            (self.entities, "ent"),
            (self.adverbs, "adv"),
            (self.verbs, "verb"),
            (self.nouns, "noun"),
            (self.punctuation, "punct"),
            (self.key_words, "kw"),
            (self.struct_stats, "struct"),
            (self.synt_stats, "synt"),
        ];
        let mut tag = groups
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join("+");
        if tag.is_empty() {
            tag.push_str("empty");
        }

        for (on, name) in [
            (self.remove_stopwords, "sw"),
            (self.stemming, "stem"),
            (self.binary, "bin"),
        ] {
            if on {
                tag.push('/');
                tag.push_str(name);
            }
        }
        tag
    }

    fn main_bag_enabled(&self) -> bool {
        self.unigrams
            || self.bigrams
            || self.trigrams
            || self.pos_tags
            || self.word_couples
            || self.modal_aux
    }
}

/// Grupos categóricos, na ordem de concatenação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CategoricalGroup {
    Entities,
    Adverbs,
    Verbs,
    Nouns,
    Punctuation,
    KeyWords,
}

impl CategoricalGroup {
    const ORDER: [CategoricalGroup; 6] = [
        CategoricalGroup::Entities,
        CategoricalGroup::Adverbs,
        CategoricalGroup::Verbs,
        CategoricalGroup::Nouns,
        CategoricalGroup::Punctuation,
        CategoricalGroup::KeyWords,
    ];

    fn prefix(&self) -> &'static str {
        match self {
            CategoricalGroup::Entities => "ent",
            CategoricalGroup::Adverbs => "adv",
            CategoricalGroup::Verbs => "verb",
            CategoricalGroup::Nouns => "noun",
            CategoricalGroup::Punctuation => "punct",
            CategoricalGroup::KeyWords => "kw",
        }
    }

    fn enabled(&self, config: &FeatureConfig) -> bool {
        match self {
            CategoricalGroup::Entities => config.entities,
            CategoricalGroup::Adverbs => config.adverbs,
            CategoricalGroup::Verbs => config.verbs,
            CategoricalGroup::Nouns => config.nouns,
            CategoricalGroup::Punctuation => config.punctuation,
            CategoricalGroup::KeyWords => config.key_words,
        }
    }

    fn tokens<'a>(&self, record: &'a FeatureRecord) -> &'a [String] {
        match self {
            CategoricalGroup::Entities => &record.entities,
            CategoricalGroup::Adverbs => &record.adverbs,
            CategoricalGroup::Verbs => &record.verbs,
            CategoricalGroup::Nouns => &record.nouns,
            CategoricalGroup::Punctuation => &record.punctuation,
            CategoricalGroup::KeyWords => &record.key_words,
        }
    }

    /// Advérbios e verbos passam pelo stemmer quando habilitado.
    fn stemmed(&self) -> bool {
        matches!(self, CategoricalGroup::Adverbs | CategoricalGroup::Verbs)
    }
}

type StatFn = fn(&FeatureRecord) -> f64;

const STRUCT_STATS: [(&str, StatFn); 6] = [
    ("modal_aux_count", |r| r.modal_aux.len() as f64),
    ("text_length", |r| r.text_length),
    ("text_position", |r| r.text_position),
    ("token_count", |r| r.token_count),
    ("avg_word_length", |r| r.avg_word_length),
    ("punct_marks_count", |r| r.number_punct_marks),
];

const SYNT_STATS: [(&str, StatFn); 2] = [
    ("parse_tree_depth", |r| r.parse_tree_depth),
    ("sub_clauses_count", |r| r.number_sub_clauses),
];

/// Matriz de um saco já vetorizado.
struct Block {
    columns: Vec<String>,
    /// Contagens por linha: índice da coluna → valor.
    rows: Vec<BTreeMap<usize, f64>>,
}

/// Vocabulário ordenado do corpus e contagens por documento.
fn vectorize(docs: &[Vec<String>], binary: bool) -> Block {
    let vocabulary: BTreeSet<&str> = docs.iter().flatten().map(String::as_str).collect();
    let index: BTreeMap<&str, usize> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, token)| (*token, i))
        .collect();

    let rows = docs
        .iter()
        .map(|doc| {
            let mut counts = BTreeMap::new();
            for token in doc {
                let col = index[token.as_str()];
                let entry = counts.entry(col).or_insert(0.0);
                *entry = if binary { 1.0 } else { *entry + 1.0 };
            }
            counts
        })
        .collect();

    Block {
        columns: vocabulary.into_iter().map(str::to_string).collect(),
        rows,
    }
}

/// Constrói o [`Dataset`] a partir de features e rótulos alinhados.
pub struct FeatureAssembler<'a> {
    config: &'a FeatureConfig,
    lexicon: &'a Lexicon,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(config: &'a FeatureConfig, lexicon: &'a Lexicon) -> Self {
        Self { config, lexicon }
    }

    /// Monta a tabela. Nenhum dataset parcial é produzido em caso de erro.
    ///
    /// # Erros
    /// - `DataMismatch` / `MissingLabel` quando features e rótulos não alinham.
    /// - `InvalidDataset` quando algum registro não tem `target_label_field`.
    pub fn build(
        &self,
        features: &[FeatureRecord],
        labels: &[LabelRecord],
        target_label_field: &str,
        log: &RunLog,
    ) -> Result<Dataset> {
        let _guard = log.enter();

        let pairs = corpus::align(features, labels).map_err(|e| {
            error!(error = %e, "features e rótulos desalinhados; dataset não construído");
            e
        })?;

        let mut targets = Vec::with_capacity(pairs.len());
        for (_, label) in &pairs {
            let value = label.get(target_label_field).ok_or_else(|| {
                ArgMineError::InvalidDataset(format!(
                    "registro {} sem o campo de rótulo `{target_label_field}`",
                    label.id
                ))
            })?;
            targets.push(value.to_lowercase());
        }

        let records: Vec<&FeatureRecord> = pairs.iter().map(|(f, _)| *f).collect();
        let mut blocks: Vec<Block> = Vec::new();

        let main_block = if self.config.main_bag_enabled() {
            let docs: Vec<Vec<String>> = records.iter().map(|r| self.main_bag(r)).collect();
            Some(vectorize(&docs, self.config.binary))
        } else {
            None
        };

        let mut prefixes: Vec<&'static str> = Vec::new();
        for group in CategoricalGroup::ORDER {
            if !group.enabled(self.config) {
                continue;
            }
            let docs: Vec<Vec<String>> = records
                .iter()
                .map(|r| self.categorical_tokens(group, r))
                .collect();
            blocks.push(vectorize(&docs, self.config.binary));
            prefixes.push(group.prefix());
        }

        let mut stats: Vec<(&str, StatFn)> = Vec::new();
        if self.config.struct_stats {
            stats.extend(STRUCT_STATS);
        }
        if self.config.synt_stats {
            stats.extend(SYNT_STATS);
        }

        // Estatísticas e `label` mantêm o nome; colunas de grupo que colidem
        // com elas ganham o prefixo do grupo de novo.
        let reserved: HashSet<String> = stats
            .iter()
            .map(|(name, _)| name.to_string())
            .chain([LABEL_COLUMN.to_string()])
            .collect();
        let mut used: HashSet<String> = blocks
            .iter()
            .flat_map(|b| b.columns.iter().cloned())
            .chain(reserved.iter().cloned())
            .collect();

        let mut side_columns: Vec<String> = Vec::new();
        for (block, prefix) in blocks.iter().zip(&prefixes) {
            for column in &block.columns {
                if !reserved.contains(column) {
                    side_columns.push(column.clone());
                    continue;
                }
                let mut name = format!("{prefix}_{column}");
                while used.contains(&name) {
                    name = format!("{prefix}_{name}");
                }
                warn!(column = %column, renamed = %name, "coluna de grupo renomeada por colisão");
                used.insert(name.clone());
                side_columns.push(name);
            }
        }

        let mut columns = Vec::new();
        if let Some(block) = &main_block {
            for token in &block.columns {
                let mut name = if self.config.prefix_vocabulary {
                    format!("{VOCABULARY_PREFIX}_{token}")
                } else {
                    token.clone()
                };
                while used.contains(&name) {
                    name = format!("{VOCABULARY_PREFIX}_{name}");
                }
                if !self.config.prefix_vocabulary && &name != token {
                    warn!(token = %token, column = %name, "coluna do vocabulário renomeada por colisão");
                }
                used.insert(name.clone());
                columns.push(name);
            }
        }
        columns.extend(side_columns);
        columns.extend(stats.iter().map(|(name, _)| name.to_string()));

        let n_rows = records.len();
        let mut matrix = Array2::<f64>::zeros((n_rows, columns.len()));
        let mut offset = 0;
        for block in main_block.iter().chain(blocks.iter()) {
            for (row, counts) in block.rows.iter().enumerate() {
                for (col, value) in counts {
                    matrix[[row, offset + col]] = *value;
                }
            }
            offset += block.columns.len();
        }
        for (row, record) in records.iter().enumerate() {
            for (j, (_, stat)) in stats.iter().enumerate() {
                matrix[[row, offset + j]] = stat(record);
            }
        }

        let dataset = Dataset::new(columns, matrix, targets)?;
        info!(
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            sparsity = dataset.sparsity(),
            "dataset montado"
        );
        Ok(dataset)
    }

    fn main_bag(&self, record: &FeatureRecord) -> Vec<String> {
        let config = self.config;
        let lists: [(bool, &Vec<String>); 6] = [
            (config.unigrams, &record.unigrams),
            (config.bigrams, &record.bigrams),
            (config.trigrams, &record.trigrams),
            (config.pos_tags, &record.pos_tags),
            (config.word_couples, &record.word_couples),
            (config.modal_aux, &record.modal_aux),
        ];
        let drop_stopwords = config.remove_stopwords && self.lexicon.has_stopwords();

        let bag: Vec<String> = lists
            .iter()
            .filter(|(on, _)| *on)
            .flat_map(|(_, tokens)| tokens.iter())
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .filter(|t| !drop_stopwords || !self.lexicon.is_stopword(t))
            .collect();

        debug!(id = %record.id, tokens = bag.len(), "saco principal");
        bag
    }

    fn categorical_tokens(&self, group: CategoricalGroup, record: &FeatureRecord) -> Vec<String> {
        let prefix = group.prefix();
        let stem = self.config.stemming && group.stemmed();

        let tokens: Vec<String> = group
            .tokens(record)
            .iter()
            .map(|raw| {
                let normalized = if stem {
                    self.lexicon.stem(raw.trim())
                } else {
                    raw.trim().to_lowercase()
                };
                normalized.replace(' ', "_")
            })
            .filter(|t| !t.is_empty())
            .map(|t| format!("{prefix}_{t}"))
            .collect();

        if tokens.is_empty() {
            vec![format!("{prefix}_none")]
        } else {
            tokens
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::sample_corpus;
    use crate::lexicon::Language;

    fn build(config: &FeatureConfig, lexicon: &Lexicon) -> Result<Dataset> {
        let (features, labels) = sample_corpus();
        FeatureAssembler::new(config, lexicon).build(
            &features,
            &labels,
            "sent_label",
            &RunLog::detached(),
        )
    }

    #[test]
    fn test_unigram_vocabulary_is_sorted_corpus_tokens() {
        let dataset = build(&FeatureConfig::default(), &Lexicon::default()).unwrap();
        assert_eq!(
            dataset.columns,
            vec!["because", "evidence", "good", "point", "random", "since", "text", "x"]
        );
        assert_eq!(dataset.n_rows(), 4);
        assert_eq!(dataset.labels, vec!["claim", "claim", "premise", "spam"]);

        let good = dataset.column_index("good").unwrap();
        assert_eq!(dataset.features[[0, good]], 1.0);
        assert_eq!(dataset.features[[1, good]], 0.0);
    }

    #[test]
    fn test_mismatched_counts_produce_no_dataset() {
        let (features, labels) = sample_corpus();
        let config = FeatureConfig::default();
        let lexicon = Lexicon::default();
        let err = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels[..2], "sent_label", &RunLog::detached())
            .unwrap_err();
        assert!(matches!(err, ArgMineError::DataMismatch { .. }));
    }

    #[test]
    fn test_empty_group_gets_sentinel() {
        let (mut features, labels) = sample_corpus();
        features[0].entities = vec!["Gran Canaria".into()];
        let config = FeatureConfig {
            entities: true,
            ..Default::default()
        };
        let lexicon = Lexicon::default();
        let dataset = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();

        let named = dataset.column_index("ent_gran_canaria").unwrap();
        let none = dataset.column_index("ent_none").unwrap();
        assert_eq!(dataset.features[[0, named]], 1.0);
        assert_eq!(dataset.features[[0, none]], 0.0);
        for row in 1..4 {
            assert_eq!(dataset.features[[row, none]], 1.0);
        }
    }

    #[test]
    fn test_group_order_and_stats() {
        let (mut features, labels) = sample_corpus();
        features[1].verbs = vec!["debe".into()];
        features[2].text_length = 42.0;
        features[3].modal_aux = vec!["puede".into(), "debe".into()];
        let config = FeatureConfig {
            verbs: true,
            punctuation: true,
            struct_stats: true,
            synt_stats: true,
            ..Default::default()
        };
        let lexicon = Lexicon::default();
        let dataset = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();

        let tail: Vec<&str> = dataset.columns[8..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "verb_debe",
                "verb_none",
                "punct_none",
                "modal_aux_count",
                "text_length",
                "text_position",
                "token_count",
                "avg_word_length",
                "punct_marks_count",
                "parse_tree_depth",
                "sub_clauses_count",
            ]
        );
        let text_length = dataset.column_index("text_length").unwrap();
        assert_eq!(dataset.features[[2, text_length]], 42.0);
        let aux = dataset.column_index("modal_aux_count").unwrap();
        assert_eq!(dataset.features[[3, aux]], 2.0);
    }

    #[test]
    fn test_counts_versus_binary() {
        let (mut features, labels) = sample_corpus();
        features[0].unigrams = vec!["good".into(), "Good".into(), "point".into()];
        let lexicon = Lexicon::default();

        let counts = FeatureConfig::default();
        let dataset = FeatureAssembler::new(&counts, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();
        let good = dataset.column_index("good").unwrap();
        assert_eq!(dataset.features[[0, good]], 2.0);

        let binary = FeatureConfig {
            binary: true,
            ..Default::default()
        };
        let dataset = FeatureAssembler::new(&binary, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();
        assert_eq!(dataset.features[[0, good]], 1.0);
    }

    #[test]
    fn test_stopwords_removed_only_when_enabled() {
        let lexicon = Lexicon::with_stopwords(Language::English, ["because", "since"]);
        let kept = build(&FeatureConfig::default(), &lexicon).unwrap();
        assert!(kept.column_index("because").is_some());

        let config = FeatureConfig {
            remove_stopwords: true,
            ..Default::default()
        };
        let dropped = build(&config, &lexicon).unwrap();
        assert!(dropped.column_index("because").is_none());
        assert!(dropped.column_index("since").is_none());
        assert_eq!(dropped.n_columns(), 6);
    }

    #[test]
    fn test_verbs_are_stemmed() {
        let (mut features, labels) = sample_corpus();
        features[0].verbs = vec!["running".into()];
        features[1].verbs = vec!["runs".into()];
        let config = FeatureConfig {
            unigrams: false,
            verbs: true,
            stemming: true,
            ..Default::default()
        };
        let lexicon = Lexicon::new(Language::English);
        let dataset = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();
        assert_eq!(dataset.columns, vec!["verb_none", "verb_run"]);
        assert_eq!(dataset.features[[0, 1]], 1.0);
        assert_eq!(dataset.features[[1, 1]], 1.0);
    }

    #[test]
    fn test_vocabulary_collisions_are_renamed() {
        let (mut features, labels) = sample_corpus();
        features[0].unigrams = vec!["label".into(), "ent_none".into(), "text_length".into()];
        let config = FeatureConfig {
            entities: true,
            struct_stats: true,
            ..Default::default()
        };
        let lexicon = Lexicon::default();
        let dataset = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();

        for renamed in ["bow_label", "bow_ent_none", "bow_text_length"] {
            assert!(dataset.column_index(renamed).is_some(), "{renamed}");
        }
        assert!(dataset.column_index("ent_none").is_some());
        let unique: HashSet<&String> = dataset.columns.iter().collect();
        assert_eq!(unique.len(), dataset.columns.len());
    }

    #[test]
    fn test_group_column_colliding_with_stat_is_renamed() {
        let (mut features, labels) = sample_corpus();
        features[0].punctuation = vec!["marks count".into()];
        features[1].punctuation = vec!["punct marks count".into()];
        features[0].number_punct_marks = 3.0;
        let config = FeatureConfig {
            punctuation: true,
            struct_stats: true,
            ..Default::default()
        };
        let lexicon = Lexicon::default();
        let dataset = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();

        let stat = dataset.column_index("punct_marks_count").unwrap();
        assert_eq!(dataset.features[[0, stat]], 3.0);
        let token = dataset.column_index("punct_punct_punct_marks_count").unwrap();
        assert_eq!(dataset.features[[0, token]], 1.0);
        let other = dataset.column_index("punct_punct_marks_count").unwrap();
        assert_eq!(dataset.features[[1, other]], 1.0);

        let unique: HashSet<&String> = dataset.columns.iter().collect();
        assert_eq!(unique.len(), dataset.columns.len());
    }

    #[test]
    fn test_each_space_becomes_underscore() {
        let (mut features, labels) = sample_corpus();
        features[0].entities = vec!["Las  Palmas".into()];
        let config = FeatureConfig {
            entities: true,
            ..Default::default()
        };
        let lexicon = Lexicon::default();
        let dataset = FeatureAssembler::new(&config, &lexicon)
            .build(&features, &labels, "sent_label", &RunLog::detached())
            .unwrap();
        assert!(dataset.column_index("ent_las__palmas").is_some());
        assert!(dataset.column_index("ent_las_palmas").is_none());
    }

    #[test]
    fn test_prefix_vocabulary_namespaces_main_bag() {
        let config = FeatureConfig {
            prefix_vocabulary: true,
            ..Default::default()
        };
        let dataset = build(&config, &Lexicon::default()).unwrap();
        assert!(dataset.columns.iter().all(|c| c.starts_with("bow_")));
        assert_eq!(dataset.columns[0], "bow_because");
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = FeatureConfig {
            bigrams: true,
            nouns: true,
            struct_stats: true,
            ..Default::default()
        };
        let a = build(&config, &Lexicon::default()).unwrap();
        let b = build(&config, &Lexicon::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let (pa, pb) = (dir.path().join("a.csv"), dir.path().join("b.csv"));
        a.write_csv(&pa).unwrap();
        b.write_csv(&pb).unwrap();
        assert_eq!(std::fs::read(pa).unwrap(), std::fs::read(pb).unwrap());
    }

    #[test]
    fn test_missing_target_field() {
        let err = {
            let (features, labels) = sample_corpus();
            let config = FeatureConfig::default();
            let lexicon = Lexicon::default();
            FeatureAssembler::new(&config, &lexicon)
                .build(&features, &labels, "sent_label2", &RunLog::detached())
                .unwrap_err()
        };
        assert!(matches!(err, ArgMineError::InvalidDataset(_)));
    }

    #[test]
    fn test_tag() {
        assert_eq!(FeatureConfig::default().tag(), "uni");
        let config = FeatureConfig {
            bigrams: true,
            entities: true,
            struct_stats: true,
            remove_stopwords: true,
            stemming: true,
            ..Default::default()
        };
        assert_eq!(config.tag(), "uni+bi+ent+struct/sw/stem");
    }
}
