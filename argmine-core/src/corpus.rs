//! # Leitura do Corpus Anotado
//!
//! O corpus chega em dois arquivos alinhados por identificador:
//!
//! - **Features** (`features.json`): uma feature pré-computada por sentença
//!   (n-gramas, POS, entidades, estatísticas). Aceita um objeto JSON indexado
//!   pelo id da sentença ou um array de objetos com campo `id`.
//! - **Rótulos** (`labels.csv`): CSV cuja primeira coluna é o id; toda coluna
//!   cujo cabeçalho começa com `sent_label` é um campo de rótulo.
//!
//! ```text
//! sent_id,sent_text,sent_label1,sent_label2
//! 17-0-0,"Debe mejorarse el transporte",claim,policy
//! ```
//!
//! A ordem do arquivo de features é preservada: ela define a ordem das linhas
//! do dataset e, portanto, a ordem de primeira ocorrência dos rótulos.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArgMineError, Result};

/// Prefixo dos cabeçalhos que identificam campos de rótulo.
pub const LABEL_HEADER_PREFIX: &str = "sent_label";

/// Features linguísticas pré-computadas de uma sentença/proposição.
///
/// Produzidas por um extrator externo; aqui são apenas lidas.
/// Todos os campos são opcionais no JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRecord {
    pub id: String,

    // === Saco de palavras ===
    pub unigrams: Vec<String>,
    pub bigrams: Vec<String>,
    pub trigrams: Vec<String>,
    pub pos_tags: Vec<String>,
    pub word_couples: Vec<String>,
    pub modal_aux: Vec<String>,

    // === Grupos categóricos ===
    pub entities: Vec<String>,
    pub adverbs: Vec<String>,
    pub verbs: Vec<String>,
    pub nouns: Vec<String>,
    pub punctuation: Vec<String>,
    pub key_words: Vec<String>,

    // === Estatísticas ===
    pub text_length: f64,
    pub token_count: f64,
    pub avg_word_length: f64,
    pub number_punct_marks: f64,
    pub parse_tree_depth: f64,
    pub number_sub_clauses: f64,
    pub text_position: f64,
}

/// Rótulos-ouro de uma sentença, na ordem das colunas `sent_label*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

impl LabelRecord {
    pub fn new(id: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self {
            id: id.into(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Valor do campo de rótulo `field`, se existir.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// Conteúdo do arquivo de rótulos.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    /// Nomes dos campos de rótulo (cabeçalhos `sent_label*`).
    pub fields: Vec<String>,
    pub records: Vec<LabelRecord>,
}

/// Lê o arquivo JSON de features.
///
/// Objetos indexados por id recebem o id a partir da chave.
pub fn read_feature_store(path: &Path) -> Result<Vec<FeatureRecord>> {
    let file = File::open(path).map_err(|e| ArgMineError::io(path, e))?;
    let value: serde_json::Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| ArgMineError::json(path, e))?;
    parse_feature_store(value).map_err(|e| ArgMineError::json(path, e))
}

fn parse_feature_store(value: serde_json::Value) -> serde_json::Result<Vec<FeatureRecord>> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(id, v)| {
                let mut record: FeatureRecord = serde_json::from_value(v)?;
                record.id = id;
                Ok(record)
            })
            .collect(),
        other => serde_json::from_value(other),
    }
}

/// Lê o CSV de rótulos.
///
/// A primeira coluna é sempre o identificador. O número de cabeçalhos
/// `sent_label*` define quantos campos de rótulo cada linha carrega.
pub fn read_label_store(path: &Path) -> Result<LabelStore> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ArgMineError::csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| ArgMineError::csv(path, e))?
        .clone();

    let label_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, name)| name.trim().starts_with(LABEL_HEADER_PREFIX))
        .map(|(i, name)| (i, name.trim().to_string()))
        .collect();

    if label_columns.is_empty() {
        return Err(ArgMineError::InvalidDataset(format!(
            "{} não possui colunas `{LABEL_HEADER_PREFIX}*`",
            path.display()
        )));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ArgMineError::csv(path, e))?;
        let id = row.get(0).unwrap_or_default().trim().to_string();
        let fields = label_columns
            .iter()
            .map(|(i, name)| {
                (
                    name.clone(),
                    row.get(*i).unwrap_or_default().trim().to_string(),
                )
            })
            .collect();
        records.push(LabelRecord { id, fields });
    }

    Ok(LabelStore {
        fields: label_columns.into_iter().map(|(_, name)| name).collect(),
        records,
    })
}

/// Emparelha features e rótulos pelo id, na ordem do arquivo de features.
///
/// # Erros
/// - `DataMismatch` se as quantidades diferirem.
/// - `DuplicateLabel` se um id se repetir no arquivo de rótulos.
/// - `MissingLabel` se algum id de features não tiver rótulo.
pub fn align<'a>(
    features: &'a [FeatureRecord],
    labels: &'a [LabelRecord],
) -> Result<Vec<(&'a FeatureRecord, &'a LabelRecord)>> {
    if features.len() != labels.len() {
        return Err(ArgMineError::DataMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }

    let mut by_id: HashMap<&str, &LabelRecord> = HashMap::with_capacity(labels.len());
    for label in labels {
        if by_id.insert(label.id.as_str(), label).is_some() {
            return Err(ArgMineError::DuplicateLabel {
                id: label.id.clone(),
            });
        }
    }

    features
        .iter()
        .map(|f| {
            by_id
                .get(f.id.as_str())
                .map(|l| (f, *l))
                .ok_or_else(|| ArgMineError::MissingLabel { id: f.id.clone() })
        })
        .collect()
}

/// Corpus mínimo usado nos testes dos módulos.
#[cfg(test)]
pub(crate) fn sample_corpus() -> (Vec<FeatureRecord>, Vec<LabelRecord>) {
    let record = |id: &str, unigrams: &[&str]| FeatureRecord {
        id: id.to_string(),
        unigrams: unigrams.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    let features = vec![
        record("p1", &["good", "point"]),
        record("p2", &["because", "evidence"]),
        record("p3", &["since", "x"]),
        record("p4", &["random", "text"]),
    ];
    let labels = vec![
        LabelRecord::new("p1", &[("sent_label", "claim")]),
        LabelRecord::new("p2", &[("sent_label", "claim")]),
        LabelRecord::new("p3", &[("sent_label", "premise")]),
        LabelRecord::new("p4", &[("sent_label", "spam")]),
    ];
    (features, labels)
}
