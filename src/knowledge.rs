//! Static triage knowledge: synonym table, red-flag rules, medicine advice.
//!
//! Loaded once at startup from JSON files in the knowledge directory and
//! read-only afterwards. A missing file yields an empty table; a malformed
//! file is an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SYNONYMS_FILE: &str = "synonyms.json";
pub const RED_FLAGS_FILE: &str = "red_flags.json";
pub const MEDICINE_RULES_FILE: &str = "medicine_rules.json";

/// Canonical symptom identifier from the classifier's vocabulary.
pub type CanonicalSymptom = String;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Failed to read {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse {0}: {1}")]
    Parse(String, String),
}

// ═══════════════════════════════════════════════════════════
// SynonymTable
// ═══════════════════════════════════════════════════════════

/// Canonical symptom → free-text variant phrases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTable {
    entries: BTreeMap<CanonicalSymptom, Vec<String>>,
}

impl SynonymTable {
    /// Build a table. Variants are lower-cased so matching against
    /// lower-cased input is case-insensitive on both sides.
    pub fn new<I, S, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(canon, variants)| {
                let variants = variants
                    .into_iter()
                    .map(|v| v.into().to_lowercase())
                    .filter(|v| !v.trim().is_empty())
                    .collect();
                (canon.into(), variants)
            })
            .collect();
        Self { entries }
    }

    /// Iterate canonical symptoms with their (lower-cased) variants.
    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalSymptom, &[String])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn variants(&self, canonical: &str) -> Option<&[String]> {
        self.entries.get(canonical).map(Vec::as_slice)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.entries.contains_key(canonical)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Red flags
// ═══════════════════════════════════════════════════════════

/// Advisory attached to a dangerous symptom.
///
/// The knowledge file may hold either a bare message or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedFlagAction {
    Message(String),
    Detailed {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        severity: Option<String>,
        #[serde(default)]
        call_emergency: bool,
    },
}

impl RedFlagAction {
    pub fn message(&self) -> &str {
        match self {
            Self::Message(m) => m,
            Self::Detailed { message, .. } => message,
        }
    }
}

impl From<&str> for RedFlagAction {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

/// Symptom → advisory lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedFlagTable {
    rules: BTreeMap<CanonicalSymptom, RedFlagAction>,
}

impl RedFlagTable {
    pub fn new<I, S, A>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, A)>,
        S: Into<String>,
        A: Into<RedFlagAction>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(s, a)| (s.into(), a.into()))
                .collect(),
        }
    }

    pub fn get(&self, symptom: &str) -> Option<&RedFlagAction> {
        self.rules.get(symptom)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Medicine rules
// ═══════════════════════════════════════════════════════════

/// Disease label → ordered advice lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicineRules {
    rules: BTreeMap<String, Vec<String>>,
}

impl MedicineRules {
    pub fn new<I, S, V>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(label, advice)| (label.into(), advice.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Advice for a disease label; empty when the label has no rule.
    pub fn advice_for(&self, label: &str) -> Vec<String> {
        self.rules.get(label).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// KnowledgeBase
// ═══════════════════════════════════════════════════════════

/// All static tables the triage engine consults.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub synonyms: SynonymTable,
    pub red_flags: RedFlagTable,
    pub medicine: MedicineRules,
}

impl KnowledgeBase {
    /// Load all tables from `dir`. Missing files become empty tables.
    pub fn load(dir: &Path) -> Result<Self, KnowledgeError> {
        let synonyms: BTreeMap<String, Vec<String>> = load_json_or_default(dir, SYNONYMS_FILE)?;
        let red_flags: BTreeMap<String, RedFlagAction> = load_json_or_default(dir, RED_FLAGS_FILE)?;
        let medicine: BTreeMap<String, Vec<String>> =
            load_json_or_default(dir, MEDICINE_RULES_FILE)?;

        let kb = Self {
            synonyms: SynonymTable::new(synonyms),
            red_flags: RedFlagTable::new(red_flags),
            medicine: MedicineRules::new(medicine),
        };

        tracing::info!(
            dir = %dir.display(),
            synonyms = kb.synonyms.len(),
            red_flags = kb.red_flags.len(),
            medicine_rules = kb.medicine.len(),
            "Knowledge base loaded"
        );

        Ok(kb)
    }
}

fn load_json_or_default<T: DeserializeOwned + Default>(
    dir: &Path,
    file_name: &str,
) -> Result<T, KnowledgeError> {
    let path = dir.join(file_name);
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Knowledge file missing, using empty table");
        return Ok(T::default());
    }

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| KnowledgeError::Load(path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| KnowledgeError::Parse(file_name.into(), e.to_string()))
}
