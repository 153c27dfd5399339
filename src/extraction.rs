//! Free text → canonical symptoms.
//!
//! Plain case-insensitive substring matching against the synonym table.
//! Every variant phrase and the canonical term itself are candidates.

use std::collections::BTreeSet;

use crate::knowledge::{CanonicalSymptom, SynonymTable};

/// Converts patient free text into canonical symptoms.
pub struct TextSymptomExtractor<'a> {
    synonyms: &'a SynonymTable,
}

impl<'a> TextSymptomExtractor<'a> {
    pub fn new(synonyms: &'a SynonymTable) -> Self {
        Self { synonyms }
    }

    /// Extract every canonical symptom whose canonical term or any variant
    /// occurs in `text`. No match is an empty set, not an error.
    pub fn normalize(&self, text: &str) -> BTreeSet<CanonicalSymptom> {
        let mut found = BTreeSet::new();
        if text.trim().is_empty() {
            return found;
        }

        let text_low = text.to_lowercase();
        for (canon, variants) in self.synonyms.iter() {
            let canon_low = canon.to_lowercase();
            let matched = variants
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(canon_low.as_str()))
                .any(|phrase| !phrase.is_empty() && text_low.contains(phrase));
            if matched {
                found.insert(canon.clone());
            }
        }

        tracing::debug!(matched = found.len(), "Symptom extraction complete");
        found
    }
}

/// Normalize caller-supplied symptoms that are asserted to be canonical
/// already: trimmed, blanks dropped. Case is kept so the symptom still
/// matches the table keys it came from.
pub fn normalize_confirmed<I, S>(confirmed: I) -> BTreeSet<CanonicalSymptom>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    confirmed
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
