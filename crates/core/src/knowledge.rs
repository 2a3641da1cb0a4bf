//! Static legal knowledge base.
//!
//! Loaded once when the engine starts, either the compiled-in Kannada
//! reference set or a JSON file of the same shape, and never mutated
//! afterwards. Entry order is significant: the resolver returns the first
//! match.

use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A legal term with its definition, process and required documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LegalTerm {
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub process: Vec<String>,
    #[serde(default)]
    pub documents_needed: Vec<String>,
}

/// A step-by-step legal procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LegalProcedure {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmergencyContact {
    pub name: String,
    pub number: String,
}

/// Read-only reference data used to answer queries offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub common_legal_terms: Vec<LegalTerm>,
    #[serde(default)]
    pub legal_procedures: Vec<LegalProcedure>,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl KnowledgeBase {
    /// The compiled-in Kannada reference set.
    pub fn builtin() -> Self {
        let term = |term: &str, definition: &str, process: &[&str], documents: &[&str]| LegalTerm {
            term: term.into(),
            definition: definition.into(),
            process: strings(process),
            documents_needed: strings(documents),
        };
        let procedure = |name: &str, steps: &[&str], documents: &[&str], time_limit: &str| LegalProcedure {
            name: name.into(),
            steps: strings(steps),
            documents: strings(documents),
            time_limit: Some(time_limit.into()),
        };
        let contact = |name: &str, number: &str| EmergencyContact { name: name.into(), number: number.into() };

        Self {
            common_legal_terms: vec![
                term(
                    "ವಿವಾಹ ವಿಚ್ಛೇದನ",
                    "ವಿವಾಹ ಬಂಧನವನ್ನು ಕಾನೂನುಬದ್ಧವಾಗಿ ಕೊನೆಗೊಳಿಸುವ ಪ್ರಕ್ರಿಯೆ",
                    &["ಅರ್ಜಿ ಸಲ್ಲಿಸುವುದು", "ನ್ಯಾಯಾಲಯದ ವಿಚಾರಣೆ", "ತೀರ್ಪು"],
                    &["ವಿವಾಹ ಪ್ರಮಾಣಪತ್ರ", "ಗುರುತಿನ ಪುರಾವೆ", "ವಿಳಾಸದ ಪುರಾವೆ"],
                ),
                term(
                    "ಆಸ್ತಿ ವಿವಾದ",
                    "ಆಸ್ತಿ ಹಕ್ಕುಗಳ ಬಗ್ಗೆ ಭಿನ್ನಾಭಿಪ್ರಾಯ",
                    &["ದಾಖಲೆಗಳ ಪರಿಶೀಲನೆ", "ಮಧ್ಯಸ್ಥಿಕೆ", "ನ್ಯಾಯಾಲಯದ ಮೊರೆ"],
                    &["ಆಸ್ತಿ ದಾಖಲೆಗಳು", "ಖರೀದಿ ಒಪ್ಪಂದ", "ತೆರಿಗೆ ರಸೀದಿಗಳು"],
                ),
                term(
                    "ಕಾರ್ಮಿಕ ಹಕ್ಕುಗಳು",
                    "ಕೆಲಸಗಾರರ ಕಾನೂನುಬದ್ಧ ಹಕ್ಕುಗಳು",
                    &["ದೂರು ದಾಖಲಿಸುವುದು", "ಕಾರ್ಮಿಕ ಇಲಾಖೆಗೆ ಮನವಿ", "ನ್ಯಾಯಾಲಯದ ಮೊರೆ"],
                    &["ಉದ್ಯೋಗ ಒಪ್ಪಂದ", "ಸಂಬಳ ಪರ್ಚಿಗಳು", "ಗುರುತಿನ ಪುರಾವೆ"],
                ),
                term(
                    "ಗ್ರಾಹಕ ಹಕ್ಕುಗಳು",
                    "ಗ್ರಾಹಕರ ಕಾನೂನುಬದ್ಧ ಹಕ್ಕುಗಳು ಮತ್ತು ರಕ್ಷಣೆ",
                    &["ದೂರು ದಾಖಲಿಸುವುದು", "ಗ್ರಾಹಕ ನ್ಯಾಯಾಲಯಕ್ಕೆ ಮನವಿ", "ಪರಿಹಾರ ಪಡೆಯುವುದು"],
                    &["ಖರೀದಿ ರಸೀದಿ", "ಉತ್ಪಾದನೆಯ ವಾರಂಟಿ", "ದೂರಿನ ಪುರಾವೆ"],
                ),
            ],
            legal_procedures: vec![
                procedure(
                    "ಎಫ್‌ಐಆರ್ ದಾಖಲಿಸುವುದು",
                    &[
                        "ಹತ್ತಿರದ ಪೊಲೀಸ್ ಠಾಣೆಗೆ ಹೋಗಿ",
                        "ಘಟನೆಯ ವಿವರಗಳನ್ನು ನೀಡಿ",
                        "ಲಿಖಿತ ದೂರು ಸಲ್ಲಿಸಿ",
                        "ಎಫ್‌ಐಆರ್ ಸಂಖ್ಯೆ ಪಡೆಯಿರಿ",
                    ],
                    &["ಗುರುತಿನ ಪುರಾವೆ", "ವಿಳಾಸದ ಪುರಾವೆ", "ಘಟನೆಯ ಪುರಾವೆಗಳು"],
                    "ಘಟನೆಯ ನಂತರ ಆದಷ್ಟು ಬೇಗ",
                ),
                procedure(
                    "ಜಾಮೀನು ಅರ್ಜಿ",
                    &["ವಕೀಲರನ್ನು ಸಂಪರ್ಕಿಸಿ", "ಜಾಮೀನು ಅರ್ಜಿ ತಯಾರಿಸಿ", "ನ್ಯಾಯಾಲಯದಲ್ಲಿ ಸಲ್ಲಿಸಿ", "ವಿಚಾರಣೆಗೆ ಹಾಜರಾಗಿ"],
                    &["ಗುರುತಿನ ಪುರಾವೆ", "ವಿಳಾಸದ ಪುರಾವೆ", "ಜಾಮೀನುದಾರರ ವಿವರಗಳು"],
                    "ಬಂಧನದ ನಂತರ 24 ಗಂಟೆಗಳೊಳಗೆ",
                ),
            ],
            emergency_contacts: vec![
                contact("ಪೊಲೀಸ್", "100"),
                contact("ಮಹಿಳಾ ಸಹಾಯವಾಣಿ", "1091"),
                contact("ಮಕ್ಕಳ ಸಹಾಯವಾಣಿ", "1098"),
                contact("ಕಾನೂನು ಸಹಾಯ", "15100"),
            ],
        }
    }

    /// Load a knowledge base from a JSON file.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file doesn't exist, `Format` if it isn't a valid
    /// knowledge base document, `Storage` for any other read failure.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Storage(format!("failed to read {}: {e}", path.display())),
        })?;
        let kb: Self = serde_json::from_str(&raw).map_err(|e| Error::Format(format!("{}: {e}", path.display())))?;
        tracing::info!(
            path = %path.display(),
            terms = kb.common_legal_terms.len(),
            procedures = kb.legal_procedures.len(),
            "loaded knowledge base"
        );
        Ok(kb)
    }

    pub fn term_count(&self) -> usize {
        self.common_legal_terms.len()
    }

    pub fn procedure_count(&self) -> usize {
        self.legal_procedures.len()
    }

    pub fn emergency_contact_count(&self) -> usize {
        self.emergency_contacts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_counts() {
        let kb = KnowledgeBase::builtin();
        assert_eq!(kb.term_count(), 4);
        assert_eq!(kb.procedure_count(), 2);
        assert_eq!(kb.emergency_contact_count(), 4);
        assert_eq!(kb.common_legal_terms[1].term, "ಆಸ್ತಿ ವಿವಾದ");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"{
                "common_legal_terms": [
                    {"term": "tenant rights", "definition": "Protections for renters"}
                ],
                "emergency_contacts": [{"name": "Police", "number": "100"}]
            }"#,
        )
        .unwrap();

        let kb = KnowledgeBase::load(&path).unwrap();
        assert_eq!(kb.term_count(), 1);
        assert_eq!(kb.procedure_count(), 0);
        assert!(kb.common_legal_terms[0].process.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = KnowledgeBase::load(Path::new("/nonexistent/kb.json"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = KnowledgeBase::load(&path);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_builtin_serializes_in_order() {
        let json = serde_json::to_value(KnowledgeBase::builtin()).unwrap();
        assert_eq!(json["common_legal_terms"][0]["term"], "ವಿವಾಹ ವಿಚ್ಛೇದನ");
        assert_eq!(json["legal_procedures"][1]["name"], "ಜಾಮೀನು ಅರ್ಜಿ");
    }
}
