//! Offline query resolution.
//!
//! Answers a free-text query from the knowledge base without network
//! access. Matching is a linear scan in knowledge base order: a phrase
//! matches when the lowercased query contains it whole or contains any one
//! of its whitespace-separated tokens. Legal terms are scanned before
//! procedures, then the emergency trigger words, then the generic fallback.
//!
//! Every answered query is appended to the store as an unsynced offline
//! conversation so the synchronizer can pick it up later.

use crate::knowledge::{EmergencyContact, KnowledgeBase, LegalProcedure, LegalTerm};
use crate::store::{NewConversation, Store, UserType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Words that ask for emergency contacts: emergency, help, contact, number.
const EMERGENCY_TRIGGERS: &[&str] = &["ತುರ್ತು", "ಸಹಾಯ", "ಸಂಪರ್ಕ", "ಸಂಖ್ಯೆ"];

const GENERIC_RESPONSE: &str = "ಕ್ಷಮಿಸಿ, ನಾನು ಪ್ರಸ್ತುತ ಆಫ್‌ಲೈನ್ ಮೋಡ್‌ನಲ್ಲಿದ್ದೇನೆ ಮತ್ತು ಸೀಮಿತ ಮಾಹಿತಿ ಮಾತ್ರ ಲಭ್ಯವಿದೆ.

**ಸಾಮಾನ್ಯ ಸಲಹೆ:**
• ಯಾವುದೇ ಕಾನೂನು ಸಮಸ್ಯೆಗಾಗಿ ವಕೀಲರನ್ನು ಸಂಪರ್ಕಿಸಿ
• ಅಗತ್ಯ ದಾಖಲೆಗಳನ್ನು ಸಂಗ್ರಹಿಸಿ
• ಸ್ಥಳೀಯ ಕಾನೂನು ಸಹಾಯ ಕೇಂದ್ರಗಳನ್ನು ಭೇಟಿ ಮಾಡಿ

**ತುರ್ತು ಸಂಪರ್ಕ:**
• ಪೊಲೀಸ್: 100
• ಕಾನೂನು ಸಹಾಯ: 15100

ಇಂಟರ್ನೆಟ್ ಸಂಪರ್ಕ ಪುನಃಸ್ಥಾಪಿಸಿದ ನಂತರ ಹೆಚ್ಚು ವಿವರವಾದ ಸಹಾಯಕ್ಕಾಗಿ ಮತ್ತೆ ಪ್ರಯತ್ನಿಸಿ.";

const UNAVAILABLE_RESPONSE: &str = "ಕ್ಷಮಿಸಿ, ಆಫ್‌ಲೈನ್ ಮೋಡ್‌ನಲ್ಲಿ ಈ ಪ್ರಶ್ನೆಗೆ ಉತ್ತರಿಸಲು ಸಾಧ್ಯವಾಗಲಿಲ್ಲ। ದಯವಿಟ್ಟು ಇಂಟರ್ನೆಟ್ ಸಂಪರ್ಕ ಪುನಃಸ್ಥಾಪಿಸಿ.";

/// Where an offline answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Source {
    /// A knowledge base term, procedure or the emergency contact list.
    #[serde(rename = "offline_knowledge_base")]
    KnowledgeBase,
    /// The fixed fallback message.
    #[serde(rename = "generic_offline")]
    Generic,
    /// The answer could not be recorded; the response is an apology.
    #[serde(rename = "error")]
    Unavailable,
}

impl Source {
    pub fn confidence(&self) -> f64 {
        match self {
            Source::KnowledgeBase => 0.8,
            Source::Generic => 0.3,
            Source::Unavailable => 0.0,
        }
    }
}

/// An offline answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub response: String,
    pub source: Source,
    pub confidence: f64,
}

impl Resolution {
    fn new(response: String, source: Source) -> Self {
        Self { response, source, confidence: source.confidence() }
    }
}

/// Resolves queries against a shared, read-only knowledge base.
#[derive(Debug, Clone)]
pub struct Resolver {
    kb: Arc<KnowledgeBase>,
}

impl Resolver {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Answer a query without recording it.
    pub fn answer(&self, query: &str) -> Resolution {
        let query = query.trim().to_lowercase();

        if let Some(term) = self.kb.common_legal_terms.iter().find(|t| phrase_matches(&query, &t.term)) {
            return Resolution::new(render_term(term), Source::KnowledgeBase);
        }

        if let Some(procedure) = self.kb.legal_procedures.iter().find(|p| phrase_matches(&query, &p.name)) {
            return Resolution::new(render_procedure(procedure), Source::KnowledgeBase);
        }

        if EMERGENCY_TRIGGERS.iter().any(|word| query.contains(word)) {
            return Resolution::new(render_contacts(&self.kb.emergency_contacts), Source::KnowledgeBase);
        }

        Resolution::new(GENERIC_RESPONSE.to_string(), Source::Generic)
    }

    /// Answer a query and record it as an unsynced offline conversation.
    ///
    /// If the answer cannot be recorded the caller gets an apology with
    /// zero confidence instead of the answer.
    pub async fn resolve(&self, store: &Store, query: &str) -> Resolution {
        let resolution = self.answer(query);
        let record = NewConversation::new(query, resolution.response.as_str());

        match store.append_conversation(&record, UserType::Offline, false).await {
            Ok(stored) => {
                tracing::debug!(id = stored.id, source = ?resolution.source, "recorded offline answer");
                resolution
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to record offline answer");
                Resolution::new(UNAVAILABLE_RESPONSE.to_string(), Source::Unavailable)
            }
        }
    }
}

/// Whether a normalized query mentions a phrase or any of its tokens.
fn phrase_matches(query: &str, phrase: &str) -> bool {
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        return false;
    }
    query.contains(&phrase) || phrase.split_whitespace().any(|token| query.contains(token))
}

fn push_numbered(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(heading);
    out.push_str(":\n");
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {item}\n", i + 1));
    }
    out.push('\n');
}

fn push_bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(heading);
    out.push_str(":\n");
    for item in items {
        out.push_str(&format!("• {item}\n"));
    }
}

fn render_term(term: &LegalTerm) -> String {
    let mut out = format!("**{}**\n\nವ್ಯಾಖ್ಯೆ: {}\n\n", term.term, term.definition);
    push_numbered(&mut out, "ಪ್ರಕ್ರಿಯೆ", &term.process);
    push_bullets(&mut out, "ಅಗತ್ಯ ದಾಖಲೆಗಳು", &term.documents_needed);
    out
}

fn render_procedure(procedure: &LegalProcedure) -> String {
    let mut out = format!("**{}**\n\n", procedure.name);
    push_numbered(&mut out, "ಹಂತಗಳು", &procedure.steps);
    if !procedure.documents.is_empty() {
        push_bullets(&mut out, "ಅಗತ್ಯ ದಾಖಲೆಗಳು", &procedure.documents);
        out.push('\n');
    }
    if let Some(limit) = &procedure.time_limit {
        out.push_str(&format!("ಸಮಯ ಮಿತಿ: {limit}\n"));
    }
    out
}

fn render_contacts(contacts: &[EmergencyContact]) -> String {
    let mut out = String::from("**ತುರ್ತು ಸಂಪರ್ಕ ಸಂಖ್ಯೆಗಳು:**\n\n");
    for contact in contacts {
        out.push_str(&format!("• {}: {}\n", contact.name, contact.number));
    }
    out
}
