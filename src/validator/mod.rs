//! Static prompt validation.
//!
//! A deterministic lint pass over the drafted system prompt, run before a
//! simulation is allowed to proceed. Only the system prompt is scanned;
//! context data is excluded so legitimate sample records never trip the PII
//! checks. The checks are best-effort heuristics over raw text, not a
//! compliance control.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFlag {
    pub id: String,
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationFlag {
    fn new(id: &str, level: ValidationLevel, message: &str) -> Self {
        Self { id: id.to_string(), level, message: message.to_string() }
    }
}

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap()
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static CREDIT_CARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{4}[-.\s]?){3}\d{4}\b").unwrap());

static AADHAAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[-.\s]?\d{4}[-.\s]?\d{4}\b").unwrap());

const FINANCIAL_KEYWORDS: &[&str] = &[
    "bank account",
    "account number",
    "routing number",
    "credit card",
    "debit card",
    "cvv",
    "pin number",
    "password",
    "otp",
    "one time password",
    "card details",
    "card number",
    "expiry date",
    "security code",
];

const COLLECTION_VERBS: &[&str] = &["ask for", "collect", "request"];

const GUARDRAIL_MARKERS: &[&str] =
    &["never", "must not", "do not", "don't", "prohibited", "forbidden"];

const DIRECTIVE_MARKERS: &[&str] = &["always", "must", "should", "required"];

const DATA_NOUNS: &[&str] = &["order", "customer", "product", "account", "data"];

/// Minimum prompt length before V-08 stops flagging
const MIN_PROMPT_LEN: usize = 100;

/// Run all checks over a drafted system prompt, in fixed order V-01..V-08.
///
/// Never fails: text that matches no pattern simply produces no flag for that
/// rule. Keyword checks are case-insensitive; the regex checks run over the
/// raw prompt since they match digit shapes.
pub fn run_checks(system_prompt: &str, context_data: Option<&str>) -> Vec<ValidationFlag> {
    let mut flags = Vec::new();
    let lowered = system_prompt.to_lowercase();

    // V-01: phone number shapes
    if PHONE.is_match(system_prompt) {
        flags.push(ValidationFlag::new(
            "V-01",
            ValidationLevel::Error,
            "Your prompt contains what appears to be a phone number. Remove all phone number references before continuing.",
        ));
    }

    // V-02: email addresses
    if EMAIL.is_match(system_prompt) {
        flags.push(ValidationFlag::new(
            "V-02",
            ValidationLevel::Error,
            "Your prompt contains an email address. Remove email addresses or use placeholder text like [EMAIL] instead.",
        ));
    }

    // V-03: credit-card or national-ID shaped digit groups
    if CREDIT_CARD.is_match(system_prompt) || AADHAAR.is_match(system_prompt) {
        flags.push(ValidationFlag::new(
            "V-03",
            ValidationLevel::Error,
            "Your prompt contains what appears to be a financial account number. Remove all sensitive numbers before continuing.",
        ));
    }

    // V-04: instructing the agent to collect financial credentials.
    // Conjunctive: a keyword alone is not a violation, keyword + collection
    // verb is.
    let has_financial_keyword = FINANCIAL_KEYWORDS.iter().any(|kw| lowered.contains(kw));
    let has_collection_verb = COLLECTION_VERBS.iter().any(|verb| lowered.contains(verb));
    if has_financial_keyword && has_collection_verb {
        flags.push(ValidationFlag::new(
            "V-04",
            ValidationLevel::Error,
            "Your system prompt instructs the agent to collect sensitive financial information. This is not allowed.",
        ));
    }

    // V-05: no guardrail rules
    if !GUARDRAIL_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        flags.push(ValidationFlag::new(
            "V-05",
            ValidationLevel::Warning,
            "No guardrail rules found (e.g., \"never\", \"must not\", \"do not\"). Add at least one guardrail to improve your score.",
        ));
    }

    // V-06: no positive directives
    if !DIRECTIVE_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        flags.push(ValidationFlag::new(
            "V-06",
            ValidationLevel::Warning,
            "No positive instructions found (e.g., \"always\", \"must\"). Add clear directives for what the agent should do.",
        ));
    }

    // V-07: mentions data-ish nouns but no context data supplied
    let mentions_data = DATA_NOUNS.iter().any(|noun| lowered.contains(noun));
    let has_context = context_data.map(|c| !c.is_empty()).unwrap_or(false);
    if mentions_data && !has_context {
        flags.push(ValidationFlag::new(
            "V-07",
            ValidationLevel::Info,
            "Your system prompt mentions data (orders, customers, etc.). Consider adding context data for a more realistic simulation.",
        ));
    }

    // V-08: too short to carry much detail
    if system_prompt.len() < MIN_PROMPT_LEN {
        flags.push(ValidationFlag::new(
            "V-08",
            ValidationLevel::Info,
            "Your system prompt is quite short. Consider adding more detail about the agent's role, tone, and specific behaviors.",
        ));
    }

    flags
}

/// A session may advance out of draft only when this is false.
pub fn has_blocking_errors(flags: &[ValidationFlag]) -> bool {
    flags.iter().any(|flag| flag.level == ValidationLevel::Error)
}
