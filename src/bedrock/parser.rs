//! Defensive extraction of a recommendation object from raw model output.
//!
//! Models wrap the requested JSON in prose, markdown fences, single quotes,
//! or even code. The heuristics below recover the object without ever
//! executing model output; each is tried in order and the first success wins:
//!
//! 1. first balanced-looking `{...}` block (bounded scan length), parsed as
//!    JSON
//! 2. the same block with single quotes normalized to double quotes
//! 3. the same block with `key: 'val'` token patterns rewritten to JSON
//! 4. assignment (`x = {...}`) and `return json.dumps({...})` candidates

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Upper bound on a candidate block, to avoid runaway matching on long
/// payloads.
const MAX_CANDIDATE_LEN: usize = 2000;

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\{{[\s\S]{{1,{MAX_CANDIDATE_LEN}}}\}}")).unwrap());
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"[\w_]+\s*=\s*(\{{[\s\S]{{1,{MAX_CANDIDATE_LEN}}}\}})"
    ))
    .unwrap()
});
static JSON_DUMPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"return\s+json\.dumps\(\s*(\{{[\s\S]{{1,{MAX_CANDIDATE_LEN}}}\}})\s*\)"
    ))
    .unwrap()
});
static KEY_VAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\w_]+)\s*:\s*'([^']*)'").unwrap());

/// The action a model recommendation proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoAction {
    Resize,
    Stop,
    Schedule,
    Monitor,
}

impl RecoAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "resize" => Some(Self::Resize),
            "stop" => Some(Self::Stop),
            "schedule" => Some(Self::Schedule),
            "monitor" => Some(Self::Monitor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Stop => "stop",
            Self::Schedule => "schedule",
            Self::Monitor => "monitor",
        }
    }
}

impl fmt::Display for RecoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized model recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReco {
    pub action: RecoAction,
    pub target_type: Option<String>,
    pub target_size: Option<String>,
    pub reason: String,
    pub estimated_savings_usd: Option<f64>,
    pub confidence: f64,
}

impl ModelReco {
    /// The conservative placeholder produced when derivation fails after all
    /// retries. Deliberately low-confidence, never an error.
    pub fn fallback() -> Self {
        Self {
            action: RecoAction::Resize,
            target_type: None,
            target_size: None,
            reason: "insufficient_data".into(),
            estimated_savings_usd: None,
            confidence: 0.2,
        }
    }
}

/// Extract and normalize a recommendation from raw model output. Returns
/// `None` when no candidate parses or the parsed object lacks a usable
/// `action`; the caller decides whether to retry or fall back.
pub fn parse(raw: &str) -> Option<ModelReco> {
    let value = extract_object(raw)?;
    normalize(value)
}

fn extract_object(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }

    if let Some(m) = JSON_BLOCK.find(raw) {
        if let Some(v) = parse_candidate(m.as_str()) {
            return Some(v);
        }
    }

    // Secondary candidates: code-shaped payloads.
    for re in [&*ASSIGNMENT, &*JSON_DUMPS] {
        if let Some(caps) = re.captures(raw) {
            if let Some(v) = parse_candidate(caps.get(1)?.as_str()) {
                return Some(v);
            }
        }
    }

    None
}

fn parse_candidate(candidate: &str) -> Option<Value> {
    let candidate = candidate.trim();

    if let Ok(v) = serde_json::from_str::<Value>(candidate) {
        return v.is_object().then_some(v);
    }

    // Models frequently emit python-ish dicts with single quotes.
    let doubled = candidate.replace('\'', "\"");
    if let Ok(v) = serde_json::from_str::<Value>(&doubled) {
        return v.is_object().then_some(v);
    }

    // Last resort: quote bare `key: 'val'` tokens, then reparse.
    let rewritten = KEY_VAL.replace_all(candidate, "\"$1\":\"$2\"");
    if let Ok(v) = serde_json::from_str::<Value>(rewritten.as_ref()) {
        return v.is_object().then_some(v);
    }

    None
}

fn normalize(value: Value) -> Option<ModelReco> {
    let obj = value.as_object()?;
    let action = RecoAction::parse(obj.get("action")?.as_str()?)?;

    let opt_string = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(str::to_string)
    };

    Some(ModelReco {
        action,
        target_type: opt_string("target_type"),
        target_size: opt_string("target_size"),
        reason: opt_string("reason").unwrap_or_else(|| "unspecified".into()),
        estimated_savings_usd: obj.get("estimated_savings_usd").and_then(Value::as_f64),
        confidence: obj
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0),
    })
}
