//! Check requests and their context map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CheckEngineResult, CheckError};

/// Identifier for a character known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CharacterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The kind of check a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckKind {
    /// A skill check against a DC.
    Skill,
    /// A raw ability check against a DC.
    Ability,
    /// A saving throw against a DC.
    SavingThrow,
    /// An attack roll (target AC is resolved elsewhere).
    Attack,
    /// No check is required.
    None,
}

impl CheckKind {
    /// Parse a kind from a context string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "skill" => Some(Self::Skill),
            "ability" => Some(Self::Ability),
            "savingthrow" | "save" => Some(Self::SavingThrow),
            "attack" => Some(Self::Attack),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skill => write!(f, "skill"),
            Self::Ability => write!(f, "ability"),
            Self::SavingThrow => write!(f, "saving_throw"),
            Self::Attack => write!(f, "attack"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Situational context attached to a request.
///
/// Carries dc/difficulty hints, environment flags, party-level hints,
/// and automatic-outcome markers.
pub type Context = serde_json::Map<String, Value>;

/// Read a string from a context map.
pub fn ctx_str<'a>(context: &'a Context, key: &str) -> Option<&'a str> {
    context.get(key).and_then(Value::as_str)
}

/// Read an integer from a context map.
pub fn ctx_i64(context: &Context, key: &str) -> Option<i64> {
    context.get(key).and_then(Value::as_i64)
}

/// Read a boolean from a context map. String `"true"`/`"false"` also count.
pub fn ctx_bool(context: &Context, key: &str) -> Option<bool> {
    match context.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A request to resolve an action into a (possibly rolled) check.
///
/// Created per call by the command-interpretation collaborator; the
/// engine never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Free-text description of what the actor is attempting.
    pub action: String,
    /// Who is acting.
    pub actor: CharacterId,
    /// The skill being tested, when already resolved.
    pub skill: Option<String>,
    /// Explicit check kind; wins over any `context.type` hint.
    pub kind: Option<CheckKind>,
    /// Situational context.
    pub context: Context,
}

impl CheckRequest {
    /// Create a request with an empty context.
    pub fn new(action: impl Into<String>, actor: impl Into<CharacterId>) -> Self {
        Self {
            action: action.into(),
            actor: actor.into(),
            skill: None,
            kind: None,
            context: Context::new(),
        }
    }

    /// Set the skill being tested.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skill = Some(skill.into());
        self
    }

    /// Set the explicit check kind.
    pub fn with_kind(mut self, kind: CheckKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Build a request from raw JSON, validating the context shape.
    ///
    /// A present-but-non-object `context` is a [`CheckError::MalformedContext`];
    /// this is the only validation failure the engine reports before stage 1.
    pub fn from_json(value: Value) -> CheckEngineResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(CheckError::InvalidRequest(
                "request must be a JSON object".to_string(),
            ));
        };

        let action = map
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| CheckError::InvalidRequest("missing action".to_string()))?
            .to_string();
        let actor = map
            .get("actor")
            .and_then(Value::as_str)
            .ok_or_else(|| CheckError::InvalidRequest("missing actor".to_string()))?
            .to_string();
        if actor.is_empty() {
            return Err(CheckError::InvalidRequest("empty actor id".to_string()));
        }

        let skill = map
            .get("skill")
            .and_then(Value::as_str)
            .map(str::to_string);
        let kind = map
            .get("type")
            .and_then(Value::as_str)
            .and_then(CheckKind::parse);

        let context = match map.remove("context") {
            None | Some(Value::Null) => Context::new(),
            Some(Value::Object(ctx)) => ctx,
            Some(other) => {
                return Err(CheckError::MalformedContext(format!(
                    "context must be an object, got {}",
                    type_name(&other)
                )));
            }
        };

        Ok(Self {
            action,
            actor: CharacterId::new(actor),
            skill,
            kind,
            context,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
