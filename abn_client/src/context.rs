use abn::{SessionHints, TeamId};
use serde_json::Value;

use crate::PlayError;

/// The identifiers a player process is started with.
///
/// How they are provisioned (login, matchmaking) is not our concern; they
/// arrive as stored blobs or command line flags.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionContext {
    pub session_id: String,
    /// The post the match is played at, forwarded to the service where it asks for it.
    pub post_id: Option<u32>,
    pub hints: SessionHints,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            post_id: None,
            hints: SessionHints::default(),
        }
    }

    #[must_use]
    pub fn with_post_id(mut self, post_id: u32) -> Self {
        self.post_id = Some(post_id);
        self
    }

    #[must_use]
    pub fn with_team_id(mut self, team_id: TeamId) -> Self {
        self.hints.team_id = Some(team_id);
        self
    }

    /// Builds a context from the blobs the surrounding application stored.
    ///
    /// `session_blob` is the stored game session, `user_blob` the stored user.
    /// Fails with [`PlayError::MissingSession`] if no session id can be found.
    pub fn from_stored(
        session_blob: Option<&str>,
        user_blob: Option<&str>,
        post_id: Option<u32>,
    ) -> Result<Self, PlayError> {
        let payload = session_blob.map(parse_blob);
        let session_id = payload
            .as_ref()
            .and_then(session_id_from_payload)
            .ok_or(PlayError::MissingSession)?;
        let team_id = user_blob.and_then(team_id_from_user);
        Ok(Self {
            session_id,
            post_id,
            hints: SessionHints { team_id, payload },
        })
    }
}

/// Stored blobs are usually JSON, but plain strings are kept as they are.
fn parse_blob(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(String::from(raw)))
}

fn session_id_from_payload(payload: &Value) -> Option<String> {
    match payload {
        Value::Object(map) => ["game_session_id", "id"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(scalar_to_string)
            .or_else(|| Some(payload.to_string())),
        other => scalar_to_string(other),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(num) if num.as_f64() != Some(0.0) => Some(num.to_string()),
        _ => None,
    }
}

fn team_id_from_user(raw: &str) -> Option<TeamId> {
    let Ok(Value::Object(user)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    ["id_tim", "team_id"]
        .iter()
        .filter_map(|key| user.get(*key))
        .find_map(|value| match value {
            Value::Number(num) => num.as_i64().filter(|&n| n != 0).map(TeamId::Number),
            Value::String(text) if !text.is_empty() => Some(TeamId::Text(text.clone())),
            _ => None,
        })
}
