//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Separator between the two participant ids of a conversation key.
pub const CONVERSATION_KEY_SEPARATOR: char = '_';

/// Maximum length of a client-generated message id.
pub const MAX_CLIENT_MESSAGE_ID_LENGTH: usize = 128;

/// User identifier, issued by the external profile service.
///
/// Must be non-empty and must not contain [`CONVERSATION_KEY_SEPARATOR`],
/// otherwise conversation keys could not be split back into participants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, trimming surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        if id.contains(CONVERSATION_KEY_SEPARATOR) {
            return Err(ValidationError::invalid_format(
                "user_id",
                format!("must not contain '{}'", CONVERSATION_KEY_SEPARATOR),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of this user's realtime delivery room.
    pub fn room_name(&self) -> String {
        format!("user-{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Surrogate identifier of a conversation record.
///
/// The business key used by clients is [`ConversationKey`]; this id exists so
/// records have a stable opaque identity independent of participant ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Creates a new random ConversationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ConversationId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic natural key of a 1:1 conversation.
///
/// The two participant ids sorted and joined with
/// [`CONVERSATION_KEY_SEPARATOR`]. Only the canonical (sorted) form parses,
/// so every unordered pair maps to exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationKey {
    key: String,
    first: UserId,
    second: UserId,
}

impl ConversationKey {
    /// Builds the canonical key for an unordered pair of users.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if both ids are the same user
    pub fn for_pair(a: &UserId, b: &UserId) -> Result<Self, ValidationError> {
        if a == b {
            return Err(ValidationError::invalid_format(
                "conversation_id",
                "a conversation needs two distinct participants",
            ));
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            key: format!("{}{}{}", first, CONVERSATION_KEY_SEPARATOR, second),
            first: first.clone(),
            second: second.clone(),
        })
    }

    /// Parses a key received from a client.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::empty_field("conversation_id"));
        }
        let (left, right) = raw.split_once(CONVERSATION_KEY_SEPARATOR).ok_or_else(|| {
            ValidationError::invalid_format("conversation_id", "expected two participant ids")
        })?;
        let first = UserId::new(left)
            .map_err(|e| ValidationError::invalid_format("conversation_id", e.to_string()))?;
        let second = UserId::new(right)
            .map_err(|e| ValidationError::invalid_format("conversation_id", e.to_string()))?;

        let key = Self::for_pair(&first, &second)?;
        if key.key != raw {
            return Err(ValidationError::invalid_format(
                "conversation_id",
                "participant ids must be in sorted order",
            ));
        }
        Ok(key)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Both participants, in key order.
    pub fn participants(&self) -> [&UserId; 2] {
        [&self.first, &self.second]
    }

    /// Whether the user is one of the two participants.
    pub fn includes(&self, user_id: &UserId) -> bool {
        &self.first == user_id || &self.second == user_id
    }

    /// The other participant, or `None` if `me` is not part of this key.
    pub fn counterpart(&self, me: &UserId) -> Option<&UserId> {
        if &self.first == me {
            Some(&self.second)
        } else if &self.second == me {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl FromStr for ConversationKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConversationKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConversationKey> for String {
    fn from(key: ConversationKey) -> Self {
        key.key
    }
}

/// Client-generated id attached to a send so retries are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientMessageId(String);

impl ClientMessageId {
    /// Creates a ClientMessageId, rejecting blank or oversized values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::empty_field("client_message_id"));
        }
        if id.len() > MAX_CLIENT_MESSAGE_ID_LENGTH {
            return Err(ValidationError::too_long(
                "client_message_id",
                MAX_CLIENT_MESSAGE_ID_LENGTH,
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ClientMessageId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientMessageId> for String {
    fn from(id: ClientMessageId) -> Self {
        id.0
    }
}
