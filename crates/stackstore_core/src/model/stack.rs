//! Stack domain model.
//!
//! # Responsibility
//! - Define the stack record and its nested value types.
//! - Validate write-path preconditions before anything reaches storage.
//!
//! # Invariants
//! - `id` is caller-supplied, non-blank and never changes after create.
//! - `name` is non-blank; uniqueness is enforced by repositories.
//! - Nested lists keep caller order; equality is field-by-field.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a stack. Caller-supplied.
pub type StackId = String;

/// Action string that makes a stack eligible for search results.
pub const SEARCH_ACTION: &str = "search";

const GENERATED_ID_PREFIX: &str = "stack";

/// Named software component shipped by a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackComponent {
    pub name: String,
    pub version: String,
}

impl StackComponent {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Where the stack's environment comes from (image, recipe, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackSource {
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: String,
    pub origin: String,
}

impl StackSource {
    pub fn new(kind: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            origin: origin.into(),
        }
    }
}

/// Binary icon attached to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackIcon {
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl StackIcon {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// Grants `user` the listed actions on the owning stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    pub user: String,
    pub actions: Vec<String>,
}

impl AclEntry {
    pub fn new<I, S>(user: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: user.into(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns whether this entry grants `action` (exact string match).
    pub fn grants(&self, action: &str) -> bool {
        self.actions.iter().any(|granted| granted == action)
    }
}

/// Workspace configuration carried by a stack.
///
/// Owned by the workspace subsystem; stacks only copy and compare it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceConfig(serde_json::Value);

impl WorkspaceConfig {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for WorkspaceConfig {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Reusable workspace template with tags, ACL and public actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: StackId,
    pub name: String,
    pub creator: String,
    pub description: String,
    pub scope: String,
    pub tags: Vec<String>,
    pub components: Vec<StackComponent>,
    pub source: StackSource,
    pub icon: Option<StackIcon>,
    pub acl: Vec<AclEntry>,
    pub public_actions: Vec<String>,
    pub workspace_config: WorkspaceConfig,
}

impl Stack {
    /// Creates an empty stack with caller-provided identity.
    pub fn new(id: impl Into<StackId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            creator: String::new(),
            description: String::new(),
            scope: String::new(),
            tags: Vec::new(),
            components: Vec::new(),
            source: StackSource::default(),
            icon: None,
            acl: Vec::new(),
            public_actions: Vec::new(),
            workspace_config: WorkspaceConfig::default(),
        }
    }

    /// Creates an empty stack with a freshly generated id.
    ///
    /// Generated ids look like `stack1f0c...` and never collide in practice,
    /// but repositories still enforce uniqueness on create.
    pub fn with_generated_id(name: impl Into<String>) -> Self {
        Self::new(generate_stack_id(), name)
    }

    /// Checks write-path preconditions.
    ///
    /// # Errors
    /// - `BlankId` when `id` is empty or whitespace.
    /// - `BlankName` when `name` is empty or whitespace.
    /// - `BlankAclUser` when any ACL entry has no user.
    pub fn validate(&self) -> Result<(), StackValidationError> {
        validate_stack_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(StackValidationError::BlankName);
        }
        if let Some(position) = self.acl.iter().position(|entry| entry.user.trim().is_empty()) {
            return Err(StackValidationError::BlankAclUser { position });
        }
        Ok(())
    }

    /// Returns whether `action` is granted to every caller.
    pub fn is_public(&self, action: &str) -> bool {
        self.public_actions.iter().any(|granted| granted == action)
    }
}

/// Rejects blank identifiers. Blank ids stand for an absent argument.
pub fn validate_stack_id(id: &str) -> Result<(), StackValidationError> {
    if id.trim().is_empty() {
        return Err(StackValidationError::BlankId);
    }
    Ok(())
}

/// Generates a new stack id.
pub fn generate_stack_id() -> StackId {
    format!("{GENERATED_ID_PREFIX}{}", Uuid::new_v4().simple())
}

/// Precondition failures for stack arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValidationError {
    BlankId,
    BlankName,
    BlankAclUser { position: usize },
}

impl Display for StackValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "stack id is required"),
            Self::BlankName => write!(f, "stack name is required"),
            Self::BlankAclUser { position } => {
                write!(f, "acl entry #{position} has no user")
            }
        }
    }
}

impl Error for StackValidationError {}
