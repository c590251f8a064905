//! Operator identity used to stamp session ownership.
//!
//! The wizard reads the current operator exactly once at start and
//! stamps their id into every persisted record; it does not subscribe to
//! later identity changes. [`AuthContext`] is the seam the embedding
//! application implements over its real authentication layer;
//! [`StaticAuthContext`] is the fixed-identity implementation used in
//! tests and single-operator tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the authenticated operator driving a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    /// A social worker running sessions with children assigned to them.
    SocialWorker,
    /// An administrator; may also resume sessions owned by others.
    Admin,
}

impl OperatorRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorRole::SocialWorker => "social_worker",
            OperatorRole::Admin => "admin",
        }
    }
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated operator: the social worker or admin on whose
/// behalf a session is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub role: OperatorRole,
}

impl Operator {
    #[must_use]
    pub fn new(id: &str, role: OperatorRole) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }

    /// Convenience constructor for the common case.
    #[must_use]
    pub fn social_worker(id: &str) -> Self {
        Self::new(id, OperatorRole::SocialWorker)
    }

    #[must_use]
    pub fn admin(id: &str) -> Self {
        Self::new(id, OperatorRole::Admin)
    }

    /// Whether this operator may open sessions owned by `owner_id`.
    #[must_use]
    pub fn may_access(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.role == OperatorRole::Admin
    }
}

/// Source of the current operator identity.
///
/// Implementations wrap whatever authentication layer the embedding
/// application uses; the wizard only ever calls
/// [`current_operator`](Self::current_operator) once, at start.
pub trait AuthContext {
    fn current_operator(&self) -> Operator;
}

/// An auth context with a fixed operator.
#[derive(Clone, Debug)]
pub struct StaticAuthContext {
    operator: Operator,
}

impl StaticAuthContext {
    #[must_use]
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }
}

impl AuthContext for StaticAuthContext {
    fn current_operator(&self) -> Operator {
        self.operator.clone()
    }
}
