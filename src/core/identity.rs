use serde::{Deserialize, Serialize};

pub const ANONYMOUS_NAME: &str = "Friend";
pub const ANONYMOUS_EMAIL: &str = "anonymous_user@calmly.app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Supplies the user whose email namespaces every persisted key.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
}

/// No-auth identity: everyone is the same static anonymous user.
#[derive(Debug, Clone, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn current_user(&self) -> Option<User> {
        Some(User {
            name: ANONYMOUS_NAME.to_string(),
            email: ANONYMOUS_EMAIL.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) struct NoUser;

#[cfg(test)]
impl IdentityProvider for NoUser {
    fn current_user(&self) -> Option<User> {
        None
    }
}
