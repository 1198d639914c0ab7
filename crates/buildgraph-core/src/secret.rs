//! Credential records handed through to the execution engine.
//!
//! The compiler never interprets these; it only carries them along with the
//! compiled plan. `Debug` output masks the sensitive fields.

use serde::{Deserialize, Serialize};

use crate::build::BuildEvent;

const MASK: &str = "******";

/// A named secret made available to pipeline steps.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: String,
    /// Images allowed to receive the secret (empty means any).
    pub images: Vec<String>,
    /// Events the secret is exposed for (empty means any).
    pub events: Vec<BuildEvent>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("value", &MASK)
            .field("images", &self.images)
            .field("events", &self.events)
            .finish()
    }
}

/// Credentials for a container registry.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    pub address: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &MASK)
            .finish()
    }
}

/// Machine credentials used by the clone step.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Netrc {
    pub machine: String,
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Netrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Netrc")
            .field("machine", &self.machine)
            .field("login", &self.login)
            .field("password", &MASK)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_values() {
        let secret = Secret {
            name: "docker_password".to_string(),
            value: "hunter2".to_string(),
            ..Default::default()
        };
        let out = format!("{:?}", secret);
        assert!(out.contains("docker_password"));
        assert!(!out.contains("hunter2"));

        let netrc = Netrc {
            machine: "github.com".to_string(),
            login: "x-token".to_string(),
            password: "ghp_secret".to_string(),
        };
        assert!(!format!("{:?}", netrc).contains("ghp_secret"));
    }
}
