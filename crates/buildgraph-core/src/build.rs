//! Build records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::BuildId;
use crate::proc::Proc;
use crate::{Error, Result};

/// The event that triggered a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildEvent {
    #[default]
    Push,
    PullRequest,
    Tag,
    Deployment,
    Cron,
    Manual,
}

impl BuildEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildEvent::Push => "push",
            BuildEvent::PullRequest => "pull_request",
            BuildEvent::Tag => "tag",
            BuildEvent::Deployment => "deployment",
            BuildEvent::Cron => "cron",
            BuildEvent::Manual => "manual",
        }
    }
}

impl std::fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "push" => Ok(BuildEvent::Push),
            "pull_request" | "pull-request" | "pr" => Ok(BuildEvent::PullRequest),
            "tag" => Ok(BuildEvent::Tag),
            "deployment" | "deploy" => Ok(BuildEvent::Deployment),
            "cron" => Ok(BuildEvent::Cron),
            "manual" => Ok(BuildEvent::Manual),
            _ => Err(Error::InvalidInput(format!("unknown build event: {}", s))),
        }
    }
}

/// Status shared by builds and process nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting to be scheduled.
    #[default]
    Pending,
    /// Will never run for this build.
    Skipped,
    Running,
    Success,
    Failure,
    Killed,
    Error,
    Blocked,
    Declined,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Skipped => "skipped",
            Status::Running => "running",
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Killed => "killed",
            Status::Error => "error",
            Status::Blocked => "blocked",
            Status::Declined => "declined",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "skipped" => Ok(Status::Skipped),
            "running" => Ok(Status::Running),
            "success" => Ok(Status::Success),
            "failure" => Ok(Status::Failure),
            "killed" => Ok(Status::Killed),
            "error" => Ok(Status::Error),
            "blocked" => Ok(Status::Blocked),
            "declined" => Ok(Status::Declined),
            _ => Err(Error::InvalidInput(format!("unknown status: {}", s))),
        }
    }
}

/// A build of one commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Build {
    /// Unique identifier.
    pub id: BuildId,
    /// Build number (incrementing per repository).
    pub number: u64,
    /// What triggered this build.
    pub event: BuildEvent,
    /// Current status.
    pub status: Status,
    /// Commit SHA.
    pub commit: String,
    /// Branch the commit belongs to.
    pub branch: String,
    /// Full git ref (e.g. `refs/heads/main`, `refs/tags/v1.0.0`).
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Commit message.
    pub message: String,
    pub author: String,
    pub author_email: String,
    pub author_avatar: String,
    /// Deployment target for deployment events.
    pub deploy_to: String,
    /// Link to the commit on the forge.
    pub link: String,
    pub created_at: DateTime<Utc>,
    /// Flattened process list, filled by the compiler's attach step.
    pub procs: Vec<Proc>,
}

impl Build {
    /// Tag name, when this build was triggered by a tag.
    pub fn tag(&self) -> Option<&str> {
        if self.event != BuildEvent::Tag {
            return None;
        }
        Some(
            self.git_ref
                .strip_prefix("refs/tags/")
                .unwrap_or(&self.git_ref),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trip_through_text() {
        assert_eq!("push".parse::<BuildEvent>().unwrap(), BuildEvent::Push);
        assert_eq!(
            "pull_request".parse::<BuildEvent>().unwrap(),
            BuildEvent::PullRequest
        );
        assert_eq!(BuildEvent::Deployment.to_string(), "deployment");
        assert!("merge".parse::<BuildEvent>().is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::Skipped.to_string(), "skipped");
        assert!("finished".parse::<Status>().is_err());
        assert_eq!("SKIPPED".parse::<Status>().unwrap(), Status::Skipped);
    }

    #[test]
    fn test_tag_only_for_tag_events() {
        let mut build = Build {
            git_ref: "refs/tags/v1.2.0".to_string(),
            ..Default::default()
        };
        assert_eq!(build.tag(), None);

        build.event = BuildEvent::Tag;
        assert_eq!(build.tag(), Some("v1.2.0"));
    }
}
