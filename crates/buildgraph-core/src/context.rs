//! The read-only context a compilation runs against.

use crate::build::Build;
use crate::repository::Repo;
use crate::secret::{Netrc, Registry, Secret};

/// Everything the compiler knows about the triggering build.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub repo: Repo,
    /// The build being compiled.
    pub curr: Build,
    /// The previous build of the same repository, if any.
    pub last: Option<Build>,
    pub netrc: Netrc,
    pub secrets: Vec<Secret>,
    pub registries: Vec<Registry>,
    /// Base URL of the CI server, used for self-referential links.
    pub link: String,
}

impl BuildContext {
    pub fn new(repo: Repo, curr: Build) -> Self {
        Self {
            repo,
            curr,
            ..Default::default()
        }
    }

    pub fn with_last(mut self, last: Build) -> Self {
        self.last = Some(last);
        self
    }

    pub fn with_netrc(mut self, netrc: Netrc) -> Self {
        self.netrc = netrc;
        self
    }

    pub fn with_secrets(mut self, secrets: Vec<Secret>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_registries(mut self, registries: Vec<Registry>) -> Self {
        self.registries = registries;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }
}
