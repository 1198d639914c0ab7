//! Repository identity.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Git provider hosting a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProvider {
    #[default]
    Github,
    Gitlab,
    Gitea,
    Bitbucket,
}

impl std::fmt::Display for GitProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitProvider::Github => write!(f, "github"),
            GitProvider::Gitlab => write!(f, "gitlab"),
            GitProvider::Gitea => write!(f, "gitea"),
            GitProvider::Bitbucket => write!(f, "bitbucket"),
        }
    }
}

impl std::str::FromStr for GitProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(GitProvider::Github),
            "gitlab" => Ok(GitProvider::Gitlab),
            "gitea" => Ok(GitProvider::Gitea),
            "bitbucket" => Ok(GitProvider::Bitbucket),
            _ => Err(Error::InvalidInput(format!("unknown git provider: {}", s))),
        }
    }
}

/// The repository a build belongs to. Read-only during compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repo {
    pub provider: GitProvider,
    pub owner: String,
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Web link to the repository.
    pub link: String,
    pub clone_url: String,
    pub default_branch: String,
    pub is_private: bool,
}

impl Repo {
    /// Build a repository record from an `owner/name` slug.
    pub fn from_full_name(full_name: &str) -> Self {
        let (owner, name) = full_name.split_once('/').unwrap_or(("", full_name));
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: full_name.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_full_name() {
        let repo = Repo::from_full_name("octocat/hello-world");
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
        assert_eq!(repo.full_name, "octocat/hello-world");
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("GitLab".parse::<GitProvider>().unwrap(), GitProvider::Gitlab);
        assert!("svn".parse::<GitProvider>().is_err());
    }
}
