//! Branch and event conditions evaluated against the triggering build.
//!
//! The pipeline-level condition is checked first. When it fails the whole
//! pipeline is kept but skipped and step conditions are not looked at. When it
//! holds, each step's commit conditions decide whether the step is part of the
//! plan at all. Status conditions only make sense at runtime and are left to
//! the scheduler.

use buildgraph_core::{Build, Constraint, PipelineDefinition, When};

/// What happens to a single declared step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDisposition {
    /// Part of the plan and pending.
    Run,
    /// Part of the plan but never runs for this build.
    Skip,
    /// Not part of the plan: its own conditions exclude this build.
    Exclude,
}

/// Evaluation result for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicability {
    pub pipeline_applies: bool,
    /// One entry per declared step, in declaration order.
    pub steps: Vec<StepDisposition>,
}

impl Applicability {
    pub fn evaluate(def: &PipelineDefinition, build: &Build) -> Self {
        if !pipeline_applies(def, build) {
            return Self {
                pipeline_applies: false,
                steps: vec![StepDisposition::Skip; def.steps.len()],
            };
        }

        let steps = def
            .steps
            .iter()
            .map(|step| {
                if step_applies(&step.when, build) {
                    StepDisposition::Run
                } else {
                    StepDisposition::Exclude
                }
            })
            .collect();

        Self {
            pipeline_applies: true,
            steps,
        }
    }

    /// Steps that remain in the plan, skipped or not.
    pub fn retained_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|d| **d != StepDisposition::Exclude)
            .count()
    }
}

/// Pipeline-level `branches` and `events`.
pub fn pipeline_applies(def: &PipelineDefinition, build: &Build) -> bool {
    matches(&def.branches, &build.branch) && matches(&def.events, build.event.as_str())
}

/// Step-level commit conditions. `status` is ignored here.
pub fn step_applies(when: &When, build: &Build) -> bool {
    matches(&when.branch, &build.branch)
        && matches(&when.event, build.event.as_str())
        && matches(&when.git_ref, &build.git_ref)
        && matches(&when.environment, &build.deploy_to)
}

/// An empty constraint matches anything. Otherwise the value must match one
/// include pattern (when there are any) and no exclude pattern.
pub fn matches(constraint: &Constraint, value: &str) -> bool {
    if !constraint.include.is_empty()
        && !constraint
            .include
            .iter()
            .any(|pattern| pattern_matches(pattern, value))
    {
        return false;
    }

    !constraint
        .exclude
        .iter()
        .any(|pattern| pattern_matches(pattern, value))
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(glob) => glob.matches(value),
        Err(_) => pattern == value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildgraph_core::{BuildEvent, StepDefinition};

    fn build(branch: &str, event: BuildEvent) -> Build {
        Build {
            branch: branch.to_string(),
            event,
            git_ref: format!("refs/heads/{}", branch),
            ..Default::default()
        }
    }

    fn step(name: &str, when: When) -> StepDefinition {
        StepDefinition {
            name: name.to_string(),
            image: "alpine".to_string(),
            when,
            ..Default::default()
        }
    }

    #[test]
    fn test_constraint_matching() {
        let empty = Constraint::default();
        assert!(matches(&empty, "anything"));
        assert!(matches(&empty, ""));

        let release = Constraint::including(["main", "release/*"]);
        assert!(matches(&release, "main"));
        assert!(matches(&release, "release/1.0"));
        assert!(!matches(&release, "dev"));

        let no_wip = Constraint {
            include: vec![],
            exclude: vec!["wip/*".to_string()],
        };
        assert!(matches(&no_wip, "main"));
        assert!(!matches(&no_wip, "wip/thing"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let constraint = Constraint {
            include: vec!["*".to_string()],
            exclude: vec!["dev".to_string()],
        };
        assert!(matches(&constraint, "main"));
        assert!(!matches(&constraint, "dev"));
    }

    #[test]
    fn test_invalid_glob_falls_back_to_equality() {
        let constraint = Constraint::including(["[oops"]);
        assert!(matches(&constraint, "[oops"));
        assert!(!matches(&constraint, "oops"));
    }

    #[test]
    fn test_pipeline_condition_skips_every_step() {
        let def = PipelineDefinition {
            branches: Constraint::including(["master"]),
            steps: vec![
                step("a", When::default()),
                step(
                    "b",
                    When {
                        branch: Constraint::including(["nope"]),
                        ..Default::default()
                    },
                ),
            ],
            ..Default::default()
        };

        let result = Applicability::evaluate(&def, &build("dev", BuildEvent::Push));
        assert!(!result.pipeline_applies);
        assert_eq!(
            result.steps,
            vec![StepDisposition::Skip, StepDisposition::Skip]
        );
        assert_eq!(result.retained_steps(), 2);
    }

    #[test]
    fn test_step_conditions_exclude_steps() {
        let def = PipelineDefinition {
            steps: vec![
                step("always", When::default()),
                step(
                    "only-notdev",
                    When {
                        branch: Constraint::including(["notdev"]),
                        ..Default::default()
                    },
                ),
                step(
                    "only-tags",
                    When {
                        event: Constraint::including(["tag"]),
                        ..Default::default()
                    },
                ),
                step(
                    "on-failure",
                    When {
                        status: Constraint::including(["failure"]),
                        ..Default::default()
                    },
                ),
            ],
            ..Default::default()
        };

        let result = Applicability::evaluate(&def, &build("dev", BuildEvent::Push));
        assert!(result.pipeline_applies);
        assert_eq!(
            result.steps,
            vec![
                StepDisposition::Run,
                StepDisposition::Exclude,
                StepDisposition::Exclude,
                StepDisposition::Run,
            ]
        );
        assert_eq!(result.retained_steps(), 2);
    }

    #[test]
    fn test_event_and_ref_conditions() {
        let tag_build = Build {
            event: BuildEvent::Tag,
            git_ref: "refs/tags/v1.0.0".to_string(),
            ..Default::default()
        };
        let when = When {
            event: Constraint::including(["tag"]),
            git_ref: Constraint::including(["refs/tags/v*"]),
            ..Default::default()
        };
        assert!(step_applies(&when, &tag_build));
        assert!(!step_applies(&when, &build("main", BuildEvent::Push)));
    }

    #[test]
    fn test_environment_condition_uses_deploy_target() {
        let deploy = Build {
            event: BuildEvent::Deployment,
            deploy_to: "production".to_string(),
            ..Default::default()
        };
        let when = When {
            environment: Constraint::including(["production"]),
            ..Default::default()
        };
        assert!(step_applies(&when, &deploy));
        assert!(!step_applies(&when, &Build::default()));
    }

    #[test]
    fn test_pipeline_events_filter() {
        let def = PipelineDefinition {
            events: Constraint::including(["pull_request"]),
            ..Default::default()
        };
        assert!(!pipeline_applies(&def, &build("main", BuildEvent::Push)));
        assert!(pipeline_applies(&def, &build("main", BuildEvent::PullRequest)));
    }
}
