//! Detection of pipelines that declare nothing to run.
//!
//! Skipped steps still count: a pipeline that only runs nothing because of a
//! condition is kept and shows up as skipped. Only excluded steps and the
//! absence of a clone step shrink the count.

use buildgraph_core::PipelineDefinition;

use crate::applicability::Applicability;

/// Steps the compiled pipeline will contain, including the implicit clone.
pub fn executable_step_count(def: &PipelineDefinition, applicability: &Applicability) -> usize {
    usize::from(!def.skip_clone) + applicability.retained_steps()
}

pub fn is_empty(def: &PipelineDefinition, applicability: &Applicability) -> bool {
    executable_step_count(def, applicability) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicability::StepDisposition;

    fn applicability(steps: Vec<StepDisposition>) -> Applicability {
        Applicability {
            pipeline_applies: true,
            steps,
        }
    }

    #[test]
    fn test_clone_step_keeps_pipeline_alive() {
        let def = PipelineDefinition::default();
        assert_eq!(executable_step_count(&def, &applicability(vec![])), 1);
        assert!(!is_empty(&def, &applicability(vec![])));
    }

    #[test]
    fn test_skip_clone_without_steps_is_empty() {
        let def = PipelineDefinition {
            skip_clone: true,
            ..Default::default()
        };
        assert!(is_empty(&def, &applicability(vec![])));
        assert!(is_empty(
            &def,
            &applicability(vec![StepDisposition::Exclude])
        ));
    }

    #[test]
    fn test_skipped_steps_still_count() {
        let def = PipelineDefinition {
            skip_clone: true,
            ..Default::default()
        };
        let skipped = Applicability {
            pipeline_applies: false,
            steps: vec![StepDisposition::Skip],
        };
        assert_eq!(executable_step_count(&def, &skipped), 1);
        assert!(!is_empty(&def, &skipped));
    }
}
