//! Compilation errors.

use buildgraph_config::ConfigError;
use buildgraph_core::PipelineName;
use thiserror::Error;

/// Terminal failure of a compile call. All variants are deterministic in the
/// input, so retrying without changing the definitions cannot succeed.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to parse pipeline '{name}': {source}")]
    Parse {
        name: PipelineName,
        #[source]
        source: ConfigError,
    },

    #[error("dependency cycle detected: {}", display_cycle(.cycle))]
    DependencyCycle { cycle: Vec<PipelineName> },

    #[error("invalid configuration in pipeline '{pipeline}': {message}")]
    Configuration {
        pipeline: PipelineName,
        message: String,
    },
}

impl CompileError {
    pub(crate) fn configuration(pipeline: &PipelineName, message: impl Into<String>) -> Self {
        CompileError::Configuration {
            pipeline: pipeline.clone(),
            message: message.into(),
        }
    }
}

fn display_cycle(cycle: &[PipelineName]) -> String {
    cycle
        .iter()
        .map(PipelineName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type CompileResult<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = CompileError::DependencyCycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    }

    #[test]
    fn test_parse_error_names_definition() {
        let err = CompileError::Parse {
            name: "lint".into(),
            source: ConfigError::MissingField("image for step 'build'".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse pipeline 'lint': missing required field: image for step 'build'"
        );
    }
}
