//! CLI command implementations.

use anyhow::{Context, Result};
use buildgraph_compiler::{CompiledItem, Compiler};
use buildgraph_config::{CompilerConfig, parse_compiler_config};
use buildgraph_core::{Build, BuildContext, RawDefinition, Repo};
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::BuildArgs;

/// File name that holds the unnamed pipeline of a repository.
const UNNAMED_DEFINITION: &str = ".buildgraph.kdl";

pub fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    let Some(path) = path else {
        return Ok(CompilerConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_compiler_config(&content).with_context(|| format!("invalid config {}", path.display()))
}

/// Name a definition after its file. `None` for the unnamed pipeline.
fn definition_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name == UNNAMED_DEFINITION {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

fn load_definitions(files: &[PathBuf]) -> Result<Vec<RawDefinition>> {
    files
        .iter()
        .map(|path| {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let raw = match definition_name(path) {
                Some(name) => RawDefinition::new(name, data),
                None => RawDefinition::unnamed(data),
            };
            debug!(path = %path.display(), pipeline = %raw.name, "Loaded definition");
            Ok(raw)
        })
        .collect()
}

fn build_context(args: &BuildArgs) -> BuildContext {
    let build = Build {
        number: args.number,
        event: args.event,
        commit: args.commit.clone(),
        branch: args.branch.clone(),
        git_ref: args
            .git_ref
            .clone()
            .unwrap_or_else(|| format!("refs/heads/{}", args.branch)),
        message: args.message.clone(),
        author: args.author.clone(),
        deploy_to: args.deploy_to.clone(),
        ..Default::default()
    };
    BuildContext::new(Repo::from_full_name(&args.repo), build).with_link(args.link.clone())
}

pub fn compile(
    files: &[PathBuf],
    args: &BuildArgs,
    config: CompilerConfig,
    json: bool,
) -> Result<()> {
    let definitions = load_definitions(files)?;
    let ctx = build_context(args);
    let items = Compiler::new(&ctx).with_config(config).compile(&definitions)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print!("{}", render(&items)?);
    }
    Ok(())
}

pub fn validate(files: &[PathBuf], config: CompilerConfig) -> Result<()> {
    let definitions = load_definitions(files)?;
    let ctx = BuildContext::default();
    let items = Compiler::new(&ctx).with_config(config).compile(&definitions)?;

    println!(
        "Configuration is valid ({} definitions, {} pipelines on a default push build)",
        definitions.len(),
        items.len()
    );
    Ok(())
}

/// Plain-text view of the compiled plan.
fn render(items: &[CompiledItem]) -> Result<String, fmt::Error> {
    if items.is_empty() {
        return Ok("Nothing to run\n".to_string());
    }

    let mut out = String::new();
    for item in items {
        write!(out, "{} [{}] on {}", item.name, item.proc.state, item.platform)?;
        if !item.depends_on.is_empty() {
            let deps: Vec<&str> = item.depends_on.iter().map(|d| d.as_str()).collect();
            write!(out, " after {}", deps.join(", "))?;
        }
        if !item.runs_on.is_empty() {
            let runs_on: Vec<&str> = item.runs_on.iter().map(|r| r.as_str()).collect();
            write!(out, " runs on {}", runs_on.join(", "))?;
        }
        out.push('\n');

        for (step, node) in item.config.steps.iter().zip(&item.proc.children) {
            writeln!(
                out,
                "  #{} {} ({}) [{}] {}",
                node.id,
                node.name,
                node.kind.as_str(),
                node.state,
                step.image
            )?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildgraph_compiler::compile;

    #[test]
    fn test_definition_name() {
        assert_eq!(
            definition_name(Path::new("ci/lint.kdl")),
            Some("lint".to_string())
        );
        assert_eq!(definition_name(Path::new("repo/.buildgraph.kdl")), None);
        assert_eq!(
            definition_name(Path::new("deploy")),
            Some("deploy".to_string())
        );
    }

    #[test]
    fn test_render_plan() {
        let ctx = BuildContext::default();
        let defs = [
            RawDefinition::new("lint", r#"pipeline { check { image "alpine"; } }"#),
            RawDefinition::new(
                "deploy",
                r#"
                depends_on "lint"
                runs_on "success" "failure"
                pipeline { ship { image "alpine"; } }
                "#,
            ),
        ];
        let items = compile(&ctx, &defs).unwrap();

        let text = render(&items).unwrap();
        assert!(text.contains("lint [pending] on linux/amd64\n"));
        assert!(text.contains("deploy [pending] on linux/amd64 after lint runs on success, failure\n"));
        assert!(text.contains("  #2 clone (clone) [pending]"));
        assert!(text.contains("  #6 ship (step) [pending] alpine\n"));
    }

    #[test]
    fn test_render_nothing() {
        assert_eq!(render(&[]).unwrap(), "Nothing to run\n");
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), CompilerConfig::default());
    }
}
