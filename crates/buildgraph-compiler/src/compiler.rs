//! The compilation pass.

use buildgraph_config::{CompilerConfig, VariableContext, parse_definition};
use buildgraph_core::{
    Build, BuildContext, PipelineDefinition, PipelineName, ProcKind, ProcNode, RawDefinition,
    StepDefinition,
};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::applicability::{Applicability, StepDisposition};
use crate::graph::DependencyGraph;
use crate::item::{CompiledItem, CompiledPipeline, CompiledStep, RunsOn};
use crate::tree::{self, ChildLayout, StageLayout, TreeAssembler};
use crate::{CompileError, CompileResult, filter};

const CLONE_STEP_NAME: &str = "clone";

/// Compiles the definitions of one build against its context.
///
/// Holds no state between calls: compiling the same input twice yields the
/// same items, ids included.
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    ctx: &'a BuildContext,
    config: CompilerConfig,
}

/// A definition that parsed, with the facts later phases need.
struct Parsed {
    def: PipelineDefinition,
    unnamed: bool,
    vars: VariableContext,
    runs_on: Vec<RunsOn>,
    applicability: Applicability,
}

impl<'a> Compiler<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            config: CompilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile every definition into the surviving, dependency-resolved items.
    ///
    /// Items come back in input order. An empty result is a valid build with
    /// nothing to do.
    pub fn compile(&self, definitions: &[RawDefinition]) -> CompileResult<Vec<CompiledItem>> {
        let base = self.base_variables();

        let mut parsed = Vec::with_capacity(definitions.len());
        for raw in definitions {
            let vars = base.clone().with_pipeline(raw.name.as_str());
            let def = parse_definition(raw, &vars).map_err(|source| CompileError::Parse {
                name: raw.name.clone(),
                source,
            })?;
            let runs_on = parse_runs_on(&def)?;
            let applicability = Applicability::evaluate(&def, &self.ctx.curr);
            parsed.push(Parsed {
                def,
                unnamed: raw.unnamed,
                vars,
                runs_on,
                applicability,
            });
        }

        check_names(&parsed)?;

        let graph = DependencyGraph::new(
            parsed
                .iter()
                .map(|p| (&p.def.name, p.def.depends_on.as_slice())),
        )?;
        graph.detect_cycle()?;

        let empty: Vec<bool> = parsed
            .iter()
            .map(|p| {
                let empty = filter::is_empty(&p.def, &p.applicability);
                if empty {
                    debug!(pipeline = %p.def.name, "Pipeline has no steps to run");
                }
                empty
            })
            .collect();
        let elided = graph.elide(&empty);

        let mut assembler = TreeAssembler::new();
        let mut items = Vec::new();
        for (index, p) in parsed.iter().enumerate() {
            if elided[index] {
                if !empty[index] {
                    debug!(pipeline = %p.def.name, "Pipeline depends on an empty pipeline, eliding");
                }
                continue;
            }
            let depends_on = graph.resolve(index, &elided);
            items.push(self.assemble(&mut assembler, p, depends_on));
        }

        info!(
            definitions = definitions.len(),
            compiled = items.len(),
            elided = elided.iter().filter(|e| **e).count(),
            procs = assembler.issued(),
            "Compiled build graph"
        );

        Ok(items)
    }

    fn base_variables(&self) -> VariableContext {
        let mut vars =
            VariableContext::from_build_context(self.ctx).with_system_name(&self.config.system_name);
        if let Some(link) = &self.config.system_link {
            vars.set("CI_SYSTEM_LINK", link.as_str());
        }
        vars
    }

    fn assemble(
        &self,
        assembler: &mut TreeAssembler,
        parsed: &Parsed,
        depends_on: Vec<PipelineName>,
    ) -> CompiledItem {
        let Parsed {
            def,
            vars,
            runs_on,
            applicability,
            ..
        } = parsed;
        let skipped = !applicability.pipeline_applies;
        if skipped {
            debug!(pipeline = %def.name, "Pipeline conditions do not match, skipping");
        }

        let clone_step = (!def.skip_clone).then(|| self.clone_step(def));
        let steps: Vec<(&StepDefinition, ProcKind, bool)> = clone_step
            .iter()
            .map(|step| (step, ProcKind::Clone, false))
            .chain(
                def.steps
                    .iter()
                    .zip(&applicability.steps)
                    .filter(|(_, d)| **d != StepDisposition::Exclude)
                    .map(|(step, d)| (step, ProcKind::Step, *d == StepDisposition::Skip)),
            )
            .collect();

        let proc = assembler.assemble(StageLayout {
            name: def.name.to_string(),
            skipped,
            environ: def.environment.clone(),
            children: steps
                .iter()
                .map(|(step, kind, skip)| ChildLayout::new(step.name.clone(), *kind, *skip))
                .collect(),
        });

        let base_env = vars.environ();
        let compiled_steps = steps
            .iter()
            .zip(&proc.children)
            .map(|((step, kind, _), node)| compile_step(step, *kind, node, &base_env, def))
            .collect();

        let platform = def
            .platform
            .clone()
            .unwrap_or_else(|| self.config.default_platform.clone());
        let mut labels = def.labels.clone();
        labels
            .entry("platform".to_string())
            .or_insert_with(|| platform.clone());

        CompiledItem {
            name: def.name.clone(),
            depends_on,
            runs_on: runs_on.clone(),
            platform,
            labels,
            proc,
            config: CompiledPipeline {
                steps: compiled_steps,
                secrets: self.ctx.secrets.clone(),
                registries: self.ctx.registries.clone(),
                netrc: self.ctx.netrc.clone(),
            },
        }
    }

    /// The implicit clone step, with any `clone` block applied on top.
    fn clone_step(&self, def: &PipelineDefinition) -> StepDefinition {
        let mut step = def.clone.clone().unwrap_or_default();
        step.name = CLONE_STEP_NAME.to_string();
        if step.image.is_empty() {
            step.image = self.config.clone_image.clone();
        }
        step
    }
}

fn compile_step(
    step: &StepDefinition,
    kind: ProcKind,
    node: &ProcNode,
    base_env: &BTreeMap<String, String>,
    def: &PipelineDefinition,
) -> CompiledStep {
    let mut environment = base_env.clone();
    environment.extend(def.environment.clone());
    environment.extend(step.environment.clone());

    CompiledStep {
        proc_id: node.id,
        name: step.name.clone(),
        kind,
        image: step.image.clone(),
        commands: step.commands.clone(),
        environment,
        settings: step.settings.clone(),
        secrets: step.secrets.clone(),
        status: step.when.status.clone(),
        detach: step.detach,
        privileged: step.privileged,
        pull: step.pull,
    }
}

fn parse_runs_on(def: &PipelineDefinition) -> CompileResult<Vec<RunsOn>> {
    def.runs_on
        .iter()
        .map(|value| {
            value
                .parse::<RunsOn>()
                .map_err(|message| CompileError::configuration(&def.name, message))
        })
        .collect()
}

/// Explicit names are unique; only unnamed definitions share the default name.
fn check_names(parsed: &[Parsed]) -> CompileResult<()> {
    let mut seen = HashSet::new();
    for p in parsed {
        let name = &p.def.name;
        if name.as_str().trim().is_empty() {
            return Err(CompileError::configuration(name, "pipeline name is empty"));
        }
        if !p.unnamed && !seen.insert(name.as_str()) {
            return Err(CompileError::configuration(
                name,
                "pipeline name is used by more than one definition",
            ));
        }
    }
    Ok(())
}

/// Compile with the default configuration.
pub fn compile(
    ctx: &BuildContext,
    definitions: &[RawDefinition],
) -> CompileResult<Vec<CompiledItem>> {
    Compiler::new(ctx).compile(definitions)
}

/// Replace the build's process list with the flattened trees of `items`.
pub fn attach(mut build: Build, items: &[CompiledItem]) -> Build {
    build.procs = tree::flatten(items.iter().map(|item| &item.proc));
    build
}
