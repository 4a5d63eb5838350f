//! Build scheduler.
//!
//! Walks the image hierarchy from the root key. Each node is one task:
//!
//! 1. rewrite its build instruction file,
//! 2. run the external build,
//! 3. on success, spawn the push (if enabled) and one task per child, then
//!    wait for all of them.
//!
//! A failed build is logged and prunes that node's subtree; siblings carry
//! on. Children never start before their parent's build has returned, and
//! every task is joined before [`BuildScheduler::run`] returns.
//!
//! A rewrite failure is fatal. Builds already running finish, but no new
//! rewrite, build, push or child task starts afterwards.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use container_factory_core::error::{FactoryError, Result};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::discovery::BuildInstruction;
use crate::hierarchy::{Hierarchy, ROOT_KEY};
use crate::publisher::RegistryPublisher;
use crate::rewrite::InstructionRewriter;
use crate::tool::{BuildRequest, ImageTool};

/// Settings for one scheduling pass.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Registry base path, e.g. `registry.example.com/team`
    pub registry_base_path: String,
    /// Tag applied to every image built in this pass
    pub tag: String,
    /// Bypass the build cache
    pub force_rebuild: bool,
    /// Push each successfully built image
    pub push: bool,
    /// Limit on simultaneous build subprocesses
    pub max_parallel_builds: Option<usize>,
    /// Working directory for build subprocesses
    pub working_dir: PathBuf,
    /// Directory receiving rewritten instruction files
    pub temp_dir: PathBuf,
}

/// Outcome of a scheduling pass, names sorted.
///
/// Images below a failed build appear in none of the lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub built: Vec<String>,
    pub failed: Vec<String>,
    pub push_failed: Vec<String>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.push_failed.is_empty()
    }

    fn sort(&mut self) {
        self.built.sort();
        self.failed.sort();
        self.push_failed.sort();
    }
}

/// Dependency-ordered concurrent builder.
pub struct BuildScheduler {
    context: Arc<SchedulerContext>,
}

struct SchedulerContext {
    hierarchy: Arc<Hierarchy>,
    tool: Arc<dyn ImageTool>,
    publisher: RegistryPublisher,
    rewriter: InstructionRewriter,
    options: BuildOptions,
    gate: Option<Semaphore>,
    report: Mutex<BuildReport>,
    aborted: AtomicBool,
}

impl BuildScheduler {
    pub fn new(hierarchy: Arc<Hierarchy>, tool: Arc<dyn ImageTool>, options: BuildOptions) -> Self {
        let rewriter = InstructionRewriter::new(
            options.temp_dir.clone(),
            options.registry_base_path.clone(),
            options.tag.clone(),
        );
        let gate = options
            .max_parallel_builds
            .map(|limit| Semaphore::new(limit.max(1)));

        Self {
            context: Arc::new(SchedulerContext {
                hierarchy,
                publisher: RegistryPublisher::new(Arc::clone(&tool)),
                tool,
                rewriter,
                options,
                gate,
                report: Mutex::new(BuildReport::default()),
                aborted: AtomicBool::new(false),
            }),
        }
    }

    /// Build the whole forest and wait for every build, push and descent.
    ///
    /// Build and push failures end up in the report. A rewrite failure is
    /// fatal: it is returned once all in-flight tasks have finished.
    pub async fn run(self) -> Result<BuildReport> {
        let mut tasks = JoinSet::new();
        spawn_children(&self.context, ROOT_KEY, &mut tasks);
        let outcome = join_all(tasks).await;

        let mut report = std::mem::take(&mut *self.context.report.lock());
        report.sort();
        outcome.map(|()| report)
    }
}

impl SchedulerContext {
    /// Stop starting new work after a fatal error.
    fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            tracing::warn!("Fatal error, no further builds or pushes will start");
        }
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Build the rewritten copy when there is one, the source otherwise.
    fn build_request(&self, instruction: &BuildInstruction) -> BuildRequest {
        let dockerfile = instruction
            .rewritten_path
            .clone()
            .unwrap_or_else(|| instruction.source_path.clone());
        BuildRequest {
            image: self.image_name(&instruction.name),
            tag: self.options.tag.clone(),
            dockerfile,
            no_cache: self.options.force_rebuild,
            working_dir: self.options.working_dir.clone(),
        }
    }

    fn image_name(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.options.registry_base_path.trim_end_matches('/'),
            name
        )
    }
}

fn spawn_children(
    context: &Arc<SchedulerContext>,
    parent: &str,
    tasks: &mut JoinSet<Result<()>>,
) {
    for child in context.hierarchy.children_of(parent) {
        tasks.spawn(build_node(Arc::clone(context), child.clone()));
    }
}

fn build_node(
    context: Arc<SchedulerContext>,
    instruction: BuildInstruction,
) -> BoxFuture<'static, Result<()>> {
    async move {
        if context.is_aborted() {
            return Ok(());
        }
        let instruction = match context.rewriter.rewrite(&instruction.source_path) {
            Ok(path) => BuildInstruction {
                rewritten_path: Some(path),
                ..instruction
            },
            Err(e) => {
                context.abort();
                return Err(e);
            }
        };

        let request = context.build_request(&instruction);
        let reference = request.reference();

        let built = {
            let _permit = match &context.gate {
                Some(gate) => Some(gate.acquire().await.map_err(|e| {
                    FactoryError::Other(format!("build gate closed: {}", e))
                })?),
                None => None,
            };
            if context.is_aborted() {
                return Ok(());
            }
            tracing::info!(
                image = %reference,
                dockerfile = %request.dockerfile.display(),
                "Building image"
            );
            context.tool.build(&request).await
        };

        if let Err(e) = built {
            tracing::error!(image = %reference, error = %e, "Image failed to build");
            context.report.lock().failed.push(instruction.name);
            return Ok(());
        }
        tracing::info!(image = %reference, "Image built");
        context.report.lock().built.push(instruction.name.clone());

        if context.is_aborted() {
            return Ok(());
        }

        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        if context.options.push {
            let push_context = Arc::clone(&context);
            let name = instruction.name.clone();
            tasks.spawn(async move {
                if push_context.is_aborted() {
                    return Ok(());
                }
                if let Err(e) = push_context.publisher.publish(&reference).await {
                    tracing::error!(image = %reference, error = %e, "Image failed to push");
                    push_context.report.lock().push_failed.push(name);
                }
                Ok(())
            });
        }
        spawn_children(&context, &instruction.name, &mut tasks);

        join_all(tasks).await
    }
    .boxed()
}

/// Wait for every task; keep the first fatal error.
async fn join_all(mut tasks: JoinSet<Result<()>>) -> Result<()> {
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|e| FactoryError::Other(format!("build task failed: {}", e)))
            .and_then(|result| result);
        if let Err(e) = outcome {
            tracing::error!(error = %e, "Build task aborted");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
