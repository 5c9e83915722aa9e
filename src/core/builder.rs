use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::agent::Agent;
use super::collaborators::{AgentInfo, FileBrowser, NoFiles, StaticInfo};
use super::config::Config;
use crate::containers::{Backend, ContainerManager, UnavailableBackend};
use crate::events::Bus;
use crate::logging::{LoggingLevels, NoopVerbosity, VerbositySink};
use crate::metrics::{MetricsCollector, MetricsSource};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::TaskStore;

/// Builder for an [`Agent`] with optional collaborators.
///
/// Anything not supplied falls back to a built-in default:
/// [`UnavailableBackend`], [`NoFiles`], [`StaticInfo`], [`NoopVerbosity`] and
/// an empty [`TaskStore`].
pub struct AgentBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    backend: Option<Arc<dyn Backend>>,
    sources: Vec<Arc<dyn MetricsSource>>,
    files: Option<Arc<dyn FileBrowser>>,
    info: Option<Arc<dyn AgentInfo>>,
    verbosity: Option<Arc<dyn VerbositySink>>,
    tasks: Option<Arc<TaskStore>>,
}

impl AgentBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            backend: None,
            sources: Vec::new(),
            files: None,
            info: None,
            verbosity: None,
            tasks: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events (container lifecycle, level changes,
    /// failed calls) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the execution backend driving nested containers.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Appends a metrics source after the built-in ones.
    pub fn with_metrics_source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Sets the file browser behind LIST_FILES and READ_FILE.
    pub fn with_files(mut self, files: Arc<dyn FileBrowser>) -> Self {
        self.files = Some(files);
        self
    }

    /// Sets the health/flags/version accessor.
    pub fn with_info(mut self, info: Arc<dyn AgentInfo>) -> Self {
        self.info = Some(info);
        self
    }

    /// Sets the sink SET_LOGGING_LEVEL drives.
    pub fn with_verbosity(mut self, sink: Arc<dyn VerbositySink>) -> Self {
        self.verbosity = Some(sink);
        self
    }

    /// Shares a task store owned by the execution core.
    pub fn with_task_store(mut self, tasks: Arc<TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Builds the agent and starts its subscriber listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Agent> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(UnavailableBackend));
        let containers = ContainerManager::new(backend, bus.clone(), runtime_token.clone());
        let tasks = self.tasks.unwrap_or_else(|| Arc::new(TaskStore::new()));

        let mut sources: Vec<Arc<dyn MetricsSource>> = Vec::with_capacity(2 + self.sources.len());
        sources.push(containers.clone());
        sources.push(tasks.clone());
        sources.extend(self.sources);
        let metrics = MetricsCollector::new(sources, bus.clone());

        let logging = LoggingLevels::new(
            self.cfg.logging_level,
            self.cfg.max_logging_level,
            self.verbosity.unwrap_or_else(|| Arc::new(NoopVerbosity)),
            bus.clone(),
            runtime_token.clone(),
        );
        let info = self
            .info
            .unwrap_or_else(|| Arc::new(StaticInfo::from_config(&self.cfg)));
        let files = self.files.unwrap_or_else(|| Arc::new(NoFiles));

        let listener = Agent::spawn_listener(&bus, subs, runtime_token.clone());

        Arc::new(Agent {
            cfg: self.cfg,
            bus,
            containers,
            tasks,
            logging,
            metrics,
            info,
            files,
            runtime_token,
            listener: Mutex::new(Some(listener)),
        })
    }
}
