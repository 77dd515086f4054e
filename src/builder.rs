use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    BlockflowError, Config, Engine, Result, StoreType,
    blocks::BlockRegistry,
    runtime::{
        Services,
        capabilities::{Classifier, Clock, LocalClassifier, LocalResponder, LogMessenger, Messenger, Responder, SystemClock},
        session::{MemorySessionStore, SessionStore},
    },
    store::{ExecutionLogStore, MemStore, PostgresStore, Store, WorkflowStore},
    workflow::actions::{Handler, HandlerTable},
};

/// Assembles an [`Engine`] from a config and the host's services.
///
/// Anything not set falls back to a local default: the keyword classifier,
/// canned replies per intent, a messenger that only logs, the system clock
/// and an in-memory session store sized by the config.
pub struct EngineBuilder {
    config: Config,
    registry: Option<BlockRegistry>,
    handlers: HandlerTable,
    workflows: Option<Arc<dyn WorkflowStore>>,
    logs: Option<Arc<dyn ExecutionLogStore>>,
    classifier: Arc<dyn Classifier>,
    responder: Arc<dyn Responder>,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            registry: None,
            handlers: HandlerTable::standard(),
            workflows: None,
            logs: None,
            classifier: Arc::new(LocalClassifier),
            responder: Arc::new(LocalResponder),
            messenger: Arc::new(LogMessenger),
            clock: Arc::new(SystemClock),
            sessions: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Replaces the standard block registry.
    pub fn registry(
        mut self,
        registry: BlockRegistry,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the handler of one block type.
    pub fn handler(
        mut self,
        handler: Arc<dyn Handler>,
    ) -> Self {
        self.handlers.register(handler);
        self
    }

    /// Uses `store` for both automations and execution logs.
    pub fn store<S: Store + 'static>(
        mut self,
        store: Arc<S>,
    ) -> Self {
        self.workflows = Some(store.clone());
        self.logs = Some(store);
        self
    }

    pub fn classifier(
        mut self,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn responder(
        mut self,
        responder: Arc<dyn Responder>,
    ) -> Self {
        self.responder = responder;
        self
    }

    pub fn messenger(
        mut self,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        self.messenger = messenger;
        self
    }

    pub fn clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = clock;
        self
    }

    pub fn sessions(
        mut self,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Builds the engine.
    ///
    /// Without an explicit store the backend comes from `[store]`; a postgres
    /// pool is created lazily and must be built inside a tokio runtime.
    pub fn build(self) -> Result<Engine> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => BlockRegistry::standard()?,
        };
        self.handlers.ensure_complete(&registry)?;

        let (workflows, logs): (Arc<dyn WorkflowStore>, Arc<dyn ExecutionLogStore>) = match (self.workflows, self.logs) {
            (Some(workflows), Some(logs)) => (workflows, logs),
            _ => match self.config.store.store_type {
                StoreType::Mem => {
                    let mem = Arc::new(MemStore::new());
                    (mem.clone(), mem)
                }
                StoreType::Postgres => {
                    let postgres = self.config.store.postgres.as_ref().ok_or_else(|| BlockflowError::Config("store_type is postgres but [store.postgres] is missing".into()))?;
                    let store = Arc::new(PostgresStore::connect_lazy(&postgres.database_url)?);
                    (store.clone(), store)
                }
            },
        };

        let http = reqwest::Client::builder().timeout(Duration::from_millis(self.config.engine.http_timeout_ms)).build()?;
        let session = &self.config.session;
        let sessions = self.sessions.unwrap_or_else(|| Arc::new(MemorySessionStore::new(session.capacity, session.history_limit)));

        let services = Services {
            classifier: self.classifier,
            responder: self.responder,
            messenger: self.messenger,
            clock: self.clock,
            sessions,
            http,
            config: self.config.engine.clone(),
        };
        debug!(blocks = registry.len(), store = ?self.config.store.store_type, "engine built");

        Ok(Engine::new(Arc::new(registry), Arc::new(self.handlers), services, workflows, logs))
    }
}
