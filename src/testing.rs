//! Helpers shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::{
    BlockflowError, Result,
    blocks::{BlockRegistry, BlockType},
    config::EngineConfig,
    dispatcher,
    model::NodeModel,
    runtime::{
        ExecutionContext, Services,
        capabilities::{
            Classification, Classifier, ClassifyRequest, Clock, DeliveryReceipt, LocalClassifier, LocalResponder, Messenger, OutgoingMessage, RespondRequest, Responder,
        },
        session::MemorySessionStore,
    },
    utils,
    workflow::{
        actions::{ActionContext, ActionOutput, Handler, TriggerAction},
        node::Node,
    },
};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        message: OutgoingMessage,
    ) -> Result<DeliveryReceipt> {
        self.sent.lock().unwrap().push(message);
        Ok(DeliveryReceipt {
            message_id: utils::shortid(),
            status: "sent".to_string(),
        })
    }
}

pub struct PanickingMessenger;

#[async_trait]
impl Messenger for PanickingMessenger {
    async fn send(
        &self,
        _message: OutgoingMessage,
    ) -> Result<DeliveryReceipt> {
        panic!("messenger exploded")
    }
}

pub struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(
        &self,
        _request: ClassifyRequest,
    ) -> Result<Classification> {
        Err(BlockflowError::Action("upstream model unavailable".into()))
    }
}

/// Answers with a fixed text and keeps every request.
pub struct ScriptedResponder {
    reply: String,
    requests: Mutex<Vec<RespondRequest>>,
}

impl ScriptedResponder {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RespondRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn respond(
        &self,
        request: RespondRequest,
    ) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }
}

pub struct FailingResponder;

#[async_trait]
impl Responder for FailingResponder {
    async fn respond(
        &self,
        _request: RespondRequest,
    ) -> Result<String> {
        Err(BlockflowError::Action("upstream model unavailable".into()))
    }
}

pub fn services() -> Services {
    Services {
        classifier: Arc::new(LocalClassifier),
        responder: Arc::new(LocalResponder),
        messenger: Arc::new(RecordingMessenger::default()),
        clock: Arc::new(FixedClock(fixed_now())),
        sessions: Arc::new(MemorySessionStore::default()),
        http: reqwest::Client::builder().no_proxy().build().unwrap(),
        config: EngineConfig {
            honor_delays: false,
            ..Default::default()
        },
    }
}

pub fn node(
    id: i64,
    ty: &str,
    name: &str,
    config: Value,
) -> Node {
    let registry = BlockRegistry::standard().unwrap();
    Node::new(&NodeModel::new(id, ty, name).with_config(config), &registry).unwrap()
}

/// A run seeded by a whatsapp message trigger.
pub fn run_context(payload: Value) -> ExecutionContext {
    let trigger = node(1, "whatsapp_message", "Incoming", Value::Null);
    let mut run = ExecutionContext::new("run-test".into(), "wf-test");
    run.seed_trigger(&trigger, TriggerAction::seed_payload(BlockType::WhatsappMessage, payload, fixed_now()));
    run
}

/// Resolves the node config the way a run does and calls the handler.
pub async fn run_handler<H: Handler + ?Sized>(
    handler: &H,
    node: &Node,
    run: &ExecutionContext,
    services: &Services,
) -> Result<ActionOutput> {
    let config = dispatcher::resolve_config(node, run.vars());
    let ctx = ActionContext {
        node,
        run,
        services,
    };
    handler.handle(&ctx, config).await
}
