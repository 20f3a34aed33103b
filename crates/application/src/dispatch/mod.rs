//! Setup and teardown task dispatch
//!
//! [`TaskDispatcher::execute`] runs one [`Task`] against a context.
//! [`TaskDispatcher::setup`] runs a whole phase concurrently: every task
//! reads the same [`ContextSnapshot`] and yields a [`TaskEffect`], applied
//! to the live context as tasks complete. The first failure aborts the
//! phase.
//!
//! Two tasks writing the same `contextKey` race; the last to complete wins
//! and a warning is logged.

mod http;
mod require;

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tapestry_domain::Task;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::{Context, ContextSnapshot};
use crate::mock::{InstalledStub, MockError, MockManager};
use crate::ports::{LoadError, RequestSigner, ResourceLoader, SigningError, Transport, TransportError};
use crate::template::TemplateError;

/// Errors raised by a setup or teardown task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task URL could not be rendered.
    #[error("cannot render URL of task {context_key}: {source}")]
    Template {
        /// Context key of the task.
        context_key: String,
        /// Renderer error.
        source: TemplateError,
    },

    /// The request could not be signed.
    #[error("cannot sign request of task {context_key}: {source}")]
    Signing {
        /// Context key of the task.
        context_key: String,
        /// Signer error.
        source: SigningError,
    },

    /// No response was received.
    #[error("request of task {context_key} failed: {source}")]
    Transport {
        /// Context key of the task.
        context_key: String,
        /// Transport error.
        source: TransportError,
    },

    /// The server answered with a non-2xx status.
    #[error("request of task {context_key} returned status {status}: {body}")]
    Status {
        /// Context key of the task.
        context_key: String,
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body is not JSON.
    #[error("response of task {context_key} is not JSON: {message}")]
    InvalidResponse {
        /// Context key of the task.
        context_key: String,
        /// Parser message.
        message: String,
    },

    /// A resource or payload could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Stubs could not be installed.
    #[error(transparent)]
    Mock(#[from] MockError),
}

/// What a completed task changes in the context.
#[derive(Debug)]
pub enum TaskEffect {
    /// Store a value under a context key.
    Store {
        /// Context key.
        key: String,
        /// Value to store.
        value: Value,
    },
    /// Record installed stubs.
    Stubbed(InstalledStub),
    /// Nothing to record.
    Unchanged,
}

/// Executes tasks against a context.
#[derive(Clone)]
pub struct TaskDispatcher {
    transport: Arc<dyn Transport>,
    signer: Arc<dyn RequestSigner>,
    loader: Arc<dyn ResourceLoader>,
    mocks: MockManager,
}

impl TaskDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn RequestSigner>,
        loader: Arc<dyn ResourceLoader>,
        mocks: MockManager,
    ) -> Self {
        Self {
            transport,
            signer,
            loader,
            mocks,
        }
    }

    /// Resource loader shared with the rest of the engine.
    #[must_use]
    pub fn loader(&self) -> Arc<dyn ResourceLoader> {
        Arc::clone(&self.loader)
    }

    /// Runs one task and applies its effect.
    ///
    /// # Errors
    ///
    /// Returns the task's failure; the context is left unchanged.
    pub async fn execute(&self, task: &Task, context: &mut Context) -> Result<(), TaskError> {
        let effect = self.effect_of(task, &context.snapshot()).await?;
        apply(context, effect, &mut HashSet::new());
        Ok(())
    }

    /// Runs one task against a snapshot without touching the context.
    ///
    /// # Errors
    ///
    /// Returns the task's failure.
    pub async fn effect_of(
        &self,
        task: &Task,
        snapshot: &ContextSnapshot,
    ) -> Result<TaskEffect, TaskError> {
        debug!(
            task_type = task.task_type(),
            context_key = task.context_key().unwrap_or("-"),
            "executing task"
        );
        match task {
            Task::Http(http) => {
                http::execute(
                    self.transport.as_ref(),
                    self.signer.as_ref(),
                    self.loader.as_ref(),
                    http,
                    snapshot,
                )
                .await
            }
            Task::Require(require) => require::execute(self.loader.as_ref(), require).await,
            Task::Stub(stub) => {
                if snapshot.has_stub(&stub.class_name) {
                    debug!(class = %stub.class_name, "class already stubbed, skipping");
                    return Ok(TaskEffect::Unchanged);
                }
                Ok(self
                    .mocks
                    .install_stubs(stub, snapshot.owner())
                    .await?
                    .map_or(TaskEffect::Unchanged, TaskEffect::Stubbed))
            }
        }
    }

    /// Runs every task of a phase concurrently and waits for all of them.
    ///
    /// An empty task list leaves the context unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Effects of tasks completed before it stay
    /// applied; tasks still running are dropped.
    pub async fn setup(&self, context: &mut Context, tasks: &[Task]) -> Result<(), TaskError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let snapshot = context.snapshot();
        let mut pending: FuturesUnordered<_> = tasks
            .iter()
            .map(|task| self.effect_of(task, &snapshot))
            .collect();

        let mut written = HashSet::new();
        while let Some(result) = pending.next().await {
            apply(context, result?, &mut written);
        }
        info!(tasks = tasks.len(), "setup tasks completed");
        Ok(())
    }

    /// Teardown extension point: declared tasks are logged, not executed.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature leaves room for executable teardown
    /// task variants.
    #[allow(clippy::unused_async)]
    pub async fn teardown(&self, _context: &mut Context, tasks: &[Task]) -> Result<(), TaskError> {
        if !tasks.is_empty() {
            info!(tasks = tasks.len(), "teardown tasks declared; teardown is a pass-through");
        }
        Ok(())
    }
}

fn apply(context: &mut Context, effect: TaskEffect, written: &mut HashSet<String>) {
    match effect {
        TaskEffect::Store { key, value } => {
            if !written.insert(key.clone()) {
                warn!(context_key = %key, "context key written by more than one task; last completion wins");
            }
            context.insert(key, value);
        }
        TaskEffect::Stubbed(installed) => context.record_stub(installed),
        TaskEffect::Unchanged => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tapestry_domain::{
        HttpMethod, HttpTask, RequireTask, SeedContext, StubBehavior, StubCall, StubMethodSpec,
        StubTask, ValueSource,
    };

    use super::*;
    use crate::mock::{MethodTable, ServiceRegistry};
    use crate::ports::{OutboundRequest, TransportResponse};

    /// Loader backed by an in-memory map, with an optional per-path delay.
    #[derive(Default)]
    pub struct MapLoader {
        pub resources: BTreeMap<String, Value>,
        pub delays: BTreeMap<String, Duration>,
    }

    impl MapLoader {
        pub fn with(mut self, path: &str, value: Value) -> Self {
            self.resources.insert(path.to_string(), value);
            self
        }

        pub fn delayed(mut self, path: &str, delay: Duration) -> Self {
            self.delays.insert(path.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl ResourceLoader for MapLoader {
        async fn load(&self, path: &str) -> Result<Value, LoadError> {
            if let Some(delay) = self.delays.get(path) {
                tokio::time::sleep(*delay).await;
            }
            self.resources
                .get(path)
                .cloned()
                .ok_or_else(|| LoadError::NotFound(path.into()))
        }
    }

    /// Transport recording requests and answering from a fixed response.
    pub struct FakeTransport {
        pub response: TransportResponse,
        pub requests: Mutex<Vec<OutboundRequest>>,
    }

    impl FakeTransport {
        pub fn answering(status: u16, body: &str) -> Self {
            Self {
                response: TransportResponse::new(status, body),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<OutboundRequest> {
            self.requests.lock().expect("Lock poisoned").clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
            self.requests.lock().expect("Lock poisoned").push(request);
            Ok(self.response.clone())
        }
    }

    /// Signer adding a header carrying the configured region.
    pub struct HeaderSigner;

    impl RequestSigner for HeaderSigner {
        fn sign(&self, request: &mut OutboundRequest, config: &Value) -> Result<(), SigningError> {
            let region = config
                .get("region")
                .and_then(Value::as_str)
                .ok_or_else(|| SigningError::MissingCredential("region".to_string()))?;
            request
                .headers
                .insert("x-signed-for".to_string(), region.to_string());
            Ok(())
        }
    }

    pub fn dispatcher_with(
        transport: Arc<dyn Transport>,
        loader: MapLoader,
        registry: ServiceRegistry,
    ) -> TaskDispatcher {
        let loader: Arc<dyn ResourceLoader> = Arc::new(loader);
        TaskDispatcher::new(
            transport,
            Arc::new(HeaderSigner),
            Arc::clone(&loader),
            MockManager::new(registry, loader),
        )
    }

    fn require(path: &str, key: &str) -> Task {
        Task::Require(RequireTask {
            require_path: path.to_string(),
            context_key: key.to_string(),
        })
    }

    #[tokio::test]
    async fn test_require_populates_context_key() {
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default().with("./fixtures/data.json", json!({"id": 7})),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());

        dispatcher
            .setup(&mut context, &[require("./fixtures/data.json", "seed")])
            .await
            .unwrap();
        assert_eq!(context.get("seed"), Some(&json!({"id": 7})));
    }

    #[tokio::test]
    async fn test_empty_phase_is_a_no_op() {
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default(),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());
        dispatcher.setup(&mut context, &[]).await.unwrap();
        assert_eq!(context.values().len(), 1);
    }

    #[tokio::test]
    async fn test_tasks_run_concurrently() {
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default()
                .with("a", json!(1))
                .with("b", json!(2))
                .delayed("a", Duration::from_millis(200))
                .delayed("b", Duration::from_millis(200)),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());

        let started = std::time::Instant::now();
        dispatcher
            .setup(&mut context, &[require("a", "a"), require("b", "b")])
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(380));
        assert_eq!(context.get("a"), Some(&json!(1)));
        assert_eq!(context.get("b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_any_failure_fails_the_phase() {
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default().with("a", json!(1)),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());
        let err = dispatcher
            .setup(&mut context, &[require("a", "a"), require("missing", "b")])
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Load(LoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_http_task_renders_url_and_stores_json() {
        let transport = Arc::new(FakeTransport::answering(200, r#"{"token":"abc"}"#));
        let dispatcher = dispatcher_with(
            Arc::clone(&transport) as Arc<dyn Transport>,
            MapLoader::default().with("./payload.json", json!({"user": "ada"})),
            ServiceRegistry::new(),
        );
        let seed = SeedContext::default()
            .with_value("host", json!("api.test"))
            .with_value("region", json!("eu-west-1"));
        let mut context = Context::from_seed(&seed);

        let task = Task::Http(HttpTask {
            url: "https://${config.host}/login".to_string(),
            headers: BTreeMap::from([("x-trace".to_string(), "1".to_string())]),
            http_method: HttpMethod::Post,
            body: Some("./payload.json".to_string()),
            auth: Some(tapestry_domain::AuthKind::AwsIam),
            context_key: "session".to_string(),
        });
        dispatcher.execute(&task, &mut context).await.unwrap();

        assert_eq!(context.get("session"), Some(&json!({"token": "abc"})));
        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://api.test/login");
        assert_eq!(sent.body, Some(json!({"user": "ada"})));
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.header("x-signed-for"), Some("eu-west-1"));
        assert_eq!(sent.header("x-trace"), Some("1"));
    }

    #[tokio::test]
    async fn test_http_get_sends_no_body() {
        let transport = Arc::new(FakeTransport::answering(200, ""));
        let dispatcher = dispatcher_with(
            Arc::clone(&transport) as Arc<dyn Transport>,
            MapLoader::default(),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());
        let task = Task::Http(HttpTask {
            url: "https://example.test".to_string(),
            headers: BTreeMap::new(),
            http_method: HttpMethod::Get,
            body: Some("./ignored.json".to_string()),
            auth: None,
            context_key: "page".to_string(),
        });
        dispatcher.execute(&task, &mut context).await.unwrap();

        assert_eq!(context.get("page"), Some(&Value::Null));
        assert_eq!(transport.requests()[0].body, None);
    }

    #[tokio::test]
    async fn test_http_errors() {
        let failing = dispatcher_with(
            Arc::new(FakeTransport::answering(503, "down")),
            MapLoader::default(),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());
        let task = |url: &str| {
            Task::Http(HttpTask {
                url: url.to_string(),
                headers: BTreeMap::new(),
                http_method: HttpMethod::Get,
                body: None,
                auth: None,
                context_key: "k".to_string(),
            })
        };

        let status = failing.execute(&task("https://x.test"), &mut context).await.unwrap_err();
        assert!(matches!(status, TaskError::Status { status: 503, .. }));

        let template = failing
            .execute(&task("https://${config.missing}/"), &mut context)
            .await
            .unwrap_err();
        assert!(matches!(
            template,
            TaskError::Template { source: TemplateError::UndefinedField(_), .. }
        ));
        assert!(context.get("k").is_none());
    }

    #[tokio::test]
    async fn test_stub_task_records_mocks_and_stubs() {
        let registry = ServiceRegistry::new();
        registry.register("./svc", "Mailer", MethodTable::new());
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default(),
            registry.clone(),
        );
        let mut context = Context::from_seed(&SeedContext::unit());
        let stub = Task::Stub(StubTask {
            require_path: "./svc".to_string(),
            class_name: "Mailer".to_string(),
            methods: vec![StubMethodSpec {
                name: "send".to_string(),
                calls: vec![StubCall {
                    source: ValueSource::inline(json!(true)),
                    spread: false,
                    stub_method: StubBehavior::Resolves,
                }],
            }],
        });

        dispatcher
            .setup(&mut context, &[stub.clone(), stub])
            .await
            .unwrap();
        assert!(context.has_stub("Mailer"));
        assert!(context.fake("Mailer", "send").is_some());
        assert!(registry.is_stubbed("svc", "Mailer"));

        context.release_mocks();
        assert!(!registry.is_stubbed("svc", "Mailer"));
    }

    #[tokio::test]
    async fn test_colliding_keys_keep_one_value() {
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default().with("a", json!(1)).with("b", json!(2)),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());
        dispatcher
            .setup(&mut context, &[require("a", "same"), require("b", "same")])
            .await
            .unwrap();
        let stored = context.get("same").cloned().unwrap();
        assert!(stored == json!(1) || stored == json!(2));
    }

    #[tokio::test]
    async fn test_teardown_is_pass_through() {
        let dispatcher = dispatcher_with(
            Arc::new(FakeTransport::answering(200, "{}")),
            MapLoader::default(),
            ServiceRegistry::new(),
        );
        let mut context = Context::from_seed(&SeedContext::default());
        dispatcher
            .teardown(&mut context, &[require("missing", "x")])
            .await
            .unwrap();
        assert!(context.get("x").is_none());
    }
}
