//! Engine assembly.
//!
//! [`EngineBuilder`] wires the default adapters (reqwest transport, SigV4
//! signer, file system loader, embedded JSON schema, tokio harness) around
//! the application's modules and services. Any adapter can be replaced.

use std::path::PathBuf;
use std::sync::Arc;

use tapestry_application::dispatch::TaskDispatcher;
use tapestry_application::invoke::{
    CallbackStrategy, DirectStrategy, Handler, InvocationStrategy, ModuleRegistry,
};
use tapestry_application::lifecycle::TestLifecycle;
use tapestry_application::mock::{MockManager, ServiceRegistry};
use tapestry_application::ports::{
    RequestSigner, ResourceLoader, SchemaValidator, TestHarness, Transport, TransportError,
};
use tapestry_application::suite::{DocumentSource, SuiteBuilder, SuiteError, SuitePlan, SuiteReport};
use tapestry_domain::{EngineSettings, SeedContext};
use tapestry_infrastructure::{
    FsResourceLoader, JsonSchemaValidator, ReqwestTransport, SchemaError, SigV4Signer,
    TokioHarness,
};
use thiserror::Error;
use tracing::info;

/// Errors raised while assembling or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The suite could not be built; no case ran.
    #[error(transparent)]
    Suite(#[from] SuiteError),

    /// The HTTP transport could not be created.
    #[error("cannot create HTTP transport: {0}")]
    Transport(#[from] TransportError),

    /// The document schema could not be compiled.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The working directory could not be determined.
    #[error("cannot determine base directory: {0}")]
    BaseDir(String),

    /// The harness returned no report for the suite.
    #[error("harness produced no report")]
    NoReport,
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    settings: EngineSettings,
    modules: ModuleRegistry,
    services: ServiceRegistry,
    strategy: Option<Arc<dyn InvocationStrategy>>,
    transport: Option<Arc<dyn Transport>>,
    signer: Option<Arc<dyn RequestSigner>>,
    loader: Option<Arc<dyn ResourceLoader>>,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl EngineBuilder {
    /// Sets the engine settings.
    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the directory relative paths are resolved against.
    #[must_use]
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.settings.base_dir = Some(base_dir.into());
        self
    }

    /// Registers a module whose default export is `handler`.
    #[must_use]
    pub fn module(mut self, path: &str, handler: Handler) -> Self {
        self.modules.register_handler(path, handler);
        self
    }

    /// Registers a named export of a module.
    #[must_use]
    pub fn export(mut self, path: &str, key: &str, handler: Handler) -> Self {
        self.modules.register_export(path, key, handler);
        self
    }

    /// Uses `services` as the registry stubs are installed in.
    #[must_use]
    pub fn services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Invokes callback-style handlers.
    #[must_use]
    pub fn callback_style(self) -> Self {
        self.strategy(Arc::new(CallbackStrategy))
    }

    /// Sets the invocation strategy (direct by default).
    #[must_use]
    pub fn strategy(mut self, strategy: Arc<dyn InvocationStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Replaces the HTTP transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the request signer.
    #[must_use]
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Replaces the resource loader.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replaces the document validator.
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Builds the engine, creating default adapters where none were set.
    ///
    /// # Errors
    ///
    /// Returns an error if a default adapter cannot be created.
    pub fn build(self) -> EngineResult<Engine> {
        let loader: Arc<dyn ResourceLoader> = match self.loader {
            Some(loader) => loader,
            None => {
                let base_dir = match &self.settings.base_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir().map_err(|e| EngineError::BaseDir(e.to_string()))?,
                };
                Arc::new(FsResourceLoader::new(base_dir).with_cache(self.settings.cache_resources))
            }
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let validator: Arc<dyn SchemaValidator> = match self.validator {
            Some(validator) => validator,
            None => Arc::new(JsonSchemaValidator::document()?),
        };
        let signer = self.signer.unwrap_or_else(|| Arc::new(SigV4Signer::new()));
        let strategy = self.strategy.unwrap_or_else(|| Arc::new(DirectStrategy));

        let dispatcher = TaskDispatcher::new(
            transport,
            signer,
            Arc::clone(&loader),
            MockManager::new(self.services.clone(), Arc::clone(&loader)),
        );
        let suites = SuiteBuilder::new(
            validator,
            loader,
            Arc::new(self.modules),
            TestLifecycle::new(dispatcher, strategy),
        );

        Ok(Engine {
            settings: self.settings,
            services: self.services,
            suites,
        })
    }
}

/// A configured test engine.
#[derive(Clone)]
pub struct Engine {
    settings: EngineSettings,
    services: ServiceRegistry,
    suites: SuiteBuilder,
}

impl Engine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The service registry stubs are installed in.
    #[must_use]
    pub const fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// The engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Validates and plans a document without running it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing, invalid, or names an
    /// unknown module.
    pub async fn plan(
        &self,
        source: impl Into<DocumentSource>,
        seed: SeedContext,
    ) -> EngineResult<SuitePlan> {
        Ok(self.suites.build(source, seed).await?)
    }

    /// Validates a document and registers its suite with `harness`.
    ///
    /// Nothing is registered when validation fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing, invalid, or names an
    /// unknown module.
    pub async fn make_tests(
        &self,
        source: impl Into<DocumentSource>,
        seed: SeedContext,
        harness: &mut dyn TestHarness,
    ) -> EngineResult<()> {
        let plan = self.plan(source, seed).await?;
        info!(suite = %plan.name, cases = plan.cases.len(), "suite registered");
        harness.register(plan);
        Ok(())
    }

    /// Validates, plans and runs a document with a [`TokioHarness`] built
    /// from the engine settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the suite cannot be built. Case failures are
    /// reported in the [`SuiteReport`].
    pub async fn run_document(
        &self,
        source: impl Into<DocumentSource>,
        seed: SeedContext,
    ) -> EngineResult<SuiteReport> {
        let mut harness = TokioHarness::from_settings(&self.settings);
        self.make_tests(source, seed, &mut harness).await?;
        harness.run().await.pop().ok_or(EngineError::NoReport)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}
