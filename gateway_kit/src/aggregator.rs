//! Aggregation of service fragments into OpenAPI documents.
//!
//! The aggregator is `Stale` until its first build and after every
//! [`SchemaAggregator::invalidate`]. A stale aggregator rebuilds both audience
//! documents in one pass on the next [`SchemaAggregator::get_schema`].
//! Snapshots are immutable and replaced wholesale, so a reader holding an
//! `Arc` from before an invalidation keeps a consistent document.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use utoipa::openapi::path::Operation;
use utoipa::openapi::OpenApi;

use crate::error::{Error, Result};
use crate::fragment::RouteKey;
use crate::merge::merge_service_fragment;
use crate::openapi_utils::{build_base_document, BaseTemplate};
use crate::registry::{ActionDescriptor, ServiceDescriptor, ServiceRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Bearer-credential holders: hides operations secured only by other schemes.
    Public,
    /// Everything.
    Privileged,
}

/// Both audience documents from one rebuild pass.
#[derive(Debug)]
pub struct SchemaSnapshot {
    pub generation: u64,
    pub public: Arc<OpenApi>,
    pub privileged: Arc<OpenApi>,
}

impl SchemaSnapshot {
    pub fn document(&self, audience: Audience) -> Arc<OpenApi> {
        match audience {
            Audience::Public => self.public.clone(),
            Audience::Privileged => self.privileged.clone(),
        }
    }
}

pub struct SchemaAggregator {
    registry: Arc<dyn ServiceRegistry>,
    template: BaseTemplate,
    output_dir: Option<PathBuf>,
    generation: AtomicU64,
    snapshot: ArcSwapOption<SchemaSnapshot>,
    rebuild_guard: Mutex<()>,
    rebuilds: AtomicU64,
}

impl SchemaAggregator {
    pub fn new(registry: Arc<dyn ServiceRegistry>, template: BaseTemplate) -> Self {
        Self {
            registry,
            template,
            output_dir: None,
            generation: AtomicU64::new(0),
            snapshot: ArcSwapOption::empty(),
            rebuild_guard: Mutex::new(()),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Writes `openapi.json` and `openapi-private.json` into `dir` after every
    /// rebuild. Diagnostic only.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Marks the cached documents stale. Idempotent.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::debug!("OpenAPI schema invalidated");
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh_snapshot().is_some()
    }

    /// Number of completed rebuild passes.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Acquire)
    }

    /// The last successful snapshot, fresh or not.
    pub fn snapshot(&self) -> Option<Arc<SchemaSnapshot>> {
        self.snapshot.load_full()
    }

    fn fresh_snapshot(&self) -> Option<Arc<SchemaSnapshot>> {
        let current = self.generation.load(Ordering::Acquire);
        self.snapshot
            .load_full()
            .filter(|snapshot| snapshot.generation == current)
    }

    /// Returns the document for `audience`, rebuilding first if stale.
    ///
    /// If the rebuild fails the previous snapshot is served; without one the
    /// error is returned.
    pub async fn get_schema(&self, audience: Audience) -> Result<Arc<OpenApi>> {
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot.document(audience));
        }

        let _guard = self.rebuild_guard.lock().await;
        // Another caller may have finished a rebuild while we waited.
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot.document(audience));
        }

        match self.rebuild_locked().await {
            Ok(snapshot) => Ok(snapshot.document(audience)),
            Err(err) => match self.snapshot.load_full() {
                Some(previous) => {
                    tracing::warn!(error = %err, "serving previous OpenAPI schema");
                    Ok(previous.document(audience))
                }
                None => Err(err),
            },
        }
    }

    /// Rebuilds unconditionally.
    pub async fn rebuild(&self) -> Result<Arc<SchemaSnapshot>> {
        let _guard = self.rebuild_guard.lock().await;
        self.rebuild_locked().await
    }

    async fn rebuild_locked(&self) -> Result<Arc<SchemaSnapshot>> {
        let generation = self.generation.load(Ordering::Acquire);
        tracing::info!("♻ Regenerate OpenAPI schema...");

        let services = self.registry.list_services(true).await.inspect_err(|err| {
            tracing::error!(error = %err, "listing services for OpenAPI schema failed");
        })?;
        let (public, privileged) = compile_documents(&self.template, &services).inspect_err(|err| {
            tracing::error!(error = %err, "OpenAPI schema compilation failed");
        })?;

        let snapshot = Arc::new(SchemaSnapshot {
            generation,
            public: Arc::new(public),
            privileged: Arc::new(privileged),
        });
        self.snapshot.store(Some(snapshot.clone()));
        let count = self.rebuilds.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, rebuilds = count, services = services.len(), "OpenAPI schema rebuilt");

        if let Some(dir) = &self.output_dir {
            write_schema_files(dir, &snapshot).await;
        }
        Ok(snapshot)
    }
}

async fn write_schema_files(dir: &Path, snapshot: &SchemaSnapshot) {
    let files = [
        ("openapi.json", &snapshot.public),
        ("openapi-private.json", &snapshot.privileged),
    ];
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!(error = %err, dir = %dir.display(), "cannot create OpenAPI output dir");
        return;
    }
    for (name, doc) in files {
        let path = dir.join(name);
        let result = match doc.to_pretty_json() {
            Ok(json) => tokio::fs::write(&path, json).await.map_err(Error::from),
            Err(err) => Err(Error::from(err)),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, path = %path.display(), "cannot write OpenAPI file");
        }
    }
}

/// Merges the base template with every service and action fragment.
///
/// Returns `(public, privileged)`. Iteration follows registry order, then
/// action order, then binding order.
pub fn compile_documents(
    template: &BaseTemplate,
    services: &[ServiceDescriptor],
) -> Result<(OpenApi, OpenApi)> {
    let mut public = build_base_document(template);
    let mut privileged = public.clone();

    for service in services {
        if let Some(fragment) = &service.settings.openapi {
            merge_service_fragment(&mut public, fragment);
            merge_service_fragment(&mut privileged, fragment);
        }

        for action in &service.actions {
            let Some(fragment) = &action.openapi else {
                continue;
            };
            for binding in fragment.bindings() {
                let (key, operation) = binding
                    .compile()
                    .map_err(|err| with_action_context(service, action, err))?;
                if binding.is_bearer_visible() {
                    place_operation(&mut public, &key, operation.clone());
                }
                place_operation(&mut privileged, &key, operation);
            }
        }
    }
    Ok((public, privileged))
}

fn place_operation(doc: &mut OpenApi, key: &RouteKey, operation: Operation) {
    let item = doc.paths.paths.entry(key.path.clone()).or_default();
    *key.method.slot(item) = Some(operation);
}

fn with_action_context(service: &ServiceDescriptor, action: &ActionDescriptor, err: Error) -> Error {
    match err {
        Error::SchemaCompilation(msg) => {
            Error::SchemaCompilation(format!("{}.{}: {msg}", service.name, action.name))
        }
        other => other,
    }
}
