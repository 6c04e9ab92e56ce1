//! Session loop
//!
//! `Initializing -> SnapshotRendering -> (Idle | Watching) -> Terminated`.
//!
//! The snapshot renders every queried object in creation-time order. With
//! `--watch` the session then follows one merged change feed, rendering each
//! changed object shallowly as it arrives, until cancelled or the feed fails.

mod query;

pub use query::QueryTarget;

use std::collections::HashMap;
use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::config::RenderOptions;
use crate::error::{ErrorAggregate, StatusError};
use crate::kube::ListQuery;
use crate::models::{ApiResourceMapping, ObjectCollection, ResourceObject};
use crate::render::{Dispatcher, TemplateEngine};
use crate::repository::ObjectRepository;
use crate::resolver::reference::parse_group_version;
use crate::watcher::{ChangeFeed, ChangeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    SnapshotRendering,
    Idle,
    Watching,
    Terminated,
}

/// Where a watch resumes after the snapshot
#[derive(Debug, Clone)]
struct WatchTarget {
    mapping: ApiResourceMapping,
    query: ListQuery,
    resource_version: String,
}

#[derive(Default)]
struct Snapshot {
    objects: ObjectCollection,
    watches: Vec<WatchTarget>,
}

pub struct Session {
    repo: ObjectRepository,
    dispatcher: Dispatcher,
    options: RenderOptions,
    namespace: String,
    state: SessionState,
}

impl Session {
    /// `default_namespace` applies when `--namespace` was not given
    pub fn new(
        repo: ObjectRepository,
        engine: TemplateEngine,
        options: RenderOptions,
        default_namespace: impl Into<String>,
    ) -> Self {
        let namespace = options
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.into());
        let dispatcher = Dispatcher::new(
            engine,
            options.includes(),
            options.max_depth(),
            options.dedup_enabled(),
        );
        Self {
            repo,
            dispatcher,
            options,
            namespace,
            state: SessionState::Initializing,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Render the snapshot, then follow changes if watching
    ///
    /// Per-object failures are collected and returned together at the end.
    pub async fn run(
        &mut self,
        target: &QueryTarget,
        out: &mut (dyn Write + Send),
        cancel: CancellationToken,
    ) -> Result<(), ErrorAggregate> {
        let mut errors = ErrorAggregate::new();

        self.transition(SessionState::SnapshotRendering);
        let snapshot = self.snapshot(target, &mut errors).await;
        let found = snapshot.objects.len();
        tracing::debug!("Snapshot has {} objects", found);

        for object in snapshot.objects {
            if cancel.is_cancelled() {
                tracing::debug!("Interrupted during snapshot");
                break;
            }
            if let Err(e) = self.dispatcher.render(&self.repo, object, out).await {
                errors.push(e);
            }
        }

        if found == 0 && !self.options.watch && errors.is_empty() {
            errors.push(StatusError::NoResourcesFound {
                namespace: self.scope_namespace(),
            });
        }

        if self.options.watch && !cancel.is_cancelled() {
            self.transition(SessionState::Watching);
            self.watch(snapshot.watches, out, &cancel, &mut errors).await;
        } else {
            self.transition(SessionState::Idle);
        }

        self.transition(SessionState::Terminated);
        errors.into_result()
    }

    /// Namespace named in "no resources found", `None` without a namespace scope
    fn scope_namespace(&self) -> Option<String> {
        if self.options.all_namespaces || self.options.local {
            None
        } else {
            Some(self.namespace.clone())
        }
    }

    fn list_query(&self) -> ListQuery {
        let mut query = if self.options.all_namespaces {
            ListQuery::all_namespaces()
        } else {
            ListQuery::in_namespace(self.namespace.clone())
        };
        if let Some(selector) = &self.options.label_selector {
            query = query.labels(selector.clone());
        }
        if let Some(selector) = &self.options.field_selector {
            query = query.fields(selector.clone());
        }
        query
    }

    async fn snapshot(&self, target: &QueryTarget, errors: &mut ErrorAggregate) -> Snapshot {
        let mut snapshot = Snapshot::default();
        let mut resolved = HashMap::new();

        match target {
            QueryTarget::List { types } => {
                for reference in types {
                    let Some(mapping) = self.resolve_once(&mut resolved, reference, errors) else {
                        continue;
                    };
                    let query = self.list_query();
                    match self.repo.store().list(&mapping, &query).await {
                        Ok(collection) => {
                            snapshot.watches.push(WatchTarget {
                                resource_version: collection
                                    .resource_version()
                                    .unwrap_or_default()
                                    .to_string(),
                                mapping,
                                query,
                            });
                            snapshot.objects.merge(collection);
                        }
                        Err(e) => errors.push(StatusError::fetch(mapping.resource.clone(), e)),
                    }
                }
            }
            QueryTarget::Named { types, names } => {
                for reference in types {
                    let Some(mapping) = self.resolve_once(&mut resolved, reference, errors) else {
                        continue;
                    };
                    for name in names {
                        self.fetch_named(&mapping, &self.namespace, name, &mut snapshot, errors)
                            .await;
                    }
                }
            }
            QueryTarget::Pairs(pairs) => {
                for (reference, name) in pairs {
                    let Some(mapping) = self.resolve_once(&mut resolved, reference, errors) else {
                        continue;
                    };
                    self.fetch_named(&mapping, &self.namespace, name, &mut snapshot, errors)
                        .await;
                }
            }
            QueryTarget::Manifests(documents) if self.options.local => {
                snapshot.objects = ObjectCollection::new(documents.clone());
            }
            QueryTarget::Manifests(documents) => {
                for document in documents {
                    let Some(mapping) = self.resolve_document(document, errors) else {
                        continue;
                    };
                    let namespace = document.namespace().unwrap_or(&self.namespace);
                    self.fetch_named(&mapping, namespace, document.name(), &mut snapshot, errors)
                        .await;
                }
            }
        }

        snapshot
    }

    /// Resolve a reference, reporting each distinct failure once
    fn resolve_once(
        &self,
        resolved: &mut HashMap<String, Option<ApiResourceMapping>>,
        reference: &str,
        errors: &mut ErrorAggregate,
    ) -> Option<ApiResourceMapping> {
        resolved
            .entry(reference.to_string())
            .or_insert_with(|| match self.repo.resolve(reference) {
                Ok(mapping) => Some(mapping),
                Err(e) => {
                    errors.push(e);
                    None
                }
            })
            .clone()
    }

    /// Type of a manifest document from its `apiVersion` and `kind`
    fn resolve_document(
        &self,
        document: &ResourceObject,
        errors: &mut ErrorAggregate,
    ) -> Option<ApiResourceMapping> {
        let (group, version) = parse_group_version(document.api_version()).unzip();
        let found = self.repo.resolver().resolve_kind(
            document.kind(),
            group.as_deref(),
            version.as_deref(),
        );
        if found.is_none() {
            errors.push(StatusError::ReferenceResolution {
                resource: document.kind().to_lowercase(),
            });
        }
        found
    }

    async fn fetch_named(
        &self,
        mapping: &ApiResourceMapping,
        namespace: &str,
        name: &str,
        snapshot: &mut Snapshot,
        errors: &mut ErrorAggregate,
    ) {
        match self.repo.store().get(mapping, namespace, name).await {
            Ok(object) => {
                snapshot.watches.push(WatchTarget {
                    mapping: mapping.clone(),
                    query: ListQuery::in_namespace(namespace)
                        .fields(format!("metadata.name={}", name)),
                    resource_version: object.resource_version().unwrap_or_default().to_string(),
                });
                snapshot.objects.merge(ObjectCollection::new(vec![object]));
            }
            Err(e) => errors.push(StatusError::fetch(
                format!("{}/{}", mapping.resource, name),
                e,
            )),
        }
    }

    async fn watch(
        &mut self,
        targets: Vec<WatchTarget>,
        out: &mut (dyn Write + Send),
        cancel: &CancellationToken,
        errors: &mut ErrorAggregate,
    ) {
        self.dispatcher.enter_watch_mode();

        let mut feed = ChangeFeed::new();
        for target in &targets {
            tracing::debug!(
                "Watching {} from resource version {:?}",
                target.mapping,
                target.resource_version
            );
            if let Err(e) = self.repo.store().watch(
                &target.mapping,
                &target.query,
                &target.resource_version,
                &mut feed,
            ) {
                errors.push(StatusError::Watch(e));
                return;
            }
        }
        feed.seal();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Watch cancelled");
                    break;
                }
                change = feed.next() => match change {
                    Some(Ok(change)) => {
                        if change.kind == ChangeKind::Deleted {
                            tracing::debug!("{} deleted", change.object);
                        }
                        if let Err(e) = self.dispatcher.render(&self.repo, change.object, out).await {
                            errors.push(e);
                        }
                    }
                    Some(Err(e)) => {
                        errors.push(StatusError::Watch(e));
                        break;
                    }
                    None => {
                        tracing::debug!("Every watch source has finished");
                        break;
                    }
                },
            }
        }
        feed.stop();
    }
}
