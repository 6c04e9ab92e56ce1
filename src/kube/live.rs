//! API server backed object store
//!
//! All types go through `Api<DynamicObject>` built from the resolved mapping,
//! so custom resources need no generated types.

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Event;
use kube::api::{DynamicObject, ListParams, WatchEvent, WatchParams};
use kube::{Api, Client};
use serde_json::Value;
use tokio::sync::OnceCell;

use super::store::{ListQuery, ObjectStore};
use crate::error::StoreError;
use crate::models::{ApiResourceMapping, ObjectCollection, ResourceObject};
use crate::resolver::TypeCatalog;
use crate::watcher::{ChangeFeed, ChangeKind, ChangeNotification};

pub struct KubeStore {
    client: Client,
    catalog: OnceCell<TypeCatalog>,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            catalog: OnceCell::new(),
        }
    }

    fn api(&self, mapping: &ApiResourceMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        let api_resource = mapping.to_api_resource();
        match namespace {
            Some(ns) if mapping.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &api_resource)
            }
            _ => Api::all_with(self.client.clone(), &api_resource),
        }
    }
}

fn to_object(
    obj: DynamicObject,
    mapping: &ApiResourceMapping,
) -> Result<ResourceObject, StoreError> {
    let value = serde_json::to_value(&obj)?;
    Ok(ResourceObject::from_value(value)?.with_type_meta(&mapping.api_version(), &mapping.kind))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn catalog(&self) -> Result<TypeCatalog, StoreError> {
        let catalog = self
            .catalog
            .get_or_init(|| async {
                match TypeCatalog::discover(&self.client).await {
                    Ok(catalog) => catalog,
                    Err(e) => {
                        tracing::warn!("API discovery failed, using built-in types only: {}", e);
                        TypeCatalog::builtin()
                    }
                }
            })
            .await;
        Ok(catalog.clone())
    }

    async fn list(
        &self,
        mapping: &ApiResourceMapping,
        query: &ListQuery,
    ) -> Result<ObjectCollection, StoreError> {
        let api = self.api(mapping, query.namespace.as_deref());
        let mut params = ListParams::default();
        if let Some(labels) = &query.label_selector {
            params = params.labels(labels);
        }
        if let Some(fields) = &query.field_selector {
            params = params.fields(fields);
        }

        let list = api.list(&params).await?;
        let resource_version = list.metadata.resource_version.clone();
        let items = list
            .items
            .into_iter()
            .map(|obj| to_object(obj, mapping))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Listed {} {}", items.len(), mapping);
        Ok(ObjectCollection::new(items).with_resource_version(resource_version))
    }

    async fn get(
        &self,
        mapping: &ApiResourceMapping,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, StoreError> {
        let api = if mapping.namespaced && namespace.is_empty() {
            Api::default_namespaced_with(self.client.clone(), &mapping.to_api_resource())
        } else {
            self.api(mapping, Some(namespace))
        };

        match api.get_opt(name).await? {
            Some(obj) => to_object(obj, mapping),
            None => Err(StoreError::NotFound {
                resource: mapping.resource.clone(),
                name: name.to_string(),
            }),
        }
    }

    async fn events(&self, object: &ResourceObject) -> Result<Vec<ResourceObject>, StoreError> {
        let api: Api<Event> = match object.namespace() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let selector = match object.uid() {
            Some(uid) => format!("involvedObject.uid={}", uid),
            None => format!(
                "involvedObject.kind={},involvedObject.name={}",
                object.kind(),
                object.name()
            ),
        };

        let list = api.list(&ListParams::default().fields(&selector)).await?;
        list.items
            .into_iter()
            .map(|event| {
                let value = serde_json::to_value(&event)?;
                Ok(ResourceObject::from_value(value)?.with_type_meta("v1", "Event"))
            })
            .collect()
    }

    async fn node_stats_summary(&self, node: &str) -> Result<Value, StoreError> {
        let request = http::Request::get(format!("/api/v1/nodes/{}/proxy/stats/summary", node))
            .body(Vec::new())
            .map_err(|e| StoreError::Unavailable(format!("building stats request: {}", e)))?;
        let text = self.client.request_text(request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    fn watch(
        &self,
        mapping: &ApiResourceMapping,
        query: &ListQuery,
        resource_version: &str,
        feed: &mut ChangeFeed,
    ) -> Result<(), StoreError> {
        let tx = feed
            .sender()
            .ok_or_else(|| StoreError::Watch("change feed is already sealed".to_string()))?;

        let api = self.api(mapping, query.namespace.as_deref());
        let mut params = WatchParams::default();
        if let Some(labels) = &query.label_selector {
            params = params.labels(labels);
        }
        if let Some(fields) = &query.field_selector {
            params = params.fields(fields);
        }
        let mapping = mapping.clone();
        let mut version = resource_version.to_string();

        let handle = tokio::spawn(async move {
            // The server closes watches after a timeout; resume from the last
            // seen version until the receiver goes away or an error occurs.
            loop {
                let since = version.clone();
                let stream = match api.watch(&params, &since).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = tx.send(Err(StoreError::Kube(e)));
                        return;
                    }
                };
                let mut stream = Box::pin(stream);

                while let Some(event) = stream.next().await {
                    let (kind, obj) = match event {
                        Ok(WatchEvent::Added(obj)) => (ChangeKind::Added, obj),
                        Ok(WatchEvent::Modified(obj)) => (ChangeKind::Modified, obj),
                        Ok(WatchEvent::Deleted(obj)) => (ChangeKind::Deleted, obj),
                        Ok(WatchEvent::Bookmark(bookmark)) => {
                            version = bookmark.metadata.resource_version;
                            continue;
                        }
                        Ok(WatchEvent::Error(status)) => {
                            let _ = tx.send(Err(StoreError::Watch(format!("{:?}", status))));
                            return;
                        }
                        Err(e) => {
                            let _ = tx.send(Err(StoreError::Kube(e)));
                            return;
                        }
                    };

                    if let Some(rv) = obj.metadata.resource_version.clone() {
                        version = rv;
                    }
                    let change = to_object(obj, &mapping)
                        .map(|object| ChangeNotification { kind, object });
                    if tx.send(change).is_err() {
                        return;
                    }
                }

                if tx.is_closed() {
                    return;
                }
                tracing::debug!("Watch of {} expired, resuming at {}", mapping, version);
            }
        });

        feed.attach(handle);
        Ok(())
    }

    fn is_local(&self) -> bool {
        false
    }
}
