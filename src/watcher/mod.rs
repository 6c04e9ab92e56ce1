//! Change notifications
//!
//! Each watched resource type runs in its own spawned task that forwards
//! notifications into one unbounded channel. The session pulls from the
//! receiving end, so notifications are seen in arrival order regardless of
//! which type produced them.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::models::ResourceObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One observed change to one object
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    pub object: ResourceObject,
}

pub type ChangeResult = Result<ChangeNotification, StoreError>;

/// Merged stream of change notifications from any number of watch tasks
///
/// Dropping the feed aborts every task feeding it.
pub struct ChangeFeed {
    tx: Option<mpsc::UnboundedSender<ChangeResult>>,
    rx: mpsc::UnboundedReceiver<ChangeResult>,
    handles: Vec<JoinHandle<()>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx,
            handles: Vec::new(),
        }
    }

    /// Sender for a new watch task; `None` once the feed is sealed
    pub fn sender(&self) -> Option<mpsc::UnboundedSender<ChangeResult>> {
        self.tx.clone()
    }

    /// Track a task so it is aborted with the feed
    pub fn attach(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Stop accepting new sources; the feed ends once every task has finished
    pub fn seal(&mut self) {
        self.tx = None;
    }

    pub fn source_count(&self) -> usize {
        self.handles.len()
    }

    /// Next notification, `None` when all sources are done
    pub async fn next(&mut self) -> Option<ChangeResult> {
        self.rx.recv().await
    }

    /// Abort all watch tasks
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(name: &str) -> ChangeResult {
        Ok(ChangeNotification {
            kind: ChangeKind::Modified,
            object: ResourceObject::from_value(json!({"kind": "Pod", "metadata": {"name": name}}))
                .unwrap(),
        })
    }

    #[tokio::test]
    async fn test_feed_ends_after_seal_and_sources_done() {
        let mut feed = ChangeFeed::new();
        let tx = feed.sender().unwrap();
        feed.attach(tokio::spawn(async move {
            let _ = tx.send(change("a"));
            let _ = tx.send(change("b"));
        }));
        feed.seal();
        assert!(feed.sender().is_none());

        let mut names = Vec::new();
        while let Some(item) = feed.next().await {
            names.push(item.unwrap().object.name().to_string());
        }
        assert_eq!(names, vec!["a", "b"]);
    }
}
