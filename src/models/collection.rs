//! Creation-time ordered object collections

use super::object::ResourceObject;

/// Objects in ascending creation-timestamp order
///
/// Sorting is stable, so objects with equal or missing timestamps keep the
/// order they were received in. Missing timestamps sort first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCollection {
    items: Vec<ResourceObject>,
    resource_version: Option<String>,
}

impl ObjectCollection {
    pub fn new(mut items: Vec<ResourceObject>) -> Self {
        items.sort_by_key(|obj| obj.creation_timestamp());
        Self {
            items,
            resource_version: None,
        }
    }

    /// Attach the list resource version used to resume a watch
    pub fn with_resource_version(mut self, resource_version: Option<String>) -> Self {
        self.resource_version = resource_version.filter(|rv| !rv.is_empty());
        self
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.resource_version.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceObject> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&ResourceObject> {
        self.items.first()
    }

    /// Merge another collection, keeping the ordering invariant
    pub fn merge(&mut self, other: ObjectCollection) {
        self.items.extend(other.items);
        self.items.sort_by_key(|obj| obj.creation_timestamp());
    }

    pub fn into_vec(self) -> Vec<ResourceObject> {
        self.items
    }
}

impl FromIterator<ResourceObject> for ObjectCollection {
    fn from_iter<I: IntoIterator<Item = ResourceObject>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for ObjectCollection {
    type Item = ResourceObject;
    type IntoIter = std::vec::IntoIter<ResourceObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ObjectCollection {
    type Item = &'a ResourceObject;
    type IntoIter = std::slice::Iter<'a, ResourceObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
