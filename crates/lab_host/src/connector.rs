//! Key-value state connector contracts and in-memory adapters.

use std::{cell::RefCell, collections::BTreeMap, future::Future, pin::Pin, rc::Rc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Object-safe boxed future used by [`StateConnector`] async methods.
pub type StateConnectorFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Entries returned by [`StateConnector::list`], as parallel id/value vectors.
pub struct StateList {
    /// Fully-qualified ids (`namespace:name`) in ascending order.
    pub ids: Vec<String>,
    /// Stored values, index-aligned with `ids`.
    pub values: Vec<Value>,
}

impl StateList {
    /// Returns the number of listed entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` when no entries were listed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Storage service for fetching, saving, and listing JSON state by id.
pub trait StateConnector {
    /// Fetches the value stored under `id`.
    fn fetch<'a>(&'a self, id: &'a str) -> StateConnectorFuture<'a, Result<Option<Value>, String>>;

    /// Saves `value` under `id`, replacing any previous value.
    fn save<'a>(&'a self, id: &'a str, value: &'a Value)
        -> StateConnectorFuture<'a, Result<(), String>>;

    /// Removes the value stored under `id`.
    fn remove<'a>(&'a self, id: &'a str) -> StateConnectorFuture<'a, Result<(), String>>;

    /// Lists every entry whose id lives in `namespace` (`namespace:` prefix).
    fn list<'a>(
        &'a self,
        namespace: &'a str,
    ) -> StateConnectorFuture<'a, Result<StateList, String>>;
}

/// Builds the fully-qualified id for `name` inside `namespace`.
pub fn namespaced_id(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}")
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op connector for unsupported targets and baseline tests.
pub struct NoopStateConnector;

impl StateConnector for NoopStateConnector {
    fn fetch<'a>(
        &'a self,
        _id: &'a str,
    ) -> StateConnectorFuture<'a, Result<Option<Value>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn save<'a>(
        &'a self,
        _id: &'a str,
        _value: &'a Value,
    ) -> StateConnectorFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn remove<'a>(&'a self, _id: &'a str) -> StateConnectorFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn list<'a>(
        &'a self,
        _namespace: &'a str,
    ) -> StateConnectorFuture<'a, Result<StateList, String>> {
        Box::pin(async { Ok(StateList::default()) })
    }
}

#[derive(Debug, Default)]
struct MemoryEntries {
    values: BTreeMap<String, Value>,
    saves: usize,
}

#[derive(Debug, Clone, Default)]
/// In-memory connector keyed by id. Clones share the same entries.
pub struct MemoryStateConnector {
    inner: Rc<RefCell<MemoryEntries>>,
}

impl MemoryStateConnector {
    /// Creates a connector pre-populated with `entries`.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let connector = Self::default();
        {
            let mut inner = connector.inner.borrow_mut();
            for (id, value) in entries {
                inner.values.insert(id.into(), value);
            }
        }
        connector
    }

    /// Reads a stored value synchronously.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.inner.borrow().values.get(id).cloned()
    }

    /// Returns every stored id in ascending order.
    pub fn ids(&self) -> Vec<String> {
        self.inner.borrow().values.keys().cloned().collect()
    }

    /// Number of successful [`StateConnector::save`] calls since creation.
    pub fn save_count(&self) -> usize {
        self.inner.borrow().saves
    }
}

impl StateConnector for MemoryStateConnector {
    fn fetch<'a>(&'a self, id: &'a str) -> StateConnectorFuture<'a, Result<Option<Value>, String>> {
        Box::pin(async move { Ok(self.get(id)) })
    }

    fn save<'a>(
        &'a self,
        id: &'a str,
        value: &'a Value,
    ) -> StateConnectorFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            inner.values.insert(id.to_string(), value.clone());
            inner.saves += 1;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, id: &'a str) -> StateConnectorFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().values.remove(id);
            Ok(())
        })
    }

    fn list<'a>(
        &'a self,
        namespace: &'a str,
    ) -> StateConnectorFuture<'a, Result<StateList, String>> {
        Box::pin(async move {
            let prefix = format!("{namespace}:");
            let inner = self.inner.borrow();
            let mut list = StateList::default();
            for (id, value) in inner.values.range(prefix.clone()..) {
                if !id.starts_with(&prefix) {
                    break;
                }
                list.ids.push(id.clone());
                list.values.push(value.clone());
            }
            Ok(list)
        })
    }
}

/// Fetches and deserializes a typed value through a [`StateConnector`] implementation.
///
/// # Errors
///
/// Returns an error when the connector or JSON deserialization fails.
pub async fn fetch_state_with<S: StateConnector + ?Sized, T: DeserializeOwned>(
    connector: &S,
    id: &str,
) -> Result<Option<T>, String> {
    let Some(value) = connector.fetch(id).await? else {
        return Ok(None);
    };
    let value = serde_json::from_value(value).map_err(|e| e.to_string())?;
    Ok(Some(value))
}

/// Serializes and saves a typed value through a [`StateConnector`] implementation.
///
/// # Errors
///
/// Returns an error when serialization or the connector save fails.
pub async fn save_state_with<S: StateConnector + ?Sized, T: Serialize>(
    connector: &S,
    id: &str,
    value: &T,
) -> Result<(), String> {
    let value = serde_json::to_value(value).map_err(|e| e.to_string())?;
    connector.save(id, &value).await
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Placement {
        area: String,
        rank: u32,
    }

    #[test]
    fn memory_connector_round_trip_overwrite_and_remove() {
        let connector = MemoryStateConnector::default();
        let connector_obj: &dyn StateConnector = &connector;

        block_on(connector_obj.save("nb:one", &json!({"data": 1}))).expect("save one");
        block_on(connector_obj.save("nb:one", &json!({"data": 2}))).expect("overwrite one");

        assert_eq!(
            block_on(connector_obj.fetch("nb:one")).expect("fetch"),
            Some(json!({"data": 2}))
        );
        assert_eq!(connector.save_count(), 2);

        block_on(connector_obj.remove("nb:one")).expect("remove");
        assert_eq!(block_on(connector_obj.fetch("nb:one")).expect("fetch"), None);
    }

    #[test]
    fn memory_connector_list_only_returns_namespace_entries() {
        let connector = MemoryStateConnector::with_entries([
            ("nb:a", json!({"data": "a"})),
            ("nb:b", json!({"data": "b"})),
            ("nbx:c", json!({"data": "c"})),
            ("console:d", json!({"data": "d"})),
            ("nb", json!({"data": "bare"})),
        ]);

        let list = block_on(connector.list("nb")).expect("list");
        assert_eq!(list.ids, vec!["nb:a".to_string(), "nb:b".to_string()]);
        assert_eq!(list.values, vec![json!({"data": "a"}), json!({"data": "b"})]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn clones_share_entries() {
        let connector = MemoryStateConnector::default();
        let clone = connector.clone();
        block_on(clone.save("k", &json!(true))).expect("save");
        assert_eq!(connector.get("k"), Some(json!(true)));
        assert_eq!(connector.ids(), vec!["k".to_string()]);
    }

    #[test]
    fn typed_helpers_round_trip_and_surface_decode_errors() {
        let connector = MemoryStateConnector::default();
        let placement = Placement {
            area: "left".to_string(),
            rank: 300,
        };

        block_on(save_state_with(&connector, "placement", &placement)).expect("save");
        let loaded: Option<Placement> =
            block_on(fetch_state_with(&connector, "placement")).expect("fetch");
        assert_eq!(loaded, Some(placement));

        block_on(connector.save("placement", &json!({"area": 7}))).expect("save bad");
        let err = block_on(fetch_state_with::<_, Placement>(&connector, "placement"))
            .expect_err("expected decode failure");
        assert!(!err.is_empty());
    }

    #[test]
    fn noop_connector_is_empty_and_successful() {
        let connector = NoopStateConnector;
        let connector_obj: &dyn StateConnector = &connector;
        block_on(connector_obj.save("k", &json!(1))).expect("save");
        assert_eq!(block_on(connector_obj.fetch("k")).expect("fetch"), None);
        block_on(connector_obj.remove("k")).expect("remove");
        assert!(block_on(connector_obj.list("k")).expect("list").is_empty());
    }

    #[test]
    fn namespaced_id_joins_with_colon() {
        assert_eq!(namespaced_id("notebook", "a.ipynb"), "notebook:a.ipynb");
    }
}
