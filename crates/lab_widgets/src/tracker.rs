//! Restorable widget trackers.
//!
//! A tracker groups widgets under a persistence namespace. When it is restorable, every tracked
//! widget is written to the state connector as `{"data": args(widget)}` under
//! `namespace:name(widget)`, and restoring the tracker replays the restore command once per
//! stored entry. Entries without data, or whose command fails, are pruned from the connector.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use futures::{
    future::{self, join_all, LocalBoxFuture},
    task::{LocalSpawn, LocalSpawnExt},
    FutureExt,
};
use lab_host::{namespaced_id, StateConnector};
use leptos::logging;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{commands::CommandRegistry, gate::Gate, signal::Signal, widget::Widget};

/// Produces the restore-command arguments for a widget.
pub type ArgsFn = Rc<dyn Fn(&Widget) -> Value>;
/// Derives the stable per-namespace name of a widget, or `None` to skip persistence.
pub type NameFn = Rc<dyn Fn(&Widget) -> Option<String>>;
/// Boxed future returned by tracker persistence and restore operations.
pub type TrackerFuture = LocalBoxFuture<'static, Result<(), TrackerError>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Tracker usage and persistence failures.
pub enum TrackerError {
    /// `restore` was called a second time.
    #[error("tracker `{0}` has already been restored")]
    AlreadyRestored(String),
    /// The widget is already in the tracker.
    #[error("widget `{0}` is already tracked")]
    AlreadyTracked(String),
    /// The widget was disposed before it could be tracked.
    #[error("widget `{0}` is disposed")]
    Disposed(String),
    /// The state connector rejected a read or write.
    #[error("state connector failed: {0}")]
    Connector(String),
}

#[derive(Clone)]
/// Everything a tracker needs to persist and re-create its widgets.
pub struct RestoreOptions {
    /// Command re-invoked with each stored `data` payload.
    pub command: String,
    /// Argument builder for persisted entries.
    pub args: ArgsFn,
    /// Name builder for persisted entries.
    pub name: NameFn,
    /// Backing state connector.
    pub connector: Rc<dyn StateConnector>,
    /// Registry executing `command`.
    pub registry: Rc<dyn CommandRegistry>,
    /// Gates that must open before restoration starts.
    pub when: Vec<Gate>,
}

impl std::fmt::Debug for RestoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreOptions")
            .field("command", &self.command)
            .field("when", &self.when.len())
            .finish()
    }
}

/// Collection of widgets that can be persisted and re-created as a group.
pub trait RestorableTracker {
    /// Persistence namespace, unique per application.
    fn namespace(&self) -> &str;

    /// Fired when a widget joins the tracker.
    fn widget_added(&self) -> &Signal<Widget>;

    /// Fired when a tracked widget's persisted name changes.
    fn widget_updated(&self) -> &Signal<Widget>;

    /// Makes the tracker restorable and re-creates its stored widgets once `options.when` opens.
    fn restore(&self, options: RestoreOptions) -> TrackerFuture;

    /// Makes the tracker restorable but postpones re-creation until [`Self::restore_deferred`].
    fn defer(&self, options: RestoreOptions);

    /// Runs a restoration postponed by [`Self::defer`]. Resolves immediately when none is pending.
    fn restore_deferred(&self) -> TrackerFuture;
}

struct TrackerInner {
    namespace: String,
    spawner: Rc<dyn LocalSpawn>,
    widgets: RefCell<Vec<Widget>>,
    current: RefCell<Option<Widget>>,
    persisted: RefCell<HashMap<String, String>>,
    restore: RefCell<Option<RestoreOptions>>,
    deferred: RefCell<Option<RestoreOptions>>,
    restored: Cell<bool>,
    widget_added: Signal<Widget>,
    widget_updated: Signal<Widget>,
    current_changed: Signal<Option<Widget>>,
}

/// Default [`RestorableTracker`] implementation.
///
/// Connector writes triggered by widget disposal have no caller to await them, so they run on the
/// injected spawner.
#[derive(Clone)]
pub struct WidgetTracker {
    inner: Rc<TrackerInner>,
}

struct StagedSave {
    connector: Rc<dyn StateConnector>,
    stale: Option<String>,
    entry: Option<(String, Value)>,
    renamed: bool,
}

impl StagedSave {
    async fn commit(self) -> Result<(), TrackerError> {
        if let Some(stale) = self.stale {
            self.connector
                .remove(&stale)
                .await
                .map_err(TrackerError::Connector)?;
        }
        if let Some((id, value)) = self.entry {
            self.connector
                .save(&id, &value)
                .await
                .map_err(TrackerError::Connector)?;
        }
        Ok(())
    }
}

impl WidgetTracker {
    /// Creates an empty tracker for `namespace`.
    pub fn new(namespace: impl Into<String>, spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            inner: Rc::new(TrackerInner {
                namespace: namespace.into(),
                spawner: Rc::new(spawner),
                widgets: RefCell::new(Vec::new()),
                current: RefCell::new(None),
                persisted: RefCell::new(HashMap::new()),
                restore: RefCell::new(None),
                deferred: RefCell::new(None),
                restored: Cell::new(false),
                widget_added: Signal::new(),
                widget_updated: Signal::new(),
                current_changed: Signal::new(),
            }),
        }
    }

    /// Adds a widget, makes it current, and persists it when the tracker is restorable.
    ///
    /// [`RestorableTracker::widget_added`] fires before the returned future writes the entry.
    pub fn add(&self, widget: &Widget) -> TrackerFuture {
        if widget.is_disposed() {
            return future::ready(Err(TrackerError::Disposed(widget.id().to_string())))
                .boxed_local();
        }
        if self.has(widget) {
            return future::ready(Err(TrackerError::AlreadyTracked(widget.id().to_string())))
                .boxed_local();
        }

        self.inner.widgets.borrow_mut().push(widget.clone());
        let weak = Rc::downgrade(&self.inner);
        widget.disposed().connect(move |disposed: &Widget| {
            if let Some(inner) = weak.upgrade() {
                on_widget_disposed(&inner, disposed);
            }
        });
        self.set_current(Some(widget));

        let staged = self.stage(widget);
        self.inner.widget_added.emit(widget);
        commit(staged)
    }

    /// Re-persists a tracked widget, moving its entry if its name changed.
    ///
    /// [`RestorableTracker::widget_updated`] fires when the persisted name changes.
    pub fn update(&self, widget: &Widget) -> TrackerFuture {
        if !self.has(widget) {
            return future::ready(Ok(())).boxed_local();
        }
        let staged = self.stage(widget);
        if staged.as_ref().is_some_and(|staged| staged.renamed) {
            self.inner.widget_updated.emit(widget);
        }
        commit(staged)
    }

    fn stage(&self, widget: &Widget) -> Option<StagedSave> {
        let options = self.inner.restore.borrow().clone()?;
        let id = (options.name)(widget).map(|name| namespaced_id(&self.inner.namespace, &name));
        let previous = {
            let mut persisted = self.inner.persisted.borrow_mut();
            match &id {
                Some(id) => persisted.insert(widget.id().to_string(), id.clone()),
                None => persisted.remove(widget.id()),
            }
        };
        let renamed = previous != id;
        let stale = previous.filter(|previous| Some(previous) != id.as_ref());
        let entry = id.map(|id| (id, json!({ "data": (options.args)(widget) })));
        Some(StagedSave {
            connector: options.connector,
            stale,
            entry,
            renamed,
        })
    }

    /// Returns `true` when the widget is tracked.
    pub fn has(&self, widget: &Widget) -> bool {
        self.inner.widgets.borrow().iter().any(|w| w == widget)
    }

    /// Returns the first tracked widget matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&Widget) -> bool) -> Option<Widget> {
        self.inner
            .widgets
            .borrow()
            .iter()
            .find(|w| predicate(w))
            .cloned()
    }

    /// Tracked widgets in insertion order.
    pub fn widgets(&self) -> Vec<Widget> {
        self.inner.widgets.borrow().clone()
    }

    /// Number of tracked widgets.
    pub fn size(&self) -> usize {
        self.inner.widgets.borrow().len()
    }

    /// Most recently added or activated widget.
    pub fn current_widget(&self) -> Option<Widget> {
        self.inner.current.borrow().clone()
    }

    /// Makes `widget` current. Untracked widgets are ignored.
    pub fn set_current(&self, widget: Option<&Widget>) {
        if let Some(widget) = widget {
            if !self.has(widget) {
                return;
            }
        }
        let next = widget.cloned();
        let changed = *self.inner.current.borrow() != next;
        if changed {
            *self.inner.current.borrow_mut() = next.clone();
            self.inner.current_changed.emit(&next);
        }
    }

    /// Fired when the current widget changes.
    pub fn current_changed(&self) -> &Signal<Option<Widget>> {
        &self.inner.current_changed
    }

    /// Returns `true` once restore options are known (restored or deferred).
    pub fn is_restorable(&self) -> bool {
        self.inner.restore.borrow().is_some()
    }
}

fn commit(staged: Option<StagedSave>) -> TrackerFuture {
    match staged {
        Some(staged) => staged.commit().boxed_local(),
        None => future::ready(Ok(())).boxed_local(),
    }
}

fn on_widget_disposed(inner: &Rc<TrackerInner>, widget: &Widget) {
    inner.widgets.borrow_mut().retain(|w| w != widget);
    let persisted = inner.persisted.borrow_mut().remove(widget.id());

    let was_current = inner.current.borrow().as_ref() == Some(widget);
    if was_current {
        let fallback = inner.widgets.borrow().last().cloned();
        *inner.current.borrow_mut() = fallback.clone();
        inner.current_changed.emit(&fallback);
    }

    let connector = inner
        .restore
        .borrow()
        .as_ref()
        .map(|options| options.connector.clone());
    let (Some(id), Some(connector)) = (persisted, connector) else {
        return;
    };
    let spawned = inner.spawner.spawn_local(async move {
        if let Err(err) = connector.remove(&id).await {
            logging::warn!("removing restore entry `{id}` failed: {err}");
        }
    });
    if let Err(err) = spawned {
        logging::warn!("scheduling restore entry removal failed: {err:?}");
    }
}

fn restore_entries(namespace: String, options: RestoreOptions) -> TrackerFuture {
    async move {
        join_all(options.when.iter().cloned()).await;
        let saved = options
            .connector
            .list(&namespace)
            .await
            .map_err(TrackerError::Connector)?;

        let replays = saved
            .ids
            .into_iter()
            .zip(saved.values)
            .map(|(id, value)| {
                let options = options.clone();
                async move {
                    let Some(args) = value.get("data").cloned() else {
                        if let Err(err) = options.connector.remove(&id).await {
                            logging::warn!("pruning restore entry `{id}` failed: {err}");
                        }
                        return;
                    };
                    if let Err(err) = options.registry.execute(&options.command, args).await {
                        logging::warn!("restoring `{id}` failed: {err}");
                        if let Err(err) = options.connector.remove(&id).await {
                            logging::warn!("pruning restore entry `{id}` failed: {err}");
                        }
                    }
                }
            });
        join_all(replays).await;
        Ok::<(), TrackerError>(())
    }
    .boxed_local()
}

impl RestorableTracker for WidgetTracker {
    fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    fn widget_added(&self) -> &Signal<Widget> {
        &self.inner.widget_added
    }

    fn widget_updated(&self) -> &Signal<Widget> {
        &self.inner.widget_updated
    }

    fn restore(&self, options: RestoreOptions) -> TrackerFuture {
        if self.inner.restored.replace(true) {
            return future::ready(Err(TrackerError::AlreadyRestored(
                self.inner.namespace.clone(),
            )))
            .boxed_local();
        }
        *self.inner.restore.borrow_mut() = Some(options.clone());

        // Widgets tracked before the tracker became restorable still need an entry.
        let staged = self
            .widgets()
            .iter()
            .filter_map(|widget| self.stage(widget))
            .collect::<Vec<_>>();
        let replay = restore_entries(self.inner.namespace.clone(), options);
        async move {
            for staged in staged {
                staged.commit().await?;
            }
            replay.await
        }
        .boxed_local()
    }

    fn defer(&self, options: RestoreOptions) {
        *self.inner.restore.borrow_mut() = Some(options.clone());
        *self.inner.deferred.borrow_mut() = Some(options);
    }

    fn restore_deferred(&self) -> TrackerFuture {
        let deferred = self.inner.deferred.borrow_mut().take();
        match deferred {
            Some(options) => self.restore(options),
            None => future::ready(Ok(())).boxed_local(),
        }
    }
}

impl std::fmt::Debug for WidgetTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetTracker")
            .field("namespace", &self.inner.namespace)
            .field("size", &self.size())
            .finish()
    }
}
