//! Restoration coordinator.
//!
//! [`LayoutRestorer`] collects restorable trackers while the application boots, starts (or
//! defers) their restoration behind the `first` gate, and resolves [`LayoutRestorer::restored`]
//! once every tracker registered before `first` opened has settled. It is also the only reader
//! and writer of the persisted layout record.
//!
//! Registration is a one-shot state machine: open until `first` opens, then closed while the
//! queued tracker restorations drain, then settled. It never goes back.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    future::Future,
    rc::Rc,
};

use futures::{
    future::{self, join, join_all, LocalBoxFuture, Shared},
    FutureExt,
};
use lab_host::StateConnector;
use lab_widgets::{
    is_open, ArgsFn, CommandRegistry, Gate, NameFn, RestorableTracker, RestoreOptions,
    TrackerError, Widget,
};
use leptos::logging;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    data::{LayoutData, MainAreaData},
    layout::{LayoutMode, MainArea, ShellLayout},
    named::NamedWidgets,
    serializer,
};

/// Connector key holding the persisted layout record.
pub const LAYOUT_RESTORER_KEY: &str = "layout-restorer:data";

/// Shared handle to a tracker's restoration, awaited both by the caller and by
/// [`LayoutRestorer::restored`].
pub type TrackerRestore = Shared<LocalBoxFuture<'static, Result<(), TrackerError>>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Restoration usage and persistence failures.
pub enum RestorerError {
    /// A tracker with the same namespace was already registered.
    #[error("the tracker `{0}` is already restored")]
    DuplicateNamespace(String),
    /// `restore` was called after `first` opened.
    #[error("restore() can only be called before `first` has resolved")]
    RegistrationClosed,
    /// `save` was called before every tracker settled.
    #[error("save() was called prematurely")]
    PrematureSave,
    /// The state connector rejected a read or write.
    #[error("layout storage failed: {0}")]
    Storage(String),
    /// A tracker failed to restore.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

#[derive(Clone)]
/// Construction options for [`LayoutRestorer`].
pub struct RestorerOptions {
    /// Store holding the layout record and tracker entries.
    pub connector: Rc<dyn StateConnector>,
    /// Opens once every load-time plugin has had its chance to call
    /// [`LayoutRestorer::restore`].
    pub first: Gate,
    /// Registry executing tracker restore commands.
    pub registry: Rc<dyn CommandRegistry>,
    /// Display mode the shell starts in.
    pub mode: LayoutMode,
}

impl RestorerOptions {
    /// Creates options for the default multiple-document mode.
    pub fn new(
        connector: Rc<dyn StateConnector>,
        first: Gate,
        registry: Rc<dyn CommandRegistry>,
    ) -> Self {
        Self {
            connector,
            first,
            registry,
            mode: LayoutMode::default(),
        }
    }

    /// Sets the starting display mode.
    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Clone)]
/// How a tracker's widgets are persisted and re-created.
pub struct RestoreRequest {
    /// Command re-invoked with each stored argument payload.
    pub command: String,
    /// Argument builder; defaults to an empty object.
    pub args: Option<ArgsFn>,
    /// Stable per-namespace name of a widget, or `None` to skip it.
    pub name: NameFn,
    /// Extra gates to wait for besides `first`.
    pub when: Vec<Gate>,
}

impl RestoreRequest {
    /// Creates a request with default arguments and no extra gates.
    pub fn new(
        command: impl Into<String>,
        name: impl Fn(&Widget) -> Option<String> + 'static,
    ) -> Self {
        Self {
            command: command.into(),
            args: None,
            name: Rc::new(name),
            when: Vec::new(),
        }
    }

    /// Sets the argument builder.
    pub fn with_args(mut self, args: impl Fn(&Widget) -> Value + 'static) -> Self {
        self.args = Some(Rc::new(args));
        self
    }

    /// Adds a gate to wait for.
    pub fn when(mut self, gate: Gate) -> Self {
        self.when.push(gate);
        self
    }
}

struct Registration {
    // `None` once registration has settled.
    namespaces: RefCell<Option<BTreeSet<String>>>,
    promises: RefCell<Vec<TrackerRestore>>,
    settled: Cell<bool>,
}

struct RestorerInner {
    connector: Rc<dyn StateConnector>,
    registry: Rc<dyn CommandRegistry>,
    first: Gate,
    mode: LayoutMode,
    names: NamedWidgets,
    registration: Rc<Registration>,
    restored: Shared<LocalBoxFuture<'static, ()>>,
    deferred: RefCell<Vec<Rc<dyn RestorableTracker>>>,
    deferred_main: RefCell<Option<MainAreaData>>,
}

/// Coordinates tracker restoration and persists the shell layout.
#[derive(Clone)]
pub struct LayoutRestorer {
    inner: Rc<RestorerInner>,
}

impl LayoutRestorer {
    /// Creates a restorer and arms its `first` → trackers → `restored` chain.
    pub fn new(options: RestorerOptions) -> Self {
        let registration = Rc::new(Registration {
            namespaces: RefCell::new(Some(BTreeSet::new())),
            promises: RefCell::new(Vec::new()),
            settled: Cell::new(false),
        });
        let restored = {
            let registration = registration.clone();
            let first = options.first.clone();
            async move {
                first.await;
                let promises = std::mem::take(&mut *registration.promises.borrow_mut());
                for result in join_all(promises).await {
                    if let Err(err) = result {
                        logging::warn!("tracker restoration failed: {err}");
                    }
                }
                registration.settled.set(true);
                registration.namespaces.borrow_mut().take();
            }
            .boxed_local()
            .shared()
        };

        Self {
            inner: Rc::new(RestorerInner {
                connector: options.connector,
                registry: options.registry,
                first: options.first,
                mode: options.mode,
                names: NamedWidgets::new(),
                registration,
                restored,
                deferred: RefCell::new(Vec::new()),
                deferred_main: RefCell::new(None),
            }),
        }
    }

    /// Completes once `first` has opened and every tracker registered before it has settled.
    pub fn restored(&self) -> impl Future<Output = ()> + 'static {
        self.inner.restored.clone()
    }

    /// Display mode the restorer was created for.
    pub fn mode(&self) -> LayoutMode {
        self.inner.mode
    }

    /// Name registry used to rehydrate persisted layouts.
    pub fn names(&self) -> &NamedWidgets {
        &self.inner.names
    }

    /// Name `widget` is persisted under.
    pub fn name_of(&self, widget: &Widget) -> Option<String> {
        self.inner.names.name_of(widget)
    }

    /// Returns `true` while deferred trackers are waiting for [`Self::restore_deferred`].
    pub fn is_deferred(&self) -> bool {
        !self.inner.deferred.borrow().is_empty()
    }

    /// Returns `true` once every registered tracker has settled.
    pub fn is_settled(&self) -> bool {
        // Polling the shared chain drives it forward even when nobody else awaits it.
        let _ = self.inner.restored.clone().now_or_never();
        self.inner.registration.settled.get()
    }

    /// Registers `widget` under `name` for layout persistence.
    pub fn add(&self, widget: &Widget, name: impl Into<String>) {
        self.inner.names.add(widget, name);
    }

    /// Registers a restorable tracker.
    ///
    /// Every widget the tracker adds or renames is registered as `namespace:name`. In
    /// multiple-document mode the tracker starts restoring behind `first` and the returned handle
    /// completes with it; in single-document mode the tracker is deferred and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RestorerError::RegistrationClosed`] once `first` has opened, and
    /// [`RestorerError::DuplicateNamespace`] when the namespace was already registered.
    pub fn restore(
        &self,
        tracker: Rc<dyn RestorableTracker>,
        request: RestoreRequest,
    ) -> Result<Option<TrackerRestore>, RestorerError> {
        let registration = &self.inner.registration;
        let namespace = tracker.namespace().to_string();
        {
            let mut namespaces = registration.namespaces.borrow_mut();
            let namespaces = match namespaces.as_mut() {
                Some(namespaces) if !is_open(&self.inner.first) => namespaces,
                _ => {
                    logging::warn!("restore() can only be called before `first` has resolved");
                    return Err(RestorerError::RegistrationClosed);
                }
            };
            if !namespaces.insert(namespace.clone()) {
                logging::warn!("the tracker `{namespace}` is already restored");
                return Err(RestorerError::DuplicateNamespace(namespace));
            }
        }

        let register = {
            let names = self.inner.names.clone();
            let name = request.name.clone();
            let namespace = namespace.clone();
            move |widget: &Widget| {
                if let Some(widget_name) = name(widget) {
                    names.add(widget, format!("{namespace}:{widget_name}"));
                }
            }
        };
        tracker.widget_added().connect(register.clone());
        tracker.widget_updated().connect(register);

        let mut when = Vec::with_capacity(request.when.len() + 1);
        when.push(self.inner.first.clone());
        when.extend(request.when);
        let options = RestoreOptions {
            command: request.command,
            args: request
                .args
                .unwrap_or_else(|| Rc::new(|_: &Widget| json!({}))),
            name: request.name,
            connector: self.inner.connector.clone(),
            registry: self.inner.registry.clone(),
            when,
        };

        match self.inner.mode {
            LayoutMode::MultipleDocument => {
                let promise = tracker.restore(options).shared();
                registration.promises.borrow_mut().push(promise.clone());
                Ok(Some(promise))
            }
            LayoutMode::SingleDocument => {
                tracker.defer(options);
                self.inner.deferred.borrow_mut().push(tracker);
                Ok(None)
            }
        }
    }

    /// Restores deferred trackers one after another, then rehydrates the main area that was held
    /// back by [`Self::fetch`].
    ///
    /// Resolves to `None` when nothing was deferred.
    pub fn restore_deferred(&self) -> LocalBoxFuture<'static, Option<MainArea>> {
        if !self.is_deferred() {
            return future::ready(None).boxed_local();
        }
        let trackers = std::mem::take(&mut *self.inner.deferred.borrow_mut());
        let inner = self.inner.clone();
        async move {
            for tracker in trackers {
                if let Err(err) = tracker.restore_deferred().await {
                    logging::warn!(
                        "deferred restoration of `{}` failed: {err}",
                        tracker.namespace()
                    );
                }
            }
            let main = inner.deferred_main.borrow_mut().take();
            serializer::rehydrate_main(main.as_ref(), &inner.names)
        }
        .boxed_local()
    }

    /// Reads the persisted layout once restoration has settled.
    ///
    /// Storage failures and unreadable records produce [`ShellLayout::blank`]. In
    /// single-document mode the main area is held back for [`Self::restore_deferred`].
    pub fn fetch(&self) -> LocalBoxFuture<'static, ShellLayout> {
        let inner = self.inner.clone();
        async move {
            let connector = inner.connector.clone();
            let (stored, ()) =
                join(connector.fetch(LAYOUT_RESTORER_KEY), inner.restored.clone()).await;
            let value = match stored {
                Ok(Some(value)) => value,
                Ok(None) => return ShellLayout::blank(),
                Err(err) => {
                    logging::warn!("fetching the saved layout failed: {err}");
                    return ShellLayout::blank();
                }
            };
            let data: LayoutData = match serde_json::from_value(value) {
                Ok(data) => data,
                Err(err) => {
                    logging::warn!("ignoring unreadable saved layout: {err}");
                    return ShellLayout::blank();
                }
            };

            let mut layout = serializer::rehydrate_layout(&data, &inner.names);
            if inner.mode == LayoutMode::SingleDocument {
                *inner.deferred_main.borrow_mut() = data.main;
                layout.main_area = None;
            }
            layout
        }
        .boxed_local()
    }

    /// Persists `layout`.
    ///
    /// While trackers are deferred the main area held back by [`Self::fetch`] is written in place
    /// of the live one, so an unrestored arrangement is not lost.
    ///
    /// # Errors
    ///
    /// Resolves to [`RestorerError::PrematureSave`] without touching storage when called before
    /// every tracker settled, and to [`RestorerError::Storage`] when the write fails.
    pub fn save(&self, layout: &ShellLayout) -> LocalBoxFuture<'static, Result<(), RestorerError>> {
        if !self.is_settled() {
            logging::warn!("save() was called prematurely");
            return future::ready(Err(RestorerError::PrematureSave)).boxed_local();
        }

        let mut data = serializer::dehydrate_layout(layout, &self.inner.names);
        if self.is_deferred() {
            data.main = self.inner.deferred_main.borrow().clone();
        }
        let value = match serde_json::to_value(&data) {
            Ok(value) => value,
            Err(err) => {
                return future::ready(Err(RestorerError::Storage(err.to_string()))).boxed_local();
            }
        };

        let connector = self.inner.connector.clone();
        async move {
            connector
                .save(LAYOUT_RESTORER_KEY, &value)
                .await
                .map_err(|err| {
                    logging::warn!("saving the layout failed: {err}");
                    RestorerError::Storage(err)
                })
        }
        .boxed_local()
    }
}

impl std::fmt::Debug for LayoutRestorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRestorer")
            .field("mode", &self.inner.mode)
            .field("settled", &self.inner.registration.settled.get())
            .field("deferred", &self.inner.deferred.borrow().len())
            .field("names", &self.inner.names)
            .finish()
    }
}
