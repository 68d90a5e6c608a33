//! Application wiring for the lab shell.
//!
//! [`LabContext`] owns the long-lived command registry, state connector, layout restorer, and
//! shell, and drives the startup sequence: plugins register trackers while the `first` gate is
//! closed, [`LabContext::start`] opens it and restores the shell layout.

use std::{cell::RefCell, rc::Rc};

use futures::{
    future::{self, LocalBoxFuture},
    task::LocalSpawn,
    FutureExt,
};
use lab_host::{fetch_state_with, save_state_with, StateConnector};
use lab_restorer::{
    LayoutMode, LayoutRestorer, RestoreRequest, RestorerError, RestorerOptions, TrackerRestore,
};
use lab_widgets::{gate, is_open, Commands, Gate, GateTrigger, WidgetTracker};
use leptos::logging;

use crate::{area::UserLayout, shell::LabShell, ShellError};

/// Connector key holding the user's placement overrides.
pub const USER_LAYOUT_KEY: &str = "shell:user-layout";

/// Long-lived services shared by every plugin.
pub struct LabContext {
    /// Commands used to re-create widgets.
    pub commands: Commands,
    /// Store for the layout record and tracker entries.
    pub connector: Rc<dyn StateConnector>,
    /// Layout restorer bound to `connector` and `commands`.
    pub restorer: LayoutRestorer,
    /// Application shell.
    pub shell: LabShell,
    spawner: Rc<dyn LocalSpawn>,
    first: Gate,
    first_trigger: RefCell<Option<GateTrigger>>,
}

impl LabContext {
    /// Creates the services for a session starting in `mode`. Background work runs on
    /// `spawner`.
    pub fn new<S>(connector: Rc<dyn StateConnector>, mode: LayoutMode, spawner: S) -> Self
    where
        S: LocalSpawn + Clone + 'static,
    {
        let commands = Commands::new();
        let (trigger, first) = gate();
        let restorer = LayoutRestorer::new(
            RestorerOptions::new(connector.clone(), first.clone(), Rc::new(commands.clone()))
                .with_mode(mode),
        );
        Self {
            commands,
            connector,
            restorer,
            shell: LabShell::new(spawner.clone()),
            spawner: Rc::new(spawner),
            first,
            first_trigger: RefCell::new(Some(trigger)),
        }
    }

    /// Opens once [`Self::start`] has been called.
    pub fn first(&self) -> Gate {
        self.first.clone()
    }

    /// Returns `true` once [`Self::start`] has been called.
    pub fn is_started(&self) -> bool {
        is_open(&self.first)
    }

    /// Creates an empty tracker for `namespace` sharing this context's spawner.
    pub fn tracker(&self, namespace: impl Into<String>) -> WidgetTracker {
        WidgetTracker::new(namespace, self.spawner.clone())
    }

    /// Registers `tracker` with the layout restorer.
    ///
    /// # Errors
    ///
    /// Returns the registration errors of [`LayoutRestorer::restore`].
    pub fn restore(
        &self,
        tracker: &WidgetTracker,
        request: RestoreRequest,
    ) -> Result<Option<TrackerRestore>, RestorerError> {
        self.restorer.restore(Rc::new(tracker.clone()), request)
    }

    /// Reads the stored placement overrides. A missing or unreadable record yields the default.
    pub fn load_user_layout(&self) -> LocalBoxFuture<'static, UserLayout> {
        let connector = self.connector.clone();
        async move {
            match fetch_state_with::<_, UserLayout>(connector.as_ref(), USER_LAYOUT_KEY).await {
                Ok(layout) => layout.unwrap_or_default(),
                Err(err) => {
                    logging::warn!("ignoring unreadable user layout: {err}");
                    UserLayout::default()
                }
            }
        }
        .boxed_local()
    }

    /// Stores the shell's current placement overrides, including moves made this session.
    ///
    /// # Errors
    ///
    /// Resolves to the connector's error message when the write fails.
    pub fn save_user_layout(&self) -> LocalBoxFuture<'static, Result<(), String>> {
        let connector = self.connector.clone();
        let layout = self.shell.user_layout();
        async move { save_state_with(connector.as_ref(), USER_LAYOUT_KEY, &layout).await }
            .boxed_local()
    }

    /// Ends plugin registration and restores the shell layout with `user_layout` placements.
    ///
    /// # Errors
    ///
    /// Resolves to [`ShellError::AlreadyRestored`] when called more than once.
    pub fn start(
        &self,
        user_layout: UserLayout,
    ) -> LocalBoxFuture<'static, Result<(), ShellError>> {
        let trigger = self.first_trigger.borrow_mut().take();
        let Some(trigger) = trigger else {
            logging::warn!("the lab context was already started");
            return future::ready(Err(ShellError::AlreadyRestored)).boxed_local();
        };
        trigger.open();
        self.shell
            .restore_layout(self.restorer.mode(), self.restorer.clone(), user_layout)
    }
}

impl std::fmt::Debug for LabContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabContext")
            .field("started", &self.is_started())
            .field("restorer", &self.restorer)
            .field("shell", &self.shell)
            .finish()
    }
}
