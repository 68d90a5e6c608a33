//! Shell layout composer.
//!
//! [`LabShell`] owns every shell region and is the only place widgets are moved between them.
//! Adds are buffered until [`LabShell::restore_layout`] supplies the user layout, the persisted
//! layout is applied once in a fixed area order, and afterwards every layout mutation schedules
//! one coalesced save through the layout restorer.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::{Rc, Weak},
};

use futures::{
    future::{self, LocalBoxFuture},
    task::{LocalSpawn, LocalSpawnExt},
    FutureExt,
};
use lab_restorer::{
    AreaConfig, LayoutMode, LayoutRestorer, MainArea, RestorerError, ShellLayout, TopArea,
};
use lab_widgets::{gate, Gate, GateTrigger, Signal, SlotId, Widget};
use leptos::logging;
use thiserror::Error;

use crate::{
    area::{AddOptions, Area, UserLayout},
    dock::{normalize_area, DockPanel},
    down::DownPanel,
    ranked::RankedPanel,
    save_queue::LayoutSaveQueue,
    side_bar::SideBarHandler,
};

/// Relative widths of the left, main, and right columns before anything is restored.
pub const DEFAULT_RELATIVE_SIZES: [f64; 3] = [1.0, 3.0, 1.0];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Shell usage failures.
pub enum ShellError {
    /// The area name is not one of the shell regions.
    #[error("invalid shell area `{0}`")]
    InvalidArea(String),
    /// Widgets must carry a non-empty id.
    #[error("widgets added to the shell must have a unique id")]
    MissingWidgetId,
    /// The layout has not been restored yet.
    #[error("the shell layout has not been restored")]
    NotRestored,
    /// [`LabShell::restore_layout`] was called a second time.
    #[error("the shell layout has already been restored")]
    AlreadyRestored,
    /// The layout restorer failed.
    #[error(transparent)]
    Restorer(#[from] RestorerError),
}

struct DelayedAdd {
    widget: Widget,
    area: Area,
    options: AddOptions,
}

struct ShellInner {
    spawner: Rc<dyn LocalSpawn>,
    dock: RefCell<DockPanel>,
    left: RefCell<SideBarHandler>,
    right: RefCell<SideBarHandler>,
    down: RefCell<DownPanel>,
    header: RefCell<RankedPanel>,
    top: RefCell<RankedPanel>,
    menu: RefCell<RankedPanel>,
    bottom: RefCell<RankedPanel>,
    relative_sizes: RefCell<Vec<f64>>,
    top_hidden_by_user: Cell<bool>,
    current: RefCell<Option<Widget>>,
    cached_layout: RefCell<Option<AreaConfig>>,
    main_options: RefCell<HashMap<String, AddOptions>>,
    delayed: RefCell<Vec<DelayedAdd>>,
    user_layout: RefCell<Option<UserLayout>>,
    id_types: RefCell<HashMap<String, String>>,
    subscriptions: RefCell<HashMap<String, SlotId>>,
    restorer: RefCell<Option<LayoutRestorer>>,
    restored_trigger: RefCell<Option<GateTrigger>>,
    restored: Gate,
    is_restored: Cell<bool>,
    save_queue: LayoutSaveQueue,
    mode_changed: Signal<LayoutMode>,
    layout_modified: Signal<()>,
    current_changed: Signal<Option<Widget>>,
}

/// Application shell. Clones share the same regions.
#[derive(Clone)]
pub struct LabShell {
    inner: Rc<ShellInner>,
}

impl LabShell {
    /// Creates an empty shell in multiple-document mode. Coalesced saves and deferred
    /// restoration run on `spawner`.
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        let spawner: Rc<dyn LocalSpawn> = Rc::new(spawner);
        let (trigger, restored) = gate();
        Self {
            inner: Rc::new(ShellInner {
                save_queue: LayoutSaveQueue::new(spawner.clone()),
                spawner,
                dock: RefCell::new(DockPanel::default()),
                left: RefCell::new(SideBarHandler::default()),
                right: RefCell::new(SideBarHandler::default()),
                down: RefCell::new(DownPanel::default()),
                header: RefCell::new(RankedPanel::default()),
                top: RefCell::new(RankedPanel::default()),
                menu: RefCell::new(RankedPanel::default()),
                bottom: RefCell::new(RankedPanel::default()),
                relative_sizes: RefCell::new(DEFAULT_RELATIVE_SIZES.to_vec()),
                top_hidden_by_user: Cell::new(false),
                current: RefCell::new(None),
                cached_layout: RefCell::new(None),
                main_options: RefCell::new(HashMap::new()),
                delayed: RefCell::new(Vec::new()),
                user_layout: RefCell::new(None),
                id_types: RefCell::new(HashMap::new()),
                subscriptions: RefCell::new(HashMap::new()),
                restorer: RefCell::new(None),
                restored_trigger: RefCell::new(Some(trigger)),
                restored,
                is_restored: Cell::new(false),
                mode_changed: Signal::new(),
                layout_modified: Signal::new(),
                current_changed: Signal::new(),
            }),
        }
    }

    /// Current display mode.
    pub fn mode(&self) -> LayoutMode {
        self.inner.dock.borrow().mode()
    }

    /// Fired after the display mode changes.
    pub fn mode_changed(&self) -> &Signal<LayoutMode> {
        &self.inner.mode_changed
    }

    /// Fired once per coalesced burst of layout mutations, right before the layout is saved.
    pub fn layout_modified(&self) -> &Signal<()> {
        &self.inner.layout_modified
    }

    /// Fired when the current main area widget changes.
    pub fn current_changed(&self) -> &Signal<Option<Widget>> {
        &self.inner.current_changed
    }

    /// Opens once the persisted layout has been applied.
    pub fn restored(&self) -> Gate {
        self.inner.restored.clone()
    }

    /// Returns `true` once the persisted layout has been applied.
    pub fn is_restored(&self) -> bool {
        self.inner.is_restored.get()
    }

    /// Current main area widget.
    pub fn current_widget(&self) -> Option<Widget> {
        self.inner.current.borrow().clone()
    }

    /// Area the menu bar is shown in: the top bar in multiple-document mode, the header in
    /// single-document mode.
    pub fn menu_area(&self) -> Area {
        match self.mode() {
            LayoutMode::MultipleDocument => Area::Top,
            LayoutMode::SingleDocument => Area::Header,
        }
    }

    /// Whether the document title is shown; only in single-document mode.
    pub fn is_title_visible(&self) -> bool {
        self.mode() == LayoutMode::SingleDocument
    }

    /// Whether the top area shows in single-document mode.
    pub fn is_top_in_simple_mode_visible(&self) -> bool {
        !self.inner.top_hidden_by_user.get()
    }

    /// Relative widths of the left, main, and right columns.
    pub fn relative_sizes(&self) -> Vec<f64> {
        self.inner.relative_sizes.borrow().clone()
    }

    /// User placement overrides, including moves recorded by [`Self::move_widget`].
    pub fn user_layout(&self) -> UserLayout {
        self.inner.user_layout.borrow().clone().unwrap_or_default()
    }

    /// Widgets in `area`, in display order.
    pub fn widgets(&self, area: Area) -> Vec<Widget> {
        match area {
            Area::Main => self.inner.dock.borrow().widgets(),
            Area::Left => self.inner.left.borrow().widgets(),
            Area::Right => self.inner.right.borrow().widgets(),
            Area::Down => self.inner.down.borrow().widgets(),
            Area::Header => self.inner.header.borrow().widgets(),
            Area::Top => self.inner.top.borrow().widgets(),
            Area::Menu => self.inner.menu.borrow().widgets(),
            Area::Bottom => self.inner.bottom.borrow().widgets(),
        }
    }

    /// Returns `true` when `area` holds no widgets.
    pub fn is_empty(&self, area: Area) -> bool {
        self.widgets(area).is_empty()
    }

    /// Adds `widget` to `area`.
    ///
    /// Before [`Self::restore_layout`] the call is queued and replayed in order. A user placement
    /// recorded for `options.kind` (or, failing that, the widget id) overrides `area` and is
    /// merged over `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::MissingWidgetId`] for widgets with an empty id.
    pub fn add(&self, widget: &Widget, area: Area, options: AddOptions) -> Result<(), ShellError> {
        if widget.id().is_empty() {
            logging::warn!("widgets added to the shell must have a unique id");
            return Err(ShellError::MissingWidgetId);
        }
        if self.inner.user_layout.borrow().is_none() {
            self.inner.delayed.borrow_mut().push(DelayedAdd {
                widget: widget.clone(),
                area,
                options,
            });
            return Ok(());
        }

        let (area, options) = self.resolve_placement(widget, area, options);
        self.insert(widget, area, options);
        Ok(())
    }

    /// Adds `widget` to the area named `area`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::InvalidArea`] for unknown area names, plus the errors of
    /// [`Self::add`].
    pub fn add_to(
        &self,
        widget: &Widget,
        area: &str,
        options: AddOptions,
    ) -> Result<(), ShellError> {
        let area = area.parse::<Area>()?;
        self.add(widget, area, options)
    }

    fn resolve_placement(
        &self,
        widget: &Widget,
        area: Area,
        options: AddOptions,
    ) -> (Area, AddOptions) {
        let mode = self.mode();
        let placement = {
            let user_layout = self.inner.user_layout.borrow();
            let placements = user_layout.as_ref().map(|layout| layout.placements(mode));
            let placement = placements.and_then(|placements| {
                options
                    .kind
                    .as_ref()
                    .and_then(|kind| placements.get(kind))
                    .or_else(|| placements.get(widget.id()))
                    .cloned()
            });
            placement
        };
        if let Some(kind) = &options.kind {
            self.inner
                .id_types
                .borrow_mut()
                .insert(widget.id().to_string(), kind.clone());
        }

        let Some(placement) = placement else {
            return (area, options);
        };
        let area = placement.area.unwrap_or(area);
        let options = match &placement.options {
            Some(overrides) => options.merged(overrides),
            None => options,
        };
        (area, options)
    }

    fn insert(&self, widget: &Widget, area: Area, options: AddOptions) {
        self.detach(widget);
        self.subscribe(widget);
        let rank = options.rank_or_default();
        match area {
            Area::Main => self.add_to_main(widget, options),
            Area::Left => self.inner.left.borrow_mut().add_widget(widget, rank),
            Area::Right => self.inner.right.borrow_mut().add_widget(widget, rank),
            Area::Down => {
                let mut down = self.inner.down.borrow_mut();
                down.add_widget(widget);
                if options.activate != Some(false) {
                    down.select(widget.id());
                }
            }
            Area::Header => self.inner.header.borrow_mut().add_widget(widget, rank),
            Area::Top => self.inner.top.borrow_mut().add_widget(widget, rank),
            Area::Menu => self.inner.menu.borrow_mut().add_widget(widget, rank),
            Area::Bottom => self.inner.bottom.borrow_mut().add_widget(widget, rank),
        }
        self.on_layout_modified();
    }

    fn add_to_main(&self, widget: &Widget, options: AddOptions) {
        let activate = options.activate != Some(false);
        {
            let mut dock = self.inner.dock.borrow_mut();
            let reference = options
                .reference
                .as_deref()
                .and_then(|id| dock.find_by_id(id));
            dock.add_widget(widget, options.mode.unwrap_or_default(), reference.as_ref());
            if activate {
                dock.activate_widget(widget);
            }
        }
        self.inner
            .main_options
            .borrow_mut()
            .insert(widget.id().to_string(), options);
        if activate || self.current_widget().is_none() {
            self.set_current(Some(widget.clone()));
        }
    }

    /// Removes `widget` from whichever area holds it. Returns that area.
    fn detach(&self, widget: &Widget) -> Option<Area> {
        let inner = &self.inner;
        let area = if inner.dock.borrow_mut().remove_widget(widget) {
            Some(Area::Main)
        } else if inner.left.borrow_mut().remove_widget(widget) {
            Some(Area::Left)
        } else if inner.right.borrow_mut().remove_widget(widget) {
            Some(Area::Right)
        } else if inner.down.borrow_mut().remove_widget(widget) {
            Some(Area::Down)
        } else if inner.header.borrow_mut().remove_widget(widget) {
            Some(Area::Header)
        } else if inner.top.borrow_mut().remove_widget(widget) {
            Some(Area::Top)
        } else if inner.menu.borrow_mut().remove_widget(widget) {
            Some(Area::Menu)
        } else if inner.bottom.borrow_mut().remove_widget(widget) {
            Some(Area::Bottom)
        } else {
            None
        };

        if self.current_widget().as_ref() == Some(widget) {
            let fallback = inner.dock.borrow().selected_widgets().into_iter().next();
            self.set_current(fallback);
        }
        area
    }

    fn subscribe(&self, widget: &Widget) {
        if self.inner.subscriptions.borrow().contains_key(widget.id()) {
            return;
        }
        let shell: Weak<ShellInner> = Rc::downgrade(&self.inner);
        let slot = widget.disposed().connect(move |disposed: &Widget| {
            if let Some(inner) = shell.upgrade() {
                LabShell { inner }.on_widget_disposed(disposed);
            }
        });
        self.inner
            .subscriptions
            .borrow_mut()
            .insert(widget.id().to_string(), slot);
    }

    fn on_widget_disposed(&self, widget: &Widget) {
        let id = widget.id();
        self.inner.subscriptions.borrow_mut().remove(id);
        self.inner.main_options.borrow_mut().remove(id);
        self.inner.id_types.borrow_mut().remove(id);
        if self.detach(widget).is_some() {
            self.on_layout_modified();
        }
    }

    fn set_current(&self, widget: Option<Widget>) {
        let changed = *self.inner.current.borrow() != widget;
        if changed {
            *self.inner.current.borrow_mut() = widget.clone();
            self.inner.current_changed.emit(&widget);
        }
    }

    /// Activates the widget with `id` in whichever area holds it: expands it in a side bar,
    /// selects it in the down panel, or selects and focuses it in the main area.
    ///
    /// Returns `false` when no area holds it.
    pub fn activate_by_id(&self, id: &str) -> bool {
        let inner = &self.inner;
        let found = if inner.left.borrow_mut().activate(id) || inner.right.borrow_mut().activate(id)
        {
            true
        } else if inner.down.borrow_mut().select(id) {
            true
        } else {
            let widget = inner.dock.borrow().find_by_id(id);
            match widget {
                Some(widget) => {
                    inner.dock.borrow_mut().activate_widget(&widget);
                    self.set_current(Some(widget));
                    true
                }
                None => false,
            }
        };
        if found {
            self.on_layout_modified();
        }
        found
    }

    /// Collapses the left side bar.
    pub fn collapse_left(&self) {
        self.inner.left.borrow_mut().collapse();
        self.on_layout_modified();
    }

    /// Collapses the right side bar.
    pub fn collapse_right(&self) {
        self.inner.right.borrow_mut().collapse();
        self.on_layout_modified();
    }

    /// Expands the left side bar's last panel.
    pub fn expand_left(&self) {
        self.inner.left.borrow_mut().expand();
        self.on_layout_modified();
    }

    /// Expands the right side bar's last panel.
    pub fn expand_right(&self) {
        self.inner.right.borrow_mut().expand();
        self.on_layout_modified();
    }

    /// Returns `true` when the left side bar has no expanded panel.
    pub fn is_left_collapsed(&self) -> bool {
        self.inner.left.borrow().is_collapsed()
    }

    /// Returns `true` when the right side bar has no expanded panel.
    pub fn is_right_collapsed(&self) -> bool {
        self.inner.right.borrow().is_collapsed()
    }

    /// Flips whether the top area shows in single-document mode.
    pub fn toggle_top_in_simple_mode(&self) {
        let hidden = self.inner.top_hidden_by_user.get();
        self.inner.top_hidden_by_user.set(!hidden);
        self.on_layout_modified();
    }

    /// Sets the relative widths of the left, main, and right columns.
    pub fn set_relative_sizes(&self, sizes: Vec<f64>) {
        *self.inner.relative_sizes.borrow_mut() = sizes;
        self.on_layout_modified();
    }

    /// Sets the down panel's share of the vertical split.
    pub fn set_down_size(&self, size: f64) {
        self.inner.down.borrow_mut().set_size(size);
        self.on_layout_modified();
    }

    /// Moves `widget` to `area` and remembers the choice for its kind in `mode` (the current
    /// mode by default). Widgets added without a kind are recorded under `unknown`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::add`].
    pub fn move_widget(
        &self,
        widget: &Widget,
        area: Area,
        mode: Option<LayoutMode>,
    ) -> Result<(), ShellError> {
        let kind = self
            .inner
            .id_types
            .borrow()
            .get(widget.id())
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let mode = mode.unwrap_or_else(|| self.mode());
        if let Some(layout) = self.inner.user_layout.borrow_mut().as_mut() {
            layout.placements_mut(mode).entry(kind).or_default().area = Some(area);
        }
        self.add(widget, area, AddOptions::default())
    }

    /// Switches display mode.
    ///
    /// Entering single-document mode caches the dock arrangement. Returning to
    /// multiple-document mode restores the cache minus widgets that were disposed or left the
    /// dock meanwhile, starts any deferred restoration, and re-adds widgets opened in
    /// single-document mode with their original options.
    pub fn set_mode(&self, mode: LayoutMode) {
        if mode == self.mode() {
            return;
        }
        let current = self.current_widget();
        match mode {
            LayoutMode::SingleDocument => {
                let snapshot = self.inner.dock.borrow().save_layout();
                *self.inner.cached_layout.borrow_mut() = snapshot;
                self.inner
                    .dock
                    .borrow_mut()
                    .set_mode(LayoutMode::SingleDocument, current.as_ref());
            }
            LayoutMode::MultipleDocument => {
                let members = self.inner.dock.borrow().widgets();
                self.inner
                    .dock
                    .borrow_mut()
                    .set_mode(LayoutMode::MultipleDocument, None);
                let cached = self.inner.cached_layout.borrow_mut().take();
                if let Some(cached) = cached {
                    if let Some(config) = normalize_area(cached, |widget| members.contains(widget))
                    {
                        self.inner.dock.borrow_mut().restore_layout(config);
                    }
                }
                self.start_deferred_restore();

                let options = std::mem::take(&mut *self.inner.main_options.borrow_mut());
                for widget in members {
                    if self.inner.dock.borrow().contains(&widget) {
                        continue;
                    }
                    let options = AddOptions {
                        activate: Some(false),
                        ..options.get(widget.id()).cloned().unwrap_or_default()
                    };
                    self.add_to_main(&widget, options);
                }
                if let Some(current) = &current {
                    self.inner.dock.borrow_mut().activate_widget(current);
                }
            }
        }
        self.inner.mode_changed.emit(&mode);
        self.on_layout_modified();
    }

    fn start_deferred_restore(&self) {
        let Some(restorer) = self.inner.restorer.borrow().clone() else {
            return;
        };
        if !restorer.is_deferred() {
            return;
        }
        let restore = restorer.restore_deferred();
        let shell = self.clone();
        let spawned = self.inner.spawner.spawn_local(async move {
            if let Some(main) = restore.await {
                shell.apply_main_area(main);
            }
        });
        if let Err(err) = spawned {
            logging::warn!("scheduling deferred restoration failed: {err:?}");
        }
    }

    /// Places every widget of `config` in the dock. Widgets the arrangement leaves out are
    /// re-added as background tabs.
    fn restore_dock(&self, config: AreaConfig) {
        for widget in config.widgets() {
            if !self.inner.dock.borrow().contains(&widget) {
                self.detach(&widget);
                self.subscribe(&widget);
            }
        }
        let detached = self.inner.dock.borrow_mut().restore_layout(config);
        for widget in detached {
            let options = AddOptions {
                activate: Some(false),
                ..self
                    .inner
                    .main_options
                    .borrow()
                    .get(widget.id())
                    .cloned()
                    .unwrap_or_default()
            };
            self.add_to_main(&widget, options);
        }
    }

    fn apply_main_area(&self, main: MainArea) {
        if let Some(dock) = main.dock {
            self.restore_dock(dock);
        }
        if let Some(current) = main.current_widget {
            self.activate_by_id(current.id());
        }
    }

    /// Replays queued adds with `configuration` in effect, then applies the persisted layout
    /// fetched from `restorer` in order: main area and mode, top visibility, down area, left and
    /// right side bars, column sizes. The returned future completes once the layout is applied
    /// and [`Self::restored`] has opened.
    ///
    /// The replay happens before this returns; the fetch happens when the future is polled.
    ///
    /// # Errors
    ///
    /// Resolves to [`ShellError::AlreadyRestored`] when called more than once.
    pub fn restore_layout(
        &self,
        mode: LayoutMode,
        restorer: LayoutRestorer,
        configuration: UserLayout,
    ) -> LocalBoxFuture<'static, Result<(), ShellError>> {
        if self.inner.restorer.borrow().is_some() {
            logging::warn!("the shell layout has already been restored");
            return future::ready(Err(ShellError::AlreadyRestored)).boxed_local();
        }
        *self.inner.user_layout.borrow_mut() = Some(configuration);
        let delayed = std::mem::take(&mut *self.inner.delayed.borrow_mut());
        for DelayedAdd {
            widget,
            area,
            options,
        } in delayed
        {
            if let Err(err) = self.add(&widget, area, options) {
                logging::warn!("replaying queued shell add failed: {err}");
            }
        }
        *self.inner.restorer.borrow_mut() = Some(restorer.clone());

        let shell = self.clone();
        async move {
            let layout = restorer.fetch().await;
            shell.apply_layout(mode, layout);
            shell.inner.is_restored.set(true);
            let trigger = shell.inner.restored_trigger.borrow_mut().take();
            if let Some(trigger) = trigger {
                trigger.open();
            }
            Ok(())
        }
        .boxed_local()
    }

    fn apply_layout(&self, mode: LayoutMode, layout: ShellLayout) {
        match layout.main_area {
            Some(MainArea {
                current_widget,
                dock,
            }) => {
                if let (Some(dock), LayoutMode::MultipleDocument) = (dock, mode) {
                    self.restore_dock(dock);
                }
                self.set_mode(mode);
                if let Some(current) = current_widget {
                    self.activate_by_id(current.id());
                }
            }
            None => self.set_mode(mode),
        }

        if let Some(visible) = layout.top_area.and_then(|top| top.simple_visibility) {
            self.inner.top_hidden_by_user.set(!visible);
        }

        if let Some(down) = layout.down_area {
            for widget in down.widgets.iter().flatten() {
                if !self.inner.down.borrow().contains(widget) {
                    self.detach(widget);
                    self.subscribe(widget);
                }
            }
            self.inner.down.borrow_mut().rehydrate(&down);
        }

        match layout.left_area {
            Some(left) => self.inner.left.borrow_mut().rehydrate(&left),
            None if mode == LayoutMode::SingleDocument => self.inner.left.borrow_mut().collapse(),
            None => {}
        }
        match layout.right_area {
            Some(right) => self.inner.right.borrow_mut().rehydrate(&right),
            None if mode == LayoutMode::SingleDocument => {
                self.inner.right.borrow_mut().collapse()
            }
            None => {}
        }

        if let Some(sizes) = layout.relative_sizes {
            *self.inner.relative_sizes.borrow_mut() = sizes;
        }
    }

    /// Live layout of every persisted region. In single-document mode the main area reports the
    /// cached multiple-document arrangement when there is one.
    pub fn layout(&self) -> ShellLayout {
        let dock = {
            let cached = self.inner.cached_layout.borrow();
            let dock = self.inner.dock.borrow();
            match dock.mode() {
                LayoutMode::SingleDocument => cached.clone().or_else(|| dock.save_layout()),
                LayoutMode::MultipleDocument => dock.save_layout(),
            }
        };
        ShellLayout {
            fresh: false,
            main_area: Some(MainArea {
                current_widget: self.current_widget(),
                dock,
            }),
            down_area: Some(self.inner.down.borrow().dehydrate()),
            left_area: Some(self.inner.left.borrow().dehydrate()),
            right_area: Some(self.inner.right.borrow().dehydrate()),
            top_area: Some(TopArea {
                simple_visibility: Some(self.is_top_in_simple_mode_visible()),
            }),
            relative_sizes: Some(self.relative_sizes()),
        }
    }

    /// Persists [`Self::layout`] through the layout restorer.
    ///
    /// # Errors
    ///
    /// Resolves to [`ShellError::NotRestored`] before the layout has been restored, and to
    /// [`ShellError::Restorer`] when the restorer refuses or fails the save.
    pub fn save_layout(&self) -> LocalBoxFuture<'static, Result<(), ShellError>> {
        let restorer = self.inner.restorer.borrow().clone();
        let Some(restorer) = restorer.filter(|_| self.is_restored()) else {
            return future::ready(Err(ShellError::NotRestored)).boxed_local();
        };
        restorer
            .save(&self.layout())
            .map(|saved| saved.map_err(ShellError::from))
            .boxed_local()
    }

    fn on_layout_modified(&self) {
        if !self.is_restored() {
            return;
        }
        let shell = Rc::downgrade(&self.inner);
        self.inner.save_queue.schedule(move || {
            let Some(inner) = shell.upgrade() else {
                return future::ready(()).boxed_local();
            };
            let shell = LabShell { inner };
            shell.inner.layout_modified.emit(&());
            let save = shell.save_layout();
            async move {
                if let Err(err) = save.await {
                    logging::warn!("saving the shell layout failed: {err}");
                }
            }
            .boxed_local()
        });
    }
}

impl std::fmt::Debug for LabShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabShell")
            .field("mode", &self.mode())
            .field("restored", &self.is_restored())
            .field("main", &self.widgets(Area::Main))
            .finish()
    }
}
