use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use futures::{
    channel::oneshot,
    executor::{block_on, LocalPool},
    future, FutureExt,
};
use lab_host::{MemoryStateConnector, StateConnector, StateConnectorFuture, StateList};
use lab_restorer::{LayoutMode, LayoutRestorer, RestorerError, RestorerOptions, LAYOUT_RESTORER_KEY};
use lab_shell::{AddOptions, Area, LabShell, ShellError, UserLayout, DEFAULT_RELATIVE_SIZES};
use lab_widgets::{opened_gate, Commands, Widget};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Store whose writes complete only when the test releases them, in call order.
#[derive(Clone, Default)]
struct SlowConnector {
    store: MemoryStateConnector,
    releases: Rc<RefCell<VecDeque<oneshot::Sender<()>>>>,
    in_flight: Rc<Cell<usize>>,
    max_in_flight: Rc<Cell<usize>>,
}

impl SlowConnector {
    fn waiting(&self) -> usize {
        self.releases.borrow().len()
    }

    fn release_next(&self) -> bool {
        let next = self.releases.borrow_mut().pop_front();
        next.is_some_and(|release| release.send(()).is_ok())
    }
}

impl StateConnector for SlowConnector {
    fn fetch<'a>(
        &'a self,
        id: &'a str,
    ) -> StateConnectorFuture<'a, Result<Option<Value>, String>> {
        self.store.fetch(id)
    }

    fn save<'a>(
        &'a self,
        id: &'a str,
        value: &'a Value,
    ) -> StateConnectorFuture<'a, Result<(), String>> {
        let (release, released) = oneshot::channel();
        self.releases.borrow_mut().push_back(release);
        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight.set(self.max_in_flight.get().max(self.in_flight.get()));
        async move {
            let _ = released.await;
            self.in_flight.set(self.in_flight.get() - 1);
            self.store.save(id, value).await
        }
        .boxed_local()
    }

    fn remove<'a>(&'a self, id: &'a str) -> StateConnectorFuture<'a, Result<(), String>> {
        self.store.remove(id)
    }

    fn list<'a>(
        &'a self,
        namespace: &'a str,
    ) -> StateConnectorFuture<'a, Result<StateList, String>> {
        self.store.list(namespace)
    }
}

/// Store that cannot be reached.
struct OfflineConnector;

impl StateConnector for OfflineConnector {
    fn fetch<'a>(
        &'a self,
        _id: &'a str,
    ) -> StateConnectorFuture<'a, Result<Option<Value>, String>> {
        future::ready(Err("storage offline".to_string())).boxed_local()
    }

    fn save<'a>(
        &'a self,
        _id: &'a str,
        _value: &'a Value,
    ) -> StateConnectorFuture<'a, Result<(), String>> {
        future::ready(Err("storage offline".to_string())).boxed_local()
    }

    fn remove<'a>(&'a self, _id: &'a str) -> StateConnectorFuture<'a, Result<(), String>> {
        future::ready(Err("storage offline".to_string())).boxed_local()
    }

    fn list<'a>(
        &'a self,
        _namespace: &'a str,
    ) -> StateConnectorFuture<'a, Result<StateList, String>> {
        future::ready(Err("storage offline".to_string())).boxed_local()
    }
}

fn restored_shell(pool: &LocalPool, connector: Rc<dyn StateConnector>) -> LabShell {
    let shell = LabShell::new(pool.spawner());
    let restorer = LayoutRestorer::new(RestorerOptions::new(
        connector,
        opened_gate(),
        Rc::new(Commands::new()),
    ));
    block_on(shell.restore_layout(
        LayoutMode::MultipleDocument,
        restorer,
        UserLayout::default(),
    ))
    .expect("restore layout");
    shell
}

#[test]
fn change_during_a_slow_save_is_written_after_it() {
    let mut pool = LocalPool::new();
    let connector = SlowConnector::default();
    let shell = restored_shell(&pool, Rc::new(connector.clone()));

    shell.set_relative_sizes(vec![1.0, 2.0, 1.0]);
    pool.run_until_stalled();
    assert_eq!(connector.waiting(), 1);

    shell.set_relative_sizes(vec![1.0, 9.0, 1.0]);
    pool.run_until_stalled();
    assert_eq!(connector.waiting(), 1);

    assert!(connector.release_next());
    pool.run_until_stalled();
    let saved = connector.store.get(LAYOUT_RESTORER_KEY).expect("first save");
    assert_eq!(saved["relativeSizes"], json!([1.0, 2.0, 1.0]));
    assert_eq!(connector.waiting(), 1);

    assert!(connector.release_next());
    pool.run_until_stalled();
    assert_eq!(connector.waiting(), 0);
    assert_eq!(connector.max_in_flight.get(), 1);
    assert_eq!(connector.store.save_count(), 2);
    let saved = connector.store.get(LAYOUT_RESTORER_KEY).expect("second save");
    assert_eq!(saved["relativeSizes"], json!([1.0, 9.0, 1.0]));
}

#[test]
fn unreachable_storage_restores_a_blank_layout() {
    let mut pool = LocalPool::new();
    let shell = LabShell::new(pool.spawner());
    let files = Widget::new("filebrowser");
    shell
        .add(&files, Area::Left, AddOptions::ranked(100))
        .expect("add file browser");
    let restorer = LayoutRestorer::new(RestorerOptions::new(
        Rc::new(OfflineConnector),
        opened_gate(),
        Rc::new(Commands::new()),
    ));

    block_on(shell.restore_layout(
        LayoutMode::MultipleDocument,
        restorer,
        UserLayout::default(),
    ))
    .expect("restore layout");

    assert!(shell.is_restored());
    assert!(shell.is_empty(Area::Main));
    assert_eq!(shell.current_widget(), None);
    assert_eq!(shell.layout().main_area.and_then(|main| main.dock), None);
    assert_eq!(shell.relative_sizes(), DEFAULT_RELATIVE_SIZES.to_vec());
    assert!(shell.is_left_collapsed());
    assert_eq!(shell.widgets(Area::Left), vec![files]);

    shell.set_relative_sizes(vec![2.0, 2.0, 1.0]);
    pool.run_until_stalled();
    assert_eq!(
        block_on(shell.save_layout()),
        Err(ShellError::Restorer(RestorerError::Storage(
            "storage offline".to_string()
        )))
    );
}
