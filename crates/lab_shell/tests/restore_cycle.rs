use std::rc::Rc;

use futures::{
    executor::{block_on, LocalPool},
    future::LocalBoxFuture,
    FutureExt,
};
use lab_host::MemoryStateConnector;
use lab_restorer::{AreaConfig, LayoutMode, Orientation, RestoreRequest, LAYOUT_RESTORER_KEY};
use lab_shell::{AddOptions, Area, InsertMode, LabContext, LabShell, UserLayout};
use lab_widgets::{CommandError, CommandRegistry, Widget, WidgetTracker};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

struct Session {
    pool: LocalPool,
    context: LabContext,
    notebooks: WidgetTracker,
    files: Widget,
}

type OpenFuture = LocalBoxFuture<'static, Result<Value, CommandError>>;

/// `docmanager:open` handler: creates the notebook widget, tracks it, and docks it.
fn open_command(tracker: &WidgetTracker, shell: &LabShell) -> impl Fn(Value) -> OpenFuture {
    let tracker = tracker.clone();
    let shell = shell.clone();
    move |args: Value| -> OpenFuture {
        let tracker = tracker.clone();
        let shell = shell.clone();
        async move {
            let path = args["path"].as_str().unwrap_or_default().to_string();
            let mode = serde_json::from_value::<InsertMode>(args["mode"].clone()).ok();
            let widget = Widget::new(format!("nb-{path}")).with_label(path);
            tracker.add(&widget).await.map_err(|err| CommandError::Failed {
                command: "docmanager:open".to_string(),
                message: err.to_string(),
            })?;
            shell
                .add(
                    &widget,
                    Area::Main,
                    AddOptions {
                        mode,
                        kind: Some("notebook".to_string()),
                        ..AddOptions::default()
                    },
                )
                .map_err(|err| CommandError::Failed {
                    command: "docmanager:open".to_string(),
                    message: err.to_string(),
                })?;
            Ok(Value::Null)
        }
        .boxed_local()
    }
}

fn session(connector: &MemoryStateConnector, namespace: &str, mode: LayoutMode) -> Session {
    let pool = LocalPool::new();
    let context = LabContext::new(Rc::new(connector.clone()), mode, pool.spawner());
    let notebooks = context.tracker(namespace);
    context
        .commands
        .add_command("docmanager:open", open_command(&notebooks, &context.shell))
        .expect("register open command");
    context
        .restore(
            &notebooks,
            RestoreRequest::new("docmanager:open", |widget: &Widget| Some(widget.label()))
                .with_args(|widget: &Widget| json!({ "path": widget.label() })),
        )
        .expect("register notebook tracker");

    let files = Widget::new("filebrowser");
    context.restorer.add(&files, "filebrowser");
    context
        .shell
        .add(&files, Area::Left, AddOptions::ranked(100))
        .expect("add file browser");

    Session {
        pool,
        context,
        notebooks,
        files,
    }
}

fn labels(widgets: &[Widget]) -> Vec<String> {
    widgets.iter().map(Widget::label).collect()
}

fn tab(widget: &Widget) -> AreaConfig {
    AreaConfig::tabs(vec![widget.clone()])
}

fn side_by_side(left: &Widget, right: &Widget) -> AreaConfig {
    AreaConfig::SplitArea {
        orientation: Orientation::Horizontal,
        children: vec![tab(left), tab(right)],
        sizes: vec![0.5, 0.5],
    }
}

/// Opens a.ipynb and b.ipynb side by side with the file browser expanded, then lets the debounced
/// save run.
fn first_session(connector: &MemoryStateConnector) {
    let mut first = session(connector, "notebook", LayoutMode::MultipleDocument);
    block_on(first.context.start(UserLayout::default())).expect("start first session");
    assert!(first.context.shell.is_restored());

    block_on(
        first
            .context
            .commands
            .execute("docmanager:open", json!({ "path": "a.ipynb" })),
    )
    .expect("open a");
    block_on(first.context.commands.execute(
        "docmanager:open",
        json!({ "path": "b.ipynb", "mode": "split-right" }),
    ))
    .expect("open b");
    assert!(first.context.shell.activate_by_id("filebrowser"));

    let before = connector.save_count();
    first.pool.run_until_stalled();
    assert_eq!(connector.save_count(), before + 1);
    assert_eq!(first.notebooks.size(), 2);
    assert_eq!(first.context.shell.current_widget(), first.notebooks.current_widget());
}

#[test]
fn layout_survives_a_restart() {
    let connector = MemoryStateConnector::default();
    first_session(&connector);

    let saved = connector.get(LAYOUT_RESTORER_KEY).expect("saved layout");
    assert_eq!(
        saved["main"],
        json!({
            "current": "notebook:b.ipynb",
            "dock": {
                "type": "split-area",
                "orientation": "horizontal",
                "sizes": [0.5, 0.5],
                "children": [
                    {"type": "tab-area", "currentIndex": 0, "widgets": ["notebook:a.ipynb"]},
                    {"type": "tab-area", "currentIndex": 0, "widgets": ["notebook:b.ipynb"]}
                ]
            }
        })
    );
    assert_eq!(saved["left"]["current"], json!("filebrowser"));
    assert_eq!(saved["left"]["collapsed"], json!(false));

    let second = session(&connector, "notebook", LayoutMode::MultipleDocument);
    block_on(second.context.start(UserLayout::default())).expect("start second session");
    let shell = &second.context.shell;

    let restored = second.notebooks.widgets();
    assert_eq!(labels(&restored), vec!["a.ipynb", "b.ipynb"]);
    let a = second
        .notebooks
        .find(|widget| widget.label() == "a.ipynb")
        .expect("a restored");
    let b = second
        .notebooks
        .find(|widget| widget.label() == "b.ipynb")
        .expect("b restored");
    assert_eq!(
        shell.layout().main_area.and_then(|main| main.dock),
        Some(side_by_side(&a, &b))
    );
    assert_eq!(shell.current_widget(), Some(b));
    assert!(!shell.is_left_collapsed());
    assert_eq!(shell.widgets(Area::Left), vec![second.files.clone()]);
}

#[test]
fn persisted_tab_group_rehydrates_through_the_shell() {
    let connector = MemoryStateConnector::with_entries([
        (
            LAYOUT_RESTORER_KEY,
            json!({
                "main": {
                    "current": "nb:1",
                    "dock": {"type": "tab-area", "widgets": ["nb:1"], "currentIndex": 0}
                },
                "left": null,
                "right": null,
                "down": null,
                "top": {"simpleVisibility": true},
                "relativeSizes": [1, 3, 1]
            }),
        ),
        ("nb:1", json!({ "data": { "path": "1" } })),
    ]);
    let session = session(&connector, "nb", LayoutMode::MultipleDocument);
    block_on(session.context.start(UserLayout::default())).expect("start");
    let shell = &session.context.shell;

    let widget_x = session.notebooks.widgets()[0].clone();
    assert_eq!(session.context.restorer.name_of(&widget_x), Some("nb:1".to_string()));
    assert_eq!(shell.current_widget(), Some(widget_x.clone()));
    assert_eq!(
        shell.layout().main_area.and_then(|main| main.dock),
        Some(tab(&widget_x))
    );
    assert_eq!(shell.relative_sizes(), vec![1.0, 3.0, 1.0]);
    assert!(shell.is_top_in_simple_mode_visible());
    assert!(shell.is_left_collapsed());
    assert!(shell.is_right_collapsed());
}

#[test]
fn single_document_start_defers_notebooks_until_multiple_document_mode() {
    let connector = MemoryStateConnector::default();
    first_session(&connector);
    let saved_main = connector.get(LAYOUT_RESTORER_KEY).expect("saved layout")["main"].clone();

    let mut third = session(&connector, "notebook", LayoutMode::SingleDocument);
    block_on(third.context.start(UserLayout::default())).expect("start single-document session");
    let shell = third.context.shell.clone();

    assert_eq!(shell.mode(), LayoutMode::SingleDocument);
    assert_eq!(shell.menu_area(), Area::Header);
    assert!(shell.is_empty(Area::Main));
    assert_eq!(third.notebooks.size(), 0);
    assert!(third.context.restorer.is_deferred());

    shell.toggle_top_in_simple_mode();
    third.pool.run_until_stalled();
    let saved = connector.get(LAYOUT_RESTORER_KEY).expect("saved layout");
    assert_eq!(saved["main"], saved_main);
    assert_eq!(saved["top"]["simpleVisibility"], json!(false));

    shell.set_mode(LayoutMode::MultipleDocument);
    third.pool.run_until_stalled();

    assert!(!third.context.restorer.is_deferred());
    let a = third
        .notebooks
        .find(|widget| widget.label() == "a.ipynb")
        .expect("a restored");
    let b = third
        .notebooks
        .find(|widget| widget.label() == "b.ipynb")
        .expect("b restored");
    assert_eq!(
        shell.layout().main_area.and_then(|main| main.dock),
        Some(side_by_side(&a, &b))
    );
    assert_eq!(shell.current_widget(), Some(b));
    let saved = connector.get(LAYOUT_RESTORER_KEY).expect("saved layout");
    assert_eq!(saved["main"], saved_main);
}
