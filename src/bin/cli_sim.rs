//! Drives the autosave core against the in-memory sim host: opens a couple
//! of document panels, scripts focus transitions and a live settings
//! change, and prints the resulting save ledger.

use std::sync;

use blotter::logic::settings::SettingsAdapter;
use blotter::logic::tracker::FocusSaveTracker;
use blotter::model::shell::PanelSource;
use blotter::sim;

fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Overlays user settings from `$XDG_CONFIG_HOME/blotter/autosave.toml`
/// onto the store, when the file exists and parses.
fn seed_from_config(store: &sim::SimSettings) {
    let Ok(dirs) = xdg::BaseDirectories::with_prefix("blotter") else {
        return;
    };
    let Some(path) = dirs.find_config_file("autosave.toml") else {
        return;
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("failed to read {}: {}", path.display(), e);
            return;
        }
    };

    match text.parse::<toml::Table>() {
        Ok(table) => {
            for (key, value) in table {
                store.seed(&key, value);
            }
        }
        Err(e) => tracing::error!("failed to parse {}: {}", path.display(), e),
    }
}

fn main() {
    setup_tracing();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let shell = sim::SimShell::new();
    let documents = sim::SimDocumentManager::new();
    let store = sim::SimSettings::new();
    let commands = sim::SimCommands::new();
    seed_from_config(&store);

    let tracker = FocusSaveTracker::new(shell.clone(), documents.clone(), rt.handle().clone());
    let adapter = SettingsAdapter::new(
        shell.clone(),
        sync::Arc::new(store.clone()),
        commands.clone(),
        tracker.clone(),
        rt.handle().clone(),
    );

    rt.block_on(async {
        adapter.clone().track_setting_changes().await;

        let notebook_node = shell.create_node(None);
        let notebook_ctx = documents.bind(notebook_node, "analysis.ipynb");
        let notebook = shell.open_panel_at(PanelSource::Notebook, "analysis", notebook_node);

        let editor_node = shell.create_node(None);
        let editor_ctx = documents.bind(editor_node, "scratch.txt");
        let editor = shell.open_panel_at(PanelSource::Editor, "scratch", editor_node);

        /* focus moves from the notebook to the editor and back */
        notebook.blur(Some(editor_node));
        editor.blur(Some(notebook_node));

        /* focus moves between two cells of the notebook; suppressed under
         * the default settings */
        let cell = shell.create_node(Some(notebook_node));
        notebook.blur(Some(cell));

        /* exclude scratch files from now on; the change itself flushes a
         * save of everything still eligible */
        store.write(
            "exclude",
            toml::Value::Array(vec![toml::Value::String("*.txt".to_string())]),
        );

        editor.blur(Some(notebook_node));
        notebook.blur(None);

        shell.close_panel(&editor);
        documents.unbind(editor_node);

        /* let the dispatched saves drain */
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        println!("tracked panels: {}", tracker.tracked_count());
        println!("analysis.ipynb: {} saves", notebook_ctx.save_count());
        println!("scratch.txt: {} saves", editor_ctx.save_count());
    });
}
