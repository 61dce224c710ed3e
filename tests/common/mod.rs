#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use warnview::{
    config::{Settings, SettingsHub},
    filter::FilterEngine,
    warning::{WarningStore, parse},
    workspace::Workspace,
};

/// Two warnings, the first with a note line
pub const SAMPLE_LOG: &str = "\
/a/b.c:10:3: warning: unused variable 'x' [-Wunused-variable]
note: declared here
/a/b.c:20: warning: missing return [-Wreturn-type]
";

/// A bigger build log with compiler noise, clazy checks and an untagged warning
pub const MIXED_LOG: &str = "\
[ 10%] Building CXX object src/CMakeFiles/app.dir/main.cpp.o
/src/main.cpp:12:5: warning: unused variable 'count' [-Wunused-variable]
   12 |     int count = 0;
      |         ^~~~~
/src/widget.cpp:40:9: warning: Missing emit keyword on signal call Widget::changed [clazy-incorrect-emit]
   40 |         changed();
      |         ^
/src/widget.cpp:88:1: warning: control reaches end of non-void function [-Wreturn-type]
/src/model.cpp:7:20: warning: c++11 range-loop might detach Qt container (QList) [clazy-range-loop-detach]
/src/model.cpp:99:3: warning: something without a category
[ 20%] Linking CXX executable app
";

/// Helper to build a store straight from log text
pub fn store_from(text: &str) -> Arc<WarningStore> {
    let (store, _) = WarningStore::load("test.log", parse(text));
    Arc::new(store)
}

/// Helper to build an engine with every available category accepted
pub fn engine_with_all(text: &str, pattern: &str) -> FilterEngine {
    let mut engine = FilterEngine::new(store_from(text), pattern).unwrap();
    let all = engine.available_categories().iter().cloned().collect();
    engine.set_accepted_categories(all);
    engine
}

/// Helper to write a log file into a temp dir
pub fn write_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Helper to create a workspace with an editor configured
pub fn create_test_workspace() -> Workspace {
    Workspace::new(SettingsHub::new(Settings {
        external_editor: "vim +$line $filename".to_string(),
        ..Settings::default()
    }))
}
