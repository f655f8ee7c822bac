use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use form_designer::design::design_model::FormDesign;
use form_designer::field::field_model::{FieldDescriptor, FieldKind};
use form_designer::session::editor::{DesignSession, SessionConfig};
use form_designer::store::memory::MemoryStore;
use tokio::task::LocalSet;

pub const SAVE_DELAY: Duration = Duration::from_millis(2000);

/// Drive `future` inside a `LocalSet` so sessions can spawn their tasks.
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

/// Let every spawned task run until it blocks again. Does not move the
/// (paused) clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Move the paused clock forward and let timers and tasks react.
pub async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        autosave_delay: SAVE_DELAY,
        ..SessionConfig::default()
    }
}

pub fn quiet_config() -> SessionConfig {
    SessionConfig {
        autosave_enabled: false,
        ..session_config()
    }
}

pub fn new_session(store: &Rc<MemoryStore>) -> DesignSession<MemoryStore> {
    DesignSession::new(Rc::clone(store), session_config())
}

pub fn quiet_session(store: &Rc<MemoryStore>) -> DesignSession<MemoryStore> {
    DesignSession::new(Rc::clone(store), quiet_config())
}

/// Two-column design with one field of each interactive kind, unbound.
pub fn sample_design() -> FormDesign {
    let mut design = FormDesign::new();
    design.global.columns = 2;
    design.fields = vec![
        FieldDescriptor::new(FieldKind::Text, "name").with_label("Name"),
        FieldDescriptor::new(FieldKind::Checkbox, "agree").with_label("Agree"),
        FieldDescriptor::new(FieldKind::Select, "tier")
            .with_label("Tier")
            .with_options(["Bronze", "Silver"]),
        FieldDescriptor::new(FieldKind::Radio, "size")
            .with_label("Size")
            .with_options(["S", "M", "L"]),
        FieldDescriptor::new(FieldKind::Number, "qty").with_label("Quantity"),
    ];
    design
}

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}
