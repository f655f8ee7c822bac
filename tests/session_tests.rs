use std::rc::Rc;

use form_designer::design::design_model::LayoutMode;
use form_designer::document::serializer::{deserialize, serialize};
use form_designer::error::DesignerError;
use form_designer::field::control::{CommitEvent, ControlValue};
use form_designer::field::field_model::{FieldKind, Position};
use form_designer::session::editor::{DesignSession, SessionConfig};
use form_designer::store::adapter::PERSISTENCE_ADDRESS;
use form_designer::store::memory::MemoryStore;

mod common;
use crate::common::utils::{quiet_config, quiet_session, run_local, sample_design, settle};

// ============================================================================
// Editing
// ============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn new_fields_get_kind_defaults() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);

        let tier = session.add_field(FieldKind::Select);
        let name = session.add_field(FieldKind::Text);
        let go = session.add_field(FieldKind::Button);

        assert!(tier.starts_with("select_"));
        assert_ne!(tier, name);

        let field = session.field(&tier).unwrap();
        assert_eq!(field.options, vec!["Option 1", "Option 2"]);
        assert!(session.field(&name).unwrap().options.is_empty());
        assert_eq!(
            session.control(&tier).unwrap().value,
            ControlValue::Choice(Some("Option 1".into()))
        );
        assert_eq!(
            session.control(&go).unwrap().value,
            ControlValue::Label(session.field(&go).unwrap().label)
        );
        assert_eq!(session.design().fields.len(), 3);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn update_field_clamps_span_and_keeps_identity() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);
        session.set_columns(2);
        let name = session.add_field(FieldKind::Text);
        session.bind(&name, "Sheet1!A1", false).await.unwrap();

        session
            .update_field(&name, |f| {
                f.id = "hijacked".into();
                f.label = "Full name".into();
                f.layout.col_span = 9;
                f.binding = None;
            })
            .unwrap();

        let field = session.field(&name).unwrap();
        assert_eq!(field.label, "Full name");
        assert_eq!(field.layout.col_span, 2);
        assert_eq!(field.bound_address(), Some("Sheet1!A1"), "bind() owns bindings");
        assert!(session.field("hijacked").is_none());

        let err = session.update_field("nope", |_| {}).unwrap_err();
        assert!(matches!(err, DesignerError::UnknownField(_)));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn kind_edit_is_ignored_and_binding_keeps_syncing() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);
        let name = session.add_field(FieldKind::Text);
        session.bind(&name, "Sheet1!A1", true).await.unwrap();
        settle().await;

        session
            .update_field(&name, |f| {
                f.kind = FieldKind::Checkbox;
                f.label = "Name".into();
            })
            .unwrap();

        let field = session.field(&name).unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert_eq!(field.label, "Name");
        assert_eq!(session.control(&name).unwrap().kind, FieldKind::Text);

        // store -> control still decodes as text
        assert_eq!(store.set_external("Sheet1!A1", "Ada"), 1);
        settle().await;
        assert_eq!(
            session.control(&name).unwrap().value,
            ControlValue::Text("Ada".into())
        );

        // control -> store still accepts the text commit event
        session
            .commit_control(&name, ControlValue::Text("Grace".into()), CommitEvent::Input)
            .unwrap();
        settle().await;
        let writes = store.writes_to("Sheet1!A1");
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].value, "Grace");
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn heading_caption_follows_label() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);
        let title = session.add_field(FieldKind::Heading);

        session.update_field(&title, |f| f.label = "Welcome".into()).unwrap();
        assert_eq!(
            session.control(&title).unwrap().value,
            ControlValue::Label("Welcome".into())
        );
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn set_columns_clamps_every_span() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());
        let ids: Vec<String> = session.design().fields.iter().map(|f| f.id.clone()).collect();
        for (i, id) in ids.iter().enumerate() {
            session
                .update_field(id, |f| f.layout.col_span = i as u32)
                .unwrap();
        }

        session.set_columns(4);
        let spans: Vec<u32> = session.design().fields.iter().map(|f| f.layout.col_span).collect();
        // span 0 clamps up to 1; assigned spans were already clamped to 2 columns
        assert_eq!(spans, vec![1, 1, 2, 2, 2]);

        session.set_columns(1);
        assert!(session.design().fields.iter().all(|f| f.layout.col_span == 1));

        session.set_columns(0);
        assert_eq!(session.design().global.columns, 1);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn move_field_reorders() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());

        session.move_field("qty", 0).unwrap();
        session.move_field("name", 99).unwrap();
        let order: Vec<String> = session.design().fields.iter().map(|f| f.id.clone()).collect();
        assert_eq!(order, vec!["qty", "agree", "tier", "size", "name"]);

        assert!(matches!(
            session.move_field("ghost", 0).unwrap_err(),
            DesignerError::UnknownField(_)
        ));
    })
    .await;
}

// ============================================================================
// Layout modes
// ============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn switching_to_free_places_fields_at_their_cells() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());

        session.set_layout_mode(LayoutMode::Free);
        let design = session.design();
        let positions: Vec<Option<Position>> =
            design.fields.iter().map(|f| f.layout.position).collect();

        // width 900, padding 16, two columns of 434px, rows of 64px
        assert_eq!(positions[0], Some(Position::new(16, 16)));
        assert_eq!(positions[1], Some(Position::new(450, 16)));
        assert_eq!(positions[2], Some(Position::new(16, 80)));
        assert_eq!(positions[4], Some(Position::new(16, 144)));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn switching_back_to_flow_drops_positions() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());

        session.set_layout_mode(LayoutMode::Free);
        session.set_layout_mode(LayoutMode::Flow);
        assert!(session.design().fields.iter().all(|f| f.layout.position.is_none()));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn placement_snaps_to_grid_when_asked() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);
        session.set_layout_mode(LayoutMode::Free);

        let a = session.add_field_at(FieldKind::Text, Position::new(37, 5), true);
        let b = session.add_field_at(FieldKind::Text, Position::new(37, 5), false);
        assert_eq!(session.field(&a).unwrap().layout.position, Some(Position::new(36, 0)));
        assert_eq!(session.field(&b).unwrap().layout.position, Some(Position::new(37, 5)));

        session.update_global(|g| g.grid_size = 20);
        session.move_field_to(&b, Position::new(51, 69), true).unwrap();
        assert_eq!(session.field(&b).unwrap().layout.position, Some(Position::new(60, 60)));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn flow_layout_keeps_no_positions_and_round_trips() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);

        let a = session.add_field_at(FieldKind::Text, Position::new(40, 10), false);
        let b = session.add_field(FieldKind::Email);
        session.move_field_to(&b, Position::new(100, 200), true).unwrap();
        session
            .update_field(&a, |f| f.layout.position = Some(Position::new(5, 5)))
            .unwrap();
        assert!(matches!(
            session.move_field_to("ghost", Position::new(0, 0), false).unwrap_err(),
            DesignerError::UnknownField(_)
        ));

        let design = session.design().clone();
        assert!(design.fields.iter().all(|f| f.layout.position.is_none()));
        assert_eq!(deserialize(&serialize(&design).unwrap()).unwrap(), design);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn update_global_cannot_bypass_column_or_layout_rules() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());

        session.update_global(|g| {
            g.background_color = "#eeeeee".into();
            g.columns = 0;
            g.layout = LayoutMode::Free;
        });

        let design = session.design();
        assert_eq!(design.global.background_color, "#eeeeee");
        assert_eq!(design.global.columns, 2);
        assert_eq!(design.global.layout, LayoutMode::Flow);
    })
    .await;
}

// ============================================================================
// Delete and clear
// ============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn delete_detaches_bound_control() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);
        let tier = session.add_field(FieldKind::Select);
        session.bind(&tier, "Sheet1!B2", true).await.unwrap();
        settle().await;
        assert_eq!(store.subscription_count(), 1);

        let removed = session.delete_field(&tier).unwrap();
        assert_eq!(removed.id, tier);
        assert_eq!(store.subscription_count(), 0);
        assert!(!session.is_attached(&tier));
        assert_eq!(store.set_external("Sheet1!B2", "Gold"), 0);

        assert!(matches!(
            session.delete_field(&tier).unwrap_err(),
            DesignerError::UnknownField(_)
        ));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn clear_keeps_global_settings() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());
        session.update_global(|g| g.background_color = "#123456".into());
        session.bind("tier", "Sheet1!B2", true).await.unwrap();
        settle().await;

        session.clear();

        let design = session.design();
        assert!(design.fields.is_empty());
        assert_eq!(design.global.columns, 2);
        assert_eq!(design.global.background_color, "#123456");
        assert_eq!(store.subscription_count(), 0);
        assert!(session.registry().is_empty());
    })
    .await;
}

// ============================================================================
// Import / export
// ============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn malformed_import_leaves_design_untouched() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());
        let before = session.export().unwrap();

        let err = session.import("{\"global\": {}}").await.unwrap_err();
        assert!(matches!(err, DesignerError::MalformedDocument(_)));
        let err = session.import("garbage").await.unwrap_err();
        assert!(matches!(err, DesignerError::MalformedDocument(_)));

        let duplicated = r#"{"global": {}, "nodes": [
            {"type": "text", "meta": {"id": "a", "binding": {"address": "S!A1", "listen": true}}},
            {"type": "text", "meta": {"id": "a", "binding": {"address": "S!B1", "listen": true}}}]}"#;
        let err = session.import(duplicated).await.unwrap_err();
        assert!(matches!(err, DesignerError::MalformedDocument(_)));
        assert_eq!(store.subscription_count(), 0);

        assert_eq!(session.export().unwrap(), before);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn import_replaces_design_and_reattaches_bindings() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        store.insert("Sheet1!B2", "Gold");

        let mut incoming = sample_design();
        incoming.fields[2] = incoming.fields[2].clone().with_binding("Sheet1!B2", true);
        incoming.fields[1] = incoming.fields[1].clone().with_binding("Sheet1!C3", false);
        let text = serialize(&incoming).unwrap();

        let mut session = quiet_session(&store);
        let old = session.add_field(FieldKind::Text);
        session.bind(&old, "Sheet1!Z1", true).await.unwrap();
        settle().await;

        session.import(&text).await.unwrap();
        settle().await;

        assert!(session.field(&old).is_none());
        assert_eq!(session.design().fields.len(), 5);
        assert_eq!(session.attached_count(), 2);
        assert_eq!(store.subscription_count(), 1, "only the listening binding subscribes");
        assert_eq!(store.set_external("Sheet1!Z1", "x"), 0);

        // initial pull after subscribing
        assert_eq!(
            session.control("tier").unwrap().value,
            ControlValue::Choice(Some("Gold".into()))
        );

        session
            .commit_control("agree", ControlValue::Checked(true), CommitEvent::Change)
            .unwrap();
        settle().await;
        assert_eq!(store.value("Sheet1!C3").as_deref(), Some("TRUE"));
    })
    .await;
}

// ============================================================================
// Persistence location
// ============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn load_from_empty_store_reports_nothing() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut session = quiet_session(&store);
        assert!(!session.load_from_store().await.unwrap());
        assert!(session.design().fields.is_empty());
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn saved_design_loads_into_new_session() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        let mut first = DesignSession::with_design(Rc::clone(&store), sample_design(), SessionConfig::default());
        first.bind("size", "Sheet1!E5", true).await.unwrap();
        first.save_now().await.unwrap();
        first.shutdown().await;

        store.insert("Sheet1!E5", "L");
        let mut second = quiet_session(&store);
        assert!(second.load_from_store().await.unwrap());
        settle().await;

        assert_eq!(*second.design(), sample_design_with_size_binding());
        assert_eq!(
            second.control("size").unwrap().value,
            ControlValue::Choice(Some("L".into()))
        );
        assert_eq!(store.reads_of(PERSISTENCE_ADDRESS), 1);
    })
    .await;
}

fn sample_design_with_size_binding() -> form_designer::design::design_model::FormDesign {
    let mut design = sample_design();
    design.fields[3] = design.fields[3].clone().with_binding("Sheet1!E5", true);
    design
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unreadable_stored_design_keeps_current_one() {
    run_local(async {
        let store = Rc::new(MemoryStore::new());
        store.insert(PERSISTENCE_ADDRESS, "{ truncated");

        let mut session = DesignSession::with_design(Rc::clone(&store), sample_design(), quiet_config());
        let err = session.load_from_store().await.unwrap_err();
        assert!(matches!(err, DesignerError::MalformedDocument(_)));
        assert_eq!(*session.design(), sample_design());

        store.fail_reads(true);
        let err = session.load_from_store().await.unwrap_err();
        assert!(matches!(err, DesignerError::BindingReadFailed { .. }));
    })
    .await;
}
