use std::rc::Rc;

use tracing::info;

use crate::autosave::scheduler::SaveStatus;
use crate::design::design_model::FormDesign;
use crate::design::placement::flow_placement;
use crate::document::serializer::{deserialize, document_fingerprint, serialize};
use crate::error::DesignerError;
use crate::field::codec::Applied;
use crate::field::control::ControlValue;
use crate::session::editor::{DesignSession, SessionConfig};
use crate::store::file_store::FileStore;

// ============================================================================
// init subcommand
// ============================================================================

pub fn cmd_init(output: &str, columns: u32) -> Result<(), Box<dyn std::error::Error>> {
    let design = FormDesign::starter(columns);
    let text = serialize(&design)?;
    write_file(output, &text)?;
    println!(
        "Wrote starter design with {} fields to {}",
        design.fields.len(),
        output
    );
    Ok(())
}

// ============================================================================
// inspect subcommand
// ============================================================================

pub fn cmd_inspect(doc: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_file(doc)?;
    let design = deserialize(&text)?;
    print!("{}", format_inspection(&design, &document_fingerprint(&text)));
    Ok(())
}

/// Human-readable summary of a design.
pub fn format_inspection(design: &FormDesign, fingerprint: &str) -> String {
    let g = &design.global;
    let mut out = String::new();

    out.push_str(&format!("Fingerprint: {}\n", fingerprint));
    out.push_str(&format!(
        "Layout: {} ({} columns, width {}px, padding {}px, grid {}px{})\n",
        g.layout.as_str(),
        g.columns,
        g.width,
        g.padding,
        g.grid_size,
        if g.show_grid { ", shown" } else { "" }
    ));
    if !g.background_color.is_empty() {
        out.push_str(&format!("Background: {}\n", g.background_color));
    }

    out.push_str(&format!("Fields ({}):\n", design.fields.len()));
    let cells = flow_placement(&design.fields, g.columns);
    for (field, cell) in design.fields.iter().zip(&cells) {
        out.push_str(&format!(
            "  [r{} c{} x{}] {:<9} {:<24} {}",
            cell.row, cell.column, cell.span, field.kind.as_str(), field.id, field.label
        ));
        if let Some(position) = &field.layout.position {
            out.push_str(&format!(" @({}, {})", position.x, position.y));
        }
        if let Some(binding) = &field.binding {
            out.push_str(&format!(
                " -> {}{}",
                binding.address,
                if binding.listen { " (listening)" } else { "" }
            ));
        }
        out.push('\n');
    }

    out
}

// ============================================================================
// migrate subcommand
// ============================================================================

pub fn cmd_migrate(doc: &str, output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_file(doc)?;
    let design = deserialize(&text)?;
    let upgraded = serialize(&design)?;
    let target = output.unwrap_or(doc);
    write_file(target, &upgraded)?;
    println!("Migrated {} -> {}", doc, target);
    Ok(())
}

// ============================================================================
// save / load subcommands
// ============================================================================

/// Persist a document into a file store; returns the saved fingerprint.
pub async fn cmd_save(
    doc: &str,
    store: &str,
    config: &SessionConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let text = read_file(doc)?;
    let mut session = DesignSession::new(Rc::new(FileStore::new(store)), config.clone());

    session.import(&text).await?;
    session.save_now().await?;

    let fingerprint = match session.current_save_status() {
        SaveStatus::Saved { fingerprint } => fingerprint,
        other => return Err(format!("unexpected save status: {:?}", other).into()),
    };
    session.shutdown().await;

    println!(
        "Saved {} to {} at {}",
        doc, store, config.persistence_address
    );
    Ok(fingerprint)
}

/// Read the persisted design out of a file store. Returns false when the
/// store holds none.
pub async fn cmd_load(
    store: &str,
    output: Option<&str>,
    config: &SessionConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let quiet = SessionConfig {
        autosave_enabled: false,
        ..config.clone()
    };
    let mut session = DesignSession::new(Rc::new(FileStore::new(store)), quiet);

    if !session.load_from_store().await? {
        eprintln!("No saved design at {} in {}", config.persistence_address, store);
        return Ok(false);
    }

    let text = session.export()?;
    session.shutdown().await;

    match output {
        Some(path) => {
            write_file(path, &text)?;
            info!(path, "wrote loaded design");
        }
        None => println!("{}", text),
    }
    Ok(true)
}

// ============================================================================
// values subcommand
// ============================================================================

pub async fn cmd_values(
    doc: &str,
    store: &str,
    config: &SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let design = deserialize(&read_file(doc)?)?;
    let bound: Vec<(String, String)> = design
        .fields
        .iter()
        .filter_map(|f| f.bound_address().map(|a| (f.id.clone(), a.to_string())))
        .collect();

    if bound.is_empty() {
        println!("No bound fields in {}", doc);
        return Ok(());
    }

    let quiet = SessionConfig {
        autosave_enabled: false,
        ..config.clone()
    };
    let mut session =
        DesignSession::with_design(Rc::new(FileStore::new(store)), design, quiet);

    for (id, address) in &bound {
        let shown = match session.pull_control(id).await {
            Ok(Some(Applied::Updated)) => session
                .control(id)
                .map(|c| describe_value(&c.value))
                .unwrap_or_default(),
            Ok(Some(Applied::ReadOnly)) => "(read-only)".to_string(),
            Ok(Some(Applied::NoMatch)) => "(no matching option)".to_string(),
            Ok(None) => "(unreadable)".to_string(),
            Err(e) => format!("({})", e),
        };
        println!("{:<24} {:<16} {}", id, address, shown);
    }

    session.shutdown().await;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Short text form of a control value.
pub fn describe_value(value: &ControlValue) -> String {
    match value {
        ControlValue::Text(text) => format!("{:?}", text),
        ControlValue::Checked(checked) => checked.to_string(),
        ControlValue::Choice(Some(choice)) => choice.clone(),
        ControlValue::Choice(None) => "(none selected)".to_string(),
        ControlValue::File(Some(name)) => name.clone(),
        ControlValue::File(None) => "(no file)".to_string(),
        ControlValue::Label(label) => label.clone(),
        ControlValue::None => String::new(),
    }
}

fn read_file(path: &str) -> Result<String, DesignerError> {
    std::fs::read_to_string(path).map_err(|source| DesignerError::Io {
        path: path.to_string(),
        source,
    })
}

fn write_file(path: &str, content: &str) -> Result<(), DesignerError> {
    std::fs::write(path, content).map_err(|source| DesignerError::Io {
        path: path.to_string(),
        source,
    })
}
