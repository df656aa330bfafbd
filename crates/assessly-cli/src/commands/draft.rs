//! The `assessly draft` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use assessly_client::{create_draft_store, load_config_from};
use assessly_core::model::AssessmentId;
use assessly_core::results::option_label;

pub fn show(assessment: String, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_draft_store(&config);
    let id = AssessmentId::new(assessment);

    let Some(stored) = store.inspect(&id)? else {
        println!("No saved draft for '{id}'.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stored)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Question", "Answer"]);
    for (question_id, option) in &stored.answers {
        table.add_row(vec![
            Cell::new(question_id.as_str()),
            Cell::new(option_label(*option)),
        ]);
    }

    println!("Draft for '{id}'");
    println!("{table}");
    println!(
        "{} answered, revision {}, updated {}",
        stored.answers.len(),
        stored.revision,
        stored.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

pub fn clear(assessment: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_draft_store(&config);
    let id = AssessmentId::new(assessment);

    if store.inspect(&id)?.is_none() {
        println!("No saved draft for '{id}'.");
        return Ok(());
    }
    store.clear(&id);
    println!("Cleared draft for '{id}'.");
    Ok(())
}
