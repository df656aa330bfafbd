//! The `assessly init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("assessly.toml").exists() {
        println!("assessly.toml already exists, skipping.");
    } else {
        std::fs::write("assessly.toml", SAMPLE_CONFIG)?;
        println!("Created assessly.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set base_url in assessly.toml, or export ASSESSLY_API_URL");
    println!("  2. Export ASSESSLY_API_TOKEN with your access token");
    println!("  3. Run: assessly take --assessment <id>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessly configuration

# Shown in logs only.
# user_id = "learner-42"

[api]
base_url = "http://localhost:8080/api"
token = "${ASSESSLY_API_TOKEN}"
timeout_secs = 30
check_access = true

[drafts]
# "file" keeps drafts across runs; "memory" forgets them on exit.
storage = "file"
# dir = "~/.local/share/assessly/drafts"
"#;
