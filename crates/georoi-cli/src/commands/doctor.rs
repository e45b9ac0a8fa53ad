use crate::cli::DoctorArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use console::style;
use georoi_core::config::ConfigSource;
use georoi_core::Settings;
use georoi_geo::ReferenceDataset;
use georoi_imagery::{init_session, Credentials, InitOptions};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct SettingRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

fn source_label(source: ConfigSource) -> &'static str {
    match source {
        ConfigSource::Default => "default",
        ConfigSource::File => ".env",
        ConfigSource::Environment => "environment",
    }
}

pub async fn execute(args: DoctorArgs, env_file: &Path, output: &OutputWriter) -> Result<()> {
    let layered = Settings::layered(env_file)?;
    let rows: Vec<SettingRow> = layered
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| SettingRow {
            key,
            value,
            source: source_label(source).to_string(),
        })
        .collect();

    let mut checks = Vec::new();

    let settings = match layered.resolve() {
        Ok(settings) => {
            checks.push(Check::pass("Settings", "resolved"));
            Some(settings)
        }
        Err(e) => {
            checks.push(Check::fail("Settings", e.to_string()));
            None
        }
    };

    if let Some(settings) = &settings {
        checks.extend(inspect(settings));

        if args.auth {
            let options = InitOptions { interactive: false };
            match init_session(settings, options).await {
                Ok(session) => checks.push(Check::pass(
                    "Earth Engine",
                    format!("session ready as {}", session.credentials().principal()),
                )),
                Err(e) => checks.push(Check::fail("Earth Engine", e.to_string())),
            }
        }
    }

    let passed = checks.iter().filter(|c| c.passed).count();

    if output.is_json() {
        return output.result(serde_json::json!({
            "checks": checks,
            "passed": passed,
            "total": checks.len(),
            "settings": rows,
        }));
    }

    println!("\n{}", style("georoi Health Check").bold().underlined());
    println!("{}", style("═".repeat(60)).dim());

    for check in &checks {
        output.check(check.passed, check.name, &check.detail);
    }

    if args.verbose {
        output.section("Settings");
        output.table(rows);
    }

    println!();
    println!("{}", style("═".repeat(60)).dim());
    let percentage = if checks.is_empty() {
        0
    } else {
        passed * 100 / checks.len()
    };
    let summary = format!("{}/{} checks passed ({}%)", passed, checks.len(), percentage);
    if passed == checks.len() {
        println!("{}", style(summary).green().bold());
    } else {
        println!("{}", style(summary).yellow().bold());
        if !args.auth {
            println!("  → Run: georoi doctor --auth to verify Earth Engine access");
        }
    }
    println!();

    Ok(())
}

/// Offline checks that need no network access
fn inspect(settings: &Settings) -> Vec<Check> {
    let mut checks = Vec::new();

    if settings.ee_project.is_empty() {
        checks.push(Check::fail("Project", "EE_PROJECT is not set"));
    } else {
        checks.push(Check::pass("Project", settings.ee_project.clone()));
    }

    match &settings.ee_key_file {
        Some(path) => match Credentials::from_key_file(path) {
            Ok(credentials) => checks.push(Check::pass(
                "Key file",
                format!("{} ({})", path.display(), credentials.principal()),
            )),
            Err(e) => checks.push(Check::fail("Key file", e.to_string())),
        },
        None => checks.push(Check::pass("Key file", "not set, application default credentials")),
    }

    match ReferenceDataset::load(&settings.rdtr_path) {
        Ok(dataset) => checks.push(Check::pass(
            "Reference",
            format!("{} features from {}", dataset.len(), settings.rdtr_path.display()),
        )),
        Err(e) => checks.push(Check::fail("Reference", e.to_string())),
    }

    let dirs = [
        ("ROI storage", &settings.roi_dir),
        ("Intersections", &settings.intersect_dir),
    ];
    for (name, dir) in dirs {
        if dir.is_dir() {
            checks.push(Check::pass(name, dir.display().to_string()));
        } else {
            checks.push(Check::fail(name, format!("{} does not exist yet", dir.display())));
        }
    }

    checks
}
