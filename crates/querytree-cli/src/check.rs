use crate::cli::CheckArgs;
use crate::config::ProjectConfig;
use crate::files::{expand_globs, load_schema, read_query};
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use querytree::{Location, Query, Schema, ValidationConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub location: Option<Location>,
    pub kind: String,
    pub message: String,
}

impl Finding {
    fn error(location: Option<Location>, kind: impl Into<String>, message: String) -> Self {
        Self {
            severity: Severity::Error,
            location,
            kind: kind.into(),
            message,
        }
    }
}

/// Load one query file and collect everything wrong with it.
///
/// A file that does not load yields a single error. A loaded query reports its
/// validation errors, plus a warning when it can not be rendered yet.
pub fn check_source(schema: Arc<Schema>, raw: &str, config: &ValidationConfig) -> Vec<Finding> {
    match Query::from_json(schema, raw) {
        Ok(query) => check_query(&query, config),
        Err(e) => vec![Finding::error(None, "Load", e.to_string())],
    }
}

pub fn check_query(query: &Query, config: &ValidationConfig) -> Vec<Finding> {
    let mut findings: Vec<Finding> = query
        .validate_with(config)
        .errors()
        .iter()
        .map(|e| Finding::error(Some(e.location), format!("{:?}", e.kind), e.message.clone()))
        .collect();

    if let Err(e) = query.to_sql() {
        findings.push(Finding {
            severity: if e.is_not_ready() {
                Severity::Warning
            } else {
                Severity::Error
            },
            location: None,
            kind: "NotReady".to_string(),
            message: e.to_string(),
        });
    }

    findings
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let project = if args.config.exists() {
        Some(ProjectConfig::load(&args.config)?)
    } else {
        None
    };

    let schema_path = match (&args.schema, &project) {
        (Some(path), _) => path.clone(),
        (None, Some(project)) => match project.schema_path() {
            Some(path) => path,
            None => anyhow::bail!(
                "no schema configured in {}; pass --schema",
                args.config.display()
            ),
        },
        (None, None) => anyhow::bail!(
            "failed to load config {}; pass --schema and query files",
            args.config.display()
        ),
    };
    let schema = load_schema(&schema_path)?;

    let files: Vec<PathBuf> = if !args.files.is_empty() {
        args.files.clone()
    } else {
        let Some(project) = &project else {
            anyhow::bail!("no query files given and no config found");
        };
        if project.file.queries.is_empty() {
            anyhow::bail!(
                "no query files given and {} lists no queries",
                args.config.display()
            );
        }
        expand_globs(project, &project.file.queries)?
    };

    let (deny_warnings, config) = match &project {
        Some(project) => (
            args.deny_warnings || project.file.check.deny_warnings,
            project.file.check.validation(),
        ),
        None => (args.deny_warnings, ValidationConfig::default()),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["File", "Level", "Location", "Kind", "Message"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );

    let mut errors = 0usize;
    let mut warnings = 0usize;
    for file in &files {
        let raw = read_query(file)?;
        let findings = check_source(schema.clone(), &raw, &config);
        tracing::debug!(
            target: "querytree.cli",
            file = %file.display(),
            findings = findings.len(),
            "query checked"
        );

        for finding in findings {
            let (level, color) = match finding.severity {
                Severity::Error => {
                    errors += 1;
                    ("error", Color::Red)
                }
                Severity::Warning => {
                    warnings += 1;
                    ("warning", Color::Yellow)
                }
            };
            table.add_row(vec![
                Cell::new(file.display()),
                Cell::new(level).fg(color),
                Cell::new(finding.location.map(Location::as_str).unwrap_or("-")),
                Cell::new(&finding.kind).fg(Color::DarkGrey),
                Cell::new(&finding.message),
            ]);
        }
    }

    if errors + warnings > 0 {
        println!("{table}");
    }

    let summary = format!(
        "checked {} file(s): {errors} error(s), {warnings} warning(s)",
        files.len()
    );
    if errors > 0 {
        println!("{}", summary.red().bold());
        anyhow::bail!("query check failed");
    }
    if warnings > 0 {
        println!("{}", summary.yellow().bold());
        if deny_warnings {
            anyhow::bail!("query check failed (warnings denied)");
        }
        return Ok(());
    }
    println!("{}", summary.green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        let raw = json!({
            "tables": [{
                "name": "person",
                "columns": [
                    { "name": "id", "type": "integer", "notNull": true, "isPrimary": true },
                    { "name": "name", "type": "text", "notNull": true }
                ]
            }]
        });
        Arc::new(Schema::from_json(&raw.to_string()).unwrap())
    }

    fn check(query: serde_json::Value) -> Vec<Finding> {
        check_source(schema(), &query.to_string(), &ValidationConfig::default())
    }

    #[test]
    fn clean_query_has_no_findings() {
        let findings = check(json!({
            "id": "q",
            "name": "ids",
            "select": { "columns": [{ "expr": { "singleColumn": { "column": "id", "table": "person" } } }] },
            "from": { "first": { "name": "person" } }
        }));
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn unknown_column_is_an_error() {
        let findings = check(json!({
            "id": "q",
            "name": "ages",
            "select": { "columns": [{ "expr": { "singleColumn": { "column": "age", "table": "person" } } }] },
            "from": { "first": { "name": "person" } }
        }));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].location, Some(Location::Select));
        assert_eq!(findings[0].kind, "UnknownColumn");
    }

    #[test]
    fn unfinished_query_is_a_warning() {
        let findings = check(json!({
            "id": "q",
            "name": "draft",
            "select": { "allData": true },
            "from": { "first": { "name": "person" } },
            "where": { "first": { "missing": {} } }
        }));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].kind, "NotReady");
    }

    #[test]
    fn unloadable_file_is_an_error() {
        let findings = check_source(schema(), "{ not json", &ValidationConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].kind, "Load");

        let findings = check(json!({ "id": "q", "name": "nothing" }));
        assert_eq!(findings[0].kind, "Load");
    }
}
