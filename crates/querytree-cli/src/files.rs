use crate::config::ProjectConfig;
use querytree::{Query, Schema};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn expand_globs(project: &ProjectConfig, patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: BTreeSet<PathBuf> = BTreeSet::new();

    for p in patterns {
        let resolved = project.resolve_path(p);
        let pattern = resolved.to_string_lossy().to_string();

        let mut matched_any = false;
        for entry in glob::glob(&pattern)
            .map_err(|e| anyhow::anyhow!("invalid glob pattern {pattern}: {e}"))?
        {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error for {pattern}: {e}"))?;
            if path.is_file() {
                matched_any = true;
                files.insert(path);
            }
        }

        if !matched_any {
            anyhow::bail!("glob pattern matched no files: {p}");
        }
    }

    Ok(files.into_iter().collect())
}

pub fn load_schema(path: &Path) -> anyhow::Result<Arc<Schema>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read schema {}: {e}", path.display()))?;
    let schema = Schema::from_json(&raw)
        .map_err(|e| anyhow::anyhow!("failed to parse schema {}: {e}", path.display()))?;
    tracing::debug!(
        target: "querytree.cli",
        path = %path.display(),
        tables = schema.len(),
        "schema loaded"
    );
    Ok(Arc::new(schema))
}

pub fn read_query(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read query {}: {e}", path.display()))
}

pub fn load_query(schema: Arc<Schema>, path: &Path) -> anyhow::Result<Query> {
    let raw = read_query(path)?;
    Query::from_json(schema, &raw)
        .map_err(|e| anyhow::anyhow!("failed to load query {}: {e}", path.display()))
}
