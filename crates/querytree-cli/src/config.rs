use querytree::ValidationConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_dir: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let config_dir = config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let raw = std::fs::read_to_string(config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        let file = ConfigFile::parse(&raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to load config file {}: {e:#}",
                config_path.display()
            )
        })?;

        Ok(Self { config_dir, file })
    }

    pub fn resolve_path(&self, p: impl AsRef<Path>) -> PathBuf {
        let p = p.as_ref();
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.config_dir.join(p)
        }
    }

    pub fn schema_path(&self) -> Option<PathBuf> {
        self.file.schema.as_ref().map(|s| self.resolve_path(s))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub schema: Option<String>,

    #[serde(default)]
    pub queries: Vec<String>,

    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub deny_warnings: bool,
    #[serde(default = "default_true")]
    pub require_not_null_columns: bool,
    #[serde(default = "default_true")]
    pub report_ambiguous_columns: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            deny_warnings: false,
            require_not_null_columns: true,
            report_ambiguous_columns: true,
        }
    }
}

impl CheckConfig {
    pub fn validation(&self) -> ValidationConfig {
        ValidationConfig::new()
            .with_required_columns(self.require_not_null_columns)
            .with_ambiguity_check(self.report_ambiguous_columns)
    }
}

impl ConfigFile {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile =
            toml::from_str(raw).map_err(|e| anyhow::anyhow!("invalid TOML: {e}"))?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        if let Some(schema) = self.schema.as_mut() {
            *schema = expand_env_vars(schema)?;
        }
        for q in &mut self.queries {
            *q = expand_env_vars(q)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim() != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }
        if let Some(schema) = &self.schema {
            if schema.trim().is_empty() {
                anyhow::bail!("schema must not be empty");
            }
        }
        if self.queries.iter().any(|q| q.trim().is_empty()) {
            anyhow::bail!("queries must not contain empty patterns");
        }
        Ok(())
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = std::env::var(&key)
                .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
