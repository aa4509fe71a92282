use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Sql,
    Model,
    Check,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Sql(RenderArgs),
    Model(RenderArgs),
    Check(CheckArgs),
}

#[derive(Debug, Clone)]
pub struct RenderArgs {
    pub query: PathBuf,
    pub schema: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub config: PathBuf,
    pub schema: Option<PathBuf>,
    pub deny_warnings: bool,
    pub files: Vec<PathBuf>,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "sql" => parse_render(HelpTopic::Sql, it.map(|s| s.as_str())),
        "model" => parse_render(HelpTopic::Model, it.map(|s| s.as_str())),
        "check" => parse_check(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// `sql` and `model` share their arguments: one query file and a schema.
fn parse_render<'a>(
    topic: HelpTopic,
    mut it: impl Iterator<Item = &'a str>,
) -> anyhow::Result<Command> {
    let mut query: Option<PathBuf> = None;
    let mut schema: Option<PathBuf> = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(topic)),
            "--schema" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--schema requires a value");
                };
                schema = Some(PathBuf::from(v));
            }
            _ if token.starts_with("--schema=") => {
                schema = Some(PathBuf::from(token.trim_start_matches("--schema=")));
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if query.is_some() {
                    anyhow::bail!("unexpected argument: {other}");
                }
                query = Some(PathBuf::from(other));
            }
        }
    }

    let Some(query) = query else {
        anyhow::bail!("missing <QUERY> file");
    };
    let Some(schema) = schema else {
        anyhow::bail!("--schema is required");
    };

    let args = RenderArgs { query, schema };
    Ok(match topic {
        HelpTopic::Model => Command::Model(args),
        _ => Command::Sql(args),
    })
}

fn parse_check<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("querytree.toml");
    let mut schema: Option<PathBuf> = None;
    let mut deny_warnings = false;
    let mut files: Vec<PathBuf> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Check)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--schema" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--schema requires a value");
                };
                schema = Some(PathBuf::from(v));
            }
            _ if token.starts_with("--schema=") => {
                schema = Some(PathBuf::from(token.trim_start_matches("--schema=")));
            }
            "--deny-warnings" => deny_warnings = true,
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => files.push(PathBuf::from(other)),
        }
    }

    Ok(Command::Check(CheckArgs {
        config,
        schema,
        deny_warnings,
        files,
    }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
querytree - render and check visual-editor query files

USAGE:
  querytree <COMMAND> [OPTIONS]

COMMANDS:
  sql           Print the SQL text of a query file
  model         Print the canonical JSON of a query file
  check         Validate query files against a schema

Run `querytree <command> --help` for more.

ENVIRONMENT:
  QUERYTREE_LOG         Log filter (default: warn)"
            );
        }
        HelpTopic::Sql => {
            println!(
                "\
USAGE:
  querytree sql <QUERY.json> --schema <SCHEMA.json>

OPTIONS:
  --schema <FILE>       Schema JSON the query is loaded against
  -h, --help            Print help"
            );
        }
        HelpTopic::Model => {
            println!(
                "\
USAGE:
  querytree model <QUERY.json> --schema <SCHEMA.json>

OPTIONS:
  --schema <FILE>       Schema JSON the query is loaded against
  -h, --help            Print help"
            );
        }
        HelpTopic::Check => {
            println!(
                "\
USAGE:
  querytree check [OPTIONS] [FILES...]

Without FILES the query globs of the config file are checked.

OPTIONS:
  --config <FILE>       Config file path (default: querytree.toml)
  --schema <FILE>       Schema JSON (overrides the config's schema)
  --deny-warnings       Treat warnings as errors
  -h, --help            Print help"
            );
        }
    }
}
