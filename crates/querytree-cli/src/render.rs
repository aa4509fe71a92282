use crate::cli::RenderArgs;
use crate::files::{load_query, load_schema};

pub fn run_sql(args: RenderArgs) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let query = load_query(schema, &args.query)?;
    let sql = query
        .to_sql()
        .map_err(|e| anyhow::anyhow!("{}: {e}", args.query.display()))?;
    println!("{sql}");
    Ok(())
}

pub fn run_model(args: RenderArgs) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let query = load_query(schema, &args.query)?;
    let model = query
        .to_model()
        .map_err(|e| anyhow::anyhow!("{}: {e}", args.query.display()))?;
    let json = serde_json::to_string_pretty(&model)
        .map_err(|e| anyhow::anyhow!("failed to serialize {}: {e}", args.query.display()))?;
    println!("{json}");
    Ok(())
}
