//! List and first command implementations.

use serde_json::Value;

use super::query::list_options;
use super::{print_json, CommandContext, Result};
use crate::cli::QueryArgs;

/// Executes the list command.
pub async fn execute(ctx: &CommandContext, collection: &str, args: &QueryArgs) -> Result<()> {
    let options = list_options(args)?;
    let client = ctx.collections_client()?;
    let rows = client.list::<Value>(collection, options).await?;
    print_json(&rows)
}

/// Executes the first command.
pub async fn execute_first(ctx: &CommandContext, collection: &str, args: &QueryArgs) -> Result<()> {
    let options = list_options(args)?;
    let client = ctx.collections_client()?;
    let row = client.first::<Value>(collection, options).await?;
    print_json(&row)
}
