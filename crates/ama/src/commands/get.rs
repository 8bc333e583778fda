//! Get and many command implementations.

use atmyapp_api_rs::collections::ListOptions;
use serde_json::Value;

use super::query::apply_output;
use super::{print_json, CommandContext, Result};
use crate::cli::OutputArgs;

/// Executes the get command.
pub async fn execute(ctx: &CommandContext, collection: &str, id: &str, output: &OutputArgs) -> Result<()> {
    let options = apply_output(ListOptions::new(), output);
    let client = ctx.collections_client()?;
    let row = client.get_by_id::<Value>(collection, id, options).await?;
    print_json(&row)
}

/// Executes the many command.
pub async fn execute_many(
    ctx: &CommandContext,
    collection: &str,
    ids: &[String],
    output: &OutputArgs,
) -> Result<()> {
    let options = apply_output(ListOptions::new(), output);
    let client = ctx.collections_client()?;
    let rows = client
        .get_many_by_ids::<Value, _, _>(collection, ids.iter().map(String::as_str), options)
        .await?;
    print_json(&rows)
}
