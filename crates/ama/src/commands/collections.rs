//! Collections command implementation.

use atmyapp_local_rs::CollectionsClient;

use super::{print_json, CommandContext, Result};

/// Lists the collections held by the local snapshot. Works in every mode and
/// never touches the network.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let client = CollectionsClient::from_config(ctx.config.collections.clone(), None);
    let names = client.local_collections().await?;
    print_json(&names)
}
