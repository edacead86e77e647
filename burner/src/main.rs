use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use cnft_burner::{
    cli::{Cli, Commands},
    config::{parse_pubkey, BurnerConfig},
    run_burn, run_inspect, run_list,
    telemetry::{setup_telemetry, LogOptions},
    BurnSelection,
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_telemetry(&LogOptions::from(&cli.log));
    debug!("Command: {:?}", cli.command);

    match &cli.command {
        Commands::List(args) => {
            let config = Arc::new(BurnerConfig::new_for_list(args)?);
            let owner = match (&args.owner, config.payer_pubkey()) {
                (Some(owner), _) => parse_pubkey("owner", owner)?,
                (None, Some(payer)) => payer,
                (None, None) => return Err(anyhow!("either --owner or --keypair is required")),
            };
            run_list(config, owner, args.delegated, args.json).await?;
        }
        Commands::Inspect(args) => {
            let config = Arc::new(BurnerConfig::new_for_inspect(args)?);
            let asset = parse_pubkey("asset", &args.asset)?;
            run_inspect(config, asset, args.json).await?;
        }
        Commands::Burn(args) => {
            let config = Arc::new(BurnerConfig::new_for_burn(args)?);
            let selection = if args.all {
                BurnSelection::All
            } else {
                let ids = args
                    .assets
                    .iter()
                    .map(|id| parse_pubkey("asset", id))
                    .collect::<Result<Vec<_>, _>>()?;
                let collection = args
                    .collection
                    .as_deref()
                    .map(|c| parse_pubkey("collection", c))
                    .transpose()?;
                if ids.is_empty() && collection.is_none() {
                    return Err(anyhow!("nothing selected: pass --asset, --collection or --all"));
                }
                BurnSelection::Assets { ids, collection }
            };
            let results = run_burn(config, selection, args.json).await?;
            let failed = results.iter().filter(|(_, r)| !r.success).count();
            if failed > 0 {
                return Err(anyhow!("{} of {} burns failed", failed, results.len()));
            }
        }
    }
    Ok(())
}
