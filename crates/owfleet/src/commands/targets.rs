//! `owfleet targets`: provisioned devices addressable by org and venue.

use tabled::Tabled;

use owfleet_core::{DataCache, ProvData, Target, fetch};

use crate::cli::{GlobalOpts, TargetsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Org")]
    org: String,
    #[tabled(rename = "Venue")]
    venue: String,
}

impl From<&Target> for TargetRow {
    fn from(t: &Target) -> Self {
        Self {
            mac: t.mac.to_string(),
            name: t.name.clone(),
            model: t.model.clone(),
            org: t.org.clone(),
            venue: t.venue.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: TargetsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, config, session) = util::open_session(global, &args.deployment).await?;
    let client = session.client();
    let cache = DataCache::new(&config.cache_dir, &config.name, config.cache_ttl);

    let prov = ProvData::load(client, &cache, args.cached, config.fetch).await?;
    let devices = fetch::load_devices(client, &cache, args.cached, config.fetch).await?;
    let targets = prov.matching_targets(
        &devices,
        args.filter.org.as_deref(),
        args.filter.venue.as_deref(),
        !args.all,
    );

    let out = output::render_list(global.output, &targets, |t| TargetRow::from(t), |t| {
        t.mac.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
