#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

use anyhow::Result;
use shutup::app::App;
use shutup::config::Config;
use shutup::logging::setup_logging;
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let config = Config::load()?;
    info!(?config, "Configuration loaded");

    let mut app = App::new(config)?;
    info!("Starting game loop ({:?})", shutup::constants::LOOP_TIME);
    while app.run() {}

    info!("Goodbye");
    Ok(())
}
