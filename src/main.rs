use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;

use geotrace::config::Config;
use geotrace::map::open_in_browser;
use geotrace::traceroute::trace_route;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let target = match &config.target {
        Some(target) => target.clone(),
        None => prompt_target().context("failed to read the target domain")?,
    };

    let map_path = trace_route(&config, &target)
        .with_context(|| format!("tracing the route to {target} failed"))?;
    println!("\nMap written to {}", map_path.display());

    if !config.no_open {
        if let Err(e) = open_in_browser(&map_path) {
            log::warn!("could not open a browser: {e}");
        }
    }
    Ok(())
}

fn prompt_target() -> Result<String> {
    println!("Enter a domain:");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let target = line.trim();
    if target.is_empty() {
        bail!("no target domain given");
    }
    Ok(target.to_owned())
}
