use std::path::PathBuf;

use argh::FromArgs;
use dynmask::{run_pipeline, Config, StageKind};

/// Builds object trajectories and renders per-camera dynamic masks
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration
    #[argh(option, short = 'c')]
    config: PathBuf,

    /// run only this stage (track, dynamic_mask); can be repeated
    #[argh(option, short = 's')]
    stage: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();
    let config = Config::from_file(&args.config)?;

    let stages = StageKind::select(&config, &args.stage)?;
    if stages.is_empty() {
        log::warn!("no stage enabled in {}", args.config.display());
        return Ok(());
    }

    let summary = run_pipeline(&config, &stages)?;
    if summary.num_issues() > 0 {
        log::warn!(
            "finished with {} failed units, see the reports.json files under {}",
            summary.num_issues(),
            config.output.display()
        );
    }
    Ok(())
}
