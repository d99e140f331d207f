//! SPM Solver command line analysis
//!
//! Reads a JSON job `{ "model": ..., "concrete": ..., "settings": ... }` from
//! the file given as first argument (or stdin) and prints the analysis
//! output as JSON.

use std::io::Read;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use spm_solver::prelude::*;

#[derive(Debug, Deserialize)]
struct AnalysisJob {
    model: SpmModel,
    #[serde(default)]
    concrete: Concrete,
    #[serde(default)]
    settings: AnalysisSettings,
}

fn read_job(path: Option<String>) -> Result<AnalysisJob> {
    let json = match path {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?,
        None => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read job from stdin")?;
            json
        }
    };

    serde_json::from_str(&json).context("Invalid analysis job")
}

fn main() -> Result<()> {
    env_logger::init();

    let job = read_job(std::env::args().nth(1))?;
    info!(
        "Loaded model with {} nodes, {} stringers and {} panels",
        job.model.num_nodes(),
        job.model.stringers.len(),
        job.model.panels.len()
    );

    let output = analyze(&job.model, job.concrete, &job.settings).context("Analysis failed")?;
    if let Some(message) = &output.message {
        info!("{}", message);
    }

    println!("{}", output.to_json()?);
    Ok(())
}
