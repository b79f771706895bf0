//! Firebase probe command: `appforge probe`.

use std::path::Path;

use anyhow::{Result, bail};
use console::style;

use appforge::config::Config;
use appforge::probe::{FirebaseEndpoints, FirebaseProbe, ProbeKind};

use crate::{Cli, ProbeTarget};

pub async fn cmd_probe(cli: &Cli, project_dir: &Path, target: ProbeTarget) -> Result<()> {
    let config = Config::load(project_dir, cli.config.as_deref())?;
    let firebase = &config.toml.firebase;

    let kinds: Vec<ProbeKind> = match target {
        ProbeTarget::Auth => vec![ProbeKind::Auth],
        ProbeTarget::Firestore => vec![ProbeKind::Firestore],
        ProbeTarget::Storage => vec![ProbeKind::Storage],
        ProbeTarget::Functions => vec![ProbeKind::Functions],
        ProbeTarget::All => ProbeKind::ALL.to_vec(),
    };

    println!();
    println!(
        "Firebase probes ({}, project {})",
        style(firebase.environment).cyan(),
        firebase.project_id
    );
    println!();

    let probe = FirebaseProbe::new(FirebaseEndpoints::from_config(firebase));
    let mut failed = 0;
    for kind in kinds {
        let report = probe.run(kind).await;
        if !report.is_success() {
            failed += 1;
        }
        println!("  {}", report);
    }
    println!();

    if failed > 0 {
        bail!("{} probe(s) failed", failed);
    }
    Ok(())
}
