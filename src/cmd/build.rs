//! Build submission command: `appforge build`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};

use appforge::backend::HttpBuildBackend;
use appforge::config::Config;
use appforge::orchestrator::{BuildInput, BuildOrchestrator, UiState};
use appforge::progress::ProgressAnimator;
use appforge::ui::BuildUI;
use appforge::ui::icons::IMAGE;
use appforge::validate::{MAX_APP_NAME_LEN, is_valid_app_name};

use crate::Cli;

pub struct BuildArgs {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Vec<PathBuf>,
    pub model: Option<String>,
    pub referrer: Option<String>,
}

pub async fn cmd_build(cli: &Cli, project_dir: &Path, args: BuildArgs) -> Result<()> {
    let config = Config::load(project_dir, cli.config.as_deref())?;
    let settings = &config.toml;

    let app_name = match args.name {
        Some(name) => name,
        None if cli.yes => String::new(),
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("App name")
            .validate_with(|input: &String| -> Result<(), String> {
                if is_valid_app_name(input) {
                    Ok(())
                } else {
                    Err(format!(
                        "lowercase letters, digits and hyphens only, max {} characters",
                        MAX_APP_NAME_LEN
                    ))
                }
            })
            .interact_text()
            .context("Failed to read app name")?,
    };

    let description = match args.description {
        Some(description) => description,
        None if cli.yes => String::new(),
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Describe your app")
            .interact_text()
            .context("Failed to read description")?,
    };

    let model = match args.model {
        Some(model) => model,
        None if cli.yes || settings.build.models.len() < 2 => settings.build.default_model.clone(),
        None => {
            let models = &settings.build.models;
            let default = models
                .iter()
                .position(|m| m == &settings.build.default_model)
                .unwrap_or(0);
            let picked = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Model")
                .items(models)
                .default(default)
                .interact()
                .context("Failed to read model selection")?;
            models[picked].clone()
        }
    };
    if !settings.build.models.is_empty() && !settings.build.models.contains(&model) {
        tracing::warn!(model = %model, "model is not in build.models; sending anyway");
    }

    let animator = ProgressAnimator::default();
    let ui = Arc::new(BuildUI::new(animator.steps(), cli.verbose));
    ui.print_header(&app_name, &model, args.images.len());
    if cli.verbose {
        for path in &args.images {
            println!("  {}{}", IMAGE, style(path.display()).dim());
        }
    }

    let backend = HttpBuildBackend::with_timeout(settings.backend.request_timeout())?;
    let mut orchestrator =
        BuildOrchestrator::new(backend, settings.backend.endpoints(), settings.backend.page_url()?)
            .with_animator(animator)
            .with_model_api(settings.build.model_api.clone())
            .with_observer(ui);
    orchestrator.set_referrer(args.referrer.or_else(|| settings.backend.referrer.clone()));

    let input = BuildInput {
        app_name,
        description,
        images: args.images,
        model_id: model,
    };

    let finished = tokio::select! {
        state = orchestrator.submit_build(input) => Some(state.clone()),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        None => {
            orchestrator.reset_build();
            bail!("Build interrupted");
        }
        Some(UiState::Complete { link }) => {
            println!("{}", link);
            Ok(())
        }
        Some(UiState::Error { message }) => bail!("Build failed: {}", message),
        Some(other) => bail!("Build ended in unexpected state: {}", other),
    }
}
