//! Name and endpoint inspection commands: `appforge check-name`, `appforge resolve`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;

use appforge::api_config::resolve_api_config;
use appforge::config::Config;
use appforge::ui::icons::CHECK;
use appforge::validate::{MAX_APP_NAME_LEN, is_valid_app_name};

use crate::Cli;

pub fn cmd_check_name(name: &str) -> Result<()> {
    if !is_valid_app_name(name) {
        bail!(
            "'{}' is not a valid app name: use lowercase letters, digits and hyphens, \
             starting with a letter or digit (max {} characters)",
            name,
            MAX_APP_NAME_LEN
        );
    }
    println!("{}{} is a valid app name", CHECK, style(name).green());
    Ok(())
}

pub fn cmd_resolve(cli: &Cli, project_dir: &Path, referrer: Option<&str>) -> Result<()> {
    let config = Config::load(project_dir, cli.config.as_deref())?;
    let backend = &config.toml.backend;
    let referrer = referrer.or(backend.referrer.as_deref());

    let api = resolve_api_config(referrer, &backend.page_url()?, &backend.endpoints());
    let json = serde_json::to_string_pretty(&api).context("Failed to serialize API config")?;
    println!("{}", json);
    Ok(())
}
