//! Configuration view and validation commands: `appforge config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(
    project_dir: &std::path::Path,
    explicit: Option<&std::path::Path>,
    command: Option<ConfigCommands>,
) -> Result<()> {
    use appforge::config::{AppForgeToml, Config};

    let config_path = explicit
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| Config::project_path(project_dir));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("appforge Configuration");
            println!("======================");
            println!();

            let config = Config::load(project_dir, explicit)?;
            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => {
                    println!("No appforge.toml found at {}", config_path.display());
                    println!("Using defaults.");
                }
            }
            println!();

            let toml = &config.toml;
            println!("[backend]");
            println!("  local_origin = \"{}\"", toml.backend.local_origin);
            println!("  default_port = \"{}\"", toml.backend.default_port);
            println!("  production_origin = \"{}\"", toml.backend.production_origin);
            println!("  default_tenant = \"{}\"", toml.backend.default_tenant);
            println!("  page_url = \"{}\"", toml.backend.page_url);
            if let Some(referrer) = &toml.backend.referrer {
                println!("  referrer = \"{}\"", referrer);
            }
            if let Some(secs) = toml.backend.request_timeout_secs {
                println!("  request_timeout_secs = {}", secs);
            }
            println!();

            println!("[build]");
            println!("  default_model = \"{}\"", toml.build.default_model);
            println!("  model_api = \"{}\"", toml.build.model_api);
            println!("  models = {:?}", toml.build.models);
            println!();

            println!("[firebase]");
            println!("  environment = \"{}\"", toml.firebase.environment);
            println!("  project_id = \"{}\"", toml.firebase.project_id);
            println!("  bucket = \"{}\"", toml.firebase.bucket);
            println!(
                "  ports = auth {} / firestore {} / storage {} / functions {}",
                toml.firebase.auth_port,
                toml.firebase.firestore_port,
                toml.firebase.storage_port,
                toml.firebase.functions_port
            );
            println!();
            println!("(values include environment overrides)");
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => match Config::discover(project_dir) {
                    Some(path) => path,
                    None => {
                        println!("No appforge.toml found. Using defaults (valid).");
                        return Ok(());
                    }
                },
            };

            println!("Config file: {}", path.display());
            let toml = AppForgeToml::load(&path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("appforge.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            let shadowed = match explicit {
                Some(_) => None,
                None => Config::discover(project_dir),
            };

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml = AppForgeToml::default();
            toml.save(&config_path)?;

            println!("Created appforge.toml at {}", config_path.display());
            if let Some(previous) = shadowed {
                println!(
                    "It takes precedence over {}, which was in effect until now.",
                    previous.display()
                );
            }
            println!();
            println!("You can now customize:");
            println!("  - [backend] origins, default tenant, referrer");
            println!("  - [build] default_model and the selectable models");
            println!("  - [firebase] environment, project and emulator ports");
            println!();
        }
    }

    Ok(())
}
