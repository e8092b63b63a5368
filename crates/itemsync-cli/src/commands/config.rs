use std::env;

use itemsync_core::util::{is_http_url, normalize_text_option};
use itemsync_core::RemoteTarget;

use crate::cli::ConfigCommands;
use crate::commands::common::{merge_sync_config, SyncEnv};
use crate::config_profiles::{default_config_path, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            remote_url,
            probe_url,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            remote_url,
            probe_url,
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    remote_url: Option<String>,
    probe_url: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = apply_config_init(
        &mut config,
        profile_name,
        remote_url,
        probe_url,
        no_activate,
    )?;

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let ready = config
        .profile(&profile_name)
        .and_then(CliProfile::remote_url)
        .is_some();
    if ready {
        println!("Profile '{profile_name}' is ready. Run `itemsync sync`.");
    } else {
        println!("Profile '{profile_name}' is missing: remote_url");
    }
    Ok(())
}

/// Merge explicit values, then environment values, then what the profile
/// already had. Returns the name of the updated profile.
pub fn apply_config_init(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    remote_url: Option<String>,
    probe_url: Option<String>,
    no_activate: bool,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_remote_url = normalize_text_option(remote_url)
        .or_else(|| normalize_text_option(env::var("ITEMSYNC_REMOTE_URL").ok()))
        .or_else(|| existing_profile.remote_url());
    let merged_probe_url = normalize_text_option(probe_url)
        .or_else(|| normalize_text_option(env::var("ITEMSYNC_PROBE_URL").ok()))
        .or_else(|| existing_profile.probe_url());

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(value) = merged_remote_url {
        profile.remote_url = Some(value);
    }
    if let Some(value) = merged_probe_url {
        profile.probe_url = Some(value);
    }

    validate_profile_urls(profile)?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let env = SyncEnv::from_env();

    let config_path = default_config_path().map_err(CliError::Config)?;
    println!("config:      {}", config_path.display());
    println!("profile:     {profile_name}");
    match merge_sync_config(&profile, &env) {
        Some(sync_config) => {
            let target = sync_config.remote_target()?;
            println!("remote:      {}", target.describe());
            println!(
                "probe:       {}",
                sync_config
                    .probe_endpoint()?
                    .unwrap_or_else(|| "(none, file remote)".to_string())
            );
            println!(
                "auth token:  {}",
                if env.auth_token.is_some() { "set" } else { "not set" }
            );
        }
        None => println!("remote:      (not configured)"),
    }
    Ok(())
}

fn validate_profile_urls(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.remote_url() {
        RemoteTarget::parse(&url, None)
            .map_err(|error| CliError::Config(format!("remote_url is invalid: {error}")))?;
    }
    if let Some(url) = profile.probe_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "probe_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}
