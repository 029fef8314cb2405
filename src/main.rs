mod colors;
mod display;

use dialoguer::{Confirm, theme::ColorfulTheme};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use colors::*;
use nova_quotas::{
    AuthProvider, Config, Error, QuotaClassesClient, QuotaSetUpdate, QuotasClient, RestClient,
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show {
        tenant_id: String,
        user_id: Option<String>,
    },
    Defaults {
        tenant_id: String,
    },
    Update {
        tenant_id: String,
        user_id: Option<String>,
        force: bool,
        limits: Vec<(String, String)>,
    },
    Delete {
        tenant_id: String,
        yes: bool,
    },
    ClassShow {
        quota_class_id: String,
    },
    ClassUpdate {
        quota_class_id: String,
        limits: Vec<(String, String)>,
    },
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    command: Command,
    json: bool,
    debug: bool,
    endpoint: Option<String>,
    token: Option<String>,
}

fn parse_args(args: &[String]) -> std::result::Result<CliArgs, String> {
    let mut json = false;
    let mut debug = false;
    let mut yes = false;
    let mut force = false;
    let mut endpoint = None;
    let mut token = None;
    let mut user_id = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--debug" => debug = true,
            "--yes" | "-y" => yes = true,
            "--force" => force = true,
            "--endpoint" => endpoint = Some(flag_value(&mut iter, "--endpoint")?),
            "--token" => token = Some(flag_value(&mut iter, "--token")?),
            "--user" => user_id = Some(flag_value(&mut iter, "--user")?),
            "--help" | "-h" => positional.insert(0, "help"),
            "--version" | "-V" => positional.insert(0, "version"),
            other if other.starts_with('-') => return Err(format!("unknown flag '{other}'")),
            other => positional.push(other),
        }
    }

    let Some((&name, rest)) = positional.split_first() else {
        return Ok(CliArgs {
            command: Command::Help,
            json,
            debug,
            endpoint,
            token,
        });
    };

    let id = |what: &str| -> std::result::Result<String, String> {
        rest.first()
            .map(|s| s.to_string())
            .ok_or_else(|| format!("'{name}' needs a {what}"))
    };
    // For commands that take nothing after the id
    let only_id = |what: &str| -> std::result::Result<String, String> {
        let value = id(what)?;
        match rest.get(1) {
            Some(extra) => Err(format!("'{name}' takes a single {what}, unexpected '{extra}'")),
            None => Ok(value),
        }
    };

    let command = match name {
        "show" => Command::Show {
            tenant_id: only_id("tenant id")?,
            user_id,
        },
        "defaults" => Command::Defaults {
            tenant_id: only_id("tenant id")?,
        },
        "update" => Command::Update {
            tenant_id: id("tenant id")?,
            user_id,
            force,
            limits: parse_limits(rest.get(1..).unwrap_or_default())?,
        },
        "delete" => Command::Delete {
            tenant_id: only_id("tenant id")?,
            yes,
        },
        "class-show" => Command::ClassShow {
            quota_class_id: only_id("quota class id")?,
        },
        "class-update" => Command::ClassUpdate {
            quota_class_id: id("quota class id")?,
            limits: parse_limits(rest.get(1..).unwrap_or_default())?,
        },
        "help" => Command::Help,
        "version" => Command::Version,
        other => return Err(format!("unknown command '{other}'")),
    };

    let nothing_to_update = match &command {
        Command::Update { force, limits, .. } => limits.is_empty() && !force,
        Command::ClassUpdate { limits, .. } => limits.is_empty(),
        _ => false,
    };
    if nothing_to_update {
        return Err("nothing to update, pass one or more key=value limits".to_string());
    }

    Ok(CliArgs {
        command,
        json,
        debug,
        endpoint,
        token,
    })
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> std::result::Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("{flag} needs a value"))
}

fn parse_limits(args: &[&str]) -> std::result::Result<Vec<(String, String)>, String> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("expected key=value, got '{arg}'"))
        })
        .collect()
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("nova_quotas=debug,warn"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nova_quotas=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_usage() {
    println!(
        "{BOLD}nova-quotas{RESET} {DIM}{}{RESET}
Manage compute tenant quotas and quota classes.

{BOLD}USAGE{RESET}
  nova-quotas [--json] [--debug] [--endpoint URL] [--token TOKEN] <command>

{BOLD}COMMANDS{RESET}
  show <tenant> [--user ID]                     Show a tenant's quota set
  defaults <tenant>                             Show the default quota set
  update <tenant> [--user ID] [--force] k=v...  Update quota limits
  delete <tenant> [--yes]                       Revert a tenant to default quotas
  class-show <class>                            Show a quota class set
  class-update <class> k=v...                   Update quota class limits
  help | version

{BOLD}CONFIG{RESET}
  {}
  OS_AUTH_TOKEN overrides auth.token",
        env!("CARGO_PKG_VERSION"),
        Config::path().display()
    );
}

async fn run(cli: CliArgs) -> Result<()> {
    let config = Config::load()?.with_overrides(cli.endpoint, cli.token, cli.debug);
    init_logging(config.logging.debug);

    let auth = AuthProvider::from_config(&config.auth)?;
    let rest = RestClient::new(auth, &config.compute, &config.logging)?;
    let quotas = QuotasClient::from_rest(rest.clone());
    let classes = QuotaClassesClient::from_rest(rest);

    match cli.command {
        Command::Show { tenant_id, user_id } => {
            let response = quotas.get_quota_set(&tenant_id, user_id.as_deref()).await?;
            print_quota_set(cli.json, "Quota set", &response)
        }
        Command::Defaults { tenant_id } => {
            let response = quotas.get_default_quota_set(&tenant_id).await?;
            print_quota_set(cli.json, "Default quota set", &response)
        }
        Command::Update {
            tenant_id,
            user_id,
            force,
            limits,
        } => {
            let mut update = QuotaSetUpdate::new();
            if force {
                update.force = Some(true);
            }
            for (key, value) in &limits {
                update.set(key, value)?;
            }
            let response = quotas
                .update_quota_set(&tenant_id, user_id.as_deref(), &update)
                .await?;
            print_quota_set(cli.json, "Updated quota set", &response)
        }
        Command::Delete { tenant_id, yes } => {
            if !yes && !confirm_delete(&tenant_id)? {
                println!("{}Cancelled{}", DIM, RESET);
                return Ok(());
            }
            let response = quotas.delete_quota_set(&tenant_id).await?;
            info!(tenant_id = %tenant_id, status = response.status, "Quota set deleted");
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!(
                    "{}✓{} Quota set for {} reverted to defaults",
                    GREEN, RESET, tenant_id
                );
            }
            Ok(())
        }
        Command::ClassShow { quota_class_id } => {
            let response = classes.get_quota_class_set(&quota_class_id).await?;
            print_quota_set(cli.json, "Quota class set", &response)
        }
        Command::ClassUpdate {
            quota_class_id,
            limits,
        } => {
            let response = classes
                .update_quota_class_set(&quota_class_id, limits)
                .await?;
            print_quota_set(cli.json, "Updated quota class set", &response)
        }
        Command::Help | Command::Version => Ok(()),
    }
}

fn print_quota_set(
    json: bool,
    title: &str,
    response: &nova_quotas::ApiResponse<nova_quotas::QuotaSet>,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        display::render_quota_set(title, response);
    }
    Ok(())
}

fn confirm_delete(tenant_id: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Delete the quota set of tenant {tenant_id}?"))
        .default(false)
        .interact()
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{}error:{} {}", RED, RESET, message);
            eprintln!("{}Run 'nova-quotas help' for usage{}", DIM, RESET);
            std::process::exit(2);
        }
    };

    match cli.command {
        Command::Help => {
            print_usage();
            return;
        }
        Command::Version => {
            println!("nova-quotas {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        _ => {}
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}error:{} {}", RED, RESET, e);
        if let Some(suggestion) = e.suggestion() {
            eprintln!();
            eprintln!("  {}Tip:{} {}", YELLOW, RESET, suggestion);
        }
        std::process::exit(1);
    }
}
