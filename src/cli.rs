use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::config::{MongoConfig, Profile, split_hosts};
use crate::errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Connect and print the database listing.
    List,
    /// Connect and report a single ping.
    Ping { json: bool },
}

pub fn cli() -> Command {
    Command::new("stockmarket-bootstrap")
        .about("Connect to the MongoDB replica set and list its databases")
        .subcommand(Command::new("list").about("Connect and print every database name (default)"))
        .subcommand(
            Command::new("ping")
                .about("Connect and report replica-set health")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the health report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .short('p')
                .help("Deployment profile to start from")
                .value_parser(value_parser!(Profile))
                .global(true),
        )
        .arg(
            Arg::new("uri")
                .long("uri")
                .help("Full connection string, overrides hosts and replica set")
                .value_name("URI")
                .global(true),
        )
        .arg(
            Arg::new("hosts")
                .long("hosts")
                .help("Comma-separated host:port seed list")
                .value_name("HOSTS")
                .global(true),
        )
        .arg(
            Arg::new("replica-set")
                .long("replica-set")
                .help("Replica-set name")
                .value_name("NAME")
                .global(true),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .short('u')
                .value_name("USER")
                .global(true),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .value_name("PASSWORD")
                .global(true),
        )
        .arg(
            Arg::new("auth-source")
                .long("auth-source")
                .help("Database to authenticate against")
                .value_name("DB")
                .global(true),
        )
        .arg(
            Arg::new("app-name")
                .long("app-name")
                .help("Application name reported to the server")
                .value_name("NAME")
                .global(true),
        )
        .arg(
            Arg::new("max-pool-size")
                .long("max-pool-size")
                .help("Caps concurrent pooled connections")
                .value_parser(value_parser!(u32))
                .global(true),
        )
        .arg(
            Arg::new("server-selection-timeout-ms")
                .long("server-selection-timeout-ms")
                .help("Max wait to find a usable replica")
                .value_parser(value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new("socket-timeout-ms")
                .long("socket-timeout-ms")
                .help("Max wait on a single operation")
                .value_parser(value_parser!(u64))
                .global(true),
        )
}

pub fn action(matches: &ArgMatches) -> Action {
    match matches.subcommand() {
        Some(("ping", sub_matches)) => Action::Ping {
            json: sub_matches.get_flag("json"),
        },
        _ => Action::List,
    }
}

/// Resolves the connection config: flags win over `MONGO_*` variables, which win over the profile.
pub fn resolve_config(matches: &ArgMatches) -> Result<MongoConfig, ConfigError> {
    let matches = match matches.subcommand() {
        Some((_, sub_matches)) => sub_matches,
        None => matches,
    };

    let mut config = match matches.get_one::<Profile>("profile") {
        Some(profile) => MongoConfig::from_profile(*profile).apply_env()?,
        None => MongoConfig::from_env()?,
    };

    if let Some(uri) = matches.get_one::<String>("uri") {
        config.uri = Some(uri.clone());
    }
    if let Some(hosts) = matches.get_one::<String>("hosts") {
        config.hosts = split_hosts(hosts);
    }
    if let Some(name) = matches.get_one::<String>("replica-set") {
        config.replica_set = Some(name.clone());
    }
    if let Some(username) = matches.get_one::<String>("username") {
        config.username = Some(username.clone());
    }
    if let Some(password) = matches.get_one::<String>("password") {
        config.password = Some(password.clone());
    }
    if let Some(source) = matches.get_one::<String>("auth-source") {
        config.auth_source = Some(source.clone());
    }
    if let Some(app_name) = matches.get_one::<String>("app-name") {
        config.app_name = Some(app_name.clone());
    }
    if let Some(size) = matches.get_one::<u32>("max-pool-size") {
        config.max_pool_size = Some(*size);
    }
    if let Some(ms) = matches.get_one::<u64>("server-selection-timeout-ms") {
        config.server_selection_timeout = Some(Duration::from_millis(*ms));
    }
    if let Some(ms) = matches.get_one::<u64>("socket-timeout-ms") {
        config.socket_timeout = Some(Duration::from_millis(*ms));
    }

    config.validate()?;
    Ok(config)
}
