use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use authdns::{Config, Responder, ZoneResolver};
use clap::{arg, ArgMatches};
use log::{error, info};

fn cli() -> clap::Command {
    clap::Command::new("authdns")
        .about("Authoritative DNS server answering from JSON zone files")
        .arg(
            arg!(--config <FILE> "JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(--zone <FILE> "JSON zone file, may be given several times")
                .action(clap::ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(--address <ADDRESS> "Address to listen on")
                .value_parser(clap::value_parser!(IpAddr)),
        )
        .arg(
            arg!(--port <PORT> "Port to listen on")
                .value_parser(clap::value_parser!(u16)),
        )
}

fn config(args: &ArgMatches) -> Result<Config, Box<dyn Error>> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(zones) = args.get_many::<PathBuf>("zone") {
        config.zones.extend(zones.cloned());
    }
    let address = args.get_one::<IpAddr>("address").copied();
    let port = args.get_one::<u16>("port").copied();
    config.listen = SocketAddr::new(
        address.unwrap_or_else(|| config.listen.ip()),
        port.unwrap_or_else(|| config.listen.port()),
    );
    Ok(config)
}

fn run(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let config = config(args)?;
    if config.zones.is_empty() {
        return Err("no zone files given, use --zone or a configuration file".into());
    }
    let resolver = ZoneResolver::from_json_files(&config.zones)?;
    info!("serving {} records", resolver.snapshot().len());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(async {
        let (responder, task) = Responder::with_config(&config, Arc::new(resolver))?;
        info!("listening on {}", responder.udp_addr());
        tokio::select! {
            _ = task => {}
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("shutting down");
            }
        }
        Ok::<(), Box<dyn Error>>(())
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("authdns=info"))
        .init();

    if let Err(err) = run(&cli().get_matches()) {
        error!("{}", err);
        std::process::exit(1);
    }
}
