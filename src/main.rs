// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

#![forbid(non_ascii_idents)]
#![deny(unsafe_code)]

use actix::Actor;
use actix_web::{App, HttpServer, middleware, web};
use clap::{Command, arg};
use log::{error, info};
use n8n_conversation::configuration::{
    DEF_CONFIG_FILE, entries_path, get_configuration, load_config_entries,
};
use n8n_conversation::server::{configure, json_error_handler};
use n8n_conversation::util::new_http_client;
use n8n_conversation::{APP_VERSION, Controller, built_info};
use std::io;
use std::net::TcpListener;
use std::path::Path;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let args = Command::new(built_info::PKG_NAME)
        .author("Unfolded Circle ApS")
        .version(APP_VERSION)
        .about("n8n webhook conversation agent")
        .arg(arg!(-c --config <FILE> "Configuration file").required(false))
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg_file = match args.get_one::<String>("config") {
        None => {
            if Path::new(DEF_CONFIG_FILE).exists() {
                info!("Loading default configuration file: {DEF_CONFIG_FILE}");
                Some(DEF_CONFIG_FILE)
            } else {
                None
            }
        }
        Some(c) => Some(c.as_str()),
    };
    let cfg = get_configuration(cfg_file).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to read configuration: {e}"),
        )
    })?;
    info!("Webhook relay settings: {}", cfg.relay);

    if !cfg.integration.http.enabled {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "The http listener must be enabled",
        ));
    }
    let address = format!("{}:{}", cfg.integration.interface, cfg.integration.http.port);
    println!("{} listening on: {address}", built_info::PKG_NAME);
    let listener = TcpListener::bind(address)?;

    let entries_path = entries_path();
    let entries = load_config_entries(&entries_path).unwrap_or_else(|e| {
        error!("Failed to load config entries from {entries_path:?}, starting without: {e}");
        Vec::new()
    });

    let client = new_http_client(&cfg.relay).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to create HTTP client: {e}"),
        )
    })?;
    let controller =
        web::Data::new(Controller::new(cfg.relay, client, entries, Some(entries_path)).start());

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(
                web::JsonConfig::default()
                    .limit(16 * 1024) // limit size of the payload (global configuration)
                    .error_handler(json_error_handler),
            )
            .app_data(controller.clone())
            .configure(configure)
    })
    .workers(1)
    .listen(listener)?
    .run()
    .await
}
