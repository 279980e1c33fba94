// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! n8n webhook conversation test tool

use clap::{Arg, Command};
use log::info;
use n8n_conversation::APP_VERSION;
use n8n_conversation::agent::{ConversationAgent, ConversationInput, ResponseType};
use n8n_conversation::config_flow::validate_webhook_url;
use n8n_conversation::configuration::{RelaySettings, get_configuration};
use n8n_conversation::relay::WebhookRelay;
use n8n_conversation::util::new_http_client;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let (relay_settings, webhook_url, input) = parse_args_load_cfg()?;

    let url = match validate_webhook_url(webhook_url.as_str()) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid n8n webhook URL '{webhook_url}': {e}");
            std::process::exit(1);
        }
    };

    let client = new_http_client(&relay_settings)?;
    let relay = WebhookRelay::new(client, url, &relay_settings);
    let agent = ConversationAgent::new("n8n-converse", relay);

    info!("Sending: {:?}", input.text);
    let result = agent.process(input).await;

    println!("{}", result.response.speech_text());
    info!(
        "conversation_id={}, continue_conversation={}",
        result.conversation_id, result.continue_conversation
    );

    if result.response.response_type == ResponseType::Error {
        std::process::exit(2);
    }

    Ok(())
}

fn parse_args_load_cfg() -> anyhow::Result<(RelaySettings, String, ConversationInput)> {
    let args = Command::new("n8n-converse")
        .author("Unfolded Circle ApS")
        .version(APP_VERSION)
        .about("Send a single conversation turn to an n8n webhook")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .required(true)
                .help("n8n webhook URL"),
        )
        .arg(
            Arg::new("text")
                .required(true)
                .help("Text to send to the webhook"),
        )
        .arg(
            Arg::new("language")
                .short('l')
                .long("language")
                .default_value("en")
                .help("Language of the text"),
        )
        .arg(
            Arg::new("conversation_id")
                .long("conversation-id")
                .help("Conversation identifier to continue a conversation"),
        )
        .arg(
            Arg::new("device_id")
                .long("device-id")
                .help("Identifier of the originating device"),
        )
        .arg(
            Arg::new("context")
                .long("context")
                .help("Additional context as JSON object"),
        )
        .arg(
            Arg::new("connection_timeout")
                .short('c')
                .help("TCP connection timeout in seconds (overrides configuration)"),
        )
        .arg(
            Arg::new("request_timeout")
                .short('r')
                .help("Request timeout in seconds (overrides configuration)"),
        )
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut cfg = get_configuration(None)?.relay;
    if let Some(timeout) = args.get_one::<String>("connection_timeout") {
        cfg.connection_timeout = Duration::from_secs(u64::from_str(timeout)?);
    }
    if let Some(timeout) = args.get_one::<String>("request_timeout") {
        cfg.request_timeout = Duration::from_secs(u64::from_str(timeout)?);
    }

    let context = match args.get_one::<String>("context") {
        Some(context) => Some(serde_json::from_str::<Value>(context)?),
        None => None,
    };

    let input = ConversationInput {
        text: args.get_one::<String>("text").cloned().unwrap_or_default(),
        language: args
            .get_one::<String>("language")
            .cloned()
            .unwrap_or_else(|| "en".into()),
        conversation_id: args.get_one::<String>("conversation_id").cloned(),
        device_id: args.get_one::<String>("device_id").cloned(),
        context,
        agent_id: None,
    };
    let url = args.get_one::<String>("url").cloned().unwrap_or_default();

    Ok((cfg, url, input))
}
