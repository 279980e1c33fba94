// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Host facing REST API of the conversation agents.

use crate::Controller;
use crate::agent::{ConversationInput, SUPPORTED_LANGUAGES};
use crate::config_flow::UserInput;
use crate::configuration::get_manifest;
use crate::controller::{
    GetConfigEntries, ProcessConversation, ReloadEntry, RemoveEntry, StartConfigFlow,
    StartOptionsFlow,
};
use crate::errors::ServiceError;
use actix::Addr;
use actix_web::{HttpResponse, delete, get, post, web};
use log::debug;

pub mod web_model;

pub use web_model::json_error_handler;

/// Register all API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(process_conversation)
        .service(get_config_entries)
        .service(start_config_flow)
        .service(start_options_flow)
        .service(reload_entry)
        .service(remove_entry)
        .service(get_info);
}

#[post("/api/conversation/process")]
async fn process_conversation(
    controller: web::Data<Addr<Controller>>,
    input: web::Json<ConversationInput>,
) -> Result<HttpResponse, ServiceError> {
    let input = input.into_inner();
    debug!(
        "Conversation turn for agent {}: {:?}",
        input.agent_id.as_deref().unwrap_or("-"),
        input.text
    );
    let result = controller.send(ProcessConversation::new(input)).await??;
    Ok(HttpResponse::Ok().json(result))
}

#[get("/api/config/entries")]
async fn get_config_entries(
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    let entries = controller.send(GetConfigEntries).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Start the config flow. Without a body the initial form is returned.
#[post("/api/config/flow")]
async fn start_config_flow(
    controller: web::Data<Addr<Controller>>,
    user_input: Option<web::Json<UserInput>>,
) -> Result<HttpResponse, ServiceError> {
    let user_input = user_input.map(web::Json::into_inner);
    let response = controller.send(StartConfigFlow::new(user_input)).await??;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/config/entries/{entry_id}/options")]
async fn start_options_flow(
    controller: web::Data<Addr<Controller>>,
    path: web::Path<String>,
    user_input: Option<web::Json<UserInput>>,
) -> Result<HttpResponse, ServiceError> {
    let user_input = user_input.map(web::Json::into_inner);
    let response = controller
        .send(StartOptionsFlow::new(path.into_inner(), user_input))
        .await??;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/config/entries/{entry_id}/reload")]
async fn reload_entry(
    controller: web::Data<Addr<Controller>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    controller.send(ReloadEntry::new(path.into_inner())).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/api/config/entries/{entry_id}")]
async fn remove_entry(
    controller: web::Data<Addr<Controller>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    controller.send(RemoveEntry::new(path.into_inner())).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// Integration manifest with version and supported conversation languages.
#[get("/api/info")]
async fn get_info() -> Result<HttpResponse, ServiceError> {
    let mut manifest = get_manifest()?;
    if let Some(map) = manifest.as_object_mut() {
        map.insert("supported_languages".into(), SUPPORTED_LANGUAGES.into());
    }
    Ok(HttpResponse::Ok().json(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{ConfigEntry, DOMAIN, EntryData, RelaySettings};
    use crate::relay::mock::{MockReply, MockWebhook};
    use crate::util::new_http_client;
    use actix::Actor;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    fn controller(entries: Vec<ConfigEntry>) -> web::Data<Addr<Controller>> {
        let settings = RelaySettings::default();
        let client = new_http_client(&settings).unwrap();
        web::Data::new(Controller::new(settings, client, entries, None).start())
    }

    fn entry(id: &str, webhook_url: Option<&str>) -> ConfigEntry {
        ConfigEntry {
            entry_id: id.into(),
            title: "n8n Conversation".into(),
            data: EntryData {
                webhook_url: webhook_url.map(Into::into),
            },
        }
    }

    macro_rules! init_app {
        ($controller:expr) => {
            test::init_service(
                App::new()
                    .app_data(
                        web::JsonConfig::default()
                            .limit(16 * 1024)
                            .error_handler(json_error_handler),
                    )
                    .app_data($controller)
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn process_conversation_returns_webhook_reply() {
        let webhook = MockWebhook::start(MockReply::Json(
            StatusCode::OK,
            json!({ "response_text": "Lights turned on." }),
        ))
        .await;
        let app = init_app!(controller(vec![entry("e1", Some(webhook.url.as_str()))]));

        let req = test::TestRequest::post()
            .uri("/api/conversation/process")
            .set_json(json!({ "text": "turn on the lights", "language": "en", "conversation_id": "c1" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!("Lights turned on.", body["response"]["speech"]["plain"]["speech"]);
        assert_eq!("action_done", body["response"]["response_type"]);
        assert_eq!("c1", body["conversation_id"]);
    }

    #[actix_web::test]
    async fn process_conversation_with_unknown_agent_is_not_found() {
        let app = init_app!(controller(vec![entry("e1", None)]));

        let req = test::TestRequest::post()
            .uri("/api/conversation/process")
            .set_json(json!({ "text": "hello", "agent_id": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::NOT_FOUND, resp.status());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!("NOT_FOUND", body["code"]);
    }

    #[actix_web::test]
    async fn invalid_json_is_bad_request() {
        let app = init_app!(controller(Vec::new()));

        let req = test::TestRequest::post()
            .uri("/api/conversation/process")
            .set_json(json!({ "text": 42, "language": "en" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!("INVALID_JSON", body["code"]);
    }

    #[actix_web::test]
    async fn oversized_payload_is_rejected() {
        let app = init_app!(controller(Vec::new()));

        let req = test::TestRequest::post()
            .uri("/api/conversation/process")
            .set_json(json!({ "text": "a".repeat(20 * 1024) }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::PAYLOAD_TOO_LARGE, resp.status());
    }

    #[actix_web::test]
    async fn config_flow_without_input_returns_form() {
        let app = init_app!(controller(Vec::new()));

        let req = test::TestRequest::post().uri("/api/config/flow").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!("form", body["type"]);
        assert_eq!("user", body["step_id"]);
        assert_eq!("webhook_url", body["data_schema"][0]["name"]);
    }

    #[actix_web::test]
    async fn config_flow_creates_entry() {
        let controller = controller(Vec::new());
        let app = init_app!(controller.clone());

        let req = test::TestRequest::post()
            .uri("/api/config/flow")
            .set_json(json!({ "webhook_url": "https://n8n.example.com/webhook/assist" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!("create_entry", body["type"]);
        assert_eq!("n8n Conversation", body["title"]);
        let entry_id = body["entry_id"].as_str().expect("entry_id").to_string();

        let req = test::TestRequest::get().uri("/api/config/entries").to_request();
        let entries: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(entry_id, entries[0]["entry_id"]);
        assert_eq!("loaded", entries[0]["state"]);
        assert_eq!(
            "https://n8n.example.com/webhook/assist",
            entries[0]["data"]["webhook_url"]
        );
    }

    #[actix_web::test]
    async fn options_flow_of_unknown_entry_is_not_found() {
        let app = init_app!(controller(Vec::new()));

        let req = test::TestRequest::post()
            .uri("/api/config/entries/nope/options")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::NOT_FOUND, resp.status());
    }

    #[actix_web::test]
    async fn reload_of_entry_without_url_is_bad_request() {
        let app = init_app!(controller(vec![entry("e1", None)]));

        let req = test::TestRequest::post()
            .uri("/api/config/entries/e1/reload")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    }

    #[actix_web::test]
    async fn remove_entry() {
        let app = init_app!(controller(vec![entry(
            "e1",
            Some("http://127.0.0.1:5678/webhook/assist")
        )]));

        let req = test::TestRequest::delete()
            .uri("/api/config/entries/e1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(StatusCode::NO_CONTENT, resp.status());

        let req = test::TestRequest::get().uri("/api/config/entries").to_request();
        let entries: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json!([]), entries);
    }

    #[actix_web::test]
    async fn info_returns_manifest() {
        let app = init_app!(controller(Vec::new()));

        let req = test::TestRequest::get().uri("/api/info").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(DOMAIN, body["domain"]);
        assert_eq!(crate::APP_VERSION, body["version"]);
        assert_eq!("*", body["supported_languages"]);
    }
}
