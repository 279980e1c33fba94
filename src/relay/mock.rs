// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! In-process n8n webhook for tests.

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub(crate) const WEBHOOK_PATH: &str = "/webhook/assist";

/// How the mock webhook answers.
#[derive(Clone)]
pub(crate) enum MockReply {
    /// JSON body with the given status.
    Json(StatusCode, Value),
    /// Raw body with the given status.
    Raw(StatusCode, &'static str),
    /// JSON body after a delay.
    Delayed(Duration, Value),
    /// `response_text` set to the received `conversation_id`, after a delay.
    EchoConversationId(Duration),
}

struct MockState {
    reply: MockReply,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub(crate) struct MockWebhook {
    pub url: Url,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockWebhook {
    /// Start a webhook server on a random local port.
    pub async fn start(reply: MockReply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(MockState {
            reply,
            requests: requests.clone(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock webhook");
        let port = listener.local_addr().expect("local address").port();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route(WEBHOOK_PATH, web::post().to(handle_webhook))
                .route(WEBHOOK_PATH, web::get().to(HttpResponse::MethodNotAllowed))
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .expect("listen mock webhook")
        .run();
        actix_web::rt::spawn(server);

        Self {
            url: Url::parse(&format!("http://127.0.0.1:{port}{WEBHOOK_PATH}")).expect("mock url"),
            requests,
        }
    }

    /// Received request payloads.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("poisoned").clone()
    }
}

async fn handle_webhook(state: web::Data<MockState>, body: web::Json<Value>) -> HttpResponse {
    let payload = body.into_inner();
    state
        .requests
        .lock()
        .expect("poisoned")
        .push(payload.clone());

    match &state.reply {
        MockReply::Json(status, value) => HttpResponse::build(*status).json(value),
        MockReply::Raw(status, body) => HttpResponse::build(*status)
            .content_type("application/json")
            .body(*body),
        MockReply::Delayed(delay, value) => {
            actix_web::rt::time::sleep(*delay).await;
            HttpResponse::Ok().json(value)
        }
        MockReply::EchoConversationId(delay) => {
            actix_web::rt::time::sleep(*delay).await;
            HttpResponse::Ok().json(json!({ "response_text": payload["conversation_id"] }))
        }
    }
}

/// URL of a local port without a listening server.
pub(crate) fn closed_port_url() -> Url {
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free local port")
        .port();
    Url::parse(&format!("http://127.0.0.1:{port}{WEBHOOK_PATH}")).expect("closed port url")
}
