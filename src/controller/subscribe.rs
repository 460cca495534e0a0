use actix_web::{post, web, HttpRequest, HttpResponse, Result};
use serde_json::Value;
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    types::OkResponse,
};

#[post("/subscribe")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    body: Result<web::Bytes, Error>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let body = body?;
    let subscription: Value = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidSubscription(e.to_string()))?;

    state.registry.save(subscription).await?;

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|item| item.to_str().ok())
        .unwrap_or("unknown");
    info!("Push subscription stored ({})", user_agent);

    Ok(HttpResponse::Ok().json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};

    use crate::{
        configuration::{AppState, State},
        handler::send_push::tests::config,
        registry::Registry,
        server::configure,
    };

    fn app_state() -> AppState<State> {
        AppState::new(State::new(config(None), Registry::memory(), None))
    }

    #[actix_web::test]
    async fn test_subscribe_upserts_by_endpoint() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        for auth in ["first", "second"] {
            let req = test::TestRequest::post()
                .uri("/push/subscribe")
                .set_json(json!({
                    "endpoint": "https://push.example/abc",
                    "expirationTime": null,
                    "keys": {"p256dh": "BPk", "auth": auth}
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({"ok": true}));
        }

        let items = state.registry.list().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key("auth"), Some("second"));
    }

    #[actix_web::test]
    async fn test_invalid_subscription_is_rejected() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        let bodies = [
            json!({}).to_string(),
            json!({"endpoint": "", "keys": {}}).to_string(),
            String::from("{not json"),
        ];

        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/push/subscribe")
                .insert_header(("content-type", "application/json"))
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["ok"], false);
            assert!(body["error"]
                .as_str()
                .unwrap()
                .starts_with("invalid subscription"));
        }

        assert!(state.registry.list().await.is_empty());
    }
}
