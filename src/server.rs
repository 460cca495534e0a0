use actix_cors::Cors;
use actix_files::Files;
use actix_web::{
    dev::Server,
    http::header::{self, HeaderName},
    middleware, web, App, HttpServer,
};

use crate::{
    configuration::{AppState, State},
    controller::{
        public_key, send::{self, NOTIFY_SECRET_HEADER}, subscribe, version,
    },
    error::Error,
};

const PAYLOAD_LIMIT: usize = 4096;

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

/// Routes shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(PAYLOAD_LIMIT))
        .service(version::index)
        .service(
            web::scope("/push")
                .service(public_key::index)
                .service(subscribe::post_index)
                .service(send::index),
        );
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    let server = HttpServer::new(move || {
        let app = app_state.clone();
        let static_dir = app_state.config.static_dir.to_owned();
        let allowed_cors = String::from("*");
        let cors_access_all =
            app.config.allowed_origins.contains(&allowed_cors);
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                if cors_access_all {
                    return true;
                }
                let allowed = &app.config.allowed_origins;
                if let Ok(origin) = origin.to_str() {
                    return allowed.contains(&origin.to_owned());
                }
                false
            })
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                header::ACCEPT,
                HeaderName::from_static(NOTIFY_SECRET_HEADER),
            ])
            .allowed_header(header::CONTENT_TYPE);

        let app = App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(configure);

        match static_dir {
            Some(dir) => {
                app.service(Files::new("/", dir).index_file("index.html"))
            },
            None => app,
        }
    })
    .bind((host, port))?
    .disable_signals()
    .run();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use std::sync::{atomic::Ordering, Arc};

    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};

    use super::configure;
    use crate::{
        configuration::{AppState, State},
        controller::send::NOTIFY_SECRET_HEADER,
        handler::send_push::tests::{config, FakeTransport},
        push::PushTransport,
        registry::Registry,
    };

    #[actix_web::test]
    async fn test_subscribe_then_broadcast() {
        let mut config = config(Some("s3cret"));
        config.vapid_public_key = String::from("BPub");
        let transport = Arc::new(FakeTransport::default());
        let state = AppState::new(State::new(
            config,
            Registry::memory(),
            Some(transport.clone() as Arc<dyn PushTransport>),
        ));
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/push/public-key").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["publicKey"], "BPub");

        let req = test::TestRequest::post()
            .uri("/push/subscribe")
            .set_json(json!({
                "endpoint": "https://push.example/abc",
                "keys": {"p256dh": "BPk", "auth": "c2VjcmV0"}
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true}));

        let req = test::TestRequest::post()
            .uri("/push/send")
            .insert_header((NOTIFY_SECRET_HEADER, "s3cret"))
            .set_json(json!({"title": "注意", "body": "本日は中止です"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true, "sent": 1}));

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        let payloads = transport.payloads.lock().unwrap();
        let sent: Value = serde_json::from_slice(&payloads[0]).unwrap();
        assert_eq!(sent, json!({"title": "注意", "body": "本日は中止です"}));
    }

    #[actix_web::test]
    async fn test_oversized_body_is_rejected() {
        let state = AppState::new(State::new(
            config(Some("s3cret")),
            Registry::memory(),
            None,
        ));
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure),
        )
        .await;

        for uri in ["/push/subscribe", "/push/send"] {
            let req = test::TestRequest::post()
                .uri(uri)
                .insert_header(("content-type", "application/json"))
                .insert_header((NOTIFY_SECRET_HEADER, "s3cret"))
                .set_payload(vec![b' '; 8192])
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
            assert_eq!(
                resp.headers().get("content-type").unwrap(),
                "application/json"
            );

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["ok"], false);
            assert!(body["error"].as_str().unwrap().contains("limit"));
        }
    }
}
