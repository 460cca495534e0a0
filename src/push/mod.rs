//! Web push delivery
//!
//! Encrypts a payload for one subscription (RFC 8291, aes128gcm) and posts it to
//! the subscription's push service with a VAPID authorization header.

use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};

use crate::{
    error::Error, model::Subscription, provider::HTTP, types::PushHeader,
};

pub use vapid::VapidKeys;

pub mod vapid;

#[async_trait]
pub trait PushTransport: Send + Sync + fmt::Debug {
    /// Deliver an already serialized payload. Anything other than a 2xx answer
    /// from the push service is an error.
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
    ) -> Result<(), Error>;
}

#[derive(Debug)]
pub struct WebPush {
    http: HTTP,
    keys: VapidKeys,
    header: PushHeader,
}

impl WebPush {
    pub fn new(http: HTTP, keys: VapidKeys, header: PushHeader) -> WebPush {
        WebPush { http, keys, header }
    }

    fn decode_key(
        subscription: &Subscription,
        name: &str,
    ) -> Result<Vec<u8>, Error> {
        let value = subscription.key(name).ok_or_else(|| {
            Error::InvalidSubscription(format!("keys.{} is missing", name))
        })?;

        Ok(BASE64_URL.decode(value.trim_end_matches('='))?)
    }
}

#[async_trait]
impl PushTransport for WebPush {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
    ) -> Result<(), Error> {
        let p256dh = Self::decode_key(subscription, "p256dh")?;
        let auth = Self::decode_key(subscription, "auth")?;

        let data = ece::encrypt(&p256dh, &auth, payload)?;
        let authorization = self.keys.authorization(&subscription.endpoint)?;

        let status = self
            .http
            .post_push(&subscription.endpoint, authorization, &self.header, data)
            .await?;

        if !(200..300).contains(&status) {
            return Err(Error::DeliveryFailure {
                endpoint: subscription.endpoint.to_owned(),
                status,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        configuration::parse_configuration,
        types::{Claims, Urgency},
    };
    use actix_web::{
        http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer,
    };
    use jsonwebtoken::{decode, Algorithm, Validation};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use super::vapid::tests::{decoding_key, PRIVATE_KEY, PUBLIC_KEY};

    const SUBSCRIBER_P256DH: &str = "BGElDCKZrgX-Mjg255IPKH8t9YXyh29m4GbpFEnlCH-2KOKPfQNfg8eGmar9k4yhXPTsSbmFBClLotzlyAXVI4A";
    const SUBSCRIBER_AUTH: &str = "j69O_7QS2rxB3tQ4lriJbQ";

    #[derive(Debug, Clone)]
    struct Captured {
        authorization: String,
        encoding: String,
        ttl: String,
        urgency: String,
        body: Vec<u8>,
    }

    fn header(req: &HttpRequest, name: &str) -> String {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    }

    fn push_service(status: u16) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let seen = Arc::new(Mutex::new(vec![]));
        let captured = seen.clone();

        let server = HttpServer::new(move || {
            let seen = seen.clone();
            App::new().default_service(web::to(
                move |req: HttpRequest, body: web::Bytes| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push(Captured {
                            authorization: header(&req, "authorization"),
                            encoding: header(&req, "content-encoding"),
                            ttl: header(&req, "ttl"),
                            urgency: header(&req, "urgency"),
                            body: body.to_vec(),
                        });
                        HttpResponse::build(StatusCode::from_u16(status).unwrap())
                            .finish()
                    }
                },
            ))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        (format!("http://{}/push/abc", addr), captured)
    }

    fn transport() -> WebPush {
        let config = parse_configuration(|_| None).unwrap();
        let keys =
            VapidKeys::new(PUBLIC_KEY, PRIVATE_KEY, "mailto:admin@example.com")
                .unwrap();
        let header = PushHeader {
            ttl: 3600,
            urgency: Urgency::High,
        };

        WebPush::new(HTTP::new(&config).unwrap(), keys, header)
    }

    fn subscription(endpoint: &str) -> Subscription {
        Subscription::from_value(json!({
            "endpoint": endpoint,
            "keys": {"p256dh": SUBSCRIBER_P256DH, "auth": SUBSCRIBER_AUTH}
        }))
        .unwrap()
    }

    #[actix_web::test]
    async fn test_deliver_sends_signed_encrypted_request() {
        let (endpoint, seen) = push_service(201);
        let payload = r#"{"title":"注意","body":"本日は中止です"}"#.as_bytes();

        transport()
            .deliver(&subscription(&endpoint), payload)
            .await
            .unwrap();

        let captured = seen.lock().unwrap().clone();
        assert_eq!(captured.len(), 1);
        let request = &captured[0];

        assert_eq!(request.encoding, "aes128gcm");
        assert_eq!(request.ttl, "3600");
        assert_eq!(request.urgency, "high");
        assert!(!request.body.is_empty());
        assert!(!request
            .body
            .windows(payload.len())
            .any(|window| window == payload));

        let (token, key) = request
            .authorization
            .strip_prefix("vapid t=")
            .and_then(|rest| rest.split_once(", k="))
            .unwrap();
        assert_eq!(key, PUBLIC_KEY);

        let origin = url::Url::parse(&endpoint).unwrap().origin().ascii_serialization();
        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_audience(&[origin]);
        assert!(decode::<Claims>(token, &decoding_key(), &validation).is_ok());
    }

    #[actix_web::test]
    async fn test_gone_endpoint_is_a_delivery_failure() {
        let (endpoint, seen) = push_service(410);

        let err = transport()
            .deliver(&subscription(&endpoint), b"{}")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DeliveryFailure { status: 410, .. }));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_missing_keys_fail_before_sending() {
        let (endpoint, seen) = push_service(201);
        let subscription = Subscription {
            endpoint,
            payload: json!({"keys": {"auth": SUBSCRIBER_AUTH}}),
        };

        let err = transport().deliver(&subscription, b"{}").await.unwrap_err();

        assert!(matches!(err, Error::InvalidSubscription(_)));
        assert!(seen.lock().unwrap().is_empty());
    }
}
