use actix_web::{get, web, HttpResponse, Result};

use crate::{
    configuration::{AppState, State},
    error::Error,
    types::PublicKeyResponse,
};

/// An empty key tells the client that push is disabled.
#[get("/public-key")]
pub async fn index(
    state: web::Data<AppState<State>>,
) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(PublicKeyResponse {
        public_key: state.config.vapid_public_key.to_owned(),
    }))
}
