use actix_web::{post, web, HttpRequest, HttpResponse, Result};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::send_push::broadcast,
    types::SendResponse,
};

pub const NOTIFY_SECRET_HEADER: &str = "x-notify-secret";

#[post("/send")]
pub async fn index(
    state: web::Data<AppState<State>>,
    body: Result<web::Bytes, Error>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let body = body?;
    let secret = req
        .headers()
        .get(NOTIFY_SECRET_HEADER)
        .and_then(|item| item.to_str().ok());

    let report = broadcast(&state, secret, &body).await?;

    Ok(HttpResponse::Ok().json(SendResponse {
        ok: true,
        sent: report.sent(),
    }))
}
