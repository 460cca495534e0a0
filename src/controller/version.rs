use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

#[get("/version")]
pub async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(web::Json(Response {
        version: VERSION,
        push_enabled: state.push_enabled(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response<'a> {
    pub version: Option<&'a str>,
    #[serde(rename = "pushEnabled")]
    pub push_enabled: bool,
}
