pub use self::{database::DatabasePool, directus::Directus, http::HTTP};

mod database;
pub mod directus;
mod http;
