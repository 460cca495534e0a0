pub use self::{
    push::{Claims, NotificationPayload, PushHeader, Urgency},
    response::{ErrorResponse, OkResponse, PublicKeyResponse, SendResponse},
};

mod push;
mod response;
