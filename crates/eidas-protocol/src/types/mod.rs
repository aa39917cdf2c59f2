//! eIDAS message model.

mod message;
mod request;
mod response;
mod status;

pub use message::SignedMessage;
pub use request::{
    AuthenticationRequest, AuthenticationRequestBuilder, LoaComparison, RequestedAttribute, SpType,
};
pub use response::{AuthenticationResponse, AuthenticationResponseBuilder, ResponseAttribute};
pub use status::{Status, StatusCode};
