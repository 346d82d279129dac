#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc
)]

pub mod bus;
pub mod configuration;
pub mod decoder;
pub mod error;
pub mod invite;
pub mod pipeline;

pub use bus::{EventBus, EventStream};
pub use configuration::GatewayConfig;
pub use decoder::{decode, decode_dispatch, decode_slice, DecodeError, Envelope, GatewayEvent};
pub use error::{ErrorKind, GatewayError};
pub use invite::{InviteActions, InviteClient};
pub use pipeline::{ControlEvent, Gateway, GatewayHandle, Outcome, Synchronizer};
