#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod channel;
pub mod gateway;
pub mod guild;
pub mod id;
pub mod invite;
pub mod patch;
pub mod presence;
pub mod stats;
pub mod user;
pub mod voice;
