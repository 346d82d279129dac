pub mod channel;
pub mod emoji;
pub mod guild;
pub mod member;
pub mod presence;
pub mod role;
pub mod voice;
