pub mod ghn;
pub mod oauth;
