//! VK community bot over the Bots Long Poll API.

mod api;
mod bot;
pub mod types;

use std::fmt;

pub use api::{Client, Outgoing};
pub use bot::VkBot;

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "VK HTTP error: {e}"),
            Error::Api(e) => write!(f, "VK API error: {e}"),
            Error::Parse(e) => write!(f, "VK parse error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
