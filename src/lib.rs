pub mod command;
pub mod config;
pub mod ergast;
pub mod format;
pub mod keyboard;
pub mod router;
pub mod service;
pub mod telegram;
pub mod vk;
