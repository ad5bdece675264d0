pub mod app;
pub mod app_state;
pub mod auth;
pub mod certificate;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod i18n;
pub mod mail;
pub mod middleware;
pub mod modules;
pub mod storage;
pub mod telemetry;
pub mod websocket;
pub mod workflow;
