pub mod admin;
pub mod auth;
pub mod billing;
pub mod jobs;
pub mod subscription;
pub mod user;
pub mod webhook;
