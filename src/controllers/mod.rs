pub mod admin;
pub mod billing;
pub mod cron;
pub mod health;
pub mod operations;
pub mod subscription;
pub mod webhook;
