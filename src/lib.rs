pub mod auth;
pub mod db;
pub mod server;
pub mod services;
pub mod storage;
pub mod web;
