// Middleware module

pub mod auth;
