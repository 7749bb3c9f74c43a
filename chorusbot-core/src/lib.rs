// src/lib.rs

pub mod eventbus;
pub mod platforms;
pub mod services;
pub mod tasks;

pub use chorusbot_common::error::Error;
