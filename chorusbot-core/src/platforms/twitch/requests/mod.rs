// File: src/platforms/twitch/requests/mod.rs

pub mod ban;
