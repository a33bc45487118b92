//! tatl - A Discord bot that announces when Twitch streamers go live.
//!
//! Channels subscribe to streamers with `/golive`. Two periodic tasks share
//! one store: a status updater pulling live status from Twitch, and a
//! notification poster sending one message per channel per stream start.

pub mod bot;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod platform;
pub mod repository;
pub mod service;
pub mod task;
