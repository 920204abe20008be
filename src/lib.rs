//! Throwing knives - thrown knife projectiles for a team combat server
//!
//! Players throw their knife as a physics projectile. The crate tracks each
//! knife in flight, draws its trail, expires it, and rewrites the damage
//! event when it hits so the kill is credited to the thrower's knife.

pub mod app;
pub mod config;
pub mod game;
pub mod host;
pub mod menu;
pub mod util;
