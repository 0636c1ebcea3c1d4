//! Spaced-repetition learning service for Flashky decks.
//!
//! Learners initialise a deck, pull the most overdue card, and rate their
//! recall from 1 to 5. Ratings drive an SM-2 schedule stored per user and card.

pub mod auth;
pub mod config;
pub mod errors;
pub mod learn;
pub mod models;
pub mod router;
pub mod routes;
pub mod session;
pub mod srs;
pub mod store;
