//! Request handlers

pub mod accounts;
pub mod bills;
pub mod entries;
pub mod health;
