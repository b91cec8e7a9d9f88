//! Request and response bodies

pub mod accounts;
pub mod bills;
pub mod entries;
