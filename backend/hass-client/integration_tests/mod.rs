mod error;
mod helpers;
mod hub;
