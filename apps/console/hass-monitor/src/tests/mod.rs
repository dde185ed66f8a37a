mod error;
mod logger;
mod monitor;
