mod config;
mod protocol;
