// Library exports for testing
// The binary (main.rs) imports these as well

pub mod args;
pub mod error;
pub mod logger;
pub mod monitor;

#[cfg(test)]
mod tests;
