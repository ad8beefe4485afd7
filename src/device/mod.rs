pub mod bluetooth;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod decode;
#[cfg(test)]
pub mod mock;
pub mod types;
