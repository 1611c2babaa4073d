pub mod apks;
pub mod download;
pub mod health;
pub mod upload;
