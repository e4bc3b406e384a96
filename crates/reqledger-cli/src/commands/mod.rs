pub mod asset;
pub mod dep;
pub mod events;
pub mod init;
pub mod invoke;
