pub mod agent;
pub mod init;
