pub mod draft;
pub mod init;
pub mod take;
