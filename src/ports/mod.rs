pub mod file_system;
pub mod http_client;
pub mod http_server;

pub use file_system::{FileSystem, FileSystemError, FileSystemResult};
pub use http_client::{HttpClient, HttpClientError, HttpClientResult};
pub use http_server::HttpServer;
