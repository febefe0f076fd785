// Provider backends

pub mod direct;
pub mod ytdlp;

pub use direct::DirectFetchBackend;
pub use ytdlp::YtDlpBackend;
