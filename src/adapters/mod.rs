// Adapters - External system implementations

pub mod dir_locator;
pub mod exec_ffmpeg;
pub mod manifest_file;
pub mod probe_ffprobe;
#[cfg(feature = "libav")]
pub mod probe_libav;
pub mod toml_config;

// Re-export adapters
pub use dir_locator::DirectoryLocator;
pub use exec_ffmpeg::FfmpegCliAdapter;
pub use manifest_file::ManifestFileAdapter;
pub use probe_ffprobe::FfprobeAdapter;
#[cfg(feature = "libav")]
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::TomlConfigAdapter;
