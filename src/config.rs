//! CLI arguments and server configuration defaults.

use clap::Parser;

pub const DEFAULT_STORAGE_DIR: &str = "wavs";
pub const DEFAULT_ALLOWED_EXTENSIONS: &str = "wav";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_LOCK_WAIT_SECS: u64 = 30;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "audio-store", version, about = "Audio file store server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "AUDIO_STORE_STORAGE_DIR",
        default_value = DEFAULT_STORAGE_DIR,
        help = "Storage directory for audio files"
    )]
    pub storage_dir: String,
    #[arg(
        long,
        env = "AUDIO_STORE_ALLOWED_EXTENSIONS",
        default_value = DEFAULT_ALLOWED_EXTENSIONS,
        help = "Comma separated list of accepted file extensions"
    )]
    pub allowed_extensions: String,
    #[arg(
        short = 'b',
        long,
        env = "AUDIO_STORE_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "AUDIO_STORE_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(long, env = "AUDIO_STORE_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "AUDIO_STORE_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload request size in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
    #[arg(
        long,
        env = "AUDIO_STORE_LOCK_WAIT_SECS",
        default_value_t = DEFAULT_LOCK_WAIT_SECS,
        help = "Seconds an upload waits for a concurrent upload of the same file"
    )]
    pub lock_wait_secs: u64,
}
