//! Command-line argument parsing

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use filedrop_common::DEFAULT_PORT;
use filedrop_server::ServiceConfig;
use filedrop_server::constants::{
    DEFAULT_MAX_DOWNLOADS, DEFAULT_MAX_LISTINGS, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_MAX_UPLOADS,
    DEFAULT_STORAGE_DIR,
};

/// Parse a per-class capacity (must be at least 1)
fn parse_capacity(value: &str) -> Result<usize, String> {
    let capacity: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid number"))?;
    if capacity == 0 {
        return Err("capacity must be at least 1".to_string());
    }
    Ok(capacity)
}

/// Filedrop file server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding uploaded files (created if missing)
    #[arg(short = 's', long = "storage-dir", default_value = DEFAULT_STORAGE_DIR)]
    pub storage_dir: PathBuf,

    /// Maximum concurrent uploads
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOADS, value_parser = parse_capacity)]
    pub max_uploads: usize,

    /// Maximum concurrent downloads
    #[arg(long, default_value_t = DEFAULT_MAX_DOWNLOADS, value_parser = parse_capacity)]
    pub max_downloads: usize,

    /// Maximum concurrent file list requests
    #[arg(long, default_value_t = DEFAULT_MAX_LISTINGS, value_parser = parse_capacity)]
    pub max_listings: usize,

    /// Largest accepted upload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE)]
    pub max_upload_size: u64,

    /// Enable debug logging (per-connection and per-request events)
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Service capacities and limits from the parsed flags
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            upload_capacity: self.max_uploads,
            download_capacity: self.max_downloads,
            list_capacity: self.max_listings,
            max_upload_size: self.max_upload_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["filedropd"]);
        assert_eq!(args.port, 50051);
        assert_eq!(args.storage_dir, PathBuf::from("./files"));
        assert!(!args.debug);
        assert_eq!(args.service_config(), ServiceConfig::default());
    }

    #[test]
    fn test_capacity_flags() {
        let args = Args::parse_from([
            "filedropd",
            "--max-uploads",
            "2",
            "--max-downloads",
            "3",
            "--max-listings",
            "4",
            "--max-upload-size",
            "1024",
        ]);
        let config = args.service_config();
        assert_eq!(config.upload_capacity, 2);
        assert_eq!(config.download_capacity, 3);
        assert_eq!(config.list_capacity, 4);
        assert_eq!(config.max_upload_size, 1024);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Args::try_parse_from(["filedropd", "--max-uploads", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_and_storage_dir() {
        let args = Args::parse_from(["filedropd", "-b", "::1", "-p", "9000", "-s", "/tmp/fd"]);
        assert_eq!(args.bind, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(args.port, 9000);
        assert_eq!(args.storage_dir, PathBuf::from("/tmp/fd"));
    }
}
