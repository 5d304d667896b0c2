#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageKind {
    File,
    S3,
}

#[derive(Debug, Clone, clap::Parser)]
#[command(about = "Match video analysis server")]
pub struct Settings {
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen: std::net::SocketAddr,

    /// Records are kept in memory when no database is configured.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "VIDEO_STORAGE", value_enum, default_value = "file")]
    pub storage: StorageKind,

    #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads/")]
    pub upload_folder: std::path::PathBuf,

    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 2 * 1024 * 1024 * 1024)]
    pub max_upload_bytes: u64,

    #[arg(long, env = "EVENT_COUNT", default_value_t = 200)]
    pub event_count: usize,

    #[arg(long, env = "EVENT_BATCH_SIZE", default_value_t = 50)]
    pub event_batch_size: usize,

    /// Seconds between formation snapshots.
    #[arg(long, env = "FORMATION_INTERVAL", default_value_t = 1800)]
    pub formation_interval: u32,

    /// Game duration in seconds when an upload does not name one.
    #[arg(long, env = "DEFAULT_DURATION", default_value_t = 5400)]
    pub default_duration: u32,

    /// Pause after every analysis step.
    #[arg(long, env = "STEP_DELAY_MS", default_value_t = 0)]
    pub step_delay_ms: u64,

    /// Seeds the generators for reproducible runs.
    #[arg(long, env = "ANALYSIS_SEED")]
    pub seed: Option<u64>,
}

impl Settings {
    pub fn analysis_config(&self) -> analysis::Config {
        analysis::Config {
            event_count: self.event_count,
            event_batch_size: self.event_batch_size,
            formation_interval: self.formation_interval,
            ..Default::default()
        }
    }

    pub fn upload_limits(&self) -> crate::api::UploadLimits {
        crate::api::UploadLimits {
            max_upload_bytes: self.max_upload_bytes,
            default_duration: self.default_duration,
        }
    }

    pub fn step_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.step_delay_ms)
    }

    pub fn s3_region(&self) -> s3::region::Region {
        match &self.s3_endpoint {
            Some(endpoint) => s3::region::Region::Custom {
                region: self.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => self
                .s3_region
                .parse()
                .unwrap_or(s3::region::Region::UsEast1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::try_parse_from(["backend"]).unwrap();

        assert_eq!(StorageKind::File, settings.storage);
        assert_eq!(2 * 1024 * 1024 * 1024, settings.max_upload_bytes);
        pretty_assertions::assert_eq!(analysis::Config::default(), settings.analysis_config());
        assert_eq!(5400, settings.upload_limits().default_duration);
    }

    #[test]
    fn flags_override_defaults() {
        let settings = Settings::try_parse_from([
            "backend",
            "--storage",
            "s3",
            "--event-count",
            "20",
            "--seed",
            "7",
        ])
        .unwrap();

        assert_eq!(StorageKind::S3, settings.storage);
        assert_eq!(20, settings.analysis_config().event_count);
        assert_eq!(Some(7), settings.seed);
    }
}
