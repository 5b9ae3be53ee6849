//! Command-line interface.
//!
//! ```text
//! depthcast-producer                     Upload to localhost:5000
//! depthcast-producer <HOST> <PORT>       Upload to HOST:PORT
//! depthcast-producer --config <path>     Load a custom config TOML
//! depthcast-producer --gen-config        Write default config to stdout
//! ```
//!
//! Exactly zero or two positionals are accepted; anything else prints
//! usage and exits non-zero.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ProducerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "depthcast-producer",
    version,
    about = "Capture depth-camera color frames and stream them as bitmaps to a collector",
    override_usage = "depthcast-producer [OPTIONS] [<HOST> <PORT>]"
)]
pub struct Cli {
    /// Collector host name, IP address, or URL.
    #[arg(requires = "port")]
    pub host: Option<String>,

    /// Collector port.
    pub port: Option<u16>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "depthcast-producer.toml")]
    pub config: PathBuf,

    /// Stop after this many upload attempts.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    pub gen_config: bool,
}

impl Cli {
    /// Fold command-line overrides into a loaded configuration.
    pub fn apply(&self, config: &mut ProducerConfig) {
        if let (Some(host), Some(port)) = (&self.host, self.port) {
            config.set_destination(host.clone(), port);
        }
        if let Some(frames) = self.frames {
            config.source.frame_limit = frames;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_positionals_keep_defaults() {
        let cli = Cli::try_parse_from(["depthcast-producer"]).unwrap();
        let mut cfg = ProducerConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.to_target().to_string(), "localhost:5000");
    }

    #[test]
    fn host_and_port_override() {
        let cli = Cli::try_parse_from(["depthcast-producer", "192.168.0.20", "6000"]).unwrap();
        let mut cfg = ProducerConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.collector.host, "192.168.0.20");
        assert_eq!(cfg.collector.port, 6000);
    }

    #[test]
    fn single_positional_is_rejected() {
        assert!(Cli::try_parse_from(["depthcast-producer", "example.org"]).is_err());
    }

    #[test]
    fn three_positionals_are_rejected() {
        assert!(Cli::try_parse_from(["depthcast-producer", "a", "1", "extra"]).is_err());
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        assert!(Cli::try_parse_from(["depthcast-producer", "host", "http"]).is_err());
    }

    #[test]
    fn frames_flag_sets_limit() {
        let cli = Cli::try_parse_from(["depthcast-producer", "--frames", "3"]).unwrap();
        let mut cfg = ProducerConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.to_loop_config().frame_limit, Some(3));
    }
}
