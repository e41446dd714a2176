use clap::Parser;
use std::path::PathBuf;
use trail_network_lib::Config;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Trail Network - Replays path and topology operations and prints the resulting network
pub struct Settings {
    /// Scenario file (JSON) listing the operations to replay
    #[clap(value_name = "FILE")]
    pub scenario: PathBuf,

    /// Fractions closer than this are considered equal (and snap to 0/1)
    #[clap(long, default_value = "1e-9")]
    pub fraction_tolerance: f64,

    /// Coordinates closer than this are considered the same point
    #[clap(long, default_value = "1e-9")]
    pub coordinate_tolerance: f64,

    /// Do not attach point topologies to the paths meeting at new nodes
    #[clap(long, default_value = "false")]
    pub no_attach_points: bool,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "trail_network_lib=trace")
    #[clap(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Pretty-print the JSON report
    #[clap(long, default_value = "false")]
    pub pretty: bool,
}

impl Settings {
    /// Engine configuration derived from the command line
    pub fn to_config(&self) -> Config {
        Config {
            fraction_tolerance: self.fraction_tolerance,
            coordinate_tolerance: self.coordinate_tolerance,
            attach_point_topologies: !self.no_attach_points,
            ..Config::default()
        }
    }
}
