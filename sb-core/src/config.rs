use std::time::Duration;

/// Process-wide tunables, loaded once at startup from the environment
/// with documented defaults. Mirrors the small settings-object pattern
/// the original service used for its own `Settings`, minus the
/// OSM/Nominatim fields that belong to the external fetch layer.
#[derive(Clone, Debug)]
pub struct Config {
    pub default_num_sectors: u32,
    pub default_min_area_hectares: f64,
    pub default_max_area_hectares: f64,
    pub default_target_area_hectares: f64,
    pub upstream_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub centrality_approx_node_threshold: usize,
    pub centrality_approx_sample_ratio: f64,
    pub centrality_approx_sample_min: usize,
    pub centrality_approx_sample_max: usize,
    pub centrality_seed: u64,
    pub centrality_percentile: f64,
    pub worker_pool_size: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            default_num_sectors: 4,
            default_min_area_hectares: 4.0,
            default_max_area_hectares: 20.0,
            default_target_area_hectares: 10.0,
            upstream_timeout: Duration::from_secs(180),
            heartbeat_interval: Duration::from_secs(15),
            centrality_approx_node_threshold: 2500,
            centrality_approx_sample_ratio: 0.10,
            centrality_approx_sample_min: 200,
            centrality_approx_sample_max: 800,
            centrality_seed: 42,
            centrality_percentile: 75.0,
            worker_pool_size: 4,
        }
    }
}

impl Config {
    /// Overlays environment variables (`SB_*`) onto the defaults. Parse
    /// failures are ignored in favor of the default, matching the
    /// original service's lenient `pydantic` settings loading.
    pub fn from_env() -> Config {
        let mut cfg = Config::default();
        if let Ok(v) = std::env::var("SB_NUM_SECTORS") {
            if let Ok(n) = v.parse() {
                cfg.default_num_sectors = n;
            }
        }
        if let Ok(v) = std::env::var("SB_MIN_AREA_HECTARES") {
            if let Ok(n) = v.parse() {
                cfg.default_min_area_hectares = n;
            }
        }
        if let Ok(v) = std::env::var("SB_MAX_AREA_HECTARES") {
            if let Ok(n) = v.parse() {
                cfg.default_max_area_hectares = n;
            }
        }
        if let Ok(v) = std::env::var("SB_TARGET_AREA_HECTARES") {
            if let Ok(n) = v.parse() {
                cfg.default_target_area_hectares = n;
            }
        }
        if let Ok(v) = std::env::var("SB_WORKER_POOL_SIZE") {
            if let Ok(n) = v.parse() {
                cfg.worker_pool_size = n;
            }
        }
        cfg
    }
}
