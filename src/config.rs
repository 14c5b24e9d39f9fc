use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub registry_csv: String,
    pub parameters_csv: String,
    pub demand_csv: String,
    pub bind_addr: String,
    pub port: u16,
    /// Countries selected when the session starts
    pub default_countries: Vec<String>,
    pub chart_width: u32,
    pub chart_height: u32,
    pub map_zoom: u8,
    /// Map figure edge length in pixels (square)
    pub map_size: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            registry_csv: std::env::var("REGISTRY_CSV").unwrap_or_else(|_| "clean_db.csv".to_string()),
            parameters_csv: std::env::var("PARAMETERS_CSV").unwrap_or_else(|_| "parameters.csv".to_string()),
            demand_csv: std::env::var("DEMAND_CSV").unwrap_or_else(|_| "demand_stats.csv".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(5006),
            default_countries: std::env::var("DEFAULT_COUNTRIES")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| vec!["Greece".to_string()]),
            chart_width: std::env::var("CHART_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(550),
            chart_height: std::env::var("CHART_HEIGHT").ok().and_then(|v| v.parse().ok()).unwrap_or(500),
            map_zoom: std::env::var("MAP_ZOOM").ok().and_then(|v| v.parse().ok()).unwrap_or(6),
            map_size: std::env::var("MAP_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(700),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(&self.registry_csv)
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.data_dir.join(&self.parameters_csv)
    }

    pub fn demand_path(&self) -> PathBuf {
        self.data_dir.join(&self.demand_csv)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_trims_and_skips_blanks() {
        assert_eq!(parse_list(" Greece, Spain ,,"), vec!["Greece", "Spain"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn paths_join_data_dir() {
        let mut cfg = Config::from_env();
        cfg.data_dir = PathBuf::from("/tmp/merit");
        cfg.registry_csv = "plants.csv".to_string();
        assert_eq!(cfg.registry_path(), PathBuf::from("/tmp/merit/plants.csv"));
    }
}
