use std::path::PathBuf;

use anyhow::Result;

const DEFAULT_EMPLOYEES_FILE: &str = "./database/data.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub employees_file: PathBuf,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let employees_file = std::env::var("EMPLOYEES_FILE")
            .ok()
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EMPLOYEES_FILE));

        let cors_allowed_origins =
            parse_origins(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        Ok(Self {
            employees_file,
            cors_allowed_origins,
        })
    }

    /// A `--data-file` flag wins over `EMPLOYEES_FILE`.
    pub fn with_data_file(mut self, data_file: Option<PathBuf>) -> Self {
        if let Some(path) = data_file {
            self.employees_file = path;
        }
        self
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_skip_blank_entries() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn data_file_flag_overrides_env() {
        let config = AppConfig {
            employees_file: PathBuf::from(DEFAULT_EMPLOYEES_FILE),
            cors_allowed_origins: Vec::new(),
        };
        let config = config.with_data_file(Some(PathBuf::from("/tmp/staff.json")));
        assert_eq!(config.employees_file, PathBuf::from("/tmp/staff.json"));
        let config = config.with_data_file(None);
        assert_eq!(config.employees_file, PathBuf::from("/tmp/staff.json"));
    }
}
