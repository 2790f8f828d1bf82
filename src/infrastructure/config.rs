use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub media_root: PathBuf,
    pub profile: String,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());
        Self::for_profile(profile)
    }

    /// Same as `from_env` but with the profile chosen by the caller
    /// (the binary's `--profile` flag).
    pub fn for_profile(profile: String) -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://biblioteca.db?mode=rwc".to_string()
            } else {
                format!("sqlite://biblioteca_{}.db?mode=rwc", profile)
            }
        });

        Self {
            database_url,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            seed_demo: env::var("SEED_DEMO")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(false),
            profile,
        }
    }
}
