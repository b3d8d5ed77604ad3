use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_DIRECTORY_URL: &str = "https://www.rbi.org.in/Scripts/bs_viewcontent.aspx?Id=2009";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// What the cleaner does with a record that has fewer fields than it cleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortRecordPolicy {
    /// Drop the record, log a warning and keep going.
    Skip,
    /// Abort cleaning of the whole file.
    Fail,
}

impl Default for ShortRecordPolicy {
    fn default() -> Self {
        ShortRecordPolicy::Skip
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub directory_url: String,
    pub link_suffix: String,
    pub vocabulary_path: PathBuf,
    pub cache_path: PathBuf,
    pub download_dir: PathBuf,
    pub convert_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub master_path: PathBuf,
    pub concurrency: usize,
    pub user_agent: String,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub short_record_policy: ShortRecordPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            link_suffix: ".xlsx".to_string(),
            vocabulary_path: PathBuf::from("banks.json"),
            cache_path: PathBuf::from("etags.json"),
            download_dir: PathBuf::from("data/xlsx"),
            convert_dir: PathBuf::from("data/csv"),
            clean_dir: PathBuf::from("data/clean"),
            master_path: PathBuf::from("data/master.csv"),
            concurrency: 8,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_seconds: None,
            short_record_policy: ShortRecordPolicy::Skip,
        }
    }
}

impl Config {
    /// Layers the built-in defaults, an optional config file and `RBI_*`
    /// environment variables, in that order.
    ///
    /// Without an explicit path, `rbi_parser.{toml,json,yaml}` in the working
    /// directory is picked up if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::default();

        let mut builder = config::Config::builder()
            .set_default("directory_url", defaults.directory_url)?
            .set_default("link_suffix", defaults.link_suffix)?
            .set_default("vocabulary_path", path_value(&defaults.vocabulary_path))?
            .set_default("cache_path", path_value(&defaults.cache_path))?
            .set_default("download_dir", path_value(&defaults.download_dir))?
            .set_default("convert_dir", path_value(&defaults.convert_dir))?
            .set_default("clean_dir", path_value(&defaults.clean_dir))?
            .set_default("master_path", path_value(&defaults.master_path))?
            .set_default("concurrency", defaults.concurrency as i64)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("short_record_policy", "skip")?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path.to_path_buf())),
            None => builder.add_source(config::File::with_name("rbi_parser").required(false)),
        };

        let config: Config = builder
            .add_source(config::Environment::with_prefix("RBI").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
