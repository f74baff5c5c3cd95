use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

#[derive(Deserialize)]
struct RelatedLimit(usize);
impl Default for RelatedLimit {
    fn default() -> Self {
        RelatedLimit(3)
    }
}

#[derive(Deserialize)]
struct Project {
    pub site_root: Url,

    #[serde(default = "default_articles_directory")]
    pub articles_directory: PathBuf,

    #[serde(default = "default_backup_directory")]
    pub backup_directory: PathBuf,

    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_sitemap")]
    pub sitemap: PathBuf,

    #[serde(default)]
    pub related_limit: RelatedLimit,
}

fn default_articles_directory() -> PathBuf {
    PathBuf::from("articles")
}

fn default_backup_directory() -> PathBuf {
    PathBuf::from("backups")
}

fn default_catalog() -> PathBuf {
    PathBuf::from("catalog.json")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("update_log.txt")
}

fn default_sitemap() -> PathBuf {
    PathBuf::from("sitemap.xml")
}

pub struct Config {
    pub site_root: Url,
    pub articles_directory: PathBuf,
    pub backup_directory: PathBuf,
    pub catalog_path: PathBuf,
    pub log_path: PathBuf,
    pub sitemap_path: PathBuf,
    pub related_limit: usize,
}

impl Config {
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join("evergreen.yaml");
        if path.exists() {
            match Config::from_project_file(&path) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `evergreen.yaml` in any parent directory"
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Ok(Config {
                site_root: project.site_root,
                articles_directory: project_root.join(project.articles_directory),
                backup_directory: project_root.join(project.backup_directory),
                catalog_path: project_root.join(project.catalog),
                log_path: project_root.join(project.log_file),
                sitemap_path: project_root.join(project.sitemap),
                related_limit: project.related_limit.0,
            }),
        }
    }
}
