use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Hidden per-checkout state directory.
pub const DOT_DIR: &str = ".nhost";
/// Directory holding config, migrations, metadata and seeds.
pub const PROJECT_DIR: &str = "nhost";
pub const CONFIG_FILE: &str = "config.toml";

/// Filesystem layout of a project checkout.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub dot_dir: PathBuf,
    pub project_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            dot_dir: root.join(DOT_DIR),
            project_dir: root.join(PROJECT_DIR),
            root,
        }
    }

    /// The nearest enclosing project root: `start` or its closest ancestor
    /// that holds `nhost/config.toml`.
    pub fn discover(start: &Path) -> Option<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(PROJECT_DIR).join(CONFIG_FILE).is_file())
            .map(Self::new)
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_dir.join(CONFIG_FILE)
    }

    /// Derive the layout from the path of `nhost/config.toml`.
    ///
    /// The path is canonicalized so that container mounts are absolute.
    pub fn from_config_path(config_path: &Path) -> anyhow::Result<Self> {
        let canonical = config_path.canonicalize()?;
        let project_dir = canonical
            .parent()
            .ok_or_else(|| anyhow::anyhow!("config path has no parent directory"))?;
        let root = project_dir.parent().unwrap_or(project_dir);
        Ok(Self::new(root))
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.project_dir.join("migrations")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.project_dir.join("metadata")
    }

    pub fn seeds_dir(&self, database: &str) -> PathBuf {
        self.project_dir.join("seeds").join(database)
    }

    pub fn first_run_marker(&self, marker: &str) -> PathBuf {
        self.dot_dir.join(marker)
    }

    /// True when the state marker does not exist yet. Must be sampled
    /// before any container starts, since the database creates it.
    pub fn is_first_run(&self, marker: &str) -> bool {
        !self.first_run_marker(marker).exists()
    }

    pub fn linked_project_path(&self) -> PathBuf {
        self.dot_dir.join("project.json")
    }

    pub fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }

    /// Substitute `{state}` and `{project}` in a volume spec.
    pub fn expand(&self, spec: &str) -> String {
        spec.replace("{state}", &self.dot_dir.to_string_lossy())
            .replace("{project}", &self.project_dir.to_string_lossy())
    }
}

/// Cloud project this checkout is linked to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProject {
    pub id: Option<String>,
    pub subdomain: String,
    #[serde(default)]
    pub region: Option<String>,
    pub admin_secret: String,
}

impl LinkedProject {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("project is not linked ({} missing)", path.display()))?;
        let project: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(project)
    }

    pub fn hasura_endpoint(&self) -> String {
        match &self.region {
            Some(region) => format!("https://{}.hasura.{}.nhost.run", self.subdomain, region),
            None => format!("https://{}.nhost.run", self.subdomain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_root() {
        let layout = ProjectLayout::new("/work/app");
        assert_eq!(layout.migrations_dir(), PathBuf::from("/work/app/nhost/migrations"));
        assert_eq!(layout.seeds_dir("default"), PathBuf::from("/work/app/nhost/seeds/default"));
        assert_eq!(layout.first_run_marker("db_data"), PathBuf::from("/work/app/.nhost/db_data"));
        assert_eq!(layout.linked_project_path(), PathBuf::from("/work/app/.nhost/project.json"));
    }

    #[test]
    fn from_config_path_finds_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nhost")).unwrap();
        let config = dir.path().join("nhost/config.toml");
        std::fs::write(&config, "").unwrap();

        let layout = ProjectLayout::from_config_path(&config).unwrap();
        assert_eq!(layout.root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn discover_walks_up_to_the_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("nhost/migrations/default")).unwrap();
        std::fs::create_dir_all(root.join("functions/src")).unwrap();
        std::fs::write(root.join("nhost/config.toml"), "").unwrap();

        for start in [root.to_path_buf(), root.join("functions/src"), root.join("nhost/migrations/default")] {
            let layout = ProjectLayout::discover(&start).unwrap();
            assert_eq!(layout.root, root);
            assert_eq!(layout.config_path(), root.join("nhost/config.toml"));
        }
    }

    #[test]
    fn discover_ignores_a_bare_nhost_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nhost")).unwrap();
        let found = ProjectLayout::discover(dir.path());
        assert!(found.is_none_or(|layout| !layout.root.starts_with(dir.path())));
    }

    #[test]
    fn first_run_follows_marker() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        assert!(layout.is_first_run("db_data"));

        std::fs::create_dir_all(layout.first_run_marker("db_data")).unwrap();
        assert!(!layout.is_first_run("db_data"));
    }

    #[test]
    fn expand_placeholders() {
        let layout = ProjectLayout::new("/p");
        assert_eq!(
            layout.expand("{state}/db_data:/var/lib/postgresql/data"),
            "/p/.nhost/db_data:/var/lib/postgresql/data"
        );
        assert_eq!(layout.expand("{project}/emails:/emails"), "/p/nhost/emails:/emails");
    }

    #[test]
    fn linked_project_endpoint() {
        let project: LinkedProject = serde_json::from_str(
            r#"{"id":"1","subdomain":"abc","region":"eu-central-1","adminSecret":"s"}"#,
        )
        .unwrap();
        assert_eq!(project.hasura_endpoint(), "https://abc.hasura.eu-central-1.nhost.run");
        assert_eq!(project.admin_secret, "s");
    }
}
