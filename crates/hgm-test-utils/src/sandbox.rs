//! sandbox.rs
//!
//! Hermetic home directory for running the `hgm` binary in tests.
//! - `HGM_HOME` points at a private `assert_fs::TempDir`
//! - `HGM_API_URL` points wherever the test says (usually a `StubServer`)
//! - `HOME` is redirected too, so nothing touches the real `~/.hgm`
//!
//! ```no_run
//! use hgm_test_utils::{Sandbox, StubServer};
//!
//! let server = StubServer::start();
//! let sb = Sandbox::new().with_api_url(server.url());
//! let out = sb.run("hgm", ["ping"]).unwrap();
//! ```

use assert_fs::fixture::PathChild;
use assert_fs::TempDir;
use duct::Expression;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Sandbox {
    root: TempDir,
    pub home: PathBuf,
    pub api_url: String,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create sandbox TempDir");
        let home = root.child("hgm").to_path_buf();
        fs::create_dir_all(&home).expect("create hgm home");
        Self {
            root,
            home,
            // refused by default so a test without a server fails fast
            api_url: "http://127.0.0.1:9".to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.home.join("store.json")
    }

    /// Write/overwrite a file relative to the sandbox root.
    pub fn write<P: AsRef<Path>, S: AsRef<[u8]>>(&self, rel: P, contents: S) -> PathBuf {
        let p = self.root_path().join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&p, contents).expect("write file");
        p
    }

    pub fn write_config(&self, toml: &str) {
        fs::write(self.home.join("config.toml"), toml).expect("write config.toml");
    }

    /// Parsed `store.json`, or an empty object if nothing was stored yet.
    pub fn store(&self) -> serde_json::Value {
        match fs::read_to_string(self.store_path()) {
            Ok(s) => serde_json::from_str(&s).expect("store.json is not JSON"),
            Err(_) => serde_json::json!({}),
        }
    }

    pub fn envs(&self) -> HashMap<String, String> {
        let mut env_map = HashMap::new();
        if let Ok(path) = std::env::var("PATH") {
            env_map.insert("PATH".into(), path);
        }
        env_map.insert(
            "HOME".into(),
            self.root_path().to_string_lossy().into_owned(),
        );
        env_map.insert("HGM_HOME".into(), self.home.to_string_lossy().into_owned());
        env_map.insert("HGM_API_URL".into(), self.api_url.clone());
        env_map
    }

    /// A `duct::Expression` for a cargo binary, wired to the sandbox env.
    pub fn cmd<I>(&self, program: &str, args: I) -> Expression
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        let bin = assert_cmd::cargo::cargo_bin(program);
        let args: Vec<_> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_string_lossy().to_string())
            .collect();
        duct::cmd(bin, args)
            .dir(self.root_path())
            .full_env(self.envs())
    }

    /// Run a cargo binary and return stdout. Errors on non-zero exit.
    pub fn run<I>(&self, program: &str, args: I) -> Result<String, String>
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        self.cmd(program, args)
            .read()
            .map_err(|e| format!("command failed: {e}"))
    }
}
