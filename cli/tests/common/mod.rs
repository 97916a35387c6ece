//! Process-level harness: the real `stackit` binary against a local fake API.

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;

pub const PROJECT_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const ACCESS_TOKEN: &str = "test-token";

/// Fake service endpoint that records every request line it sees.
pub struct FakeApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeApi {
    pub async fn serve(router: Router) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        let router = router.layer(middleware::from_fn(move |req: Request, next: Next| {
            let log = log.clone();
            async move {
                log.lock()
                    .unwrap()
                    .push(format!("{} {}", req.method(), req.uri().path()));
                next.run(req).await
            }
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self {
            base_url,
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct Output {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Isolated config, home and cache directories for one invocation.
pub struct Sandbox {
    root: TempDir,
    env: Vec<(String, String)>,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["config", "home", "cache"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        Self {
            root,
            env: vec![(
                "STACKIT_ACCESS_TOKEN".to_string(),
                ACCESS_TOKEN.to_string(),
            )],
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Point every service at `api`.
    pub fn with_api(self, api: &FakeApi) -> Self {
        ["IAAS", "SKE", "DNS"].into_iter().fold(self, |sandbox, svc| {
            sandbox.with_env(&format!("STACKIT_{svc}_CUSTOM_ENDPOINT"), &api.base_url)
        })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    /// `$XDG_CACHE_HOME/stackit`
    pub fn cache_dir(&self) -> PathBuf {
        self.root.path().join("cache").join("stackit")
    }

    pub fn write_config(&self, body: &str) {
        std::fs::write(self.config_dir().join("config.toml"), body).unwrap();
    }

    pub async fn run(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_stackit"))
            .args(args)
            .env_clear()
            .env("HOME", self.root.path().join("home"))
            .env("XDG_CACHE_HOME", self.root.path().join("cache"))
            .env("STACKIT_CONFIG_DIR", self.config_dir())
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let mut input = child.stdin.take().unwrap();
        input.write_all(stdin.as_bytes()).await.unwrap();
        drop(input);

        let output = child.wait_with_output().await.unwrap();
        Output {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
