//! Detached script execution for the agent
//!
//! Every action spawns one child process and returns as soon as it is
//! running. A background reaper task waits for the child, logs its exit
//! status and, for generated code, deletes the temp file. Exit status is
//! never reported to the requester.
//!
//! Temp files of runs still in flight are tracked so the agent can delete
//! them on shutdown, when the reaper tasks die with the runtime. The
//! processes themselves are left running.
//!
//! `executeScript` and `executeCode` run whatever they are given. There is
//! no sandbox or path allow-list.

use crate::command::request::ActionRequest;
use crate::core::config::AgentConfig;
use crate::core::error::{BridgeError, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Spawns flight scripts and generated code
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: String,
    entry_script: PathBuf,
    reset_script: PathBuf,
    working_dir: Option<PathBuf>,
    temp_dir: PathBuf,
    pending: PendingArtifacts,
}

/// Temp files whose process has not exited yet
#[derive(Debug, Clone, Default)]
struct PendingArtifacts(Arc<Mutex<HashSet<PathBuf>>>);

impl PendingArtifacts {
    fn insert(&self, path: &Path) {
        self.lock().insert(path.to_path_buf());
    }

    fn remove(&self, path: &Path) {
        self.lock().remove(path);
    }

    fn take(&self) -> Vec<PathBuf> {
        self.lock().drain().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to a spawned, detached process
///
/// Dropping it does not stop the process or its cleanup.
#[derive(Debug)]
pub struct DetachedRun {
    pid: Option<u32>,
    artifact: Option<PathBuf>,
    reaper: JoinHandle<()>,
}

impl DetachedRun {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Temp file holding generated code, for `executeCode` runs
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Wait until the process has exited and its temp file is gone
    pub async fn reaped(self) {
        let _ = self.reaper.await;
    }
}

impl ScriptRunner {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            entry_script: config.entry_script.clone(),
            reset_script: config.reset_script.clone(),
            working_dir: config.working_dir.clone(),
            temp_dir: config.temp_dir(),
            pending: PendingArtifacts::default(),
        }
    }

    /// Spawn the process for an action request
    pub async fn execute(&self, request: &ActionRequest) -> Result<DetachedRun> {
        match request {
            ActionRequest::RunMain { args } => {
                let mut argv: Vec<OsString> = vec![self.entry_script.clone().into()];
                argv.extend(args.iter().map(OsString::from));
                self.launch(argv, None)
            }
            ActionRequest::ExecuteScript { script } => {
                tracing::warn!(script = %script, "running unrestricted script path");
                self.launch(vec![script.into()], None)
            }
            ActionRequest::Reset { config, uri } => {
                let (flag, value) = match (config, uri) {
                    (Some(config), _) => ("--config", config),
                    (None, Some(uri)) => ("--uri", uri),
                    (None, None) => {
                        return Err(BridgeError::InvalidRequest(
                            "reset requires config or uri".into(),
                        ))
                    }
                };
                self.launch(
                    vec![self.reset_script.clone().into(), flag.into(), value.into()],
                    None,
                )
            }
            ActionRequest::ExecuteCode { code } => self.execute_code(code).await,
        }
    }

    /// Write `code` to a fresh temp file and run it
    ///
    /// The file lives exactly as long as the process. Nothing is spawned
    /// when the file cannot be written.
    pub async fn execute_code(&self, code: &str) -> Result<DetachedRun> {
        let path = self
            .temp_dir
            .join(format!("hero_generated_{}.py", Uuid::new_v4().simple()));

        if let Err(e) = write_new_file(&path, code).await {
            remove_artifact(&path).await;
            return Err(BridgeError::SpawnFailed(format!(
                "could not create {}: {}",
                path.display(),
                e
            )));
        }

        self.pending.insert(&path);
        match self.launch(vec![path.clone().into()], Some(path.clone())) {
            Ok(run) => Ok(run),
            Err(e) => {
                self.pending.remove(&path);
                remove_artifact(&path).await;
                Err(e)
            }
        }
    }

    /// Delete the temp files of code runs that have not exited yet
    ///
    /// Called on shutdown. Returns how many files were removed.
    pub async fn remove_pending_artifacts(&self) -> usize {
        let paths = self.pending.take();
        for path in &paths {
            remove_artifact(path).await;
        }
        paths.len()
    }

    fn launch(&self, args: Vec<OsString>, artifact: Option<PathBuf>) -> Result<DetachedRun> {
        let mut command = Command::new(&self.interpreter);
        command.args(&args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            BridgeError::SpawnFailed(format!("could not start {}: {}", self.interpreter, e))
        })?;
        let pid = child.id();
        tracing::info!(pid, interpreter = %self.interpreter, ?args, "spawned process");

        let reaper = tokio::spawn(reap(child, artifact.clone(), self.pending.clone()));
        Ok(DetachedRun {
            pid,
            artifact,
            reaper,
        })
    }
}

async fn reap(mut child: Child, artifact: Option<PathBuf>, pending: PendingArtifacts) {
    let pid = child.id();
    match child.wait().await {
        Ok(status) => tracing::info!(pid, %status, "process exited"),
        Err(e) => tracing::warn!(pid, "failed to wait for process: {}", e),
    }
    if let Some(path) = artifact {
        remove_artifact(&path).await;
        pending.remove(&path);
    }
}

async fn write_new_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed generated code"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "failed to remove generated code: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runner(temp: &TempDir, interpreter: &str) -> ScriptRunner {
        ScriptRunner::new(&AgentConfig {
            interpreter: interpreter.into(),
            temp_dir: Some(temp.path().to_path_buf()),
            ..AgentConfig::default()
        })
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_execute_code_removes_temp_file_after_exit() {
        let temp = TempDir::new().unwrap();
        let runner = runner(&temp, "sh");

        let run = runner.execute_code("sleep 0.3").await.unwrap();
        let artifact = run.artifact().unwrap().to_path_buf();
        assert!(artifact.exists());

        run.reaped().await;
        assert!(!artifact.exists());
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_execute_code_cleans_up_on_failing_exit() {
        let temp = TempDir::new().unwrap();
        let runner = runner(&temp, "sh");

        let run = runner.execute_code("exit 3").await.unwrap();
        run.reaped().await;
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_code_runs_get_distinct_files() {
        let temp = TempDir::new().unwrap();
        let runner = runner(&temp, "sh");

        let first = runner.execute_code("sleep 0.2").await.unwrap();
        let second = runner.execute_code("sleep 0.2").await.unwrap();
        assert_ne!(first.artifact(), second.artifact());
        assert_eq!(files_in(temp.path()), 2);

        first.reaped().await;
        second.reaped().await;
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_pending_artifacts_removed_before_exit() {
        let temp = TempDir::new().unwrap();
        let runner = runner(&temp, "sh");

        let run = runner.execute_code("sleep 1").await.unwrap();
        let artifact = run.artifact().unwrap().to_path_buf();
        assert!(artifact.exists());

        assert_eq!(runner.remove_pending_artifacts().await, 1);
        assert!(!artifact.exists());
        assert_eq!(runner.remove_pending_artifacts().await, 0);

        run.reaped().await;
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_reaped_runs_are_not_pending() {
        let temp = TempDir::new().unwrap();
        let runner = runner(&temp, "sh");

        runner.execute_code("exit 0").await.unwrap().reaped().await;
        assert_eq!(runner.remove_pending_artifacts().await, 0);
    }

    #[tokio::test]
    async fn test_missing_temp_dir_spawns_nothing() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptRunner::new(&AgentConfig {
            interpreter: "sh".into(),
            temp_dir: Some(temp.path().join("missing")),
            ..AgentConfig::default()
        });

        let result = runner.execute_code("echo hi").await;
        assert!(matches!(result, Err(BridgeError::SpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_unlaunchable_interpreter_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let runner = runner(&temp, "/nonexistent/interpreter");

        let result = runner.execute_code("print(1)").await;
        assert!(matches!(result, Err(BridgeError::SpawnFailed(_))));
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_run_main_passes_entry_script_and_args() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("args.txt");
        let script = temp.path().join("main.sh");
        std::fs::write(&script, format!("echo \"$@\" > {}\n", out.display())).unwrap();

        let runner = ScriptRunner::new(&AgentConfig {
            interpreter: "sh".into(),
            entry_script: script,
            ..AgentConfig::default()
        });
        let run = runner
            .execute(&ActionRequest::RunMain {
                args: vec!["--demo".into(), "circle".into()],
            })
            .await
            .unwrap();
        assert!(run.artifact().is_none());
        run.reaped().await;

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "--demo circle");
    }

    #[tokio::test]
    async fn test_reset_single_drone_uses_uri_flag() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("reset.txt");
        let script = temp.path().join("reset.sh");
        std::fs::write(&script, format!("echo \"$@\" > {}\n", out.display())).unwrap();

        let runner = ScriptRunner::new(&AgentConfig {
            interpreter: "sh".into(),
            reset_script: script,
            ..AgentConfig::default()
        });
        let run = runner
            .execute(&ActionRequest::reset_one("radio://0/80/2M/E2"))
            .await
            .unwrap();
        run.reaped().await;
        assert_eq!(
            std::fs::read_to_string(&out).unwrap().trim(),
            "--uri radio://0/80/2M/E2"
        );
    }

    #[tokio::test]
    async fn test_reset_without_target_is_invalid() {
        let temp = TempDir::new().unwrap();
        let result = runner(&temp, "sh")
            .execute(&ActionRequest::Reset {
                config: None,
                uri: None,
            })
            .await;
        assert!(matches!(result, Err(BridgeError::InvalidRequest(_))));
    }
}
