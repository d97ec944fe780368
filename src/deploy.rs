//! Site rebuild through an external build tool.
//!
//! The Deploy button runs the site's build command (Hugo by default). Where the
//! command runs depends on what the machine offers, so the trigger walks an
//! ordered list of [`BuildStrategy`] implementations:
//!
//! | # | Strategy | Invocation |
//! |---|----------|------------|
//! | 1 | exec into running container | `docker exec <container> <command>` |
//! | 2 | exec into compose service | `docker compose exec -T <service> <command>` |
//! | 3 | one-off container | `docker run --rm -v <project>:/src -w /src <image> <command>` |
//! | 4 | local binary | `<command>` in the project directory |
//!
//! Strategies whose tool is not installed are skipped. The first attempt that
//! exits successfully ends the run. The local binary is the fallback for
//! machines without any container tooling; it is not tried after a container
//! attempt failed, since that failure is the more useful report.
//!
//! Every attempt is bounded by a timeout (the child is killed when it expires)
//! and reports only the tail of its output: non-blank lines, the last
//! `tail_lines` of them, then the last `tail_chars` characters. Any failure to
//! run comes back as a failed [`BuildReport`], never as an error.

use crate::config::{BuildConfig, EditorConfig};
use async_trait::async_trait;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub success: bool,
    /// Truncated tail of the successful attempt's output, or of the last
    /// failure, or an environment error message.
    pub output_tail: String,
}

impl BuildReport {
    /// `ok` / `err`, as used in the redirect query string.
    pub fn status_param(&self) -> &'static str {
        if self.success { "ok" } else { "err" }
    }
}

/// How much output an attempt reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailLimits {
    pub lines: usize,
    pub chars: usize,
}

impl Default for TailLimits {
    fn default() -> Self {
        Self {
            lines: 12,
            chars: 700,
        }
    }
}

/// Keep the last non-blank lines of `raw`, then the last characters of those.
pub fn tail_output(raw: &str, limits: TailLimits) -> String {
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(limits.lines);
    let joined = lines[start..].join("\n");
    let count = joined.chars().count();
    if count <= limits.chars {
        joined
    } else {
        joined.chars().skip(count - limits.chars).collect()
    }
}

/// One way of running the build.
#[async_trait]
pub trait BuildStrategy: Send + Sync {
    /// Short label for logs and error messages.
    fn name(&self) -> &str;

    /// Whether the tool this strategy needs is installed.
    fn is_available(&self) -> bool;

    /// Run the build once. Returns success and the output tail.
    async fn attempt(&self) -> (bool, String);
}

/// A strategy that spawns one external command.
#[derive(Debug, Clone)]
pub struct CommandStrategy {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub limits: TailLimits,
}

impl CommandStrategy {
    fn new(name: &str, program: &str, args: Vec<String>, build: &BuildConfig) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args,
            cwd: None,
            timeout: build.timeout(),
            limits: TailLimits {
                lines: build.tail_lines,
                chars: build.tail_chars,
            },
        }
    }

    /// `docker exec <container> <command>`
    pub fn container_exec(build: &BuildConfig) -> Self {
        let mut args = vec!["exec".to_string(), build.container_name.clone()];
        args.extend(build.command.iter().cloned());
        Self::new("docker exec", "docker", args, build)
    }

    /// `docker compose exec -T <service> <command>`
    pub fn compose_exec(build: &BuildConfig, project: &Path) -> Self {
        let mut args = vec![
            "compose".to_string(),
            "exec".to_string(),
            "-T".to_string(),
            build.compose_service.clone(),
        ];
        args.extend(build.command.iter().cloned());
        let mut strategy = Self::new("docker compose exec", "docker", args, build);
        strategy.cwd = Some(project.to_path_buf());
        strategy
    }

    /// `docker run --rm -v <project>:/src -w /src <image> <command>`
    pub fn one_off_container(build: &BuildConfig, project: &Path) -> Self {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:/src", project.display()),
            "-w".to_string(),
            "/src".to_string(),
            build.image.clone(),
        ];
        args.extend(build.command.iter().cloned());
        Self::new("docker run", "docker", args, build)
    }

    /// The build command itself, run in the project directory.
    pub fn local(build: &BuildConfig, project: &Path) -> Self {
        let program = build.command.first().cloned().unwrap_or_default();
        let args = build.command.iter().skip(1).cloned().collect();
        let mut strategy = Self::new("local", &program, args, build);
        strategy.cwd = Some(project.to_path_buf());
        strategy
    }
}

#[async_trait]
impl BuildStrategy for CommandStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        find_executable(&self.program, self.cwd.as_deref()).is_some()
    }

    async fn attempt(&self) -> (bool, String) {
        let (status, combined) = match tokio::time::timeout(self.timeout, self.run_merged()).await {
            Err(_) => {
                return (
                    false,
                    format!(
                        "{} timed out after {}s",
                        self.name,
                        self.timeout.as_secs_f32()
                    ),
                );
            }
            Ok(Err(e)) => return (false, format!("{} failed to start: {}", self.name, e)),
            Ok(Ok(done)) => done,
        };

        let tail = tail_output(&combined, self.limits);
        if status.success() {
            (true, tail)
        } else if tail.is_empty() {
            (false, format!("{} exited with {}", self.name, status))
        } else {
            (false, tail)
        }
    }
}

impl CommandStrategy {
    /// Run to completion with stdout and stderr sharing one pipe, so the
    /// output keeps the order the child wrote it in.
    async fn run_merged(&self) -> io::Result<(ExitStatus, String)> {
        let (mut reader, writer) = io::pipe()?;
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn()?;
        // The command still holds write ends; the reader sees EOF only once
        // they are closed.
        drop(cmd);

        let collect = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });
        let status = child.wait().await?;
        let bytes = collect.await.map_err(io::Error::other)??;
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Locate `program` on `PATH`, or directly when it contains a separator.
///
/// A relative path with a separator (`./bin/hugo`) is taken relative to `cwd`,
/// the directory the command will be spawned in.
pub fn find_executable(program: &str, cwd: Option<&Path>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        let direct = match cwd {
            Some(dir) if direct.is_relative() => dir.join(direct),
            _ => direct.to_path_buf(),
        };
        return is_executable(&direct).then_some(direct);
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn executable_names(program: &str) -> impl Iterator<Item = String> {
    [program.to_string(), format!("{program}.exe")].into_iter()
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> impl Iterator<Item = String> {
    std::iter::once(program.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Ordered strategies plus the local fallback.
pub struct BuildTrigger {
    containers: Vec<Box<dyn BuildStrategy>>,
    local: Option<Box<dyn BuildStrategy>>,
}

impl BuildTrigger {
    pub fn new(
        containers: Vec<Box<dyn BuildStrategy>>,
        local: Option<Box<dyn BuildStrategy>>,
    ) -> Self {
        Self { containers, local }
    }

    /// The standard docker exec → compose → run → local chain.
    pub fn from_config(config: &EditorConfig) -> Self {
        let project = std::fs::canonicalize(&config.project_root)
            .unwrap_or_else(|_| config.project_root.clone());
        let build = &config.build;
        Self::new(
            vec![
                Box::new(CommandStrategy::container_exec(build)),
                Box::new(CommandStrategy::compose_exec(build, &project)),
                Box::new(CommandStrategy::one_off_container(build, &project)),
            ],
            Some(Box::new(CommandStrategy::local(build, &project))),
        )
    }

    /// Run strategies in order until one succeeds.
    pub async fn run_build(&self) -> BuildReport {
        let mut last_failure: Option<String> = None;
        let mut any_container = false;

        for strategy in &self.containers {
            if !strategy.is_available() {
                debug!(strategy = strategy.name(), "tool not installed, skipping");
                continue;
            }
            any_container = true;
            if let Some(report) = Self::try_one(strategy.as_ref(), &mut last_failure).await {
                return report;
            }
        }

        if !any_container {
            if let Some(local) = self.local.as_deref().filter(|s| s.is_available()) {
                if let Some(report) = Self::try_one(local, &mut last_failure).await {
                    return report;
                }
            }
        }

        BuildReport {
            success: false,
            output_tail: last_failure.unwrap_or_else(|| self.environment_error()),
        }
    }

    async fn try_one(
        strategy: &dyn BuildStrategy,
        last_failure: &mut Option<String>,
    ) -> Option<BuildReport> {
        info!(strategy = strategy.name(), "build attempt");
        let (success, output_tail) = strategy.attempt().await;
        if success {
            info!(strategy = strategy.name(), "build succeeded");
            return Some(BuildReport {
                success,
                output_tail,
            });
        }
        warn!(strategy = strategy.name(), tail = %output_tail, "build attempt failed");
        *last_failure = Some(output_tail);
        None
    }

    fn environment_error(&self) -> String {
        let tried: Vec<&str> = self
            .containers
            .iter()
            .chain(self.local.iter())
            .map(|s| s.name())
            .collect();
        format!("No build tool available (tried: {})", tried.join(", "))
    }
}
