use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{OutputLine, parse_output_line};
use super::{CandidateSource, ExitOutcome, ExtractionHandle, ExtractorEvent};
use crate::error::PipelineError;
use crate::types::ListReference;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ProcessExtractorConfig {
    pub program: String,
    /// Arguments placed before the list URL, which is always last.
    pub args: Vec<String>,
    pub marker: String,
    pub termination_grace: Duration,
}

impl Default for ProcessExtractorConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/letterboxd.py".to_string()],
            marker: "MOVIE_NAME: ".to_string(),
            termination_grace: Duration::from_secs(5),
        }
    }
}

/// Runs an external scraper and reads titles from its stdout.
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    config: ProcessExtractorConfig,
}

impl ProcessExtractor {
    pub fn new(config: ProcessExtractorConfig) -> Self {
        Self { config }
    }

    fn spawn_error(&self, source: io::Error) -> PipelineError {
        PipelineError::Spawn {
            program: self.config.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl CandidateSource for ProcessExtractor {
    async fn start(
        &self,
        list: &ListReference,
    ) -> Result<ExtractionHandle, PipelineError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(list.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        info!(
            program = %self.config.program,
            pid = child.id(),
            "Started list extractor for {}",
            list
        );

        let stdout = child.stdout.take().ok_or_else(|| {
            self.spawn_error(io::Error::other("extractor stdout was not captured"))
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let supervisor = Supervisor {
            child,
            events: tx,
            cancel: cancel.clone(),
            marker: self.config.marker.clone(),
            grace: self.config.termination_grace,
        };
        tokio::spawn(supervisor.run(stdout));

        Ok(ExtractionHandle::new(rx, cancel))
    }
}

struct Supervisor {
    child: Child,
    events: mpsc::Sender<ExtractorEvent>,
    cancel: CancellationToken,
    marker: String,
    grace: Duration,
}

impl Supervisor {
    async fn run(mut self, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        let mut admitted = 0usize;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break self.terminate().await,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match parse_output_line(&line, &self.marker) {
                        OutputLine::Candidate(candidate) => {
                            admitted += 1;
                            if self.events.send(ExtractorEvent::Candidate(candidate)).await.is_err() {
                                break self.terminate().await;
                            }
                        }
                        OutputLine::Malformed(reason) => {
                            warn!("Ignoring malformed extractor record ({}): {}", reason, line);
                        }
                        OutputLine::Diagnostic => debug!("extractor: {}", line),
                    },
                    Ok(None) => break self.wait_for_exit().await,
                    Err(e) => {
                        warn!("Failed to read extractor output: {}", e);
                        self.terminate().await;
                        break ExitOutcome::Errored(e.to_string());
                    }
                },
            }
        };

        info!(candidates = admitted, outcome = ?outcome, "List extractor finished");
        // Receiver may already be gone; nothing left to report to.
        let _ = self.events.send(ExtractorEvent::Exited(outcome)).await;
    }

    async fn wait_for_exit(&mut self) -> ExitOutcome {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => self.terminate().await,
            status = self.child.wait() => match status {
                Ok(status) => exit_outcome(status),
                Err(e) => ExitOutcome::Errored(e.to_string()),
            },
        }
    }

    /// Asks the child to exit, giving it the grace period to clean up
    /// before it is killed outright.
    async fn terminate(&mut self) -> ExitOutcome {
        self.request_exit();

        match timeout(self.grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Extractor terminated: {}", status),
            Ok(Err(e)) => warn!("Failed to reap terminated extractor: {}", e),
            Err(_) => {
                warn!(
                    "Extractor did not exit within {:?} of termination; killing it",
                    self.grace
                );
                if let Err(e) = self.child.start_kill() {
                    debug!("Extractor already gone when killing: {}", e);
                }
                match timeout(self.grace, self.child.wait()).await {
                    Ok(Ok(status)) => debug!("Extractor killed: {}", status),
                    Ok(Err(e)) => warn!("Failed to reap killed extractor: {}", e),
                    Err(_) => warn!("Killed extractor was not reaped in time"),
                }
            }
        }
        ExitOutcome::Killed
    }

    #[cfg(unix)]
    fn request_exit(&mut self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id() else {
            debug!("Extractor already reaped before termination");
            return;
        };
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!("Failed to send SIGTERM to extractor {}: {}", pid, e);
        }
    }

    #[cfg(not(unix))]
    fn request_exit(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Extractor already gone when terminating: {}", e);
        }
    }
}

fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    if status.success() {
        ExitOutcome::Success
    } else {
        match status.code() {
            Some(code) => ExitOutcome::Failed { code },
            None => ExitOutcome::Killed,
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("extractor stderr: {}", line);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::Candidate;

    fn list() -> ListReference {
        ListReference::parse(
            "https://letterboxd.com/someone/list/heat-and-friends/",
            "letterboxd.com",
        )
        .expect("valid list")
    }

    fn shell(script: &str) -> ProcessExtractor {
        ProcessExtractor::new(ProcessExtractorConfig {
            program: "sh".into(),
            // `$0` is "sh", the list URL lands in `$1`.
            args: vec!["-c".into(), script.into(), "sh".into()],
            marker: "MOVIE_NAME: ".into(),
            termination_grace: Duration::from_secs(2),
        })
    }

    async fn drain(mut handle: ExtractionHandle) -> Vec<ExtractorEvent> {
        let mut events = Vec::new();
        let collect = async {
            while let Some(event) = handle.next_event().await {
                events.push(event);
            }
        };
        timeout(Duration::from_secs(10), collect)
            .await
            .expect("extractor finished");
        events
    }

    #[tokio::test]
    async fn yields_marked_titles_in_order_and_skips_noise() {
        let script = r#"
            echo "Processing list: $1"
            echo 'MOVIE_NAME: {"title": "Heat (1995)"}'
            echo 'MOVIE_NAME: not json'
            echo 'MOVIE_NAME: {"title": "  "}'
            echo 'diagnostics on stderr' >&2
            echo 'MOVIE_NAME: {"title": "Alien"}'
        "#;
        let handle = shell(script).start(&list()).await.expect("spawn");

        assert_eq!(
            drain(handle).await,
            vec![
                ExtractorEvent::Candidate(Candidate::new("Heat (1995)")),
                ExtractorEvent::Candidate(Candidate::new("Alien")),
                ExtractorEvent::Exited(ExitOutcome::Success),
            ]
        );
    }

    #[tokio::test]
    async fn list_url_is_the_last_argument() {
        let script = r#"printf 'MOVIE_NAME: {"title": "%s"}\n' "$1""#;
        let handle = shell(script).start(&list()).await.expect("spawn");

        let events = drain(handle).await;
        assert_eq!(
            events[0],
            ExtractorEvent::Candidate(Candidate::new(list().as_str()))
        );
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_after_candidates() {
        let script = r#"
            echo 'MOVIE_NAME: {"title": "Heat"}'
            exit 3
        "#;
        let handle = shell(script).start(&list()).await.expect("spawn");

        assert_eq!(
            drain(handle).await,
            vec![
                ExtractorEvent::Candidate(Candidate::new("Heat")),
                ExtractorEvent::Exited(ExitOutcome::Failed { code: 3 }),
            ]
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let extractor = ProcessExtractor::new(ProcessExtractorConfig {
            program: "/nonexistent/marquee-extractor".into(),
            ..ProcessExtractorConfig::default()
        });

        let err = extractor.start(&list()).await.expect_err("spawn fails");
        assert!(matches!(err, PipelineError::Spawn { .. }));
        assert_eq!(err.client_message(), "Failed to run list extractor");
    }

    fn with_grace(mut extractor: ProcessExtractor, grace: Duration) -> ProcessExtractor {
        extractor.config.termination_grace = grace;
        extractor
    }

    #[tokio::test]
    async fn termination_lets_the_extractor_clean_up() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let flag = dir.path().join("cleaned");
        let script = format!(
            r#"
            trap 'echo cleaned > "{}"; exit 0' TERM
            echo 'MOVIE_NAME: {{"title": "Heat"}}'
            while true; do sleep 0.05; done
            "#,
            flag.display()
        );
        let mut handle = shell(&script).start(&list()).await.expect("spawn");

        assert_eq!(
            handle.next_event().await,
            Some(ExtractorEvent::Candidate(Candidate::new("Heat")))
        );
        handle.terminate();

        let exit = timeout(Duration::from_secs(5), handle.next_event())
            .await
            .expect("terminated promptly");
        assert_eq!(exit, Some(ExtractorEvent::Exited(ExitOutcome::Killed)));
        assert_eq!(
            std::fs::read_to_string(&flag).expect("TERM handler ran").trim(),
            "cleaned"
        );
    }

    #[tokio::test]
    async fn extractor_ignoring_termination_is_killed_after_grace() {
        let script = r#"
            trap '' TERM
            echo 'MOVIE_NAME: {"title": "Heat"}'
            while true; do sleep 0.05; done
        "#;
        let grace = Duration::from_millis(200);
        let mut handle = with_grace(shell(script), grace)
            .start(&list())
            .await
            .expect("spawn");

        assert_eq!(
            handle.next_event().await,
            Some(ExtractorEvent::Candidate(Candidate::new("Heat")))
        );
        let started = tokio::time::Instant::now();
        handle.terminate();

        let exit = timeout(Duration::from_secs(5), handle.next_event())
            .await
            .expect("killed after grace");
        assert_eq!(exit, Some(ExtractorEvent::Exited(ExitOutcome::Killed)));
        assert!(started.elapsed() >= grace, "waited out the grace period first");
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn terminate_kills_a_running_extractor() {
        let script = r#"
            echo 'MOVIE_NAME: {"title": "Heat"}'
            exec sleep 30
        "#;
        let mut handle = shell(script).start(&list()).await.expect("spawn");

        assert_eq!(
            handle.next_event().await,
            Some(ExtractorEvent::Candidate(Candidate::new("Heat")))
        );
        handle.terminate();

        let exit = timeout(Duration::from_secs(5), handle.next_event())
            .await
            .expect("terminated promptly");
        assert_eq!(exit, Some(ExtractorEvent::Exited(ExitOutcome::Killed)));
    }
}
