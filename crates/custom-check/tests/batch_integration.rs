use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use custom_check::{CheckError, RunConfig, execute_and_report, records};
use custom_check_exec::{CommandResult, ExecError, LocalExecutor, RemoteExecutor, TIMEOUT_MESSAGE};

const FAILURE_HEADER: &str = "script,exit_code,output";

fn config_for(dir: &Path, timeout: Duration) -> RunConfig {
    RunConfig {
        custom_commands: dir.join("commands.csv"),
        output: dir.join("failed.csv"),
        command_timeout: timeout,
        ..RunConfig::default()
    }
}

fn read_failures(path: &Path) -> Vec<(String, i32, String)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["script", "exit_code", "output"]
    );
    reader.deserialize().map(Result::unwrap).collect()
}

/// Counts disconnects and fails commands whose text starts with "fail"
#[derive(Default)]
struct ScriptedExecutor {
    disconnects: AtomicUsize,
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn run_with_timeout(
        &self,
        cmd: &str,
        _timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        if cmd == "drop" {
            return Err(ExecError::IoError("channel open failed".to_string()));
        }
        let (stdout, stderr) = if cmd.starts_with("fail") {
            (String::new(), format!("{cmd}: error\n"))
        } else {
            (format!("{cmd}\n"), String::new())
        };
        Ok(CommandResult {
            exit_code: i32::from(cmd.starts_with("fail")),
            stdout,
            stderr,
            duration: Duration::from_millis(1),
        })
    }

    async fn disconnect(&self) -> Result<(), ExecError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn executor_type(&self) -> &'static str {
        "scripted"
    }
}

#[tokio::test]
async fn test_local_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), Duration::from_millis(500));
    std::fs::write(
        &config.custom_commands,
        "id,result\n\
         1,echo hello\n\
         2,exit 1\n\
         3,sleep 5\n\
         4,echo partial; echo warn >&2\n\
         5,ls /nonexistent-custom-check-dir\n",
    )
    .unwrap();

    let records = records::load(&config.custom_commands).unwrap();
    let summary = execute_and_report(LocalExecutor::new(), &records, &config)
        .await
        .unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.failed, 2);

    let failures = read_failures(&config.output);
    assert_eq!(failures.len(), 2);

    assert_eq!(failures[0].0, "sleep 5");
    assert_eq!(failures[0].1, 1);
    assert_eq!(failures[0].2, TIMEOUT_MESSAGE);

    assert_eq!(failures[1].0, "ls /nonexistent-custom-check-dir");
    assert_ne!(failures[1].1, 0);
    assert!(failures[1].2.contains("nonexistent-custom-check-dir"));
}

#[tokio::test]
async fn test_multiline_script_runs_as_one_command() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), Duration::from_secs(10));
    std::fs::write(
        &config.custom_commands,
        "id,result\nmulti,\"echo one\\necho two >&2\"\n",
    )
    .unwrap();

    let records = records::load(&config.custom_commands).unwrap();
    let summary = execute_and_report(LocalExecutor::new(), &records, &config)
        .await
        .unwrap();

    // stdout and stderr both present: a warning, not a failure
    assert_eq!(summary.warnings, 1);
    assert_eq!(
        std::fs::read_to_string(&config.output).unwrap(),
        format!("{FAILURE_HEADER}\n")
    );
}

#[tokio::test]
async fn test_failures_keep_input_order_and_session_closed_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), Duration::from_secs(10));
    let records = vec![
        custom_check::CommandRecord::new("a", "fail-first"),
        custom_check::CommandRecord::new("b", "uptime"),
        custom_check::CommandRecord::new("c", "drop"),
        custom_check::CommandRecord::new("d", "fail-last"),
    ];

    let executor = ScriptedExecutor::default();
    let summary = execute_and_report(&executor, &records, &config)
        .await
        .unwrap();

    assert_eq!(executor.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(summary.failed, 3);

    let failures = read_failures(&config.output);
    let scripts: Vec<&str> = failures.iter().map(|f| f.0.as_str()).collect();
    assert_eq!(scripts, vec!["fail-first", "drop", "fail-last"]);
    assert_eq!(failures[1], ("drop".to_string(), 1, "I/O error: channel open failed".to_string()));
}

#[tokio::test]
async fn test_no_failures_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), Duration::from_secs(10));
    let records = vec![custom_check::CommandRecord::new("1", "echo hello")];

    execute_and_report(ScriptedExecutor::default(), &records, &config)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&config.output).unwrap(),
        format!("{FAILURE_HEADER}\n")
    );
}

#[tokio::test]
async fn test_unwritable_output_reported_after_disconnect() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path(), Duration::from_secs(10));
    config.output = dir.path().join("missing").join("failed.csv");
    let records = vec![custom_check::CommandRecord::new("1", "fail")];

    let executor = ScriptedExecutor::default();
    let err = execute_and_report(&executor, &records, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckError::Output { .. }));
    assert_eq!(executor.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connection_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path(), Duration::from_secs(10));
    std::fs::write(&config.custom_commands, "id,result\n1,echo hello\n").unwrap();
    config.server_ip = "127.0.0.1".to_string();
    config.username = "nobody".to_string();
    config.private_key_path = dir.path().join("no_such_key");

    let err = custom_check::run(&config).await.unwrap_err();

    assert!(matches!(err, CheckError::Connection(_)));
    assert!(!config.output.exists());
}
