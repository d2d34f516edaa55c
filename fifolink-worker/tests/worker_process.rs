//! End-to-end: the async host driver against a real worker process.

#![cfg(target_os = "linux")]

use std::process::Stdio;
use std::time::Duration;

use fifolink::HostConfig;
use fifolink::HostError;
use fifolink::host::HostChannels;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Worker {
    fn spawn() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_fifolink-worker"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn worker");
        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap()).lines();
        Self {
            child,
            stdin,
            stdout,
        }
    }

    async fn send(&mut self, command: serde_json::Value) {
        let mut line = command.to_string();
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await.unwrap();
        self.stdin.flush().await.unwrap();
    }

    async fn send_raw(&mut self, line: &str) {
        self.stdin.write_all(line.as_bytes()).await.unwrap();
        self.stdin.flush().await.unwrap();
    }

    async fn output_line(&mut self) -> String {
        self.stdout.next_line().await.unwrap().expect("worker stdout closed")
    }
}

fn host() -> (tempfile::TempDir, HostChannels) {
    let root = tempfile::tempdir().unwrap();
    let config = HostConfig::default()
        .with_fifo_root(root.path())
        .with_ack_timeout(Duration::from_secs(10));
    let channels = HostChannels::create(&config).unwrap();
    (root, channels)
}

#[tokio::test]
async fn full_session() {
    let (_root, mut host) = host();
    let mut worker = Worker::spawn();

    worker
        .send(json!({"type": "on_traversal_start", "ack_fifo": host.ack_path()}))
        .await;
    host.wait_for_ack().await.unwrap();

    worker.send(json!({"type": "send_ack"})).await;
    host.wait_for_ack().await.unwrap();

    worker.send(json!({"type": "send_nack"})).await;
    assert!(matches!(host.wait_for_ack().await, Err(HostError::Nack)));

    worker
        .send(json!({"type": "fail", "message": "bad record"}))
        .await;
    assert!(matches!(host.wait_for_ack().await, Err(HostError::Nack)));

    worker.send_raw("this is not json\n").await;
    assert!(matches!(host.wait_for_ack().await, Err(HostError::Nack)));

    // Data channel
    let data_path = host.open_data().unwrap();
    worker
        .send(json!({"type": "initialize_data_fifo", "data_fifo": data_path}))
        .await;
    host.wait_for_ack().await.unwrap();

    host.data()
        .unwrap()
        .send_lines(["A", "B", "C"])
        .await
        .unwrap();
    worker.send(json!({"type": "read_data", "lines": 3})).await;
    host.wait_for_ack().await.unwrap();
    assert_eq!(worker.output_line().await, "A");
    assert_eq!(worker.output_line().await, "B");
    assert_eq!(worker.output_line().await, "C");

    host.close_data().await.unwrap();
    worker.send(json!({"type": "read_data"})).await;
    host.wait_for_ack().await.unwrap();

    worker.send(json!({"type": "close_data_fifo"})).await;
    host.wait_for_ack().await.unwrap();

    worker.send(json!({"type": "on_traversal_success"})).await;
    host.wait_for_ack().await.unwrap();

    worker.send(json!({"type": "close_tool"})).await;
    worker.send(json!({"type": "shutdown"})).await;

    let status = worker.child.wait().await.unwrap();
    assert!(status.success());
    // Nothing was echoed for the drained read.
    assert!(worker.stdout.next_line().await.unwrap().is_none());
}

#[tokio::test]
async fn many_lines_round_trip_in_order() {
    let (_root, mut host) = host();
    let mut worker = Worker::spawn();

    worker
        .send(json!({"type": "on_traversal_start", "ack_fifo": host.ack_path()}))
        .await;
    host.wait_for_ack().await.unwrap();

    let data_path = host.open_data().unwrap();
    worker
        .send(json!({"type": "initialize_data_fifo", "data_fifo": data_path}))
        .await;
    host.wait_for_ack().await.unwrap();

    let lines: Vec<String> = (0..500).map(|i| format!("chr1\t{i}\tread-{i}")).collect();
    host.data().unwrap().send_lines(&lines).await.unwrap();
    worker
        .send(json!({"type": "read_data", "lines": lines.len()}))
        .await;
    host.wait_for_ack().await.unwrap();

    for expected in &lines {
        assert_eq!(&worker.output_line().await, expected);
    }

    worker.send(json!({"type": "shutdown"})).await;
    assert!(worker.child.wait().await.unwrap().success());
}

#[tokio::test]
async fn panicking_command_sends_nck_and_kills_worker() {
    let (_root, mut host) = host();
    let mut worker = Worker::spawn();

    worker
        .send(json!({"type": "on_traversal_start", "ack_fifo": host.ack_path()}))
        .await;
    host.wait_for_ack().await.unwrap();

    // No data FIFO is open: a driver bug, which panics inside the command.
    worker.send(json!({"type": "read_data"})).await;
    assert!(matches!(host.wait_for_ack().await, Err(HostError::Nack)));

    let output = worker.child.wait_with_output().await.unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("data FIFO is not open"),
        "panic message missing from stderr: {stderr}"
    );
}

#[tokio::test]
async fn stdin_eof_closes_the_session() {
    let (_root, mut host) = host();
    let mut worker = Worker::spawn();

    worker
        .send(json!({"type": "on_traversal_start", "ack_fifo": host.ack_path()}))
        .await;
    host.wait_for_ack().await.unwrap();

    let Worker { mut child, stdin, .. } = worker;
    drop(stdin);
    assert!(child.wait().await.unwrap().success());
}
