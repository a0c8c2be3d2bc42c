//! Integration tests for ProcessChannel against small shell scripts.
#![cfg(unix)]

use std::time::Duration;

use tokio::process::Command;

use rag_channel::{
    read_frame, ChannelError, IndexChannel, IndexCommand, IndexResponse, ProcessChannel,
    ShutdownOutcome,
};

const GRACE: Duration = Duration::from_secs(3);

fn sh(script: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    command
}

async fn wait_for_exit(channel: &mut ProcessChannel) {
    for _ in 0..200 {
        if channel.has_exited() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("process did not exit");
}

#[tokio::test]
async fn test_spawn_missing_binary_fails() {
    let result = ProcessChannel::spawn("/nonexistent/vector-index");
    match result {
        Err(ChannelError::Spawn { program, .. }) => {
            assert_eq!(program, "/nonexistent/vector-index");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("spawn should fail"),
    }
}

#[tokio::test]
async fn test_frames_arrive_intact_and_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames.bin");

    let mut command = sh("cat > \"$OUT\"");
    command.env("OUT", &out);
    let mut channel = ProcessChannel::from_command(command).unwrap();

    let payloads: Vec<Vec<u8>> = vec![Vec::new(), b"x".to_vec(), vec![b'y'; 70_000]];
    for payload in &payloads {
        channel.send_frame(payload).await.unwrap();
    }

    let outcome = channel.close(GRACE).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Exited(Some(0)));

    let bytes = std::fs::read(&out).unwrap();
    let mut reader = bytes.as_slice();
    for expected in &payloads {
        let frame = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(&frame, expected);
    }

    // close() sends a final stop command
    let stop = read_frame(&mut reader).await.unwrap().unwrap();
    let stop: IndexCommand = serde_json::from_slice(&stop).unwrap();
    assert_eq!(stop, IndexCommand::Stop);
    assert!(read_frame(&mut reader).await.unwrap().is_none());
}

#[tokio::test]
async fn test_responses_skip_log_lines() {
    let script = "echo '[DEBUG] index loaded'; echo '[MATCH] world'; \
                  echo 'noise'; echo '[MATCH_NOT_FOUND]'; cat > /dev/null";
    let mut channel = ProcessChannel::from_command(sh(script)).unwrap();

    channel
        .send(&IndexCommand::Query {
            text: "hello".to_string(),
            embedding: vec![0.1, 0.2],
        })
        .await
        .unwrap();

    assert_eq!(
        channel.next_response().await.unwrap(),
        IndexResponse::Match("world".to_string())
    );
    assert_eq!(channel.next_response().await.unwrap(), IndexResponse::NotFound);

    channel.close(GRACE).await.unwrap();
}

#[tokio::test]
async fn test_non_utf8_log_line_is_skipped() {
    let script = "printf '[DEBUG] caff\\350\\n[MATCH] world\\n'; cat > /dev/null";
    let mut channel = ProcessChannel::from_command(sh(script)).unwrap();

    assert_eq!(
        channel.next_response().await.unwrap(),
        IndexResponse::Match("world".to_string())
    );
    channel.close(GRACE).await.unwrap();
}

#[tokio::test]
async fn test_stderr_keeps_draining_after_non_utf8() {
    // Well past a pipe buffer of stderr after the bad byte
    let script = "printf 'caff\\350\\n' >&2; i=0; \
                  while [ $i -lt 3000 ]; do \
                  echo \"stderr line $i padded out to fill the pipe buffer\" >&2; \
                  i=$((i+1)); done; \
                  echo '[MATCH] drained'; cat > /dev/null";
    let mut channel = ProcessChannel::from_command(sh(script)).unwrap();

    let response = tokio::time::timeout(Duration::from_secs(10), channel.next_response())
        .await
        .expect("index blocked on a full stderr pipe")
        .unwrap();
    assert_eq!(response, IndexResponse::Match("drained".to_string()));
    channel.close(GRACE).await.unwrap();
}

#[tokio::test]
async fn test_stdout_end_without_response_is_closed() {
    let mut channel = ProcessChannel::from_command(sh("echo '[DEBUG] bye'")).unwrap();
    let result = channel.next_response().await;
    assert!(matches!(result, Err(ChannelError::Closed)));
}

#[tokio::test]
async fn test_write_after_exit_reports_exit_code() {
    let mut channel = ProcessChannel::from_command(sh("exit 3")).unwrap();
    wait_for_exit(&mut channel).await;

    let err = channel.send(&IndexCommand::Clear).await.unwrap_err();
    assert!(matches!(err, ChannelError::ProcessExited(Some(3))));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_close_kills_unresponsive_process() {
    let mut channel = ProcessChannel::from_command(sh("exec sleep 30")).unwrap();

    let outcome = channel.close(Duration::from_millis(200)).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Killed);
    assert!(channel.has_exited());

    // Second close reports the first outcome and does nothing else
    let again = channel.close(Duration::from_millis(200)).await.unwrap();
    assert_eq!(again, ShutdownOutcome::Killed);

    let err = channel.send(&IndexCommand::Clear).await.unwrap_err();
    assert!(matches!(err, ChannelError::Closed));
}
