use std::{path::Path, process::Stdio, time::Duration};

use anyhow::{Context, Result, anyhow};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    process::{Child, ChildStdout, Command},
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

#[test]
fn exits_with_failure_when_port_is_taken() -> Result<()> {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = occupied.local_addr()?;

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("broadcast-relay"))
        .arg("--listen")
        .arg(addr.to_string())
        .env("RUST_LOG", "off")
        .assert()
        .failure();

    Ok(())
}

#[tokio::test]
async fn binary_relays_between_clients() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("broadcast-relay");
    let (mut relay, mut stdout) = spawn_relay(binary).await?;
    let addr = read_listen_addr(&mut stdout).await?;

    // Keep draining logs so the pipe never fills.
    let log_task = tokio::spawn(async move {
        let mut sink = Vec::new();
        let _ = stdout.read_to_end(&mut sink).await;
    });

    let mut alice = TcpStream::connect(&addr).await?;
    let mut bob = TcpStream::connect(&addr).await?;

    // Bob may not be registered when his first probe lands; retry until Alice hears one.
    let mut heard = [0u8; 4];
    let mut synced = false;
    for _ in 0..20 {
        bob.write_all(b"ping").await?;
        if timeout(Duration::from_millis(150), alice.read_exact(&mut heard))
            .await
            .is_ok()
        {
            synced = true;
            break;
        }
    }
    assert!(synced, "alice never heard bob");

    alice.write_all(b"hello bob").await?;
    let mut greeting = [0u8; 9];
    timeout(READ_TIMEOUT, bob.read_exact(&mut greeting)).await??;
    assert_eq!(&greeting, b"hello bob");

    let _ = relay.kill().await;
    let _ = relay.wait().await;
    let _ = log_task.await;

    Ok(())
}

async fn spawn_relay(binary: &Path) -> Result<(Child, BufReader<ChildStdout>)> {
    let mut cmd = Command::new(binary);
    cmd.arg("--listen")
        .arg("127.0.0.1:0")
        .arg("--redact")
        .env("RUST_LOG", "info")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = cmd.spawn().context("failed to spawn relay")?;
    let stdout = child
        .stdout
        .take()
        .context("relay stdout missing after spawn")?;

    Ok((child, BufReader::new(stdout)))
}

async fn read_listen_addr(reader: &mut BufReader<ChildStdout>) -> Result<String> {
    let mut line = String::new();
    let bytes = timeout(READ_TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| anyhow!("timed out waiting for listen banner"))??;
    if bytes == 0 {
        return Err(anyhow!("relay exited before printing its address"));
    }

    let addr = line
        .split_whitespace()
        .last()
        .context("unexpected banner format")?;
    if !addr.contains(':') {
        return Err(anyhow!("banner missing socket: {}", line.trim()));
    }
    Ok(addr.to_string())
}
