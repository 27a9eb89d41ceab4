use crate::*;
use hdfs_stage::error::{Error, ErrorKind, Result, Step};
use hdfs_stage::transport::{
    RemoteEntry, ShellConfig, Transport, TransportConfig, TransportHandle,
};
use hdfs_stage::uploader::{OverwritePolicy, TransferRequest, Uploader};
use std::path::Path;
use std::time::Duration;

pub fn tests(ctx: &TestContext, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        ctx,
        test_unreachable_gateway_is_transport_unavailable,
        test_missing_container_tool_is_transport_unavailable,
        test_stopped_container_fails_probe,
        test_missing_source_reported_before_transport,
        test_slow_transport_times_out,
        test_fs_gateway_probe_succeeds
    ));
}

fn unreachable_webhdfs() -> Uploader<TransportHandle> {
    let config = TransportConfig::WebHdfs {
        // nothing listens on the discard port
        endpoint: "http://127.0.0.1:9".to_string(),
        user: "root".to_string(),
        atomic_dir: "/tmp/.hdfs-stage/".to_string(),
    };
    let handle = TransportHandle::connect(&config).expect("build webhdfs transport");
    Uploader::new(handle, TEST_TIMEOUT)
}

fn shell_with_tool(tool: &str) -> Uploader<TransportHandle> {
    let config = TransportConfig::Shell(ShellConfig {
        container: "namenode".to_string(),
        container_tool: tool.to_string(),
        container_tmp: "/tmp".to_string(),
    });
    let handle = TransportHandle::connect(&config).expect("build shell transport");
    Uploader::new(handle, TEST_TIMEOUT)
}

async fn test_unreachable_gateway_is_transport_unavailable(ctx: TestContext) -> Result<()> {
    let uploader = unreachable_webhdfs();

    let err = uploader
        .ensure_directory("/data")
        .await
        .expect_err("gateway is down");
    assert_eq!(err.kind(), ErrorKind::TransportUnavailable);

    let (source, _) = ctx.new_local_file("lastfm_data.csv", 1024);
    let request = TransferRequest::new(&source, "/data/lastfm_data.csv", OverwritePolicy::Replace)?;
    let result = uploader.upload(&request).await;
    assert!(!result.success);
    assert!(!result.transferred);
    assert_eq!(result.error_kind(), Some(ErrorKind::TransportUnavailable));
    Ok(())
}

async fn test_missing_container_tool_is_transport_unavailable(ctx: TestContext) -> Result<()> {
    let uploader = shell_with_tool("/nonexistent/bin/docker");

    for err in [
        uploader.probe().await.expect_err("no container tool"),
        uploader
            .ensure_directory("/data")
            .await
            .expect_err("no container tool"),
        uploader.verify("/data/x.csv", 1).await.expect_err("no container tool"),
    ] {
        assert_eq!(err.kind(), ErrorKind::TransportUnavailable, "{err}");
    }

    let (source, _) = ctx.new_local_file("plays.csv", 10);
    let result = uploader
        .upload(&TransferRequest::new(&source, "/data/plays.csv", OverwritePolicy::Replace)?)
        .await;
    assert!(matches!(
        result.error,
        Some(Error::TransportUnavailable {
            step: Step::Probe,
            ..
        })
    ));
    Ok(())
}

async fn test_stopped_container_fails_probe(_ctx: TestContext) -> Result<()> {
    // `false` exits non-zero without printing `true`, like inspecting a stopped container
    let err = shell_with_tool("false")
        .probe()
        .await
        .expect_err("container is not running");

    assert_eq!(err.kind(), ErrorKind::TransportUnavailable);
    assert!(err.to_string().contains("namenode"), "{err}");
    Ok(())
}

async fn test_missing_source_reported_before_transport(ctx: TestContext) -> Result<()> {
    let request = TransferRequest::new(
        ctx.missing_local_file(),
        "/data/lastfm_data.csv",
        OverwritePolicy::Replace,
    )?;

    let result = unreachable_webhdfs().upload(&request).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::SourceNotFound));
    Ok(())
}

/// Never answers within the uploader's deadline.
struct StalledTransport;

impl Transport for StalledTransport {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn probe(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn ensure_directory(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    async fn put(&self, _source: &Path, _destination: &str, _replace: bool) -> Result<()> {
        Ok(())
    }

    async fn stat(&self, _path: &str) -> Result<Option<RemoteEntry>> {
        Ok(None)
    }
}

async fn test_slow_transport_times_out(ctx: TestContext) -> Result<()> {
    let (source, _) = ctx.new_local_file("slow.csv", 16);
    let uploader = Uploader::new(StalledTransport, Duration::from_millis(100));

    let result = uploader
        .upload(&TransferRequest::new(&source, "/data/slow.csv", OverwritePolicy::Replace)?)
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::TransportUnavailable));
    let message = result.error.map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("no response within"), "{message}");
    Ok(())
}

async fn test_fs_gateway_probe_succeeds(ctx: TestContext) -> Result<()> {
    let uploader = ctx.uploader();
    uploader.probe().await?;
    assert_eq!(uploader.transport().name(), "fs");
    Ok(())
}
