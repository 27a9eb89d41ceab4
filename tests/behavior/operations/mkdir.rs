use crate::*;
use hdfs_stage::error::{ErrorKind, Result};
use hdfs_stage::transport::{EntryKind, Transport};

pub fn tests(ctx: &TestContext, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        ctx,
        test_ensure_directory_creates_missing,
        test_ensure_existing_directory_succeeds,
        test_ensure_nested_directories,
        test_ensure_root_directory,
        test_ensure_directory_over_file_fails
    ));
}

async fn test_ensure_directory_creates_missing(ctx: TestContext) -> Result<()> {
    let dir = ctx.new_remote_dir();

    ctx.uploader().ensure_directory(&dir).await?;

    let entry = ctx.gateway().stat(&dir).await?.expect("directory exists");
    assert_eq!(entry.kind, EntryKind::Dir);
    Ok(())
}

async fn test_ensure_existing_directory_succeeds(ctx: TestContext) -> Result<()> {
    let dir = ctx.new_remote_dir();
    let uploader = ctx.uploader();

    uploader.ensure_directory(&dir).await?;
    uploader.ensure_directory(&dir).await?;
    uploader.ensure_directory(&format!("{dir}/")).await?;

    assert!(ctx.remote_exists(&dir));
    Ok(())
}

async fn test_ensure_nested_directories(ctx: TestContext) -> Result<()> {
    let base = ctx.new_remote_dir();
    let nested = format!("{base}/a/b/c/d");

    ctx.uploader().ensure_directory(&nested).await?;

    assert!(ctx.remote_exists(&nested));
    Ok(())
}

async fn test_ensure_root_directory(ctx: TestContext) -> Result<()> {
    ctx.uploader().ensure_directory("/").await?;
    Ok(())
}

async fn test_ensure_directory_over_file_fails(ctx: TestContext) -> Result<()> {
    let dir = ctx.new_remote_dir();
    let file_path = format!("{dir}/not-a-dir");
    ctx.verifier()
        .write(&file_path, vec![1u8, 2, 3])
        .await
        .expect("seed file");

    let err = ctx
        .uploader()
        .ensure_directory(&file_path)
        .await
        .expect_err("a file is not a directory");

    assert_eq!(err.kind(), ErrorKind::RemoteWrite);
    Ok(())
}
