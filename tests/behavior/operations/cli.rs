use crate::*;
use assert_cmd::prelude::*;
use hdfs_stage::error::Result;
use predicates::prelude::*;

pub fn tests(ctx: &TestContext, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        ctx,
        e2e_test_upload_command_succeeds,
        e2e_test_upload_json_output,
        e2e_test_upload_missing_source_exit_code,
        e2e_test_upload_fail_policy_exit_code,
        e2e_test_mkdir_and_stat,
        e2e_test_stat_not_found,
        e2e_test_check_without_container_tool,
        e2e_test_unsupported_transport
    ));
}

async fn e2e_test_upload_command_succeeds(ctx: TestContext) -> Result<()> {
    let (source, content) = ctx.new_local_file("cli_upload.csv", 1024);
    let remote_dir = ctx.new_remote_dir();

    ctx.command()
        .arg("upload")
        .arg(&source)
        .arg(format!("{remote_dir}/"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Upload"))
        .stdout(predicate::str::contains("Verified"))
        .stdout(predicate::str::contains("1024 bytes"));

    let uploaded = ctx
        .read_remote(&format!("{remote_dir}/cli_upload.csv"))
        .await;
    assert_eq!(uploaded, content);
    Ok(())
}

async fn e2e_test_upload_json_output(ctx: TestContext) -> Result<()> {
    let (source, _) = ctx.new_local_file("cli_json.csv", 2000);
    let destination = format!("{}/cli_json.csv", ctx.new_remote_dir());

    ctx.command()
        .arg("put")
        .arg(&source)
        .arg(&destination)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"))
        .stdout(predicate::str::contains("\"success\":true"))
        .stdout(predicate::str::contains("\"remote_size\":2000"));
    Ok(())
}

async fn e2e_test_upload_missing_source_exit_code(ctx: TestContext) -> Result<()> {
    let source = ctx.missing_local_file();

    ctx.command()
        .arg("upload")
        .arg(&source)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Source file not found"));
    Ok(())
}

async fn e2e_test_upload_fail_policy_exit_code(ctx: TestContext) -> Result<()> {
    let (source, _) = ctx.new_local_file("cli_exists.csv", 64);
    let destination = format!("{}/cli_exists.csv", ctx.new_remote_dir());

    ctx.command()
        .arg("upload")
        .arg(&source)
        .arg(&destination)
        .assert()
        .success();

    ctx.command()
        .env("STAGE_OVERWRITE", "fail")
        .arg("upload")
        .arg(&source)
        .arg(&destination)
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("already exists"));
    Ok(())
}

async fn e2e_test_mkdir_and_stat(ctx: TestContext) -> Result<()> {
    let dir = ctx.new_remote_dir();

    for _ in 0..2 {
        ctx.command()
            .arg("mkdir")
            .arg(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("Directory ready"));
    }

    let path = format!("{dir}/stat.bin");
    ctx.verifier()
        .write(&path, vec![0u8; 42])
        .await
        .expect("seed file");

    ctx.command()
        .arg("stat")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("type=file"))
        .stdout(predicate::str::contains("size=42"));

    ctx.command()
        .arg("stat")
        .arg(&path)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\":\"file\""));
    Ok(())
}

async fn e2e_test_stat_not_found(ctx: TestContext) -> Result<()> {
    ctx.command()
        .arg("stat")
        .arg(format!("{}/nope", ctx.new_remote_dir()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

async fn e2e_test_check_without_container_tool(_ctx: TestContext) -> Result<()> {
    base_cmd()
        .env("STAGE_TRANSPORT", "shell")
        .env("STAGE_CONTAINER_TOOL", "/nonexistent/bin/docker")
        .arg("check")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("transport unavailable"));
    Ok(())
}

async fn e2e_test_unsupported_transport(_ctx: TestContext) -> Result<()> {
    base_cmd()
        .env("STAGE_TRANSPORT", "ftp")
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported transport"));
    Ok(())
}
