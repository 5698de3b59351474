use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("codedeploy-trigger").expect("Binary exists");
    // Keep validation tests away from any real account.
    cmd.env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_SESSION_TOKEN");
    cmd
}

fn render_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("Running render failed");
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("render prints JSON")
}

#[test]
fn render_ecs_prints_exact_content_and_fingerprint() {
    let out = render_json(bin().args([
        "render",
        "--target",
        "ECS",
        "--task-definition-arn",
        "this:is:the:arn",
        "--container-name",
        "containerName",
        "--container-port",
        "1337",
    ]));

    assert_eq!(out["ok"], true);
    assert_eq!(
        out["content"],
        r#"{"version":"0.0","Resources":[{"TargetService":{"Type":"AWS::ECS::Service","Properties":{"TaskDefinition":"this:is:the:arn","LoadBalancerInfo":{"ContainerName":"containerName","ContainerPort":1337}}}}]}"#
    );
    assert_eq!(
        out["sha256"],
        "c3829ef4afcca21e65dcbc114a96cf931ac2a22b60aa469f89d8d8830953e11b"
    );
}

#[test]
fn render_lambda_accepts_camel_case_flags() {
    let out = render_json(bin().args([
        "render",
        "--target",
        "Lambda",
        "--functionName",
        "function-name",
        "--functionAlias",
        "function-alias",
        "--currentVersion",
        "42",
        "--targetVersion",
        "43",
    ]));

    assert_eq!(
        out["content"],
        r#"{"version":"0.0","Resources":[{"TargetService":{"Type":"AWS::Lambda::Function","Properties":{"Name":"function-name","Alias":"function-alias","CurrentVersion":"42","TargetVersion":"43"}}}]}"#
    );
}

#[test]
fn render_file_is_hashed_verbatim() {
    let file = NamedTempFile::new().expect("Creating temp appspec failed");
    write(file.path(), b"{}").expect("Writing temp appspec failed");

    let out = render_json(
        bin()
            .arg("render")
            .arg("--app-spec-file-name")
            .arg(file.path())
            // ignored when a file is given
            .args(["--target", "ECS"]),
    );

    assert_eq!(out["content"], "{}");
    assert_eq!(out["bytes"], 2);
    assert_eq!(
        out["sha256"],
        "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
    );
}

#[test]
fn render_empty_file_fails() {
    let file = NamedTempFile::new().expect("Creating temp appspec failed");

    bin()
        .arg("render")
        .arg("--app-spec-file-name")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("is empty"));
}

#[test]
fn render_without_target_fails() {
    bin()
        .args(["render", "--container-name", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"target\""));
}

#[test]
fn unknown_target_is_rejected() {
    bin()
        .args(["render", "--target", "EC2"])
        .assert()
        .failure();
}

#[test]
fn container_port_out_of_range_fails() {
    for port in ["-1", "65536"] {
        bin()
            .args([
                "render",
                "--target",
                "ECS",
                "--task-definition-arn",
                "arn",
                "--container-name",
                "web",
                "--container-port",
                port,
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid port number"));
    }
}

#[test]
fn deploy_without_application_name_fails_before_any_call() {
    bin()
        .args([
            "deploy",
            "--deployment-group-name",
            "group",
            "--target",
            "Lambda",
            "--function-name",
            "fn",
            "--function-alias",
            "live",
            "--current-version",
            "1",
            "--target-version",
            "2",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("application-name"));
}

#[test]
fn deploy_with_zero_wait_fails() {
    bin()
        .args([
            "deploy",
            "--application-name",
            "app",
            "--deployment-group-name",
            "group",
            "--max-wait-duration",
            "0s",
            "--target",
            "ECS",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max-wait-duration"));
}

#[test]
fn deploy_with_out_of_range_wait_fails() {
    bin()
        .args([
            "deploy",
            "--application-name",
            "app",
            "--deployment-group-name",
            "group",
            "--max-wait-duration",
            "18446744073709551615",
            "--target",
            "ECS",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duration out of range"));
}

#[test]
fn render_non_utf8_file_fails() {
    let file = NamedTempFile::new().expect("Creating temp appspec failed");
    write(file.path(), [b'{', 0xff, b'}']).expect("Writing temp appspec failed");

    bin()
        .arg("render")
        .arg("--app-spec-file-name")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not UTF-8"))
        .stdout(predicate::str::is_empty());
}
