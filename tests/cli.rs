use std::process::Command;

fn probe() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_dropbox-oauth-probe"));
    command
        .current_dir(std::env::temp_dir())
        .env("CLIENT_ID", "id")
        .env("CLIENT_SECRET", "secret")
        .env("REDIRECT_URI", "http://localhost:53821/cb")
        .env_remove("CALLBACK_TIMEOUT_SECS");
    command
}

#[test]
fn each_missing_variable_exits_with_status_one() {
    for missing in ["CLIENT_ID", "CLIENT_SECRET", "REDIRECT_URI"].iter() {
        let output = probe().env_remove(missing).output().unwrap();

        assert_eq!(output.status.code(), Some(1), "without {}", missing);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains(missing), "stderr: {}", stderr);
        assert!(output.stdout.is_empty());
    }
}

#[test]
fn malformed_redirect_uri_exits_with_status_one() {
    let output = probe().env("REDIRECT_URI", "::not a uri").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
