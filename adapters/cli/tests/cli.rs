use std::{
    io::Write,
    process::{Command, Output, Stdio},
};

fn run_with_script(script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_waterworks"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to launch the waterworks binary");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("failed to send the script");
    child.wait_with_output().expect("failed to wait for waterworks")
}

#[test]
fn a_round_of_passes_delivers_water() {
    let output = run_with_script("W\nW\nW\nW\n");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "session should finish: {stdout}");
    assert!(stdout.starts_with("Welcome to Waterworks.\n"));
    assert!(stdout.contains("Player: Mario's turn | Team: Plumbers"));
    assert!(stdout.contains("Player: Waluigi's turn | Team: Saboteurs"));
    assert!(stdout.ends_with("Final score: Team Plumbers: 1 | Team Saboteurs: 0\n"));
}

#[test]
fn malformed_scripts_are_reported() {
    let output = run_with_script("Q 10\n");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("a click needs both coordinates"), "{stderr}");
}
