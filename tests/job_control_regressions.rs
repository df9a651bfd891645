use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

static HOME_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn run_shell(lines: &[&str]) -> std::process::Output {
    // Isolate HOME so these runs never touch the developer's real
    // ~/.jsh_history. cargo test runs tests from this binary as concurrent
    // threads sharing one pid, so a counter (not just the pid) keeps
    // parallel invocations from colliding on the same directory.
    let unique = HOME_COUNTER.fetch_add(1, Ordering::Relaxed);
    let home = std::env::temp_dir().join(format!(
        "jsh_job_control_home_{}_{unique}",
        std::process::id()
    ));
    std::fs::create_dir_all(&home).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_jsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("HOME", &home)
        .env("USERPROFILE", &home)
        .spawn()
        .expect("spawn jsh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    let output = child.wait_with_output().expect("wait output");
    let _ = std::fs::remove_dir_all(&home);
    output
}

#[cfg(unix)]
#[test]
fn background_job_does_not_block_the_prompt() {
    // Redirect the background job's own stdout to a file: if it instead
    // inherited the test harness's piped stdout, `wait_with_output` would
    // block on that pipe's EOF until the 2-second sleep finishes, which
    // would measure the pipe lifetime rather than the shell's prompt loop.
    let dir = std::env::temp_dir().join(format!("jsh_bg_noblock_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let sink = dir.join("sink.txt");

    let start = Instant::now();
    let output = run_shell(&[
        &format!("sleep 2 > {0} 2> {0} &", sink.display()),
        "echo AFTER_BG",
    ]);
    let elapsed = start.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("AFTER_BG"), "stdout was: {stdout}");
    assert!(
        elapsed.as_secs() < 2,
        "shell waited on a background job instead of returning immediately: {elapsed:?}"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn background_job_prints_bg_marker() {
    let output = run_shell(&["sleep 0 &"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[bg]"), "stdout was: {stdout}");
}

#[cfg(unix)]
#[test]
fn foreground_job_signaled_does_not_kill_the_shell() {
    let output = run_shell(&["sh -c 'kill -INT $$'", "echo SURVIVED"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SURVIVED"), "stdout was: {stdout}");
}

#[cfg(unix)]
#[test]
fn two_foreground_jobs_on_one_line_run_in_order() {
    let output = run_shell(&["echo one; echo two"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let one_idx = stdout.find("one").expect("missing 'one'");
    let two_idx = stdout.find("two").expect("missing 'two'");
    assert!(one_idx < two_idx, "stdout was: {stdout}");
}
