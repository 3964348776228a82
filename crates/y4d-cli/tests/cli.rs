use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    if let Some(path) = env::var_os("CARGO_BIN_EXE_y4d-cli") {
        return PathBuf::from(path);
    }
    if let Some(path) = env::var_os("CARGO_BIN_EXE_y4d_cli") {
        return PathBuf::from(path);
    }
    let exe = env::current_exe().expect("current exe");
    let mut debug_dir = exe.as_path();
    while let Some(parent) = debug_dir.parent() {
        if parent.file_name().and_then(|name| name.to_str()) == Some("debug") {
            let candidate = parent.join("y4d-cli");
            if candidate.exists() {
                return candidate;
            }
        }
        debug_dir = parent;
    }
    panic!("binary path missing");
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("time");
    let file_name = format!(
        "y4d_cli_{}_{}_{}.txt",
        name,
        now.as_secs(),
        now.subsec_nanos()
    );
    path.push(file_name);
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn formats_a_file_to_stdout() {
    let input = temp_file("bold", "*bold*");
    let output = Command::new(bin_path())
        .args([input.to_str().expect("path")])
        .output()
        .expect("run");

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "<span class=\"y4d-bold\">bold</span>");
}

#[test]
fn formats_stdin_when_no_input_given() {
    let mut child = Command::new(bin_path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"a /i/ b")
        .expect("write stdin");
    let output = child.wait_with_output().expect("run");

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "a <span class=\"y4d-italic\">i</span> b");
}

#[test]
fn in_place_rewrites_and_then_stabilizes() {
    let input = temp_file("in_place", "*bold*");
    let status = Command::new(bin_path())
        .args(["--in-place", input.to_str().expect("path")])
        .status()
        .expect("run");
    assert!(status.success(), "expected success exit code");

    let first = fs::read_to_string(&input).expect("read back");
    assert_eq!(first, "<span class=\"y4d-bold\">bold</span>");

    let status = Command::new(bin_path())
        .args(["--in-place", input.to_str().expect("path")])
        .status()
        .expect("run");
    assert!(status.success(), "expected success exit code");

    let second = fs::read_to_string(&input).expect("read back");
    assert_eq!(second, first, "second pass must be a no-op");
}

#[test]
fn in_place_without_file_is_a_usage_error() {
    let output = Command::new(bin_path())
        .args(["--in-place"])
        .stdin(Stdio::null())
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn surplus_arguments_are_a_usage_error() {
    let output = Command::new(bin_path())
        .args(["one", "two"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
}
