//! Open the home page in the platform's default browser

use std::process::{Child, Command};

/// Platform launcher and its leading arguments
fn launcher() -> (&'static str, Vec<&'static str>) {
    if cfg!(target_os = "windows") {
        ("cmd", vec!["/c", "start"])
    } else if cfg!(target_os = "macos") {
        ("open", Vec::new())
    } else {
        ("xdg-open", Vec::new())
    }
}

/// Build the command that opens `url`
pub fn open_command(url: &str) -> Command {
    let (program, args) = launcher();
    let mut cmd = Command::new(program);
    cmd.args(args).arg(url);
    cmd
}

/// Launch the browser without waiting for it
pub fn open(url: &str) -> std::io::Result<Child> {
    open_command(url).spawn()
}
