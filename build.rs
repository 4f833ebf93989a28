//! Build script: embeds the version string via `POSTINSTALL_VERSION`.

use std::process::Command;

fn main() {
    // Prefer POSTINSTALL_VERSION if set (release builds), otherwise fall back
    // to git describe for local development builds.
    if let Ok(version) = std::env::var("POSTINSTALL_VERSION") {
        println!("cargo:rustc-env=POSTINSTALL_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !version.is_empty() {
            println!("cargo:rustc-env=POSTINSTALL_VERSION={version}");
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=POSTINSTALL_VERSION");
}
