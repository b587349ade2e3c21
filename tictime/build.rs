// tictime/build.rs

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=../tictime-ui/src");
    println!("cargo:rerun-if-changed=../tictime-ui/static/index.html");
    println!("cargo:rerun-if-changed=../tictime-ui/static/styles/base.css");
    println!("cargo:rerun-if-env-changed=TICTIME_SKIP_UI");

    // 1) Get the crate root as a PathBuf
    let manifest = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let crate_root = PathBuf::from(&manifest);

    // 2) Compute the UI directory (sibling of tictime/)
    let parent_dir = crate_root
        .parent()
        .expect("tictime has no parent directory");
    let ui_dir = parent_dir.join("tictime-ui");
    let dist_dir = ui_dir.join("ui").join("dist");
    let static_dir = ui_dir.join("static");
    let dist_styles_dir = dist_dir.join("styles");

    // The embedded asset folder has to exist even when the wasm build is skipped
    fs::create_dir_all(&dist_styles_dir).expect("failed to create dist directory");

    // 3) Build the UI via wasm-pack, unless asked not to
    if env::var_os("TICTIME_SKIP_UI").is_none() {
        let status = Command::new("wasm-pack")
            .env("CARGO_TARGET_DIR", "../target/target-wasm")
            .args([
                "build",
                "../tictime-ui",
                "--release",
                "--target",
                "web",
                "--out-dir",
                "ui/dist",
            ])
            .current_dir(&ui_dir)
            .status();
        match status {
            Ok(s) if s.success() => {}
            Ok(s) => println!("cargo:warning=wasm-pack exited with {s}; serving static shell only"),
            Err(e) => println!("cargo:warning=wasm-pack not available ({e}); serving static shell only"),
        }
    }

    fs::copy(static_dir.join("index.html"), dist_dir.join("index.html"))
        .expect("failed to copy index.html");
    fs::copy(
        static_dir.join("styles").join("base.css"),
        dist_styles_dir.join("base.css"),
    )
    .expect("failed to copy base.css");
}
