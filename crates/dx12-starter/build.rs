use std::{fs, path};

fn main() {
    println!("cargo::rerun-if-changed=../../bin/");
    println!("cargo::rerun-if-changed=shaders/");

    // PIX markers are optional at runtime; copy the DLL only when it is there
    copy_optional_dll("WinPixEventRuntime.dll");

    copy_shaders("shaders.hlsl");
}

fn target_dir() -> path::PathBuf {
    let out_dir = std::env::var("OUT_DIR").unwrap_or_default();
    path::Path::new(&out_dir).join("../../../")
}

fn copy_optional_dll(dll: &str) {
    let src = path::Path::new("../../bin/").join(dll);
    if !src.exists() {
        println!("cargo::warning={dll} not found in bin/, PIX events are disabled");
        return;
    }

    let dst = target_dir().join(dll);
    if let Err(e) = fs::copy(&src, &dst) {
        println!("cargo::warning=Failed to copy {}: {e}", src.display());
    }
}

fn copy_shaders(shader: &str) {
    let out_dir = target_dir().join("shaders/");

    if !out_dir.exists() {
        if let Err(e) = fs::create_dir(&out_dir) {
            println!("Failed to create {}: {e}", out_dir.display());
        }
    }

    let src_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap() + "/shaders/";
    let src = src_dir + shader;
    let dst = out_dir.join(shader);
    println!("Copying {src} to {}", dst.display());

    if let Err(e) = fs::copy(&src, &dst) {
        panic!("Failed to copy {src}: {e}");
    }
}
