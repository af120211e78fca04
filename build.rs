use std::path::{Path, PathBuf};

fn main() {
    // Only the ESP-IDF target carries sysenv from esp-idf-sys; host builds skip it.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    if std::env::var("CARGO_FEATURE_EDGE_IMPULSE").is_ok() {
        let compiler = find_compiler();
        build_gesture_model(compiler.as_deref());
    }
}

/// Locate the RISC-V g++ shipped with the embuild toolchain, first in the
/// project-local `.embuild`, then in the global `~/.espressif`.
fn find_compiler() -> Option<PathBuf> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").ok()?);
    let roots = [
        Some(manifest_dir.join(".embuild")),
        dirs::home_dir().map(|h| h.join(".espressif")),
    ];

    roots
        .into_iter()
        .flatten()
        .map(|root| root.join("espressif/tools/riscv32-esp-elf"))
        .filter_map(|tools| std::fs::read_dir(tools).ok())
        .flat_map(|entries| entries.flatten())
        .map(|entry| entry.path().join("riscv32-esp-elf/bin/riscv32-esp-elf-g++"))
        .find(|candidate| candidate.exists())
}

fn build_gesture_model(compiler: Option<&Path>) {
    let sdk_root = PathBuf::from("magic-wand_inferencing");

    let mut build = cc::Build::new();
    build
        .cpp(true)
        .flag("-std=c++14")
        .flag("-O3")
        .define("EI_CLASSIFIER_TFLITE_ENABLE_CMSIS_NN", "0")
        .define("EI_NATIVE_ARCH", "1")
        .include(&sdk_root)
        .include(sdk_root.join("src"))
        .include(sdk_root.join("src/edge-impulse-sdk"))
        .include(sdk_root.join("src/model-parameters"))
        .include(sdk_root.join("src/tflite-model"));

    match compiler {
        Some(path) => {
            build.compiler(path);
        }
        None => {
            build.compiler("riscv32-esp-elf-g++");
        }
    }

    let mut sources = Vec::new();
    collect_sources(&sdk_root.join("src"), &mut sources);
    build.files(sources);
    build.compile("gesture-model");

    println!("cargo:rerun-if-changed=magic-wand_inferencing");
}

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        println!("cargo:warning=model SDK directory {} not found", dir.display());
        return;
    };

    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            collect_sources(&path, out);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("c" | "cpp" | "cc")
        ) {
            out.push(path);
        }
    }
}
