// Build script for Lodestar
// Embeds the application manifest (common controls v6, per-monitor DPI)

fn main() {
    println!("cargo:rerun-if-changed=resources/");
    println!("cargo:rerun-if-changed=build.rs");

    // The shell logic also builds on other targets for testing
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    // TaskDialogIndirect needs comctl32 v6, which only the manifest selects
    let rc_path = std::path::Path::new("resources/lodestar.rc");
    if rc_path.exists() {
        let _ = embed_resource::compile("resources/lodestar.rc", embed_resource::NONE);
    }

    for lib in ["user32", "gdi32", "dwmapi", "shell32", "comctl32", "wtsapi32"] {
        println!("cargo:rustc-link-lib={}", lib);
    }
}
