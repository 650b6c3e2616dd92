// Build script for the floor map viewer
// Copies the sample config file next to the built executable

use std::env;
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "floormap_viewer.toml";

fn main() {
    println!("cargo:rerun-if-changed={}", CONFIG_FILE);

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");

    // OUT_DIR = target/<profile>/build/<crate>-<hash>/out
    let target_dir = Path::new(&out_dir)
        .ancestors()
        .nth(3)
        .expect("Could not find target directory");

    let config_src = Path::new(CONFIG_FILE);
    let config_dst = target_dir.join(CONFIG_FILE);

    // The sample is the source of truth; edits land on the next build
    if config_src.exists() {
        fs::copy(config_src, &config_dst).expect("Failed to copy config file");
        println!(
            "cargo:warning=Copied config file to {}",
            config_dst.display()
        );
    }
}
