//! Outside debug builds, strips the `kernel` binary down to a raw image the
//! BCM2837 bootrom/QEMU loads directly. The linker script itself is applied
//! uniformly to every target (the `kernel` bin and the `tests/` harnesses
//! alike) via `.cargo/config.toml`'s `rustflags`, since both need `_start`
//! and `__pg_dir` to resolve.

use std::env;

fn main() -> Result<(), String> {
    println!("cargo:rustc-link-arg-bin=kernel=-n");

    // In a release build there is no debugger attached, so it's safe to
    // throw away symbols and emit a flat binary instead of an ELF.
    if env::var("DEBUG").as_deref() == Ok("false") {
        println!("cargo:rustc-link-arg-bin=kernel=--oformat=binary");
        println!("cargo:rustc-link-arg-bin=kernel=--strip-all");
    }

    println!("cargo:rerun-if-changed=src/linker.ld");

    Ok(())
}
