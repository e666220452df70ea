use std::env;

fn main() {
    let version =
        env::var("CACTUS_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=CACTUS_VERSION={version}");
    println!("cargo:rerun-if-env-changed=CACTUS_VERSION");
}
