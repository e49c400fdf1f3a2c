//! Command-line access to the admission checks.
//!
//! ```text
//! image-guard url <URL>...      print the canonical URL or the rejection code
//! image-guard digest <FILE>...  print the SHA-256 of each file
//! ```
//!
//! Set `IMAGE_GUARD_CONFIG` to a YAML file to apply an allow-list or extra denials.
//! Exits with status 1 if any URL is rejected or any file cannot be read.

use anyhow::{bail, Context};
use image_search_guard::digest::ContentHasher;
use image_search_guard::{GuardConfig, UrlValidator};
use std::io::Read;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<GuardConfig> {
    match std::env::var("IMAGE_GUARD_CONFIG") {
        Ok(path) => GuardConfig::load(&path).with_context(|| format!("loading {}", path)),
        Err(_) => Ok(GuardConfig::from_env()),
    }
}

fn check_urls(urls: &[String]) -> anyhow::Result<bool> {
    let validator = UrlValidator::new(load_config()?.url_policy());
    let mut all_ok = true;
    for raw in urls {
        match validator.validate(raw) {
            Ok(url) => println!("ok\t{}", url),
            Err(e) => {
                all_ok = false;
                println!("{}\t{}\t{}", e.code(), raw, e);
            }
        }
    }
    Ok(all_ok)
}

fn digest_files(paths: &[String]) -> anyhow::Result<bool> {
    let mut all_ok = true;
    for path in paths {
        match digest_file(path) {
            Ok(hex) => println!("{}  {}", hex, path),
            Err(e) => {
                all_ok = false;
                eprintln!("{}: {:#}", path, e);
            }
        }
    }
    Ok(all_ok)
}

fn digest_file(path: &str) -> anyhow::Result<String> {
    let mut file = std::fs::File::open(path).with_context(|| format!("opening {}", path))?;
    let mut hasher = ContentHasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    tracing::debug!(path, bytes = hasher.len(), "hashed file");
    Ok(hasher.finalize())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let ok = match args.split_first() {
        Some((cmd, rest)) if cmd == "url" && !rest.is_empty() => check_urls(rest)?,
        Some((cmd, rest)) if cmd == "digest" && !rest.is_empty() => digest_files(rest)?,
        _ => bail!("usage: image-guard url <URL>... | image-guard digest <FILE>..."),
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
