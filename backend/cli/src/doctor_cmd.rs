//! `soundrelay doctor`: checks a deployment can actually fetch and deliver.

use std::path::Path;

use anyhow::Result;
use tokio::process::Command;

use crate::config::Config;

/// Executes the full doctor diagnosis.
pub async fn run(config: &Config) -> Result<()> {
    println!("\n🔍 Running soundrelay doctor...\n");

    let token_ok = check_token(config);
    let extractor_ok = check_extractor(&config.ytdlp_path).await;
    let ffmpeg_ok = check_ffmpeg().await;
    let scratch_ok = check_scratch(config.scratch_dir.as_deref());

    println!();
    if token_ok && extractor_ok && ffmpeg_ok && scratch_ok {
        println!("✅ All checks passed! soundrelay is ready to serve.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }

    Ok(())
}

fn check_token(config: &Config) -> bool {
    println!("Checking Environment Variables:");

    let ok = match config.require_token() {
        Ok(_) => {
            println!("  🟢 BOT_TOKEN is set");
            true
        }
        Err(_) => {
            println!("  🔴 BOT_TOKEN is missing (REQUIRED)");
            false
        }
    };
    match &config.public_base_url {
        Some(url) => println!("  🟢 webhook base URL is {url}"),
        None => println!("  🟡 WEBHOOK_BASE_URL is missing (needed for webhook mode)"),
    }
    ok
}

async fn version_of(binary: &Path, flag: &str) -> Option<String> {
    let output = Command::new(binary).arg(flag).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().map(|line| line.trim().to_string())
}

async fn check_extractor(binary: &Path) -> bool {
    println!("Checking extractor:");
    match version_of(binary, "--version").await {
        Some(version) => {
            println!("  🟢 {} {}", binary.display(), version);
            true
        }
        None => {
            println!("  🔴 {} could not be run (set YTDLP_PATH)", binary.display());
            false
        }
    }
}

/// The extractor hands audio conversion to ffmpeg.
async fn check_ffmpeg() -> bool {
    println!("Checking ffmpeg:");
    match version_of(Path::new("ffmpeg"), "-version").await {
        Some(version) => {
            println!("  🟢 {version}");
            true
        }
        None => {
            println!("  🔴 ffmpeg not found on PATH (audio extraction will fail)");
            false
        }
    }
}

fn check_scratch(root: Option<&Path>) -> bool {
    println!("Checking scratch space:");
    let probe = match root {
        Some(dir) => tempfile::Builder::new().prefix("soundrelay-doctor-").tempdir_in(dir),
        None => tempfile::Builder::new().prefix("soundrelay-doctor-").tempdir(),
    };
    match probe.and_then(|dir| dir.close()) {
        Ok(()) => {
            let shown = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
            println!("  🟢 {} is writable", shown.display());
            true
        }
        Err(e) => {
            println!("  🔴 scratch directory is not writable: {e}");
            false
        }
    }
}
