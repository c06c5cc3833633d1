use anyhow::{Context, Result};
use chrono::TimeZone;
use std::env;
use std::fs;
use std::process::Command;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;

    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());

    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        Emitter::default().idempotent().fail_on_error().emit()?;
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE=unknown");
    }

    let now = match env::var("SOURCE_DATE_EPOCH") {
        Ok(val) => {
            let secs = val.parse::<i64>().context("invalid SOURCE_DATE_EPOCH")?;
            chrono::Utc
                .timestamp_opt(secs, 0)
                .single()
                .context("SOURCE_DATE_EPOCH out of range")?
        }
        Err(_) => chrono::Utc::now(),
    };

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let mpegaudio_version = mpegaudio_version_from_metadata().unwrap_or_else(|_| {
        mpegaudio_version_from_manifest().unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=MPEGAUDIO_VERSION={mpegaudio_version}");

    println!("cargo:rerun-if-changed=mpegaudio/Cargo.toml");

    Ok(())
}

/// Library version from cargo metadata, for both path and registry dependencies.
fn mpegaudio_version_from_metadata() -> Result<String> {
    let output = Command::new("cargo")
        .args(["metadata", "--format-version", "1"])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed");
    }

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    let version = metadata["packages"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|package| package["name"].as_str() == Some("mpegaudio"))
        .and_then(|package| package["version"].as_str());

    match version {
        Some(version) => Ok(version.to_string()),
        None => anyhow::bail!("mpegaudio package not found in metadata"),
    }
}

fn mpegaudio_version_from_manifest() -> Result<String> {
    let manifest = fs::read_to_string("mpegaudio/Cargo.toml")?;

    for line in manifest.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("version") {
            if let Some(value) = value.trim_start().strip_prefix('=') {
                return Ok(value.trim().trim_matches('"').to_string());
            }
        }
    }

    anyhow::bail!("Could not find version in mpegaudio/Cargo.toml");
}
