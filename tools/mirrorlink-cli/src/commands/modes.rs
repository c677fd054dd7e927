//! Rank display modes by capability.

use anyhow::Context;

use mirrorlink_platform_core::{rank_modes, Mode};

pub fn run(specs: Vec<String>) -> anyhow::Result<()> {
    let mut modes = Vec::with_capacity(specs.len());
    for spec in &specs {
        let mode = parse_mode(spec).with_context(|| format!("Invalid mode {spec:?}"))?;
        modes.push(mode);
    }

    let ranked = rank_modes(&modes);
    if ranked.is_empty() {
        println!("No usable modes.");
        return Ok(());
    }

    println!("Ranked modes (most capable first):");
    for (index, mode) in ranked.iter().enumerate() {
        println!("  {}. {mode}", index + 1);
    }
    Ok(())
}

/// Parse "1920x1080@60" (refresh optional, defaults to 60 Hz).
fn parse_mode(spec: &str) -> anyhow::Result<Mode> {
    let (resolution, refresh) = spec.split_once('@').unwrap_or((spec, "60"));
    let (width, height) = resolution
        .split_once(['x', 'X'])
        .context("expected WIDTHxHEIGHT[@HZ]")?;

    Ok(Mode::new(
        width.trim().parse().context("invalid width")?,
        height.trim().parse().context("invalid height")?,
        refresh
            .trim()
            .trim_end_matches("Hz")
            .parse()
            .context("invalid refresh rate")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_short_forms() {
        assert_eq!(parse_mode("1920x1080@60").unwrap(), Mode::new(1920, 1080, 60));
        assert_eq!(parse_mode("1280x720").unwrap(), Mode::new(1280, 720, 60));
        assert_eq!(parse_mode("3840X2160@30Hz").unwrap(), Mode::new(3840, 2160, 30));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_mode("1080p").is_err());
        assert!(parse_mode("wxh@60").is_err());
    }
}
