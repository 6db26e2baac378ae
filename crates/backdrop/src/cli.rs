use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::PixelSize;
use shaderlib::ShaderId;

#[derive(Parser, Debug)]
#[command(
    name = "backdrop",
    author,
    version,
    about = "Scroll-reactive GPU shader background",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Scene configuration file (defaults to `scene.toml` in the config directory).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub preview: PreviewArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the preview window (the default when no subcommand is given).
    Preview(PreviewArgs),
    /// Render every registry shader offscreen and write PNG thumbnails.
    Thumbnails(ThumbnailArgs),
    /// List the shader registry.
    List,
    /// Print the background parameters for one scroll position as JSON.
    Scroll(ScrollArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Shader id or slug (`1`, `ether`, ...); persisted like a selection.
    #[arg(long, value_name = "ID")]
    pub shader: Option<ShaderId>,

    /// Feed pointer movement into the `iMouse` uniform.
    #[arg(long)]
    pub interactive: bool,

    /// Initial window size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<PixelSize>,

    /// Height of the virtual document being scrolled, in pixels.
    #[arg(long, value_name = "PX", default_value_t = 3600.0)]
    pub document_height: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ThumbnailArgs {
    /// Output directory for `<slug>.png` files.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Frames to render before capturing.
    #[arg(long, value_name = "N", default_value_t = 60)]
    pub frames: u32,

    /// Thumbnail edge length; defaults to the configured thumbnail size.
    #[arg(long, value_name = "PX")]
    pub size: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct ScrollArgs {
    /// Current scroll offset from the top of the document.
    #[arg(long, value_name = "PX")]
    pub offset: f64,

    #[arg(long, value_name = "PX")]
    pub document_height: f64,

    #[arg(long, value_name = "PX")]
    pub viewport_height: f64,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<PixelSize, String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok(PixelSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), PixelSize::new(1280, 720));
        assert_eq!(parse_size(" 64X48 ").unwrap(), PixelSize::new(64, 48));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn preview_is_the_default_command() {
        let cli = Cli::try_parse_from(["backdrop", "--shader", "ether", "--interactive"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.preview.shader, Some(ShaderId::Ether));
        assert!(cli.preview.interactive);
    }

    #[test]
    fn scroll_subcommand_requires_metrics() {
        assert!(Cli::try_parse_from(["backdrop", "scroll", "--offset", "10"]).is_err());
        let cli = Cli::try_parse_from([
            "backdrop",
            "scroll",
            "--offset",
            "500",
            "--document-height",
            "1500",
            "--viewport-height",
            "500",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Scroll(_))));
    }

    #[test]
    fn rejects_unknown_shader() {
        assert!(Cli::try_parse_from(["backdrop", "--shader", "99"]).is_err());
    }
}
