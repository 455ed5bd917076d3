use anyhow::Context;
use erpcore::processing::plot::{install_bundled_font, install_font, text_rendering_available};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Headless rendering mode chosen once before any figure is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBackend {
    /// Captions and axis labels drawn with the given font file.
    Text { font: PathBuf },
    /// Captions drawn with the font compiled into `erpcore`.
    Bundled,
    /// Text could not be rendered at all: waveforms and frame only.
    TextFree,
}

impl RenderBackend {
    pub fn text_rendering(&self) -> bool {
        !matches!(self, RenderBackend::TextFree)
    }
}

/// Selects the backend. A configured font that cannot be used is fatal;
/// otherwise system fonts are tried before the bundled one.
pub fn select(configured: Option<&Path>) -> anyhow::Result<RenderBackend> {
    select_from(configured, SYSTEM_FONTS)
}

fn select_from(configured: Option<&Path>, candidates: &[&str]) -> anyhow::Result<RenderBackend> {
    if let Some(path) = configured {
        let bytes =
            fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        install_font(bytes).with_context(|| format!("loading font {}", path.display()))?;
        anyhow::ensure!(
            text_rendering_available(),
            "font {} cannot render text",
            path.display()
        );
        return Ok(RenderBackend::Text {
            font: path.to_path_buf(),
        });
    }

    for candidate in candidates.iter().map(Path::new) {
        let Ok(bytes) = fs::read(candidate) else {
            continue;
        };
        if install_font(bytes).is_ok() && text_rendering_available() {
            return Ok(RenderBackend::Text {
                font: candidate.to_path_buf(),
            });
        }
    }

    if install_bundled_font().is_ok() && text_rendering_available() {
        return Ok(RenderBackend::Bundled);
    }

    warn!("bundled font could not be rendered; figures will be drawn without text");
    Ok(RenderBackend::TextFree)
}
