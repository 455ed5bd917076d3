use std::fs;
use std::path::Path;

use ab_glyph::FontRef;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::math::stats::StatsHelper;
use crate::prelude::{ProcessingStage, StageConfig, StageError, StageResult};
use crate::processing::average::EvokedWaveform;
use crate::telemetry::log::LogManager;

const FONT_FAMILY: &str = "sans-serif";
const TITLE_PT: f64 = 14.0;
const LABEL_PT: f64 = 9.0;

/// DejaVu Sans, used when neither a configured nor a system font is usable.
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// PNG encodings of one rendered evoked waveform.
#[derive(Debug, Clone)]
pub struct Figure {
    pub title: String,
    pub file_png: Vec<u8>,
    pub inline_png: Vec<u8>,
    pub file_pixels: (u32, u32),
    pub inline_pixels: (u32, u32),
}

impl Figure {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path_ref = path.as_ref();
        fs::write(path_ref, &self.file_png).map_err(|err| StageError::io(path_ref, err))
    }

    pub fn inline_base64(&self) -> String {
        BASE64.encode(&self.inline_png)
    }

    pub fn file_base64(&self) -> String {
        BASE64.encode(&self.file_png)
    }
}

/// Evoked waveform together with its rendered figure.
#[derive(Debug, Clone)]
pub struct PlottedEvoked {
    pub evoked: EvokedWaveform,
    pub figure: Figure,
}

/// `erp_<name>.png` with separators and spaces replaced by underscores.
pub fn figure_file_name(condition_name: &str) -> String {
    let safe: String = condition_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ' ' => '_',
            other => other,
        })
        .collect();
    format!("erp_{}.png", safe)
}

/// Registers font bytes for caption and axis text. Called once, before plotting.
/// Bytes that do not parse as a font are rejected without being retained.
pub fn install_font(bytes: Vec<u8>) -> StageResult<()> {
    FontRef::try_from_slice(&bytes).map_err(font_err)?;
    register(Box::leak(bytes.into_boxed_slice()))
}

/// Registers the font compiled into the library.
pub fn install_bundled_font() -> StageResult<()> {
    register(BUNDLED_FONT)
}

fn register(bytes: &'static [u8]) -> StageResult<()> {
    register_font(FONT_FAMILY, FontStyle::Normal, bytes).map_err(font_err)
}

fn font_err<E>(_: E) -> StageError {
    StageError::InvalidInput("font data could not be parsed".into())
}

/// Draws a caption into a scratch buffer to check that text can be rendered.
pub fn text_rendering_available() -> bool {
    let (width, height) = (96u32, 32u32);
    let mut scratch = vec![0u8; (width * height * 3) as usize];
    let root = BitMapBackend::with_buffer(&mut scratch, (width, height)).into_drawing_area();
    let drawn = root
        .draw_text("ERP", &TextStyle::from((FONT_FAMILY, 12.0)), (2, 2))
        .and_then(|_| root.present());
    drawn.is_ok()
}

/// Renders an evoked waveform at file and inline resolution.
pub struct PlotStage {
    config: Option<StageConfig>,
    canvas: Vec<u8>,
    logger: LogManager,
}

impl PlotStage {
    pub fn new() -> Self {
        Self {
            config: None,
            canvas: Vec::new(),
            logger: LogManager::new("plot"),
        }
    }

    fn render_png(
        &mut self,
        evoked: &EvokedWaveform,
        config: &StageConfig,
        dpi: u32,
    ) -> StageResult<(Vec<u8>, (u32, u32))> {
        let (width, height) = config.geometry.pixels(dpi);
        self.canvas.clear();
        self.canvas.resize(width as usize * height as usize * 3, 0);
        {
            let root =
                BitMapBackend::with_buffer(&mut self.canvas, (width, height)).into_drawing_area();
            draw_evoked(&root, evoked, config.text_rendering, dpi)?;
            root.present().map_err(render_err)?;
        }
        let png = encode_png(&self.canvas, width, height)?;
        Ok((png, (width, height)))
    }
}

impl Default for PlotStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for PlotStage {
    type Input = EvokedWaveform;
    type Output = PlottedEvoked;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        if config.dpi_file == 0 || config.dpi_inline == 0 {
            return Err(StageError::InvalidInput("figure dpi must be positive".into()));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, evoked: EvokedWaveform) -> StageResult<PlottedEvoked> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        let (file_png, file_pixels) = self.render_png(&evoked, &config, config.dpi_file)?;
        let (inline_png, inline_pixels) = self.render_png(&evoked, &config, config.dpi_inline)?;
        self.logger.record(&format!(
            "{}: rendered {}x{} (file) and {}x{} (inline)",
            evoked.comment, file_pixels.0, file_pixels.1, inline_pixels.0, inline_pixels.1
        ));

        let figure = Figure {
            title: figure_title(&evoked),
            file_png,
            inline_png,
            file_pixels,
            inline_pixels,
        };
        Ok(PlottedEvoked { evoked, figure })
    }

    fn cleanup(&mut self) {
        self.canvas = Vec::new();
        self.config = None;
    }
}

pub fn figure_title(evoked: &EvokedWaveform) -> String {
    format!("Average ERP - {}", evoked.comment)
}

fn render_err<E: std::fmt::Display>(err: E) -> StageError {
    StageError::Render(err.to_string())
}

fn encode_err<E: std::fmt::Display>(err: E) -> StageError {
    StageError::Encode(err.to_string())
}

fn channel_color(index: usize, count: usize) -> HSLColor {
    let hue = index as f64 / count.max(1) as f64;
    HSLColor(hue * 0.85, 0.75, 0.42)
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        let pad = lo.abs().max(1.0) * 0.1;
        (lo - pad, hi + pad)
    }
}

fn draw_evoked(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    evoked: &EvokedWaveform,
    text: bool,
    dpi: u32,
) -> StageResult<()> {
    root.fill(&WHITE).map_err(render_err)?;

    let scale = dpi as f64 / 72.0;
    let times = evoked.times();
    let n_times = times.len();
    let (t0, t1) = if n_times > 1 && times[n_times - 1] > times[0] {
        (times[0], times[n_times - 1])
    } else {
        (evoked.tmin, evoked.tmin + 1.0 / evoked.sfreq)
    };
    let (lo, hi) = StatsHelper::finite_range(evoked.data.iter()).unwrap_or((-1.0, 1.0));
    let (lo, hi) = padded(lo, hi);

    let mut builder = ChartBuilder::on(root);
    builder.margin((8.0 * scale) as u32);
    if text {
        builder
            .caption(figure_title(evoked), (FONT_FAMILY, TITLE_PT * scale))
            .x_label_area_size((28.0 * scale) as u32)
            .y_label_area_size((44.0 * scale) as u32);
    }
    let mut chart = builder
        .build_cartesian_2d(t0..t1, lo..hi)
        .map_err(render_err)?;

    if text {
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Time (s)")
            .y_desc("Amplitude")
            .label_style((FONT_FAMILY, LABEL_PT * scale))
            .axis_desc_style((FONT_FAMILY, LABEL_PT * scale))
            .x_label_formatter(&|t| format!("{:.2}", t))
            .y_label_formatter(&|v| format!("{:.2e}", v))
            .draw()
            .map_err(render_err)?;
    } else {
        chart
            .plotting_area()
            .draw(&Rectangle::new([(t0, lo), (t1, hi)], BLACK.stroke_width(1)))
            .map_err(render_err)?;
    }

    if lo < 0.0 && hi > 0.0 {
        chart
            .draw_series(LineSeries::new(
                vec![(t0, 0.0), (t1, 0.0)],
                BLACK.mix(0.4).stroke_width(1),
            ))
            .map_err(render_err)?;
    }

    let stroke = scale.round().max(1.0) as u32;
    let n_channels = evoked.data.nrows();
    for (ch_idx, row) in evoked.data.outer_iter().enumerate() {
        let color = channel_color(ch_idx, n_channels);
        chart
            .draw_series(LineSeries::new(
                times.iter().copied().zip(row.iter().copied()),
                color.stroke_width(stroke),
            ))
            .map_err(render_err)?;
    }

    Ok(())
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> StageResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(rgb).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }
    Ok(out)
}
