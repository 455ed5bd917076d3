use std::fs;
use std::path::Path;

use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::prelude::{StageError, StageResult};
use crate::processing::plot::PlottedEvoked;

const TEMPLATE_NAME: &str = "report.html";

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: sans-serif; margin: 2em auto; max-width: 1100px; color: #222; }
nav a { margin-right: 1em; }
section { border-top: 1px solid #ccc; padding-top: 1em; margin-top: 1.5em; }
table { border-collapse: collapse; margin-bottom: 1em; }
td { padding: 0.2em 1em 0.2em 0; }
img { max-width: 100%; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
<nav>
{% for section in sections %}<a href="#{{ section.anchor }}">{{ section.title }}</a>
{% endfor %}</nav>
{% for section in sections %}
<section id="{{ section.anchor }}">
<h2>{{ section.title }}</h2>
<table>
<tr><td>Condition</td><td>{{ section.condition }} (event {{ section.condition_id }})</td></tr>
<tr><td>Epochs averaged</td><td>{{ section.nave }}</td></tr>
<tr><td>Channels</td><td>{{ section.n_channels }}</td></tr>
<tr><td>Sampling rate</td><td>{{ section.sfreq }}</td></tr>
<tr><td>Time window</td><td>{{ section.window }}</td></tr>
<tr><td>GFP peak</td><td>{{ section.gfp_peak }}</td></tr>
</table>
<img alt="{{ section.title }}" src="{{ section.image | safe }}">
</section>
{% endfor %}
</body>
</html>
"##;

/// One evoked waveform's entry in the HTML report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub anchor: String,
    pub title: String,
    pub condition: String,
    pub condition_id: i64,
    pub nave: usize,
    pub n_channels: usize,
    pub sfreq: String,
    pub window: String,
    pub gfp_peak: String,
    pub image: String,
}

/// Accumulates evoked waveforms and renders them into one HTML document.
#[derive(Debug, Clone)]
pub struct Report {
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn add_evoked(&mut self, plotted: &PlottedEvoked) {
        let evoked = &plotted.evoked;
        let gfp_peak = match evoked.gfp_peak() {
            Some((latency, value)) => format!("{:.3} s ({:.3e})", latency, value),
            None => "n/a".to_string(),
        };
        self.sections.push(ReportSection {
            anchor: format!("evoked-{}", self.sections.len() + 1),
            title: evoked.comment.clone(),
            condition: evoked.condition.name.clone(),
            condition_id: evoked.condition.id,
            nave: evoked.nave,
            n_channels: evoked.ch_names.len(),
            sfreq: format!("{:?} Hz", evoked.sfreq),
            window: format!("{:.3} to {:.3} s", evoked.tmin, evoked.tmax()),
            gfp_peak,
            image: format!("data:image/png;base64,{}", plotted.figure.file_base64()),
        });
    }

    pub fn add_evokeds<'a, I>(&mut self, plotted: I)
    where
        I: IntoIterator<Item = &'a PlottedEvoked>,
    {
        for item in plotted {
            self.add_evoked(item);
        }
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> StageResult<String> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
            .map_err(|err| StageError::Template(err.to_string()))?;

        let mut context = TeraContext::new();
        context.insert("title", &self.title);
        context.insert("sections", &self.sections);
        tera.render(TEMPLATE_NAME, &context)
            .map_err(|err| StageError::Template(err.to_string()))
    }

    /// Writes the document, replacing any existing file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path_ref = path.as_ref();
        let html = self.render()?;
        fs::write(path_ref, html).map_err(|err| StageError::io(path_ref, err))
    }
}
