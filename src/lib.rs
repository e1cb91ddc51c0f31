mod cancel;
pub mod config;
mod error;
mod fonts;
pub mod geometry;
pub mod manifest;
pub mod model;
pub mod pdf;
mod sink;

pub use cancel::CancelToken;
pub use config::LayoutConfig;
pub use error::Error;
pub use model::{FieldName, PhotoEntry, ReportDocument, ReportImage};
pub use pdf::{BlockPlacement, LayoutCursor, RenderedReport, SignaturePlacement};
pub use sink::{DirectorySink, MemorySink, ReportSink, output_file_name};

use std::path::Path;
use std::time::Instant;

/// Render a report to PDF bytes.
pub fn render_report(doc: &ReportDocument, config: &LayoutConfig) -> Result<RenderedReport, Error> {
    pdf::render(doc, config, &CancelToken::new())
}

/// Like [`render_report`], but checks `cancel` before each photo block.
pub fn render_report_cancellable(
    doc: &ReportDocument,
    config: &LayoutConfig,
    cancel: &CancelToken,
) -> Result<RenderedReport, Error> {
    pdf::render(doc, config, cancel)
}

/// Render a report and hand it to `sink` under its conventional file name.
/// Returns the file name used.
pub fn generate(
    doc: &ReportDocument,
    config: &LayoutConfig,
    sink: &mut dyn ReportSink,
    cancel: &CancelToken,
) -> Result<String, Error> {
    let rendered = pdf::render(doc, config, cancel)?;
    let name = output_file_name(doc, sink::unix_now());
    sink.save(&name, &rendered.bytes)?;
    Ok(name)
}

pub fn convert_manifest_to_pdf(
    input: &Path,
    output: &Path,
    config: &LayoutConfig,
) -> Result<RenderedReport, Error> {
    let t0 = Instant::now();

    let doc = manifest::load(input)?;
    let t_load = t0.elapsed();

    let rendered = render_report(&doc, config)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &rendered.bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: load={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms ({} pages, {} bytes)",
        t_load.as_secs_f64() * 1000.0,
        (t_render - t_load).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        rendered.page_count,
        rendered.bytes.len(),
    );

    Ok(rendered)
}
