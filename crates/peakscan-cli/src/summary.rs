use std::path::Path;

use console::Style;
use peakscan_core::params::Parameters;
use peakscan_core::peak::describe_peak;
use peakscan_core::pipeline::Analysis;

use crate::commands::run::RunStats;
use crate::config::RunConfig;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    warn: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            warn: Style::new().yellow().bold(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }

    fn peak(&self, peak: Option<usize>) -> String {
        match peak {
            Some(_) => self.good.apply_to(describe_peak(peak)).to_string(),
            None => self.disabled.apply_to(describe_peak(peak)).to_string(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

fn print_parameters(s: &Styles, params: &Parameters) {
    println!("  {}", s.header.apply_to("Detector"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Feature"),
        s.value.apply_to(params.feature)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("ROI"),
        s.value.apply_to(params.roi)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(params.min_threshold)
    );
    println!();
}

pub fn print_run_summary(input: &Path, config: &RunConfig, stats: &RunStats) {
    let s = Styles::new();
    let g = &config.geometry;

    print_title(&s, "PeakScan Replay");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Source"),
        s.value.apply_to(config.parameters.buffer_source)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Geometry"),
        s.value.apply_to(format!(
            "{}x{} @ {} bit, {} frame(s)/buffer, {} buffer(s)/volume",
            g.samples_per_line, g.lines_per_frame, g.bit_depth, g.frames_per_buffer, g.buffers_per_volume
        ))
    );
    println!();

    print_parameters(&s, &config.parameters);

    println!("  {}", s.header.apply_to("Buffers"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(stats.buffers)
    );
    if stats.trailing_bytes > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Trailing"),
            s.warn.apply_to(format!("{} bytes ignored", stats.trailing_bytes))
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Decimation"),
        s.value.apply_to(format!("1 of {}", config.decimation.max(1)))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Skipped"),
        s.value.apply_to(stats.decimated + stats.not_selected)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Dispatched"),
        s.good.apply_to(stats.dispatched)
    );
    let lost = if stats.lost > 0 {
        s.warn.apply_to(stats.lost.to_string())
    } else {
        s.value.apply_to(stats.lost.to_string())
    };
    println!("    {:<12}{}", s.label.apply_to("Lost"), lost);
    if stats.rejected > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Rejected"),
            s.warn.apply_to(stats.rejected)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Analysis"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(stats.analysed)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("With peak"),
        s.value.apply_to(stats.peaks_found)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Last peak"),
        s.peak(stats.last_peak)
    );
    if let Some(last) = stats.errors.last() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Errors"),
            s.warn.apply_to(format!("{} (last: {last})", stats.errors.len()))
        );
    }
    println!();
}

pub fn print_peak_summary(params: &Parameters, analysis: &Analysis) {
    let s = Styles::new();

    print_title(&s, "Peak");
    print_parameters(&s, params);

    println!("  {}", s.header.apply_to("Averaged line"));
    for chunk in analysis.line.chunks(8) {
        let row: Vec<String> = chunk.iter().map(|v| format!("{v:>10.2}")).collect();
        println!("    {}", row.join(""));
    }
    println!();

    println!(
        "  {:<14}{}",
        s.header.apply_to("Peak"),
        s.peak(analysis.peak)
    );
    if let Some(idx) = analysis.peak {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Value"),
            s.value.apply_to(format!("{:.2}", analysis.line[idx]))
        );
    }
    println!();
}
