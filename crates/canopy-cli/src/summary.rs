use std::path::PathBuf;

use canopy_core::pipeline::PipelineOutput;
use canopy_core::pipeline::config::PipelineConfig;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
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
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Canopy Pipeline"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Catalog"),
        s.path.apply_to(config.catalog.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Regions"),
        s.path.apply_to(config.regions.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    println!();

    // Query
    let query = &config.query;
    println!("  {}", s.header.apply_to("Query"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Dates"),
        s.value.apply_to(format!("{} to {}", query.start, query.end))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Cloud"),
        s.value.apply_to(format!("< {}%", query.cloud_cover_max))
    );
    match query.months {
        Some([first, last]) => println!(
            "    {:<12}{}",
            s.label.apply_to("Months"),
            s.value.apply_to(format!("{first}-{last}"))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Months"),
            s.disabled.apply_to("all")
        ),
    }
    if let Some([first, last]) = query.years {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Years"),
            s.value.apply_to(format!("{first}-{last}"))
        );
    }
    if let Some(secs) = config.timeout_secs {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Timeout"),
            s.value.apply_to(format!("{secs} s"))
        );
    }
    println!();

    // Indices
    println!("  {}", s.header.apply_to("Indices"));
    for index in &config.indices {
        println!("    {}", s.method.apply_to(index));
    }
    println!();

    // Composites
    if config.composites.is_empty() {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Composites"),
            s.disabled.apply_to("none")
        );
    } else {
        println!("  {}", s.header.apply_to("Composites"));
        for composite in &config.composites {
            let clip = if composite.clip { ", clipped" } else { "" };
            println!(
                "    {:<12}{}",
                s.method.apply_to(&composite.method),
                s.value.apply_to(format!("{}{clip}", composite.band))
            );
        }
    }
    println!();

    // Series
    if config.series.is_empty() {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Series"),
            s.disabled.apply_to("none")
        );
    } else {
        println!("  {}", s.header.apply_to("Series"));
        for series in &config.series {
            println!(
                "    {:<12}{}",
                s.method.apply_to(&series.band),
                s.value.apply_to(series.statistic)
            );
        }
        println!(
            "    {:<12}{}",
            s.label.apply_to("Format"),
            s.value.apply_to(config.series_format)
        );
    }
    println!();
}

pub fn print_run_summary(output: &PipelineOutput, written: &[PathBuf]) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(output.frame_count())
    );
    if let (Some(first), Some(last)) = (output.timestamps.first(), output.timestamps.last()) {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Span"),
            s.value.apply_to(format!(
                "{} to {}",
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            ))
        );
    }
    for series in &output.series {
        let gaps: usize = series.regions.iter().map(|r| r.gap_count()).sum();
        println!(
            "  {:<14}{}",
            s.label.apply_to(format!("{} {}", series.band, series.statistic)),
            s.value.apply_to(format!("{} points, {gaps} gaps", series.point_count()))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Written"));
    for path in written {
        println!("    {}", s.path.apply_to(path.display()));
    }
    println!();
}
