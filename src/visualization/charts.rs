//! SVG Chart Generator for Training Snapshots
//!
//! Hand-written SVG for two kinds of figures: the per-epoch embedding scatter
//! (one frame of the time-lapse) and the accuracy curves written at the end
//! of a run.

use std::fs;
use std::path::Path;

/// Chart styling constants
const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

/// Snapshot layout: scatter on the left, legend and accuracy inset on the right
const SNAPSHOT_WIDTH: f64 = 960.0;
const SNAPSHOT_HEIGHT: f64 = 640.0;
const SCATTER_SIZE: f64 = 560.0;
const PANEL_LEFT: f64 = 680.0;
const INSET_TOP: f64 = 400.0;
const INSET_WIDTH: f64 = 240.0;
const INSET_HEIGHT: f64 = 160.0;

pub const COLOR_PRIMARY: &str = "#3498db";
pub const COLOR_SECONDARY: &str = "#2ecc71";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

const CLASS_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Fill colour of a class; past the palette, hues are spread around the wheel
pub fn class_colour(class: usize) -> String {
    match CLASS_PALETTE.get(class) {
        Some(c) => c.to_string(),
        None => format!("hsl({}, 65%, 45%)", (class * 137) % 360),
    }
}

/// A data point for a line chart
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

/// A data series for charts
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

/// One projected embedding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Class that decides the fill colour
    pub class: usize,
    /// Class of the outline, drawn only when it differs from `class`
    pub outline: usize,
}

impl ScatterPoint {
    /// Whether the point can be placed on the canvas
    pub fn is_drawable(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Everything one time-lapse frame shows
#[derive(Debug, Clone)]
pub struct SnapshotFrame<'a> {
    pub title: String,
    pub class_names: &'a [String],
    /// Training embeddings of the latest epoch, coloured by label
    pub train_points: Vec<ScatterPoint>,
    /// Held-out embeddings, filled by prediction and outlined by label
    pub test_points: Vec<ScatterPoint>,
    /// Accuracy curves for the inset, y in percent
    pub accuracy: Vec<DataSeries>,
}

/// Generate a line chart SVG
pub fn generate_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    output_path: &Path,
) -> std::io::Result<()> {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (x_min, x_max, _, y_max) = find_ranges(series);
    let (x_min, x_max) = widen(x_min, x_max);
    let y_min = 0.0;
    let y_max = 100.0_f64.max(y_max);

    let mut svg = svg_header(CHART_WIDTH, CHART_HEIGHT);

    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        CHART_WIDTH / 2.0, COLOR_TEXT, escape_xml(title)
    ));

    // Grid lines
    for i in 0..=5 {
        let y = MARGIN_TOP + plot_height - (i as f64 / 5.0) * plot_height;
        let value = y_min + (i as f64 / 5.0) * (y_max - y_min);

        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.0}%</text>"#,
            MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, value
        ));
    }

    // Axes
    push_axes(&mut svg, MARGIN_LEFT, MARGIN_TOP, plot_width, plot_height);

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT, escape_xml(x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        CHART_HEIGHT / 2.0, COLOR_TEXT, CHART_HEIGHT / 2.0, escape_xml(y_label)
    ));

    let to_x = |x: f64| MARGIN_LEFT + ((x - x_min) / (x_max - x_min)) * plot_width;
    let to_y = |y: f64| MARGIN_TOP + plot_height - ((y - y_min) / (y_max - y_min)) * plot_height;

    for series_data in series {
        if series_data.points.is_empty() {
            continue;
        }

        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
            line_path(&series_data.points, to_x, to_y),
            series_data.color
        ));

        for point in &series_data.points {
            let (x, y) = (to_x(point.x), to_y(point.y));
            svg.push_str(&format!(
                r#"<circle cx="{}" cy="{}" r="5" fill="{}" stroke="white" stroke-width="2"/>"#,
                x, y, series_data.color
            ));

            if let Some(label) = &point.label {
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="10" fill="{}">{}</text>"#,
                    x, y - 12.0, COLOR_TEXT, escape_xml(label)
                ));
            }
        }
    }

    // X-axis tick labels from the longest series
    if let Some(longest) = series.iter().max_by_key(|s| s.points.len()) {
        for point in &longest.points {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.0}</text>"#,
                to_x(point.x), MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, point.x
            ));
        }
    }

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series_data in series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            CHART_WIDTH - MARGIN_RIGHT - 100.0, legend_y, series_data.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            CHART_WIDTH - MARGIN_RIGHT - 80.0, legend_y + 12.0, COLOR_TEXT, escape_xml(&series_data.name)
        ));
        legend_y += 25.0;
    }

    svg.push_str("</svg>");

    fs::write(output_path, svg)
}

/// Generate one time-lapse frame
pub fn generate_snapshot(frame: &SnapshotFrame<'_>, output_path: &Path) -> std::io::Result<()> {
    let left = MARGIN_LEFT - 40.0;
    let top = MARGIN_TOP;

    // Points without a finite position are not drawn and do not move the bounds
    let all = frame
        .train_points
        .iter()
        .chain(&frame.test_points)
        .filter(|p| p.is_drawable());
    let (x_min, x_max, y_min, y_max) = all.fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), p| (a.min(p.x), b.max(p.x), c.min(p.y), d.max(p.y)),
    );
    let (x_min, x_max) = widen(x_min, x_max);
    let (y_min, y_max) = widen(y_min, y_max);

    let to_x = |x: f64| left + ((x - x_min) / (x_max - x_min)) * SCATTER_SIZE;
    let to_y = |y: f64| top + SCATTER_SIZE - ((y - y_min) / (y_max - y_min)) * SCATTER_SIZE;

    let mut svg = svg_header(SNAPSHOT_WIDTH, SNAPSHOT_HEIGHT);

    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        left + SCATTER_SIZE / 2.0, COLOR_TEXT, escape_xml(&frame.title)
    ));
    svg.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
        left, top, SCATTER_SIZE, SCATTER_SIZE, COLOR_GRID
    ));

    for p in frame.train_points.iter().filter(|p| p.is_drawable()) {
        svg.push_str(&format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="2" fill="{}" fill-opacity="0.35"/>"#,
            to_x(p.x),
            to_y(p.y),
            class_colour(p.class)
        ));
    }

    for p in frame.test_points.iter().filter(|p| p.is_drawable()) {
        let stroke = if p.outline == p.class {
            "white".to_string()
        } else {
            class_colour(p.outline)
        };
        svg.push_str(&format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="4" fill="{}" stroke="{}" stroke-width="1.5"/>"#,
            to_x(p.x),
            to_y(p.y),
            class_colour(p.class),
            stroke
        ));
    }

    // Class legend
    let mut legend_y = top;
    for (i, name) in frame.class_names.iter().enumerate() {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            PANEL_LEFT,
            legend_y,
            class_colour(i)
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            PANEL_LEFT + 22.0, legend_y + 12.0, COLOR_TEXT, escape_xml(name)
        ));
        legend_y += 22.0;
    }
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="11" fill="{}">Outline: true class of a misclassified test image</text>"#,
        PANEL_LEFT, legend_y + 14.0, COLOR_TEXT
    ));

    push_accuracy_inset(&mut svg, &frame.accuracy);

    svg.push_str("</svg>");

    fs::write(output_path, svg)
}

fn push_accuracy_inset(svg: &mut String, series: &[DataSeries]) {
    let (x_min, x_max, _, _) = find_ranges(series);
    let (x_min, x_max) = widen(x_min, x_max);
    let to_x = |x: f64| PANEL_LEFT + ((x - x_min) / (x_max - x_min)) * INSET_WIDTH;
    let to_y = |y: f64| INSET_TOP + INSET_HEIGHT - (y / 100.0) * INSET_HEIGHT;

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" font-weight="bold" fill="{}">Accuracy</text>"#,
        PANEL_LEFT, INSET_TOP - 10.0, COLOR_TEXT
    ));
    push_axes(svg, PANEL_LEFT, INSET_TOP, INSET_WIDTH, INSET_HEIGHT);

    for (i, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            line_path(&s.points, to_x, to_y),
            s.color
        ));
        if let Some(last) = s.points.last() {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="11" fill="{}">{}: {:.1}%</text>"#,
                PANEL_LEFT,
                INSET_TOP + INSET_HEIGHT + 20.0 + i as f64 * 16.0,
                s.color,
                escape_xml(&s.name),
                last.y
            ));
        }
    }
}

fn svg_header(width: f64, height: f64) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}"><rect width="{w}" height="{h}" fill="white"/>"#,
        w = width,
        h = height
    )
}

fn push_axes(svg: &mut String, left: f64, top: f64, width: f64, height: f64) {
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        left, top + height, left + width, top + height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        left, top, left, top + height, COLOR_AXIS
    ));
}

fn line_path(points: &[DataPoint], to_x: impl Fn(f64) -> f64, to_y: impl Fn(f64) -> f64) -> String {
    let mut path = String::new();
    for (i, point) in points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        path.push_str(&format!("{} {:.2} {:.2}", cmd, to_x(point.x), to_y(point.y)));
    }
    path
}

fn find_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for s in series {
        for p in &s.points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }
    }

    (x_min, x_max, y_min, y_max)
}

/// Make a range usable as a divisor: empty ranges become [0, 1], flat ones get padding
fn widen(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if max - min < 1e-9 {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
