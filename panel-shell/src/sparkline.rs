//! Inline trend lines for stats rows.

use crate::config::SparklineStyle;

/// Values from a trend cell's text, e.g. `"1, 2.5,3"`. Non-numeric entries are skipped.
pub fn parse_values(text: &str) -> Vec<f64> {
    text.split(',')
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

fn value_to_y(value: f64, min: f64, max: f64, height: f64) -> f64 {
    // Half a pixel of padding keeps the stroke inside the box.
    let pad = 0.5_f64.min(height / 2.0);
    let span = height - 2.0 * pad;
    if max - min < 1e-9 {
        return height / 2.0;
    }
    let norm = (value - min) / (max - min);
    pad + span - norm * span
}

/// SVG `points` attribute for a polyline spanning `width` x `height`.
pub fn polyline_points(values: &[f64], width: f64, height: f64) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    match values.len() {
        0 => String::new(),
        1 => {
            let y = height / 2.0;
            format!("0,{y:.2} {width:.2},{y:.2}")
        }
        n => {
            let step = width / (n - 1) as f64;
            values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{:.2},{:.2}", i as f64 * step, value_to_y(*v, min, max, height)))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Self-contained `<svg>` element drawn in `style`. Empty input draws nothing.
pub fn svg_markup(values: &[f64], style: &SparklineStyle) -> String {
    if values.is_empty() {
        return String::new();
    }
    let (w, h) = (style.width_px as f64, style.height_px as f64);
    let points = polyline_points(values, w, h);
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
        style.width_px, style.height_px, style.width_px, style.height_px
    );
    if let Some(fill) = &style.fill_color {
        svg.push_str(&format!(
            "<polygon points=\"0,{h:.2} {points} {w:.2},{h:.2}\" fill=\"{fill}\" stroke=\"none\"/>"
        ));
    }
    svg.push_str(&format!(
        "<polyline points=\"{points}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
        style.line_color
    ));
    if let Some(spot) = &style.spot_color {
        if let Some(last) = points.split(' ').last().and_then(|p| p.split_once(',')) {
            svg.push_str(&format!(
                "<circle cx=\"{}\" cy=\"{}\" r=\"1.5\" fill=\"{spot}\"/>",
                last.0, last.1
            ));
        }
    }
    svg.push_str("</svg>");
    svg
}
