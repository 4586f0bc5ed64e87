use std::fmt::Write;

const WIDTH: f64 = 850.0;
const HEIGHT: f64 = 500.0;
const LEFT: f64 = 90.0;
const RIGHT: f64 = 30.0;
const TOP: f64 = 50.0;
const BOTTOM: f64 = 60.0;
const Y_TICKS: i64 = 5;

/// One line series plus its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub years: Vec<i32>,
    pub totals: Vec<i64>,
    pub title: String,
    pub color: String,
    pub x_label: String,
    pub y_label: String,
}

/// Y range that never starts at zero and always has some headroom.
pub fn axis_bounds(totals: &[i64]) -> Option<(i64, i64)> {
    let min = *totals.iter().min()?;
    let max = *totals.iter().max()?;
    let margin = if min == max {
        let five_pct = (min as f64 * 0.05) as i64;
        if min != 0 {
            five_pct.max(1)
        } else {
            1
        }
    } else {
        let span = max - min;
        ((span as f64 * 0.08) as i64)
            .max((max as f64 * 0.01) as i64)
            .max(1)
    };
    Some(((min - margin).max(1), max + margin))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render a self-contained SVG line chart.
pub fn render_line_chart(series: &Series) -> String {
    let (y_min, y_max) = axis_bounds(&series.totals).unwrap_or((1, 2));
    let (y_min, y_max) = (y_min as f64, (y_max as f64).max(y_min as f64 + 1.0));
    let first = series.years.first().copied().unwrap_or(0) as f64;
    let last = series.years.last().copied().unwrap_or(0) as f64;
    let (x_min, x_max) = if first == last {
        (first - 1.0, last + 1.0)
    } else {
        (first, last)
    };

    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = HEIGHT - TOP - BOTTOM;
    let sx = |x: f64| LEFT + (x - x_min) / (x_max - x_min) * plot_w;
    let sy = |y: f64| TOP + plot_h - (y - y_min) / (y_max - y_min) * plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-size="16" font-weight="bold">{}</text>"#,
        WIDTH / 2.0,
        escape(&series.title)
    );

    // y grid + labels
    for i in 0..=Y_TICKS {
        let value = y_min + (y_max - y_min) * i as f64 / Y_TICKS as f64;
        let y = sy(value);
        let _ = writeln!(
            svg,
            r##"<line x1="{LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#000" stroke-opacity="0.35" stroke-dasharray="4 4"/>"##,
            WIDTH - RIGHT
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            LEFT - 8.0,
            y + 4.0,
            value.round() as i64
        );
    }

    // x ticks at integer years
    let span = (x_max - x_min).max(1.0) as i64;
    let step = if span <= 20 { 1 } else { (span + 9) / 10 };
    let mut year = x_min.ceil() as i64;
    while (year as f64) <= x_max {
        let x = sx(year as f64);
        let _ = writeln!(
            svg,
            r##"<line x1="{x:.1}" y1="{TOP}" x2="{x:.1}" y2="{:.1}" stroke="#000" stroke-opacity="0.15"/>"##,
            TOP + plot_h
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle" font-size="11">{year}</text>"#,
            TOP + plot_h + 18.0
        );
        year += step;
    }

    // axes
    let _ = writeln!(
        svg,
        r##"<rect x="{LEFT}" y="{TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="#333"/>"##
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        LEFT + plot_w / 2.0,
        HEIGHT - 15.0,
        escape(&series.x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{:.1}" text-anchor="middle" font-size="13" transform="rotate(-90 20 {:.1})">{}</text>"#,
        TOP + plot_h / 2.0,
        TOP + plot_h / 2.0,
        escape(&series.y_label)
    );

    // series
    let points: Vec<(f64, f64)> = series
        .years
        .iter()
        .zip(&series.totals)
        .map(|(x, y)| (sx(*x as f64), sy(*y as f64)))
        .collect();
    let path: Vec<String> = points.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
    let color = escape(&series.color);
    let _ = writeln!(
        svg,
        r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2.4"/>"#,
        path.join(" ")
    );
    for (x, y) in &points {
        let _ = writeln!(
            svg,
            r#"<circle cx="{x:.1}" cy="{y:.1}" r="4" fill="{color}"/>"#
        );
    }
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_gets_margin() {
        assert_eq!(axis_bounds(&[1000, 1000]), Some((950, 1050)));
        assert_eq!(axis_bounds(&[10]), Some((9, 11)));
        assert_eq!(axis_bounds(&[0]), Some((1, 1)));
    }

    #[test]
    fn spread_series_uses_largest_margin() {
        // span 100 → 8; 1% of 1100 → 11
        assert_eq!(axis_bounds(&[1000, 1100]), Some((989, 1111)));
        assert_eq!(axis_bounds(&[]), None);
    }

    #[test]
    fn renders_escaped_labels_and_points() {
        let svg = render_line_chart(&Series {
            years: vec![2019, 2020, 2021],
            totals: vec![10, 20, 15],
            title: "A & B <gas>".into(),
            color: "#1f77b4".into(),
            x_label: "Year".into(),
            y_label: "Active gas connections".into(),
        });
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("A &amp; B &lt;gas&gt;"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains(">2020</text>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
