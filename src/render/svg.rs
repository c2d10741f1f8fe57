use anyhow::Result;
use geo::{BoundingRect, Coord, LineString, Rect};
use std::fmt::Write;

use super::{
    colormap::{rdbu, to_hex, Normalize},
    MapRow,
};

const MARGIN: f64 = 20.0;
const LEGEND_WIDTH: f64 = 110.0;
const BAR_WIDTH: f64 = 18.0;
const OUTLINE: &str = "black";

/// Equirectangular projection of lon/lat onto the drawing area, with
/// longitude scaled by the cosine of the mean latitude.
struct Projection {
    min_x: f64,
    max_y: f64,
    kx: f64,
    scale: f64,
    off_x: f64,
    off_y: f64,
}

impl Projection {
    fn fit(bounds: Rect<f64>, width: f64, height: f64) -> Self {
        let mean_lat = (bounds.min().y + bounds.max().y) / 2.0;
        let kx = mean_lat.to_radians().cos();
        let pw = (bounds.width() * kx).max(f64::EPSILON);
        let ph = bounds.height().max(f64::EPSILON);
        let scale = (width / pw).min(height / ph);

        Self {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            kx,
            scale,
            off_x: MARGIN + (width - pw * scale) / 2.0,
            off_y: MARGIN + (height - ph * scale) / 2.0,
        }
    }

    fn project(&self, c: Coord<f64>) -> (f64, f64) {
        (
            self.off_x + (c.x - self.min_x) * self.kx * self.scale,
            self.off_y + (self.max_y - c.y) * self.scale,
        )
    }
}

fn bounds_of(rows: &[MapRow]) -> Option<Rect<f64>> {
    rows.iter()
        .filter_map(|r| r.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

fn ring_path(out: &mut String, ring: &LineString<f64>, proj: &Projection) -> Result<()> {
    for (i, c) in ring.coords().enumerate() {
        let (x, y) = proj.project(*c);
        let cmd = if i == 0 { 'M' } else { 'L' };
        write!(out, "{}{:.2},{:.2} ", cmd, x, y)?;
    }
    out.push('Z');
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build the whole choropleth as an SVG document.
///
/// Regions with an undefined ratio keep their outline but get no fill.
pub fn render_svg(rows: &[MapRow], width: u32, height: u32) -> Result<String> {
    let (w, h) = (width as f64, height as f64);
    let map_w = (w - LEGEND_WIDTH - 2.0 * MARGIN).max(1.0);
    let map_h = (h - 2.0 * MARGIN).max(1.0);
    let norm = Normalize::from_values(rows.iter().map(|r| r.ratio));

    let mut out = String::new();
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

    if let Some(bounds) = bounds_of(rows) {
        let proj = Projection::fit(bounds, map_w, map_h);
        writeln!(out, r#"<g id="regions" stroke="{OUTLINE}" stroke-width="0.8">"#)?;
        for row in rows {
            let fill = match norm {
                Some(n) if row.ratio.is_finite() => to_hex(rdbu(n.apply(row.ratio))),
                _ => "none".to_string(),
            };
            let mut d = String::new();
            for polygon in &row.geometry {
                ring_path(&mut d, polygon.exterior(), &proj)?;
                for hole in polygon.interiors() {
                    d.push(' ');
                    ring_path(&mut d, hole, &proj)?;
                }
                d.push(' ');
            }
            let label = row.name.as_deref().unwrap_or(&row.code);
            writeln!(
                out,
                r#"<path data-code="{}" fill="{}" fill-rule="evenodd" d="{}"><title>{} ({}): {:.4}</title></path>"#,
                escape(&row.code),
                fill,
                d.trim_end(),
                escape(label),
                escape(&row.code),
                row.ratio
            )?;
        }
        writeln!(out, "</g>")?;
    }

    write_legend(&mut out, norm, w - LEGEND_WIDTH, map_h)?;
    writeln!(out, "</svg>")?;
    Ok(out)
}

/// Vertical color bar, high values on top.
fn write_legend(out: &mut String, norm: Option<Normalize>, x: f64, bar_h: f64) -> Result<()> {
    writeln!(out, r#"<g id="legend" font-family="sans-serif" font-size="12">"#)?;
    writeln!(
        out,
        r#"<defs><linearGradient id="ratio-scale" x1="0" y1="1" x2="0" y2="0">"#
    )?;
    for i in 0..=10 {
        let t = i as f64 / 10.0;
        writeln!(
            out,
            r#"<stop offset="{:.1}" stop-color="{}"/>"#,
            t,
            to_hex(rdbu(t))
        )?;
    }
    writeln!(out, "</linearGradient></defs>")?;
    writeln!(
        out,
        r#"<rect x="{x:.2}" y="{MARGIN:.2}" width="{BAR_WIDTH}" height="{bar_h:.2}" fill="url(#ratio-scale)" stroke="{OUTLINE}"/>"#
    )?;

    if let Some(n) = norm {
        let ticks = [(n.max, 0.0), ((n.min + n.max) / 2.0, 0.5), (n.min, 1.0)];
        for (value, frac) in ticks {
            let y = MARGIN + bar_h * frac;
            writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" dominant-baseline="middle">{:.3}</text>"#,
                x + BAR_WIDTH + 6.0,
                y,
                value
            )?;
        }
    }
    writeln!(
        out,
        r#"<text x="{:.2}" y="{:.2}">ratio</text>"#,
        x,
        MARGIN - 6.0
    )?;
    writeln!(out, "</g>")?;
    Ok(())
}
