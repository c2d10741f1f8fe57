/// ColorBrewer `RdBu`, red at 0.0 through white to blue at 1.0.
const RDBU: [(u8, u8, u8); 11] = [
    (0x67, 0x00, 0x1f),
    (0xb2, 0x18, 0x2b),
    (0xd6, 0x60, 0x4d),
    (0xf4, 0xa5, 0x82),
    (0xfd, 0xdb, 0xc7),
    (0xf7, 0xf7, 0xf7),
    (0xd1, 0xe5, 0xf0),
    (0x92, 0xc5, 0xde),
    (0x43, 0x93, 0xc3),
    (0x21, 0x66, 0xac),
    (0x05, 0x30, 0x61),
];

/// Linear interpolation along the diverging scale. `t` is clamped to [0, 1].
pub fn rdbu(t: f64) -> (u8, u8, u8) {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let pos = t * (RDBU.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(RDBU.len() - 1);
    let frac = pos - lo as f64;

    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (RDBU[lo], RDBU[hi]);
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

pub fn to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Maps values onto [0, 1] using the finite range of the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub min: f64,
    pub max: f64,
}

impl Normalize {
    /// `None` when no value is finite.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Self>, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(n) => Some(Self {
                    min: n.min.min(v),
                    max: n.max.max(v),
                }),
            })
    }

    /// A flat range puts everything in the middle of the scale.
    pub fn apply(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            0.5
        } else {
            (v - self.min) / span
        }
    }
}
