use image::Rgb;

/// Converts an RGB pixel to 8-bit HSV: hue in degrees halved (0..=179),
/// saturation and value scaled to 0..=255.
pub fn rgb_to_hsv(px: &Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = px.0;
    let (r, g, b) = (r as f32, g as f32, b as f32);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { delta * 255.0 / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    // 360 degrees wraps back to 0
    let mut h_byte = (h / 2.0).round() as u16;
    if h_byte >= 180 {
        h_byte -= 180;
    }

    [h_byte as u8, s.round() as u8, max as u8]
}
