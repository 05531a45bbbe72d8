use crate::error::SceneError;
use glam::{Vec3, Vec4};

/// Parses `#RRGGBB`, `RRGGBB`, `0xAARRGGBB` or `AARRGGBB` into RGBA in `[0, 1]`.
///
/// Six-digit forms are opaque. Channels are scaled by 1/255 with no
/// transfer function applied.
pub fn color_of(text: &str) -> Result<Vec4, SceneError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let invalid = || SceneError::InvalidColor(text.to_string());
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let packed = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    let argb = match digits.len() {
        6 => 0xFF00_0000 | packed,
        8 => packed,
        _ => return Err(invalid()),
    };
    let channel = |shift: u32| ((argb >> shift) & 0xFF) as f32 / 255.0;
    let color = Vec4::new(channel(16), channel(8), channel(0), channel(24));
    log::debug!("color_of({text}) = {color:?}");
    Ok(color)
}

/// Correlated colour temperature in kelvin to linear sRGB, normalised so the
/// largest component is 1.
pub fn cct(kelvin: f32) -> Vec3 {
    let k = f64::from(kelvin);
    let k2 = k * k;
    let u = (0.860117757 + 1.54118254e-4 * k + 1.28641212e-7 * k2)
        / (1.0 + 8.42420235e-4 * k + 7.08145163e-7 * k2);
    let v = (0.317398726 + 4.22806245e-5 * k + 4.20481691e-8 * k2)
        / (1.0 - 2.89741816e-5 * k + 1.61456053e-7 * k2);
    let d = 1.0 / (2.0 * u - 8.0 * v + 4.0);
    let x = 3.0 * u * d;
    let y = 2.0 * v * d;

    let xyz = [x / y, 1.0, (1.0 - x - y) / y];
    let r = 3.2404542 * xyz[0] - 1.5371385 * xyz[1] - 0.4985314 * xyz[2];
    let g = -0.9692660 * xyz[0] + 1.8760108 * xyz[1] + 0.0415560 * xyz[2];
    let b = 0.0556434 * xyz[0] - 0.2040259 * xyz[1] + 1.0572252 * xyz[2];

    let linear = Vec3::new(r as f32, g as f32, b as f32);
    let max = linear.max_element();
    if max <= 0.0 || !max.is_finite() {
        return Vec3::ONE;
    }
    (linear / max).clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::{cct, color_of};
    use crate::error::ErrorKind;
    use glam::Vec4;

    #[test]
    fn hex_forms() {
        assert_eq!(color_of("#FF0000").unwrap(), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(color_of("00ff00").unwrap(), Vec4::new(0.0, 1.0, 0.0, 1.0));
        let argb = color_of("0x800000FF").unwrap();
        assert_eq!(argb.z, 1.0);
        assert!((argb.w - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_hex_is_malformed_input() {
        for text in ["", "#12345", "red", "#GG0000", "+FFFFFF"] {
            let err = color_of(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedInput, "{text}");
        }
    }

    #[test]
    fn temperature_is_warm_to_cool() {
        let warm = cct(2700.0);
        let daylight = cct(6500.0);
        let cool = cct(10000.0);
        assert_eq!(warm.x, 1.0);
        assert!(warm.z < warm.y && warm.y < warm.x);
        assert!(daylight.min_element() > 0.85);
        assert_eq!(cool.z, 1.0);
        assert!(cool.x < 1.0);
    }
}
