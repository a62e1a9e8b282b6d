//! Point-cloud (PLY) interchange for splat clouds.
//!
//! Decoding is tolerant: it accepts the field conventions found in the
//! Gaussian-splatting ecosystem (log-space `scale_0..2`, logit opacities,
//! `f_dc_*`/`f_rest_*` coefficients, `rot_*`/`q*` quaternions, 8-bit
//! colors) as well as our own output. Encoding always writes linear
//! `scale_x/y/z` and plain `[0,1]` opacity so that a round-trip through our
//! own files is lossless to float precision.

use crate::splat::{ShCoefficients, Splat, SH_REST_COUNT};
use crate::{CloudError, SplatCloud};
use glam::{Quat, Vec3};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Degree-0 real spherical-harmonics basis constant; plain RGB inputs are
/// divided by it so the DC-evaluated color reproduces the stored color.
const SH_DC_NORM: f32 = 0.282_094_79;

// Rows are deserialized as maps so files with extra or missing properties
// still parse.
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|u| u as u8)
            .or_else(|| n.as_i64().map(|i| i as u8)),
        _ => None,
    })
}

/// Decode splats from PLY bytes.
pub fn decode_splats(reader: impl Read) -> Result<Vec<Splat>, CloudError> {
    let ply_data: PlyFile = serde_ply::from_reader(BufReader::new(reader)).map_err(|e| {
        warn!("failed to parse PLY payload: {}", e);
        CloudError::Ply(format!("PLY parsing error: {}", e))
    })?;

    debug!("PLY payload parsed: {} vertices", ply_data.vertex.len());

    // Adaptive default extent for plain point clouds that carry no scale.
    let mut bbox_min = Vec3::splat(f32::MAX);
    let mut bbox_max = Vec3::splat(f32::MIN);
    for vertex in &ply_data.vertex {
        if let (Some(x), Some(y), Some(z)) = (
            get_f32(vertex.get("x")),
            get_f32(vertex.get("y")),
            get_f32(vertex.get("z")),
        ) {
            let pos = Vec3::new(x, y, z);
            bbox_min = bbox_min.min(pos);
            bbox_max = bbox_max.max(pos);
        }
    }
    let max_dim = (bbox_max - bbox_min).max_element();
    let default_scale = if max_dim > 0.0 { max_dim / 5000.0 } else { 0.01 };

    let mut splats = Vec::with_capacity(ply_data.vertex.len());

    for (i, vertex) in ply_data.vertex.iter().enumerate() {
        let x = get_f32(vertex.get("x"))
            .ok_or_else(|| CloudError::Ply(format!("missing 'x' at vertex {}", i)))?;
        let y = get_f32(vertex.get("y"))
            .ok_or_else(|| CloudError::Ply(format!("missing 'y' at vertex {}", i)))?;
        let z = get_f32(vertex.get("z"))
            .ok_or_else(|| CloudError::Ply(format!("missing 'z' at vertex {}", i)))?;

        // Scale: log-space `scale_0..2`, linear `scale_x/y/z`, uniform
        // `scale`, or the adaptive default.
        let scale = if let (Some(s0), Some(s1), Some(s2)) = (
            get_f32(vertex.get("scale_0")),
            get_f32(vertex.get("scale_1")),
            get_f32(vertex.get("scale_2")),
        ) {
            Vec3::new(s0.exp(), s1.exp(), s2.exp())
        } else if let (Some(sx), Some(sy), Some(sz)) = (
            get_f32(vertex.get("scale_x")),
            get_f32(vertex.get("scale_y")),
            get_f32(vertex.get("scale_z")),
        ) {
            Vec3::new(sx, sy, sz)
        } else if let Some(uniform) = get_f32(vertex.get("scale")) {
            Vec3::splat(uniform)
        } else {
            Vec3::splat(default_scale)
        };

        let rotation = if let (Some(r0), Some(r1), Some(r2), Some(r3)) = (
            get_f32(vertex.get("rot_0")),
            get_f32(vertex.get("rot_1")),
            get_f32(vertex.get("rot_2")),
            get_f32(vertex.get("rot_3")),
        ) {
            [r0, r1, r2, r3]
        } else if let (Some(qx), Some(qy), Some(qz), Some(qw)) = (
            get_f32(vertex.get("qx")),
            get_f32(vertex.get("qy")),
            get_f32(vertex.get("qz")),
            get_f32(vertex.get("qw")),
        ) {
            [qx, qy, qz, qw]
        } else {
            [0.0, 0.0, 0.0, 1.0]
        };
        let rotation = Quat::from_array(rotation);
        let rotation = if rotation.length() > 1e-3 {
            rotation.normalize()
        } else {
            Quat::IDENTITY
        };

        // Opacity: values in [0, 1] are plain, anything else is a logit.
        let raw_opacity = get_f32(vertex.get("opacity"))
            .or_else(|| get_f32(vertex.get("alpha")))
            .unwrap_or(1.0);
        let opacity = if (0.0..=1.0).contains(&raw_opacity) {
            raw_opacity
        } else {
            (1.0 / (1.0 + (-raw_opacity).exp())).clamp(0.0, 1.0)
        };

        // Color: SH coefficients when present, otherwise 8-bit color mapped
        // into the DC term.
        let dc = if let (Some(r), Some(g), Some(b)) = (
            get_f32(vertex.get("f_dc_0")),
            get_f32(vertex.get("f_dc_1")),
            get_f32(vertex.get("f_dc_2")),
        ) {
            Vec3::new(r, g, b)
        } else if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("red")),
            get_u8(vertex.get("green")),
            get_u8(vertex.get("blue")),
        ) {
            Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0) / SH_DC_NORM
        } else {
            Vec3::splat(0.8) / SH_DC_NORM
        };

        let mut sh = ShCoefficients::from_dc(dc);
        // `f_rest_*` is channel-major: all R coefficients, then G, then B.
        for coeff in 0..SH_REST_COUNT {
            if let (Some(r), Some(g), Some(b)) = (
                get_f32(vertex.get(&format!("f_rest_{}", coeff))),
                get_f32(vertex.get(&format!("f_rest_{}", SH_REST_COUNT + coeff))),
                get_f32(vertex.get(&format!("f_rest_{}", 2 * SH_REST_COUNT + coeff))),
            ) {
                sh.rest[coeff] = Vec3::new(r, g, b);
            }
        }

        splats.push(Splat {
            position: Vec3::new(x, y, z),
            scale,
            rotation,
            opacity,
            sh,
        });
    }

    debug!("decoded {} splats from PLY payload", splats.len());
    Ok(splats)
}

/// Encode splats as an ASCII PLY payload.
pub fn encode_splats(splats: &[Splat], writer: &mut impl Write) -> Result<(), CloudError> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", splats.len())?;
    for name in ["x", "y", "z", "scale_x", "scale_y", "scale_z"] {
        writeln!(writer, "property float {}", name)?;
    }
    for i in 0..4 {
        writeln!(writer, "property float rot_{}", i)?;
    }
    writeln!(writer, "property float opacity")?;
    for i in 0..3 {
        writeln!(writer, "property float f_dc_{}", i)?;
    }
    for i in 0..3 * SH_REST_COUNT {
        writeln!(writer, "property float f_rest_{}", i)?;
    }
    writeln!(writer, "end_header")?;

    for splat in splats {
        let p = splat.position;
        let s = splat.scale;
        let q = splat.rotation;
        write!(
            writer,
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            p.x, p.y, p.z, s.x, s.y, s.z, q.x, q.y, q.z, q.w, splat.opacity,
            splat.sh.dc.x, splat.sh.dc.y, splat.sh.dc.z
        )?;
        for channel in 0..3 {
            for coeff in &splat.sh.rest {
                write!(writer, " {}", coeff[channel])?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Load a cloud from a PLY file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_cloud(path: impl AsRef<Path>) -> Result<SplatCloud, CloudError> {
    let file = File::open(path.as_ref())?;
    let splats = decode_splats(BufReader::new(file))?;
    SplatCloud::from_splats(splats)
}

/// Save a cloud to a PLY file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn save_cloud(cloud: &SplatCloud, path: impl AsRef<Path>) -> Result<(), CloudError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_splats(cloud.splats(), &mut writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_splats() -> Vec<Splat> {
        let mut a = Splat::new(
            Vec3::new(1.5, -2.25, 0.75),
            Vec3::new(0.1, 0.2, 0.05),
            Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 0.4),
            0.9,
            Vec3::new(1.2, 0.3, 0.1),
        );
        a.sh.rest[0] = Vec3::new(0.05, -0.02, 0.01);
        a.sh.rest[7] = Vec3::new(-0.1, 0.1, 0.2);
        let b = Splat::spherical(Vec3::new(-4.0, 0.0, 9.0), 0.25, Vec3::splat(0.4), 0.35);
        vec![a, b]
    }

    fn assert_splats_close(a: &Splat, b: &Splat) {
        assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-6);
        assert_relative_eq!(a.position.y, b.position.y, epsilon = 1e-6);
        assert_relative_eq!(a.position.z, b.position.z, epsilon = 1e-6);
        assert_relative_eq!(a.scale.x, b.scale.x, epsilon = 1e-6);
        assert_relative_eq!(a.scale.y, b.scale.y, epsilon = 1e-6);
        assert_relative_eq!(a.scale.z, b.scale.z, epsilon = 1e-6);
        assert_relative_eq!(a.rotation.x, b.rotation.x, epsilon = 1e-5);
        assert_relative_eq!(a.rotation.w, b.rotation.w, epsilon = 1e-5);
        assert_relative_eq!(a.opacity, b.opacity, epsilon = 1e-6);
        assert_relative_eq!(a.sh.dc.x, b.sh.dc.x, epsilon = 1e-6);
        for i in 0..SH_REST_COUNT {
            assert_relative_eq!(a.sh.rest[i].x, b.sh.rest[i].x, epsilon = 1e-6);
            assert_relative_eq!(a.sh.rest[i].y, b.sh.rest[i].y, epsilon = 1e-6);
            assert_relative_eq!(a.sh.rest[i].z, b.sh.rest[i].z, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let splats = sample_splats();
        let mut payload = Vec::new();
        encode_splats(&splats, &mut payload).unwrap();
        let decoded = decode_splats(&payload[..]).unwrap();
        assert_eq!(decoded.len(), splats.len());
        for (a, b) in splats.iter().zip(decoded.iter()) {
            assert_splats_close(a, b);
        }
    }

    #[test]
    fn test_decode_log_scale_and_logit_opacity() {
        // 3DGS convention: scale_0..2 in log space, opacity as a logit.
        let ply = "\
ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property float scale_0
property float scale_1
property float scale_2
property float rot_0
property float rot_1
property float rot_2
property float rot_3
property float opacity
property float f_dc_0
property float f_dc_1
property float f_dc_2
end_header
1 2 3 -2.3025851 -2.3025851 -2.3025851 0 0 0 1 4.0 0.7 0.2 0.1
";
        let splats = decode_splats(ply.as_bytes()).unwrap();
        assert_eq!(splats.len(), 1);
        assert_relative_eq!(splats[0].scale.x, 0.1, epsilon = 1e-5);
        // sigmoid(4.0)
        assert_relative_eq!(splats[0].opacity, 0.98201376, epsilon = 1e-5);
        assert_relative_eq!(splats[0].sh.dc.x, 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_plain_point_cloud() {
        let ply = "\
ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
end_header
0 0 0 255 0 0
10 0 0 0 255 0
";
        let splats = decode_splats(ply.as_bytes()).unwrap();
        assert_eq!(splats.len(), 2);
        // Plain color maps into the DC term scaled by the basis constant.
        assert_relative_eq!(splats[0].sh.dc.x * SH_DC_NORM, 1.0, epsilon = 1e-4);
        assert_eq!(splats[0].rotation, Quat::IDENTITY);
        // Adaptive default scale from the 10-unit bounding box.
        assert_relative_eq!(splats[0].scale.x, 10.0 / 5000.0, epsilon = 1e-6);
        assert_relative_eq!(splats[0].opacity, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_missing_position_errors() {
        let ply = "\
ply
format ascii 1.0
element vertex 1
property float y
property float z
end_header
1 2
";
        assert!(decode_splats(ply.as_bytes()).is_err());
    }

    #[test]
    fn test_decode_garbage_errors() {
        assert!(decode_splats(&b"not a ply file"[..]).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let cloud = SplatCloud::from_splats(sample_splats()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        save_cloud(&cloud, &path).unwrap();
        let loaded = load_cloud(&path).unwrap();
        assert_eq!(loaded.len(), cloud.len());
        for (a, b) in cloud.splats().iter().zip(loaded.splats().iter()) {
            assert_splats_close(a, b);
        }
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(load_cloud("/nonexistent/cloud.ply").is_err());
    }
}
