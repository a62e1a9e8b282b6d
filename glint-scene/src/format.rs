//! Scene file format (".sharp").
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! magic    [u8; 4] = "SHRP"
//! version  u32     = 1
//! meta_len u64
//! metadata JSON document describing every object (name, transform,
//!          visibility, splat count)
//! payloads one length-prefixed PLY block per object, in metadata order
//! ```
//!
//! Loading stages the whole file into fresh objects before touching the
//! scene, so a malformed or truncated file never mutates it.

use crate::object::SceneObject;
use crate::scene::Scene;
use crate::SceneError;
use glam::{Quat, Vec3};
use glint_data::{ply, SplatCloud};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const MAGIC: [u8; 4] = *b"SHRP";
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SceneMeta {
    objects: Vec<ObjectMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    name: String,
    position: [f32; 3],
    rotation: [f32; 4],
    scale: [f32; 3],
    visible: bool,
    splat_count: u64,
}

pub(crate) fn save_scene(scene: &Scene, path: &Path) -> Result<(), SceneError> {
    let meta = SceneMeta {
        objects: scene
            .objects()
            .iter()
            .map(|o| ObjectMeta {
                name: o.name().to_string(),
                position: o.position().to_array(),
                rotation: o.rotation().to_array(),
                scale: o.scale().to_array(),
                visible: o.is_visible(),
                splat_count: o.cloud().len() as u64,
            })
            .collect(),
    };
    let meta_bytes = serde_json::to_vec(&meta)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(meta_bytes.len() as u64).to_le_bytes())?;
    writer.write_all(&meta_bytes)?;

    for object in scene.objects() {
        let mut payload = Vec::new();
        ply::encode_splats(object.cloud().splats(), &mut payload)?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
    }
    writer.flush()?;
    debug!("wrote {} object payloads", scene.objects().len());
    Ok(())
}

pub(crate) fn load_scene(scene: &mut Scene, path: &Path) -> Result<(), SceneError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SceneError::BadMagic);
    }
    let version = read_u32(&mut reader)?;
    if version != VERSION {
        return Err(SceneError::UnsupportedVersion(version));
    }

    let meta_len = read_u64(&mut reader)? as usize;
    let mut meta_bytes = vec![0u8; meta_len];
    reader
        .read_exact(&mut meta_bytes)
        .map_err(|_| SceneError::Malformed("truncated metadata".into()))?;
    let meta: SceneMeta = serde_json::from_slice(&meta_bytes)?;

    // Stage every object before mutating the scene.
    let mut staged = Vec::with_capacity(meta.objects.len());
    for object_meta in &meta.objects {
        let payload_len = read_u64(&mut reader)? as usize;
        let mut payload = vec![0u8; payload_len];
        reader
            .read_exact(&mut payload)
            .map_err(|_| SceneError::Malformed(format!("truncated payload for '{}'", object_meta.name)))?;
        let cloud = SplatCloud::from_splats(ply::decode_splats(&payload[..])?)?;
        if cloud.len() as u64 != object_meta.splat_count {
            return Err(SceneError::Malformed(format!(
                "'{}' declares {} splats but payload holds {}",
                object_meta.name,
                object_meta.splat_count,
                cloud.len()
            )));
        }
        staged.push((object_meta, cloud));
    }

    // Point of no return: previous contents go away, ids stay fresh.
    let mut objects = Vec::with_capacity(staged.len());
    scene.clear();
    for (object_meta, cloud) in staged {
        let id = scene.issue_id();
        let mut object = SceneObject::new(id, object_meta.name.clone(), cloud);
        object.position = Vec3::from_array(object_meta.position);
        object.rotation = Quat::from_array(object_meta.rotation).normalize();
        object.scale = Vec3::from_array(object_meta.scale);
        object.visible = object_meta.visible;
        objects.push(object);
    }
    scene.replace_objects(objects);
    Ok(())
}

fn read_u32(reader: &mut impl Read) -> Result<u32, SceneError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(reader: &mut impl Read) -> Result<u64, SceneError> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}
