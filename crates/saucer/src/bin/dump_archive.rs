//! Export every bitmap and model of a world archive.
//!
//! Bitmaps are written as PNG under `textures/` and `bitmaps/`, models as
//! glTF 2.0 under `models/`, each with a `.bin` buffer and a `.png` atlas
//! next to it.
//!
//! Run: `cargo run -p saucer --features cli --bin dump_archive -- <wad> [--out <dir>]`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use saucer::decode::Archive;
use saucer::{ModelExport, bitmap_export_paths, export_models};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: dump_archive <wad> [--out <dir>]";

const GL_FLOAT: u32 = 5126;
const GL_UNSIGNED_INT: u32 = 5125;
const GL_NEAREST: u32 = 0x2600;
const GL_MIRRORED_REPEAT: u32 = 33648;
const GL_ARRAY_BUFFER: u32 = 34962;
const GL_ELEMENT_ARRAY_BUFFER: u32 = 34963;

struct Args {
    archive: PathBuf,
    out: PathBuf,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut archive: Option<PathBuf> = None;
    let mut out = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out = Some(PathBuf::from(args.next().ok_or("--out needs a directory")?)),
            _ if archive.is_none() && !arg.starts_with("--") => archive = Some(arg.into()),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
    }

    let archive = archive.ok_or("missing archive path")?;
    let out = out.unwrap_or_else(|| {
        let stem = archive.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{stem}_wad_exported"))
    });

    Ok(Args { archive, out })
}

fn material(masked: bool) -> Value {
    let mut material = json!({
        "pbrMetallicRoughness": {
            "baseColorTexture": { "index": 0 },
            "metallicFactor": 0.0,
            "roughnessFactor": 1.0,
        },
    });
    if masked {
        material["alphaMode"] = json!("MASK");
    }
    material
}

fn gltf_document(name: &str, export: &ModelExport, buffer_len: usize, vertex_bytes: usize) -> Value {
    let mut primitives = Vec::new();
    let mut accessors = Vec::new();

    for layout in export.primitives() {
        let first = accessors.len();
        accessors.push(json!({
            "bufferView": 0,
            "byteOffset": layout.vertex_offset,
            "componentType": GL_FLOAT,
            "count": layout.vertex_count,
            "type": "VEC3",
            "min": layout.min_position,
            "max": layout.max_position,
        }));
        accessors.push(json!({
            "bufferView": 0,
            "byteOffset": layout.vertex_offset + 3 * 4,
            "componentType": GL_FLOAT,
            "count": layout.vertex_count,
            "type": "VEC2",
        }));
        accessors.push(json!({
            "bufferView": 1,
            "byteOffset": layout.index_offset,
            "componentType": GL_UNSIGNED_INT,
            "count": layout.index_count,
            "type": "SCALAR",
        }));
        primitives.push(json!({
            "attributes": { "POSITION": first, "TEXCOORD_0": first + 1 },
            "indices": first + 2,
            "material": u32::from(layout.masked),
        }));
    }

    json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "name": name, "matrix": export.node_matrix.to_cols_array() }],
        "meshes": [{ "primitives": primitives }],
        "materials": [material(false), material(true)],
        "textures": [{ "sampler": 0, "source": 0 }],
        "samplers": [{
            "magFilter": GL_NEAREST,
            "minFilter": GL_NEAREST,
            "wrapS": GL_MIRRORED_REPEAT,
            "wrapT": GL_MIRRORED_REPEAT,
        }],
        "images": [{ "uri": format!("{name}.png") }],
        "buffers": [{ "uri": format!("{name}.bin"), "byteLength": buffer_len }],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": 0,
                "byteLength": vertex_bytes,
                "byteStride": saucer::export::VERTEX_STRIDE,
                "target": GL_ARRAY_BUFFER,
            },
            {
                "buffer": 0,
                "byteOffset": vertex_bytes,
                "byteLength": buffer_len - vertex_bytes,
                "target": GL_ELEMENT_ARRAY_BUFFER,
            },
        ],
        "accessors": accessors,
    })
}

fn dump_bitmaps(archive: &Archive, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let paths = bitmap_export_paths(archive);
    tracing::info!("Extracting {} bitmaps", paths.len());

    for dir in ["textures", "bitmaps"] {
        fs::create_dir_all(out.join(dir))?;
    }

    for (index, path) in paths.iter().enumerate() {
        archive
            .bitmap_image(index as u32)?
            .save_with_format(out.join(path), ImageFormat::Png)?;
    }

    Ok(())
}

fn dump_models(archive: &Archive, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let models = export_models(archive)?;
    tracing::info!("Extracting {} models", models.len());

    let dir = out.join("models");
    fs::create_dir_all(&dir)?;

    for (name, export) in &models {
        if export.omissions.total() > 0 {
            tracing::warn!("Model '{name}': {} faces left out", export.omissions.total());
        }

        let (buffer, vertex_bytes) = export.buffer();
        let document = gltf_document(name, export, buffer.len(), vertex_bytes);

        fs::write(dir.join(format!("{name}.bin")), &buffer)?;
        if export.atlas.page_count() > 0 {
            export
                .atlas
                .image
                .save_with_format(dir.join(format!("{name}.png")), ImageFormat::Png)?;
        }
        fs::write(
            dir.join(format!("{name}.gltf")),
            serde_json::to_string_pretty(&document)?,
        )?;
    }

    Ok(())
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let archive = Archive::open(&args.archive)?;
    fs::create_dir_all(&args.out)?;

    dump_bitmaps(&archive, &args.out)?;
    dump_models(&archive, &args.out)?;

    tracing::info!("Exported {} to {}", args.archive.display(), args.out.display());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("Failed to export {}: {e}", args.archive.display());
        std::process::exit(1);
    }
}
