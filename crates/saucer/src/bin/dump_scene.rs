//! Load a level and write its atlases and mesh statistics to disk.
//!
//! Produces `world_atlas.png`, `model_atlas.png` and `scene.json` in the
//! output directory.
//!
//! Run: `cargo run -p saucer --features cli --bin dump_scene -- <map> [--wad <path>] [--out <dir>] [--billboards]`
//!
//! Set `RUST_LOG=debug` to see every omitted row.

use std::env;
use std::fs;
use std::path::PathBuf;

use image::ImageFormat;
use saucer::{MapVariant, MaskedMeshes, MeshBuffer, Scene, SceneConfig};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: dump_scene <map> [--wad <path>] [--out <dir>] [--billboards]";

struct Args {
    map: PathBuf,
    out: PathBuf,
    config: SceneConfig,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut map = None;
    let mut out = PathBuf::from(".");
    let mut config = SceneConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--wad" => {
                let path = args.next().ok_or("--wad needs a path")?;
                config = config.with_archive(path);
            }
            "--out" => {
                out = args.next().ok_or("--out needs a directory")?.into();
            }
            "--billboards" => config = config.with_variant(MapVariant::Billboard),
            _ if map.is_none() && !arg.starts_with("--") => map = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
    }

    Ok(Args {
        map: map.ok_or("missing map path")?,
        out,
        config,
    })
}

fn mesh_stats<V: Copy>(mesh: &MeshBuffer<V>) -> serde_json::Value {
    json!({
        "vertices": mesh.vertex_count(),
        "triangles": mesh.triangle_count(),
    })
}

fn masked_stats(meshes: &MaskedMeshes) -> serde_json::Value {
    json!({
        "solid": mesh_stats(&meshes.solid),
        "masked": mesh_stats(&meshes.masked),
    })
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let scene = Scene::load(&args.map, &args.config)?;

    fs::create_dir_all(&args.out)?;

    for (name, atlas) in [
        ("world_atlas.png", &scene.world_atlas),
        ("model_atlas.png", &scene.model_atlas),
    ] {
        if atlas.page_count() == 0 {
            tracing::warn!("Skipping {name}: no pages used");
            continue;
        }
        let path = args.out.join(name);
        atlas.image.save_with_format(&path, ImageFormat::Png)?;
        tracing::info!("Wrote {}", path.display());
    }

    let omissions = &scene.omissions;
    let summary = json!({
        "map": args.map.display().to_string(),
        "background_color": scene.background_color,
        "world_atlas": {
            "width": scene.world_atlas.width(),
            "pages": scene.world_atlas.pages().map(|(page, _)| page).collect::<Vec<_>>(),
        },
        "model_atlas": {
            "width": scene.model_atlas.width(),
            "pages": scene.model_atlas.pages().map(|(page, _)| page).collect::<Vec<_>>(),
        },
        "meshes": {
            "terrain": mesh_stats(&scene.meshes.terrain),
            "blocks": masked_stats(&scene.meshes.blocks),
            "models": masked_stats(&scene.meshes.models),
            "billboards": mesh_stats(&scene.meshes.billboards),
        },
        "omissions": {
            "missing_block_defs": omissions.missing_block_defs,
            "unresolved_textures": omissions.unresolved_textures,
            "missing_models": omissions.missing_models,
            "invalid_model_faces": omissions.invalid_model_faces,
        },
    });

    let path = args.out.join("scene.json");
    fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    tracing::info!("Wrote {}", path.display());

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
        eprintln!("Failed to dump {}: {e}", args.map.display());
        std::process::exit(1);
    }
}
