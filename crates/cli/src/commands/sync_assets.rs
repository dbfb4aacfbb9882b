//! Discover static project assets and merge them into the project data.
//!
//! Layout on disk is `<static_dir>/<asset_path>/<project_id>/…`. Every file
//! under a project's folder is grouped by media type and written to that
//! project's `assets` object in `projects.json`. Objects written here carry
//! `"automated": true` and are the only ones this command will overwrite; an
//! `assets` object without the flag was authored by hand and is preserved.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use folio_core::config::{AppConfig, LoadOptions};
use serde_json::{json, Map, Value};
use walkdir::WalkDir;

use super::CommandResult;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "svg"];
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mov", "avi"];

#[derive(Debug, Default)]
struct ProjectAssets {
    images: Vec<String>,
    videos: Vec<String>,
    documents: Vec<String>,
}

impl ProjectAssets {
    fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.documents.is_empty()
    }

    fn to_value(&self) -> Value {
        json!({
            "images": self.images,
            "videos": self.videos,
            "documents": self.documents,
            "automated": true,
        })
    }
}

pub fn run(dry_run: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("sync-assets: config validation failed: {error}"),
            }
        }
    };

    let assets_root = config.data.static_dir.join(&config.data.asset_path);
    let projects_path = config.data.data_dir.join("projects.json");

    match sync(&assets_root, &projects_path, dry_run) {
        Ok(report) => CommandResult { exit_code: 0, output: report },
        Err(error) => {
            CommandResult { exit_code: 1, output: format!("sync-assets: {error}") }
        }
    }
}

fn sync(assets_root: &Path, projects_path: &Path, dry_run: bool) -> Result<String, String> {
    let discovered = scan_assets(assets_root);

    let contents = fs::read_to_string(projects_path)
        .map_err(|error| format!("could not read `{}`: {error}", projects_path.display()))?;
    let mut document: Value = serde_json::from_str(&contents)
        .map_err(|error| format!("could not parse `{}`: {error}", projects_path.display()))?;

    let projects = projects_array_mut(&mut document)
        .ok_or_else(|| format!("`{}` does not contain a project array", projects_path.display()))?;

    let mut updated = Vec::new();
    let mut preserved = Vec::new();
    for project in projects.iter_mut() {
        let Some(object) = project.as_object_mut() else { continue };
        let Some(id) = record_id(object) else { continue };
        let Some(assets) = discovered.get(&id) else { continue };

        if has_manual_assets(object) {
            preserved.push(id);
            continue;
        }
        object.insert("assets".to_string(), assets.to_value());
        updated.push(id);
    }

    if !dry_run && !updated.is_empty() {
        let rendered = serde_json::to_string_pretty(&document)
            .map_err(|error| format!("serialization failed: {error}"))?;
        fs::write(projects_path, rendered)
            .map_err(|error| format!("could not write `{}`: {error}", projects_path.display()))?;
    }

    let mut lines = vec![format!(
        "sync-assets{}: {} project folder(s) discovered under `{}`",
        if dry_run { " (dry run)" } else { "" },
        discovered.len(),
        assets_root.display()
    )];
    for id in &updated {
        lines.push(format!("- updated assets for `{id}`"));
    }
    for id in &preserved {
        lines.push(format!("- preserved manual assets for `{id}`"));
    }
    if updated.is_empty() {
        lines.push("- nothing to update".to_string());
    }
    Ok(lines.join("\n"))
}

/// Walk the assets root; each first-level directory is a project id, every
/// file below it is grouped by extension.
fn scan_assets(assets_root: &Path) -> BTreeMap<String, ProjectAssets> {
    let mut discovered: BTreeMap<String, ProjectAssets> = BTreeMap::new();

    let Ok(entries) = fs::read_dir(assets_root) else {
        return discovered;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(project_id) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        let mut assets = ProjectAssets::default();
        for file in WalkDir::new(&path).into_iter().flatten() {
            if !file.file_type().is_file() {
                continue;
            }
            let Ok(relative) = file.path().strip_prefix(assets_root) else { continue };
            let relative = relative.to_string_lossy().replace('\\', "/");

            let extension = file
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                assets.images.push(relative);
            } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
                assets.videos.push(relative);
            } else {
                assets.documents.push(relative);
            }
        }

        if !assets.is_empty() {
            assets.images.sort();
            assets.videos.sort();
            assets.documents.sort();
            discovered.insert(project_id.to_string(), assets);
        }
    }

    discovered
}

fn projects_array_mut(document: &mut Value) -> Option<&mut Vec<Value>> {
    match document {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get_mut("projects").and_then(Value::as_array_mut),
        _ => None,
    }
}

fn record_id(object: &Map<String, Value>) -> Option<String> {
    match object.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

fn has_manual_assets(object: &Map<String, Value>) -> bool {
    object
        .get("assets")
        .and_then(Value::as_object)
        .is_some_and(|assets| {
            assets.get("automated").and_then(Value::as_bool) != Some(true)
        })
}
