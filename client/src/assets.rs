//! Sprite loading with placeholder fallback

use log::{info, warn};
use macroquad::texture::{load_texture, FilterMode, Texture2D};
use std::collections::HashMap;
use std::path::Path;

/// Logical image name and file name under the asset directory.
pub const MANIFEST: &[(&str, &str)] = &[
    ("lobby", "lobby.png"),
    ("lobby_foreground", "lobby_foreground.png"),
    ("player_up", "player_up.png"),
    ("player_down", "player_down.png"),
    ("player_left", "player_left.png"),
    ("player_right", "player_right.png"),
    ("player_idle_up", "player_idle_up.png"),
    ("player_idle_down", "player_idle_down.png"),
    ("player_idle_left", "player_idle_left.png"),
    ("player_idle_right", "player_idle_right.png"),
];

/// Images by logical name. Unknown names resolve to the placeholder.
pub struct AssetStore<T> {
    images: HashMap<String, T>,
    placeholder: T,
}

impl<T> AssetStore<T> {
    pub fn new(placeholder: T) -> Self {
        Self {
            images: HashMap::new(),
            placeholder,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, image: T) {
        self.images.insert(name.into(), image);
    }

    pub fn get(&self, name: &str) -> &T {
        self.images.get(name).unwrap_or(&self.placeholder)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Loads every manifest entry. A file that fails to load is logged and left
/// to the placeholder; the load as a whole never fails.
pub async fn load_assets(dir: &Path) -> AssetStore<Texture2D> {
    let mut store = AssetStore::new(Texture2D::empty());

    for (name, file) in MANIFEST {
        let path = dir.join(file);
        let Some(path_str) = path.to_str() else {
            warn!("Skipping non UTF-8 asset path {:?}", path);
            continue;
        };

        match load_texture(path_str).await {
            Ok(texture) => {
                texture.set_filter(FilterMode::Nearest);
                store.insert(*name, texture);
            }
            Err(e) => warn!("Failed to load {} ({}): {}, using placeholder", name, path_str, e),
        }
    }

    info!("Loaded {}/{} images from {:?}", store.len(), MANIFEST.len(), dir);
    store
}
