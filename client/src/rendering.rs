use crate::assets::AssetStore;
use crate::game::World;
use macroquad::prelude::*;
use shared::Rect;

/// Back-to-front layer roles, in the order they are painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Background,
    Obstacles,
    LocalPlayer,
    RemotePlayers,
    Foreground,
}

pub const DRAW_ORDER: [Layer; 5] = [
    Layer::Background,
    Layer::Obstacles,
    Layer::LocalPlayer,
    Layer::RemotePlayers,
    Layer::Foreground,
];

pub const BACKGROUND_IMAGE: &str = "lobby";
pub const FOREGROUND_IMAGE: &str = "lobby_foreground";

/// One cell of a horizontal sprite strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripCell {
    pub index: usize,
    pub count: usize,
}

impl StripCell {
    pub const WHOLE: StripCell = StripCell { index: 0, count: 1 };
}

/// The only drawing operations the game needs.
pub trait PaintSurface {
    type Image;

    fn clear(&mut self);
    fn draw_image(&mut self, image: &Self::Image, cell: StripCell, dest: Rect);
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

#[derive(Debug, Clone)]
pub struct Renderer {
    obstacle_color: Color,
}

impl Renderer {
    /// Obstacles are painted fully transparent unless `show_obstacles` is set.
    pub fn new(show_obstacles: bool) -> Self {
        let obstacle_color = if show_obstacles {
            Color::from_rgba(255, 0, 0, 96)
        } else {
            Color::from_rgba(255, 0, 0, 0)
        };
        Self { obstacle_color }
    }

    pub fn draw_frame<S: PaintSurface>(
        &self,
        surface: &mut S,
        assets: &AssetStore<S::Image>,
        world: &World,
    ) {
        surface.clear();
        for layer in DRAW_ORDER {
            self.draw_layer(layer, surface, assets, world);
        }
    }

    fn draw_layer<S: PaintSurface>(
        &self,
        layer: Layer,
        surface: &mut S,
        assets: &AssetStore<S::Image>,
        world: &World,
    ) {
        let camera = &world.camera;
        match layer {
            Layer::Background => surface.draw_image(
                assets.get(BACKGROUND_IMAGE),
                StripCell::WHOLE,
                camera.to_screen(world.obstacles.bounds()),
            ),
            Layer::Obstacles => {
                for obstacle in world.obstacles.iter() {
                    surface.fill_rect(camera.to_screen(*obstacle), self.obstacle_color);
                }
            }
            Layer::LocalPlayer => {
                let sprite = world.local.animator.sprite();
                surface.draw_image(
                    assets.get(sprite.image),
                    StripCell {
                        index: sprite.index,
                        count: sprite.count,
                    },
                    world.local.sprite_rect(),
                );
            }
            Layer::RemotePlayers => {
                for remote in world.remotes.iter() {
                    let sprite = remote.animator.sprite();
                    surface.draw_image(
                        assets.get(sprite.image),
                        StripCell {
                            index: sprite.index,
                            count: sprite.count,
                        },
                        camera.to_screen(remote.sprite_rect()),
                    );
                }
            }
            Layer::Foreground => surface.draw_image(
                assets.get(FOREGROUND_IMAGE),
                StripCell::WHOLE,
                camera.to_screen(world.obstacles.bounds()),
            ),
        }
    }
}

/// Paints on the macroquad window.
pub struct MacroquadSurface;

impl PaintSurface for MacroquadSurface {
    type Image = Texture2D;

    fn clear(&mut self) {
        clear_background(Color::from_rgba(26, 26, 26, 255));
    }

    fn draw_image(&mut self, image: &Texture2D, cell: StripCell, dest: Rect) {
        let cell_width = image.width() / cell.count.max(1) as f32;
        draw_texture_ex(
            image,
            dest.x,
            dest.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(dest.width, dest.height)),
                source: Some(macroquad::math::Rect::new(
                    cell.index as f32 * cell_width,
                    0.0,
                    cell_width,
                    image.height(),
                )),
                ..Default::default()
            },
        );
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.a > 0.0 {
            draw_rectangle(rect.x, rect.y, rect.width, rect.height, color);
        }
    }
}

#[derive(Debug, Clone)]
pub struct HudInfo {
    pub local_id: Option<String>,
    pub room: String,
    pub player_count: usize,
}

/// Connection indicator and player count in the top-left corner.
pub fn draw_hud(info: &HudInfo) {
    let y_start = 10.0;

    let connection_color = if info.local_id.is_some() { GREEN } else { RED };
    draw_rectangle(10.0, y_start, 8.0, 8.0, connection_color);
    let label = match &info.local_id {
        Some(id) => format!("{} @ {}", id, info.room),
        None => "offline".to_string(),
    };
    draw_text(&label, 22.0, y_start + 8.0, 16.0, WHITE);

    let player_y = y_start + 15.0;
    for i in 0..(info.player_count.min(8)) {
        draw_rectangle(
            10.0 + (i as f32) * 4.0,
            player_y,
            3.0,
            3.0,
            Color::from_rgba(0, 170, 255, 255),
        );
    }
    let player_text = format!("{} players", info.player_count);
    draw_text(&player_text, 45.0, player_y + 4.0, 16.0, WHITE);
}
