//! CPU compositor: turns a [`FrameView`] into an RGBA image.
//!
//! The canvas persists between frames. Each frame it fades toward black by
//! `fillOpacity`, agents are drawn on top as round points coloured from the
//! trail under them, and the result is read out through a radial chromatic
//! aberration and an optional invert.

use std::path::Path;

use glam::{Vec2, Vec3};
use image::{ImageResult, RgbaImage};
use rayon::prelude::*;

use crate::error::ResourceInitError;
use crate::field::to_texture_space;
use crate::params::{ParamId, ParameterVector};
use crate::simulation::FrameView;

/// HSL to RGB, all components in `[0, 1]`.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let channel = |k: f32| (((h * 6.0 + k).rem_euclid(6.0) - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let rgb = Vec3::new(channel(0.0), channel(4.0), channel(2.0));
    Vec3::splat(l) + (rgb - Vec3::splat(0.5)) * s * (1.0 - (2.0 * l - 1.0).abs())
}

/// Colour of an agent standing on trail intensity `intensity`.
pub fn agent_color(params: &ParameterVector, intensity: f32) -> Vec3 {
    let hue = (params[ParamId::HueBase] + params[ParamId::HueMultiplier] * intensity).rem_euclid(1.0);
    let sat = (params[ParamId::SaturationBase] + params[ParamId::SaturationMultiplier] * intensity).clamp(0.0, 1.0);
    let light = (params[ParamId::LightnessBase] + params[ParamId::LightnessMultiplier] * intensity).clamp(0.0, 1.0);
    let contrast = (params[ParamId::ContrastBase] + params[ParamId::ContrastMultiplier] * intensity).clamp(0.0, 2.0);
    let rgb = hsl_to_rgb(hue, sat, light);
    ((rgb - Vec3::splat(0.5)) * contrast + Vec3::splat(0.5)).clamp(Vec3::ZERO, Vec3::ONE)
}

/// Persistent canvas at render resolution.
pub struct Compositor {
    size: usize,
    canvas: Vec<Vec3>,
}

impl Compositor {
    /// Black `size × size` canvas.
    pub fn new(size: u32) -> Result<Self, ResourceInitError> {
        if size == 0 {
            return Err(ResourceInitError::ZeroSize { what: "canvas" });
        }
        let size = size as usize;
        let len = size
            .checked_mul(size)
            .ok_or(ResourceInitError::Allocation { what: "canvas", len: usize::MAX })?;
        let mut canvas = Vec::new();
        canvas
            .try_reserve_exact(len)
            .map_err(|_| ResourceInitError::Allocation { what: "canvas", len })?;
        canvas.resize(len, Vec3::ZERO);
        Ok(Self { size, canvas })
    }

    pub fn size(&self) -> u32 {
        self.size as u32
    }

    /// Change the render resolution; the canvas starts black. On error the
    /// old canvas is kept.
    pub fn resize(&mut self, size: u32) -> Result<(), ResourceInitError> {
        *self = Self::new(size)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.canvas.fill(Vec3::ZERO);
    }

    /// Compose `frame` onto the canvas and return the displayed image.
    pub fn render(&mut self, frame: &FrameView<'_>) -> RgbaImage {
        let params = frame.params;
        if frame.display_particles {
            self.fade(params[ParamId::FillOpacity]);
            self.draw_agents(frame);
        } else {
            self.draw_field(frame);
        }
        self.present(params)
    }

    fn fade(&mut self, fill_opacity: f32) {
        let keep = 1.0 - fill_opacity.clamp(0.0, 1.0);
        self.canvas.par_iter_mut().for_each(|c| *c *= keep);
    }

    fn draw_agents(&mut self, frame: &FrameView<'_>) {
        let params = frame.params;
        let alpha = params[ParamId::DrawOpacity].clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let n = self.size as f32;
        let radius = params[ParamId::PointSize].max(1.0) * 0.5;
        let reach = radius.ceil() as i64;

        for agent in frame.agents {
            let uv = to_texture_space(agent.position);
            let color = agent_color(params, frame.field.sample(uv));
            let centre = Vec2::new(uv.x * n, (1.0 - uv.y) * n);
            let (cx, cy) = (centre.x.floor() as i64, centre.y.floor() as i64);

            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let px = cx + dx;
                    let py = cy + dy;
                    let pixel_centre = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                    let inside = (dx == 0 && dy == 0) || pixel_centre.distance_squared(centre) <= radius * radius;
                    if inside {
                        let idx = self.index(px, py);
                        let c = &mut self.canvas[idx];
                        *c = *c * (1.0 - alpha) + color * alpha;
                    }
                }
            }
        }
    }

    fn draw_field(&mut self, frame: &FrameView<'_>) {
        let n = self.size;
        let field = frame.field;
        self.canvas.par_chunks_mut(n).enumerate().for_each(|(y, row)| {
            for (x, c) in row.iter_mut().enumerate() {
                let uv = Vec2::new((x as f32 + 0.5) / n as f32, 1.0 - (y as f32 + 0.5) / n as f32);
                *c = Vec3::splat(field.sample(uv).clamp(0.0, 1.0));
            }
        });
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> usize {
        let n = self.size as i64;
        (y.rem_euclid(n) * n + x.rem_euclid(n)) as usize
    }

    fn texel(&self, uv: Vec2) -> Vec3 {
        let n = self.size as f32;
        let x = (uv.x * n).floor().clamp(0.0, n - 1.0) as usize;
        let y = (uv.y * n).floor().clamp(0.0, n - 1.0) as usize;
        self.canvas[y * self.size + x]
    }

    fn present(&self, params: &ParameterVector) -> RgbaImage {
        let n = self.size;
        let strength = params[ParamId::ChromaticAberrationStrength];
        let offset = params[ParamId::ChromaticAberrationOffset];
        let invert = params.is_inverted();
        let centre = Vec2::splat(0.5);

        let mut image = RgbaImage::new(n as u32, n as u32);
        image.par_chunks_mut(n * 4).enumerate().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let uv = Vec2::new((x as f32 + 0.5) / n as f32, (y as f32 + 0.5) / n as f32);
                let direction = uv - centre;
                let shift = direction.normalize_or_zero() * offset * strength * direction.length();

                let mut color = Vec3::new(
                    self.texel(uv - shift).x,
                    self.texel(uv).y,
                    self.texel(uv + shift).z,
                );
                if invert {
                    color = Vec3::ONE - color;
                }
                let color = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
                px.copy_from_slice(&[
                    color.x.round() as u8,
                    color.y.round() as u8,
                    color.z.round() as u8,
                    255,
                ]);
            }
        });
        image
    }
}

/// Write a composed frame as PNG.
pub fn save_png(image: &RgbaImage, path: impl AsRef<Path>) -> ImageResult<()> {
    image.save_with_format(path, image::ImageFormat::Png)
}
