use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::Instant;

use ::rand::{Rng, SeedableRng};
use ::rand::rngs::StdRng;
use anyhow::Context;
use lite2d::dynamics::{Body, BodyHandle, ResolveMode, ShapeType, World};
use lite2d::math::Vec2;
use macroquad::prelude::*;

const ITERATIONS: u32 = 20;

fn random_range(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    rng.gen_range(lo..=hi)
}

fn mode_name(mode: ResolveMode) -> &'static str {
    match mode {
        ResolveMode::None => "1: None",
        ResolveMode::CollisionOnly => "2: Collision only",
        ResolveMode::Basic => "3: Basic",
        ResolveMode::Rotation => "4: Rotation",
        ResolveMode::RotationFriction => "5: Rotation + friction",
    }
}

fn mode_from_key(key: KeyCode) -> Option<ResolveMode> {
    Some(match key {
        KeyCode::Key1 => ResolveMode::None,
        KeyCode::Key2 => ResolveMode::CollisionOnly,
        KeyCode::Key3 => ResolveMode::Basic,
        KeyCode::Key4 => ResolveMode::Rotation,
        KeyCode::Key5 => ResolveMode::RotationFriction,
        _ => return None,
    })
}

#[derive(Clone, Debug)]
struct Camera2DView {
    // Half of the visible world height.
    zoom: f32,
    pan: Vec2,
}

impl Default for Camera2DView {
    fn default() -> Self {
        Self {
            zoom: 20.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Camera2DView {
    fn half_extents(&self) -> Vec2 {
        let aspect = screen_width() / screen_height().max(1.0);
        Vec2::new(self.zoom * aspect, self.zoom)
    }

    // World +y points down, same as the screen.
    fn world_to_screen(&self, p: Vec2) -> Vec2 {
        let half = self.half_extents();
        let ndc_x = (p.x - self.pan.x) / half.x;
        let ndc_y = (p.y - self.pan.y) / half.y;
        Vec2::new(
            (ndc_x * 0.5 + 0.5) * screen_width(),
            (ndc_y * 0.5 + 0.5) * screen_height(),
        )
    }

    fn screen_to_world(&self, p: Vec2) -> Vec2 {
        let half = self.half_extents();
        let ndc_x = (p.x / screen_width()) * 2.0 - 1.0;
        let ndc_y = (p.y / screen_height().max(1.0)) * 2.0 - 1.0;
        Vec2::new(self.pan.x + ndc_x * half.x, self.pan.y + ndc_y * half.y)
    }

    fn bottom(&self) -> f32 {
        self.pan.y + self.zoom
    }

    fn scale(&self) -> f32 {
        screen_height() / (2.0 * self.zoom)
    }
}

fn draw_polygon_outline(view: &Camera2DView, vertices: &[Vec2], color: Color) {
    for (i, &v) in vertices.iter().enumerate() {
        let a = view.world_to_screen(v);
        let b = view.world_to_screen(vertices[(i + 1) % vertices.len()]);
        draw_line(a.x, a.y, b.x, b.y, 1.5, color);
    }
}

fn draw_body(view: &Camera2DView, body: &mut Body, color: Color) {
    match body.shape_type() {
        ShapeType::Circle => {
            let c = view.world_to_screen(body.position());
            let r = body.radius() * view.scale();
            draw_circle_lines(c.x, c.y, r, 1.5, color);

            // Spoke so rotation is visible.
            let (sin, cos) = body.angle().sin_cos();
            let rim = view.world_to_screen(body.position() + Vec2::new(cos, sin) * body.radius());
            draw_line(c.x, c.y, rim.x, rim.y, 1.0, color);
        }
        ShapeType::Box => draw_polygon_outline(view, body.transformed_vertices(), color),
    }
}

struct Sampler {
    started: Instant,
    step_ms: f64,
    bodies: usize,
    samples: usize,
    text: String,
}

impl Sampler {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            step_ms: 0.0,
            bodies: 0,
            samples: 0,
            text: String::from("BodyCount : -\nStepTime : -"),
        }
    }

    fn record(&mut self, step_ms: f64, bodies: usize) {
        self.step_ms += step_ms;
        self.bodies += bodies;
        self.samples += 1;

        if self.started.elapsed().as_secs_f64() > 1.0 {
            let n = self.samples.max(1) as f64;
            self.text = format!(
                "BodyCount : {:.4}\nStepTime : {:.4} ms",
                self.bodies as f64 / n,
                self.step_ms / n
            );
            self.step_ms = 0.0;
            self.bodies = 0;
            self.samples = 0;
            self.started = Instant::now();
        }
    }
}

fn add_static(
    world: &mut World,
    colors: &mut HashMap<BodyHandle, Color>,
    mut body: Body,
    position: Vec2,
    angle: f32,
    color: Color,
) {
    body.move_to(position);
    body.rotate(angle);
    let h = world.add_body(body);
    colors.insert(h, color);
}

fn build_scene(
    world: &mut World,
    colors: &mut HashMap<BodyHandle, Color>,
    view: &Camera2DView,
) -> anyhow::Result<()> {
    world.clear();
    colors.clear();

    let width = view.half_extents().x * 2.0;
    let padding = width * 0.1;

    let limits = world.config.limits;
    let ground = limits
        .create_box(width - padding * 2.0, 3.0, 1.0, 0.5, true)
        .context("creating ground")?;
    add_static(world, colors, ground, Vec2::new(0.0, 10.0), 0.0, DARKGREEN);

    let ledge = limits
        .create_box(20.0, 2.0, 1.0, 0.5, true)
        .context("creating left ledge")?;
    add_static(world, colors, ledge, Vec2::new(-10.0, -3.0), TAU / 20.0, DARKGRAY);

    let ledge = limits
        .create_box(15.0, 2.0, 1.0, 0.5, true)
        .context("creating right ledge")?;
    add_static(world, colors, ledge, Vec2::new(10.0, -10.0), -TAU / 20.0, MAROON);

    Ok(())
}

fn spawn(
    world: &mut World,
    colors: &mut HashMap<BodyHandle, Color>,
    rng: &mut StdRng,
    position: Vec2,
    circle: bool,
) -> anyhow::Result<()> {
    let limits = world.config.limits;
    let mut body = if circle {
        let r = random_range(rng, 1.25, 1.5);
        limits.create_circle(r, 1.0, 0.5, false)
    } else {
        let w = random_range(rng, 2.0, 3.0);
        let h = random_range(rng, 2.0, 3.0);
        limits.create_box(w, h, 1.0, 0.5, false)
    }
    .context("spawning body")?;
    body.move_to(position);

    let color = Color::new(
        random_range(rng, 0.4, 1.0),
        random_range(rng, 0.4, 1.0),
        random_range(rng, 0.4, 1.0),
        1.0,
    );
    colors.insert(world.add_body(body), color);
    Ok(())
}

// Dynamic bodies whose top edge has dropped below the view.
fn remove_fallen(world: &mut World, colors: &mut HashMap<BodyHandle, Color>, bottom: f32) {
    let fallen: Vec<BodyHandle> = world
        .bodies_mut()
        .filter_map(|(h, b)| (!b.is_static() && b.aabb().min.y > bottom).then_some(h))
        .collect();

    for h in fallen {
        world.remove_body(h);
        colors.remove(&h);
    }
}

#[macroquad::main("lite2d samples")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("samples: {err:#}");
    }
}

async fn run() -> anyhow::Result<()> {
    let mut world = World::new();
    let mut colors = HashMap::new();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut view = Camera2DView::default();
    let mut mode = ResolveMode::RotationFriction;
    let mut sampler = Sampler::new();
    let mut paused = false;

    build_scene(&mut world, &mut colors, &view)?;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        for key in [
            KeyCode::Key1,
            KeyCode::Key2,
            KeyCode::Key3,
            KeyCode::Key4,
            KeyCode::Key5,
        ] {
            if is_key_pressed(key) {
                if let Some(m) = mode_from_key(key) {
                    mode = m;
                }
            }
        }

        if is_key_pressed(KeyCode::K) {
            paused = !paused;
        }
        if is_key_pressed(KeyCode::R) {
            view = Camera2DView::default();
            build_scene(&mut world, &mut colors, &view)?;
        }
        if is_key_pressed(KeyCode::Up) {
            view.zoom = (view.zoom * 0.9).clamp(5.0, 100.0);
        }
        if is_key_pressed(KeyCode::Down) {
            view.zoom = (view.zoom * 1.1).clamp(5.0, 100.0);
        }

        let (mx, my) = mouse_position();
        let mouse = view.screen_to_world(Vec2::new(mx, my));
        if is_mouse_button_pressed(MouseButton::Left) {
            spawn(&mut world, &mut colors, &mut rng, mouse, true)?;
        }
        if is_mouse_button_pressed(MouseButton::Right) {
            spawn(&mut world, &mut colors, &mut rng, mouse, false)?;
        }

        let step = if paused {
            is_key_pressed(KeyCode::N).then_some(1.0 / 60.0)
        } else {
            Some(get_frame_time())
        };
        if let Some(dt) = step {
            let started = Instant::now();
            world.step(dt, ITERATIONS, mode);
            sampler.record(started.elapsed().as_secs_f64() * 1000.0, world.body_count());
        }

        remove_fallen(&mut world, &mut colors, view.bottom());

        clear_background(BLACK);

        for (h, body) in world.bodies_mut() {
            let color = colors.get(&h).copied().unwrap_or(LIGHTGRAY);
            draw_body(&view, body, color);
        }

        for &c in world.contact_points() {
            let p = view.world_to_screen(c);
            draw_rectangle(p.x - 3.0, p.y - 3.0, 6.0, 6.0, ORANGE);
        }

        let overlay = format!(
            "{}\nmode {} | K pause | N step | R reset | Up/Down zoom\nLMB circle | RMB box",
            sampler.text,
            mode_name(mode),
        );
        for (i, line) in overlay.lines().enumerate() {
            draw_text(line, 12.0, 20.0 + i as f32 * 20.0, 18.0, WHITE);
        }

        next_frame().await;
    }

    Ok(())
}
