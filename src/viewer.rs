use crate::math::Vec3;
use crate::output;
use crate::world::World;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{self, Color as TermColor, Stylize},
    terminal::{self, ClearType},
};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// Camera translation in world units per second of wall time.
const MOVE_SPEED: f32 = 2.0;
/// Camera rotation in radians per second of wall time.
const TURN_SPEED: f32 = 1.0;

/// Interactive progressive viewer.
///
/// Renders pass after pass into the terminal with half-block cells (two
/// vertical pixels per character) and drains key events between passes:
/// WASD translates in the view plane, R/F moves vertically, the arrow keys
/// pitch and yaw. Any camera change restarts accumulation, since the
/// per-pixel running mean is only meaningful over a fixed view; standing
/// still lets the image refine. `p` saves a PNG, `q` or Escape leaves.
pub fn run(world: &mut World<'_>, png_path: Option<&Path>) -> io::Result<()> {
    let mut stdout = io::BufWriter::new(io::stdout());
    terminal::enable_raw_mode()?;
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    let result = view_loop(&mut stdout, world, png_path);
    execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

#[derive(Default)]
struct Input {
    quit: bool,
    moved: bool,
    save: bool,
}

fn view_loop(
    out: &mut impl Write,
    world: &mut World<'_>,
    png_path: Option<&Path>,
) -> io::Result<()> {
    let mut last_frame = Instant::now();
    loop {
        world.render();
        draw(out, world)?;

        // A long pass would otherwise teleport the camera on one keypress.
        let dt = last_frame.elapsed().as_secs_f32().min(0.5);
        last_frame = Instant::now();

        let input = poll_input(world, dt)?;
        if input.quit {
            return Ok(());
        }
        if input.save {
            let path = png_path.unwrap_or(Path::new("lumen.png"));
            if let Err(e) = output::save_png(world, path) {
                log::warn!("failed to save PNG: {e}");
            }
        }
        if input.moved {
            world.clear_framebuffer();
        }
        world.rebalance();
    }
}

fn poll_input(world: &mut World<'_>, dt: f32) -> io::Result<Input> {
    let mut input = Input::default();
    let move_step = MOVE_SPEED * dt;
    let turn_step = TURN_SPEED * dt;

    while event::poll(Duration::ZERO)? {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }

        match key.code {
            KeyCode::Up => {
                rotate(world, turn_step, 0.0);
                input.moved = true;
            }
            KeyCode::Down => {
                rotate(world, -turn_step, 0.0);
                input.moved = true;
            }
            KeyCode::Left => {
                rotate(world, 0.0, turn_step);
                input.moved = true;
            }
            KeyCode::Right => {
                rotate(world, 0.0, -turn_step);
                input.moved = true;
            }
            KeyCode::Char('w') => {
                world.camera.move_axis(2, -move_step);
                input.moved = true;
            }
            KeyCode::Char('s') => {
                world.camera.move_axis(2, move_step);
                input.moved = true;
            }
            KeyCode::Char('a') => {
                world.camera.move_axis(0, -move_step);
                input.moved = true;
            }
            KeyCode::Char('d') => {
                world.camera.move_axis(0, move_step);
                input.moved = true;
            }
            KeyCode::Char('r') => {
                world.camera.move_axis(1, move_step);
                input.moved = true;
            }
            KeyCode::Char('f') => {
                world.camera.move_axis(1, -move_step);
                input.moved = true;
            }
            KeyCode::Char('p') => input.save = true,
            KeyCode::Char('q') | KeyCode::Esc => input.quit = true,
            _ => {}
        }
    }
    Ok(input)
}

fn rotate(world: &mut World<'_>, pitch: f32, yaw: f32) {
    let angle = world.camera.angle();
    world.camera.set_angle(angle + Vec3::new(pitch, yaw, 0.0));
}

/// Half-block rendering — each terminal cell shows two vertically stacked
/// pixels via the upper-half-block glyph with independent fg/bg colors.
fn draw(out: &mut impl Write, world: &World<'_>) -> io::Result<()> {
    let framebuffer = world.framebuffer();
    let width = world.width();
    let rows = world.height() / 2;

    for row in 0..rows {
        queue!(out, cursor::MoveTo(0, row as u16))?;
        for x in 0..width {
            let (tr, tg, tb) = framebuffer[(row * 2) * width + x].to_rgb8();
            let (br, bg, bb) = framebuffer[(row * 2 + 1) * width + x].to_rgb8();
            queue!(
                out,
                style::PrintStyledContent(
                    "▀".with(TermColor::Rgb {
                        r: tr,
                        g: tg,
                        b: tb
                    })
                    .on(TermColor::Rgb {
                        r: br,
                        g: bg,
                        b: bb
                    })
                )
            )?;
        }
    }

    queue!(
        out,
        cursor::MoveTo(0, rows as u16),
        terminal::Clear(ClearType::CurrentLine),
        style::Print(format!(
            "pass {:>4}  eye {}  [wasd/rf move, arrows look, p save, q quit]",
            world.sample_count(),
            world.camera.position(),
        ))
    )?;
    out.flush()
}
