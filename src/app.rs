use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sdl2::audio::AudioDevice;
use sdl2::event::{Event, WindowEvent};
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::Canvas;
use sdl2::video::Window;
use sdl2::EventPump;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioSink, MixerHandle};
use crate::clock::MonotonicClock;
use crate::config::Config;
use crate::constants::LOOP_TIME;
use crate::events::EventBus;
use crate::formatter;
use crate::game::state::FlowState;
use crate::game::ui::{Hud, LogOverlay};
use crate::game::world::{CorridorWorld, World};
use crate::game::{Game, GameDeps};
use crate::input::{walk_vector, Bindings, InputAction};
use crate::platform::sdl::PlaybackCallback;
use crate::platform::{open_playback, SdlMicrophone, WavDecoder};
use crate::storage::JsonFileStore;
use crate::tasks::TaskQueue;

const WINDOW_WIDTH: u32 = 640;
const WINDOW_HEIGHT: u32 = 360;
/// How often the window title (the HUD) is refreshed, in frames.
const TITLE_REFRESH_FRAMES: u64 = 10;

pub struct App {
    game: Game<CorridorWorld, LogOverlay>,
    canvas: Canvas<Window>,
    event_pump: EventPump,
    bindings: Bindings,
    mixer: MixerHandle,
    muted: bool,
    last_tick: Instant,
    _playback: AudioDevice<PlaybackCallback>,
    _runtime: Runtime,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let sdl_context = sdl2::init().map_err(|e| anyhow!(e))?;
        let video_subsystem = sdl_context.video().map_err(|e| anyhow!(e))?;
        let audio_subsystem = sdl_context.audio().map_err(|e| anyhow!(e))?;

        let window = video_subsystem
            .window("SHUT UP!", WINDOW_WIDTH, WINDOW_HEIGHT)
            .resizable()
            .position_centered()
            .build()?;
        let mut canvas = window.into_canvas().build()?;
        canvas.set_logical_size(WINDOW_WIDTH, WINDOW_HEIGHT)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()?;

        let (playback, mixer) = open_playback(&audio_subsystem, config.sample_rate)?;
        mixer.set_mute(config.mute);

        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, "Scare layout seed");

        let bus = EventBus::new();
        let ui = LogOverlay::new(Hud::attach(&bus));
        let deps = GameDeps {
            bus,
            clock: Rc::new(MonotonicClock::default()),
            microphone: Box::new(SdlMicrophone::new(audio_subsystem.clone(), config.sample_rate)),
            store: Box::new(JsonFileStore::open(&config.data_dir)),
            sink: Rc::new(mixer.clone()),
            decoder: Arc::new(WavDecoder::new(mixer.sample_rate())),
            tasks: Some(TaskQueue::new(runtime.handle().clone())),
            rng: Box::new(SmallRng::seed_from_u64(seed)),
        };
        let game = Game::new(&config, CorridorWorld::new(), ui, deps);

        let event_pump = sdl_context.event_pump().map_err(|e| anyhow!(e))?;

        Ok(Self {
            game,
            canvas,
            event_pump,
            bindings: Bindings::default(),
            mixer,
            muted: config.mute,
            last_tick: Instant::now(),
            _playback: playback,
            _runtime: runtime,
        })
    }

    /// Runs one frame. Returns `false` once the player asked to quit.
    pub fn run(&mut self) -> bool {
        let start = Instant::now();

        let events: Vec<Event> = self.event_pump.poll_iter().collect();
        for event in events {
            match event {
                Event::Window { win_event, .. } => match win_event {
                    WindowEvent::Hidden => debug!("Window hidden"),
                    WindowEvent::Shown => debug!("Window shown"),
                    _ => {}
                },
                Event::Quit { .. } => {
                    info!("Exit requested. Exiting...");
                    return false;
                }
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => {
                    if let Some(action) = self.bindings.get(key) {
                        if !self.handle_input(action) {
                            return false;
                        }
                    }
                }
                _ => {}
            }
        }

        let dt = self.last_tick.elapsed().as_secs_f32();
        self.last_tick = Instant::now();

        if self.game.state() == FlowState::Play && !self.game.is_paused() {
            let input = walk_vector(&self.event_pump.keyboard_state());
            self.game.world_mut().walk(input, dt.min(crate::constants::MAX_FRAME_DELTA));
        }

        self.game.frame(dt);
        formatter::increment_frame();

        if let Err(e) = self.draw() {
            error!("Failed to draw frame: {e}");
        }
        if formatter::frame_count() % TITLE_REFRESH_FRAMES == 0 {
            let title = self.game.ui().hud().status_line();
            if let Err(e) = self.canvas.window_mut().set_title(&title) {
                warn!("Failed to update window title: {e}");
            }
        }

        if start.elapsed() < LOOP_TIME {
            let time = LOOP_TIME.saturating_sub(start.elapsed());
            if time != Duration::ZERO {
                spin_sleep::sleep(time);
            }
        } else {
            debug!("Frame behind schedule by: {:?}", start.elapsed() - LOOP_TIME);
        }

        true
    }

    fn handle_input(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::Command(command) => self.game.handle_command(command),
            InputAction::Button(button) => self.game.ui().press(button),
            InputAction::PrimaryButton => {
                if let Some(button) = self.game.ui().primary_action() {
                    self.game.ui().press(button);
                }
            }
            InputAction::MuteAudio => {
                self.muted = !self.muted;
                self.mixer.set_mute(self.muted);
                info!(muted = self.muted, "Audio mute toggled");
            }
            InputAction::Exit => {
                info!("Exit requested. Exiting...");
                return false;
            }
        }
        true
    }

    /// Crude top-down view: the corridor as a strip, the player as a dot, and the mic meter.
    fn draw(&mut self) -> Result<()> {
        let light = self.game.systems().flashlight.light();
        let glow = (light.intensity / crate::constants::FLASHLIGHT_BASE_INTENSITY * 40.0) as u8;

        self.canvas.set_draw_color(Color::RGB(glow / 4, glow / 4, glow / 3));
        self.canvas.clear();

        let world = self.game.world();
        let progress = (world.player_position().z / world.goal_distance()).clamp(0.0, 1.0);
        let strip = Rect::new(40, 160, WINDOW_WIDTH - 80, 40);
        self.canvas.set_draw_color(Color::RGB(30, 30, 34));
        self.canvas.fill_rect(strip).map_err(|e| anyhow!(e))?;

        let x = strip.x() + (progress * strip.width() as f32) as i32;
        self.canvas.set_draw_color(Color::RGB(200, 200, 180));
        self.canvas.fill_rect(Rect::new(x - 4, 176, 8, 8)).map_err(|e| anyhow!(e))?;

        let meter = self.game.ui().hud().mic_meter();
        let color = if meter > 0.8 { Color::RGB(200, 40, 40) } else { Color::RGB(60, 160, 60) };
        self.canvas.set_draw_color(color);
        let width = ((WINDOW_WIDTH - 80) as f32 * meter) as u32;
        if width > 0 {
            self.canvas.fill_rect(Rect::new(40, 300, width, 12)).map_err(|e| anyhow!(e))?;
        }

        self.canvas.present();
        Ok(())
    }
}
