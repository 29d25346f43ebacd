//! Essence Survivor entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlCanvasElement;

    use essence_survivor::consts::AUTOSAVE_INTERVAL;
    use essence_survivor::renderer::Renderer;
    use essence_survivor::sim::{GameState, HudStats, TickInput, tick};
    use essence_survivor::tuning::Tuning;
    use essence_survivor::{RenderError, Settings, format_amount, persistence};

    /// Held movement keys
    #[derive(Debug, Default, Clone, Copy)]
    struct Keys {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    }

    impl Keys {
        fn set(&mut self, key: &str, pressed: bool) -> bool {
            match key {
                "w" | "W" | "ArrowUp" => self.up = pressed,
                "s" | "S" | "ArrowDown" => self.down = pressed,
                "a" | "A" | "ArrowLeft" => self.left = pressed,
                "d" | "D" | "ArrowRight" => self.right = pressed,
                _ => return false,
            }
            true
        }

        fn direction(&self) -> Vec2 {
            let x = self.right as i32 - self.left as i32;
            let y = self.down as i32 - self.up as i32;
            Vec2::new(x as f32, y as f32).normalize_or_zero()
        }
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        tuning: Tuning,
        settings: Settings,
        renderer: Option<Renderer>,
        canvas: HtmlCanvasElement,
        last_time: f64,
        keys: Keys,
        paused: bool,
        autosave_timer: f32,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, tuning: Tuning, settings: Settings, canvas: HtmlCanvasElement) -> Self {
            let mut state = GameState::new(seed, &tuning);
            state.bounds = Vec2::new(
                canvas.client_width().max(1) as f32,
                canvas.client_height().max(1) as f32,
            );
            state.player.pos = state.center();
            match persistence::load() {
                Some(record) => {
                    record.apply_to(&mut state);
                    log::info!("Loaded save at wave {:.1}", state.wave);
                }
                None => state.soft_reset(),
            }
            Self {
                state,
                tuning,
                settings,
                renderer: None,
                canvas,
                last_time: 0.0,
                keys: Keys::default(),
                paused: false,
                autosave_timer: 0.0,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Keep the backing store at client size times DPR
        fn sync_canvas_size(&mut self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let dpr = window.device_pixel_ratio();
            let client_w = self.canvas.client_width().max(1);
            let client_h = self.canvas.client_height().max(1);
            let width = (client_w as f64 * dpr) as u32;
            let height = (client_h as f64 * dpr) as u32;
            if width == self.canvas.width() && height == self.canvas.height() {
                return;
            }
            self.canvas.set_width(width);
            self.canvas.set_height(height);
            self.state.bounds = Vec2::new(client_w as f32, client_h as f32);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.resize(width, height, dpr as f32);
            }
            log::debug!("Canvas resized to {}x{} @{}x", width, height, dpr);
        }

        /// Run one simulation tick
        fn update(&mut self, dt: f32, time: f64) {
            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (59000.0 / elapsed).round() as u32;
                }
            }

            if self.paused {
                return;
            }

            let was_running = self.state.running;
            let input = TickInput {
                move_dir: self.keys.direction(),
            };
            tick(&mut self.state, &self.tuning, &input, dt);

            if let Some(renderer) = self.renderer.as_mut() {
                renderer.spawn_event_particles(&self.state.events, &self.settings);
            }

            self.autosave_timer += dt;
            if self.autosave_timer >= AUTOSAVE_INTERVAL || (was_running && !self.state.running) {
                self.autosave_timer = 0.0;
                persistence::save(&self.state);
            }
        }

        /// Render the current frame
        fn render(&mut self, hud: &HudStats, dt: f32) {
            let Some(renderer) = self.renderer.as_mut() else {
                return;
            };
            let dt = if self.paused { 0.0 } else { dt };
            if let Err(e) = renderer.render(&self.state, &self.tuning, hud, &self.settings, dt) {
                renderer.handle_surface_error(e);
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self, hud: &HudStats) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let set = |selector: &str, text: &str| {
                if let Some(el) = document.query_selector(selector).ok().flatten() {
                    el.set_text_content(Some(text));
                }
            };

            set("#hud-wave .hud-value", &format!("{:.1}", hud.wave));
            set(
                "#hud-hp .hud-value",
                &format!("{:.0}/{:.0}", hud.hp.max(0.0), hud.max_hp),
            );
            set("#hud-essence .hud-value", &format_amount(hud.essence));
            set("#hud-fragments .hud-value", &format_amount(hud.fragments));
            set(
                "#hud-dps .hud-value",
                &format!(
                    "{} / {}",
                    format_amount(hud.measured_dps as f64),
                    format_amount(hud.dps_estimate as f64)
                ),
            );
            set("#hud-spawn .hud-value", &format!("{:.2}/s", hud.spawn_rate));
            set("#hud-idle .hud-value", &format!("{}/s", format_amount(hud.idle_rate)));
            if self.settings.show_fps {
                set("#hud-fps .hud-value", &self.fps.to_string());
            }

            if let Some(el) = document.get_element_by_id("game-over") {
                let class = if hud.running { "hidden" } else { "" };
                let _ = el.set_attribute("class", class);
            }
        }

        /// Step the quality preset and rebuild the particle pool to match
        fn cycle_quality(&mut self) {
            let preset = self.settings.cycle_quality();
            self.settings.save();
            self.tuning = Tuning::default();
            self.settings.apply_to_tuning(&mut self.tuning);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.apply_settings(&self.settings);
                log::info!(
                    "Quality {}: {} particle slots ({})",
                    preset.as_str(),
                    renderer.particles_mut().count(),
                    renderer.backend().as_str()
                );
            }
        }

        /// Start a new run, keeping meta progression
        fn restart(&mut self) {
            self.state.soft_reset();
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.particles_mut().clear();
            }
            self.autosave_timer = 0.0;
            persistence::save(&self.state);
            log::info!("Run restarted");
        }
    }

    async fn init_renderer(
        canvas: &HtmlCanvasElement,
        width: u32,
        height: u32,
        dpr: f32,
        settings: &Settings,
    ) -> Result<Renderer, RenderError> {
        let window = web_sys::window()
            .ok_or_else(|| RenderError::Unsupported("no window".to_string()))?;
        let has_webgpu = js_sys::Reflect::get(&window.navigator(), &JsValue::from_str("gpu"))
            .map(|gpu| !gpu.is_undefined() && !gpu.is_null())
            .unwrap_or(false);
        let backends = if has_webgpu {
            wgpu::Backends::BROWSER_WEBGPU
        } else {
            log::info!("WebGPU unavailable, falling back to WebGL2");
            wgpu::Backends::GL
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        Renderer::new(surface, &adapter, width, height, dpr, settings).await
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialised".into());
        }

        log::info!("Essence Survivor starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element found");
            return;
        };

        // Set canvas size
        let dpr = window.device_pixel_ratio();
        let width = (canvas.client_width().max(1) as f64 * dpr) as u32;
        let height = (canvas.client_height().max(1) as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let settings = Settings::load();
        let mut tuning = Tuning::default();
        settings.apply_to_tuning(&mut tuning);

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, tuning, settings.clone(), canvas.clone())));
        log::info!("Game initialized with seed: {}", seed);

        match init_renderer(&canvas, width, height, dpr as f32, &settings).await {
            Ok(renderer) => game.borrow_mut().renderer = Some(renderer),
            Err(e) => log::error!("Renderer unavailable, running headless: {}", e),
        }

        setup_input_handlers(game.clone());
        setup_auto_pause(game.clone());

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        // Start game loop
        request_animation_frame(game);

        log::info!("Essence Survivor running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Key down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let mut g = game.borrow_mut();
                let key = event.key();
                if g.keys.set(&key, true) {
                    event.prevent_default();
                    return;
                }
                match key.as_str() {
                    "r" | "R" => g.restart(),
                    "q" | "Q" => g.cycle_quality(),
                    "p" | "P" | "Escape" => {
                        g.paused = !g.paused;
                        log::info!("Paused: {}", g.paused);
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                game.borrow_mut().keys.set(&event.key(), false);
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        // Visibility change (tab switch, minimize): pause and save
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                g.paused = true;
                g.keys = Keys::default();
                persistence::save(&g.state);
                log::info!("Auto-paused (tab hidden)");
            } else {
                g.paused = false;
                // Avoid one huge dt after returning
                g.last_time = 0.0;
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                1.0 / 60.0
            };
            g.last_time = time;

            g.sync_canvas_size();
            g.update(dt, time);
            let hud = HudStats::compute(&g.state, &g.tuning);
            g.render(&hud, dt);
            g.update_hud(&hud);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Essence Survivor (native) starting...");
    log::info!("Rendering needs a browser canvas; running a headless simulation instead");

    let tuning = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                essence_survivor::tuning::Tuning::from_json(&json).map_err(|e| e.to_string())
            }) {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            Err(e) => {
                log::warn!("Ignoring tuning file {}: {}", path, e);
                Default::default()
            }
        },
        None => Default::default(),
    };

    headless_run(&tuning, 120.0);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Simulate `seconds` of play with the player circling the arena
#[cfg(not(target_arch = "wasm32"))]
fn headless_run(tuning: &essence_survivor::tuning::Tuning, seconds: f32) {
    use essence_survivor::sim::{GameEvent, GameState, HudStats, TickInput, tick};
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    let mut state = GameState::new(0x5eed, tuning);
    let mut kills = 0usize;
    let mut bosses = 0usize;
    let steps = (seconds / DT) as usize;

    for step in 0..steps {
        let t = step as f32 * DT;
        let input = TickInput {
            move_dir: Vec2::new((t * 0.7).cos(), (t * 0.7).sin()),
        };
        tick(&mut state, tuning, &input, DT);
        for event in &state.events {
            match event {
                GameEvent::EnemyKilled { .. } => kills += 1,
                GameEvent::BossDefeated { .. } => bosses += 1,
                _ => {}
            }
        }
        if !state.running {
            log::info!("Player defeated after {:.1}s", state.time);
            break;
        }
    }

    let hud = HudStats::compute(&state, tuning);
    log::info!(
        "Headless run: {} kills, {} bosses, {} enemies alive",
        kills,
        bosses,
        hud.enemies
    );
    for line in hud.lines() {
        println!("{line}");
    }
}
