mod core;
mod headless;
mod player;
mod settings;
mod sink;
mod ui;

use crate::core::{Schedule, ViewId};
use anyhow::{Context as _, Result};
use clap::Parser;
use headless::HeadlessOptions;
use player::{PlayerState, StartOutcome, TimelinePlayer};
use settings::DemoSettings;
use sink::{ConsoleState, PresentationSink, SinkResult};
use ui::{AboutDialog, ConsoleAction, ConsoleWindow, FileDialogs, ShortcutAction, ShortcutManager};
use imgui::{Context, FontConfig, FontSource};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{EventLoop, EventLoopWindowTarget};
use winit::keyboard::ModifiersState;
use winit::window::WindowBuilder;

use glutin::prelude::*;
use glutin::display::GetGlDisplay;
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasRawWindowHandle;
use glow::HasContext;

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// RoamEN emergency mesh console demo
#[derive(Parser, Debug)]
#[command(name = "roamen-demo", version, about)]
struct Cli {
    /// Run without a window and export the event journal
    #[arg(long)]
    headless: bool,

    /// Headless capture window in milliseconds (defaults to the saved setting)
    #[arg(long, env = "ROAMEN_DURATION_MS")]
    duration_ms: Option<u64>,

    /// Headless journal output path
    #[arg(long, short, default_value = "roamen-journal.csv")]
    output: PathBuf,

    /// Reset and replay the demo this many milliseconds into a headless capture
    #[arg(long, env = "ROAMEN_RESTART_AT_MS")]
    restart_at_ms: Option<u64>,
}

struct AppState {
    player: TimelinePlayer<ConsoleState>,
    console_window: ConsoleWindow,
    shortcut_manager: ShortcutManager,
    about_dialog: AboutDialog,
    settings: DemoSettings,
    status_message: Option<String>,
    /// Pending auto-start, cleared by any manual control
    autostart_at: Option<Instant>,
    modifiers: ModifiersState,
    show_event_log: bool,
    show_shortcuts: bool,
}

impl AppState {
    fn new(settings: DemoSettings) -> Result<Self> {
        let schedule = Schedule::demo().context("Failed to load demo schedule")?;
        let player = TimelinePlayer::new(schedule, ConsoleState::new(), settings.player_config())
            .context("Invalid player configuration")?;

        let autostart_at = settings
            .autostart
            .then(|| Instant::now() + settings.autostart_delay());

        Ok(Self {
            player,
            console_window: ConsoleWindow::new(),
            shortcut_manager: ShortcutManager::new(),
            about_dialog: AboutDialog::new(),
            show_event_log: settings.show_event_log,
            show_shortcuts: settings.show_shortcuts,
            settings,
            status_message: None,
            autostart_at,
            modifiers: ModifiersState::empty(),
        })
    }

    fn save_settings(&mut self) {
        self.settings.show_event_log = self.show_event_log;
        self.settings.show_shortcuts = self.show_shortcuts;
        self.settings.save();
    }

    /// Advance the player to `now`. A sink error stops the demo.
    fn update(&mut self, now: Instant) {
        if self.autostart_at.is_some_and(|at| now >= at) {
            self.autostart_at = None;
            self.start_demo(now);
        }

        if let Err(e) = self.player.tick(now) {
            error!("Demo playback failed: {}", e);
            self.player.stop();
            self.status_message = Some(format!("Demo stopped: {}", e));
        }
    }

    fn start_demo(&mut self, now: Instant) {
        self.autostart_at = None;
        match self.player.start(now) {
            StartOutcome::Started { .. } => {
                self.status_message = Some(format!("Demo started (epoch {})", self.player.epoch()));
            }
            StartOutcome::AlreadyRunning => {
                self.status_message = Some("Demo is already running".to_string());
            }
        }
    }

    fn stop_demo(&mut self) {
        self.autostart_at = None;
        let cancelled = self.player.stop();
        self.status_message = Some(format!("Demo stopped ({} timers cancelled)", cancelled));
    }

    fn restart_demo(&mut self, now: Instant) {
        self.autostart_at = None;
        match self.player.reset_and_restart(now + self.settings.manual_restart_delay()) {
            Ok(_) => self.status_message = Some("Demo restarting...".to_string()),
            Err(e) => {
                error!("Failed to restart demo: {}", e);
                self.status_message = Some(format!("Failed to restart demo: {}", e));
            }
        }
    }

    fn show_view(&mut self, view: ViewId) {
        let result = self.player.sink_mut().switch_view(view);
        self.report("switch view", result);
    }

    fn apply_console_action(&mut self, action: ConsoleAction) {
        let console = self.player.sink_mut();
        let result = match action {
            ConsoleAction::ShowView(view) => console.switch_view(view),
            ConsoleAction::SendMessage(text) => console.send_local_message(&text),
            ConsoleAction::RaiseAlert(severity, text) => console.raise_local_alert(severity, &text),
            ConsoleAction::SetTransmitting(on) => console.set_voice_transmitting(on),
            ConsoleAction::CloseModal => console.close_modal(),
        };
        self.report("console action", result);
    }

    fn report(&mut self, what: &str, result: SinkResult<()>) {
        if let Err(e) = result {
            warn!("Failed to apply {}: {}", what, e);
            self.status_message = Some(format!("Failed to apply {}: {}", what, e));
        }
    }

    fn export_journal(&mut self) {
        let Some(path) = FileDialogs::export_journal_file() else {
            return;
        };
        match self.player.sink().export_journal(&path) {
            Ok(bytes) => {
                info!("Exported journal to {} ({} bytes)", path.display(), bytes);
                self.status_message = Some(format!("Exported journal to {} ({} bytes)", path.display(), bytes));
            }
            Err(e) => {
                error!("Journal export failed: {:#}", e);
                self.status_message = Some(format!("Export failed: {:#}", e));
            }
        }
    }

    fn handle_shortcut(&mut self, action: ShortcutAction, window_target: &EventLoopWindowTarget<()>) {
        let now = Instant::now();
        match action {
            ShortcutAction::StartDemo => self.start_demo(now),
            ShortcutAction::StopDemo => self.stop_demo(),
            ShortcutAction::RestartDemo => self.restart_demo(now),
            ShortcutAction::ShowView(view) => self.show_view(view),
            ShortcutAction::ExportJournal => self.export_journal(),
            ShortcutAction::ToggleEventLog => self.show_event_log = !self.show_event_log,
            ShortcutAction::ShowHelp => self.show_shortcuts = true,
            ShortcutAction::Quit => {
                self.save_settings();
                window_target.exit();
            }
        }
    }

    fn status_line(&self) -> String {
        let console = self.player.sink();
        let state = match self.player.state() {
            PlayerState::Running => "Running",
            PlayerState::Idle => "Idle",
        };
        format!(
            "Demo: {} | Epoch: {} | Pending: {} | Messages: {} | Alerts: {}",
            state,
            self.player.epoch(),
            self.player.pending_count(),
            console.messages().len(),
            console.alert_count()
        )
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roamen_demo=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_headless(cli: &Cli, settings: &DemoSettings) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    let options = HeadlessOptions {
        capture_window: cli
            .duration_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| settings.capture_window()),
        output: cli.output.clone(),
        player: settings.player_config(),
        restart_at: cli.restart_at_ms.map(Duration::from_millis),
        restart_delay: settings.manual_restart_delay(),
    };

    let report = rt.block_on(headless::run(options))?;
    println!("{} ({} bytes)", report.output.display(), report.bytes);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    init_tracing();

    let cli = Cli::parse();
    let settings = DemoSettings::load();

    if cli.headless {
        return run_headless(&cli, &settings);
    }

    let mut state = AppState::new(settings)?;

    // Create event loop
    let event_loop = EventLoop::new().expect("Failed to create EventLoop");

    // Build the window and GL display using glutin-winit
    let (window, gl_config) = DisplayBuilder::new()
        .with_window_builder(Some(
            WindowBuilder::new()
                .with_title("RoamEN - Emergency Communication Demo")
                .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 800.0))
        ))
        .build(&event_loop, glutin::config::ConfigTemplateBuilder::new(), |mut iter| {
            iter.next().expect("No GL config available")
        })
        .expect("Failed to create window and display");

    let window = window.expect("Failed to create window");
    let gl_display = gl_config.display();

    let context = unsafe {
        gl_display.create_context(
            &gl_config,
            &glutin::context::ContextAttributesBuilder::new()
                .build(Some(window.raw_window_handle())),
        )
    }.expect("Failed to create GL context");

    // Create surface and make context current
    let attrs = window.build_surface_attributes(
        glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new()
    );

    let surface = unsafe {
        gl_display.create_window_surface(&gl_config, &attrs)
    }.expect("Failed to create surface");

    let context = context.make_current(&surface).expect("Failed to make context current");

    // Set up imgui
    let mut imgui = Context::create();
    imgui.set_log_filename(None::<PathBuf>);

    // Window layout lives next to the settings
    match DemoSettings::layout_path() {
        Some(ini_path) => {
            if let Some(parent) = ini_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            imgui.set_ini_filename(Some(ini_path));
        }
        None => imgui.set_ini_filename(None::<PathBuf>),
    }

    // Enable docking
    imgui.io_mut().config_flags |= imgui::ConfigFlags::DOCKING_ENABLE;

    // Configure fonts
    let hidpi_factor = window.scale_factor();
    let font_size = (15.0 * hidpi_factor) as f32;
    imgui.fonts().add_font(&[FontSource::DefaultFontData {
        config: Some(FontConfig {
            size_pixels: font_size,
            ..FontConfig::default()
        }),
    }]);
    imgui.io_mut().font_global_scale = (1.0 / hidpi_factor) as f32;

    // Set up platform and renderer
    let mut platform = WinitPlatform::init(&mut imgui);
    platform.attach_window(imgui.io_mut(), &window, HiDpiMode::Default);

    let load_gl = || unsafe {
        glow::Context::from_loader_function(|ptr| {
            let name = std::ffi::CString::new(ptr).expect("GL symbol contains a NUL byte");
            gl_display.get_proc_address(&name) as *const _
        })
    };
    let mut renderer = imgui_glow_renderer::AutoRenderer::initialize(load_gl(), &mut imgui)
        .expect("Failed to initialize renderer");

    // Second glow context for clearing (both reference the same GL context)
    let gl_clear = load_gl();

    let mut last_frame_time = Instant::now();
    let mut last_settings_save = Instant::now();

    info!("Console ready, {} schedule entries", state.player.schedule().len());

    // Main loop
    event_loop.run(move |event, window_target| {
        match &event {
            Event::NewEvents(_) => {
                let now = Instant::now();
                imgui.io_mut().update_delta_time(now - last_frame_time);
                last_frame_time = now;
            }
            Event::AboutToWait => {
                // Fire every timer due this frame before drawing
                state.update(Instant::now());

                // Save settings periodically (every 30 seconds)
                if last_settings_save.elapsed().as_secs() >= 30 {
                    state.save_settings();
                    last_settings_save = Instant::now();
                }

                platform.prepare_frame(imgui.io_mut(), &window)
                    .expect("Failed to prepare frame");
                window.request_redraw();
            }
            Event::WindowEvent { event: WindowEvent::ModifiersChanged(modifiers), .. } => {
                state.modifiers = modifiers.state();
            }
            Event::WindowEvent { event: WindowEvent::KeyboardInput { event: key_event, .. }, .. } => {
                // Typing into the message box must not trigger shortcuts
                if !imgui.io().want_text_input {
                    let mods = state.modifiers;
                    if let Some(action) = state.shortcut_manager.process_event(
                        key_event,
                        mods.control_key(),
                        mods.shift_key(),
                        mods.alt_key(),
                    ) {
                        state.handle_shortcut(action, window_target);
                    }
                }
            }
            Event::WindowEvent { event: WindowEvent::RedrawRequested, .. } => {
                let ui = imgui.new_frame();
                let now = Instant::now();

                // Menu bar
                ui.main_menu_bar(|| {
                    ui.menu("File", || {
                        if ui.menu_item_config("Export Journal...").shortcut("Ctrl+E").build() {
                            state.export_journal();
                        }
                        ui.separator();
                        if ui.menu_item_config("Exit").shortcut("Ctrl+Q").build() {
                            state.save_settings();
                            window_target.exit();
                        }
                    });

                    ui.menu("Demo", || {
                        let running = state.player.is_running();
                        if ui.menu_item_config("Start").shortcut("Ctrl+Space").enabled(!running).build() {
                            state.start_demo(now);
                        }
                        if ui.menu_item_config("Stop").shortcut("Esc").enabled(running).build() {
                            state.stop_demo();
                        }
                        if ui.menu_item_config("Reset & Restart").shortcut("Ctrl+D").build() {
                            state.restart_demo(now);
                        }
                        ui.separator();
                        ui.text(format!("Epoch: {}", state.player.epoch()));
                    });

                    ui.menu("View", || {
                        for (i, view) in ViewId::ALL.into_iter().enumerate() {
                            let shortcut = format!("Ctrl+{}", i + 1);
                            let active = state.player.sink().active_view() == view;
                            if ui.menu_item_config(view.title()).shortcut(shortcut).selected(active).build() {
                                state.show_view(view);
                            }
                        }
                        ui.separator();
                        ui.menu_item_config("Event Log")
                            .shortcut("Ctrl+L")
                            .build_with_ref(&mut state.show_event_log);
                    });

                    ui.menu("Help", || {
                        if ui.menu_item_config("Keyboard Shortcuts").shortcut("F1").build() {
                            state.show_shortcuts = true;
                        }
                        ui.separator();
                        if ui.menu_item("About RoamEN Demo") {
                            state.about_dialog.show();
                        }
                    });
                });

                // Status bar
                let window_size = window.inner_size();
                ui.set_cursor_pos([0.0, window_size.height as f32 / hidpi_factor as f32 - 25.0]);
                ui.child_window("Status")
                    .size([window_size.width as f32 / hidpi_factor as f32, 25.0])
                    .build(|| {
                        if let Some(ref msg) = state.status_message {
                            ui.text(msg);
                            ui.same_line();
                            ui.text_colored([0.6, 0.6, 0.6, 1.0], "|");
                            ui.same_line();
                        }
                        ui.text(state.status_line());
                    });

                // Windows dock into the main viewport
                ui.dockspace_over_main_viewport();

                let actions = state.console_window.render(ui, state.player.sink());
                for action in actions {
                    state.apply_console_action(action);
                }

                if state.show_event_log {
                    ui::render_event_log(ui, state.player.sink(), &mut state.show_event_log);
                }

                if state.show_shortcuts {
                    state.shortcut_manager.render_help(ui, &mut state.show_shortcuts);
                }

                state.about_dialog.render(ui);

                // Prepare and render
                platform.prepare_render(ui, &window);
                let draw_data = imgui.render();

                // Clear the screen before rendering
                unsafe {
                    gl_clear.clear_color(0.08, 0.09, 0.11, 1.0);
                    gl_clear.clear(glow::COLOR_BUFFER_BIT);
                }

                if let Err(e) = renderer.render(draw_data) {
                    error!("Rendering failed: {}", e);
                }
                if let Err(e) = surface.swap_buffers(&context) {
                    error!("Failed to swap buffers: {}", e);
                }
            }
            Event::WindowEvent { event: WindowEvent::Resized(size), .. } => {
                if let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
                    surface.resize(&context, width, height);
                }
            }
            Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
                state.save_settings();
                window_target.exit();
            }
            _ => {}
        }
        platform.handle_event(imgui.io_mut(), &window, &event);
    }).map_err(|e| anyhow::anyhow!("Event loop error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["roamen-demo"]);
        assert!(!cli.headless);
        assert_eq!(cli.duration_ms, None);
        assert_eq!(cli.output, PathBuf::from("roamen-journal.csv"));
        assert_eq!(cli.restart_at_ms, None);
    }

    #[test]
    fn test_cli_headless_overrides() {
        let cli = Cli::parse_from([
            "roamen-demo",
            "--headless",
            "--duration-ms",
            "12000",
            "-o",
            "out.csv",
            "--restart-at-ms",
            "6000",
        ]);
        assert!(cli.headless);
        assert_eq!(cli.duration_ms, Some(12000));
        assert_eq!(cli.output, PathBuf::from("out.csv"));
        assert_eq!(cli.restart_at_ms, Some(6000));
    }

    #[test]
    fn test_stop_cancels_frame_driven_timers() {
        let mut state = AppState::new(DemoSettings {
            autostart: false,
            ..DemoSettings::default()
        })
        .unwrap();
        let origin = Instant::now();
        state.start_demo(origin);
        state.update(origin + Duration::from_millis(3500));
        assert_eq!(state.player.sink().messages().len(), 1);

        state.stop_demo();
        assert!(!state.player.is_running());
        assert_eq!(state.player.pending_count(), 0);
    }

    #[test]
    fn test_autostart_fires_after_delay() {
        let mut state = AppState::new(DemoSettings::default()).unwrap();
        let at = state.autostart_at.unwrap();
        state.update(at - Duration::from_millis(1));
        assert!(!state.player.is_running());

        state.update(at);
        assert!(state.player.is_running());
        assert_eq!(state.player.epoch(), 1);
        assert!(state.autostart_at.is_none());
    }

    #[test]
    fn test_console_actions_reach_the_sink() {
        let mut state = AppState::new(DemoSettings {
            autostart: false,
            ..DemoSettings::default()
        })
        .unwrap();
        state.apply_console_action(ConsoleAction::SendMessage("On my way".to_string()));
        state.apply_console_action(ConsoleAction::RaiseAlert(Severity::Emergency, "Fire".to_string()));
        let console = state.player.sink();
        assert_eq!(console.messages().len(), 1);
        assert_eq!(console.badge_count(), 1);
        assert!(console.modal().is_some());

        state.apply_console_action(ConsoleAction::CloseModal);
        assert!(state.player.sink().modal().is_none());
        assert!(!state.player.is_running());
    }

    #[test]
    fn test_manual_restart_is_delayed() {
        let mut state = AppState::new(DemoSettings {
            autostart: false,
            ..DemoSettings::default()
        })
        .unwrap();
        let origin = Instant::now();
        state.start_demo(origin);
        state.update(origin + Duration::from_millis(3500));

        let restart_at = Instant::now();
        state.restart_demo(restart_at);
        assert_eq!(state.player.sink().messages().len(), 0);
        assert_eq!(state.player.epoch(), 2);
        // Intro is due at +1000ms after the 500ms restart delay
        assert_eq!(state.player.next_deadline(), Some(restart_at + Duration::from_millis(1500)));
    }
}
