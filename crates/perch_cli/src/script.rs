//! Scripted combobox sessions
//!
//! A script describes one combobox mounted on the headless host and a list of
//! user or platform actions to replay against it:
//!
//! ```toml
//! [input]
//! x = 40.0
//! y = 700.0
//!
//! [combobox]
//! label = "Select Country"
//! options = [
//!     { value = "us", label = "United States" },
//!     { value = "uk", label = "United Kingdom" },
//! ]
//!
//! [[step]]
//! action = "focus_in"
//!
//! [[step]]
//! action = "type"
//! text = "king"
//!
//! [[step]]
//! action = "select"
//! value = "uk"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use perch_cn::{combobox, ChangeEvent, ComboboxController, ComboboxElements, ComboboxOption, ComboboxView};
use perch_core::headless::HeadlessHost;
use perch_core::{AnchorRect, ElementId, HostEvent, HostGeometry, PerchConfig, Point, SharedHost, Viewport};
use perch_layout::overlay_manager;

/// Height the simulated host gives each menu row
const ROW_HEIGHT: f32 = 36.0;

/// A replayable session
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    pub viewport: ViewportSpec,
    pub input: RectSpec,
    pub combobox: ComboboxSpec,
    #[serde(rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewportSpec {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

/// Input field box in viewport coordinates
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RectSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for RectSpec {
    fn default() -> Self {
        Self {
            x: 40.0,
            y: 40.0,
            width: 300.0,
            height: 40.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ComboboxSpec {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub disabled: bool,
    pub required: bool,
    pub error: bool,
    pub helper_text: Option<String>,
    pub options: Vec<ComboboxOption>,
}

/// One replayed action
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    FocusIn,
    FocusOut,
    Type { text: String },
    Select { value: String },
    SelectIndex { index: usize },
    Clear,
    Toggle,
    /// Pointer-down on nothing in particular
    PressOutside,
    /// Pointer-down on the open menu
    PressMenu,
    /// Advance the virtual clock
    Wait { ms: u64 },
    Scroll {
        #[serde(default)]
        dx: f32,
        #[serde(default)]
        dy: f32,
    },
    Resize { width: f32, height: f32 },
    /// Deliver pending animation frames
    Frame,
}

/// Outcome of one step
#[derive(Debug, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub action: Step,
    /// Change events emitted during the step
    pub changes: Vec<ChangeEvent>,
    pub view: ComboboxView,
}

impl Script {
    /// Parse a script document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse script")
    }

    /// Load a script file
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("Invalid script {}", path.display()))
    }
}

/// Headless world the script runs in
struct Session {
    host: Arc<Mutex<HeadlessHost>>,
    controller: ComboboxController,
    menu: ElementId,
    changes: Arc<Mutex<Vec<ChangeEvent>>>,
    menu_height: f32,
}

impl Session {
    fn mount(script: &Script, config: &PerchConfig) -> Self {
        let viewport = Viewport::new(script.viewport.width, script.viewport.height);
        let host = Arc::new(Mutex::new(HeadlessHost::new(viewport)));

        let (elements, menu) = {
            let mut h = lock(&host);
            let RectSpec {
                x,
                y,
                width,
                height,
            } = script.input;
            // Room above the input for the floating label
            let container =
                h.insert_element(AnchorRect::from_xywh(x, y - 20.0, width, height + 20.0), None);
            let input = h.insert_element(AnchorRect::from_xywh(x, y, width, height), Some(container));
            let menu = h.insert_unmeasured(None);
            (ComboboxElements { container, input }, menu)
        };

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let spec = &script.combobox;
        let mut builder = combobox()
            .options(spec.options.clone())
            .disabled(spec.disabled)
            .required(spec.required)
            .error(spec.error)
            .on_change(move |event| {
                sink.lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(event.clone())
            });
        if let Some(label) = &spec.label {
            builder = builder.label(label.clone());
        }
        if let Some(placeholder) = &spec.placeholder {
            builder = builder.placeholder(placeholder.clone());
        }
        if let Some(value) = &spec.value {
            builder = builder.value(value.clone());
        }
        if let Some(text) = &spec.helper_text {
            builder = builder.helper_text(text.clone());
        }

        let shared: SharedHost = host.clone();
        let controller = builder.build(&shared, &overlay_manager(), elements, config);

        Self {
            host,
            controller,
            menu,
            changes,
            menu_height: 0.0,
        }
    }

    fn apply(&mut self, step: &Step) {
        match step {
            Step::FocusIn => self.controller.focus_in(),
            Step::FocusOut => self.controller.focus_out(),
            Step::Type { text } => self.controller.query_change(text.clone()),
            Step::Select { value } => {
                self.controller.select_value(value);
            }
            Step::SelectIndex { index } => {
                self.controller.select_at(*index);
            }
            Step::Clear => self.controller.clear_query(),
            Step::Toggle => self.controller.toggle(),
            Step::PressOutside => self.dispatch(vec![HostEvent::PointerDown {
                position: Point::default(),
                target: None,
            }]),
            Step::PressMenu => {
                let event = lock(&self.host).pointer_down_on(self.menu);
                self.dispatch(vec![event]);
            }
            Step::Wait { ms } => {
                let events = lock(&self.host).advance(*ms);
                self.dispatch(events);
            }
            Step::Scroll { dx, dy } => {
                let event = lock(&self.host).scroll_window(*dx, *dy);
                self.dispatch(vec![event]);
            }
            Step::Resize { width, height } => {
                let event = lock(&self.host).resize(*width, *height);
                self.dispatch(vec![event]);
            }
            Step::Frame => {
                let events = lock(&self.host).flush_frames();
                self.dispatch(events);
            }
        }
        self.measure_menu();
    }

    fn dispatch(&mut self, events: Vec<HostEvent>) {
        for event in events {
            if lock(&self.host).is_observed(&event) {
                self.controller.handle_host_event(&event);
            }
        }
    }

    /// Lay out the open menu the way a renderer would
    fn measure_menu(&mut self) {
        if !self.controller.is_open() {
            self.menu_height = 0.0;
            return;
        }

        let rows = self.controller.filtered_options().len() as f32 * ROW_HEIGHT;
        if rows != self.menu_height {
            self.menu_height = rows;
            self.controller.set_menu_content(Some(self.menu), rows);
        }

        if let Some(placement) = self.controller.menu_placement() {
            let mut host = lock(&self.host);
            let viewport = host.viewport();
            let width = host
                .measure(self.controller.elements().input)
                .map(|rect| rect.width)
                .unwrap_or(0.0);
            let height = placement.max_height.map_or(rows, |cap| rows.min(cap));
            host.set_rect(
                self.menu,
                AnchorRect::from_xywh(
                    placement.left - viewport.scroll_x,
                    placement.top - viewport.scroll_y,
                    width,
                    height,
                ),
            );
        }
    }

    fn take_changes(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.changes.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

fn lock(host: &Arc<Mutex<HeadlessHost>>) -> std::sync::MutexGuard<'_, HeadlessHost> {
    host.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replay every step, recording the view after each one
pub fn run(script: &Script, config: &PerchConfig) -> Vec<StepRecord> {
    let mut session = Session::mount(script, config);

    script
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            tracing::debug!("step {}: {:?}", index + 1, step);
            session.apply(step);
            StepRecord {
                step: index + 1,
                action: step.clone(),
                changes: session.take_changes(),
                view: session.controller.view(),
            }
        })
        .collect()
}
