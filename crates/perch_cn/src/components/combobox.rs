//! Combobox component - searchable single-select dropdown
//!
//! The controller owns the interaction state machine of an editable field
//! with a filtered option menu:
//!
//! - focusing the field opens the menu; typing filters it
//! - picking an enabled option commits its value and closes the menu
//! - losing focus closes the menu after a short, cancellable delay so a click
//!   on an option can land first
//! - a pointer-down anywhere outside the widget and its menu closes at once
//!
//! The menu is a flexible-height overlay layer, as wide as the input and
//! kept in place by a [`RepositionScheduler`] while open.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use perch_cn::prelude::*;
//! use perch_core::headless::HeadlessHost;
//! use perch_core::{AnchorRect, PerchConfig, SharedHost, Viewport};
//! use perch_layout::overlay_manager;
//!
//! let host = Arc::new(Mutex::new(HeadlessHost::new(Viewport::new(1024.0, 768.0))));
//! let elements = {
//!     let mut h = host.lock().unwrap();
//!     let container = h.insert_element(AnchorRect::from_xywh(40.0, 40.0, 300.0, 60.0), None);
//!     let input = h.insert_element(AnchorRect::from_xywh(40.0, 60.0, 300.0, 40.0), Some(container));
//!     ComboboxElements { container, input }
//! };
//! let shared: SharedHost = host.clone();
//!
//! let mut country = cn::combobox()
//!     .label("Select Country")
//!     .placeholder("Search countries...")
//!     .option("us", "United States")
//!     .option("uk", "United Kingdom")
//!     .on_change(|event| println!("Selected: {}", event.value))
//!     .build(&shared, &overlay_manager(), elements, &PerchConfig::default());
//!
//! country.focus_in();
//! country.query_change("kingdom");
//! assert!(country.select_value("uk"));
//! assert_eq!(country.display_text(), "United Kingdom");
//! ```

use std::sync::Arc;

use perch_core::{
    lock_host, ComboboxSettings, ElementId, HostEvent, ListenerKind, ListenerOptions,
    ListenerScope, PerchConfig, SharedHost, Size, StateTransitions, TimerSlot, Viewport,
};
use perch_layout::placement::{PlacementRequest, PlacementResult};
use perch_layout::reposition::{RepositionOutcome, RepositionScheduler};
use perch_layout::widgets::overlay::{
    OverlayHandle, OverlayKind, OverlayManager, OverlayManagerExt,
};
use serde::{Deserialize, Serialize};

/// Value carried by the synthetic "nothing to pick" menu entry
pub const NO_OPTION_VALUE: &str = "no-option";

// =============================================================================
// Options and filtering
// =============================================================================

/// An option in the combobox menu
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboboxOption {
    /// The value committed when this option is picked
    pub value: String,
    /// Text shown in the menu and used for filtering
    #[serde(default)]
    pub label: Option<String>,
    /// Disabled options are listed but cannot be picked
    #[serde(default)]
    pub disabled: bool,
}

impl ComboboxOption {
    /// Create an option with value and label
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: Some(label.into()),
            disabled: false,
        }
    }

    /// Create an option without a label
    pub fn unlabeled(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            disabled: false,
        }
    }

    /// Mark this option as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    fn sentinel(text: &str) -> Self {
        Self {
            value: NO_OPTION_VALUE.to_string(),
            label: Some(text.to_string()),
            disabled: true,
        }
    }

    /// Label text, empty when absent
    pub fn label_text(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }

    /// Case-insensitive label substring match
    ///
    /// An option without a label only matches the empty query.
    pub fn matches(&self, query: &str) -> bool {
        self.matches_lowercase(&query.to_lowercase())
    }

    fn matches_lowercase(&self, query_lower: &str) -> bool {
        if query_lower.is_empty() {
            return true;
        }
        self.label
            .as_ref()
            .is_some_and(|label| label.to_lowercase().contains(query_lower))
    }
}

/// Options matching `query`, in list order
///
/// Never empty: when nothing matches, the result is a single disabled entry
/// reading `no_option_found` (non-empty query) or `no_option_provided`.
pub fn filtered_options(
    options: &[ComboboxOption],
    query: &str,
    settings: &ComboboxSettings,
) -> Vec<ComboboxOption> {
    let query_lower = query.to_lowercase();
    let filtered: Vec<ComboboxOption> = options
        .iter()
        .filter(|option| option.matches_lowercase(&query_lower))
        .cloned()
        .collect();

    if !filtered.is_empty() {
        return filtered;
    }

    let text = if query.is_empty() {
        &settings.no_option_provided
    } else {
        &settings.no_option_found
    };
    vec![ComboboxOption::sentinel(text)]
}

// =============================================================================
// State machine
// =============================================================================

/// Event codes for the combobox state machine
pub mod combobox_events {
    /// Input gained focus (Closed -> Open)
    pub const FOCUS_IN: u32 = 40001;
    /// Enabled option picked (Open -> Closed)
    pub const SELECT: u32 = 40002;
    /// Delayed close after focus loss elapsed (Open -> Closed)
    pub const DELAY_ELAPSED: u32 = 40003;
    /// Pointer pressed outside the widget (Open -> Closed)
    pub const OUTSIDE_PRESS: u32 = 40004;
    /// Toggle icon clicked (Closed <-> Open)
    pub const TOGGLE: u32 = 40005;
    /// Closed by the consumer, e.g. by disabling the widget (Open -> Closed)
    pub const DISMISS: u32 = 40006;
}

/// Whether the menu is shown
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComboboxPhase {
    #[default]
    Closed,
    Open,
}

impl StateTransitions for ComboboxPhase {
    fn on_event(&self, event: u32) -> Option<Self> {
        use combobox_events::*;
        use ComboboxPhase::*;

        match (self, event) {
            (Closed, FOCUS_IN) | (Closed, TOGGLE) => Some(Open),
            (Open, SELECT)
            | (Open, DELAY_ELAPSED)
            | (Open, OUTSIDE_PRESS)
            | (Open, TOGGLE)
            | (Open, DISMISS) => Some(Closed),
            _ => None,
        }
    }
}

/// Mutable combobox state
///
/// The filtered option list is derived on demand and never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ComboboxState {
    pub phase: ComboboxPhase,
    /// Search text; only meaningful while open
    pub query: String,
    /// Last committed value
    pub committed: Option<String>,
}

impl ComboboxState {
    /// Whether the menu is open
    pub fn is_open(&self) -> bool {
        self.phase == ComboboxPhase::Open
    }

    /// Text the input shows
    ///
    /// While open this is the query. While closed it is the label of the
    /// committed option, the raw committed value if no option has it, or "".
    pub fn display_text(&self, options: &[ComboboxOption]) -> String {
        if self.is_open() {
            return self.query.clone();
        }
        let Some(committed) = self.committed.as_deref() else {
            return String::new();
        };
        options
            .iter()
            .find(|option| option.value == committed)
            .and_then(|option| option.label.as_deref())
            .filter(|label| !label.is_empty())
            .unwrap_or(committed)
            .to_string()
    }
}

// =============================================================================
// Props and callbacks
// =============================================================================

/// Payload of a committed selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub value: String,
    pub option: ComboboxOption,
}

/// Selection callback
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;
/// Focus and blur callback
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;

/// Host elements the combobox is rendered into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComboboxElements {
    /// Outer wrapper; presses inside it are never "outside"
    pub container: ElementId,
    /// Text input; the menu is anchored to it
    pub input: ElementId,
}

/// Consumer-facing configuration
#[derive(Clone, Default)]
pub struct ComboboxProps {
    pub label: Option<String>,
    /// Initially committed value
    pub value: Option<String>,
    pub options: Vec<ComboboxOption>,
    pub placeholder: Option<String>,
    pub disabled: bool,
    pub required: bool,
    pub error: bool,
    pub helper_text: Option<String>,
    pub class_name: Option<String>,
    pub on_change: Option<ChangeCallback>,
    pub on_focus: Option<NotifyCallback>,
    pub on_blur: Option<NotifyCallback>,
}

impl std::fmt::Debug for ComboboxProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboboxProps")
            .field("label", &self.label)
            .field("value", &self.value)
            .field("options", &self.options.len())
            .field("disabled", &self.disabled)
            .field("required", &self.required)
            .field("error", &self.error)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

/// Builder for [`ComboboxController`] with fluent API
#[derive(Clone, Debug, Default)]
pub struct ComboboxBuilder {
    props: ComboboxProps,
}

impl ComboboxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option with value and label
    pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.props.options.push(ComboboxOption::new(value, label));
        self
    }

    /// Add a disabled option
    pub fn option_disabled(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.props
            .options
            .push(ComboboxOption::new(value, label).disabled());
        self
    }

    /// Add multiple options
    pub fn options(mut self, options: impl IntoIterator<Item = ComboboxOption>) -> Self {
        self.props.options.extend(options);
        self
    }

    /// Initially committed value
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.props.value = Some(value.into());
        self
    }

    /// Floating label text
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.props.label = Some(label.into());
        self
    }

    /// Placeholder shown while the menu is open and the query is empty
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.props.placeholder = Some(placeholder.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.props.disabled = disabled;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.props.required = required;
        self
    }

    pub fn error(mut self, error: bool) -> Self {
        self.props.error = error;
        self
    }

    /// Text shown under the field when `error` is set
    pub fn helper_text(mut self, text: impl Into<String>) -> Self {
        self.props.helper_text = Some(text.into());
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.props.class_name = Some(class_name.into());
        self
    }

    /// Set the change callback
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.props.on_change = Some(Arc::new(callback));
        self
    }

    /// Called on every accepted focus-in
    pub fn on_focus<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.props.on_focus = Some(Arc::new(callback));
        self
    }

    /// Called as soon as focus leaves the open field
    pub fn on_blur<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.props.on_blur = Some(Arc::new(callback));
        self
    }

    /// Mount the combobox on host elements
    pub fn build(
        self,
        host: &SharedHost,
        overlays: &OverlayManager,
        elements: ComboboxElements,
        config: &PerchConfig,
    ) -> ComboboxController {
        ComboboxController::new(host, overlays, elements, self.props, config)
    }
}

/// Create a combobox builder
///
/// ```rust
/// use perch_cn::prelude::*;
///
/// let builder = cn::combobox()
///     .label("Country")
///     .option("us", "United States")
///     .option_disabled("uk", "United Kingdom");
/// ```
pub fn combobox() -> ComboboxBuilder {
    ComboboxBuilder::new()
}

// =============================================================================
// View snapshot
// =============================================================================

/// Control shown at the trailing edge of the field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingControl {
    /// Clears the query (open with a non-empty query)
    Clear,
    /// Opens or closes the menu; `expanded` selects the up arrow
    Toggle { expanded: bool },
}

/// One rendered menu row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MenuItemView {
    pub label: String,
    pub value: String,
    pub selected: bool,
    pub disabled: bool,
}

/// The open menu
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MenuView {
    pub placement: Option<PlacementResult>,
    /// False while hidden during a reposition
    pub visible: bool,
    pub width: f32,
    pub items: Vec<MenuItemView>,
}

/// Everything a renderer needs for one frame
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComboboxView {
    pub label: Option<String>,
    pub required: bool,
    /// Label floats above the field
    pub label_active: bool,
    pub input_text: String,
    pub placeholder: Option<String>,
    pub focused: bool,
    pub disabled: bool,
    pub error: bool,
    pub helper_text: Option<String>,
    pub trailing: TrailingControl,
    pub class_name: Option<String>,
    pub menu: Option<MenuView>,
}

// =============================================================================
// ComboboxController
// =============================================================================

/// Interaction controller for one combobox instance
pub struct ComboboxController {
    host: SharedHost,
    overlays: OverlayManager,
    elements: ComboboxElements,
    props: ComboboxProps,
    settings: ComboboxSettings,
    state: ComboboxState,
    close_timer: TimerSlot,
    scheduler: RepositionScheduler,
    menu_layer: Option<OverlayHandle>,
    /// Element the host rendered the menu into, once mounted
    menu_element: Option<ElementId>,
    /// Measured height of the menu content, 0 until measured
    menu_content_height: f32,
    outside: Option<ListenerScope>,
}

impl ComboboxController {
    /// Mount a closed combobox
    pub fn new(
        host: &SharedHost,
        overlays: &OverlayManager,
        elements: ComboboxElements,
        props: ComboboxProps,
        config: &PerchConfig,
    ) -> Self {
        let request = PlacementRequest::menu(None, Size::default(), Viewport::default())
            .with_config(config);
        let scheduler = RepositionScheduler::new(host, elements.input, request)
            .with_fade(config.reposition.fade);

        let state = ComboboxState {
            committed: props.value.clone(),
            ..ComboboxState::default()
        };

        Self {
            host: host.clone(),
            overlays: overlays.clone(),
            elements,
            props,
            settings: config.combobox.clone(),
            state,
            close_timer: TimerSlot::new(),
            scheduler,
            menu_layer: None,
            menu_element: None,
            menu_content_height: 0.0,
            outside: None,
        }
    }

    // =========================================================================
    // Interaction events
    // =========================================================================

    /// The input gained focus
    pub fn focus_in(&mut self) {
        if self.props.disabled {
            tracing::trace!("Combobox::focus_in - disabled, ignored");
            return;
        }

        self.cancel_close_timer();
        if self.state.phase.transition(combobox_events::FOCUS_IN) {
            self.mount_menu();
            tracing::debug!("Combobox - opened");
        }
        notify(&self.props.on_focus);
    }

    /// The input lost focus: close after the configured delay
    pub fn focus_out(&mut self) {
        if !self.is_open() {
            return;
        }

        let id = {
            let mut host = lock_host(&self.host);
            self.close_timer
                .arm(&mut *host, self.settings.close_delay_ms)
        };
        tracing::debug!(
            "Combobox::focus_out - close in {}ms ({:?})",
            self.settings.close_delay_ms,
            id
        );
        notify(&self.props.on_blur);
    }

    /// The user edited the search text
    pub fn query_change(&mut self, text: impl Into<String>) {
        if !self.is_open() {
            return;
        }
        self.state.query = text.into();
    }

    /// The user picked an option
    ///
    /// Returns whether the selection was accepted. Disabled options (including
    /// the "nothing to pick" entry) are ignored, as is any pick while closed.
    pub fn select_option(&mut self, option: &ComboboxOption) -> bool {
        if option.disabled {
            tracing::trace!("Combobox::select_option - {:?} is disabled", option.value);
            return false;
        }
        if !self.state.phase.transition(combobox_events::SELECT) {
            return false;
        }

        self.state.committed = Some(option.value.clone());
        self.unmount_menu();
        tracing::debug!("Combobox - committed {:?}", option.value);

        let event = ChangeEvent {
            value: option.value.clone(),
            option: option.clone(),
        };
        match &self.props.on_change {
            Some(callback) => callback(&event),
            None => tracing::trace!("Combobox - no on_change registered"),
        }
        true
    }

    /// Pick the filtered menu entry at `index`
    pub fn select_at(&mut self, index: usize) -> bool {
        match self.filtered_options().get(index).cloned() {
            Some(option) => self.select_option(&option),
            None => false,
        }
    }

    /// Pick the filtered menu entry with `value`
    pub fn select_value(&mut self, value: &str) -> bool {
        let option = self
            .filtered_options()
            .into_iter()
            .find(|option| option.value == value);
        match option {
            Some(option) => self.select_option(&option),
            None => false,
        }
    }

    /// The clear button was clicked
    pub fn clear_query(&mut self) {
        if !self.is_open() {
            return;
        }
        self.cancel_close_timer();
        self.state.query.clear();
        lock_host(&self.host).focus(self.elements.input);
    }

    /// The toggle icon was clicked
    pub fn toggle(&mut self) {
        if self.props.disabled {
            return;
        }
        if self.is_open() {
            self.close_with(combobox_events::TOGGLE);
        } else {
            self.focus_in();
            lock_host(&self.host).focus(self.elements.input);
        }
    }

    /// Route a host event; returns true if the combobox reacted to it
    pub fn handle_host_event(&mut self, event: &HostEvent) -> bool {
        match event {
            HostEvent::TimerFired(id) => {
                if !self.close_timer.take_fired(*id) {
                    return false;
                }
                tracing::debug!("Combobox - delayed close elapsed");
                self.close_with(combobox_events::DELAY_ELAPSED)
            }
            HostEvent::PointerDown { target, .. } => {
                let observed = self
                    .outside
                    .as_ref()
                    .is_some_and(|scope| scope.observes(event));
                if !observed {
                    return false;
                }
                if self.is_inside(*target) {
                    // A press on an option must beat the pending blur close.
                    let cancelled = self.cancel_close_timer();
                    if cancelled {
                        // Focus goes back to the input so the next blur re-arms the close
                        // when the press ends without a selection.
                        lock_host(&self.host).focus(self.elements.input);
                        tracing::debug!("Combobox - press inside, pending close cancelled");
                    }
                    return cancelled;
                }
                tracing::debug!("Combobox - outside press");
                self.close_with(combobox_events::OUTSIDE_PRESS)
            }
            _ => self.reposition(event),
        }
    }

    // =========================================================================
    // Consumer updates
    // =========================================================================

    /// Overwrite the committed value
    pub fn set_value(&mut self, value: Option<String>) {
        self.state.committed = value;
    }

    /// Replace the option list
    pub fn set_options(&mut self, options: Vec<ComboboxOption>) {
        self.props.options = options;
    }

    /// Enable or disable the widget; disabling closes an open menu
    pub fn set_disabled(&mut self, disabled: bool) {
        self.props.disabled = disabled;
        if disabled {
            self.close_with(combobox_events::DISMISS);
        }
    }

    /// Toggle the error presentation
    pub fn set_error(&mut self, error: bool) {
        self.props.error = error;
    }

    /// Record the rendered menu element and its measured content height
    pub fn set_menu_content(&mut self, element: Option<ElementId>, content_height: f32) {
        self.menu_element = element;
        self.menu_content_height = content_height;
        let width = self.scheduler.overlay_size().width;
        if let Some(result) = self
            .scheduler
            .set_overlay_size(Size::new(width, content_height))
        {
            self.publish(result);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> &ComboboxState {
        &self.state
    }

    pub fn phase(&self) -> ComboboxPhase {
        self.state.phase
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn query(&self) -> &str {
        &self.state.query
    }

    pub fn committed_value(&self) -> Option<&str> {
        self.state.committed.as_deref()
    }

    /// Whether a delayed close is pending
    pub fn has_pending_close(&self) -> bool {
        self.close_timer.is_pending()
    }

    /// Current menu entries
    pub fn filtered_options(&self) -> Vec<ComboboxOption> {
        filtered_options(&self.props.options, &self.state.query, &self.settings)
    }

    /// Text the input shows
    pub fn display_text(&self) -> String {
        self.state.display_text(&self.props.options)
    }

    /// Menu position while open
    pub fn menu_placement(&self) -> Option<PlacementResult> {
        self.scheduler.result()
    }

    /// Menu overlay layer while open
    pub fn menu_layer(&self) -> Option<OverlayHandle> {
        self.menu_layer
    }

    pub fn props(&self) -> &ComboboxProps {
        &self.props
    }

    pub fn elements(&self) -> ComboboxElements {
        self.elements
    }

    /// Render snapshot
    pub fn view(&self) -> ComboboxView {
        let open = self.is_open();
        let input_text = self.display_text();
        let committed = self.state.committed.as_deref();

        let trailing = if open && !self.state.query.is_empty() {
            TrailingControl::Clear
        } else {
            TrailingControl::Toggle { expanded: open }
        };

        let menu = open.then(|| MenuView {
            placement: self.scheduler.result(),
            visible: self.scheduler.is_visible(),
            width: self.scheduler.overlay_size().width,
            items: self
                .filtered_options()
                .into_iter()
                .map(|option| MenuItemView {
                    label: option.label_text().to_string(),
                    selected: committed == Some(option.value.as_str()),
                    disabled: option.disabled,
                    value: option.value,
                })
                .collect(),
        });

        ComboboxView {
            label: self.props.label.clone(),
            required: self.props.required,
            label_active: open || !input_text.is_empty(),
            placeholder: self.props.placeholder.clone().filter(|_| open),
            input_text,
            focused: open,
            disabled: self.props.disabled,
            error: self.props.error,
            helper_text: self.props.helper_text.clone().filter(|_| self.props.error),
            trailing,
            class_name: self.props.class_name.clone(),
            menu,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn cancel_close_timer(&mut self) -> bool {
        let mut host = lock_host(&self.host);
        self.close_timer.cancel(&mut *host)
    }

    /// Close via `event` if it is a legal transition
    fn close_with(&mut self, event: u32) -> bool {
        if !self.state.phase.transition(event) {
            return false;
        }
        self.unmount_menu();
        tracing::debug!("Combobox - closed");
        true
    }

    fn is_inside(&self, target: Option<ElementId>) -> bool {
        let Some(target) = target else {
            return false;
        };
        let host = lock_host(&self.host);
        host.contains(self.elements.container, target)
            || self
                .menu_element
                .is_some_and(|menu| host.contains(menu, target))
    }

    fn anchor_width(&self) -> f32 {
        lock_host(&self.host)
            .measure(self.elements.input)
            .map(|rect| rect.width)
            .unwrap_or(0.0)
    }

    fn mount_menu(&mut self) {
        let size = Size::new(self.anchor_width(), self.menu_content_height);
        self.scheduler.set_overlay_size(size);

        let layer = self.overlays.add(OverlayKind::Menu, self.elements.input);
        self.menu_layer = Some(layer);

        let result = self.scheduler.open();
        self.publish(result);

        self.outside = Some(ListenerScope::acquire(
            &self.host,
            &[(ListenerKind::PointerDown, ListenerOptions::bubble())],
        ));
    }

    fn unmount_menu(&mut self) {
        self.state.query.clear();
        self.cancel_close_timer();
        self.outside = None;
        self.scheduler.close();
        if let Some(layer) = self.menu_layer.take() {
            self.overlays.remove(layer);
        }
    }

    /// Push a placement to the menu layer
    fn publish(&self, result: PlacementResult) {
        let Some(layer) = self.menu_layer else {
            return;
        };
        let content = self.menu_content_height;
        let height = match result.max_height {
            Some(cap) if content > 0.0 => content.min(cap),
            Some(cap) => cap,
            None => content,
        };
        self.overlays
            .set_size(layer, Size::new(self.scheduler.overlay_size().width, height));
        self.overlays.set_placement(layer, result);
        self.overlays.set_visible(layer, self.scheduler.is_visible());
    }

    fn reposition(&mut self, event: &HostEvent) -> bool {
        match self.scheduler.handle_event(event) {
            RepositionOutcome::Ignored => false,
            RepositionOutcome::Hidden => {
                if let Some(layer) = self.menu_layer {
                    self.overlays.set_visible(layer, false);
                }
                true
            }
            RepositionOutcome::Moved(result) => {
                // The menu follows the input's width as well as its position.
                let width = self.anchor_width();
                let result = if width != self.scheduler.overlay_size().width {
                    self.scheduler
                        .set_overlay_size(Size::new(width, self.menu_content_height))
                        .unwrap_or(result)
                } else {
                    result
                };
                self.publish(result);
                true
            }
        }
    }
}

fn notify(callback: &Option<NotifyCallback>) {
    if let Some(callback) = callback {
        callback();
    }
}

impl Drop for ComboboxController {
    fn drop(&mut self) {
        self.cancel_close_timer();
        if let Some(layer) = self.menu_layer.take() {
            self.overlays.remove(layer);
        }
    }
}

impl std::fmt::Debug for ComboboxController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboboxController")
            .field("elements", &self.elements)
            .field("state", &self.state)
            .field("close_timer", &self.close_timer)
            .field("menu_layer", &self.menu_layer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::headless::HeadlessHost;
    use perch_core::AnchorRect;
    use perch_layout::placement::Side;
    use perch_layout::widgets::overlay::overlay_manager;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn countries() -> Vec<ComboboxOption> {
        vec![
            ComboboxOption::new("us", "United States"),
            ComboboxOption::new("ca", "Canada"),
            ComboboxOption::new("uk", "United Kingdom"),
            ComboboxOption::new("au", "Australia"),
        ]
    }

    struct Fixture {
        host: Arc<Mutex<HeadlessHost>>,
        shared: SharedHost,
        overlays: OverlayManager,
        elements: ComboboxElements,
        menu: ElementId,
        elsewhere: ElementId,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(Mutex::new(HeadlessHost::new(Viewport::new(1024.0, 768.0))));
        let (elements, menu, elsewhere) = {
            let mut h = host.lock().unwrap();
            let container =
                h.insert_element(AnchorRect::from_xywh(100.0, 100.0, 300.0, 60.0), None);
            let input = h.insert_element(
                AnchorRect::from_xywh(100.0, 120.0, 300.0, 40.0),
                Some(container),
            );
            let menu = h.insert_element(AnchorRect::from_xywh(100.0, 160.0, 300.0, 200.0), None);
            let elsewhere =
                h.insert_element(AnchorRect::from_xywh(700.0, 600.0, 50.0, 50.0), None);
            (ComboboxElements { container, input }, menu, elsewhere)
        };
        let shared: SharedHost = host.clone();
        Fixture {
            host,
            shared,
            overlays: overlay_manager(),
            elements,
            menu,
            elsewhere,
        }
    }

    fn build(f: &Fixture, builder: ComboboxBuilder) -> ComboboxController {
        builder.build(&f.shared, &f.overlays, f.elements, &PerchConfig::default())
    }

    fn dispatch(controller: &mut ComboboxController, events: Vec<HostEvent>) {
        for event in events {
            controller.handle_host_event(&event);
        }
    }

    #[test]
    fn test_option_matches() {
        let opt = ComboboxOption::new("us", "United States");

        assert!(opt.matches(""));
        assert!(opt.matches("united"));
        assert!(opt.matches("STATES"));

        // Only the label is searched
        assert!(!opt.matches("us"));
        assert!(!opt.matches("canada"));

        let bare = ComboboxOption::unlabeled("x");
        assert!(bare.matches(""));
        assert!(!bare.matches("x"));
    }

    #[test]
    fn test_sentinels() {
        let settings = ComboboxSettings::default();

        let none = filtered_options(&[], "", &settings);
        assert_eq!(none.len(), 1);
        assert_eq!(none[0].label_text(), "No option provided");
        assert!(none[0].disabled);

        let missing = filtered_options(&[ComboboxOption::new("ca", "Canada")], "xyz", &settings);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].label_text(), "No option found");
        assert_eq!(missing[0].value, NO_OPTION_VALUE);
        assert!(missing[0].disabled);
    }

    #[test]
    fn test_united_scenario() {
        let f = fixture();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let mut combo = build(
            &f,
            combobox()
                .options(countries())
                .on_change(move |event| sink.lock().unwrap().push(event.clone())),
        );

        combo.focus_in();
        assert!(combo.is_open());

        combo.query_change("uni");
        let labels: Vec<_> = combo
            .filtered_options()
            .iter()
            .map(|o| o.label_text().to_string())
            .collect();
        assert_eq!(labels, vec!["United States", "United Kingdom"]);

        combo.query_change("states");
        assert_eq!(
            combo.filtered_options(),
            vec![ComboboxOption::new("us", "United States")]
        );

        assert!(combo.select_at(0));
        assert_eq!(combo.phase(), ComboboxPhase::Closed);
        assert_eq!(combo.committed_value(), Some("us"));
        assert_eq!(combo.query(), "");
        assert_eq!(combo.display_text(), "United States");

        let changes = changes.lock().unwrap();
        assert_eq!(
            *changes,
            vec![ChangeEvent {
                value: "us".to_string(),
                option: ComboboxOption::new("us", "United States"),
            }]
        );
    }

    #[test]
    fn test_disabled_widget_never_opens() {
        let f = fixture();
        let focuses = Arc::new(AtomicUsize::new(0));
        let counter = focuses.clone();
        let mut combo = build(
            &f,
            combobox()
                .options(countries())
                .disabled(true)
                .on_focus(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        combo.focus_in();
        combo.toggle();
        assert!(!combo.is_open());
        assert_eq!(focuses.load(Ordering::SeqCst), 0);
        assert_eq!(f.host.lock().unwrap().active_listener_count(), 0);
    }

    #[test]
    fn test_only_focus_opens() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.query_change("can");
        combo.focus_out();
        combo.clear_query();
        assert!(!combo.select_value("ca"));
        let press = f.host.lock().unwrap().pointer_down_on(f.elsewhere);
        combo.handle_host_event(&press);

        assert_eq!(combo.phase(), ComboboxPhase::Closed);
        assert_eq!(combo.query(), "");
        assert_eq!(combo.committed_value(), None);
    }

    #[test]
    fn test_delayed_close_after_blur() {
        let f = fixture();
        let blurs = Arc::new(AtomicUsize::new(0));
        let counter = blurs.clone();
        let mut combo = build(
            &f,
            combobox().options(countries()).on_blur(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        combo.focus_in();
        combo.query_change("aus");
        combo.focus_out();
        assert_eq!(blurs.load(Ordering::SeqCst), 1);
        assert!(combo.has_pending_close());

        let early = f.host.lock().unwrap().advance(299);
        assert!(early.is_empty());
        assert!(combo.is_open());

        let due = f.host.lock().unwrap().advance(1);
        assert_eq!(due.len(), 1);
        dispatch(&mut combo, due);
        assert!(!combo.is_open());
        assert_eq!(combo.query(), "");
        assert!(!combo.has_pending_close());
    }

    #[test]
    fn test_refocus_cancels_delayed_close() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.focus_out();
        combo.focus_in();

        assert!(!combo.has_pending_close());
        assert_eq!(f.host.lock().unwrap().pending_timer_count(), 0);
        let events = f.host.lock().unwrap().advance(1000);
        assert!(events.is_empty());
        assert!(combo.is_open());
    }

    #[test]
    fn test_single_pending_timer() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.focus_out();
        combo.focus_out();
        combo.focus_out();
        assert_eq!(f.host.lock().unwrap().pending_timer_count(), 1);

        let events = f.host.lock().unwrap().advance(300);
        assert_eq!(events.len(), 1);
        dispatch(&mut combo, events);
        assert!(!combo.is_open());
    }

    #[test]
    fn test_outside_press_closes_immediately() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.query_change("can");
        combo.focus_out();
        assert!(combo.has_pending_close());

        let press = f.host.lock().unwrap().pointer_down_on(f.elsewhere);
        assert!(combo.handle_host_event(&press));
        assert!(!combo.is_open());
        assert_eq!(combo.query(), "");

        let host = f.host.lock().unwrap();
        assert_eq!(host.pending_timer_count(), 0);
        assert_eq!(host.active_listener_count(), 0);
    }

    #[test]
    fn test_press_on_menu_beats_blur_close() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.set_menu_content(Some(f.menu), 160.0);
        combo.query_change("can");

        // Clicking an option blurs the input first, then presses the menu
        combo.focus_out();
        let press = f.host.lock().unwrap().pointer_down_on(f.menu);
        assert!(combo.handle_host_event(&press));
        assert!(!combo.has_pending_close());

        let events = f.host.lock().unwrap().advance(500);
        assert!(events.is_empty());
        assert!(combo.select_value("ca"));
        assert_eq!(combo.committed_value(), Some("ca"));
    }

    #[test]
    fn test_press_on_sentinel_can_still_close_on_blur() {
        let f = fixture();
        let mut combo = build(&f, combobox().option("ca", "Canada"));

        combo.focus_in();
        combo.set_menu_content(Some(f.menu), 36.0);
        combo.query_change("xyz");
        combo.focus_out();

        let press = f.host.lock().unwrap().pointer_down_on(f.menu);
        assert!(combo.handle_host_event(&press));
        assert!(!combo.select_at(0));
        assert!(combo.is_open());
        assert_eq!(f.host.lock().unwrap().focused(), Some(f.elements.input));

        // Focus leaves the input again; the delayed close runs as usual
        combo.focus_out();
        assert!(combo.has_pending_close());
        let due = f.host.lock().unwrap().advance(300);
        dispatch(&mut combo, due);
        assert!(!combo.is_open());
        assert_eq!(f.host.lock().unwrap().active_listener_count(), 0);
    }

    #[test]
    fn test_press_inside_container_keeps_open() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        let press = f.host.lock().unwrap().pointer_down_on(f.elements.input);
        assert!(!combo.handle_host_event(&press));
        assert!(combo.is_open());
    }

    #[test]
    fn test_disabled_option_is_inert() {
        let f = fixture();
        let mut combo = build(
            &f,
            combobox()
                .option("us", "United States")
                .option_disabled("uk", "United Kingdom")
                .value("us"),
        );

        combo.focus_in();
        combo.query_change("king");
        assert!(!combo.select_value("uk"));

        assert!(combo.is_open());
        assert_eq!(combo.query(), "king");
        assert_eq!(combo.committed_value(), Some("us"));
    }

    #[test]
    fn test_sentinel_is_not_selectable() {
        let f = fixture();
        let mut combo = build(&f, combobox().option("ca", "Canada"));

        combo.focus_in();
        combo.query_change("xyz");
        assert!(!combo.select_at(0));
        assert!(combo.is_open());
        assert_eq!(combo.committed_value(), None);
    }

    #[test]
    fn test_missing_on_change_still_closes() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        assert!(combo.select_value("au"));
        assert!(!combo.is_open());
        assert_eq!(combo.display_text(), "Australia");
    }

    #[test]
    fn test_toggle() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.toggle();
        assert!(combo.is_open());
        assert_eq!(f.host.lock().unwrap().focused(), Some(f.elements.input));

        combo.focus_out();
        combo.toggle();
        assert!(!combo.is_open());
        assert!(!combo.has_pending_close());
    }

    #[test]
    fn test_clear_query_keeps_open() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.query_change("uni");
        combo.focus_out();
        combo.clear_query();

        assert!(combo.is_open());
        assert_eq!(combo.query(), "");
        assert!(!combo.has_pending_close());
        assert_eq!(f.host.lock().unwrap().focused(), Some(f.elements.input));
    }

    #[test]
    fn test_display_text_rules() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()).value("jp"));

        // Unknown value shows raw
        assert_eq!(combo.display_text(), "jp");

        combo.set_value(Some("ca".to_string()));
        assert_eq!(combo.display_text(), "Canada");

        combo.focus_in();
        combo.query_change("a");
        assert_eq!(combo.display_text(), "a");

        combo.set_value(None);
        combo.toggle();
        assert_eq!(combo.display_text(), "");
    }

    #[test]
    fn test_view_flags() {
        let f = fixture();
        let mut combo = build(
            &f,
            combobox()
                .label("Country")
                .placeholder("Search countries...")
                .options(countries())
                .value("ca")
                .helper_text("Please select a country"),
        );

        let closed = combo.view();
        assert_eq!(closed.placeholder, None);
        assert!(closed.label_active);
        assert_eq!(closed.input_text, "Canada");
        assert_eq!(closed.trailing, TrailingControl::Toggle { expanded: false });
        assert_eq!(closed.helper_text, None);
        assert!(closed.menu.is_none());

        combo.focus_in();
        let open = combo.view();
        assert_eq!(open.placeholder.as_deref(), Some("Search countries..."));
        assert_eq!(open.trailing, TrailingControl::Toggle { expanded: true });
        let menu = open.menu.unwrap();
        assert_eq!(menu.items.len(), 4);
        assert!(menu.items.iter().any(|item| item.value == "ca" && item.selected));
        assert_eq!(menu.items.iter().filter(|item| item.selected).count(), 1);

        combo.query_change("xyz");
        assert_eq!(combo.view().trailing, TrailingControl::Clear);

        combo.set_error(true);
        assert_eq!(
            combo.view().helper_text.as_deref(),
            Some("Please select a country")
        );
    }

    #[test]
    fn test_label_inactive_when_empty_and_closed() {
        let f = fixture();
        let combo = build(&f, combobox().label("Country").options(countries()));
        assert!(!combo.view().label_active);
    }

    #[test]
    fn test_menu_is_anchored_below_input() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        let placement = combo.menu_placement().unwrap();
        assert_eq!(placement.placement, Side::Bottom);
        assert_eq!(placement.top, 160.0);
        assert_eq!(placement.left, 100.0);
        assert_eq!(placement.max_height, Some(300.0));

        let layer = f.overlays.layer(combo.menu_layer().unwrap()).unwrap();
        assert_eq!(layer.size, Size::new(300.0, 300.0));
        assert_eq!(layer.kind, OverlayKind::Menu);
    }

    #[test]
    fn test_menu_flips_above_near_bottom() {
        let f = fixture();
        f.host
            .lock()
            .unwrap()
            .set_rect(f.elements.input, AnchorRect::from_xywh(100.0, 700.0, 300.0, 40.0));
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.set_menu_content(Some(f.menu), 120.0);

        let placement = combo.menu_placement().unwrap();
        assert_eq!(placement.placement, Side::Top);
        assert_eq!(placement.top, 580.0);
    }

    #[test]
    fn test_menu_follows_scroll() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));
        combo.focus_in();
        let layer = combo.menu_layer().unwrap();

        let scroll = f.host.lock().unwrap().scroll_window(0.0, 30.0);
        assert!(combo.handle_host_event(&scroll));
        assert!(!f.overlays.is_visible(layer));
        assert!(!combo.view().menu.unwrap().visible);

        let frames = f.host.lock().unwrap().flush_frames();
        dispatch(&mut combo, frames);
        assert!(f.overlays.is_visible(layer));
        // Page position is unchanged by a window scroll
        assert_eq!(combo.menu_placement().unwrap().top, 160.0);
    }

    #[test]
    fn test_menu_follows_input_width() {
        let f = fixture();
        let mut config = PerchConfig::default();
        config.reposition.fade = false;
        let mut combo =
            combobox()
                .options(countries())
                .build(&f.shared, &f.overlays, f.elements, &config);
        combo.focus_in();

        f.host
            .lock()
            .unwrap()
            .set_rect(f.elements.input, AnchorRect::from_xywh(100.0, 120.0, 200.0, 40.0));
        let resize = f.host.lock().unwrap().resize(900.0, 768.0);
        assert!(combo.handle_host_event(&resize));

        let layer = f.overlays.layer(combo.menu_layer().unwrap()).unwrap();
        assert_eq!(layer.size.width, 200.0);
    }

    #[test]
    fn test_listener_symmetry_across_exits() {
        let f = fixture();
        {
            let mut combo = build(&f, combobox().options(countries()));

            // select
            combo.focus_in();
            combo.select_value("us");
            // outside press
            combo.focus_in();
            let press = f.host.lock().unwrap().pointer_down_on(f.elsewhere);
            combo.handle_host_event(&press);
            // delayed close
            combo.focus_in();
            combo.focus_out();
            let due = f.host.lock().unwrap().advance(300);
            dispatch(&mut combo, due);
            // toggle
            combo.toggle();
            combo.toggle();
            // drop while open with a pending close
            combo.focus_in();
            combo.focus_out();
        }

        let host = f.host.lock().unwrap();
        assert_eq!(host.active_listener_count(), 0);
        assert_eq!(host.subscribe_count(), host.unsubscribe_count());
        assert_eq!(host.pending_timer_count(), 0);
        assert_eq!(host.pending_frame_count(), 0);
        assert_eq!(f.overlays.overlay_count(), 0);
    }

    #[test]
    fn test_disabling_closes() {
        let f = fixture();
        let mut combo = build(&f, combobox().options(countries()));

        combo.focus_in();
        combo.set_disabled(true);
        assert!(!combo.is_open());
        assert_eq!(f.overlays.overlay_count(), 0);
    }

    #[test]
    fn test_two_comboboxes_have_separate_menus() {
        let f = fixture();
        let mut first = build(&f, combobox().options(countries()));
        let mut second = build(&f, combobox().options(countries()));

        first.focus_in();
        second.focus_in();
        assert_eq!(f.overlays.overlay_count(), 2);

        first.select_value("us");
        assert_eq!(f.overlays.overlay_count(), 1);
        assert!(second.is_open());
    }

    fn any_options() -> impl Strategy<Value = Vec<ComboboxOption>> {
        prop::collection::vec(
            ("[a-z]{1,6}", prop::option::of("[A-Za-z ]{0,12}"), any::<bool>()).prop_map(
                |(value, label, disabled)| ComboboxOption {
                    value,
                    label,
                    disabled,
                },
            ),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn prop_empty_query_keeps_everything(options in any_options()) {
            prop_assume!(!options.is_empty());
            let filtered = filtered_options(&options, "", &ComboboxSettings::default());
            prop_assert_eq!(filtered, options);
        }

        #[test]
        fn prop_filter_is_ordered_label_match(
            options in any_options(),
            query in "[A-Za-z ]{1,3}",
        ) {
            let settings = ComboboxSettings::default();
            let filtered = filtered_options(&options, &query, &settings);
            let expected: Vec<_> = options
                .iter()
                .filter(|o| {
                    o.label
                        .as_ref()
                        .is_some_and(|l| l.to_lowercase().contains(&query.to_lowercase()))
                })
                .cloned()
                .collect();

            if expected.is_empty() {
                prop_assert_eq!(filtered.len(), 1);
                prop_assert!(filtered[0].disabled);
                prop_assert_eq!(filtered[0].label_text(), "No option found");
            } else {
                prop_assert_eq!(filtered, expected);
            }
        }

        #[test]
        fn prop_disabled_options_never_change_state(
            options in any_options(),
            query in "[a-z]{0,3}",
            committed in prop::option::of("[a-z]{1,6}"),
        ) {
            let f = fixture();
            let mut builder = combobox().options(options.clone());
            if let Some(value) = &committed {
                builder = builder.value(value.clone());
            }
            let mut combo = build(&f, builder);
            combo.focus_in();
            combo.query_change(query.clone());
            let before = combo.state().clone();

            for option in options.iter().filter(|o| o.disabled) {
                prop_assert!(!combo.select_option(option));
            }
            for (index, option) in combo.filtered_options().into_iter().enumerate() {
                if option.disabled {
                    prop_assert!(!combo.select_at(index));
                }
            }
            prop_assert_eq!(combo.state(), &before);
        }
    }
}
