// rzpchat-cli/src/surfaces.rs

//! Chat surfaces of the interactive session.
//!
//! Each surface is a thin shell over the shared [`Assistant`](rzpchat_core::Assistant):
//! it only decides which route messages take and owns its busy indicator.
//! Surfaces are created on first use and revealed afterwards.

use indicatif::{ProgressBar, ProgressStyle};
use rzpchat_core::Route;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceKind {
    Tools,
    Docs,
    Auto,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 3] = [SurfaceKind::Tools, SurfaceKind::Docs, SurfaceKind::Auto];

    pub fn route(self) -> Route {
        match self {
            SurfaceKind::Tools => Route::Tools,
            SurfaceKind::Docs => Route::Docs,
            SurfaceKind::Auto => Route::Auto,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::Tools => "tools",
            SurfaceKind::Docs => "docs",
            SurfaceKind::Auto => "auto",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SurfaceKind::Tools => "Razorpay tool commands",
            SurfaceKind::Docs => "documentation questions",
            SurfaceKind::Auto => "commands or documentation, whichever fits",
        }
    }

    /// Parses a `:tools` / `:docs` / `:auto` switch.
    pub fn from_switch(input: &str) -> Option<Self> {
        let name = input.trim().strip_prefix(':')?;
        SurfaceKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

pub type SpinnerFactory = fn(&str) -> ProgressBar;

pub fn terminal_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub struct Surface {
    kind: SurfaceKind,
    messages: usize,
    busy: Option<ProgressBar>,
}

impl Surface {
    fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            messages: 0,
            busy: None,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn messages(&self) -> usize {
        self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }
}

/// Whether [`SurfaceRegistry::reveal`] had to create the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revealed {
    Created,
    Existing,
}

pub struct SurfaceRegistry {
    surfaces: BTreeMap<SurfaceKind, Surface>,
    active: SurfaceKind,
    spinner: SpinnerFactory,
}

impl SurfaceRegistry {
    pub fn new(initial: SurfaceKind, spinner: SpinnerFactory) -> Self {
        let mut surfaces = BTreeMap::new();
        surfaces.insert(initial, Surface::new(initial));
        Self {
            surfaces,
            active: initial,
            spinner,
        }
    }

    /// Makes `kind` the active surface, creating it first if needed.
    pub fn reveal(&mut self, kind: SurfaceKind) -> Revealed {
        self.active = kind;
        if self.surfaces.contains_key(&kind) {
            debug!(surface = kind.name(), "Revealing existing surface.");
            Revealed::Existing
        } else {
            info!(surface = kind.name(), "Creating surface.");
            self.surfaces.insert(kind, Surface::new(kind));
            Revealed::Created
        }
    }

    pub fn active_kind(&self) -> SurfaceKind {
        self.active
    }

    pub fn get(&self, kind: SurfaceKind) -> Option<&Surface> {
        self.surfaces.get(&kind)
    }

    pub fn open(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    fn active_mut(&mut self) -> &mut Surface {
        let kind = self.active;
        self.surfaces.entry(kind).or_insert_with(|| Surface::new(kind))
    }

    /// Starts the active surface's busy indicator. Returns `false` if one is already showing.
    pub fn begin_busy(&mut self, message: &str) -> bool {
        let spinner = self.spinner;
        let surface = self.active_mut();
        if surface.busy.is_some() {
            return false;
        }
        surface.busy = Some(spinner(message));
        true
    }

    /// Clears the active surface's busy indicator and counts the finished message.
    pub fn end_busy(&mut self) {
        let surface = self.active_mut();
        if let Some(pb) = surface.busy.take() {
            pb.finish_and_clear();
        }
        surface.messages += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden(_: &str) -> ProgressBar {
        ProgressBar::hidden()
    }

    #[test]
    fn test_from_switch() {
        assert_eq!(SurfaceKind::from_switch(":docs"), Some(SurfaceKind::Docs));
        assert_eq!(SurfaceKind::from_switch(" :TOOLS "), Some(SurfaceKind::Tools));
        assert_eq!(SurfaceKind::from_switch("docs"), None);
        assert_eq!(SurfaceKind::from_switch(":billing"), None);
    }

    #[test]
    fn test_create_or_reveal() {
        let mut registry = SurfaceRegistry::new(SurfaceKind::Auto, hidden);
        assert_eq!(registry.active_kind(), SurfaceKind::Auto);
        assert_eq!(registry.reveal(SurfaceKind::Docs), Revealed::Created);
        assert_eq!(registry.reveal(SurfaceKind::Docs), Revealed::Existing);
        assert_eq!(registry.reveal(SurfaceKind::Auto), Revealed::Existing);
        assert_eq!(registry.open().count(), 2);
        assert_eq!(registry.active_kind(), SurfaceKind::Auto);
    }

    #[test]
    fn test_single_busy_indicator_per_surface() {
        let mut registry = SurfaceRegistry::new(SurfaceKind::Tools, hidden);
        assert!(registry.begin_busy("Working..."));
        assert!(!registry.begin_busy("Working..."));

        registry.reveal(SurfaceKind::Docs);
        assert!(registry.begin_busy("Searching docs..."));
        registry.end_busy();
        assert!(!registry.get(SurfaceKind::Docs).unwrap().is_busy());
        assert_eq!(registry.get(SurfaceKind::Docs).unwrap().messages(), 1);

        registry.reveal(SurfaceKind::Tools);
        assert!(registry.get(SurfaceKind::Tools).unwrap().is_busy());
        registry.end_busy();
        assert!(registry.begin_busy("Working..."));
    }

    #[test]
    fn test_routes() {
        assert_eq!(SurfaceKind::Tools.route(), Route::Tools);
        assert_eq!(SurfaceKind::Docs.route(), Route::Docs);
        assert_eq!(SurfaceKind::Auto.route(), Route::Auto);
    }
}
