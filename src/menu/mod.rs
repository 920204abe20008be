//! Trail colour menu
//!
//! The menu widget itself belongs to the host. This module owns the palette,
//! the chat command that opens it, what the choice writes back, and copying
//! the widget's config files into place on load.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::util::Rgba;

/// Chat command that opens the colour menu
pub const TRAIL_COMMAND: &str = "css_tk";

/// Menu title shown by the host widget
pub const MENU_TITLE: &str = "Trail colour";

/// Selectable trail colours, in menu order
pub const TRAIL_PALETTE: [(&str, Rgba); 6] = [
    ("Blue", Rgba::CORNFLOWER_BLUE),
    ("Red", Rgba::INDIAN_RED),
    ("Green", Rgba::MEDIUM_SEA_GREEN),
    ("Purple", Rgba::MEDIUM_ORCHID),
    ("Yellow", Rgba::GOLD),
    ("White", Rgba::WHITE),
];

/// Menu config files: (name in the shared directory, name in the target)
pub const MENU_CONFIG_FILES: [(&str, &str); 4] = [
    ("menu_config.jsonc", "trail_menu_config.jsonc"),
    ("trail_menu_config.jsonc", "trail_menu_config.jsonc"),
    ("menu_translations.jsonc", "trail_menu_translations.jsonc"),
    ("trail_menu_translations.jsonc", "trail_menu_translations.jsonc"),
];

/// What the host widget should display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailMenu {
    pub title: &'static str,
    pub options: Vec<&'static str>,
    /// Preselected option
    pub default_choice: &'static str,
}

impl TrailMenu {
    /// Build the menu with `current` preselected when it is a palette colour
    pub fn for_color(current: Option<Rgba>) -> Self {
        let default_choice = current
            .and_then(palette_name)
            .unwrap_or(TRAIL_PALETTE[0].0);

        Self {
            title: MENU_TITLE,
            options: TRAIL_PALETTE.iter().map(|(name, _)| *name).collect(),
            default_choice,
        }
    }
}

/// Resolve a menu choice, ignoring case
pub fn palette_color(choice: &str) -> Option<(&'static str, Rgba)> {
    TRAIL_PALETTE
        .iter()
        .copied()
        .find(|(name, _)| name.eq_ignore_ascii_case(choice.trim()))
}

/// Name of a palette colour
pub fn palette_name(color: Rgba) -> Option<&'static str> {
    TRAIL_PALETTE
        .iter()
        .find(|(_, c)| *c == color)
        .map(|(name, _)| *name)
}

/// Chat confirmation after a choice
pub fn choice_message(name: &str) -> String {
    format!("[ThrowingKnives] Trail: {name}")
}

/// Copy the menu config files present in `shared_dir` into `target_dir`,
/// overwriting. Returns how many files were copied.
pub fn provision_menu_files(shared_dir: &Path, target_dir: &Path) -> io::Result<usize> {
    let mut copied = 0;
    for (source_name, target_name) in MENU_CONFIG_FILES {
        let source = shared_dir.join(source_name);
        if !source.is_file() {
            continue;
        }
        fs::create_dir_all(target_dir)?;
        fs::copy(&source, target_dir.join(target_name))?;
        copied += 1;
    }
    Ok(copied)
}

/// Provisioning that never fails the caller
pub fn ensure_menu_files(shared_dir: Option<&Path>, target_dir: Option<&Path>) {
    let (Some(shared_dir), Some(target_dir)) = (shared_dir, target_dir) else {
        return;
    };

    match provision_menu_files(shared_dir, target_dir) {
        Ok(copied) => debug!(copied, "Menu config files provisioned"),
        Err(e) => warn!(error = %e, "Menu config copy failed"),
    }
}
