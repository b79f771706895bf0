//! Shared UI icons and emojis.
//!
//! Each icon carries a plain-text fallback for terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "* ");

// Build indicators
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "-> ");
pub static IMAGE: Emoji<'_, '_> = Emoji("🖼️  ", "[IMG] ");
