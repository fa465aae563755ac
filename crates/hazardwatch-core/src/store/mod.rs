// ── Engine state stores ──
//
// Each store owns one slice of engine state and publishes a fresh
// snapshot on every mutation. Writes come from the event loop only;
// reads are lock-free from anywhere.

mod active;
mod history;
mod settings;

pub use active::ActiveAlerts;
pub use history::HistoryStore;
pub use settings::SettingsRegistry;
