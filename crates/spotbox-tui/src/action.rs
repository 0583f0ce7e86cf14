//! Action enum — all user-initiated intents and internal events.

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    QueuePanel,
    LogPanel,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Playback control ─────────────────────────────────────────────────────
    /// Nudge the local volume slider and post the new position.
    VolumeStep(i8),
    /// Pull playback back onto the appliance.
    Reclaim,
    /// Re-fetch the queue from the appliance.
    RefreshQueue,
    /// Append a URI to the playback queue.
    QueueAdd(String),

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),

    // ── Filter / prompt ──────────────────────────────────────────────────────
    OpenFilter,
    CloseFilter,
    ClearFilter,
    OpenPrompt,
    ClosePrompt,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Resize(u16, u16),
    Noop,
}
