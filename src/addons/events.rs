//! Notifications from the add-on manager to the embedding UI.

/// Observer of user-visible add-on events.
///
/// Both hooks default to doing nothing, so an embedder only implements what
/// it displays.
pub trait AddonObserver {
    /// A message for the user (install results, errors).
    fn show_message(&mut self, _message: &str) {}

    /// The installed or repository catalog changed.
    fn refresh_addon_browser(&mut self) {}
}
