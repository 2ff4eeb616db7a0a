/// Outcome of offering a key event to a component.
///
/// Views offer keys to their overlays first (picker, dialog, search) and
/// only fall through to their own bindings on `NotHandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
