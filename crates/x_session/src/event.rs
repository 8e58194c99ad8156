use crate::WindowId;

/// Where an input event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChannel {
    /// Core events, only delivered to us while we hold the grab.
    Grabbed,
    /// XInput2 raw events selected on the root window; these bypass grabs.
    Raw,
}

/// Decoded X event, reduced to what the daemon acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Key(InputChannel),
    Button(InputChannel),
    /// Core motion while we hold the pointer grab.
    Motion {
        channel: InputChannel,
        root_x: i32,
        root_y: i32,
    },
    /// Raw motion carries deltas only. Ask for
    /// [`pointer_position`](crate::XSession::pointer_position) when a sample
    /// is actually wanted.
    RawMotion,
    /// A `SCREENSAVER` ClientMessage: `kind` is the command atom, `arg` the
    /// optional numeric argument.
    Command {
        window: WindowId,
        kind: u32,
        arg: i32,
    },
    /// Asynchronous X protocol error for an earlier request.
    ProtocolError { description: String },
    Other,
}
