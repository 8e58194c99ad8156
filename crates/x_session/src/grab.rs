use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, EventMask, GrabMode, GrabStatus, InputFocus};

use crate::error::SessionError;
use crate::session::XSession;

/// Result of a single grab request, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabOutcome {
    Success,
    AlreadyGrabbed,
    InvalidTime,
    NotViewable,
    Frozen,
    /// The request or its reply failed at the protocol level.
    Failed,
}

impl GrabOutcome {
    pub fn is_success(self) -> bool {
        self == GrabOutcome::Success
    }

    fn from_status(status: GrabStatus) -> Self {
        match status {
            GrabStatus::SUCCESS => GrabOutcome::Success,
            GrabStatus::ALREADY_GRABBED => GrabOutcome::AlreadyGrabbed,
            GrabStatus::INVALID_TIME => GrabOutcome::InvalidTime,
            GrabStatus::NOT_VIEWABLE => GrabOutcome::NotViewable,
            GrabStatus::FROZEN => GrabOutcome::Frozen,
            _ => GrabOutcome::Failed,
        }
    }
}

/// Pointer shape shown while we hold the pointer grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    /// Invisible; used while blanked or locked.
    Blank,
    /// Wristwatch; used while the authenticator is starting up.
    Busy,
}

impl XSession {
    pub fn grab_keyboard(&self) -> GrabOutcome {
        let reply = self
            .conn
            .grab_keyboard(
                true,
                self.root,
                x11rb::CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .map_err(SessionError::from)
            .and_then(|cookie| cookie.reply().map_err(SessionError::from));
        match reply {
            Ok(reply) => GrabOutcome::from_status(reply.status),
            Err(_) => GrabOutcome::Failed,
        }
    }

    /// Grab the pointer, or change the cursor of a pointer grab we already
    /// hold.
    pub fn grab_pointer(&self, shape: CursorShape) -> GrabOutcome {
        let cursor = match shape {
            CursorShape::Blank => self.blank_cursor,
            CursorShape::Busy => self.busy_cursor,
        };
        let reply = self
            .conn
            .grab_pointer(
                true,
                self.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                cursor,
                x11rb::CURRENT_TIME,
            )
            .map_err(SessionError::from)
            .and_then(|cookie| cookie.reply().map_err(SessionError::from));
        match reply {
            Ok(reply) => GrabOutcome::from_status(reply.status),
            Err(_) => GrabOutcome::Failed,
        }
    }

    pub fn ungrab_keyboard(&self) -> Result<(), SessionError> {
        self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    pub fn ungrab_pointer(&self) -> Result<(), SessionError> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    /// Set the input focus to `None`. Some clients only let go of their own
    /// keyboard grab once they lose focus.
    pub fn clear_focus(&self) -> Result<(), SessionError> {
        self.conn
            .set_input_focus(InputFocus::NONE, x11rb::NONE, x11rb::CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }
}
