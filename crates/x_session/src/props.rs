use std::time::{Duration, Instant};

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConnectionExt as _, EventMask,
    Property, PropMode, Window,
};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;

use crate::error::SessionError;
use crate::session::XSession;
use crate::WindowId;

/// Longest string property we are willing to read, in 32-bit units.
const MAX_STRING_LONGS: u32 = 256;

/// Upper bound on the status array: two header slots plus per-monitor ids.
const MAX_STATUS_LONGS: u32 = 999;

/// Window of a running daemon, as discovered through its identity property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonWindow {
    pub window: WindowId,
    pub version: String,
    pub id: String,
}

impl XSession {
    /// Contents of the root window's status property; empty when unset.
    pub fn read_status(&self) -> Result<Vec<u32>, SessionError> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.screensaver_status,
                AtomEnum::INTEGER,
                0,
                MAX_STATUS_LONGS,
            )?
            .reply()?;
        Ok(reply
            .value32()
            .map(|values| values.collect())
            .unwrap_or_default())
    }

    /// Replace the root window's status property in one request.
    pub fn write_status(&self, values: &[u32]) -> Result<(), SessionError> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.screensaver_status,
            AtomEnum::INTEGER,
            values,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    /// Advertise this instance on its private window.
    pub fn publish_identity(&self, version: &str, id: &str) -> Result<(), SessionError> {
        self.set_string(self.window, self.atoms.screensaver_version, version)?;
        self.set_string(self.window, self.atoms.screensaver_id, id)?;
        self.conn.flush()?;
        Ok(())
    }

    /// Find another daemon's window among the root's children.
    pub fn find_daemon(&self) -> Result<Option<DaemonWindow>, SessionError> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        for window in tree.children {
            if window == self.window {
                continue;
            }
            let version = match self.get_string(window, self.atoms.screensaver_version) {
                Ok(Some(version)) => version,
                // Windows can vanish between the query and the read.
                Ok(None) | Err(SessionError::Reply(_)) => continue,
                Err(err) => return Err(err),
            };
            let id = self
                .get_string(window, self.atoms.screensaver_id)
                .ok()
                .flatten()
                .unwrap_or_default();
            return Ok(Some(DaemonWindow {
                window,
                version,
                id,
            }));
        }
        Ok(None)
    }

    /// Answer a ClientMessage by writing the response string on the window
    /// it was addressed to.
    pub fn send_response(&self, window: WindowId, text: &str) -> Result<(), SessionError> {
        self.set_string(window, self.atoms.screensaver_response, text)?;
        self.conn.flush()?;
        Ok(())
    }

    /// Client side: deliver a command to the daemon's window.
    pub fn send_command(&self, target: WindowId, kind: u32, arg: i32) -> Result<(), SessionError> {
        self.conn.change_window_attributes(
            target,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        let message = ClientMessageEvent::new(
            32,
            target,
            self.atoms.screensaver,
            [kind, arg as u32, 0, 0, 0],
        );
        self.conn
            .send_event(false, target, EventMask::NO_EVENT, message)?;
        self.conn.flush()?;
        Ok(())
    }

    /// Client side: wait for the daemon to write its response, then read and
    /// delete it. `Ok(None)` means the daemon did not answer in time.
    pub fn await_response(
        &self,
        target: WindowId,
        timeout: Duration,
    ) -> Result<Option<String>, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(event) = self.poll_raw_event()? {
                if let Event::PropertyNotify(notify) = event {
                    if notify.window == target
                        && notify.atom == self.atoms.screensaver_response
                        && notify.state == Property::NEW_VALUE
                    {
                        return self.take_string(target, self.atoms.screensaver_response);
                    }
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.wait_readable(remaining)
                .map_err(|err| SessionError::Connection(err.into()))?;
        }
    }

    fn set_string(&self, window: Window, property: Atom, text: &str) -> Result<(), SessionError> {
        self.conn.change_property8(
            PropMode::REPLACE,
            window,
            property,
            AtomEnum::STRING,
            text.as_bytes(),
        )?;
        Ok(())
    }

    fn get_string(&self, window: Window, property: Atom) -> Result<Option<String>, SessionError> {
        self.read_string(window, property, false)
    }

    fn take_string(&self, window: Window, property: Atom) -> Result<Option<String>, SessionError> {
        self.read_string(window, property, true)
    }

    fn read_string(
        &self,
        window: Window,
        property: Atom,
        delete: bool,
    ) -> Result<Option<String>, SessionError> {
        let reply = self
            .conn
            .get_property(delete, window, property, AtomEnum::STRING, 0, MAX_STRING_LONGS)?
            .reply()?;
        if reply.format != 8 || reply.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }
}
